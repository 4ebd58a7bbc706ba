use std::io::{self, BufRead, Write};

use anyhow::Result;

use xml_conformance::acquisition::DIALOG_TITLE;
use xml_conformance::config::Config;
use xml_conformance::{
    AcquisitionLoop, AcquisitionOutcome, AsyncHttpClient, BUNDLED_VERSION_TEXT, Cli,
    ConfigManager, Console, DebugCapture, DialogInput, FileSetResolver, FrontEndSelector,
    HttpClientConfig, InteractionMode, LineInput, NativePicker, Output, PreferenceFile,
    SchemaValidator, Tone, ValidationOrchestrator, VersionGate, setup_logging,
};

#[tokio::main]
async fn main() -> Result<()> {
    let (cli, debug) = Cli::parse_args();

    let config = ConfigManager::load_config(&cli).await?;
    let capture = setup_logging(config.output.verbose, config.output.quiet, debug)?;

    let debug_mode = debug;
    tracing::debug!(?config, debug_mode, "Configuration loaded");

    let code = run(&cli, &config, debug, capture).await?;
    std::process::exit(code);
}

async fn run(cli: &Cli, config: &Config, debug: bool, capture: DebugCapture) -> Result<i32> {
    let mut console = Console::stdout(config.output.quiet);

    console.println(BUNDLED_VERSION_TEXT.trim_end());
    check_version(config, &mut console).await;

    let mode = FrontEndSelector::select(cli.has_paths(), FrontEndSelector::display_available());
    tracing::debug!(?mode, "Interaction mode selected");

    let candidates = match mode {
        InteractionMode::Batch => cli.paths.clone(),
        _ => {
            console.usage();
            match acquire(mode, config, &mut console) {
                AcquisitionOutcome::Cancelled => return Ok(0),
                outcome => outcome.into_candidates(),
            }
        }
    };

    let resolution = FileSetResolver::new().resolve(candidates).await;
    for diagnostic in &resolution.diagnostics {
        console.error(diagnostic);
    }

    let http_config = HttpClientConfig {
        timeout_seconds: config.network.timeout_seconds,
        retry_attempts: config.network.retry_attempts,
        retry_delay_ms: config.network.retry_delay_ms,
        connection_verbose: debug,
        ..Default::default()
    };
    let validator = SchemaValidator::new(AsyncHttpClient::new(http_config)?);

    let mut orchestrator = ValidationOrchestrator::new(validator);
    if debug {
        orchestrator = orchestrator.with_debug_capture(capture, config.debug.log_suffix.clone());
    }

    let outcome = orchestrator
        .run(&resolution.files, BUNDLED_VERSION_TEXT, &mut console)
        .await;

    let output = Output::new(
        config.output.format,
        config.output.verbose,
        atty::is(atty::Stream::Stdout),
    );
    if let Some(report) = output.render(&outcome) {
        console.emit(report);
    }

    if mode.is_interactive() && !cli.no_pause {
        pause(&mut console);
    }

    Ok(outcome.exit_code())
}

/// Print the upgrade advisory when a newer release is published
async fn check_version<W: Write>(config: &Config, console: &mut Console<W>) {
    let settings = &config.version_check;
    if !settings.enabled {
        tracing::debug!("Version check disabled");
        return;
    }

    let check = VersionGate::check(BUNDLED_VERSION_TEXT, || async move {
        let client = AsyncHttpClient::new(HttpClientConfig::advisory(
            settings.timeout_seconds,
            settings.user_agent.clone(),
        ))?;
        client.fetch_text(&settings.url).await
    })
    .await;

    if let Some(remote) = check.remote.filter(|_| check.outdated) {
        console.println_colored(
            format!(
                "A newer version ({}) is available. Please visit {} to retrieve it.",
                remote, settings.download_url
            ),
            Tone::Yellow,
        );
        console.println("");
    }
}

fn acquire<W: Write>(
    mode: InteractionMode,
    config: &Config,
    console: &mut Console<W>,
) -> AcquisitionOutcome {
    match mode {
        InteractionMode::NativeDialog => {
            let store = PreferenceFile::open(config.preferences.path.clone());
            let mut source = DialogInput::new(NativePicker::new(DIALOG_TITLE), store);
            AcquisitionLoop::run(&mut source, console)
        }
        _ => {
            let stdin = io::stdin();
            let mut source = LineInput::new(stdin.lock());
            AcquisitionLoop::run(&mut source, console)
        }
    }
}

/// Wait for Enter so a double-clicked console window stays open
fn pause<W: Write>(console: &mut Console<W>) {
    console.prompt("Press Enter to exit...");
    let mut line = String::new();
    if let Err(e) = io::stdin().lock().read_line(&mut line) {
        tracing::debug!("Unable to read from stdin: {}", e);
    }
}
