use crate::cli::{Cli, OutputFormat};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_VERSION_URL: &str =
    "https://cprn.org/wp-admin/admin-ajax.php?action=fetchValidationToolVersion";
pub const DEFAULT_DOWNLOAD_URL: &str = "https://cprn.org/research/cprn-data-collection/";

/// The release server answers default client identities with 403.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36";

const CONFIG_NAMES: [&str; 4] = [
    "xml-conformance.toml",
    "xml-conformance.json",
    ".xml-conformance.toml",
    ".xml-conformance.json",
];

/// Trait for abstracting environment variable access
pub trait EnvProvider {
    fn get(&self, key: &str) -> Option<String>;
}

/// System environment variable provider for production use
pub struct SystemEnvProvider;

impl EnvProvider for SystemEnvProvider {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParsing(#[from] toml::de::Error),

    #[error("JSON parsing error: {0}")]
    JsonParsing(#[from] serde_json::Error),

    #[error("Configuration validation error: {0}")]
    Validation(String),

    #[error("Environment variable error: {0}")]
    Environment(String),

    #[error("Unsupported configuration file format: {0}")]
    UnsupportedFormat(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub version_check: VersionCheckConfig,
    pub network: NetworkConfig,
    pub output: OutputConfig,
    pub preferences: PreferencesConfig,
    pub debug: DebugConfig,
}

/// Advisory release check at startup
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct VersionCheckConfig {
    pub enabled: bool,
    /// Endpoint returning text that contains the latest version
    pub url: String,
    /// Page named in the "newer version" advisory
    pub download_url: String,
    pub timeout_seconds: u64,
    pub user_agent: String,
}

/// Schema download settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NetworkConfig {
    pub timeout_seconds: u64,
    pub retry_attempts: u32,
    pub retry_delay_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct OutputConfig {
    pub format: OutputFormat,
    pub verbose: bool,
    /// Errors and prompts only
    pub quiet: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct PreferencesConfig {
    /// Overrides `<home>/.xml-conformance/preferences.toml`
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Appended to each file's path to name its debug log
    pub log_suffix: String,
}

impl Default for VersionCheckConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            url: DEFAULT_VERSION_URL.to_string(),
            download_url: DEFAULT_DOWNLOAD_URL.to_string(),
            timeout_seconds: 5,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            retry_attempts: 3,
            retry_delay_ms: 1000,
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_suffix: crate::orchestrator::DEFAULT_LOG_SUFFIX.to_string(),
        }
    }
}

/// Configuration manager for loading and merging configurations
pub struct ConfigManager;

impl ConfigManager {
    /// Load configuration with precedence: defaults -> file -> environment -> CLI
    pub async fn load_config(cli: &Cli) -> Result<Config> {
        Self::load_config_with(cli, &SystemEnvProvider).await
    }

    pub async fn load_config_with(cli: &Cli, env: &impl EnvProvider) -> Result<Config> {
        let mut config = match &cli.config {
            Some(path) => Self::load_from_file(path).await?,
            None => Self::find_config_file().await?.unwrap_or_default(),
        };

        config = Self::apply_environment_overrides_with(env, config)?;
        config = Self::merge_with_cli(config, cli);

        Self::validate_config(&config)?;
        Ok(config)
    }

    /// Load configuration from a file (TOML or JSON). Missing keys take defaults.
    pub async fn load_from_file(path: &Path) -> Result<Config> {
        let content = tokio::fs::read_to_string(path).await?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Ok(toml::from_str(&content)?),
            Some("json") => Ok(serde_json::from_str(&content)?),
            Some(ext) => Err(ConfigError::UnsupportedFormat(ext.to_string())),
            None => match toml::from_str::<Config>(&content) {
                Ok(config) => Ok(config),
                Err(_) => Ok(serde_json::from_str(&content)?),
            },
        }
    }

    /// Find a configuration file in the working directory, then in the
    /// user config directory.
    pub async fn find_config_file() -> Result<Option<Config>> {
        let mut candidates: Vec<PathBuf> = CONFIG_NAMES.iter().map(PathBuf::from).collect();
        if let Some(config_dir) = dirs::config_dir() {
            let app_dir = config_dir.join("xml-conformance");
            candidates.extend(CONFIG_NAMES.iter().map(|name| app_dir.join(name)));
        }

        for path in candidates {
            if tokio::fs::try_exists(&path).await.unwrap_or(false) {
                tracing::debug!("Loading configuration from {}", path.display());
                return Ok(Some(Self::load_from_file(&path).await?));
            }
        }

        Ok(None)
    }

    /// Apply `XML_CONFORMANCE_*` overrides from `env`
    pub fn apply_environment_overrides_with(
        env: &impl EnvProvider,
        mut config: Config,
    ) -> Result<Config> {
        fn parse<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::Environment(format!("Invalid {} value: {}", key, value)))
        }

        if let Some(value) = env.get("XML_CONFORMANCE_VERSION_CHECK") {
            config.version_check.enabled = parse("XML_CONFORMANCE_VERSION_CHECK", &value)?;
        }
        if let Some(value) = env.get("XML_CONFORMANCE_VERSION_URL") {
            config.version_check.url = value;
        }
        if let Some(value) = env.get("XML_CONFORMANCE_TIMEOUT") {
            config.network.timeout_seconds = parse("XML_CONFORMANCE_TIMEOUT", &value)?;
        }
        if let Some(value) = env.get("XML_CONFORMANCE_RETRY_ATTEMPTS") {
            config.network.retry_attempts = parse("XML_CONFORMANCE_RETRY_ATTEMPTS", &value)?;
        }
        if let Some(value) = env.get("XML_CONFORMANCE_VERBOSE") {
            config.output.verbose = parse("XML_CONFORMANCE_VERBOSE", &value)?;
        }
        if let Some(value) = env.get("XML_CONFORMANCE_QUIET") {
            config.output.quiet = parse("XML_CONFORMANCE_QUIET", &value)?;
        }
        if let Some(value) = env.get("XML_CONFORMANCE_FORMAT") {
            config.output.format = match value.to_lowercase().as_str() {
                "human" => OutputFormat::Human,
                "json" => OutputFormat::Json,
                _ => {
                    return Err(ConfigError::Environment(format!(
                        "Invalid XML_CONFORMANCE_FORMAT value: {}",
                        value
                    )));
                }
            };
        }
        if let Some(value) = env.get("XML_CONFORMANCE_PREFERENCES") {
            config.preferences.path = Some(PathBuf::from(value));
        }

        Ok(config)
    }

    /// Merge CLI arguments; only flags actually given override
    pub fn merge_with_cli(mut config: Config, cli: &Cli) -> Config {
        if cli.verbose {
            config.output.verbose = true;
            config.output.quiet = false;
        }
        if cli.quiet {
            config.output.quiet = true;
            config.output.verbose = false;
        }
        if let Some(format) = cli.format {
            config.output.format = format;
        }
        if cli.no_version_check {
            config.version_check.enabled = false;
        }
        if let Some(url) = &cli.version_url {
            config.version_check.url = url.clone();
        }

        config
    }

    pub fn validate_config(config: &Config) -> Result<()> {
        if config.network.timeout_seconds == 0 {
            return Err(ConfigError::Validation(
                "Timeout must be greater than 0".to_string(),
            ));
        }

        if config.version_check.timeout_seconds == 0 {
            return Err(ConfigError::Validation(
                "Version check timeout must be greater than 0".to_string(),
            ));
        }

        if config.network.retry_attempts > 10 {
            return Err(ConfigError::Validation(
                "Retry attempts cannot exceed 10".to_string(),
            ));
        }

        if config.output.verbose && config.output.quiet {
            return Err(ConfigError::Validation(
                "Cannot enable both verbose and quiet modes".to_string(),
            ));
        }

        if config.debug.log_suffix.is_empty() {
            return Err(ConfigError::Validation(
                "Debug log suffix must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}
