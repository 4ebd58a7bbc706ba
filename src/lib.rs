//! # xml-conformance Library
//!
//! Resolves the files a user wants checked (from the command line, a console
//! prompt or a native file picker), validates each one against the XSD schema
//! it references and reports a pass/fail summary.

pub mod acquisition;
pub mod cache;
pub mod cli;
pub mod config;
pub mod console;
pub mod error;
pub mod front_end;
pub mod http_client;
pub mod libxml2;
pub mod logging;
pub mod orchestrator;
pub mod output;
pub mod preferences;
pub mod resolver;
pub mod schema_loader;
pub mod validator;
pub mod version;

pub use acquisition::{
    Acquired, AcquisitionLoop, AcquisitionOutcome, DialogInput, InputSource, LineInput,
    NativePicker, PathPicker,
};
pub use cache::ParsedSchemaCache;
pub use cli::{Cli, OutputFormat};
pub use config::{Config, ConfigManager};
pub use console::{Console, Tone};
pub use error::{ConformanceError, LibXml2Error};
pub use front_end::{FrontEndSelector, InteractionMode};
pub use http_client::{AsyncHttpClient, HttpClientConfig};
pub use libxml2::{LibXml2Wrapper, ValidationMessage, ValidationResult, XmlSchemaPtr};
pub use logging::{DebugCapture, setup_logging};
pub use orchestrator::{FileOutcome, RunOutcome, ValidationOrchestrator};
pub use output::Output;
pub use preferences::{PreferenceFile, PreferenceStore};
pub use resolver::{FileList, FileSetResolver, Resolution, ResolvedFile};
pub use schema_loader::{SchemaExtractor, SchemaLoader, SchemaLocation};
pub use validator::{ReportSink, SchemaValidator, XmlValidator};
pub use version::{BUNDLED_VERSION_TEXT, VersionCheck, VersionGate, VersionTriple};
