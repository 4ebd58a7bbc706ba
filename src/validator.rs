//! The validation capability: decides whether one XML file conforms to the
//! schema it references.
//!
//! [`SchemaValidator`] is the production implementation. It locates the
//! schema from the document's `xsi:schemaLocation` or
//! `xsi:noNamespaceSchemaLocation`, loads it from disk or over HTTP, parses it
//! once per run and validates the document with libxml2 on a blocking thread.

use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::cache::ParsedSchemaCache;
use crate::error::{ConformanceError, Result};
use crate::http_client::AsyncHttpClient;
use crate::libxml2::{LibXml2Wrapper, ValidationResult, XmlSchemaPtr};
use crate::schema_loader::{SchemaExtractor, SchemaLoader, SchemaLocation};

/// Where per-file problem reports are written
pub type ReportSink = Arc<Mutex<dyn Write + Send>>;

/// Validates a single file. Never fails: every problem is reported by the
/// implementation and folded into `false`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait XmlValidator: Send + Sync {
    /// `version_info` is the bundled version text, passed through to any
    /// remote schema requests.
    async fn validate(&self, file: &Path, version_info: &str) -> bool;
}

pub struct SchemaValidator {
    extractor: SchemaExtractor,
    loader: SchemaLoader,
    schemas: ParsedSchemaCache,
    libxml2: LibXml2Wrapper,
    report: ReportSink,
}

impl SchemaValidator {
    pub fn new(http_client: AsyncHttpClient) -> Self {
        Self {
            extractor: SchemaExtractor::new(),
            loader: SchemaLoader::new(http_client),
            schemas: ParsedSchemaCache::default(),
            libxml2: LibXml2Wrapper::new(),
            report: Arc::new(Mutex::new(io::stdout())),
        }
    }

    /// Send problem reports to `sink` instead of stdout
    pub fn with_report_sink(mut self, sink: ReportSink) -> Self {
        self.report = sink;
        self
    }

    fn report(&self, line: &str) {
        let mut sink = self.report.lock().unwrap_or_else(|p| p.into_inner());
        let _ = writeln!(sink, "  {}", line);
        let _ = sink.flush();
    }

    async fn schema_for(&self, location: &SchemaLocation, version_info: &str) -> Result<XmlSchemaPtr> {
        let libxml2 = self.libxml2;

        self.schemas
            .get_or_load(location.cache_key(), async {
                let data = self.loader.load(location, version_info).await?;
                let parsed = tokio::task::spawn_blocking(move || {
                    libxml2.parse_schema_from_memory(&data)
                })
                .await
                .map_err(|e| ConformanceError::Concurrency {
                    details: e.to_string(),
                })?;

                parsed.map_err(|e| ConformanceError::SchemaParsing {
                    url: location.to_string(),
                    details: e.to_string(),
                })
            })
            .await
    }

    async fn check(&self, file: &Path, version_info: &str) -> Result<ValidationResult> {
        let location = self.extractor.locate(file).await?;
        tracing::debug!(file = %file.display(), schema = %location, "Schema located");

        let schema = self.schema_for(&location, version_info).await?;

        let libxml2 = self.libxml2;
        let path = file.to_path_buf();
        let result = tokio::task::spawn_blocking(move || libxml2.validate_file(&schema, &path))
            .await
            .map_err(|e| ConformanceError::Concurrency {
                details: e.to_string(),
            })??;

        Ok(result)
    }
}

#[async_trait]
impl XmlValidator for SchemaValidator {
    async fn validate(&self, file: &Path, version_info: &str) -> bool {
        match self.check(file, version_info).await {
            Ok(ValidationResult::Valid) => {
                tracing::info!("{} is valid", file.display());
                true
            }
            Ok(result) => {
                for message in result.messages() {
                    tracing::debug!(file = %file.display(), "{}", message);
                    self.report(&message.to_string());
                }
                if let ValidationResult::InternalError { code, messages } = &result
                    && messages.is_empty()
                {
                    self.report(&format!("Unable to validate the file (libxml2 code {})", code));
                }
                tracing::info!("{} is invalid", file.display());
                false
            }
            Err(e) => {
                tracing::debug!("Validation of {} failed: {}", file.display(), e);
                self.report(&e.to_string());
                false
            }
        }
    }
}
