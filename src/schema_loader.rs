use regex::Regex;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};

use crate::error::{ConformanceError, Result};
use crate::http_client::AsyncHttpClient;

static SCHEMA_LOCATION_REGEX: OnceLock<Regex> = OnceLock::new();
static NO_NAMESPACE_REGEX: OnceLock<Regex> = OnceLock::new();

fn schema_location_regex() -> &'static Regex {
    SCHEMA_LOCATION_REGEX.get_or_init(|| {
        Regex::new(r#"xsi:schemaLocation="\S+\s+(.+?)""#)
            .expect("Failed to compile schemaLocation regex")
    })
}

fn no_namespace_regex() -> &'static Regex {
    NO_NAMESPACE_REGEX.get_or_init(|| {
        Regex::new(r#"xsi:noNamespaceSchemaLocation="(.+?)""#)
            .expect("Failed to compile noNamespaceSchemaLocation regex")
    })
}

/// Where a document's schema lives
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SchemaLocation {
    Local(PathBuf),
    Remote(String),
}

impl SchemaLocation {
    /// Classify `reference` as found in the document at `document`.
    ///
    /// Relative local references resolve against the document's directory.
    pub fn resolve(reference: &str, document: &Path) -> Self {
        if reference.starts_with("http://") || reference.starts_with("https://") {
            return SchemaLocation::Remote(reference.to_string());
        }

        let reference = reference.strip_prefix("file://").unwrap_or(reference);
        let path = Path::new(reference);
        if path.is_absolute() {
            SchemaLocation::Local(path.to_path_buf())
        } else {
            let base = document.parent().unwrap_or(Path::new("."));
            SchemaLocation::Local(base.join(path))
        }
    }

    /// Key under which the parsed schema is cached
    pub fn cache_key(&self) -> String {
        match self {
            SchemaLocation::Local(path) => format!("local:{}", path.display()),
            SchemaLocation::Remote(url) => url.clone(),
        }
    }
}

impl fmt::Display for SchemaLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaLocation::Local(path) => write!(f, "{}", path.display()),
            SchemaLocation::Remote(url) => write!(f, "{}", url),
        }
    }
}

/// Finds the schema reference in an XML document's root element
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaExtractor;

impl SchemaExtractor {
    pub fn new() -> Self {
        Self
    }

    pub async fn locate(&self, document: &Path) -> Result<SchemaLocation> {
        let file = File::open(document).await?;
        self.locate_in_reader(file, document).await
    }

    /// Scan `reader` line by line until the first schema reference or the
    /// first closing tag, whichever comes first.
    pub async fn locate_in_reader<R>(&self, reader: R, document: &Path) -> Result<SchemaLocation>
    where
        R: AsyncRead + Unpin,
    {
        let mut lines = BufReader::new(reader).lines();

        while let Some(line) = lines.next_line().await? {
            let reference = schema_location_regex()
                .captures(&line)
                .or_else(|| no_namespace_regex().captures(&line))
                .map(|caps| caps[1].trim().to_string());

            if let Some(reference) = reference {
                return Ok(SchemaLocation::resolve(&reference, document));
            }

            if line.trim_start().starts_with("</") {
                break;
            }
        }

        Err(ConformanceError::SchemaUrlNotFound {
            file: document.to_path_buf(),
        })
    }
}

/// Fetches raw schema bytes from disk or over HTTP
pub struct SchemaLoader {
    http_client: AsyncHttpClient,
}

impl SchemaLoader {
    pub fn new(http_client: AsyncHttpClient) -> Self {
        Self { http_client }
    }

    pub async fn load(&self, location: &SchemaLocation, version_info: &str) -> Result<Vec<u8>> {
        let data = match location {
            SchemaLocation::Local(path) => {
                tokio::fs::read(path).await.map_err(|e| match e.kind() {
                    std::io::ErrorKind::NotFound => ConformanceError::SchemaNotFound {
                        url: path.display().to_string(),
                    },
                    _ => ConformanceError::Io(e),
                })?
            }
            SchemaLocation::Remote(url) => {
                tracing::debug!(url, "Downloading schema");
                self.http_client
                    .download_schema(url, Some(version_info))
                    .await
                    .map_err(|e| match e {
                        ConformanceError::HttpStatus { status: 404, url, .. } => {
                            ConformanceError::SchemaNotFound { url }
                        }
                        other => other,
                    })?
            }
        };

        check_schema_content(&data, &location.to_string())?;
        Ok(data)
    }
}

/// Cheap sanity check before handing bytes to the schema parser
fn check_schema_content(data: &[u8], source: &str) -> Result<()> {
    let content = std::str::from_utf8(data).map_err(|_| ConformanceError::SchemaParsing {
        url: source.to_string(),
        details: "Schema content is not valid UTF-8".to_string(),
    })?;

    if !content.trim_start().starts_with('<') {
        return Err(ConformanceError::SchemaParsing {
            url: source.to_string(),
            details: "Schema content does not appear to be XML".to_string(),
        });
    }

    if !content.contains("schema") {
        return Err(ConformanceError::SchemaParsing {
            url: source.to_string(),
            details: "Content does not appear to be an XML Schema (XSD)".to_string(),
        });
    }

    Ok(())
}
