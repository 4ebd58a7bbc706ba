use std::future::Future;
use std::sync::Arc;

use moka::future::Cache;

use crate::error::{ConformanceError, Result};
use crate::libxml2::XmlSchemaPtr;

/// Upper bound on distinct schemas kept parsed during one run
pub const DEFAULT_CAPACITY: u64 = 100;

/// In-memory cache of parsed schemas, keyed by schema location.
///
/// Concurrent requests for one key wait on a single load. Failed loads are
/// not cached, so the next file referencing the same schema retries.
#[derive(Clone)]
pub struct ParsedSchemaCache {
    cache: Cache<String, XmlSchemaPtr>,
}

impl ParsedSchemaCache {
    pub fn new(max_capacity: u64) -> Self {
        Self {
            cache: Cache::builder().max_capacity(max_capacity).build(),
        }
    }

    /// Return the schema cached under `key`, running `loader` if absent
    pub async fn get_or_load<Fut>(&self, key: String, loader: Fut) -> Result<XmlSchemaPtr>
    where
        Fut: Future<Output = Result<XmlSchemaPtr>>,
    {
        self.cache
            .try_get_with(key.clone(), loader)
            .await
            .map_err(|e: Arc<ConformanceError>| match e.as_ref() {
                ConformanceError::SchemaParsing { url, details } => {
                    ConformanceError::SchemaParsing {
                        url: url.clone(),
                        details: details.clone(),
                    }
                }
                ConformanceError::SchemaNotFound { url } => {
                    ConformanceError::SchemaNotFound { url: url.clone() }
                }
                other => ConformanceError::SchemaParsing {
                    url: key,
                    details: other.to_string(),
                },
            })
    }

    pub async fn get(&self, key: &str) -> Option<XmlSchemaPtr> {
        self.cache.get(key).await
    }

    pub async fn entry_count(&self) -> u64 {
        self.cache.run_pending_tasks().await;
        self.cache.entry_count()
    }
}

impl Default for ParsedSchemaCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::libxml2::LibXml2Wrapper;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const SIMPLE_XSD: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
    <xs:element name="root" type="xs:string"/>
</xs:schema>"#;

    #[tokio::test]
    async fn test_loader_runs_once_per_key() {
        let cache = ParsedSchemaCache::default();
        let loads = AtomicUsize::new(0);

        for _ in 0..3 {
            let schema = cache
                .get_or_load("local:/a.xsd".to_string(), async {
                    loads.fetch_add(1, Ordering::SeqCst);
                    Ok(LibXml2Wrapper::new().parse_schema_from_memory(SIMPLE_XSD.as_bytes())?)
                })
                .await;
            assert!(schema.is_ok());
        }

        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert_eq!(cache.entry_count().await, 1);
        assert!(cache.get("local:/a.xsd").await.is_some());
    }

    #[tokio::test]
    async fn test_failed_load_is_not_cached() {
        let cache = ParsedSchemaCache::default();

        let first = cache
            .get_or_load("https://example.com/s.xsd".to_string(), async {
                Err(ConformanceError::SchemaNotFound {
                    url: "https://example.com/s.xsd".to_string(),
                })
            })
            .await;
        assert!(matches!(first, Err(ConformanceError::SchemaNotFound { .. })));
        assert!(cache.get("https://example.com/s.xsd").await.is_none());

        let second = cache
            .get_or_load("https://example.com/s.xsd".to_string(), async {
                Ok(LibXml2Wrapper::new().parse_schema_from_memory(SIMPLE_XSD.as_bytes())?)
            })
            .await;
        assert!(second.is_ok());
    }

    #[tokio::test]
    async fn test_other_errors_become_schema_parsing() {
        let cache = ParsedSchemaCache::default();
        let result = cache
            .get_or_load("local:/b.xsd".to_string(), async {
                Err(ConformanceError::Io(std::io::Error::other("disk gone")))
            })
            .await;

        match result {
            Err(ConformanceError::SchemaParsing { url, details }) => {
                assert_eq!(url, "local:/b.xsd");
                assert!(details.contains("disk gone"));
            }
            other => panic!("Expected SchemaParsing, got {:?}", other.err()),
        }
    }
}
