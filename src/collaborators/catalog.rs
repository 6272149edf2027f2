//! Shop catalog generation boundary.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Days, Utc};
use serde_json::{json, Value};

/// Produces the storefront catalog. `None` means generation failed.
#[async_trait]
pub trait CatalogGenerator: Send + Sync {
    async fn generate(&self) -> Option<Value>;
}

/// Serves a catalog maintained as a JSON file. The file is read on every call
/// so edits show up without a restart.
#[derive(Debug, Clone)]
pub struct FileCatalog {
    path: PathBuf,
}

impl FileCatalog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl CatalogGenerator for FileCatalog {
    async fn generate(&self) -> Option<Value> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::error!(path = %self.path.display(), error = %e, "Failed to read catalog");
                return None;
            }
        };

        match serde_json::from_slice(&raw) {
            Ok(catalog) => Some(catalog),
            Err(e) => {
                tracing::error!(
                    path = %self.path.display(),
                    error = %e,
                    "Catalog is not valid JSON"
                );
                None
            }
        }
    }
}

/// Empty daily and weekly storefronts expiring at the next UTC midnight.
#[derive(Debug, Clone, Copy, Default)]
pub struct DailyCatalog;

impl DailyCatalog {
    pub fn build_at(&self, now: DateTime<Utc>) -> Option<Value> {
        let expiration = now
            .date_naive()
            .checked_add_days(Days::new(1))?
            .and_hms_opt(0, 0, 0)?
            .and_utc();

        Some(json!({
            "refreshIntervalHrs": 24,
            "dailyPurchaseHrs": 24,
            "expiration": expiration.to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            "storefronts": [
                { "name": "BRDailyStorefront", "catalogEntries": [] },
                { "name": "BRWeeklyStorefront", "catalogEntries": [] },
            ],
        }))
    }
}

#[async_trait]
impl CatalogGenerator for DailyCatalog {
    async fn generate(&self) -> Option<Value> {
        self.build_at(Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::io::Write;

    #[test]
    fn test_daily_expiration_is_next_midnight() {
        let now = Utc.with_ymd_and_hms(2026, 3, 31, 18, 45, 0).unwrap();
        let catalog = DailyCatalog.build_at(now).unwrap();
        assert_eq!(catalog["expiration"], "2026-04-01T00:00:00.000Z");
        assert_eq!(catalog["storefronts"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_file_catalog() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"storefronts":[{{"name":"Featured"}}]}}"#).unwrap();

        let catalog = FileCatalog::new(file.path()).generate().await.unwrap();
        assert_eq!(catalog["storefronts"][0]["name"], "Featured");
    }

    #[tokio::test]
    async fn test_file_catalog_failures_yield_none() {
        assert!(FileCatalog::new("/nonexistent/catalog.json")
            .generate()
            .await
            .is_none());

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(FileCatalog::new(file.path()).generate().await.is_none());
    }
}
