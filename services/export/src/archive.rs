use crate::analytics::AnalyticsResponse;
use crate::config::StorageConfig;
use crate::error::ExportError;
use crate::object_store::ObjectStore;
use crate::transform::Table;
use chrono::NaiveDate;
use tracing::info;

const JSON_CONTENT_TYPE: &str = "application/json";
const CSV_CONTENT_TYPE: &str = "text/csv";

/// Keys of the two artifacts written by a run.
///
/// Keyed by calendar date only, so a second run on the same day overwrites
/// the first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactKeys {
    pub raw: String,
    pub tabular: String,
}

impl ArtifactKeys {
    /// Format: {raw_key_prefix}{YYYY-MM-DD}.json and {tabular_key_prefix}{YYYY-MM-DD}.csv
    pub fn for_date(config: &StorageConfig, date: NaiveDate) -> Self {
        let date = date.format("%Y-%m-%d");
        Self {
            raw: format!("{}{}.json", config.raw_key_prefix, date),
            tabular: format!("{}{}.csv", config.tabular_key_prefix, date),
        }
    }
}

/// Persist the analytics response as pretty-printed JSON
pub async fn archive_raw(
    store: &dyn ObjectStore,
    bucket: &str,
    key: &str,
    response: &AnalyticsResponse,
) -> Result<(), ExportError> {
    let body = response.to_pretty_json()?;
    store.put(key, body, JSON_CONTENT_TYPE).await?;

    info!(bucket = %bucket, key = %key, "Raw response archived");
    Ok(())
}

/// Persist the flattened rows as CSV
pub async fn archive_tabular(
    store: &dyn ObjectStore,
    bucket: &str,
    key: &str,
    table: &Table,
) -> Result<(), ExportError> {
    let body = table.to_csv()?;
    store.put(key, body, CSV_CONTENT_TYPE).await?;

    info!(bucket = %bucket, key = %key, rows = table.rows.len(), "CSV archived");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object_store::MockObjectStore;
    use crate::transform::{to_rows, SPROUT_PROFILES};
    use mockall::predicate::{always, eq};
    use serde_json::json;

    #[test]
    fn test_artifact_keys_for_date() {
        let keys = ArtifactKeys::for_date(
            &StorageConfig::default(),
            NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
        );
        assert_eq!(keys.raw, "sproutsocial_post_response_2024-01-05.json");
        assert_eq!(keys.tabular, "customer_data_2024-01-05.csv");
    }

    #[tokio::test]
    async fn test_archive_raw_writes_json() {
        let response = AnalyticsResponse::from_value(json!({ "data": [] })).unwrap();
        let expected = response.to_pretty_json().unwrap();

        let mut store = MockObjectStore::new();
        store
            .expect_put()
            .with(eq("raw.json"), eq(expected), eq(JSON_CONTENT_TYPE))
            .times(1)
            .returning(|_, _, _| Ok(()));

        archive_raw(&store, "bucket", "raw.json", &response).await.unwrap();
    }

    #[tokio::test]
    async fn test_archive_tabular_propagates_storage_failure() {
        let response = AnalyticsResponse::from_value(json!({ "data": [] })).unwrap();
        let table = to_rows(&response, &SPROUT_PROFILES);

        let mut store = MockObjectStore::new();
        store
            .expect_put()
            .with(eq("rows.csv"), always(), eq(CSV_CONTENT_TYPE))
            .times(1)
            .returning(|key, _, _| {
                Err(ExportError::PermissionDenied {
                    key: key.to_string(),
                })
            });

        let result = archive_tabular(&store, "bucket", "rows.csv", &table).await;
        assert!(matches!(result, Err(ExportError::PermissionDenied { .. })));
    }
}
