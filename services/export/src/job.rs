use crate::analytics::AnalyticsClient;
use crate::archive::{archive_raw, archive_tabular, ArtifactKeys};
use crate::config::Config;
use crate::error::ExportError;
use crate::object_store::StorageConnector;
use crate::secrets::{resolve_credentials, SecretStore};
use crate::transform::{to_rows, PlatformLookup};
use chrono::{Local, NaiveDate};
use std::fmt;
use std::sync::Arc;
use tracing::{error, info, info_span, Instrument};
use uuid::Uuid;

/// Progress of a single run. Any failure goes straight to `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStage {
    Start,
    CredentialsResolved,
    Fetched,
    ArchivedRaw,
    Transformed,
    ArchivedTabular,
    Done,
    Failed,
}

impl JobStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStage::Start => "start",
            JobStage::CredentialsResolved => "credentials_resolved",
            JobStage::Fetched => "fetched",
            JobStage::ArchivedRaw => "archived_raw",
            JobStage::Transformed => "transformed",
            JobStage::ArchivedTabular => "archived_tabular",
            JobStage::Done => "done",
            JobStage::Failed => "failed",
        }
    }
}

impl fmt::Display for JobStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Daily analytics export: secrets, fetch, raw archive, transform, CSV archive
pub struct ExportJob {
    config: Config,
    secrets: Arc<dyn SecretStore>,
    storage: Arc<dyn StorageConnector>,
    analytics: AnalyticsClient,
    lookup: PlatformLookup,
}

impl ExportJob {
    pub fn new(
        config: Config,
        secrets: Arc<dyn SecretStore>,
        storage: Arc<dyn StorageConnector>,
        analytics: AnalyticsClient,
    ) -> Self {
        Self {
            config,
            secrets,
            storage,
            analytics,
            lookup: PlatformLookup::default(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run for today's local date
    pub async fn run(&self) -> Result<String, ExportError> {
        self.run_for_date(Local::now().date_naive()).await
    }

    /// Run once, writing artifacts keyed by `date`.
    ///
    /// Returns the status message. A non-200 analytics response is logged
    /// and reported in the status, with nothing archived; every other
    /// failure is returned as `Err`. Artifacts written before a failing
    /// step are left in place.
    pub async fn run_for_date(&self, date: NaiveDate) -> Result<String, ExportError> {
        let run_id = Uuid::new_v4();
        let span = info_span!("export_run", run_id = %run_id, date = %date);

        async {
            let mut stage = JobStage::Start;
            let result = self.execute(date, &mut stage).await;

            match result {
                Ok(RunOutcome::Archived(status)) => {
                    advance(&mut stage, JobStage::Done);
                    metrics::counter!("export_runs_total", "outcome" => "success").increment(1);
                    info!(status = %status, "Export job finished");
                    Ok(status)
                }
                Ok(RunOutcome::FetchRejected { status, body }) => {
                    error!(
                        last_completed_stage = %stage,
                        stage = %JobStage::Failed,
                        status = status,
                        body = %body,
                        "Analytics request failed"
                    );
                    metrics::counter!("export_runs_total", "outcome" => "failure").increment(1);
                    Ok(format!(
                        "Analytics request failed with status {}; nothing archived",
                        status
                    ))
                }
                Err(e) => {
                    error!(
                        last_completed_stage = %stage,
                        stage = %JobStage::Failed,
                        error = %e,
                        "Export job failed"
                    );
                    metrics::counter!("export_runs_total", "outcome" => "failure").increment(1);
                    Err(e)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn execute(&self, date: NaiveDate, stage: &mut JobStage) -> Result<RunOutcome, ExportError> {
        let credentials = resolve_credentials(self.secrets.as_ref(), &self.config.secrets).await?;
        let store = self
            .storage
            .connect(&self.config.storage, &credentials.storage)
            .await?;
        advance(stage, JobStage::CredentialsResolved);

        let response = match self
            .analytics
            .fetch(&credentials.access_token, &credentials.tenant_id)
            .await
        {
            Ok(response) => response,
            Err(ExportError::HttpRequestFailed { status, body }) => {
                return Ok(RunOutcome::FetchRejected { status, body });
            }
            Err(e) => return Err(e),
        };
        advance(stage, JobStage::Fetched);

        let bucket = self.config.storage.bucket.as_str();
        let keys = ArtifactKeys::for_date(&self.config.storage, date);

        archive_raw(store.as_ref(), bucket, &keys.raw, &response).await?;
        advance(stage, JobStage::ArchivedRaw);

        let table = to_rows(&response, &self.lookup);
        advance(stage, JobStage::Transformed);

        archive_tabular(store.as_ref(), bucket, &keys.tabular, &table).await?;
        advance(stage, JobStage::ArchivedTabular);
        metrics::counter!("export_records_total").increment(table.rows.len() as u64);

        Ok(RunOutcome::Archived(format!(
            "Data processed and saved to storage: {bucket}/{raw} and {bucket}/{tabular}",
            bucket = bucket,
            raw = keys.raw,
            tabular = keys.tabular,
        )))
    }
}

/// How a run that did not error ended
enum RunOutcome {
    /// Both artifacts written; carries the status message
    Archived(String),
    /// The analytics API answered with something other than 200
    FetchRejected { status: u16, body: String },
}

fn advance(stage: &mut JobStage, next: JobStage) {
    info!(from = %stage, to = %next, "Export stage complete");
    *stage = next;
}
