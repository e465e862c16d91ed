//! Sprout Social Analytics Export
//!
//! Daily batch job that pulls profile analytics from the Sprout Social API,
//! archives the raw response, flattens it into a fixed CSV layout, and
//! archives the CSV next to it.
//!
//! ## Pipeline
//!
//! ```text
//! Secret Store          Sprout Social API           Object Storage
//! ┌──────────────┐      ┌──────────────────┐        ┌────────────────────────────────────┐
//! │ storage key  │      │ POST /v1/{tenant}│        │ sproutsocial_post_response_{date}  │
//! │ access token │──┐   │ /analytics/      │        │   .json                            │
//! │ customer id  │  │   │ profiles         │        │ customer_data_{date}.csv           │
//! └──────────────┘  │   └──────────────────┘        └────────────────────────────────────┘
//!                   ▼            ▲    │                     ▲               ▲
//!            ┌──────────────┐    │    ▼                     │               │
//!            │ Export Job   │────┘  ┌──────────┐  raw JSON  │               │
//!            │              │──────▶│ Archive  │────────────┘               │
//!            └──────────────┘       └──────────┘                            │
//!                   │               ┌──────────┐  ┌──────────┐   CSV        │
//!                   └──────────────▶│Transform │─▶│ Archive  │──────────────┘
//!                                   └──────────┘  └──────────┘
//! ```
//!
//! Everything runs in sequence: one request, then two writes. There is no
//! retry, pagination, or rollback; a failure at any step ends the run.

pub mod analytics;
pub mod archive;
pub mod config;
pub mod error;
pub mod job;
pub mod object_store;
pub mod secrets;
pub mod transform;
pub mod trigger;

pub use analytics::{AnalyticsClient, AnalyticsRequest, AnalyticsResponse, Record};
pub use archive::ArtifactKeys;
pub use config::Config;
pub use error::ExportError;
pub use job::{ExportJob, JobStage};
pub use object_store::{ObjectStore, S3Connector, S3ObjectStore, StorageConnector};
pub use secrets::{AwsSecretStore, CredentialSet, SecretStore, StorageCredentials};
pub use transform::{OutputRow, PlatformLookup, Table, SPROUT_PROFILES};
