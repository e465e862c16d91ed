use crate::config::StorageConfig;
use crate::error::ExportError;
use crate::secrets::StorageCredentials;
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::{Builder as S3ConfigBuilder, Credentials};
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Bucket-scoped blob writes
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Write `body` under `key`, replacing any existing object
    async fn put(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<(), ExportError>;
}

/// Builds an [`ObjectStore`] from the service-account key resolved for a run
#[async_trait]
pub trait StorageConnector: Send + Sync {
    async fn connect(
        &self,
        config: &StorageConfig,
        credentials: &StorageCredentials,
    ) -> Result<Arc<dyn ObjectStore>, ExportError>;
}

/// Connector producing [`S3ObjectStore`] clients
#[derive(Debug, Clone, Copy, Default)]
pub struct S3Connector;

#[async_trait]
impl StorageConnector for S3Connector {
    async fn connect(
        &self,
        config: &StorageConfig,
        credentials: &StorageCredentials,
    ) -> Result<Arc<dyn ObjectStore>, ExportError> {
        Ok(Arc::new(S3ObjectStore::new(config, credentials).await))
    }
}

/// S3-compatible object store client
pub struct S3ObjectStore {
    client: S3Client,
    bucket: String,
}

impl S3ObjectStore {
    /// Create a client authenticated with the given key pair
    pub async fn new(config: &StorageConfig, credentials: &StorageCredentials) -> Self {
        let credentials = Credentials::new(
            credentials.access_key_id.clone(),
            credentials.secret_access_key.clone(),
            credentials.session_token.clone(),
            None,
            "service-account-secret",
        );

        let aws_config = aws_config::defaults(BehaviorVersion::latest())
            .region(aws_config::Region::new(config.region.clone()))
            .credentials_provider(credentials)
            .load()
            .await;

        let mut s3_config_builder = S3ConfigBuilder::from(&aws_config);

        // Configure custom endpoint for GCS interoperability/MinIO/LocalStack
        if let Some(ref endpoint_url) = config.endpoint_url {
            s3_config_builder = s3_config_builder.endpoint_url(endpoint_url);
        }

        // Force path-style access for MinIO compatibility
        if config.force_path_style {
            s3_config_builder = s3_config_builder.force_path_style(true);
        }

        let client = S3Client::from_conf(s3_config_builder.build());

        info!(
            bucket = %config.bucket,
            region = %config.region,
            "Object store initialized"
        );

        Self {
            client,
            bucket: config.bucket.clone(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    #[instrument(skip(self, body), fields(bucket = %self.bucket, size_bytes = body.len()))]
    async fn put(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<(), ExportError> {
        debug!(key = %key, "Writing object");

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(body))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| {
                let status = e.raw_response().map(|r| r.status().as_u16());
                classify_put_error(key, status, e.code(), DisplayErrorContext(&e).to_string())
            })?;

        Ok(())
    }
}

/// Map a failed write onto the error taxonomy
fn classify_put_error(
    key: &str,
    status: Option<u16>,
    code: Option<&str>,
    message: String,
) -> ExportError {
    match (code, status) {
        (Some("AccessDenied"), _) | (_, Some(403)) => ExportError::PermissionDenied {
            key: key.to_string(),
        },
        _ => ExportError::StorageUnavailable {
            key: key.to_string(),
            message,
        },
    }
}
