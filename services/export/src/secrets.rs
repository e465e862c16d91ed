use crate::config::SecretsConfig;
use crate::error::ExportError;
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_secretsmanager::config::Builder as SecretsConfigBuilder;
use aws_sdk_secretsmanager::error::{DisplayErrorContext, ProvideErrorMetadata};
use aws_sdk_secretsmanager::Client as SecretsClient;
use serde::Deserialize;
use std::fmt;
use tracing::{debug, info, instrument};

/// Read-only access to named secrets
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Return the latest version of `secret_name` in `project_id` as text
    async fn resolve(&self, secret_name: &str, project_id: &str) -> Result<String, ExportError>;
}

/// Secret store backed by AWS Secrets Manager
///
/// Secret ids are namespaced by project: `{project_id}/{secret_name}`.
pub struct AwsSecretStore {
    client: SecretsClient,
}

impl AwsSecretStore {
    /// Create a new Secrets Manager client
    pub async fn new(config: &SecretsConfig) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(ref region) = config.region {
            loader = loader.region(aws_config::Region::new(region.clone()));
        }
        let aws_config = loader.load().await;

        let mut builder = SecretsConfigBuilder::from(&aws_config);

        // Configure custom endpoint for LocalStack
        if let Some(ref endpoint_url) = config.endpoint_url {
            builder = builder.endpoint_url(endpoint_url);
        }

        info!(project_id = %config.project_id, "Secret store initialized");

        Self {
            client: SecretsClient::from_conf(builder.build()),
        }
    }
}

#[async_trait]
impl SecretStore for AwsSecretStore {
    #[instrument(skip(self))]
    async fn resolve(&self, secret_name: &str, project_id: &str) -> Result<String, ExportError> {
        let secret_id = secret_id(project_id, secret_name);

        let output = self
            .client
            .get_secret_value()
            .secret_id(&secret_id)
            .version_stage("AWSCURRENT")
            .send()
            .await
            .map_err(|e| {
                let status = e.raw_response().map(|r| r.status().as_u16());
                classify_secret_error(
                    &secret_id,
                    status,
                    e.code(),
                    DisplayErrorContext(&e).to_string(),
                )
            })?;

        let payload = if let Some(text) = output.secret_string() {
            text.to_string()
        } else if let Some(blob) = output.secret_binary() {
            String::from_utf8(blob.as_ref().to_vec()).map_err(|_| {
                ExportError::SecretUnavailable {
                    name: secret_id.clone(),
                    reason: "payload is not UTF-8 text".to_string(),
                }
            })?
        } else {
            return Err(ExportError::SecretUnavailable {
                name: secret_id,
                reason: "secret has no payload".to_string(),
            });
        };

        debug!(secret_id = %secret_id, "Secret resolved");
        Ok(payload)
    }
}

fn secret_id(project_id: &str, secret_name: &str) -> String {
    format!("{}/{}", project_id, secret_name)
}

/// Map a failed secret lookup onto the error taxonomy
fn classify_secret_error(
    secret_id: &str,
    status: Option<u16>,
    code: Option<&str>,
    message: String,
) -> ExportError {
    match (code, status) {
        (Some("AccessDeniedException"), _) | (_, Some(403)) => ExportError::AccessDenied {
            name: secret_id.to_string(),
        },
        (Some("ResourceNotFoundException"), _) => ExportError::SecretUnavailable {
            name: secret_id.to_string(),
            reason: "no such secret or version".to_string(),
        },
        _ => ExportError::SecretUnavailable {
            name: secret_id.to_string(),
            reason: message,
        },
    }
}

/// Object storage key pair held in the service-account secret
#[derive(Clone, Deserialize)]
pub struct StorageCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    #[serde(default)]
    pub session_token: Option<String>,
}

impl StorageCredentials {
    /// Parse the JSON credential blob
    pub fn from_json(blob: &str) -> Result<Self, ExportError> {
        serde_json::from_str(blob).map_err(|e| ExportError::InvalidCredentials(e.to_string()))
    }
}

impl fmt::Debug for StorageCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("session_token", &self.session_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Everything one run needs from the secret store
#[derive(Clone)]
pub struct CredentialSet {
    pub storage: StorageCredentials,
    pub access_token: String,
    pub tenant_id: String,
}

impl fmt::Debug for CredentialSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialSet")
            .field("storage", &self.storage)
            .field("access_token", &"<redacted>")
            .field("tenant_id", &self.tenant_id)
            .finish()
    }
}

/// Resolve the three secrets of a run, stopping at the first failure
pub async fn resolve_credentials(
    store: &dyn SecretStore,
    config: &SecretsConfig,
) -> Result<CredentialSet, ExportError> {
    let project_id = config.project_id.as_str();

    let storage_blob = store
        .resolve(&config.storage_credentials_secret, project_id)
        .await?;
    let access_token = store.resolve(&config.access_token_secret, project_id).await?;
    let tenant_id = store.resolve(&config.tenant_id_secret, project_id).await?;

    Ok(CredentialSet {
        storage: StorageCredentials::from_json(&storage_blob)?,
        access_token: access_token.trim().to_string(),
        tenant_id: tenant_id.trim().to_string(),
    })
}
