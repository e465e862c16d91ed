//! Sprout Social profile analytics: request/response model and the fetcher.

use crate::config::AnalyticsConfig;
use crate::error::ExportError;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{info, instrument};

/// Restricts the report to the three exported profiles
pub const PROFILE_FILTER: &str = "customer_profile_id.eq(2185669, 3276812, 4007857)";

/// Fixed reporting window
pub const REPORTING_PERIOD_FILTER: &str = "reporting_period.in(2023-01-01...2023-08-31)";

/// Metric names sent with every request.
///
/// Several entries do not match the keys the transformer reads
/// (`lifetttime.*`, `Likes`), so those columns always come back as 0.
/// Confirm the names against the live API before changing them.
pub const REQUESTED_METRICS: [&str; 22] = [
    "lifetime_snapshot.followers_count",
    "lifetttime.net_follower_growth",
    "Likes",
    "impressions",
    "lifetime_snapshot.fans_count",
    "net_fan_growth",
    "fans_gained",
    "fans_lost",
    "lifetttimeposts_sent_count",
    "facebook.impressions",
    "lifetttime.engagements_v2",
    "reactions",
    "likes",
    "lifetttime.comments_count",
    "shares_count",
    "post_link_clicks",
    "profile_actions",
    "post_content_clicks_other",
    "post_content_clicks",
    "post_photo_view_clicks",
    "post_video_play_clicks",
    "video_views",
];

/// Body of a profile analytics request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyticsRequest {
    /// Customer the request is scoped to; part of the URL, not the body
    #[serde(skip)]
    pub tenant_id: String,
    pub filters: Vec<String>,
    pub metrics: Vec<String>,
    pub page: u32,
}

impl AnalyticsRequest {
    /// The one report this job exports. Only page 1 is ever requested.
    pub fn profiles_report(tenant_id: impl Into<String>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            filters: vec![
                PROFILE_FILTER.to_string(),
                REPORTING_PERIOD_FILTER.to_string(),
            ],
            metrics: REQUESTED_METRICS.iter().map(|m| m.to_string()).collect(),
            page: 1,
        }
    }
}

/// One entry of the response `data` array
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    #[serde(default)]
    pub dimensions: Map<String, Value>,
    /// Sparse: a missing key means "not reported", not zero
    #[serde(default)]
    pub metrics: Map<String, Value>,
}

impl Record {
    /// `dimensions.customer_profile_id`, if reported
    pub fn profile_id(&self) -> Option<&Value> {
        self.dimensions.get("customer_profile_id")
    }
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(default)]
    data: Vec<Record>,
}

/// Parsed analytics response, keeping the body exactly as received
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyticsResponse {
    raw: Value,
    records: Vec<Record>,
}

impl AnalyticsResponse {
    pub fn from_value(raw: Value) -> Result<Self, ExportError> {
        let envelope = Envelope::deserialize(&raw)?;
        Ok(Self {
            raw,
            records: envelope.data,
        })
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }

    /// Body re-serialized with 4-space indentation, keys in received order
    pub fn to_pretty_json(&self) -> Result<Vec<u8>, ExportError> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.raw.serialize(&mut serializer)?;
        Ok(buf)
    }
}

/// HTTP client for the analytics endpoint
pub struct AnalyticsClient {
    http: reqwest::Client,
    base_url: String,
}

impl AnalyticsClient {
    /// Create a client. No timeout override: the transport default applies.
    pub fn new(config: &AnalyticsConfig) -> Result<Self, ExportError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("sprout-export/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// `POST /v1/{tenant_id}/analytics/profiles`
    pub fn endpoint(&self, tenant_id: &str) -> String {
        format!("{}/v1/{}/analytics/profiles", self.base_url, tenant_id)
    }

    /// Fetch the fixed profiles report for `tenant_id`
    pub async fn fetch(
        &self,
        access_token: &str,
        tenant_id: &str,
    ) -> Result<AnalyticsResponse, ExportError> {
        let request = AnalyticsRequest::profiles_report(tenant_id);
        self.send(access_token, &request).await
    }

    /// Issue one request. Anything other than 200 is a terminal failure.
    #[instrument(skip(self, access_token, request), fields(tenant_id = %request.tenant_id))]
    pub async fn send(
        &self,
        access_token: &str,
        request: &AnalyticsRequest,
    ) -> Result<AnalyticsResponse, ExportError> {
        let response = self
            .http
            .post(self.endpoint(&request.tenant_id))
            .bearer_auth(access_token)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(ExportError::HttpRequestFailed {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        let parsed = AnalyticsResponse::from_value(serde_json::from_slice(&bytes)?)?;

        info!(records = parsed.records().len(), "Analytics request succeeded");
        Ok(parsed)
    }
}
