use crate::analytics::{AnalyticsResponse, Record};
use crate::error::ExportError;
use serde_json::Value;
use tracing::debug;

/// Label used for any profile not in the lookup
pub const UNKNOWN_PLATFORM: &str = "Unknown";

/// Value written for a metric the record does not report
pub const DEFAULT_METRIC_VALUE: i64 = 0;

pub const METRIC_COUNT: usize = 20;

/// Profile id, platform label, then one column per metric
pub const COLUMN_COUNT: usize = 2 + METRIC_COUNT;

/// A CSV column fed from one key of the record's metrics mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricColumn {
    pub header: &'static str,
    pub key: &'static str,
}

const fn metric(header: &'static str, key: &'static str) -> MetricColumn {
    MetricColumn { header, key }
}

/// Metric columns in output order
pub const METRIC_COLUMNS: [MetricColumn; METRIC_COUNT] = [
    metric("Comments_Count", "comments_count"),
    metric("Engagements_v2", "engagements_v2"),
    metric("Fans_Gained", "fans_gained"),
    metric("Fans_Lost", "fans_lost"),
    metric("Impressions", "impressions"),
    metric("Lifetime_Snapshot_Fans_Count", "lifetime_snapshot.fans_count"),
    metric("Lifetime_Snapshot_Followers_Count", "lifetime_snapshot.followers_count"),
    metric("Likes", "likes"),
    metric("Net_Fan_Growth", "net_fan_growth"),
    metric("Net_Follower_Growth", "net_follower_growth"),
    metric("Post_Content_Clicks", "post_content_clicks"),
    metric("Post_Content_Clicks_Other", "post_content_clicks_other"),
    metric("Post_Link_Clicks", "post_link_clicks"),
    metric("Post_Photo_View_Clicks", "post_photo_view_clicks"),
    metric("Post_Video_Play_Clicks", "post_video_play_clicks"),
    metric("Posts_Sent_Count", "posts_sent_count"),
    metric("Profile_Actions", "profile_actions"),
    metric("Reactions", "reactions"),
    metric("Shares_Count", "shares_count"),
    metric("Video_Views", "video_views"),
];

/// Header row of the CSV artifact
pub fn header() -> [&'static str; COLUMN_COUNT] {
    std::array::from_fn(|i| match i {
        0 => "Customer_ID",
        1 => "Social_Platform",
        _ => METRIC_COLUMNS[i - 2].header,
    })
}

/// Static profile id -> platform label table
#[derive(Debug, Clone, Copy)]
pub struct PlatformLookup {
    entries: &'static [(i64, &'static str)],
}

impl PlatformLookup {
    pub const fn new(entries: &'static [(i64, &'static str)]) -> Self {
        Self { entries }
    }

    /// Label for `profile_id`, or [`UNKNOWN_PLATFORM`]
    pub fn label(&self, profile_id: Option<&Value>) -> &'static str {
        profile_id
            .and_then(Value::as_i64)
            .and_then(|id| {
                self.entries
                    .iter()
                    .find(|(known, _)| *known == id)
                    .map(|(_, label)| *label)
            })
            .unwrap_or(UNKNOWN_PLATFORM)
    }
}

/// The exported profiles
pub static SPROUT_PROFILES: PlatformLookup = PlatformLookup::new(&[
    (2185669, "Facebook"),
    (4007857, "Instagram"),
    (3276812, "LinkedIn"),
]);

impl Default for PlatformLookup {
    fn default() -> Self {
        SPROUT_PROFILES
    }
}

/// One record flattened into the fixed column order
#[derive(Debug, Clone, PartialEq)]
pub struct OutputRow {
    /// `Value::Null` when the record carries no profile id
    pub profile_id: Value,
    pub platform: &'static str,
    pub metrics: [Value; METRIC_COUNT],
}

impl OutputRow {
    pub fn from_record(record: &Record, lookup: &PlatformLookup) -> Self {
        let profile_id = record.profile_id().cloned().unwrap_or(Value::Null);
        let platform = lookup.label(record.profile_id());
        let metrics = std::array::from_fn(|i| {
            record
                .metrics
                .get(METRIC_COLUMNS[i].key)
                .cloned()
                .unwrap_or(Value::from(DEFAULT_METRIC_VALUE))
        });

        Self {
            profile_id,
            platform,
            metrics,
        }
    }

    /// Cells as written to CSV
    pub fn cells(&self) -> Vec<String> {
        let mut cells = Vec::with_capacity(COLUMN_COUNT);
        cells.push(cell(&self.profile_id));
        cells.push(self.platform.to_string());
        cells.extend(self.metrics.iter().map(cell));
        cells
    }
}

/// Values are written as received; strings unquoted, null as empty
fn cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Header plus one row per record
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub header: [&'static str; COLUMN_COUNT],
    pub rows: Vec<OutputRow>,
}

impl Table {
    /// Comma-delimited UTF-8 text, CRLF line endings
    pub fn to_csv(&self) -> Result<Vec<u8>, ExportError> {
        let mut writer = csv::WriterBuilder::new()
            .terminator(csv::Terminator::CRLF)
            .from_writer(Vec::new());

        writer.write_record(self.header)?;
        for row in &self.rows {
            writer.write_record(row.cells())?;
        }

        writer
            .into_inner()
            .map_err(|e| ExportError::Csv(e.to_string()))
    }
}

/// Flatten every record of `response` into the fixed column layout
pub fn to_rows(response: &AnalyticsResponse, lookup: &PlatformLookup) -> Table {
    let rows: Vec<OutputRow> = response
        .records()
        .iter()
        .map(|record| OutputRow::from_record(record, lookup))
        .collect();

    debug!(rows = rows.len(), "Records flattened");

    Table {
        header: header(),
        rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::REQUESTED_METRICS;
    use serde_json::json;

    fn response(data: Value) -> AnalyticsResponse {
        AnalyticsResponse::from_value(json!({ "data": data })).unwrap()
    }

    const EXPECTED_HEADER: [&str; 22] = [
        "Customer_ID",
        "Social_Platform",
        "Comments_Count",
        "Engagements_v2",
        "Fans_Gained",
        "Fans_Lost",
        "Impressions",
        "Lifetime_Snapshot_Fans_Count",
        "Lifetime_Snapshot_Followers_Count",
        "Likes",
        "Net_Fan_Growth",
        "Net_Follower_Growth",
        "Post_Content_Clicks",
        "Post_Content_Clicks_Other",
        "Post_Link_Clicks",
        "Post_Photo_View_Clicks",
        "Post_Video_Play_Clicks",
        "Posts_Sent_Count",
        "Profile_Actions",
        "Reactions",
        "Shares_Count",
        "Video_Views",
    ];

    #[test]
    fn test_header_has_fixed_columns() {
        assert_eq!(header(), EXPECTED_HEADER);
    }

    #[test]
    fn test_metric_keys_in_column_order() {
        let keys: Vec<&str> = METRIC_COLUMNS.iter().map(|c| c.key).collect();
        assert_eq!(
            keys,
            vec![
                "comments_count",
                "engagements_v2",
                "fans_gained",
                "fans_lost",
                "impressions",
                "lifetime_snapshot.fans_count",
                "lifetime_snapshot.followers_count",
                "likes",
                "net_fan_growth",
                "net_follower_growth",
                "post_content_clicks",
                "post_content_clicks_other",
                "post_link_clicks",
                "post_photo_view_clicks",
                "post_video_play_clicks",
                "posts_sent_count",
                "profile_actions",
                "reactions",
                "shares_count",
                "video_views",
            ]
        );
    }

    #[test]
    fn test_known_profile_with_single_metric() {
        let table = to_rows(
            &response(json!([
                { "dimensions": { "customer_profile_id": 2185669 }, "metrics": { "likes": 5 } }
            ])),
            &SPROUT_PROFILES,
        );

        let row = &table.rows[0];
        assert_eq!(row.profile_id, json!(2185669));
        assert_eq!(row.platform, "Facebook");

        let mut expected = vec![json!(0); METRIC_COUNT];
        expected[7] = json!(5);
        assert_eq!(row.metrics.to_vec(), expected);
    }

    #[test]
    fn test_unmapped_profile_is_unknown_with_zero_metrics() {
        let table = to_rows(
            &response(json!([
                { "dimensions": { "customer_profile_id": 9999999 }, "metrics": {} }
            ])),
            &SPROUT_PROFILES,
        );

        let row = &table.rows[0];
        assert_eq!(row.platform, UNKNOWN_PLATFORM);
        assert!(row.metrics.iter().all(|m| *m == json!(0)));
    }

    #[test]
    fn test_platform_labels() {
        assert_eq!(SPROUT_PROFILES.label(Some(&json!(2185669))), "Facebook");
        assert_eq!(SPROUT_PROFILES.label(Some(&json!(4007857))), "Instagram");
        assert_eq!(SPROUT_PROFILES.label(Some(&json!(3276812))), "LinkedIn");
        // Labels come from the numeric id only
        assert_eq!(SPROUT_PROFILES.label(Some(&json!("2185669"))), UNKNOWN_PLATFORM);
        assert_eq!(SPROUT_PROFILES.label(None), UNKNOWN_PLATFORM);
    }

    #[test]
    fn test_custom_lookup() {
        static LOOKUP: PlatformLookup = PlatformLookup::new(&[(1, "Threads")]);
        let table = to_rows(
            &response(json!([{ "dimensions": { "customer_profile_id": 1 } }])),
            &LOOKUP,
        );
        assert_eq!(table.rows[0].platform, "Threads");
    }

    #[test]
    fn test_present_metrics_are_copied_unchanged() {
        let table = to_rows(
            &response(json!([{
                "dimensions": { "customer_profile_id": 4007857 },
                "metrics": {
                    "impressions": 1234567,
                    "engagements_v2": 12.5,
                    "video_views": 0,
                    "reactions": null
                }
            }])),
            &SPROUT_PROFILES,
        );

        let row = &table.rows[0];
        assert_eq!(row.metrics[1], json!(12.5));
        assert_eq!(row.metrics[4], json!(1234567));
        assert_eq!(row.metrics[17], Value::Null);
        assert_eq!(row.metrics[19], json!(0));
    }

    #[test]
    fn test_one_row_per_record() {
        let table = to_rows(
            &response(json!([
                { "dimensions": { "customer_profile_id": 2185669 }, "metrics": {} },
                { "dimensions": { "customer_profile_id": 2185669 }, "metrics": {} },
                { "dimensions": { "customer_profile_id": 3276812 }, "metrics": {} }
            ])),
            &SPROUT_PROFILES,
        );
        assert_eq!(table.rows.len(), 3);
    }

    #[test]
    fn test_misnamed_requested_metrics_default_to_zero() {
        // The API echoes back the requested (misspelled) key, which no column reads
        let table = to_rows(
            &response(json!([{
                "dimensions": { "customer_profile_id": 2185669 },
                "metrics": { "lifetttime.comments_count": 17, "Likes": 3 }
            }])),
            &SPROUT_PROFILES,
        );
        assert!(table.rows[0].metrics.iter().all(|m| *m == json!(0)));
        assert!(REQUESTED_METRICS.contains(&"lifetttime.comments_count"));
    }

    #[test]
    fn test_missing_profile_id_writes_empty_cell() {
        let table = to_rows(&response(json!([{ "metrics": { "likes": 1 } }])), &SPROUT_PROFILES);
        let cells = table.rows[0].cells();
        assert_eq!(cells[0], "");
        assert_eq!(cells[1], UNKNOWN_PLATFORM);
    }

    #[test]
    fn test_csv_layout() {
        let table = to_rows(
            &response(json!([
                { "dimensions": { "customer_profile_id": 2185669 }, "metrics": { "likes": 5 } },
                { "dimensions": { "customer_profile_id": 9999999 }, "metrics": {} }
            ])),
            &SPROUT_PROFILES,
        );

        let text = String::from_utf8(table.to_csv().unwrap()).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], EXPECTED_HEADER.join(","));
        assert_eq!(
            lines[1],
            "2185669,Facebook,0,0,0,0,0,0,0,5,0,0,0,0,0,0,0,0,0,0,0,0"
        );
        assert!(lines[2].starts_with("9999999,Unknown,"));
        assert!(text.ends_with("\r\n"));
    }

    #[test]
    fn test_empty_response_is_header_only() {
        let table = to_rows(&response(json!([])), &SPROUT_PROFILES);
        let text = String::from_utf8(table.to_csv().unwrap()).unwrap();
        assert_eq!(text.lines().count(), 1);
    }
}
