//! # Article record
//! The single shape every upstream is normalized into before merge, sort and cache.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Offset, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Display marker used when a record carries no usable publish date.
pub const DATE_UNKNOWN: &str = "日付不明";
pub const NO_DESCRIPTION: &str = "No description available.";

/// Japan Standard Time; display dates are rendered for a Japanese audience.
const JST_OFFSET_SECS: i32 = 9 * 3600;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Remote,
    Static,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thumbnail {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub source_type: SourceType,
    pub title: String,
    pub description: String,
    pub url: String,
    #[serde(rename = "thumbnailImage")]
    pub thumbnail: Option<Thumbnail>,
    /// Sort key only. Epoch when the upstream gave no parseable date.
    #[serde(rename = "sortDate")]
    pub publish_instant: DateTime<Utc>,
    #[serde(rename = "displayDate")]
    pub display_date: String,
    #[serde(rename = "isMvFeature", default)]
    pub feature_flag: bool,
}

pub fn placeholder_title(id: &str) -> String {
    format!("No Title ({id})")
}

/// Resolve an optional publish date into `(sort instant, display string)`.
pub fn dated(publish: Option<DateTime<Utc>>) -> (DateTime<Utc>, String) {
    match publish {
        Some(ts) => (ts, display_date(ts)),
        None => (DateTime::<Utc>::UNIX_EPOCH, DATE_UNKNOWN.to_string()),
    }
}

/// `YYYY/M/D` in JST, no zero padding.
pub fn display_date(ts: DateTime<Utc>) -> String {
    let jst = FixedOffset::east_opt(JST_OFFSET_SECS).unwrap_or_else(|| Utc.fix());
    ts.with_timezone(&jst).format("%Y/%-m/%-d").to_string()
}

/// Parse a calendar date-time the way upstream pages tend to write it.
/// Values without an offset are read as UTC. Returns `None` for anything unparseable.
pub fn parse_publish_date(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }
    // Offsets without a colon, missing seconds, or a bare `Z` after minutes.
    let zoned = match s.strip_suffix(['Z', 'z']) {
        Some(head) => format!("{head}+00:00"),
        None => s.to_string(),
    };
    for fmt in [
        "%Y-%m-%dT%H:%M:%S%.f%z",
        "%Y-%m-%dT%H:%M:%S%.f%:z",
        "%Y-%m-%dT%H:%M%z",
        "%Y-%m-%dT%H:%M%:z",
        "%Y-%m-%d %H:%M:%S%z",
        "%Y-%m-%d %H:%M:%S%:z",
    ] {
        if let Ok(dt) = DateTime::parse_from_str(&zoned, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    for fmt in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y/%m/%d %H:%M:%S",
        "%Y/%m/%d %H:%M",
    ] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    for fmt in ["%Y-%m-%d", "%Y/%m/%d"] {
        if let Ok(day) = NaiveDate::parse_from_str(s, fmt) {
            return day.and_hms_opt(0, 0, 0).map(|n| Utc.from_utc_datetime(&n));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_common_date_shapes() {
        let cases = [
            "2024-05-03T10:00:00+09:00",
            "2024-05-03T01:00:00Z",
            "Fri, 03 May 2024 01:00:00 +0000",
            "2024-05-03 01:00:00",
            "2024-05-03T10:00+09:00",
            "2024-05-03T01:00Z",
            "2024-05-03T10:00:00.000+0900",
            "2024-05-03T10:00:00+0900",
            "2024/05/03 01:00",
        ];
        for c in cases {
            let ts = parse_publish_date(c).unwrap_or_else(|| panic!("should parse {c}"));
            assert_eq!(ts.to_rfc3339(), "2024-05-03T01:00:00+00:00", "case {c}");
        }
        assert!(parse_publish_date("2024/05/03").is_some());
        assert!(parse_publish_date("2024-05-03").is_some());
    }

    #[test]
    fn garbage_dates_are_absent_not_errors() {
        assert_eq!(parse_publish_date(""), None);
        assert_eq!(parse_publish_date("someday soon"), None);
        assert_eq!(parse_publish_date("2024-13-45"), None);
    }

    #[test]
    fn missing_date_sorts_at_epoch_with_unknown_marker() {
        let (ts, shown) = dated(None);
        assert_eq!(ts.timestamp(), 0);
        assert_eq!(shown, DATE_UNKNOWN);
    }

    #[test]
    fn display_date_is_rendered_in_jst() {
        // 2024-05-02 20:00 UTC is already May 3rd in Tokyo.
        let ts = parse_publish_date("2024-05-02T20:00:00Z").unwrap();
        assert_eq!(display_date(ts), "2024/5/3");
    }

    #[test]
    fn wire_shape_uses_front_end_field_names() {
        let rec = ArticleRecord {
            id: "a1".into(),
            source_type: SourceType::Static,
            title: "T".into(),
            description: "D".into(),
            url: "https://example.com/a1.html".into(),
            thumbnail: None,
            publish_instant: DateTime::<Utc>::UNIX_EPOCH,
            display_date: DATE_UNKNOWN.into(),
            feature_flag: true,
        };
        let v = serde_json::to_value(&rec).unwrap();
        assert_eq!(v["type"], "static");
        assert!(v["thumbnailImage"].is_null());
        assert_eq!(v["isMvFeature"], true);
        assert_eq!(v["displayDate"], DATE_UNKNOWN);
        assert!(v.get("sortDate").is_some());
    }
}
