use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::Serialize;

/// Window sent to Kibana as ISO-8601 instants
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct TimeRange {
    pub min: String,
    pub max: String,
}

impl TimeRange {
    /// The `minutes` minutes leading up to now
    pub fn last_minutes(minutes: i64) -> Self {
        Self::ending_at(Utc::now(), minutes)
    }

    pub fn ending_at(end: DateTime<Utc>, minutes: i64) -> Self {
        let start = end - Duration::minutes(minutes.max(0));

        Self {
            min: start.to_rfc3339_opts(SecondsFormat::Millis, true),
            max: end.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

impl Default for TimeRange {
    fn default() -> Self {
        Self::last_minutes(60)
    }
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub index: u32,
    pub size: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self { index: 0, size: 20 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn window_ends_at_given_instant() {
        let end = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let range = TimeRange::ending_at(end, 90);

        assert_eq!(range.min, "2024-03-01T10:30:00.000Z");
        assert_eq!(range.max, "2024-03-01T12:00:00.000Z");
    }

    #[test]
    fn negative_minutes_collapse_to_empty_window() {
        let end = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let range = TimeRange::ending_at(end, -5);

        assert_eq!(range.min, range.max);
    }

    #[test]
    fn default_pagination_is_first_page_of_twenty() {
        assert_eq!(Pagination::default(), Pagination { index: 0, size: 20 });
    }
}
