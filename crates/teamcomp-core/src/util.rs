//! Shared utility functions used across multiple modules.

use chrono::{DateTime, Datelike, Duration, DurationRound, TimeZone, Timelike, Utc};
use sha2::{Digest, Sha256};

/// Normalize optional text by trimming whitespace and removing empties.
///
/// Returns `None` when the input is `None` or the trimmed value is empty.
pub fn normalize_text_option(value: Option<String>) -> Option<String> {
    let value = value?;
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Check if a string starts with `http://` or `https://`.
pub fn is_http_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}

/// Truncate text to at most 180 characters for error messages.
pub fn compact_text(value: &str) -> String {
    value.trim().chars().take(180).collect()
}

/// Hex-encoded SHA-256 digest of the given bytes.
pub fn hash_document(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Truncate a timestamp to the start of its minute.
pub fn floor_to_minute(at: DateTime<Utc>) -> DateTime<Utc> {
    at.duration_trunc(Duration::minutes(1)).unwrap_or(at)
}

/// Move a timestamp to the `:x1` minute of its ten-minute block.
///
/// Competition windows and scheduler ticks both live on these boundaries,
/// e.g. `12:07:45` becomes `12:01:00` and `12:10:00` becomes `12:11:00`.
pub fn window_boundary(at: DateTime<Utc>) -> DateTime<Utc> {
    let minute = (at.minute() / 10) * 10 + 1;
    Utc.with_ymd_and_hms(at.year(), at.month(), at.day(), at.hour(), minute, 0)
        .single()
        .unwrap_or(at)
}

/// Current time as Unix milliseconds.
pub fn unix_millis_now() -> i64 {
    Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(hour: u32, minute: u32, second: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2021, 12, 24, hour, minute, second)
            .unwrap()
    }

    #[test]
    fn normalize_text_option_rejects_empty() {
        assert_eq!(normalize_text_option(None), None);
        assert_eq!(normalize_text_option(Some("   ".to_string())), None);
    }

    #[test]
    fn normalize_text_option_trims_value() {
        assert_eq!(
            normalize_text_option(Some(" FOLLY ".to_string())),
            Some("FOLLY".to_string())
        );
    }

    #[test]
    fn is_http_url_accepts_valid_schemes() {
        assert!(is_http_url("http://localhost"));
        assert!(is_http_url("https://www.nitrotype.com"));
        assert!(!is_http_url("ftp://example.com"));
    }

    #[test]
    fn hash_document_is_stable_and_hex() {
        let first = hash_document(br#"{"success":true}"#);
        let second = hash_document(br#"{"success":true}"#);
        assert_eq!(first, second);
        assert_eq!(first.len(), 64);
        assert_ne!(first, hash_document(br#"{"success":false}"#));
    }

    #[test]
    fn floor_to_minute_drops_seconds() {
        assert_eq!(floor_to_minute(at(12, 1, 42)), at(12, 1, 0));
    }

    #[test]
    fn window_boundary_moves_to_first_minute_of_block() {
        assert_eq!(window_boundary(at(12, 7, 45)), at(12, 1, 0));
        assert_eq!(window_boundary(at(12, 10, 0)), at(12, 11, 0));
        assert_eq!(window_boundary(at(12, 59, 59)), at(12, 51, 0));
    }
}
