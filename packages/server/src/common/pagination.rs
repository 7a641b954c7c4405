//! Cursor-based pagination primitives.
//!
//! Two cursor kinds exist on the wire:
//!
//! - **Id cursors** (timeline, post history): base64 (URL-safe, no padding)
//!   of the canonical hyphenated post-id string. V7 ids are time-ordered,
//!   so the id alone is a stable sort key.
//! - **Time cursors** (follower/following lists): the ISO-8601 `createdAt`
//!   of the previous page's last element, passed as-is.
//!
//! Invalid cursors of either kind are treated as absent — the caller gets
//! the first page, never an error.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::id::Id;

/// Encode an id cursor: base64 of the canonical id string.
pub fn encode_id_cursor<T>(id: Id<T>) -> String {
    URL_SAFE_NO_PAD.encode(id.to_string())
}

/// Decode an id cursor. Anything that is not base64 of a UUID string is
/// silently treated as "no cursor".
pub fn decode_id_cursor<T>(cursor: Option<&str>) -> Option<Id<T>> {
    let raw = URL_SAFE_NO_PAD.decode(cursor?).ok()?;
    let s = String::from_utf8(raw).ok()?;
    Id::parse(&s).ok()
}

/// Encode a time cursor as RFC 3339 (ISO-8601) with full precision.
pub fn encode_time_cursor(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
}

/// Decode a time cursor; malformed input means "first page".
pub fn decode_time_cursor(cursor: Option<&str>) -> Option<DateTime<Utc>> {
    let parsed = DateTime::parse_from_rfc3339(cursor?).ok()?;
    Some(parsed.with_timezone(&Utc))
}

/// Page envelope shared by every list endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub next_cursor: Option<String>,
    pub has_more: bool,
}

impl<T> Page<T> {
    pub fn new(data: Vec<T>, next_cursor: Option<String>, has_more: bool) -> Self {
        Self {
            data,
            pagination: Pagination {
                next_cursor,
                has_more,
            },
        }
    }
}

/// Clamp a requested page size into `[1, max]`, defaulting when absent.
pub fn clamp_limit(requested: Option<i64>, default: i64, max: i64) -> i64 {
    requested.unwrap_or(default).clamp(1, max)
}

/// Trim a `limit + 1` fetch down to `limit`, reporting whether more exist.
pub fn trim_results<T>(results: Vec<T>, limit: usize) -> (Vec<T>, bool) {
    let has_more = results.len() > limit;
    let results = if has_more {
        results.into_iter().take(limit).collect()
    } else {
        results
    };
    (results, has_more)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::entity_ids::PostId;
    use crate::common::id::IdGenerator;

    #[test]
    fn id_cursor_roundtrip() {
        let ids = IdGenerator::new();
        let id: PostId = ids.generate();
        let encoded = encode_id_cursor(id);
        assert_eq!(decode_id_cursor::<crate::common::entity_ids::Post>(Some(&encoded)), Some(id));
    }

    #[test]
    fn invalid_id_cursor_is_first_page() {
        assert_eq!(decode_id_cursor::<crate::common::entity_ids::Post>(None), None);
        assert_eq!(
            decode_id_cursor::<crate::common::entity_ids::Post>(Some("%%%not-base64%%%")),
            None
        );
        // Valid base64, but not a UUID underneath.
        let junk = URL_SAFE_NO_PAD.encode("hello world");
        assert_eq!(decode_id_cursor::<crate::common::entity_ids::Post>(Some(&junk)), None);
    }

    #[test]
    fn time_cursor_roundtrip() {
        let now = Utc::now();
        let encoded = encode_time_cursor(now);
        let decoded = decode_time_cursor(Some(&encoded)).unwrap();
        // RFC 3339 micros keeps enough precision for Postgres timestamps.
        assert_eq!(decoded.timestamp_micros(), now.timestamp_micros());
    }

    #[test]
    fn invalid_time_cursor_is_first_page() {
        assert_eq!(decode_time_cursor(Some("yesterday")), None);
        assert_eq!(decode_time_cursor(None), None);
    }

    #[test]
    fn clamp_limit_bounds() {
        assert_eq!(clamp_limit(None, 20, 100), 20);
        assert_eq!(clamp_limit(Some(50), 20, 100), 50);
        assert_eq!(clamp_limit(Some(500), 20, 100), 100);
        assert_eq!(clamp_limit(Some(0), 20, 100), 1);
        assert_eq!(clamp_limit(Some(-3), 20, 100), 1);
    }

    #[test]
    fn trim_results_detects_more() {
        let items: Vec<i32> = (1..=12).collect();
        let (trimmed, has_more) = trim_results(items, 10);
        assert_eq!(trimmed.len(), 10);
        assert!(has_more);

        let items: Vec<i32> = (1..=5).collect();
        let (trimmed, has_more) = trim_results(items, 10);
        assert_eq!(trimmed.len(), 5);
        assert!(!has_more);
    }
}
