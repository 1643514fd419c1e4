//! Wall-clock helpers and the lazy-expiry rule.

use std::time::{SystemTime, UNIX_EPOCH};

/// Current wall-clock time as milliseconds since the Unix epoch.
///
/// Millisecond timestamps fit comfortably in i64 until the year 292 million.
#[allow(clippy::cast_possible_truncation)]
#[must_use]
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

/// Whether an expiration timestamp has elapsed at `now`.
///
/// Expiry is inclusive: a key whose timestamp equals the current instant
/// is already expired.
#[must_use]
pub fn is_elapsed(pxat_millis: i64, now: i64) -> bool {
    pxat_millis <= now
}
