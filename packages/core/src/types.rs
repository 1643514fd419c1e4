//! Result types returned by reads and stat aggregation.

/// Result of a point read.
///
/// `value` is `None` when the key is absent or its expiration has
/// elapsed. The raw expiration is returned either way, so callers can
/// still observe a lazily-expired entry.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Lookup {
    /// Live value; suppressed when the expiration has elapsed.
    pub value: Option<Vec<u8>>,
    /// Stored expiration in Unix milliseconds, even when already past.
    pub expires_at: Option<i64>,
}

/// Aggregate stat counters, summed over locally materialized partitions.
///
/// Partitions the process has never touched contribute zero, so the
/// aggregate is approximate after a cold start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DbInfo {
    /// Distinct keys ever written (monotonic high-water mark).
    pub keys: i64,
    /// Keys carrying an expiration as of their last write.
    pub expires: i64,
    /// Total write commands processed.
    pub total_write_commands_processed: i64,
}
