//! Partition-file schema: table names, system keys, and the decimal
//! counter codec.
//!
//! Each partition file holds three named tables. `system` is a small
//! string map of metadata and stat counters, `value` maps opaque keys to
//! opaque values, and `expiration` maps keys to Unix-millisecond
//! timestamps encoded as decimal strings. Counters are decimal strings
//! too, so the file stays inspectable with any generic table dump.

use std::num::ParseIntError;

/// Name of the metadata/counter table.
pub const SYSTEM_TABLE: &str = "system";
/// Name of the opaque key/value table.
pub const VALUE_TABLE: &str = "value";
/// Name of the expiration-timestamp table.
pub const EXPIRATION_TABLE: &str = "expiration";

/// Current schema version, stored under [`VERSION_KEY`].
pub const SCHEMA_VERSION: &str = "1";

/// `system` key holding the schema version.
pub const VERSION_KEY: &str = "version";
/// `system` counter: distinct keys ever written. Never decremented.
pub const KEYS_COUNTER: &str = "keys";
/// `system` counter: keys carrying an expiration as of their last write.
pub const EXPIRES_COUNTER: &str = "expires";
/// `system` counter: total write commands processed, monotonic.
pub const WRITES_COUNTER: &str = "total_write_commands_processed";

/// Decodes a decimal-string counter. Absent or empty reads as zero.
///
/// # Errors
///
/// Fails when a present, non-empty value is not a decimal integer.
pub fn decode_counter(raw: Option<&str>) -> Result<i64, ParseIntError> {
    match raw {
        None | Some("") => Ok(0),
        Some(value) => value.parse(),
    }
}

/// Encodes a counter back to its decimal-string form.
#[must_use]
pub fn encode_counter(value: i64) -> String {
    value.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_and_empty_counters_read_as_zero() {
        assert_eq!(decode_counter(None).unwrap(), 0);
        assert_eq!(decode_counter(Some("")).unwrap(), 0);
    }

    #[test]
    fn counters_round_trip() {
        for value in [0, 1, -1, 42, i64::MAX, i64::MIN] {
            let encoded = encode_counter(value);
            assert_eq!(decode_counter(Some(&encoded)).unwrap(), value);
        }
    }

    #[test]
    fn garbage_counters_are_rejected() {
        assert!(decode_counter(Some("not-a-number")).is_err());
        assert!(decode_counter(Some("12.5")).is_err());
    }
}
