//! Fixed-point `<seconds>.<fraction>` timestamps used by the remote store.
//!
//! The remote store reports `modifydate`/`createdate` as decimal Unix seconds
//! with microsecond precision. The mirror writes these instants straight into
//! file modification times, so parsing and formatting must round-trip exactly
//! at microsecond granularity.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::{Error, Result};

const FRACTION_DIGITS: usize = 9;

/// Parse a fixed-point timestamp such as `1493471435.803190`.
///
/// The fraction is a decimal fraction of a second: `.5` is half a second.
/// Digits beyond nanosecond precision are dropped.
pub fn parse(value: &str) -> Result<SystemTime> {
    let trimmed = value.trim();
    let invalid = || Error::InvalidTimestamp(value.to_string());

    let (seconds, fraction) = trimmed.split_once('.').unwrap_or((trimmed, ""));
    if seconds.is_empty() || !seconds.bytes().all(|byte| byte.is_ascii_digit()) {
        return Err(invalid());
    }
    if !fraction.bytes().all(|byte| byte.is_ascii_digit()) {
        return Err(invalid());
    }

    let seconds = seconds.parse::<u64>().map_err(|_| invalid())?;
    let nanos = fraction
        .chars()
        .chain(std::iter::repeat('0'))
        .take(FRACTION_DIGITS)
        .collect::<String>()
        .parse::<u32>()
        .map_err(|_| invalid())?;

    UNIX_EPOCH
        .checked_add(Duration::new(seconds, nanos))
        .ok_or_else(invalid)
}

/// Format an instant as `<seconds>.<microseconds>` with six fraction digits.
pub fn format(instant: SystemTime) -> Result<String> {
    let since_epoch = instant.duration_since(UNIX_EPOCH).map_err(|_| {
        Error::InvalidTimestamp(format!("{instant:?} is before the Unix epoch"))
    })?;
    Ok(format!(
        "{}.{:06}",
        since_epoch.as_secs(),
        since_epoch.subsec_micros()
    ))
}

/// Human-readable UTC rendering for logs and CLI output.
pub fn display(instant: SystemTime) -> String {
    chrono::DateTime::<chrono::Utc>::from(instant)
        .format("%Y-%m-%d %H:%M:%S%.6f UTC")
        .to_string()
}
