//! CLI argument validators.

use crate::constants::MIN_MONITOR_INTERVAL_MS;

/// Parse a monitor interval, rejecting values below the minimum.
pub fn parse_interval_ms(s: &str) -> Result<u64, String> {
    let value: u64 = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number of milliseconds"))?;

    if value < MIN_MONITOR_INTERVAL_MS {
        return Err(format!(
            "interval must be at least {MIN_MONITOR_INTERVAL_MS} ms, got {value}"
        ));
    }

    Ok(value)
}

/// Parse a count that must be at least one.
pub fn parse_positive(s: &str) -> Result<usize, String> {
    let value: usize = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;

    if value == 0 {
        return Err("value must be at least 1".to_string());
    }

    Ok(value)
}
