//! The composed timestamp / location / weather text.

use std::fmt;

use chrono::{DateTime, TimeZone};

/// Format like `Tue, Mar 5, 2024, 9:07 AM`.
pub fn format_timestamp<Tz: TimeZone>(time: &DateTime<Tz>) -> String
where
    Tz::Offset: fmt::Display,
{
    time.format("%a, %b %-d, %Y, %-I:%M %p").to_string()
}

/// Render a number the way a browser prints it.
///
/// Shortest round-trip digits, with exponent notation below `1e-6` and from
/// `1e21` up. Negative zero prints as `0`.
pub fn format_number(value: f64) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        let text = if value > 0.0 { "Infinity" } else { "-Infinity" };
        return text.to_string();
    }
    if (1e-6..1e21).contains(&value.abs()) {
        return value.to_string();
    }

    let text = format!("{:e}", value);
    match text.split_once('e') {
        Some((mantissa, exponent)) if !exponent.starts_with('-') => {
            format!("{}e+{}", mantissa, exponent)
        }
        _ => text,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stamp {
    pub timestamp: String,
    /// `at {label}` or `at {address}`
    pub location: String,
    pub weather: String,
}

impl fmt::Display for Stamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}\n{}", self.timestamp, self.location, self.weather)
    }
}
