//! Shared helpers: errors, logging, confusion metrics, SVG charts and
//! console formatting.

pub mod charts;
pub mod error;
pub mod logging;
pub mod metrics;

pub use error::{DetectorError, Result};
pub use logging::{init_logging, LogConfig, TrainingLogger};
pub use metrics::ConfusionMatrix;

/// Seconds as `12.3s`, `4m 05s` or `2h 07m`
pub fn format_duration(seconds: f64) -> String {
    if seconds < 60.0 {
        return format!("{:.1}s", seconds.max(0.0));
    }
    let total = seconds.round() as u64;
    let (hours, rem) = (total / 3600, total % 3600);
    let (minutes, secs) = (rem / 60, rem % 60);
    if hours == 0 {
        format!("{}m {:02}s", minutes, secs)
    } else {
        format!("{}h {:02}m", hours, minutes)
    }
}

/// Count with `,` between thousands groups
pub fn format_number(n: usize) -> String {
    let digits = n.to_string();
    let head = digits.len() % 3;
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, digit) in digits.char_indices() {
        if i != 0 && (i + 3 - head) % 3 == 0 {
            out.push(',');
        }
        out.push(digit);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0.31), "0.3s");
        assert_eq!(format_duration(42.0), "42.0s");
        assert_eq!(format_duration(65.0), "1m 05s");
        assert_eq!(format_duration(3720.0), "1h 02m");
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(7), "7");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1200), "1,200");
        assert_eq!(format_number(12_000), "12,000");
        assert_eq!(format_number(3_456_789), "3,456,789");
    }
}
