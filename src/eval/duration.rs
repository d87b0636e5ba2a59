//! Duration helpers: nanosecond wire encoding and report rounding

use std::fmt::Write as _;
use std::time::Duration;

const MILLI: u128 = 1_000_000;
const DECI: u128 = 100_000_000;

/// Round a duration for display.
///
/// Durations under one second round to whole milliseconds, longer ones to
/// the nearest tenth of a second. Halves round up.
#[must_use]
pub fn round_duration(d: Duration) -> Duration {
    let unit = if d < Duration::from_secs(1) { MILLI } else { DECI };
    let nanos = d.as_nanos();
    let rounded = (nanos + unit / 2) / unit * unit;
    Duration::from_nanos(u64::try_from(rounded).unwrap_or(u64::MAX))
}

/// Render a duration compactly: `0s`, `12ms`, `1.2s`, `1m2.5s`, `2h0m1s`.
///
/// Sub-second values are shown in whole milliseconds, everything else with
/// at most one decimal of seconds. Apply [`round_duration`] first for
/// stable output.
#[must_use]
pub fn format_duration(d: Duration) -> String {
    if d.is_zero() {
        return "0s".to_string();
    }
    if d < Duration::from_secs(1) {
        let ms = d.as_nanos() / MILLI;
        if ms == 0 {
            return format!("{}µs", d.as_micros());
        }
        return format!("{ms}ms");
    }

    let tenths = d.as_nanos() / DECI;
    let hours = tenths / 36_000;
    let minutes = (tenths / 600) % 60;
    let secs = (tenths / 10) % 60;
    let frac = tenths % 10;

    let mut out = String::new();
    if hours > 0 {
        let _ = write!(out, "{hours}h{minutes}m");
    } else if minutes > 0 {
        let _ = write!(out, "{minutes}m");
    }
    if frac == 0 {
        let _ = write!(out, "{secs}s");
    } else {
        let _ = write!(out, "{secs}.{frac}s");
    }
    out
}

/// Serde adapter for durations encoded as integer nanoseconds.
pub(crate) mod nanos {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        let n = u64::try_from(d.as_nanos()).unwrap_or(u64::MAX);
        s.serialize_u64(n)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_nanos)
    }
}
