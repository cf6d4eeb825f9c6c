use chrono::{DateTime, TimeDelta, Utc};

const NANOS_PER_MICRO: u64 = 1_000;
const NANOS_PER_MILLI: u64 = 1_000_000;
const NANOS_PER_SECOND: u64 = 1_000_000_000;
const NANOS_PER_MINUTE: u64 = 60 * NANOS_PER_SECOND;
const NANOS_PER_HOUR: u64 = 60 * NANOS_PER_MINUTE;

/// Strict RFC3339: uppercase `T` date/time separator, uppercase `Z` or a
/// numeric offset, and no surrounding whitespace.
pub fn parse_rfc3339_utc(raw: &str) -> Option<DateTime<Utc>> {
    if raw.as_bytes().get(10) != Some(&b'T') || raw.ends_with('z') {
        return None;
    }
    if raw.starts_with(char::is_whitespace) || raw.ends_with(char::is_whitespace) {
        return None;
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Renders a duration as `1h2m3.5s`, `1.5ms`, `750ns`, or `0s`: largest units
/// first, sub-second values in the largest whole unit, trailing fractional
/// zeros dropped.
pub fn format_duration(duration: TimeDelta) -> String {
    let negative = duration < TimeDelta::zero();
    let nanos = duration
        .num_nanoseconds()
        .map(|n| n.unsigned_abs())
        .unwrap_or(u64::MAX);

    let body = if nanos == 0 {
        "0s".to_string()
    } else if nanos < NANOS_PER_MICRO {
        format!("{nanos}ns")
    } else if nanos < NANOS_PER_MILLI {
        format!("{}µs", decimal(nanos, NANOS_PER_MICRO, 3))
    } else if nanos < NANOS_PER_SECOND {
        format!("{}ms", decimal(nanos, NANOS_PER_MILLI, 6))
    } else {
        let hours = nanos / NANOS_PER_HOUR;
        let minutes = (nanos % NANOS_PER_HOUR) / NANOS_PER_MINUTE;
        let seconds = decimal(nanos % NANOS_PER_MINUTE, NANOS_PER_SECOND, 9);

        let mut out = String::new();
        if hours > 0 {
            out.push_str(&format!("{hours}h"));
        }
        if hours > 0 || minutes > 0 {
            out.push_str(&format!("{minutes}m"));
        }
        out.push_str(&format!("{seconds}s"));
        out
    };

    if negative {
        format!("-{body}")
    } else {
        body
    }
}

fn decimal(value: u64, unit: u64, digits: usize) -> String {
    let whole = value / unit;
    let frac = value % unit;
    if frac == 0 {
        return whole.to_string();
    }
    let frac = format!("{frac:0digits$}");
    format!("{whole}.{}", frac.trim_end_matches('0'))
}
