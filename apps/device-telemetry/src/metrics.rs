use chrono::{DateTime, TimeDelta, TimeZone, Utc};

const SECONDS_PER_MINUTE: i64 = 60;

/// Floors `ts` to the start of its UTC minute.
pub fn truncate_to_minute(ts: DateTime<Utc>) -> DateTime<Utc> {
    let bucket = ts.timestamp().div_euclid(SECONDS_PER_MINUTE) * SECONDS_PER_MINUTE;
    Utc.timestamp_opt(bucket, 0).single().unwrap_or(ts)
}

/// Distinct heartbeat minutes over the inclusive minute span between the first
/// and last heartbeat, scaled to 100. The result is not clamped.
pub fn uptime_percentage(
    heartbeat_minute_count: usize,
    first_heartbeat: Option<DateTime<Utc>>,
    last_heartbeat: Option<DateTime<Utc>>,
) -> f64 {
    if heartbeat_minute_count == 0 {
        return 0.0;
    }

    let denominator = inclusive_minute_span(first_heartbeat, last_heartbeat).max(1);
    (heartbeat_minute_count as f64 / denominator as f64) * 100.0
}

/// Mean upload duration, truncated to whole nanoseconds.
pub fn average_upload_duration(duration_sum_ns: i128, count: u64) -> TimeDelta {
    if count == 0 {
        return TimeDelta::zero();
    }

    let avg = duration_sum_ns / i128::from(count);
    TimeDelta::nanoseconds(i64::try_from(avg).unwrap_or(i64::MAX))
}

fn inclusive_minute_span(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> i64 {
    let (Some(mut start), Some(mut end)) = (start, end) else {
        return 0;
    };
    if end < start {
        std::mem::swap(&mut start, &mut end);
    }

    (end - start).num_minutes() + 1
}
