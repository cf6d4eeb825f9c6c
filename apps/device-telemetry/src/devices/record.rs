use super::{DeviceError, DeviceResult};
use crate::metrics;
use chrono::{DateTime, TimeDelta, Utc};
use std::collections::BTreeSet;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct DeviceCounters {
    heartbeat_minutes: BTreeSet<DateTime<Utc>>,
    first_heartbeat: Option<DateTime<Utc>>,
    last_heartbeat: Option<DateTime<Utc>>,
    upload_count: u64,
    upload_duration_sum_ns: i128,
}

/// Aggregate state for one device. All field access goes through the record's
/// own lock, so devices never contend with each other.
#[derive(Debug)]
pub struct Device {
    id: String,
    counters: RwLock<DeviceCounters>,
}

/// Point-in-time copy of a device's counters, safe to reduce without holding
/// any lock.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceSnapshot {
    pub heartbeat_minute_count: usize,
    pub first_heartbeat: Option<DateTime<Utc>>,
    pub last_heartbeat: Option<DateTime<Utc>>,
    pub upload_count: u64,
    pub upload_duration_sum_ns: i128,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadTotals {
    pub upload_count: u64,
    pub upload_duration_sum_ns: i128,
}

impl Device {
    pub(super) fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            counters: RwLock::new(DeviceCounters::default()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Records a heartbeat at minute granularity. Returns `true` when the
    /// truncated minute had not been seen before.
    pub async fn record_heartbeat(&self, timestamp: DateTime<Utc>) -> bool {
        let minute = metrics::truncate_to_minute(timestamp);

        let mut counters = self.counters.write().await;
        let created = counters.heartbeat_minutes.insert(minute);

        if counters.first_heartbeat.map_or(true, |first| minute < first) {
            counters.first_heartbeat = Some(minute);
        }
        if counters.last_heartbeat.map_or(true, |last| minute > last) {
            counters.last_heartbeat = Some(minute);
        }

        created
    }

    pub async fn record_upload(&self, duration: TimeDelta) -> DeviceResult<UploadTotals> {
        if duration < TimeDelta::zero() {
            return Err(DeviceError::InvalidArgument(
                "upload duration must be >= 0".to_string(),
            ));
        }
        let nanos = duration.num_nanoseconds().ok_or_else(|| {
            DeviceError::InvalidArgument("upload duration is out of range".to_string())
        })?;

        let mut counters = self.counters.write().await;
        counters.upload_count += 1;
        counters.upload_duration_sum_ns += i128::from(nanos);

        Ok(UploadTotals {
            upload_count: counters.upload_count,
            upload_duration_sum_ns: counters.upload_duration_sum_ns,
        })
    }

    pub async fn snapshot(&self) -> DeviceSnapshot {
        let counters = self.counters.read().await;
        DeviceSnapshot {
            heartbeat_minute_count: counters.heartbeat_minutes.len(),
            first_heartbeat: counters.first_heartbeat,
            last_heartbeat: counters.last_heartbeat,
            upload_count: counters.upload_count,
            upload_duration_sum_ns: counters.upload_duration_sum_ns,
        }
    }
}

impl DeviceSnapshot {
    pub fn uptime_percentage(&self) -> f64 {
        metrics::uptime_percentage(
            self.heartbeat_minute_count,
            self.first_heartbeat,
            self.last_heartbeat,
        )
    }

    pub fn average_upload_duration(&self) -> TimeDelta {
        metrics::average_upload_duration(self.upload_duration_sum_ns, self.upload_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::Arc;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, h, m, s).unwrap()
    }

    #[tokio::test]
    async fn new_device_is_unseen() {
        let device = Device::new("dev-1");
        let snapshot = device.snapshot().await;

        assert_eq!(device.id(), "dev-1");
        assert_eq!(snapshot.heartbeat_minute_count, 0);
        assert_eq!(snapshot.first_heartbeat, None);
        assert_eq!(snapshot.last_heartbeat, None);
        assert_eq!(snapshot.uptime_percentage(), 0.0);
        assert_eq!(snapshot.average_upload_duration(), TimeDelta::zero());
    }

    #[tokio::test]
    async fn heartbeats_in_same_minute_count_once() {
        let device = Device::new("dev-1");

        assert!(device.record_heartbeat(at(12, 0, 5)).await);
        assert!(!device.record_heartbeat(at(12, 0, 59)).await);

        let snapshot = device.snapshot().await;
        assert_eq!(snapshot.heartbeat_minute_count, 1);
        assert_eq!(snapshot.first_heartbeat, Some(at(12, 0, 0)));
        assert_eq!(snapshot.last_heartbeat, Some(at(12, 0, 0)));
    }

    #[tokio::test]
    async fn heartbeat_range_extends_both_ways() {
        let device = Device::new("dev-1");
        device.record_heartbeat(at(12, 10, 0)).await;
        device.record_heartbeat(at(12, 2, 30)).await;
        device.record_heartbeat(at(12, 20, 1)).await;
        device.record_heartbeat(at(12, 15, 0)).await;

        let snapshot = device.snapshot().await;
        assert_eq!(snapshot.heartbeat_minute_count, 4);
        assert_eq!(snapshot.first_heartbeat, Some(at(12, 2, 0)));
        assert_eq!(snapshot.last_heartbeat, Some(at(12, 20, 0)));
    }

    #[tokio::test]
    async fn uptime_from_two_heartbeats_over_five_minutes() {
        let device = Device::new("dev-1");
        device.record_heartbeat(at(12, 0, 0)).await;
        device.record_heartbeat(at(12, 4, 30)).await;

        assert_eq!(device.snapshot().await.uptime_percentage(), 40.0);
    }

    #[tokio::test]
    async fn negative_upload_is_rejected_without_mutation() {
        let device = Device::new("dev-1");
        device
            .record_upload(TimeDelta::milliseconds(250))
            .await
            .unwrap();
        let before = device.snapshot().await;

        let err = device
            .record_upload(TimeDelta::nanoseconds(-1))
            .await
            .unwrap_err();
        assert!(matches!(err, DeviceError::InvalidArgument(_)));
        assert_eq!(device.snapshot().await, before);
    }

    #[tokio::test]
    async fn uploads_accumulate_and_average_truncates() {
        let device = Device::new("dev-1");
        device.record_upload(TimeDelta::milliseconds(1000)).await.unwrap();
        device.record_upload(TimeDelta::milliseconds(1000)).await.unwrap();
        let totals = device
            .record_upload(TimeDelta::milliseconds(1500))
            .await
            .unwrap();

        assert_eq!(totals.upload_count, 3);
        assert_eq!(totals.upload_duration_sum_ns, 3_500_000_000);
        let avg = device.snapshot().await.average_upload_duration();
        assert_eq!(avg.num_milliseconds(), 1166);
    }

    #[tokio::test]
    async fn zero_duration_upload_is_accepted() {
        let device = Device::new("dev-1");
        let totals = device.record_upload(TimeDelta::zero()).await.unwrap();
        assert_eq!(totals.upload_count, 1);
        assert_eq!(totals.upload_duration_sum_ns, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_uploads_are_all_counted() {
        let device = Arc::new(Device::new("dev-1"));
        let tasks = (0..64).map(|_| {
            let device = device.clone();
            tokio::spawn(async move {
                device
                    .record_upload(TimeDelta::milliseconds(10))
                    .await
                    .unwrap();
            })
        });
        for result in futures::future::join_all(tasks).await {
            result.unwrap();
        }

        let snapshot = device.snapshot().await;
        assert_eq!(snapshot.upload_count, 64);
        assert_eq!(snapshot.upload_duration_sum_ns, 640_000_000);
    }
}
