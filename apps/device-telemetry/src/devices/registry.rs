use super::{Device, DeviceError, DeviceResult};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Process-wide collection of device records. The registry's lock only guards
/// membership; each record carries its own lock for field mutation.
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    devices: RwLock<HashMap<String, Arc<Device>>>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if a new record was created.
    pub async fn insert_if_absent(&self, device_id: &str) -> bool {
        let mut devices = self.devices.write().await;
        match devices.entry(device_id.to_string()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(Arc::new(Device::new(device_id)));
                true
            }
        }
    }

    pub async fn get(&self, device_id: &str) -> DeviceResult<Arc<Device>> {
        self.devices
            .read()
            .await
            .get(device_id)
            .cloned()
            .ok_or_else(|| DeviceError::NotFound(device_id.to_string()))
    }

    pub async fn count(&self) -> usize {
        self.devices.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[tokio::test]
    async fn insert_is_idempotent() {
        let registry = DeviceRegistry::new();

        assert!(registry.insert_if_absent("dev-1").await);
        assert!(!registry.insert_if_absent("dev-1").await);
        assert!(registry.insert_if_absent("dev-2").await);

        assert_eq!(registry.count().await, 2);
    }

    #[tokio::test]
    async fn repeated_insert_keeps_existing_record() {
        let registry = DeviceRegistry::new();
        registry.insert_if_absent("dev-1").await;
        registry
            .get("dev-1")
            .await
            .unwrap()
            .record_heartbeat(Utc::now())
            .await;

        registry.insert_if_absent("dev-1").await;

        let snapshot = registry.get("dev-1").await.unwrap().snapshot().await;
        assert_eq!(snapshot.heartbeat_minute_count, 1);
    }

    #[tokio::test]
    async fn lookup_of_unknown_id_is_not_found() {
        let registry = DeviceRegistry::new();
        registry.insert_if_absent("dev-1").await;

        let err = registry.get("dev-404").await.unwrap_err();
        assert_eq!(err, DeviceError::NotFound("dev-404".to_string()));
        assert_eq!(registry.count().await, 1);
    }

    #[tokio::test]
    async fn lookups_share_one_record() {
        let registry = DeviceRegistry::new();
        registry.insert_if_absent("dev-1").await;

        let a = registry.get("dev-1").await.unwrap();
        let b = registry.get("dev-1").await.unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_inserts_of_same_id_create_one_record() {
        let registry = Arc::new(DeviceRegistry::new());
        let tasks = (0..32).map(|_| {
            let registry = registry.clone();
            tokio::spawn(async move { registry.insert_if_absent("dev-1").await })
        });

        let mut created = 0;
        for result in futures::future::join_all(tasks).await {
            if result.unwrap() {
                created += 1;
            }
        }

        assert_eq!(created, 1);
        assert_eq!(registry.count().await, 1);
    }
}
