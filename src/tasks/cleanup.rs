//! TTL Cleanup Task
//!
//! Background task that periodically drops expired gateway entries.
//!
//! Only the gateway is swept. The key registry keeps naming expired keys
//! until they are removed explicitly.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::MemoryGateway;

/// Spawns a background task that sweeps expired entries every
/// `cleanup_interval_secs` seconds.
///
/// Returns the task handle so shutdown can abort it.
pub fn spawn_cleanup_task(gateway: Arc<MemoryGateway>, cleanup_interval_secs: u64) -> JoinHandle<()> {
    let interval = Duration::from_secs(cleanup_interval_secs.max(1));

    tokio::spawn(async move {
        info!(
            bucket = gateway.name(),
            "Starting TTL cleanup task with interval of {} seconds",
            interval.as_secs()
        );

        loop {
            tokio::time::sleep(interval).await;

            let removed = gateway.cleanup_expired();
            if removed > 0 {
                info!("TTL cleanup: removed {} expired entries", removed);
            } else {
                debug!("TTL cleanup: no expired entries found");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheGateway;

    #[tokio::test]
    async fn test_cleanup_task_removes_expired_entries() {
        let gateway = Arc::new(MemoryGateway::new("test", 100));
        gateway
            .set("expire_soon", b"value", Duration::from_millis(200))
            .unwrap();
        gateway.set("long_lived", b"value", Duration::from_secs(3600)).unwrap();

        let handle = spawn_cleanup_task(gateway.clone(), 1);
        tokio::time::sleep(Duration::from_millis(1500)).await;

        // swept without anyone reading it
        assert_eq!(gateway.len(), 1);
        assert!(gateway.get("long_lived").unwrap().is_some());

        handle.abort();
    }
}
