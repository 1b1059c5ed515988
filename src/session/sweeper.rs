use crate::session::registry::SessionRegistry;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

/// Run the expiry sweep on a fixed interval, independent of traffic.
///
/// The first tick fires one full `interval` after spawning. Abort the
/// returned handle to stop sweeping.
pub fn spawn_expiry_sweep(
    registry: SessionRegistry,
    interval: Duration,
    timeout: Duration,
) -> JoinHandle<()> {
    log::info!(
        "Session expiry sweep every {:?}, lifetime cap {:?}",
        interval,
        timeout
    );

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let expired = registry.sweep_expired(Instant::now(), timeout).await;
            if !expired.is_empty() {
                log::info!("Expiry sweep removed {} session(s)", expired.len());
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::ConnectionHandle;

    #[tokio::test]
    async fn test_sweep_task_evicts_expired_sessions() {
        let registry = SessionRegistry::default();
        let (host, _rx) = ConnectionHandle::new();
        let id = registry.create_session(host).await;

        let task = spawn_expiry_sweep(
            registry.clone(),
            Duration::from_millis(20),
            Duration::from_millis(10),
        );
        tokio::time::sleep(Duration::from_millis(100)).await;
        task.abort();

        assert!(!registry.contains(&id).await);
    }

    #[tokio::test]
    async fn test_sweep_task_keeps_young_sessions() {
        let registry = SessionRegistry::default();
        let (host, _rx) = ConnectionHandle::new();
        let id = registry.create_session(host).await;

        let task = spawn_expiry_sweep(
            registry.clone(),
            Duration::from_millis(10),
            Duration::from_secs(60),
        );
        tokio::time::sleep(Duration::from_millis(50)).await;
        task.abort();

        assert!(registry.contains(&id).await);
    }
}
