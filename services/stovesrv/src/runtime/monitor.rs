//! Background state monitor
//!
//! Polls `get_state` at a fixed interval and publishes snapshots that differ
//! from the last published one on a watch channel.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use common::shutdown::ShutdownSignal;

use crate::controller::{DeviceController, DeviceState};

/// Same device state, ignoring when it was read
fn same_reading(a: &DeviceState, b: &DeviceState) -> bool {
    let mut a = a.clone();
    a.last_refresh = b.last_refresh;
    a == *b
}

/// Spawn the monitor loop; it ends when `shutdown` is triggered
pub fn start_monitor(
    controller: Arc<DeviceController>,
    interval: Duration,
    shutdown: &ShutdownSignal,
) -> (JoinHandle<()>, watch::Receiver<DeviceState>) {
    let (tx, rx) = watch::channel(controller.snapshot());
    let stopped = shutdown.subscribe();

    let handle = tokio::spawn(async move {
        tokio::pin!(stopped);
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(interval_ms = interval.as_millis() as u64, "State monitor started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let state = controller.get_state().await;
                    let changed = tx.send_if_modified(|current| {
                        if same_reading(&state, current) {
                            false
                        } else {
                            *current = state;
                            true
                        }
                    });
                    if changed {
                        debug!("Published new stove state");
                    }
                }
                () = &mut stopped => {
                    info!("State monitor received shutdown signal");
                    break;
                }
            }
        }

        info!("State monitor terminated");
    });

    (handle, rx)
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;
    use crate::core::config::ControllerConfig;
    use crate::core::transport::{MockTransport, MockTransportConfig};
    use crate::protocols::palazzetti::constants::REGISTER_TEMPERATURE;
    use crate::protocols::palazzetti::{ExchangeBudget, ExchangePolicy, LinkTransport};

    #[tokio::test]
    async fn test_monitor_publishes_changes_and_stops() {
        let policy = ExchangePolicy {
            read: ExchangeBudget::new(2, Duration::from_millis(40), Duration::from_millis(25)),
            write: ExchangeBudget::new(2, Duration::from_millis(40), Duration::from_millis(25)),
            probe_timeout: Duration::from_millis(40),
        };
        let config = ControllerConfig {
            cache_ttl_ms: 1,
            ..Default::default()
        };
        let controller = Arc::new(DeviceController::new(LinkTransport::new(policy), config));
        let transport =
            MockTransport::new(MockTransportConfig::with_heartbeat(Duration::from_millis(4)));
        let stove = transport.handle();
        assert!(
            controller
                .connect_with(Box::new(transport), Duration::from_millis(100))
                .await
        );

        let shutdown = ShutdownSignal::new();
        let (handle, mut rx) =
            start_monitor(Arc::clone(&controller), Duration::from_millis(20), &shutdown);

        tokio::time::timeout(Duration::from_secs(2), rx.changed())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(rx.borrow_and_update().temperature, 21.0);

        stove.set_register(REGISTER_TEMPERATURE, &[0xE6, 0x00]);
        tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                rx.changed().await.unwrap();
                if rx.borrow_and_update().temperature == 23.0 {
                    break;
                }
            }
        })
        .await
        .unwrap();

        shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .unwrap()
            .unwrap();
    }

    #[test]
    fn test_same_reading_ignores_timestamp() {
        let a = DeviceState::new(22.0);
        let mut b = a.clone();
        b.last_refresh = Some(chrono::Utc::now());
        assert!(same_reading(&a, &b));

        b.temperature = 19.5;
        assert!(!same_reading(&a, &b));
    }
}
