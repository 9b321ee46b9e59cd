//! Link transport integration tests against the simulated stove

#![allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable

mod common;

use std::sync::Arc;
use std::time::Duration;

use stovesrv::protocols::palazzetti::constants::{
    READ_ID, REGISTER_POWER_LEVEL, REGISTER_STATUS, REGISTER_TEMPERATURE,
};
use stovesrv::protocols::palazzetti::{AttemptFailure, ExchangeError, LinkTransport};

use common::{simulated_stove, test_policy, CONNECT_TIMEOUT};

#[tokio::test]
async fn test_silent_device_exhausts_without_panic() {
    let link = LinkTransport::new(test_policy());
    let transport = simulated_stove();
    let stove = transport.handle();
    assert!(link.connect_with(Box::new(transport), CONNECT_TIMEOUT).await);

    stove.set_heartbeat(false);
    stove.set_responding(false);

    let err = link.send_read(REGISTER_STATUS).await.unwrap_err();
    assert_eq!(
        err,
        ExchangeError::Exhausted {
            attempts: 3,
            last: AttemptFailure::SyncTimeout,
        }
    );
    // Never got far enough to put a request on the wire
    assert!(stove.requests().is_empty());
    assert!(!link.is_connected().await);

    let stats = link.stats();
    assert_eq!(stats.failures, 1);
    assert_eq!(stats.retries, 2);
    assert_eq!(stats.failed_probes, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_reads_get_their_own_response() {
    let link = Arc::new(LinkTransport::new(test_policy()));
    let transport = simulated_stove();
    let stove = transport.handle();
    assert!(link.connect_with(Box::new(transport), CONNECT_TIMEOUT).await);
    stove.set_register(REGISTER_STATUS, &[6]);

    let cases = [
        (REGISTER_STATUS, 6u8),
        (REGISTER_TEMPERATURE, 0xD2),
        (REGISTER_POWER_LEVEL, 3),
    ];
    let tasks: Vec<_> = (0..4)
        .flat_map(|_| cases)
        .map(|(address, expected)| {
            let link = Arc::clone(&link);
            tokio::spawn(async move {
                let frame = link.send_read(address).await.unwrap();
                assert_eq!(frame.id(), READ_ID);
                assert_eq!(frame.payload()[0], expected);
            })
        })
        .collect();

    for task in futures::future::join_all(tasks).await {
        task.unwrap();
    }
    assert_eq!(stove.read_count(), 12);
    assert_eq!(link.stats().failures, 0);
}

#[tokio::test]
async fn test_disconnect_waits_for_inflight_exchange() {
    let link = Arc::new(LinkTransport::new(test_policy()));
    let transport = simulated_stove();
    let stove = transport.handle();
    assert!(link.connect_with(Box::new(transport), CONNECT_TIMEOUT).await);
    stove.set_responding(false);

    let reader = {
        let link = Arc::clone(&link);
        tokio::spawn(async move { link.send_read(REGISTER_STATUS).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    link.disconnect().await;

    // The exchange ran its full budget instead of seeing the link vanish
    let err = reader.await.unwrap().unwrap_err();
    assert!(matches!(
        err,
        ExchangeError::Exhausted {
            last: AttemptFailure::ResponseTimeout,
            ..
        }
    ));
    assert_eq!(
        link.send_read(REGISTER_STATUS).await.unwrap_err(),
        ExchangeError::LinkUnavailable
    );
}

#[tokio::test]
async fn test_reconnect_replaces_session() {
    let link = LinkTransport::new(test_policy());
    let first = simulated_stove();
    let first_stove = first.handle();
    assert!(link.connect_with(Box::new(first), CONNECT_TIMEOUT).await);
    first_stove.set_heartbeat(false);
    assert!(!link.is_connected().await);

    let second = simulated_stove();
    let second_stove = second.handle();
    assert!(link.connect_with(Box::new(second), CONNECT_TIMEOUT).await);
    assert!(link.is_connected().await);

    link.send_read(REGISTER_TEMPERATURE).await.unwrap();
    assert_eq!(second_stove.read_count(), 1);
    assert_eq!(first_stove.read_count(), 0);
}
