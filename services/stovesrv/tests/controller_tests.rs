//! Device controller integration tests against the simulated stove

#![allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable

mod common;

use std::time::Duration;

use stovesrv::controller::LINK_LOST_MESSAGE;
use stovesrv::core::config::ControllerConfig;
use stovesrv::protocols::palazzetti::constants::{
    REGISTER_POWER_CONTROL, REGISTER_SETPOINT, REGISTER_SETPOINT_8BYTES, REGISTER_STATUS,
    REGISTER_TEMPERATURE,
};
use stovesrv::protocols::palazzetti::StoveStatus;
use stovesrv::StoveSrvError;

use common::{connected_controller, refresh_passes};

#[tokio::test]
async fn test_two_reads_within_ttl_share_one_pass() {
    let (controller, stove) = connected_controller(ControllerConfig::default()).await;

    let first = controller.get_state().await;
    let second = controller.get_state().await;

    assert!(first.synchronized);
    assert_eq!(first, second);
    assert_eq!(refresh_passes(&stove.read_addresses()), 1);
}

#[tokio::test]
async fn test_expired_cache_refreshes_again() {
    let config = ControllerConfig {
        cache_ttl_ms: 30,
        ..Default::default()
    };
    let (controller, stove) = connected_controller(config).await;

    controller.get_state().await;
    tokio::time::sleep(Duration::from_millis(60)).await;
    stove.set_register(REGISTER_TEMPERATURE, &[0xDC, 0x00]);
    let state = controller.get_state().await;

    assert_eq!(state.temperature, 22.0);
    assert_eq!(refresh_passes(&stove.read_addresses()), 2);
}

#[tokio::test]
async fn test_out_of_range_setpoint_never_reaches_the_wire() {
    let (controller, stove) = connected_controller(ControllerConfig::default()).await;

    let err = controller.set_temperature(14.9).await.unwrap_err();
    assert!(matches!(err, StoveSrvError::ValidationError(_)));
    assert!(controller.set_temperature(27.5).await.is_err());
    assert!(controller.set_temperature(f32::NAN).await.is_err());

    assert_eq!(stove.write_count(), 0);
    assert!(stove.requests().is_empty());
}

#[tokio::test]
async fn test_valid_setpoint_is_one_write() {
    let (controller, stove) = connected_controller(ControllerConfig::default()).await;

    assert!(controller.set_temperature(22.0).await.unwrap());

    assert_eq!(stove.write_count(), 1);
    assert_eq!(stove.writes_to(REGISTER_SETPOINT), vec![vec![110]]);

    // The follow-up refresh confirms the value from the stove
    let state = controller.snapshot();
    assert_eq!(state.setpoint, 22.0);
    assert!(state.setpoint_confirmed);
    assert_eq!(stove.register(REGISTER_SETPOINT_8BYTES)[1], 110);
}

#[tokio::test]
async fn test_half_degree_setpoint() {
    let (controller, stove) = connected_controller(ControllerConfig::default()).await;

    assert!(controller.set_temperature(20.5).await.unwrap());
    assert_eq!(stove.writes_to(REGISTER_SETPOINT), vec![vec![103]]);
    assert_eq!(controller.snapshot().setpoint, 20.6);
}

#[tokio::test]
async fn test_unconfirmed_setpoint_kept_when_readback_fails() {
    let (controller, stove) = connected_controller(ControllerConfig::default()).await;
    controller.get_state().await;

    stove.fail_register(REGISTER_SETPOINT_8BYTES);
    assert!(controller.set_temperature(24.0).await.unwrap());

    let state = controller.snapshot();
    assert_eq!(state.setpoint, 24.0);
    assert!(!state.setpoint_confirmed);
    // status and temperature still make quorum
    assert!(state.synchronized);
}

#[tokio::test]
async fn test_power_on_reflected_after_refresh() {
    let (controller, stove) = connected_controller(ControllerConfig::default()).await;

    assert!(controller.set_power(true).await);
    assert_eq!(stove.writes_to(REGISTER_POWER_CONTROL), vec![vec![1]]);

    let state = controller.get_state().await;
    assert!(state.power);
    assert_eq!(state.status, StoveStatus::HeatUp);

    assert!(controller.set_power(false).await);
    let state = controller.snapshot();
    assert!(!state.power);
    assert_eq!(state.status, StoveStatus::Off);
}

#[tokio::test]
async fn test_below_quorum_keeps_stale_values() {
    let (controller, stove) = connected_controller(ControllerConfig::default()).await;
    let before = controller.force_state_refresh().await;

    stove.set_register(REGISTER_STATUS, &[6]);
    stove.fail_register(REGISTER_STATUS);
    stove.fail_register(REGISTER_TEMPERATURE);

    let after = controller.force_state_refresh().await;
    assert!(after.connected);
    assert!(!after.synchronized);
    assert_eq!(after.status, before.status);
    assert_eq!(after.temperature, before.temperature);
    assert!(after.last_refresh > before.last_refresh);

    stove.restore_register(REGISTER_STATUS);
    stove.restore_register(REGISTER_TEMPERATURE);
    let recovered = controller.force_state_refresh().await;
    assert!(recovered.synchronized);
    assert_eq!(recovered.status, StoveStatus::Burning);
}

#[tokio::test]
async fn test_silent_stove_reports_link_lost() {
    let (controller, stove) = connected_controller(ControllerConfig::default()).await;
    assert!(controller.is_connected().await);

    stove.set_heartbeat(false);
    stove.set_responding(false);

    assert!(!controller.is_connected().await);
    let state = controller.get_state().await;
    assert!(!state.connected);
    assert!(!state.synchronized);
    assert_eq!(state.error_message, LINK_LOST_MESSAGE);

    // Commands fail softly
    assert!(!controller.set_power(true).await);
    assert!(!controller.set_temperature(21.0).await.unwrap());

    stove.set_heartbeat(true);
    stove.set_responding(true);
    let state = controller.get_state().await;
    assert!(state.connected);
    assert!(state.synchronized);
    assert_eq!(state.error_message, "No error");
}

#[tokio::test]
async fn test_corrupted_responses_are_retried() {
    let (controller, stove) = connected_controller(ControllerConfig::default()).await;

    stove.corrupt_next_responses(1);
    let state = controller.force_state_refresh().await;

    assert!(state.synchronized);
    assert_eq!(state.temperature, 21.0);
    let stats = controller.link_stats();
    assert!(stats.retries >= 1);
    assert!(stats.discarded_bytes > 0);
}

#[tokio::test]
async fn test_disconnect_then_commands() {
    let (controller, _stove) = connected_controller(ControllerConfig::default()).await;
    controller.disconnect().await;

    assert!(!controller.is_connected().await);
    assert!(!controller.set_chrono_status(true).await);
    assert!(controller.get_pellet_consumption().await.is_none());
    assert!(!controller.snapshot().connected);
}

#[tokio::test]
async fn test_disconnect_during_refresh_clears_synchronized() {
    let (controller, stove) = connected_controller(ControllerConfig::default()).await;
    // Keeps the pass on the wire long enough for the disconnect to land mid-sequence
    stove.fail_register(REGISTER_SETPOINT_8BYTES);

    let refresh = tokio::spawn({
        let controller = controller.clone();
        async move { controller.force_state_refresh().await }
    });
    tokio::time::sleep(Duration::from_millis(60)).await;
    controller.disconnect().await;

    let returned = refresh.await.unwrap();
    assert!(!(returned.synchronized && !returned.connected));

    let state = controller.snapshot();
    assert!(!state.connected);
    assert!(!state.synchronized);
}
