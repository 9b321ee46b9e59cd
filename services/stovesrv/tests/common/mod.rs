//! Test Common Utilities
//!
//! Builders for a controller wired to the simulated stove

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use stovesrv::controller::DeviceController;
use stovesrv::core::config::ControllerConfig;
use stovesrv::core::transport::{MockStoveHandle, MockTransport, MockTransportConfig};
use stovesrv::protocols::palazzetti::constants::{
    REGISTER_ALARM_STATUS, REGISTER_CHRONO_STATUS, REGISTER_ERROR_CODE, REGISTER_POWER_LEVEL,
    REGISTER_SETPOINT_8BYTES, REGISTER_STATUS, REGISTER_TEMPERATURE,
};
use stovesrv::protocols::palazzetti::{
    ExchangeBudget, ExchangePolicy, LinkTransport, RegisterAddress,
};

pub const HEARTBEAT: Duration = Duration::from_millis(4);
pub const CONNECT_TIMEOUT: Duration = Duration::from_millis(200);

/// Registers read by one full refresh pass, in wire order
pub const REFRESH_SEQUENCE: [RegisterAddress; 7] = [
    REGISTER_STATUS,
    REGISTER_TEMPERATURE,
    REGISTER_SETPOINT_8BYTES,
    REGISTER_ERROR_CODE,
    REGISTER_ALARM_STATUS,
    REGISTER_CHRONO_STATUS,
    REGISTER_POWER_LEVEL,
];

/// Short budgets, still generous against a 4 ms heartbeat
pub fn test_policy() -> ExchangePolicy {
    ExchangePolicy {
        read: ExchangeBudget::new(3, Duration::from_millis(200), Duration::from_millis(100)),
        write: ExchangeBudget::new(2, Duration::from_millis(200), Duration::from_millis(100)),
        probe_timeout: Duration::from_millis(100),
    }
}

pub fn simulated_stove() -> MockTransport {
    MockTransport::new(MockTransportConfig::with_heartbeat(HEARTBEAT))
}

/// Controller connected to a fresh simulated stove
pub async fn connected_controller(config: ControllerConfig) -> (Arc<DeviceController>, MockStoveHandle) {
    let controller = Arc::new(DeviceController::new(LinkTransport::new(test_policy()), config));
    let transport = simulated_stove();
    let stove = transport.handle();
    assert!(
        controller
            .connect_with(Box::new(transport), CONNECT_TIMEOUT)
            .await,
        "simulated stove should answer"
    );
    (controller, stove)
}

/// Split a read log into refresh passes; panics if any pass is out of order
pub fn refresh_passes(reads: &[RegisterAddress]) -> usize {
    assert_eq!(
        reads.len() % REFRESH_SEQUENCE.len(),
        0,
        "partial refresh pass in {reads:?}"
    );
    for pass in reads.chunks(REFRESH_SEQUENCE.len()) {
        assert_eq!(pass, REFRESH_SEQUENCE, "interleaved refresh pass");
    }
    reads.len() / REFRESH_SEQUENCE.len()
}
