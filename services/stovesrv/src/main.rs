//! Stove Link Service (stovesrv)

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info, warn};

use common::service_bootstrap::{load_development_env, print_startup_banner, ServiceInfo};
use common::shutdown::{wait_for_shutdown, ShutdownSignal};
use errors::{ServiceError, ServiceErrorTrait, ServiceResult};

use stovesrv::core::bootstrap::{self, Args};
use stovesrv::core::transport::{MockTransport, MockTransportConfig};
use stovesrv::runtime::start_monitor;
use stovesrv::{DeviceController, LinkTransport};

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(code = e.error_code(), "stovesrv failed: {e}");
            eprintln!("stovesrv: {e}");
            ExitCode::from(e.exit_code())
        },
    }
}

async fn run() -> ServiceResult<()> {
    load_development_env();
    let args = Args::parse();

    let service_info = ServiceInfo::new(
        "stovesrv",
        env!("CARGO_PKG_VERSION"),
        "Pellet Stove Serial Link Service",
    );

    let config = bootstrap::resolve_config(&args, &service_info)?;
    bootstrap::initialize_logging(&args, &service_info, &config)?;
    let endpoint = if config.serial.simulate {
        "simulator"
    } else {
        config.serial.port.as_str()
    };
    if !args.no_color {
        print_startup_banner(&service_info, endpoint);
    }
    bootstrap::log_configuration(&config);

    if args.validate {
        info!("Validation completed successfully");
        return Ok(());
    }

    let controller = Arc::new(DeviceController::new(
        LinkTransport::new(config.link.policy()),
        config.controller.clone(),
    ));

    let connect_timeout = config.serial.connect_timeout();
    let connected = if config.serial.simulate {
        let transport = MockTransport::new(MockTransportConfig::default());
        controller
            .connect_with(Box::new(transport), connect_timeout)
            .await
    } else {
        controller
            .connect(&config.serial.port, config.serial.baud_rate, connect_timeout)
            .await
    };
    if !connected {
        return Err(ServiceError::connection_failed(
            endpoint,
            format!("no SYNC frame within {connect_timeout:?}"),
        ));
    }

    let state = controller.force_state_refresh().await;
    info!(
        "Stove {} ({}), room {:.1} °C, setpoint {:.1} °C",
        state.status_name,
        if state.synchronized { "synchronized" } else { "partial read" },
        state.temperature,
        state.setpoint
    );
    if state.error_code != 0 {
        warn!("Stove reports error {}: {}", state.error_code, state.error_message);
    }

    let shutdown = ShutdownSignal::new();
    let monitor = if config.monitor.enabled {
        let (handle, mut updates) = start_monitor(
            Arc::clone(&controller),
            config.monitor.interval(),
            &shutdown,
        );
        let logger = tokio::spawn(async move {
            while updates.changed().await.is_ok() {
                let state = updates.borrow_and_update().clone();
                info!(
                    status = %state.status_name,
                    temperature = state.temperature,
                    setpoint = state.setpoint,
                    power_level = state.power_level,
                    connected = state.connected,
                    "Stove state changed"
                );
            }
        });
        Some((handle, logger))
    } else {
        None
    };

    info!("stovesrv running, press Ctrl+C to stop");
    wait_for_shutdown().await;
    shutdown.trigger();

    if let Some((handle, logger)) = monitor {
        if let Err(e) = handle.await {
            error!("Monitor task failed: {e}");
        }
        // Sender dropped with the monitor task; the logger ends on its own
        let _ = logger.await;
    }

    controller.disconnect().await;
    info!("stovesrv stopped");
    Ok(())
}
