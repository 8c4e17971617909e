//! WiFi Diagnostic Access Point - Main Entry Point

use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use wifi_diag_ap::{
    backend::{
        HostapdBackend, LinuxSystemProbe, MockRadioBackend, MockSystemProbe, RadioBackend,
        SystemProbe,
    },
    config::{CliArgs, Settings},
    core::monitor::{EventMonitor, LinkMetrics},
    transport::http::{DiagnosticState, HttpServer, router},
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,wifi_diag_ap=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Parse and validate CLI arguments
    let args = CliArgs::parse();
    let settings = match Settings::try_from(args) {
        Ok(settings) => settings,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            return Err(e.into());
        }
    };
    info!(
        ssid = %settings.access_point.ssid,
        ap_interface = %settings.ap_interface,
        sta_interface = %settings.sta_interface,
        listen = %settings.listen,
        chunk_size = settings.transfer.chunk_size,
        mock = settings.mock,
        "Starting WiFi diagnostic access point"
    );

    if settings.mock {
        info!("Using in-memory radio backend");
        run(settings, MockRadioBackend::new(), MockSystemProbe::new()).await
    } else {
        let backend = HostapdBackend::new(settings.hostapd());
        backend.start_event_listeners()?;
        info!("Radio backend initialized for interface: {}", settings.ap_interface);
        run(settings, backend, LinuxSystemProbe::new()).await
    }
}

async fn run<R: RadioBackend, P: SystemProbe>(
    settings: Settings,
    radio: R,
    probe: P,
) -> Result<(), Box<dyn std::error::Error>> {
    let radio = Arc::new(radio);
    let metrics = Arc::new(LinkMetrics::new());

    // Subscribe before bring-up so no disconnect is missed
    let monitor = EventMonitor::new(metrics.clone());
    let monitor_task = tokio::spawn(monitor.run(radio.subscribe()));

    match radio.start_access_point(&settings.access_point).await {
        Ok(()) => match radio.ip_address().await {
            Ok(ip) => info!("Access point '{}' is up at {}", settings.access_point.ssid, ip),
            Err(_) => info!("Access point '{}' is up", settings.access_point.ssid),
        },
        Err(e) => error!("Failed to start access point: {}", e),
    }

    let state = Arc::new(DiagnosticState::new(
        radio.clone(),
        Arc::new(probe),
        metrics,
        settings.transfer,
    ));
    let server = HttpServer::bind(
        settings.listen,
        router(state),
        settings.request_timeout,
        settings.transfer.stall_timeout,
    )
    .await?;

    info!("Service started successfully");

    // Wait for shutdown signal
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received SIGINT (Ctrl+C), shutting down gracefully");
        }
        _ = shutdown_signal() => {
            info!("Received SIGTERM, shutting down gracefully");
        }
        result = server.run() => {
            if let Err(e) = result {
                error!("HTTP server error: {}", e);
                return Err(e.into());
            }
        }
    }

    monitor_task.abort();
    info!("Shutting down...");
    Ok(())
}

#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(e) => {
            error!("Failed to register SIGTERM handler: {}", e);
            std::future::pending::<()>().await
        }
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() {
    // On non-Unix platforms, just wait forever
    std::future::pending::<()>().await
}
