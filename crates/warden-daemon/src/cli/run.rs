use super::utils::{print_banner, resolve_path};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use warden_daemon::{
    ApiServer, ApiState, ConnectivityMonitor, EventLog, FileLogSink, HealthChecker, SelfPingLoop,
    Supervisor, TcpReachabilityProbe, WardenConfig, DEFAULT_PID_FILE,
};
use warden_types::{WardenError, WardenResult};

pub async fn run_daemon(
    config_path: &Path,
    data_dir: &Path,
    pid_file: Option<PathBuf>,
) -> WardenResult<()> {
    print_banner();
    info!("Starting Warden v{}", env!("CARGO_PKG_VERSION"));
    info!("Data directory: {:?}", data_dir);

    std::fs::create_dir_all(data_dir)
        .map_err(|e| WardenError::Config(format!("Failed to create data directory: {}", e)))?;

    info!("Loading configuration from {:?}", config_path);
    let config = WardenConfig::load(config_path)?;

    let pid_path = pid_file.unwrap_or_else(|| data_dir.join(DEFAULT_PID_FILE));
    std::fs::write(&pid_path, std::process::id().to_string())
        .map_err(|e| WardenError::Config(format!("Failed to write PID file: {}", e)))?;
    info!("PID file written: {:?}", pid_path);

    let event_log_path = resolve_path(data_dir, &config.logging.event_log);
    let events = EventLog::new(Arc::new(FileLogSink::open(&event_log_path)?));
    info!("Event log: {:?}", event_log_path);

    let manager = config.process.build_manager()?;
    info!(
        "Supervising '{}' via {} (max {} restarts, {}s apart)",
        config.process.id,
        config.process.manager,
        config.restart.max_attempts,
        config.restart.fixed_delay_secs
    );

    let supervisor = Supervisor::new(config.supervisor_config(), manager.clone(), events.clone());
    let mut api_state = ApiState::new(supervisor.clone());

    if config.connectivity.enabled {
        let monitor = Arc::new(ConnectivityMonitor::new(
            Arc::new(TcpReachabilityProbe),
            config.connectivity.settings(),
            events.clone(),
        ));
        api_state = api_state.with_connectivity(monitor.clone());
        supervisor.register_monitor("connectivity", move |link, cancel| {
            let monitor = monitor.clone();
            async move { monitor.run(link, cancel).await }
        })?;
    }

    if config.health.enabled {
        let checker = Arc::new(HealthChecker::new(
            manager.clone(),
            config.process.id.clone(),
            config.health.settings(),
        ));
        api_state = api_state.with_health(checker.clone());
        supervisor.register_monitor("health", move |link, cancel| {
            let checker = checker.clone();
            async move { checker.run(link, cancel).await }
        })?;
    }

    if config.self_ping.enabled {
        let pinger = Arc::new(SelfPingLoop::new(
            config.self_ping.settings(config.self_ping_target()),
            events.clone(),
        )?);
        api_state = api_state.with_self_ping(pinger.clone());
        supervisor.register_monitor("self-ping", move |_link, cancel| {
            let pinger = pinger.clone();
            async move { pinger.run(cancel).await }
        })?;
    }

    let api_server = if config.api.enabled {
        let server = ApiServer::new(config.api_addr(), api_state)
            .with_request_timeout(Duration::from_secs(config.api.request_timeout_secs))
            .with_heartbeat_interval(Duration::from_secs(config.api.heartbeat_interval_secs));
        let addr = server.start().await?;
        Some((server, addr))
    } else {
        info!("HTTP API disabled");
        None
    };

    events.info(&format!("Warden started, supervising '{}'", config.process.id));

    let starter = supervisor.clone();
    tokio::spawn(async move {
        if let Err(e) = starter.start().await {
            warn!("Initial start failed: {}", e);
        }
    });

    print_ready_message(&config, api_server.as_ref().map(|(_, addr)| *addr));

    wait_for_shutdown().await?;

    info!("Shutting down...");
    supervisor.stop().await?;
    if let Some((server, _)) = api_server {
        server.stop();
    }
    events.info("Warden stopped");

    let _ = std::fs::remove_file(&pid_path);

    info!("Shutdown complete");
    Ok(())
}

fn print_ready_message(config: &WardenConfig, api_addr: Option<SocketAddr>) {
    println!("\x1b[38;5;46m[+]\x1b[0m Supervising \x1b[38;5;226m{}\x1b[0m", config.process.id);
    if let Some(addr) = api_addr {
        println!("\x1b[38;5;46m[+]\x1b[0m API: \x1b[38;5;51mhttp://{}\x1b[0m", addr);
    }
    if config.self_ping.enabled {
        println!(
            "\x1b[38;5;46m[+]\x1b[0m Self-ping: \x1b[38;5;51m{}\x1b[0m every {}s",
            config.self_ping_target(),
            config.self_ping.interval_secs
        );
    }
    println!("\x1b[38;5;245m    Press Ctrl+C to stop\x1b[0m");
    println!();
}

async fn wait_for_shutdown() -> WardenResult<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;

        tokio::select! {
            _ = sigterm.recv() => { info!("Received SIGTERM"); }
            _ = sigint.recv() => { info!("Received SIGINT"); }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        info!("Received Ctrl+C");
    }

    Ok(())
}
