use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use warden_daemon::{
    ConnectivityMonitor, EventLog, ProbeOutcome, ProcessManager, SelfPingLoop, TcpReachabilityProbe,
    WardenConfig,
};
use warden_types::{ProcessStatus, WardenResult};

fn label(step: usize, total: usize, name: &str) {
    print!("[{}/{}] {:<20} ", step, total, format!("{}:", name));
    let _ = std::io::stdout().flush();
}

pub async fn run_checks(config_path: &Path) -> WardenResult<()> {
    const TOTAL: usize = 4;

    println!("\x1b[38;5;46mWarden Diagnostics\x1b[0m");
    println!("\x1b[38;5;245m{}\x1b[0m", "═".repeat(50));
    println!();

    let mut passed = 0;
    let mut failed = 0;
    let mut warnings = 0;

    label(1, TOTAL, "Configuration");
    let config = match WardenConfig::load(config_path) {
        Ok(config) => {
            if config_path.exists() {
                println!("\x1b[38;5;46mOK\x1b[0m");
                passed += 1;
            } else {
                println!("\x1b[38;5;226mWARN\x1b[0m - Using defaults");
                warnings += 1;
            }
            config
        }
        Err(e) => {
            println!("\x1b[38;5;196mFAIL\x1b[0m - {}", e);
            println!();
            println!("Cannot continue without a valid configuration.");
            return Ok(());
        }
    };

    label(2, TOTAL, "Connectivity");
    let monitor = ConnectivityMonitor::new(
        Arc::new(TcpReachabilityProbe),
        config.connectivity.settings(),
        EventLog::disabled(),
    );
    match monitor.probe().await {
        ProbeOutcome::Reachable => {
            println!("\x1b[38;5;46mOK\x1b[0m");
            passed += 1;
        }
        ProbeOutcome::Unreachable => {
            println!("\x1b[38;5;196mFAIL\x1b[0m - No host reachable ({})", config.connectivity.hosts.join(", "));
            failed += 1;
        }
        ProbeOutcome::TimedOut => {
            println!("\x1b[38;5;226mWARN\x1b[0m - Probes timed out");
            warnings += 1;
        }
    }

    label(3, TOTAL, "Process status");
    match config.process.build_manager() {
        Ok(manager) => {
            let timeout = Duration::from_secs(config.health.timeout_secs);
            match tokio::time::timeout(timeout, manager.status(&config.process.id)).await {
                Ok(ProcessStatus::Running) => {
                    println!("\x1b[38;5;46mOK\x1b[0m - '{}' running", config.process.id);
                    passed += 1;
                }
                Ok(status) => {
                    println!("\x1b[38;5;226mWARN\x1b[0m - '{}' is {}", config.process.id, status);
                    warnings += 1;
                }
                Err(_) => {
                    println!("\x1b[38;5;196mFAIL\x1b[0m - Status query timed out after {:?}", timeout);
                    failed += 1;
                }
            }
        }
        Err(e) => {
            println!("\x1b[38;5;196mFAIL\x1b[0m - {}", e);
            failed += 1;
        }
    }

    label(4, TOTAL, "Self-ping");
    let pinger = SelfPingLoop::new(config.self_ping.settings(config.self_ping_target()), EventLog::disabled())?;
    match pinger.ping().await {
        Ok(()) => {
            println!("\x1b[38;5;46mOK\x1b[0m - {}", pinger.ping_url());
            passed += 1;
        }
        Err(e) => {
            println!("\x1b[38;5;226mWARN\x1b[0m - {} ({})", pinger.ping_url(), e);
            warnings += 1;
        }
    }

    println!();
    println!("\x1b[38;5;245m{}\x1b[0m", "═".repeat(50));
    println!(
        "Results: \x1b[38;5;46m{} passed\x1b[0m, \x1b[38;5;226m{} warnings\x1b[0m, \x1b[38;5;196m{} failed\x1b[0m",
        passed, warnings, failed
    );

    Ok(())
}
