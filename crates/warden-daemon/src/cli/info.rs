use super::commands::OutputFormat;
use super::utils::{format_uptime, print_banner};
use reqwest::Client;
use serde_json::Value;
use std::path::Path;
use std::time::Duration;
use warden_daemon::WardenConfig;
use warden_types::{WardenError, WardenResult};

const BUILD_VERSION: &str = env!("CARGO_PKG_VERSION");
const BUILD_ARCH: &str = std::env::consts::ARCH;
const BUILD_OS: &str = std::env::consts::OS;

async fn fetch_json(client: &Client, url: &str) -> WardenResult<Value> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| WardenError::Network(format!("GET {} failed: {}", url, e)))?;

    if !response.status().is_success() {
        return Err(WardenError::Network(format!(
            "GET {} returned {}",
            url,
            response.status()
        )));
    }

    response
        .json()
        .await
        .map_err(|e| WardenError::Serialization(format!("Invalid response from {}: {}", url, e)))
}

pub async fn show_status(config: &WardenConfig, pid_file: &Path, format: &OutputFormat) -> WardenResult<()> {
    let base = format!("http://{}", config.local_api_addr());
    let client = Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
        .map_err(|e| WardenError::Network(format!("Failed to build HTTP client: {}", e)))?;

    let status = match fetch_json(&client, &format!("{}/status", base)).await {
        Ok(status) => status,
        Err(e) => {
            if pid_file.exists() {
                println!("\x1b[38;5;226m* Warden: UNREACHABLE\x1b[0m (PID file present, API error: {})", e);
            } else {
                println!("\x1b[38;5;245m* Warden: NOT RUNNING\x1b[0m");
            }
            return Ok(());
        }
    };
    let supervisor = fetch_json(&client, &format!("{}/api/supervisor", base))
        .await
        .unwrap_or(Value::Null);

    match format {
        OutputFormat::Json => {
            let combined = serde_json::json!({ "status": status, "supervisor": supervisor });
            let text = serde_json::to_string_pretty(&combined)
                .map_err(|e| WardenError::Serialization(e.to_string()))?;
            println!("{}", text);
        }
        OutputFormat::Text => {
            println!("\x1b[38;5;46m* Warden: RUNNING\x1b[0m");
            println!("\x1b[38;5;245m{}\x1b[0m", "═".repeat(50));
            println!(
                "Process:         \x1b[38;5;226m{}\x1b[0m",
                supervisor["process"]["id"].as_str().unwrap_or(&config.process.id)
            );
            println!("State:           \x1b[38;5;51m{}\x1b[0m", status["bot"].as_str().unwrap_or("unknown"));
            println!(
                "Uptime:          \x1b[38;5;51m{}\x1b[0m",
                format_uptime(status["uptime"].as_f64().unwrap_or(0.0) as u64)
            );
            if let Some(restarts) = supervisor["process"]["restart_count"].as_u64() {
                println!(
                    "Restarts:        \x1b[38;5;51m{}/{}\x1b[0m",
                    restarts,
                    supervisor["stats"]["max_attempts"].as_u64().unwrap_or(0)
                );
            }
            if let Some(error) = supervisor["process"]["last_error"].as_str() {
                println!("Last error:      \x1b[38;5;196m{}\x1b[0m", error);
            }
            if let Some(phase) = supervisor["connectivity"]["phase"].as_str() {
                println!("Connectivity:    \x1b[38;5;51m{}\x1b[0m", phase);
            }
            if let Some(failures) = supervisor["self_ping"]["consecutive_failures"].as_u64() {
                println!(
                    "Self-ping:       \x1b[38;5;51m{} ok, {} failing\x1b[0m",
                    supervisor["self_ping"]["ping_count"].as_u64().unwrap_or(0),
                    failures
                );
            }
            println!("\x1b[38;5;245m{}\x1b[0m", "═".repeat(50));
        }
    }

    Ok(())
}

pub fn show_version() {
    print_banner();
    println!("\x1b[38;5;46mBuild Information\x1b[0m");
    println!("\x1b[38;5;245m{}\x1b[0m", "═".repeat(50));
    println!("  Version:   \x1b[38;5;51m{}\x1b[0m", BUILD_VERSION);
    println!("  Target:    \x1b[38;5;245m{}-{}\x1b[0m", BUILD_ARCH, BUILD_OS);
    println!("  Profile:   \x1b[38;5;245m{}\x1b[0m", if cfg!(debug_assertions) { "debug" } else { "release" });
    println!();
    println!("\x1b[38;5;46mComponents\x1b[0m");
    println!("\x1b[38;5;245m{}\x1b[0m", "═".repeat(50));
    println!("  Managers:  \x1b[38;5;51mpm2, command, memory\x1b[0m");
    println!("  Monitors:  \x1b[38;5;51mconnectivity, health, self-ping\x1b[0m");
    println!("  HTTP:      \x1b[38;5;51maxum\x1b[0m (/ping, /health, /status)");
    println!();
    println!("\x1b[38;5;245mLicense:     AGPL-3.0\x1b[0m");
}
