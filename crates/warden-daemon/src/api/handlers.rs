use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};
use sysinfo::System;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use warden_types::{PING_BODY, PING_PATH};

use super::responses::*;
use crate::monitors::{ConnectivityMonitor, HealthChecker, SelfPingLoop};
use crate::supervisor::Supervisor;

/// Read-only view shared by every handler.
#[derive(Clone)]
pub struct ApiState {
    supervisor: Supervisor,
    connectivity: Option<Arc<ConnectivityMonitor>>,
    health: Option<Arc<HealthChecker>>,
    self_ping: Option<Arc<SelfPingLoop>>,
    started_at: Instant,
    system: Arc<Mutex<System>>,
}

impl ApiState {
    pub fn new(supervisor: Supervisor) -> Self {
        Self {
            supervisor,
            connectivity: None,
            health: None,
            self_ping: None,
            started_at: Instant::now(),
            system: Arc::new(Mutex::new(System::new())),
        }
    }

    pub fn with_connectivity(mut self, monitor: Arc<ConnectivityMonitor>) -> Self {
        self.connectivity = Some(monitor);
        self
    }

    pub fn with_health(mut self, checker: Arc<HealthChecker>) -> Self {
        self.health = Some(checker);
        self
    }

    pub fn with_self_ping(mut self, pinger: Arc<SelfPingLoop>) -> Self {
        self.self_ping = Some(pinger);
        self
    }

    pub fn supervisor(&self) -> &Supervisor {
        &self.supervisor
    }

    pub fn uptime_secs(&self) -> f64 {
        self.started_at.elapsed().as_secs_f64()
    }

    fn memory(&self) -> MemoryUsage {
        let mut system = self.system.lock();
        system.refresh_memory();

        let process_rss_bytes = sysinfo::get_current_pid().ok().and_then(|pid| {
            system.refresh_process(pid);
            system.process(pid).map(|process| process.memory())
        });

        MemoryUsage {
            total_bytes: system.total_memory(),
            used_bytes: system.used_memory(),
            process_rss_bytes,
        }
    }
}

pub fn router(state: ApiState, request_timeout: Duration) -> Router {
    Router::new()
        .route("/", get(root))
        .route(PING_PATH, get(ping))
        .route("/health", get(health))
        .route("/status", get(status))
        .route("/api/supervisor", get(supervisor_snapshot))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn ping() -> &'static str {
    PING_BODY
}

async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: SERVICE_NAME.to_string(),
        status: "online".to_string(),
        endpoints: Endpoints {
            ping: PING_PATH.to_string(),
            health: "/health".to_string(),
            status: "/status".to_string(),
            supervisor: "/api/supervisor".to_string(),
        },
        timestamp: Utc::now(),
    })
}

async fn health(State(state): State<ApiState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "online".to_string(),
        uptime: state.uptime_secs(),
        timestamp: Utc::now(),
        memory: Some(state.memory()),
        platform: Some(std::env::consts::OS.to_string()),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn status(State(state): State<ApiState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        bot: bot_status(state.supervisor.status().state),
        timestamp: Utc::now(),
        uptime: state.uptime_secs(),
    })
}

async fn supervisor_snapshot(State(state): State<ApiState>) -> Json<SupervisorResponse> {
    Json(SupervisorResponse {
        process: state.supervisor.status(),
        stats: state.supervisor.stats(),
        connectivity: state.connectivity.as_ref().map(|m| m.state()),
        last_health_check: state.health.as_ref().and_then(|h| h.last_result()),
        self_ping: state.self_ping.as_ref().map(|p| p.status()),
    })
}
