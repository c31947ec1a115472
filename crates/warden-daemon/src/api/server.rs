use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info};
use warden_types::{WardenError, WardenResult};

use super::handlers::{router, ApiState};
use super::responses::bot_status;
use crate::supervisor::CancellationToken;

pub struct ApiServer {
    addr: SocketAddr,
    state: ApiState,
    request_timeout: Duration,
    heartbeat_interval: Duration,
    running: Arc<AtomicBool>,
    shutdown: watch::Sender<bool>,
}

impl ApiServer {
    pub fn new(addr: SocketAddr, state: ApiState) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            addr,
            state,
            request_timeout: Duration::from_secs(30),
            heartbeat_interval: Duration::from_secs(30),
            running: Arc::new(AtomicBool::new(false)),
            shutdown,
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Zero disables the heartbeat log line.
    pub fn with_heartbeat_interval(mut self, heartbeat: Duration) -> Self {
        self.heartbeat_interval = heartbeat;
        self
    }

    /// Binds and serves in the background. Returns the bound address, which
    /// differs from the configured one when port 0 was requested.
    pub async fn start(&self) -> WardenResult<SocketAddr> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(WardenError::Internal("API server already running".into()));
        }
        self.shutdown.send_replace(false);

        let listener = match TcpListener::bind(self.addr).await {
            Ok(listener) => listener,
            Err(e) => {
                self.running.store(false, Ordering::SeqCst);
                return Err(WardenError::Network(format!(
                    "Failed to bind API server to {}: {}",
                    self.addr, e
                )));
            }
        };
        let local_addr = listener.local_addr()?;

        let app = router(self.state.clone(), self.request_timeout);
        let mut shutdown_rx = self.shutdown.subscribe();
        let running = self.running.clone();
        tokio::spawn(async move {
            let graceful = async move {
                let _ = shutdown_rx.wait_for(|stop| *stop).await;
            };
            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(graceful)
                .await
            {
                error!("API server error: {}", e);
            }
            running.store(false, Ordering::SeqCst);
            info!("API server stopped");
        });

        if !self.heartbeat_interval.is_zero() {
            self.spawn_heartbeat();
        }

        info!("API server listening on http://{}", local_addr);
        Ok(local_addr)
    }

    pub fn stop(&self) {
        self.shutdown.send_replace(true);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn spawn_heartbeat(&self) {
        let mut cancel = CancellationToken::from_receiver(self.shutdown.subscribe());
        let state = self.state.clone();
        let period = self.heartbeat_interval;

        tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;

            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        let process = state.supervisor().status();
                        info!(
                            "Heartbeat: '{}' is {} (restarts {}, uptime {:.0}s)",
                            process.id,
                            bot_status(process.state),
                            process.restart_count,
                            state.uptime_secs()
                        );
                    }
                }
            }
        });
    }
}
