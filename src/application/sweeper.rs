//! Expired-session sweep
//!
//! A conversation can hang even when the underlying call connection is
//! fine, so sessions past their timeout are force-ended by this
//! background loop, independent of the call that spawned them.

use crate::domain::session::repository::SessionRepository;
use crate::domain::shared::result::Result;
use chrono::Utc;
use metrics::counter;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};

pub struct SessionSweeper {
    sessions: Arc<dyn SessionRepository>,
    interval: Duration,
}

impl SessionSweeper {
    pub fn new(sessions: Arc<dyn SessionRepository>, interval: Duration) -> Self {
        Self { sessions, interval }
    }

    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        info!("session sweeper started");
        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {
                    match self.run_once().await {
                        Ok(ended) if ended > 0 => info!(ended, "expired sessions force-ended"),
                        Ok(_) => {}
                        Err(e) => warn!(error = %e, "session sweep failed"),
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        info!("session sweeper stopped");
    }

    pub async fn run_once(&self) -> Result<u64> {
        let ended = self.sessions.end_expired_sessions(Utc::now()).await?;
        if ended > 0 {
            counter!("dialcast_sessions_expired_total").increment(ended);
        }
        Ok(ended)
    }
}
