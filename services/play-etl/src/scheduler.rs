//!
//! src/scheduler.rs  Andrew Belles  Oct 12th, 2026
//!
//! Daemon wrapper that runs the etl job on a fixed interval, retrying a
//! failed run once, until ctrl-c or the shutdown token fires
//!

use async_trait::async_trait;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::{PersistenceConfig, ScheduleConfig};
use crate::errors::EtlError;
use crate::etl::EtlJob;
use crate::types::RunOutcome;

#[async_trait]
pub trait ScheduledJob: Send + Sync {
    async fn run(&self) -> Result<RunOutcome, EtlError>;
}

#[async_trait]
impl ScheduledJob for EtlJob {
    async fn run(&self) -> Result<RunOutcome, EtlError> {
        self.run_once().await
    }
}

pub struct Scheduler<J: ScheduledJob> {
    job: J,
    cfg: ScheduleConfig,
    persistence: PersistenceConfig,

    // handles daemon exit
    shutdown: CancellationToken
}

impl<J: ScheduledJob> Scheduler<J> {
    pub fn new(job: J, cfg: ScheduleConfig, persistence: PersistenceConfig) -> Self {
        Self { job, cfg, persistence, shutdown: CancellationToken::new() }
    }

    pub fn shutdown(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// One attempt plus a single retry after `retry_delay`
    pub async fn run_with_retry(&self) -> Result<RunOutcome, EtlError> {
        match self.job.run().await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                warn!(
                    error.kind = e.kind(),
                    error = %e,
                    retry_in_s = self.cfg.retry_delay.as_secs_f64(),
                    "scheduler.retry"
                );
                tokio::select! {
                    _ = self.shutdown.cancelled() => Err(e),
                    _ = time::sleep(self.cfg.retry_delay) => self.job.run().await
                }
            }
        }
    }

    pub async fn run(self) -> Result<(), EtlError> {
        info!(
            interval_s = self.cfg.interval.as_secs(),
            retry_delay_s = self.cfg.retry_delay.as_secs(),
            "scheduler.start"
        );

        let shutdown = self.shutdown.clone();
        let trigger = tokio::spawn(async move {
            tokio::select! {
                r = tokio::signal::ctrl_c() => {
                    if r.is_ok() {
                        warn!(msg = "shutting scheduler down", "scheduler.signal");
                        shutdown.cancel();
                    }
                }
                _ = shutdown.cancelled() => {}
            }
        });

        let mut ticker = time::interval(self.cfg.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    info!(reason = "shutdown token", "scheduler.stop");
                    break;
                }
                _ = ticker.tick() => {
                    self.log_paths();
                    let run = tokio::select! {
                        _ = self.shutdown.cancelled() => None,
                        r = self.run_with_retry() => Some(r)
                    };
                    match run {
                        Some(Ok(outcome)) => debug!(?outcome, "scheduler.tick.ok"),
                        Some(Err(e)) => error!(
                            error.kind = e.kind(),
                            error = %e,
                            "scheduler.tick.failed"
                        ),
                        None => {
                            info!(reason = "shutdown during run", "scheduler.stop");
                            break;
                        }
                    }
                }
            }
        }

        let _ = trigger.await;
        info!("scheduler.exit");
        Ok(())
    }

    // where the job runs from and where it writes
    fn log_paths(&self) {
        let cwd = std::env::current_dir()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|e| format!("<unavailable: {e}>"));
        match self.persistence.database_file() {
            Some(db) => info!(cwd = %cwd, db = %db.display(), exists = db.exists(), "scheduler.paths"),
            None => info!(cwd = %cwd, db = "memory", "scheduler.paths")
        }
    }
}
