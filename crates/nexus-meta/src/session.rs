//! Periodic task lifecycle.
//!
//! A session runs the two independent timers that drive the cluster: the
//! fast upload tick and the slower replication monitor tick. Both tasks take
//! the controller lock for the whole of each step, so steps never interleave
//! and every step sees a consistent state. Starting a session corresponds to
//! an operator logging in; stopping it, to logging out.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::config::ClusterConfig;
use crate::controller::ClusterController;

/// Controller shared between the periodic tasks and command handlers.
pub type SharedController = Arc<Mutex<ClusterController>>;

/// Wraps a controller for sharing.
pub fn shared(controller: ClusterController) -> SharedController {
    Arc::new(Mutex::new(controller))
}

/// Handle to a running session.
pub struct SessionHandle {
    shutdown: watch::Sender<bool>,
    upload_task: JoinHandle<()>,
    monitor_task: JoinHandle<()>,
}

impl SessionHandle {
    /// Signals both tasks and waits for them to exit.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.upload_task.await {
            warn!("upload ticker ended abnormally: {}", e);
        }
        if let Err(e) = self.monitor_task.await {
            warn!("replication monitor ended abnormally: {}", e);
        }
        info!("cluster session stopped");
    }

    /// Returns true while both tasks are alive.
    pub fn is_running(&self) -> bool {
        !self.upload_task.is_finished() && !self.monitor_task.is_finished()
    }
}

/// Starts the periodic tasks.
pub struct ClusterSession;

impl ClusterSession {
    /// Spawns the upload and monitor tasks with the periods from `config`.
    pub fn start(controller: SharedController, config: &ClusterConfig) -> SessionHandle {
        Self::start_with_periods(controller, config.upload_tick(), config.monitor_interval())
    }

    /// Spawns the upload and monitor tasks with explicit periods.
    pub fn start_with_periods(
        controller: SharedController,
        upload_tick: Duration,
        monitor_interval: Duration,
    ) -> SessionHandle {
        let (shutdown, shutdown_rx) = watch::channel(false);

        let upload_task = tokio::spawn(run_upload_ticker(
            controller.clone(),
            upload_tick,
            shutdown_rx.clone(),
        ));
        let monitor_task = tokio::spawn(run_monitor(controller, monitor_interval, shutdown_rx));

        info!(
            upload_tick_ms = upload_tick.as_millis() as u64,
            monitor_interval_ms = monitor_interval.as_millis() as u64,
            "cluster session started"
        );
        SessionHandle {
            shutdown,
            upload_task,
            monitor_task,
        }
    }
}

fn ticker(period: Duration) -> tokio::time::Interval {
    // First tick one full period after start.
    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

async fn run_upload_ticker(
    controller: SharedController,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = ticker(period);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let mut controller = controller.lock().await;
                match controller.upload_tick() {
                    Ok(Some(file)) => debug!(file_id = %file.id, name = %file.name, "upload ingested"),
                    Ok(None) => {}
                    Err(e) => warn!("upload failed at completion: {}", e),
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }
}

async fn run_monitor(
    controller: SharedController,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = ticker(period);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let report = controller.lock().await.monitor_tick();
                debug!(repairs = report.repairs.len(), lost = report.lost, "monitor tick");
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }
}
