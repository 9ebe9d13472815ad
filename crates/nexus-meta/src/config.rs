//! Static cluster configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{MetaError, MetaResult};
use crate::event_log::DEFAULT_LOG_CAPACITY;
use crate::monitor::DEFAULT_BATCH_LOG_THRESHOLD;

/// Tunables for the cluster state machine and its periodic tasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    /// Target replica count for every block.
    pub replication_factor: usize,
    /// Blocks each file is split into.
    pub blocks_per_file: u32,
    /// Period of the replication monitor.
    pub monitor_interval_ms: u64,
    /// Period of the upload progress tick.
    pub upload_tick_ms: u64,
    /// Percentage added per upload tick.
    pub upload_step_percent: u32,
    /// Event log entries retained.
    pub log_capacity: usize,
    /// Repairs per tick above which one batch entry replaces per-block lines.
    pub batch_log_threshold: usize,
    /// Nodes registered at bootstrap.
    pub initial_nodes: usize,
    /// Seed for reproducible placement; entropy when unset.
    pub placement_seed: Option<u64>,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            replication_factor: 3,
            blocks_per_file: 4,
            monitor_interval_ms: 4000,
            upload_tick_ms: 100,
            upload_step_percent: 4,
            log_capacity: DEFAULT_LOG_CAPACITY,
            batch_log_threshold: DEFAULT_BATCH_LOG_THRESHOLD,
            initial_nodes: 6,
            placement_seed: None,
        }
    }
}

impl ClusterConfig {
    /// Rejects values the state machine cannot run with.
    pub fn validate(&self) -> MetaResult<()> {
        if self.replication_factor == 0 {
            return Err(MetaError::InvalidConfig(
                "replication_factor must be at least 1".into(),
            ));
        }
        if self.blocks_per_file == 0 {
            return Err(MetaError::InvalidConfig(
                "blocks_per_file must be at least 1".into(),
            ));
        }
        if self.monitor_interval_ms == 0 || self.upload_tick_ms == 0 {
            return Err(MetaError::InvalidConfig(
                "tick periods must be non-zero".into(),
            ));
        }
        if self.upload_step_percent == 0 || self.upload_step_percent > 100 {
            return Err(MetaError::InvalidConfig(format!(
                "upload_step_percent must be in 1..=100, got {}",
                self.upload_step_percent
            )));
        }
        if self.log_capacity == 0 {
            return Err(MetaError::InvalidConfig(
                "log_capacity must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Replication monitor period.
    pub fn monitor_interval(&self) -> Duration {
        Duration::from_millis(self.monitor_interval_ms)
    }

    /// Upload tick period.
    pub fn upload_tick(&self) -> Duration {
        Duration::from_millis(self.upload_tick_ms)
    }
}
