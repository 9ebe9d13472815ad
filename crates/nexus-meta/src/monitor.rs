//! Periodic replication repair.
//!
//! Each tick compares every catalogued block against the Active nodes that
//! hold it and schedules at most one new replica per under-replicated block.
//! Repairs are computed against a single snapshot and applied together at
//! the end of the tick, so a block gains exactly one holder per tick until it
//! reaches its replication factor.
//!
//! Blocks with no live holder are lost: there is no surviving copy to read
//! from, so the monitor counts them and moves on. Excess replicas are never
//! removed and healthy blocks are never rebalanced.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::catalog::FileCatalog;
use crate::event_log::EventLog;
use crate::placement::PlacementEngine;
use crate::registry::NodeRegistry;
use crate::types::{BlockId, NodeId, Severity, Timestamp};

/// Above this many repairs in one tick a single batch entry is logged.
pub const DEFAULT_BATCH_LOG_THRESHOLD: usize = 3;

/// A scheduled replica copy.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepairOp {
    /// Block to replicate.
    pub block: BlockId,
    /// Name of the owning file, for the log line.
    pub file_name: String,
    /// Holder the copy is notionally read from. No bytes move.
    pub source: NodeId,
    /// Node receiving the new replica.
    pub target: NodeId,
}

/// Outcome of one monitor tick.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanReport {
    /// Blocks examined.
    pub blocks_scanned: usize,
    /// Blocks at or above their replication factor.
    pub healthy: usize,
    /// Blocks with some but too few live holders.
    pub under_replicated: usize,
    /// Blocks with no live holder.
    pub lost: usize,
    /// Under-replicated blocks with no eligible target this tick.
    pub no_candidate: usize,
    /// Repairs scheduled (and, after `apply`, performed).
    pub repairs: Vec<RepairOp>,
}

/// Cumulative monitor counters.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorStats {
    /// Ticks run.
    pub ticks: u64,
    /// Replicas added.
    pub repairs_applied: u64,
    /// Lost-block sightings, summed over ticks.
    pub lost_block_observations: u64,
}

/// The self-healing control loop body.
#[derive(Debug, Clone)]
pub struct ReplicationMonitor {
    batch_log_threshold: usize,
    stats: MonitorStats,
}

impl ReplicationMonitor {
    /// Creates a monitor logging a batch entry above `batch_log_threshold`
    /// repairs per tick.
    pub fn new(batch_log_threshold: usize) -> Self {
        Self {
            batch_log_threshold,
            stats: MonitorStats::default(),
        }
    }

    /// Cumulative counters.
    pub fn stats(&self) -> &MonitorStats {
        &self.stats
    }

    /// Computes this tick's repairs without touching the registry.
    pub fn scan(
        &self,
        catalog: &FileCatalog,
        registry: &NodeRegistry,
        placement: &mut PlacementEngine,
    ) -> ScanReport {
        let active = registry.active_nodes();
        let mut report = ScanReport::default();
        let mut scheduled: HashSet<BlockId> = HashSet::new();

        for (file, block) in catalog.all_blocks() {
            report.blocks_scanned += 1;

            let holders: Vec<NodeId> = active
                .iter()
                .filter(|n| n.holds(&block.id))
                .map(|n| n.id)
                .collect();
            let live = holders.len();

            if live == 0 {
                report.lost += 1;
                warn!(block = %block.id, file = %file.name, "block has no live replica");
                continue;
            }
            if live >= file.replication_factor {
                report.healthy += 1;
                continue;
            }

            report.under_replicated += 1;
            if scheduled.contains(&block.id) {
                continue;
            }

            let candidates: Vec<NodeId> = active
                .iter()
                .map(|n| n.id)
                .filter(|id| !holders.contains(id))
                .collect();
            let Some(target) = placement.choose_one(&candidates) else {
                report.no_candidate += 1;
                debug!(block = %block.id, live, "no eligible repair target");
                continue;
            };

            scheduled.insert(block.id);
            report.repairs.push(RepairOp {
                block: block.id,
                file_name: file.name.clone(),
                source: holders[0],
                target,
            });
        }

        report
    }

    /// Applies every repair in `report`. Returns the number of new replicas.
    pub fn apply(&mut self, report: &ScanReport, registry: &mut NodeRegistry) -> usize {
        let mut applied = 0;
        for op in &report.repairs {
            match registry.assign(op.target, op.block) {
                Ok(true) => applied += 1,
                Ok(false) => {}
                Err(e) => warn!(block = %op.block, error = %e, "repair target vanished"),
            }
        }
        self.stats.ticks += 1;
        self.stats.repairs_applied += applied as u64;
        self.stats.lost_block_observations += report.lost as u64;
        applied
    }

    /// One full tick: scan, apply, then log the repairs.
    pub fn run_tick(
        &mut self,
        catalog: &FileCatalog,
        registry: &mut NodeRegistry,
        placement: &mut PlacementEngine,
        log: &mut EventLog,
        now: Timestamp,
    ) -> ScanReport {
        let report = self.scan(catalog, registry, placement);
        let applied = self.apply(&report, registry);
        self.log_repairs(&report, registry, log, now);

        debug!(
            scanned = report.blocks_scanned,
            healthy = report.healthy,
            under_replicated = report.under_replicated,
            lost = report.lost,
            applied,
            "replication scan complete"
        );
        if applied > 0 {
            info!(applied, "replication repairs applied");
        }
        report
    }

    fn log_repairs(
        &self,
        report: &ScanReport,
        registry: &NodeRegistry,
        log: &mut EventLog,
        now: Timestamp,
    ) {
        if report.repairs.is_empty() {
            return;
        }
        if report.repairs.len() > self.batch_log_threshold {
            log.push(
                now,
                format!(
                    "Auto-Healer: Batch recovery initiated for {} blocks.",
                    report.repairs.len()
                ),
                Severity::Warning,
            );
            return;
        }
        for op in &report.repairs {
            let target_name = registry
                .get(op.target)
                .map(|n| n.name.clone())
                .unwrap_or_else(|| op.target.to_string());
            log.push(
                now,
                format!(
                    "Auto-Healer: Replicating {} (Block {}) -> {}",
                    op.file_name,
                    op.block.index(),
                    target_name
                ),
                Severity::Warning,
            );
        }
    }
}

impl Default for ReplicationMonitor {
    fn default() -> Self {
        Self::new(DEFAULT_BATCH_LOG_THRESHOLD)
    }
}
