//! Cluster orchestration.
//!
//! The [`ClusterController`] owns every piece of cluster state (nodes, files,
//! the event log and the in-flight upload) and is the only way to change it.
//! External layers issue commands and read [`ClusterSnapshot`]s; they never
//! hold references into the collections.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::catalog::{FileCatalog, FileRecord};
use crate::clock::{Clock, SystemClock};
use crate::config::ClusterConfig;
use crate::error::{MetaError, MetaResult};
use crate::event_log::{EventLog, LogEntry};
use crate::monitor::{MonitorStats, ReplicationMonitor, ScanReport};
use crate::placement::{PlacementEngine, PlacementStrategy, RandomPlacement};
use crate::registry::{NodeRegistry, StatusChange, StorageNode};
use crate::types::{ColorTag, FileId, NodeId, NodeStatus, Severity, Timestamp};
use crate::upload::{UploadProgress, UploadSession, UploadStep};

/// Read-only view of the whole cluster.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClusterSnapshot {
    /// When the snapshot was taken.
    pub taken_at: Timestamp,
    /// Every node, in registration order.
    pub nodes: Vec<StorageNode>,
    /// Every file, in ingest order.
    pub files: Vec<FileRecord>,
    /// Retained event log, oldest first.
    pub logs: Vec<LogEntry>,
    /// In-flight upload, if any.
    pub upload: Option<UploadProgress>,
    /// Number of Active nodes.
    pub active_nodes: usize,
}

/// Block counts by live replica state.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicationHealth {
    /// Blocks at or above their replication factor.
    pub healthy: usize,
    /// Blocks with some but too few live holders.
    pub under_replicated: usize,
    /// Blocks with no live holder.
    pub lost: usize,
}

/// Orchestrates registry, catalog, placement and monitor.
pub struct ClusterController {
    config: ClusterConfig,
    registry: NodeRegistry,
    catalog: FileCatalog,
    log: EventLog,
    placement: PlacementEngine,
    monitor: ReplicationMonitor,
    upload: Option<UploadSession>,
    clock: Arc<dyn Clock>,
}

impl ClusterController {
    /// Creates an empty cluster.
    ///
    /// Placement is random, seeded from `placement_seed` when set.
    pub fn new(config: ClusterConfig) -> MetaResult<Self> {
        config.validate()?;
        let strategy: Box<dyn PlacementStrategy> = match config.placement_seed {
            Some(seed) => Box::new(RandomPlacement::seeded(seed)),
            None => Box::new(RandomPlacement::new()),
        };
        info!(
            replication_factor = config.replication_factor,
            blocks_per_file = config.blocks_per_file,
            strategy = strategy.name(),
            "initializing cluster controller"
        );
        Ok(Self {
            registry: NodeRegistry::new(),
            catalog: FileCatalog::new(),
            log: EventLog::new(config.log_capacity),
            placement: PlacementEngine::new(strategy),
            monitor: ReplicationMonitor::new(config.batch_log_threshold),
            upload: None,
            clock: Arc::new(SystemClock),
            config,
        })
    }

    /// Replaces the placement strategy.
    pub fn with_placement(mut self, strategy: Box<dyn PlacementStrategy>) -> Self {
        self.placement = PlacementEngine::new(strategy);
        self
    }

    /// Replaces the time source.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Registers the configured initial nodes without logging them.
    pub fn bootstrap(&mut self) -> usize {
        let now = self.clock.now();
        for _ in 0..self.config.initial_nodes {
            self.registry.register_node(now);
        }
        info!(nodes = self.config.initial_nodes, "cluster bootstrapped");
        self.config.initial_nodes
    }

    /// Registers a new Active node.
    pub fn register_node(&mut self) -> StorageNode {
        let now = self.clock.now();
        let node = self.registry.register_node(now);
        self.log.push(
            now,
            format!("Cluster Manager: Registered new DataNode {}", node.name),
            Severity::Success,
        );
        node
    }

    /// Flips a node between Active and Dead. Unknown ids are a no-op.
    pub fn toggle_node(&mut self, node_id: NodeId) -> Option<NodeStatus> {
        let change = self.registry.toggle(node_id)?;
        self.log_status_change(&change);
        Some(change.to)
    }

    /// Sets a node's status. Unknown ids and unchanged status are a no-op.
    pub fn set_node_status(&mut self, node_id: NodeId, status: NodeStatus) -> Option<NodeStatus> {
        let change = self.registry.set_status(node_id, status)?;
        self.log_status_change(&change);
        Some(change.to)
    }

    fn log_status_change(&mut self, change: &StatusChange) {
        let severity = match change.to {
            NodeStatus::Dead => Severity::Error,
            NodeStatus::Active => Severity::Success,
        };
        self.log.push(
            self.clock.now(),
            format!(
                "Heartbeat Monitor: Node {} status changed to {}",
                change.name, change.to
            ),
            severity,
        );
    }

    /// Starts an upload.
    ///
    /// Rejected with `InsufficientCapacity` (and an error log entry) when
    /// fewer nodes are Active than the replication factor. An upload already
    /// in flight is abandoned.
    pub fn submit_upload(&mut self, name: &str, size_bytes: u64) -> MetaResult<()> {
        let now = self.clock.now();
        self.check_capacity(now)?;

        if let Some(previous) = self.upload.take() {
            warn!(file = previous.file_name(), "abandoning in-flight upload");
            self.log.push(
                now,
                format!(
                    "Client abandoned upload stream: \"{}\" at {}%.",
                    previous.file_name(),
                    previous.progress().percent
                ),
                Severity::Warning,
            );
        }

        let session = UploadSession::new(name, size_bytes, now);
        self.log.push(
            now,
            format!(
                "Client initiated upload stream: \"{}\" ({:.2} MB)...",
                name,
                session.size_mb()
            ),
            Severity::Info,
        );
        self.upload = Some(session);
        Ok(())
    }

    /// Advances the in-flight upload by one tick.
    ///
    /// Returns the ingested file on the tick that reaches 100%.
    pub fn upload_tick(&mut self) -> MetaResult<Option<FileRecord>> {
        let step = self.config.upload_step_percent;
        let Some(session) = self.upload.as_mut() else {
            return Ok(None);
        };
        match session.advance(step) {
            UploadStep::InProgress(percent) => {
                debug!(file = session.file_name(), percent, "upload progress");
                Ok(None)
            }
            UploadStep::Complete => self.complete_upload_now(),
        }
    }

    /// Ingests the in-flight upload immediately, skipping remaining ticks.
    pub fn complete_upload_now(&mut self) -> MetaResult<Option<FileRecord>> {
        match self.upload.take() {
            Some(session) => self.finalize_upload(session).map(Some),
            None => Ok(None),
        }
    }

    fn finalize_upload(&mut self, session: UploadSession) -> MetaResult<FileRecord> {
        let now = self.clock.now();
        // Nodes may have died while the stream was in flight.
        self.check_capacity(now)?;

        let replication_factor = self.config.replication_factor;
        let active = self.registry.active_ids();
        let mut placements = Vec::with_capacity(self.config.blocks_per_file as usize);
        for _ in 0..self.config.blocks_per_file {
            placements.push(
                self.placement
                    .select_replica_targets(&active, replication_factor)?,
            );
        }

        let color = ColorTag::random(&mut rand::thread_rng());
        let file = self.catalog.create_file(
            session.file_name(),
            session.size_bytes(),
            self.config.blocks_per_file,
            replication_factor,
            color,
            now,
        );
        self.log.push(
            now,
            format!(
                "Stream complete. Splitting \"{}\" into {} blocks.",
                file.name,
                file.blocks.len()
            ),
            Severity::Success,
        );

        let mut replicas = 0;
        for (block, targets) in file.blocks.iter().zip(placements) {
            for target in targets {
                if self.registry.assign(target, block.id)? {
                    replicas += 1;
                }
            }
        }
        self.log.push(
            now,
            format!("NameNode: Distributed {} replicas across cluster.", replicas),
            Severity::Info,
        );
        Ok(file)
    }

    fn check_capacity(&mut self, now: Timestamp) -> MetaResult<()> {
        let required = self.config.replication_factor;
        let available = self.registry.active_count();
        if available < required {
            self.log.push(
                now,
                format!("Upload failed: Not enough active nodes (Need {})", required),
                Severity::Error,
            );
            return Err(MetaError::InsufficientCapacity {
                required,
                available,
            });
        }
        Ok(())
    }

    /// Deletes a file and evicts its blocks from every node.
    ///
    /// Returns the removed record; an unknown id is silently ignored.
    pub fn delete_file(&mut self, file_id: FileId) -> Option<FileRecord> {
        let Some(record) = self.catalog.delete_file(file_id) else {
            debug!(file_id = %file_id, "delete of unknown file ignored");
            return None;
        };
        let reclaimed = self.registry.evict_everywhere(|b| b.file() == file_id);
        info!(file_id = %file_id, name = %record.name, reclaimed, "deleted file");
        self.log.push(
            self.clock.now(),
            "NameNode: Removed file metadata and reclaimed blocks.",
            Severity::Warning,
        );
        Some(record)
    }

    /// Runs one replication monitor tick.
    pub fn monitor_tick(&mut self) -> ScanReport {
        let now = self.clock.now();
        self.monitor.run_tick(
            &self.catalog,
            &mut self.registry,
            &mut self.placement,
            &mut self.log,
            now,
        )
    }

    /// Resolves a file by id or, failing that, by name.
    pub fn resolve_file(&self, key: &str) -> MetaResult<FileId> {
        if let Some(id) = FileId::parse(key) {
            return self
                .catalog
                .get(id)
                .map(|f| f.id)
                .ok_or_else(|| MetaError::FileNotFound(id.to_string()));
        }
        self.catalog
            .find_by_name(key)
            .map(|f| f.id)
            .ok_or_else(|| MetaError::FileNotFound(key.to_string()))
    }

    /// Counts blocks by live replica state without changing anything.
    pub fn replication_health(&self) -> ReplicationHealth {
        let mut health = ReplicationHealth::default();
        for (file, block) in self.catalog.all_blocks() {
            match self.registry.live_replica_count(&block.id) {
                0 => health.lost += 1,
                n if n < file.replication_factor => health.under_replicated += 1,
                _ => health.healthy += 1,
            }
        }
        health
    }

    /// Read-only view of the cluster.
    pub fn snapshot(&self) -> ClusterSnapshot {
        ClusterSnapshot {
            taken_at: self.clock.now(),
            nodes: self.registry.nodes().to_vec(),
            files: self.catalog.files().to_vec(),
            logs: self.log.to_vec(),
            upload: self.upload_progress(),
            active_nodes: self.registry.active_count(),
        }
    }

    /// Progress of the in-flight upload.
    pub fn upload_progress(&self) -> Option<UploadProgress> {
        self.upload.as_ref().map(|s| s.progress())
    }

    /// The node registry.
    pub fn registry(&self) -> &NodeRegistry {
        &self.registry
    }

    /// The file catalog.
    pub fn catalog(&self) -> &FileCatalog {
        &self.catalog
    }

    /// The event log.
    pub fn event_log(&self) -> &EventLog {
        &self.log
    }

    /// Monitor counters.
    pub fn monitor_stats(&self) -> &MonitorStats {
        self.monitor.stats()
    }

    /// Active configuration.
    pub fn config(&self) -> &ClusterConfig {
        &self.config
    }
}

impl std::fmt::Debug for ClusterController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClusterController")
            .field("nodes", &self.registry.len())
            .field("files", &self.catalog.len())
            .field("placement", &self.placement)
            .field("uploading", &self.upload.is_some())
            .finish()
    }
}
