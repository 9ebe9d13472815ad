//! Common test utilities and fixtures for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use nexus_meta::{
    BlockId, ClusterConfig, ClusterController, FileRecord, ManualClock, NodeId, RandomPlacement,
};

/// Test configuration with sensible defaults
pub struct TestConfig {
    pub nodes: usize,
    pub replication_factor: usize,
    pub seed: u64,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            nodes: 6,
            replication_factor: 3,
            seed: 0x5eed,
        }
    }
}

/// An in-process cluster with seeded placement and a frozen clock
pub struct TestCluster {
    pub controller: ClusterController,
    pub clock: Arc<ManualClock>,
}

impl TestCluster {
    pub fn new(config: TestConfig) -> Self {
        let clock = Arc::new(ManualClock::new(1_700_000_000_000));
        let cluster_config = ClusterConfig {
            initial_nodes: config.nodes,
            replication_factor: config.replication_factor,
            ..ClusterConfig::default()
        };
        let mut controller = ClusterController::new(cluster_config)
            .expect("valid config")
            .with_placement(Box::new(RandomPlacement::seeded(config.seed)))
            .with_clock(clock.clone());
        controller.bootstrap();
        Self { controller, clock }
    }

    pub fn with_nodes(nodes: usize) -> Self {
        Self::new(TestConfig {
            nodes,
            ..TestConfig::default()
        })
    }

    /// Uploads a file, driving the progress ticks to completion
    pub fn upload(&mut self, name: &str) -> FileRecord {
        self.controller
            .submit_upload(name, 1024 * 1024)
            .expect("upload accepted");
        loop {
            if let Some(file) = self.controller.upload_tick().expect("tick") {
                return file;
            }
        }
    }

    /// Every node (Active or Dead) holding the block
    pub fn all_holders(&self, block: &BlockId) -> Vec<NodeId> {
        self.controller
            .registry()
            .nodes()
            .iter()
            .filter(|n| n.holds(block))
            .map(|n| n.id)
            .collect()
    }

    pub fn live(&self, block: &BlockId) -> usize {
        self.controller.registry().live_replica_count(block)
    }

    pub fn total_assignments(&self) -> usize {
        self.controller
            .registry()
            .nodes()
            .iter()
            .map(|n| n.held_blocks().len())
            .sum()
    }
}
