//! Scripted walkthrough of ingest, failure, self-healing and deletion.

use nexus_meta::{
    ClusterConfig, ClusterController, ClusterSnapshot, MetaResult, NodeId, NodeStatus,
};
use serde::Serialize;
use tracing::info;

/// One stage of the walkthrough and the cluster state after it.
#[derive(Debug, Clone, Serialize)]
pub struct DemoStep {
    /// What the stage did.
    pub label: String,
    /// Cluster state once the stage finished.
    pub snapshot: ClusterSnapshot,
}

/// Runs the walkthrough on a fresh six-node cluster.
///
/// Stages: upload `a.txt`, kill one holder of block 0, run one monitor tick,
/// delete the file, then kill nodes until an upload is refused.
pub fn run_demo(seed: Option<u64>) -> MetaResult<Vec<DemoStep>> {
    let config = ClusterConfig {
        placement_seed: seed,
        ..ClusterConfig::default()
    };
    let mut controller = ClusterController::new(config)?;
    controller.bootstrap();

    let mut steps = Vec::new();
    let mut record = |label: String, controller: &ClusterController| {
        info!(step = %label, "demo step");
        steps.push(DemoStep {
            label,
            snapshot: controller.snapshot(),
        });
    };
    record("bootstrap".into(), &controller);

    controller.submit_upload("a.txt", 4 * 1024 * 1024)?;
    let Some(file) = controller.complete_upload_now()? else {
        return Ok(steps);
    };
    record(format!("upload {}", file.name), &controller);

    let block0 = file.blocks[0].id;
    let Some(victim) = controller.registry().holders(&block0).first().map(|n| n.id) else {
        return Ok(steps);
    };
    controller.toggle_node(victim);
    record(format!("kill {}", victim), &controller);

    let report = controller.monitor_tick();
    record(
        format!("monitor tick ({} repairs)", report.repairs.len()),
        &controller,
    );

    controller.delete_file(file.id);
    record(format!("delete {}", file.name), &controller);

    let required = controller.config().replication_factor;
    let mut id = 1;
    while controller.registry().active_count() >= required {
        controller.set_node_status(NodeId::new(id), NodeStatus::Dead);
        id += 1;
    }
    let outcome = match controller.submit_upload("b.txt", 1024) {
        Ok(()) => "accepted".to_string(),
        Err(e) => format!("rejected: {}", e),
    };
    record(format!("upload b.txt {}", outcome), &controller);

    Ok(steps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nexus_meta::Severity;

    #[test]
    fn test_demo_walkthrough() {
        let steps = run_demo(Some(42)).unwrap();
        let labels: Vec<&str> = steps.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels.len(), 6);
        assert_eq!(labels[0], "bootstrap");
        assert_eq!(labels[1], "upload a.txt");
        assert!(labels[2].starts_with("kill dn-"));
        assert!(labels[3].starts_with("monitor tick ("));
        assert_eq!(labels[4], "delete a.txt");
        assert!(labels[5].starts_with("upload b.txt rejected: insufficient capacity"));

        let after_upload = &steps[1].snapshot;
        let assignments: usize = after_upload
            .nodes
            .iter()
            .map(|n| n.held_blocks().len())
            .sum();
        assert_eq!(assignments, 12);

        let after_delete = &steps[4].snapshot;
        assert!(after_delete.files.is_empty());
        assert!(after_delete.nodes.iter().all(|n| n.held_blocks().is_empty()));

        let last = &steps[5].snapshot;
        assert_eq!(last.active_nodes, 2);
        assert_eq!(last.logs.last().map(|e| e.severity), Some(Severity::Error));
    }

    #[test]
    fn test_demo_repair_restores_block_zero() {
        let steps = run_demo(Some(7)).unwrap();
        let file = &steps[1].snapshot.files[0];
        let block0 = file.blocks[0].id;

        let live = |snapshot: &ClusterSnapshot| {
            snapshot
                .nodes
                .iter()
                .filter(|n| n.status == NodeStatus::Active && n.holds(&block0))
                .count()
        };
        assert_eq!(live(&steps[1].snapshot), 3);
        assert_eq!(live(&steps[2].snapshot), 2);
        assert_eq!(live(&steps[3].snapshot), 3);
    }

    #[test]
    fn test_demo_serializes() {
        let steps = run_demo(Some(1)).unwrap();
        let json = serde_json::to_string(&steps).unwrap();
        assert!(json.contains("\"label\":\"bootstrap\""));
    }
}
