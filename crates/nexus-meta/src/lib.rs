#![warn(missing_docs)]

//! DFS Nexus metadata subsystem: node membership, file catalog, replica placement, replication repair

pub mod catalog;
pub mod clock;
pub mod config;
pub mod controller;
pub mod error;
pub mod event_log;
pub mod monitor;
pub mod placement;
pub mod registry;
pub mod session;
pub mod types;
pub mod upload;

pub use catalog::{Block, FileCatalog, FileRecord};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::ClusterConfig;
pub use controller::{ClusterController, ClusterSnapshot, ReplicationHealth};
pub use error::{MetaError, MetaResult};
pub use event_log::{EventLog, LogEntry};
pub use monitor::{MonitorStats, RepairOp, ReplicationMonitor, ScanReport};
pub use placement::{OrderedPlacement, PlacementEngine, PlacementStrategy, RandomPlacement};
pub use registry::{NodeRegistry, StorageNode};
pub use session::{shared, ClusterSession, SessionHandle, SharedController};
pub use types::{BlockId, ColorTag, FileId, FileStatus, NodeId, NodeStatus, Severity, Timestamp};
