//! Error types for the cluster state machine.

use thiserror::Error;

use crate::types::NodeId;

/// Result type alias for cluster operations.
pub type MetaResult<T> = Result<T, MetaError>;

/// Error variants for cluster operations.
///
/// None of these are fatal: the cluster holds no persistent state, so every
/// failure can be recovered by retrying the triggering command.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MetaError {
    /// Fewer active nodes than the replication factor requires.
    #[error("insufficient capacity: need {required} active nodes, have {available}")]
    InsufficientCapacity {
        /// Nodes needed for the operation.
        required: usize,
        /// Active nodes available.
        available: usize,
    },

    /// The referenced storage node does not exist.
    #[error("node {0} not found")]
    NodeNotFound(NodeId),

    /// No catalogued file matches the given id or name.
    #[error("file {0} not found")]
    FileNotFound(String),

    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_message() {
        let err = MetaError::InsufficientCapacity {
            required: 3,
            available: 2,
        };
        assert_eq!(
            err.to_string(),
            "insufficient capacity: need 3 active nodes, have 2"
        );
    }

    #[test]
    fn test_node_not_found_message() {
        let err = MetaError::NodeNotFound(NodeId::new(7));
        assert_eq!(err.to_string(), "node dn-07 not found");
    }
}
