//! Replica placement.
//!
//! The engine enforces the capacity rule (never fewer candidates than
//! requested replicas); the choice among candidates is delegated to a
//! [`PlacementStrategy`]. The production strategy is a uniform random sample
//! without replacement. It ignores load and locality, and every call is
//! independent, so two blocks of one file may or may not share nodes.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::debug;

use crate::error::{MetaError, MetaResult};
use crate::types::NodeId;

/// Chooses replica targets among candidate nodes.
pub trait PlacementStrategy: Send {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Picks `count` distinct nodes from `candidates`.
    ///
    /// Called only with `count <= candidates.len()`.
    fn sample(&mut self, candidates: &[NodeId], count: usize) -> Vec<NodeId>;
}

/// Uniform random sampling without replacement.
#[derive(Debug)]
pub struct RandomPlacement {
    rng: StdRng,
}

impl RandomPlacement {
    /// Seeds from OS entropy.
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Reproducible sequence for a given seed.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomPlacement {
    fn default() -> Self {
        Self::new()
    }
}

impl PlacementStrategy for RandomPlacement {
    fn name(&self) -> &'static str {
        "random"
    }

    fn sample(&mut self, candidates: &[NodeId], count: usize) -> Vec<NodeId> {
        candidates
            .choose_multiple(&mut self.rng, count)
            .copied()
            .collect()
    }
}

/// Deterministic placement: the first `count` candidates in registry order.
#[derive(Debug, Default, Clone, Copy)]
pub struct OrderedPlacement;

impl PlacementStrategy for OrderedPlacement {
    fn name(&self) -> &'static str {
        "ordered"
    }

    fn sample(&mut self, candidates: &[NodeId], count: usize) -> Vec<NodeId> {
        candidates.iter().take(count).copied().collect()
    }
}

/// Selects nodes for new replicas.
pub struct PlacementEngine {
    strategy: Box<dyn PlacementStrategy>,
}

impl PlacementEngine {
    /// Wraps a strategy.
    pub fn new(strategy: Box<dyn PlacementStrategy>) -> Self {
        Self { strategy }
    }

    /// Name of the active strategy.
    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    /// Picks `count` distinct targets from `candidates`.
    ///
    /// Fails with `InsufficientCapacity` when there are fewer candidates than
    /// requested replicas.
    pub fn select_replica_targets(
        &mut self,
        candidates: &[NodeId],
        count: usize,
    ) -> MetaResult<Vec<NodeId>> {
        if candidates.len() < count {
            return Err(MetaError::InsufficientCapacity {
                required: count,
                available: candidates.len(),
            });
        }
        let targets = self.strategy.sample(candidates, count);
        debug_assert_eq!(targets.len(), count);
        debug!(
            strategy = self.strategy.name(),
            count,
            targets = ?targets,
            "selected replica targets"
        );
        Ok(targets)
    }

    /// Picks one node from `candidates`, or `None` if there are none.
    pub fn choose_one(&mut self, candidates: &[NodeId]) -> Option<NodeId> {
        if candidates.is_empty() {
            return None;
        }
        self.strategy.sample(candidates, 1).into_iter().next()
    }
}

impl Default for PlacementEngine {
    fn default() -> Self {
        Self::new(Box::new(RandomPlacement::new()))
    }
}

impl std::fmt::Debug for PlacementEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlacementEngine")
            .field("strategy", &self.strategy.name())
            .finish()
    }
}
