//! Midpoint cutoff pruning

use crate::pruner::Pruner;
use crate::types::{Index, MinMax, PrunerSolution, Relevance};

/// Keeps every element at or above the midpoint `(min + max) / 2`.
///
/// No quality guarantee; a pathological list can lose its entire optimal
/// solution. Useful as the baseline the guaranteed pruners are compared
/// against.
#[derive(Debug, Clone, Copy, Default)]
pub struct CutoffPruner;

impl CutoffPruner {
    /// Create a cutoff pruner
    pub fn new() -> Self {
        Self
    }
}

impl Pruner for CutoffPruner {
    fn apply(&self, rel_list: &[Relevance], minmax: MinMax) -> PrunerSolution {
        let cutoff = 0.5 * minmax.min + 0.5 * minmax.max;
        let mut solution = PrunerSolution::default();
        solution.indices.reserve(rel_list.len());
        for (i, &rel) in rel_list.iter().enumerate() {
            if rel >= cutoff {
                solution.indices.push(i as Index);
            }
        }
        solution
    }
}
