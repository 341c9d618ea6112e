//! First-stage pruners: shrink the list before the exact filter runs
//!
//! A pruner selects a subset of positions, preserving attribute order, so
//! the exact filter only has to work on the survivors. The variants trade
//! retained size against quality guarantees:
//!
//! - [`CutoffPruner`]: midpoint threshold, no guarantee; baseline.
//! - [`TopkPruner`]: the k largest relevances (plus ties), 0.5-optimal.
//! - [`TopkIndexedPruner`]: exactly k survivors via a positional heap.
//! - [`EpsPruner`]: geometric relevance intervals, (1-epsilon)-optimal.

mod cutoff;
mod eps;
mod topk;

pub use cutoff::CutoffPruner;
pub use eps::EpsPruner;
pub use topk::{TopkIndexedPruner, TopkPruner};

use crate::types::{MinMax, PrunerSolution, Relevance};

/// A first-stage pruning strategy.
pub trait Pruner {
    /// Prune the given attribute-ordered relevance list, returning the
    /// surviving positions in increasing order. `minmax` summarises the
    /// active prefix and is supplied by the caller to avoid a rescan.
    fn apply(&self, rel_list: &[Relevance], minmax: MinMax) -> PrunerSolution;
}
