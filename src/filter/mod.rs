//! Second-stage filters: select at most k items maximising the metric
//!
//! A filter receives a relevance list in attribute order and returns the
//! best-scoring subset of at most k positions, still in attribute order.
//! [`SpirinFilter`] is the exact dynamic-programming implementation; it is
//! both the production filter and the ground truth every pruner is
//! measured against.

mod spirin;

pub use spirin::SpirinFilter;

use crate::types::{FilterSolution, Relevance};

/// A second-stage filtering strategy.
pub trait Filter {
    /// Filter the given attribute-ordered relevance list and return the
    /// selected positions with their score.
    fn apply(&self, rel_list: &[Relevance]) -> FilterSolution;
}
