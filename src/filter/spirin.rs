//! Exact Filter@k by dynamic programming
//!
//! Implements the lossless filtering method of Spirin et al., "Relevance-aware
//! Filtering of Tuples Sorted by an Attribute Value via Direct Optimization
//! of Search Quality Metrics".

use std::sync::Arc;

use crate::filter::Filter;
use crate::metric::SearchQualityMetric;
use crate::types::{FilterSolution, Index, Relevance, K};

/// Exact Filter@k.
///
/// Runs a DP over (position, number of selected items) where the cell for
/// row `i`, column `j` holds the best score achievable using the first
/// `i+1` items with `j+1` of them selected. Time and extra memory are both
/// O(n*k); every query against the metric is a table lookup.
#[derive(Debug, Clone)]
pub struct SpirinFilter<M> {
    k: K,
    metric: Arc<M>,
}

impl<M: SearchQualityMetric> SpirinFilter<M> {
    /// Create a filter keeping at most `k` elements.
    ///
    /// The metric's tables must cover positions up to `k`.
    pub fn new(k: K, metric: Arc<M>) -> Self {
        Self { k, metric }
    }

    /// Maximum number of elements this filter keeps
    pub fn k(&self) -> K {
        self.k
    }
}

impl<M: SearchQualityMetric> Filter for SpirinFilter<M> {
    fn apply(&self, rel_list: &[Relevance]) -> FilterSolution {
        let n = rel_list.len();
        let mut solution = FilterSolution::default();
        if n == 0 || self.k == 0 {
            return solution;
        }
        let metric = self.metric.as_ref();
        let k = (self.k as usize).min(n);

        // The DP matrix flattened into one buffer: a triangular block for
        // rows 0..k (row i holds i+1 cells) followed by a rectangular block
        // of width k for rows k..n.
        let mut m = vec![0.0f32; (k - 1) * k / 2 + k * (n - (k - 1))];
        let gains: Vec<f32> = rel_list.iter().map(|&r| metric.gain_factor(r)).collect();
        let discounts: Vec<f32> = (1..=k).map(|i| metric.discount_factor(i as Index)).collect();

        // Shifts locating the current and previous row inside the buffer.
        let mut prev = 0usize;
        let mut curr = 0usize;

        m[0] = gains[0] * discounts[0];
        for row in 1..k {
            curr = prev + row;

            m[curr] = m[prev].max(gains[row] * discounts[0]);
            for col in 1..row {
                m[curr + col] = m[prev + col].max(m[prev + col - 1] + gains[row] * discounts[col]);
            }
            // Diagonal cell: selecting row+1 items out of row+1 leaves no
            // skip alternative.
            m[curr + row] = m[prev + row - 1] + gains[row] * discounts[row];

            prev = curr;
        }
        for row in k..n {
            curr = prev + k;

            m[curr] = m[prev].max(gains[row] * discounts[0]);
            for col in 1..k {
                m[curr + col] = m[prev + col].max(m[prev + col - 1] + gains[row] * discounts[col]);
            }

            prev = curr;
        }

        // The optimum is the best cell of the last row; curr still points
        // at it.
        solution.indices.reserve(k);
        let mut best_column = 0usize;
        for col in 0..k {
            if m[curr + col] > solution.score {
                solution.score = m[curr + col];
                best_column = col;
            }
        }

        // Walk the rows backwards: a row participates iff keeping it beats
        // the same column one row up.
        let mut row = n - 1;
        while row > 0 {
            let prev_shift = curr - if row < k { row } else { k };
            if m[curr + best_column] > m[prev_shift + best_column] {
                solution.indices.push(row as Index);
                if best_column == 0 {
                    break;
                }
                best_column -= 1;
            }
            curr = prev_shift;
            row -= 1;
        }
        if curr == 0 {
            solution.indices.push(0);
        }

        // Collected right to left; restore increasing order.
        solution.indices.reverse();

        solution
    }
}
