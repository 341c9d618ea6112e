//! Core types for rapid_filtering
//!
//! Scalar aliases shared by every stage, the min/max summary supplied by
//! the caller, and the two solution representations flowing out of pruners
//! and filters.

use serde::{Deserialize, Serialize};

/// Relevance of a single result item. Non-negative by convention: readers
/// drop items with relevance <= 0 before the core ever sees them.
pub type Relevance = f32;

/// Score of a (partial) solution, same precision as [`Relevance`].
pub type Score = f32;

/// Zero-based position inside an attribute-sorted list.
pub type Index = u32;

/// Maximum solution size. Lists are long, solutions are short.
pub type K = u16;

/// Minimum and maximum relevance over the active prefix of a list.
///
/// Computed once per list by the caller (it falls out of the attribute
/// sort for free) and handed to every pruner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MinMax {
    pub min: Relevance,
    pub max: Relevance,
}

impl MinMax {
    /// Create a summary from explicit bounds
    pub fn new(min: Relevance, max: Relevance) -> Self {
        Self { min, max }
    }

    /// Scan a list for its extremes. Returns `None` on empty input.
    pub fn of(rel_list: &[Relevance]) -> Option<Self> {
        let (&first, rest) = rel_list.split_first()?;
        let mut minmax = Self::new(first, first);
        for &rel in rest {
            if rel < minmax.min {
                minmax.min = rel;
            } else if rel > minmax.max {
                minmax.max = rel;
            }
        }
        Some(minmax)
    }
}

/// Outcome of the first (pruning) stage: the surviving positions of the
/// original list, strictly increasing, so attribute order is preserved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrunerSolution {
    /// Indices into the original list, strictly increasing
    pub indices: Vec<Index>,
}

impl PrunerSolution {
    /// Number of elements that survived pruning
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// Check whether everything was pruned away
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Outcome of the second (filtering) stage.
///
/// Two solutions are equal iff they have the same score and are composed
/// of the same indices; timings are tracked elsewhere and never take part
/// in equality.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterSolution {
    /// Score of the solution under the configured metric
    pub score: Score,
    /// Indices of the selected elements, strictly increasing
    pub indices: Vec<Index>,
}

impl FilterSolution {
    /// Number of elements composing the solution
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// Check whether the solution is empty
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minmax_of() {
        let minmax = MinMax::of(&[3.0, 1.0, 5.0, 2.0]).unwrap();
        assert_eq!(minmax.min, 1.0);
        assert_eq!(minmax.max, 5.0);
    }

    #[test]
    fn test_minmax_of_single() {
        let minmax = MinMax::of(&[4.0]).unwrap();
        assert_eq!(minmax.min, 4.0);
        assert_eq!(minmax.max, 4.0);
    }

    #[test]
    fn test_minmax_of_empty() {
        assert!(MinMax::of(&[]).is_none());
    }

    #[test]
    fn test_filter_solution_equality() {
        let a = FilterSolution {
            score: 1.5,
            indices: vec![0, 2, 4],
        };
        let b = FilterSolution {
            score: 1.5,
            indices: vec![0, 2, 4],
        };
        let c = FilterSolution {
            score: 1.5,
            indices: vec![0, 2, 5],
        };
        let d = FilterSolution {
            score: 2.5,
            indices: vec![0, 2, 4],
        };
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
    }

    #[test]
    fn test_solution_len() {
        let solution = PrunerSolution {
            indices: vec![1, 3, 5],
        };
        assert_eq!(solution.len(), 3);
        assert!(!solution.is_empty());
        assert!(PrunerSolution::default().is_empty());
    }
}
