//! Epsilon pruning
//!
//! Implements the (1-epsilon)-optimal pruning described by Nardini et al.,
//! "Fast Approximate Filtering of Search Results Sorted by Attribute".
//!
//! Relevances are bucketed into geometrically shrinking gain intervals; a
//! right-to-left sweep keeps at most k elements per interval, so the
//! retained size is bounded by the interval count times k, independent of
//! the input length.

use std::sync::Arc;

use crate::heapq;
use crate::metric::SearchQualityMetric;
use crate::pruner::Pruner;
use crate::types::{Index, MinMax, PrunerSolution, Relevance, Score, K};

/// Pruner with a contractual (1-epsilon)-optimality guarantee: the exact
/// filter restricted to the survivors scores at least `(1 - epsilon)`
/// times the optimum over the full list.
#[derive(Debug, Clone)]
pub struct EpsPruner<M> {
    metric: Arc<M>,
    k: K,
    epsilon: Score,
}

impl<M: SearchQualityMetric> EpsPruner<M> {
    /// Create a pruner for the given `k` and tolerance `epsilon` in (0, 1).
    ///
    /// The metric's tables must cover positions up to `k`.
    pub fn new(metric: Arc<M>, k: K, epsilon: Score) -> Self {
        Self { metric, k, epsilon }
    }

    /// Guaranteed approximation tolerance
    pub fn epsilon(&self) -> Score {
        self.epsilon
    }

    /// The lowest gain any kept element may have, and the relevance
    /// threshold realising it in floating point.
    ///
    /// The analytical bound keeps only elements whose total contribution
    /// beyond the top one can reach `epsilon` times the best element's
    /// score. Two floating-point guards apply: the bound is shaded by
    /// `1 - 1e-16` before inversion, and the inverted threshold is
    /// iteratively lowered until `gain(threshold) <= g_min` holds in `f32`.
    fn gain_floor(&self, minmax: MinMax) -> (Score, Relevance) {
        let metric = self.metric.as_ref();
        let delta = 1.0 - self.epsilon;
        let max_gain = metric.gain_factor(minmax.max);
        let bound = (self.epsilon * max_gain * metric.discount_factor(1))
            / (delta * metric.discount_factor_sum(2, self.k as Index));
        // For small k with a large epsilon the bound can exceed the top
        // gain itself; clamping keeps the maximal elements retained.
        let min_gain =
            (f64::from(metric.gain_factor(minmax.min).max(bound).min(max_gain)) * (1.0 - 1e-16))
                as Score;

        let mut min_threshold = metric.gain_factor_inverse(min_gain);
        let mut i = 16;
        while i > 0 && metric.gain_factor(min_threshold) > min_gain {
            min_threshold =
                metric.gain_factor_inverse((f64::from(min_gain) - 0.1f64.powi(i)) as Score);
            i -= 1;
        }

        (min_gain, min_threshold)
    }

    /// Ascending relevance boundaries of the geometric gain intervals,
    /// ending exactly at the maximum relevance.
    fn interval_boundaries(&self, min_gain: Score, minmax: MinMax) -> Vec<Relevance> {
        let metric = self.metric.as_ref();
        let delta = f64::from(1.0 - self.epsilon);
        let max_gain = metric.gain_factor(minmax.max);

        let num_boundaries = 1 + (1.0
            + (f64::from(min_gain / max_gain).log2() / delta.log2()).ceil())
            as usize;
        let mut boundaries = vec![0.0; num_boundaries];
        let mut v = f64::from(max_gain);
        for i in (0..num_boundaries).rev() {
            boundaries[i] = metric.gain_factor_inverse(v as Score);
            v *= delta;
        }
        // The inverse reintroduces rounding error at the top; pin the last
        // boundary to the exact maximum.
        boundaries[num_boundaries - 1] = minmax.max;

        boundaries
    }
}

impl<M: SearchQualityMetric> Pruner for EpsPruner<M> {
    fn apply(&self, rel_list: &[Relevance], minmax: MinMax) -> PrunerSolution {
        let n = rel_list.len();
        let k = self.k as usize;
        let mut solution = PrunerSolution::default();
        if n == 0 || k == 0 {
            return solution;
        }

        let (min_gain, mut min_threshold) = self.gain_floor(minmax);
        let boundaries = self.interval_boundaries(min_gain, minmax);
        let last_boundary = boundaries.len() - 1;
        debug_assert!(boundaries[0] <= min_threshold);

        solution.indices.reserve((boundaries.len() * k).min(n));

        // Seed: the k rightmost elements passing the analytical threshold.
        let mut heap: Vec<Relevance> = Vec::with_capacity(k);
        let mut i = n;
        while i > 0 {
            i -= 1;
            if rel_list[i] >= min_threshold {
                solution.indices.push(i as Index);
                heap.push(rel_list[i]);
                if heap.len() == k {
                    break;
                }
            }
        }
        if heap.is_empty() {
            return solution;
        }
        heapq::heapify(&mut heap, |a, b| a < b);

        // The weakest kept element dictates which interval still matters.
        let mut min_interval_id = 0;
        while boundaries[min_interval_id] < heap[0] {
            min_interval_id += 1;
        }
        min_threshold = boundaries[min_interval_id];

        while i > 0 {
            i -= 1;
            let rel = rel_list[i];
            if rel <= min_threshold {
                continue;
            }
            solution.indices.push(i as Index);
            heapq::replace(&mut heap, rel, |a, b| a < b);

            if boundaries[min_interval_id] < heap[0] {
                min_interval_id += 1;
                while boundaries[min_interval_id] < heap[0] {
                    min_interval_id += 1;
                }
                if min_interval_id == last_boundary {
                    break;
                }
                min_threshold = boundaries[min_interval_id];
            }
        }

        // Collected right to left; restore increasing order.
        solution.indices.reverse();

        solution
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{Filter, SpirinFilter};
    use crate::metric::{Dcg, DcgLinear};

    fn minmax(rel_list: &[Relevance]) -> MinMax {
        MinMax::of(rel_list).unwrap()
    }

    #[test]
    fn test_keeps_dominant_elements() {
        let rel_list = [1.0, 10.0, 1.0, 1.0, 1.0, 10.0, 1.0];
        let metric = Arc::new(DcgLinear::new(4));
        let pruner = EpsPruner::new(Arc::clone(&metric), 2, 0.5);
        let solution = pruner.apply(&rel_list, minmax(&rel_list));

        assert!(solution.indices.contains(&1));
        assert!(solution.indices.contains(&5));
        for pair in solution.indices.windows(2) {
            assert!(pair[0] < pair[1]);
        }

        // Downstream exact filtering on the survivors must stay within
        // the guarantee.
        let filter = SpirinFilter::new(2, Arc::clone(&metric));
        let optimum = filter.apply(&rel_list).score;
        let pruned: Vec<Relevance> = solution
            .indices
            .iter()
            .map(|&j| rel_list[j as usize])
            .collect();
        let approx = filter.apply(&pruned).score;
        assert!(approx >= 0.5 * optimum - 1e-6);
    }

    #[test]
    fn test_guarantee_on_mixed_list() {
        let rel_list = [3.0, 1.0, 4.0, 1.0, 5.0, 9.0, 2.0, 6.0];
        let metric = Arc::new(Dcg::new(4));
        let filter = SpirinFilter::new(4, Arc::clone(&metric));
        let optimum = filter.apply(&rel_list).score;

        for epsilon in [0.5f32, 0.1, 0.01] {
            let pruner = EpsPruner::new(Arc::clone(&metric), 4, epsilon);
            let solution = pruner.apply(&rel_list, minmax(&rel_list));
            let pruned: Vec<Relevance> = solution
                .indices
                .iter()
                .map(|&j| rel_list[j as usize])
                .collect();
            let approx = filter.apply(&pruned).score;
            assert!(
                f64::from(approx) >= f64::from((1.0 - epsilon) * optimum) - 1e-6,
                "epsilon={epsilon}: {approx} vs optimum {optimum}"
            );
        }
    }

    #[test]
    fn test_smaller_epsilon_keeps_no_fewer_elements() {
        let rel_list: Vec<Relevance> = (0..200)
            .map(|i| 1.0 + ((i * 7919) % 97) as Relevance / 10.0)
            .collect();
        let metric = Arc::new(Dcg::new(8));
        let loose = EpsPruner::new(Arc::clone(&metric), 8, 0.5)
            .apply(&rel_list, minmax(&rel_list))
            .len();
        let tight = EpsPruner::new(Arc::clone(&metric), 8, 0.05)
            .apply(&rel_list, minmax(&rel_list))
            .len();
        assert!(tight >= loose, "tight={tight}, loose={loose}");
    }

    #[test]
    fn test_retained_size_independent_of_n() {
        // Same value distribution, 10x the length: the kept count must be
        // bounded by intervals x k, not by n.
        let metric = Arc::new(DcgLinear::new(4));
        let pruner = EpsPruner::new(Arc::clone(&metric), 4, 0.25);

        let short: Vec<Relevance> = (0..100).map(|i| 1.0 + (i % 10) as Relevance).collect();
        let long: Vec<Relevance> = (0..1000).map(|i| 1.0 + (i % 10) as Relevance).collect();
        let kept_short = pruner.apply(&short, minmax(&short)).len();
        let kept_long = pruner.apply(&long, minmax(&long)).len();

        let num_boundaries = pruner
            .interval_boundaries(pruner.gain_floor(minmax(&long)).0, minmax(&long))
            .len();
        assert!(kept_long <= num_boundaries * 4 + 4);
        assert!(kept_short <= num_boundaries * 4 + 4);
    }

    #[test]
    fn test_boundaries_ascend_and_end_at_max() {
        let rel_list = [0.5, 2.0, 7.0, 3.0];
        let metric = Arc::new(Dcg::new(4));
        let pruner = EpsPruner::new(Arc::clone(&metric), 2, 0.3);
        let mm = minmax(&rel_list);
        let (min_gain, _) = pruner.gain_floor(mm);
        let boundaries = pruner.interval_boundaries(min_gain, mm);

        assert_eq!(*boundaries.last().unwrap(), 7.0);
        for pair in boundaries.windows(2) {
            assert!(pair[0] < pair[1], "boundaries not ascending: {boundaries:?}");
        }
    }

    #[test]
    fn test_threshold_tightening_holds_in_float() {
        let metric = Arc::new(Dcg::new(8));
        let pruner = EpsPruner::new(Arc::clone(&metric), 8, 0.1);
        let mm = MinMax::new(0.2, 6.5);
        let (min_gain, threshold) = pruner.gain_floor(mm);
        assert!(metric.gain_factor(threshold) <= min_gain);
    }

    #[test]
    fn test_empty_input() {
        let metric = Arc::new(Dcg::new(4));
        let pruner = EpsPruner::new(metric, 4, 0.1);
        assert!(pruner.apply(&[], MinMax::new(0.0, 0.0)).is_empty());
    }

    #[test]
    fn test_single_element() {
        let metric = Arc::new(Dcg::new(4));
        let pruner = EpsPruner::new(metric, 4, 0.1);
        let solution = pruner.apply(&[2.5], MinMax::new(2.5, 2.5));
        assert_eq!(solution.indices, vec![0]);
    }
}
