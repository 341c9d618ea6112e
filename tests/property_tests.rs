//! Property-based tests using proptest
//!
//! The invariants every stage must uphold for arbitrary lists: index
//! ordering, size bounds, score consistency, exactness of the DP filter,
//! and the contractual quality guarantees of the pruners.

use std::sync::Arc;

use proptest::prelude::*;
use rapid_filtering::check::score_solution;
use rapid_filtering::*;

/// Exhaustive optimum over every subset of size <= k; only viable for
/// short lists.
fn brute_force_optimum<M: SearchQualityMetric>(
    rel_list: &[Relevance],
    k: usize,
    metric: &M,
) -> f64 {
    let n = rel_list.len();
    let mut best = 0.0f64;
    for mask in 0u32..(1 << n) {
        if mask.count_ones() as usize > k {
            continue;
        }
        let mut score = 0.0f64;
        let mut position = 0u32;
        for i in 0..n {
            if mask & (1 << i) != 0 {
                position += 1;
                score += f64::from(metric.score_at(rel_list[i], position));
            }
        }
        if score > best {
            best = score;
        }
    }
    best
}

fn relevances(max_len: usize) -> impl Strategy<Value = Vec<Relevance>> {
    prop::collection::vec(0.01f32..10.0, 1..=max_len)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn test_filter_indices_are_increasing_and_bounded(
        rel_list in relevances(64),
        k in 1u16..=8
    ) {
        let filter = SpirinFilter::new(k, Arc::new(Dcg::new(u32::from(k))));
        let solution = filter.apply(&rel_list);

        prop_assert!(solution.len() <= k as usize);
        for pair in solution.indices.windows(2) {
            prop_assert!(pair[0] < pair[1]);
        }
        if let Some(&last) = solution.indices.last() {
            prop_assert!((last as usize) < rel_list.len());
        }
    }

    #[test]
    fn test_filter_score_matches_recomputation(
        rel_list in relevances(64),
        k in 1u16..=8
    ) {
        let metric = Arc::new(DcgLinear::new(u32::from(k)));
        let filter = SpirinFilter::new(k, Arc::clone(&metric));
        let solution = filter.apply(&rel_list);
        let recomputed = score_solution(&rel_list, &solution.indices, metric.as_ref());
        prop_assert!(
            (f64::from(solution.score) - f64::from(recomputed)).abs() < 1e-3,
            "reported {} vs recomputed {}", solution.score, recomputed
        );
    }

    #[test]
    fn test_filter_is_exact(
        rel_list in relevances(12),
        k in 1u16..=4
    ) {
        let metric = Arc::new(Dcg::new(u32::from(k)));
        let filter = SpirinFilter::new(k, Arc::clone(&metric));
        let solution = filter.apply(&rel_list);
        let optimum = brute_force_optimum(&rel_list, k as usize, metric.as_ref());
        let slack = 1e-4 * optimum.max(1.0);
        prop_assert!(
            (f64::from(solution.score) - optimum).abs() < slack,
            "DP gave {}, brute force {}", solution.score, optimum
        );
    }

    #[test]
    fn test_pruners_preserve_order_and_subset(
        rel_list in relevances(128),
        k in 1u16..=8
    ) {
        let metric = Arc::new(Dcg::new(u32::from(k)));
        let minmax = MinMax::of(&rel_list).unwrap();
        let pruners: Vec<Box<dyn Pruner>> = vec![
            Box::new(CutoffPruner::new()),
            Box::new(TopkPruner::new(k)),
            Box::new(TopkIndexedPruner::new(k)),
            Box::new(EpsPruner::new(Arc::clone(&metric), k, 0.2)),
        ];
        for pruner in &pruners {
            let solution = pruner.apply(&rel_list, minmax);
            prop_assert!(solution.len() <= rel_list.len());
            for pair in solution.indices.windows(2) {
                prop_assert!(pair[0] < pair[1]);
            }
            if let Some(&last) = solution.indices.last() {
                prop_assert!((last as usize) < rel_list.len());
            }
        }
    }

    #[test]
    fn test_pruning_never_beats_the_optimum(
        rel_list in relevances(64),
        k in 1u16..=6
    ) {
        let metric = Arc::new(Dcg::new(u32::from(k)));
        let filter = SpirinFilter::new(k, Arc::clone(&metric));
        let minmax = MinMax::of(&rel_list).unwrap();
        let optimum = f64::from(filter.apply(&rel_list).score);

        for pruner in [
            Box::new(CutoffPruner::new()) as Box<dyn Pruner>,
            Box::new(TopkPruner::new(k)),
            Box::new(EpsPruner::new(Arc::clone(&metric), k, 0.3)),
        ] {
            let kept = pruner.apply(&rel_list, minmax);
            let pruned: Vec<Relevance> =
                kept.indices.iter().map(|&j| rel_list[j as usize]).collect();
            let score = f64::from(filter.apply(&pruned).score);
            prop_assert!(score <= optimum + 1e-4 * optimum.max(1.0));
        }
    }

    #[test]
    fn test_topk_half_optimality(
        rel_list in relevances(64),
        k in 1u16..=6
    ) {
        let metric = Arc::new(Dcg::new(u32::from(k)));
        let filter = SpirinFilter::new(k, Arc::clone(&metric));
        let minmax = MinMax::of(&rel_list).unwrap();
        let optimum = f64::from(filter.apply(&rel_list).score);

        let kept = TopkPruner::new(k).apply(&rel_list, minmax);
        let pruned: Vec<Relevance> = kept.indices.iter().map(|&j| rel_list[j as usize]).collect();
        let score = f64::from(filter.apply(&pruned).score);
        let slack = 1e-4 * optimum.max(1.0);
        prop_assert!(
            score >= 0.5 * optimum - slack,
            "top-k score {score} below half of {optimum}"
        );
    }

    #[test]
    fn test_eps_pruning_guarantee(
        rel_list in relevances(64),
        k in 2u16..=6,
        epsilon in 0.05f32..0.6
    ) {
        let metric = Arc::new(Dcg::new(u32::from(k)));
        let filter = SpirinFilter::new(k, Arc::clone(&metric));
        let minmax = MinMax::of(&rel_list).unwrap();
        let optimum = f64::from(filter.apply(&rel_list).score);

        let kept = EpsPruner::new(Arc::clone(&metric), k, epsilon).apply(&rel_list, minmax);
        let pruned: Vec<Relevance> = kept.indices.iter().map(|&j| rel_list[j as usize]).collect();
        let score = f64::from(filter.apply(&pruned).score);
        let slack = 1e-4 * optimum.max(1.0);
        prop_assert!(
            score >= (1.0 - f64::from(epsilon)) * optimum - slack,
            "eps score {score} below (1-{epsilon}) of {optimum}"
        );
    }

    #[test]
    fn test_eps_pruned_size_is_monotone_in_epsilon(
        rel_list in relevances(128),
        k in 2u16..=6
    ) {
        let metric = Arc::new(Dcg::new(u32::from(k)));
        let minmax = MinMax::of(&rel_list).unwrap();
        let mut previous = usize::MAX;
        // Descending tolerance must keep at least as many elements.
        for epsilon in [0.5f32, 0.3, 0.1, 0.05] {
            let kept = EpsPruner::new(Arc::clone(&metric), k, epsilon)
                .apply(&rel_list, minmax)
                .len();
            if previous != usize::MAX {
                prop_assert!(kept >= previous, "epsilon {epsilon}: {kept} < {previous}");
            }
            previous = kept;
        }
    }

    #[test]
    fn test_discount_sum_is_prefix_consistent(max_position in 2u32..64) {
        let metric = Dcg::new(max_position);
        for left in 1..=max_position.min(8) {
            for right in left..=max_position {
                let direct: f64 = (left..=right)
                    .map(|i| f64::from(metric.discount_factor(i)))
                    .sum();
                let fast = f64::from(metric.discount_factor_sum(left, right));
                prop_assert!((direct - fast).abs() < 1e-3);
            }
        }
    }

    #[test]
    fn test_gain_round_trip(rel in 0.0f32..12.0) {
        let metric = Dcg::new(4);
        let back = metric.gain_factor_inverse(metric.gain_factor(rel));
        prop_assert!((back - rel).abs() < 1e-3, "{rel} round-tripped to {back}");
    }

    #[test]
    fn test_composition_equals_manual_stages(
        rel_list in relevances(48),
        k in 1u16..=6
    ) {
        let metric = Arc::new(Dcg::new(u32::from(k)));
        let filter: Arc<dyn Filter> = Arc::new(SpirinFilter::new(k, Arc::clone(&metric)));
        let minmax = MinMax::of(&rel_list).unwrap();

        let pruner = TopkPruner::new(k);
        let kept = pruner.apply(&rel_list, minmax);
        let pruned: Vec<Relevance> = kept.indices.iter().map(|&j| rel_list[j as usize]).collect();
        let mut manual = filter.apply(&pruned);
        for idx in manual.indices.iter_mut() {
            *idx = kept.indices[*idx as usize];
        }

        let outcome = Composition::new(
            "Topk-OPT",
            Some(Arc::new(pruner)),
            filter,
            1,
            0.5,
            0.0,
        )
        .unwrap()
        .run(&rel_list, minmax);

        prop_assert_eq!(outcome.indices, manual.indices);
        prop_assert_eq!(outcome.score, manual.score);
    }
}
