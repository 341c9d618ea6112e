//! Pruner-filter composition
//!
//! A composition chains an optional pruning stage with an exact filtering
//! stage, remaps the filter's local indices back into the original list,
//! and measures each stage by repeating it `num_runs` times behind an
//! anti-elision sink. Outcomes stream into a running aggregation that
//! never materialises the full history.

use std::hint::black_box;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;

use crate::errors::{FilteringError, Result};
use crate::filter::Filter;
use crate::pruner::Pruner;
use crate::types::{Index, MinMax, Relevance, Score};

/// Milliseconds elapsed since `start`
#[inline]
fn elapsed_millis(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1e3
}

/// Result of running one composition on one list.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TestOutcome {
    /// Score of the solution
    pub score: Score,
    /// Indices of the elements composing the solution, into the original list
    pub indices: Vec<Index>,
    /// Elements removed by the first stage
    pub num_elements_pruned: Index,
    /// Elements surviving the first stage
    pub num_elements_not_pruned: Index,
    /// Milliseconds spent in the first stage (pruning), averaged over runs
    pub first_stage_time: f64,
    /// Milliseconds spent in the second stage (filtering), averaged over runs
    pub second_stage_time: f64,
    /// Total milliseconds across both stages
    pub total_time: f64,
}

/// Running aggregation over many per-list outcomes.
///
/// Averages use the stable mixing `new/(n+1) + old*n/(n+1)`, which loses a
/// little precision but cannot overflow no matter how many lists stream
/// through.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AggregateOutcome {
    pub avg_score: f64,
    pub max_approximation_error: f64,
    pub avg_approximation_error: f64,
    pub avg_num_elements_pruned: f64,
    pub avg_num_elements_not_pruned: f64,
    pub avg_first_stage_time: f64,
    pub avg_second_stage_time: f64,
    pub avg_total_time: f64,
}

impl AggregateOutcome {
    /// Fold one outcome into the aggregation. `num_previously_assessed` is
    /// the count of lists already folded in; the approximation error is
    /// `1 - score/optimal` when a positive optimum is supplied and 0
    /// otherwise.
    pub fn update(
        &mut self,
        outcome: &TestOutcome,
        num_previously_assessed: usize,
        optimal_score: Option<Score>,
    ) {
        let new_multiplier = 1.0 / (num_previously_assessed as f64 + 1.0);
        let old_multiplier = num_previously_assessed as f64 * new_multiplier;

        let approximation_error = match optimal_score {
            Some(optimal) if optimal > 0.0 => 1.0 - f64::from(outcome.score) / f64::from(optimal),
            _ => 0.0,
        };
        if approximation_error > self.max_approximation_error {
            self.max_approximation_error = approximation_error;
        }

        self.avg_score =
            new_multiplier * f64::from(outcome.score) + old_multiplier * self.avg_score;
        self.avg_approximation_error =
            new_multiplier * approximation_error + old_multiplier * self.avg_approximation_error;
        self.avg_num_elements_pruned = new_multiplier * f64::from(outcome.num_elements_pruned)
            + old_multiplier * self.avg_num_elements_pruned;
        self.avg_num_elements_not_pruned = new_multiplier
            * f64::from(outcome.num_elements_not_pruned)
            + old_multiplier * self.avg_num_elements_not_pruned;
        self.avg_first_stage_time =
            new_multiplier * outcome.first_stage_time + old_multiplier * self.avg_first_stage_time;
        self.avg_second_stage_time = new_multiplier * outcome.second_stage_time
            + old_multiplier * self.avg_second_stage_time;
        self.avg_total_time =
            new_multiplier * outcome.total_time + old_multiplier * self.avg_total_time;
    }
}

/// An arbitrary pruner-filter pairing under test.
///
/// The pruner is optional: a composition without one runs the filter on
/// the full list and is, by definition, the optimal strategy.
pub struct Composition {
    name: String,
    pruner: Option<Arc<dyn Pruner>>,
    filter: Arc<dyn Filter>,
    num_runs: u32,
    epsilon_below: f64,
    epsilon_above: f64,
}

impl Composition {
    /// Create a composition.
    ///
    /// `num_runs` is how many times each stage is repeated for timing
    /// accuracy; the tolerances state how far the composed score may fall
    /// below or rise above the optimum (0 for exact strategies).
    pub fn new(
        name: impl Into<String>,
        pruner: Option<Arc<dyn Pruner>>,
        filter: Arc<dyn Filter>,
        num_runs: u32,
        epsilon_below: f64,
        epsilon_above: f64,
    ) -> Result<Self> {
        if num_runs == 0 {
            return Err(FilteringError::invalid_config(
                "num_runs must be a strictly positive number",
            ));
        }
        if epsilon_below < 0.0 {
            return Err(FilteringError::invalid_config(
                "epsilon_below must be a positive floating number",
            ));
        }
        if epsilon_above < 0.0 {
            return Err(FilteringError::invalid_config(
                "epsilon_above must be a positive floating number",
            ));
        }
        Ok(Self {
            name: name.into(),
            pruner,
            filter,
            num_runs,
            epsilon_below,
            epsilon_above,
        })
    }

    /// Name shown in reports and diagnostics
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Guaranteed tolerance below the optimum
    pub fn epsilon_below(&self) -> f64 {
        self.epsilon_below
    }

    /// Guaranteed tolerance above the optimum
    pub fn epsilon_above(&self) -> f64 {
        self.epsilon_above
    }

    /// Run both stages on a list and report the composed outcome.
    ///
    /// Each stage's first invocation produces the solution that is kept;
    /// the remaining `num_runs - 1` invocations only feed the sink so the
    /// optimiser cannot elide them, and the elapsed time is divided by
    /// `num_runs`.
    pub fn run(&self, rel_list: &[Relevance], minmax: MinMax) -> TestOutcome {
        let mut outcome = TestOutcome::default();

        let mut filtering = if let Some(pruner) = &self.pruner {
            // First stage
            let start = Instant::now();
            let pruning = pruner.apply(rel_list, minmax);
            for _ in 1..self.num_runs {
                black_box(pruner.apply(rel_list, minmax).len());
            }
            outcome.first_stage_time = elapsed_millis(start) / f64::from(self.num_runs);

            outcome.num_elements_not_pruned = pruning.len() as Index;
            outcome.num_elements_pruned = (rel_list.len() - pruning.len()) as Index;

            // Compact list for the second stage
            let pruned_rel: Vec<Relevance> = pruning
                .indices
                .iter()
                .map(|&idx| rel_list[idx as usize])
                .collect();

            // Second stage
            let start = Instant::now();
            let mut filtering = self.filter.apply(&pruned_rel);
            for _ in 1..self.num_runs {
                black_box(self.filter.apply(&pruned_rel).len());
            }
            outcome.second_stage_time = elapsed_millis(start) / f64::from(self.num_runs);

            // Local positions back into the original list
            for idx in filtering.indices.iter_mut() {
                *idx = pruning.indices[*idx as usize];
            }
            filtering
        } else {
            let start = Instant::now();
            let filtering = self.filter.apply(rel_list);
            for _ in 1..self.num_runs {
                black_box(self.filter.apply(rel_list).len());
            }
            outcome.second_stage_time = elapsed_millis(start) / f64::from(self.num_runs);
            filtering
        };

        outcome.score = filtering.score;
        outcome.indices = std::mem::take(&mut filtering.indices);
        outcome.total_time = outcome.first_stage_time + outcome.second_stage_time;

        outcome
    }
}

impl std::fmt::Debug for Composition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Composition")
            .field("name", &self.name)
            .field("has_pruner", &self.pruner.is_some())
            .field("num_runs", &self.num_runs)
            .field("epsilon_below", &self.epsilon_below)
            .field("epsilon_above", &self.epsilon_above)
            .finish()
    }
}
