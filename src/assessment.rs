//! Assessment driver
//!
//! Builds every configured pruner-filter composition, streams result lists
//! through them for each `(n_cut, k)` combination, aggregates scores and
//! timings, and assembles the JSON report. The optimal strategy (filter
//! with no pruner) always runs first so every other strategy's
//! approximation error is measured against it.

use std::hint::black_box;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use crate::check::check_solution;
use crate::composition::{AggregateOutcome, Composition};
use crate::errors::{FilteringError, Result};
use crate::filter::{Filter, SpirinFilter};
use crate::io::ResultsList;
use crate::metric::{Dcg, DcgLinear, MetricKind, SearchQualityMetric};
use crate::pruner::{CutoffPruner, EpsPruner, TopkPruner};
use crate::types::{MinMax, Relevance, Score, K};

/// Parse a comma-separated parameter list, tolerating spaces around the
/// values.
pub fn parse_parameter_list<T: FromStr>(text: &str) -> Result<Vec<T>> {
    let mut values = Vec::new();
    for part in text.split(',') {
        let part = part.trim();
        if part.is_empty() {
            return Err(FilteringError::invalid_config(format!(
                "the parameter list '{text}' is not in csv format"
            )));
        }
        let value = part.parse().map_err(|_| {
            FilteringError::invalid_config(format!(
                "unable to read the value '{part}' of the parameter list"
            ))
        })?;
        values.push(value);
    }
    Ok(values)
}

/// Everything that shapes a run, minus the input sources.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessmentConfig {
    /// Metric family used by every stage
    pub metric: MetricKind,
    /// Prefix lengths to test; a non-positive entry means "full list"
    pub n_cut_list: Vec<i64>,
    /// Maximum solution sizes to test
    pub k_list: Vec<K>,
    /// Approximation tolerances for the epsilon pruner
    pub epsilon_list: Vec<Score>,
    /// Skip a list entirely when it is shorter than the active n_cut
    pub skip_shorter_lists: bool,
    /// Verify every solution against the checker
    pub check_solutions: bool,
    /// Repetitions of each timed stage
    pub num_runs: u32,
    /// Include the cutoff baseline strategy
    pub test_cutoff: bool,
    /// Include the top-k strategy
    pub test_topk: bool,
    /// Include the epsilon filtering strategies
    pub test_epsfiltering: bool,
}

impl Default for AssessmentConfig {
    fn default() -> Self {
        Self {
            metric: MetricKind::Dcg,
            n_cut_list: vec![0, 10_000],
            k_list: vec![50, 100],
            epsilon_list: vec![0.1, 0.01],
            skip_shorter_lists: true,
            check_solutions: false,
            num_runs: 5,
            test_cutoff: true,
            test_topk: true,
            test_epsfiltering: true,
        }
    }
}

impl AssessmentConfig {
    /// Sort, deduplicate-check, and range-check every parameter list,
    /// rotating a single "full list" entry to the end of `n_cut_list`.
    pub fn validate(&mut self) -> Result<()> {
        if self.n_cut_list.is_empty() {
            return Err(FilteringError::invalid_config(
                "the parameter n_cut_list is empty",
            ));
        }
        self.n_cut_list.sort_unstable();
        for pair in self.n_cut_list.windows(2) {
            if pair[0] == pair[1] {
                return Err(FilteringError::invalid_config(
                    "the parameter n_cut_list contains duplicates",
                ));
            }
            if pair[0] <= 0 && pair[1] <= 0 {
                return Err(FilteringError::invalid_config(
                    "the parameter n_cut_list can contain only one non-positive number",
                ));
            }
        }
        if self.n_cut_list[0] <= 0 {
            self.n_cut_list.rotate_left(1);
        }

        if self.k_list.is_empty() {
            return Err(FilteringError::invalid_config(
                "the parameter k_list is empty",
            ));
        }
        self.k_list.sort_unstable();
        for &k in &self.k_list {
            if k == 0 {
                return Err(FilteringError::invalid_config(
                    "the parameter k_list must contain values strictly greater than 0",
                ));
            }
        }
        for pair in self.k_list.windows(2) {
            if pair[0] == pair[1] {
                return Err(FilteringError::invalid_config(
                    "the parameter k_list contains duplicates",
                ));
            }
        }
        if self.n_cut_list[0] > 0 && i64::from(self.k_list[0]) > self.n_cut_list[0] {
            return Err(FilteringError::invalid_config(
                "the parameter k_list cannot be greater than n",
            ));
        }

        if self.epsilon_list.is_empty() {
            return Err(FilteringError::invalid_config(
                "the parameter epsilon_list is empty",
            ));
        }
        self.epsilon_list
            .sort_unstable_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
        for &epsilon in &self.epsilon_list {
            if epsilon <= 0.0 || epsilon >= 1.0 {
                return Err(FilteringError::invalid_config(
                    "the parameter epsilon_list must contain values between zero and one",
                ));
            }
        }
        for pair in self.epsilon_list.windows(2) {
            if pair[0] == pair[1] {
                return Err(FilteringError::invalid_config(
                    "the parameter epsilon_list contains duplicates",
                ));
            }
        }

        if self.num_runs == 0 {
            return Err(FilteringError::invalid_config(
                "the parameter num_runs must be a number strictly greater than 0",
            ));
        }

        Ok(())
    }
}

/// Ordered `strategy name -> aggregation` table.
///
/// Serializes as a JSON object whose keys keep their insertion order, so
/// `OPT` stays first in the report.
#[derive(Debug, Clone, Default)]
pub struct StrategyTable(pub Vec<(String, AggregateOutcome)>);

impl StrategyTable {
    /// Look a strategy up by name
    pub fn get(&self, name: &str) -> Option<&AggregateOutcome> {
        self.0
            .iter()
            .find(|(entry, _)| entry == name)
            .map(|(_, outcome)| outcome)
    }
}

impl Serialize for StrategyTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, outcome) in &self.0 {
            map.serialize_entry(name, outcome)?;
        }
        map.end()
    }
}

/// One `(n_cut, k)` cell of the final report.
#[derive(Debug, Clone, Serialize)]
pub struct ReportEntry {
    pub n_cut: i64,
    pub k: K,
    pub avg_reading_time: f64,
    pub num_lists_assessed: usize,
    pub strategies: StrategyTable,
}

/// Aggregation state of one `(n_cut, k)` combination while lists stream by.
#[derive(Debug, Default)]
struct CellAggregation {
    opt: AggregateOutcome,
    strategies: Vec<AggregateOutcome>,
    num_lists_assessed: usize,
    avg_reading_time: f64,
}

/// The strategies assessed for one value of k.
struct StrategySet {
    opt: Composition,
    others: Vec<Composition>,
}

fn build_strategies<M: SearchQualityMetric + 'static>(
    config: &AssessmentConfig,
    metric: &Arc<M>,
) -> Result<Vec<StrategySet>> {
    let mut sets = Vec::with_capacity(config.k_list.len());
    for &k in &config.k_list {
        let filter: Arc<dyn Filter> = Arc::new(SpirinFilter::new(k, Arc::clone(metric)));

        let opt = Composition::new("OPT", None, Arc::clone(&filter), config.num_runs, 0.0, 0.0)?;

        let mut others = Vec::new();
        if config.test_cutoff {
            others.push(Composition::new(
                "Cutoff-OPT",
                Some(Arc::new(CutoffPruner::new())),
                Arc::clone(&filter),
                config.num_runs,
                1.0,
                0.0,
            )?);
        }
        if config.test_topk {
            others.push(Composition::new(
                "Topk-OPT",
                Some(Arc::new(TopkPruner::new(k))),
                Arc::clone(&filter),
                config.num_runs,
                0.5,
                0.0,
            )?);
        }
        if config.test_epsfiltering {
            for &epsilon in &config.epsilon_list {
                others.push(Composition::new(
                    format!("EpsFiltering (epsilon={epsilon})"),
                    Some(Arc::new(EpsPruner::new(Arc::clone(metric), k, epsilon))),
                    Arc::clone(&filter),
                    config.num_runs,
                    f64::from(epsilon),
                    0.0,
                )?);
            }
        }

        sets.push(StrategySet { opt, others });
    }
    Ok(sets)
}

/// Run the full assessment over a stream of labelled lists.
///
/// The configuration must have been validated. Lists arrive as
/// `(label, list)` pairs, the label naming the list in diagnostics (a file
/// path or a running number). Returns one report entry per valid
/// `(n_cut, k)` combination, in n_cut-major order.
pub fn run_assessment<M, I>(
    config: &AssessmentConfig,
    metric: Arc<M>,
    lists: I,
) -> Result<Vec<ReportEntry>>
where
    M: SearchQualityMetric + 'static,
    I: IntoIterator<Item = Result<(String, ResultsList)>>,
{
    let strategy_sets = build_strategies(config, &metric)?;
    let mut cells: Vec<Vec<CellAggregation>> = (0..config.n_cut_list.len())
        .map(|_| {
            (0..config.k_list.len())
                .map(|ki| CellAggregation {
                    strategies: vec![
                        AggregateOutcome::default();
                        strategy_sets[ki].others.len()
                    ],
                    ..CellAggregation::default()
                })
                .collect()
        })
        .collect();

    for entry in lists {
        let (label, list) = entry?;
        let rel_list: &[Relevance] = &list.relevances;

        for (ni, &n_cut) in config.n_cut_list.iter().enumerate() {
            let n = if n_cut > 0 {
                rel_list.len().min(n_cut as usize)
            } else {
                rel_list.len()
            };
            if config.skip_shorter_lists && n_cut > 0 && (n_cut as usize) > n {
                continue;
            }
            if n == 0 {
                continue;
            }
            let active = &rel_list[..n];
            let minmax = match MinMax::of(active) {
                Some(minmax) => minmax,
                None => continue,
            };

            // How long a bare sweep over the active prefix takes; the
            // baseline cost any strategy pays just to look at the input.
            let start = Instant::now();
            for _ in 0..config.num_runs {
                for &rel in active {
                    black_box(rel);
                }
            }
            let reading_time = start.elapsed().as_secs_f64() * 1e3 / f64::from(config.num_runs);

            for (ki, &k) in config.k_list.iter().enumerate() {
                if n_cut > 0 && i64::from(k) > n_cut {
                    continue;
                }
                let set = &strategy_sets[ki];
                let cell = &mut cells[ni][ki];

                let opt_outcome = set.opt.run(active, minmax);
                let optimal_score = opt_outcome.score;
                cell.opt.update(&opt_outcome, cell.num_lists_assessed, None);
                if config.check_solutions {
                    check_solution(
                        active,
                        opt_outcome.score,
                        &opt_outcome.indices,
                        metric.as_ref(),
                        None,
                        set.opt.epsilon_below(),
                        set.opt.epsilon_above(),
                    )
                    .map_err(|err| check_context(err, set.opt.name(), n_cut, k, &label))?;
                }

                for (si, strategy) in set.others.iter().enumerate() {
                    let outcome = strategy.run(active, minmax);
                    cell.strategies[si].update(
                        &outcome,
                        cell.num_lists_assessed,
                        Some(optimal_score),
                    );
                    if config.check_solutions {
                        check_solution(
                            active,
                            outcome.score,
                            &outcome.indices,
                            metric.as_ref(),
                            Some(optimal_score),
                            strategy.epsilon_below(),
                            strategy.epsilon_above(),
                        )
                        .map_err(|err| check_context(err, strategy.name(), n_cut, k, &label))?;
                    }
                }

                let new_multiplier = 1.0 / (cell.num_lists_assessed as f64 + 1.0);
                let old_multiplier = cell.num_lists_assessed as f64 * new_multiplier;
                cell.num_lists_assessed += 1;
                cell.avg_reading_time =
                    old_multiplier * cell.avg_reading_time + new_multiplier * reading_time;
            }
        }
    }

    let mut report = Vec::new();
    for (ni, &n_cut) in config.n_cut_list.iter().enumerate() {
        for (ki, &k) in config.k_list.iter().enumerate() {
            if n_cut > 0 && i64::from(k) > n_cut {
                continue;
            }
            let cell = &cells[ni][ki];
            let set = &strategy_sets[ki];

            let mut table = vec![("OPT".to_string(), cell.opt.clone())];
            for (si, strategy) in set.others.iter().enumerate() {
                table.push((strategy.name().to_string(), cell.strategies[si].clone()));
            }

            report.push(ReportEntry {
                n_cut,
                k,
                avg_reading_time: cell.avg_reading_time,
                num_lists_assessed: cell.num_lists_assessed,
                strategies: StrategyTable(table),
            });
        }
    }
    Ok(report)
}

/// Attach strategy, parameters, and list identity to a checker failure.
fn check_context(
    err: FilteringError,
    strategy: &str,
    n_cut: i64,
    k: K,
    label: &str,
) -> FilteringError {
    let message = match &err {
        FilteringError::InvariantViolation { message } => message.clone(),
        other => other.to_string(),
    };
    FilteringError::invariant_violation(format!(
        "{message}. {strategy} with n={n_cut} and k={k} on the list '{label}'"
    ))
}

/// Run the assessment with the metric family selected by the
/// configuration, sizing the metric tables to the largest k.
pub fn run<I>(config: &AssessmentConfig, lists: I) -> Result<Vec<ReportEntry>>
where
    I: IntoIterator<Item = Result<(String, ResultsList)>>,
{
    let max_k = *config.k_list.last().ok_or_else(|| {
        FilteringError::invalid_config("the parameter k_list is empty")
    })?;
    match config.metric {
        MetricKind::Dcg => run_assessment(config, Arc::new(Dcg::new(u32::from(max_k))), lists),
        MetricKind::DcgLinear => {
            run_assessment(config, Arc::new(DcgLinear::new(u32::from(max_k))), lists)
        }
    }
}
