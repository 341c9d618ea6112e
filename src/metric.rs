//! Search quality metrics of the gain x discount family
//!
//! A metric scores a solution as `sum gain(rel[s_i]) * discount(i+1)` over
//! the selected items in order (positions are 1-based). Both supported
//! variants precompute their discount table and its prefix sums at
//! construction, so every query is O(1):
//!
//! - [`Dcg`]: `gain(r) = 2^r - 1`, `discount(i) = 1/log2(i+1)`
//! - [`DcgLinear`]: `gain(r) = r`, `discount(i) = 1/i`
//!
//! Tables are sized to a maximum position chosen by the caller (at least
//! the largest k in play). Positions beyond that bound must never be
//! queried.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::types::{Index, Relevance, Score};

/// A search quality metric usable by filters and pruners.
///
/// Implementations are immutable after construction and safe to share by
/// reference across every stage of a run.
pub trait SearchQualityMetric {
    /// Per-item gain as a function of relevance
    fn gain_factor(&self, relevance: Relevance) -> Score;

    /// Inverse of [`gain_factor`](Self::gain_factor), mapping a gain back
    /// to the relevance producing it
    fn gain_factor_inverse(&self, gain: Score) -> Relevance;

    /// Position-dependent weight; `discount(0)` is 0, positions are 1-based
    fn discount_factor(&self, position: Index) -> Score;

    /// Sum of discounts over the inclusive position range `[left, right]`
    fn discount_factor_sum(&self, left: Index, right: Index) -> Score;

    /// Largest position the tables were built for
    fn max_position(&self) -> Index;

    /// Contribution of one item at the given 1-based position
    #[inline]
    fn score_at(&self, relevance: Relevance, position: Index) -> Score {
        self.gain_factor(relevance) * self.discount_factor(position)
    }
}

/// Precomputed discounts and their prefix sums, shared by both metrics.
#[derive(Debug, Clone)]
struct DiscountTable {
    /// `discounts[i]` is the weight of position i; index 0 holds 0
    discounts: Vec<Score>,
    /// `sums[i] = discounts[1] + ... + discounts[i]`; index 0 holds 0
    sums: Vec<Score>,
}

impl DiscountTable {
    fn new(max_position: Index, discount: impl Fn(Index) -> Score) -> Self {
        let len = max_position as usize + 1;
        let mut discounts = Vec::with_capacity(len);
        let mut sums = Vec::with_capacity(len);
        discounts.push(0.0);
        sums.push(0.0);
        for position in 1..=max_position {
            let value = discount(position);
            discounts.push(value);
            sums.push(sums[position as usize - 1] + value);
        }
        Self { discounts, sums }
    }

    #[inline]
    fn discount(&self, position: Index) -> Score {
        self.discounts[position as usize]
    }

    #[inline]
    fn sum(&self, left: Index, right: Index) -> Score {
        self.sums[right as usize] - self.sums[left as usize - 1]
    }

    fn max_position(&self) -> Index {
        (self.discounts.len() - 1) as Index
    }
}

/// Discounted cumulative gain with exponential gains.
#[derive(Debug, Clone)]
pub struct Dcg {
    table: DiscountTable,
}

impl Dcg {
    /// Build the metric with tables covering positions `1..=max_position`
    pub fn new(max_position: Index) -> Self {
        Self {
            table: DiscountTable::new(max_position, |i| 1.0 / (i as Score + 1.0).log2()),
        }
    }
}

impl SearchQualityMetric for Dcg {
    #[inline]
    fn gain_factor(&self, relevance: Relevance) -> Score {
        relevance.exp2() - 1.0
    }

    #[inline]
    fn gain_factor_inverse(&self, gain: Score) -> Relevance {
        (gain + 1.0).log2()
    }

    #[inline]
    fn discount_factor(&self, position: Index) -> Score {
        self.table.discount(position)
    }

    #[inline]
    fn discount_factor_sum(&self, left: Index, right: Index) -> Score {
        self.table.sum(left, right)
    }

    fn max_position(&self) -> Index {
        self.table.max_position()
    }
}

/// Discounted cumulative gain with linear gains and Zipfian discounts.
#[derive(Debug, Clone)]
pub struct DcgLinear {
    table: DiscountTable,
}

impl DcgLinear {
    /// Build the metric with tables covering positions `1..=max_position`
    pub fn new(max_position: Index) -> Self {
        Self {
            table: DiscountTable::new(max_position, |i| 1.0 / i as Score),
        }
    }
}

impl SearchQualityMetric for DcgLinear {
    #[inline]
    fn gain_factor(&self, relevance: Relevance) -> Score {
        relevance
    }

    #[inline]
    fn gain_factor_inverse(&self, gain: Score) -> Relevance {
        gain
    }

    #[inline]
    fn discount_factor(&self, position: Index) -> Score {
        self.table.discount(position)
    }

    #[inline]
    fn discount_factor_sum(&self, left: Index, right: Index) -> Score {
        self.table.sum(left, right)
    }

    fn max_position(&self) -> Index {
        self.table.max_position()
    }
}

/// Selects which metric family a run uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    /// Exponential gains, logarithmic discounts
    #[default]
    Dcg,
    /// Linear gains, Zipfian discounts
    DcgLinear,
}

impl MetricKind {
    /// Canonical command-line name of the metric
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Dcg => "dcg",
            MetricKind::DcgLinear => "dcglz",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricKind {
    type Err = crate::errors::FilteringError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_lowercase().as_str() {
            "dcg" => Ok(MetricKind::Dcg),
            "dcglz" | "dcg_linear" => Ok(MetricKind::DcgLinear),
            other => Err(crate::errors::FilteringError::invalid_config(format!(
                "unknown metric '{other}', available options are: dcg, dcglz"
            ))),
        }
    }
}
