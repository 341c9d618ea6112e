//! # rapid_filtering
//!
//! Two-stage filtering of attribute-sorted result lists.
//!
//! Given a list of items already sorted by some attribute (price, date)
//! with non-negative relevance estimates, the library selects at most k
//! items, preserving the attribute order, that maximise a rank-discounted
//! search quality metric.
//!
//! ## Features
//!
//! - **Exact**: a dynamic-programming filter computes the optimal
//!   selection in O(n*k)
//! - **Fast**: pruners shrink the input first, with provable quality
//!   bounds (0.5-optimal top-k, (1-epsilon)-optimal interval pruning)
//! - **Measured**: a composition harness times both stages, checks every
//!   guarantee, and aggregates results across list collections into a
//!   JSON report

pub mod assessment;
pub mod check;
pub mod composition;
pub mod errors;
pub mod filter;
pub mod heapq;
pub mod io;
pub mod metric;
pub mod pruner;
pub mod types;

// Re-export commonly used types
pub use errors::{FilteringError, Result};
pub use types::{FilterSolution, Index, MinMax, PrunerSolution, Relevance, Score, K};

// Re-export main functionality
pub use assessment::{run_assessment, AssessmentConfig, ReportEntry};
pub use composition::{AggregateOutcome, Composition, TestOutcome};
pub use filter::{Filter, SpirinFilter};
pub use metric::{Dcg, DcgLinear, MetricKind, SearchQualityMetric};
pub use pruner::{CutoffPruner, EpsPruner, Pruner, TopkIndexedPruner, TopkPruner};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
