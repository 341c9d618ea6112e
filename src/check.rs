//! Solution checking
//!
//! Recomputes scores from first principles and verifies that reported
//! scores and guaranteed bounds actually hold. A failure here is never bad
//! input; it means a pruner or filter is broken.

use crate::errors::{FilteringError, Result};
use crate::metric::SearchQualityMetric;
use crate::types::{Index, Relevance, Score};

/// Numerical slack applied to every bound comparison.
const SLACK: f64 = 1.0e-12;

/// Recompute the score of a solution from its indices (positions are
/// 1-based into the discount table).
pub fn score_solution<M: SearchQualityMetric>(
    rel_list: &[Relevance],
    indices: &[Index],
    metric: &M,
) -> Score {
    let mut score = 0.0;
    for (i, &idx) in indices.iter().enumerate() {
        score += metric.score_at(rel_list[idx as usize], i as Index + 1);
    }
    score
}

/// Verify a solution against its reported score and, when available, the
/// optimal score.
///
/// `epsilon_below` and `epsilon_above` are the guaranteed tolerances under
/// and over the reference value; zero means the solution must match the
/// reference exactly (up to the numerical slack). Each reference check is
/// four-sided:
///
/// - `reported >= (1 - epsilon_below) * real - slack`
/// - `reported <= (1 + epsilon_above) * real + slack`
///
/// and the same pair against `optimal_score` when one is supplied.
pub fn check_solution<M: SearchQualityMetric>(
    rel_list: &[Relevance],
    solution_score: Score,
    indices: &[Index],
    metric: &M,
    optimal_score: Option<Score>,
    epsilon_below: f64,
    epsilon_above: f64,
) -> Result<()> {
    for pair in indices.windows(2) {
        if pair[0] >= pair[1] {
            return Err(FilteringError::invariant_violation(format!(
                "the solution indices are not strictly increasing ({} then {})",
                pair[0], pair[1]
            )));
        }
    }
    if let Some(&last) = indices.last() {
        if last as usize >= rel_list.len() {
            return Err(FilteringError::invariant_violation(format!(
                "the solution index {last} is out of range for a list of {} elements",
                rel_list.len()
            )));
        }
    }

    let real_score = f64::from(score_solution(rel_list, indices, metric));
    let reported = f64::from(solution_score);

    if reported + SLACK < (1.0 - epsilon_below) * real_score {
        return Err(FilteringError::invariant_violation(format!(
            "the solution score {reported} is less than (1-eps) times the real score {real_score}"
        )));
    }
    if reported - SLACK > (1.0 + epsilon_above) * real_score {
        return Err(FilteringError::invariant_violation(format!(
            "the solution score {reported} is greater than (1+eps) times the real score {real_score}"
        )));
    }

    if let Some(optimal) = optimal_score {
        let optimal = f64::from(optimal);
        if real_score + SLACK < (1.0 - epsilon_below) * optimal {
            return Err(FilteringError::invariant_violation(format!(
                "the real score {real_score} is less than (1-eps) times the optimal one {optimal}"
            )));
        }
        if real_score - SLACK > (1.0 + epsilon_above) * optimal {
            return Err(FilteringError::invariant_violation(format!(
                "the real score {real_score} is greater than (1+eps) times the optimal one {optimal}"
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metric::{Dcg, DcgLinear};

    #[test]
    fn test_score_solution() {
        let metric = DcgLinear::new(4);
        // 6*1 + 4*(1/2) + 2*(1/3)
        let score = score_solution(&[6.0, 4.0, 2.0], &[0, 1, 2], &metric);
        assert!((score - (6.0 + 2.0 + 2.0 / 3.0)).abs() < 1e-5);
    }

    #[test]
    fn test_score_solution_empty() {
        let metric = Dcg::new(4);
        assert_eq!(score_solution(&[1.0, 2.0], &[], &metric), 0.0);
    }

    #[test]
    fn test_exact_solution_passes() {
        let metric = DcgLinear::new(4);
        let rel_list = [6.0, 4.0, 2.0];
        let score = score_solution(&rel_list, &[0, 1], &metric);
        assert!(check_solution(&rel_list, score, &[0, 1], &metric, None, 0.0, 0.0).is_ok());
    }

    #[test]
    fn test_misreported_score_fails() {
        let metric = DcgLinear::new(4);
        let rel_list = [6.0, 4.0, 2.0];
        let err = check_solution(&rel_list, 100.0, &[0, 1], &metric, None, 0.0, 0.0);
        assert!(err.is_err());
        assert!(err.unwrap_err().is_invariant_violation());

        let err = check_solution(&rel_list, 1.0, &[0, 1], &metric, None, 0.0, 0.0);
        assert!(err.is_err());
    }

    #[test]
    fn test_tolerance_below_allows_shortfall() {
        let metric = DcgLinear::new(4);
        let rel_list = [6.0, 4.0];
        let real = score_solution(&rel_list, &[0, 1], &metric); // 8.0
        // Report 10% under the real score with a 0.2 tolerance.
        assert!(
            check_solution(&rel_list, real * 0.9, &[0, 1], &metric, None, 0.2, 0.0).is_ok()
        );
        // The same shortfall is rejected without tolerance.
        assert!(
            check_solution(&rel_list, real * 0.9, &[0, 1], &metric, None, 0.0, 0.0).is_err()
        );
    }

    #[test]
    fn test_optimum_bound() {
        let metric = DcgLinear::new(4);
        let rel_list = [6.0, 4.0, 2.0];
        let real = score_solution(&rel_list, &[1], &metric); // 4.0
        let optimal = score_solution(&rel_list, &[0], &metric); // 6.0

        // 4.0 >= (1 - 0.5) * 6.0 holds.
        assert!(
            check_solution(&rel_list, real, &[1], &metric, Some(optimal), 0.5, 0.0).is_ok()
        );
        // 4.0 >= (1 - 0.1) * 6.0 does not.
        assert!(
            check_solution(&rel_list, real, &[1], &metric, Some(optimal), 0.1, 0.0).is_err()
        );
    }

    #[test]
    fn test_non_increasing_indices_fail() {
        let metric = Dcg::new(4);
        let rel_list = [1.0, 2.0, 3.0];
        assert!(check_solution(&rel_list, 0.0, &[1, 1], &metric, None, 0.0, 0.0).is_err());
        assert!(check_solution(&rel_list, 0.0, &[2, 0], &metric, None, 0.0, 0.0).is_err());
    }

    #[test]
    fn test_out_of_range_index_fails() {
        let metric = Dcg::new(4);
        let rel_list = [1.0, 2.0];
        assert!(check_solution(&rel_list, 0.0, &[5], &metric, None, 0.0, 0.0).is_err());
    }
}
