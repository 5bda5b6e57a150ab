//! Fisher's exact test of the enrichment in two partitions
use std::collections::BTreeMap;
use std::fmt::Display;

use statrs::distribution::{Discrete, Hypergeometric};
use tracing::debug;

use crate::stats::{EnrichmentResult, Group};
use crate::utils::{f64_from_u64, u64_from_f64};
use crate::{WeightsError, WeightsResult};

/// Relative tolerance when comparing the probabilities of two tables
const RELATIVE_TOLERANCE: f64 = 1e-7;

/// Odds ratio and two-sided p-value of a 2x2 contingency table
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FisherResult {
    pub odds_ratio: f64,
    pub p_value: f64,
}

impl Display for FisherResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "odds_ratio={:.3}\tp={:e}", self.odds_ratio, self.p_value)
    }
}

/// Two-sided Fisher's exact test of a 2x2 contingency table
///
/// The table is given as `[[a, b], [c, d]]`. The odds ratio is `a*d / (b*c)`,
/// or infinite if `b` or `c` is zero. The p-value is the sum of the
/// probabilities of all tables with the same margins that are at most as
/// likely as the observed table.
///
/// Tables with an empty row or column give an odds ratio of `NaN` and a p-value of 1.
///
/// # Errors
///
/// [`WeightsError::Statistics`] if the hypergeometric distribution cannot be built
///
/// # Examples
///
/// ```
/// use mutation_weights::stats::fisher::fisher_exact;
///
/// let result = fisher_exact([[8, 2], [1, 5]]).unwrap();
/// assert!((result.odds_ratio - 20.0).abs() < 1e-12);
/// assert!((result.p_value - 0.034_965).abs() < 1e-6);
///
/// let degenerate = fisher_exact([[0, 0], [3, 4]]).unwrap();
/// assert!(degenerate.odds_ratio.is_nan());
/// assert!((degenerate.p_value - 1.0).abs() < f64::EPSILON);
/// ```
pub fn fisher_exact(table: [[u64; 2]; 2]) -> WeightsResult<FisherResult> {
    let [[a, b], [c, d]] = table;

    if a + b == 0 || c + d == 0 || a + c == 0 || b + d == 0 {
        return Ok(FisherResult {
            odds_ratio: f64::NAN,
            p_value: 1.0,
        });
    }

    let odds_ratio = if b > 0 && c > 0 {
        (f64_from_u64(a) * f64_from_u64(d)) / (f64_from_u64(b) * f64_from_u64(c))
    } else {
        f64::INFINITY
    };

    let population = a + b + c + d;
    let successes = a + c;
    let draws = a + b;
    let hypergeom = Hypergeometric::new(population, successes, draws)?;

    // all probabilities are compared on the log scale, the
    // binomial coefficients overflow for realistic counts
    let observed = hypergeom.ln_pmf(a) + RELATIVE_TOLERANCE.ln_1p();
    let min_k = (successes + draws).saturating_sub(population);
    let max_k = successes.min(draws);

    let p_value: f64 = (min_k..=max_k)
        .map(|k| hypergeom.ln_pmf(k))
        .filter(|ln_p| *ln_p <= observed)
        .map(f64::exp)
        .sum();

    Ok(FisherResult {
        odds_ratio,
        p_value: p_value.min(1.0),
    })
}

/// Compares the enrichment of a group between two partitions
///
/// The contingency table is
///
/// ```text
///                 observed   expected
/// constrained     c.obs      c.exp
/// unconstrained   u.obs      u.exp
/// ```
///
/// Expected counts are truncated to integers.
///
/// # Errors
///
/// - [`WeightsError::DoesNotExist`]: one of the partitions has no result for `group`
/// - [`WeightsError::Statistics`]: see [`fisher_exact`]
pub fn compare_regions(
    constrained: &BTreeMap<Group, EnrichmentResult>,
    unconstrained: &BTreeMap<Group, EnrichmentResult>,
    group: Group,
) -> WeightsResult<FisherResult> {
    let inside = constrained
        .get(&group)
        .ok_or_else(|| WeightsError::DoesNotExist(format!("{group} in constrained regions")))?;
    let outside = unconstrained
        .get(&group)
        .ok_or_else(|| WeightsError::DoesNotExist(format!("{group} in unconstrained regions")))?;

    let table = [
        [inside.observed, u64_from_f64(inside.expected)],
        [outside.observed, u64_from_f64(outside.expected)],
    ];
    let result = fisher_exact(table)?;
    debug!("{} {:?}: {}", group, table, result);
    Ok(result)
}

#[cfg(test)]
mod test {
    use super::*;

    fn result(observed: u64, expected: f64) -> EnrichmentResult {
        EnrichmentResult {
            observed,
            expected,
            ratio: f64_from_u64(observed) / expected,
            p_value: 0.5,
        }
    }

    #[test]
    fn symmetric_table() {
        let res = fisher_exact([[5, 5], [5, 5]]).unwrap();
        assert!((res.odds_ratio - 1.0).abs() < 1e-12);
        assert!((res.p_value - 1.0).abs() < 1e-9);
    }

    #[test]
    fn zero_off_diagonal() {
        let res = fisher_exact([[4, 0], [0, 4]]).unwrap();
        assert!(res.odds_ratio.is_infinite());
        // 2 * 1/70
        assert!((res.p_value - 0.028_571_428_571).abs() < 1e-9);
    }

    #[test]
    fn empty_column() {
        let res = fisher_exact([[3, 0], [5, 0]]).unwrap();
        assert!(res.odds_ratio.is_nan());
        assert!((res.p_value - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn large_counts() {
        let res = fisher_exact([[900, 300], [1100, 1400]]).unwrap();
        assert!(res.odds_ratio > 3.0);
        assert!(res.p_value < 1e-30);
        assert!(res.p_value >= 0.0);

        let res = fisher_exact([[1000, 1000], [1000, 1000]]).unwrap();
        assert!((res.p_value - 1.0).abs() < 1e-6);
    }

    #[test]
    fn compare_truncates_expected() {
        let mut constrained = BTreeMap::new();
        constrained.insert(Group::Ptv, result(8, 2.9));
        let mut unconstrained = BTreeMap::new();
        unconstrained.insert(Group::Ptv, result(1, 5.7));

        let res = compare_regions(&constrained, &unconstrained, Group::Ptv).unwrap();
        let direct = fisher_exact([[8, 2], [1, 5]]).unwrap();
        assert!((res.odds_ratio - direct.odds_ratio).abs() < 1e-12);
        assert!((res.p_value - direct.p_value).abs() < 1e-12);

        assert!(matches!(
            compare_regions(&constrained, &unconstrained, Group::Pav),
            Err(WeightsError::DoesNotExist(_))
        ));
    }
}
