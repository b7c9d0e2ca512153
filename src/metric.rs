//! Distance metrics and the fitted reference they measure against.
//!
//! A [`Reference`] is fitted once per analysis run (column means, plus the
//! inverse sample covariance when the metric asks for it); the [`Metric`]
//! strategies then map each observation row to a non-negative dissimilarity.

use crate::error::{Error, Result};
use crate::stats::{self, matrix};
use crate::table::Table;

/// Selects one of the shipped metric strategies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    /// L2 norm of the deviation from the column means.
    Euclidean,
    /// Covariance-aware quadratic form `(x - mu)^T Sigma^-1 (x - mu)`.
    Mahalanobis,
}

impl MetricKind {
    /// The strategy object behind this selector.
    pub fn strategy(self) -> &'static dyn Metric {
        match self {
            MetricKind::Euclidean => &Euclidean,
            MetricKind::Mahalanobis => &Mahalanobis,
        }
    }

    fn needs_covariance(self) -> bool {
        matches!(self, MetricKind::Mahalanobis)
    }
}

/// Column statistics a metric measures against.
///
/// Owned by a single analysis run and recomputed for the next one; nothing
/// here persists.
#[derive(Clone, Debug)]
pub struct Reference {
    mean: Vec<f64>,
    inv_cov: Option<Vec<Vec<f64>>>,
}

impl Reference {
    /// Fits the reference for `kind` over the whole table.
    ///
    /// The Mahalanobis path needs at least as many rows as variables and an
    /// invertible sample covariance; a singular covariance is reported as
    /// [`Error::DegenerateCovariance`], never silently replaced by the
    /// Euclidean fallback.
    pub fn fit(table: &Table, kind: MetricKind) -> Result<Reference> {
        let mean = table.mean_vector();

        let inv_cov = if kind.needs_covariance() {
            if table.len() < table.vars() {
                return Err(Error::InsufficientData {
                    rows: table.len(),
                    required: table.vars(),
                });
            }

            let cov = matrix::covariance(table.values(), table.vars(), &mean);
            let inv = matrix::invert(&cov).ok_or(Error::DegenerateCovariance {
                rows: table.len(),
                vars: table.vars(),
            })?;
            Some(inv)
        } else {
            None
        };

        Ok(Reference { mean, inv_cov })
    }

    /// The column means.
    pub fn mean(&self) -> &[f64] {
        &self.mean
    }
}

/// A dissimilarity between one observation row and the fitted reference.
///
/// Implementations must return a finite, non-negative value for finite
/// input. Further metrics (Manhattan, Minkowski) slot in here without
/// touching the scorers.
pub trait Metric {
    /// Name used in logs and diagnostics.
    fn name(&self) -> &'static str;

    /// Distance from `row` to `reference`.
    fn distance(&self, row: &[f64], reference: &Reference) -> f64;
}

/// Standard L2 distance from the column means.
pub struct Euclidean;

impl Metric for Euclidean {
    fn name(&self) -> &'static str {
        "euclidean"
    }

    fn distance(&self, row: &[f64], reference: &Reference) -> f64 {
        let diff: Vec<f64> = row
            .iter()
            .zip(reference.mean())
            .map(|(&x, &m)| x - m)
            .collect();

        stats::dot(&diff, &diff).sqrt()
    }
}

/// Squared generalized distance `(x - mu)^T Sigma^-1 (x - mu)`.
///
/// Reported squared, following the usual convention for this statistic.
pub struct Mahalanobis;

impl Metric for Mahalanobis {
    fn name(&self) -> &'static str {
        "mahalanobis"
    }

    fn distance(&self, row: &[f64], reference: &Reference) -> f64 {
        let inv_cov = reference
            .inv_cov
            .as_ref()
            .expect("reference was fitted without a covariance matrix");

        let diff: Vec<f64> = row
            .iter()
            .zip(reference.mean())
            .map(|(&x, &m)| x - m)
            .collect();

        // clamp away the tiny negatives a nearly-singular inverse can emit
        stats::dot(&diff, &matrix::mat_vec(inv_cov, &diff)).max(0.0)
    }
}

#[cfg(test)]
mod test {
    use approx::assert_relative_eq;
    use quickcheck::quickcheck;
    use quickcheck::TestResult;

    use super::*;
    use crate::table::Table;

    fn spread_table() -> Table {
        Table::from_rows(
            (0..5).collect(),
            vec![
                vec![1.0, 2.0],
                vec![2.0, 1.0],
                vec![3.0, 5.0],
                vec![4.0, 3.0],
                vec![5.0, 4.0],
            ],
        )
        .unwrap()
    }

    #[test]
    fn reference_to_itself_is_at_distance_zero() {
        let table = spread_table();

        for &kind in &[MetricKind::Euclidean, MetricKind::Mahalanobis] {
            let reference = Reference::fit(&table, kind).unwrap();
            let mean = reference.mean().to_vec();
            assert_relative_eq!(
                kind.strategy().distance(&mean, &reference),
                0.0,
                epsilon = 1e-9
            );
        }
    }

    #[test]
    fn euclidean_matches_the_l2_norm() {
        let table = spread_table();
        let reference = Reference::fit(&table, MetricKind::Euclidean).unwrap();

        // column means are (3, 3)
        let d = Euclidean.distance(&[6.0, 7.0], &reference);
        assert_relative_eq!(d, 5.0, epsilon = 1e-12);
    }

    #[test]
    fn mahalanobis_discounts_the_high_variance_axis() {
        // var 0 swings ten times wider than var 1
        let rows: Vec<Vec<f64>> = (0..40)
            .map(|i| {
                let t = (i as f64 * 0.77).sin();
                let c = (i as f64 * 1.3).cos();
                vec![10.0 * t, 0.9 * c + 0.1 * t]
            })
            .collect();
        let table = Table::from_rows((0..40).collect(), rows).unwrap();
        let reference = Reference::fit(&table, MetricKind::Mahalanobis).unwrap();
        let mean = reference.mean().to_vec();

        let mut along_wide = mean.clone();
        along_wide[0] += 5.0;
        let mut along_narrow = mean;
        along_narrow[1] += 5.0;

        let wide = Mahalanobis.distance(&along_wide, &reference);
        let narrow = Mahalanobis.distance(&along_narrow, &reference);
        assert!(
            wide < narrow,
            "same shift should count less on the wide axis: {} vs {}",
            wide,
            narrow
        );
    }

    #[test]
    fn constant_column_degenerates_the_covariance() {
        let table = Table::from_rows(
            (0..4).collect(),
            vec![
                vec![1.0, 7.0],
                vec![2.0, 7.0],
                vec![3.0, 7.0],
                vec![4.0, 7.0],
            ],
        )
        .unwrap();

        let err = Reference::fit(&table, MetricKind::Mahalanobis).unwrap_err();
        assert!(matches!(
            err,
            crate::error::Error::DegenerateCovariance { rows: 4, vars: 2 }
        ));
    }

    #[test]
    fn fewer_rows_than_variables_is_insufficient() {
        let table = Table::from_rows(
            vec![0, 1],
            vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]],
        )
        .unwrap();

        let err = Reference::fit(&table, MetricKind::Mahalanobis).unwrap_err();
        assert!(matches!(
            err,
            crate::error::Error::InsufficientData { rows: 2, required: 3 }
        ));
    }

    quickcheck! {
        fn euclidean_is_nonnegative(size: usize, seed: u64) -> TestResult {
            let size = size % 64;
            if let Some(v) = crate::stats::test::vec(size * 2, seed) {
                let rows: Vec<Vec<f64>> = v.chunks(2).map(<[f64]>::to_vec).collect();
                let timestamps = (0..rows.len() as i64).collect();
                let table = Table::from_rows(timestamps, rows).unwrap();
                let reference = Reference::fit(&table, MetricKind::Euclidean).unwrap();

                let all_nonneg =
                    table.iter_rows().all(|row| Euclidean.distance(row, &reference) >= 0.0);
                TestResult::from_bool(all_nonneg)
            } else {
                TestResult::discard()
            }
        }
    }
}
