//! Statistics primitives shared by both scorers.
//!
//! The univariate `Sample`/`Percentiles` pair carries the per-score
//! distribution work (quantile thresholds, score spreads); `gamma` owns the
//! parametric tail fit and `matrix` the covariance algebra behind the
//! Mahalanobis metric.


pub mod gamma;
pub mod univariate;

pub(crate) mod matrix;
pub(crate) mod rand_util;

mod float;

pub use self::float::Float;

pub(crate) fn dot<A>(xs: &[A], ys: &[A]) -> A
where
    A: Float,
{
    xs.iter()
        .zip(ys)
        .fold(A::cast(0), |acc, (&x, &y)| acc + x * y)
}

pub(crate) fn sum<A>(xs: &[A]) -> A
where
    A: Float,
{
    use std::ops::Add;

    xs.iter().cloned().fold(A::cast(0), Add::add)
}
