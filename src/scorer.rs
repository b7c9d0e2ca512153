//! The two anomaly scorers and their shared output shape.
//!
//! Both scorers implement one capability: given an observation table,
//! produce a per-row raw score and a normalized anomaly metric where 1.0 is
//! the threshold. Callers can swap or compare them without structural
//! change; they are never combined algorithmically.

use std::cmp::Ordering;

use itertools::Itertools;

use crate::error::{Error, Result};
use crate::forest::Forest;
use crate::metric::{MetricKind, Reference};
use crate::stats::gamma::{Gamma, GoodnessOfFit};
use crate::stats::univariate::Sample;
use crate::table::Table;

/// Default upper-tail probability for the Gamma threshold.
pub const DEFAULT_TAIL_PROBABILITY: f64 = 0.001;
/// Default quantile for the isolation-forest threshold.
pub const DEFAULT_QUANTILE: f64 = 0.99;
/// Default number of isolation trees.
pub const DEFAULT_TREES: usize = 100;
/// Default per-tree subsample size.
pub const DEFAULT_SAMPLE_SIZE: usize = 256;
/// Seed used when the caller does not provide one.
pub const DEFAULT_SEED: u64 = 0;

/// Spreads below this cannot support a meaningful normalization.
const MIN_SPREAD: f64 = 1e-12;

/// Produces a per-row normalized anomaly metric for an observation table.
pub trait Scorer {
    /// Scores every row; metrics at or above 1.0 flag anomalies.
    fn score(&self, table: &Table) -> Result<Scoring>;
}

/// Parameters of the fitted Gamma plus its goodness-of-fit statistics.
///
/// The statistics are diagnostic output: a poor fit shows up here (large
/// KS/AD/CvM) but never aborts a run, so the caller decides how much to
/// trust the threshold.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct FitDiagnostics {
    /// Fitted Gamma shape.
    pub shape: f64,
    /// Fitted Gamma rate.
    pub rate: f64,
    /// Kolmogorov-Smirnov statistic.
    pub ks: f64,
    /// Anderson-Darling statistic.
    pub ad: f64,
    /// Cramer-von Mises statistic.
    pub cvm: f64,
}

impl FitDiagnostics {
    fn new(dist: &Gamma, gof: &GoodnessOfFit) -> FitDiagnostics {
        FitDiagnostics {
            shape: dist.shape(),
            rate: dist.rate(),
            ks: gof.ks,
            ad: gof.ad,
            cvm: gof.cvm,
        }
    }
}

/// Per-row output of one scorer run.
#[derive(Clone, Debug, Serialize)]
pub struct Scoring {
    raw: Vec<f64>,
    metric: Vec<f64>,
    threshold: f64,
    fit: Option<FitDiagnostics>,
}

impl Scoring {
    /// Raw per-row scores: distances for the distance scorer, isolation
    /// scores for the forest.
    pub fn raw(&self) -> &[f64] {
        &self.raw
    }

    /// Normalized per-row metrics; 1.0 is the anomaly threshold.
    pub fn metrics(&self) -> &[f64] {
        &self.metric
    }

    /// The threshold the raw scores were normalized by.
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Distribution-fit diagnostics; present for the distance scorer only.
    pub fn fit(&self) -> Option<&FitDiagnostics> {
        self.fit.as_ref()
    }

    /// Row indices flagged as anomalous (metric >= 1.0), in row order.
    pub fn flagged(&self) -> Vec<usize> {
        self.metric
            .iter()
            .positions(|&m| m >= 1.0)
            .collect()
    }

    /// Row indices sorted by descending metric; equal metrics keep row
    /// order, so rankings are stable under ties.
    pub fn ranking(&self) -> Vec<usize> {
        (0..self.metric.len())
            .sorted_by(|&i, &j| {
                self.metric[j]
                    .partial_cmp(&self.metric[i])
                    .unwrap_or(Ordering::Equal)
                    .then(i.cmp(&j))
            })
            .collect()
    }
}

/// Divides raw scores by the spread between `offset` and `threshold`, or
/// reports every row as unremarkable when the spread has collapsed.
fn normalize(raw: &[f64], offset: f64, threshold: f64, what: &str) -> Vec<f64> {
    let spread = threshold - offset;
    if !spread.is_finite() || spread < MIN_SPREAD {
        warn!(
            "{} are indistinguishable (threshold {}, offset {}); \
             reporting no anomalies",
            what, threshold, offset
        );
        return vec![0.0; raw.len()];
    }

    raw.iter().map(|&x| (x - offset) / spread).collect()
}

/// Distance-based scorer: vector distance to the column-mean reference,
/// Gamma tail threshold.
///
/// ```
/// use deviate::{DistanceScorer, MetricKind, Scorer, Simulator};
///
/// let table = Simulator::new(90, 4).with_spike(45, 2, 12.0).build().unwrap();
/// let scoring = DistanceScorer::new()
///     .with_metric(MetricKind::Euclidean)
///     .with_tail_probability(0.001)
///     .score(&table)
///     .unwrap();
///
/// assert!(scoring.flagged().contains(&45));
/// ```
#[derive(Clone, Debug)]
pub struct DistanceScorer {
    metric: MetricKind,
    tail_probability: f64,
}

impl Default for DistanceScorer {
    fn default() -> DistanceScorer {
        DistanceScorer::new()
    }
}

impl DistanceScorer {
    /// A Euclidean scorer with the default tail probability.
    pub fn new() -> DistanceScorer {
        DistanceScorer {
            metric: MetricKind::Euclidean,
            tail_probability: DEFAULT_TAIL_PROBABILITY,
        }
    }

    /// Selects the distance metric.
    pub fn with_metric(mut self, metric: MetricKind) -> DistanceScorer {
        self.metric = metric;
        self
    }

    /// Sets the upper-tail probability behind the threshold; must be in
    /// `(0, 1)`, validated when scoring starts.
    pub fn with_tail_probability(mut self, tail_probability: f64) -> DistanceScorer {
        self.tail_probability = tail_probability;
        self
    }

    fn validate(&self) -> Result<()> {
        let p = self.tail_probability;
        if !p.is_finite() || p <= 0.0 || p >= 1.0 {
            return Err(Error::config(
                "tail_probability",
                format!("must be in (0, 1), got {}", p),
            ));
        }
        Ok(())
    }
}

impl Scorer for DistanceScorer {
    fn score(&self, table: &Table) -> Result<Scoring> {
        self.validate()?;

        let strategy = self.metric.strategy();
        let reference = Reference::fit(table, self.metric)?;
        let distances: Vec<f64> = table
            .iter_rows()
            .map(|row| strategy.distance(row, &reference))
            .collect();

        let dist = Gamma::fit(&distances);
        let gof = GoodnessOfFit::compute(&distances, &dist);
        let threshold = dist.upper_tail(self.tail_probability);
        info!(
            "{} distances: gamma fit shape={:.4} rate={:.4} \
             (ks={:.4} ad={:.4} cvm={:.4}), threshold={:.4}",
            strategy.name(),
            dist.shape(),
            dist.rate(),
            gof.ks,
            gof.ad,
            gof.cvm,
            threshold
        );

        let metric = normalize(&distances, 0.0, threshold, "distances");

        Ok(Scoring {
            raw: distances,
            metric,
            threshold,
            fit: Some(FitDiagnostics::new(&dist, &gof)),
        })
    }
}

/// Isolation-forest scorer: ensemble isolation depth, empirical quantile
/// threshold.
///
/// Training is stochastic but fully determined by the seed, so re-running
/// with the same table and seed reproduces every score.
#[derive(Clone, Debug)]
pub struct IsolationForestScorer {
    trees: usize,
    sample_size: usize,
    quantile: f64,
    seed: u64,
}

impl Default for IsolationForestScorer {
    fn default() -> IsolationForestScorer {
        IsolationForestScorer::new()
    }
}

impl IsolationForestScorer {
    /// A scorer with the documented defaults.
    pub fn new() -> IsolationForestScorer {
        IsolationForestScorer {
            trees: DEFAULT_TREES,
            sample_size: DEFAULT_SAMPLE_SIZE,
            quantile: DEFAULT_QUANTILE,
            seed: DEFAULT_SEED,
        }
    }

    /// Sets the number of trees in the ensemble.
    pub fn with_trees(mut self, trees: usize) -> IsolationForestScorer {
        self.trees = trees;
        self
    }

    /// Sets the per-tree subsample size (clamped to the table length).
    pub fn with_sample_size(mut self, sample_size: usize) -> IsolationForestScorer {
        self.sample_size = sample_size;
        self
    }

    /// Sets the quantile of the raw scores used as the threshold; must be
    /// in `(0, 1)`, validated when scoring starts.
    pub fn with_quantile(mut self, quantile: f64) -> IsolationForestScorer {
        self.quantile = quantile;
        self
    }

    /// Seeds the ensemble; identical seeds reproduce identical scores.
    pub fn with_seed(mut self, seed: u64) -> IsolationForestScorer {
        self.seed = seed;
        self
    }

    fn validate(&self) -> Result<()> {
        let q = self.quantile;
        if !q.is_finite() || q <= 0.0 || q >= 1.0 {
            return Err(Error::config(
                "quantile",
                format!("must be in (0, 1), got {}", q),
            ));
        }
        if self.trees == 0 {
            return Err(Error::config("trees", "must be at least 1".to_string()));
        }
        if self.sample_size < 2 {
            return Err(Error::config(
                "sample_size",
                format!("must be at least 2, got {}", self.sample_size),
            ));
        }
        Ok(())
    }
}

impl Scorer for IsolationForestScorer {
    fn score(&self, table: &Table) -> Result<Scoring> {
        self.validate()?;

        let forest = Forest::train(table, self.trees, self.sample_size, self.seed);
        let raw = forest.scores(table);

        let sample = Sample::new(&raw);
        let offset = sample.min();
        let threshold = sample.percentiles().at(self.quantile * 100.0);
        debug!(
            "isolation scores: min={:.4} threshold={:.4} (quantile {})",
            offset, threshold, self.quantile
        );

        let metric = normalize(&raw, offset, threshold, "isolation scores");

        Ok(Scoring {
            raw,
            metric,
            threshold,
            fit: None,
        })
    }
}
