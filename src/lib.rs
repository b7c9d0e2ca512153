//! Statistics-driven multivariate anomaly detection.
//!
//! Two interchangeable scorers consume the same observation table (ordered
//! rows of timestamped numeric vectors) and each produce a per-row raw
//! score plus a normalized anomaly metric, where values at or above 1.0
//! flag an anomaly:
//!
//! * [`DistanceScorer`] measures every row's distance to the column-mean
//!   reference (Euclidean, or covariance-aware Mahalanobis), fits a Gamma
//!   distribution to the distances by maximum likelihood, and places the
//!   threshold at a configurable upper-tail probability. Goodness-of-fit
//!   statistics come along as diagnostics.
//! * [`IsolationForestScorer`] trains a seeded ensemble of random
//!   partitioning trees and places the threshold at a configurable
//!   quantile of the isolation scores.
//!
//! Every run is a pure function of the table, the configuration, and the
//! seed.
//!
//! ```
//! use deviate::{DistanceScorer, IsolationForestScorer, Scorer, Simulator};
//!
//! let table = Simulator::new(120, 6)
//!     .with_seed(7)
//!     .with_spike(60, 2, 15.0)
//!     .build()
//!     .unwrap();
//!
//! let distance = DistanceScorer::new().score(&table).unwrap();
//! let isolation = IsolationForestScorer::new().with_seed(7).score(&table).unwrap();
//!
//! assert!(distance.flagged().contains(&60));
//! assert_eq!(isolation.metrics().len(), table.len());
//! ```

#![warn(missing_docs)]

#[macro_use]
extern crate log;
#[macro_use]
extern crate serde_derive;

mod error;
mod forest;
mod metric;
mod scorer;
mod simulate;
mod table;

pub mod stats;

pub use crate::error::{Error, Result};
pub use crate::metric::{Euclidean, Mahalanobis, Metric, MetricKind, Reference};
pub use crate::scorer::{
    DistanceScorer, FitDiagnostics, IsolationForestScorer, Scorer, Scoring,
    DEFAULT_QUANTILE, DEFAULT_SAMPLE_SIZE, DEFAULT_SEED, DEFAULT_TAIL_PROBABILITY,
    DEFAULT_TREES,
};
pub use crate::simulate::{Simulator, Spike};
pub use crate::table::Table;
