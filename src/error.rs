use thiserror::Error;

/// Errors reported by the scorers before any computation runs.
///
/// A poor distribution fit is deliberately NOT represented here; fit quality
/// is reported through [`FitDiagnostics`](crate::FitDiagnostics) and left for
/// the caller to judge.
#[derive(Debug, Error)]
pub enum Error {
    /// The observation table is too small for the requested analysis.
    #[error("insufficient data: {rows} row(s), need at least {required}")]
    InsufficientData {
        /// Rows present in the table.
        rows: usize,
        /// Rows required by the analysis.
        required: usize,
    },

    /// The sample covariance matrix cannot be inverted.
    ///
    /// Raised by the Mahalanobis metric instead of silently falling back to
    /// Euclidean distance.
    #[error(
        "degenerate covariance: {rows} row(s) across {vars} variable(s) \
         produce a singular matrix"
    )]
    DegenerateCovariance {
        /// Rows in the table.
        rows: usize,
        /// Variables per row.
        vars: usize,
    },

    /// A configuration value is outside its valid domain.
    #[error("invalid configuration: {name} {reason}")]
    InvalidConfiguration {
        /// Name of the offending option.
        name: &'static str,
        /// Why the value was rejected.
        reason: String,
    },

    /// Reading a delimited-text table failed.
    #[cfg(feature = "csv_input")]
    #[error("failed to read table: {0}")]
    Csv(#[from] csv::Error),

    /// A field of a delimited-text table could not be parsed as a number.
    #[cfg(feature = "csv_input")]
    #[error("record {record}, field {field}: not a number: {value:?}")]
    Parse {
        /// Zero-based record index.
        record: usize,
        /// Zero-based field index.
        field: usize,
        /// The offending field content.
        value: String,
    },
}

impl Error {
    pub(crate) fn config(name: &'static str, reason: impl Into<String>) -> Error {
        Error::InvalidConfiguration {
            name,
            reason: reason.into(),
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = ::std::result::Result<T, Error>;
