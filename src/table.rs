//! The observation table consumed by both scorers.
//!
//! An ordered sequence of rows, each a fixed-length numeric vector with a
//! timestamp. Validation happens once at construction so the scorers can
//! assume a rectangular, finite table throughout.

use crate::error::{Error, Result};

/// Rows required before any statistic is meaningful.
const MIN_ROWS: usize = 2;

/// An ordered, rectangular table of numeric observations.
///
/// Invariants:
///
/// - At least 2 rows, at least 1 variable
/// - Every row has the same variable count
/// - Every value is finite
///
/// Timestamps label rows for the caller's benefit; the scorers never read
/// them.
#[derive(Clone, Debug, Serialize)]
pub struct Table {
    timestamps: Vec<i64>,
    values: Vec<f64>,
    vars: usize,
}

impl Table {
    /// Builds a table from row-major `values` with `vars` columns.
    pub fn new(vars: usize, timestamps: Vec<i64>, values: Vec<f64>) -> Result<Table> {
        if timestamps.len() < MIN_ROWS {
            return Err(Error::InsufficientData {
                rows: timestamps.len(),
                required: MIN_ROWS,
            });
        }
        if vars == 0 {
            return Err(Error::config("table", "needs at least one variable".to_string()));
        }
        if values.len() != timestamps.len() * vars {
            return Err(Error::config(
                "table",
                format!(
                    "has {} values, expected {} rows x {} variables",
                    values.len(),
                    timestamps.len(),
                    vars
                ),
            ));
        }
        if let Some(at) = values.iter().position(|x| !x.is_finite()) {
            return Err(Error::config(
                "table",
                format!("row {} contains a non-finite value", at / vars),
            ));
        }

        Ok(Table {
            timestamps,
            values,
            vars,
        })
    }

    /// Builds a table from one `Vec` per row.
    pub fn from_rows(timestamps: Vec<i64>, rows: Vec<Vec<f64>>) -> Result<Table> {
        let vars = rows.first().map_or(0, Vec::len);
        if let Some(odd) = rows.iter().position(|row| row.len() != vars) {
            return Err(Error::config(
                "table",
                format!(
                    "row {} has {} variable(s), expected {}",
                    odd,
                    rows[odd].len(),
                    vars
                ),
            ));
        }

        let values = rows.into_iter().flatten().collect();
        Table::new(vars, timestamps, values)
    }

    /// Reads a table from delimited text with a header record: the first
    /// column is an integer timestamp, every following column one numeric
    /// variable.
    #[cfg(feature = "csv_input")]
    pub fn from_csv<R: std::io::Read>(reader: R) -> Result<Table> {
        let mut reader = csv::Reader::from_reader(reader);
        let mut timestamps = Vec::new();
        let mut rows = Vec::new();

        for (index, record) in reader.records().enumerate() {
            let record = record?;
            let mut fields = record.iter();

            let parse = |field: usize, value: &str| Error::Parse {
                record: index,
                field,
                value: value.to_owned(),
            };

            let stamp = fields.next().unwrap_or("");
            timestamps.push(stamp.trim().parse::<i64>().map_err(|_| parse(0, stamp))?);

            let row = fields
                .enumerate()
                .map(|(field, value)| {
                    value
                        .trim()
                        .parse::<f64>()
                        .map_err(|_| parse(field + 1, value))
                })
                .collect::<Result<Vec<f64>>>()?;
            rows.push(row);
        }

        Table::from_rows(timestamps, rows)
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    /// Number of variables per row.
    pub fn vars(&self) -> usize {
        self.vars
    }

    /// The `i`-th observation vector.
    pub fn row(&self, i: usize) -> &[f64] {
        &self.values[i * self.vars..(i + 1) * self.vars]
    }

    /// Iterates over the observation vectors in row order.
    pub fn iter_rows(&self) -> impl Iterator<Item = &[f64]> {
        self.values.chunks_exact(self.vars)
    }

    /// The timestamps, one per row.
    pub fn timestamps(&self) -> &[i64] {
        &self.timestamps
    }

    /// The column-wise mean vector.
    pub fn mean_vector(&self) -> Vec<f64> {
        let mut mean = vec![0.0; self.vars];
        for row in self.iter_rows() {
            for (acc, &x) in mean.iter_mut().zip(row) {
                *acc += x;
            }
        }

        let n = self.len() as f64;
        for acc in &mut mean {
            *acc /= n;
        }
        mean
    }

    pub(crate) fn values(&self) -> &[f64] {
        &self.values
    }
}

#[cfg(test)]
mod test {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn mean_vector_averages_each_column() {
        let table = Table::from_rows(
            vec![0, 1, 2],
            vec![vec![1.0, 10.0], vec![2.0, 20.0], vec![3.0, 30.0]],
        )
        .unwrap();

        let mean = table.mean_vector();
        assert_relative_eq!(mean[0], 2.0);
        assert_relative_eq!(mean[1], 20.0);
    }

    #[test]
    fn single_row_is_insufficient() {
        let err = Table::from_rows(vec![0], vec![vec![1.0]]).unwrap_err();
        assert!(matches!(
            err,
            Error::InsufficientData { rows: 1, required: 2 }
        ));
    }

    #[test]
    fn empty_table_is_insufficient() {
        let err = Table::from_rows(vec![], vec![]).unwrap_err();
        assert!(matches!(
            err,
            Error::InsufficientData { rows: 0, required: 2 }
        ));
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let err =
            Table::from_rows(vec![0, 1], vec![vec![1.0, 2.0], vec![3.0]]).unwrap_err();
        assert!(matches!(err, Error::InvalidConfiguration { .. }));
    }

    #[test]
    fn non_finite_values_are_rejected() {
        let err = Table::new(2, vec![0, 1], vec![1.0, 2.0, f64::NAN, 4.0]).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("row 1"), "{}", message);
    }

    #[test]
    fn rows_round_trip() {
        let table = Table::new(3, vec![5, 6], vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.vars(), 3);
        assert_eq!(table.row(1), [4.0, 5.0, 6.0]);
        assert_eq!(table.timestamps(), [5, 6]);
        assert_eq!(table.iter_rows().count(), 2);
    }

    #[cfg(feature = "csv_input")]
    #[test]
    fn csv_round_trip() {
        let text = "ts,cpu,mem\n0,1.5,2.5\n1,3.5,4.5\n";
        let table = Table::from_csv(text.as_bytes()).unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.vars(), 2);
        assert_relative_eq!(table.row(0)[1], 2.5);
        assert_eq!(table.timestamps(), [0, 1]);
    }

    #[cfg(feature = "csv_input")]
    #[test]
    fn csv_parse_errors_locate_the_field() {
        let text = "ts,cpu\n0,1.5\n1,oops\n";
        let err = Table::from_csv(text.as_bytes()).unwrap_err();
        assert!(matches!(err, Error::Parse { record: 1, field: 1, .. }));
    }
}
