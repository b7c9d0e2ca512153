//! Dense-matrix helpers behind the Mahalanobis metric.
//!
//! The matrices here are tiny (variables x variables), so plain `Vec` rows
//! and Gauss-Jordan elimination with partial pivoting are all that is
//! needed. Singularity is reported as `None` and mapped to an error by the
//! caller.

/// Pivot magnitudes below this are treated as singular.
const SINGULARITY_EPS: f64 = 1e-10;

/// Sample covariance of row-major `values` with `vars` columns, around the
/// supplied column `mean`.
///
/// - Time: `O(rows * vars^2)`
pub(crate) fn covariance(values: &[f64], vars: usize, mean: &[f64]) -> Vec<Vec<f64>> {
    debug_assert!(vars > 0 && values.len() % vars == 0);
    debug_assert_eq!(mean.len(), vars);

    let rows = values.len() / vars;
    let mut cov = vec![vec![0.0; vars]; vars];

    for row in values.chunks_exact(vars) {
        for i in 0..vars {
            let di = row[i] - mean[i];
            for j in 0..vars {
                cov[i][j] += di * (row[j] - mean[j]);
            }
        }
    }

    let norm = (rows - 1) as f64;
    for row in &mut cov {
        for c in row.iter_mut() {
            *c /= norm;
        }
    }

    cov
}

/// Inverse of a square matrix by Gauss-Jordan elimination with partial
/// pivoting, or `None` when the matrix is singular or near-singular.
pub(crate) fn invert(matrix: &[Vec<f64>]) -> Option<Vec<Vec<f64>>> {
    let n = matrix.len();
    if n == 0 || matrix[0].len() != n {
        return None;
    }

    // augmented matrix [A | I]
    let mut aug = vec![vec![0.0; 2 * n]; n];
    for i in 0..n {
        aug[i][..n].copy_from_slice(&matrix[i]);
        aug[i][n + i] = 1.0;
    }

    for col in 0..n {
        // swap the largest remaining pivot into position
        let mut max_row = col;
        for k in (col + 1)..n {
            if aug[k][col].abs() > aug[max_row][col].abs() {
                max_row = k;
            }
        }
        aug.swap(col, max_row);

        let pivot = aug[col][col];
        if pivot.abs() < SINGULARITY_EPS {
            return None;
        }

        for val in aug[col].iter_mut() {
            *val /= pivot;
        }

        for k in 0..n {
            if k == col {
                continue;
            }
            let factor = aug[k][col];
            for j in 0..(2 * n) {
                aug[k][j] -= factor * aug[col][j];
            }
        }
    }

    Some(
        aug.iter()
            .map(|row| row[n..].to_vec())
            .collect::<Vec<Vec<f64>>>(),
    )
}

/// Matrix-vector product.
pub(crate) fn mat_vec(matrix: &[Vec<f64>], v: &[f64]) -> Vec<f64> {
    matrix
        .iter()
        .map(|row| crate::stats::dot(row, v))
        .collect()
}

#[cfg(test)]
mod test {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn inverts_a_known_2x2() {
        let m = vec![vec![4.0, 7.0], vec![2.0, 6.0]];
        let inv = invert(&m).unwrap();

        assert_relative_eq!(inv[0][0], 0.6, epsilon = 1e-12);
        assert_relative_eq!(inv[0][1], -0.7, epsilon = 1e-12);
        assert_relative_eq!(inv[1][0], -0.2, epsilon = 1e-12);
        assert_relative_eq!(inv[1][1], 0.4, epsilon = 1e-12);
    }

    #[test]
    fn inverse_of_identity_is_identity() {
        let m = vec![
            vec![1.0, 0.0, 0.0],
            vec![0.0, 1.0, 0.0],
            vec![0.0, 0.0, 1.0],
        ];
        let inv = invert(&m).unwrap();

        for i in 0..3 {
            for j in 0..3 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert_relative_eq!(inv[i][j], expected, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn singular_matrix_is_rejected() {
        // second row is a multiple of the first
        let m = vec![vec![1.0, 2.0], vec![2.0, 4.0]];
        assert!(invert(&m).is_none());
    }

    #[test]
    fn covariance_of_independent_columns_is_diagonal() {
        // two columns, var 1 swings, var 2 constant
        let values = [1.0, 5.0, 2.0, 5.0, 3.0, 5.0];
        let mean = [2.0, 5.0];
        let cov = covariance(&values, 2, &mean);

        assert_relative_eq!(cov[0][0], 1.0, epsilon = 1e-12);
        assert_relative_eq!(cov[0][1], 0.0, epsilon = 1e-12);
        assert_relative_eq!(cov[1][0], 0.0, epsilon = 1e-12);
        assert_relative_eq!(cov[1][1], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn mat_vec_applies_rows() {
        let m = vec![vec![1.0, 2.0], vec![3.0, 4.0]];
        let out = mat_vec(&m, &[1.0, 1.0]);

        assert_relative_eq!(out[0], 3.0);
        assert_relative_eq!(out[1], 7.0);
    }
}
