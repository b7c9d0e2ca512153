//! Isolation forest training and scoring.
//!
//! An ensemble of randomized binary partitioning trees, each grown on a
//! seeded subsample of the table. Anomalous rows sit in sparse regions and
//! are isolated by few random splits, so their average path length across
//! the ensemble is short.

use crate::stats::rand_util::{self, Rng};
use crate::table::Table;
#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Euler-Mascheroni constant.
const EULER: f64 = 0.577_215_664_901_532_9;

/// Columns whose subsample spread is below this cannot be split.
const MIN_SPREAD: f64 = 1e-12;

/// Average unsuccessful-search path length of a binary search tree over
/// `n` points; the isolation-depth normalizer from Liu et al. (2008).
pub(crate) fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER) - 2.0 * (n - 1.0) / n
        }
    }
}

enum Node {
    Split {
        var: usize,
        at: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
    Leaf {
        size: usize,
    },
}

struct Tree {
    root: Node,
}

impl Tree {
    /// Grows one tree over a subsample of `table` drawn without
    /// replacement.
    fn grow(table: &Table, sample_size: usize, mut rng: Rng) -> Tree {
        let rows = table.len();
        let mut indices: Vec<usize> = (0..rows).collect();

        // partial Fisher-Yates: the first `sample_size` entries become the
        // subsample
        let take = sample_size.min(rows);
        for i in 0..take {
            let j = i + rng.rand_range(0..(rows - i) as u64) as usize;
            indices.swap(i, j);
        }
        indices.truncate(take);

        let depth_limit = (take as f64).log2().ceil().max(1.0) as usize;
        Tree {
            root: Self::build(table, &mut indices, 0, depth_limit, &mut rng),
        }
    }

    fn build(
        table: &Table,
        indices: &mut [usize],
        depth: usize,
        limit: usize,
        rng: &mut Rng,
    ) -> Node {
        if indices.len() <= 1 || depth >= limit {
            return Node::Leaf {
                size: indices.len(),
            };
        }

        // candidate variables are those with spread inside this partition;
        // a table slice that has collapsed to a point cannot be split
        let candidates: Vec<(usize, f64, f64)> = (0..table.vars())
            .filter_map(|var| {
                let mut lo = f64::INFINITY;
                let mut hi = f64::NEG_INFINITY;
                for &i in indices.iter() {
                    let x = table.row(i)[var];
                    lo = lo.min(x);
                    hi = hi.max(x);
                }
                if hi - lo > MIN_SPREAD {
                    Some((var, lo, hi))
                } else {
                    None
                }
            })
            .collect();

        if candidates.is_empty() {
            return Node::Leaf {
                size: indices.len(),
            };
        }

        let (var, lo, hi) = candidates[rng.rand_range(0..candidates.len() as u64) as usize];
        let at = lo + rng.rand_float() * (hi - lo);

        // partition in place: rows strictly below the cut go left
        let mut split = 0;
        for i in 0..indices.len() {
            if table.row(indices[i])[var] < at {
                indices.swap(i, split);
                split += 1;
            }
        }

        // a cut at the partition minimum leaves one side empty; the spread
        // check above makes this a rounding corner, handled as a leaf
        if split == 0 || split == indices.len() {
            return Node::Leaf {
                size: indices.len(),
            };
        }

        let (left, right) = indices.split_at_mut(split);
        Node::Split {
            var,
            at,
            left: Box::new(Self::build(table, left, depth + 1, limit, rng)),
            right: Box::new(Self::build(table, right, depth + 1, limit, rng)),
        }
    }

    /// Path length of `row` through this tree, with the standard `c(n)`
    /// adjustment at unexpanded leaves.
    fn path_length(&self, row: &[f64]) -> f64 {
        let mut node = &self.root;
        let mut depth = 0.0;

        loop {
            match node {
                Node::Leaf { size } => return depth + average_path_length(*size),
                Node::Split {
                    var, at, left, right, ..
                } => {
                    node = if row[*var] < *at { left } else { right };
                    depth += 1.0;
                }
            }
        }
    }
}

/// A trained ensemble.
pub(crate) struct Forest {
    trees: Vec<Tree>,
    sample_size: usize,
}

impl Forest {
    /// Trains `n_trees` isolation trees over `table`.
    ///
    /// Each tree receives an independent generator derived from `seed`
    /// before any parallel dispatch, so scheduling order never changes a
    /// score.
    pub(crate) fn train(table: &Table, n_trees: usize, sample_size: usize, seed: u64) -> Forest {
        let sample_size = sample_size.min(table.len());
        let mut master = rand_util::new_rng(seed);
        let streams: Vec<Rng> = (0..n_trees).map(|_| rand_util::split(&mut master)).collect();

        #[cfg(feature = "rayon")]
        let trees = streams
            .into_par_iter()
            .map(|rng| Tree::grow(table, sample_size, rng))
            .collect();

        #[cfg(not(feature = "rayon"))]
        let trees = streams
            .into_iter()
            .map(|rng| Tree::grow(table, sample_size, rng))
            .collect();

        Forest { trees, sample_size }
    }

    /// Anomaly score of one row: `2^(-E[h] / c(sample_size))`, in `(0, 1)`.
    pub(crate) fn score(&self, row: &[f64]) -> f64 {
        let total: f64 = self.trees.iter().map(|tree| tree.path_length(row)).sum();
        let mean_depth = total / self.trees.len() as f64;

        2f64.powf(-mean_depth / average_path_length(self.sample_size))
    }

    /// Scores every row of `table`, in row order.
    pub(crate) fn scores(&self, table: &Table) -> Vec<f64> {
        #[cfg(feature = "rayon")]
        {
            (0..table.len())
                .into_par_iter()
                .map(|i| self.score(table.row(i)))
                .collect()
        }
        #[cfg(not(feature = "rayon"))]
        {
            (0..table.len()).map(|i| self.score(table.row(i))).collect()
        }
    }
}

#[cfg(test)]
mod test {
    use approx::assert_relative_eq;

    use super::*;
    use crate::table::Table;

    fn cluster_with_outlier() -> Table {
        // a tight cluster near (0, 0) and one far-away row
        let mut rows: Vec<Vec<f64>> = (0..40)
            .map(|i| {
                let wiggle = (i as f64 * 0.618).fract() - 0.5;
                vec![wiggle, -wiggle * 0.7]
            })
            .collect();
        rows.push(vec![25.0, -25.0]);

        let timestamps = (0..rows.len() as i64).collect();
        Table::from_rows(timestamps, rows).unwrap()
    }

    #[test]
    fn path_length_normalizer_grows_with_n() {
        assert_relative_eq!(average_path_length(0), 0.0);
        assert_relative_eq!(average_path_length(1), 0.0);
        assert_relative_eq!(average_path_length(2), 1.0);

        let lengths: Vec<f64> = (2..100).map(average_path_length).collect();
        assert!(lengths.windows(2).all(|w| w[0] < w[1]));
        // c(256) is about 10.24 per the isolation forest paper
        assert!((average_path_length(256) - 10.24).abs() < 0.05);
    }

    #[test]
    fn outlier_scores_highest() {
        let table = cluster_with_outlier();
        let forest = Forest::train(&table, 100, 256, 42);
        let scores = forest.scores(&table);

        let outlier = scores[scores.len() - 1];
        assert!(
            scores[..scores.len() - 1].iter().all(|&s| s < outlier),
            "outlier score {} is not the maximum",
            outlier
        );
        assert!(outlier > 0.6, "outlier score {} is too low", outlier);
    }

    #[test]
    fn scores_stay_inside_the_unit_interval() {
        let table = cluster_with_outlier();
        let forest = Forest::train(&table, 50, 32, 7);

        for score in forest.scores(&table) {
            assert!(score > 0.0 && score < 1.0, "score = {}", score);
        }
    }

    #[test]
    fn same_seed_reproduces_scores() {
        let table = cluster_with_outlier();
        let a = Forest::train(&table, 60, 64, 9).scores(&table);
        let b = Forest::train(&table, 60, 64, 9).scores(&table);

        assert_eq!(a, b);
    }

    #[test]
    fn identical_rows_share_one_score() {
        let rows = vec![vec![3.0, 1.0, 4.0]; 16];
        let table = Table::from_rows((0..16).collect(), rows).unwrap();
        let forest = Forest::train(&table, 25, 16, 3);
        let scores = forest.scores(&table);

        for &s in &scores {
            assert_relative_eq!(s, scores[0]);
        }
    }
}
