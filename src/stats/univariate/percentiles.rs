use crate::stats::float::Float;
use cast::usize;

/// A "view" into the percentiles of a sample
pub struct Percentiles<A>(Box<[A]>)
where
    A: Float;

impl<A> Percentiles<A>
where
    A: Float,
    usize: cast::From<A, Output = Result<usize, cast::Error>>,
{
    /// Returns the percentile at `p`%
    ///
    /// Safety:
    ///
    /// - Make sure that `p` is in the range `[0, 100]`
    unsafe fn at_unchecked(&self, p: A) -> A {
        let _100 = A::cast(100);
        debug_assert!(p >= A::cast(0) && p <= _100);
        debug_assert!(!self.0.is_empty());
        let len = self.0.len() - 1;

        if p == _100 {
            self.0[len]
        } else {
            let rank = (p / _100) * A::cast(len);
            let integer = rank.floor();
            let fraction = rank - integer;
            let n = usize(integer).unwrap();
            let &floor = self.0.get_unchecked(n);
            let &ceiling = self.0.get_unchecked(n + 1);

            floor + (ceiling - floor) * fraction
        }
    }

    /// Returns the percentile at `p`%
    ///
    /// # Panics
    ///
    /// Panics if `p` is outside the closed `[0, 100]` range
    pub fn at(&self, p: A) -> A {
        let _0 = A::cast(0);
        let _100 = A::cast(100);

        assert!(p >= _0 && p <= _100);
        assert!(!self.0.is_empty());

        unsafe { self.at_unchecked(p) }
    }

    /// Returns the 50th percentile
    pub fn median(&self) -> A {
        self.at(A::cast(50))
    }
}

#[cfg(test)]
mod test {
    use approx::assert_relative_eq;

    use crate::stats::univariate::Sample;

    #[test]
    fn interpolates_between_order_statistics() {
        let v = [1.0f64, 2.0, 10.0, 4.0];
        let percentiles = Sample::new(&v).percentiles();

        assert_relative_eq!(percentiles.at(0.0), 1.0);
        assert_relative_eq!(percentiles.at(100.0), 10.0);
        assert_relative_eq!(percentiles.median(), 3.0);
        // rank 2.97 sits between the 3rd and 4th order statistics
        assert_relative_eq!(percentiles.at(99.0), 4.0 + 0.97 * 6.0);
    }

    #[test]
    fn constant_sample_has_flat_percentiles() {
        let v = [5.0f64; 8];
        let percentiles = Sample::new(&v).percentiles();

        for p in &[0.0, 25.0, 50.0, 99.0, 100.0] {
            assert_relative_eq!(percentiles.at(*p), 5.0);
        }
    }
}
