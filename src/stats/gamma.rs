//! Two-parameter Gamma distribution: maximum-likelihood fit, tail
//! quantiles, and goodness-of-fit diagnostics.
//!
//! The distance scorer fits the full vector of distances to a
//! Gamma(shape, rate) by maximum likelihood and derives its anomaly
//! threshold from the fitted upper tail. A poor fit is reported through
//! [`GoodnessOfFit`], never raised as an error: the caller receives
//! best-effort parameters and judges quality from the statistics.

use std::f64::consts::PI;

/// Iteration cap shared by the series, continued-fraction, and Newton
/// refinements.
const MAX_ITERATIONS: usize = 200;

/// A fitted two-parameter Gamma distribution (shape `k`, rate `lambda`).
#[derive(Clone, Copy, Debug, Serialize)]
pub struct Gamma {
    shape: f64,
    rate: f64,
}

impl Gamma {
    /// Fits shape and rate to `sample` by maximum likelihood.
    ///
    /// Only strictly positive values carry likelihood information (the
    /// log-likelihood needs `ln x`); zeros appear whenever an observation
    /// coincides with the reference vector and are excluded from the fit.
    /// When fewer than 2 positive values remain the fit degenerates to an
    /// exponential with the sample mean, which the goodness-of-fit
    /// statistics will expose as poor.
    pub fn fit(sample: &[f64]) -> Gamma {
        debug_assert!(sample.iter().all(|x| x.is_finite() && *x >= 0.0));

        let positive: Vec<f64> = sample.iter().copied().filter(|&x| x > 0.0).collect();
        if positive.len() < 2 {
            let mean = sample.iter().sum::<f64>() / sample.len().max(1) as f64;
            warn!(
                "gamma fit: only {} positive value(s) in a sample of {}; \
                 falling back to exponential parameters",
                positive.len(),
                sample.len()
            );
            let rate = if mean > 0.0 { 1.0 / mean } else { 1.0 };
            return Gamma { shape: 1.0, rate };
        }

        let n = positive.len() as f64;
        let mean = positive.iter().sum::<f64>() / n;
        let mean_ln = positive.iter().map(|x| x.ln()).sum::<f64>() / n;

        // s = ln(mean) - mean(ln x) is >= 0 by Jensen; 0 only for a
        // constant sample, where the shape diverges
        let s = (mean.ln() - mean_ln).max(1e-12);

        // closed-form seed (Minka), then Newton on the shape equation
        // ln k - psi(k) = s
        let mut shape = (3.0 - s + ((s - 3.0).powi(2) + 24.0 * s).sqrt()) / (12.0 * s);
        for _ in 0..MAX_ITERATIONS {
            let f = shape.ln() - digamma(shape) - s;
            let df = 1.0 / shape - trigamma(shape);
            let next = (shape - f / df).max(shape * 1e-3);
            if (next - shape).abs() < 1e-12 * shape {
                shape = next;
                break;
            }
            shape = next;
        }

        Gamma {
            shape,
            rate: shape / mean,
        }
    }

    /// The fitted shape parameter.
    pub fn shape(&self) -> f64 {
        self.shape
    }

    /// The fitted rate parameter.
    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Cumulative distribution function.
    pub fn cdf(&self, x: f64) -> f64 {
        if x <= 0.0 {
            0.0
        } else {
            // the continued-fraction tail can overshoot [0, 1] by an ulp
            reg_lower_gamma(self.shape, self.rate * x).max(0.0).min(1.0)
        }
    }

    /// The value `x` with `P(X <= x) = p`, for `p` in `(0, 1)`.
    ///
    /// The CDF is monotone, so a doubling bracket followed by bisection
    /// always converges; 100 halvings reach machine precision.
    pub fn inverse_cdf(&self, p: f64) -> f64 {
        debug_assert!(p > 0.0 && p < 1.0);

        let mut hi = (self.shape / self.rate).max(1.0);
        while self.cdf(hi) < p {
            hi *= 2.0;
            if hi > 1e300 {
                break;
            }
        }

        let mut lo = 0.0;
        for _ in 0..100 {
            let mid = 0.5 * (lo + hi);
            if self.cdf(mid) < p {
                lo = mid;
            } else {
                hi = mid;
            }
        }

        0.5 * (lo + hi)
    }

    /// The threshold `x` with `P(X > x) = tail_probability`.
    pub fn upper_tail(&self, tail_probability: f64) -> f64 {
        self.inverse_cdf(1.0 - tail_probability)
    }
}

/// One-sample goodness-of-fit statistics against a fitted distribution.
///
/// Reported for diagnosis only; nothing in the crate branches on them.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct GoodnessOfFit {
    /// Kolmogorov-Smirnov statistic (max ECDF deviation).
    pub ks: f64,
    /// Anderson-Darling statistic (tail-weighted).
    pub ad: f64,
    /// Cramer-von Mises statistic (integrated squared deviation).
    pub cvm: f64,
}

impl GoodnessOfFit {
    /// Computes all three statistics for `sample` under `dist`.
    ///
    /// - Time: `O(N log N) where N = length`
    pub fn compute(sample: &[f64], dist: &Gamma) -> GoodnessOfFit {
        use itertools::Itertools;
        use std::cmp::Ordering;

        let n = sample.len() as f64;
        let z: Vec<f64> = sample
            .iter()
            .copied()
            // NB the scorers never produce NaN scores, so Equal is unreachable
            .sorted_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal))
            .map(|x| dist.cdf(x).max(1e-12).min(1.0 - 1e-12))
            .collect();

        let mut ks = 0.0f64;
        let mut cvm = 1.0 / (12.0 * n);
        let mut ad = 0.0;
        for (i, &z_i) in z.iter().enumerate() {
            let rank = (i + 1) as f64;
            ks = ks.max((rank / n - z_i).max(z_i - (rank - 1.0) / n));
            cvm += (z_i - (2.0 * rank - 1.0) / (2.0 * n)).powi(2);
            ad += (2.0 * rank - 1.0) * (z_i.ln() + (1.0 - z[z.len() - i - 1]).ln());
        }
        let ad = -n - ad / n;

        GoodnessOfFit { ks, ad, cvm }
    }
}

/// Natural log of the Gamma function (Lanczos, g = 7).
pub(crate) fn ln_gamma(x: f64) -> f64 {
    const COEFFICIENTS: [f64; 8] = [
        676.520_368_121_885_1,
        -1_259.139_216_722_402_8,
        771.323_428_777_653_1,
        -176.615_029_162_140_6,
        12.507_343_278_686_905,
        -0.138_571_095_265_720_12,
        9.984_369_578_019_572e-6,
        1.505_632_735_149_311_6e-7,
    ];

    if x < 0.5 {
        // reflection, since the approximation below needs x >= 0.5
        (PI / (PI * x).sin()).ln() - ln_gamma(1.0 - x)
    } else {
        let x = x - 1.0;
        let t = x + 7.5;
        let mut acc = 0.999_999_999_999_809_9;
        for (i, &c) in COEFFICIENTS.iter().enumerate() {
            acc += c / (x + (i + 1) as f64);
        }

        0.5 * (2.0 * PI).ln() + (x + 0.5) * t.ln() - t + acc.ln()
    }
}

/// Digamma function: recurrence up to 6, then the asymptotic series.
pub(crate) fn digamma(x: f64) -> f64 {
    let mut result = 0.0;
    let mut x = x;
    while x < 6.0 {
        result -= 1.0 / x;
        x += 1.0;
    }

    let inv = 1.0 / x;
    let inv2 = inv * inv;
    result + x.ln()
        - 0.5 * inv
        - inv2 * (1.0 / 12.0 - inv2 * (1.0 / 120.0 - inv2 / 252.0))
}

/// Trigamma function: recurrence up to 6, then the asymptotic series.
pub(crate) fn trigamma(x: f64) -> f64 {
    let mut result = 0.0;
    let mut x = x;
    while x < 6.0 {
        result += 1.0 / (x * x);
        x += 1.0;
    }

    let inv = 1.0 / x;
    let inv2 = inv * inv;
    result + inv * (1.0 + inv * (0.5 + inv * (1.0 / 6.0 - inv2 * (1.0 / 30.0 - inv2 / 42.0))))
}

/// Regularized lower incomplete gamma `P(a, x)`: series expansion below
/// `a + 1`, Lentz continued fraction above.
pub(crate) fn reg_lower_gamma(a: f64, x: f64) -> f64 {
    debug_assert!(a > 0.0);

    if x <= 0.0 {
        return 0.0;
    }

    let prefactor = (-x + a * x.ln() - ln_gamma(a)).exp();

    if x < a + 1.0 {
        let mut denom = a;
        let mut term = 1.0 / a;
        let mut sum = term;
        for _ in 0..MAX_ITERATIONS {
            denom += 1.0;
            term *= x / denom;
            sum += term;
            if term.abs() < sum.abs() * 1e-15 {
                break;
            }
        }
        sum * prefactor
    } else {
        const TINY: f64 = 1e-300;
        let mut b = x + 1.0 - a;
        let mut c = 1.0 / TINY;
        let mut d = 1.0 / b;
        let mut h = d;
        for i in 1..MAX_ITERATIONS {
            let an = -(i as f64) * (i as f64 - a);
            b += 2.0;
            d = an * d + b;
            if d.abs() < TINY {
                d = TINY;
            }
            c = b + an / c;
            if c.abs() < TINY {
                c = TINY;
            }
            d = 1.0 / d;
            let delta = d * c;
            h *= delta;
            if (delta - 1.0).abs() < 1e-15 {
                break;
            }
        }
        1.0 - prefactor * h
    }
}
