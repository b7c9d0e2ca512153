use oorandom::Rand64;

pub(crate) type Rng = Rand64;

/// Creates a generator from an explicit seed.
///
/// Every stochastic component of the crate draws its randomness through
/// here, so a run is reproducible from (input, configuration, seed) alone.
pub(crate) fn new_rng(seed: u64) -> Rng {
    Rand64::new(u128::from(seed))
}

/// Derives an independent child generator from `rng`.
///
/// Used to hand each isolation tree its own stream before the trees are
/// dispatched to worker threads; the derivation happens on one thread, so
/// scheduling cannot change which stream a tree receives.
pub(crate) fn split(rng: &mut Rng) -> Rng {
    let hi = u128::from(rng.rand_u64());
    let lo = u128::from(rng.rand_u64());
    Rand64::new((hi << 64) | lo)
}

/// A draw from the standard normal distribution via the Box-Muller
/// transform.
pub(crate) fn gaussian(rng: &mut Rng) -> f64 {
    // rand_float() is in [0, 1); flip it so the log argument is never zero
    let u = 1.0 - rng.rand_float();
    let v = rng.rand_float();

    (-2.0 * u.ln()).sqrt() * (2.0 * std::f64::consts::PI * v).cos()
}
