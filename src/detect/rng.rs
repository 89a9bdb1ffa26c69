use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Random source shared by every tree of one fit.
pub type DetectorRng = ChaCha8Rng;

/// A fixed seed gives a reproducible stream; `None` draws from OS entropy.
pub fn detector_rng(seed: Option<u64>) -> DetectorRng {
    match seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_entropy(),
    }
}

/// Box-Muller transform for normal distribution
pub fn gauss<R: Rng + ?Sized>(rng: &mut R, mean: f64, std_dev: f64) -> f64 {
    let u1 = rng.gen::<f64>().max(1e-15);
    let u2 = rng.gen::<f64>();
    let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
    mean + std_dev * z
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_stream() {
        let mut a = detector_rng(Some(42));
        let mut b = detector_rng(Some(42));
        for _ in 0..100 {
            assert_eq!(a.gen::<u64>(), b.gen::<u64>());
        }
    }

    #[test]
    fn gauss_centres_on_mean() {
        let mut rng = detector_rng(Some(7));
        let n = 2000;
        let mean = (0..n).map(|_| gauss(&mut rng, 10.0, 2.0)).sum::<f64>() / n as f64;
        assert!((mean - 10.0).abs() < 0.3, "mean {mean}");
    }
}
