//! Deterministic RNG utilities for reproducible tests.

use nalgebra::Point3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Create a deterministic `ChaCha8Rng` from a seed.
///
/// All test randomization should go through this to ensure reproducibility.
pub fn seeded_rng(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}

/// `count` target positions inside an axis-aligned cube of half-width
/// `half_extent` around `center`.
pub fn random_targets(
    seed: u64,
    count: usize,
    center: Point3<f32>,
    half_extent: f32,
) -> Vec<Point3<f32>> {
    let mut rng = seeded_rng(seed);
    (0..count)
        .map(|_| {
            center
                + nalgebra::Vector3::new(
                    rng.gen_range(-half_extent..=half_extent),
                    rng.gen_range(-half_extent..=half_extent),
                    rng.gen_range(-half_extent..=half_extent),
                )
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
