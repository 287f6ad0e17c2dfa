use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Row indices of a train/test partition. The two sides are disjoint and
/// together cover every source row exactly once.
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Deterministic shuffled partition. The permutation is drawn from a ChaCha8
/// stream seeded by the caller, so the same seed reproduces the same
/// assignment on every run.
pub fn split_indices(n_rows: usize, test_fraction: f32, seed: u64) -> SplitIndices {
    let mut indices: Vec<usize> = (0..n_rows).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let n_test = (n_rows as f32 * test_fraction).round() as usize;
    let test = indices.split_off(n_rows - n_test.min(n_rows));

    SplitIndices {
        train: indices,
        test,
    }
}
