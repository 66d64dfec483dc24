use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use vicinity::{ContentHash, SearchOptions, VectorRecord, euclidean_distance};

/// Deterministic key from a single byte, for readable assertions.
pub fn hash(n: u8) -> ContentHash {
    ContentHash::from_bytes([n; 20])
}

/// Seeded generator so failures reproduce across runs.
pub fn seeded_rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

pub fn random_vector(rng: &mut StdRng, dims: usize) -> Vec<f32> {
    (0..dims).map(|_| rng.random_range(-1.0f32..1.0)).collect()
}

/// Linear scan with the same result contract as the tree: one entry per
/// key at its closest insertion, strict distance ceiling (which a NaN
/// distance always fails), scope intersection, ranked by distance then key.
pub fn brute_force_nearest(
    records: &[VectorRecord<ContentHash>],
    target: &[f32],
    options: &SearchOptions,
) -> Vec<(ContentHash, f32)> {
    let mut best: HashMap<ContentHash, f32> = HashMap::new();
    for record in records {
        if !record.scopes().intersects(options.scope) {
            continue;
        }
        let distance = euclidean_distance(record.vector(), target);
        if distance < options.max_distance {
            let entry = best.entry(*record.key()).or_insert(f32::INFINITY);
            if distance < *entry {
                *entry = distance;
            }
        }
    }

    let mut ranked: Vec<(ContentHash, f32)> = best.into_iter().collect();
    ranked.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(options.limit);
    ranked
}
