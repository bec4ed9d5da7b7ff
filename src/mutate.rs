use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use crate::dna::Painting;

/// knobs for the mutation operator
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct MutateParams {
    /// per-triangle probability of a Gaussian perturbation
    pub rate: f32,
    /// probability of swapping the z-order of two random triangles
    pub swap_prob: f32,
    /// perturbation scale: pixels for vertices, 8-bit channel units for color
    pub sigma: f32,
}

impl Default for MutateParams {
    fn default() -> Self {
        Self {
            rate: 0.04,
            swap_prob: 0.25,
            sigma: 1.0,
        }
    }
}

/// Mutate a painting, returning a new independently owned value; the input
/// is never touched. Two independent channels:
///
/// 1. each triangle, with probability `rate`, gets additive Gaussian noise
///    on its vertices (scale `sigma` px, clamped to the canvas) and color
///    channels (scale `sigma`/255 in unit color space, clamped to 0..1);
/// 2. with probability `swap_prob`, two random triangles exchange paint
///    order. triangle content is untouched; only occlusion changes.
///
/// `rate = 0, swap_prob = 0` is a no-op and renders identically to the input.
pub fn mutate_painting<R: Rng>(painting: &Painting, params: &MutateParams, rng: &mut R) -> Painting {
    profiling::scope!("mutate_painting");
    let mut child = painting.clone();
    let w = child.width as f32;
    let h = child.height as f32;

    if params.rate > 0.0 {
        // sigma was validated non-negative with the rest of the settings
        let pos_noise = Normal::new(0.0f32, params.sigma.max(0.0)).expect("non-negative sigma");
        let col_noise = Normal::new(0.0f32, params.sigma.max(0.0) / 255.0).expect("non-negative sigma");

        for tri in &mut child.triangles {
            if rng.random::<f32>() >= params.rate {
                continue;
            }
            for p in &mut tri.points {
                p.0 = (p.0 + pos_noise.sample(rng)).clamp(0.0, w);
                p.1 = (p.1 + pos_noise.sample(rng)).clamp(0.0, h);
            }
            for c in &mut tri.rgba {
                *c = (*c + col_noise.sample(rng)).clamp(0.0, 1.0);
            }
            // perturbed geometry invalidates any cached path
            tri.cached_path = std::sync::OnceLock::new();
        }
    }

    if params.swap_prob > 0.0 && child.triangles.len() >= 2 && rng.random::<f32>() < params.swap_prob {
        // two distinct positions, so a triggered swap always reorders
        let n = child.triangles.len();
        let i = rng.random_range(0..n);
        let mut j = rng.random_range(0..n - 1);
        if j >= i {
            j += 1;
        }
        child.triangles.swap(i, j);
    }

    child
}
