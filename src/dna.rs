use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, OnceLock};

use crate::error::{Error, Result};

/// alpha range used when seeding random triangles. keeps early paintings
/// translucent so layering can blend toward the target instead of one
/// opaque triangle hiding everything behind it.
pub const INIT_ALPHA_MIN: f32 = 0.2;
pub const INIT_ALPHA_MAX: f32 = 0.8;

/// a triangle with color stored un-premultiplied (0..1 per channel).
/// also caches its tiny-skia path so repeated renders skip path building.
#[derive(Debug, Serialize, Deserialize)]
pub struct Triangle {
    pub points: [(f32, f32); 3],
    pub rgba: [f32; 4],

    #[serde(skip)]
    pub(crate) cached_path: OnceLock<Arc<tiny_skia::Path>>,
}

// manual Clone so a stale path is never carried into a copy whose
// vertices are about to be mutated.
impl Clone for Triangle {
    fn clone(&self) -> Self {
        Self {
            points: self.points,
            rgba: self.rgba,
            cached_path: OnceLock::new(),
        }
    }
}

// the path cache is derived state; equality is geometry + color only.
impl PartialEq for Triangle {
    fn eq(&self, other: &Self) -> bool {
        self.points == other.points && self.rgba == other.rgba
    }
}

impl Triangle {
    pub fn new(points: [(f32, f32); 3], rgba: [f32; 4]) -> Self {
        Self {
            points,
            rgba,
            cached_path: OnceLock::new(),
        }
    }

    /// uniform random triangle within the canvas, translucent random color
    pub fn random<R: Rng>(width: u32, height: u32, rng: &mut R) -> Self {
        let w = width as f32;
        let h = height as f32;
        let mut points = [(0.0, 0.0); 3];
        for p in &mut points {
            p.0 = rng.random::<f32>() * w;
            p.1 = rng.random::<f32>() * h;
        }
        let rgba = [
            rng.random::<f32>(),
            rng.random::<f32>(),
            rng.random::<f32>(),
            rng.random_range(INIT_ALPHA_MIN..INIT_ALPHA_MAX),
        ];
        Self::new(points, rgba)
    }
}

/// the chromosome: an ordered triangle list over a solid background.
/// index 0 is painted first (bottom of the z-order); every later triangle
/// composites over what came before, so reordering changes occlusion.
/// triangle count is fixed for the lifetime of a run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Painting {
    pub width: u32,
    pub height: u32,
    pub background: [f32; 4],
    pub triangles: Vec<Triangle>,
}

impl Painting {
    /// seed a painting with `n` uniform random triangles
    pub fn random<R: Rng>(
        n: usize,
        width: u32,
        height: u32,
        background: [f32; 4],
        rng: &mut R,
    ) -> Self {
        profiling::scope!("Painting::random");
        let triangles = (0..n).map(|_| Triangle::random(width, height, rng)).collect();
        Self {
            width,
            height,
            background,
            triangles,
        }
    }

    pub fn len(&self) -> usize {
        self.triangles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// rasterize to premultiplied RGBA bytes (width * height * 4).
    /// pure and deterministic: the same painting always renders to
    /// byte-identical output.
    pub fn render(&self) -> Vec<u8> {
        crate::render::CpuRenderer::render_rgba_premul(self)
    }

    /// uniform crossover: each triangle index independently keeps either
    /// parent's triangle. the two children are complementary (where one
    /// takes mom's triangle the other takes dad's) and independently owned,
    /// so discarding one never invalidates the other.
    ///
    /// parents must agree on triangle count and canvas size; a mismatch is
    /// a configuration invariant violation, not an expected runtime case.
    pub fn crossover<R: Rng>(&self, other: &Painting, rng: &mut R) -> Result<(Painting, Painting)> {
        profiling::scope!("Painting::crossover");
        if self.triangles.len() != other.triangles.len() {
            return Err(Error::Config(format!(
                "mating parents have mismatched triangle counts ({} vs {})",
                self.triangles.len(),
                other.triangles.len()
            )));
        }
        if self.dimensions() != other.dimensions() {
            return Err(Error::Config(format!(
                "mating parents have mismatched canvas sizes ({}x{} vs {}x{})",
                self.width, self.height, other.width, other.height
            )));
        }

        let n = self.triangles.len();
        let mut a = Vec::with_capacity(n);
        let mut b = Vec::with_capacity(n);
        for (tri_mom, tri_dad) in self.triangles.iter().zip(&other.triangles) {
            if rng.random_bool(0.5) {
                a.push(tri_mom.clone());
                b.push(tri_dad.clone());
            } else {
                a.push(tri_dad.clone());
                b.push(tri_mom.clone());
            }
        }

        let child_a = Painting {
            width: self.width,
            height: self.height,
            background: self.background,
            triangles: a,
        };
        let child_b = Painting {
            width: self.width,
            height: self.height,
            background: self.background,
            triangles: b,
        };
        Ok((child_a, child_b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    #[test]
    fn random_painting_has_requested_shape() {
        let mut rng = Pcg32::seed_from_u64(1);
        let p = Painting::random(25, 64, 48, [1.0; 4], &mut rng);
        assert_eq!(p.len(), 25);
        assert_eq!(p.dimensions(), (64, 48));
        for tri in &p.triangles {
            for &(x, y) in &tri.points {
                assert!((0.0..=64.0).contains(&x));
                assert!((0.0..=48.0).contains(&y));
            }
            assert!(tri.rgba[3] >= INIT_ALPHA_MIN && tri.rgba[3] <= INIT_ALPHA_MAX);
        }
    }

    #[test]
    fn crossover_preserves_count_and_is_complementary() {
        let mut rng = Pcg32::seed_from_u64(7);
        let mom = Painting::random(20, 32, 32, [1.0; 4], &mut rng);
        let dad = Painting::random(20, 32, 32, [1.0; 4], &mut rng);

        let (a, b) = mom.crossover(&dad, &mut rng).unwrap();
        assert_eq!(a.len(), 20);
        assert_eq!(b.len(), 20);

        for i in 0..20 {
            let from_mom = a.triangles[i] == mom.triangles[i];
            let from_dad = a.triangles[i] == dad.triangles[i];
            assert!(from_mom || from_dad, "child triangle must come from a parent");
            // complementary: where a took mom's triangle, b took dad's
            if from_mom {
                assert_eq!(b.triangles[i], dad.triangles[i]);
            } else {
                assert_eq!(b.triangles[i], mom.triangles[i]);
            }
        }
    }

    #[test]
    fn crossover_rejects_mismatched_counts() {
        let mut rng = Pcg32::seed_from_u64(2);
        let mom = Painting::random(10, 32, 32, [1.0; 4], &mut rng);
        let dad = Painting::random(11, 32, 32, [1.0; 4], &mut rng);
        assert!(mom.crossover(&dad, &mut rng).is_err());
    }

    #[test]
    fn clone_is_independent() {
        let mut rng = Pcg32::seed_from_u64(3);
        let original = Painting::random(5, 16, 16, [1.0; 4], &mut rng);
        let mut copy = original.clone();
        copy.triangles[0].points[0] = (999.0, 999.0);
        assert_ne!(original.triangles[0].points[0], (999.0, 999.0));
    }
}
