//! Sum of Absolute Differences (SAD) / Manhattan distance on RGBA.
//! All 4 channels are compared in premultiplied space, since that is the
//! renderer's native format and alpha affects blending. Lower is better;
//! a painting compared against its own rendering scores exactly 0.

use image::RgbaImage;
use rayon::prelude::*;
use std::path::Path;

use crate::error::{Error, Result};
use crate::render::premultiply;

/// the decoded target, shared read-only by every evaluation worker
#[derive(Clone, Debug)]
pub struct TargetImage {
    width: u32,
    height: u32,
    premul: Vec<u8>,
}

impl TargetImage {
    /// decode a raster file into a premultiplied RGBA buffer.
    /// failure to decode is fatal configuration, surfaced before a run starts.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        profiling::scope!("TargetImage::load");
        let img = image::open(path.as_ref())?.to_rgba8();
        Ok(Self::from_rgba8(&img))
    }

    /// build a target from an already-decoded straight-alpha image
    pub fn from_rgba8(img: &RgbaImage) -> Self {
        Self {
            width: img.width(),
            height: img.height(),
            premul: premultiply(img.as_raw()),
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn premul_rgba(&self) -> &[u8] {
        &self.premul
    }
}

/// Score rendered painting bytes against the target. The rendered buffer
/// must be premultiplied RGBA of the target's dimensions; anything else is
/// a configuration invariant violation.
///
/// Pure and side-effect-free so the evaluation stage can fan it out across
/// workers without synchronization.
pub fn evaluate(target: &TargetImage, rendered_premul: &[u8]) -> Result<f64> {
    if rendered_premul.len() != target.premul.len() {
        return Err(Error::Config(format!(
            "rendered buffer does not match target dimensions ({} bytes vs {})",
            rendered_premul.len(),
            target.premul.len()
        )));
    }
    Ok(sad_rgba(&target.premul, rendered_premul))
}

/// parallel SAD over two equal-length RGBA buffers.
/// coarse chunks keep per-task Rayon overhead negligible.
pub fn sad_rgba(a: &[u8], b: &[u8]) -> f64 {
    profiling::scope!("sad_rgba");
    debug_assert_eq!(a.len(), b.len());
    debug_assert_eq!(a.len() % 4, 0);

    const CHUNK: usize = 64 * 1024;
    let total: u64 = a
        .par_chunks(CHUNK)
        .zip(b.par_chunks(CHUNK))
        .map(|(ta, ca)| {
            ta.iter()
                .zip(ca)
                .map(|(&t, &c)| (t as i32 - c as i32).unsigned_abs() as u64)
                .sum::<u64>()
        })
        .sum();

    total as f64
}
