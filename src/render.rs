use tiny_skia as sk;

use crate::dna::{Painting, Triangle};
use std::sync::Arc;

pub struct CpuRenderer;

impl CpuRenderer {
    /// Full-frame render to premultiplied RGBA (tiny-skia's native format).
    /// Fills the background first, then composites each triangle in
    /// sequence order with standard alpha-over blending. Deterministic:
    /// identical triangle sequence + background gives byte-identical bytes.
    pub fn render_rgba_premul(painting: &Painting) -> Vec<u8> {
        profiling::scope!("render_rgba_premul");
        let mut pix = sk::Pixmap::new(painting.width, painting.height).expect("pixmap");
        pix.fill(color_from_rgba(painting.background));

        for tri in &painting.triangles {
            draw_triangle(&mut pix, tri);
        }
        pix.take()
    }
}

fn color_from_rgba(rgba: [f32; 4]) -> sk::Color {
    // channels are clamped on construction/mutation, so from_rgba cannot fail
    sk::Color::from_rgba(
        rgba[0].clamp(0.0, 1.0),
        rgba[1].clamp(0.0, 1.0),
        rgba[2].clamp(0.0, 1.0),
        rgba[3].clamp(0.0, 1.0),
    )
    .expect("clamped color")
}

fn draw_triangle(pix: &mut sk::Pixmap, tri: &Triangle) {
    profiling::scope!("draw_triangle");

    // Quick reject: bbox fully outside the pixmap
    let (w, h) = (pix.width(), pix.height());
    let mut min_x = f32::INFINITY;
    let mut min_y = f32::INFINITY;
    let mut max_x = f32::NEG_INFINITY;
    let mut max_y = f32::NEG_INFINITY;
    for &(x, y) in &tri.points {
        if x < min_x { min_x = x; }
        if y < min_y { min_y = y; }
        if x > max_x { max_x = x; }
        if y > max_y { max_y = y; }
    }
    if max_x < 0.0 || max_y < 0.0 || min_x >= w as f32 || min_y >= h as f32 {
        return;
    }

    // vertices are immutable after creation, so the path is built once
    let path = tri.cached_path.get_or_init(|| {
        let mut pb = sk::PathBuilder::new();
        pb.move_to(tri.points[0].0, tri.points[0].1);
        pb.line_to(tri.points[1].0, tri.points[1].1);
        pb.line_to(tri.points[2].0, tri.points[2].1);
        pb.close();
        Arc::new(pb.finish().expect("path build"))
    });

    let mut paint = sk::Paint::default();
    paint.anti_alias = true;
    paint.shader = sk::Shader::SolidColor(color_from_rgba(tri.rgba));

    pix.fill_path(
        path,
        &paint,
        sk::FillRule::Winding,
        sk::Transform::identity(),
        None,
    );
}

/// Premultiply straight-alpha RGBA bytes (target images arrive straight
/// from the decoder; fitness compares in premultiplied space).
#[inline]
pub fn premultiply(p: &[u8]) -> Vec<u8> {
    profiling::scope!("premultiply");

    let mut out = vec![0u8; p.len()];
    let mut i = 0usize;
    while i < p.len() {
        let a = p[i + 3] as u16;
        // (x * a + 127) / 255 is a fast rounded divide-by-255
        out[i] = ((p[i] as u16 * a + 127) / 255) as u8;
        out[i + 1] = ((p[i + 1] as u16 * a + 127) / 255) as u8;
        out[i + 2] = ((p[i + 2] as u16 * a + 127) / 255) as u8;
        out[i + 3] = a as u8;
        i += 4;
    }
    out
}

/// Inverse of `premultiply`, used when exporting rendered frames as PNG.
#[inline]
pub fn unpremultiply(p: &[u8]) -> Vec<u8> {
    profiling::scope!("unpremultiply");

    let mut out = vec![0u8; p.len()];
    let mut i = 0usize;
    while i < p.len() {
        let a = p[i + 3] as u32;
        if a == 0 {
            out[i + 3] = 0;
        } else {
            out[i] = ((p[i] as u32 * 255 + a / 2) / a).min(255) as u8;
            out[i + 1] = ((p[i + 1] as u32 * 255 + a / 2) / a).min(255) as u8;
            out[i + 2] = ((p[i + 2] as u32 * 255 + a / 2) / a).min(255) as u8;
            out[i + 3] = a as u8;
        }
        i += 4;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dna::Painting;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    #[test]
    fn render_is_deterministic() {
        let mut rng = Pcg32::seed_from_u64(42);
        let p = Painting::random(30, 24, 24, [1.0, 1.0, 1.0, 1.0], &mut rng);
        assert_eq!(p.render(), p.render());
    }

    #[test]
    fn empty_painting_renders_solid_background() {
        let p = Painting {
            width: 4,
            height: 4,
            background: [1.0, 1.0, 1.0, 1.0],
            triangles: Vec::new(),
        };
        let px = p.render();
        assert_eq!(px.len(), 4 * 4 * 4);
        assert!(px.iter().all(|&b| b == 255));
    }

    #[test]
    fn later_triangles_paint_over_earlier_ones() {
        // two opaque triangles both covering the whole canvas; the second
        // one (higher z-order) must win at the center pixel
        let cover = [(-8.0, -8.0), (32.0, -8.0), (-8.0, 32.0)];
        let p = Painting {
            width: 8,
            height: 8,
            background: [1.0, 1.0, 1.0, 1.0],
            triangles: vec![
                crate::dna::Triangle::new(cover, [1.0, 0.0, 0.0, 1.0]),
                crate::dna::Triangle::new(cover, [0.0, 0.0, 1.0, 1.0]),
            ],
        };
        let px = p.render();
        let center = ((4 * 8 + 4) * 4) as usize;
        assert_eq!(&px[center..center + 4], &[0, 0, 255, 255]);
    }

    #[test]
    fn premultiply_round_trip_on_opaque_pixels() {
        let straight = [10u8, 128, 250, 255, 0, 0, 0, 255];
        let premul = premultiply(&straight);
        assert_eq!(unpremultiply(&premul), straight);
    }
}
