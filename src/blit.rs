use crate::foundation::core::{Point, Rgb};
use crate::foundation::error::{MixelError, MixelResult};
use crate::foundation::math::{lerp_u8, mul_div255_u16};
use crate::frame::FrameBuffer;
use crate::geometry::Geometry;
use rayon::prelude::*;

/// Per-pixel combine rule used when a layer is composited onto the output
/// surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum BlendMode {
    /// Opaque replace.
    Rgb,
    /// Blend scaled by the layer opacity and the source alpha.
    Alpha,
    /// Saturating additive.
    Add,
    /// Opaque replace, except pixels matching the key color are fully
    /// transparent.
    ColorKey(Rgb),
}

impl BlendMode {
    /// Parse a mode by name, case-insensitively. `colorkey` accepts an
    /// optional `:RRGGBB` key suffix and defaults to black.
    pub fn parse(name: &str) -> MixelResult<Self> {
        let lower = name.trim().to_ascii_lowercase();
        match lower.as_str() {
            "rgb" => Ok(Self::Rgb),
            "alpha" => Ok(Self::Alpha),
            "add" | "additive" => Ok(Self::Add),
            "colorkey" => Ok(Self::ColorKey(Rgb::BLACK)),
            _ => {
                if let Some(hex) = lower.strip_prefix("colorkey:") {
                    let key = Rgb::from_hex(hex)
                        .map_err(|_| MixelError::UnknownBlitMode(name.trim().to_string()))?;
                    return Ok(Self::ColorKey(key));
                }
                Err(MixelError::UnknownBlitMode(name.trim().to_string()))
            }
        }
    }

    /// Canonical mode name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Rgb => "rgb",
            Self::Alpha => "alpha",
            Self::Add => "add",
            Self::ColorKey(_) => "colorkey",
        }
    }
}

#[inline]
fn blend_px(dst: &mut [u8], src: &[u8], mode: BlendMode, opacity: u8) {
    match mode {
        BlendMode::Rgb => {
            dst[0] = src[0];
            dst[1] = src[1];
            dst[2] = src[2];
            dst[3] = 255;
        }
        BlendMode::Alpha => {
            let t = mul_div255_u16(u16::from(opacity), u16::from(src[3]));
            dst[0] = lerp_u8(dst[0], src[0], t);
            dst[1] = lerp_u8(dst[1], src[1], t);
            dst[2] = lerp_u8(dst[2], src[2], t);
            dst[3] = 255;
        }
        BlendMode::Add => {
            dst[0] = dst[0].saturating_add(src[0]);
            dst[1] = dst[1].saturating_add(src[1]);
            dst[2] = dst[2].saturating_add(src[2]);
            dst[3] = 255;
        }
        BlendMode::ColorKey(key) => {
            if src[0] == key.r && src[1] == key.g && src[2] == key.b {
                return;
            }
            dst[0] = src[0];
            dst[1] = src[1];
            dst[2] = src[2];
            dst[3] = 255;
        }
    }
}

/// Composite `src` onto `dst` at the destination defined by `geo`, using
/// `mode` and the layer opacity. Rows are processed in parallel;
/// destinations outside the surface are clipped.
pub(crate) fn composite(
    dst: &mut FrameBuffer,
    src: &FrameBuffer,
    geo: &Geometry,
    mode: BlendMode,
    opacity: u8,
) {
    if geo.zooming() || geo.rotating() {
        composite_rotozoom(dst, src, geo, mode, opacity);
    } else {
        composite_axis_aligned(dst, src, geo, mode, opacity);
    }
}

fn composite_axis_aligned(
    dst: &mut FrameBuffer,
    src: &FrameBuffer,
    geo: &Geometry,
    mode: BlendMode,
    opacity: u8,
) {
    let x0 = geo.x.round() as i64;
    let y0 = geo.y.round() as i64;
    let dw = i64::from(dst.width());
    let sw = i64::from(src.width());
    let sh = i64::from(src.height());
    let stride = dst.stride();

    let dx_start = x0.max(0);
    let dx_end = (x0 + sw).min(dw);
    if dx_start >= dx_end {
        return;
    }

    dst.data_mut()
        .par_chunks_exact_mut(stride)
        .enumerate()
        .for_each(|(dy, drow)| {
            let sy = dy as i64 - y0;
            if sy < 0 || sy >= sh {
                return;
            }
            let srow = src.row(sy as u32);
            for dx in dx_start..dx_end {
                let si = ((dx - x0) as usize) * 4;
                let di = (dx as usize) * 4;
                blend_px(&mut drow[di..di + 4], &srow[si..si + 4], mode, opacity);
            }
        });
}

fn composite_rotozoom(
    dst: &mut FrameBuffer,
    src: &FrameBuffer,
    geo: &Geometry,
    mode: BlendMode,
    opacity: u8,
) {
    let affine = geo.to_affine();
    let inv = affine.inverse();
    let sw = f64::from(src.width());
    let sh = f64::from(src.height());

    // Destination bounds from the transformed source corners.
    let corners = [
        affine * Point::new(0.0, 0.0),
        affine * Point::new(sw, 0.0),
        affine * Point::new(0.0, sh),
        affine * Point::new(sw, sh),
    ];
    let min_x = corners.iter().map(|p| p.x).fold(f64::INFINITY, f64::min);
    let max_x = corners
        .iter()
        .map(|p| p.x)
        .fold(f64::NEG_INFINITY, f64::max);
    let min_y = corners.iter().map(|p| p.y).fold(f64::INFINITY, f64::min);
    let max_y = corners
        .iter()
        .map(|p| p.y)
        .fold(f64::NEG_INFINITY, f64::max);

    let dx_start = (min_x.floor() as i64).max(0);
    let dx_end = (max_x.ceil() as i64).min(i64::from(dst.width()));
    let dy_start = (min_y.floor() as i64).max(0);
    let dy_end = (max_y.ceil() as i64).min(i64::from(dst.height()));
    if dx_start >= dx_end || dy_start >= dy_end {
        return;
    }

    let stride = dst.stride();
    dst.data_mut()
        .par_chunks_exact_mut(stride)
        .enumerate()
        .for_each(|(dy, drow)| {
            let dy = dy as i64;
            if dy < dy_start || dy >= dy_end {
                return;
            }
            for dx in dx_start..dx_end {
                // Inverse-map the destination pixel center and sample
                // nearest-neighbour.
                let p = inv * Point::new(dx as f64 + 0.5, dy as f64 + 0.5);
                if p.x < 0.0 || p.y < 0.0 || p.x >= sw || p.y >= sh {
                    continue;
                }
                let sx = p.x as u32;
                let sy = p.y as u32;
                let srow = src.row(sy);
                let si = sx as usize * 4;
                let di = dx as usize * 4;
                blend_px(&mut drow[di..di + 4], &srow[si..si + 4], mode, opacity);
            }
        });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::core::Rgba8;

    fn surface(w: u32, h: u32) -> FrameBuffer {
        FrameBuffer::solid(w, h, Rgba8::BLACK).unwrap()
    }

    #[test]
    fn parse_known_modes_and_reject_unknown() {
        assert_eq!(BlendMode::parse("RGB").unwrap(), BlendMode::Rgb);
        assert_eq!(BlendMode::parse(" alpha ").unwrap(), BlendMode::Alpha);
        assert_eq!(BlendMode::parse("additive").unwrap(), BlendMode::Add);
        assert_eq!(
            BlendMode::parse("colorkey:00ff00").unwrap(),
            BlendMode::ColorKey(Rgb { r: 0, g: 255, b: 0 })
        );
        assert!(matches!(
            BlendMode::parse("glow"),
            Err(MixelError::UnknownBlitMode(_))
        ));
    }

    #[test]
    fn rgb_mode_replaces_opaquely() {
        let mut dst = surface(4, 4);
        let src = FrameBuffer::solid(2, 2, Rgba8::new(10, 20, 30, 0)).unwrap();
        let mut geo = Geometry::new(2, 2);
        geo.set_position(1.0, 1.0);
        composite(&mut dst, &src, &geo, BlendMode::Rgb, 255);
        assert_eq!(dst.get_pixel(1, 1), Some(Rgba8::opaque(10, 20, 30)));
        assert_eq!(dst.get_pixel(0, 0), Some(Rgba8::BLACK));
        assert_eq!(dst.get_pixel(3, 3), Some(Rgba8::BLACK));
    }

    #[test]
    fn alpha_mode_weights_by_opacity_and_source_alpha() {
        let mut dst = surface(1, 1);
        let src = FrameBuffer::solid(1, 1, Rgba8::new(255, 255, 255, 255)).unwrap();
        composite(
            &mut dst,
            &src,
            &Geometry::new(1, 1),
            BlendMode::Alpha,
            128,
        );
        let px = dst.get_pixel(0, 0).unwrap();
        assert!((i32::from(px.r) - 128).abs() <= 1);

        // Zero opacity leaves the destination untouched.
        let mut dst2 = surface(1, 1);
        composite(&mut dst2, &src, &Geometry::new(1, 1), BlendMode::Alpha, 0);
        assert_eq!(dst2.get_pixel(0, 0), Some(Rgba8::opaque(0, 0, 0)));
    }

    #[test]
    fn add_mode_saturates() {
        let mut dst = FrameBuffer::solid(1, 1, Rgba8::opaque(200, 10, 0)).unwrap();
        let src = FrameBuffer::solid(1, 1, Rgba8::opaque(100, 10, 5)).unwrap();
        composite(&mut dst, &src, &Geometry::new(1, 1), BlendMode::Add, 255);
        assert_eq!(dst.get_pixel(0, 0), Some(Rgba8::opaque(255, 20, 5)));
    }

    #[test]
    fn colorkey_skips_matching_pixels() {
        let mut dst = FrameBuffer::solid(2, 1, Rgba8::opaque(1, 2, 3)).unwrap();
        let mut src = FrameBuffer::solid(2, 1, Rgba8::opaque(0, 255, 0)).unwrap();
        src.put_pixel(1, 0, Rgba8::opaque(9, 9, 9));
        composite(
            &mut dst,
            &src,
            &Geometry::new(2, 1),
            BlendMode::ColorKey(Rgb { r: 0, g: 255, b: 0 }),
            255,
        );
        assert_eq!(dst.get_pixel(0, 0), Some(Rgba8::opaque(1, 2, 3)));
        assert_eq!(dst.get_pixel(1, 0), Some(Rgba8::opaque(9, 9, 9)));
    }

    #[test]
    fn negative_offsets_clip() {
        let mut dst = surface(2, 2);
        let src = FrameBuffer::solid(4, 4, Rgba8::opaque(50, 60, 70)).unwrap();
        let mut geo = Geometry::new(4, 4);
        geo.set_position(-2.0, -2.0);
        composite(&mut dst, &src, &geo, BlendMode::Rgb, 255);
        for y in 0..2 {
            for x in 0..2 {
                assert_eq!(dst.get_pixel(x, y), Some(Rgba8::opaque(50, 60, 70)));
            }
        }
    }

    #[test]
    fn zoom_doubles_coverage() {
        let mut dst = surface(4, 4);
        let src = FrameBuffer::solid(2, 2, Rgba8::opaque(5, 5, 5)).unwrap();
        let mut geo = Geometry::new(2, 2);
        geo.set_zoom(2.0, 2.0);
        geo.set_position(1.0, 1.0);
        composite(&mut dst, &src, &geo, BlendMode::Rgb, 255);
        // Zoom pivots on the frame center: a 2x2 frame at (1,1) scaled 2x
        // covers (0,0)..(4,4).
        assert_eq!(dst.get_pixel(0, 0), Some(Rgba8::opaque(5, 5, 5)));
        assert_eq!(dst.get_pixel(3, 3), Some(Rgba8::opaque(5, 5, 5)));
    }

    #[test]
    fn quarter_rotation_maps_rows_to_columns() {
        let mut dst = surface(3, 3);
        // One red row across the top of a 3x3 source.
        let src = FrameBuffer::from_fn(3, 3, |_, y| {
            if y == 0 {
                Rgba8::opaque(255, 0, 0)
            } else {
                Rgba8::opaque(0, 0, 255)
            }
        })
        .unwrap();
        let mut geo = Geometry::new(3, 3);
        geo.set_rotate(90.0);
        composite(&mut dst, &src, &geo, BlendMode::Rgb, 255);
        // After a 90° clockwise-ish rotation around the center, the top
        // row lands on a vertical edge; the center keeps its color.
        assert_eq!(dst.get_pixel(1, 1), Some(Rgba8::opaque(0, 0, 255)));
        let reds = (0..3)
            .flat_map(|y| (0..3).map(move |x| (x, y)))
            .filter(|&(x, y)| dst.get_pixel(x, y) == Some(Rgba8::opaque(255, 0, 0)))
            .count();
        assert!(reds >= 2);
    }
}
