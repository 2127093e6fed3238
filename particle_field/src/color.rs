//! Color helpers.  Particle colors are linear RGB triples in `[0, 1]`; the
//! framebuffer wants packed `0xAARRGGBB`.

use crate::math::Vec3;

pub const NEON_CYAN: Vec3 = Vec3::new(0.0, 1.0, 1.0);
pub const MASK_BLUE: Vec3 = Vec3::new(0.0, 0.8, 1.0);

/// HSV → RGB.  `h` is in turns (`0.0..1.0` wraps), `s` and `v` in `[0, 1]`.
pub fn hsv_to_rgb(h: f32, s: f32, v: f32) -> Vec3 {
    let h6 = h.rem_euclid(1.0) * 6.0;
    let hi = h6 as u32;
    let f  = h6 - hi as f32;
    let p  = v * (1.0 - s);
    let q  = v * (1.0 - s * f);
    let t  = v * (1.0 - s * (1.0 - f));
    let (r, g, b) = match hi {
        0 => (v, t, p),
        1 => (q, v, p),
        2 => (p, v, t),
        3 => (p, q, v),
        4 => (t, p, v),
        _ => (v, p, q),
    };
    Vec3::new(r, g, b)
}

/// HSL → RGB, same conventions as [`hsv_to_rgb`].
pub fn hsl_to_rgb(h: f32, s: f32, l: f32) -> Vec3 {
    let v = l + s * l.min(1.0 - l);
    let sv = if v > 0.0 { 2.0 * (1.0 - l / v) } else { 0.0 };
    hsv_to_rgb(h, sv, v)
}

/// Pack an RGB triple into opaque ARGB, clamping each channel.
pub fn rgb_to_argb(c: Vec3) -> u32 {
    let ch = |v: f32| (v.clamp(0.0, 1.0) * 255.0) as u32;
    0xFF000000 | (ch(c.x) << 16) | (ch(c.y) << 8) | ch(c.z)
}

/// Scale brightness of a packed color.
pub fn dim(c: u32, f: f32) -> u32 {
    let f = f.clamp(0.0, 1.0);
    let r = (((c >> 16) & 0xFF) as f32 * f) as u32;
    let g = (((c >> 8) & 0xFF) as f32 * f) as u32;
    let b = ((c & 0xFF) as f32 * f) as u32;
    0xFF000000 | (r << 16) | (g << 8) | b
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primary_hues() {
        assert_eq!(rgb_to_argb(hsv_to_rgb(0.0, 1.0, 1.0)), 0xFFFF0000);
        assert_eq!(rgb_to_argb(hsv_to_rgb(1.0 / 3.0, 1.0, 1.0)), 0xFF00FF00);
        assert_eq!(rgb_to_argb(NEON_CYAN), 0xFF00FFFF);
    }

    #[test]
    fn hsl_half_lightness_is_full_saturation() {
        let c = hsl_to_rgb(0.0, 1.0, 0.5);
        assert!((c.x - 1.0).abs() < 1e-6 && c.y.abs() < 1e-6 && c.z.abs() < 1e-6);
    }

    #[test]
    fn dim_halves_channels() {
        assert_eq!(dim(0xFF_80_40_20, 0.5), 0xFF_40_20_10);
    }
}
