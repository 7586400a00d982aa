//! Pure blend functions over premultiplied RGBA8 buffers.
//!
//! `blend(backdrop, source, mode, opacity) -> result` needs no rendering surface; the compositor
//! and the selection commit both go through here.

use crate::document::layer::BlendMode;
use crate::foundation::error::{FlipbookError, FlipbookResult};
use crate::foundation::math::{mul_div255_u8, opacity_to_u8};
use crate::raster::bitmap::Bitmap;

/// Blend `source` over `backdrop` and return the result as a new bitmap.
pub fn blend(
    backdrop: &Bitmap,
    source: &Bitmap,
    mode: BlendMode,
    opacity: f32,
) -> FlipbookResult<Bitmap> {
    let mut out = backdrop.clone();
    blend_in_place(out.data_mut(), source.data(), mode, opacity)?;
    Ok(out)
}

/// Blend a single premultiplied pixel.
pub fn blend_pixel(backdrop: [u8; 4], source: [u8; 4], mode: BlendMode, opacity: f32) -> [u8; 4] {
    let mut d = backdrop;
    // Equal-length 4-byte slices cannot fail the length check.
    let _ = blend_in_place(&mut d, &source, mode, opacity);
    d
}

/// Source-over of one premultiplied pixel at full opacity.
#[inline]
pub fn over_pixel(dst: &mut [u8], src: &[u8]) {
    let sa = src[3];
    if sa == 0 {
        return;
    }
    if sa == 255 {
        dst[..4].copy_from_slice(&src[..4]);
        return;
    }
    let inv = 255u16 - u16::from(sa);
    dst[3] = sa.saturating_add(mul_div255_u8(u16::from(dst[3]), inv));
    for c in 0..3 {
        dst[c] = src[c].saturating_add(mul_div255_u8(u16::from(dst[c]), inv));
    }
}

/// Blend `src` into `dst` in place. Both buffers are premultiplied RGBA8 of equal length.
pub fn blend_in_place(
    dst: &mut [u8],
    src: &[u8],
    mode: BlendMode,
    opacity: f32,
) -> FlipbookResult<()> {
    if dst.len() != src.len() || !dst.len().is_multiple_of(4) {
        return Err(FlipbookError::validation(
            "blend expects equal-length rgba8 buffers",
        ));
    }

    // Dispatch once per buffer; each arm monomorphizes its own kernel.
    match mode {
        BlendMode::Normal => {
            normal_over(dst, src, opacity);
        }
        BlendMode::Multiply => separable(dst, src, opacity, |s, d| s * d),
        BlendMode::Screen => separable(dst, src, opacity, |s, d| s + d - s * d),
        BlendMode::Overlay => separable(dst, src, opacity, |s, d| hard_light(d, s)),
        BlendMode::Darken => separable(dst, src, opacity, |s, d| s.min(d)),
        BlendMode::Lighten => separable(dst, src, opacity, |s, d| s.max(d)),
        BlendMode::ColorDodge => separable(dst, src, opacity, |s, d| {
            if d <= 0.0 {
                0.0
            } else if s >= 1.0 {
                1.0
            } else {
                (d / (1.0 - s)).min(1.0)
            }
        }),
        BlendMode::ColorBurn => separable(dst, src, opacity, |s, d| {
            if d >= 1.0 {
                1.0
            } else if s <= 0.0 {
                0.0
            } else {
                1.0 - ((1.0 - d) / s).min(1.0)
            }
        }),
        BlendMode::HardLight => separable(dst, src, opacity, hard_light),
        BlendMode::SoftLight => separable(dst, src, opacity, |s, d| {
            if s <= 0.5 {
                d - (1.0 - 2.0 * s) * d * (1.0 - d)
            } else {
                let g = if d <= 0.25 {
                    ((16.0 * d - 12.0) * d + 4.0) * d
                } else {
                    d.sqrt()
                };
                d + (2.0 * s - 1.0) * (g - d)
            }
        }),
        BlendMode::Difference => separable(dst, src, opacity, |s, d| (d - s).abs()),
        BlendMode::Exclusion => separable(dst, src, opacity, |s, d| d + s - 2.0 * d * s),
    }
    Ok(())
}

#[inline]
fn hard_light(s: f32, d: f32) -> f32 {
    if s <= 0.5 {
        2.0 * s * d
    } else {
        1.0 - 2.0 * (1.0 - s) * (1.0 - d)
    }
}

fn normal_over(dst: &mut [u8], src: &[u8], opacity: f32) {
    let op = opacity_to_u8(opacity);
    if op == 0 {
        return;
    }
    if op == 255 {
        for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
            over_pixel(d, s);
        }
        return;
    }
    for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        let sa = mul_div255_u8(u16::from(s[3]), op);
        if sa == 0 {
            continue;
        }
        let inv = 255u16 - u16::from(sa);
        d[3] = sa.saturating_add(mul_div255_u8(u16::from(d[3]), inv));
        for c in 0..3 {
            let sc = mul_div255_u8(u16::from(s[c]), op);
            d[c] = sc.saturating_add(mul_div255_u8(u16::from(d[c]), inv));
        }
    }
}

#[inline]
fn unpremul(p: f32, a: f32) -> f32 {
    if a > 0.0 { (p / a).clamp(0.0, 1.0) } else { 0.0 }
}

#[inline(always)]
fn separable<F>(dst: &mut [u8], src: &[u8], opacity: f32, blend_fn: F)
where
    F: Fn(f32, f32) -> f32,
{
    let opacity = opacity.clamp(0.0, 1.0);
    if opacity <= 0.0 {
        return;
    }

    for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        if s[3] == 0 {
            continue;
        }
        // out_a = sa + da * (1 - sa)
        // out_p = sp * (1 - da) + dp * (1 - sa) + B(sc, dc) * sa * da
        let sa = (f32::from(s[3]) / 255.0) * opacity;
        let da = f32::from(d[3]) / 255.0;
        let out_a = (sa + da * (1.0 - sa)).clamp(0.0, 1.0);

        for c in 0..3 {
            let sp = (f32::from(s[c]) / 255.0) * opacity;
            let dp = f32::from(d[c]) / 255.0;
            let b = blend_fn(unpremul(sp, sa), unpremul(dp, da)).clamp(0.0, 1.0);
            let out = (sp * (1.0 - da) + dp * (1.0 - sa) + b * sa * da).clamp(0.0, out_a);
            d[c] = (out * 255.0).round() as u8;
        }
        d[3] = (out_a * 255.0).round() as u8;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/composite/blend.rs"]
mod tests;
