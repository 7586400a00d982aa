use super::*;
use crate::foundation::core::{CanvasSize, Rgba8};

const GRAY: [u8; 4] = [128, 128, 128, 255];
const WHITE: [u8; 4] = [255, 255, 255, 255];
const BLACK: [u8; 4] = [0, 0, 0, 255];

#[test]
fn normal_opaque_source_replaces_backdrop() {
    assert_eq!(
        blend_pixel(WHITE, [10, 20, 30, 255], BlendMode::Normal, 1.0),
        [10, 20, 30, 255]
    );
}

#[test]
fn zero_opacity_and_transparent_source_are_noops() {
    for &mode in BlendMode::all() {
        assert_eq!(blend_pixel(GRAY, BLACK, mode, 0.0), GRAY, "{mode:?}");
        assert_eq!(blend_pixel(GRAY, [0, 0, 0, 0], mode, 1.0), GRAY, "{mode:?}");
    }
}

#[test]
fn separable_modes_match_reference_values_on_opaque_pixels() {
    assert_eq!(blend_pixel(GRAY, GRAY, BlendMode::Multiply, 1.0), [64, 64, 64, 255]);
    assert_eq!(blend_pixel(GRAY, GRAY, BlendMode::Screen, 1.0), [192, 192, 192, 255]);
    assert_eq!(blend_pixel(WHITE, GRAY, BlendMode::Difference, 1.0), [127, 127, 127, 255]);
    assert_eq!(blend_pixel(GRAY, BLACK, BlendMode::Darken, 1.0), BLACK);
    assert_eq!(blend_pixel(GRAY, BLACK, BlendMode::Lighten, 1.0), GRAY);
    assert_eq!(blend_pixel(WHITE, WHITE, BlendMode::Exclusion, 1.0), BLACK);
    assert_eq!(blend_pixel(BLACK, WHITE, BlendMode::ColorDodge, 1.0), BLACK);
    assert_eq!(blend_pixel(WHITE, BLACK, BlendMode::ColorBurn, 1.0), WHITE);
}

#[test]
fn blend_over_transparent_backdrop_keeps_source_for_every_mode() {
    let src = [200, 100, 50, 255];
    for &mode in BlendMode::all() {
        assert_eq!(blend_pixel([0, 0, 0, 0], src, mode, 1.0), src, "{mode:?}");
    }
}

#[test]
fn half_opacity_normal_mixes_toward_source() {
    let out = blend_pixel(BLACK, WHITE, BlendMode::Normal, 0.5);
    assert!((127..=129).contains(&out[0]));
    assert_eq!(out[3], 255);
}

#[test]
fn buffer_blend_is_pure() {
    let size = CanvasSize::new(4, 4).unwrap();
    let backdrop = Bitmap::filled(size, Rgba8::opaque(128, 128, 128));
    let source = Bitmap::filled(size, Rgba8::opaque(128, 128, 128));
    let a = blend(&backdrop, &source, BlendMode::Multiply, 1.0).unwrap();
    let b = blend(&backdrop, &source, BlendMode::Multiply, 1.0).unwrap();
    assert_eq!(a, b);
    assert_eq!(backdrop.pixel(0, 0), Some(GRAY));
    assert_eq!(a.pixel(3, 3), Some([64, 64, 64, 255]));
}

#[test]
fn mismatched_buffers_are_rejected() {
    let mut dst = vec![0u8; 8];
    let err = blend_in_place(&mut dst, &[0u8; 4], BlendMode::Normal, 1.0).unwrap_err();
    assert!(matches!(err, FlipbookError::Validation(_)));
}

#[test]
fn over_pixel_composites_premultiplied() {
    let mut d = [0, 0, 255, 255];
    over_pixel(&mut d, &[128, 0, 0, 128]);
    assert_eq!(d, [128, 0, 127, 255]);
}
