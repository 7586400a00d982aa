use super::*;

fn size(w: u32, h: u32) -> CanvasSize {
    CanvasSize::new(w, h).unwrap()
}

#[test]
fn new_bitmap_is_transparent() {
    let bmp = Bitmap::new(3, 2).unwrap();
    assert_eq!(bmp.data().len(), 3 * 2 * 4);
    assert!(bmp.is_blank());
    assert!(Bitmap::new(0, 2).is_err());
}

#[test]
fn from_premul_rejects_wrong_length() {
    assert!(Bitmap::from_premul_rgba8(2, 2, vec![0; 15]).is_err());
    assert!(Bitmap::from_premul_rgba8(2, 2, vec![0; 16]).is_ok());
}

#[test]
fn pixel_access_is_bounds_checked() {
    let mut bmp = Bitmap::blank(size(2, 2));
    assert!(bmp.set_pixel(1, 1, [1, 2, 3, 255]));
    assert!(!bmp.set_pixel(2, 0, [1, 2, 3, 255]));
    assert_eq!(bmp.pixel(1, 1), Some([1, 2, 3, 255]));
    assert_eq!(bmp.pixel(0, 2), None);
}

#[test]
fn extract_and_clear_regions() {
    let mut bmp = Bitmap::filled(size(6, 6), Rgba8::opaque(200, 0, 0));
    let rect = PixelRect {
        x: 1,
        y: 2,
        width: 3,
        height: 2,
    };
    let piece = bmp.extract(rect).unwrap();
    assert_eq!((piece.width(), piece.height()), (3, 2));
    assert!(piece.data().chunks_exact(4).all(|p| p == [200, 0, 0, 255]));

    bmp.clear_rect(rect);
    assert_eq!(bmp.pixel(1, 2), Some([0, 0, 0, 0]));
    assert_eq!(bmp.pixel(3, 3), Some([0, 0, 0, 0]));
    assert_eq!(bmp.pixel(4, 2), Some([200, 0, 0, 255]));
    assert_eq!(bmp.pixel(1, 4), Some([200, 0, 0, 255]));
}

#[test]
fn clamped_rect_snaps_and_intersects() {
    let r = PixelRect::from_rect_clamped(Rect::new(-5.0, 2.4, 3.6, 20.0), size(10, 10)).unwrap();
    assert_eq!(
        r,
        PixelRect {
            x: 0,
            y: 2,
            width: 4,
            height: 8
        }
    );
    assert!(PixelRect::from_rect_clamped(Rect::new(11.0, 0.0, 20.0, 5.0), size(10, 10)).is_none());
}

#[test]
fn resize_canvas_keeps_top_left() {
    let mut bmp = Bitmap::blank(size(2, 2));
    bmp.set_pixel(0, 0, [9, 9, 9, 255]);
    bmp.set_pixel(1, 1, [7, 7, 7, 255]);
    let grown = bmp.resize_canvas(size(3, 3));
    assert_eq!(grown.pixel(0, 0), Some([9, 9, 9, 255]));
    assert_eq!(grown.pixel(1, 1), Some([7, 7, 7, 255]));
    assert_eq!(grown.pixel(2, 2), Some([0, 0, 0, 0]));
    let shrunk = bmp.resize_canvas(size(1, 1));
    assert_eq!(shrunk.pixel(0, 0), Some([9, 9, 9, 255]));
}

#[test]
fn png_roundtrip_preserves_opaque_pixels() {
    let mut bmp = Bitmap::blank(size(4, 4));
    bmp.set_pixel(2, 3, Rgba8::opaque(10, 20, 30).to_premul());
    let png = bmp.encode_png().unwrap();
    let back = Bitmap::decode(&png).unwrap();
    assert_eq!(back, bmp);
}

#[test]
fn decode_garbage_is_a_decode_error() {
    let err = Bitmap::decode(b"definitely not an image").unwrap_err();
    assert!(matches!(err, FlipbookError::Decode(_)));
}

#[test]
fn thumbnail_caps_longest_edge() {
    let bmp = Bitmap::filled(size(200, 100), Rgba8::WHITE);
    let thumb = bmp.thumbnail(50);
    assert_eq!((thumb.width(), thumb.height()), (50, 25));
    assert_eq!(thumb.pixel(10, 10), Some([255, 255, 255, 255]));
}
