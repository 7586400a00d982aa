use super::*;
use crate::foundation::core::CanvasSize;

const RED: Rgba8 = Rgba8::opaque(255, 0, 0);

fn canvas() -> Bitmap {
    Bitmap::blank(CanvasSize::new(64, 64).unwrap())
}

fn pen(width: f32) -> BrushStyle {
    BrushStyle {
        color: RED,
        width,
        erase: false,
    }
}

#[test]
fn filled_rectangle_covers_its_interior_only() {
    let mut bmp = canvas();
    draw_shape(
        &mut bmp,
        ShapeKind::Rectangle,
        Point::new(10.0, 10.0),
        Point::new(50.0, 50.0),
        pen(2.0),
        true,
    );
    assert_eq!(bmp.pixel(30, 30), Some(RED.to_premul()));
    assert_eq!(bmp.pixel(10, 10), Some(RED.to_premul()));
    assert_eq!(bmp.pixel(49, 49), Some(RED.to_premul()));
    assert_eq!(bmp.pixel(5, 5), Some([0, 0, 0, 0]));
    assert_eq!(bmp.pixel(50, 50), Some([0, 0, 0, 0]));
}

#[test]
fn outlined_rectangle_leaves_center_empty() {
    let mut bmp = canvas();
    draw_shape(
        &mut bmp,
        ShapeKind::Rectangle,
        Point::new(50.0, 50.0),
        Point::new(10.0, 10.0),
        pen(2.0),
        false,
    );
    assert_eq!(bmp.pixel(30, 30), Some([0, 0, 0, 0]));
    assert_eq!(bmp.pixel(30, 10).map(|p| p[3]), Some(255));
}

#[test]
fn ellipse_fill_hits_center_not_corner() {
    let mut bmp = canvas();
    draw_shape(
        &mut bmp,
        ShapeKind::Ellipse,
        Point::new(0.0, 0.0),
        Point::new(40.0, 40.0),
        pen(1.0),
        true,
    );
    assert_eq!(bmp.pixel(20, 20), Some(RED.to_premul()));
    assert_eq!(bmp.pixel(1, 1), Some([0, 0, 0, 0]));
}

#[test]
fn zero_length_stroke_leaves_a_dot() {
    let mut bmp = canvas();
    let p = Point::new(20.5, 20.5);
    stroke_segment(&mut bmp, p, p, pen(6.0));
    assert_eq!(bmp.pixel(20, 20), Some(RED.to_premul()));
    assert_eq!(bmp.pixel(30, 30), Some([0, 0, 0, 0]));

    let mut other = canvas();
    stroke_polyline(&mut other, &[p], pen(6.0));
    assert_eq!(other, bmp);
}

#[test]
fn eraser_removes_coverage() {
    let mut bmp = Bitmap::filled(CanvasSize::new(32, 32).unwrap(), RED);
    let style = BrushStyle {
        color: RED,
        width: 8.0,
        erase: true,
    };
    stroke_segment(&mut bmp, Point::new(0.0, 16.0), Point::new(32.0, 16.0), style);
    assert_eq!(bmp.pixel(16, 16), Some([0, 0, 0, 0]));
    assert_eq!(bmp.pixel(16, 2), Some(RED.to_premul()));
}
