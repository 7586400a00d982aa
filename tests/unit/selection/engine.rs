use super::*;
use crate::foundation::core::{CanvasSize, Rgba8};

const INK: [u8; 4] = [0, 0, 0, 255];

fn inked_store() -> (LayerStore, FrameId, LayerId) {
    let mut store = LayerStore::new(CanvasSize::new(64, 64).unwrap());
    let frame = store.frames()[0].id;
    let layer = store.layers()[0].id;
    let mut bmp = Bitmap::blank(store.canvas_size());
    for y in 0..20 {
        for x in 0..20 {
            bmp.set_pixel(x, y, INK);
        }
    }
    store.set_bitmap(frame, layer, bmp).unwrap();
    (store, frame, layer)
}

#[test]
fn lift_move_commit_lands_at_the_destination_and_clears_the_source() {
    let (mut store, frame, layer) = inked_store();
    let mut engine = SelectionEngine::new(5.0);

    assert!(engine.lift(&mut store, frame, layer, Rect::new(0.0, 0.0, 20.0, 20.0)));
    assert!(store.get_bitmap(frame, layer).unwrap().is_blank());

    assert!(engine.move_by(Vec2::new(10.0, 10.0)));
    assert!(engine.commit(&mut store, layer));
    assert!(!engine.is_floating());

    let out = store.get_bitmap(frame, layer).unwrap();
    for (x, y) in [(10, 10), (29, 29), (20, 15), (15, 25)] {
        assert_eq!(out.pixel(x, y), Some(INK), "({x},{y})");
    }
    for (x, y) in [(0, 0), (5, 5), (9, 9), (30, 30), (9, 20)] {
        assert_eq!(out.pixel(x, y), Some([0, 0, 0, 0]), "({x},{y})");
    }
}

#[test]
fn too_small_marquee_produces_nothing() {
    let (mut store, frame, layer) = inked_store();
    let mut engine = SelectionEngine::new(5.0);
    assert!(!engine.lift(&mut store, frame, layer, Rect::new(0.0, 0.0, 4.0, 30.0)));
    assert!(!engine.is_floating());
    assert_eq!(store.get_bitmap(frame, layer).unwrap().pixel(1, 1), Some(INK));
}

#[test]
fn locked_or_hidden_layers_reject_lift_and_commit() {
    let (mut store, frame, layer) = inked_store();
    let mut engine = SelectionEngine::new(5.0);
    store.set_layer_locked(layer, true);
    assert!(!engine.lift(&mut store, frame, layer, Rect::new(0.0, 0.0, 10.0, 10.0)));
    store.set_layer_locked(layer, false);

    assert!(engine.lift(&mut store, frame, layer, Rect::new(0.0, 0.0, 10.0, 10.0)));
    store.set_layer_visible(layer, false);
    assert!(!engine.commit(&mut store, layer));
    assert!(engine.is_floating());

    engine.settle(&mut store, layer);
    assert!(!engine.is_floating());
    assert_eq!(store.get_bitmap(frame, layer).unwrap().pixel(1, 1), Some([0, 0, 0, 0]));
}

#[test]
fn operations_without_a_selection_are_rejected() {
    let (mut store, _, layer) = inked_store();
    let mut engine = SelectionEngine::new(5.0);
    assert!(!engine.move_by(Vec2::new(1.0, 1.0)));
    assert!(!engine.resize(Handle::TopLeft, Vec2::new(1.0, 1.0)));
    assert!(!engine.rotate());
    assert!(!engine.flip(FlipAxis::Vertical));
    assert!(!engine.commit(&mut store, layer));
    assert!(!engine.discard());
    assert_eq!(engine.hit_test(Point::new(1.0, 1.0), 4.0), SelectionHit::Outside);
}

#[test]
fn new_lift_commits_the_pending_selection_first() {
    let (mut store, frame, layer) = inked_store();
    let mut engine = SelectionEngine::new(5.0);
    assert!(engine.lift(&mut store, frame, layer, Rect::new(0.0, 0.0, 10.0, 10.0)));
    engine.move_by(Vec2::new(40.0, 40.0));
    assert!(engine.lift(&mut store, frame, layer, Rect::new(10.0, 10.0, 20.0, 20.0)));

    let out = store.get_bitmap(frame, layer).unwrap();
    assert_eq!(out.pixel(45, 45), Some(INK));
    assert_eq!(out.pixel(15, 15), Some([0, 0, 0, 0]));
    assert_eq!(engine.selection().unwrap().bounds(), Rect::new(10.0, 10.0, 20.0, 20.0));
}

#[test]
fn marquee_is_clipped_to_the_canvas() {
    let (mut store, frame, layer) = inked_store();
    let mut engine = SelectionEngine::new(5.0);
    assert!(engine.lift(&mut store, frame, layer, Rect::new(-10.0, -10.0, 8.0, 6.0)));
    let sel = engine.selection().unwrap();
    assert_eq!(sel.bounds(), Rect::new(0.0, 0.0, 8.0, 6.0));
    assert_eq!(sel.bitmap().width(), 8);
}

#[test]
fn hit_test_prefers_handles_over_body() {
    let (mut store, frame, layer) = inked_store();
    let mut engine = SelectionEngine::new(5.0);
    engine.lift(&mut store, frame, layer, Rect::new(10.0, 10.0, 30.0, 30.0));
    assert_eq!(
        engine.hit_test(Point::new(11.0, 11.0), 4.0),
        SelectionHit::Handle(Handle::TopLeft)
    );
    assert_eq!(engine.hit_test(Point::new(20.0, 20.0), 4.0), SelectionHit::Body);
    assert_eq!(engine.hit_test(Point::new(50.0, 50.0), 4.0), SelectionHit::Outside);
}

#[test]
fn placed_bitmap_does_not_touch_the_layer_until_commit() {
    let mut store = LayerStore::new(CanvasSize::new(32, 32).unwrap());
    let frame = store.frames()[0].id;
    let layer = store.layers()[0].id;
    let mut engine = SelectionEngine::new(5.0);
    let stamp = Bitmap::filled(CanvasSize::new(6, 6).unwrap(), Rgba8::BLACK);
    assert!(engine.place(&mut store, frame, layer, stamp, Point::new(3.0, 4.0)));
    assert!(store.get_bitmap(frame, layer).unwrap().is_blank());
    assert!(engine.commit(&mut store, layer));
    assert_eq!(store.get_bitmap(frame, layer).unwrap().pixel(3, 4), Some(INK));
}

#[test]
fn commit_targets_the_layer_named_at_commit_time() {
    let (mut store, frame, bottom) = inked_store();
    let top = store.create_layer(Some(bottom)).id;
    let mut engine = SelectionEngine::new(5.0);
    assert!(engine.lift(&mut store, frame, bottom, Rect::new(0.0, 0.0, 20.0, 20.0)));
    assert_eq!(engine.frame(), Some(frame));

    assert!(engine.commit(&mut store, top));
    assert_eq!(store.get_bitmap(frame, top).unwrap().pixel(5, 5), Some(INK));
    assert!(store.get_bitmap(frame, bottom).unwrap().is_blank());
}

#[test]
fn commit_onto_a_locked_layer_keeps_the_selection_floating() {
    let (mut store, frame, bottom) = inked_store();
    let top = store.create_layer(Some(bottom)).id;
    let mut engine = SelectionEngine::new(5.0);
    assert!(engine.lift(&mut store, frame, bottom, Rect::new(0.0, 0.0, 20.0, 20.0)));

    store.set_layer_locked(top, true);
    assert!(!engine.commit(&mut store, top));
    assert!(engine.is_floating());
    assert!(store.get_bitmap(frame, top).unwrap().is_blank());
}
