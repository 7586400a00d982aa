use super::*;

fn store() -> LayerStore {
    LayerStore::new(CanvasSize::new(16, 16).unwrap())
}

fn every_frame_has_every_layer(s: &LayerStore) -> bool {
    s.frames()
        .iter()
        .all(|f| s.layers().iter().all(|l| f.has_layer(l.id)))
}

#[test]
fn new_layers_are_backfilled_blank_on_every_frame() {
    let mut s = store();
    s.add_frame(None);
    s.add_frame(Some(0));
    let base = s.layers()[0].id;
    let layer = s.create_layer(Some(base));
    assert_eq!(s.layer_index(layer.id), Some(1));
    assert!(every_frame_has_every_layer(&s));
    for f in s.frames() {
        assert!(s.get_bitmap(f.id, layer.id).unwrap().is_blank());
    }
}

#[test]
fn last_layer_and_last_frame_cannot_be_removed() {
    let mut s = store();
    let only = s.layers()[0].id;
    assert!(!s.remove_layer(only));
    let frame = s.frames()[0].id;
    assert!(!s.remove_frame(frame));

    let extra = s.create_layer(None);
    assert!(s.remove_layer(only));
    assert_eq!(s.layers().len(), 1);
    assert_eq!(s.layers()[0].id, extra.id);
    assert!(s.frames()[0].cell(only).is_none());
}

#[test]
fn set_bitmap_invalidates_the_frame_thumbnail() {
    let mut s = store();
    let frame = s.frames()[0].id;
    let layer = s.layers()[0].id;
    let before = s.thumbnail(frame, 8).unwrap();
    assert_eq!(before.pixel(0, 0), Some([255, 255, 255, 255]));
    assert!(s.frames()[0].cached_thumbnail().is_some());

    let red = Bitmap::filled(s.canvas_size(), Rgba8::opaque(255, 0, 0));
    s.set_bitmap(frame, layer, red).unwrap();
    assert!(s.frames()[0].cached_thumbnail().is_none());
    let after = s.thumbnail(frame, 8).unwrap();
    assert_eq!(after.pixel(0, 0), Some([255, 0, 0, 255]));
}

#[test]
fn thumbnail_cache_is_rebuilt_for_a_different_edge() {
    let mut s = store();
    let frame = s.frames()[0].id;
    let small = s.thumbnail(frame, 4).unwrap();
    assert_eq!((small.width(), small.height()), (4, 4));
    assert!(Arc::ptr_eq(&small, &s.thumbnail(frame, 4).unwrap()));

    let larger = s.thumbnail(frame, 8).unwrap();
    assert_eq!((larger.width(), larger.height()), (8, 8));

    let full = s.thumbnail(frame, 160).unwrap();
    assert_eq!((full.width(), full.height()), (16, 16));
    assert!(Arc::ptr_eq(&full, &s.thumbnail(frame, 64).unwrap()));
}

#[test]
fn set_bitmap_rejects_wrong_size_and_unknown_ids() {
    let mut s = store();
    let frame = s.frames()[0].id;
    let layer = s.layers()[0].id;
    let small = Bitmap::new(4, 4).unwrap();
    assert!(s.set_bitmap(frame, layer, small).is_err());
    let ok = Bitmap::blank(s.canvas_size());
    assert!(s.set_bitmap(FrameId::new(), layer, ok.clone()).is_err());
    assert!(s.set_bitmap(frame, LayerId::new(), ok).is_err());
}

#[test]
fn drawing_session_holds_an_exclusive_lease() {
    let mut s = store();
    let frame = s.frames()[0].id;
    let layer = s.layers()[0].id;

    let mut session = s.begin_drawing(frame, layer).unwrap();
    assert!(s.is_drawing());
    assert!(s.begin_drawing(frame, layer).is_none());
    assert!(s.set_bitmap(frame, layer, Bitmap::blank(s.canvas_size())).is_err());

    session.surface_mut().set_pixel(2, 2, [0, 0, 0, 255]);
    assert!(s.get_bitmap(frame, layer).unwrap().is_blank());
    assert!(s.finish_drawing(session));
    assert!(!s.is_drawing());
    assert_eq!(s.get_bitmap(frame, layer).unwrap().pixel(2, 2), Some([0, 0, 0, 255]));
}

#[test]
fn cancelled_drawing_session_writes_nothing() {
    let mut s = store();
    let frame = s.frames()[0].id;
    let layer = s.layers()[0].id;
    let mut session = s.begin_drawing(frame, layer).unwrap();
    session.surface_mut().fill(Rgba8::BLACK);
    session.restore_base();
    assert!(session.surface().is_blank());
    session.surface_mut().fill(Rgba8::BLACK);
    s.cancel_drawing(session);
    assert!(!s.is_drawing());
    assert!(s.get_bitmap(frame, layer).unwrap().is_blank());
}

#[test]
fn locked_or_hidden_layers_cannot_be_drawn_on() {
    let mut s = store();
    let frame = s.frames()[0].id;
    let layer = s.layers()[0].id;
    s.set_layer_locked(layer, true);
    assert!(s.begin_drawing(frame, layer).is_none());
    s.set_layer_locked(layer, false);
    s.set_layer_visible(layer, false);
    assert!(s.begin_drawing(frame, layer).is_none());
}

#[test]
fn layer_setters_clamp_and_reorder() {
    let mut s = store();
    let a = s.layers()[0].id;
    let b = s.create_layer(None).id;
    assert!(s.set_layer_opacity(a, 3.0));
    assert_eq!(s.layer(a).unwrap().opacity, 1.0);
    assert!(s.set_layer_opacity(a, -1.0));
    assert_eq!(s.layer(a).unwrap().opacity, 0.0);
    assert!(s.set_layer_blend_mode(b, BlendMode::Multiply));
    assert!(s.rename_layer(b, "Ink"));
    assert_eq!(s.layer(b).unwrap().name, "Ink");

    assert!(s.move_layer(b, 0));
    assert_eq!(s.layer_index(b), Some(0));
    assert!(!s.move_layer(b, 0));
    assert!(!s.set_layer_visible(LayerId::new(), false));
}

#[test]
fn frame_crud_keeps_order() {
    let mut s = store();
    let first = s.frames()[0].id;
    let layer = s.layers()[0].id;
    s.set_bitmap(first, layer, Bitmap::filled(s.canvas_size(), Rgba8::BLACK))
        .unwrap();

    let dup = s.duplicate_frame(first).unwrap();
    assert_eq!(s.frame_index(dup), Some(1));
    assert_eq!(
        s.get_bitmap(dup, layer).unwrap().pixel(0, 0),
        Some([0, 0, 0, 255])
    );

    let blank = s.add_frame(Some(0));
    assert_eq!(s.frame_index(blank), Some(1));
    assert!(s.move_frame(blank, 5));
    assert_eq!(s.frame_index(blank), Some(2));
    assert!(s.remove_frame(dup));
    assert_eq!(s.frames().len(), 2);
    assert!(every_frame_has_every_layer(&s));
}

#[test]
fn canvas_resize_crops_from_the_top_left() {
    let mut s = store();
    let frame = s.frames()[0].id;
    let layer = s.layers()[0].id;
    let mut bmp = Bitmap::blank(s.canvas_size());
    bmp.set_pixel(3, 3, [0, 0, 0, 255]);
    bmp.set_pixel(12, 12, [0, 0, 0, 255]);
    s.set_bitmap(frame, layer, bmp).unwrap();

    let small = CanvasSize::new(8, 8).unwrap();
    assert!(s.resize_canvas(small));
    let out = s.get_bitmap(frame, layer).unwrap();
    assert_eq!(out.size(), small);
    assert_eq!(out.pixel(3, 3), Some([0, 0, 0, 255]));
    assert!(!s.resize_canvas(small));
}

#[test]
fn snapshot_restore_round_trips_layers_and_frames() {
    let mut s = store();
    let snap = s.snapshot();
    s.create_layer(None);
    s.add_frame(None);
    s.restore(&snap);
    assert_eq!(s.layers().len(), 1);
    assert_eq!(s.frames().len(), 1);
    assert!(every_frame_has_every_layer(&s));
}

#[test]
fn from_parts_backfills_and_validates() {
    let size = CanvasSize::new(4, 4).unwrap();
    let layer = Layer::new("a");
    let s = LayerStore::from_parts(size, vec![layer.clone()], vec![Frame::new()], None).unwrap();
    assert!(every_frame_has_every_layer(&s));
    assert!(LayerStore::from_parts(size, Vec::new(), vec![Frame::new()], None).is_err());
    assert!(LayerStore::from_parts(size, vec![layer], Vec::new(), None).is_err());
}

#[test]
fn onion_skin_uses_neighbours_only() {
    let mut s = store();
    let first = s.frames()[0].id;
    let layer = s.layers()[0].id;
    s.set_bitmap(first, layer, Bitmap::filled(s.canvas_size(), Rgba8::BLACK))
        .unwrap();
    let second = s.add_frame(None);
    let skin = s.onion_skin(second, 0.5).unwrap();
    assert!(!skin.is_blank());
    let own = s.onion_skin(first, 0.5).unwrap();
    assert!(own.is_blank());
}
