use super::*;
use crate::export::ffmpeg::FixedProbe;
use crate::export::sink::InMemorySink;
use crate::foundation::core::CanvasSize;
use std::path::Path;

struct SilenceDecoder;

impl AudioDecoder for SilenceDecoder {
    fn decode(&self, _path: &Path, sample_rate: u32) -> FlipbookResult<Vec<f32>> {
        Ok(vec![0.0; sample_rate as usize])
    }
}

fn immediate() -> ExportOpts {
    ExportOpts {
        pacing: Pacing::Immediate,
        ..ExportOpts::default()
    }
}

fn two_frame_store() -> LayerStore {
    let mut store = LayerStore::new(CanvasSize::new(4, 4).unwrap());
    let layer = store.layers()[0].id;
    let first = store.frames()[0].id;
    let mut ink = Bitmap::blank(store.canvas_size());
    ink.set_pixel(0, 0, [0, 0, 0, 255]);
    store.set_bitmap(first, layer, ink).unwrap();
    store.add_frame(Some(0));
    store
}

#[test]
fn every_frame_is_presented_in_order_with_progress() {
    let store = two_frame_store();
    let probe = FixedProbe(vec![ExportFormat::WebM]);
    let exporter = Exporter::new(immediate()).with_probe(&probe);
    let mut sink = InMemorySink::new();
    let mut seen = Vec::new();

    let report = exporter
        .run(&store, 10, &[], &mut sink, |p| seen.push(p))
        .unwrap();

    assert_eq!(report.format, ExportFormat::WebM);
    assert_eq!(report.frames, 2);
    assert_eq!(report.duration, Duration::from_millis(200));
    assert!(!report.audio);
    assert_eq!(seen, vec![50, 100]);
    assert!(sink.ended());

    let frames = sink.frames();
    assert_eq!(frames.len(), 2);
    assert_eq!(frames[0].hold, Duration::from_millis(100));
    assert_eq!(frames[0].bitmap.pixel(0, 0), Some([0, 0, 0, 255]));
    // Empty pixels show the white document background.
    assert_eq!(frames[0].bitmap.pixel(3, 3), Some([255, 255, 255, 255]));
    assert_eq!(frames[1].bitmap.pixel(0, 0), Some([255, 255, 255, 255]));
}

#[test]
fn configured_background_replaces_white() {
    let store = two_frame_store();
    let probe = FixedProbe(vec![ExportFormat::Mp4]);
    let opts = ExportOpts {
        background: Some(Rgba8::opaque(0, 0, 255)),
        ..immediate()
    };
    let mut sink = InMemorySink::new();
    Exporter::new(opts)
        .with_probe(&probe)
        .run(&store, 10, &[], &mut sink, |_| {})
        .unwrap();
    assert_eq!(sink.frames()[1].bitmap.pixel(2, 2), Some([0, 0, 255, 255]));
}

#[test]
fn unsupported_format_fails_before_the_sink_starts() {
    let store = two_frame_store();
    let probe = FixedProbe(Vec::new());
    let mut sink = InMemorySink::new();
    let err = Exporter::new(immediate())
        .with_probe(&probe)
        .run(&store, 10, &[], &mut sink, |_| {})
        .unwrap_err();
    assert!(matches!(err, FlipbookError::Unsupported(_)));
    assert!(sink.config().is_none());
    assert!(!sink.aborted());
}

#[test]
fn falls_back_to_the_next_preferred_format() {
    let probe = FixedProbe(vec![ExportFormat::Mp4]);
    assert_eq!(
        negotiate_format(&ExportFormat::PREFERRED, &probe, false).unwrap(),
        ExportFormat::Mp4
    );
}

#[test]
fn failure_mid_export_aborts_the_sink_and_removes_the_mix() {
    let store = two_frame_store();
    let probe = FixedProbe(vec![ExportFormat::WebM]);
    let tracks = [AudioTrack::new("music", "music.ogg")];
    let mut sink = InMemorySink::failing_at(1);
    let mut seen = Vec::new();

    let err = Exporter::new(immediate())
        .with_probe(&probe)
        .with_decoder(&SilenceDecoder)
        .run(&store, 10, &tracks, &mut sink, |p| seen.push(p))
        .unwrap_err();

    assert!(matches!(err, FlipbookError::Export(_)));
    assert!(sink.aborted());
    assert!(!sink.ended());
    assert_eq!(seen, vec![50]);
    let audio = sink.config().and_then(|c| c.audio.clone()).unwrap();
    assert!(!audio.path.exists());
}

#[test]
fn audio_is_attached_only_when_enabled_and_audible() {
    let store = two_frame_store();
    let probe = FixedProbe(vec![ExportFormat::WebM]);
    let tracks = [AudioTrack::new("music", "music.ogg")];

    let mut sink = InMemorySink::new();
    let report = Exporter::new(immediate())
        .with_probe(&probe)
        .with_decoder(&SilenceDecoder)
        .run(&store, 10, &tracks, &mut sink, |_| {})
        .unwrap();
    assert!(report.audio);
    let audio = sink.config().and_then(|c| c.audio.clone()).unwrap();
    assert_eq!(audio.sample_rate, 48_000);
    assert!(!audio.path.exists());

    let mut sink = InMemorySink::new();
    let opts = ExportOpts {
        audio: false,
        ..immediate()
    };
    let report = Exporter::new(opts)
        .with_probe(&probe)
        .with_decoder(&SilenceDecoder)
        .run(&store, 10, &tracks, &mut sink, |_| {})
        .unwrap();
    assert!(!report.audio);
    assert!(sink.config().unwrap().audio.is_none());
}

#[test]
fn real_time_pacing_holds_each_frame() {
    let store = two_frame_store();
    let probe = FixedProbe(vec![ExportFormat::WebM]);
    let mut sink = InMemorySink::new();
    let started = Instant::now();
    Exporter::new(ExportOpts::default())
        .with_probe(&probe)
        .run(&store, 25, &[], &mut sink, |_| {})
        .unwrap();
    assert!(started.elapsed() >= Duration::from_millis(75));
}

#[test]
fn zero_fps_is_rejected() {
    let store = two_frame_store();
    let probe = FixedProbe(vec![ExportFormat::WebM]);
    let mut sink = InMemorySink::new();
    assert!(matches!(
        Exporter::new(immediate())
            .with_probe(&probe)
            .run(&store, 0, &[], &mut sink, |_| {}),
        Err(FlipbookError::Validation(_))
    ));
}
