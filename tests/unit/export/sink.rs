use super::*;
use crate::foundation::core::CanvasSize;

fn cfg() -> CaptureConfig {
    CaptureConfig {
        width: 4,
        height: 4,
        fps: 12,
        format: ExportFormat::WebM,
        bitrate: 2_500_000,
        audio: None,
    }
}

#[test]
fn formats_parse_from_names_and_codecs() {
    assert_eq!("WebM".parse::<ExportFormat>().unwrap(), ExportFormat::WebM);
    assert_eq!("h264".parse::<ExportFormat>().unwrap(), ExportFormat::Mp4);
    assert!("gif".parse::<ExportFormat>().is_err());
    assert_eq!(ExportFormat::Mp4.to_string(), "mp4");
    assert_eq!(ExportFormat::WebM.encoders(), ("libvpx-vp9", "libopus"));
}

#[test]
fn in_memory_sink_records_frames_in_order() {
    let mut sink = InMemorySink::new();
    let frame = Bitmap::blank(CanvasSize::new(4, 4).unwrap());
    assert!(sink.present(0, &frame, Duration::ZERO).is_err());

    sink.begin(cfg()).unwrap();
    sink.present(0, &frame, Duration::from_millis(83)).unwrap();
    sink.present(1, &frame, Duration::from_millis(83)).unwrap();
    sink.end().unwrap();

    assert!(sink.ended());
    assert!(!sink.aborted());
    let indices: Vec<_> = sink.frames().iter().map(|f| f.index).collect();
    assert_eq!(indices, vec![0, 1]);
}

#[test]
fn failing_sink_rejects_its_frame() {
    let mut sink = InMemorySink::failing_at(1);
    let frame = Bitmap::blank(CanvasSize::new(4, 4).unwrap());
    sink.begin(cfg()).unwrap();
    sink.present(0, &frame, Duration::ZERO).unwrap();
    assert!(matches!(
        sink.present(1, &frame, Duration::ZERO),
        Err(FlipbookError::Export(_))
    ));
    sink.abort();
    assert!(sink.aborted());
    assert!(sink.end().is_err());
}
