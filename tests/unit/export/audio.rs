use super::*;

/// Returns one second of a constant level per track; paths named "broken" fail.
struct LevelDecoder;

impl AudioDecoder for LevelDecoder {
    fn decode(&self, path: &Path, sample_rate: u32) -> FlipbookResult<Vec<f32>> {
        if path.to_string_lossy().contains("broken") {
            return Err(FlipbookError::decode("unreadable"));
        }
        Ok(vec![0.25; sample_rate as usize * 2])
    }
}

fn track(samples: Vec<f32>, offset_ms: i64, volume: f32) -> DecodedTrack {
    DecodedTrack {
        offset_ms,
        volume,
        samples,
    }
}

#[test]
fn offsets_place_tracks_on_the_timeline() {
    // 10 ms = 480 stereo frames.
    let out = mix(&[track(vec![0.5; 20], 10, 1.0)], Duration::from_millis(20));
    assert_eq!(out.len(), 960 * 2);
    assert_eq!(out[479 * 2], 0.0);
    assert_eq!(out[480 * 2], 0.5);
    assert_eq!(out[489 * 2 + 1], 0.5);
    assert_eq!(out[490 * 2], 0.0);
}

#[test]
fn negative_offset_trims_the_head() {
    let mut samples = vec![0.0; 480 * 2];
    samples.extend([0.75, 0.75]);
    let out = mix(&[track(samples, -10, 1.0)], Duration::from_millis(1));
    assert_eq!(&out[..2], &[0.75, 0.75]);
}

#[test]
fn tracks_are_summed_scaled_and_clamped() {
    let a = track(vec![0.6; 4], 0, 1.0);
    let b = track(vec![0.6; 4], 0, 1.0);
    let quiet = track(vec![0.5; 4], 0, 0.5);
    let out = mix(&[a.clone(), b], Duration::from_millis(1));
    assert_eq!(out[0], 1.0);
    let out = mix(&[a, quiet], Duration::from_millis(1));
    assert!((out[0] - 0.85).abs() < 1e-6);
}

#[test]
fn mix_is_truncated_to_the_video() {
    let out = mix(&[track(vec![0.1; 48_000 * 2], 0, 1.0)], Duration::from_millis(500));
    assert_eq!(out.len(), 24_000 * 2);
    let late = mix(&[track(vec![0.1; 8], 2_000, 1.0)], Duration::from_millis(500));
    assert!(late.iter().all(|s| *s == 0.0));
}

#[test]
fn decode_skips_muted_and_broken_tracks() {
    let mut muted = AudioTrack::new("muted", "a.wav");
    muted.muted = true;
    let mut loud = AudioTrack::new("ok", "b.wav");
    loud.volume = 0.5;
    loud.offset_ms = 40;
    let broken = AudioTrack::new("broken", "broken.wav");

    let decoded = decode_tracks(&[muted, loud, broken], &LevelDecoder);
    assert_eq!(decoded.len(), 1);
    assert_eq!(decoded[0].offset_ms, 40);
    assert_eq!(decoded[0].volume, 0.5);
    assert_eq!(decoded[0].samples.len(), 96_000);
}

#[test]
fn staged_mix_is_removed_on_drop() {
    let tracks = [AudioTrack::new("ok", "b.wav")];
    let file = prepare_mix(&tracks, &LevelDecoder, Duration::from_millis(100))
        .unwrap()
        .unwrap();
    let path = file.path().to_path_buf();
    assert_eq!(std::fs::metadata(&path).unwrap().len(), 4_800 * 2 * 4);
    assert_eq!(file.input().sample_rate, MIX_SAMPLE_RATE);
    drop(file);
    assert!(!path.exists());
}

#[test]
fn nothing_is_staged_without_audible_tracks() {
    let mut muted = AudioTrack::new("muted", "a.wav");
    muted.muted = true;
    assert!(prepare_mix(&[muted], &LevelDecoder, Duration::from_secs(1)).unwrap().is_none());
    let broken = AudioTrack::new("broken", "broken.wav");
    assert!(prepare_mix(&[broken], &LevelDecoder, Duration::from_secs(1)).unwrap().is_none());
}

#[test]
fn raw_pcm_must_be_whole_samples() {
    assert_eq!(pcm_from_f32le(&1.5f32.to_le_bytes()).unwrap(), vec![1.5]);
    assert!(pcm_from_f32le(&[0, 0, 0]).is_err());
}
