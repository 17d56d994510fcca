mod common;

use ambient_mixer::library::TrackIndex;
use ambient_mixer::{
    AmbientError, CycleOutcome, MemorySink, ParameterStore, Renderer, SoundChangeFailurePolicy,
};
use common::{config, data_size_offset, storage, wav_bytes};
use std::sync::Arc;

fn renderer(
    config: &ambient_mixer::EngineConfig,
    storage: ambient_mixer::MemoryStorage,
) -> Renderer<ambient_mixer::MemoryStorage> {
    let params = Arc::new(ParameterStore::from_config(config));
    Renderer::new(config, storage, params).unwrap()
}

#[test]
fn test_three_short_tracks_wrap_together() {
    // 512 samples = 1024 payload bytes per track
    let cfg = config(&[
        ("Water", &["w.wav"]),
        ("Air", &["a.wav"]),
        ("Life", &["l.wav"]),
    ]);
    let files = storage(&[
        ("w.wav", wav_bytes(&[100; 512])),
        ("a.wav", wav_bytes(&[200; 512])),
        ("l.wav", wav_bytes(&[300; 512])),
    ]);
    let mut r = renderer(&cfg, files);
    let mut sink = MemorySink::new();

    assert_eq!(
        r.render_cycle(&mut sink).unwrap(),
        CycleOutcome::Rendered { frames: 256 }
    );
    for i in 0..3 {
        let t = TrackIndex::new(i);
        assert_eq!(r.cursor(t), r.payload_start(t));
    }
}

#[test]
fn test_loop_resumes_at_payload_start() {
    let mut cfg = config(&[("Water", &["w.wav"])]);
    cfg.render.block_samples = 128;
    let mut r = renderer(&cfg, storage(&[("w.wav", wav_bytes(&[1; 1024]))]));
    let t = TrackIndex::new(0);
    let start = r.payload_start(t).unwrap();
    let mut sink = MemorySink::new();

    // 2048 - 512 = 1536 bytes = 6 blocks of 256 bytes
    for cycle in 1..6 {
        r.render_cycle(&mut sink).unwrap();
        assert_eq!(r.cursor(t), Some(start + cycle * 256));
    }
    r.render_cycle(&mut sink).unwrap();
    assert_eq!(r.cursor(t), Some(start));
    assert_eq!(sink.frames().len(), 6 * 128);
}

#[test]
fn test_full_scale_sum_clips_to_bounds() {
    let cfg = config(&[("A", &["hi.wav"]), ("B", &["hi.wav"]), ("C", &["hi.wav"])]);
    let mut r = renderer(&cfg, storage(&[("hi.wav", wav_bytes(&[i16::MAX; 4096]))]));
    let mut sink = MemorySink::new();
    for _ in 0..4 {
        r.render_cycle(&mut sink).unwrap();
    }
    let tail = &sink.frames()[sink.frames().len() - 256..];
    assert!(tail.iter().all(|f| *f == [i16::MAX, i16::MAX]));

    let mut r = renderer(&cfg, storage(&[("hi.wav", wav_bytes(&[i16::MIN; 4096]))]));
    let mut sink = MemorySink::new();
    for _ in 0..4 {
        r.render_cycle(&mut sink).unwrap();
    }
    let tail = &sink.frames()[sink.frames().len() - 256..];
    assert!(tail.iter().all(|f| *f == [i16::MIN, i16::MIN]));
}

#[test]
fn test_truncated_track_gates_every_track() {
    let mut short = wav_bytes(&[50; 100]);
    let at = data_size_offset(&short);
    short[at..at + 4].copy_from_slice(&8192u32.to_le_bytes());

    let cfg = config(&[("A", &["long.wav"]), ("B", &["short.wav"])]);
    let mut r = renderer(
        &cfg,
        storage(&[("long.wav", wav_bytes(&[10; 8192])), ("short.wav", short)]),
    );
    let mut sink = MemorySink::new();

    assert_eq!(
        r.render_cycle(&mut sink).unwrap(),
        CycleOutcome::Rendered { frames: 100 }
    );
    let cursors: Vec<_> = (0..2).map(|i| r.cursor(TrackIndex::new(i))).collect();
    for _ in 0..3 {
        assert_eq!(r.render_cycle(&mut sink).unwrap(), CycleOutcome::Skipped);
    }
    assert_eq!(sink.frames().len(), 100);
    let after: Vec<_> = (0..2).map(|i| r.cursor(TrackIndex::new(i))).collect();
    assert_eq!(cursors, after);
}

#[test]
fn test_failed_change_with_keep_previous() {
    let mut cfg = config(&[("A", &["a.wav", "missing.wav"])]);
    cfg.render.failure_policy = SoundChangeFailurePolicy::KeepPrevious;
    let mut r = renderer(&cfg, storage(&[("a.wav", wav_bytes(&[10; 4096]))]));
    let t = TrackIndex::new(0);
    let lib = ambient_mixer::SoundLibrary::new("A", vec!["a.wav".into(), "missing.wav".into()])
        .unwrap();

    r.params().request_sound_change(t, lib.index(1).unwrap());
    let mut sink = MemorySink::new();
    assert_eq!(
        r.render_cycle(&mut sink).unwrap(),
        CycleOutcome::Rendered { frames: 256 }
    );
    assert_eq!(r.current_sound(t), Some("a.wav"));
    assert_eq!(r.params().selected_sound(t), 0);
    assert_eq!(r.params().pending_sound_change(t), None);
}

#[test]
fn test_stereo_initial_sound_rejected() {
    let mut stereo = std::io::Cursor::new(Vec::new());
    {
        let spec = hound::WavSpec {
            channels: 2,
            ..common::mono_spec()
        };
        let mut w = hound::WavWriter::new(&mut stereo, spec).unwrap();
        for _ in 0..32 {
            w.write_sample(0i16).unwrap();
        }
        w.finalize().unwrap();
    }
    let cfg = config(&[("A", &["s.wav"])]);
    let params = Arc::new(ParameterStore::from_config(&cfg));
    let result = Renderer::new(&cfg, storage(&[("s.wav", stereo.into_inner())]), params);
    assert!(matches!(result, Err(AmbientError::UnsupportedFormat(_))));
}
