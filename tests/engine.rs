//! End-to-end scenarios through the public engine API.

use std::io::Cursor;

use wavecraft::engine::FALLBACK_MODE;
use wavecraft::render::surface::DrawCommand;
use wavecraft::tunnel::{GpuProvider, SoftwareProvider, UnavailableProvider};
use wavecraft::{EngineConfig, EngineController, RenderModeId};

const SAMPLE_RATE: u32 = 8000;

fn wav(seconds: f32, frequency: f32, amplitude: f32) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut buf = Vec::new();
    {
        let mut writer = hound::WavWriter::new(Cursor::new(&mut buf), spec).unwrap();
        for i in 0..(seconds * SAMPLE_RATE as f32) as usize {
            let t = i as f32 / SAMPLE_RATE as f32;
            let s = (std::f32::consts::TAU * frequency * t).sin() * amplitude;
            writer.write_sample((s * i16::MAX as f32) as i16).unwrap();
        }
        writer.finalize().unwrap();
    }
    buf
}

fn engine(provider: Box<dyn GpuProvider>) -> EngineController {
    let config = EngineConfig {
        width: 320,
        height: 180,
        ..EngineConfig::default()
    };
    EngineController::new(config, provider)
}

fn load(engine: &mut EngineController, bytes: Vec<u8>) {
    pollster::block_on(engine.load(bytes, Some("wav"))).unwrap();
}

#[test]
fn mode_churn_keeps_one_program_and_one_buffer() {
    let mut engine = engine(Box::new(SoftwareProvider));
    load(&mut engine, wav(1.0, 440.0, 0.5));
    engine.set_playing(true, 0.0);

    for round in 0..3 {
        assert_eq!(engine.set_mode(RenderModeId::Tunnel3d), RenderModeId::Tunnel3d);
        engine.frame(0.1 * (round * 2 + 1) as f64);
        assert_eq!(engine.gpu_resources(), (1, 1), "round {round} in 3D");

        assert_eq!(engine.set_mode(RenderModeId::BarHorizontal), RenderModeId::BarHorizontal);
        engine.frame(0.1 * (round * 2 + 2) as f64);
        assert_eq!(engine.gpu_resources(), (0, 0), "round {round} in 2D");
        assert!(engine.tunnel_state().is_none());
    }

    engine.set_mode(RenderModeId::Tunnel3d);
    assert_eq!(engine.gpu_resources(), (1, 1));
    assert_eq!(engine.pending_frames(), 2);
}

#[test]
fn loading_a_second_file_stops_the_first() {
    let mut engine = engine(Box::new(SoftwareProvider));
    load(&mut engine, wav(2.0, 440.0, 0.5));
    assert!(engine.set_playing(true, 0.0));
    engine.frame(0.5);
    assert_eq!(engine.source().active_sources(), 1);

    load(&mut engine, wav(1.0, 880.0, 0.5));
    assert!(!engine.is_playing());
    assert_eq!(engine.source().active_sources(), 0);
    assert_eq!(engine.pending_frames(), 0);
    assert!((engine.source().duration() - 1.0).abs() < 1e-3);

    assert!(engine.set_playing(true, 1.0));
    assert_eq!(engine.source().active_sources(), 1);
}

#[test]
fn silent_audio_draws_every_mode_at_rest() {
    let mut engine = engine(Box::new(SoftwareProvider));
    load(&mut engine, wav(3.0, 440.0, 0.0));
    engine.set_playing(true, 0.0);

    let (width, height) = (320.0f32, 180.0f32);
    let mut now = 0.0;
    for mode in RenderModeId::ALL {
        assert_eq!(engine.set_mode(mode), mode);
        now += 0.1;
        engine.frame(now);
        assert!(engine.final_snapshot().iter().all(|&v| v == 0), "{mode}");
        assert!(engine.shaped_snapshot().iter().all(|&v| v == 0), "{mode}");

        let list = engine.record_frame(now);
        let Some((first, rest)) = list.commands.split_first() else {
            panic!("{mode} drew nothing");
        };
        if mode.is_gpu() {
            assert!(matches!(first, DrawCommand::DrawImage { .. } | DrawCommand::FillRect { .. }));
            assert!(rest.is_empty());
            assert_eq!(engine.audio_level(), 0.0);
            continue;
        }
        assert!(matches!(first, DrawCommand::FillRect { .. }), "{mode} background");

        match mode {
            RenderModeId::BarHorizontal | RenderModeId::BarVertical => {
                assert!(rest.is_empty(), "{mode} drew bars for silence");
            }
            RenderModeId::CircularSpectrum => {
                assert!(!rest.is_empty());
                for cmd in rest {
                    let DrawCommand::StrokeLine { from, to, .. } = cmd else {
                        panic!("unexpected {cmd:?}");
                    };
                    assert_eq!(from, to);
                }
            }
            RenderModeId::Waveform => {
                let [DrawCommand::StrokePolyline { points, .. }] = rest else {
                    panic!("expected one polyline, got {rest:?}");
                };
                assert!(points.iter().all(|p| p.y == points[0].y));
            }
            RenderModeId::Particles => {
                for cmd in rest {
                    let DrawCommand::FillCircle { center, .. } = cmd else {
                        panic!("unexpected {cmd:?}");
                    };
                    assert_eq!(center.y, height / 2.0);
                }
            }
            RenderModeId::RadialNeon => {
                let base = width.min(height) * 0.2;
                for (n, cmd) in rest.iter().enumerate() {
                    let DrawCommand::FillCircle { center, .. } = cmd else {
                        panic!("unexpected {cmd:?}");
                    };
                    let ring = (n / 64) as f32;
                    let dist = center.distance(glam::Vec2::new(width / 2.0, height / 2.0));
                    assert!((dist - (base + ring * 30.0)).abs() < 1e-3);
                }
            }
            RenderModeId::LofiGlow => {
                let Some(DrawCommand::FillCircle { radius, .. }) = rest.first() else {
                    panic!("expected the glow");
                };
                assert_eq!(*radius, 50.0);
            }
            RenderModeId::Tunnel3d => unreachable!(),
        }
    }
}

#[test]
fn sensitivity_and_bass_gain_saturate_loud_bass() {
    let mut engine = engine(Box::new(SoftwareProvider));
    load(&mut engine, wav(1.0, 60.0, 1.0));
    engine.set_sensitivity(3.0);
    engine.set_band_gains(2.0, 1.0, 1.0);
    engine.set_smoothing(0.0);
    engine.set_playing(true, 0.0);
    engine.frame(0.5);

    let shaped = engine.shaped_snapshot();
    assert!(!shaped.is_empty());
    assert_eq!(shaped.iter().copied().max(), Some(255));
    assert_eq!(engine.final_snapshot(), shaped);
}

#[test]
fn missing_gpu_lands_on_the_fallback_mode() {
    let mut engine = engine(Box::new(UnavailableProvider));
    load(&mut engine, wav(1.0, 440.0, 0.5));
    assert!(!engine.gpu_supported());
    assert_eq!(engine.set_mode(RenderModeId::Tunnel3d), FALLBACK_MODE);
    assert_eq!(FALLBACK_MODE, RenderModeId::CircularSpectrum);

    engine.set_playing(true, 0.0);
    assert_eq!(engine.pending_frames(), 1);
    assert_eq!(engine.frame(0.1), 1);
    assert_eq!(engine.gpu_resources(), (0, 0));
}

#[test]
fn playback_ends_at_the_trim_end_and_keeps_the_last_frame() {
    let mut engine = engine(Box::new(SoftwareProvider));
    load(&mut engine, wav(2.0, 440.0, 0.5));
    engine.source_mut().set_trim_start(0.5);
    engine.source_mut().set_trim_end(1.0);
    engine.set_playing(true, 0.0);

    assert_eq!(engine.frame(0.25), 1);
    let last = engine.canvas().pixels().to_vec();
    assert_eq!(engine.frame(0.75), 0);
    assert!(!engine.is_playing());
    assert_eq!(engine.canvas().pixels(), last.as_slice());
}
