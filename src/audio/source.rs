use std::path::Path;

use super::analyser::{SpectrumAnalyser, DEFAULT_FFT_SIZE};
use super::decode::{decode_audio, DecodedAudio};
use crate::error::SourceError;

pub const DEFAULT_MAX_ASSET_BYTES: u64 = 50 * 1024 * 1024;

#[derive(Clone, Debug)]
pub struct SourceConfig {
    pub max_asset_bytes: u64,
    pub fft_size: usize,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            max_asset_bytes: DEFAULT_MAX_ASSET_BYTES,
            fft_size: DEFAULT_FFT_SIZE,
        }
    }
}

/// One started playback of the loaded buffer. A new one is created for every
/// `play`; at most one exists at a time.
#[derive(Clone, Copy, Debug)]
struct PlaybackSource {
    id: u64,
    started_at: f64,
    offset: f64,
    end: f64,
}

impl PlaybackSource {
    fn position(&self, now: f64) -> f64 {
        (self.offset + (now - self.started_at).max(0.0)).min(self.end)
    }
}

/// Audio signal adapter: owns the decoded buffer, the playback transport and
/// the analyser that turns the current playback window into a snapshot.
pub struct SignalSource {
    config: SourceConfig,
    analyser: SpectrumAnalyser,
    audio: Option<DecodedAudio>,
    source: Option<PlaybackSource>,
    next_source_id: u64,
    is_playing: bool,
    current_time: f64,
    trim_start: f64,
    trim_end: f64,
    fade_in: f64,
    fade_out: f64,
    snapshot: Vec<u8>,
}

impl SignalSource {
    pub fn new(config: SourceConfig) -> Self {
        let analyser = SpectrumAnalyser::new(config.fft_size);
        let bins = analyser.bin_count();
        Self {
            config,
            analyser,
            audio: None,
            source: None,
            next_source_id: 1,
            is_playing: false,
            current_time: 0.0,
            trim_start: 0.0,
            trim_end: 0.0,
            fade_in: 0.0,
            fade_out: 0.0,
            snapshot: vec![0; bins],
        }
    }

    /// Load an in-memory asset. Assets over the size ceiling are rejected
    /// before anything else happens; otherwise any running playback is
    /// stopped before decoding starts. A failed decode keeps the previously
    /// loaded buffer.
    pub async fn load(&mut self, bytes: Vec<u8>, extension: Option<&str>) -> Result<(), SourceError> {
        self.check_size(bytes.len() as u64)?;
        self.stop_source();
        self.is_playing = false;
        let decoded = decode_audio(bytes, extension).inspect_err(|e| {
            log::error!("Audio load failed: {}", e);
        })?;
        self.install(decoded);
        Ok(())
    }

    /// Load an asset from disk. The size ceiling is checked against file
    /// metadata so oversized files are never read.
    pub async fn load_file(&mut self, path: &Path) -> Result<(), SourceError> {
        let size = std::fs::metadata(path)?.len();
        self.check_size(size)?;
        let bytes = std::fs::read(path)?;
        let extension = path.extension().and_then(|e| e.to_str());
        self.load(bytes, extension).await
    }

    fn check_size(&self, size: u64) -> Result<(), SourceError> {
        if size > self.config.max_asset_bytes {
            log::warn!(
                "Rejecting audio asset of {} bytes (limit {})",
                size,
                self.config.max_asset_bytes
            );
            return Err(SourceError::SizeLimit {
                size,
                limit: self.config.max_asset_bytes,
            });
        }
        Ok(())
    }

    fn install(&mut self, decoded: DecodedAudio) {
        let duration = decoded.duration();
        self.audio = Some(decoded);
        self.trim_end = duration;
        self.trim_start = self.trim_start.min(duration);
        self.current_time = 0.0;
        self.is_playing = false;
    }

    /// Start playback from the trim start. Any existing source is stopped
    /// first. Returns false when nothing is loaded.
    pub fn play(&mut self, now: f64) -> bool {
        if self.audio.is_none() {
            return false;
        }
        self.stop_source();
        let id = self.next_source_id;
        self.next_source_id += 1;
        self.source = Some(PlaybackSource {
            id,
            started_at: now,
            offset: self.trim_start,
            end: self.trim_end,
        });
        self.current_time = self.trim_start;
        self.is_playing = true;
        log::debug!("Playback source {} started at {:.2}s", id, self.trim_start);
        true
    }

    pub fn pause(&mut self, now: f64) {
        if let Some(source) = self.source {
            self.current_time = source.position(now);
        }
        self.stop_source();
        self.is_playing = false;
    }

    fn stop_source(&mut self) {
        if let Some(source) = self.source.take() {
            log::debug!("Playback source {} stopped", source.id);
        }
    }

    /// Advance the transport clock. Returns true on the tick where playback
    /// reaches the trim end and stops on its own.
    pub fn update(&mut self, now: f64) -> bool {
        let Some(source) = self.source else {
            return false;
        };
        self.current_time = source.position(now);
        if self.current_time >= source.end {
            self.stop_source();
            self.is_playing = false;
            return true;
        }
        false
    }

    /// Frequency snapshot for the current playback window. All zeros when no
    /// source is playing. The returned slice is overwritten by the next call.
    pub fn snapshot(&mut self, now: f64) -> &[u8] {
        match (self.source, self.audio.as_ref()) {
            (Some(source), Some(audio)) => {
                let position = source.position(now);
                let end = (position * audio.sample_rate as f64).round() as usize;
                let gain = fade_gain(position, self.trim_start, self.trim_end, self.fade_in, self.fade_out);
                self.analyser
                    .byte_frequency_data(&audio.samples, end, gain as f32, &mut self.snapshot);
            }
            _ => {
                self.snapshot.clear();
                self.snapshot.resize(self.analyser.bin_count(), 0);
            }
        }
        &self.snapshot
    }

    pub fn frequency_bin_count(&self) -> usize {
        self.analyser.bin_count()
    }

    pub fn is_loaded(&self) -> bool {
        self.audio.is_some()
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn active_sources(&self) -> usize {
        usize::from(self.source.is_some())
    }

    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    pub fn duration(&self) -> f64 {
        self.audio.as_ref().map_or(0.0, DecodedAudio::duration)
    }

    pub fn sample_rate(&self) -> Option<u32> {
        self.audio.as_ref().map(|a| a.sample_rate)
    }

    pub fn trim(&self) -> (f64, f64) {
        (self.trim_start, self.trim_end)
    }

    pub fn fades(&self) -> (f64, f64) {
        (self.fade_in, self.fade_out)
    }

    pub fn set_trim_start(&mut self, value: f64) {
        self.trim_start = clamp_time(value, 0.0, self.trim_end);
    }

    pub fn set_trim_end(&mut self, value: f64) {
        self.trim_end = clamp_time(value, self.trim_start, self.duration());
    }

    pub fn set_fade_in(&mut self, value: f64) {
        self.fade_in = clamp_time(value, 0.0, f64::MAX);
    }

    pub fn set_fade_out(&mut self, value: f64) {
        self.fade_out = clamp_time(value, 0.0, f64::MAX);
    }
}

fn clamp_time(value: f64, min: f64, max: f64) -> f64 {
    if !value.is_finite() {
        return min;
    }
    value.clamp(min, max.max(min))
}

/// Linear fade envelope over the trimmed region.
fn fade_gain(position: f64, trim_start: f64, trim_end: f64, fade_in: f64, fade_out: f64) -> f64 {
    let mut gain: f64 = 1.0;
    if fade_in > 0.0 {
        gain = gain.min((position - trim_start) / fade_in);
    }
    if fade_out > 0.0 {
        gain = gain.min((trim_end - position) / fade_out);
    }
    gain.clamp(0.0, 1.0)
}
