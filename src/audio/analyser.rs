use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

pub const DEFAULT_FFT_SIZE: usize = 2048;
const MIN_FFT_SIZE: usize = 32;
const MAX_FFT_SIZE: usize = 32768;

/// Decibel range mapped onto the 0-255 byte scale.
pub const MIN_DECIBELS: f32 = -100.0;
pub const MAX_DECIBELS: f32 = -30.0;

/// Live spectrum analyser producing byte-scaled frequency magnitudes for the
/// window of samples that ends at the playback position.
pub struct SpectrumAnalyser {
    fft_size: usize,
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    buffer: Vec<Complex<f32>>,
}

impl SpectrumAnalyser {
    /// `fft_size` is rounded up to a power of two within 32..=32768.
    pub fn new(fft_size: usize) -> Self {
        let fft_size = fft_size
            .clamp(MIN_FFT_SIZE, MAX_FFT_SIZE)
            .next_power_of_two();
        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(fft_size);
        Self {
            fft_size,
            fft,
            window: hann_window(fft_size),
            buffer: vec![Complex::new(0.0, 0.0); fft_size],
        }
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    pub fn bin_count(&self) -> usize {
        self.fft_size / 2
    }

    /// Fill `out` with `bin_count()` magnitudes for the window ending at
    /// sample index `end` (exclusive). `gain` scales the input samples.
    pub fn byte_frequency_data(&mut self, samples: &[f32], end: usize, gain: f32, out: &mut Vec<u8>) {
        let half = self.bin_count();
        out.clear();
        out.resize(half, 0);

        let end = end.min(samples.len());
        let start = end.saturating_sub(self.fft_size);
        let available = end - start;
        if available == 0 || gain <= 0.0 {
            return;
        }

        // Zero-pad at the front so the newest sample sits at the end of the window.
        let pad = self.fft_size - available;
        for (i, slot) in self.buffer.iter_mut().enumerate() {
            *slot = if i < pad {
                Complex::new(0.0, 0.0)
            } else {
                Complex::new(samples[start + i - pad] * gain * self.window[i], 0.0)
            };
        }

        self.fft.process(&mut self.buffer);

        let range = MAX_DECIBELS - MIN_DECIBELS;
        let scale = 1.0 / self.fft_size as f32;
        for (slot, bin) in out.iter_mut().zip(self.buffer[..half].iter()) {
            let magnitude = bin.norm() * scale;
            if magnitude <= 0.0 {
                continue;
            }
            let db = 20.0 * magnitude.log10();
            let scaled = 255.0 * (db - MIN_DECIBELS) / range;
            *slot = scaled.clamp(0.0, 255.0) as u8;
        }
    }
}

fn hann_window(size: usize) -> Vec<f32> {
    (0..size)
        .map(|i| {
            0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / (size - 1) as f32).cos())
        })
        .collect()
}
