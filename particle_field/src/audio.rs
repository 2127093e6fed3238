//! Voice amplitude.
//!
//! [`AmplitudeAnalyzer`] turns raw samples into a single loudness figure in
//! `[0, 1]` the way a browser analyser node does it:
//!
//! 1. Blackman-window the latest 256 samples and FFT them;
//! 2. smooth each bin's magnitude over time (τ = 0.8);
//! 3. convert to dB and map `[-100 dB, -30 dB]` onto `[0, 1]`;
//! 4. average the 128 bins.
//!
//! Sources implement [`AmplitudeSource`].  When no microphone can be opened
//! the caller gets [`Silence`], and the field simply does not react.

use std::f32::consts::PI;
use std::sync::Arc;

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use tracing::warn;

#[cfg(feature = "mic")]
use crate::error::AudioError;

pub const FFT_SIZE: usize = 256;
pub const SMOOTHING: f32 = 0.8;
pub const MIN_DB: f32 = -100.0;
pub const MAX_DB: f32 = -30.0;

pub trait AmplitudeSource {
    /// Current loudness in `[0, 1]`.  Must never fail or return NaN.
    fn amplitude(&mut self) -> f32;
}

/// The source used when there is no microphone.
#[derive(Clone, Copy, Debug, Default)]
pub struct Silence;

impl AmplitudeSource for Silence {
    fn amplitude(&mut self) -> f32 {
        0.0
    }
}

// ════════════════════════════════════════════════════════════════════════════
// AmplitudeAnalyzer
// ════════════════════════════════════════════════════════════════════════════

pub struct AmplitudeAnalyzer {
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    /// Last `FFT_SIZE` samples, oldest first.
    history: Vec<f32>,
    smoothed: Vec<f32>,
    scratch: Vec<Complex<f32>>,
}

impl Default for AmplitudeAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl AmplitudeAnalyzer {
    pub fn new() -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(FFT_SIZE);
        AmplitudeAnalyzer {
            fft,
            window: blackman(FFT_SIZE),
            history: vec![0.0; FFT_SIZE],
            smoothed: vec![0.0; FFT_SIZE / 2],
            scratch: vec![Complex::new(0.0, 0.0); FFT_SIZE],
        }
    }

    /// Append mono samples, keeping only the most recent `FFT_SIZE`.
    /// Non-finite samples are read as silence.
    pub fn push_samples(&mut self, samples: &[f32]) {
        let clean = samples.iter().map(|s| if s.is_finite() { *s } else { 0.0 });
        if samples.len() >= FFT_SIZE {
            self.history.clear();
            self.history.extend(clean.skip(samples.len() - FFT_SIZE));
        } else {
            self.history.drain(..samples.len());
            self.history.extend(clean);
        }
    }

    /// Run one analysis frame over the current history.
    pub fn analyze(&mut self) -> f32 {
        for (k, c) in self.scratch.iter_mut().enumerate() {
            *c = Complex::new(self.history[k] * self.window[k], 0.0);
        }
        self.fft.process(&mut self.scratch);

        let scale = 1.0 / FFT_SIZE as f32;
        let mut total = 0.0;
        for (k, s) in self.smoothed.iter_mut().enumerate() {
            let mag = self.scratch[k].norm() * scale;
            *s = SMOOTHING * *s + (1.0 - SMOOTHING) * mag;
            let db = 20.0 * s.log10();
            total += ((db - MIN_DB) / (MAX_DB - MIN_DB)).clamp(0.0, 1.0);
        }
        let avg = total / self.smoothed.len() as f32;
        if avg.is_finite() { avg } else { 0.0 }
    }
}

fn blackman(n: usize) -> Vec<f32> {
    const A0: f32 = 0.42;
    const A1: f32 = 0.5;
    const A2: f32 = 0.08;
    (0..n)
        .map(|i| {
            let x = i as f32 / n as f32;
            A0 - A1 * (2.0 * PI * x).cos() + A2 * (4.0 * PI * x).cos()
        })
        .collect()
}

// ════════════════════════════════════════════════════════════════════════════
// Microphone capture — only compiled with the `mic` feature
// ════════════════════════════════════════════════════════════════════════════

#[cfg(feature = "mic")]
pub struct MicCapture {
    _stream: cpal::Stream,
    pending: Arc<std::sync::Mutex<Vec<f32>>>,
    analyzer: AmplitudeAnalyzer,
}

#[cfg(feature = "mic")]
impl MicCapture {
    /// Open the default input device and start streaming.
    pub fn open() -> Result<Self, AudioError> {
        use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
        use std::sync::Mutex;

        let host = cpal::default_host();
        let device = host.default_input_device().ok_or(AudioError::NoInputDevice)?;
        let supported = device
            .default_input_config()
            .map_err(|e| AudioError::Device(e.to_string()))?;
        if supported.sample_format() != cpal::SampleFormat::F32 {
            return Err(AudioError::Device(format!(
                "unsupported sample format {:?}",
                supported.sample_format()
            )));
        }
        let channels = (supported.channels() as usize).max(1);
        let sample_rate = supported.sample_rate().0;

        let pending = Arc::new(Mutex::new(Vec::with_capacity(FFT_SIZE * 4)));
        let sink = Arc::clone(&pending);
        let stream = device
            .build_input_stream(
                &supported.config(),
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    if let Ok(mut buf) = sink.lock() {
                        buf.extend(data.chunks(channels).map(|f| f.iter().sum::<f32>() / f.len() as f32));
                        let excess = buf.len().saturating_sub(FFT_SIZE * 4);
                        if excess > 0 {
                            buf.drain(..excess);
                        }
                    }
                },
                |err| warn!(error = %err, "microphone stream error"),
                None,
            )
            .map_err(|e| AudioError::Stream(e.to_string()))?;
        stream.play().map_err(|e| AudioError::Stream(e.to_string()))?;

        tracing::info!(sample_rate, channels, "microphone open");
        Ok(MicCapture { _stream: stream, pending, analyzer: AmplitudeAnalyzer::new() })
    }
}

#[cfg(feature = "mic")]
impl AmplitudeSource for MicCapture {
    fn amplitude(&mut self) -> f32 {
        if let Ok(mut buf) = self.pending.lock() {
            self.analyzer.push_samples(&buf);
            buf.clear();
        }
        self.analyzer.analyze()
    }
}

/// The microphone if one can be opened, otherwise [`Silence`].
pub fn open_default_source() -> Box<dyn AmplitudeSource> {
    #[cfg(feature = "mic")]
    {
        match MicCapture::open() {
            Ok(m) => return Box::new(m),
            Err(e) => warn!(error = %e, "audio input unavailable; amplitude pinned to 0"),
        }
    }
    #[cfg(not(feature = "mic"))]
    warn!(error = %crate::error::AudioError::Disabled, "audio input unavailable; amplitude pinned to 0");
    Box::new(Silence)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(freq_bin: f32, amp: f32) -> Vec<f32> {
        (0..FFT_SIZE)
            .map(|i| amp * (2.0 * PI * freq_bin * i as f32 / FFT_SIZE as f32).sin())
            .collect()
    }

    #[test]
    fn silence_is_zero() {
        let mut a = AmplitudeAnalyzer::new();
        a.push_samples(&[0.0; FFT_SIZE]);
        assert_eq!(a.analyze(), 0.0);
        assert_eq!(Silence.amplitude(), 0.0);
    }

    #[test]
    fn louder_is_higher() {
        let mut quiet = AmplitudeAnalyzer::new();
        let mut loud = AmplitudeAnalyzer::new();
        quiet.push_samples(&tone(8.0, 0.01));
        loud.push_samples(&tone(8.0, 0.8));
        let (mut q, mut l) = (0.0, 0.0);
        for _ in 0..20 {
            q = quiet.analyze();
            l = loud.analyze();
        }
        assert!(l > q, "loud {} quiet {}", l, q);
        assert!((0.0..=1.0).contains(&l));
    }

    #[test]
    fn smoothing_ramps_up() {
        let mut a = AmplitudeAnalyzer::new();
        a.push_samples(&tone(20.0, 0.5));
        let first = a.analyze();
        let second = a.analyze();
        assert!(second >= first);
    }

    #[test]
    fn nan_samples_do_not_poison() {
        let mut a = AmplitudeAnalyzer::new();
        a.push_samples(&[f32::NAN; 64]);
        assert!(a.analyze().is_finite());
    }

    #[test]
    fn short_pushes_shift_history() {
        let mut a = AmplitudeAnalyzer::new();
        a.push_samples(&[1.0; 10]);
        assert_eq!(a.history.len(), FFT_SIZE);
        assert_eq!(a.history[FFT_SIZE - 1], 1.0);
        assert_eq!(a.history[FFT_SIZE - 11], 0.0);
    }
}
