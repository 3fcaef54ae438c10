use std::time::Duration;

use serde::{Deserialize, Serialize};
use sonic_core::{FeatureDimension, TIMBRE_COEFFICIENTS};
use thiserror::Error;

pub mod chroma;
pub mod extractor;
pub mod mfcc;
pub mod spectral;
pub mod stft;
pub mod tempo;

pub use extractor::SignalFeatureExtractor;

// =================== Constantes ===================

pub const DEFAULT_SAMPLE_RATE: u32 = 22_050;
pub const DEFAULT_MAX_DURATION: Duration = Duration::from_secs(30);
pub const DEFAULT_FRAME_SIZE: usize = 2048;
pub const DEFAULT_HOP_SIZE: usize = 512;
pub const DEFAULT_MEL_BANDS: usize = 40;
pub const DEFAULT_MFCC: usize = 13;
pub const DEFAULT_ROLLOFF_PERCENT: f64 = 0.85;

/// Amplitud pico por debajo de la cual el buffer se considera silencio.
pub const SILENCE_PEAK: f32 = 1e-4;

// =================== Error ===================

#[derive(Debug, Error, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("audio buffer is empty")]
    EmptyBuffer,

    #[error("audio buffer is silent (peak amplitude {peak:e})")]
    Silent { peak: f32 },

    #[error("non-finite sample at index {index}")]
    NonFiniteSample { index: usize },

    #[error("audio too short for analysis: {samples} samples, at least {required} required")]
    TooShort { samples: usize, required: usize },

    #[error("invalid sample rate: {0} Hz")]
    InvalidSampleRate(u32),

    #[error("feature {0} is not finite")]
    NonFiniteFeature(FeatureDimension),

    #[error("resampling failed: {0}")]
    Resample(String),

    #[error("invalid analysis configuration: {0}")]
    InvalidConfig(String),

    #[error("analysis was cancelled")]
    Cancelled,
}

// =================== Config ===================

/// Parámetros fijos del análisis. Dos extracciones con la misma config y el
/// mismo buffer producen exactamente el mismo vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub sample_rate: u32,
    #[serde(with = "humantime_serde")]
    pub max_duration: Duration,
    pub frame_size: usize,
    pub hop_size: usize,
    pub n_mels: usize,
    pub n_mfcc: usize,
    pub rolloff_percent: f64,
    pub min_bpm: f64,
    pub max_bpm: f64,
    pub start_bpm: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            sample_rate: DEFAULT_SAMPLE_RATE,
            max_duration: DEFAULT_MAX_DURATION,
            frame_size: DEFAULT_FRAME_SIZE,
            hop_size: DEFAULT_HOP_SIZE,
            n_mels: DEFAULT_MEL_BANDS,
            n_mfcc: DEFAULT_MFCC,
            rolloff_percent: DEFAULT_ROLLOFF_PERCENT,
            min_bpm: 30.0,
            max_bpm: 300.0,
            start_bpm: 120.0,
        }
    }
}

impl AnalysisConfig {
    pub fn validate(&self) -> Result<(), AnalysisError> {
        let invalid = |msg: String| Err(AnalysisError::InvalidConfig(msg));

        if self.sample_rate == 0 {
            return Err(AnalysisError::InvalidSampleRate(0));
        }
        if self.frame_size == 0 || self.hop_size == 0 {
            return invalid("frame_size and hop_size must be greater than zero".into());
        }
        if self.hop_size > self.frame_size {
            return invalid(format!(
                "hop_size ({}) cannot exceed frame_size ({})",
                self.hop_size, self.frame_size
            ));
        }
        if self.n_mfcc < TIMBRE_COEFFICIENTS {
            return invalid(format!(
                "n_mfcc ({}) must be at least {TIMBRE_COEFFICIENTS}",
                self.n_mfcc
            ));
        }
        if self.n_mels < self.n_mfcc {
            return invalid(format!("n_mels ({}) must be >= n_mfcc ({})", self.n_mels, self.n_mfcc));
        }
        if !(self.rolloff_percent > 0.0 && self.rolloff_percent <= 1.0) {
            return invalid(format!("rolloff_percent must be in (0, 1], got {}", self.rolloff_percent));
        }
        if !(self.min_bpm > 0.0 && self.min_bpm < self.max_bpm) || self.start_bpm <= 0.0 {
            return invalid(format!(
                "tempo range {}..{} (start {}) is invalid",
                self.min_bpm, self.max_bpm, self.start_bpm
            ));
        }
        if self.max_duration.is_zero() {
            return invalid("max_duration must be greater than zero".into());
        }
        Ok(())
    }

    pub fn max_samples(&self) -> usize {
        (self.max_duration.as_secs_f64() * self.sample_rate as f64).round() as usize
    }

    /// Mínimo de muestras (sin relleno) necesario para analizar.
    pub fn min_samples(&self) -> usize {
        (self.frame_size / 4).max(1)
    }

    /// Frames de análisis por segundo.
    pub fn frame_rate(&self) -> f64 {
        self.sample_rate as f64 / self.hop_size as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = AnalysisConfig::default();
        cfg.validate().unwrap();
        assert_eq!(cfg.max_samples(), 22_050 * 30);
        assert_eq!(cfg.min_samples(), 512);
    }

    #[test]
    fn rejects_bad_framing() {
        let cfg = AnalysisConfig {
            hop_size: 4096,
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(AnalysisError::InvalidConfig(_))));

        let cfg = AnalysisConfig {
            frame_size: 0,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_too_few_coefficients() {
        let cfg = AnalysisConfig {
            n_mfcc: TIMBRE_COEFFICIENTS - 1,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn max_duration_reads_humantime() {
        let cfg: AnalysisConfig = serde_json::from_str(r#"{"max_duration":"10s"}"#).unwrap();
        assert_eq!(cfg.max_duration, Duration::from_secs(10));
        assert_eq!(cfg.hop_size, DEFAULT_HOP_SIZE);
    }
}
