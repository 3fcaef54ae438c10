use std::time::Duration;

use sonic_core::TrackId;
use sonic_probe::{AnalysisError, DecodeError};
use thiserror::Error;

/// Fallo de una sola pista. Nunca aborta el lote salvo que sea la semilla.
#[derive(Debug, Error)]
pub enum ExtractionFailure {
    #[error("audio could not be fetched: {0}")]
    Fetch(#[from] FetchError),

    #[error("audio could not be decoded: {0}")]
    Decode(#[from] DecodeError),

    #[error("analysis failed: {0}")]
    Analysis(#[from] AnalysisError),

    #[error("extraction exceeded its {0:?} budget")]
    Timeout(Duration),

    #[error("extraction task panicked: {0}")]
    Panicked(String),

    #[error("extraction task was cancelled")]
    Cancelled,
}

impl ExtractionFailure {
    pub fn code(&self) -> &'static str {
        match self {
            ExtractionFailure::Fetch(_) => "FETCH_FAILED",
            ExtractionFailure::Decode(_) => "DECODE_FAILED",
            ExtractionFailure::Analysis(_) => "ANALYSIS_FAILED",
            ExtractionFailure::Timeout(_) => "TIMEOUT",
            ExtractionFailure::Panicked(_) => "PANICKED",
            ExtractionFailure::Cancelled => "CANCELLED",
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct FetchError(String);

impl FetchError {
    pub fn new(reason: impl Into<String>) -> Self {
        FetchError(reason.into())
    }
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Not a directory: {0}")]
    NotADirectory(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("Configuration parse error: {0}")]
    Parse(#[from] config::ConfigError),

    #[error("Invalid analysis settings: {0}")]
    Analysis(#[from] AnalysisError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Condiciones que invalidan el lote completo.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("seed track {track} could not be extracted: {reason}")]
    SeedExtraction {
        track: TrackId,
        #[source]
        reason: ExtractionFailure,
    },

    #[error("not enough usable tracks to compare ({usable} usable, at least 2 required)")]
    InsufficientData { usable: usize },

    #[error("invalid batch: {0}")]
    InvalidBatch(String),

    #[error("track {track} has {found} features, expected {expected}")]
    DimensionMismatch {
        track: TrackId,
        expected: usize,
        found: usize,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("runtime error: {0}")]
    Runtime(String),
}

impl EngineError {
    /// Código estable para la capa que responde al usuario.
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::SeedExtraction { .. } => "SEED_EXTRACTION_FAILED",
            EngineError::InsufficientData { .. } => "INSUFFICIENT_DATA",
            EngineError::InvalidBatch(_) => "INVALID_BATCH",
            EngineError::DimensionMismatch { .. } => "DIMENSION_MISMATCH",
            EngineError::Config(_) => "INVALID_CONFIG",
            EngineError::Runtime(_) => "RUNTIME",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        let seed = EngineError::SeedExtraction {
            track: TrackId::new("s"),
            reason: ExtractionFailure::Timeout(Duration::from_secs(1)),
        };
        assert_eq!(seed.code(), "SEED_EXTRACTION_FAILED");
        assert_eq!(EngineError::InsufficientData { usable: 1 }.code(), "INSUFFICIENT_DATA");
        assert_eq!(
            ExtractionFailure::Analysis(AnalysisError::EmptyBuffer).code(),
            "ANALYSIS_FAILED"
        );
        assert!(seed.to_string().contains("budget"));
    }
}
