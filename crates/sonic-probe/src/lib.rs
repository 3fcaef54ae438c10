pub mod analysis;
pub mod audio;
pub mod error;

pub use analysis::{AnalysisConfig, AnalysisError, SignalFeatureExtractor};
pub use audio::{AudioBuffer, AudioDecoder, AudioSource, decoder::SymphoniaDecoder};
pub use error::DecodeError;
