pub mod batch;
pub mod config;
pub mod error;
pub mod layout;
pub mod matrix;
pub mod normalize;
pub mod pipeline;
pub mod ranking;
pub mod scanning;
pub mod traits;

pub use batch::{BatchExtractionCoordinator, ExtractionReport, TrackFailure};
pub use config::{EngineConfig, ExtractionConfig, LayoutConfig, ScanConfig};
pub use error::{ConfigError, EngineError, ExtractionFailure, FetchError, SourceError};
pub use layout::{AngleSource, EvenlySpacedAngles, SeededAngles, SpatialLayoutEngine, ThreadRngAngles};
pub use matrix::FeatureMatrix;
pub use normalize::NormalizedMatrix;
pub use pipeline::{RankRequest, SimilarityPipeline};
pub use scanning::LocalFolderSource;
pub use traits::{AudioFetcher, CandidateSource, PendingTrack, TrackAudio};
