//! Modelo de dominio compartido por todos los crates de sonic.

pub mod features;
pub mod similarity;
pub mod track;

pub use features::{FEATURE_DIM, FeatureDimension, FeatureVector, TIMBRE_COEFFICIENTS};
pub use similarity::{DroppedTrack, Point, RankResponse, SimilarityResult};
pub use track::{TrackId, TrackIdentity, TrackRecord};
