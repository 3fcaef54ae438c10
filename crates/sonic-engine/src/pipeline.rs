use std::collections::HashMap;
use std::sync::Arc;

use sonic_core::{DroppedTrack, RankResponse, SimilarityResult, TrackId, TrackIdentity};
use sonic_probe::SignalFeatureExtractor;
use tracing::{Level, debug, info, instrument};

use crate::batch::{BatchExtractionCoordinator, ExtractionReport, TrackFailure};
use crate::config::EngineConfig;
use crate::error::{ConfigError, EngineError};
use crate::layout::{AngleSource, SpatialLayoutEngine};
use crate::matrix::FeatureMatrix;
use crate::ranking::rank_rows;
use crate::traits::{PendingTrack, TrackAudio};

/// Petición de ranking: una semilla y sus candidatas.
#[derive(Debug, Clone)]
pub struct RankRequest {
    pub seed: PendingTrack,
    pub candidates: Vec<PendingTrack>,
}

impl RankRequest {
    pub fn new(seed: TrackIdentity, audio: impl Into<TrackAudio>) -> Self {
        RankRequest {
            seed: PendingTrack::seed(seed, audio),
            candidates: Vec::new(),
        }
    }

    pub fn with_candidate(mut self, identity: TrackIdentity, audio: impl Into<TrackAudio>) -> Self {
        self.candidates.push(PendingTrack::candidate(identity, audio));
        self
    }

    pub fn with_candidates(mut self, candidates: impl IntoIterator<Item = PendingTrack>) -> Self {
        self.candidates.extend(candidates.into_iter().map(|mut c| {
            c.is_seed = false;
            c
        }));
        self
    }

    fn into_tracks(self) -> Vec<PendingTrack> {
        std::iter::once(self.seed).chain(self.candidates).collect()
    }
}

/// Extracción en paralelo + matriz + normalización + ranking + layout.
#[derive(Debug, Clone)]
pub struct SimilarityPipeline {
    coordinator: BatchExtractionCoordinator,
    layout: SpatialLayoutEngine,
}

impl SimilarityPipeline {
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let extractor = SignalFeatureExtractor::new(config.analysis).map_err(ConfigError::from)?;
        Ok(SimilarityPipeline {
            coordinator: BatchExtractionCoordinator::new(Arc::new(extractor), config.extraction),
            layout: SpatialLayoutEngine::new(config.layout),
        })
    }

    pub fn coordinator(&self) -> &BatchExtractionCoordinator {
        &self.coordinator
    }

    #[instrument(level = Level::INFO, skip_all, fields(seed = %request.seed.identity.id, candidates = request.candidates.len()), err)]
    pub async fn rank(
        &self,
        request: RankRequest,
        angles: &mut (dyn AngleSource + Send),
    ) -> Result<RankResponse, EngineError> {
        let report = self.coordinator.run(request.into_tracks()).await?;
        self.rank_report(report, angles)
    }

    /// Etapas síncronas sobre un lote ya extraído.
    pub fn rank_report(
        &self,
        report: ExtractionReport,
        angles: &mut dyn AngleSource,
    ) -> Result<RankResponse, EngineError> {
        let matrix = FeatureMatrix::from_records(report.records())?;
        let normalized = matrix.normalize();
        if !normalized.degenerate_columns.is_empty() {
            debug!(columns = ?normalized.degenerate_columns, "columnas degeneradas");
        }

        let ranked = rank_rows(&normalized.matrix);
        let rows: Vec<(f64, bool)> = ranked.iter().map(|r| (r.score, r.is_seed)).collect();
        let points = self.layout.layout(&rows, angles);

        let ExtractionReport {
            seed,
            candidates,
            failures,
        } = report;
        let mut identities: HashMap<TrackId, TrackIdentity> = std::iter::once(seed)
            .chain(candidates)
            .map(|r| (r.identity.id.clone(), r.identity))
            .collect();

        let mut matches = Vec::with_capacity(ranked.len());
        for (row, point) in ranked.into_iter().zip(points) {
            let identity = identities
                .remove(&row.id)
                .ok_or_else(|| EngineError::Runtime(format!("lost identity for track {}", row.id)))?;
            matches.push(SimilarityResult {
                identity,
                score: row.score,
                is_seed: row.is_seed,
                x: point.x,
                y: point.y,
            });
        }

        let dropped = failures.into_iter().map(dropped_track).collect::<Vec<_>>();
        info!(matches = matches.len(), dropped = dropped.len(), "ranking listo");
        Ok(RankResponse { matches, dropped })
    }
}

fn dropped_track(failure: TrackFailure) -> DroppedTrack {
    DroppedTrack {
        id: failure.identity.id,
        name: failure.identity.name,
        code: failure.failure.code().to_string(),
        reason: failure.failure.to_string(),
    }
}
