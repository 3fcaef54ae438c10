use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::{StreamExt, stream};
use sonic_core::{FeatureVector, TrackIdentity, TrackRecord};
use sonic_probe::{AudioDecoder, AudioSource, SignalFeatureExtractor, SymphoniaDecoder};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::{JoinError, spawn_blocking};
use tokio_util::sync::CancellationToken;
use tracing::{Level, debug, info, instrument, warn};

use crate::config::ExtractionConfig;
use crate::error::{EngineError, ExtractionFailure};
use crate::traits::{PendingTrack, TrackAudio};

/// Pista descartada y el motivo.
#[derive(Debug)]
pub struct TrackFailure {
    pub identity: TrackIdentity,
    pub failure: ExtractionFailure,
}

/// Resultado de extraer un lote: la semilla siempre presente, las candidatas
/// que sobrevivieron (en orden de finalización) y las descartadas.
#[derive(Debug)]
pub struct ExtractionReport {
    pub seed: TrackRecord,
    pub candidates: Vec<TrackRecord>,
    pub failures: Vec<TrackFailure>,
}

impl ExtractionReport {
    /// Semilla primero, luego candidatas.
    pub fn records(&self) -> impl Iterator<Item = &TrackRecord> {
        std::iter::once(&self.seed).chain(self.candidates.iter())
    }

    pub fn usable(&self) -> usize {
        1 + self.candidates.len()
    }
}

/// Ejecuta la extracción de todo un lote en un pool acotado de workers.
///
/// Cada pista es una tarea independiente: primero espera un permiso del
/// semáforo, después (si hace falta) pide el audio al fetcher y finalmente
/// decodifica y analiza dentro de `spawn_blocking`. El permiso y el buffer
/// viajan dentro del closure bloqueante. Si vence el timeout se cancela el
/// trabajo y la tarea espera a que termine antes de informar `Timeout`, de
/// modo que al volver `run` no queda ninguna extracción viva.
#[derive(Debug, Clone)]
pub struct BatchExtractionCoordinator {
    extractor: Arc<SignalFeatureExtractor>,
    decoder: SymphoniaDecoder,
    config: ExtractionConfig,
}

impl BatchExtractionCoordinator {
    pub fn new(extractor: Arc<SignalFeatureExtractor>, config: ExtractionConfig) -> Self {
        let decoder = SymphoniaDecoder::with_max_duration(extractor.config().max_duration);
        BatchExtractionCoordinator {
            extractor,
            decoder,
            config,
        }
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    #[instrument(level = Level::INFO, skip_all, fields(tracks = tracks.len()), err)]
    pub async fn run(&self, tracks: Vec<PendingTrack>) -> Result<ExtractionReport, EngineError> {
        validate_batch(&tracks)?;

        let permits = self.config.worker_count();
        let timeout = self.config.timeout;
        let sem = Arc::new(Semaphore::new(permits));
        let started = Instant::now();
        info!(permits, ?timeout, "starting batch extraction");

        let tasks = tracks.into_iter().map(|track| {
            let sem = sem.clone();
            let extractor = self.extractor.clone();
            let decoder = self.decoder.clone();

            async move {
                let PendingTrack {
                    identity,
                    is_seed,
                    audio,
                } = track;

                let outcome = match sem.acquire_owned().await {
                    Ok(permit) => {
                        extract_one(permit, identity.clone(), audio, extractor, decoder, timeout).await
                    }
                    Err(_) => Err(ExtractionFailure::Cancelled),
                };
                (identity, is_seed, outcome)
            }
        });

        // el semáforo es el límite real; buffer_unordered sólo evita crear
        // todos los futures a la vez
        let mut stream = stream::iter(tasks).buffer_unordered(permits);

        let mut seed: Option<TrackRecord> = None;
        let mut seed_failure: Option<(TrackIdentity, ExtractionFailure)> = None;
        let mut candidates = Vec::new();
        let mut failures = Vec::new();

        while let Some((identity, is_seed, outcome)) = stream.next().await {
            match outcome {
                Ok(features) => {
                    debug!(track = %identity.id, "features extracted");
                    let record = TrackRecord {
                        identity,
                        features,
                        is_seed,
                    };
                    if is_seed {
                        seed = Some(record);
                    } else {
                        candidates.push(record);
                    }
                }
                Err(failure) => {
                    warn!(
                        track = %identity.id,
                        name = %identity.name,
                        code = failure.code(),
                        error = %failure,
                        "track dropped from batch"
                    );
                    if is_seed {
                        seed_failure = Some((identity, failure));
                    } else {
                        failures.push(TrackFailure { identity, failure });
                    }
                }
            }
        }

        info!(
            extracted = candidates.len() + usize::from(seed.is_some()),
            failed = failures.len() + usize::from(seed_failure.is_some()),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "batch extraction finished"
        );

        if let Some((identity, reason)) = seed_failure {
            return Err(EngineError::SeedExtraction {
                track: identity.id,
                reason,
            });
        }

        let seed = seed.ok_or_else(|| EngineError::Runtime("seed task produced no outcome".into()))?;
        Ok(ExtractionReport {
            seed,
            candidates,
            failures,
        })
    }
}

fn validate_batch(tracks: &[PendingTrack]) -> Result<(), EngineError> {
    let seeds = tracks.iter().filter(|t| t.is_seed).count();
    if seeds != 1 {
        return Err(EngineError::InvalidBatch(format!(
            "exactly one seed track is required, found {seeds}"
        )));
    }

    let mut seen = HashSet::with_capacity(tracks.len());
    for track in tracks {
        if !seen.insert(&track.identity.id) {
            return Err(EngineError::InvalidBatch(format!(
                "duplicate track id: {}",
                track.identity.id
            )));
        }
    }
    Ok(())
}

async fn extract_one(
    permit: OwnedSemaphorePermit,
    identity: TrackIdentity,
    audio: TrackAudio,
    extractor: Arc<SignalFeatureExtractor>,
    decoder: SymphoniaDecoder,
    timeout: Duration,
) -> Result<FeatureVector, ExtractionFailure> {
    let deadline = tokio::time::Instant::now() + timeout;

    let fetch = async {
        match audio {
            TrackAudio::Ready(source) => Ok(source),
            TrackAudio::Deferred(fetcher) => fetcher.fetch(&identity).await,
        }
    };
    let source: AudioSource = tokio::time::timeout_at(deadline, fetch)
        .await
        .map_err(|_| ExtractionFailure::Timeout(timeout))??;

    let cancel = CancellationToken::new();
    let token = cancel.clone();
    let mut handle = spawn_blocking(move || -> Result<FeatureVector, ExtractionFailure> {
        let _permit = permit;
        let buffer = decoder.decode_cancellable(source, &token)?;
        Ok(extractor.extract_cancellable(buffer, &token)?)
    });

    match tokio::time::timeout_at(deadline, &mut handle).await {
        Ok(joined) => joined.map_err(join_failure)?,
        Err(_) => {
            // el trabajo bloqueante no se puede abortar: se le avisa y se
            // espera a que suelte el buffer y el permiso
            cancel.cancel();
            let drained = handle.await;
            debug!(
                track = %identity.id,
                panicked = drained.as_ref().is_err_and(JoinError::is_panic),
                "timed out extraction drained"
            );
            Err(ExtractionFailure::Timeout(timeout))
        }
    }
}

fn join_failure(err: JoinError) -> ExtractionFailure {
    if !err.is_panic() {
        return ExtractionFailure::Cancelled;
    }

    let payload = err.into_panic();
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".into());
    ExtractionFailure::Panicked(message)
}
