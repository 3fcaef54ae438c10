use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use sonic_core::TrackIdentity;
use sonic_probe::{AudioBuffer, AudioSource};

use crate::error::{FetchError, SourceError};

/// Colaborador que descarga o localiza el audio de una pista.
#[async_trait]
pub trait AudioFetcher: Send + Sync {
    async fn fetch(&self, identity: &TrackIdentity) -> Result<AudioSource, FetchError>;
}

/// Colaborador que entrega la lista de candidatas para un lote.
#[async_trait]
pub trait CandidateSource: Send + Sync {
    async fn candidates(&self) -> Result<Vec<PendingTrack>, SourceError>;
}

/// Audio de una pista: disponible ya o a pedir al fetcher dentro de la tarea.
#[derive(Clone)]
pub enum TrackAudio {
    Ready(AudioSource),
    Deferred(Arc<dyn AudioFetcher>),
}

impl fmt::Debug for TrackAudio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackAudio::Ready(source) => f.debug_tuple("Ready").field(&source.describe()).finish(),
            TrackAudio::Deferred(_) => f.write_str("Deferred"),
        }
    }
}

impl From<AudioSource> for TrackAudio {
    fn from(source: AudioSource) -> Self {
        TrackAudio::Ready(source)
    }
}

impl From<AudioBuffer> for TrackAudio {
    fn from(buffer: AudioBuffer) -> Self {
        TrackAudio::Ready(AudioSource::Decoded(buffer))
    }
}

impl From<PathBuf> for TrackAudio {
    fn from(path: PathBuf) -> Self {
        TrackAudio::Ready(AudioSource::File(path))
    }
}

/// Entrada del coordinador: identidad + audio + marca de semilla.
#[derive(Debug, Clone)]
pub struct PendingTrack {
    pub identity: TrackIdentity,
    pub is_seed: bool,
    pub audio: TrackAudio,
}

impl PendingTrack {
    pub fn seed(identity: TrackIdentity, audio: impl Into<TrackAudio>) -> Self {
        PendingTrack {
            identity,
            is_seed: true,
            audio: audio.into(),
        }
    }

    pub fn candidate(identity: TrackIdentity, audio: impl Into<TrackAudio>) -> Self {
        PendingTrack {
            identity,
            is_seed: false,
            audio: audio.into(),
        }
    }

    pub fn deferred(identity: TrackIdentity, is_seed: bool, fetcher: Arc<dyn AudioFetcher>) -> Self {
        PendingTrack {
            identity,
            is_seed,
            audio: TrackAudio::Deferred(fetcher),
        }
    }
}
