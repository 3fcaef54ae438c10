use std::fmt;

use serde::{Deserialize, Serialize};

use crate::features::FeatureVector;

/// Identificador estable de una pista dentro de un lote.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackId(String);

impl TrackId {
    pub fn new(id: impl Into<String>) -> Self {
        TrackId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TrackId {
    fn from(value: &str) -> Self {
        TrackId(value.to_string())
    }
}

impl From<String> for TrackId {
    fn from(value: String) -> Self {
        TrackId(value)
    }
}

/// Identidad de una pista. Artista, portada y preview son opacos para el motor:
/// se copian tal cual a la respuesta.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackIdentity {
    pub id: TrackId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_url: Option<String>,
}

impl TrackIdentity {
    pub fn new(id: impl Into<TrackId>, name: impl Into<String>) -> Self {
        TrackIdentity {
            id: id.into(),
            name: name.into(),
            artist: None,
            image: None,
            preview_url: None,
        }
    }

    pub fn with_artist(mut self, artist: impl Into<String>) -> Self {
        self.artist = Some(artist.into());
        self
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    pub fn with_preview_url(mut self, url: impl Into<String>) -> Self {
        self.preview_url = Some(url.into());
        self
    }
}

/// Pista ya analizada: identidad + vector de características.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackRecord {
    pub identity: TrackIdentity,
    pub features: FeatureVector,
    pub is_seed: bool,
}

impl TrackRecord {
    pub fn seed(identity: TrackIdentity, features: FeatureVector) -> Self {
        TrackRecord {
            identity,
            features,
            is_seed: true,
        }
    }

    pub fn candidate(identity: TrackIdentity, features: FeatureVector) -> Self {
        TrackRecord {
            identity,
            features,
            is_seed: false,
        }
    }

    pub fn id(&self) -> &TrackId {
        &self.identity.id
    }
}
