use serde::{Deserialize, Serialize};

use crate::track::{TrackId, TrackIdentity};

/// Punto en el plano de visualización.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Point { x, y }
    }

    pub fn distance_to(&self, other: &Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Resultado por pista: puntuación 0–100 y posición en el mapa.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimilarityResult {
    #[serde(flatten)]
    pub identity: TrackIdentity,
    pub score: f64,
    pub is_seed: bool,
    pub x: f64,
    pub y: f64,
}

impl SimilarityResult {
    pub fn id(&self) -> &TrackId {
        &self.identity.id
    }

    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// Pista descartada durante la extracción (no fatal para el lote).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DroppedTrack {
    pub id: TrackId,
    pub name: String,
    pub code: String,
    pub reason: String,
}

/// Respuesta de la operación `rank`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RankResponse {
    pub matches: Vec<SimilarityResult>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dropped: Vec<DroppedTrack>,
}

impl RankResponse {
    pub fn seed(&self) -> Option<&SimilarityResult> {
        self.matches.iter().find(|m| m.is_seed)
    }
}
