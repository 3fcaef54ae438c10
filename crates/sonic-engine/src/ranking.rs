use sonic_core::TrackId;

use crate::matrix::FeatureMatrix;

pub const SEED_SCORE: f64 = 100.0;

/// Fila puntuada, antes de asignarle posición.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedRow {
    pub id: TrackId,
    pub score: f64,
    pub is_seed: bool,
}

/// Coseno entre dos vectores.
///
/// Dos vectores nulos se consideran idénticos (1.0); uno solo nulo no tiene
/// dirección y cuenta como ortogonal (0.0).
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f64>().sqrt();

    match (norm_a == 0.0, norm_b == 0.0) {
        (true, true) => 1.0,
        (true, false) | (false, true) => 0.0,
        _ => (dot / (norm_a * norm_b)).clamp(-1.0, 1.0),
    }
}

/// `[-1, 1]` → `[0, 100]`.
pub fn similarity_to_score(similarity: f64) -> f64 {
    ((similarity + 1.0) / 2.0 * 100.0).clamp(0.0, 100.0)
}

pub fn round_score(score: f64) -> f64 {
    (score * 10.0).round() / 10.0
}

/// Puntúa cada fila contra la semilla y ordena de mayor a menor.
///
/// El orden es estable: a igual puntuación se conserva el orden de filas.
/// La semilla se identifica por id y siempre queda en exactamente 100.0.
pub fn rank_rows(normalized: &FeatureMatrix) -> Vec<RankedRow> {
    let seed_id = normalized.seed_id();
    let seed_row = normalized.row(0);

    let mut ranked: Vec<RankedRow> = normalized
        .iter_rows()
        .map(|(id, row)| {
            let is_seed = id == seed_id;
            let similarity = if is_seed { 1.0 } else { cosine_similarity(seed_row, row) };
            RankedRow {
                id: id.clone(),
                score: round_score(similarity_to_score(similarity)),
                is_seed,
            }
        })
        .collect();

    ranked.sort_by(|a, b| b.score.total_cmp(&a.score));

    for row in ranked.iter_mut().filter(|r| r.is_seed) {
        row.score = SEED_SCORE;
    }
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use sonic_core::{FeatureVector, TrackIdentity, TrackRecord};

    fn matrix(rows: &[&[f64]]) -> FeatureMatrix {
        let records: Vec<TrackRecord> = rows
            .iter()
            .enumerate()
            .map(|(i, r)| TrackRecord {
                identity: TrackIdentity::new(format!("t{i}"), format!("T{i}")),
                features: FeatureVector::new(r.to_vec()),
                is_seed: i == 0,
            })
            .collect();
        FeatureMatrix::from_records(&records).unwrap()
    }

    #[test]
    fn cosine_conventions() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[0.0, 0.0]), 1.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[-3.0, 0.0]), -1.0);
        assert!((cosine_similarity(&[1.0, 2.0], &[2.0, 4.0]) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn score_mapping_and_rounding() {
        assert_eq!(similarity_to_score(1.0), 100.0);
        assert_eq!(similarity_to_score(-1.0), 0.0);
        assert_eq!(similarity_to_score(0.0), 50.0);
        assert_eq!(round_score(87.46), 87.5);
        assert_eq!(round_score(99.99), 100.0);
    }

    #[test]
    fn sorted_descending_with_seed_first() {
        let m = matrix(&[&[1.0, 0.0], &[0.0, 1.0], &[1.0, 0.1], &[-1.0, 0.0]]);
        let ranked = rank_rows(&m);
        let ids: Vec<&str> = ranked.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["t0", "t2", "t1", "t3"]);
        assert_eq!(ranked[0].score, 100.0);
        assert!(ranked[0].is_seed);
        assert_eq!(ranked[2].score, 50.0);
        assert_eq!(ranked[3].score, 0.0);
    }

    #[test]
    fn ties_keep_row_order() {
        let m = matrix(&[&[1.0, 1.0], &[2.0, 2.0], &[3.0, 3.0], &[0.5, 0.5]]);
        let ranked = rank_rows(&m);
        let ids: Vec<&str> = ranked.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["t0", "t1", "t2", "t3"]);
        assert!(ranked.iter().all(|r| r.score == 100.0));
    }
}
