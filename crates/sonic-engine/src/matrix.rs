use std::collections::HashSet;

use sonic_core::{TrackId, TrackRecord};

use crate::error::EngineError;

/// Matriz rectangular de características, semilla en la fila 0.
///
/// Inmutable: las etapas posteriores producen matrices nuevas. La identidad
/// de cada fila se guarda explícitamente, no se deduce de la posición.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    ids: Vec<TrackId>,
    values: Vec<f64>,
    cols: usize,
}

impl FeatureMatrix {
    /// Construye la matriz a partir de los registros extraídos. La semilla es
    /// el registro marcado con `is_seed`; el resto conserva su orden.
    pub fn from_records<'a, I>(records: I) -> Result<Self, EngineError>
    where
        I: IntoIterator<Item = &'a TrackRecord>,
    {
        let mut seed: Option<&TrackRecord> = None;
        let mut others = Vec::new();
        for record in records {
            if record.is_seed {
                if seed.is_some() {
                    return Err(EngineError::InvalidBatch("more than one seed row".into()));
                }
                seed = Some(record);
            } else {
                others.push(record);
            }
        }

        let usable = others.len() + usize::from(seed.is_some());
        let Some(seed) = seed else {
            return Err(EngineError::InsufficientData { usable });
        };
        if usable < 2 {
            return Err(EngineError::InsufficientData { usable });
        }

        let cols = seed.features.len();
        let mut ids = Vec::with_capacity(usable);
        let mut values = Vec::with_capacity(usable * cols);
        let mut seen = HashSet::with_capacity(usable);

        for record in std::iter::once(seed).chain(others) {
            if !seen.insert(record.id()) {
                return Err(EngineError::InvalidBatch(format!("duplicate track id: {}", record.id())));
            }
            if record.features.len() != cols {
                return Err(EngineError::DimensionMismatch {
                    track: record.id().clone(),
                    expected: cols,
                    found: record.features.len(),
                });
            }
            ids.push(record.id().clone());
            values.extend_from_slice(record.features.as_slice());
        }

        Ok(FeatureMatrix { ids, values, cols })
    }

    /// Matriz con los mismos ids y valores nuevos (misma forma).
    pub(crate) fn with_values(&self, values: Vec<f64>) -> Self {
        debug_assert_eq!(values.len(), self.values.len());
        FeatureMatrix {
            ids: self.ids.clone(),
            values,
            cols: self.cols,
        }
    }

    pub fn rows(&self) -> usize {
        self.ids.len()
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn seed_id(&self) -> &TrackId {
        &self.ids[0]
    }

    pub fn ids(&self) -> &[TrackId] {
        &self.ids
    }

    pub fn row(&self, index: usize) -> &[f64] {
        &self.values[index * self.cols..(index + 1) * self.cols]
    }

    pub fn row_by_id(&self, id: &TrackId) -> Option<&[f64]> {
        self.ids.iter().position(|i| i == id).map(|index| self.row(index))
    }

    pub fn column(&self, col: usize) -> impl Iterator<Item = f64> + Clone + '_ {
        self.values.iter().skip(col).step_by(self.cols.max(1)).copied()
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = (&TrackId, &[f64])> {
        self.ids.iter().enumerate().map(|(i, id)| (id, self.row(i)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sonic_core::{FeatureVector, TrackIdentity};

    fn record(id: &str, seed: bool, values: &[f64]) -> TrackRecord {
        TrackRecord {
            identity: TrackIdentity::new(id, id),
            features: FeatureVector::new(values.to_vec()),
            is_seed: seed,
        }
    }

    #[test]
    fn seed_goes_first() {
        let records = vec![
            record("a", false, &[1.0, 2.0]),
            record("s", true, &[3.0, 4.0]),
            record("b", false, &[5.0, 6.0]),
        ];
        let m = FeatureMatrix::from_records(&records).unwrap();
        assert_eq!(m.rows(), 3);
        assert_eq!(m.seed_id().as_str(), "s");
        assert_eq!(m.row(0), &[3.0, 4.0]);
        assert_eq!(m.ids()[1].as_str(), "a");
        assert_eq!(m.column(1).collect::<Vec<_>>(), vec![4.0, 2.0, 6.0]);
        assert_eq!(m.row_by_id(&TrackId::new("b")), Some(&[5.0, 6.0][..]));
    }

    #[test]
    fn singleton_or_seedless_batches_are_insufficient() {
        let only_seed = vec![record("s", true, &[1.0])];
        assert!(matches!(
            FeatureMatrix::from_records(&only_seed),
            Err(EngineError::InsufficientData { usable: 1 })
        ));

        let no_seed = vec![record("a", false, &[1.0]), record("b", false, &[2.0])];
        assert!(matches!(
            FeatureMatrix::from_records(&no_seed),
            Err(EngineError::InsufficientData { usable: 2 })
        ));
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let records = vec![record("s", true, &[1.0, 2.0]), record("a", false, &[1.0])];
        let err = FeatureMatrix::from_records(&records).unwrap_err();
        assert_eq!(err.code(), "DIMENSION_MISMATCH");
    }

    #[test]
    fn repeated_ids_are_an_invalid_batch() {
        let records = vec![
            record("s", true, &[1.0, 2.0]),
            record("a", false, &[3.0, 4.0]),
            record("a", false, &[5.0, 6.0]),
        ];
        let err = FeatureMatrix::from_records(&records).unwrap_err();
        assert_eq!(err.code(), "INVALID_BATCH");

        let seed_twice = vec![record("s", true, &[1.0]), record("s", false, &[2.0])];
        assert!(matches!(
            FeatureMatrix::from_records(&seed_twice),
            Err(EngineError::InvalidBatch(_))
        ));
    }

    #[test]
    fn column_iterator_can_be_walked_twice() {
        let records = vec![record("s", true, &[1.0, 10.0]), record("a", false, &[3.0, 30.0])];
        let m = FeatureMatrix::from_records(&records).unwrap();
        let col = m.column(1);
        let count = col.clone().count();
        assert_eq!(count, 2);
        assert_eq!(col.sum::<f64>(), 40.0);
    }
}
