use tracing::debug;

use crate::matrix::FeatureMatrix;

/// Umbral relativo para considerar una columna sin varianza.
const ZERO_VARIANCE_EPS: f64 = 1e-12;

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedMatrix {
    pub matrix: FeatureMatrix,
    /// Columnas sin varianza; quedan a 0 en todas las filas.
    pub degenerate_columns: Vec<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnStats {
    pub mean: f64,
    pub std: f64,
}

impl ColumnStats {
    /// Media y desviación poblacional de una columna.
    pub fn of(values: impl Iterator<Item = f64> + Clone) -> Self {
        let n = values.clone().count().max(1) as f64;
        let mean = values.clone().sum::<f64>() / n;
        let var = values.map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        ColumnStats { mean, std: var.sqrt() }
    }

    pub fn is_degenerate(&self) -> bool {
        !self.std.is_finite() || self.std <= ZERO_VARIANCE_EPS * self.mean.abs().max(1.0)
    }
}

impl FeatureMatrix {
    /// Z-score por columna. Devuelve una matriz nueva; `self` no cambia.
    pub fn normalize(&self) -> NormalizedMatrix {
        let cols = self.cols();
        let stats: Vec<ColumnStats> = (0..cols).map(|c| ColumnStats::of(self.column(c))).collect();

        let degenerate_columns: Vec<usize> = stats
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_degenerate())
            .map(|(c, _)| c)
            .collect();

        for col in &degenerate_columns {
            debug!(column = col, mean = stats[*col].mean, "columna sin varianza, se fija a 0");
        }

        let column_stats = &stats;
        let values = (0..self.rows())
            .flat_map(move |r| {
                self.row(r)
                    .iter()
                    .zip(column_stats)
                    .map(|(v, s)| if s.is_degenerate() { 0.0 } else { (v - s.mean) / s.std })
            })
            .collect();

        NormalizedMatrix {
            matrix: self.with_values(values),
            degenerate_columns,
        }
    }
}

#[cfg(test)]
mod tests {
    use sonic_core::{FeatureVector, TrackIdentity, TrackRecord};

    use super::*;

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
    fn identical_rows_become_zero() {
        let m = matrix(&[&[120.0, 3000.0, 2.0], &[120.0, 3000.0, 2.0]]);
        let n = m.normalize();
        assert_eq!(n.degenerate_columns, vec![0, 1, 2]);
        assert_eq!(n.matrix.row(0), &[0.0, 0.0, 0.0]);
        assert_eq!(n.matrix.row(1), &[0.0, 0.0, 0.0]);
    }

    #[test]
    fn single_varying_column() {
        let m = matrix(&[&[100.0, 1000.0, 1.0], &[200.0, 1000.0, 1.0]]);
        let n = m.normalize();
        assert_eq!(n.degenerate_columns, vec![1, 2]);
        assert_eq!(n.matrix.row(0), &[-1.0, 0.0, 0.0]);
        assert_eq!(n.matrix.row(1), &[1.0, 0.0, 0.0]);
    }

    #[test]
    fn columns_have_zero_mean_unit_variance() {
        let m = matrix(&[&[1.0, 10.0], &[2.0, 40.0], &[6.0, 10.0], &[3.0, 20.0]]);
        let n = m.normalize();
        assert!(n.degenerate_columns.is_empty());
        for c in 0..2 {
            let stats = ColumnStats::of(n.matrix.column(c));
            assert!(stats.mean.abs() < 1e-12);
            assert!((stats.std - 1.0).abs() < 1e-12);
        }
        // la original no cambia
        assert_eq!(m.row(0), &[1.0, 10.0]);
    }

    #[test]
    fn large_constant_column_is_degenerate() {
        let m = matrix(&[&[1e9, 1.0], &[1e9, 2.0]]);
        assert_eq!(m.normalize().degenerate_columns, vec![0]);
    }
}
