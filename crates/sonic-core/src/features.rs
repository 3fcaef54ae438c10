use std::fmt;
use std::ops::Index;

use serde::{Deserialize, Serialize};

/// Cantidad de MFCC (medias) que se conservan como dimensiones de timbre.
pub const TIMBRE_COEFFICIENTS: usize = 5;

/// Dimensiones escalares antes de los coeficientes de timbre.
const SCALAR_DIMENSIONS: usize = 6;

/// Longitud del vector que produce el extractor.
pub const FEATURE_DIM: usize = SCALAR_DIMENSIONS + TIMBRE_COEFFICIENTS;

/// Significado de cada posición del vector, en orden.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeatureDimension {
    Tempo,
    SpectralCentroid,
    SpectralBandwidth,
    SpectralRolloff,
    ZeroCrossingRate,
    HarmonicContent,
    Timbre(usize),
}

impl FeatureDimension {
    /// Orden fijo de las dimensiones del extractor.
    pub fn all() -> impl Iterator<Item = FeatureDimension> {
        [
            FeatureDimension::Tempo,
            FeatureDimension::SpectralCentroid,
            FeatureDimension::SpectralBandwidth,
            FeatureDimension::SpectralRolloff,
            FeatureDimension::ZeroCrossingRate,
            FeatureDimension::HarmonicContent,
        ]
        .into_iter()
        .chain((0..TIMBRE_COEFFICIENTS).map(FeatureDimension::Timbre))
    }

    pub fn index(&self) -> usize {
        match self {
            FeatureDimension::Tempo => 0,
            FeatureDimension::SpectralCentroid => 1,
            FeatureDimension::SpectralBandwidth => 2,
            FeatureDimension::SpectralRolloff => 3,
            FeatureDimension::ZeroCrossingRate => 4,
            FeatureDimension::HarmonicContent => 5,
            FeatureDimension::Timbre(i) => SCALAR_DIMENSIONS + i,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        FeatureDimension::all().nth(index)
    }
}

impl fmt::Display for FeatureDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureDimension::Tempo => f.write_str("tempo"),
            FeatureDimension::SpectralCentroid => f.write_str("spectral_centroid"),
            FeatureDimension::SpectralBandwidth => f.write_str("spectral_bandwidth"),
            FeatureDimension::SpectralRolloff => f.write_str("spectral_rolloff"),
            FeatureDimension::ZeroCrossingRate => f.write_str("zero_crossing_rate"),
            FeatureDimension::HarmonicContent => f.write_str("harmonic_content"),
            FeatureDimension::Timbre(i) => write!(f, "timbre_{i}"),
        }
    }
}

/// Huella numérica de una pista, una entrada por dimensión.
///
/// Todas las filas de un lote deben tener la misma longitud; el constructor de
/// la matriz lo comprueba.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureVector(Vec<f64>);

impl FeatureVector {
    pub fn new(values: Vec<f64>) -> Self {
        FeatureVector(values)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, f64> {
        self.0.iter()
    }

    pub fn get(&self, dimension: FeatureDimension) -> Option<f64> {
        self.0.get(dimension.index()).copied()
    }

    /// Primera dimensión no finita, si la hay.
    pub fn first_non_finite(&self) -> Option<usize> {
        self.0.iter().position(|v| !v.is_finite())
    }

    pub fn into_inner(self) -> Vec<f64> {
        self.0
    }
}

impl From<Vec<f64>> for FeatureVector {
    fn from(values: Vec<f64>) -> Self {
        FeatureVector(values)
    }
}

impl FromIterator<f64> for FeatureVector {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        FeatureVector(iter.into_iter().collect())
    }
}

impl Index<usize> for FeatureVector {
    type Output = f64;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}
