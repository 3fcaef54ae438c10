use sonic_core::{FEATURE_DIM, FeatureDimension, FeatureVector, TIMBRE_COEFFICIENTS};
use tokio_util::sync::CancellationToken;
use tracing::{Level, instrument, trace};

use super::chroma::ChromaMap;
use super::mfcc::{Dct, MelFilterBank, mean_mfcc};
use super::spectral::{spectral_stats, zero_crossing_rate};
use super::stft::Stft;
use super::tempo::{TempoRange, estimate_tempo, onset_envelope};
use super::{AnalysisConfig, AnalysisError};
use crate::audio::{AudioBuffer, prepare::prepare};

/// Convierte un buffer decodificado en un [`FeatureVector`] de
/// [`FEATURE_DIM`] dimensiones.
///
/// Todo lo que depende sólo de la configuración (plan de FFT, ventana,
/// filtros mel, DCT, mapa de croma) se precalcula en [`SignalFeatureExtractor::new`];
/// la instancia es `Send + Sync` y puede compartirse entre workers.
/// `extract` es una función pura del buffer y la configuración.
#[derive(Debug, Clone)]
pub struct SignalFeatureExtractor {
    config: AnalysisConfig,
    stft: Stft,
    mel: MelFilterBank,
    dct: Dct,
    chroma: ChromaMap,
}

impl SignalFeatureExtractor {
    pub fn new(config: AnalysisConfig) -> Result<Self, AnalysisError> {
        config.validate()?;

        let stft = Stft::new(config.frame_size, config.hop_size);
        let mel = MelFilterBank::new(config.n_mels, config.sample_rate, config.frame_size);
        let dct = Dct::new(config.n_mfcc, config.n_mels);
        let chroma = ChromaMap::new(config.sample_rate, config.frame_size);

        Ok(SignalFeatureExtractor {
            config,
            stft,
            mel,
            dct,
            chroma,
        })
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Extrae el vector completo o falla; nunca devuelve un vector parcial.
    pub fn extract(&self, buffer: AudioBuffer) -> Result<FeatureVector, AnalysisError> {
        self.extract_cancellable(buffer, &CancellationToken::new())
    }

    /// Igual que [`extract`](Self::extract), pero abandona con
    /// [`AnalysisError::Cancelled`] en cuanto `cancel` se activa.
    #[instrument(level = Level::DEBUG, skip_all, fields(samples = buffer.len(), sample_rate = buffer.sample_rate), err)]
    pub fn extract_cancellable(
        &self,
        buffer: AudioBuffer,
        cancel: &CancellationToken,
    ) -> Result<FeatureVector, AnalysisError> {
        let cfg = &self.config;
        let prepared = prepare(buffer, cfg, cancel)?;
        let samples = &prepared.samples;

        let spec = self.stft.magnitudes(samples, prepared.sample_rate, cancel)?;
        trace!(frames = spec.num_frames(), "espectrograma calculado");
        if cancel.is_cancelled() {
            return Err(AnalysisError::Cancelled);
        }

        let log_mel = self.mel.log_mel(&spec);
        let envelope = onset_envelope(&log_mel);
        let tempo = estimate_tempo(
            &envelope,
            cfg.frame_rate(),
            TempoRange {
                min_bpm: cfg.min_bpm,
                max_bpm: cfg.max_bpm,
                start_bpm: cfg.start_bpm,
            },
        );

        let stats = spectral_stats(&spec, cfg.rolloff_percent);
        let zcr = zero_crossing_rate(samples, cfg.frame_size, cfg.hop_size);
        let harmonic = self.chroma.harmonic_content(&spec);
        let mfcc = mean_mfcc(&log_mel, &self.dct, cfg.n_mfcc);

        let mut values = Vec::with_capacity(FEATURE_DIM);
        values.extend([tempo, stats.centroid, stats.bandwidth, stats.rolloff, zcr, harmonic]);
        values.extend(mfcc.iter().take(TIMBRE_COEFFICIENTS));

        let vector = FeatureVector::new(values);
        if let Some(index) = vector.first_non_finite() {
            let dimension = FeatureDimension::from_index(index).unwrap_or(FeatureDimension::Timbre(index));
            return Err(AnalysisError::NonFiniteFeature(dimension));
        }

        trace!(tempo, centroid = stats.centroid, "características extraídas");
        Ok(vector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: u32 = 22_050;

    fn extractor() -> SignalFeatureExtractor {
        SignalFeatureExtractor::new(AnalysisConfig::default()).unwrap()
    }

    fn sine(freq: f32, seconds: f32) -> AudioBuffer {
        let len = (SR as f32 * seconds) as usize;
        let samples = (0..len)
            .map(|n| (2.0 * std::f32::consts::PI * freq * n as f32 / SR as f32).sin() * 0.5)
            .collect();
        AudioBuffer::new(samples, SR)
    }

    /// Ráfagas de 1 kHz con caída exponencial cada `60 / bpm` segundos.
    fn click_track(bpm: f32, seconds: f32) -> AudioBuffer {
        let len = (SR as f32 * seconds) as usize;
        let period = (SR as f32 * 60.0 / bpm) as usize;
        let burst = SR as usize / 50;
        let samples = (0..len)
            .map(|n| {
                let offset = n % period;
                if offset < burst {
                    let t = offset as f32 / SR as f32;
                    (2.0 * std::f32::consts::PI * 1000.0 * t).sin() * (-t * 200.0).exp()
                } else {
                    0.0
                }
            })
            .collect();
        AudioBuffer::new(samples, SR)
    }

    #[test]
    fn produces_all_dimensions_in_order() {
        let features = extractor().extract(sine(440.0, 2.0)).unwrap();
        assert_eq!(features.len(), FEATURE_DIM);
        assert!(features.iter().all(|v| v.is_finite()));

        let centroid = features.get(FeatureDimension::SpectralCentroid).unwrap();
        assert!((centroid - 440.0).abs() < 80.0, "centroid {centroid}");
    }

    #[test]
    fn brighter_signal_has_higher_centroid() {
        let ex = extractor();
        let low = ex.extract(sine(300.0, 2.0)).unwrap();
        let high = ex.extract(sine(3000.0, 2.0)).unwrap();
        let dim = FeatureDimension::SpectralCentroid;
        assert!(high.get(dim).unwrap() > low.get(dim).unwrap());

        let zcr = FeatureDimension::ZeroCrossingRate;
        assert!(high.get(zcr).unwrap() > low.get(zcr).unwrap());
    }

    #[test]
    fn click_track_tempo_is_close_to_120() {
        let features = extractor().extract(click_track(120.0, 12.0)).unwrap();
        let tempo = features.get(FeatureDimension::Tempo).unwrap();
        assert!((tempo - 120.0).abs() <= 12.0, "tempo {tempo}");
    }

    #[test]
    fn steady_tone_has_zero_or_finite_tempo() {
        let features = extractor().extract(sine(440.0, 3.0)).unwrap();
        let tempo = features.get(FeatureDimension::Tempo).unwrap();
        assert!(tempo.is_finite() && tempo >= 0.0);
    }

    #[test]
    fn extraction_is_deterministic() {
        let ex = extractor();
        let buffer = click_track(100.0, 4.0);
        let a = ex.extract(buffer.clone()).unwrap();
        let b = ex.extract(buffer).unwrap();
        let bits = |v: &FeatureVector| v.iter().map(|x| x.to_bits()).collect::<Vec<_>>();
        assert_eq!(bits(&a), bits(&b));
    }

    #[test]
    fn silent_and_empty_buffers_fail() {
        let ex = extractor();
        assert_eq!(
            ex.extract(AudioBuffer::new(Vec::new(), SR)),
            Err(AnalysisError::EmptyBuffer)
        );
        assert!(matches!(
            ex.extract(AudioBuffer::new(vec![0.0; SR as usize], SR)),
            Err(AnalysisError::Silent { .. })
        ));
    }

    #[test]
    fn resamples_other_rates() {
        let samples = (0..44_100)
            .map(|n| (2.0 * std::f32::consts::PI * 440.0 * n as f32 / 44_100.0).sin() * 0.5)
            .collect();
        let features = extractor().extract(AudioBuffer::new(samples, 44_100)).unwrap();
        let centroid = features.get(FeatureDimension::SpectralCentroid).unwrap();
        assert!((centroid - 440.0).abs() < 80.0, "centroid {centroid}");
    }

    #[test]
    fn invalid_config_is_rejected() {
        let cfg = AnalysisConfig {
            hop_size: 0,
            ..Default::default()
        };
        assert!(SignalFeatureExtractor::new(cfg).is_err());
    }

    #[test]
    fn loud_tail_after_the_window_is_still_silent() {
        let mut samples = vec![0.0f32; 31 * SR as usize];
        samples.extend(sine(440.0, 1.0).samples);
        assert!(matches!(
            extractor().extract(AudioBuffer::new(samples, SR)),
            Err(AnalysisError::Silent { .. })
        ));
    }

    #[test]
    fn cancelled_extraction_returns_no_vector() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert_eq!(
            extractor().extract_cancellable(sine(440.0, 2.0), &cancel),
            Err(AnalysisError::Cancelled)
        );
    }
}
