use super::stft::{Spectrogram, bin_frequency};

const LOG_FLOOR: f64 = 1e-10;

// escala mel de Slaney: lineal hasta 1 kHz y logarítmica por encima
const F_SP: f64 = 200.0 / 3.0;
const MIN_LOG_HZ: f64 = 1000.0;
const MIN_LOG_MEL: f64 = MIN_LOG_HZ / F_SP;

fn log_step() -> f64 {
    6.4f64.ln() / 27.0
}

pub fn hz_to_mel(hz: f64) -> f64 {
    if hz < MIN_LOG_HZ {
        hz / F_SP
    } else {
        MIN_LOG_MEL + (hz / MIN_LOG_HZ).ln() / log_step()
    }
}

pub fn mel_to_hz(mel: f64) -> f64 {
    if mel < MIN_LOG_MEL {
        mel * F_SP
    } else {
        MIN_LOG_HZ * (log_step() * (mel - MIN_LOG_MEL)).exp()
    }
}

/// Banco de filtros triangulares mel con normalización de área (Slaney).
#[derive(Debug, Clone)]
pub struct MelFilterBank {
    weights: Vec<Vec<f64>>,
}

impl MelFilterBank {
    pub fn new(n_mels: usize, sample_rate: u32, frame_size: usize) -> Self {
        let bins = frame_size / 2 + 1;
        let nyquist = sample_rate as f64 / 2.0;
        let mel_max = hz_to_mel(nyquist);

        let edges: Vec<f64> = (0..n_mels + 2)
            .map(|i| mel_to_hz(mel_max * i as f64 / (n_mels + 1) as f64))
            .collect();
        let freqs: Vec<f64> = (0..bins).map(|k| bin_frequency(k, sample_rate, frame_size)).collect();

        let weights = (0..n_mels)
            .map(|m| {
                let (lo, center, hi) = (edges[m], edges[m + 1], edges[m + 2]);
                let norm = 2.0 / (hi - lo);
                freqs
                    .iter()
                    .map(|f| {
                        let rising = (f - lo) / (center - lo);
                        let falling = (hi - f) / (hi - center);
                        rising.min(falling).max(0.0) * norm
                    })
                    .collect()
            })
            .collect();

        MelFilterBank { weights }
    }

    pub fn n_mels(&self) -> usize {
        self.weights.len()
    }

    /// Espectrograma log-mel en dB (potencia), `out[t][band]`.
    pub fn log_mel(&self, spec: &Spectrogram) -> Vec<Vec<f64>> {
        spec.frames
            .iter()
            .map(|frame| {
                self.weights
                    .iter()
                    .map(|filter| {
                        let energy: f64 = filter
                            .iter()
                            .zip(frame)
                            .map(|(w, m)| w * (*m as f64).powi(2))
                            .sum();
                        10.0 * energy.max(LOG_FLOOR).log10()
                    })
                    .collect()
            })
            .collect()
    }
}

/// Matriz DCT-II ortonormal de `n_coeffs x n_inputs`.
#[derive(Debug, Clone)]
pub struct Dct {
    basis: Vec<Vec<f64>>,
}

impl Dct {
    pub fn new(n_coeffs: usize, n_inputs: usize) -> Self {
        let n = n_inputs as f64;
        let basis = (0..n_coeffs)
            .map(|k| {
                let scale = if k == 0 { (1.0 / n).sqrt() } else { (2.0 / n).sqrt() };
                (0..n_inputs)
                    .map(|i| scale * (std::f64::consts::PI / n * (i as f64 + 0.5) * k as f64).cos())
                    .collect()
            })
            .collect();
        Dct { basis }
    }

    pub fn apply(&self, input: &[f64]) -> Vec<f64> {
        self.basis
            .iter()
            .map(|row| row.iter().zip(input).map(|(b, x)| b * x).sum())
            .collect()
    }
}

/// Media por coeficiente de los MFCC de cada frame.
pub fn mean_mfcc(log_mel: &[Vec<f64>], dct: &Dct, n_coeffs: usize) -> Vec<f64> {
    let mut acc = vec![0.0; n_coeffs];
    if log_mel.is_empty() {
        return acc;
    }

    for frame in log_mel {
        for (slot, c) in acc.iter_mut().zip(dct.apply(frame)) {
            *slot += c;
        }
    }

    let n = log_mel.len() as f64;
    acc.iter_mut().for_each(|c| *c /= n);
    acc
}
