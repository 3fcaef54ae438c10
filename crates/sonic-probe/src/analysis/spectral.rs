//! Estadísticos espectrales por frame, reducidos a su media.

use super::stft::Spectrogram;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SpectralStats {
    pub centroid: f64,
    pub bandwidth: f64,
    pub rolloff: f64,
}

/// Centroide, ancho de banda (p = 2) y rolloff promediados sobre frames.
///
/// Un frame sin energía aporta 0 a las tres medias.
pub fn spectral_stats(spec: &Spectrogram, rolloff_percent: f64) -> SpectralStats {
    let frames = spec.num_frames();
    if frames == 0 {
        return SpectralStats::default();
    }

    let freqs: Vec<f64> = (0..spec.num_bins()).map(|k| spec.bin_frequency(k)).collect();
    let mut acc = SpectralStats::default();

    for frame in &spec.frames {
        let total: f64 = frame.iter().map(|m| *m as f64).sum();
        if total <= 0.0 {
            continue;
        }

        let centroid = frame
            .iter()
            .zip(&freqs)
            .map(|(m, f)| *m as f64 * f)
            .sum::<f64>()
            / total;

        let variance = frame
            .iter()
            .zip(&freqs)
            .map(|(m, f)| *m as f64 * (f - centroid).powi(2))
            .sum::<f64>()
            / total;

        let threshold = rolloff_percent * total;
        let mut cumulative = 0.0;
        let mut rolloff = freqs.last().copied().unwrap_or(0.0);
        for (m, f) in frame.iter().zip(&freqs) {
            cumulative += *m as f64;
            if cumulative >= threshold {
                rolloff = *f;
                break;
            }
        }

        acc.centroid += centroid;
        acc.bandwidth += variance.sqrt();
        acc.rolloff += rolloff;
    }

    let n = frames as f64;
    SpectralStats {
        centroid: acc.centroid / n,
        bandwidth: acc.bandwidth / n,
        rolloff: acc.rolloff / n,
    }
}

/// Cruces por cero por muestra, promediado sobre los mismos frames de la STFT.
pub fn zero_crossing_rate(samples: &[f32], frame_size: usize, hop_size: usize) -> f64 {
    if frame_size == 0 || samples.len() < frame_size {
        return 0.0;
    }

    let mut total = 0.0;
    let mut frames = 0usize;
    let mut start = 0;
    while start + frame_size <= samples.len() {
        let frame = &samples[start..start + frame_size];
        let crossings = frame
            .windows(2)
            .filter(|w| (w[0] >= 0.0) != (w[1] >= 0.0))
            .count();
        total += crossings as f64 / frame_size as f64;
        frames += 1;
        start += hop_size;
    }

    total / frames as f64
}
