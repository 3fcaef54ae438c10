use super::stft::{Spectrogram, bin_frequency};

const MIN_CHROMA_HZ: f64 = 20.0;
pub const PITCH_CLASSES: usize = 12;

/// Asignación fija bin → clase de altura (0 = C).
#[derive(Debug, Clone)]
pub struct ChromaMap {
    classes: Vec<Option<usize>>,
}

impl ChromaMap {
    pub fn new(sample_rate: u32, frame_size: usize) -> Self {
        let classes = (0..frame_size / 2 + 1)
            .map(|k| {
                let f = bin_frequency(k, sample_rate, frame_size);
                (f >= MIN_CHROMA_HZ).then(|| pitch_class(f))
            })
            .collect();
        ChromaMap { classes }
    }

    /// Media sobre frames y clases del cromagrama normalizado por su máximo.
    pub fn harmonic_content(&self, spec: &Spectrogram) -> f64 {
        if spec.frames.is_empty() {
            return 0.0;
        }

        let mut total = 0.0;
        for frame in &spec.frames {
            let mut chroma = [0.0f64; PITCH_CLASSES];
            for (class, m) in self.classes.iter().zip(frame) {
                if let Some(class) = class {
                    chroma[*class] += (*m as f64).powi(2);
                }
            }

            let max = chroma.iter().copied().fold(0.0, f64::max);
            if max > 0.0 {
                total += chroma.iter().map(|c| c / max).sum::<f64>() / PITCH_CLASSES as f64;
            }
        }

        total / spec.frames.len() as f64
    }
}

/// Clase de altura de una frecuencia (MIDI mod 12).
pub fn pitch_class(freq: f64) -> usize {
    let midi = (12.0 * (freq / 440.0).log2()).round() as i64 + 69;
    midi.rem_euclid(PITCH_CLASSES as i64) as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::stft::Stft;
    use tokio_util::sync::CancellationToken;

    #[test]
    fn reference_pitches() {
        assert_eq!(pitch_class(440.0), 9); // A
        assert_eq!(pitch_class(261.63), 0); // C
        assert_eq!(pitch_class(880.0), 9);
        assert_eq!(pitch_class(30.87), 11); // B0
    }

    #[test]
    fn pure_tone_is_less_harmonic_than_noise_like_signal() {
        let sr = 22_050;
        let stft = Stft::new(2048, 512);
        let map = ChromaMap::new(sr, 2048);

        let tone: Vec<f32> = (0..16_384)
            .map(|n| (2.0 * std::f32::consts::PI * 440.0 * n as f32 / sr as f32).sin())
            .collect();
        // suma de semitonos consecutivos
        let cluster: Vec<f32> = (0..16_384)
            .map(|n| {
                (0..12)
                    .map(|s| {
                        let f = 440.0 * 2f32.powf(s as f32 / 12.0);
                        (2.0 * std::f32::consts::PI * f * n as f32 / sr as f32).sin()
                    })
                    .sum::<f32>()
                    / 12.0
            })
            .collect();

        let tone_h = map.harmonic_content(&stft.magnitudes(&tone, sr, &CancellationToken::new()).unwrap());
        let cluster_h = map.harmonic_content(&stft.magnitudes(&cluster, sr, &CancellationToken::new()).unwrap());
        assert!(tone_h > 0.0 && tone_h <= 1.0);
        assert!(cluster_h > tone_h, "{cluster_h} <= {tone_h}");
    }
}
