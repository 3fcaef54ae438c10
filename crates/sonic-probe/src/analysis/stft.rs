use std::sync::Arc;

use apodize::hanning_iter;
use rustfft::{Fft, FftPlanner, num_complex::Complex};
use tokio_util::sync::CancellationToken;

use super::AnalysisError;

/// Espectrograma de magnitudes: `frames[t][k]` con `k` en `0..=frame_size/2`.
#[derive(Debug, Clone)]
pub struct Spectrogram {
    pub frames: Vec<Vec<f32>>,
    pub sample_rate: u32,
    pub frame_size: usize,
}

impl Spectrogram {
    pub fn num_frames(&self) -> usize {
        self.frames.len()
    }

    pub fn num_bins(&self) -> usize {
        self.frame_size / 2 + 1
    }

    /// Frecuencia central (Hz) del bin `k`.
    pub fn bin_frequency(&self, k: usize) -> f64 {
        bin_frequency(k, self.sample_rate, self.frame_size)
    }
}

pub fn bin_frequency(k: usize, sample_rate: u32, frame_size: usize) -> f64 {
    k as f64 * sample_rate as f64 / frame_size as f64
}

/// STFT con ventana Hann; el plan de FFT se calcula una vez y se comparte.
#[derive(Clone)]
pub struct Stft {
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    frame_size: usize,
    hop_size: usize,
}

impl std::fmt::Debug for Stft {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stft")
            .field("frame_size", &self.frame_size)
            .field("hop_size", &self.hop_size)
            .finish()
    }
}

impl Stft {
    pub fn new(frame_size: usize, hop_size: usize) -> Self {
        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(frame_size);
        let window = hanning_iter(frame_size).map(|x| x as f32).collect();
        Stft {
            fft,
            window,
            frame_size,
            hop_size,
        }
    }

    /// Inicio de cada frame completo dentro de `len` muestras.
    pub fn frame_starts(&self, len: usize) -> impl Iterator<Item = usize> + use<> {
        let last = len.checked_sub(self.frame_size);
        let hop = self.hop_size;
        (0..).map(move |i| i * hop).take_while(move |start| last.is_some_and(|last| *start <= last))
    }

    /// Magnitudes frame a frame. Si `cancel` se activa a mitad se descarta
    /// lo calculado.
    pub fn magnitudes(
        &self,
        samples: &[f32],
        sample_rate: u32,
        cancel: &CancellationToken,
    ) -> Result<Spectrogram, AnalysisError> {
        let n = self.frame_size;
        let bins = n / 2 + 1;
        let mut buffer = vec![Complex::new(0.0f32, 0.0); n];
        let mut scratch = vec![Complex::new(0.0f32, 0.0); self.fft.get_inplace_scratch_len()];

        let frames = self
            .frame_starts(samples.len())
            .map(|start| {
                if cancel.is_cancelled() {
                    return Err(AnalysisError::Cancelled);
                }
                let frame = &samples[start..start + n];
                for ((slot, s), w) in buffer.iter_mut().zip(frame).zip(&self.window) {
                    *slot = Complex::new(s * w, 0.0);
                }
                self.fft.process_with_scratch(&mut buffer, &mut scratch);
                Ok(buffer.iter().take(bins).map(|c| c.norm()).collect::<Vec<f32>>())
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Spectrogram {
            frames,
            sample_rate,
            frame_size: n,
        })
    }
}
