pub mod decoder;
pub mod prepare;

use std::path::PathBuf;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::DecodeError;

/// Muestras PCM mono en f32 [-1, 1] con su frecuencia de muestreo.
///
/// El buffer pertenece a la tarea de extracción que lo recibe; nunca se
/// comparte entre tareas.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl AudioBuffer {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        AudioBuffer { samples, sample_rate }
    }

    /// Mezcla frames intercalados a mono promediando canales.
    pub fn from_interleaved(interleaved: &[f32], channels: usize, sample_rate: u32) -> Self {
        let channels = channels.max(1);
        let samples = interleaved
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect();
        AudioBuffer { samples, sample_rate }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.samples.len() as f64 / self.sample_rate as f64)
    }

    /// Amplitud máxima absoluta.
    pub fn peak(&self) -> f32 {
        self.samples.iter().fold(0.0f32, |acc, s| acc.max(s.abs()))
    }
}

/// Origen del audio de una pista: ya decodificado, un fichero local o bytes
/// codificados que entregó el colaborador de adquisición.
#[derive(Debug, Clone)]
pub enum AudioSource {
    Decoded(AudioBuffer),
    File(PathBuf),
    Encoded {
        bytes: Vec<u8>,
        /// Extensión usada como pista para el probe ("mp3", "flac", ...).
        extension: Option<String>,
    },
}

impl AudioSource {
    /// Descripción corta para logs.
    pub fn describe(&self) -> String {
        match self {
            AudioSource::Decoded(buf) => format!("decoded buffer ({} samples)", buf.len()),
            AudioSource::File(path) => path.display().to_string(),
            AudioSource::Encoded { bytes, extension } => format!(
                "encoded bytes ({} bytes, {})",
                bytes.len(),
                extension.as_deref().unwrap_or("unknown format")
            ),
        }
    }
}

impl From<AudioBuffer> for AudioSource {
    fn from(buffer: AudioBuffer) -> Self {
        AudioSource::Decoded(buffer)
    }
}

impl From<PathBuf> for AudioSource {
    fn from(path: PathBuf) -> Self {
        AudioSource::File(path)
    }
}

pub trait AudioDecoder {
    /// Convierte un origen en un buffer mono decodificado. Debe abandonar el
    /// trabajo con [`DecodeError::Cancelled`] en cuanto `cancel` se active.
    fn decode_cancellable(&self, source: AudioSource, cancel: &CancellationToken) -> Result<AudioBuffer, DecodeError>;

    fn decode(&self, source: AudioSource) -> Result<AudioBuffer, DecodeError> {
        self.decode_cancellable(source, &CancellationToken::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interleaved_stereo_is_averaged() {
        let buf = AudioBuffer::from_interleaved(&[1.0, 0.0, 0.5, 0.5, -1.0, 1.0], 2, 8000);
        assert_eq!(buf.samples, vec![0.5, 0.5, 0.0]);
        assert_eq!(buf.sample_rate, 8000);
    }

    #[test]
    fn duration_and_peak() {
        let buf = AudioBuffer::new(vec![0.0, -0.75, 0.25, 0.0], 4);
        assert_eq!(buf.duration(), Duration::from_secs(1));
        assert_eq!(buf.peak(), 0.75);
        assert_eq!(AudioBuffer::new(vec![0.1], 0).duration(), Duration::ZERO);
    }
}
