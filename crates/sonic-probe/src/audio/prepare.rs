use rubato::{Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction};
use tokio_util::sync::CancellationToken;
use tracing::{Level, debug, instrument};

use super::AudioBuffer;
use crate::analysis::{AnalysisConfig, AnalysisError, SILENCE_PEAK};

/// Deja el buffer listo para el extractor: valida las muestras, recorta a
/// `config.max_duration`, remuestrea a `config.sample_rate` y rellena con
/// ceros hasta un frame como máximo.
///
/// El silencio se comprueba sobre la ventana recortada, que es lo único que
/// llega a analizarse.
#[instrument(level = Level::TRACE, skip_all, fields(samples = buffer.samples.len(), sample_rate = buffer.sample_rate), err)]
pub fn prepare(
    buffer: AudioBuffer,
    config: &AnalysisConfig,
    cancel: &CancellationToken,
) -> Result<AudioBuffer, AnalysisError> {
    if buffer.is_empty() {
        return Err(AnalysisError::EmptyBuffer);
    }
    if buffer.sample_rate == 0 {
        return Err(AnalysisError::InvalidSampleRate(buffer.sample_rate));
    }
    if let Some(index) = buffer.samples.iter().position(|s| !s.is_finite()) {
        return Err(AnalysisError::NonFiniteSample { index });
    }

    let AudioBuffer {
        mut samples,
        sample_rate,
    } = buffer;

    // recorte previo en la frecuencia original para no remuestrear de más
    let source_limit = (config.max_duration.as_secs_f64() * sample_rate as f64).ceil() as usize;
    samples.truncate(source_limit);

    let peak = samples.iter().fold(0.0f32, |acc, s| acc.max(s.abs()));
    if peak < SILENCE_PEAK {
        return Err(AnalysisError::Silent { peak });
    }

    if sample_rate != config.sample_rate {
        samples = resample(samples, sample_rate, config.sample_rate, cancel)?;
    }
    samples.truncate(config.max_samples());

    let required = config.min_samples();
    if samples.len() < required {
        return Err(AnalysisError::TooShort {
            samples: samples.len(),
            required,
        });
    }

    if samples.len() < config.frame_size {
        samples.resize(config.frame_size, 0.0);
    }

    Ok(AudioBuffer::new(samples, config.sample_rate))
}

/// Bloques de entrada del remuestreador; entre bloque y bloque se consulta
/// el token de cancelación.
const RESAMPLE_CHUNK: usize = 4096;

/// Remuestreo sinc por bloques sobre un canal. La salida queda alineada con
/// la entrada (se descarta el retardo del filtro) y mide
/// `ceil(len * to / from)` muestras.
pub fn resample(
    samples: Vec<f32>,
    from: u32,
    to: u32,
    cancel: &CancellationToken,
) -> Result<Vec<f32>, AnalysisError> {
    if samples.is_empty() || from == to {
        return Ok(samples);
    }

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let ratio = to as f64 / from as f64;
    let frames = samples.len();
    let mut resampler = SincFixedIn::<f32>::new(ratio, 1.0, params, RESAMPLE_CHUNK, 1)
        .map_err(|e| AnalysisError::Resample(e.to_string()))?;

    let delay = resampler.output_delay();
    let expected = (frames as f64 * ratio).ceil() as usize;
    let mut resampled: Vec<f32> = Vec::with_capacity(expected + delay + RESAMPLE_CHUNK);

    let mut chunks = samples.chunks_exact(RESAMPLE_CHUNK);
    for chunk in &mut chunks {
        if cancel.is_cancelled() {
            return Err(AnalysisError::Cancelled);
        }
        let block = resampler
            .process(&[chunk][..], None)
            .map_err(|e| AnalysisError::Resample(e.to_string()))?;
        resampled.extend(block.iter().flatten());
    }

    let rest = chunks.remainder();
    if !rest.is_empty() {
        let block = resampler
            .process_partial(Some(&[rest][..]), None)
            .map_err(|e| AnalysisError::Resample(e.to_string()))?;
        resampled.extend(block.iter().flatten());
    }

    // vacía la cola del filtro hasta cubrir el retardo
    while resampled.len() < expected + delay {
        if cancel.is_cancelled() {
            return Err(AnalysisError::Cancelled);
        }
        let block = resampler
            .process_partial(None::<&[&[f32]]>, None)
            .map_err(|e| AnalysisError::Resample(e.to_string()))?;
        let before = resampled.len();
        resampled.extend(block.iter().flatten());
        if resampled.len() == before {
            break;
        }
    }

    resampled.drain(..delay.min(resampled.len()));
    resampled.truncate(expected);
    debug!(from, to, input = frames, output = resampled.len(), "remuestreo completo");
    Ok(resampled)
}
