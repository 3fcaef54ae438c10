use std::fs::File;
use std::io::{Cursor, ErrorKind};
use std::path::Path;
use std::time::Duration;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{CODEC_TYPE_NULL, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::{MediaSource, MediaSourceStream};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tokio_util::sync::CancellationToken;
use tracing::{Level, debug, instrument, trace, warn};

use super::{AudioBuffer, AudioDecoder, AudioSource};
use crate::error::DecodeError;

/// Decodificador basado en symphonia que entrega siempre audio mono.
///
/// Si `max_duration` está definido se deja de leer paquetes cuando ya hay
/// suficientes muestras; el recorte exacto lo hace [`super::prepare`].
#[derive(Debug, Clone, Default)]
pub struct SymphoniaDecoder {
    pub max_duration: Option<Duration>,
}

impl SymphoniaDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_duration(max_duration: Duration) -> Self {
        SymphoniaDecoder {
            max_duration: Some(max_duration),
        }
    }

    #[instrument(level = Level::DEBUG, skip(self), err)]
    pub fn decode_file(&self, path: &Path) -> Result<AudioBuffer, DecodeError> {
        self.decode_cancellable(AudioSource::File(path.to_path_buf()), &CancellationToken::new())
    }

    #[instrument(level = Level::DEBUG, skip(self, bytes), fields(len = bytes.len()), err)]
    pub fn decode_bytes(&self, bytes: Vec<u8>, extension: Option<&str>) -> Result<AudioBuffer, DecodeError> {
        self.decode_media(
            Box::new(Cursor::new(bytes)),
            extension,
            &CancellationToken::new(),
        )
    }

    fn decode_media(
        &self,
        media: Box<dyn MediaSource>,
        extension: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<AudioBuffer, DecodeError> {
        let mss = MediaSourceStream::new(media, Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = extension {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
            .map_err(DecodeError::ProbeFormat)?;
        let mut format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or(DecodeError::NoCompatibleTrack)?;

        let track_id = track.id;
        let sample_rate = track.codec_params.sample_rate.ok_or(DecodeError::MissingSampleRate)?;
        let codec = track.codec_params.codec;

        let mut decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|source| DecodeError::CreateDecoder { codec, source })?;

        let limit = self
            .max_duration
            .map(|d| (d.as_secs_f64() * sample_rate as f64).ceil() as usize);

        let mut samples: Vec<f32> = Vec::new();
        let mut sample_buf: Option<SampleBuffer<f32>> = None;

        loop {
            if cancel.is_cancelled() {
                debug!(samples = samples.len(), "decodificación cancelada");
                return Err(DecodeError::Cancelled);
            }
            if limit.is_some_and(|limit| samples.len() >= limit) {
                trace!("duración máxima alcanzada, se detiene la lectura");
                break;
            }

            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(e)) if e.kind() == ErrorKind::UnexpectedEof => break,
                Err(SymphoniaError::ResetRequired) => break,
                Err(e) => return Err(DecodeError::PacketRead(e)),
            };

            if packet.track_id() != track_id {
                continue;
            }

            let decoded = match decoder.decode(&packet) {
                Ok(decoded) => decoded,
                Err(SymphoniaError::DecodeError(msg)) => {
                    warn!(error = msg, "paquete corrupto, se omite");
                    continue;
                }
                Err(SymphoniaError::IoError(e)) if e.kind() == ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(DecodeError::Decoder(e)),
            };

            let spec = *decoded.spec();
            let channels = spec.channels.count();
            let needed = decoded.capacity() as u64;

            // el buffer se recrea si el paquete no entra
            if sample_buf
                .as_ref()
                .is_some_and(|buf| (buf.capacity() as u64) < needed * channels as u64)
            {
                sample_buf = None;
            }
            let buf = sample_buf.get_or_insert_with(|| SampleBuffer::<f32>::new(needed, spec));

            buf.copy_interleaved_ref(decoded);
            let mono = AudioBuffer::from_interleaved(buf.samples(), channels, sample_rate);
            samples.extend_from_slice(&mono.samples);
        }

        if samples.is_empty() {
            return Err(DecodeError::NoSamples);
        }

        debug!(samples = samples.len(), sample_rate, "decodificación completa");
        Ok(AudioBuffer::new(samples, sample_rate))
    }
}

impl AudioDecoder for SymphoniaDecoder {
    fn decode_cancellable(&self, source: AudioSource, cancel: &CancellationToken) -> Result<AudioBuffer, DecodeError> {
        match source {
            AudioSource::Decoded(buffer) => Ok(buffer),
            AudioSource::File(path) => {
                let file = File::open(&path).map_err(|source| DecodeError::FileOpen {
                    path: path.clone(),
                    source,
                })?;
                let extension = path.extension().and_then(|e| e.to_str());
                self.decode_media(Box::new(file), extension, cancel)
            }
            AudioSource::Encoded { bytes, extension } => {
                self.decode_media(Box::new(Cursor::new(bytes)), extension.as_deref(), cancel)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_sine_wav(path: &Path, sample_rate: u32, channels: u16, seconds: f32) {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        let total = (sample_rate as f32 * seconds) as usize;
        for n in 0..total {
            let s = (2.0 * std::f32::consts::PI * 440.0 * n as f32 / sample_rate as f32).sin() * 0.5;
            for _ in 0..channels {
                writer.write_sample((s * i16::MAX as f32) as i16).unwrap();
            }
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn decodes_stereo_wav_to_mono() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        write_sine_wav(&path, 8000, 2, 1.0);

        let buffer = SymphoniaDecoder::new().decode(AudioSource::File(path)).unwrap();
        assert_eq!(buffer.sample_rate, 8000);
        assert_eq!(buffer.len(), 8000);
        assert!((buffer.peak() - 0.5).abs() < 0.01);
    }

    #[test]
    fn decodes_encoded_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        write_sine_wav(&path, 16000, 1, 0.5);
        let bytes = std::fs::read(&path).unwrap();

        let buffer = SymphoniaDecoder::new()
            .decode(AudioSource::Encoded {
                bytes,
                extension: Some("wav".into()),
            })
            .unwrap();
        assert_eq!(buffer.sample_rate, 16000);
        assert_eq!(buffer.len(), 8000);
    }

    #[test]
    fn max_duration_stops_reading_early() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("long.wav");
        write_sine_wav(&path, 8000, 1, 4.0);

        let buffer = SymphoniaDecoder::with_max_duration(Duration::from_secs(1))
            .decode_file(&path)
            .unwrap();
        assert!(buffer.len() >= 8000);
        assert!(buffer.len() < 32000);
    }

    #[test]
    fn garbage_bytes_fail_to_probe() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("noise.mp3");
        let mut file = File::create(&path).unwrap();
        file.write_all(&[0u8; 64]).unwrap();

        let err = SymphoniaDecoder::new().decode_file(&path).unwrap_err();
        assert!(matches!(err, DecodeError::ProbeFormat(_) | DecodeError::NoSamples));
    }

    #[test]
    fn missing_file_is_reported() {
        let err = SymphoniaDecoder::new()
            .decode_file(Path::new("/definitely/not/here.wav"))
            .unwrap_err();
        assert!(matches!(err, DecodeError::FileOpen { .. }));
    }

    #[test]
    fn cancelled_token_stops_decoding() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        write_sine_wav(&path, 8000, 1, 2.0);

        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = SymphoniaDecoder::new()
            .decode_cancellable(AudioSource::File(path.clone()), &cancel)
            .unwrap_err();
        assert!(matches!(err, DecodeError::Cancelled));

        // con el token sin activar el mismo archivo decodifica entero
        let buffer = SymphoniaDecoder::new()
            .decode_cancellable(AudioSource::File(path), &CancellationToken::new())
            .unwrap();
        assert_eq!(buffer.len(), 16000);
    }

    #[test]
    fn decodes_packets_of_varying_channel_layouts() {
        let dir = tempfile::tempdir().unwrap();
        let mono = dir.path().join("mono.wav");
        let stereo = dir.path().join("stereo.wav");
        write_sine_wav(&mono, 8000, 1, 0.5);
        write_sine_wav(&stereo, 8000, 2, 0.5);

        let decoder = SymphoniaDecoder::new();
        let a = decoder.decode_file(&mono).unwrap();
        let b = decoder.decode_file(&stereo).unwrap();
        assert_eq!(a.len(), b.len());
        assert!((a.peak() - b.peak()).abs() < 0.01);
    }
}
