use std::path::PathBuf;

use symphonia::core::errors::Error as SymphoniaError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Failed to open file: {path}")]
    FileOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to probe audio format")]
    ProbeFormat(#[source] SymphoniaError),

    #[error("No compatible audio track found")]
    NoCompatibleTrack,

    #[error("The track has no sample rate")]
    MissingSampleRate,

    #[error("Failed to create decoder for codec: {codec:?}")]
    CreateDecoder {
        codec: symphonia::core::codecs::CodecType,
        #[source]
        source: SymphoniaError,
    },

    #[error("Failed to read audio packet")]
    PacketRead(#[source] SymphoniaError),

    #[error("Unrecoverable decoder error")]
    Decoder(#[source] SymphoniaError),

    #[error("The stream decoded to zero samples")]
    NoSamples,

    #[error("Decoding was cancelled")]
    Cancelled,
}
