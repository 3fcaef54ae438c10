mod extensions;

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use async_trait::async_trait;
use bytesize::ByteSize;
use sha2::{Digest, Sha256};
use sonic_core::{TrackId, TrackIdentity};
use sonic_probe::AudioSource;
use tracing::{Level, debug, instrument, warn};

pub use extensions::SupportedExtension;

use crate::error::SourceError;
use crate::traits::{CandidateSource, PendingTrack};

/// Candidatas a partir de los archivos de audio de una carpeta (no recursivo).
#[derive(Debug, Clone)]
pub struct LocalFolderSource {
    dir: PathBuf,
    min_file_size: ByteSize,
}

impl LocalFolderSource {
    pub fn new(dir: impl Into<PathBuf>, min_file_size: ByteSize) -> Self {
        LocalFolderSource {
            dir: dir.into(),
            min_file_size,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Identidad de un archivo local: id = hash de la ruta canónica, nombre =
    /// nombre del archivo sin extensión.
    pub fn identity_for(path: &Path) -> TrackIdentity {
        let canonical = dunce::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        let digest = Sha256::digest(canonical.to_string_lossy().as_bytes());
        let id = hex::encode(&digest[..8]);

        let name = path
            .file_stem()
            .unwrap_or_default()
            .to_string_lossy()
            .into_owned();

        TrackIdentity::new(TrackId::new(id), name).with_preview_url(path.to_string_lossy().into_owned())
    }

    #[instrument(level = Level::DEBUG, skip(self), fields(dir = %self.dir.display()), err)]
    pub async fn list_files(&self) -> Result<Vec<PathBuf>, SourceError> {
        let io_err = |source| SourceError::Io {
            path: self.dir.display().to_string(),
            source,
        };

        let md = tokio::fs::metadata(&self.dir).await.map_err(io_err)?;
        if !md.is_dir() {
            return Err(SourceError::NotADirectory(self.dir.display().to_string()));
        }

        let mut entries = tokio::fs::read_dir(&self.dir).await.map_err(io_err)?;
        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(io_err)? {
            let path = entry.path();
            if self.accepts(&path).await {
                files.push(path);
            }
        }

        files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        debug!(found = files.len(), "archivos de audio encontrados");
        Ok(files)
    }

    async fn accepts(&self, path: &Path) -> bool {
        let Some(ext) = path.extension().and_then(OsStr::to_str) else {
            return false;
        };
        if SupportedExtension::from_str(ext).is_err() {
            return false;
        }

        match tokio::fs::metadata(path).await {
            Ok(md) if md.is_file() => {
                if md.len() < self.min_file_size.as_u64() {
                    debug!(path = %path.display(), size = md.len(), "archivo demasiado pequeño, se ignora");
                    return false;
                }
                true
            }
            Ok(_) => false,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "no se pudo leer metadata");
                false
            }
        }
    }
}

#[async_trait]
impl CandidateSource for LocalFolderSource {
    async fn candidates(&self) -> Result<Vec<PendingTrack>, SourceError> {
        let files = self.list_files().await?;
        Ok(files
            .into_iter()
            .map(|path| PendingTrack::candidate(Self::identity_for(&path), AudioSource::File(path)))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(dir: &Path, name: &str, size: usize) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, vec![0u8; size]).unwrap();
        path
    }

    #[tokio::test]
    async fn lists_supported_files_sorted() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "b.mp3", 2048);
        touch(dir.path(), "a.FLAC", 2048);
        touch(dir.path(), "notes.txt", 2048);
        touch(dir.path(), "tiny.wav", 10);
        std::fs::create_dir(dir.path().join("sub.mp3")).unwrap();

        let source = LocalFolderSource::new(dir.path(), ByteSize::kib(1));
        let tracks = source.candidates().await.unwrap();
        let names: Vec<&str> = tracks.iter().map(|t| t.identity.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert!(tracks.iter().all(|t| !t.is_seed));
    }

    #[test]
    fn identity_is_stable() {
        let dir = tempfile::tempdir().unwrap();
        let path = touch(dir.path(), "Song Title.mp3", 16);
        let a = LocalFolderSource::identity_for(&path);
        let b = LocalFolderSource::identity_for(&path);
        assert_eq!(a.id, b.id);
        assert_eq!(a.id.as_str().len(), 16);
        assert_eq!(a.name, "Song Title");

        let other = touch(dir.path(), "Other.mp3", 16);
        assert_ne!(LocalFolderSource::identity_for(&other).id, a.id);
    }

    #[tokio::test]
    async fn missing_dir_is_an_error() {
        let source = LocalFolderSource::new("/no/such/dir", ByteSize::b(0));
        assert!(matches!(source.candidates().await, Err(SourceError::Io { .. })));
    }
}
