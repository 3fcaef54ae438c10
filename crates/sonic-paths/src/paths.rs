use std::{env, path::PathBuf};

use directories::ProjectDirs;

use crate::{errors::Error, fs_utils};

/// Nombre de la ENV var para override de ruta base (modo “portable”)
pub const ENV_BASE_DIR: &str = "SONIC_BASE_DIR";

/// Rutas que usa sonic: configuración y caché de audio descargado.
#[derive(Debug, Clone)]
pub struct SonicPaths {
    // config_dir
    pub config_dir: PathBuf,
    pub settings_file: PathBuf,

    // cache_dir
    pub cache_dir: PathBuf,
    /// Carpeta donde el colaborador de adquisición deja el audio descargado.
    pub songs_dir: PathBuf,
}

impl SonicPaths {
    pub fn new() -> Result<Self, Error> {
        let paths = Self::resolve()?;

        paths.ensure_structure()?;
        paths.validate_structure()?;

        Ok(paths)
    }

    /// Calcula las rutas sin tocar el sistema de archivos.
    pub fn resolve() -> Result<Self, Error> {
        let (config_dir, cache_dir) = if let Ok(base) = env::var(ENV_BASE_DIR) {
            let b = PathBuf::from(base);
            (b.join("config"), b.join("cache"))
        } else {
            let proj = ProjectDirs::from("com", "Sonic", "Sonic").ok_or(Error::NoHome)?;
            (proj.config_dir().to_path_buf(), proj.cache_dir().to_path_buf())
        };

        Ok(SonicPaths {
            settings_file: config_dir.join("settings.toml"),
            config_dir,
            songs_dir: cache_dir.join("songs"),
            cache_dir,
        })
    }

    /// Se asegura de que los dirs y el fichero de ajustes existen.
    pub fn ensure_structure(&self) -> Result<(), Error> {
        fs_utils::ensure_dir(&self.config_dir)?;
        fs_utils::ensure_dir(&self.cache_dir)?;
        fs_utils::ensure_dir(&self.songs_dir)?;

        // un settings.toml vacío es válido: todos los campos tienen default
        fs_utils::ensure_file(&self.settings_file)?;

        Ok(())
    }

    /// Valida que cada carpeta existe Y es escribible. Si falta, la intenta crear.
    pub fn validate_structure(&self) -> Result<(), Error> {
        for dir in [&self.config_dir, &self.cache_dir, &self.songs_dir] {
            if !dir.exists() {
                fs_utils::ensure_dir(dir)?;
            }
            fs_utils::check_writable(dir)?;
        }
        Ok(())
    }
}
