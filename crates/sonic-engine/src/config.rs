use std::path::{Path, PathBuf};
use std::time::Duration;

use bytesize::ByteSize;
use config::{Config, Environment, File, FileFormat};
use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use sonic_core::Point;
use sonic_probe::AnalysisConfig;
use tracing::{Level, debug, instrument};

use crate::error::ConfigError;

/// Prefijo de las variables de entorno (`SONIC__LAYOUT__SCALE_FACTOR`, ...).
pub const ENV_PREFIX: &str = "SONIC";
const ENV_SEPARATOR: &str = "__";

const MAX_WORKERS: usize = 64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Builder)]
#[builder(setter(into, strip_option), default)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Número fijo de workers; si es `None` se deriva de `cpu_percent`.
    pub workers: Option<usize>,
    /// Porcentaje de CPU a usar (0.0–100.0)
    pub cpu_percent: f32,
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        ExtractionConfig {
            workers: None,
            cpu_percent: 100.0,
            timeout: Duration::from_secs(60),
        }
    }
}

impl ExtractionConfig {
    pub fn worker_count(&self) -> usize {
        match self.workers {
            Some(n) => n.clamp(1, MAX_WORKERS),
            None => {
                let n = (num_cpus::get() as f32 * self.cpu_percent / 100.0).ceil() as usize;
                n.clamp(1, MAX_WORKERS)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Builder)]
#[builder(setter(into), default)]
#[serde(default)]
pub struct LayoutConfig {
    pub center: Point,
    pub scale_factor: f64,
    pub max_distance: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        LayoutConfig {
            center: Point::new(50.0, 50.0),
            scale_factor: 0.4,
            max_distance: 45.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Archivos más pequeños se ignoran al listar una carpeta.
    pub min_file_size: ByteSize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        ScanConfig {
            min_file_size: ByteSize::kib(1),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Builder)]
#[builder(setter(into), default)]
#[serde(default)]
pub struct EngineConfig {
    pub analysis: AnalysisConfig,
    pub extraction: ExtractionConfig,
    pub layout: LayoutConfig,
    pub scan: ScanConfig,
}

impl EngineConfig {
    /// Lee un TOML y lo valida. No aplica variables de entorno.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref().to_string_lossy().into_owned();
        let cfg = Config::builder()
            .add_source(File::new(&path, FileFormat::Toml))
            .build()
            .map_err(ConfigError::Parse)?;
        let engine = cfg.try_deserialize::<EngineConfig>().map_err(ConfigError::Parse)?;
        engine.validate()?;
        Ok(engine)
    }

    /// Defaults ← archivo opcional ← variables `SONIC__*`.
    #[instrument(level = Level::DEBUG, err)]
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            let path = path.to_string_lossy().into_owned();
            builder = builder.add_source(File::new(&path, FileFormat::Toml).required(false));
        }

        let cfg = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator(ENV_SEPARATOR)
                    .separator(ENV_SEPARATOR)
                    .try_parsing(true),
            )
            .build()?;

        let engine: EngineConfig = cfg.try_deserialize()?;
        engine.validate()?;
        debug!(?engine, "configuración cargada");
        Ok(engine)
    }

    /// Usa `<config_dir>/settings.toml` de [`sonic_paths::SonicPaths`].
    pub fn load_default() -> Result<Self, ConfigError> {
        let settings = default_settings_path();
        Self::load(settings.as_deref())
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        std::fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.analysis.validate()?;

        let layout = &self.layout;
        if !(layout.scale_factor.is_finite() && layout.scale_factor > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "layout.scale_factor must be positive, got {}",
                layout.scale_factor
            )));
        }
        if !(layout.max_distance.is_finite() && layout.max_distance > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "layout.max_distance must be positive, got {}",
                layout.max_distance
            )));
        }
        if !(layout.center.x.is_finite() && layout.center.y.is_finite()) {
            return Err(ConfigError::Invalid("layout.center must be finite".into()));
        }

        let extraction = &self.extraction;
        if extraction.timeout.is_zero() {
            return Err(ConfigError::Invalid("extraction.timeout must be greater than zero".into()));
        }
        if extraction.workers == Some(0) {
            return Err(ConfigError::Invalid("extraction.workers must be at least 1".into()));
        }
        if !(extraction.cpu_percent > 0.0 && extraction.cpu_percent <= 100.0) {
            return Err(ConfigError::Invalid(format!(
                "extraction.cpu_percent must be in (0, 100], got {}",
                extraction.cpu_percent
            )));
        }
        Ok(())
    }
}

/// Ruta del settings.toml por defecto, si el directorio de usuario se resuelve.
pub fn default_settings_path() -> Option<PathBuf> {
    sonic_paths::SonicPaths::resolve()
        .ok()
        .map(|paths| paths.settings_file)
}
