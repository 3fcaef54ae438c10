//! Crate `sonic_paths`: rutas de configuración y caché de sonic

mod errors;
mod fs_utils;
mod paths;

pub use errors::Error;
pub use paths::{ENV_BASE_DIR, SonicPaths};
