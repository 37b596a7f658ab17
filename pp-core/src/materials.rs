//! Material presets and their YAML loader.
//!
//! A material bundles the coefficients a body factory needs, so scenes can
//! be tuned without recompiling.
//!
//! ## Directory Structure
//!
//! ```text
//! materials/
//! ├── playground.yaml   # default bouncy bodies
//! ├── boundary.yaml     # canvas walls and floor
//! ├── rubber.yaml
//! ├── ice.yaml
//! └── feather.yaml
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::constants;

/// Failure to read or parse a material file.
#[derive(Debug, Error)]
pub enum MaterialError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("material not found: {0}")]
    NotFound(String),
}

/// Surface and bulk coefficients shared by bodies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub name: String,

    /// Mass per unit area
    #[serde(default = "default_density")]
    pub density: f64,

    /// Bounciness in [0, 1]
    #[serde(default = "default_restitution")]
    pub restitution: f64,

    /// Coulomb friction coefficient
    #[serde(default = "default_friction")]
    pub friction: f64,

    /// Velocity damping per second
    #[serde(default)]
    pub air_friction: f64,
}

fn default_density() -> f64 {
    constants::DEFAULT_DENSITY
}

fn default_restitution() -> f64 {
    constants::DEFAULT_RESTITUTION
}

fn default_friction() -> f64 {
    constants::DEFAULT_FRICTION
}

impl Material {
    /// Bodies spawned by the playground buttons.
    pub fn playground() -> Self {
        Self {
            name: "playground".to_string(),
            density: constants::DEFAULT_DENSITY,
            restitution: constants::DEFAULT_RESTITUTION,
            friction: constants::DEFAULT_FRICTION,
            air_friction: 0.0,
        }
    }

    /// Canvas floor and walls. Fully elastic, so under the product rule a
    /// body bounces off them with its own restitution.
    pub fn boundary() -> Self {
        Self {
            name: "boundary".to_string(),
            density: constants::DEFAULT_DENSITY,
            restitution: 1.0,
            friction: constants::DEFAULT_FRICTION,
            air_friction: 0.0,
        }
    }
}

impl Default for Material {
    fn default() -> Self {
        Self::playground()
    }
}

/// Reads `<dir>/<name>.yaml` material files.
pub struct MaterialLoader {
    dir: PathBuf,
}

impl MaterialLoader {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().into(),
        }
    }

    fn path_of(&self, name: &str) -> PathBuf {
        self.dir.join(name).with_extension("yaml")
    }

    /// Load a material by file stem.
    ///
    /// ```ignore
    /// let ice = MaterialLoader::new("materials").load("ice")?;
    /// ```
    pub fn load(&self, name: &str) -> Result<Material, MaterialError> {
        let path = self.path_of(name);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(MaterialError::NotFound(name.to_owned()))
            }
            Err(e) => return Err(e.into()),
        };
        let material = serde_yaml::from_str::<Material>(&text)?;
        tracing::debug!(name, path = %path.display(), "loaded material");
        Ok(material)
    }

    /// Like [`load`](Self::load), but a missing `playground` or `boundary`
    /// file resolves to the built-in preset.
    pub fn load_or_builtin(&self, name: &str) -> Result<Material, MaterialError> {
        match (self.load(name), name) {
            (Err(MaterialError::NotFound(_)), "playground") => Ok(Material::playground()),
            (Err(MaterialError::NotFound(_)), "boundary") => Ok(Material::boundary()),
            (other, _) => other,
        }
    }

    /// Sorted stems of every `.yaml` file in the directory. A missing
    /// directory lists as empty.
    pub fn list(&self) -> Result<Vec<String>, MaterialError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut stems = entries
            .map(|entry| entry.map(|e| e.path()))
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .filter(|path| path.extension().is_some_and(|ext| ext == "yaml"))
            .filter_map(|path| path.file_stem().map(|s| s.to_string_lossy().into_owned()))
            .collect::<Vec<_>>();
        stems.sort();
        Ok(stems)
    }
}

// =============================================================================
// Tests
// =============================================================================
