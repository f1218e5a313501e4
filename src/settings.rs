use crate::core::{Bounds, ParameterVector};
use crate::optimizer::OptimizerOptions;
use crate::simulation::SimulationDefaults;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Failed to read settings file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid settings: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Initial guess lies outside the bounds: {0}")]
    InitialGuessOutOfBounds(ParameterVector),
}

/// Everything a run reads, loadable from JSON
///
/// Missing fields take the fixed defaults, so `{}` describes the standard run.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub options: OptimizerOptions,
    pub bounds: Bounds,
    pub initial_guess: ParameterVector,
    pub simulation: SimulationDefaults,
}

impl Settings {
    pub fn from_json_str(json: &str) -> Result<Self, SettingsError> {
        let settings: Self = serde_json::from_str(json)?;
        settings.check()?;
        Ok(settings)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Reject settings the optimizer cannot start from
    pub fn check(&self) -> Result<(), SettingsError> {
        if !self.initial_guess.is_within(&self.bounds) {
            return Err(SettingsError::InitialGuessOutOfBounds(self.initial_guess));
        }
        Ok(())
    }
}
