//! Error types for Simulation
//!
//! This module defines the error types used throughout the simulation crate.
//! Configuration problems surface once, when the engine is built; the only
//! other failure is asking for a breakdown before any trial has run.

//-----------------------------------------------------------------------------
// Error Types
//-----------------------------------------------------------------------------

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for the simulation crate.
#[derive(Error, Debug)]
pub enum SimulationError {
    /// The category set, expected distribution or budgets are invalid.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A per-trial query was made before the first trial completed.
    #[error("No trial has been run yet")]
    NoTrialYet,

    /// The configuration file could not be read.
    #[error("Failed to read config file {path}: {source}")]
    ConfigFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML for a `SimulationConfig`.
    #[error("Failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

impl SimulationError {
    /// Shorthand used by the validation code.
    pub(crate) fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Whether this error came from construction-time validation or config loading.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::Configuration(_) | Self::ConfigFile { .. } | Self::ConfigParse(_)
        )
    }
}

/// Result type alias for simulation operations.
pub type SimulationResult<T> = Result<T, SimulationError>;
