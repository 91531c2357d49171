//! Configuration for Simulation
//!
//! Defines the configuration consumed by the simulation engine and the
//! presenter. A config is supplied once, at construction, and is immutable
//! afterwards. Validation of its contents happens in
//! [`SimulationEngine::new`](crate::engine::SimulationEngine::new).

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{SimulationError, SimulationResult};

/// Delay between two ticks of continuous mode.
pub const DEFAULT_TICK_DELAY_MS: u64 = 50;

/// Tolerance applied to the sum of the expected probabilities.
pub const PROBABILITY_SUM_TOLERANCE: f64 = 1e-9;

//-----------------------------------------------------------------------------
// Configuration Structures
//-----------------------------------------------------------------------------

/// Simulation configuration, usually loaded from a TOML file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Ordered category labels.
    pub categories: Vec<String>,
    /// Expected probability per category, parallel to `categories`.
    pub expected: Vec<f64>,
    /// Number of draws per trial.
    pub sample_size: u64,
    /// Maximum number of trials.
    pub num_trials: u64,
    /// Fixed seed for the random source; entropy-seeded when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    /// Delay between continuous-mode ticks, in milliseconds.
    #[serde(default = "default_tick_delay_ms")]
    pub tick_delay_ms: u64,
    /// Presenter histogram settings.
    #[serde(default)]
    pub histogram: HistogramConfig,
}

/// Range and resolution of the rendered histogram.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramConfig {
    pub min: f64,
    pub max: f64,
    /// Number of bin edges; the histogram has `edges - 1` bins.
    pub edges: usize,
}

fn default_tick_delay_ms() -> u64 {
    DEFAULT_TICK_DELAY_MS
}

impl Default for HistogramConfig {
    fn default() -> Self {
        Self {
            min: 0.0,
            max: 20.0,
            edges: 50,
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            categories: ["low", "medlow", "medhigh", "high"]
                .iter()
                .map(|label| label.to_string())
                .collect(),
            expected: vec![0.25; 4],
            sample_size: 100,
            num_trials: 2000,
            seed: None,
            tick_delay_ms: DEFAULT_TICK_DELAY_MS,
            histogram: HistogramConfig::default(),
        }
    }
}

impl SimulationConfig {
    /// Parse a config from TOML text.
    pub fn from_toml_str(content: &str) -> SimulationResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Read and parse a TOML config file.
    pub fn from_file(path: impl AsRef<Path>) -> SimulationResult<Self> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|source| SimulationError::ConfigFile {
                path: path.to_path_buf(),
                source,
            })?;
        debug!(path = %path.display(), "Loaded simulation config");
        Self::from_toml_str(&content)
    }

    /// Number of categories.
    pub fn category_count(&self) -> usize {
        self.categories.len()
    }

    /// Tick delay as a `Duration`.
    pub fn tick_delay(&self) -> Duration {
        Duration::from_millis(self.tick_delay_ms)
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_num_trials(mut self, num_trials: u64) -> Self {
        self.num_trials = num_trials;
        self
    }

    pub fn with_sample_size(mut self, sample_size: u64) -> Self {
        self.sample_size = sample_size;
        self
    }

    pub fn with_tick_delay_ms(mut self, tick_delay_ms: u64) -> Self {
        self.tick_delay_ms = tick_delay_ms;
        self
    }

    /// Check the histogram settings used by the presenter.
    pub fn validate_histogram(&self) -> SimulationResult<()> {
        let HistogramConfig { min, max, edges } = self.histogram;
        if !(min.is_finite() && max.is_finite()) || min >= max {
            return Err(SimulationError::configuration(format!(
                "histogram range [{min}, {max}] is empty"
            )));
        }
        if edges < 2 {
            return Err(SimulationError::configuration(
                "histogram needs at least 2 edges",
            ));
        }
        Ok(())
    }
}
