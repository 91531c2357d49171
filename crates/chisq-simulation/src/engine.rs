//! Simulation Engine
//!
//! Owns all trial state: the category set and expected distribution, the trial
//! counter and budget, the statistic history and the most recent observed
//! counts. The engine knows nothing about rendering, input or scheduling.

//-----------------------------------------------------------------------------
// Imports
//-----------------------------------------------------------------------------

use std::collections::HashSet;

use serde::Serialize;
use tracing::{debug, info};

use crate::config::{SimulationConfig, PROBABILITY_SUM_TOLERANCE};
use crate::error::{SimulationError, SimulationResult};
use crate::randomness::SeededRng;
use crate::statistics::{chi_square_statistic, HistorySummary, StatisticBreakdown};

//-----------------------------------------------------------------------------
// Type Definitions
//-----------------------------------------------------------------------------

/// Serializable view of the engine state, for reporting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineSnapshot {
    pub categories: Vec<String>,
    pub expected: Vec<f64>,
    pub sample_size: u64,
    pub trial_budget: u64,
    pub trial_counter: u64,
    pub seed: u64,
    pub complete: bool,
    pub last_observed: Option<Vec<u64>>,
    pub summary: HistorySummary,
    pub history: Vec<f64>,
}

//-----------------------------------------------------------------------------
// Main Engine
//-----------------------------------------------------------------------------

/// Chi-square trial engine.
///
/// `history().len() == trial_counter()` holds after every operation, and the
/// counter never exceeds the budget.
#[derive(Debug)]
pub struct SimulationEngine {
    categories: Vec<String>,
    expected: Vec<f64>,
    expected_counts: Vec<f64>,
    sample_size: u64,
    trial_budget: u64,
    trial_counter: u64,
    history: Vec<f64>,
    last_observed: Option<Vec<u64>>,
    rng: SeededRng,
}

impl SimulationEngine {
    /// Validate `config` and build an engine with the configured random source.
    pub fn new(config: &SimulationConfig) -> SimulationResult<Self> {
        Self::with_rng(config, SeededRng::from_optional_seed(config.seed))
    }

    /// Validate `config` and build an engine drawing from `rng`.
    pub fn with_rng(config: &SimulationConfig, rng: SeededRng) -> SimulationResult<Self> {
        validate(config)?;

        let expected_counts = config
            .expected
            .iter()
            .map(|p| p * config.sample_size as f64)
            .collect();

        info!(
            categories = config.categories.len(),
            sample_size = config.sample_size,
            trial_budget = config.num_trials,
            seed = rng.get_seed(),
            "Simulation engine created"
        );

        Ok(Self {
            categories: config.categories.clone(),
            expected: config.expected.clone(),
            expected_counts,
            sample_size: config.sample_size,
            trial_budget: config.num_trials,
            trial_counter: 0,
            history: Vec::with_capacity(usize::try_from(config.num_trials).unwrap_or(0)),
            last_observed: None,
            rng,
        })
    }

    /// Run one trial, returning its statistic.
    ///
    /// Returns `None` without touching any state once the budget is spent.
    pub fn advance_one_trial(&mut self) -> Option<f64> {
        if self.is_complete() {
            return None;
        }

        let observed = self.rng.multinomial(self.sample_size, &self.expected);
        let statistic = chi_square_statistic(&observed, &self.expected_counts);

        self.history.push(statistic);
        self.trial_counter += 1;
        debug!(
            trial = self.trial_counter,
            statistic,
            observed = ?observed,
            "Trial completed"
        );
        self.last_observed = Some(observed);

        if self.is_complete() {
            info!(trials = self.trial_counter, "Trial budget reached");
        }
        Some(statistic)
    }

    /// Per-category terms of the most recent trial.
    pub fn current_statistic_breakdown(&self) -> SimulationResult<StatisticBreakdown> {
        let observed = self
            .last_observed
            .as_deref()
            .ok_or(SimulationError::NoTrialYet)?;
        Ok(StatisticBreakdown::new(
            &self.categories,
            observed,
            &self.expected_counts,
        ))
    }

    pub fn is_complete(&self) -> bool {
        self.trial_counter >= self.trial_budget
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn expected(&self) -> &[f64] {
        &self.expected
    }

    /// Expected count per category, `p * sample_size`.
    pub fn expected_counts(&self) -> &[f64] {
        &self.expected_counts
    }

    pub fn sample_size(&self) -> u64 {
        self.sample_size
    }

    pub fn trial_budget(&self) -> u64 {
        self.trial_budget
    }

    pub fn trial_counter(&self) -> u64 {
        self.trial_counter
    }

    /// Statistics of all completed trials, oldest first.
    pub fn history(&self) -> &[f64] {
        &self.history
    }

    /// Counts of the most recent trial; `None` before the first one.
    pub fn last_observed(&self) -> Option<&[u64]> {
        self.last_observed.as_deref()
    }

    pub fn degrees_of_freedom(&self) -> u32 {
        u32::try_from(self.categories.len().saturating_sub(1)).unwrap_or(u32::MAX)
    }

    /// Seed of the random source; configure it to replay this run.
    pub fn seed(&self) -> u64 {
        self.rng.get_seed()
    }

    pub fn summary(&self) -> HistorySummary {
        HistorySummary::from_values(&self.history)
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            categories: self.categories.clone(),
            expected: self.expected.clone(),
            sample_size: self.sample_size,
            trial_budget: self.trial_budget,
            trial_counter: self.trial_counter,
            seed: self.seed(),
            complete: self.is_complete(),
            last_observed: self.last_observed.clone(),
            summary: self.summary(),
            history: self.history.clone(),
        }
    }
}

//-----------------------------------------------------------------------------
// Validation
//-----------------------------------------------------------------------------

fn validate(config: &SimulationConfig) -> SimulationResult<()> {
    let k = config.categories.len();
    if k < 2 {
        return Err(SimulationError::configuration(format!(
            "at least 2 categories are required, got {k}"
        )));
    }

    let mut seen = HashSet::with_capacity(k);
    if let Some(duplicate) = config.categories.iter().find(|label| !seen.insert(*label)) {
        return Err(SimulationError::configuration(format!(
            "duplicate category label '{duplicate}'"
        )));
    }

    if config.expected.len() != k {
        return Err(SimulationError::configuration(format!(
            "expected {k} probabilities (one per category), got {}",
            config.expected.len()
        )));
    }

    if let Some((index, p)) = config
        .expected
        .iter()
        .enumerate()
        .find(|(_, p)| !p.is_finite() || **p <= 0.0)
    {
        return Err(SimulationError::configuration(format!(
            "probability for '{}' must be positive and finite, got {p}",
            config.categories[index]
        )));
    }

    let sum: f64 = config.expected.iter().sum();
    if (sum - 1.0).abs() > PROBABILITY_SUM_TOLERANCE {
        return Err(SimulationError::configuration(format!(
            "expected probabilities must sum to 1, got {sum}"
        )));
    }

    if config.sample_size == 0 {
        return Err(SimulationError::configuration(
            "sample_size must be positive",
        ));
    }
    if config.num_trials == 0 {
        return Err(SimulationError::configuration(
            "num_trials must be positive",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(expected: Vec<f64>) -> SimulationConfig {
        SimulationConfig {
            categories: (0..expected.len()).map(|i| format!("c{i}")).collect(),
            expected,
            ..SimulationConfig::default()
        }
        .with_seed(7)
    }

    #[test]
    fn test_fresh_engine_state() {
        let engine = SimulationEngine::new(&SimulationConfig::default()).unwrap();
        assert_eq!(engine.trial_counter(), 0);
        assert!(engine.history().is_empty());
        assert!(!engine.is_complete());
        assert!(engine.last_observed().is_none());
        assert_eq!(engine.trial_budget(), 2000);
        assert_eq!(engine.degrees_of_freedom(), 3);
        assert_eq!(engine.expected_counts(), &[25.0; 4]);
    }

    #[test]
    fn test_breakdown_before_first_trial() {
        let engine = SimulationEngine::new(&SimulationConfig::default()).unwrap();
        assert!(matches!(
            engine.current_statistic_breakdown(),
            Err(SimulationError::NoTrialYet)
        ));
    }

    #[test]
    fn test_rejects_bad_sums() {
        for expected in [vec![0.2, 0.2, 0.25, 0.25], vec![0.3, 0.3, 0.25, 0.25]] {
            let err = SimulationEngine::new(&config(expected)).unwrap_err();
            assert!(matches!(err, SimulationError::Configuration(_)), "{err}");
        }
    }

    #[test]
    fn test_accepts_sum_within_tolerance() {
        assert!(SimulationEngine::new(&config(vec![0.1, 0.2, 0.3, 0.4])).is_ok());
        assert!(SimulationEngine::new(&config(vec![1.0 / 3.0; 3])).is_ok());
    }

    #[test]
    fn test_rejects_length_mismatch() {
        let mut cfg = SimulationConfig::default();
        cfg.expected = vec![0.5, 0.5];
        assert!(SimulationEngine::new(&cfg).unwrap_err().is_configuration());
    }

    #[test]
    fn test_rejects_degenerate_configs() {
        let mut cfg = config(vec![1.0]);
        assert!(SimulationEngine::new(&cfg).is_err());

        cfg = config(vec![0.5, 0.5, 0.0]);
        assert!(SimulationEngine::new(&cfg).is_err());

        cfg = config(vec![1.5, -0.5]);
        assert!(SimulationEngine::new(&cfg).is_err());

        cfg = config(vec![0.5, f64::NAN]);
        assert!(SimulationEngine::new(&cfg).is_err());

        cfg = config(vec![0.5, 0.5]);
        cfg.categories = vec!["same".into(), "same".into()];
        assert!(SimulationEngine::new(&cfg).is_err());

        assert!(SimulationEngine::new(&config(vec![0.5, 0.5]).with_sample_size(0)).is_err());
        assert!(SimulationEngine::new(&config(vec![0.5, 0.5]).with_num_trials(0)).is_err());
    }

    #[test]
    fn test_advance_updates_state() {
        let mut engine = SimulationEngine::new(&config(vec![0.25; 4])).unwrap();
        let statistic = engine.advance_one_trial().unwrap();

        assert_eq!(engine.trial_counter(), 1);
        assert_eq!(engine.history(), &[statistic]);
        assert!(statistic >= 0.0);

        let observed = engine.last_observed().unwrap();
        assert_eq!(observed.len(), 4);
        assert_eq!(observed.iter().sum::<u64>(), 100);

        let breakdown = engine.current_statistic_breakdown().unwrap();
        assert!((breakdown.statistic - statistic).abs() < 1e-9);
        assert_eq!(breakdown.observed_total(), 100);
        assert_eq!(breakdown.terms[0].label, "c0");
    }

    #[test]
    fn test_advance_past_budget_is_noop() {
        let mut engine =
            SimulationEngine::new(&config(vec![0.5, 0.5]).with_num_trials(2)).unwrap();
        assert!(engine.advance_one_trial().is_some());
        assert!(engine.advance_one_trial().is_some());
        assert!(engine.is_complete());

        let before = engine.snapshot();
        assert!(engine.advance_one_trial().is_none());
        assert_eq!(engine.snapshot(), before);
    }

    #[test]
    fn test_same_seed_same_history() {
        let cfg = config(vec![0.1, 0.2, 0.7]).with_num_trials(50);
        let mut a = SimulationEngine::new(&cfg).unwrap();
        let mut b = SimulationEngine::new(&cfg).unwrap();
        while a.advance_one_trial().is_some() {}
        while b.advance_one_trial().is_some() {}
        assert_eq!(a.history(), b.history());
        assert_eq!(a.seed(), 7);
    }

    #[test]
    fn test_snapshot_serializes() {
        let mut engine = SimulationEngine::new(&config(vec![0.5, 0.5])).unwrap();
        engine.advance_one_trial();
        let json = serde_json::to_value(engine.snapshot()).unwrap();
        assert_eq!(json["trial_counter"], 1);
        assert_eq!(json["history"].as_array().unwrap().len(), 1);
        assert_eq!(json["last_observed"].as_array().unwrap().len(), 2);
    }
}
