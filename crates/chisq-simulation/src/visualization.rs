//! Text rendering of simulation state.
//!
//! The presenter only reads from a [`SimulationEngine`]; it never mutates it.
//! It draws the histogram of accumulated statistics, overlays the theoretical
//! chi-square frequencies once the trial budget is spent, and formats the
//! calculation for the most recent trial.

use std::fmt::Write as _;

use crate::config::HistogramConfig;
use crate::engine::SimulationEngine;
use crate::statistics::{expected_frequency_curve, Histogram};

const TITLE: &str = "Chi-Square Simulation";
const BAR: char = '#';
const CURVE: char = '*';
const MIN_Y_LIMIT: u32 = 10;

/// Renders a fixed-size text chart of an engine's statistic history.
#[derive(Debug, Clone)]
pub struct ChartRenderer {
    histogram: HistogramConfig,
    height: usize,
}

impl ChartRenderer {
    pub fn new(histogram: HistogramConfig) -> Self {
        Self {
            histogram,
            height: 15,
        }
    }

    pub fn with_height(mut self, height: usize) -> Self {
        self.height = height.max(1);
        self
    }

    /// Histogram of the engine's history over the configured range.
    pub fn histogram(&self, engine: &SimulationEngine) -> Histogram {
        let mut hist =
            Histogram::linspace(self.histogram.min, self.histogram.max, self.histogram.edges);
        hist.fill(engine.history());
        hist
    }

    /// Y-axis limit: at least 10, otherwise one above the tallest bar.
    pub fn y_limit(hist: &Histogram) -> u32 {
        MIN_Y_LIMIT.max(hist.max_count() + 1)
    }

    /// Expected count per bin, present only once the engine is complete.
    pub fn overlay(&self, engine: &SimulationEngine, hist: &Histogram) -> Option<Vec<f64>> {
        if !engine.is_complete() {
            return None;
        }
        let width = hist.bin_width();
        let curve = expected_frequency_curve(
            engine.degrees_of_freedom(),
            engine.history().len(),
            width,
            hist.bin_center(0),
            hist.bin_center(hist.bin_count() - 1),
            hist.bin_count(),
        );
        Some(curve.into_iter().map(|(_, frequency)| frequency).collect())
    }

    /// Full frame: title, calculation panel, chart, axis and legend.
    pub fn render(&self, engine: &SimulationEngine) -> String {
        let hist = self.histogram(engine);
        let y_limit = f64::from(Self::y_limit(&hist));
        let overlay = self.overlay(engine, &hist);
        let rows = self.height;

        let bar_rows: Vec<usize> = hist
            .counts
            .iter()
            .map(|&count| scale_to_rows(f64::from(count), y_limit, rows))
            .collect();
        let curve_rows: Option<Vec<usize>> = overlay.as_ref().map(|values| {
            values
                .iter()
                .map(|&value| scale_to_rows(value, y_limit, rows))
                .collect()
        });

        let mut out = String::new();
        let _ = writeln!(out, "{TITLE}");
        if let Some(panel) = render_calculation_panel(engine) {
            for line in panel.lines() {
                let _ = writeln!(out, "  | {line}");
            }
        }
        let _ = writeln!(out);

        for row in (1..=rows).rev() {
            let label = if row == rows {
                format!("{:>5}", y_limit as u32)
            } else {
                " ".repeat(5)
            };
            let mut line = format!("{label} |");
            for (bin, &bar) in bar_rows.iter().enumerate() {
                let on_curve = curve_rows
                    .as_ref()
                    .is_some_and(|curve| curve[bin] == row);
                line.push(if on_curve {
                    CURVE
                } else if bar >= row {
                    BAR
                } else {
                    ' '
                });
            }
            let _ = writeln!(out, "{}", line.trim_end());
        }

        let bins = hist.bin_count();
        let _ = writeln!(out, "{:>5} +{}", 0, "-".repeat(bins));
        let min_label = format!("{}", self.histogram.min);
        let max_label = format!("{}", self.histogram.max);
        let gap = (bins + 1).saturating_sub(min_label.len() + max_label.len());
        let _ = writeln!(out, "{}{min_label}{}{max_label}", " ".repeat(7), " ".repeat(gap));
        let _ = writeln!(out, "{}Chi-Square Statistic (y: Frequency)", " ".repeat(7));

        let _ = write!(out, "{BAR} Simulated Chi-Square Stats");
        if overlay.is_some() {
            let _ = write!(
                out,
                "   {CURVE} Chi-Square PDF (df={})",
                engine.degrees_of_freedom()
            );
        }
        let _ = writeln!(out);
        out
    }
}

impl Default for ChartRenderer {
    fn default() -> Self {
        Self::new(HistogramConfig::default())
    }
}

fn scale_to_rows(value: f64, y_limit: f64, rows: usize) -> usize {
    if !value.is_finite() {
        return if value > 0.0 { rows } else { 0 };
    }
    let scaled = (value / y_limit * rows as f64).round();
    (scaled.max(0.0) as usize).min(rows)
}

/// Calculation for the most recent trial; `None` before the first trial.
///
/// ```text
/// Trial 3/2000
/// low: 27
/// ...
/// Chi² = 1.040
/// = ((27-25.0)²/25.0) + ...
/// ```
pub fn render_calculation_panel(engine: &SimulationEngine) -> Option<String> {
    let breakdown = engine.current_statistic_breakdown().ok()?;

    let mut lines = vec![format!(
        "Trial {}/{}",
        engine.trial_counter(),
        engine.trial_budget()
    )];
    lines.extend(
        breakdown
            .terms
            .iter()
            .map(|term| format!("{}: {}", term.label, term.observed)),
    );
    lines.push(format!("Chi² = {:.3}", breakdown.statistic));
    let calculation = breakdown
        .terms
        .iter()
        .map(|term| {
            format!(
                "(({}-{:.1})²/{:.1})",
                term.observed, term.expected, term.expected
            )
        })
        .collect::<Vec<_>>()
        .join(" + ");
    lines.push(format!("= {calculation}"));
    Some(lines.join("\n"))
}

/// One-line progress summary.
pub fn render_progress_line(engine: &SimulationEngine) -> String {
    let last = engine
        .history()
        .last()
        .map_or_else(|| "-".to_string(), |stat| format!("{stat:.3}"));
    let summary = engine.summary();
    format!(
        "trial {}/{}  chi2={}  mean={:.3}  var={:.3}",
        engine.trial_counter(),
        engine.trial_budget(),
        last,
        summary.mean,
        summary.variance
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimulationConfig;

    fn engine(num_trials: u64) -> SimulationEngine {
        SimulationEngine::new(
            &SimulationConfig::default()
                .with_num_trials(num_trials)
                .with_seed(5),
        )
        .unwrap()
    }

    #[test]
    fn test_panel_absent_before_first_trial() {
        assert!(render_calculation_panel(&engine(3)).is_none());
    }

    #[test]
    fn test_panel_layout() {
        let mut engine = engine(3);
        engine.advance_one_trial();
        let panel = render_calculation_panel(&engine).unwrap();
        let lines: Vec<&str> = panel.lines().collect();

        assert_eq!(lines.len(), 1 + 4 + 2);
        assert_eq!(lines[0], "Trial 1/3");
        assert!(lines[1].starts_with("low: "));
        assert!(lines[4].starts_with("high: "));
        assert_eq!(
            lines[5],
            format!("Chi² = {:.3}", engine.history()[0])
        );
        assert!(lines[6].starts_with("= (("));
        assert_eq!(lines[6].matches("-25.0)²/25.0)").count(), 4);
    }

    #[test]
    fn test_y_limit_floor() {
        let mut hist = Histogram::linspace(0.0, 20.0, 50);
        assert_eq!(ChartRenderer::y_limit(&hist), 10);
        hist.fill(&[1.0; 30]);
        assert_eq!(ChartRenderer::y_limit(&hist), 31);
    }

    #[test]
    fn test_overlay_only_when_complete() {
        let renderer = ChartRenderer::default();
        let mut engine = engine(2);
        engine.advance_one_trial();

        let hist = renderer.histogram(&engine);
        assert!(renderer.overlay(&engine, &hist).is_none());
        assert!(!renderer.render(&engine).contains("Chi-Square PDF"));

        engine.advance_one_trial();
        let hist = renderer.histogram(&engine);
        let overlay = renderer.overlay(&engine, &hist).unwrap();
        assert_eq!(overlay.len(), hist.bin_count());
        assert!(renderer.render(&engine).contains("Chi-Square PDF (df=3)"));
    }

    #[test]
    fn test_render_frame_shape() {
        let renderer = ChartRenderer::default().with_height(8);
        let mut engine = engine(50);
        while engine.advance_one_trial().is_some() {}

        let frame = renderer.render(&engine);
        assert!(frame.starts_with(TITLE));
        assert!(frame.contains("Trial 50/50"));
        assert!(frame.contains(BAR));
        assert!(frame.contains(CURVE));
        assert!(frame.contains("Chi-Square Statistic"));
    }

    #[test]
    fn test_scale_to_rows() {
        assert_eq!(scale_to_rows(0.0, 10.0, 10), 0);
        assert_eq!(scale_to_rows(5.0, 10.0, 10), 5);
        assert_eq!(scale_to_rows(50.0, 10.0, 10), 10);
        assert_eq!(scale_to_rows(f64::INFINITY, 10.0, 10), 10);
        assert_eq!(scale_to_rows(f64::NAN, 10.0, 10), 0);
    }

    #[test]
    fn test_progress_line() {
        let mut engine = engine(4);
        assert!(render_progress_line(&engine).starts_with("trial 0/4  chi2=-"));
        engine.advance_one_trial();
        assert!(render_progress_line(&engine).starts_with("trial 1/4  chi2="));
    }
}
