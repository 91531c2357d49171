//! Chi-square statistics.
//!
//! Pure functions over counts and statistic histories: the goodness-of-fit
//! statistic and its per-category breakdown, the theoretical chi-square
//! density, fixed-range histogram binning and a running summary of the
//! empirical distribution.

use serde::Serialize;
use statrs::distribution::{ChiSquared, Continuous};

//-----------------------------------------------------------------------------
// Goodness of fit
//-----------------------------------------------------------------------------

/// Sum over categories of `(observed - expected)² / expected`.
///
/// Every expected count must be positive.
pub fn chi_square_statistic(observed: &[u64], expected: &[f64]) -> f64 {
    observed
        .iter()
        .zip(expected)
        .map(|(&o, &e)| contribution(o, e))
        .sum()
}

fn contribution(observed: u64, expected: f64) -> f64 {
    let diff = observed as f64 - expected;
    diff * diff / expected
}

/// One category's share of a chi-square statistic.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryTerm {
    pub label: String,
    pub observed: u64,
    pub expected: f64,
    pub contribution: f64,
}

/// Per-category terms of one trial and their sum.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatisticBreakdown {
    pub terms: Vec<CategoryTerm>,
    pub statistic: f64,
}

impl StatisticBreakdown {
    /// Build the breakdown from parallel label/observed/expected slices.
    pub fn new(labels: &[String], observed: &[u64], expected: &[f64]) -> Self {
        let terms: Vec<CategoryTerm> = labels
            .iter()
            .zip(observed)
            .zip(expected)
            .map(|((label, &o), &e)| CategoryTerm {
                label: label.clone(),
                observed: o,
                expected: e,
                contribution: contribution(o, e),
            })
            .collect();
        let statistic = terms.iter().map(|term| term.contribution).sum();
        Self { terms, statistic }
    }

    pub fn observed_total(&self) -> u64 {
        self.terms.iter().map(|term| term.observed).sum()
    }
}

//-----------------------------------------------------------------------------
// Chi-square density
//-----------------------------------------------------------------------------

/// Probability density of the chi-square distribution with `df` degrees of freedom.
///
/// At `x == 0` the density is `+inf` for one degree of freedom, `0.5` for two
/// and `0` above that.
pub fn chi_square_pdf(x: f64, df: u32) -> f64 {
    if df == 0 || x < 0.0 || x.is_nan() {
        return 0.0;
    }
    if x == 0.0 {
        return match df {
            1 => f64::INFINITY,
            2 => 0.5,
            _ => 0.0,
        };
    }
    ChiSquared::new(f64::from(df)).map_or(0.0, |dist| dist.pdf(x))
}

/// Points of the density scaled to histogram frequencies.
///
/// `total * bin_width * pdf(x)` is the count a bin of `bin_width` centred on
/// `x` should hold after `total` trials. `points` x values are spaced evenly
/// over `[min, max]`.
pub fn expected_frequency_curve(
    df: u32,
    total: usize,
    bin_width: f64,
    min: f64,
    max: f64,
    points: usize,
) -> Vec<(f64, f64)> {
    let scale = total as f64 * bin_width;
    linspace(min, max, points)
        .into_iter()
        .map(|x| (x, chi_square_pdf(x, df) * scale))
        .collect()
}

fn linspace(min: f64, max: f64, points: usize) -> Vec<f64> {
    match points {
        0 => Vec::new(),
        1 => vec![min],
        _ => {
            let step = (max - min) / (points - 1) as f64;
            (0..points)
                .map(|i| if i == points - 1 { max } else { min + step * i as f64 })
                .collect()
        }
    }
}

//-----------------------------------------------------------------------------
// Histogram
//-----------------------------------------------------------------------------

/// Fixed-range histogram with equal-width bins.
///
/// Binning follows numpy: bins are half-open except the last, which also
/// includes the upper edge; values outside the range are not counted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Histogram {
    pub edges: Vec<f64>,
    pub counts: Vec<u32>,
}

impl Histogram {
    /// `edges` evenly spaced edges over `[min, max]`, hence `edges - 1` bins.
    pub fn linspace(min: f64, max: f64, edges: usize) -> Self {
        let edges = linspace(min, max, edges.max(2));
        let counts = vec![0; edges.len() - 1];
        Self { edges, counts }
    }

    pub fn min(&self) -> f64 {
        self.edges[0]
    }

    pub fn max(&self) -> f64 {
        self.edges[self.edges.len() - 1]
    }

    pub fn bin_count(&self) -> usize {
        self.counts.len()
    }

    pub fn bin_width(&self) -> f64 {
        (self.max() - self.min()) / self.bin_count() as f64
    }

    /// Bin index for `value`, or `None` when it falls outside the range.
    pub fn bin_index(&self, value: f64) -> Option<usize> {
        if value.is_nan() || value < self.min() || value > self.max() {
            return None;
        }
        let last = self.bin_count() - 1;
        let index = (((value - self.min()) / self.bin_width()).floor() as usize).min(last);
        // The division can round across an edge; settle against the stored edges.
        let index = if value < self.edges[index] {
            index.saturating_sub(1)
        } else if index < last && value >= self.edges[index + 1] {
            index + 1
        } else {
            index
        };
        Some(index)
    }

    pub fn add(&mut self, value: f64) {
        if let Some(index) = self.bin_index(value) {
            self.counts[index] += 1;
        }
    }

    pub fn fill(&mut self, values: &[f64]) {
        for &value in values {
            self.add(value);
        }
    }

    pub fn total(&self) -> u32 {
        self.counts.iter().sum()
    }

    pub fn max_count(&self) -> u32 {
        self.counts.iter().copied().max().unwrap_or(0)
    }

    /// Centre of bin `index`.
    pub fn bin_center(&self, index: usize) -> f64 {
        (self.edges[index] + self.edges[index + 1]) / 2.0
    }
}

//-----------------------------------------------------------------------------
// Running summary
//-----------------------------------------------------------------------------

/// Mean and sample variance of a statistic history.
///
/// For chi-square draws with `df` degrees of freedom these approach `df` and
/// `2 * df` as the history grows.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HistorySummary {
    pub count: usize,
    pub mean: f64,
    pub variance: f64,
}

impl HistorySummary {
    pub fn from_values(values: &[f64]) -> Self {
        let count = values.len();
        if count == 0 {
            return Self {
                count,
                mean: 0.0,
                variance: 0.0,
            };
        }
        let mean = values.iter().sum::<f64>() / count as f64;
        let variance = if count > 1 {
            values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (count - 1) as f64
        } else {
            0.0
        };
        Self {
            count,
            mean,
            variance,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64, tolerance: f64) -> bool {
        (a - b).abs() < tolerance
    }

    #[test]
    fn test_statistic_matches_hand_computation() {
        // ((30-25)² + (20-25)² + (25-25)² + (25-25)²) / 25 = 2.0
        let stat = chi_square_statistic(&[30, 20, 25, 25], &[25.0; 4]);
        assert!(close(stat, 2.0, 1e-12));
    }

    #[test]
    fn test_perfect_fit_is_zero() {
        assert_eq!(chi_square_statistic(&[50, 30, 20], &[50.0, 30.0, 20.0]), 0.0);
    }

    #[test]
    fn test_breakdown_sums_terms() {
        let labels: Vec<String> = ["a", "b"].iter().map(|s| s.to_string()).collect();
        let breakdown = StatisticBreakdown::new(&labels, &[7, 3], &[5.0, 5.0]);

        assert_eq!(breakdown.terms.len(), 2);
        assert_eq!(breakdown.terms[0].label, "a");
        assert!(close(breakdown.terms[0].contribution, 0.8, 1e-12));
        assert!(close(breakdown.terms[1].contribution, 0.8, 1e-12));
        assert!(close(breakdown.statistic, 1.6, 1e-12));
        assert_eq!(breakdown.observed_total(), 10);
        assert!(close(
            breakdown.statistic,
            chi_square_statistic(&[7, 3], &[5.0, 5.0]),
            1e-12
        ));
    }

    #[test]
    fn test_pdf_known_values() {
        assert!(close(chi_square_pdf(1.0, 3), 0.241_970_724_519_143_37, 1e-9));
        assert!(close(chi_square_pdf(2.0, 2), 0.5 * (-1.0f64).exp(), 1e-9));
        assert!(close(chi_square_pdf(1.0, 1), 0.241_970_724_519_143_37, 1e-9));
    }

    #[test]
    fn test_pdf_edges() {
        assert_eq!(chi_square_pdf(-1.0, 3), 0.0);
        assert_eq!(chi_square_pdf(0.0, 3), 0.0);
        assert_eq!(chi_square_pdf(0.0, 2), 0.5);
        assert!(chi_square_pdf(0.0, 1).is_infinite());
        assert_eq!(chi_square_pdf(1.0, 0), 0.0);
    }

    #[test]
    fn test_pdf_integrates_to_one() {
        let step = 0.001;
        let area: f64 = (0..80_000)
            .map(|i| {
                let x = i as f64 * step;
                (chi_square_pdf(x, 3) + chi_square_pdf(x + step, 3)) * step / 2.0
            })
            .sum();
        assert!(close(area, 1.0, 1e-4), "area = {area}");
    }

    #[test]
    fn test_histogram_layout() {
        let hist = Histogram::linspace(0.0, 20.0, 50);
        assert_eq!(hist.edges.len(), 50);
        assert_eq!(hist.bin_count(), 49);
        assert!(close(hist.bin_width(), 20.0 / 49.0, 1e-12));
        assert_eq!(hist.max(), 20.0);
    }

    #[test]
    fn test_histogram_numpy_semantics() {
        let mut hist = Histogram::linspace(0.0, 4.0, 5);
        hist.fill(&[0.0, 0.5, 1.0, 3.99, 4.0, -0.1, 4.1, f64::NAN]);

        assert_eq!(hist.counts, vec![2, 1, 0, 2]);
        assert_eq!(hist.total(), 5);
        assert_eq!(hist.max_count(), 2);
        assert_eq!(hist.bin_center(0), 0.5);
    }

    #[test]
    fn test_interior_edges_open_their_bin() {
        let hist = Histogram::linspace(0.0, 20.0, 50);
        let bins = hist.bin_count();
        for (i, &edge) in hist.edges.iter().enumerate() {
            assert_eq!(hist.bin_index(edge), Some(i.min(bins - 1)), "edge {i} = {edge}");
        }

        for (min, max, edges) in [(0.0, 15.0, 31), (0.0, 1.0, 11), (0.0, 3.0, 31)] {
            let hist = Histogram::linspace(min, max, edges);
            let bins = hist.bin_count();
            for (i, &edge) in hist.edges.iter().enumerate() {
                assert_eq!(hist.bin_index(edge), Some(i.min(bins - 1)));
            }
        }
    }

    #[test]
    fn test_expected_frequency_curve_scaling() {
        let curve = expected_frequency_curve(2, 1000, 0.5, 0.0, 20.0, 5);
        assert_eq!(curve.len(), 5);
        assert_eq!(curve[0].0, 0.0);
        assert_eq!(curve[4].0, 20.0);
        // pdf(0, 2) = 0.5, scaled by 1000 * 0.5
        assert!(close(curve[0].1, 250.0, 1e-9));
    }

    #[test]
    fn test_history_summary() {
        let empty = HistorySummary::from_values(&[]);
        assert_eq!(empty.count, 0);
        assert_eq!(empty.mean, 0.0);

        let single = HistorySummary::from_values(&[3.0]);
        assert_eq!(single.variance, 0.0);

        let summary = HistorySummary::from_values(&[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(summary.count, 4);
        assert!(close(summary.mean, 2.5, 1e-12));
        assert!(close(summary.variance, 5.0 / 3.0, 1e-12));
    }
}
