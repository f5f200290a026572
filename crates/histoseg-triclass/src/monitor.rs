//! Iteration history and the metrics derived from it.
//!
//! The monitor only observes: the controller appends one record per pass
//! and asks for the oscillation / stagnation signals. Everything else is
//! reporting.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::TerminationReason;

/// Two thresholds closer than this are considered equal when looking for
/// cycles.
const OSCILLATION_TOLERANCE: f64 = 0.1;
/// Window inspected by the stagnation check.
const STAGNATION_WINDOW: usize = 5;
const STAGNATION_MIN_HITS: usize = 4;
/// Slack applied to the remaining-iteration estimate.
const PREDICTION_SAFETY: f64 = 1.2;

/// One pass of the iterative controller. Never modified after it is appended.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IterationRecord {
    /// 1-based.
    pub index: usize,
    pub threshold: f64,
    /// `|θ_n − θ_{n−1}|`; absent on the first pass.
    pub convergence_delta: Option<f64>,
    pub foreground_count: usize,
    pub background_count: usize,
    pub tbd_count: usize,
    /// TBD pixels over all pixels of the image.
    pub tbd_fraction: f64,
    pub elapsed: Duration,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stability {
    VeryStable,
    Stable,
    ModeratelyStable,
    Unstable,
}

impl Stability {
    pub fn from_variance(variance: f64) -> Self {
        if variance < 0.01 {
            Stability::VeryStable
        } else if variance < 0.1 {
            Stability::Stable
        } else if variance < 1.0 {
            Stability::ModeratelyStable
        } else {
            Stability::Unstable
        }
    }
}

/// Mean and sample variance of a series.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SeriesStatistics {
    pub count: usize,
    pub mean: f64,
    /// `n − 1` denominator; 0 for a single sample.
    pub variance: f64,
    pub stability: Stability,
}

impl SeriesStatistics {
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let variance = if values.len() > 1 {
            values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / (n - 1.0)
        } else {
            0.0
        };
        Some(Self {
            count: values.len(),
            mean,
            variance,
            stability: Stability::from_variance(variance),
        })
    }
}

/// Serializable summary of a finished (or in-flight) run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConvergenceReport {
    pub iterations_used: usize,
    pub max_iterations: usize,
    pub termination: Option<TerminationReason>,
    pub final_threshold: Option<f64>,
    pub final_tbd_fraction: f64,
    pub delta_statistics: Option<SeriesStatistics>,
    pub threshold_statistics: Option<SeriesStatistics>,
    pub convergence_rates: Vec<f64>,
    pub efficiency: f64,
    pub predicted_remaining_iterations: usize,
    pub oscillation_period: Option<usize>,
    pub stagnant: bool,
}

/// Append-only iteration history with termination diagnostics.
#[derive(Clone, Debug, PartialEq)]
pub struct ConvergenceMonitor {
    epsilon: f64,
    max_iterations: usize,
    history: Vec<IterationRecord>,
}

impl ConvergenceMonitor {
    pub fn new(epsilon: f64, max_iterations: usize) -> Self {
        Self {
            epsilon,
            max_iterations,
            history: Vec::new(),
        }
    }

    #[inline]
    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    #[inline]
    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    pub fn reset(&mut self) {
        self.history.clear();
    }

    pub fn record(&mut self, record: IterationRecord) {
        self.history.push(record);
    }

    #[inline]
    pub fn history(&self) -> &[IterationRecord] {
        &self.history
    }

    pub fn into_history(self) -> Vec<IterationRecord> {
        self.history
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.history.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn thresholds(&self) -> Vec<f64> {
        self.history.iter().map(|r| r.threshold).collect()
    }

    /// Deltas of every record that has one, in order.
    pub fn deltas(&self) -> Vec<f64> {
        self.history
            .iter()
            .filter_map(|r| r.convergence_delta)
            .collect()
    }

    pub fn delta_statistics(&self) -> Option<SeriesStatistics> {
        SeriesStatistics::from_values(&self.deltas())
    }

    pub fn threshold_statistics(&self) -> Option<SeriesStatistics> {
        SeriesStatistics::from_values(&self.thresholds())
    }

    /// Each delta divided by its predecessor; zero predecessors are skipped.
    pub fn convergence_rates(&self) -> Vec<f64> {
        self.deltas()
            .windows(2)
            .filter(|w| w[0] != 0.0)
            .map(|w| w[1] / w[0])
            .collect()
    }

    /// `0.6·(1 − used/max) + 0.4·(1 − final_tbd_fraction)`; 0 before the
    /// first record.
    pub fn efficiency(&self) -> f64 {
        let Some(last) = self.history.last() else {
            return 0.0;
        };
        let used = self.history.len() as f64 / self.max_iterations.max(1) as f64;
        0.6 * (1.0 - used) + 0.4 * (1.0 - last.tbd_fraction)
    }

    /// Iterations still needed for the latest delta to fall below epsilon,
    /// assuming geometric decay at the latest rate, padded by 20%.
    pub fn estimate_remaining_iterations(&self) -> usize {
        let budget = self.max_iterations.saturating_sub(self.history.len());
        let Some(delta) = self.history.last().and_then(|r| r.convergence_delta) else {
            return 0;
        };
        let Some(&rate) = self.convergence_rates().last() else {
            return 0;
        };
        if rate <= 0.0 || rate >= 1.0 || delta < self.epsilon {
            return 0;
        }
        let steps = ((self.epsilon / delta).ln() / rate.ln()).ceil();
        let padded = (steps * PREDICTION_SAFETY).ceil();
        if !padded.is_finite() || padded <= 0.0 {
            return 0;
        }
        (padded as usize).min(budget)
    }

    /// Period (2 or 3) of a threshold cycle at the end of the history.
    pub fn oscillation_period(&self) -> Option<usize> {
        detect_oscillation(&self.thresholds())
    }

    pub fn is_oscillating(&self) -> bool {
        self.oscillation_period().is_some()
    }

    /// At least four of the last five deltas are small (< 10ε) and barely
    /// improving (< 1% relative to the previous delta).
    pub fn is_stagnant(&self) -> bool {
        let n = self.history.len();
        if n < STAGNATION_WINDOW {
            return false;
        }
        let small = 10.0 * self.epsilon;
        let hits = (n - STAGNATION_WINDOW..n)
            .filter(|&k| {
                let Some(cur) = self.history[k].convergence_delta else {
                    return false;
                };
                let Some(prev) = k
                    .checked_sub(1)
                    .and_then(|p| self.history[p].convergence_delta)
                else {
                    return false;
                };
                if prev <= 0.0 {
                    return false;
                }
                cur < small && (prev - cur) / prev < 0.01
            })
            .count();
        hits >= STAGNATION_MIN_HITS
    }

    pub fn report(&self, termination: Option<TerminationReason>) -> ConvergenceReport {
        let last = self.history.last();
        ConvergenceReport {
            iterations_used: self.history.len(),
            max_iterations: self.max_iterations,
            termination,
            final_threshold: last.map(|r| r.threshold),
            final_tbd_fraction: last.map_or(0.0, |r| r.tbd_fraction),
            delta_statistics: self.delta_statistics(),
            threshold_statistics: self.threshold_statistics(),
            convergence_rates: self.convergence_rates(),
            efficiency: self.efficiency(),
            predicted_remaining_iterations: self.estimate_remaining_iterations(),
            oscillation_period: self.oscillation_period(),
            stagnant: self.is_stagnant(),
        }
    }
}

/// Period-2 or period-3 cycle at the end of `t`.
pub fn detect_oscillation(t: &[f64]) -> Option<usize> {
    let n = t.len();
    let close = |a: f64, b: f64| (a - b).abs() < OSCILLATION_TOLERANCE;
    let moving = n >= 2 && (t[n - 1] - t[n - 2]).abs() > OSCILLATION_TOLERANCE;
    if !moving {
        return None;
    }
    if n >= 6 && close(t[n - 4], t[n - 2]) && close(t[n - 3], t[n - 1]) {
        return Some(2);
    }
    if n >= 9
        && close(t[n - 6], t[n - 3])
        && close(t[n - 5], t[n - 2])
        && close(t[n - 4], t[n - 1])
    {
        return Some(3);
    }
    None
}
