//! Iterative triclass state machine.

use std::time::Instant;

use histoseg_core::{GrayImage, GrayImageView, FOREGROUND};
use log::{debug, info};
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{
    ActiveRegion, ConvergenceMonitor, ConvergenceReport, Histogram1D, HistogramStats1D,
    IterationRecord, ThresholdSelector1D, TriclassError, TriclassParams, TriclassSegmenter,
    EMPTY_HISTOGRAM_THRESHOLD,
};

/// Why a run stopped iterating.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TerminationReason {
    Converged,
    Depleted,
    Oscillating,
    Stagnant,
    MaxIterations,
}

/// Controller state. The five stop signals are reported once by
/// [`IterativeController::step`] before the final assignment moves the
/// controller to `Done`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ControllerState {
    Active,
    Converged,
    Depleted,
    Oscillating,
    Stagnant,
    MaxIterations,
    Done,
}

impl From<TerminationReason> for ControllerState {
    fn from(reason: TerminationReason) -> Self {
        match reason {
            TerminationReason::Converged => ControllerState::Converged,
            TerminationReason::Depleted => ControllerState::Depleted,
            TerminationReason::Oscillating => ControllerState::Oscillating,
            TerminationReason::Stagnant => ControllerState::Stagnant,
            TerminationReason::MaxIterations => ControllerState::MaxIterations,
        }
    }
}

/// Output of an iterative triclass run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TriclassResult {
    /// Every pixel is 0 or 255.
    pub mask: GrayImage,
    pub termination: TerminationReason,
    pub final_threshold: f64,
    pub history: Vec<IterationRecord>,
    pub report: ConvergenceReport,
    /// Histogram of the first pass; `non_zero_bins == 0` flags a fallback threshold.
    pub initial_histogram: HistogramStats1D,
    /// TBD pixels resolved by the final `value ≥ θ` assignment.
    pub forced_foreground: usize,
    pub forced_background: usize,
}

/// Drives histogram → threshold → band classification until a stop signal.
///
/// ```
/// use histoseg_core::GrayImage;
/// use histoseg_triclass::{ControllerState, IterativeController, TriclassParams};
///
/// let image = GrayImage::from_fn(8, 8, |x, _| if x < 4 { 10 } else { 250 });
/// let mut ctl = IterativeController::new(&TriclassParams::default(), image.view()).unwrap();
/// while ctl.step() != ControllerState::Done {
///     // A caller can bail out here between passes.
/// }
/// let result = ctl.into_result().unwrap();
/// assert_eq!(result.mask.count_nonzero(), 32);
/// ```
#[derive(Debug)]
pub struct IterativeController<'a> {
    params: TriclassParams,
    image: GrayImageView<'a>,
    selector: ThresholdSelector1D,
    segmenter: TriclassSegmenter,
    monitor: ConvergenceMonitor,
    active: ActiveRegion,
    cumulative: GrayImage,
    state: ControllerState,
    termination: Option<TerminationReason>,
    last_threshold: Option<f64>,
    initial_histogram: Option<HistogramStats1D>,
    forced_foreground: usize,
    forced_background: usize,
}

impl<'a> IterativeController<'a> {
    pub fn new(params: &TriclassParams, image: GrayImageView<'a>) -> Result<Self, TriclassError> {
        params.validate()?;
        Ok(Self {
            params: params.clone(),
            selector: ThresholdSelector1D::new(params.initial_threshold_method),
            segmenter: TriclassSegmenter::new(params.lower_upper_gap_factor),
            monitor: ConvergenceMonitor::new(params.convergence_epsilon, params.max_iterations),
            active: ActiveRegion::from_nonzero(&image),
            cumulative: GrayImage::zeros(image.width, image.height),
            image,
            state: ControllerState::Active,
            termination: None,
            last_threshold: None,
            initial_histogram: None,
            forced_foreground: 0,
            forced_background: 0,
        })
    }

    #[inline]
    pub fn state(&self) -> ControllerState {
        self.state
    }

    #[inline]
    pub fn monitor(&self) -> &ConvergenceMonitor {
        &self.monitor
    }

    #[inline]
    pub fn active_pixels(&self) -> usize {
        self.active.len()
    }

    /// Advance by one transition and return the new state.
    ///
    /// `Active` runs one pass; a stop state runs the final assignment and
    /// becomes `Done`; `Done` stays `Done`.
    pub fn step(&mut self) -> ControllerState {
        self.state = match self.state {
            ControllerState::Active => self.iterate(),
            ControllerState::Done => ControllerState::Done,
            _ => {
                self.finalize();
                ControllerState::Done
            }
        };
        self.state
    }

    /// Step until `Done` and return the result.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip_all, fields(width = self.image.width, height = self.image.height))
    )]
    pub fn run(mut self) -> TriclassResult {
        while self.step() != ControllerState::Done {}
        self.build_result()
    }

    /// The result once the controller is `Done`.
    pub fn into_result(self) -> Option<TriclassResult> {
        (self.state == ControllerState::Done).then(|| self.build_result())
    }

    #[cfg_attr(feature = "tracing", instrument(level = "debug", skip_all, fields(n = self.monitor.len() + 1)))]
    fn iterate(&mut self) -> ControllerState {
        let started = Instant::now();
        let n = self.monitor.len() + 1;

        let hist = Histogram1D::from_view(&self.active.view(), self.params.histogram_bins);
        if self.initial_histogram.is_none() {
            self.initial_histogram = Some(hist.stats());
        }
        let threshold = self.selector.select(&hist);
        let band = self.segmenter.band(threshold);
        let partition = self.segmenter.classify(&band, &self.image, &self.active);

        for &idx in &partition.foreground {
            self.cumulative.data[idx] = FOREGROUND;
        }

        let total = self.image.len();
        let tbd_count = partition.tbd_count();
        let tbd_fraction = if total > 0 {
            tbd_count as f64 / total as f64
        } else {
            0.0
        };
        let convergence_delta = self.last_threshold.map(|prev| (threshold - prev).abs());
        self.monitor.record(IterationRecord {
            index: n,
            threshold,
            convergence_delta,
            foreground_count: partition.foreground_count(),
            background_count: partition.background_count,
            tbd_count,
            tbd_fraction,
            elapsed: started.elapsed(),
        });
        self.last_threshold = Some(threshold);

        debug!(
            "triclass pass {}: theta={:.3} band=[{:.3}, {:.3}] fg={} bg={} tbd={} ({:.4})",
            n,
            threshold,
            band.lower,
            band.upper,
            partition.foreground_count(),
            partition.background_count,
            tbd_count,
            tbd_fraction
        );

        let reason = self.termination_signal(n, convergence_delta, tbd_count, tbd_fraction);
        // The TBD pixels always form the active set, so the final
        // assignment sees exactly what is left.
        self.active.shrink_to(&self.image, partition.undetermined);

        match reason {
            Some(reason) => {
                self.termination = Some(reason);
                info!(
                    "triclass stopped after {} pass(es): {:?}, theta={:.3}, tbd={}",
                    n, reason, threshold, tbd_count
                );
                reason.into()
            }
            None => ControllerState::Active,
        }
    }

    fn termination_signal(
        &self,
        n: usize,
        delta: Option<f64>,
        tbd_count: usize,
        tbd_fraction: f64,
    ) -> Option<TerminationReason> {
        if tbd_count == 0 {
            return Some(TerminationReason::Depleted);
        }
        if n > 1 && delta.is_some_and(|d| d < self.params.convergence_epsilon) {
            return Some(TerminationReason::Converged);
        }
        if n >= self.params.max_iterations {
            return Some(TerminationReason::MaxIterations);
        }
        if tbd_fraction < self.params.minimum_tbd_fraction {
            return Some(TerminationReason::Depleted);
        }
        if self.monitor.is_oscillating() {
            return Some(TerminationReason::Oscillating);
        }
        if self.monitor.is_stagnant() {
            return Some(TerminationReason::Stagnant);
        }
        None
    }

    /// Hard `value ≥ θ` assignment for whatever is still active.
    fn finalize(&mut self) {
        let Some(theta) = self.last_threshold else {
            return;
        };
        for &idx in self.active.pixels() {
            if self.image.data[idx] as f64 >= theta {
                self.cumulative.data[idx] = FOREGROUND;
                self.forced_foreground += 1;
            } else {
                self.forced_background += 1;
            }
        }
        if !self.active.is_empty() {
            debug!(
                "triclass final assignment: {} foreground, {} background at theta={:.3}",
                self.forced_foreground, self.forced_background, theta
            );
        }
        self.active.shrink_to(&self.image, Vec::new());
    }

    fn build_result(self) -> TriclassResult {
        let termination = self.termination.unwrap_or(TerminationReason::MaxIterations);
        let report = self.monitor.report(Some(termination));
        TriclassResult {
            mask: self.cumulative,
            termination,
            final_threshold: self.last_threshold.unwrap_or(EMPTY_HISTOGRAM_THRESHOLD),
            history: self.monitor.into_history(),
            report,
            initial_histogram: self
                .initial_histogram
                .unwrap_or_else(|| Histogram1D::zeros(self.params.histogram_bins).stats()),
            forced_foreground: self.forced_foreground,
            forced_background: self.forced_background,
        }
    }
}
