//! Run driver: trials, Monte Carlo batches, and benchmarking.
//!
//! The engine never decides how long to run or when to stop; that lives
//! here. A trial is `step` called once per day in increasing order until
//! the horizon or until a [`StepObserver`] asks to stop. A batch clones a
//! prepared model per trial (sharing its network), reseeds each clone with
//! a seed derived from the batch seed, and runs the trials on the rayon
//! pool. No generator is shared between trials.

use std::time::Instant;

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info};
use unrest_types::{BatchId, MacroContext, ProtestState, StepReport};

use crate::config::RunConfig;
use crate::model::ProtestModel;

/// Errors that can occur while driving runs.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// A trial was asked to run zero days.
    #[error("trial horizon must be at least one day")]
    EmptyHorizon,

    /// A batch or benchmark was asked to run zero trials.
    #[error("at least one trial is required")]
    NoTrials,
}

// ---------------------------------------------------------------------------
// Context sources
// ---------------------------------------------------------------------------

/// Supplies the macro context for each simulated day.
///
/// This is the seam where an external macro controller plugs in: it sees
/// the previous day's report before choosing the next day's context.
pub trait ContextSource {
    /// Context for `day` (0-based), given the previous day's report.
    fn context_for(&mut self, day: u32, previous: Option<&StepReport>) -> MacroContext;
}

/// The same context every day.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConstantContext(pub MacroContext);

impl ContextSource for ConstantContext {
    fn context_for(&mut self, _day: u32, _previous: Option<&StepReport>) -> MacroContext {
        self.0
    }
}

/// A scripted day-by-day sequence. Days past the end repeat the last
/// entry; an empty script is neutral.
#[derive(Debug, Clone, Default)]
pub struct ScriptedContext {
    days: Vec<MacroContext>,
}

impl ScriptedContext {
    /// Build from a per-day list.
    pub const fn new(days: Vec<MacroContext>) -> Self {
        Self { days }
    }
}

impl ContextSource for ScriptedContext {
    fn context_for(&mut self, day: u32, _previous: Option<&StepReport>) -> MacroContext {
        let idx = usize::try_from(day).unwrap_or(usize::MAX);
        self.days
            .get(idx)
            .or_else(|| self.days.last())
            .copied()
            .unwrap_or_default()
    }
}

/// Minimal macro controller: a baseline context whose protest state turns
/// [`ProtestState::Escalating`] while the previous day's participation
/// exceeds a threshold.
#[derive(Debug, Clone, Copy)]
pub struct FeedbackContext {
    base: MacroContext,
    escalation_threshold: f64,
}

impl FeedbackContext {
    /// Escalate once participation exceeds `escalation_threshold`.
    pub const fn new(base: MacroContext, escalation_threshold: f64) -> Self {
        Self {
            base,
            escalation_threshold,
        }
    }
}

impl ContextSource for FeedbackContext {
    fn context_for(&mut self, _day: u32, previous: Option<&StepReport>) -> MacroContext {
        match previous {
            Some(report) if report.participation_rate > self.escalation_threshold => {
                self.base.with_protest_state(ProtestState::Escalating)
            }
            _ => self.base,
        }
    }
}

// ---------------------------------------------------------------------------
// Observers
// ---------------------------------------------------------------------------

/// What a trial should do after an observed step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunControl {
    /// Keep stepping.
    Continue,
    /// End the trial now.
    Stop,
}

/// Called after every step of a trial.
pub trait StepObserver {
    /// Inspect the report for `day` and decide whether to continue.
    fn on_step(&mut self, day: u32, report: &StepReport) -> RunControl;
}

/// Never stops a trial.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpObserver;

impl StepObserver for NoOpObserver {
    fn on_step(&mut self, _day: u32, _report: &StepReport) -> RunControl {
        RunControl::Continue
    }
}

/// Stops a trial once participation has stayed below `floor` for
/// `patience` consecutive days.
#[derive(Debug, Clone, Copy)]
pub struct ParticipationCollapse {
    floor: f64,
    patience: u32,
    below: u32,
}

impl ParticipationCollapse {
    /// Stop after `patience` consecutive days below `floor`.
    pub const fn new(floor: f64, patience: u32) -> Self {
        Self {
            floor,
            patience,
            below: 0,
        }
    }
}

impl StepObserver for ParticipationCollapse {
    fn on_step(&mut self, _day: u32, report: &StepReport) -> RunControl {
        if report.participation_rate < self.floor {
            self.below = self.below.saturating_add(1);
        } else {
            self.below = 0;
        }
        if self.below >= self.patience.max(1) {
            RunControl::Stop
        } else {
            RunControl::Continue
        }
    }
}

/// Either observer, chosen from a [`RunConfig`].
#[derive(Debug, Clone, Copy)]
enum BatchObserver {
    None(NoOpObserver),
    Collapse(ParticipationCollapse),
}

impl StepObserver for BatchObserver {
    fn on_step(&mut self, day: u32, report: &StepReport) -> RunControl {
        match self {
            Self::None(o) => o.on_step(day, report),
            Self::Collapse(o) => o.on_step(day, report),
        }
    }
}

/// Either context source, chosen from a [`RunConfig`].
#[derive(Debug, Clone, Copy)]
enum BatchContext {
    Constant(ConstantContext),
    Feedback(FeedbackContext),
}

impl ContextSource for BatchContext {
    fn context_for(&mut self, day: u32, previous: Option<&StepReport>) -> MacroContext {
        match self {
            Self::Constant(c) => c.context_for(day, previous),
            Self::Feedback(c) => c.context_for(day, previous),
        }
    }
}

impl RunConfig {
    fn context_source(&self) -> BatchContext {
        self.escalation_threshold.map_or(
            BatchContext::Constant(ConstantContext(self.context)),
            |threshold| BatchContext::Feedback(FeedbackContext::new(self.context, threshold)),
        )
    }

    fn observer(&self) -> BatchObserver {
        self.collapse_floor.map_or(BatchObserver::None(NoOpObserver), |floor| {
            BatchObserver::Collapse(ParticipationCollapse::new(floor, self.collapse_patience))
        })
    }
}

// ---------------------------------------------------------------------------
// Trials
// ---------------------------------------------------------------------------

/// Why a trial ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    /// Ran every day of the horizon.
    Horizon,
    /// An observer stopped the trial.
    Stopped,
}

/// Result of one trial.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrialOutcome {
    /// Days actually stepped.
    pub days_run: u32,
    /// Why the trial ended.
    pub end_reason: EndReason,
    /// Report from the last day stepped.
    pub final_report: StepReport,
    /// Highest participation rate seen.
    pub peak_participation: f64,
    /// Day (0-based) of the peak.
    pub peak_day: u32,
    /// Whether every hardliner had defected by the end.
    pub hardliner_cascade: bool,
}

/// Run one trial of at most `days` days on `model` from its current state.
///
/// The model is not reset here; call [`ProtestModel::reset`] or
/// [`ProtestModel::reset_with_seed`] first.
pub fn run_trial<C, O>(
    model: &mut ProtestModel,
    days: u32,
    context: &mut C,
    observer: &mut O,
) -> Result<TrialOutcome, RunnerError>
where
    C: ContextSource + ?Sized,
    O: StepObserver + ?Sized,
{
    if days == 0 {
        return Err(RunnerError::EmptyHorizon);
    }

    let mut previous: Option<StepReport> = None;
    let mut peak_participation = f64::NEG_INFINITY;
    let mut peak_day: u32 = 0;
    let mut days_run: u32 = 0;
    let mut end_reason = EndReason::Horizon;

    for day in 0..days {
        let ctx = context.context_for(day, previous.as_ref());
        let report = model.step(&ctx);
        days_run = day.saturating_add(1);
        if report.participation_rate > peak_participation {
            peak_participation = report.participation_rate;
            peak_day = day;
        }
        let control = observer.on_step(day, &report);
        previous = Some(report);
        if control == RunControl::Stop {
            end_reason = EndReason::Stopped;
            break;
        }
    }

    let final_report = previous.unwrap_or_default();
    Ok(TrialOutcome {
        days_run,
        end_reason,
        hardliner_cascade: final_report.hardliner_defection_rate >= 1.0,
        final_report,
        peak_participation: peak_participation.max(0.0),
        peak_day,
    })
}

// ---------------------------------------------------------------------------
// Batches
// ---------------------------------------------------------------------------

/// Distribution statistics over trial outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DistributionSummary {
    /// Mean.
    pub mean: f64,
    /// Population standard deviation.
    pub std: f64,
    /// Minimum.
    pub min: f64,
    /// 5th percentile.
    pub p05: f64,
    /// Median.
    pub p50: f64,
    /// 95th percentile.
    pub p95: f64,
    /// Maximum.
    pub max: f64,
}

impl DistributionSummary {
    /// Summarize `samples`. All fields are 0 for an empty set.
    #[allow(clippy::cast_precision_loss)]
    pub fn from_samples(samples: &[f64]) -> Self {
        if samples.is_empty() {
            return Self {
                mean: 0.0,
                std: 0.0,
                min: 0.0,
                p05: 0.0,
                p50: 0.0,
                p95: 0.0,
                max: 0.0,
            };
        }
        let mut sorted = samples.to_vec();
        sorted.sort_by(f64::total_cmp);
        let n = sorted.len() as f64;
        let mean = sorted.iter().sum::<f64>() / n;
        let variance = sorted.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
        Self {
            mean,
            std: variance.sqrt(),
            min: sorted.first().copied().unwrap_or(0.0),
            p05: percentile(&sorted, 0.05),
            p50: percentile(&sorted, 0.50),
            p95: percentile(&sorted, 0.95),
            max: sorted.last().copied().unwrap_or(0.0),
        }
    }
}

/// Nearest-rank percentile of an ascending slice.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn percentile(sorted: &[f64], q: f64) -> f64 {
    let last = sorted.len().saturating_sub(1);
    let rank = (q * last as f64).round() as usize;
    sorted.get(rank.min(last)).copied().unwrap_or(0.0)
}

/// Aggregate results of a Monte Carlo batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchSummary {
    /// Batch identifier for log correlation.
    pub batch_id: BatchId,
    /// Seed every trial seed was derived from.
    pub batch_seed: u64,
    /// Number of trials.
    pub trials: usize,
    /// Horizon in days.
    pub days: u32,
    /// Final-day participation rate across trials.
    pub final_participation: DistributionSummary,
    /// Peak participation rate across trials.
    pub peak_participation: DistributionSummary,
    /// Final-day conscript defection rate across trials.
    pub conscript_defection: DistributionSummary,
    /// Fraction of trials ending with every hardliner defected.
    pub cascade_probability: f64,
    /// Fraction of trials an observer stopped early.
    pub early_stop_fraction: f64,
    /// Mean days actually run.
    pub mean_days_run: f64,
    /// Wall-clock time for the whole batch.
    pub elapsed_ms: f64,
}

/// Seed for trial `trial` of a batch (`SplitMix64` over the pair).
pub const fn trial_seed(batch_seed: u64, trial: u64) -> u64 {
    let mut z = batch_seed ^ trial.wrapping_mul(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Run every trial of a batch and return their outcomes in trial order.
///
/// Each trial clones `template`, reseeds it with
/// [`trial_seed`]`(batch_seed, trial)`, and runs with the context source
/// and observer described by `run`. Results do not depend on the thread
/// count.
pub fn run_trials(
    template: &ProtestModel,
    run: &RunConfig,
    batch_seed: u64,
) -> Result<Vec<TrialOutcome>, RunnerError> {
    if run.trials == 0 {
        return Err(RunnerError::NoTrials);
    }
    (0..run.trials)
        .into_par_iter()
        .map(|trial| {
            let mut model = template.clone();
            model.reset_with_seed(trial_seed(batch_seed, trial as u64));
            let mut context = run.context_source();
            let mut observer = run.observer();
            run_trial(&mut model, run.days, &mut context, &mut observer)
        })
        .collect()
}

/// Run a Monte Carlo batch and summarize it.
pub fn run_batch(
    template: &ProtestModel,
    run: &RunConfig,
    batch_seed: u64,
) -> Result<BatchSummary, RunnerError> {
    let batch_id = BatchId::new();
    info!(
        %batch_id,
        trials = run.trials,
        days = run.days,
        batch_seed,
        agents = template.population().len(),
        "Batch started"
    );
    let started = Instant::now();
    let outcomes = run_trials(template, run, batch_seed)?;
    let elapsed_ms = started.elapsed().as_secs_f64() * 1_000.0;

    let summary = summarize(batch_id, batch_seed, run, &outcomes, elapsed_ms);
    info!(
        %batch_id,
        mean_final_participation = summary.final_participation.mean,
        cascade_probability = summary.cascade_probability,
        elapsed_ms = summary.elapsed_ms,
        "Batch complete"
    );
    Ok(summary)
}

#[allow(clippy::cast_precision_loss)]
fn summarize(
    batch_id: BatchId,
    batch_seed: u64,
    run: &RunConfig,
    outcomes: &[TrialOutcome],
    elapsed_ms: f64,
) -> BatchSummary {
    let collect = |f: fn(&TrialOutcome) -> f64| outcomes.iter().map(f).collect::<Vec<f64>>();
    let n = outcomes.len().max(1) as f64;
    let share = |pred: fn(&TrialOutcome) -> bool| {
        outcomes.iter().filter(|o| pred(o)).count() as f64 / n
    };

    BatchSummary {
        batch_id,
        batch_seed,
        trials: outcomes.len(),
        days: run.days,
        final_participation: DistributionSummary::from_samples(&collect(|o| {
            o.final_report.participation_rate
        })),
        peak_participation: DistributionSummary::from_samples(&collect(|o| o.peak_participation)),
        conscript_defection: DistributionSummary::from_samples(&collect(|o| {
            o.final_report.conscript_defection_rate
        })),
        cascade_probability: share(|o| o.hardliner_cascade),
        early_stop_fraction: share(|o| o.end_reason == EndReason::Stopped),
        mean_days_run: outcomes.iter().map(|o| f64::from(o.days_run)).sum::<f64>() / n,
        elapsed_ms,
    }
}

// ---------------------------------------------------------------------------
// Benchmark
// ---------------------------------------------------------------------------

/// Timing of repeated sequential trials.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BenchmarkReport {
    /// Agents per trial.
    pub agents: usize,
    /// Days per trial.
    pub days: u32,
    /// Trials timed.
    pub repetitions: usize,
    /// Total wall clock.
    pub total_ms: f64,
    /// Mean wall clock per trial.
    pub ms_per_trial: f64,
}

/// Time `repetitions` full-horizon trials on one thread under a constant
/// context.
#[allow(clippy::cast_precision_loss)]
pub fn benchmark(
    template: &ProtestModel,
    days: u32,
    repetitions: usize,
    context: MacroContext,
    seed: u64,
) -> Result<BenchmarkReport, RunnerError> {
    if repetitions == 0 {
        return Err(RunnerError::NoTrials);
    }
    let mut model = template.clone();
    let mut source = ConstantContext(context);
    let started = Instant::now();
    for rep in 0..repetitions {
        model.reset_with_seed(trial_seed(seed, rep as u64));
        run_trial(&mut model, days, &mut source, &mut NoOpObserver)?;
    }
    let total_ms = started.elapsed().as_secs_f64() * 1_000.0;
    let report = BenchmarkReport {
        agents: model.population().len(),
        days,
        repetitions,
        total_ms,
        ms_per_trial: total_ms / repetitions as f64,
    };
    debug!(ms_per_trial = report.ms_per_trial, repetitions, "Benchmark complete");
    Ok(report)
}
