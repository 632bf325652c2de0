//! Run driver tests: trials, batches, and the benchmark harness.

// Integration tests use unwrap for clarity -- panicking on failure is the
// correct behavior in test code.
#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use unrest_agents::PopulationConfig;
use unrest_core::{
    ConstantContext, EndReason, NoOpObserver, ProtestModel, RunConfig, RunnerError,
    ScriptedContext, SimulationConfig, benchmark, run_batch, run_trial, run_trials,
};
use unrest_types::{MacroContext, RegimeState};

fn template(size: usize, seed: u64) -> ProtestModel {
    let config = SimulationConfig {
        seed: Some(seed),
        population: PopulationConfig {
            size,
            ..PopulationConfig::default()
        },
        ..SimulationConfig::default()
    };
    ProtestModel::new(&config).unwrap()
}

fn run_config(trials: usize, days: u32) -> RunConfig {
    RunConfig {
        trials,
        days,
        ..RunConfig::default()
    }
}

#[test]
fn trial_runs_to_horizon_and_tracks_peak() {
    let mut model = template(1_000, 1);
    let outcome = run_trial(
        &mut model,
        12,
        &mut ConstantContext(MacroContext::default()),
        &mut NoOpObserver,
    )
    .unwrap();
    assert_eq!(outcome.days_run, 12);
    assert_eq!(outcome.end_reason, EndReason::Horizon);
    assert!(outcome.peak_day < 12);
    assert!(outcome.peak_participation >= outcome.final_report.participation_rate);
    assert!(!outcome.hardliner_cascade);
}

#[test]
fn scripted_collapse_registers_as_cascade() {
    let mut model = template(800, 2);
    let mut script = ScriptedContext::new(vec![
        MacroContext::default(),
        MacroContext::default().with_regime_state(RegimeState::Collapsed),
    ]);
    let outcome = run_trial(&mut model, 4, &mut script, &mut NoOpObserver).unwrap();
    assert!(outcome.hardliner_cascade);
}

#[test]
fn zero_day_trial_is_rejected() {
    let mut model = template(200, 3);
    let result = run_trial(
        &mut model,
        0,
        &mut ConstantContext(MacroContext::default()),
        &mut NoOpObserver,
    );
    assert!(matches!(result, Err(RunnerError::EmptyHorizon)));
}

#[test]
fn batch_is_reproducible_for_a_fixed_seed() {
    let model = template(600, 4);
    let run = run_config(12, 15);
    let first = run_trials(&model, &run, 99).unwrap();
    let second = run_trials(&model, &run, 99).unwrap();
    assert_eq!(first.len(), 12);
    assert_eq!(first, second);

    let other = run_trials(&model, &run, 100).unwrap();
    assert_ne!(first, other);
}

#[test]
fn trials_within_a_batch_differ() {
    let model = template(600, 5);
    let outcomes = run_trials(&model, &run_config(6, 5), 7).unwrap();
    assert!(outcomes.windows(2).any(|w| w[0] != w[1]));
}

#[test]
fn batch_summary_statistics_are_ordered() {
    let model = template(500, 6);
    let summary = run_batch(&model, &run_config(20, 10), 11).unwrap();
    assert_eq!(summary.trials, 20);
    assert_eq!(summary.days, 10);
    for dist in [
        summary.final_participation,
        summary.peak_participation,
        summary.conscript_defection,
    ] {
        assert!(dist.min <= dist.p05 && dist.p05 <= dist.p50);
        assert!(dist.p50 <= dist.p95 && dist.p95 <= dist.max);
        assert!((0.0..=1.0).contains(&dist.mean));
    }
    assert!((0.0..=1.0).contains(&summary.cascade_probability));
    assert!((summary.mean_days_run - 10.0).abs() < f64::EPSILON);
    assert!(summary.early_stop_fraction.abs() < f64::EPSILON);
    assert!(serde_json::to_string(&summary).unwrap().contains("final_participation"));
}

#[test]
fn collapse_policy_stops_trials_early() {
    let model = template(500, 7);
    let run = RunConfig {
        collapse_floor: Some(1.0),
        collapse_patience: 3,
        ..run_config(4, 30)
    };
    let outcomes = run_trials(&model, &run, 1).unwrap();
    assert!(outcomes.iter().all(|o| o.days_run == 3));
    assert!(outcomes.iter().all(|o| o.end_reason == EndReason::Stopped));
}

#[test]
fn empty_batch_is_rejected() {
    let model = template(200, 8);
    assert!(matches!(
        run_trials(&model, &run_config(0, 10), 1),
        Err(RunnerError::NoTrials)
    ));
}

#[test]
fn benchmark_reports_per_trial_timing() {
    let model = template(1_000, 9);
    let report = benchmark(&model, 10, 3, MacroContext::default(), 5).unwrap();
    assert_eq!(report.agents, 1_000);
    assert_eq!(report.repetitions, 3);
    assert!(report.ms_per_trial >= 0.0);
    assert!((report.ms_per_trial * 3.0 - report.total_ms).abs() < 1e-6);
}

/// Reference workload: 10,000 agents, degree about 16, 90 days. Only
/// meaningful in an optimized build:
///
/// ```bash
/// cargo test -p unrest-core --release -- --ignored
/// ```
#[test]
#[ignore = "timing target only holds in release builds"]
fn reference_workload_runs_under_100ms() {
    let model = template(10_000, 10);
    let report = benchmark(&model, 90, 5, MacroContext::default(), 1).unwrap();
    assert!(report.ms_per_trial < 100.0, "{} ms per trial", report.ms_per_trial);
}
