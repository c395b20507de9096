use serde::Serialize;
use tracing::info;

use crate::conditions::Conditions;
use kinematix::{
    KinematicsError, LinkForces, RollCenterInRoll, SolvedSeries, Suspension, SweepResult,
};

/// Results of the demonstration run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisSummary {
    /// Display label for lengths.
    pub unit: String,
    /// Travel series of the corner under study.
    pub series: SolvedSeries,
    /// Link loads for the static load case.
    pub link_forces: LinkForces,
    /// Roll center path as the body rolls.
    pub roll_centers: Vec<RollCenterInRoll>,
    /// Worst rigid link drift over the series, as a fraction of link length.
    pub max_link_error: f64,
    /// Sensitivity sweep.
    pub sweep: SweepResult,
}

/// Solve the corner through its travel, resolve the load case and run the
/// sweep.
pub fn run_analysis(conditions: &Conditions) -> Result<AnalysisSummary, KinematicsError> {
    let config = &conditions.config;
    let corner = Suspension::from_config(config)?;

    let series = corner.solve(config.steps, &config.alignment)?;
    let max_link_error = series
        .steps
        .iter()
        .map(|step| corner.max_link_error(&step.geometry))
        .fold(0.0, f64::max);
    let roll_centers = corner.roll_center_in_roll(&series);

    let link_forces = corner.link_forces_at(
        corner.reference(),
        conditions.load.applied,
        conditions.load.load_point,
    )?;

    let case = &conditions.sweep;
    let sweep = corner.sweep(
        case.hardpoint,
        case.axis,
        case.range,
        case.steps,
        &config.alignment,
    )?;

    info!(
        steps = series.len(),
        max_link_error,
        swept = sweep.entries.len(),
        "analysis complete"
    );
    Ok(AnalysisSummary {
        unit: config.unit.clone(),
        series,
        link_forces,
        roll_centers,
        max_link_error,
        sweep,
    })
}
