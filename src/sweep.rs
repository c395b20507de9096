//! Sensitivity sweeps over one hardpoint coordinate.
//!
//! Every swept value builds its own [`Suspension`] from scratch and solves it
//! from its static configuration; nothing is shared between values, so they
//! run in parallel on the rayon pool.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::StaticAlignment;
use crate::errors::KinematicsError;
use crate::hardpoints::{HardpointId, SweepAxis};
use crate::series::SolvedSeries;
use crate::suspension::Suspension;

/// Largest number of values a [`SweepRange`] may enumerate.
pub const MAX_SWEEP_VALUES: usize = 100_000;

/// Offsets from the base coordinate, `start..=stop` by `step`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SweepRange {
    /// First offset.
    pub start: f64,
    /// Last offset.
    pub stop: f64,
    /// Increment.
    pub step: f64,
}

impl SweepRange {
    /// Create a range.
    #[must_use]
    pub const fn new(start: f64, stop: f64, step: f64) -> Self {
        Self { start, stop, step }
    }

    /// A range holding one offset.
    #[must_use]
    pub const fn single(offset: f64) -> Self {
        Self::new(offset, offset, 1.0)
    }

    /// Enumerate the offsets. `stop` is included when it lands on the grid.
    ///
    /// # Errors
    ///
    /// Returns [`KinematicsError::InvalidSweepRange`] for non-finite bounds,
    /// `stop < start`, a non-positive step over a non-empty span, or a step
    /// so fine the range would hold more than [`MAX_SWEEP_VALUES`] values.
    ///
    /// # Examples
    /// ```
    /// use kinematix::SweepRange;
    ///
    /// let offsets = SweepRange::new(-1.0, 1.0, 0.5).values().unwrap();
    /// assert_eq!(offsets, vec![-1.0, -0.5, 0.0, 0.5, 1.0]);
    /// ```
    pub fn values(&self) -> Result<Vec<f64>, KinematicsError> {
        let invalid = || KinematicsError::InvalidSweepRange {
            start: self.start,
            stop: self.stop,
            step: self.step,
        };
        if !(self.start.is_finite() && self.stop.is_finite()) || self.stop < self.start {
            return Err(invalid());
        }
        if self.start == self.stop {
            return Ok(vec![self.start]);
        }
        if !(self.step > 0.0) || !self.step.is_finite() {
            return Err(invalid());
        }
        let intervals = ((self.stop - self.start) / self.step + 1.0e-9).floor();
        if !(intervals < MAX_SWEEP_VALUES as f64) {
            return Err(invalid());
        }
        let count = (intervals as usize).checked_add(1).ok_or_else(invalid)?;
        Ok((0..count)
            .map(|index| self.start + index as f64 * self.step)
            .collect())
    }
}

/// Outcome for one swept value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SweepEntry {
    /// Absolute coordinate of the swept hardpoint.
    pub value: f64,
    /// Offset from the base coordinate.
    pub offset: f64,
    /// The solved series, or why this value could not be solved.
    pub outcome: Result<SolvedSeries, KinematicsError>,
}

/// Every value of a sweep, in increasing order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SweepResult {
    /// Swept hardpoint.
    pub hardpoint: HardpointId,
    /// Swept coordinate.
    pub axis: SweepAxis,
    /// One entry per value.
    pub entries: Vec<SweepEntry>,
}

impl SweepResult {
    /// Entry whose absolute coordinate is `value`.
    #[must_use]
    pub fn get(&self, value: f64) -> Option<&SweepEntry> {
        self.entries.iter().find(|entry| entry.value == value)
    }

    /// Values that failed, with their errors.
    pub fn failures(&self) -> impl Iterator<Item = (f64, &KinematicsError)> {
        self.entries
            .iter()
            .filter_map(|entry| entry.outcome.as_ref().err().map(|error| (entry.value, error)))
    }

    /// Values that solved, with their series.
    pub fn successes(&self) -> impl Iterator<Item = (f64, &SolvedSeries)> {
        self.entries
            .iter()
            .filter_map(|entry| entry.outcome.as_ref().ok().map(|series| (entry.value, series)))
    }
}

impl Suspension {
    /// Re-solve the corner with one hardpoint coordinate moved by each offset
    /// of `range`.
    ///
    /// Failures are recorded against their value and never abort the rest.
    ///
    /// # Errors
    ///
    /// Only an unusable `range` is an error.
    ///
    /// # Examples
    /// ```
    /// use kinematix::{
    ///     CornerConfig, HardpointId, StaticAlignment, Suspension, SweepAxis, SweepRange,
    /// };
    ///
    /// let corner = Suspension::from_config(&CornerConfig::formula_student_front()).unwrap();
    /// let result = corner
    ///     .sweep(
    ///         HardpointId::TieRodInner,
    ///         SweepAxis::Z,
    ///         SweepRange::new(-1.0, 1.0, 1.0),
    ///         4,
    ///         &StaticAlignment::default(),
    ///     )
    ///     .unwrap();
    /// assert_eq!(result.entries.len(), 3);
    /// ```
    pub fn sweep(
        &self,
        hardpoint: HardpointId,
        axis: SweepAxis,
        range: SweepRange,
        steps: usize,
        alignment: &StaticAlignment,
    ) -> Result<SweepResult, KinematicsError> {
        let offsets = range.values()?;
        let base = self.hardpoints().get(hardpoint);
        let base_value = base.coordinate(axis.index());

        let entries: Vec<SweepEntry> = offsets
            .par_iter()
            .map(|&offset| {
                let value = base_value + offset;
                let moved = self
                    .hardpoints()
                    .with(hardpoint, base.with_coordinate(axis.index(), value));
                let outcome = Suspension::new(moved, self.travel(), self.unit(), self.solver())
                    .and_then(|corner| corner.solve(steps, alignment));
                if let Err(error) = &outcome {
                    warn!(%hardpoint, ?axis, value, %error, "sweep value failed");
                }
                SweepEntry {
                    value,
                    offset,
                    outcome,
                }
            })
            .collect();

        info!(
            %hardpoint,
            ?axis,
            values = entries.len(),
            failed = entries.iter().filter(|entry| entry.outcome.is_err()).count(),
            "sweep finished"
        );
        Ok(SweepResult {
            hardpoint,
            axis,
            entries,
        })
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::config::CornerConfig;

    fn corner() -> Suspension {
        Suspension::from_config(&CornerConfig::formula_student_front()).expect("valid corner")
    }

    #[test]
    fn range_includes_stop() {
        let values = SweepRange::new(0.0, 1.0, 0.1).values().expect("valid range");
        assert_eq!(values.len(), 11);
        assert_relative_eq!(values[10], 1.0, epsilon = 1.0e-12);
    }

    #[test]
    fn range_rejects_bad_steps() {
        for range in [
            SweepRange::new(0.0, 1.0, 0.0),
            SweepRange::new(0.0, 1.0, -0.5),
            SweepRange::new(1.0, 0.0, 0.5),
            SweepRange::new(f64::NAN, 1.0, 0.5),
        ] {
            assert!(matches!(
                range.values(),
                Err(KinematicsError::InvalidSweepRange { .. })
            ));
        }
        assert_eq!(SweepRange::new(2.0, 2.0, 0.0).values().expect("single"), vec![2.0]);
    }

    #[test]
    fn single_value_matches_direct_solve() {
        let corner = corner();
        let alignment = StaticAlignment::default();
        let result = corner
            .sweep(
                HardpointId::LowerForeInner,
                SweepAxis::Z,
                SweepRange::single(0.0),
                5,
                &alignment,
            )
            .expect("valid range");
        assert_eq!(result.entries.len(), 1);
        let entry = &result.entries[0];
        assert_relative_eq!(entry.value, 111.0);
        let direct = corner.solve(5, &alignment).expect("solves");
        assert_eq!(entry.outcome.as_ref().expect("solves"), &direct);
    }

    #[test]
    fn failing_value_does_not_abort_siblings() {
        let corner = corner();
        // An offset of -460 puts the tie rod outer end on the inner end.
        let result = corner
            .sweep(
                HardpointId::TieRodOuter,
                SweepAxis::Y,
                SweepRange::new(-460.0, 0.0, 460.0),
                2,
                &StaticAlignment::default(),
            )
            .expect("valid range");
        assert_eq!(result.entries.len(), 2);
        let failures: Vec<_> = result.failures().collect();
        assert_eq!(failures.len(), 1);
        assert_relative_eq!(failures[0].0, 140.0);
        assert!(matches!(
            failures[0].1,
            KinematicsError::DegenerateGeometry { .. }
        ));
        assert_eq!(result.successes().count(), 1);
        assert!(result.get(600.0).map_or(false, |entry| entry.outcome.is_ok()));
    }

    #[test]
    fn range_rejects_too_many_values() {
        for range in [
            SweepRange::new(0.0, 1.0, 1.0e-300),
            SweepRange::new(0.0, 1.0, 1.0e-5),
            SweepRange::new(-f64::MAX, f64::MAX, 1.0),
        ] {
            assert!(matches!(
                range.values(),
                Err(KinematicsError::InvalidSweepRange { .. })
            ));
        }
        let finest = SweepRange::new(0.0, 1.0, 1.0e-4).values().expect("valid range");
        assert_eq!(finest.len(), 10_001);
        assert!(finest.len() <= MAX_SWEEP_VALUES);
    }

    #[test]
    fn unreachable_value_is_recorded_as_non_convergent() {
        let corner = corner();
        // Moving the tie rod inner end to y = 595 leaves a 5 mm tie rod, far
        // too short to follow the upright through an inch of travel.
        let result = corner
            .sweep(
                HardpointId::TieRodInner,
                SweepAxis::Y,
                SweepRange::new(0.0, 455.0, 455.0),
                2,
                &StaticAlignment::default(),
            )
            .expect("valid range");
        assert_eq!(result.entries.len(), 2);

        let failures: Vec<_> = result.failures().collect();
        assert_eq!(failures.len(), 1);
        assert_relative_eq!(failures[0].0, 595.0);
        assert!(matches!(
            failures[0].1,
            KinematicsError::NonConvergent { .. }
        ));

        let solved: Vec<_> = result.successes().collect();
        assert_eq!(solved.len(), 1);
        assert_relative_eq!(solved[0].0, 140.0);
        assert_eq!(solved[0].1.len(), 5);
    }
}
