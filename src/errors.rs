//! Error types produced while building or solving a suspension corner.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::hardpoints::HardpointId;

/// Which numerical solve failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolveStage {
    /// Newton iteration on the upright pose.
    Upright,
    /// Closed form rocker rotation.
    Rocker,
}

impl std::fmt::Display for SolveStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Upright => f.write_str("upright"),
            Self::Rocker => f.write_str("rocker"),
        }
    }
}

/// Error returned when a corner cannot be built or solved.
///
/// # Examples
///
/// ```
/// use kinematix::{point, KinematicsError, RigidLink};
///
/// let error = RigidLink::between(point(0.0, 0.0, 0.0), point(0.0, 0.0, 0.0))
///     .expect_err("coincident endpoints are rejected");
/// assert!(matches!(error, KinematicsError::DegenerateGeometry { .. }));
/// ```
#[derive(Clone, Debug, Error, PartialEq, Serialize, Deserialize)]
pub enum KinematicsError {
    /// The static configuration cannot be solved at all.
    #[error("degenerate geometry: {reason}")]
    DegenerateGeometry {
        /// What made the configuration unsolvable.
        reason: String,
    },
    /// A travel step failed to meet tolerance within the iteration budget.
    #[error(
        "{stage} solve did not converge at travel {displacement} \
         (residual {residual:e} after {iterations} iterations)"
    )]
    NonConvergent {
        /// Wheel-center displacement of the failing step.
        displacement: f64,
        /// Infinity norm of the last residual.
        residual: f64,
        /// Iterations spent before giving up.
        iterations: usize,
        /// Solve that failed.
        stage: SolveStage,
    },
    /// Jounce must be non-negative and rebound non-positive.
    #[error("invalid travel range: jounce {full_jounce}, rebound {full_rebound}")]
    InvalidTravelRange {
        /// Upper bound of wheel travel.
        full_jounce: f64,
        /// Lower bound of wheel travel.
        full_rebound: f64,
    },
    /// The sweep range cannot be enumerated.
    #[error("invalid sweep range {start}..={stop} by {step}")]
    InvalidSweepRange {
        /// First offset.
        start: f64,
        /// Last offset.
        stop: f64,
        /// Increment between offsets.
        step: f64,
    },
    /// A solver setting is out of range.
    #[error("invalid solver setting: {0}")]
    InvalidSolverConfig(String),
    /// A configuration document could not be read.
    #[error("configuration error: {0}")]
    Config(String),
}

impl KinematicsError {
    /// Shorthand for [`KinematicsError::DegenerateGeometry`].
    pub(crate) fn degenerate(reason: impl Into<String>) -> Self {
        Self::DegenerateGeometry {
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for KinematicsError {
    fn from(value: serde_json::Error) -> Self {
        Self::Config(value.to_string())
    }
}

impl From<std::io::Error> for KinematicsError {
    fn from(value: std::io::Error) -> Self {
        Self::Config(value.to_string())
    }
}

/// Non-fatal warning raised when a tracked point jumps between adjacent
/// travel steps by more than the configured threshold.
///
/// Usually a sign that the solver switched to a mirror configuration or the
/// linkage went over centre.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BranchDiscontinuity {
    /// Displacement of the step that jumped.
    pub displacement: f64,
    /// Displacement of the step it was compared against.
    pub previous_displacement: f64,
    /// Hardpoint with the largest jump.
    pub hardpoint: HardpointId,
    /// Distance the hardpoint moved between the two steps.
    pub jump: f64,
    /// Threshold that was exceeded.
    pub threshold: f64,
}

impl std::fmt::Display for BranchDiscontinuity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} moved {:.4} between travel {} and {} (threshold {:.4})",
            self.hardpoint, self.jump, self.previous_displacement, self.displacement, self.threshold
        )
    }
}
