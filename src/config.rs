//! Solver settings and the serialisable description of a corner.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::KinematicsError;
use crate::hardpoints::Hardpoints;

/// Numerical settings shared by every solve.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Residual tolerance as a fraction of the shortest upright link.
    pub tolerance: f64,
    /// Newton iteration budget per travel step.
    pub max_iterations: usize,
    /// A tracked point moving more than this multiple of the travel increment
    /// between adjacent steps raises a branch discontinuity warning.
    pub branch_jump_ratio: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            tolerance: 1.0e-6,
            max_iterations: 50,
            branch_jump_ratio: 10.0,
        }
    }
}

impl SolverConfig {
    /// Check the settings are usable.
    ///
    /// # Errors
    ///
    /// Returns [`KinematicsError::InvalidSolverConfig`] for non-positive
    /// tolerances, ratios or an empty iteration budget.
    pub fn validate(&self) -> Result<(), KinematicsError> {
        if !(self.tolerance > 0.0) {
            return Err(KinematicsError::InvalidSolverConfig(format!(
                "tolerance must be positive (received {})",
                self.tolerance
            )));
        }
        if self.max_iterations == 0 {
            return Err(KinematicsError::InvalidSolverConfig(
                "max_iterations must be at least 1".to_owned(),
            ));
        }
        if !(self.branch_jump_ratio > 0.0) {
            return Err(KinematicsError::InvalidSolverConfig(format!(
                "branch_jump_ratio must be positive (received {})",
                self.branch_jump_ratio
            )));
        }
        Ok(())
    }
}

/// Bounds of wheel-center travel. Jounce is positive.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TravelRange {
    /// Maximum upward travel.
    pub full_jounce: f64,
    /// Maximum downward travel (negative).
    pub full_rebound: f64,
}

impl TravelRange {
    /// Create a travel range.
    ///
    /// # Errors
    ///
    /// Returns [`KinematicsError::InvalidTravelRange`] unless
    /// `full_rebound <= 0 <= full_jounce` and both are finite.
    pub fn new(full_jounce: f64, full_rebound: f64) -> Result<Self, KinematicsError> {
        let range = Self {
            full_jounce,
            full_rebound,
        };
        range.validate()?;
        Ok(range)
    }

    /// Re-check bounds, e.g. after deserialisation.
    ///
    /// # Errors
    ///
    /// See [`TravelRange::new`].
    pub fn validate(&self) -> Result<(), KinematicsError> {
        let valid = self.full_jounce.is_finite()
            && self.full_rebound.is_finite()
            && self.full_jounce >= 0.0
            && self.full_rebound <= 0.0;
        if valid {
            Ok(())
        } else {
            Err(KinematicsError::InvalidTravelRange {
                full_jounce: self.full_jounce,
                full_rebound: self.full_rebound,
            })
        }
    }

    /// Symmetric range of one inch either way, in millimetres.
    #[must_use]
    pub fn one_inch() -> Self {
        Self {
            full_jounce: 25.4,
            full_rebound: -25.4,
        }
    }
}

/// Static alignment added to the geometric angle changes, in degrees.
///
/// These never influence the solve; they only shift the reported curves.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StaticAlignment {
    /// Static toe, positive toe-in.
    pub toe: f64,
    /// Static camber, negative when the top of the wheel leans inboard.
    pub camber: f64,
    /// Static caster, positive when the steering axis leans rearward.
    pub caster: f64,
}

/// Everything needed to build and solve a corner, as read from JSON.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CornerConfig {
    /// Pickup points at static ride height.
    pub hardpoints: Hardpoints,
    /// Wheel travel bounds.
    pub travel: TravelRange,
    /// Static alignment offsets.
    #[serde(default)]
    pub alignment: StaticAlignment,
    /// Number of steps each side of static ride height.
    #[serde(default = "default_steps")]
    pub steps: usize,
    /// Display label for lengths.
    #[serde(default = "default_unit")]
    pub unit: String,
    /// Numerical settings.
    #[serde(default)]
    pub solver: SolverConfig,
}

/// Default travel steps either side of static.
fn default_steps() -> usize {
    100
}

/// Default length label.
fn default_unit() -> String {
    "mm".to_owned()
}

impl CornerConfig {
    /// The formula-student demonstration corner with one inch of travel.
    #[must_use]
    pub fn formula_student_front() -> Self {
        Self {
            hardpoints: Hardpoints::formula_student_front(),
            travel: TravelRange::one_inch(),
            alignment: StaticAlignment::default(),
            steps: default_steps(),
            unit: default_unit(),
            solver: SolverConfig::default(),
        }
    }

    /// Parse a configuration from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`KinematicsError::Config`] for malformed documents and the
    /// validation errors of [`TravelRange`] and [`SolverConfig`].
    pub fn from_json_str(text: &str) -> Result<Self, KinematicsError> {
        let config: Self = serde_json::from_str(text)?;
        config.travel.validate()?;
        config.solver.validate()?;
        Ok(config)
    }

    /// Read a configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// See [`CornerConfig::from_json_str`]; IO failures map to
    /// [`KinematicsError::Config`].
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, KinematicsError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn travel_range_rejects_inverted_bounds() {
        let error = TravelRange::new(-1.0, 1.0).expect_err("inverted range rejected");
        assert!(matches!(error, KinematicsError::InvalidTravelRange { .. }));
        assert!(TravelRange::new(0.0, 0.0).is_ok());
    }

    #[test]
    fn solver_config_rejects_zero_tolerance() {
        let config = SolverConfig {
            tolerance: 0.0,
            ..SolverConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(KinematicsError::InvalidSolverConfig(_))
        ));
    }

    #[test]
    fn corner_config_round_trips_through_json() {
        let config = CornerConfig::formula_student_front();
        let text = serde_json::to_string(&config).expect("serialize");
        let parsed = CornerConfig::from_json_str(&text).expect("parse");
        assert_eq!(parsed, config);
    }

    #[test]
    fn missing_optional_sections_use_defaults() {
        let mut value =
            serde_json::to_value(CornerConfig::formula_student_front()).expect("serialize");
        let object = value.as_object_mut().expect("object");
        object.remove("alignment");
        object.remove("steps");
        object.remove("unit");
        object.remove("solver");
        let parsed = CornerConfig::from_json_str(&value.to_string()).expect("parse");
        assert_eq!(parsed.steps, 100);
        assert_eq!(parsed.unit, "mm");
        assert_eq!(parsed.solver, SolverConfig::default());
    }

    #[test]
    fn malformed_json_is_a_config_error() {
        let error = CornerConfig::from_json_str("{").expect_err("malformed");
        assert!(matches!(error, KinematicsError::Config(_)));
    }
}
