//! Rocker rotation and shock length from the pushrod position.
//!
//! The pushrod end on the rocker sweeps a circle about the rocker axis:
//! `q(θ) = m + cos θ e₁ + sin θ e₂`. Holding the pushrod length against the
//! solved outer end `P` gives `A cos θ + B sin θ = C`, which has at most two
//! roots `atan2(B, A) ± acos(C / √(A² + B²))` (the same pair as the quadratic
//! in `tan(θ/2)`). The root closest to the previous step's angle is kept.

use std::f64::consts::{PI, TAU};

use nalgebra::Vector3;

use crate::errors::{KinematicsError, SolveStage};
use crate::geometry::{ensure_not_collinear, RigidLink, RotationAxis};
use crate::hardpoints::Hardpoints;

/// Reference data for the rocker solve.
#[derive(Clone, Debug)]
pub(crate) struct RockerModel {
    axis: RotationAxis,
    /// Center of the pushrod end's circle.
    center: Vector3<f64>,
    /// Radial vector of the pushrod end at zero angle.
    e1: Vector3<f64>,
    /// `e1` turned a quarter about the axis.
    e2: Vector3<f64>,
    pushrod: RigidLink,
    shock_upper: Vector3<f64>,
    shock_lower: Vector3<f64>,
}

impl RockerModel {
    /// Capture the rocker axis and reference positions.
    pub fn new(hardpoints: &Hardpoints) -> Result<Self, KinematicsError> {
        let axis = match hardpoints.rocker_axis {
            Some(direction) => RotationAxis::new(hardpoints.rocker_pivot, direction.to_vector())?,
            None => {
                ensure_not_collinear(
                    "rocker",
                    hardpoints.rocker_pivot,
                    hardpoints.pushrod_inner,
                    hardpoints.shock_upper,
                )?;
                let pivot = hardpoints.rocker_pivot.to_vector();
                let arm = hardpoints.pushrod_inner.to_vector() - pivot;
                let shock_arm = hardpoints.shock_upper.to_vector() - pivot;
                RotationAxis::new(hardpoints.rocker_pivot, arm.cross(&shock_arm))?
            }
        };
        let pushrod_inner = hardpoints.pushrod_inner.to_vector();
        let e1 = axis.radial(pushrod_inner);
        if e1.norm() <= 1.0e-9 * (pushrod_inner - axis.origin).norm().max(1.0) {
            return Err(KinematicsError::degenerate(
                "pushrod inner end lies on the rocker axis",
            ));
        }
        let e2 = axis.direction.cross(&e1);
        Ok(Self {
            center: pushrod_inner - e1,
            e1,
            e2,
            axis,
            pushrod: RigidLink::between(hardpoints.pushrod_inner, hardpoints.pushrod_outer)?,
            shock_upper: hardpoints.shock_upper.to_vector(),
            shock_lower: hardpoints.shock_lower.to_vector(),
        })
    }

    /// Reference pushrod length.
    pub fn pushrod_length(&self) -> f64 {
        self.pushrod.length()
    }

    /// Pushrod end on the rocker after rotating by `angle`.
    pub fn pushrod_inner(&self, angle: f64) -> Vector3<f64> {
        self.center + self.e1 * angle.cos() + self.e2 * angle.sin()
    }

    /// Shock end on the rocker after rotating by `angle`.
    pub fn shock_upper(&self, angle: f64) -> Vector3<f64> {
        self.axis.rotate(self.shock_upper, angle)
    }

    /// Eye-to-eye shock length at `angle`.
    pub fn shock_length(&self, angle: f64) -> f64 {
        (self.shock_upper(angle) - self.shock_lower).norm()
    }

    /// Rocker angle that holds the pushrod length to `pushrod_outer`.
    pub fn solve(
        &self,
        pushrod_outer: &Vector3<f64>,
        previous: f64,
        displacement: f64,
        tolerance: f64,
    ) -> Result<f64, KinematicsError> {
        let length = self.pushrod_length();
        let offset = self.center - pushrod_outer;
        let radius_sq = self.e1.norm_squared();
        let a = 2.0 * offset.dot(&self.e1);
        let b = 2.0 * offset.dot(&self.e2);
        let c = length * length - offset.norm_squared() - radius_sq;
        let amplitude = a.hypot(b);

        let base = offset.norm_squared() + radius_sq;
        let nearest = (base - amplitude).max(0.0).sqrt();
        let farthest = (base + amplitude).sqrt();
        let shortfall = if length < nearest {
            nearest - length
        } else if length > farthest {
            length - farthest
        } else {
            0.0
        };
        if amplitude <= f64::EPSILON * base || shortfall > tolerance {
            return Err(KinematicsError::NonConvergent {
                displacement,
                residual: shortfall,
                iterations: 0,
                stage: SolveStage::Rocker,
            });
        }

        let phase = b.atan2(a);
        let spread = (c / amplitude).clamp(-1.0, 1.0).acos();
        let angle = [phase + spread, phase - spread]
            .into_iter()
            .map(|candidate| previous + wrap(candidate - previous))
            .min_by(|x, y| (x - previous).abs().total_cmp(&(y - previous).abs()))
            .unwrap_or(previous);

        let residual = (self.pushrod_inner(angle) - pushrod_outer).norm() - length;
        if !(residual.abs() <= tolerance) {
            return Err(KinematicsError::NonConvergent {
                displacement,
                residual: residual.abs(),
                iterations: 0,
                stage: SolveStage::Rocker,
            });
        }
        Ok(angle)
    }

    /// Rocker angular rate for a given pushrod outer velocity.
    ///
    /// Returns `None` when the pushrod is perpendicular to the rocker arm's
    /// path, where the rocker cannot be driven.
    pub fn angle_rate(
        &self,
        angle: f64,
        pushrod_outer: &Vector3<f64>,
        pushrod_outer_rate: &Vector3<f64>,
    ) -> Option<f64> {
        let inner = self.pushrod_inner(angle);
        let along = inner - pushrod_outer;
        let tangent = self.axis.direction.cross(&(inner - self.axis.origin));
        let drive = along.dot(&tangent);
        if drive.abs() <= 1.0e-12 * along.norm() * tangent.norm() {
            return None;
        }
        Some(along.dot(pushrod_outer_rate) / drive)
    }

    /// Rate of shock length change for a rocker angular rate.
    pub fn shock_length_rate(&self, angle: f64, angle_rate: f64) -> f64 {
        let upper = self.shock_upper(angle);
        let along = (upper - self.shock_lower).normalize();
        let tangent = self.axis.direction.cross(&(upper - self.axis.origin));
        along.dot(&tangent) * angle_rate
    }
}

/// Wrap an angle into `[-π, π)`.
fn wrap(angle: f64) -> f64 {
    (angle + PI).rem_euclid(TAU) - PI
}
