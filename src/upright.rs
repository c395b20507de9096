//! Newton solve of the upright pose at a given wheel travel.
//!
//! The upright is carried as a rigid transform of its static configuration:
//! a rotation about the wheel center followed by a translation of the wheel
//! center. Rigidity between the ball joints, tie rod end and wheel center is
//! therefore exact by construction, and the unknowns reduce to six pose
//! coordinates. Six scalar equations close the system:
//!
//! * the lower and upper ball joints each stay at their reference distance
//!   from both inner pivots of their wishbone (two equations per wishbone;
//!   together they pin the ball joint to the circle swept about the
//!   wishbone's inner pivot axis, which is the single effective swing link),
//! * the tie rod outer end stays at tie rod length from the inner end,
//! * the wheel center height equals static height plus the travel.
//!
//! Each Newton update is `J δ = -g` with `δ = [ω, v]`, where `ω` is a small
//! rotation vector applied on the left and `v` a wheel-center translation.

use nalgebra::{Matrix6, UnitQuaternion, Vector3, Vector6};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::{KinematicsError, SolveStage};
use crate::geometry::{ensure_not_collinear, Point, RigidLink, RotationAxis};
use crate::hardpoints::{Hardpoints, PushrodMount};

/// Upright attachment point that moves rigidly with the pose.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum BodyPoint {
    /// Lower ball joint.
    LowerOuter = 0,
    /// Upper ball joint.
    UpperOuter = 1,
    /// Tie rod outer end.
    TieRodOuter = 2,
}

/// Pose of the upright relative to its static configuration.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct UprightPose {
    /// Rotation of the upright about its wheel center.
    pub rotation: UnitQuaternion<f64>,
    /// Current wheel-center position.
    pub wheel_center: Vector3<f64>,
}

impl UprightPose {
    /// The static configuration.
    #[must_use]
    pub fn reference(wheel_center: Point) -> Self {
        Self {
            rotation: UnitQuaternion::identity(),
            wheel_center: wheel_center.to_vector(),
        }
    }

    /// Map a point given relative to the static wheel center.
    #[must_use]
    pub fn transform(&self, offset: &Vector3<f64>) -> Vector3<f64> {
        self.rotation * offset + self.wheel_center
    }

    /// Apply a Newton increment `[ω, v]`.
    fn advanced(&self, step: &Vector6<f64>) -> Self {
        let omega = Vector3::new(step[0], step[1], step[2]);
        let translation = Vector3::new(step[3], step[4], step[5]);
        let rotation = UnitQuaternion::new(omega) * self.rotation;
        Self {
            rotation: UnitQuaternion::new_normalize(rotation.into_inner()),
            wheel_center: self.wheel_center + translation,
        }
    }
}

/// Rate of change of the pose per unit wheel travel.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct PoseRate {
    /// Angular velocity of the upright.
    pub angular: Vector3<f64>,
    /// Velocity of the wheel center.
    pub linear: Vector3<f64>,
}

impl PoseRate {
    /// Velocity of a point rigidly attached to the upright at `position`.
    pub fn velocity_of(&self, pose: &UprightPose, position: &Vector3<f64>) -> Vector3<f64> {
        self.angular.cross(&(position - pose.wheel_center)) + self.linear
    }
}

/// Distance constraint between an upright point and a chassis pivot.
#[derive(Clone, Copy, Debug)]
struct LinkConstraint {
    body: BodyPoint,
    inner: Vector3<f64>,
    link: RigidLink,
}

/// How the pushrod outer end follows the suspension.
#[derive(Clone, Copy, Debug)]
pub(crate) enum PushrodCarrier {
    /// Rigidly attached to the upright.
    Upright {
        /// Offset from the static wheel center.
        offset: Vector3<f64>,
    },
    /// Rotates with a wishbone about its inner pivot axis.
    Wishbone {
        /// Wishbone pivot axis.
        axis: RotationAxis,
        /// Ball joint that sets the wishbone angle.
        ball_joint: BodyPoint,
        /// Static ball joint position.
        ball_joint_reference: Vector3<f64>,
        /// Static pushrod outer position.
        reference: Vector3<f64>,
    },
}

/// Newton iteration limits, in absolute length units.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct NewtonSettings {
    /// Residual infinity norm to reach.
    pub tolerance: f64,
    /// Iteration budget.
    pub max_iterations: usize,
}

/// Reference data for the upright solve.
#[derive(Clone, Debug)]
pub(crate) struct UprightModel {
    /// Static wheel center.
    wheel_center: Vector3<f64>,
    /// Attachment offsets from the static wheel center, indexed by [`BodyPoint`].
    offsets: [Vector3<f64>; 3],
    /// Wishbone and tie rod constraints.
    constraints: [LinkConstraint; 5],
    /// Pushrod outer end mapping.
    pushrod: PushrodCarrier,
}

impl UprightModel {
    /// Capture offsets and link lengths from the static hardpoints.
    pub fn new(hardpoints: &Hardpoints) -> Result<Self, KinematicsError> {
        ensure_not_collinear(
            "upright attachment",
            hardpoints.lower_outer,
            hardpoints.upper_outer,
            hardpoints.tie_rod_outer,
        )?;
        ensure_not_collinear(
            "lower wishbone",
            hardpoints.lower_fore_inner,
            hardpoints.lower_aft_inner,
            hardpoints.lower_outer,
        )?;
        ensure_not_collinear(
            "upper wishbone",
            hardpoints.upper_fore_inner,
            hardpoints.upper_aft_inner,
            hardpoints.upper_outer,
        )?;

        let wheel_center = hardpoints.wheel_center.to_vector();
        let offset = |p: Point| p.to_vector() - wheel_center;
        let offsets = [
            offset(hardpoints.lower_outer),
            offset(hardpoints.upper_outer),
            offset(hardpoints.tie_rod_outer),
        ];
        let constraint = |body: BodyPoint, outer: Point, inner: Point| {
            Ok::<_, KinematicsError>(LinkConstraint {
                body,
                inner: inner.to_vector(),
                link: RigidLink::between(inner, outer)?,
            })
        };
        let constraints = [
            constraint(
                BodyPoint::LowerOuter,
                hardpoints.lower_outer,
                hardpoints.lower_fore_inner,
            )?,
            constraint(
                BodyPoint::LowerOuter,
                hardpoints.lower_outer,
                hardpoints.lower_aft_inner,
            )?,
            constraint(
                BodyPoint::UpperOuter,
                hardpoints.upper_outer,
                hardpoints.upper_fore_inner,
            )?,
            constraint(
                BodyPoint::UpperOuter,
                hardpoints.upper_outer,
                hardpoints.upper_aft_inner,
            )?,
            constraint(
                BodyPoint::TieRodOuter,
                hardpoints.tie_rod_outer,
                hardpoints.tie_rod_inner,
            )?,
        ];

        let pushrod = match hardpoints.pushrod_mount {
            PushrodMount::Upright => PushrodCarrier::Upright {
                offset: offset(hardpoints.pushrod_outer),
            },
            PushrodMount::LowerWishbone => PushrodCarrier::Wishbone {
                axis: RotationAxis::through(
                    hardpoints.lower_fore_inner,
                    hardpoints.lower_aft_inner,
                )?,
                ball_joint: BodyPoint::LowerOuter,
                ball_joint_reference: hardpoints.lower_outer.to_vector(),
                reference: hardpoints.pushrod_outer.to_vector(),
            },
            PushrodMount::UpperWishbone => PushrodCarrier::Wishbone {
                axis: RotationAxis::through(
                    hardpoints.upper_fore_inner,
                    hardpoints.upper_aft_inner,
                )?,
                ball_joint: BodyPoint::UpperOuter,
                ball_joint_reference: hardpoints.upper_outer.to_vector(),
                reference: hardpoints.pushrod_outer.to_vector(),
            },
        };

        let model = Self {
            wheel_center,
            offsets,
            constraints,
            pushrod,
        };
        let reference = UprightPose::reference(hardpoints.wheel_center);
        if !model.jacobian(&reference).lu().is_invertible() {
            return Err(KinematicsError::degenerate(
                "wishbones and tie rod do not locate the upright at ride height",
            ));
        }
        Ok(model)
    }

    /// Shortest link length, used to scale tolerances.
    pub fn shortest_link(&self) -> f64 {
        self.constraints
            .iter()
            .map(|constraint| constraint.link.length())
            .fold(f64::INFINITY, f64::min)
    }

    /// Position of an upright attachment point at `pose`.
    pub fn body_point(&self, pose: &UprightPose, point: BodyPoint) -> Vector3<f64> {
        pose.transform(&self.offsets[point as usize])
    }

    /// Pushrod outer end at `pose`.
    pub fn pushrod_outer(&self, pose: &UprightPose) -> Vector3<f64> {
        match &self.pushrod {
            PushrodCarrier::Upright { offset } => pose.transform(offset),
            PushrodCarrier::Wishbone {
                axis,
                ball_joint,
                ball_joint_reference,
                reference,
            } => {
                let current = self.body_point(pose, *ball_joint);
                let angle = axis.angle_between(*ball_joint_reference, current);
                axis.rotate(*reference, angle)
            }
        }
    }

    /// Velocity of the pushrod outer end per unit travel.
    pub fn pushrod_outer_rate(&self, pose: &UprightPose, rate: &PoseRate) -> Vector3<f64> {
        let position = self.pushrod_outer(pose);
        match &self.pushrod {
            PushrodCarrier::Upright { .. } => rate.velocity_of(pose, &position),
            PushrodCarrier::Wishbone {
                axis, ball_joint, ..
            } => {
                let joint = self.body_point(pose, *ball_joint);
                let joint_velocity = rate.velocity_of(pose, &joint);
                let radial = axis.radial(joint);
                let k = axis.direction.into_inner();
                let angular = k.dot(&radial.cross(&joint_velocity)) / radial.norm_squared();
                k.cross(&(position - axis.origin)) * angular
            }
        }
    }

    /// Constraint residuals, in length units.
    fn residual(&self, pose: &UprightPose, displacement: f64) -> Vector6<f64> {
        let mut residual = Vector6::zeros();
        for (row, constraint) in self.constraints.iter().enumerate() {
            let length = constraint.link.length();
            let delta = self.body_point(pose, constraint.body) - constraint.inner;
            residual[row] = (delta.norm_squared() - length * length) / (2.0 * length);
        }
        residual[5] = pose.wheel_center.z - (self.wheel_center.z + displacement);
        residual
    }

    /// Derivative of the residuals with respect to `[ω, v]`.
    fn jacobian(&self, pose: &UprightPose) -> Matrix6<f64> {
        let mut jacobian = Matrix6::zeros();
        for (row, constraint) in self.constraints.iter().enumerate() {
            let attachment = self.body_point(pose, constraint.body);
            let entries = link_row(
                &pose.wheel_center,
                &attachment,
                &constraint.inner,
                constraint.link.length(),
            );
            jacobian.set_row(row, &entries.transpose());
        }
        jacobian[(5, 5)] = 1.0;
        jacobian
    }

    /// Solve the pose at `displacement`, starting from `guess`.
    ///
    /// Returns the pose and the number of iterations spent.
    pub fn solve(
        &self,
        displacement: f64,
        guess: &UprightPose,
        settings: &NewtonSettings,
    ) -> Result<(UprightPose, usize), KinematicsError> {
        let mut pose = *guess;
        let mut residual = self.residual(&pose, displacement);
        let mut norm = residual.amax();
        let mut iterations = 0;
        while !(norm < settings.tolerance) {
            if iterations == settings.max_iterations || !norm.is_finite() {
                return Err(KinematicsError::NonConvergent {
                    displacement,
                    residual: norm,
                    iterations,
                    stage: SolveStage::Upright,
                });
            }
            let step = self
                .jacobian(&pose)
                .lu()
                .solve(&(-residual))
                .ok_or(KinematicsError::NonConvergent {
                    displacement,
                    residual: norm,
                    iterations,
                    stage: SolveStage::Upright,
                })?;
            pose = pose.advanced(&step);
            residual = self.residual(&pose, displacement);
            norm = residual.amax();
            iterations += 1;
        }
        debug!(displacement, iterations, residual = norm, "upright converged");
        Ok((pose, iterations))
    }

    /// Pose velocity per unit wheel travel at a solved pose.
    ///
    /// Returns `None` where the linkage is singular.
    pub fn rate(&self, pose: &UprightPose) -> Option<PoseRate> {
        let mut travel = Vector6::zeros();
        travel[5] = 1.0;
        let rate = self.jacobian(pose).lu().solve(&travel)?;
        Some(PoseRate {
            angular: Vector3::new(rate[0], rate[1], rate[2]),
            linear: Vector3::new(rate[3], rate[4], rate[5]),
        })
    }
}

/// Row of the pose Jacobian for a link from `inner` to a point `attachment`
/// on the upright, normalised by `length`.
///
/// The first three entries pair with a rotation about `center`, the last
/// three with a translation.
pub(crate) fn link_row(
    center: &Vector3<f64>,
    attachment: &Vector3<f64>,
    inner: &Vector3<f64>,
    length: f64,
) -> Vector6<f64> {
    let direction = (attachment - inner) / length;
    let moment = (attachment - center).cross(&direction);
    Vector6::new(
        moment.x,
        moment.y,
        moment.z,
        direction.x,
        direction.y,
        direction.z,
    )
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::geometry::point;

    fn settings() -> NewtonSettings {
        NewtonSettings {
            tolerance: 1.0e-9,
            max_iterations: 50,
        }
    }

    #[test]
    fn reference_pose_needs_no_iterations() {
        let hardpoints = Hardpoints::formula_student_front();
        let model = UprightModel::new(&hardpoints).expect("valid corner");
        let reference = UprightPose::reference(hardpoints.wheel_center);
        let (pose, iterations) = model.solve(0.0, &reference, &settings()).expect("solves");
        assert_eq!(iterations, 0);
        assert_eq!(pose, reference);
    }

    #[test]
    fn solved_pose_keeps_link_lengths() {
        let hardpoints = Hardpoints::formula_student_front();
        let model = UprightModel::new(&hardpoints).expect("valid corner");
        let reference = UprightPose::reference(hardpoints.wheel_center);
        let (pose, _) = model.solve(10.0, &reference, &settings()).expect("solves");
        assert_relative_eq!(pose.wheel_center.z, 213.0, epsilon = 1.0e-9);

        let lower = Point::from(model.body_point(&pose, BodyPoint::LowerOuter));
        let upper = Point::from(model.body_point(&pose, BodyPoint::UpperOuter));
        let tie_rod = Point::from(model.body_point(&pose, BodyPoint::TieRodOuter));
        let pairs = [
            (hardpoints.lower_fore_inner, hardpoints.lower_outer, lower),
            (hardpoints.lower_aft_inner, hardpoints.lower_outer, lower),
            (hardpoints.upper_fore_inner, hardpoints.upper_outer, upper),
            (hardpoints.upper_aft_inner, hardpoints.upper_outer, upper),
            (hardpoints.tie_rod_inner, hardpoints.tie_rod_outer, tie_rod),
        ];
        for (inner, outer, solved) in pairs {
            assert_relative_eq!(inner.distance(solved), inner.distance(outer), epsilon = 1.0e-7);
        }
        assert_relative_eq!(
            lower.distance(upper),
            hardpoints.lower_outer.distance(hardpoints.upper_outer),
            epsilon = 1.0e-9
        );
    }

    #[test]
    fn wishbone_pushrod_stays_on_the_wishbone() {
        let hardpoints = Hardpoints::formula_student_front();
        let model = UprightModel::new(&hardpoints).expect("valid corner");
        let reference = UprightPose::reference(hardpoints.wheel_center);
        let (pose, _) = model.solve(-15.0, &reference, &settings()).expect("solves");
        let pushrod = Point::from(model.pushrod_outer(&pose));
        let lower = Point::from(model.body_point(&pose, BodyPoint::LowerOuter));
        for anchor in [hardpoints.lower_fore_inner, hardpoints.lower_aft_inner] {
            assert_relative_eq!(
                anchor.distance(pushrod),
                anchor.distance(hardpoints.pushrod_outer),
                epsilon = 1.0e-9
            );
        }
        assert_relative_eq!(
            lower.distance(pushrod),
            hardpoints.lower_outer.distance(hardpoints.pushrod_outer),
            epsilon = 1.0e-6
        );
    }

    #[test]
    fn pose_rate_matches_finite_difference() {
        let hardpoints = Hardpoints::formula_student_front();
        let model = UprightModel::new(&hardpoints).expect("valid corner");
        let reference = UprightPose::reference(hardpoints.wheel_center);
        let h = 1.0e-3;
        let (above, _) = model.solve(h, &reference, &settings()).expect("solves");
        let (below, _) = model.solve(-h, &reference, &settings()).expect("solves");
        let rate = model.rate(&reference).expect("regular linkage");

        let lower_rate = rate.velocity_of(
            &reference,
            &model.body_point(&reference, BodyPoint::LowerOuter),
        );
        let difference = (model.body_point(&above, BodyPoint::LowerOuter)
            - model.body_point(&below, BodyPoint::LowerOuter))
            / (2.0 * h);
        assert_relative_eq!(lower_rate, difference, epsilon = 1.0e-5);
        assert_relative_eq!(rate.linear.z, 1.0, epsilon = 1.0e-9);

        let pushrod_rate = model.pushrod_outer_rate(&reference, &rate);
        let pushrod_difference =
            (model.pushrod_outer(&above) - model.pushrod_outer(&below)) / (2.0 * h);
        assert_relative_eq!(pushrod_rate, pushrod_difference, epsilon = 1.0e-5);
    }

    #[test]
    fn collinear_upright_is_degenerate() {
        let mut hardpoints = Hardpoints::formula_student_front();
        hardpoints.upper_outer = point(-3.1, 608.0, 299.0);
        hardpoints.tie_rod_outer = point(-3.1, 608.0, 163.0);
        let error = UprightModel::new(&hardpoints).expect_err("collinear rejected");
        assert!(matches!(error, KinematicsError::DegenerateGeometry { .. }));
    }

    #[test]
    fn budget_exhaustion_reports_the_step() {
        let hardpoints = Hardpoints::formula_student_front();
        let model = UprightModel::new(&hardpoints).expect("valid corner");
        let reference = UprightPose::reference(hardpoints.wheel_center);
        let tight = NewtonSettings {
            tolerance: 1.0e-9,
            max_iterations: 1,
        };
        let error = model
            .solve(20.0, &reference, &tight)
            .expect_err("one iteration is not enough");
        match error {
            KinematicsError::NonConvergent {
                displacement,
                iterations,
                stage,
                residual,
            } => {
                assert_relative_eq!(displacement, 20.0);
                assert_eq!(iterations, 1);
                assert_eq!(stage, SolveStage::Upright);
                assert!(residual > 1.0e-9);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
