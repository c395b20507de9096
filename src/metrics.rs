//! Wheel angles, scrub, roll center and motion ratio from solved geometry.
//!
//! Angles are reported in degrees as the static alignment plus the change
//! caused by the linkage, so every angle equals its static offset at zero
//! travel. Sign conventions, for a corner on either side of the car:
//!
//! * camber is negative when the top of the wheel leans inboard,
//! * caster is positive when the steering axis leans rearward at the top,
//! * toe is positive for toe-in,
//! * scrub is positive when the contact patch moves outboard.
//!
//! The vehicle centreline is the plane `y = 0` and the ground is `z = 0` at
//! static ride height.

use nalgebra::{Vector2, Vector3};
use serde::{Deserialize, Serialize};

use crate::config::StaticAlignment;
use crate::geometry::Point;
use crate::hardpoints::Hardpoints;
use crate::rocker::RockerModel;
use crate::series::SolvedGeometry;
use crate::upright::{UprightModel, UprightPose};

/// Derived quantities at one travel step.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct KinematicMetrics {
    /// Camber, degrees.
    pub camber: f64,
    /// Caster, degrees.
    pub caster: f64,
    /// Toe, degrees.
    pub toe: f64,
    /// Kingpin inclination in front view, degrees.
    pub kingpin_inclination: f64,
    /// Lateral contact patch movement from static.
    pub scrub: f64,
    /// Front-view distance from the kingpin ground intercept to the contact
    /// patch, positive with the patch outboard.
    pub scrub_radius: Option<f64>,
    /// Front-view instant center, `None` for parallel wishbones.
    pub instant_center: Option<Point>,
    /// Roll center on the centreline assuming a mirrored opposite corner.
    pub roll_center: Option<Point>,
    /// Body roll that produces this wheel travel, degrees.
    pub roll_angle: f64,
    /// Rocker rotation from static, degrees.
    pub rocker_angle: f64,
    /// Eye-to-eye shock length.
    pub shock_length: f64,
    /// `d(shock length) / d(travel)` by finite difference over neighbouring
    /// steps; one-sided, and so less accurate, at the ends of a series.
    pub motion_ratio: Option<f64>,
    /// The same derivative from the linkage Jacobian at this step.
    pub instantaneous_motion_ratio: Option<f64>,
}

/// One point of the roll center path.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RollCenterInRoll {
    /// Jounce of this corner; the opposite corner sits at the same rebound.
    pub displacement: f64,
    /// Body roll for that travel, degrees.
    pub roll_angle: f64,
    /// Intersection of both corners' contact patch to instant center lines,
    /// `None` when they are parallel.
    pub center: Option<Point>,
}

/// Reference quantities needed to turn geometry into metrics.
#[derive(Clone, Copy, Debug)]
pub(crate) struct MetricsFrame {
    /// `+1` for a corner on the positive Y side, `-1` otherwise.
    pub side: f64,
    /// Static wheel-center height above the ground.
    pub tyre_radius: f64,
    /// Static steering axis, lower to upper ball joint.
    pub kingpin: Vector3<f64>,
    /// Static contact patch.
    pub contact_patch: Point,
}

impl MetricsFrame {
    /// Capture the static references from the hardpoints.
    pub fn new(hardpoints: &Hardpoints) -> Self {
        let side = if hardpoints.wheel_center.y < 0.0 { -1.0 } else { 1.0 };
        let wheel_center = hardpoints.wheel_center;
        Self {
            side,
            tyre_radius: wheel_center.z,
            kingpin: hardpoints.upper_outer.to_vector() - hardpoints.lower_outer.to_vector(),
            contact_patch: Point::new(wheel_center.x, wheel_center.y, 0.0),
        }
    }

    /// Wheel spin axis, pointing outboard.
    fn spin_axis(&self, pose: &UprightPose) -> Vector3<f64> {
        pose.rotation * Vector3::new(0.0, self.side, 0.0)
    }

    /// Lowest point of the wheel circle in the current wheel plane.
    pub fn contact_patch(&self, pose: &UprightPose) -> Point {
        let spin = self.spin_axis(pose);
        let up = Vector3::z();
        let down = -(up - spin * up.dot(&spin));
        let down = down
            .try_normalize(f64::EPSILON)
            .unwrap_or_else(|| -Vector3::z());
        Point::from(pose.wheel_center + down * self.tyre_radius)
    }

    /// Geometric camber of the wheel plane, degrees.
    fn camber(&self, pose: &UprightPose) -> f64 {
        let spin = self.spin_axis(pose);
        -spin.z.atan2(spin.y * self.side).to_degrees()
    }

    /// Geometric toe, degrees.
    fn toe(&self, pose: &UprightPose) -> f64 {
        let forward = pose.rotation * Vector3::x();
        -self.side * forward.y.atan2(forward.x).to_degrees()
    }

    /// Caster angle of a steering axis, degrees.
    fn caster_of(kingpin: &Vector3<f64>) -> f64 {
        (-kingpin.x).atan2(kingpin.z).to_degrees()
    }

    /// Kingpin inclination of a steering axis, degrees.
    fn inclination_of(&self, kingpin: &Vector3<f64>) -> f64 {
        (-self.side * kingpin.y).atan2(kingpin.z).to_degrees()
    }

    /// Body roll equivalent to a wheel travel.
    pub fn roll_angle(&self, displacement: f64) -> f64 {
        displacement.atan2(self.contact_patch.y.abs()).to_degrees()
    }
}

/// A line in the front (Y-Z) view.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct FrontViewLine {
    /// Point on the line as `(y, z)`.
    pub origin: Vector2<f64>,
    /// Direction as `(y, z)`.
    pub direction: Vector2<f64>,
}

impl FrontViewLine {
    /// Mirror across the centreline.
    pub fn mirrored(&self) -> Self {
        Self {
            origin: Vector2::new(-self.origin.x, self.origin.y),
            direction: Vector2::new(-self.direction.x, self.direction.y),
        }
    }

    /// Height where the line crosses the centreline.
    pub fn centreline_height(&self) -> Option<f64> {
        if self.direction.x.abs() <= 1.0e-12 * self.direction.norm() {
            return None;
        }
        let t = -self.origin.x / self.direction.x;
        Some(self.origin.y + t * self.direction.y)
    }

    /// Intersection with another line, as `(y, z)`.
    pub fn intersect(&self, other: &Self) -> Option<Vector2<f64>> {
        let denominator = cross2(&self.direction, &other.direction);
        if denominator.abs() <= 1.0e-12 * self.direction.norm() * other.direction.norm() {
            return None;
        }
        let t = cross2(&(other.origin - self.origin), &other.direction) / denominator;
        Some(self.origin + self.direction * t)
    }
}

/// Scalar cross product of two front-view vectors.
fn cross2(a: &Vector2<f64>, b: &Vector2<f64>) -> f64 {
    a.x * b.y - a.y * b.x
}

/// Front-view trace of a wishbone plane at longitudinal position `x`.
fn wishbone_trace(fore: Point, aft: Point, outer: Point, x: f64) -> Option<FrontViewLine> {
    let fore = fore.to_vector();
    let normal = (aft.to_vector() - fore).cross(&(outer.to_vector() - fore));
    let in_plane = Vector2::new(normal.y, normal.z);
    if in_plane.norm() <= 1.0e-12 * normal.norm() {
        return None;
    }
    // normal.y * y + normal.z * z = offset describes the trace.
    let offset = normal.dot(&fore) - normal.x * x;
    let origin = in_plane * (offset / in_plane.norm_squared());
    Some(FrontViewLine {
        origin,
        direction: Vector2::new(-normal.z, normal.y),
    })
}

/// Front-view line from the contact patch through the instant center, and
/// the instant center itself when the wishbone traces intersect.
pub(crate) fn roll_center_line(
    hardpoints: &Hardpoints,
    geometry: &SolvedGeometry,
) -> Option<(FrontViewLine, Option<Point>)> {
    let x = geometry.wheel_center.x;
    let lower = wishbone_trace(
        hardpoints.lower_fore_inner,
        hardpoints.lower_aft_inner,
        geometry.lower_outer,
        x,
    )?;
    let upper = wishbone_trace(
        hardpoints.upper_fore_inner,
        hardpoints.upper_aft_inner,
        geometry.upper_outer,
        x,
    )?;
    let patch = Vector2::new(geometry.contact_patch.y, geometry.contact_patch.z);
    match lower.intersect(&upper) {
        Some(center) => {
            let direction = center - patch;
            if direction.norm() <= f64::EPSILON {
                return None;
            }
            Some((
                FrontViewLine {
                    origin: patch,
                    direction,
                },
                Some(Point::new(x, center.x, center.y)),
            ))
        }
        None => Some((
            FrontViewLine {
                origin: patch,
                direction: lower.direction,
            },
            None,
        )),
    }
}

/// Shock length rate per unit travel from the linkage Jacobian.
pub(crate) fn instantaneous_motion_ratio(
    upright: &UprightModel,
    rocker: &RockerModel,
    geometry: &SolvedGeometry,
) -> Option<f64> {
    let rate = upright.rate(&geometry.pose)?;
    let pushrod_outer = geometry.pushrod_outer.to_vector();
    let pushrod_rate = upright.pushrod_outer_rate(&geometry.pose, &rate);
    let angle_rate = rocker.angle_rate(geometry.rocker_angle, &pushrod_outer, &pushrod_rate)?;
    Some(rocker.shock_length_rate(geometry.rocker_angle, angle_rate))
}

/// Finite-difference shock length rate at `index`: central inside the
/// series, one-sided at either end.
pub(crate) fn motion_ratio(geometries: &[SolvedGeometry], index: usize) -> Option<f64> {
    let last = geometries.len().checked_sub(1)?;
    if last == 0 || index > last {
        return None;
    }
    let (before, after) = if index == 0 {
        (0, 1)
    } else if index == last {
        (last - 1, last)
    } else {
        (index - 1, index + 1)
    };
    let travel = geometries[after].displacement - geometries[before].displacement;
    if travel.abs() <= f64::EPSILON {
        return None;
    }
    Some((geometries[after].shock_length - geometries[before].shock_length) / travel)
}

/// Everything the extractor reads besides the step itself.
pub(crate) struct Extractor<'a> {
    /// Static pickup points, for the wishbone pivots.
    pub hardpoints: &'a Hardpoints,
    /// Static references.
    pub frame: &'a MetricsFrame,
    /// Upright model, for the linkage rates.
    pub upright: &'a UprightModel,
    /// Rocker model, for the linkage rates.
    pub rocker: &'a RockerModel,
    /// Offsets added to the angles.
    pub alignment: &'a StaticAlignment,
}

impl Extractor<'_> {
    /// Metrics for the step at `index` of an ordered series.
    pub fn extract(&self, geometries: &[SolvedGeometry], index: usize) -> KinematicMetrics {
        let geometry = &geometries[index];
        let frame = self.frame;
        let pose = &geometry.pose;

        let kingpin = pose.rotation * frame.kingpin;
        let caster_change =
            MetricsFrame::caster_of(&kingpin) - MetricsFrame::caster_of(&frame.kingpin);

        let (roll_line, instant_center) = match roll_center_line(self.hardpoints, geometry) {
            Some((line, center)) => (Some(line), center),
            None => (None, None),
        };
        let roll_center = roll_line
            .and_then(|line| line.centreline_height())
            .map(|height| Point::new(geometry.wheel_center.x, 0.0, height));

        KinematicMetrics {
            camber: self.alignment.camber + frame.camber(pose),
            caster: self.alignment.caster + caster_change,
            toe: self.alignment.toe + frame.toe(pose),
            kingpin_inclination: frame.inclination_of(&kingpin),
            scrub: frame.side * (geometry.contact_patch.y - frame.contact_patch.y),
            scrub_radius: scrub_radius(frame.side, geometry),
            instant_center,
            roll_center,
            roll_angle: frame.roll_angle(geometry.displacement),
            rocker_angle: geometry.rocker_angle.to_degrees(),
            shock_length: geometry.shock_length,
            motion_ratio: motion_ratio(geometries, index),
            instantaneous_motion_ratio: instantaneous_motion_ratio(
                self.upright,
                self.rocker,
                geometry,
            ),
        }
    }
}

/// Where the steering axis meets the contact patch height, measured to the
/// contact patch in front view.
fn scrub_radius(side: f64, geometry: &SolvedGeometry) -> Option<f64> {
    let lower = geometry.lower_outer;
    let upper = geometry.upper_outer;
    let rise = upper.z - lower.z;
    if rise.abs() <= f64::EPSILON {
        return None;
    }
    let t = (geometry.contact_patch.z - lower.z) / rise;
    let intercept = lower.y + t * (upper.y - lower.y);
    Some(side * (geometry.contact_patch.y - intercept))
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use nalgebra::UnitQuaternion;

    use super::*;
    use crate::geometry::point;

    fn frame() -> MetricsFrame {
        MetricsFrame::new(&Hardpoints::formula_student_front())
    }

    fn rolled(axis: Vector3<f64>, degrees: f64) -> UprightPose {
        UprightPose {
            rotation: UnitQuaternion::from_scaled_axis(axis * degrees.to_radians()),
            wheel_center: Vector3::new(0.0, 622.5, 203.0),
        }
    }

    #[test]
    fn static_pose_has_no_geometric_angles() {
        let frame = frame();
        let pose = UprightPose::reference(point(0.0, 622.5, 203.0));
        assert_eq!(frame.camber(&pose), 0.0);
        assert_eq!(frame.toe(&pose), 0.0);
        assert_eq!(frame.contact_patch(&pose), point(0.0, 622.5, 0.0));
    }

    #[test]
    fn top_leaning_inboard_is_negative_camber() {
        // Rotating about +X moves the top of a right-hand wheel towards -Y.
        let pose = rolled(Vector3::x(), 2.0);
        assert_relative_eq!(frame().camber(&pose), -2.0, epsilon = 1.0e-9);
    }

    #[test]
    fn front_turning_inboard_is_toe_in() {
        // Rotating about -Z turns the front of a right-hand wheel towards -Y.
        let pose = rolled(-Vector3::z(), 0.5);
        assert_relative_eq!(frame().toe(&pose), 0.5, epsilon = 1.0e-9);
    }

    #[test]
    fn left_corner_mirrors_signs() {
        let mut hardpoints = Hardpoints::formula_student_front();
        hardpoints.wheel_center = point(0.0, -622.5, 203.0);
        let frame = MetricsFrame::new(&hardpoints);
        let pose = UprightPose {
            rotation: UnitQuaternion::from_scaled_axis(-Vector3::x() * 2.0_f64.to_radians()),
            wheel_center: Vector3::new(0.0, -622.5, 203.0),
        };
        assert_relative_eq!(frame.camber(&pose), -2.0, epsilon = 1.0e-9);
    }

    #[test]
    fn rearward_steering_axis_is_positive_caster() {
        let kingpin = Vector3::new(-1.0, 0.0, 10.0);
        assert!(MetricsFrame::caster_of(&kingpin) > 0.0);
        assert_relative_eq!(
            frame().inclination_of(&Vector3::new(0.0, -1.0, 1.0)),
            45.0,
            epsilon = 1.0e-9
        );
    }

    #[test]
    fn lines_intersect_and_cross_the_centreline() {
        let a = FrontViewLine {
            origin: Vector2::new(600.0, 0.0),
            direction: Vector2::new(-1.0, 0.1),
        };
        assert_relative_eq!(a.centreline_height().expect("crosses"), 60.0, epsilon = 1.0e-9);
        let b = a.mirrored();
        let crossing = a.intersect(&b).expect("mirrored lines meet");
        assert_relative_eq!(crossing, Vector2::new(0.0, 60.0), epsilon = 1.0e-9);
        assert!(a.intersect(&a).is_none());
    }

    #[test]
    fn horizontal_wishbone_trace_is_horizontal() {
        let trace = wishbone_trace(
            point(100.0, 200.0, 100.0),
            point(-100.0, 200.0, 100.0),
            point(0.0, 600.0, 100.0),
            0.0,
        )
        .expect("trace exists");
        assert_relative_eq!(trace.direction.y, 0.0, epsilon = 1.0e-9);
        assert_relative_eq!(trace.origin.y, 100.0, epsilon = 1.0e-9);
    }

    #[test]
    fn motion_ratio_uses_neighbours() {
        let hardpoints = Hardpoints::formula_student_front();
        let base = SolvedGeometry {
            displacement: 0.0,
            pose: UprightPose::reference(hardpoints.wheel_center),
            wheel_center: hardpoints.wheel_center,
            lower_outer: hardpoints.lower_outer,
            upper_outer: hardpoints.upper_outer,
            tie_rod_outer: hardpoints.tie_rod_outer,
            pushrod_outer: hardpoints.pushrod_outer,
            pushrod_inner: hardpoints.pushrod_inner,
            shock_upper: hardpoints.shock_upper,
            contact_patch: point(0.0, 622.5, 0.0),
            rocker_angle: 0.0,
            shock_length: 200.0,
        };
        let geometries: Vec<SolvedGeometry> = [(-1.0, 200.5), (0.0, 200.0), (1.0, 199.7)]
            .into_iter()
            .map(|(displacement, shock_length)| SolvedGeometry {
                displacement,
                shock_length,
                ..base.clone()
            })
            .collect();
        assert_relative_eq!(motion_ratio(&geometries, 0).expect("defined"), -0.5, epsilon = 1.0e-9);
        assert_relative_eq!(motion_ratio(&geometries, 1).expect("defined"), -0.4, epsilon = 1.0e-9);
        assert_relative_eq!(motion_ratio(&geometries, 2).expect("defined"), -0.3, epsilon = 1.0e-9);
        assert!(motion_ratio(&geometries[..1], 0).is_none());
    }
}
