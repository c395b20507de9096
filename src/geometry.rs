//! Fundamental geometric types for suspension modelling.

use nalgebra::{Rotation3, Unit, Vector3};
use serde::{Deserialize, Serialize};

use crate::errors::KinematicsError;

/// Position in three dimensional space, in the corner's length unit.
///
/// The frame is vehicle fixed: X points forward, Y outboard towards the
/// corner being analysed and Z up from the ground plane.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Distance along the global X axis.
    pub x: f64,
    /// Distance along the global Y axis.
    pub y: f64,
    /// Distance along the global Z axis.
    pub z: f64,
}

impl Point {
    /// Create a [`Point`] with explicit coordinates.
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Convert the point into an algebraic vector.
    #[must_use]
    pub fn to_vector(self) -> Vector3<f64> {
        Vector3::new(self.x, self.y, self.z)
    }

    /// Euclidean distance between two points.
    ///
    /// # Examples
    /// ```
    /// use kinematix::point;
    ///
    /// let d = point(0.0, 0.0, 0.0).distance(point(3.0, 4.0, 0.0));
    /// assert!((d - 5.0).abs() < 1.0e-12);
    /// ```
    #[must_use]
    pub fn distance(self, other: Point) -> f64 {
        (other.to_vector() - self.to_vector()).norm()
    }

    /// Coordinate along `axis` (0 = X, 1 = Y, 2 = Z).
    pub(crate) fn coordinate(self, axis: usize) -> f64 {
        match axis {
            0 => self.x,
            1 => self.y,
            _ => self.z,
        }
    }

    /// Copy of the point with one coordinate replaced.
    #[must_use]
    pub(crate) fn with_coordinate(self, axis: usize, value: f64) -> Self {
        match axis {
            0 => Self { x: value, ..self },
            1 => Self { y: value, ..self },
            _ => Self { z: value, ..self },
        }
    }
}

impl From<Vector3<f64>> for Point {
    fn from(value: Vector3<f64>) -> Self {
        Self::new(value.x, value.y, value.z)
    }
}

impl From<Point> for Vector3<f64> {
    fn from(value: Point) -> Self {
        value.to_vector()
    }
}

/// Cartesian vector representing a three dimensional force in newtons.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Force {
    /// Force component acting along the global X axis.
    pub x: f64,
    /// Force component acting along the global Y axis.
    pub y: f64,
    /// Force component acting along the global Z axis.
    pub z: f64,
}

impl Force {
    /// Create a [`Force`] with explicit components.
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Convert the force into an algebraic vector.
    #[must_use]
    pub fn to_vector(self) -> Vector3<f64> {
        Vector3::new(self.x, self.y, self.z)
    }
}

impl Default for Force {
    fn default() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }
}

impl From<Vector3<f64>> for Force {
    fn from(value: Vector3<f64>) -> Self {
        Self::new(value.x, value.y, value.z)
    }
}

/// A rigid rod between two joints whose length is frozen at the reference
/// configuration.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RigidLink {
    /// Reference length captured at construction.
    length: f64,
}

impl RigidLink {
    /// Capture the reference length between `a` and `b`.
    ///
    /// # Errors
    ///
    /// Returns [`KinematicsError::DegenerateGeometry`] when both points coincide.
    ///
    /// # Examples
    /// ```
    /// use kinematix::{point, RigidLink};
    ///
    /// let link = RigidLink::between(point(0.0, 0.0, 0.0), point(0.0, 2.0, 0.0)).unwrap();
    /// assert!((link.length() - 2.0).abs() < 1.0e-12);
    /// assert!(RigidLink::between(point(1.0, 1.0, 1.0), point(1.0, 1.0, 1.0)).is_err());
    /// ```
    pub fn between(a: Point, b: Point) -> Result<Self, KinematicsError> {
        let length = a.distance(b);
        if length <= f64::EPSILON {
            return Err(KinematicsError::degenerate(format!(
                "link from {a:?} to {b:?} has zero length"
            )));
        }
        Ok(Self { length })
    }

    /// Reference length of the link.
    #[must_use]
    pub fn length(&self) -> f64 {
        self.length
    }

    /// Signed violation of the length invariant for the given endpoints.
    #[must_use]
    pub fn error(&self, a: Point, b: Point) -> f64 {
        a.distance(b) - self.length
    }

    /// Whether the endpoints honour the link length within `epsilon` of it.
    #[must_use]
    pub fn holds(&self, a: Point, b: Point, epsilon: f64) -> bool {
        self.error(a, b).abs() <= epsilon * self.length
    }
}

/// Convenience helper for creating [`Point`] instances.
///
/// # Examples
/// ```
/// use kinematix::point;
///
/// let wheel_center = point(0.0, 622.5, 203.0);
/// assert_eq!(wheel_center.y, 622.5);
/// ```
#[must_use]
pub const fn point(x: f64, y: f64, z: f64) -> Point {
    Point::new(x, y, z)
}

/// Convenience helper for creating [`Force`] instances.
///
/// # Examples
/// ```
/// use kinematix::force;
///
/// let load = force(0.0, 0.0, 100.0);
/// assert_eq!(load.z, 100.0);
/// ```
#[must_use]
pub const fn force(x: f64, y: f64, z: f64) -> Force {
    Force::new(x, y, z)
}

/// Area of the triangle spanned by three points.
pub(crate) fn triangle_area(a: Point, b: Point, c: Point) -> f64 {
    let ab = b.to_vector() - a.to_vector();
    let ac = c.to_vector() - a.to_vector();
    0.5 * ab.cross(&ac).norm()
}

/// Reject point triples that cannot orient a rigid body.
///
/// The threshold is relative to the longest side so the check is scale free.
pub(crate) fn ensure_not_collinear(
    what: &str,
    a: Point,
    b: Point,
    c: Point,
) -> Result<(), KinematicsError> {
    let longest = a.distance(b).max(b.distance(c)).max(a.distance(c));
    if longest <= f64::EPSILON || triangle_area(a, b, c) <= 1.0e-9 * longest * longest {
        return Err(KinematicsError::degenerate(format!(
            "{what} points are collinear"
        )));
    }
    Ok(())
}

/// A fixed rotation axis in space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct RotationAxis {
    /// A point on the axis.
    pub origin: Vector3<f64>,
    /// Unit direction of the axis.
    pub direction: Unit<Vector3<f64>>,
}

impl RotationAxis {
    /// Axis through `origin` along `direction`.
    pub fn new(origin: Point, direction: Vector3<f64>) -> Result<Self, KinematicsError> {
        if direction.norm() <= f64::EPSILON {
            return Err(KinematicsError::degenerate("rotation axis has no direction"));
        }
        Ok(Self {
            origin: origin.to_vector(),
            direction: Unit::new_normalize(direction),
        })
    }

    /// Axis through two points.
    pub fn through(a: Point, b: Point) -> Result<Self, KinematicsError> {
        Self::new(a, b.to_vector() - a.to_vector())
    }

    /// Component of `p - origin` perpendicular to the axis.
    pub fn radial(&self, p: Vector3<f64>) -> Vector3<f64> {
        let k = self.direction.into_inner();
        let r = p - self.origin;
        r - k * r.dot(&k)
    }

    /// Rotate `p` about the axis by `angle` radians (right hand rule).
    pub fn rotate(&self, p: Vector3<f64>, angle: f64) -> Vector3<f64> {
        let rotation = Rotation3::from_axis_angle(&self.direction, angle);
        self.origin + rotation * (p - self.origin)
    }

    /// Signed angle that carries `from` onto `to` about the axis.
    pub fn angle_between(&self, from: Vector3<f64>, to: Vector3<f64>) -> f64 {
        let u = self.radial(from);
        let v = self.radial(to);
        self.direction.dot(&u.cross(&v)).atan2(u.dot(&v))
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn point_to_vector_roundtrip() {
        let origin = Point::new(1.0, 2.0, 3.0);
        let vector: Vector3<f64> = origin.into();
        assert_eq!(vector, Vector3::new(1.0, 2.0, 3.0));
        assert_eq!(Point::from(vector), origin);
    }

    #[test]
    fn force_defaults_to_zero() {
        assert_eq!(Force::default(), Force::new(0.0, 0.0, 0.0));
    }

    #[test]
    fn zero_length_link_is_rejected() {
        let error = RigidLink::between(point(1.0, 2.0, 3.0), point(1.0, 2.0, 3.0))
            .expect_err("zero length rejected");
        assert!(matches!(error, KinematicsError::DegenerateGeometry { .. }));
    }

    #[test]
    fn link_reports_length_violation() {
        let link = RigidLink::between(point(0.0, 0.0, 0.0), point(10.0, 0.0, 0.0))
            .expect("valid link");
        assert_relative_eq!(link.error(point(0.0, 0.0, 0.0), point(0.0, 11.0, 0.0)), 1.0);
        assert!(link.holds(point(1.0, 0.0, 0.0), point(1.0, 10.0, 0.0), 1.0e-9));
    }

    #[test]
    fn collinear_points_are_degenerate() {
        let result = ensure_not_collinear(
            "upright",
            point(0.0, 0.0, 0.0),
            point(1.0, 1.0, 1.0),
            point(2.0, 2.0, 2.0),
        );
        assert!(result.is_err());
        assert!(ensure_not_collinear(
            "upright",
            point(0.0, 0.0, 0.0),
            point(1.0, 0.0, 0.0),
            point(0.0, 1.0, 0.0),
        )
        .is_ok());
    }

    #[test]
    fn quarter_turn_about_z() {
        let axis = RotationAxis::new(point(1.0, 0.0, 0.0), Vector3::z()).expect("valid axis");
        let rotated = axis.rotate(Vector3::new(2.0, 0.0, 5.0), std::f64::consts::FRAC_PI_2);
        assert_relative_eq!(rotated, Vector3::new(1.0, 1.0, 5.0), epsilon = 1.0e-12);
        let angle = axis.angle_between(Vector3::new(2.0, 0.0, 5.0), rotated);
        assert_relative_eq!(angle, std::f64::consts::FRAC_PI_2, epsilon = 1.0e-12);
    }

    proptest! {
        #[test]
        fn rotation_preserves_distance_to_axis(
            angle in -3.0..3.0f64,
            p in prop::array::uniform3(-100.0..100.0f64),
        ) {
            let axis = RotationAxis::through(point(0.0, 0.0, 0.0), point(1.0, 2.0, 3.0)).unwrap();
            let before = Vector3::new(p[0], p[1], p[2]);
            let after = axis.rotate(before, angle);
            prop_assert!((axis.radial(before).norm() - axis.radial(after).norm()).abs() < 1.0e-9);
            prop_assert!(
                ((after - axis.origin).norm() - (before - axis.origin).norm()).abs() < 1.0e-9
            );
        }
    }
}
