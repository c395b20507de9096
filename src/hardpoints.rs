//! Pickup point definitions for a single suspension corner.

use serde::{Deserialize, Serialize};

use crate::geometry::{point, Point};

/// Where the outboard end of the pushrod is mounted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PushrodMount {
    /// Pushrod moves rigidly with the upright.
    Upright,
    /// Pushrod rotates with the lower wishbone about its inner pivot axis.
    #[default]
    LowerWishbone,
    /// Pushrod rotates with the upper wishbone about its inner pivot axis.
    UpperWishbone,
}

/// Identifier for every pickup point of the corner.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HardpointId {
    /// Wheel center.
    WheelCenter,
    /// Lower wishbone front inner pivot.
    LowerForeInner,
    /// Lower wishbone rear inner pivot.
    LowerAftInner,
    /// Lower ball joint on the upright.
    LowerOuter,
    /// Upper wishbone front inner pivot.
    UpperForeInner,
    /// Upper wishbone rear inner pivot.
    UpperAftInner,
    /// Upper ball joint on the upright.
    UpperOuter,
    /// Tie rod chassis (rack) end.
    TieRodInner,
    /// Tie rod upright end.
    TieRodOuter,
    /// Pushrod end on the rocker.
    PushrodInner,
    /// Pushrod end on the wishbone or upright.
    PushrodOuter,
    /// Rocker pivot on the chassis.
    RockerPivot,
    /// Shock end on the rocker.
    ShockUpper,
    /// Shock end on the chassis.
    ShockLower,
}

impl HardpointId {
    /// All identifiers, in declaration order.
    pub const ALL: [HardpointId; 14] = [
        Self::WheelCenter,
        Self::LowerForeInner,
        Self::LowerAftInner,
        Self::LowerOuter,
        Self::UpperForeInner,
        Self::UpperAftInner,
        Self::UpperOuter,
        Self::TieRodInner,
        Self::TieRodOuter,
        Self::PushrodInner,
        Self::PushrodOuter,
        Self::RockerPivot,
        Self::ShockUpper,
        Self::ShockLower,
    ];

    /// Short lowercase name used in logs and reports.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::WheelCenter => "wheel_center",
            Self::LowerForeInner => "lower_fore_inner",
            Self::LowerAftInner => "lower_aft_inner",
            Self::LowerOuter => "lower_outer",
            Self::UpperForeInner => "upper_fore_inner",
            Self::UpperAftInner => "upper_aft_inner",
            Self::UpperOuter => "upper_outer",
            Self::TieRodInner => "tie_rod_inner",
            Self::TieRodOuter => "tie_rod_outer",
            Self::PushrodInner => "pushrod_inner",
            Self::PushrodOuter => "pushrod_outer",
            Self::RockerPivot => "rocker_pivot",
            Self::ShockUpper => "shock_upper",
            Self::ShockLower => "shock_lower",
        }
    }
}

impl std::fmt::Display for HardpointId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Coordinate perturbed by a sweep.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SweepAxis {
    /// Longitudinal.
    X,
    /// Lateral.
    Y,
    /// Vertical.
    Z,
}

impl SweepAxis {
    /// Component index of the axis.
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            Self::X => 0,
            Self::Y => 1,
            Self::Z => 2,
        }
    }
}

impl std::str::FromStr for SweepAxis {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "X" => Ok(Self::X),
            "Y" => Ok(Self::Y),
            "Z" => Ok(Self::Z),
            other => Err(format!("unknown axis {other:?}, expected X, Y or Z")),
        }
    }
}

/// Static (ride height) pickup points of one corner.
///
/// Wishbones are given as fore inner, aft inner and outer ball joint; the
/// tie rod, pushrod and shock as inner/outer or upper/lower pairs.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Hardpoints {
    /// Wheel center at static ride height.
    pub wheel_center: Point,
    /// Lower wishbone front inner pivot.
    pub lower_fore_inner: Point,
    /// Lower wishbone rear inner pivot.
    pub lower_aft_inner: Point,
    /// Lower ball joint.
    pub lower_outer: Point,
    /// Upper wishbone front inner pivot.
    pub upper_fore_inner: Point,
    /// Upper wishbone rear inner pivot.
    pub upper_aft_inner: Point,
    /// Upper ball joint.
    pub upper_outer: Point,
    /// Tie rod inner end.
    pub tie_rod_inner: Point,
    /// Tie rod outer end.
    pub tie_rod_outer: Point,
    /// Pushrod end on the rocker.
    pub pushrod_inner: Point,
    /// Pushrod end on the wishbone or upright.
    pub pushrod_outer: Point,
    /// Rocker pivot.
    pub rocker_pivot: Point,
    /// Optional explicit rocker rotation axis direction.
    #[serde(default)]
    pub rocker_axis: Option<Point>,
    /// Shock end on the rocker.
    pub shock_upper: Point,
    /// Shock end on the chassis.
    pub shock_lower: Point,
    /// Body the pushrod outer end is attached to.
    #[serde(default)]
    pub pushrod_mount: PushrodMount,
}

impl Hardpoints {
    /// Position of a pickup point.
    #[must_use]
    pub fn get(&self, id: HardpointId) -> Point {
        match id {
            HardpointId::WheelCenter => self.wheel_center,
            HardpointId::LowerForeInner => self.lower_fore_inner,
            HardpointId::LowerAftInner => self.lower_aft_inner,
            HardpointId::LowerOuter => self.lower_outer,
            HardpointId::UpperForeInner => self.upper_fore_inner,
            HardpointId::UpperAftInner => self.upper_aft_inner,
            HardpointId::UpperOuter => self.upper_outer,
            HardpointId::TieRodInner => self.tie_rod_inner,
            HardpointId::TieRodOuter => self.tie_rod_outer,
            HardpointId::PushrodInner => self.pushrod_inner,
            HardpointId::PushrodOuter => self.pushrod_outer,
            HardpointId::RockerPivot => self.rocker_pivot,
            HardpointId::ShockUpper => self.shock_upper,
            HardpointId::ShockLower => self.shock_lower,
        }
    }

    /// Copy of the hardpoints with one pickup point moved.
    #[must_use]
    pub fn with(&self, id: HardpointId, position: Point) -> Self {
        let mut moved = *self;
        let slot = match id {
            HardpointId::WheelCenter => &mut moved.wheel_center,
            HardpointId::LowerForeInner => &mut moved.lower_fore_inner,
            HardpointId::LowerAftInner => &mut moved.lower_aft_inner,
            HardpointId::LowerOuter => &mut moved.lower_outer,
            HardpointId::UpperForeInner => &mut moved.upper_fore_inner,
            HardpointId::UpperAftInner => &mut moved.upper_aft_inner,
            HardpointId::UpperOuter => &mut moved.upper_outer,
            HardpointId::TieRodInner => &mut moved.tie_rod_inner,
            HardpointId::TieRodOuter => &mut moved.tie_rod_outer,
            HardpointId::PushrodInner => &mut moved.pushrod_inner,
            HardpointId::PushrodOuter => &mut moved.pushrod_outer,
            HardpointId::RockerPivot => &mut moved.rocker_pivot,
            HardpointId::ShockUpper => &mut moved.shock_upper,
            HardpointId::ShockLower => &mut moved.shock_lower,
        };
        *slot = position;
        moved
    }

    /// Front-right corner of a small formula-student car, dimensions in
    /// millimetres.
    ///
    /// # Examples
    /// ```
    /// use kinematix::Hardpoints;
    ///
    /// let corner = Hardpoints::formula_student_front();
    /// assert_eq!(corner.wheel_center.y, 622.5);
    /// ```
    #[must_use]
    pub fn formula_student_front() -> Self {
        Self {
            wheel_center: point(0.0, 622.5, 203.0),
            lower_fore_inner: point(175.1, 175.0, 111.0),
            lower_aft_inner: point(-175.1, 175.0, 111.0),
            lower_outer: point(-3.1, 608.0, 114.0),
            upper_fore_inner: point(120.1, 240.0, 223.0),
            upper_aft_inner: point(-120.1, 240.0, 216.0),
            upper_outer: point(-7.13, 595.0, 299.0),
            tie_rod_inner: point(55.1, 140.0, 163.0),
            tie_rod_outer: point(55.1, 600.0, 163.0),
            pushrod_inner: point(-20.3792, 350.0, 487.934),
            pushrod_outer: point(-13.9192, 556.8442, 124.9426),
            rocker_pivot: point(-23.38, 280.0, 450.0),
            rocker_axis: None,
            shock_upper: point(-25.0, 150.0, 490.0),
            shock_lower: point(-30.0, 150.0, 300.0),
            pushrod_mount: PushrodMount::LowerWishbone,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_moves_only_the_requested_point() {
        let base = Hardpoints::formula_student_front();
        let moved = base.with(HardpointId::TieRodInner, point(0.0, 0.0, 0.0));
        for id in HardpointId::ALL {
            if id == HardpointId::TieRodInner {
                assert_eq!(moved.get(id), point(0.0, 0.0, 0.0));
            } else {
                assert_eq!(moved.get(id), base.get(id));
            }
        }
    }

    #[test]
    fn axis_parses_case_insensitively() {
        assert_eq!(" y ".parse::<SweepAxis>(), Ok(SweepAxis::Y));
        assert!("w".parse::<SweepAxis>().is_err());
    }

    #[test]
    fn hardpoints_deserialize_with_default_mount() {
        let mut json =
            serde_json::to_value(Hardpoints::formula_student_front()).expect("serialize");
        let object = json.as_object_mut().expect("object");
        object.remove("pushrod_mount");
        object.remove("rocker_axis");
        let parsed: Hardpoints = serde_json::from_value(json).expect("deserialize");
        assert_eq!(parsed.pushrod_mount, PushrodMount::LowerWishbone);
        assert_eq!(parsed.rocker_axis, None);
    }
}
