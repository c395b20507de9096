//! Solved travel steps and the series they form.

use serde::{Deserialize, Serialize};

use crate::config::StaticAlignment;
use crate::errors::BranchDiscontinuity;
use crate::geometry::Point;
use crate::hardpoints::HardpointId;
use crate::metrics::KinematicMetrics;
use crate::upright::UprightPose;

/// Positions of every moving point at one wheel travel.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SolvedGeometry {
    /// Wheel-center travel from static ride height, jounce positive.
    pub displacement: f64,
    /// Upright pose relative to its static configuration.
    pub pose: UprightPose,
    /// Wheel center.
    pub wheel_center: Point,
    /// Lower ball joint.
    pub lower_outer: Point,
    /// Upper ball joint.
    pub upper_outer: Point,
    /// Tie rod outer end.
    pub tie_rod_outer: Point,
    /// Pushrod end on the wishbone or upright.
    pub pushrod_outer: Point,
    /// Pushrod end on the rocker.
    pub pushrod_inner: Point,
    /// Shock end on the rocker.
    pub shock_upper: Point,
    /// Tyre contact point, carried with the wheel plane.
    pub contact_patch: Point,
    /// Rocker rotation from static, in radians.
    pub rocker_angle: f64,
    /// Eye-to-eye shock length.
    pub shock_length: f64,
}

impl SolvedGeometry {
    /// Position of a moving hardpoint, `None` for chassis-fixed ones.
    #[must_use]
    pub fn moving_position(&self, id: HardpointId) -> Option<Point> {
        match id {
            HardpointId::WheelCenter => Some(self.wheel_center),
            HardpointId::LowerOuter => Some(self.lower_outer),
            HardpointId::UpperOuter => Some(self.upper_outer),
            HardpointId::TieRodOuter => Some(self.tie_rod_outer),
            HardpointId::PushrodOuter => Some(self.pushrod_outer),
            HardpointId::PushrodInner => Some(self.pushrod_inner),
            HardpointId::ShockUpper => Some(self.shock_upper),
            _ => None,
        }
    }
}

/// Geometry at a single travel, with any branch jumps met while marching
/// there from static ride height.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SolvedTravel {
    /// Solved positions at the requested travel.
    pub geometry: SolvedGeometry,
    /// Branch jumps between the continuation increments.
    pub warnings: Vec<BranchDiscontinuity>,
}

/// One entry of a solved series: geometry plus derived metrics.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TravelStep {
    /// Solved positions.
    pub geometry: SolvedGeometry,
    /// Derived angles, scrub, roll center and motion ratio.
    pub metrics: KinematicMetrics,
}

impl TravelStep {
    /// Wheel-center travel of this step.
    #[must_use]
    pub fn displacement(&self) -> f64 {
        self.geometry.displacement
    }
}

/// Travel steps ordered by increasing displacement.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SolvedSeries {
    /// Display label for lengths.
    pub unit: String,
    /// Offsets that were added to the angle curves.
    pub alignment: StaticAlignment,
    /// Solved steps, rebound first.
    pub steps: Vec<TravelStep>,
    /// Branch jumps found while marching.
    pub warnings: Vec<BranchDiscontinuity>,
}

/// Plain numeric curves of a series, indexed like its steps.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct KinematicCurves {
    /// Wheel travel.
    pub travel: Vec<f64>,
    /// Equivalent body roll, degrees.
    pub roll_angle: Vec<f64>,
    /// Camber, degrees.
    pub camber: Vec<f64>,
    /// Caster, degrees.
    pub caster: Vec<f64>,
    /// Toe (bump steer), degrees.
    pub toe: Vec<f64>,
    /// Lateral contact patch movement.
    pub scrub: Vec<f64>,
    /// Roll center height, where defined.
    pub roll_center_height: Vec<Option<f64>>,
    /// Shock length.
    pub shock_length: Vec<f64>,
    /// Finite-difference motion ratio, where defined.
    pub motion_ratio: Vec<Option<f64>>,
}

impl SolvedSeries {
    /// Number of steps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether the series has no steps.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// The static ride height step.
    #[must_use]
    pub fn at_static(&self) -> Option<&TravelStep> {
        self.steps.iter().find(|step| step.displacement() == 0.0)
    }

    /// Wheel travel of every step.
    #[must_use]
    pub fn displacements(&self) -> Vec<f64> {
        self.steps.iter().map(TravelStep::displacement).collect()
    }

    /// Split the series into plain curves.
    #[must_use]
    pub fn curves(&self) -> KinematicCurves {
        let mut curves = KinematicCurves::default();
        for step in &self.steps {
            let metrics = &step.metrics;
            curves.travel.push(step.displacement());
            curves.roll_angle.push(metrics.roll_angle);
            curves.camber.push(metrics.camber);
            curves.caster.push(metrics.caster);
            curves.toe.push(metrics.toe);
            curves.scrub.push(metrics.scrub);
            curves
                .roll_center_height
                .push(metrics.roll_center.map(|center| center.z));
            curves.shock_length.push(metrics.shock_length);
            curves.motion_ratio.push(metrics.motion_ratio);
        }
        curves
    }
}
