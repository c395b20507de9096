//! The suspension corner: construction, travel solve, link loads and
//! invariant checks.

use std::collections::BTreeMap;

use petgraph::graph::{Graph, NodeIndex};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::{CornerConfig, SolverConfig, StaticAlignment, TravelRange};
use crate::errors::{BranchDiscontinuity, KinematicsError, SolveStage};
use crate::forces::{solve_link_forces, LinkEnds, LinkForces, LinkId, LoadPoint};
use crate::geometry::{Force, Point, RigidLink};
use crate::hardpoints::{HardpointId, Hardpoints, PushrodMount};
use crate::metrics::{roll_center_line, Extractor, MetricsFrame, RollCenterInRoll};
use crate::rocker::RockerModel;
use crate::series::{SolvedGeometry, SolvedSeries, SolvedTravel, TravelStep};
use crate::upright::{BodyPoint, NewtonSettings, UprightModel, UprightPose};

/// Multiple of the solve tolerance a rigid link may drift before
/// [`Suspension::verify_invariants`] reports it.
const INVARIANT_SLACK: f64 = 10.0;

/// Fraction of the shortest upright link used as the largest continuation
/// step in [`Suspension::solve_at`].
const CONTINUATION_FRACTION: f64 = 0.05;

/// Most increments [`Suspension::solve_at`] will march through. Anything
/// further away lies far outside the reach of the linkage.
const MAX_CONTINUATION_STEPS: usize = 10_000;

/// A rigid link whose current length disagrees with its reference length.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LinkViolation {
    /// One end of the link.
    pub from: HardpointId,
    /// The other end.
    pub to: HardpointId,
    /// Reference length.
    pub length: f64,
    /// Current length minus reference length.
    pub error: f64,
}

/// One independent suspension corner built from static hardpoints.
///
/// Construction validates the geometry and captures every rigid length; all
/// later solves are pure functions of this immutable model.
#[derive(Clone, Debug)]
pub struct Suspension {
    /// Static pickup points.
    hardpoints: Hardpoints,
    /// Wheel travel bounds.
    travel: TravelRange,
    /// Display label for lengths.
    unit: String,
    /// Numerical settings.
    solver: SolverConfig,
    /// Upright solve data.
    upright: UprightModel,
    /// Rocker solve data.
    rocker: RockerModel,
    /// Static references for the metrics.
    frame: MetricsFrame,
    /// Every rigid pair of hardpoints.
    links: Graph<HardpointId, RigidLink>,
    /// Absolute residual tolerance.
    tolerance: f64,
    /// Solution at zero travel.
    reference: SolvedGeometry,
}

impl Suspension {
    /// Build a corner from its static hardpoints.
    ///
    /// # Errors
    ///
    /// * [`KinematicsError::InvalidSolverConfig`] and
    ///   [`KinematicsError::InvalidTravelRange`] for bad settings,
    /// * [`KinematicsError::DegenerateGeometry`] for non-finite coordinates,
    ///   a wheel center on or below the ground, zero-length links, collinear
    ///   attachment triples or a linkage that cannot locate the upright.
    ///
    /// # Examples
    /// ```
    /// use kinematix::{Hardpoints, SolverConfig, Suspension, TravelRange};
    ///
    /// let corner = Suspension::new(
    ///     Hardpoints::formula_student_front(),
    ///     TravelRange::one_inch(),
    ///     "mm",
    ///     SolverConfig::default(),
    /// )
    /// .unwrap();
    /// assert_eq!(corner.unit(), "mm");
    /// ```
    pub fn new(
        hardpoints: Hardpoints,
        travel: TravelRange,
        unit: impl Into<String>,
        solver: SolverConfig,
    ) -> Result<Self, KinematicsError> {
        solver.validate()?;
        travel.validate()?;
        for id in HardpointId::ALL {
            let position = hardpoints.get(id);
            if !(position.x.is_finite() && position.y.is_finite() && position.z.is_finite()) {
                return Err(KinematicsError::degenerate(format!(
                    "{id} has a non-finite coordinate"
                )));
            }
        }
        if !(hardpoints.wheel_center.z > 0.0) {
            return Err(KinematicsError::degenerate(
                "wheel center must be above the ground plane",
            ));
        }

        let upright = UprightModel::new(&hardpoints)?;
        let rocker = RockerModel::new(&hardpoints)?;
        let links = link_graph(&hardpoints)?;
        let tolerance = solver.tolerance * upright.shortest_link();
        let frame = MetricsFrame::new(&hardpoints);

        let mut corner = Self {
            reference: SolvedGeometry {
                displacement: 0.0,
                pose: UprightPose::reference(hardpoints.wheel_center),
                wheel_center: hardpoints.wheel_center,
                lower_outer: hardpoints.lower_outer,
                upper_outer: hardpoints.upper_outer,
                tie_rod_outer: hardpoints.tie_rod_outer,
                pushrod_outer: hardpoints.pushrod_outer,
                pushrod_inner: hardpoints.pushrod_inner,
                shock_upper: hardpoints.shock_upper,
                contact_patch: frame.contact_patch,
                rocker_angle: 0.0,
                shock_length: hardpoints.shock_upper.distance(hardpoints.shock_lower),
            },
            hardpoints,
            travel,
            unit: unit.into(),
            solver,
            upright,
            rocker,
            frame,
            links,
            tolerance,
        };
        let start = corner.reference.pose;
        corner.reference = corner.solve_step(0.0, &start, 0.0)?;
        Ok(corner)
    }

    /// Build a corner from a loaded configuration.
    ///
    /// # Errors
    ///
    /// See [`Suspension::new`].
    pub fn from_config(config: &CornerConfig) -> Result<Self, KinematicsError> {
        Self::new(
            config.hardpoints,
            config.travel,
            config.unit.clone(),
            config.solver,
        )
    }

    /// Static pickup points.
    #[must_use]
    pub fn hardpoints(&self) -> &Hardpoints {
        &self.hardpoints
    }

    /// Wheel travel bounds.
    #[must_use]
    pub fn travel(&self) -> TravelRange {
        self.travel
    }

    /// Display label for lengths.
    #[must_use]
    pub fn unit(&self) -> &str {
        &self.unit
    }

    /// Numerical settings.
    #[must_use]
    pub fn solver(&self) -> SolverConfig {
        self.solver
    }

    /// Absolute residual tolerance of every solve, in length units.
    #[must_use]
    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// `+1` for a corner on the positive Y side of the car, `-1` otherwise.
    #[must_use]
    pub fn side(&self) -> f64 {
        self.frame.side
    }

    /// Solved geometry at static ride height.
    #[must_use]
    pub fn reference(&self) -> &SolvedGeometry {
        &self.reference
    }

    /// Every rigid pair of hardpoints with its reference length.
    pub fn rigid_links(&self) -> impl Iterator<Item = (HardpointId, HardpointId, RigidLink)> + '_ {
        self.links.edge_references().map(move |edge| {
            (
                self.links[edge.source()],
                self.links[edge.target()],
                *edge.weight(),
            )
        })
    }

    /// Position of any hardpoint in a solved step. Chassis points never move.
    #[must_use]
    pub fn position(&self, geometry: &SolvedGeometry, id: HardpointId) -> Point {
        geometry
            .moving_position(id)
            .unwrap_or_else(|| self.hardpoints.get(id))
    }

    /// Solve the full travel range in `steps` equal increments either side
    /// of static ride height, giving `2 * steps + 1` entries.
    ///
    /// Steps are solved outward from zero travel, each seeded with its
    /// neighbour nearer static, and returned rebound first. Displacement is
    /// monotonic along each marching direction, so the rebound half is solved
    /// in decreasing order before being reversed into the series. Angle
    /// curves are shifted by `alignment`.
    ///
    /// # Errors
    ///
    /// Returns [`KinematicsError::NonConvergent`] for the first step that
    /// fails; the rest of the series is discarded.
    pub fn solve(
        &self,
        steps: usize,
        alignment: &StaticAlignment,
    ) -> Result<SolvedSeries, KinematicsError> {
        let mut warnings = Vec::new();
        let jounce = self.march(self.travel.full_jounce, steps, &mut warnings)?;
        let rebound = self.march(self.travel.full_rebound, steps, &mut warnings)?;

        let geometries: Vec<SolvedGeometry> = rebound
            .into_iter()
            .rev()
            .chain(std::iter::once(self.reference.clone()))
            .chain(jounce)
            .collect();

        let extractor = Extractor {
            hardpoints: &self.hardpoints,
            frame: &self.frame,
            upright: &self.upright,
            rocker: &self.rocker,
            alignment,
        };
        let steps: Vec<TravelStep> = (0..geometries.len())
            .map(|index| TravelStep {
                metrics: extractor.extract(&geometries, index),
                geometry: geometries[index].clone(),
            })
            .collect();
        warnings.sort_by(|a, b| a.displacement.total_cmp(&b.displacement));

        info!(
            steps = steps.len(),
            warnings = warnings.len(),
            full_jounce = self.travel.full_jounce,
            full_rebound = self.travel.full_rebound,
            "solved travel series"
        );
        Ok(SolvedSeries {
            unit: self.unit.clone(),
            alignment: *alignment,
            steps,
            warnings,
        })
    }

    /// Solve one wheel travel, marching from static ride height in small
    /// increments so the solution stays on the static branch.
    ///
    /// Branch jumps between increments are returned with the geometry.
    ///
    /// # Errors
    ///
    /// Returns [`KinematicsError::NonConvergent`] if any increment fails, or
    /// straight away for a non-finite displacement or one too far from
    /// static to march to.
    pub fn solve_at(&self, displacement: f64) -> Result<SolvedTravel, KinematicsError> {
        let largest = CONTINUATION_FRACTION * self.upright.shortest_link();
        let increments = (displacement.abs() / largest).ceil().max(1.0);
        if !displacement.is_finite() || !(increments <= MAX_CONTINUATION_STEPS as f64) {
            return Err(KinematicsError::NonConvergent {
                displacement,
                residual: f64::NAN,
                iterations: 0,
                stage: SolveStage::Upright,
            });
        }
        let mut warnings = Vec::new();
        let mut path = self.march(displacement, increments as usize, &mut warnings)?;
        let geometry = path.pop().unwrap_or_else(|| self.reference.clone());
        Ok(SolvedTravel { geometry, warnings })
    }

    /// Link loads at static ride height for a force at the wheel center.
    ///
    /// # Errors
    ///
    /// Returns [`KinematicsError::DegenerateGeometry`] when the links cannot
    /// react a general load.
    ///
    /// # Examples
    /// ```
    /// use kinematix::{force, LinkId, Suspension, CornerConfig};
    ///
    /// let corner = Suspension::from_config(&CornerConfig::formula_student_front()).unwrap();
    /// let loads = corner.link_forces(force(0.0, 0.0, 100.0)).unwrap();
    /// assert!(loads.axial(LinkId::Pushrod).unwrap() < 0.0);
    /// ```
    pub fn link_forces(&self, applied: Force) -> Result<LinkForces, KinematicsError> {
        self.link_forces_at(&self.reference, applied, LoadPoint::WheelCenter)
    }

    /// Link loads at any solved step.
    ///
    /// # Errors
    ///
    /// See [`Suspension::link_forces`].
    pub fn link_forces_at(
        &self,
        geometry: &SolvedGeometry,
        applied: Force,
        load_point: LoadPoint,
    ) -> Result<LinkForces, KinematicsError> {
        let links = LinkId::ALL.map(|link| {
            let (inner, outer) = link.ends();
            LinkEnds {
                link,
                inner: self.position(geometry, inner),
                outer: self.position(geometry, outer),
            }
        });
        let at = match load_point {
            LoadPoint::WheelCenter => geometry.wheel_center,
            LoadPoint::ContactPatch => geometry.contact_patch,
        };
        solve_link_forces(geometry.wheel_center, &links, applied, at)
    }

    /// Length error of every rigid link in a solved step.
    #[must_use]
    pub fn link_errors(&self, geometry: &SolvedGeometry) -> Vec<LinkViolation> {
        self.rigid_links()
            .map(|(from, to, link)| LinkViolation {
                from,
                to,
                length: link.length(),
                error: link.error(self.position(geometry, from), self.position(geometry, to)),
            })
            .collect()
    }

    /// Largest link length error as a fraction of the link's length.
    #[must_use]
    pub fn max_link_error(&self, geometry: &SolvedGeometry) -> f64 {
        self.link_errors(geometry)
            .iter()
            .map(|violation| violation.error.abs() / violation.length)
            .fold(0.0, f64::max)
    }

    /// Links whose length drifted by more than a small multiple of the solve
    /// tolerance. Empty for a valid step.
    #[must_use]
    pub fn verify_invariants(&self, geometry: &SolvedGeometry) -> Vec<LinkViolation> {
        let limit = INVARIANT_SLACK * self.tolerance;
        self.link_errors(geometry)
            .into_iter()
            .filter(|violation| !(violation.error.abs() <= limit))
            .collect()
    }

    /// Roll center path as the body rolls.
    ///
    /// Each jounce step of this corner is paired with the rebound step of
    /// equal size, mirrored to the other side of the car. Series without a
    /// matching rebound step for a jounce step skip that step.
    #[must_use]
    pub fn roll_center_in_roll(&self, series: &SolvedSeries) -> Vec<RollCenterInRoll> {
        let match_tolerance = 1.0e-9
            * self
                .travel
                .full_jounce
                .abs()
                .max(self.travel.full_rebound.abs())
                .max(1.0);
        series
            .steps
            .iter()
            .filter(|step| step.displacement() >= 0.0)
            .filter_map(|bump| {
                let displacement = bump.displacement();
                let droop = series
                    .steps
                    .iter()
                    .find(|step| (step.displacement() + displacement).abs() <= match_tolerance)?;
                let center = roll_center_line(&self.hardpoints, &bump.geometry).and_then(
                    |(bump_line, _)| {
                        let (droop_line, _) = roll_center_line(&self.hardpoints, &droop.geometry)?;
                        bump_line.intersect(&droop_line.mirrored())
                    },
                );
                Some(RollCenterInRoll {
                    displacement,
                    roll_angle: self.frame.roll_angle(displacement),
                    center: center.map(|yz| Point::new(bump.geometry.wheel_center.x, yz.x, yz.y)),
                })
            })
            .collect()
    }

    /// Solve `steps` increments from static towards `limit`, each seeded by
    /// the previous one. The returned steps exclude static ride height.
    fn march(
        &self,
        limit: f64,
        steps: usize,
        warnings: &mut Vec<BranchDiscontinuity>,
    ) -> Result<Vec<SolvedGeometry>, KinematicsError> {
        let mut solved: Vec<SolvedGeometry> = Vec::new();
        for index in 1..=steps {
            let displacement = limit * index as f64 / steps as f64;
            let previous = solved.last().unwrap_or(&self.reference);
            let geometry = self.solve_step(displacement, &previous.pose, previous.rocker_angle)?;
            if let Some(warning) = self.branch_jump(previous, &geometry) {
                warn!(
                    displacement = warning.displacement,
                    hardpoint = %warning.hardpoint,
                    jump = warning.jump,
                    threshold = warning.threshold,
                    "possible branch discontinuity"
                );
                warnings.push(warning);
            }
            solved.push(geometry);
        }
        Ok(solved)
    }

    /// Solve upright and rocker at one travel.
    fn solve_step(
        &self,
        displacement: f64,
        guess: &UprightPose,
        previous_angle: f64,
    ) -> Result<SolvedGeometry, KinematicsError> {
        let settings = NewtonSettings {
            tolerance: self.tolerance,
            max_iterations: self.solver.max_iterations,
        };
        let (pose, _) = self.upright.solve(displacement, guess, &settings)?;
        let pushrod_outer = self.upright.pushrod_outer(&pose);
        let rocker_angle =
            self.rocker
                .solve(&pushrod_outer, previous_angle, displacement, self.tolerance)?;
        Ok(SolvedGeometry {
            displacement,
            pose,
            wheel_center: Point::from(pose.wheel_center),
            lower_outer: Point::from(self.upright.body_point(&pose, BodyPoint::LowerOuter)),
            upper_outer: Point::from(self.upright.body_point(&pose, BodyPoint::UpperOuter)),
            tie_rod_outer: Point::from(self.upright.body_point(&pose, BodyPoint::TieRodOuter)),
            pushrod_outer: Point::from(pushrod_outer),
            pushrod_inner: Point::from(self.rocker.pushrod_inner(rocker_angle)),
            shock_upper: Point::from(self.rocker.shock_upper(rocker_angle)),
            contact_patch: self.contact_patch(&pose),
            rocker_angle,
            shock_length: self.rocker.shock_length(rocker_angle),
        })
    }

    /// Tyre contact point for an upright pose.
    pub(crate) fn contact_patch(&self, pose: &UprightPose) -> Point {
        self.frame.contact_patch(pose)
    }

    /// The largest tracked-point jump between adjacent steps, if it exceeds
    /// the branch threshold.
    fn branch_jump(
        &self,
        previous: &SolvedGeometry,
        current: &SolvedGeometry,
    ) -> Option<BranchDiscontinuity> {
        let increment = (current.displacement - previous.displacement).abs();
        let threshold = (self.solver.branch_jump_ratio * increment).max(10.0 * self.tolerance);
        let (hardpoint, jump) = HardpointId::ALL
            .into_iter()
            .filter_map(|id| {
                let before = previous.moving_position(id)?;
                let after = current.moving_position(id)?;
                Some((id, before.distance(after)))
            })
            .max_by(|a, b| a.1.total_cmp(&b.1))?;
        (jump > threshold).then_some(BranchDiscontinuity {
            displacement: current.displacement,
            previous_displacement: previous.displacement,
            hardpoint,
            jump,
            threshold,
        })
    }
}

/// Graph of every pair of hardpoints whose distance is fixed.
fn link_graph(hardpoints: &Hardpoints) -> Result<Graph<HardpointId, RigidLink>, KinematicsError> {
    use HardpointId::*;

    let mut graph = Graph::new();
    let nodes: BTreeMap<HardpointId, NodeIndex> = HardpointId::ALL
        .into_iter()
        .map(|id| (id, graph.add_node(id)))
        .collect();

    let mut pairs = vec![
        // Wishbones, steering and pushrod.
        (LowerForeInner, LowerOuter),
        (LowerAftInner, LowerOuter),
        (UpperForeInner, UpperOuter),
        (UpperAftInner, UpperOuter),
        (TieRodInner, TieRodOuter),
        (PushrodInner, PushrodOuter),
        // Upright.
        (LowerOuter, UpperOuter),
        (LowerOuter, TieRodOuter),
        (UpperOuter, TieRodOuter),
        (WheelCenter, LowerOuter),
        (WheelCenter, UpperOuter),
        (WheelCenter, TieRodOuter),
        // Rocker.
        (RockerPivot, PushrodInner),
        (RockerPivot, ShockUpper),
        (PushrodInner, ShockUpper),
    ];
    pairs.extend(match hardpoints.pushrod_mount {
        PushrodMount::Upright => [
            (PushrodOuter, LowerOuter),
            (PushrodOuter, UpperOuter),
            (PushrodOuter, WheelCenter),
        ],
        PushrodMount::LowerWishbone => [
            (PushrodOuter, LowerForeInner),
            (PushrodOuter, LowerAftInner),
            (PushrodOuter, LowerOuter),
        ],
        PushrodMount::UpperWishbone => [
            (PushrodOuter, UpperForeInner),
            (PushrodOuter, UpperAftInner),
            (PushrodOuter, UpperOuter),
        ],
    });

    for (a, b) in pairs {
        let link = RigidLink::between(hardpoints.get(a), hardpoints.get(b))
            .map_err(|_| KinematicsError::degenerate(format!("{a} and {b} coincide")))?;
        graph.add_edge(nodes[&a], nodes[&b], link);
    }
    Ok(graph)
}
