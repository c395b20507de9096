//! Static axial loads in the suspension links.
//!
//! The wishbone arms, tie rod and pushrod are treated as two-force members:
//! pin jointed at both ends and loaded only along their axis. Bending from a
//! pushrod mounted part way along a wishbone is not modelled; its load is
//! taken to enter the upright directly at the pushrod outer end. This is an
//! assumption of the method, not something the solve checks.
//!
//! With the links as the six constraints on the upright, virtual work gives
//! `Jᵀ t = Q`, where each row of `J` is the pose Jacobian row of one link
//! (see the upright solve) and `Q` is the generalised force of the applied
//! load: its moment about the wheel center followed by the force itself.
//! Positive `t` is tension.

use std::collections::BTreeMap;

use nalgebra::{Matrix6, Vector3, Vector6};
use serde::{Deserialize, Serialize};

use crate::errors::KinematicsError;
use crate::geometry::{Force, Point};
use crate::hardpoints::HardpointId;
use crate::upright::link_row;

/// Identifier of a two-force member.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkId {
    /// Lower wishbone front arm.
    LowerFore,
    /// Lower wishbone rear arm.
    LowerAft,
    /// Upper wishbone front arm.
    UpperFore,
    /// Upper wishbone rear arm.
    UpperAft,
    /// Tie rod.
    TieRod,
    /// Pushrod.
    Pushrod,
}

impl LinkId {
    /// All links in solve order.
    pub const ALL: [LinkId; 6] = [
        Self::LowerFore,
        Self::LowerAft,
        Self::UpperFore,
        Self::UpperAft,
        Self::TieRod,
        Self::Pushrod,
    ];

    /// Inner (chassis side) and outer (upright side) hardpoints of the link.
    #[must_use]
    pub fn ends(self) -> (HardpointId, HardpointId) {
        match self {
            Self::LowerFore => (HardpointId::LowerForeInner, HardpointId::LowerOuter),
            Self::LowerAft => (HardpointId::LowerAftInner, HardpointId::LowerOuter),
            Self::UpperFore => (HardpointId::UpperForeInner, HardpointId::UpperOuter),
            Self::UpperAft => (HardpointId::UpperAftInner, HardpointId::UpperOuter),
            Self::TieRod => (HardpointId::TieRodInner, HardpointId::TieRodOuter),
            Self::Pushrod => (HardpointId::PushrodInner, HardpointId::PushrodOuter),
        }
    }
}

impl std::fmt::Display for LinkId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::LowerFore => "lower_fore",
            Self::LowerAft => "lower_aft",
            Self::UpperFore => "upper_fore",
            Self::UpperAft => "upper_aft",
            Self::TieRod => "tie_rod",
            Self::Pushrod => "pushrod",
        };
        f.pad(name)
    }
}

/// Where the external load acts on the upright.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadPoint {
    /// At the wheel center.
    #[default]
    WheelCenter,
    /// At the tyre contact patch.
    ContactPatch,
}

/// Axial load carried by one link.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LinkLoad {
    /// Axial force, positive in tension.
    pub axial: f64,
    /// Unit vector from the inner to the outer end.
    pub direction: Vector3<f64>,
    /// Outer (upright side) end of the link.
    pub attachment: Point,
}

impl LinkLoad {
    /// Force the link exerts on the upright.
    #[must_use]
    pub fn reaction(&self) -> Vector3<f64> {
        -self.direction * self.axial
    }
}

/// Link loads for one applied force.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LinkForces {
    /// Load in each link.
    pub loads: BTreeMap<LinkId, LinkLoad>,
    /// The external load.
    pub applied: Force,
    /// Where the external load acts.
    pub load_point: Point,
}

impl LinkForces {
    /// Axial force in `link`, positive in tension.
    #[must_use]
    pub fn axial(&self, link: LinkId) -> Option<f64> {
        self.loads.get(&link).map(|load| load.axial)
    }

    /// Plain mapping from link to axial force.
    #[must_use]
    pub fn axial_map(&self) -> BTreeMap<LinkId, f64> {
        self.loads
            .iter()
            .map(|(link, load)| (*link, load.axial))
            .collect()
    }

    /// Sum of every link reaction and the applied force; zero at equilibrium.
    #[must_use]
    pub fn net_force(&self) -> Vector3<f64> {
        self.loads
            .values()
            .map(LinkLoad::reaction)
            .fold(self.applied.to_vector(), |sum, reaction| sum + reaction)
    }

    /// Net moment about `about` of the reactions and the applied force.
    #[must_use]
    pub fn net_moment(&self, about: Point) -> Vector3<f64> {
        let origin = about.to_vector();
        let applied =
            (self.load_point.to_vector() - origin).cross(&self.applied.to_vector());
        self.loads.values().fold(applied, |sum, load| {
            sum + (load.attachment.to_vector() - origin).cross(&load.reaction())
        })
    }
}

/// One link's end positions at the configuration being analysed.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct LinkEnds {
    /// Which link.
    pub link: LinkId,
    /// Chassis end.
    pub inner: Point,
    /// Upright end.
    pub outer: Point,
}

/// Solve the link loads that hold the upright against `applied` acting at
/// `load_point`, with moments taken about `wheel_center`.
pub(crate) fn solve_link_forces(
    wheel_center: Point,
    links: &[LinkEnds; 6],
    applied: Force,
    load_point: Point,
) -> Result<LinkForces, KinematicsError> {
    let center = wheel_center.to_vector();
    let mut transpose = Matrix6::zeros();
    let mut directions = Vec::with_capacity(links.len());
    for (column, ends) in links.iter().enumerate() {
        let inner = ends.inner.to_vector();
        let outer = ends.outer.to_vector();
        let length = (outer - inner).norm();
        if length <= f64::EPSILON {
            return Err(KinematicsError::degenerate(format!(
                "{} has zero length",
                ends.link
            )));
        }
        transpose.set_column(column, &link_row(&center, &outer, &inner, length));
        directions.push((outer - inner) / length);
    }

    let force = applied.to_vector();
    let moment = (load_point.to_vector() - center).cross(&force);
    let generalised = Vector6::new(moment.x, moment.y, moment.z, force.x, force.y, force.z);
    let tensions = transpose.lu().solve(&generalised).ok_or_else(|| {
        KinematicsError::degenerate("links cannot react a general load on the upright")
    })?;

    let loads = links
        .iter()
        .zip(directions)
        .enumerate()
        .map(|(index, (ends, direction))| {
            (
                ends.link,
                LinkLoad {
                    axial: tensions[index],
                    direction,
                    attachment: ends.outer,
                },
            )
        })
        .collect();

    Ok(LinkForces {
        loads,
        applied,
        load_point,
    })
}
