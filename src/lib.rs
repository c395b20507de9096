#![warn(clippy::all)]
#![warn(missing_docs)]
#![warn(rustdoc::missing_doc_code_examples)]
#![warn(clippy::missing_docs_in_private_items)]
#![doc = include_str!("../README.md")]

mod config;
mod errors;
mod forces;
mod geometry;
mod hardpoints;
mod metrics;
mod rocker;
mod series;
mod suspension;
mod sweep;
mod upright;

pub use config::{CornerConfig, SolverConfig, StaticAlignment, TravelRange};
pub use errors::{BranchDiscontinuity, KinematicsError, SolveStage};
pub use forces::{LinkForces, LinkId, LinkLoad, LoadPoint};
pub use geometry::{force, point, Force, Point, RigidLink};
pub use hardpoints::{HardpointId, Hardpoints, PushrodMount, SweepAxis};
pub use metrics::{KinematicMetrics, RollCenterInRoll};
pub use series::{KinematicCurves, SolvedGeometry, SolvedSeries, SolvedTravel, TravelStep};
pub use suspension::{LinkViolation, Suspension};
pub use sweep::{SweepEntry, SweepRange, SweepResult, MAX_SWEEP_VALUES};
pub use upright::UprightPose;
