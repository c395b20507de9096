use std::path::Path;

use kinematix::{
    force, CornerConfig, Force, HardpointId, KinematicsError, LoadPoint, SweepAxis, SweepRange,
};

/// Wheel load resolved into the links at static ride height.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoadCase {
    /// Applied force in newtons.
    pub applied: Force,
    /// Where the force acts.
    pub load_point: LoadPoint,
}

/// Hardpoint coordinate swept around its base value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepCase {
    /// Swept pickup point.
    pub hardpoint: HardpointId,
    /// Swept coordinate.
    pub axis: SweepAxis,
    /// Offsets from the base coordinate.
    pub range: SweepRange,
    /// Travel steps each side of static for every swept value.
    pub steps: usize,
}

/// Everything the demonstration run needs.
#[derive(Debug, Clone, PartialEq)]
pub struct Conditions {
    /// Corner under study.
    pub config: CornerConfig,
    /// Static load case.
    pub load: LoadCase,
    /// Sensitivity sweep.
    pub sweep: SweepCase,
}

impl Default for LoadCase {
    fn default() -> Self {
        // A purely vertical wheel load; the pushrod should pick most of it up.
        Self {
            applied: force(0.0, 0.0, 100.0),
            load_point: LoadPoint::WheelCenter,
        }
    }
}

impl Default for SweepCase {
    fn default() -> Self {
        // Raising or lowering the front lower inner pivot by a millimetre
        // tilts the lower wishbone axis, which shows up mostly in caster.
        Self {
            hardpoint: HardpointId::LowerForeInner,
            axis: SweepAxis::Z,
            range: SweepRange::new(-1.0, 1.0, 0.5),
            steps: 10,
        }
    }
}

/// Build the run conditions from an optional JSON corner description and an
/// optional sweep axis.
///
/// Without a file the formula-student demonstration corner with one inch of
/// travel is used.
pub fn load_conditions(
    path: Option<&Path>,
    axis: Option<SweepAxis>,
) -> Result<Conditions, KinematicsError> {
    let config = match path {
        Some(path) => CornerConfig::from_path(path)?,
        None => CornerConfig::formula_student_front(),
    };
    let mut sweep = SweepCase::default();
    if let Some(axis) = axis {
        sweep.axis = axis;
    }
    Ok(Conditions {
        config,
        load: LoadCase::default(),
        sweep,
    })
}
