#![warn(clippy::pedantic)]

use approx::assert_relative_eq;
use kinematix::{
    force, point, CornerConfig, HardpointId, Hardpoints, LinkId, SolverConfig, StaticAlignment,
    Suspension, SweepAxis, SweepRange,
};

fn demonstration() -> CornerConfig {
    CornerConfig::formula_student_front()
}

fn alignment() -> StaticAlignment {
    StaticAlignment {
        toe: 0.5,
        camber: -1.5,
        caster: 6.0,
    }
}

#[test]
fn one_inch_of_travel_in_two_hundred_steps() {
    let config = demonstration();
    let corner = Suspension::from_config(&config).expect("valid corner");
    let series = corner.solve(100, &alignment()).expect("series solves");

    assert_eq!(series.len(), 201);
    for (index, travel) in series.displacements().into_iter().enumerate() {
        assert_relative_eq!(travel, -25.4 + 0.254 * index as f64, epsilon = 1.0e-9);
    }
    assert!(series.warnings.is_empty(), "unexpected warnings: {:?}", series.warnings);

    for step in &series.steps {
        assert!(
            corner.verify_invariants(&step.geometry).is_empty(),
            "link drift at travel {}",
            step.displacement()
        );
        assert!(corner.max_link_error(&step.geometry) < 1.0e-5);
    }
}

#[test]
fn static_step_reproduces_hardpoints_and_offsets() {
    let corner = Suspension::from_config(&demonstration()).expect("valid corner");
    let offsets = alignment();
    let series = corner.solve(10, &offsets).expect("series solves");
    let at_static = series.at_static().expect("static step present");

    for id in HardpointId::ALL {
        let solved = corner.position(&at_static.geometry, id);
        assert_relative_eq!(
            solved.to_vector(),
            corner.hardpoints().get(id).to_vector(),
            epsilon = 1.0e-9
        );
    }
    assert_eq!(at_static.metrics.camber, offsets.camber);
    assert_eq!(at_static.metrics.caster, offsets.caster);
    assert_eq!(at_static.metrics.toe, offsets.toe);
    assert_eq!(at_static.metrics.scrub, 0.0);
    assert_eq!(at_static.metrics.roll_angle, 0.0);
}

#[test]
fn camber_varies_monotonically_and_angles_stay_bounded() {
    let corner = Suspension::from_config(&demonstration()).expect("valid corner");
    let series = corner.solve(100, &StaticAlignment::default()).expect("series solves");
    let curves = series.curves();

    let gains: Vec<f64> = curves.camber.windows(2).map(|pair| pair[1] - pair[0]).collect();
    let rising = gains.iter().all(|gain| *gain >= -1.0e-12);
    let falling = gains.iter().all(|gain| *gain <= 1.0e-12);
    assert!(rising || falling, "camber changes direction within the travel");

    for curve in [&curves.camber, &curves.caster, &curves.toe] {
        for value in curve {
            assert!(value.abs() < 5.0, "angle change {value} is implausibly large");
        }
    }
    for value in &curves.shock_length {
        assert!(*value > 0.0);
    }
}

#[test]
fn finite_difference_motion_ratio_matches_linkage_rate() {
    let config = CornerConfig {
        solver: SolverConfig {
            tolerance: 1.0e-10,
            ..SolverConfig::default()
        },
        ..demonstration()
    };
    let corner = Suspension::from_config(&config).expect("valid corner");
    let series = corner.solve(100, &StaticAlignment::default()).expect("series solves");

    let interior = &series.steps[1..series.len() - 1];
    for step in interior {
        let finite = step.metrics.motion_ratio.expect("interior ratio defined");
        let analytic = step
            .metrics
            .instantaneous_motion_ratio
            .expect("linkage is regular");
        assert_relative_eq!(finite, analytic, epsilon = 1.0e-3);
    }
    // End points fall back to one-sided differences.
    assert!(series.steps[0].metrics.motion_ratio.is_some());
    assert!(series.steps[200].metrics.motion_ratio.is_some());
}

#[test]
fn vertical_wheel_load_is_in_static_equilibrium() {
    let corner = Suspension::from_config(&demonstration()).expect("valid corner");
    let loads = corner.link_forces(force(0.0, 0.0, 100.0)).expect("links react the load");

    assert!(loads.net_force().norm() < 1.0e-8);
    assert!(loads.net_moment(corner.reference().wheel_center).norm() < 1.0e-6);
    assert_eq!(loads.axial_map().len(), LinkId::ALL.len());
    assert!(loads.axial(LinkId::Pushrod).expect("pushrod load") < 0.0);
}

#[test]
fn single_value_sweep_matches_direct_solve() {
    let corner = Suspension::from_config(&demonstration()).expect("valid corner");
    let offsets = alignment();
    let result = corner
        .sweep(
            HardpointId::UpperOuter,
            SweepAxis::X,
            SweepRange::single(0.0),
            20,
            &offsets,
        )
        .expect("valid range");
    let direct = corner.solve(20, &offsets).expect("series solves");

    assert_eq!(result.entries.len(), 1);
    assert_eq!(result.entries[0].outcome.as_ref().expect("solves"), &direct);
}

#[test]
fn mirrored_corner_reports_the_same_curves() {
    let right = demonstration().hardpoints;
    let mut left = right;
    for id in HardpointId::ALL {
        let p = right.get(id);
        left = left.with(id, point(p.x, -p.y, p.z));
    }

    let solve = |hardpoints: Hardpoints| {
        let config = CornerConfig {
            hardpoints,
            ..demonstration()
        };
        Suspension::from_config(&config)
            .expect("valid corner")
            .solve(10, &StaticAlignment::default())
            .expect("series solves")
            .curves()
    };
    let right = solve(right);
    let left = solve(left);
    for (a, b) in [
        (&right.camber, &left.camber),
        (&right.caster, &left.caster),
        (&right.toe, &left.toe),
        (&right.scrub, &left.scrub),
        (&right.shock_length, &left.shock_length),
    ] {
        for (x, y) in a.iter().zip(b) {
            assert_relative_eq!(x, y, epsilon = 1.0e-6);
        }
    }
}

#[test]
fn configuration_round_trips_through_json() {
    let config = CornerConfig {
        alignment: alignment(),
        steps: 25,
        ..demonstration()
    };
    let text = serde_json::to_string(&config).expect("serialises");
    let parsed = CornerConfig::from_json_str(&text).expect("parses");
    assert_eq!(parsed, config);

    let corner = Suspension::from_config(&parsed).expect("valid corner");
    let series = corner.solve(parsed.steps, &parsed.alignment).expect("series solves");
    let exported = serde_json::to_value(&series).expect("series serialises");
    assert_eq!(exported["steps"].as_array().map(Vec::len), Some(51));
}
