use kinematix::{force, CornerConfig, LinkId, Suspension};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = CornerConfig::formula_student_front();
    let corner = Suspension::from_config(&config)?;

    let series = corner.solve(config.steps, &config.alignment)?;
    for step in series.steps.iter().step_by(20) {
        println!(
            "travel {:+7.2} mm  camber {:+.3} deg  toe {:+.3} deg  MR {:?}",
            step.displacement(),
            step.metrics.camber,
            step.metrics.toe,
            step.metrics.motion_ratio
        );
    }

    let loads = corner.link_forces(force(0.0, 0.0, 100.0))?;
    for link in LinkId::ALL {
        if let Some(axial) = loads.axial(link) {
            println!("{link:<11} {axial:+.2} N");
        }
    }

    Ok(())
}
