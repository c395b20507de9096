use kinematix::{CornerConfig, HardpointId, Suspension, SweepAxis, SweepRange};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = CornerConfig::formula_student_front();
    let corner = Suspension::from_config(&config)?;

    // Bump steer sensitivity to tie rod inner height.
    let result = corner.sweep(
        HardpointId::TieRodInner,
        SweepAxis::Z,
        SweepRange::new(-5.0, 5.0, 2.5),
        20,
        &config.alignment,
    )?;

    for (value, series) in result.successes() {
        let curves = series.curves();
        let steer = match (curves.toe.first(), curves.toe.last()) {
            (Some(rebound), Some(jounce)) => jounce - rebound,
            _ => 0.0,
        };
        println!("tie rod inner z = {value:6.1} mm: bump steer {steer:+.3} deg over full travel");
    }
    for (value, error) in result.failures() {
        println!("tie rod inner z = {value:6.1} mm: {error}");
    }

    Ok(())
}
