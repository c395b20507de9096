use std::fmt::Write;

use crate::analysis::AnalysisSummary;
use kinematix::{LinkId, SolvedSeries};

/// Render a textual summary of the analysis.
///
/// Angles are in degrees, lengths in the corner's unit and loads in newtons.
#[must_use]
pub fn render_summary(summary: &AnalysisSummary) -> String {
    let mut output = String::new();
    let unit = summary.unit.as_str();
    let series = &summary.series;

    // Travel extremes first, as they frame everything else.
    let (Some(first), Some(last)) = (series.steps.first(), series.steps.last()) else {
        output.push_str("No travel steps were solved\n");
        return output;
    };
    writeln!(
        &mut output,
        "Suspension travel: {} steps from {:+.2} {unit} to {:+.2} {unit}",
        series.len(),
        first.displacement(),
        last.displacement()
    )
    .expect("writing to string cannot fail");

    writeln!(
        &mut output,
        "{:>10} {:>9} {:>9} {:>9} {:>9} {:>10} {:>8}",
        "travel", "camber", "caster", "toe", "scrub", "rc height", "MR"
    )
    .expect("writing to string cannot fail");
    for step in sampled(series) {
        let metrics = &step.metrics;
        writeln!(
            &mut output,
            "{:>+10.2} {:>+9.3} {:>+9.3} {:>+9.3} {:>+9.3} {:>10} {:>8}",
            step.displacement(),
            metrics.camber,
            metrics.caster,
            metrics.toe,
            metrics.scrub,
            optional(metrics.roll_center.map(|center| center.z), 2),
            optional(metrics.motion_ratio, 4),
        )
        .expect("writing to string cannot fail");
    }

    if series.warnings.is_empty() {
        output.push_str("No branch discontinuities\n");
    } else {
        for warning in &series.warnings {
            writeln!(&mut output, "Warning: {warning}").expect("writing to string cannot fail");
        }
    }
    writeln!(
        &mut output,
        "Largest rigid link drift: {:.2e} of link length",
        summary.max_link_error
    )
    .expect("writing to string cannot fail");

    // Positive is tension, matching the usual two-force member convention.
    let forces = &summary.link_forces;
    let applied = forces.applied;
    writeln!(
        &mut output,
        "Link loads for F = ({:.1}, {:.1}, {:.1}) N, positive in tension:",
        applied.x, applied.y, applied.z
    )
    .expect("writing to string cannot fail");
    for link in LinkId::ALL {
        if let Some(axial) = forces.axial(link) {
            writeln!(&mut output, "  {link:<11} {axial:+10.2} N")
                .expect("writing to string cannot fail");
        }
    }

    let sweep = &summary.sweep;
    writeln!(
        &mut output,
        "Sweep of {} {:?}: {} values, {} failed",
        sweep.hardpoint,
        sweep.axis,
        sweep.entries.len(),
        sweep.failures().count()
    )
    .expect("writing to string cannot fail");
    for (value, swept) in sweep.successes() {
        let span = |pick: fn(&kinematix::KinematicMetrics) -> f64| {
            match (swept.steps.first(), swept.steps.last()) {
                (Some(a), Some(b)) => pick(&b.metrics) - pick(&a.metrics),
                _ => 0.0,
            }
        };
        writeln!(
            &mut output,
            "  {value:+9.3} {unit}: camber gain {:+.3} deg, caster change {:+.3} deg, \
             bump steer {:+.3} deg",
            span(|m| m.camber),
            span(|m| m.caster),
            span(|m| m.toe),
        )
        .expect("writing to string cannot fail");
    }
    for (value, error) in sweep.failures() {
        writeln!(&mut output, "  {value:+9.3} {unit}: failed: {error}")
            .expect("writing to string cannot fail");
    }

    output
}

/// At most eleven evenly spaced steps, always including both ends.
fn sampled(series: &SolvedSeries) -> impl Iterator<Item = &kinematix::TravelStep> {
    let stride = (series.len().saturating_sub(1) / 10).max(1);
    let last = series.len().saturating_sub(1);
    series
        .steps
        .iter()
        .enumerate()
        .filter(move |(index, _)| index % stride == 0 || *index == last)
        .map(|(_, step)| step)
}

/// Format an optional value, `-` when absent.
fn optional(value: Option<f64>, precision: usize) -> String {
    value.map_or_else(|| "-".to_owned(), |value| format!("{value:+.precision$}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::run_analysis;
    use crate::conditions::load_conditions;

    #[test]
    fn formats_human_readable_report() {
        let mut conditions = load_conditions(None, None).expect("demonstration corner");
        conditions.config.steps = 4;
        conditions.sweep.steps = 2;
        let summary = run_analysis(&conditions).expect("analysis runs");
        let report = render_summary(&summary);
        assert!(report.contains("Suspension travel: 9 steps from -25.40 mm to +25.40 mm"));
        assert!(report.contains("No branch discontinuities"));
        assert!(report.contains("pushrod"));
        assert!(report.contains("Sweep of lower_fore_inner Z: 5 values, 0 failed"));
    }

    #[test]
    fn formats_missing_values_as_dash() {
        assert_eq!(optional(None, 3), "-");
        assert_eq!(optional(Some(1.5), 2), "+1.50");
    }
}
