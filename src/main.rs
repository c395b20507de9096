mod analysis;
mod conditions;
mod report;

use analysis::run_analysis;
use conditions::load_conditions;
use kinematix::SweepAxis;
use report::render_summary;
use std::error::Error;
use std::path::PathBuf;

/// Command line: `[CONFIG.json] [AXIS] [--json]`.
#[derive(Debug, Default, PartialEq)]
struct Arguments {
    /// Corner description to load instead of the demonstration corner.
    config: Option<PathBuf>,
    /// Coordinate to sweep.
    axis: Option<SweepAxis>,
    /// Print the full results as JSON instead of the text report.
    json: bool,
}

/// Split the command line into its parts.
fn parse_arguments(args: impl IntoIterator<Item = String>) -> Result<Arguments, String> {
    let mut parsed = Arguments::default();
    for arg in args {
        if arg == "--json" {
            parsed.json = true;
        } else if arg.starts_with("--") {
            return Err(format!("unknown option {arg}"));
        } else if let Ok(axis) = arg.parse::<SweepAxis>() {
            parsed.axis = Some(axis);
        } else if parsed.config.is_none() {
            parsed.config = Some(PathBuf::from(arg));
        } else {
            return Err(format!("unexpected argument {arg}"));
        }
    }
    Ok(parsed)
}

fn main() -> Result<(), Box<dyn Error>> {
    // Solver progress goes to stderr so `--json` output stays clean.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("kinematix=warn".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let arguments = parse_arguments(std::env::args().skip(1))?;

    // Fall back to the built-in corner when no configuration file is given.
    let conditions = load_conditions(arguments.config.as_deref(), arguments.axis)?;

    // Travel solve, static link loads and the hardpoint sweep.
    let summary = run_analysis(&conditions)?;

    if arguments.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("{}", render_summary(&summary));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| (*value).to_owned()).collect()
    }

    #[test]
    fn parses_config_axis_and_json() {
        let parsed = parse_arguments(args(&["corner.json", "y", "--json"])).expect("valid");
        assert_eq!(parsed.config, Some(PathBuf::from("corner.json")));
        assert_eq!(parsed.axis, Some(SweepAxis::Y));
        assert!(parsed.json);
    }

    #[test]
    fn empty_arguments_use_defaults() {
        assert_eq!(parse_arguments(Vec::new()).expect("valid"), Arguments::default());
    }

    #[test]
    fn rejects_unknown_options() {
        assert!(parse_arguments(args(&["--verbose"])).is_err());
        assert!(parse_arguments(args(&["a.json", "b.json"])).is_err());
    }
}
