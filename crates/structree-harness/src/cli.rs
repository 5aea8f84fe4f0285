use std::fs;
use std::io::Write;
use std::path::PathBuf;

use clap::Parser;
use structree_core::Rational;
use structree_tree::Structor;
use tracing_subscriber::EnvFilter;

use crate::config::ScenarioConfig;
use crate::driver::run_scenario;
use crate::error::{HarnessError, Result};
use crate::golden::verify_checksum;
use crate::render::{OutputFormat, render_report};

/// Environment variable holding the log filter directive.
pub const LOG_ENV: &str = "STRUCTREE_LOG";

#[derive(Debug, Parser)]
#[command(
    name = "structree",
    about = "Drive an exact growth tree with (rate, magnitude) structors",
    version
)]
pub struct Cli {
    /// JSON scenario file. Mutually exclusive with --structor.
    #[arg(long, conflicts_with = "structors")]
    pub scenario: Option<PathBuf>,

    /// Structor as <rate>:<magnitude>, e.g. 1/2:6. Repeat to apply several.
    #[arg(long = "structor", value_name = "RATE:MAGNITUDE", allow_hyphen_values = true)]
    pub structors: Vec<Structor>,

    /// Driving rate of the fresh tree.
    #[arg(long)]
    pub initial_rate: Option<Rational>,

    /// Number of times the structor list is applied.
    #[arg(long)]
    pub iterations: Option<u32>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Ascii)]
    pub format: OutputFormat,

    /// Write output here instead of stdout.
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Fail unless the final tree has this golden checksum.
    #[arg(long)]
    pub expect_checksum: Option<String>,

    /// Emit logs as JSON lines on stderr.
    #[arg(long, env = "STRUCTREE_LOG_JSON")]
    pub log_json: bool,
}

impl Cli {
    /// Resolve the scenario: a file, the command-line structors, or the demo.
    /// `--initial-rate` and `--iterations` override whichever source is used.
    pub fn scenario_config(&self) -> Result<ScenarioConfig> {
        let mut config = if let Some(path) = &self.scenario {
            ScenarioConfig::from_path(path)?
        } else if self.structors.is_empty() {
            ScenarioConfig::demo()
        } else {
            ScenarioConfig {
                initial_rate: Rational::ONE,
                iterations: 1,
                structors: self.structors.clone(),
            }
        };
        if let Some(rate) = self.initial_rate {
            config.initial_rate = rate;
        }
        if let Some(iterations) = self.iterations {
            config.iterations = iterations;
        }
        config.validate()?;
        Ok(config)
    }
}

/// Install the global subscriber. The filter comes from `STRUCTREE_LOG`
/// and defaults to `warn`.
pub fn init_logging(json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true);
    let installed = if json {
        builder.json().try_init()
    } else {
        builder.compact().try_init()
    };
    installed.map_err(|error| HarnessError::Logging {
        message: error.to_string(),
    })
}

pub fn run_from_env() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_json)?;
    run(cli)
}

pub fn run(cli: Cli) -> Result<()> {
    let config = cli.scenario_config()?;
    let report = run_scenario(&config)?;
    let rendered = render_report(&report, cli.format)?;

    match &cli.output {
        Some(path) => fs::write(path, rendered)?,
        None => std::io::stdout().lock().write_all(rendered.as_bytes())?,
    }

    if let Some(expected) = &cli.expect_checksum {
        verify_checksum(&report.checksum, expected)?;
    }
    Ok(())
}
