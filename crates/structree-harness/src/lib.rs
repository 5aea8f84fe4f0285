#![forbid(unsafe_code)]

//! Scenario harness for the structree growth engine.
//!
//! Loads a scenario (a JSON file, command-line structors, or the built-in
//! demo), runs it through a [`GrowthTree`](structree_tree::GrowthTree), and
//! renders the result as an ASCII tree, a Graphviz document, a JSON report, or
//! a progress summary. Every run ends with a `blake3:` golden checksum of the
//! final tree.

pub mod cli;
pub mod config;
pub mod driver;
pub mod error;
pub mod golden;
pub mod render;

pub use cli::{Cli, run, run_from_env};
pub use config::ScenarioConfig;
pub use driver::{ScenarioReport, StepRecord, evolve_loop, run_scenario};
pub use error::{HarnessError, Result};
pub use golden::snapshot_checksum;
pub use render::{OutputFormat, render_ascii, render_dot, render_report, render_summary};
