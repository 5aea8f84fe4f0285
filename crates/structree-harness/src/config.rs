//! Scenario configuration.
//!
//! A scenario is a starting rate plus a list of structors applied in order,
//! `iterations` times. On disk it is JSON:
//!
//! ```json
//! {
//!   "initial_rate": "1",
//!   "iterations": 4,
//!   "structors": [
//!     { "name": "grow", "rate": "1/2", "magnitude": "6" },
//!     { "name": "shrink", "rate": { "numerator": 1, "denominator": 4 }, "magnitude": "-6" }
//!   ]
//! }
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use structree_core::Rational;
use structree_tree::Structor;

use crate::error::{HarnessError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioConfig {
    #[serde(default = "default_initial_rate")]
    pub initial_rate: Rational,
    #[serde(default = "default_iterations")]
    pub iterations: u32,
    pub structors: Vec<Structor>,
}

fn default_initial_rate() -> Rational {
    Rational::ONE
}

const fn default_iterations() -> u32 {
    1
}

impl ScenarioConfig {
    /// Alternating growth and shrinkage at different rates, looped four times.
    #[must_use]
    pub fn demo() -> Self {
        Self {
            initial_rate: Rational::ONE,
            iterations: 4,
            structors: vec![
                Structor::new(Rational::ONE / Rational::from(2), Rational::from(6)).named("grow"),
                Structor::new(Rational::ONE / Rational::from(4), Rational::from(-6))
                    .named("shrink"),
            ],
        }
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)
            .map_err(|error| HarnessError::invalid(format!("malformed scenario JSON: {error}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(HarnessError::MissingScenario {
                path: path.to_path_buf(),
            });
        }
        Self::from_json_str(&fs::read_to_string(path)?)
    }

    /// Reject scenarios the engine would refuse or that do nothing.
    pub fn validate(&self) -> Result<()> {
        if self.structors.is_empty() {
            return Err(HarnessError::invalid("scenario has no structors"));
        }
        if self.iterations == 0 {
            return Err(HarnessError::invalid("iterations must be at least 1"));
        }
        if !self.initial_rate.is_positive() {
            return Err(HarnessError::invalid(format!(
                "initial rate must be positive, got {}",
                self.initial_rate
            )));
        }
        if let Some((index, structor)) = self
            .structors
            .iter()
            .enumerate()
            .find(|(_, structor)| !structor.rate().is_positive())
        {
            return Err(HarnessError::invalid(format!(
                "structor {} {structor} has a non-positive rate",
                index + 1
            )));
        }
        Ok(())
    }

    /// Total number of structor applications.
    #[must_use]
    pub fn applications(&self) -> usize {
        self.structors.len() * self.iterations as usize
    }
}
