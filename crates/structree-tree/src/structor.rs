//! Structors: the unit of input to the growth engine.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use structree_core::Rational;

use crate::error::StructorParseError;

/// An immutable `(rate, magnitude)` growth event.
///
/// A structor carries no tree state; applying it asks the engine to evolve
/// at `rate` by `magnitude`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Structor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    rate: Rational,
    magnitude: Rational,
}

impl Structor {
    #[must_use]
    pub const fn new(rate: Rational, magnitude: Rational) -> Self {
        Self {
            name: None,
            rate,
            magnitude,
        }
    }

    /// Attach a display name.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    #[must_use]
    pub const fn rate(&self) -> Rational {
        self.rate
    }

    #[must_use]
    pub const fn magnitude(&self) -> Rational {
        self.magnitude
    }
}

impl fmt::Display for Structor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = &self.name {
            write!(f, "{name}")?;
        }
        write!(f, "({}, {})", self.rate, self.magnitude)
    }
}

/// Parses `<rate>:<magnitude>`, for example `1/2:6` or `1/4:-6`.
impl FromStr for Structor {
    type Err = StructorParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let Some((rate, magnitude)) = input.split_once(':') else {
            return Err(StructorParseError::MissingSeparator {
                input: input.to_string(),
            });
        };
        let parse = |text: &str, field: &'static str| {
            text.parse::<Rational>()
                .map_err(|source| StructorParseError::InvalidRational {
                    input: input.to_string(),
                    field,
                    source,
                })
        };
        Ok(Self::new(parse(rate, "rate")?, parse(magnitude, "magnitude")?))
    }
}
