//! # Request Source Targets
//!
//! Defines the `Target` enum naming the three request parts a validator
//! can be scoped to. A validator configured for one target leaves values
//! tagged with any other target untouched.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The part of an incoming request a value was taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Target {
    /// The decoded JSON request body.
    Body,
    /// The query string, decoded into a flat object.
    Query,
    /// The path parameters captured by the route template.
    Param,
}

impl Target {
    /// Sources in the order the router hands them to validators.
    pub const ALL: [Target; 3] = [Target::Param, Target::Query, Target::Body];

    /// Returns the wire name of this target.
    pub fn as_str(&self) -> &'static str {
        match self {
            Target::Body => "body",
            Target::Query => "query",
            Target::Param => "param",
        }
    }

    /// Whether values from this source arrive as raw strings.
    ///
    /// Query and path values are never typed by the transport, so scalar
    /// schemas bound to them are coerced from their string form.
    pub fn is_stringly(&self) -> bool {
        matches!(self, Target::Query | Target::Param)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Target {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "body" => Ok(Target::Body),
            "query" => Ok(Target::Query),
            "param" | "path" => Ok(Target::Param),
            other => Err(format!("unknown request target: {other:?}")),
        }
    }
}
