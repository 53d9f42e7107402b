//! # Error Types — Validation Failures
//!
//! Defines the two validation error kinds used throughout zpipe. All
//! errors use `thiserror` for derive-based `Display` and `Error`
//! implementations.
//!
//! ## Design
//!
//! - Input failures (body, query, path) render every violated constraint
//!   with its instance path. This is the consumer-facing diagnostic.
//! - Output failures (a handler's return value breaking its declared
//!   schema) render a fixed generic message. The violations stay attached
//!   for logging but never reach the client.

use std::fmt;

use thiserror::Error;

use crate::target::Target;

/// Client-facing message for output validation failures.
pub const OUTPUT_FAILURE_MESSAGE: &str = "Validation failed";

/// A single failed constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// JSON Pointer to the offending location in the instance. Empty for the root.
    pub path: String,
    /// Human-readable description of the failed constraint.
    pub message: String,
}

impl Violation {
    /// Create a violation at `path`.
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }

    /// The top-level field the violation belongs to, if any.
    ///
    /// `"/address/zip"` yields `"address"`; the root yields `None`.
    pub fn field(&self) -> Option<&str> {
        self.path
            .strip_prefix('/')
            .and_then(|rest| rest.split('/').next())
            .filter(|s| !s.is_empty())
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "(root): {}", self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

/// Ordered, non-empty collection of violations from one validation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violations {
    violations: Vec<Violation>,
}

impl Violations {
    /// Wrap a list of violations. Returns `None` when the list is empty.
    pub fn from_vec(violations: Vec<Violation>) -> Option<Self> {
        if violations.is_empty() {
            None
        } else {
            Some(Self { violations })
        }
    }

    /// A collection holding exactly one violation.
    pub fn single(violation: Violation) -> Self {
        Self {
            violations: vec![violation],
        }
    }

    /// Returns the number of violations.
    pub fn len(&self) -> usize {
        self.violations.len()
    }

    /// Always false; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    /// Returns a slice of all violations.
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    /// Consumes self and returns the inner Vec.
    pub fn into_inner(self) -> Vec<Violation> {
        self.violations
    }

    /// Returns true if any violation sits at or below `path`.
    pub fn mentions(&self, path: &str) -> bool {
        self.violations
            .iter()
            .any(|v| v.path == path || v.path.starts_with(&format!("{path}/")))
    }
}

impl fmt::Display for Violations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, v) in self.violations.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{v}")?;
        }
        Ok(())
    }
}

impl IntoIterator for Violations {
    type Item = Violation;
    type IntoIter = std::vec::IntoIter<Violation>;

    fn into_iter(self) -> Self::IntoIter {
        self.violations.into_iter()
    }
}

/// A value failed its schema.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Incoming request data did not match the bound schema.
    #[error("{target} validation failed: {violations}")]
    Input {
        /// The request part that was rejected.
        target: Target,
        /// Every violated constraint.
        violations: Violations,
    },

    /// A handler returned a value that does not match its declared schema.
    #[error("Validation failed")]
    Output {
        /// Every violated constraint. Server-side diagnostics only.
        violations: Violations,
    },
}

impl ValidationError {
    /// Returns the violations behind this error.
    pub fn violations(&self) -> &Violations {
        match self {
            ValidationError::Input { violations, .. } => violations,
            ValidationError::Output { violations } => violations,
        }
    }

    /// Label used for logs and metrics: the target name, or `"output"`.
    pub fn source_label(&self) -> &'static str {
        match self {
            ValidationError::Input { target, .. } => target.as_str(),
            ValidationError::Output { .. } => "output",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Violations {
        Violations::from_vec(vec![
            Violation::new("/id", r#""abc" is not of type "number""#),
            Violation::new("", r#""name" is a required property"#),
        ])
        .unwrap()
    }

    #[test]
    fn test_violation_display_format() {
        let v = Violation::new("/address/zip", "must match pattern");
        assert_eq!(v.to_string(), "/address/zip: must match pattern");
    }

    #[test]
    fn test_violation_display_root() {
        let v = Violation::new("", "expected object");
        assert!(v.to_string().starts_with("(root)"));
    }

    #[test]
    fn test_violation_field() {
        assert_eq!(Violation::new("/address/zip", "x").field(), Some("address"));
        assert_eq!(Violation::new("/id", "x").field(), Some("id"));
        assert_eq!(Violation::new("", "x").field(), None);
    }

    #[test]
    fn test_empty_violations_rejected() {
        assert!(Violations::from_vec(Vec::new()).is_none());
    }

    #[test]
    fn test_mentions_nested_paths() {
        let vs = Violations::single(Violation::new("/address/zip", "bad"));
        assert!(vs.mentions("/address"));
        assert!(vs.mentions("/address/zip"));
        assert!(!vs.mentions("/addr"));
    }

    #[test]
    fn test_input_error_lists_every_violation() {
        let err = ValidationError::Input {
            target: Target::Param,
            violations: sample(),
        };
        let msg = err.to_string();
        assert!(msg.starts_with("param validation failed"));
        assert!(msg.contains("/id"));
        assert!(msg.contains("(root)"));
    }

    #[test]
    fn test_output_error_is_generic() {
        let err = ValidationError::Output {
            violations: sample(),
        };
        assert_eq!(err.to_string(), OUTPUT_FAILURE_MESSAGE);
        assert_eq!(err.violations().len(), 2);
        assert_eq!(err.source_label(), "output");
    }
}
