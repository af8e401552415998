//! Error types and result alias for the crate.
//!
//! This module defines [`enum@crate::error::Error`] and the crate-wide [Result] alias. Variants cover
//! missing prerequisite columns, unknown field and unit names, invalid configuration,
//! unresolvable region units, and degenerate statistical weights.
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[non_exhaustive]
#[derive(Debug, Error)]
pub enum Error {
    #[error("field '{field}' requires missing column(s): {}", missing.join(", "))]
    MissingPrerequisite { field: String, missing: Vec<String> },

    #[error("unknown field '{id}'")]
    UnknownField { id: String },

    #[error("unknown unit '{unit}'")]
    UnknownUnit { unit: String },

    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("cannot resolve unit '{unit}' for {context}")]
    UnitResolution { unit: String, context: String },

    #[error("degenerate weights: {0}")]
    DegenerateWeight(String),

    /// Failures outside the data model, such as the worker pool not starting.
    #[error("{0}")]
    Other(String),
}

impl Error {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        Error::Configuration(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_resolution_names_the_context() {
        let err = Error::UnitResolution {
            unit: "au".into(),
            context: "sphere extent".into(),
        };
        assert_eq!(err.to_string(), "cannot resolve unit 'au' for sphere extent");
    }

    #[test]
    fn configuration_helper_prefixes_message() {
        let err = Error::config("gamma must be > 1");
        assert!(matches!(err, Error::Configuration(ref msg) if msg == "gamma must be > 1"));
        assert_eq!(err.to_string(), "invalid configuration: gamma must be > 1");
    }

    #[test]
    fn missing_prerequisite_lists_all_columns() {
        let err = Error::MissingPrerequisite {
            field: "cs".into(),
            missing: vec!["p".into(), "rho".into()],
        };
        assert_eq!(
            err.to_string(),
            "field 'cs' requires missing column(s): p, rho"
        );
    }
}
