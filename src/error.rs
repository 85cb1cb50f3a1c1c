//! Error taxonomy for a report run.
//!
//! Every failure that can abort a run collapses into a [`RunError`], and every
//! variant carries a stable one-word classification so the operator (or the
//! cron job wrapping this binary) can tell a quota stop from a flaky network
//! without reading a stack trace.

use std::error::Error;
use std::fmt;

/// Why a model response was rejected by structural validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// The set of `##` headings does not match the report contract.
    StructureMismatch,
    /// A heading that requires a table has no well-formed table beneath it.
    MissingTable,
    /// The summary section has no usable lead paragraph.
    EmptyLead,
}

/// A structural validation failure, with enough detail to quote in logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub kind: ValidationErrorKind,
    pub detail: String,
}

impl ValidationError {
    pub fn new(kind: ValidationErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.detail)
    }
}

impl Error for ValidationError {}

/// Terminal failure of a report run.
///
/// The pipeline never writes partial artifacts: whichever stage fails first
/// converts into one of these and the run stops there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunError {
    /// The completion service kept failing with retryable errors until the
    /// retry budget ran out.
    Transient(String),
    /// The completion service reported an exhausted quota. Never retried.
    Quota(String),
    /// The completion service answered, but not with usable text, and the
    /// single re-ask did not help.
    Malformed(String),
    /// The response text was readable but violated the report contract.
    Validation(ValidationError),
    /// Artifact rendering or the final write failed.
    Render(String),
    /// The collector's input file was missing or unreadable.
    Input(String),
    /// Bad configuration or environment, fixable by the operator.
    Config(String),
}

impl RunError {
    /// Stable classification token, the first word of every failure line.
    pub fn classification(&self) -> &'static str {
        match self {
            RunError::Transient(_) => "transient_service_error",
            RunError::Quota(_) => "quota_exceeded",
            RunError::Malformed(_) => "malformed_response",
            RunError::Validation(v) => match v.kind {
                ValidationErrorKind::StructureMismatch => "structure_mismatch",
                ValidationErrorKind::MissingTable => "missing_table",
                ValidationErrorKind::EmptyLead => "empty_lead",
            },
            RunError::Render(_) => "render_error",
            RunError::Input(_) => "input_error",
            RunError::Config(_) => "config_error",
        }
    }

    fn detail(&self) -> &str {
        match self {
            RunError::Transient(d)
            | RunError::Quota(d)
            | RunError::Malformed(d)
            | RunError::Render(d)
            | RunError::Input(d)
            | RunError::Config(d) => d,
            RunError::Validation(v) => &v.detail,
        }
    }
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.classification(), self.detail())
    }
}

impl Error for RunError {}

impl From<ValidationError> for RunError {
    fn from(err: ValidationError) -> Self {
        RunError::Validation(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_tokens_are_stable() {
        let cases = [
            (RunError::Transient("x".into()), "transient_service_error"),
            (RunError::Quota("x".into()), "quota_exceeded"),
            (RunError::Malformed("x".into()), "malformed_response"),
            (RunError::Render("x".into()), "render_error"),
            (RunError::Input("x".into()), "input_error"),
            (RunError::Config("x".into()), "config_error"),
        ];
        for (err, token) in cases {
            assert_eq!(err.classification(), token);
        }
    }

    #[test]
    fn test_validation_kinds_map_to_their_own_tokens() {
        let structure = RunError::from(ValidationError::new(
            ValidationErrorKind::StructureMismatch,
            "unexpected heading",
        ));
        let table = RunError::from(ValidationError::new(
            ValidationErrorKind::MissingTable,
            "no rows",
        ));
        let lead = RunError::from(ValidationError::new(ValidationErrorKind::EmptyLead, "empty"));

        assert_eq!(structure.classification(), "structure_mismatch");
        assert_eq!(table.classification(), "missing_table");
        assert_eq!(lead.classification(), "empty_lead");
    }

    #[test]
    fn test_display_is_a_single_classified_line() {
        let err = RunError::Quota("daily request budget exhausted".into());
        assert_eq!(
            err.to_string(),
            "quota_exceeded: daily request budget exhausted"
        );
        assert!(!err.to_string().contains('\n'));
    }
}
