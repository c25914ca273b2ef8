//! Recurrence-rule validation errors.

use crate::core::Component;

/// Result type for rule parsing.
pub type RuleResult<T> = Result<T, RuleError>;

/// Error rejecting an invalid recurrence rule.
///
/// Every variant is a pre-expansion validation failure; no partial rule is
/// ever returned. Callers are expected to surface these as a user-facing
/// "invalid recurrence rule" message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleError {
    /// A key outside the recognized component set.
    #[error("unrecognized rule component `{0}`")]
    UnknownComponent(String),

    /// A component appeared more than once.
    #[error("rule component {0} appears more than once")]
    DuplicateComponent(Component),

    /// FREQ is absent.
    #[error("rule is missing the FREQ component")]
    MissingFrequency,

    /// FREQ value is not one of the seven recognized frequencies.
    #[error("`{0}` is not a valid frequency")]
    InvalidFrequencyValue(String),

    /// INTERVAL is zero, negative, or not a number.
    #[error("INTERVAL must be a positive integer")]
    InvalidInterval,

    /// COUNT and UNTIL are both present.
    #[error("COUNT and UNTIL are mutually exclusive")]
    ConflictingBound,

    /// A numeric value outside the component's legal domain, or one that
    /// could not be read as a number at all.
    #[error("value out of range for {0}")]
    OutOfRangeValue(Component),

    /// A BYDAY entry whose ordinal or weekday code cannot be parsed.
    #[error("malformed BYDAY entry `{0}`")]
    MalformedByDay(String),

    /// BYSETPOS present without any other BY* component to select from.
    #[error("BYSETPOS requires at least one other BY rule part")]
    UnsupportedSetPos,
}
