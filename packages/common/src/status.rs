use std::fmt;

/// Error when parsing an invalid status string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseStatusError {
    invalid: String,
    valid: &'static [&'static str],
}

impl ParseStatusError {
    pub(crate) fn new(invalid: &str, valid: &'static [&'static str]) -> Self {
        Self {
            invalid: invalid.to_string(),
            valid,
        }
    }
}

impl fmt::Display for ParseStatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Invalid status '{}'. Valid values: {}",
            self.invalid,
            self.valid.join(", ")
        )
    }
}

impl std::error::Error for ParseStatusError {}
