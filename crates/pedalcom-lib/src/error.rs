use thiserror::Error;

/// Errors raised by the energetics pipeline.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EnergeticsError {
    /// A required input was not supplied.
    #[error("missing input: {0}")]
    MissingInput(String),

    /// An input was supplied but cannot be processed.
    #[error("malformed input: {0}")]
    MalformedInput(String),
}

impl EnergeticsError {
    pub(crate) fn missing(what: impl Into<String>) -> Self {
        Self::MissingInput(what.into())
    }

    pub(crate) fn malformed(what: impl Into<String>) -> Self {
        Self::MalformedInput(what.into())
    }
}

pub type EnergeticsResult<T> = Result<T, EnergeticsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_kind() {
        let err = EnergeticsError::missing("subject_mass");
        assert_eq!(err.to_string(), "missing input: subject_mass");
        let err = EnergeticsError::malformed("time is not strictly increasing");
        assert!(err.to_string().starts_with("malformed input"));
    }
}
