use serde::{Deserialize, Serialize};

#[derive(thiserror::Error, Debug, PartialEq, Clone, Serialize, Deserialize)]
pub enum Error {
    /// Malformed snippet text
    #[error("{0}")]
    Syntax(String),

    /// Reference to a name that is not bound in any enclosing scope
    #[error("{0} is not defined")]
    Undefined(String),

    #[error("Identifier '{0}' has already been declared")]
    Redeclared(String),

    #[error("Assignment to constant variable '{0}'")]
    ConstAssign(String),

    #[error("{0}")]
    Type(String),

    #[error("{0}")]
    Range(String),

    /// A value raised with `throw` or a rejected error surfaced as an error.
    /// Carries the thrown value's message.
    #[error("{0}")]
    Thrown(String),

    #[error("step budget exhausted")]
    StepLimit,

    /// Unexpected interpreter state
    #[error("Unexpected state - {0}")]
    UnexpectedState(String),
}

impl Error {
    /// User-facing message, verbatim
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// Name of the error class as seen by snippets
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Syntax(_) | Error::Redeclared(_) => "SyntaxError",
            Error::Undefined(_) => "ReferenceError",
            Error::Type(_) | Error::ConstAssign(_) => "TypeError",
            Error::Range(_) | Error::StepLimit => "RangeError",
            Error::Thrown(_) | Error::UnexpectedState(_) => "Error",
        }
    }

    /// Whether or not the error aborts evaluation regardless of `try` blocks
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::StepLimit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages() {
        assert_eq!(Error::Undefined("foo".into()).message(), "foo is not defined");
        assert_eq!(Error::Thrown("boom".into()).message(), "boom");
        assert_eq!(Error::StepLimit.message(), "step budget exhausted");
    }

    #[test]
    fn kinds() {
        assert_eq!(Error::Undefined("x".into()).kind(), "ReferenceError");
        assert_eq!(Error::Syntax("x".into()).kind(), "SyntaxError");
        assert_eq!(Error::Type("x".into()).kind(), "TypeError");
    }
}
