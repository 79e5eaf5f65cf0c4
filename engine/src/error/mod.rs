use std::error::Error;
use std::fmt::{Display, Formatter};

/// A custom error message for the analysis engine
#[derive(Debug, Clone)]
pub enum EngineError {
    /// Error during the parsing of a method in textual or JSON form
    ParseError(String),
    /// Invalid assumption made about the bytecode
    InvalidAssumption(String),
    /// Invariant violation
    InvariantViolation(String),
    /// The fixpoint iteration did not stabilize within the iteration cap
    NonConvergence(String),
}

pub type EngineResult<T> = Result<T, EngineError>;

impl Display for EngineError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ParseError(msg) => {
                write!(f, "[sable::parsing] {}", msg)
            }
            Self::InvalidAssumption(msg) => {
                write!(f, "[sable::assumption] {}", msg)
            }
            Self::InvariantViolation(msg) => {
                write!(f, "[sable::invariant] {}", msg)
            }
            Self::NonConvergence(msg) => {
                write!(f, "[sable::fixpoint] {}", msg)
            }
        }
    }
}

impl Error for EngineError {}
