//! Code generation error types.
//!
//! By the time lowering runs, the front end has already rejected bad
//! programs, so the errors left here are the missing entry point, sink
//! failures, and invariant breaks that point at a bug (or a bypassed
//! check) in an earlier stage.

use crate::lexer::SourceLocation;

#[derive(Debug)]
pub enum CodeGenError {
    /// The program never defined a `main` function
    MissingMain,
    /// A named local reached lowering without a slot in the current
    /// frame
    UnassignedLocal(String),
    /// The AST arrived in a shape the parser or type checker is
    /// supposed to reject (a value-less expression in value position,
    /// a function name used as a variable)
    InvariantViolation {
        location: SourceLocation,
        message: String,
    },
    /// Writing to the assembly text sink failed
    Emit(std::fmt::Error),
}

impl CodeGenError {
    pub fn invariant(location: SourceLocation, message: impl Into<String>) -> Self {
        CodeGenError::InvariantViolation {
            location,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for CodeGenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CodeGenError::MissingMain => write!(f, "no main function defined"),
            CodeGenError::UnassignedLocal(name) => {
                write!(f, "no frame slot assigned for local '{}'", name)
            }
            CodeGenError::InvariantViolation { location, message } => {
                write!(f, "{}: {}", location, message)
            }
            CodeGenError::Emit(e) => write!(f, "failed to write assembly text: {}", e),
        }
    }
}

impl std::error::Error for CodeGenError {}

impl From<std::fmt::Error> for CodeGenError {
    fn from(e: std::fmt::Error) -> Self {
        CodeGenError::Emit(e)
    }
}
