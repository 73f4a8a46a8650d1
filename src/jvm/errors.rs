use std::fmt;

#[derive(Debug)]
pub enum Error {
    IoError(std::io::Error),

    /// A method or field descriptor could not be parsed
    BadDescriptor(String),

    /// A class or member name is not valid
    BadName(String),

    /// Two stack map entries claim the same bytecode offset
    ConflictingStackMaps(u16),

    /// A stack map entry is not well formed (eg. it spells out the second half of a `long`)
    MalformedStackMap(u16),

    /// Verification of a method failed
    ///
    /// `at` is whatever position the driver was at (a bytecode offset, or a line in a trace).
    Verifier { at: usize, kind: VerifierErrorKind },

    /// A verifier trace script is malformed
    Script { line: usize, message: String },
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        Error::IoError(err)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::IoError(err) => write!(f, "I/O error: {}", err),
            Error::BadDescriptor(msg) => write!(f, "bad descriptor: {}", msg),
            Error::BadName(msg) => write!(f, "bad name: {}", msg),
            Error::ConflictingStackMaps(offset) => {
                write!(f, "more than one stack map for offset {}", offset)
            }
            Error::MalformedStackMap(offset) => {
                write!(f, "malformed stack map for offset {}", offset)
            }
            Error::Verifier { at, kind } => write!(f, "verification failed at {}: {}", at, kind),
            Error::Script { line, message } => write!(f, "line {}: {}", line, message),
        }
    }
}

impl std::error::Error for Error {}

/// Reasons for which a method can fail verification
///
/// Every one of these is terminal for the method being verified: there is no partially verified
/// state to recover.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum VerifierErrorKind {
    /// Push beyond the declared maximum stack depth
    StackOverflow,

    /// Pop from an empty (or too shallow) stack
    StackUnderflow,

    /// The stack holds a value of the wrong type (or the wrong number of values)
    StackBadType,

    /// Local variable index is outside of the declared maximum locals
    LocalsOverflow,

    /// The local variable holds a value of the wrong type
    LocalsBadType,

    /// Not enough values on the stack for the arguments of a call
    InsufficientArguments,

    /// No stack map entry was registered for a control flow target
    MissingStackmap,

    /// Uninitialized `this` reached somewhere it is not allowed
    InvalidInitialization,

    /// A class name could not be resolved
    InvalidConstantOrClass,
}

impl fmt::Display for VerifierErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            VerifierErrorKind::StackOverflow => "stack overflow",
            VerifierErrorKind::StackUnderflow => "stack underflow",
            VerifierErrorKind::StackBadType => "bad type on stack",
            VerifierErrorKind::LocalsOverflow => "local variable index out of range",
            VerifierErrorKind::LocalsBadType => "bad type in local variable",
            VerifierErrorKind::InsufficientArguments => "insufficient arguments on stack",
            VerifierErrorKind::MissingStackmap => "missing stack map",
            VerifierErrorKind::InvalidInitialization => "invalid object initialization",
            VerifierErrorKind::InvalidConstantOrClass => "invalid constant or class",
        };
        f.write_str(msg)
    }
}
