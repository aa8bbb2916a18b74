//! Error codes reported by the engine and the error type surfaced to callers.

use std::ffi::NulError;
use std::fmt;
use thiserror::Error;

/// Result type for session operations.
pub type AugResult<T> = Result<T, AugError>;

/// Error code reported by the engine after the most recent operation.
///
/// Values match the engine's `aug_errcode_t` enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// No error.
    NoError,
    /// Out of memory.
    NoMemory,
    /// Internal error (bug in the engine).
    Internal,
    /// Invalid path expression.
    PathExpression,
    /// No match for a path expression.
    NoMatch,
    /// Too many matches for a path expression.
    MultipleMatches,
    /// Syntax error in a lens file.
    Syntax,
    /// Lens lookup failed.
    NoLens,
    /// Multiple transforms apply to one file.
    MultipleTransforms,
    /// No span information for a node.
    NoSpan,
    /// Cannot move a node into its own descendant.
    MoveIntoDescendant,
    /// Failed to execute a script command.
    CommandRun,
    /// Invalid argument in a function call.
    BadArgument,
    /// A code this crate does not know by name.
    Other(i32),
}

impl ErrorCode {
    /// Every named code, in engine order.
    pub const ALL: [ErrorCode; 13] = [
        ErrorCode::NoError,
        ErrorCode::NoMemory,
        ErrorCode::Internal,
        ErrorCode::PathExpression,
        ErrorCode::NoMatch,
        ErrorCode::MultipleMatches,
        ErrorCode::Syntax,
        ErrorCode::NoLens,
        ErrorCode::MultipleTransforms,
        ErrorCode::NoSpan,
        ErrorCode::MoveIntoDescendant,
        ErrorCode::CommandRun,
        ErrorCode::BadArgument,
    ];

    /// Converts a raw engine code.
    pub fn from_raw(code: i32) -> Self {
        match code {
            0 => ErrorCode::NoError,
            1 => ErrorCode::NoMemory,
            2 => ErrorCode::Internal,
            3 => ErrorCode::PathExpression,
            4 => ErrorCode::NoMatch,
            5 => ErrorCode::MultipleMatches,
            6 => ErrorCode::Syntax,
            7 => ErrorCode::NoLens,
            8 => ErrorCode::MultipleTransforms,
            9 => ErrorCode::NoSpan,
            10 => ErrorCode::MoveIntoDescendant,
            11 => ErrorCode::CommandRun,
            12 => ErrorCode::BadArgument,
            other => ErrorCode::Other(other),
        }
    }

    /// Returns the raw engine code.
    pub fn code(self) -> i32 {
        match self {
            ErrorCode::NoError => 0,
            ErrorCode::NoMemory => 1,
            ErrorCode::Internal => 2,
            ErrorCode::PathExpression => 3,
            ErrorCode::NoMatch => 4,
            ErrorCode::MultipleMatches => 5,
            ErrorCode::Syntax => 6,
            ErrorCode::NoLens => 7,
            ErrorCode::MultipleTransforms => 8,
            ErrorCode::NoSpan => 9,
            ErrorCode::MoveIntoDescendant => 10,
            ErrorCode::CommandRun => 11,
            ErrorCode::BadArgument => 12,
            ErrorCode::Other(code) => code,
        }
    }

    /// Returns the engine's constant name, e.g. `AUG_EPATHX`.
    pub fn name(self) -> &'static str {
        match self {
            ErrorCode::NoError => "AUG_NOERROR",
            ErrorCode::NoMemory => "AUG_ENOMEM",
            ErrorCode::Internal => "AUG_EINTERNAL",
            ErrorCode::PathExpression => "AUG_EPATHX",
            ErrorCode::NoMatch => "AUG_ENOMATCH",
            ErrorCode::MultipleMatches => "AUG_EMMATCH",
            ErrorCode::Syntax => "AUG_ESYNTAX",
            ErrorCode::NoLens => "AUG_ENOLENS",
            ErrorCode::MultipleTransforms => "AUG_EMXFM",
            ErrorCode::NoSpan => "AUG_ENOSPAN",
            ErrorCode::MoveIntoDescendant => "AUG_EMVDESC",
            ErrorCode::CommandRun => "AUG_ECMDRUN",
            ErrorCode::BadArgument => "AUG_EBADARG",
            ErrorCode::Other(_) => "AUG_EUNKNOWN",
        }
    }

    /// Returns true for [`ErrorCode::NoError`].
    pub fn is_ok(self) -> bool {
        self == ErrorCode::NoError
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCode::Other(code) => write!(f, "{}({code})", self.name()),
            _ => f.write_str(self.name()),
        }
    }
}

/// Engine error detail: primary message plus optional minor message and details.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorDetail {
    /// Engine error code.
    pub code: ErrorCode,
    /// Primary message.
    pub message: Option<String>,
    /// Minor message narrowing down the failure.
    pub minor: Option<String>,
    /// Free-form details, usually the offending expression.
    pub details: Option<String>,
}

impl ErrorDetail {
    /// Creates a detail with only a code.
    pub fn new(code: ErrorCode) -> Self {
        Self {
            code,
            message: None,
            minor: None,
            details: None,
        }
    }

    /// Composes the message as `message: minor: details`, skipping absent parts.
    pub fn compose(&self) -> String {
        let parts: Vec<&str> = [&self.message, &self.minor, &self.details]
            .into_iter()
            .filter_map(|part| part.as_deref())
            .filter(|part| !part.is_empty())
            .collect();
        if parts.is_empty() {
            self.code.name().to_string()
        } else {
            parts.join(": ")
        }
    }
}

impl fmt::Display for ErrorDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.compose())
    }
}

/// Errors surfaced by Augeas sessions.
#[derive(Debug, Error)]
pub enum AugError {
    /// Arguments were rejected before the engine was called.
    #[error("invalid arguments: {message}")]
    InvalidArgument {
        /// What was wrong.
        message: String,
    },

    /// The engine reported a failure.
    #[error("{operation}() failed: {detail}")]
    Engine {
        /// Engine entry point that failed.
        operation: &'static str,
        /// Error detail read from the engine.
        detail: ErrorDetail,
    },

    /// Handle creation failed.
    #[error("aug_init() failed: {message}")]
    Init {
        /// Composed engine message, or a description of the failure.
        message: String,
    },

    /// The native library could not be loaded.
    #[error("cannot load libaugeas: {message}")]
    Library {
        /// Loader message.
        message: String,
    },

    /// A script stopped at an explicit `quit` command.
    #[error("script stopped by quit")]
    ScriptQuit {
        /// What the commands before `quit` printed.
        output: String,
    },

    /// A script command failed.
    #[error("aug_srun() failed: {detail}")]
    Script {
        /// Error detail read from the engine.
        detail: ErrorDetail,
        /// What the commands before the failing one printed.
        output: String,
    },

    /// Script output could not be captured; the script did not run.
    #[error("cannot capture script output: {0}")]
    Capture(#[source] std::io::Error),

    /// The engine returned a value outside its documented convention.
    #[error("unexpected return value {code} from {operation}()")]
    Unexpected {
        /// Engine entry point.
        operation: &'static str,
        /// Returned value.
        code: i32,
    },

    /// The session is held by an asynchronous save.
    #[error("session busy: a save is in progress")]
    Busy,

    /// The asynchronous bridge could not start a worker.
    #[error("cannot start save worker: {0}")]
    Worker(#[source] std::io::Error),

    /// The engine panicked during an asynchronous save.
    #[error("save worker panicked: {message}")]
    SavePanicked {
        /// Panic message.
        message: String,
    },
}

impl AugError {
    /// Creates an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates an engine error from its detail.
    pub fn engine(operation: &'static str, detail: ErrorDetail) -> Self {
        Self::Engine { operation, detail }
    }

    /// Creates an init error.
    pub fn init(message: impl Into<String>) -> Self {
        Self::Init {
            message: message.into(),
        }
    }

    /// Creates a library loading error.
    pub fn library(message: impl Into<String>) -> Self {
        Self::Library {
            message: message.into(),
        }
    }

    /// Returns the engine error code carried by this error, if any.
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            AugError::Engine { detail, .. } | AugError::Script { detail, .. } => Some(detail.code),
            _ => None,
        }
    }

    /// Returns what a script printed before it stopped, for script errors.
    pub fn script_output(&self) -> Option<&str> {
        match self {
            AugError::ScriptQuit { output } | AugError::Script { output, .. } => Some(output),
            _ => None,
        }
    }
}

impl From<NulError> for AugError {
    fn from(err: NulError) -> Self {
        AugError::invalid_argument(format!(
            "string contains a NUL byte at position {}",
            err.nul_position()
        ))
    }
}
