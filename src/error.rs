use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid selector: {0}")]
    InvalidSelector(String),

    #[error("A profiling session is already active")]
    AlreadyActive,

    #[error("Profiling session has already run; begin a new session")]
    SessionFinished,

    #[error("Cannot read trace {}: {source}", path.display())]
    TraceRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed trace event on line {line}: {source}")]
    TraceParse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("Inconsistent trace event on line {line}: {reason}")]
    TraceShape { line: usize, reason: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL_ERROR: i32 = 1;
    pub const INVALID_ARGUMENTS: i32 = 2;
    pub const ALREADY_ACTIVE: i32 = 3;
    pub const TRACE_ERROR: i32 = 4;
}

impl Error {
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::InvalidSelector(_) => exit_code::INVALID_ARGUMENTS,
            Error::AlreadyActive => exit_code::ALREADY_ACTIVE,
            Error::TraceRead { .. } | Error::TraceParse { .. } | Error::TraceShape { .. } => {
                exit_code::TRACE_ERROR
            }
            _ => exit_code::GENERAL_ERROR,
        }
    }
}
