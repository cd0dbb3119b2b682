use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors from the control API (`init`, `enable*`, `disable`, `rc_fifo`).
///
/// `fail()` never reports errors: a name with no matching point, or a call
/// before `init`, simply does not fail.
#[derive(Error, Debug)]
pub enum Error {
    #[error("the registry is not initialized, call init() first")]
    NotInitialized,

    #[error("no point of failure named `{0}` is enabled")]
    NotFound(String),

    #[error("point of failure names must not be empty")]
    EmptyName,

    #[error("failnum must be non-zero")]
    ZeroFailnum,

    #[error("probability {0} is outside [0, 1]")]
    InvalidProbability(f64),

    #[error("matching at stack position {0} is unsupported, only -1 (any frame) works")]
    UnsupportedStackPos(i32),

    #[error("stack tracing is not available on this platform")]
    BacktraceUnavailable,

    #[error("could not resolve function `{0}`")]
    UnknownSymbol(String),

    #[error("could not register a fork handler")]
    ForkHook,

    #[error("control channel {}: {source}", .path.display())]
    Channel { path: PathBuf, source: io::Error },
}

/// Errors from parsing or running a remote-control command line.
#[derive(Error, Debug)]
pub enum ControlError {
    #[error("empty command line")]
    Empty,

    #[error("unknown command `{0}`")]
    UnknownCommand(String),

    #[error("missing required option `name`")]
    MissingName,

    #[error("command requires option `{0}`")]
    MissingOption(&'static str),

    #[error("unknown option `{0}`")]
    UnknownOption(String),

    #[error("invalid value `{value}` for option `{option}`")]
    BadValue { option: &'static str, value: String },

    #[error(transparent)]
    Api(#[from] Error),
}
