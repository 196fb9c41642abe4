// this_file: backends/ttb-core/src/error.rs

//! Error types for the bridge.
//!
//! Two channels are kept apart. Ordinary failures (a missing file,
//! a short read) travel as plain values the engine is expected to branch on.
//! An [`Abort`] means the run cannot continue; it is propagated with `?` all
//! the way to the entry trampoline, which turns it into the engine's fatal
//! status.

use crate::channel::BoundedMessage;
use crate::types::EngineKind;
use std::fmt;
use thiserror::Error;

/// The message of a run that cannot continue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Abort {
    message: BoundedMessage,
}

impl Abort {
    pub fn message(&self) -> &str {
        self.message.as_str()
    }

    /// Whether the message was cut to fit the error buffer.
    pub fn is_truncated(&self) -> bool {
        self.message.is_truncated()
    }

    pub fn into_message(self) -> String {
        self.message.into_string()
    }
}

impl From<BoundedMessage> for Abort {
    fn from(message: BoundedMessage) -> Self {
        Self { message }
    }
}

impl fmt::Display for Abort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

impl std::error::Error for Abort {}

/// Return type of engine entry points and of the aborting stubs.
pub type Fallible<T> = std::result::Result<T, Abort>;

/// Failure reported by a host on input `seek` or `close`.
#[derive(Error, Debug)]
pub enum HostError {
    /// An ordinary failure the engine may handle
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Host state is no longer trustworthy; the run must stop
    #[error("internal error: {0}")]
    Internal(String),
}

impl HostError {
    pub fn internal(message: impl Into<String>) -> Self {
        HostError::Internal(message.into())
    }

    pub fn is_severe(&self) -> bool {
        matches!(self, HostError::Internal(_))
    }
}

/// Errors surfaced by engine drivers and host setup.
#[derive(Error, Debug)]
pub enum BridgeError {
    /// The engine run ended with its fatal sentinel
    #[error("{engine} failed: {message}")]
    EngineFatal { engine: EngineKind, message: String },

    /// The engine returned a status outside its documented set
    #[error("internal error: unexpected {engine} status value {code}")]
    UnexpectedStatus { engine: EngineKind, code: i32 },

    /// An argument was rejected before the engine ran
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Host configuration could not be loaded
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    pub fn fatal(engine: EngineKind, message: impl Into<String>) -> Self {
        BridgeError::EngineFatal {
            engine,
            message: message.into(),
        }
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        BridgeError::InvalidArgument(message.into())
    }

    pub fn config(message: impl Into<String>) -> Self {
        BridgeError::Config(message.into())
    }

    /// The engine named by the error, if it came from an engine run.
    pub fn engine(&self) -> Option<EngineKind> {
        match self {
            BridgeError::EngineFatal { engine, .. } | BridgeError::UnexpectedStatus { engine, .. } => {
                Some(*engine)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_error_severity() {
        let ordinary = HostError::from(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        assert!(!ordinary.is_severe());
        assert!(HostError::internal("state corrupted").is_severe());
    }

    #[test]
    fn test_bridge_error_display() {
        let err = BridgeError::fatal(EngineKind::Bibtex, "bad aux file");
        insta::assert_snapshot!(err.to_string(), @"BibTeX failed: bad aux file");
        assert_eq!(err.engine(), Some(EngineKind::Bibtex));

        let err = BridgeError::UnexpectedStatus {
            engine: EngineKind::Tex,
            code: 7,
        };
        insta::assert_snapshot!(err.to_string(), @"internal error: unexpected TeX status value 7");
    }

    #[test]
    fn test_abort_carries_message() {
        let abort = Abort::from(BoundedMessage::render(format_args!("cannot load {}", "plain.fmt")));
        assert_eq!(abort.message(), "cannot load plain.fmt");
        assert_eq!(abort.to_string(), "cannot load plain.fmt");
        assert!(!abort.is_truncated());
    }
}
