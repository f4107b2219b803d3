use thiserror::Error;

use crate::registry::Status;

/// Errors reported by the command line engine.
///
/// Only [`Error::MisconfiguredTransport`], [`Error::NoInterruptHandler`] and
/// [`Error::Transport`] end a session. Everything else is reported to the user and
/// editing continues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Error {
    /// Every command list slot is taken
    #[error("command registry is full")]
    NoCapacity,
    /// No registered command matches the requested name
    #[error("unknown command")]
    UnknownCommand,
    /// The byte read or byte write capability is missing
    #[error("transport read/write capability is not installed")]
    MisconfiguredTransport,
    /// An interrupt arrived but nobody is listening for it
    #[error("no interrupt handler is installed")]
    NoInterruptHandler,
    /// History recall cannot go further back
    #[error("already at the oldest history entry")]
    AtOldestBoundary,
    /// History recall cannot go further forward
    #[error("already at the newest history entry")]
    AtNewestBoundary,
    /// A command handler returned a non-zero status
    #[error("command returned error code {0}")]
    HandlerError(Status),
    /// The async transport failed or reached end of stream
    #[error("transport I/O error")]
    Transport,
}

impl Error {
    /// Whether the session can keep editing after this error.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::MisconfiguredTransport | Error::NoInterruptHandler | Error::Transport)
    }
}
