#![no_std]
#![doc = include_str!("../README.md")]

//! A command line engine for character terminals on `no_std` targets.
//!
//! This crate provides in-place line editing, a circular command history and a
//! registry of command lists with dispatch, driven one input byte at a time.

#[cfg(test)]
extern crate std;

pub mod commands;
pub mod editor;
pub mod error;
pub mod history;
pub mod parser;
pub mod registry;
pub mod terminal;
pub mod writer;

pub use commands::Context;
pub use editor::{EditorMode, EscapeScheme, KeyCode, KeyDecoder, WorkingLine};
pub use error::Error;
pub use history::{HistoryConfig, HistoryRing};
pub use parser::{CommandParser, ParsedCommand};
pub use registry::{CommandEntry, CommandFn, CommandList, Registry, Status, STATUS_OK};
pub use terminal::{Event, Terminal, TerminalConfig};
pub use writer::{Console, Output, Printer};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::commands::Context;
    pub use crate::registry::{CommandEntry, Status, STATUS_OK};
    pub use crate::terminal::{Event, Terminal, TerminalConfig};
    pub use crate::writer::{Console, Output};
}
