use core::fmt;

use heapless::Vec;
use log::debug;

use crate::commands::Context;
use crate::error::Error;

/// Hard ceiling on the number of command lists a registry can hold
pub const MAX_COMMAND_LISTS: usize = 32;

/// Command handler status. Zero is success, anything else is an
/// application-defined error code.
pub type Status = i32;

/// Status returned by handlers that succeeded
pub const STATUS_OK: Status = 0;

/// Command handler. `args[0]` is the command name itself.
pub type CommandFn = fn(&mut Context<'_, '_>, &[&str]) -> Status;

/// A named command with its usage line, help text and handler
#[derive(Clone, Copy)]
pub struct CommandEntry {
    pub name: &'static str,
    pub usage: &'static str,
    pub help: &'static str,
    pub handler: CommandFn,
}

impl CommandEntry {
    pub const fn new(
        name: &'static str,
        usage: &'static str,
        help: &'static str,
        handler: CommandFn,
    ) -> Self {
        Self {
            name,
            usage,
            help,
            handler,
        }
    }
}

impl fmt::Debug for CommandEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandEntry")
            .field("name", &self.name)
            .field("usage", &self.usage)
            .finish_non_exhaustive()
    }
}

/// A group of commands registered as a unit
#[derive(Debug, Clone, Copy)]
pub struct CommandList<'r> {
    pub name: Option<&'static str>,
    pub commands: &'r [CommandEntry],
}

/// Borrowing registry of command lists.
///
/// The registry only holds references: a registered table must outlive it and
/// stays untouched for as long as the registry exists. Lists are never removed
/// one by one, only all at once with [`Registry::clear`].
pub struct Registry<'r> {
    lists: Vec<CommandList<'r>, MAX_COMMAND_LISTS>,
    capacity: usize,
}

impl<'r> Registry<'r> {
    /// Create an empty registry holding at most `capacity` lists
    pub fn new(capacity: usize) -> Self {
        Self {
            lists: Vec::new(),
            capacity: capacity.clamp(1, MAX_COMMAND_LISTS),
        }
    }

    /// Register an anonymous list of commands
    pub fn register(&mut self, commands: &'r [CommandEntry]) -> Result<(), Error> {
        self.register_list(CommandList {
            name: None,
            commands,
        })
    }

    /// Register a list of commands under a name
    pub fn register_named(
        &mut self,
        name: &'static str,
        commands: &'r [CommandEntry],
    ) -> Result<(), Error> {
        self.register_list(CommandList {
            name: Some(name),
            commands,
        })
    }

    fn register_list(&mut self, list: CommandList<'r>) -> Result<(), Error> {
        if self.lists.len() >= self.capacity {
            return Err(Error::NoCapacity);
        }
        self.lists.push(list).map_err(|_| Error::NoCapacity)?;
        debug!(
            "registered {} command(s) in slot {}",
            list.commands.len(),
            self.lists.len() - 1
        );
        Ok(())
    }

    /// Find the first command called exactly `name`, in registration order
    pub fn lookup(&self, name: &str) -> Option<&'r CommandEntry> {
        self.iter().find(|entry| entry.name == name)
    }

    /// All commands, list by list in registration order
    pub fn iter(&self) -> impl Iterator<Item = &'r CommandEntry> + '_ {
        self.lists.iter().flat_map(|list| list.commands.iter())
    }

    /// Registered lists in registration order
    pub fn lists(&self) -> impl Iterator<Item = &CommandList<'r>> {
        self.lists.iter()
    }

    /// Number of registered lists
    pub fn len(&self) -> usize {
        self.lists.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lists.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drop every registered list
    pub fn clear(&mut self) {
        self.lists.clear();
    }
}
