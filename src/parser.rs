use heapless::Vec;

/// Hard ceiling on argument tokens per command line, command name included
pub const MAX_ARGS: usize = 16;

/// A command line split into its tokens, borrowing from the line
#[derive(Debug, Clone)]
pub struct ParsedCommand<'l> {
    args: Vec<&'l str, MAX_ARGS>,
}

impl<'l> ParsedCommand<'l> {
    /// Get the command name
    pub fn name(&self) -> &'l str {
        self.args.first().copied().unwrap_or("")
    }

    /// Get the number of arguments, not counting the command name
    pub fn arg_count(&self) -> usize {
        self.args.len().saturating_sub(1)
    }

    /// Get an argument by index, not counting the command name
    pub fn arg(&self, index: usize) -> Option<&'l str> {
        self.args.get(index + 1).copied()
    }

    /// All tokens, starting with the command name
    pub fn tokens(&self) -> &[&'l str] {
        &self.args
    }
}

/// Command parser for splitting input into command and arguments
pub struct CommandParser;

impl CommandParser {
    /// Split a committed line on single spaces.
    ///
    /// One trailing run of spaces is dropped first. Consecutive spaces produce
    /// empty tokens. Once `max_args` tokens exist the rest of the line stays
    /// attached to the last one, spaces and all.
    pub fn parse(line: &str, max_args: usize) -> ParsedCommand<'_> {
        let limit = max_args.clamp(1, MAX_ARGS);
        let mut rest = line.trim_end_matches(' ');
        let mut args = Vec::new();

        loop {
            if args.len() + 1 == limit {
                let _ = args.push(rest);
                break;
            }
            match rest.find(' ') {
                Some(pos) => {
                    let _ = args.push(&rest[..pos]);
                    rest = &rest[pos + 1..];
                }
                None => {
                    let _ = args.push(rest);
                    break;
                }
            }
        }

        ParsedCommand { args }
    }
}
