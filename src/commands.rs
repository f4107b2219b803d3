//! Handler context and the built-in `help`, `history` and `cls` commands.

use core::fmt;

use crate::history::HistoryView;
use crate::registry::{CommandEntry, Registry, Status, STATUS_OK};
use crate::writer::{ansi, Console};

/// Status `help` returns when asked about a command that does not exist
pub const STATUS_UNKNOWN_COMMAND: Status = 1;

/// What a command handler gets to work with
pub struct Context<'a, 'r> {
    console: &'a mut dyn Console,
    registry: &'a Registry<'r>,
    history: &'a dyn HistoryView,
    newline: &'static str,
    screen_cleared: bool,
}

impl<'a, 'r> Context<'a, 'r> {
    pub fn new(
        console: &'a mut dyn Console,
        registry: &'a Registry<'r>,
        history: &'a dyn HistoryView,
        newline: &'static str,
    ) -> Self {
        Self {
            console,
            registry,
            history,
            newline,
            screen_cleared: false,
        }
    }

    /// Formatted output to the terminal
    pub fn print(&mut self, args: fmt::Arguments<'_>) -> usize {
        self.console.print(args)
    }

    /// Formatted output in the alert color
    pub fn print_err(&mut self, args: fmt::Arguments<'_>) -> usize {
        self.console.print_err(args)
    }

    /// Line terminator configured for this session
    pub fn newline(&self) -> &'static str {
        self.newline
    }

    pub fn registry(&self) -> &Registry<'r> {
        self.registry
    }

    pub fn history(&self) -> &dyn HistoryView {
        self.history
    }

    /// Suppress the blank line before the next prompt
    pub fn mark_screen_cleared(&mut self) {
        self.screen_cleared = true;
    }

    pub fn screen_cleared(&self) -> bool {
        self.screen_cleared
    }
}

/// Commands every session starts with
pub static BUILTIN_COMMANDS: [CommandEntry; 3] = [
    CommandEntry::new(
        "help",
        "<command>",
        "Run help without <command> to see available commands\r\n    Use <command> to get detailed help on a specific command",
        help,
    ),
    CommandEntry::new("history", "", "Show command history", history),
    CommandEntry::new("cls", "", "Clear screen", clear_screen),
];

fn help(ctx: &mut Context<'_, '_>, args: &[&str]) -> Status {
    let nl = ctx.newline;
    let Some(&wanted) = args.get(1) else {
        ctx.print(format_args!(
            "{nl}Command\t\tUsage{nl}==================================={nl}"
        ));
        let registry = ctx.registry;
        for entry in registry.iter() {
            ctx.print(format_args!(
                "{}\t\t{} {}{nl}",
                entry.name, entry.name, entry.usage
            ));
        }
        return STATUS_OK;
    };

    match ctx.registry.lookup(wanted) {
        Some(entry) => {
            ctx.print(format_args!(
                "{nl}{} {}{nl}    {}{nl}",
                entry.name, entry.usage, entry.help
            ));
            STATUS_OK
        }
        None => {
            ctx.print_err(format_args!("Could not find \"{}\"{nl}", wanted));
            STATUS_UNKNOWN_COMMAND
        }
    }
}

fn history(ctx: &mut Context<'_, '_>, _args: &[&str]) -> Status {
    let nl = ctx.newline;
    let mut number = 1;
    let Context {
        console, history, ..
    } = ctx;
    history.visit_recent(&mut |line: &str| {
        console.print(format_args!("\t{} {}{nl}", number, line));
        number += 1;
    });
    STATUS_OK
}

fn clear_screen(ctx: &mut Context<'_, '_>, _args: &[&str]) -> Status {
    ctx.print(format_args!("{}", ansi::CLEAR_SCREEN));
    ctx.mark_screen_cleared();
    STATUS_OK
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::{HistoryConfig, HistoryRing};
    use crate::writer::Printer;
    use heapless::Vec;

    fn greet(ctx: &mut Context<'_, '_>, _args: &[&str]) -> Status {
        ctx.print(format_args!("hi"));
        STATUS_OK
    }

    static APP: [CommandEntry; 1] = [CommandEntry::new("greet", "[name]", "Say hello", greet)];

    fn run(args: &[&str], history: &HistoryRing<32>) -> (Status, bool, std::string::String) {
        let mut registry = Registry::new(4);
        registry.register(&BUILTIN_COMMANDS).unwrap();
        registry.register(&APP).unwrap();

        let mut out = Vec::<u8, 1024>::new();
        let mut printer = Printer::<'_, 64>::new(&mut out, false);
        let mut ctx = Context::new(&mut printer, &registry, history, "\r\n");
        let entry = registry.lookup(args[0]).unwrap();
        let status = (entry.handler)(&mut ctx, args);
        let cleared = ctx.screen_cleared();
        drop(ctx);
        drop(printer);
        (status, cleared, std::string::String::from_utf8(out.to_vec()).unwrap())
    }

    #[test]
    fn test_help_lists_every_command() {
        let history = HistoryRing::new(HistoryConfig::default());
        let (status, _, text) = run(&["help"], &history);
        assert_eq!(status, STATUS_OK);
        assert!(text.starts_with("\r\nCommand\t\tUsage\r\n"));
        assert!(text.contains("help\t\thelp <command>\r\n"));
        assert!(text.contains("cls\t\tcls \r\n"));
        assert!(text.ends_with("greet\t\tgreet [name]\r\n"));
    }

    #[test]
    fn test_help_for_one_command() {
        let history = HistoryRing::new(HistoryConfig::default());
        let (status, _, text) = run(&["help", "greet"], &history);
        assert_eq!(status, STATUS_OK);
        assert_eq!(text, "\r\ngreet [name]\r\n    Say hello\r\n");
    }

    #[test]
    fn test_help_for_missing_command() {
        let history = HistoryRing::new(HistoryConfig::default());
        let (status, _, text) = run(&["help", "nope"], &history);
        assert_eq!(status, STATUS_UNKNOWN_COMMAND);
        assert_eq!(text, "Could not find \"nope\"\r\n");
    }

    #[test]
    fn test_history_numbers_from_one() {
        let mut history = HistoryRing::new(HistoryConfig::default());
        history.commit("first");
        history.commit("second");
        let (status, _, text) = run(&["history"], &history);
        assert_eq!(status, STATUS_OK);
        assert_eq!(text, "\t1 first\r\n\t2 second\r\n");
    }

    #[test]
    fn test_cls_marks_screen_cleared() {
        let history = HistoryRing::new(HistoryConfig::default());
        let (_, cleared, text) = run(&["cls"], &history);
        assert!(cleared);
        assert_eq!(text, "\x1b[1;1H\x1b[2J");
    }
}
