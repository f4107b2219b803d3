use embassy_futures::block_on;
use embassy_futures::select::{select, Either};
use embassy_sync::{blocking_mutex::raw::RawMutex, signal::Signal};
use embedded_io_async::{Read, Write as AsyncWrite};
use heapless::{String, Vec};
use log::{debug, error, warn};

use crate::commands::{Context, BUILTIN_COMMANDS};
use crate::editor::{EditorMode, EscapeScheme, KeyCode, KeyDecoder, WorkingLine};
use crate::error::Error;
use crate::history::{HistoryConfig, HistoryRing};
use crate::parser::CommandParser;
use crate::registry::{CommandEntry, Registry, MAX_COMMAND_LISTS, STATUS_OK};
use crate::writer::{ansi, colors, Console, FnOutput, Output, Printer};

/// Blocking byte read capability. `None` means nothing arrived; the loop retries.
pub type ReadFn = fn() -> Option<u8>;

/// Blocking byte write capability
pub type WriteFn = fn(u8);

/// Output bytes one async step stages before a chunk is pushed to the writer
const STAGING_CAPACITY: usize = 1024;

/// Configuration for the terminal
#[derive(Clone, Copy, Debug)]
pub struct TerminalConfig {
    /// Prompt string, printed followed by a space
    pub prompt: &'static str,
    /// Line terminator for everything the engine prints
    pub newline: &'static str,
    /// Printed once when a session begins, if not empty
    pub banner: &'static str,
    /// Most tokens a command line is split into, command name included
    pub max_args: usize,
    /// Most command lists the registry accepts
    pub max_lists: usize,
    /// History depth and deduplication
    pub history: HistoryConfig,
    /// How arrow and editing keys arrive on the wire
    pub escape: EscapeScheme,
    /// Whether the insert key switches to splicing mode
    pub insert_mode: bool,
    /// Wrap error messages in the alert color
    pub color: bool,
    /// Print the hex code of every byte instead of editing
    pub show_codes: bool,
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            prompt: "\x1b[0;37m>",
            newline: "\r\n",
            banner: "",
            max_args: 10,
            max_lists: MAX_COMMAND_LISTS,
            history: HistoryConfig::default(),
            escape: EscapeScheme::Ansi,
            insert_mode: true,
            color: true,
            show_codes: false,
        }
    }
}

/// What a single input byte amounted to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// Nothing the host needs to know about
    Idle,
    /// Unrecognized input; the bell was rung
    Bell,
    /// The interrupt key was pressed
    Interrupt,
    /// History recall hit an end; the bell was rung
    HistoryBoundary(Error),
    /// A line was committed and dispatched
    Executed(Result<(), Error>),
}

/// One command line session: registry, history and the line being edited.
///
/// The core is [`Terminal::step`], a synchronous state machine fed one byte at a
/// time. [`Terminal::run`] and [`Terminal::run_async`] are the blocking and async
/// loops around it.
pub struct Terminal<'r, const LINE: usize> {
    config: TerminalConfig,
    registry: Registry<'r>,
    history: HistoryRing<LINE>,
    line: WorkingLine<LINE>,
    decoder: KeyDecoder,
    mode: EditorMode,
    screen_cleared: bool,
    read: Option<ReadFn>,
    write: Option<WriteFn>,
    interrupt: Option<&'r mut dyn FnMut()>,
}

impl<'r, const LINE: usize> Terminal<'r, LINE> {
    /// Create a terminal with only the built-in commands registered
    pub fn new(config: TerminalConfig) -> Self {
        let mut terminal = Self {
            config,
            registry: Registry::new(config.max_lists),
            history: HistoryRing::new(config.history),
            line: WorkingLine::new(),
            decoder: KeyDecoder::new(config.escape),
            mode: EditorMode::Overwrite,
            screen_cleared: false,
            read: None,
            write: None,
            interrupt: None,
        };
        terminal.init();
        terminal
    }

    /// Full reset: built-in commands only, empty history, fresh line.
    ///
    /// Transport and interrupt handler stay installed.
    pub fn init(&mut self) {
        self.registry.clear();
        if let Err(err) = self.registry.register_named("builtin", &BUILTIN_COMMANDS) {
            error!("could not add built-in commands: {}", err);
        }
        self.history.clear();
        self.line.clear();
        self.decoder.reset();
        self.mode = EditorMode::Overwrite;
        self.screen_cleared = false;
    }

    /// Register an anonymous command list
    pub fn register(&mut self, commands: &'r [CommandEntry]) -> Result<(), Error> {
        self.registry.register(commands)
    }

    /// Register a named command list
    pub fn register_named(
        &mut self,
        name: &'static str,
        commands: &'r [CommandEntry],
    ) -> Result<(), Error> {
        self.registry.register_named(name, commands)
    }

    pub fn config(&self) -> &TerminalConfig {
        &self.config
    }

    pub fn registry(&self) -> &Registry<'r> {
        &self.registry
    }

    pub fn history(&self) -> &HistoryRing<LINE> {
        &self.history
    }

    /// The line currently being edited
    pub fn line(&self) -> &WorkingLine<LINE> {
        &self.line
    }

    pub fn mode(&self) -> EditorMode {
        self.mode
    }

    /// Install the byte read and write capabilities used by [`Terminal::run`].
    ///
    /// Both are required; if either is missing nothing is installed.
    pub fn set_transport(
        &mut self,
        read: Option<ReadFn>,
        write: Option<WriteFn>,
    ) -> Result<(), Error> {
        let (Some(read), Some(write)) = (read, write) else {
            return Err(Error::MisconfiguredTransport);
        };
        self.read = Some(read);
        self.write = Some(write);
        Ok(())
    }

    /// Remove the transport capabilities
    pub fn clear_transport(&mut self) {
        self.read = None;
        self.write = None;
    }

    /// Install (or remove) the callback run on the interrupt key.
    ///
    /// It is expected to reset or end the session; if it returns, editing goes on.
    pub fn set_interrupt_handler(&mut self, handler: Option<&'r mut dyn FnMut()>) {
        self.interrupt = handler;
    }

    /// Start an editing session: fresh line and mode, banner and prompt
    pub fn begin(&mut self, out: &mut dyn Output) {
        self.line.clear();
        self.decoder.reset();
        self.mode = EditorMode::Overwrite;
        self.screen_cleared = false;

        let nl = self.config.newline;
        let mut p = Printer::<'_, LINE>::new(out, self.config.color);
        if !self.config.banner.is_empty() {
            p.print_str(self.config.banner);
            p.print_str(nl);
        }
        p.print(format_args!("{} ", self.config.prompt));
    }

    /// Process one input byte, rendering the result to `out`
    pub fn step(&mut self, byte: u8, out: &mut dyn Output) -> Event {
        let mut p = Printer::<'_, LINE>::new(out, self.config.color);

        if self.config.show_codes {
            p.print(format_args!("0x{:02x}{}", byte, self.config.newline));
            p.bell();
            return Event::Idle;
        }

        let Some(key) = self.decoder.feed(byte) else {
            return Event::Idle;
        };
        let event = self.handle_key(key, &mut p);

        // keep the next character to be replaced or pushed visible
        if self.mode == EditorMode::Insert {
            p.print(format_args!(
                "{}{}{}{}",
                ansi::REVERSE,
                self.line.under_cursor() as char,
                ansi::CURSOR_LEFT,
                colors::DEFAULT
            ));
        }
        event
    }

    fn handle_key(&mut self, key: KeyCode, p: &mut Printer<'_, LINE>) -> Event {
        match key {
            KeyCode::Char(byte) => return self.type_char(byte, p),
            KeyCode::Interrupt => return Event::Interrupt,
            KeyCode::Enter => return self.submit(p),
            KeyCode::ArrowUp => return self.recall(true, p),
            KeyCode::ArrowDown => return self.recall(false, p),
            KeyCode::DumpHistory => self.dump_history(p),
            KeyCode::Backspace => self.backspace(p),
            KeyCode::Delete => self.delete(p),
            KeyCode::Insert => self.toggle_mode(p),
            KeyCode::ArrowRight => {
                if !self.line.at_end() {
                    p.put(self.line.under_cursor());
                    self.line.move_right();
                }
            }
            KeyCode::ArrowLeft => {
                if self.line.cursor() > 0 {
                    if self.mode == EditorMode::Insert {
                        // clear the highlight before stepping off it
                        p.put(self.line.under_cursor());
                        p.cursor_left(1);
                    }
                    self.line.move_left();
                    p.cursor_left(1);
                }
            }
            KeyCode::Unknown(_) => {
                p.bell();
                return Event::Bell;
            }
        }
        Event::Idle
    }

    fn type_char(&mut self, byte: u8, p: &mut Printer<'_, LINE>) -> Event {
        if self.line.is_full() {
            p.bell();
            return Event::Bell;
        }

        if self.line.at_end() {
            self.line.append(byte);
            p.put(byte);
        } else if self.mode == EditorMode::Insert {
            self.line.insert(byte);
            let from = self.line.cursor() - 1;
            for &b in &self.line.as_bytes()[from..] {
                p.put(b);
            }
            p.cursor_left(self.line.tail().len());
        } else {
            self.line.overwrite(byte);
            p.put(byte);
        }
        Event::Idle
    }

    fn backspace(&mut self, p: &mut Printer<'_, LINE>) {
        if self.line.cursor() == 0 {
            return;
        }
        let at_end = self.line.at_end();
        self.line.backspace();
        p.cursor_left(1);
        if at_end {
            p.put(b' ');
            p.cursor_left(1);
        } else {
            self.redraw_tail(p);
        }
    }

    fn delete(&mut self, p: &mut Printer<'_, LINE>) {
        if self.line.delete() {
            self.redraw_tail(p);
        }
    }

    /// Reprint from the cursor to the end, blank the stale last cell, walk back
    fn redraw_tail(&self, p: &mut Printer<'_, LINE>) {
        for &b in self.line.tail() {
            p.put(b);
        }
        p.put(b' ');
        p.cursor_left(self.line.tail().len() + 1);
    }

    fn toggle_mode(&mut self, p: &mut Printer<'_, LINE>) {
        if !self.config.insert_mode {
            self.mode = EditorMode::Overwrite;
            return;
        }
        self.mode = self.mode.toggled();
        if self.mode == EditorMode::Overwrite {
            p.put(self.line.under_cursor());
            p.cursor_left(1);
        }
    }

    fn recall(&mut self, older: bool, p: &mut Printer<'_, LINE>) -> Event {
        let moved = if older {
            if !self.history.is_browsing() {
                self.history.snapshot(self.line.as_str());
            }
            self.history.older().map(|_| ())
        } else {
            self.history.newer().map(|_| ())
        };

        if let Err(err) = moved {
            debug!("history recall stopped: {}", err);
            p.bell();
            return Event::HistoryBoundary(err);
        }

        self.line
            .set(self.history.browse_at(self.history.browse_cursor()));
        p.print(format_args!("{}\r{} ", ansi::DELETE_LINE, self.config.prompt));
        p.print_str(self.line.as_str());
        Event::Idle
    }

    fn dump_history(&self, p: &mut Printer<'_, LINE>) {
        let nl = self.config.newline;
        let browse = self.history.browse_cursor();

        p.print(format_args!("{nl}{nl}{nl}"));
        for (index, line) in self.history.render_all() {
            let marker = if index == browse { self.config.prompt } else { " " };
            p.print(format_args!("{marker}({index}) "));
            p.print_str(line);
            p.print_str(nl);
        }
        p.print(format_args!("{nl}{nl}{} ", self.config.prompt));
        p.print_str(self.line.as_str());
        p.cursor_left(self.line.tail().len());
    }

    fn submit(&mut self, p: &mut Printer<'_, LINE>) -> Event {
        let nl = self.config.newline;
        let mut event = Event::Idle;

        if !self.line.is_empty() {
            p.print_str(nl);
            let mut command = String::<LINE>::new();
            // the working line always leaves room for this copy
            let _ = command.push_str(self.line.as_str());
            self.history.commit(&command);
            event = Event::Executed(self.dispatch(&command, p));
        }

        self.history.reset_position();
        self.line.clear();
        self.mode = EditorMode::Overwrite;
        let lead = if self.screen_cleared { "" } else { nl };
        p.print(format_args!("{lead}{} ", self.config.prompt));
        self.screen_cleared = false;
        event
    }

    fn dispatch(&mut self, line: &str, p: &mut Printer<'_, LINE>) -> Result<(), Error> {
        let nl = self.config.newline;
        let parsed = CommandParser::parse(line, self.config.max_args);

        let Some(entry) = self.registry.lookup(parsed.name()) else {
            warn!("unknown command {:?}", parsed.name());
            p.print_err(format_args!("Could not find \"{}\"{nl}", parsed.name()));
            return Err(Error::UnknownCommand);
        };

        debug!(
            "dispatching {:?} with {} argument(s)",
            entry.name,
            parsed.arg_count()
        );
        let mut ctx = Context::new(p, &self.registry, &self.history, nl);
        let status = (entry.handler)(&mut ctx, parsed.tokens());
        if ctx.screen_cleared() {
            self.screen_cleared = true;
        }

        if status != STATUS_OK {
            warn!("command {:?} failed with {}", entry.name, status);
            p.print_err(format_args!(
                "{nl}Command \"{}\" returned error code: {}{nl}",
                entry.name, status
            ));
            return Err(Error::HandlerError(status));
        }
        Ok(())
    }

    fn raise_interrupt(&mut self) -> Result<(), Error> {
        match self.interrupt.as_mut() {
            Some(handler) => {
                handler();
                Ok(())
            }
            None => {
                error!("interrupt received with no handler installed");
                Err(Error::NoInterruptHandler)
            }
        }
    }

    /// Blocking edit loop over the installed transport. Only returns on a fatal error.
    pub fn run(&mut self) -> Error {
        let (Some(read), Some(write)) = (self.read, self.write) else {
            error!("FATAL: transport read/write capability is not installed");
            let _ = self.raise_interrupt();
            return Error::MisconfiguredTransport;
        };

        let mut out = FnOutput(write);
        self.begin(&mut out);
        loop {
            let Some(byte) = read() else {
                continue;
            };
            if self.step(byte, &mut out) == Event::Interrupt {
                if let Err(err) = self.raise_interrupt() {
                    return err;
                }
            }
        }
    }

    /// Async edit loop.
    ///
    /// Returns `Ok(())` once interrupted, either by the interrupt key or by
    /// `interrupt` being signalled from elsewhere. Read failures and end of
    /// stream end the loop with [`Error::Transport`].
    pub async fn run_async<R, W, M>(
        &mut self,
        reader: &mut R,
        writer: &mut W,
        interrupt: Option<&Signal<M, ()>>,
    ) -> Result<(), Error>
    where
        R: Read,
        W: AsyncWrite,
        M: RawMutex,
    {
        let mut staged = Staging::new(writer);
        self.begin(&mut staged);
        staged.flush().await?;

        let mut byte_buf = [0u8; 1];
        loop {
            let read = match interrupt {
                Some(signal) => match select(reader.read(&mut byte_buf), signal.wait()).await {
                    Either::First(read) => read,
                    Either::Second(()) => {
                        debug!("interrupt signalled");
                        return Ok(());
                    }
                },
                None => reader.read(&mut byte_buf).await,
            };
            match read {
                Ok(0) | Err(_) => return Err(Error::Transport),
                Ok(_) => {}
            }

            let event = self.step(byte_buf[0], &mut staged);
            staged.flush().await?;
            if event == Event::Interrupt {
                return Ok(());
            }
        }
    }
}

/// Output of one step, held until it can be written asynchronously.
///
/// A step that prints more than the buffer holds (a full history dump, a long
/// `help`) pushes each filled chunk out by polling the writer to completion, so
/// every byte reaches the writer in order.
struct Staging<'w, W: AsyncWrite> {
    writer: &'w mut W,
    bytes: Vec<u8, STAGING_CAPACITY>,
    failed: bool,
}

impl<'w, W: AsyncWrite> Staging<'w, W> {
    fn new(writer: &'w mut W) -> Self {
        Self {
            writer,
            bytes: Vec::new(),
            failed: false,
        }
    }

    fn spill(&mut self) {
        if !self.failed && block_on(self.writer.write_all(&self.bytes)).is_err() {
            error!("transport write failed mid-step");
            self.failed = true;
        }
        self.bytes.clear();
    }

    async fn flush(&mut self) -> Result<(), Error> {
        if core::mem::take(&mut self.failed) {
            self.bytes.clear();
            return Err(Error::Transport);
        }
        if self.bytes.is_empty() {
            return Ok(());
        }
        self.writer
            .write_all(&self.bytes)
            .await
            .map_err(|_| Error::Transport)?;
        self.writer.flush().await.map_err(|_| Error::Transport)?;
        self.bytes.clear();
        Ok(())
    }
}

impl<W: AsyncWrite> Output for Staging<'_, W> {
    fn write_byte(&mut self, byte: u8) {
        if self.bytes.is_full() {
            self.spill();
        }
        // a spilled buffer is empty again
        let _ = self.bytes.push(byte);
    }
}
