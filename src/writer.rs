use core::fmt;

use heapless::Vec;

/// Byte sink the engine renders into. This is the write half of the transport.
pub trait Output {
    /// Emit one byte to the terminal
    fn write_byte(&mut self, byte: u8);
}

impl<O: Output + ?Sized> Output for &mut O {
    fn write_byte(&mut self, byte: u8) {
        (**self).write_byte(byte)
    }
}

/// Collects output in a fixed buffer. Bytes past capacity are dropped.
impl<const N: usize> Output for Vec<u8, N> {
    fn write_byte(&mut self, byte: u8) {
        let _ = self.push(byte);
    }
}

/// Adapts a plain `fn(u8)` write capability, as installed with
/// [`Terminal::set_transport`](crate::Terminal::set_transport).
#[derive(Clone, Copy)]
pub struct FnOutput(pub fn(u8));

impl Output for FnOutput {
    fn write_byte(&mut self, byte: u8) {
        (self.0)(byte)
    }
}

/// Formatted terminal output as seen by command handlers.
///
/// Object safe so handlers do not carry the session's buffer sizes around.
pub trait Console {
    /// Emit a single raw byte
    fn put(&mut self, byte: u8);

    /// Render `args` and emit it, returning the number of bytes produced
    fn print(&mut self, args: fmt::Arguments<'_>) -> usize;

    /// Whether error messages get wrapped in the alert color
    fn colored(&self) -> bool;

    /// Like [`Console::print`] but bracketed by the alert and default colors
    fn print_err(&mut self, args: fmt::Arguments<'_>) -> usize {
        if !self.colored() {
            return self.print(args);
        }
        self.print(format_args!("{}", colors::ALERT));
        let produced = self.print(args);
        self.print(format_args!("{}", colors::DEFAULT));
        produced
    }
}

/// Scratch buffer that silently truncates, keeping one byte for the terminator.
struct Bounded<const N: usize> {
    bytes: Vec<u8, N>,
}

impl<const N: usize> Bounded<N> {
    fn new() -> Self {
        Self { bytes: Vec::new() }
    }

    fn limit() -> usize {
        N.saturating_sub(1)
    }
}

impl<const N: usize> fmt::Write for Bounded<N> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let room = Self::limit().saturating_sub(self.bytes.len());
        let take = room.min(s.len());
        // capacity was checked above
        let _ = self.bytes.extend_from_slice(&s.as_bytes()[..take]);
        Ok(())
    }
}

/// Bounded formatter over an [`Output`].
///
/// Every `print` renders into an `N` byte scratch buffer first; text that does not
/// fit in `N - 1` bytes is cut off. The rendered bytes are then emitted in order.
pub struct Printer<'o, const N: usize> {
    out: &'o mut dyn Output,
    color: bool,
}

impl<'o, const N: usize> Printer<'o, N> {
    /// Create a printer writing to `out`
    pub fn new(out: &'o mut dyn Output, color: bool) -> Self {
        Self { out, color }
    }

    /// Write a string through the bounded buffer
    pub fn print_str(&mut self, s: &str) -> usize {
        self.print(format_args!("{}", s))
    }

    /// Move the terminal cursor left `n` columns
    pub fn cursor_left(&mut self, n: usize) {
        for _ in 0..n {
            self.print_str(ansi::CURSOR_LEFT);
        }
    }

    /// Ring the terminal bell
    pub fn bell(&mut self) {
        self.out.write_byte(ansi::BELL);
    }
}

impl<const N: usize> Console for Printer<'_, N> {
    fn put(&mut self, byte: u8) {
        self.out.write_byte(byte);
    }

    fn print(&mut self, args: fmt::Arguments<'_>) -> usize {
        let mut buf = Bounded::<N>::new();
        // Bounded never reports an error; a failing Display impl just truncates
        let _ = fmt::write(&mut buf, args);
        for &byte in buf.bytes.iter() {
            self.out.write_byte(byte);
        }
        buf.bytes.len()
    }

    fn colored(&self) -> bool {
        self.color
    }
}

/// Terminal control sequences
pub mod ansi {
    pub const ESC: u8 = 0x1B;
    pub const BELL: u8 = 0x07;
    pub const CURSOR_LEFT: &str = "\x1b[D";
    pub const CLEAR_SCREEN: &str = "\x1b[1;1H\x1b[2J";
    pub const DELETE_LINE: &str = "\x1b[M";
    pub const REVERSE: &str = "\x1b[7m";
}

/// ANSI color sequences
pub mod colors {
    pub const RED: &str = "\x1b[0;31m";
    pub const GREEN: &str = "\x1b[0;32m";
    pub const YELLOW: &str = "\x1b[0;33m";
    pub const BLUE: &str = "\x1b[0;34m";
    pub const MAGENTA: &str = "\x1b[0;35m";
    pub const CYAN: &str = "\x1b[0;36m";
    pub const WHITE: &str = "\x1b[0;37m";

    /// Color restored after highlighted or alert text
    pub const DEFAULT: &str = WHITE;
    /// Color used for error messages
    pub const ALERT: &str = RED;
}
