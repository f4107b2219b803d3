use heapless::Vec;
use log::trace;

use crate::writer::ansi::ESC;

pub const CTRL_C: u8 = 0x03;
pub const CTRL_S: u8 = 0x13;
pub const RETURN: u8 = 0x0D;
pub const BACKSPACE: u8 = 0x08;
pub const DEL: u8 = 0x7F;
pub const PRINTABLE: core::ops::RangeInclusive<u8> = 0x20..=0x7E;

/// Lead byte of PC console scan codes
pub const SCAN_CODE_LEAD: u8 = 0xE0;

/// How the transport delivers arrow keys and friends.
///
/// Chosen once per session; the decoder never guesses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EscapeScheme {
    /// `ESC [` followed by a code byte, as sent by ANSI/VT terminals
    #[default]
    Ansi,
    /// `0xE0` followed directly by a scan code, as returned by `getch`
    ScanCode,
}

/// Key codes for special keys
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCode {
    Char(u8),
    Enter,
    Backspace,
    Delete,
    Insert,
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    Interrupt,
    DumpHistory,
    Unknown(u8),
}

/// State machine for parsing escape sequences
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EscapeState {
    Normal,
    Prefix,
    Code,
    Tilde(KeyCode),
}

/// Turns raw bytes into [`KeyCode`]s one byte at a time
#[derive(Debug, Clone)]
pub struct KeyDecoder {
    scheme: EscapeScheme,
    state: EscapeState,
}

impl KeyDecoder {
    pub fn new(scheme: EscapeScheme) -> Self {
        Self {
            scheme,
            state: EscapeState::Normal,
        }
    }

    /// Forget any half-read sequence
    pub fn reset(&mut self) {
        self.state = EscapeState::Normal;
    }

    /// Whether the decoder is in the middle of an escape sequence
    pub fn is_pending(&self) -> bool {
        self.state != EscapeState::Normal
    }

    /// Feed one byte. `None` means the byte was swallowed by a sequence.
    pub fn feed(&mut self, byte: u8) -> Option<KeyCode> {
        let key = match self.state {
            EscapeState::Normal => self.normal(byte),
            EscapeState::Prefix => {
                // anything other than '[' abandons the sequence
                self.state = if byte == b'[' {
                    EscapeState::Code
                } else {
                    EscapeState::Normal
                };
                None
            }
            EscapeState::Code => {
                self.state = EscapeState::Normal;
                match self.scheme {
                    EscapeScheme::Ansi => self.ansi_code(byte),
                    EscapeScheme::ScanCode => scan_code(byte),
                }
            }
            EscapeState::Tilde(key) => {
                self.state = EscapeState::Normal;
                (byte == b'~').then_some(key)
            }
        };
        if let Some(key) = key {
            trace!("key {:?}", key);
        }
        key
    }

    fn normal(&mut self, byte: u8) -> Option<KeyCode> {
        match (self.scheme, byte) {
            (EscapeScheme::Ansi, ESC) => {
                self.state = EscapeState::Prefix;
                None
            }
            (EscapeScheme::ScanCode, SCAN_CODE_LEAD) => {
                self.state = EscapeState::Code;
                None
            }
            (_, RETURN) => Some(KeyCode::Enter),
            (_, BACKSPACE | DEL) => Some(KeyCode::Backspace),
            (_, CTRL_C) => Some(KeyCode::Interrupt),
            (_, CTRL_S) => Some(KeyCode::DumpHistory),
            (_, byte) if PRINTABLE.contains(&byte) => Some(KeyCode::Char(byte)),
            (_, byte) => Some(KeyCode::Unknown(byte)),
        }
    }

    fn ansi_code(&mut self, byte: u8) -> Option<KeyCode> {
        match byte {
            b'A' => Some(KeyCode::ArrowUp),
            b'B' => Some(KeyCode::ArrowDown),
            b'C' => Some(KeyCode::ArrowRight),
            b'D' => Some(KeyCode::ArrowLeft),
            b'O' => Some(KeyCode::Insert),
            b'P' => Some(KeyCode::Delete),
            // VT style ESC[2~ and ESC[3~
            b'2' => {
                self.state = EscapeState::Tilde(KeyCode::Insert);
                None
            }
            b'3' => {
                self.state = EscapeState::Tilde(KeyCode::Delete);
                None
            }
            _ => None,
        }
    }
}

fn scan_code(byte: u8) -> Option<KeyCode> {
    match byte {
        b'H' => Some(KeyCode::ArrowUp),
        b'P' => Some(KeyCode::ArrowDown),
        b'M' => Some(KeyCode::ArrowRight),
        b'K' => Some(KeyCode::ArrowLeft),
        b'R' => Some(KeyCode::Insert),
        b'S' => Some(KeyCode::Delete),
        _ => None,
    }
}

/// Editing mode for printable characters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditorMode {
    /// Typed characters splice in and push the tail right
    Insert,
    /// Typed characters replace the one under the cursor
    #[default]
    Overwrite,
}

impl EditorMode {
    pub fn toggled(self) -> Self {
        match self {
            EditorMode::Insert => EditorMode::Overwrite,
            EditorMode::Overwrite => EditorMode::Insert,
        }
    }
}

/// The line being typed.
///
/// Holds at most `LINE - 1` bytes; the last byte of capacity is kept free the
/// way a terminated C buffer would be. `cursor <= len()` always.
#[derive(Debug, Clone, Default)]
pub struct WorkingLine<const LINE: usize> {
    buffer: Vec<u8, LINE>,
    cursor: usize,
}

impl<const LINE: usize> WorkingLine<LINE> {
    pub fn new() -> Self {
        Self {
            buffer: Vec::new(),
            cursor: 0,
        }
    }

    /// Longest line that can be held
    pub const fn max_len() -> usize {
        LINE.saturating_sub(1)
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.buffer.len() >= Self::max_len()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn at_end(&self) -> bool {
        self.cursor == self.buffer.len()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    /// Only printable ASCII ever gets in, so this is always valid
    pub fn as_str(&self) -> &str {
        core::str::from_utf8(&self.buffer).unwrap_or("")
    }

    /// Bytes from the cursor to the end
    pub fn tail(&self) -> &[u8] {
        &self.buffer[self.cursor..]
    }

    /// Byte under the cursor, or a blank past the end
    pub fn under_cursor(&self) -> u8 {
        self.buffer.get(self.cursor).copied().unwrap_or(b' ')
    }

    /// Add a byte at the end
    pub fn append(&mut self, byte: u8) -> bool {
        if self.is_full() || self.buffer.push(byte).is_err() {
            return false;
        }
        self.cursor = self.buffer.len();
        true
    }

    /// Splice a byte in at the cursor
    pub fn insert(&mut self, byte: u8) -> bool {
        if self.is_full() || self.buffer.insert(self.cursor, byte).is_err() {
            return false;
        }
        self.cursor += 1;
        true
    }

    /// Replace the byte at the cursor, or append at the end
    pub fn overwrite(&mut self, byte: u8) -> bool {
        match self.buffer.get_mut(self.cursor) {
            Some(slot) => {
                *slot = byte;
                self.cursor += 1;
                true
            }
            None => self.append(byte),
        }
    }

    /// Remove the byte before the cursor
    pub fn backspace(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        self.buffer.remove(self.cursor);
        true
    }

    /// Remove the byte at the cursor
    pub fn delete(&mut self) -> bool {
        if self.at_end() {
            return false;
        }
        self.buffer.remove(self.cursor);
        true
    }

    pub fn move_left(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        true
    }

    pub fn move_right(&mut self) -> bool {
        if self.at_end() {
            return false;
        }
        self.cursor += 1;
        true
    }

    /// Replace the whole line, cursor at the end. Excess bytes are cut off.
    pub fn set(&mut self, content: &str) {
        self.buffer.clear();
        let take = content.len().min(Self::max_len());
        // take fits by construction
        let _ = self.buffer.extend_from_slice(&content.as_bytes()[..take]);
        self.cursor = self.buffer.len();
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
        self.cursor = 0;
    }
}
