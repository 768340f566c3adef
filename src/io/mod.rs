//! Host-side devices the machine talks to.
//!
//! The core never touches the terminal directly. Keyboard input and console
//! output are injected through the [`Keyboard`] and [`Console`] traits:
//! - [`stdio`]: plain byte streams over stdin/stdout
//! - [`terminal`]: raw-mode terminal via crossterm (feature `terminal`)
//! - in-memory implementations for tests and embedding hosts

pub mod stdio;
#[cfg(feature = "terminal")]
pub mod terminal;

use std::cell::RefCell;
use std::collections::VecDeque;
use std::io;
use std::rc::Rc;

pub use stdio::{StdinKeyboard, StdoutConsole};
#[cfg(feature = "terminal")]
pub use terminal::{TerminalConsole, TerminalKeyboard};

/// A single keyboard event delivered to the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEvent {
    /// A key code, as stored in R0 or the keyboard data register.
    Key(u16),
    /// The operator asked to stop the machine (Esc, Ctrl-C).
    Interrupt,
}

/// Keyboard capability.
pub trait Keyboard {
    /// Return a key if one is available right now, without blocking.
    fn poll(&mut self) -> io::Result<Option<KeyEvent>>;

    /// Block until the next key event.
    fn read(&mut self) -> io::Result<KeyEvent>;
}

/// Console capability: a character sink.
pub trait Console {
    /// Append one character.
    fn write_char(&mut self, byte: u8) -> io::Result<()>;

    /// Make everything written so far visible.
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }

    /// Append a sequence of characters.
    fn write_str(&mut self, text: &str) -> io::Result<()> {
        for byte in text.bytes() {
            self.write_char(byte)?;
        }
        Ok(())
    }
}

/// A keyboard with no keys. Polls report nothing; blocking reads fail.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullKeyboard;

impl Keyboard for NullKeyboard {
    fn poll(&mut self) -> io::Result<Option<KeyEvent>> {
        Ok(None)
    }

    fn read(&mut self) -> io::Result<KeyEvent> {
        Err(io::Error::new(io::ErrorKind::UnexpectedEof, "no keyboard attached"))
    }
}

/// A keyboard that replays a fixed queue of events.
///
/// Once the queue is drained, polls return `None` and blocking reads fail
/// with `UnexpectedEof`.
#[derive(Debug, Clone, Default)]
pub struct ScriptedKeyboard {
    events: VecDeque<KeyEvent>,
}

impl ScriptedKeyboard {
    /// Create an empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Script that types the given text, one key per byte.
    pub fn from_text(text: &str) -> Self {
        Self {
            events: text.bytes().map(|b| KeyEvent::Key(b as u16)).collect(),
        }
    }

    /// Append an event.
    pub fn push(&mut self, event: KeyEvent) {
        self.events.push_back(event);
    }

    /// Number of events not yet consumed.
    pub fn remaining(&self) -> usize {
        self.events.len()
    }
}

impl Keyboard for ScriptedKeyboard {
    fn poll(&mut self) -> io::Result<Option<KeyEvent>> {
        Ok(self.events.pop_front())
    }

    fn read(&mut self) -> io::Result<KeyEvent> {
        self.events
            .pop_front()
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "keyboard script exhausted"))
    }
}

/// A console that discards everything written to it.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullConsole;

impl Console for NullConsole {
    fn write_char(&mut self, _byte: u8) -> io::Result<()> {
        Ok(())
    }
}

/// An in-memory console.
///
/// Clones share the same buffer, so a host can keep one handle and give
/// another to the machine.
#[derive(Debug, Clone, Default)]
pub struct BufferConsole {
    buffer: Rc<RefCell<Vec<u8>>>,
}

impl BufferConsole {
    /// Create an empty console.
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw bytes written so far.
    pub fn bytes(&self) -> Vec<u8> {
        self.buffer.borrow().clone()
    }

    /// Output so far, lossily decoded as UTF-8.
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buffer.borrow()).into_owned()
    }

    /// Discard buffered output.
    pub fn clear(&self) {
        self.buffer.borrow_mut().clear();
    }
}

impl Console for BufferConsole {
    fn write_char(&mut self, byte: u8) -> io::Result<()> {
        self.buffer.borrow_mut().push(byte);
        Ok(())
    }
}
