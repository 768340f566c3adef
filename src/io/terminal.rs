//! Raw-mode terminal devices.
//!
//! While a [`TerminalKeyboard`] is alive the terminal is in raw mode: keys
//! arrive one at a time without line buffering or echo, and the console has
//! to emit `\r\n` for a line break.

use super::{Console, KeyEvent, Keyboard};
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use std::io::{self, Stdout, Write};
use std::time::Duration;

/// Keyboard backed by crossterm key events.
pub struct TerminalKeyboard {
    _private: (),
}

impl TerminalKeyboard {
    /// Switch the terminal to raw mode. Raw mode is left again on drop.
    pub fn new() -> io::Result<Self> {
        enable_raw_mode()?;
        Ok(Self { _private: () })
    }

    fn next_event(&mut self, timeout: Option<Duration>) -> io::Result<Option<KeyEvent>> {
        loop {
            if let Some(timeout) = timeout {
                if !event::poll(timeout)? {
                    return Ok(None);
                }
            }
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                if let Some(mapped) = map_key(key.code, key.modifiers) {
                    return Ok(Some(mapped));
                }
            }
        }
    }
}

impl Drop for TerminalKeyboard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
    }
}

/// Translate a terminal key into a machine key code.
///
/// Keys with no character code (arrows, function keys) are dropped.
fn map_key(code: KeyCode, modifiers: KeyModifiers) -> Option<KeyEvent> {
    match code {
        KeyCode::Esc => Some(KeyEvent::Interrupt),
        KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => Some(KeyEvent::Interrupt),
        KeyCode::Char(c) if (c as u32) < 0x100 => Some(KeyEvent::Key(c as u16)),
        KeyCode::Enter => Some(KeyEvent::Key(0x0A)),
        KeyCode::Tab => Some(KeyEvent::Key(0x09)),
        KeyCode::Backspace => Some(KeyEvent::Key(0x08)),
        _ => None,
    }
}

impl Keyboard for TerminalKeyboard {
    fn poll(&mut self) -> io::Result<Option<KeyEvent>> {
        self.next_event(Some(Duration::ZERO))
    }

    fn read(&mut self) -> io::Result<KeyEvent> {
        loop {
            if let Some(key) = self.next_event(None)? {
                return Ok(key);
            }
        }
    }
}

/// Console for a raw-mode terminal.
pub struct TerminalConsole {
    stdout: Stdout,
}

impl TerminalConsole {
    pub fn new() -> Self {
        Self { stdout: io::stdout() }
    }
}

impl Default for TerminalConsole {
    fn default() -> Self {
        Self::new()
    }
}

impl Console for TerminalConsole {
    fn write_char(&mut self, byte: u8) -> io::Result<()> {
        let mut out = self.stdout.lock();
        if byte == b'\n' {
            out.write_all(b"\r\n")
        } else {
            out.write_all(&[byte])
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stdout.lock().flush()
    }
}
