//! Byte-stream devices over the process's stdin and stdout.
//!
//! Used when stdin is not a terminal (piped input, scripted runs) or when
//! the `terminal` feature is disabled.

use super::{Console, KeyEvent, Keyboard};
use std::io::{self, Read, Stdin, Stdout, Write};

/// ASCII end-of-text, what Ctrl-C produces on a raw byte stream.
const ETX: u8 = 0x03;

/// ASCII escape.
const ESC: u8 = 0x1B;

/// Keyboard reading one byte per key from a byte stream, stdin by default.
///
/// A byte stream cannot be polled without blocking, so `poll` reads the next
/// byte too. End of input is reported as [`KeyEvent::Interrupt`]: no more
/// keys will ever arrive, so a program waiting for one is stopped.
pub struct StdinKeyboard<R = Stdin> {
    input: R,
}

impl StdinKeyboard {
    pub fn new() -> Self {
        Self::from_reader(io::stdin())
    }
}

impl<R: Read> StdinKeyboard<R> {
    /// Read keys from any byte stream.
    pub fn from_reader(input: R) -> Self {
        Self { input }
    }

    fn next_event(&mut self) -> io::Result<KeyEvent> {
        let mut buf = [0u8; 1];
        loop {
            match self.input.read(&mut buf) {
                Ok(0) => {
                    log::info!("end of keyboard input");
                    return Ok(KeyEvent::Interrupt);
                }
                Ok(_) => return Ok(byte_event(buf[0])),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }
}

impl Default for StdinKeyboard {
    fn default() -> Self {
        Self::new()
    }
}

fn byte_event(byte: u8) -> KeyEvent {
    match byte {
        ETX | ESC => KeyEvent::Interrupt,
        b => KeyEvent::Key(b as u16),
    }
}

impl<R: Read> Keyboard for StdinKeyboard<R> {
    fn poll(&mut self) -> io::Result<Option<KeyEvent>> {
        self.next_event().map(Some)
    }

    fn read(&mut self) -> io::Result<KeyEvent> {
        self.next_event()
    }
}

/// Console writing straight to stdout, flushed after every trap call.
pub struct StdoutConsole {
    stdout: Stdout,
}

impl StdoutConsole {
    pub fn new() -> Self {
        Self { stdout: io::stdout() }
    }
}

impl Default for StdoutConsole {
    fn default() -> Self {
        Self::new()
    }
}

impl Console for StdoutConsole {
    fn write_char(&mut self, byte: u8) -> io::Result<()> {
        self.stdout.lock().write_all(&[byte])
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stdout.lock().flush()
    }
}
