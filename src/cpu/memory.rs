//! LC-3 memory subsystem.
//!
//! 65536 sixteen-bit words, word-addressed. Two addresses form the keyboard
//! device window: reading the status register polls the attached keyboard.

use crate::io::{KeyEvent, Keyboard, NullKeyboard};

/// Number of addressable words.
pub const MEMORY_SIZE: usize = 1 << 16;

/// Keyboard status register. Bit 15 is set when a key is pending.
pub const KBSR: u16 = 0xFE00;

/// Keyboard data register. Holds the last pending key code.
pub const KBDR: u16 = 0xFE02;

/// Value of KBSR while a key is pending.
const KEY_READY: u16 = 0x8000;

/// LC-3 memory with its keyboard device window.
pub struct Memory {
    cells: Vec<u16>,
    keyboard: Box<dyn Keyboard>,
    interrupted: bool,
}

impl Memory {
    /// Create a zeroed memory with no keyboard attached.
    pub fn new() -> Self {
        Self::with_keyboard(Box::new(NullKeyboard))
    }

    /// Create a zeroed memory polling the given keyboard.
    pub fn with_keyboard(keyboard: Box<dyn Keyboard>) -> Self {
        Self {
            cells: vec![0; MEMORY_SIZE],
            keyboard,
            interrupted: false,
        }
    }

    /// The attached keyboard, for blocking reads from the trap routines.
    pub fn keyboard(&mut self) -> &mut dyn Keyboard {
        self.keyboard.as_mut()
    }

    /// Read a word.
    ///
    /// Reading [`KBSR`] polls the keyboard first and refreshes both device
    /// registers. A keyboard failure is logged and counts as "no key"; an
    /// interrupt key is latched for the run loop and also counts as "no key".
    pub fn read(&mut self, addr: u16) -> u16 {
        if addr == KBSR {
            self.poll_keyboard();
        }
        self.cells[addr as usize]
    }

    /// Write a word. Device addresses are plain storage for writes.
    #[inline]
    pub fn write(&mut self, addr: u16, value: u16) {
        self.cells[addr as usize] = value;
    }

    /// Read a word without device side effects.
    #[inline]
    pub fn peek(&self, addr: u16) -> u16 {
        self.cells[addr as usize]
    }

    fn poll_keyboard(&mut self) {
        let key = match self.keyboard.poll() {
            Ok(Some(KeyEvent::Key(code))) => Some(code),
            Ok(Some(KeyEvent::Interrupt)) => {
                log::info!("keyboard interrupt while polling KBSR");
                self.interrupted = true;
                None
            }
            Ok(None) => None,
            Err(e) => {
                log::warn!("keyboard poll failed: {}", e);
                None
            }
        };

        match key {
            Some(code) => {
                self.cells[KBSR as usize] = KEY_READY;
                self.cells[KBDR as usize] = code;
            }
            None => self.cells[KBSR as usize] = 0,
        }
    }

    /// Take the latched interrupt flag, clearing it.
    pub fn take_interrupt(&mut self) -> bool {
        std::mem::take(&mut self.interrupted)
    }

    /// Clear all memory to zeros. The keyboard stays attached.
    pub fn clear(&mut self) {
        self.cells.fill(0);
        self.interrupted = false;
    }

    /// Store `words` at consecutive addresses starting at `origin`.
    ///
    /// Addresses wrap past 0xFFFF. Returns the address after the last word.
    pub fn load_words(&mut self, origin: u16, words: &[u16]) -> u16 {
        let mut addr = origin;
        for &word in words {
            self.cells[addr as usize] = word;
            addr = addr.wrapping_add(1);
        }
        addr
    }

    /// Non-zero cells as `(address, value)` pairs, in address order.
    pub fn non_zero(&self) -> Vec<(u16, u16)> {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, cell)| **cell != 0)
            .map(|(addr, &cell)| (addr as u16, cell))
            .collect()
    }

    /// Dump a range of memory (for debugging).
    pub fn dump(&self, start: u16, count: usize) -> Vec<(u16, u16)> {
        (0..count)
            .map(|i| {
                let addr = start.wrapping_add(i as u16);
                (addr, self.peek(addr))
            })
            .collect()
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Memory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Only count non-zero cells
        let non_zero = self.cells.iter().filter(|&&cell| cell != 0).count();

        f.debug_struct("Memory")
            .field("non_zero_cells", &non_zero)
            .field("total_cells", &MEMORY_SIZE)
            .field("interrupted", &self.interrupted)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::ScriptedKeyboard;
    use std::io;

    struct FailingKeyboard;

    impl Keyboard for FailingKeyboard {
        fn poll(&mut self) -> io::Result<Option<KeyEvent>> {
            Err(io::Error::new(io::ErrorKind::Other, "device gone"))
        }

        fn read(&mut self) -> io::Result<KeyEvent> {
            Err(io::Error::new(io::ErrorKind::Other, "device gone"))
        }
    }

    #[test]
    fn test_memory_read_write() {
        let mut mem = Memory::new();
        mem.write(0x3000, 42);
        assert_eq!(mem.read(0x3000), 42);
        assert_eq!(mem.read(0xFFFF), 0);
    }

    #[test]
    fn test_keyboard_status_with_key() {
        let mut mem = Memory::with_keyboard(Box::new(ScriptedKeyboard::from_text("k")));

        assert_eq!(mem.read(KBSR), 0x8000);
        assert_eq!(mem.read(KBDR), b'k' as u16);

        // Key consumed; data register keeps the last key
        assert_eq!(mem.read(KBSR), 0);
        assert_eq!(mem.read(KBDR), b'k' as u16);
    }

    #[test]
    fn test_keyboard_data_read_does_not_poll() {
        let mut mem = Memory::with_keyboard(Box::new(ScriptedKeyboard::from_text("k")));
        assert_eq!(mem.read(KBDR), 0);
        assert_eq!(mem.read(KBSR), 0x8000);
    }

    #[test]
    fn test_device_writes_are_plain_stores() {
        let mut mem = Memory::new();
        mem.write(KBDR, 0x1234);
        mem.write(KBSR, 0x8000);
        assert_eq!(mem.peek(KBSR), 0x8000);
        assert_eq!(mem.read(KBDR), 0x1234);
        // Reading the status register overwrites the stored value
        assert_eq!(mem.read(KBSR), 0);
    }

    #[test]
    fn test_keyboard_failure_is_no_key() {
        let mut mem = Memory::with_keyboard(Box::new(FailingKeyboard));
        mem.write(KBSR, 0x8000);
        assert_eq!(mem.read(KBSR), 0);
        assert!(!mem.take_interrupt());
    }

    #[test]
    fn test_interrupt_is_latched() {
        let mut kb = ScriptedKeyboard::new();
        kb.push(KeyEvent::Interrupt);
        let mut mem = Memory::with_keyboard(Box::new(kb));

        assert_eq!(mem.read(KBSR), 0);
        assert!(mem.take_interrupt());
        assert!(!mem.take_interrupt());
    }

    #[test]
    fn test_load_words_wraps() {
        let mut mem = Memory::new();
        let end = mem.load_words(0xFFFF, &[1, 2, 3]);

        assert_eq!(end, 0x0002);
        assert_eq!(mem.peek(0xFFFF), 1);
        assert_eq!(mem.peek(0x0000), 2);
        assert_eq!(mem.peek(0x0001), 3);
        assert_eq!(mem.non_zero(), vec![(0x0000, 2), (0x0001, 3), (0xFFFF, 1)]);
    }

    #[test]
    fn test_dump() {
        let mut mem = Memory::new();
        mem.write(0x3001, 7);
        assert_eq!(mem.dump(0x3000, 2), vec![(0x3000, 0), (0x3001, 7)]);
    }
}
