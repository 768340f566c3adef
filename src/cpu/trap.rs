//! Trap service routines.
//!
//! TRAP carries an 8-bit vector selecting one of six system calls. The
//! routines run natively against the register file, memory and console;
//! there is no trap vector table in memory.

use crate::cpu::{Memory, Registers};
use crate::io::{Console, KeyEvent};
use crate::word::{high_byte, low_byte};
use serde::{Serialize, Deserialize};
use std::io;
use thiserror::Error;

/// Prompt printed by the IN trap.
pub const IN_PROMPT: &str = "Enter a character: ";

/// Recognized trap vectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum TrapVector {
    /// Read one key into R0, no echo.
    Getc = 0x20,
    /// Write the character in R0.
    Out = 0x21,
    /// Write the word string at R0, one character per word.
    Puts = 0x22,
    /// Prompt, read one key, echo it, store it in R0.
    In = 0x23,
    /// Write the byte string at R0, two characters per word.
    Putsp = 0x24,
    /// Stop the machine.
    Halt = 0x25,
}

impl TryFrom<u8> for TrapVector {
    type Error = TrapError;

    fn try_from(vector: u8) -> Result<Self, Self::Error> {
        match vector {
            0x20 => Ok(TrapVector::Getc),
            0x21 => Ok(TrapVector::Out),
            0x22 => Ok(TrapVector::Puts),
            0x23 => Ok(TrapVector::In),
            0x24 => Ok(TrapVector::Putsp),
            0x25 => Ok(TrapVector::Halt),
            other => Err(TrapError::UnknownTrapVector(other)),
        }
    }
}

/// What the run loop should do after an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionSignal {
    /// Fetch the next instruction.
    Continue,
    /// HALT was executed.
    Halt,
    /// The operator interrupted a keyboard read.
    Interrupt,
}

/// Errors raised by trap routines.
#[derive(Debug, Error)]
pub enum TrapError {
    #[error("unknown trap vector {0:#04x}")]
    UnknownTrapVector(u8),

    #[error("console write failed: {0}")]
    Console(#[from] io::Error),
}

/// Run the trap routine selected by `vector`.
pub fn dispatch(
    vector: u8,
    regs: &mut Registers,
    mem: &mut Memory,
    console: &mut dyn Console,
) -> Result<ExecutionSignal, TrapError> {
    let signal = match TrapVector::try_from(vector)? {
        TrapVector::Getc => match read_key(mem) {
            Some(code) => {
                regs.r[0] = code;
                ExecutionSignal::Continue
            }
            None => ExecutionSignal::Interrupt,
        },

        TrapVector::Out => {
            console.write_char(low_byte(regs.r[0]))?;
            ExecutionSignal::Continue
        }

        TrapVector::Puts => {
            let mut addr = regs.r[0];
            loop {
                let word = mem.peek(addr);
                if word == 0 {
                    break;
                }
                console.write_char(low_byte(word))?;
                addr = addr.wrapping_add(1);
            }
            ExecutionSignal::Continue
        }

        TrapVector::In => {
            console.write_str(IN_PROMPT)?;
            console.flush()?;
            match read_key(mem) {
                Some(code) => {
                    console.write_char(low_byte(code))?;
                    regs.r[0] = code;
                    ExecutionSignal::Continue
                }
                None => ExecutionSignal::Interrupt,
            }
        }

        TrapVector::Putsp => {
            let mut addr = regs.r[0];
            loop {
                let word = mem.peek(addr);
                if word == 0 {
                    break;
                }
                console.write_char(low_byte(word))?;
                let high = high_byte(word);
                if high != 0 {
                    console.write_char(high)?;
                }
                addr = addr.wrapping_add(1);
            }
            ExecutionSignal::Continue
        }

        TrapVector::Halt => {
            log::info!("HALT trap");
            ExecutionSignal::Halt
        }
    };

    console.flush()?;
    Ok(signal)
}

/// Block for one key. `None` means the operator interrupted the machine.
///
/// A failed keyboard read is logged and reads as key code 0.
fn read_key(mem: &mut Memory) -> Option<u16> {
    match mem.keyboard().read() {
        Ok(KeyEvent::Key(code)) => Some(code),
        Ok(KeyEvent::Interrupt) => {
            log::info!("keyboard interrupt during trap read");
            None
        }
        Err(e) => {
            log::warn!("keyboard read failed: {}", e);
            Some(0)
        }
    }
}
