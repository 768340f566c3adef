//! # LC-3 Emulator
//!
//! An emulator of the LC-3, a 16-bit instructional computer with eight
//! general-purpose registers, a flat 65536-word memory, sixteen opcodes and
//! trap-vectored system calls.
//!
//! ```
//! use lc3::{Cpu, CpuState};
//!
//! let mut cpu = Cpu::new();
//! // origin 0x3000, TRAP HALT
//! cpu.load_image(&[0x30, 0x00, 0xF0, 0x25]).unwrap();
//! cpu.run().unwrap();
//! assert_eq!(cpu.state, CpuState::Halted);
//! ```

pub mod word;
pub mod cpu;
pub mod image;
pub mod io;

// Re-export commonly used types
pub use cpu::{Cpu, CpuState, CpuError, Memory, Registers, Condition, Instruction, Snapshot};
pub use cpu::decode::{decode, encode};
pub use image::{ProgramImage, LoadError, read_image};
pub use io::{Console, Keyboard, KeyEvent};
