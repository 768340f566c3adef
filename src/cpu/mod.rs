//! CPU emulation for the LC-3.
//!
//! This module implements the complete LC-3 architecture:
//! - 65536 sixteen-bit memory words with a memory-mapped keyboard
//! - 8 general-purpose registers, PC and the N/Z/P condition code
//! - 16 opcodes, 6 trap routines

pub mod memory;
pub mod registers;
pub mod decode;
pub mod trap;
pub mod execute;
pub mod snapshot;

pub use memory::Memory;
pub use registers::{Condition, Registers, RegisterError};
pub use decode::{Instruction, Opcode, Operand};
pub use trap::{ExecutionSignal, TrapError, TrapVector};
pub use execute::{Cpu, CpuError, CpuState};
pub use snapshot::Snapshot;
