//! LC-3 register file.
//!
//! The machine has 10 architectural registers:
//! - R0..R7: general purpose (R7 receives the return address of JSR/JSRR)
//! - PC: address of the next instruction
//! - COND: condition code, exactly one of N, Z, P

use crate::word;
use serde::{Serialize, Deserialize};
use thiserror::Error;

/// Number of general-purpose registers.
pub const GPR_COUNT: usize = 8;

/// Register index of the program counter in the flat register file.
pub const PC: usize = 8;

/// Register index of the condition code in the flat register file.
pub const COND: usize = 9;

/// Conventional program start address.
pub const PC_START: u16 = 0x3000;

/// Condition code.
///
/// The discriminants are the bit positions tested by the `n`, `z` and `p`
/// mask of a BR instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u16)]
pub enum Condition {
    /// Last result had bit 15 set.
    Negative = 0b100,
    /// Last result was zero.
    Zero = 0b010,
    /// Last result was non-zero with bit 15 clear.
    Positive = 0b001,
}

impl Condition {
    /// Derive the condition code of a result word.
    pub fn from_value(value: u16) -> Self {
        if value == 0 {
            Condition::Zero
        } else if word::is_negative(value) {
            Condition::Negative
        } else {
            Condition::Positive
        }
    }

    /// Decode a raw COND register value.
    pub fn from_bits(bits: u16) -> Result<Self, RegisterError> {
        match bits {
            0b100 => Ok(Condition::Negative),
            0b010 => Ok(Condition::Zero),
            0b001 => Ok(Condition::Positive),
            other => Err(RegisterError::InvalidCondition(other)),
        }
    }

    /// Raw COND register value.
    #[inline]
    pub const fn bits(self) -> u16 {
        self as u16
    }

    /// True if any flag in the 3-bit `nzp` mask matches this condition.
    #[inline]
    pub const fn matches(self, mask: u16) -> bool {
        mask & self.bits() != 0
    }
}

impl Default for Condition {
    fn default() -> Self {
        Condition::Zero
    }
}

/// The LC-3 register file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registers {
    /// R0..R7
    pub r: [u16; GPR_COUNT],

    /// Program counter.
    pub pc: u16,

    /// Condition code of the last flag-setting instruction.
    pub cond: Condition,
}

impl Registers {
    /// Create a register file with zeroed registers, PC at the
    /// conventional start address and COND = Z.
    pub fn new() -> Self {
        Self {
            r: [0; GPR_COUNT],
            pc: PC_START,
            cond: Condition::Zero,
        }
    }

    /// Reset to the power-on state.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Read a register by flat index (0..=7 general, 8 PC, 9 COND).
    pub fn get(&self, index: usize) -> Result<u16, RegisterError> {
        match index {
            0..=7 => Ok(self.r[index]),
            PC => Ok(self.pc),
            COND => Ok(self.cond.bits()),
            _ => Err(RegisterError::InvalidRegister(index)),
        }
    }

    /// Write a register by flat index (0..=7 general, 8 PC, 9 COND).
    ///
    /// COND only accepts one of the three flag patterns (N, Z or P) and
    /// rejects anything else with `InvalidCondition`, so the register file
    /// can never hold zero or several flags at once.
    pub fn set(&mut self, index: usize, value: u16) -> Result<(), RegisterError> {
        match index {
            0..=7 => self.r[index] = value,
            PC => self.pc = value,
            COND => self.cond = Condition::from_bits(value)?,
            _ => return Err(RegisterError::InvalidRegister(index)),
        }
        Ok(())
    }

    /// Read a general-purpose register from a 3-bit instruction field.
    #[inline]
    pub fn gpr(&self, index: u8) -> u16 {
        self.r[(index & 0x7) as usize]
    }

    /// Write a general-purpose register without touching COND.
    #[inline]
    pub fn set_gpr(&mut self, index: u8, value: u16) {
        self.r[(index & 0x7) as usize] = value;
    }

    /// Write a general-purpose register and derive COND from the value.
    #[inline]
    pub fn set_gpr_with_flags(&mut self, index: u8, value: u16) {
        self.set_gpr(index, value);
        self.update_flags(value);
    }

    /// Set COND from a result word.
    #[inline]
    pub fn update_flags(&mut self, value: u16) {
        self.cond = Condition::from_value(value);
    }

    /// Increment the program counter by 1 (wrapping).
    /// Returns the old value.
    pub fn advance_pc(&mut self) -> u16 {
        let old = self.pc;
        self.pc = self.pc.wrapping_add(1);
        old
    }

    /// Set the program counter to an absolute address.
    pub fn jump(&mut self, addr: u16) {
        self.pc = addr;
    }

    /// PC-relative effective address: incremented PC plus a sign-extended offset.
    #[inline]
    pub fn pc_relative(&self, offset: u16) -> u16 {
        self.pc.wrapping_add(offset)
    }
}

impl Default for Registers {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors from flat register access.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegisterError {
    #[error("invalid register index {0} (expected 0..=9)")]
    InvalidRegister(usize),

    #[error("invalid condition code {0:#05b}")]
    InvalidCondition(u16),
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_initial_state() {
        let regs = Registers::new();
        assert_eq!(regs.r, [0; 8]);
        assert_eq!(regs.pc, 0x3000);
        assert_eq!(regs.cond, Condition::Zero);
    }

    #[test]
    fn test_flat_access() {
        let mut regs = Registers::new();
        regs.set(3, 0xBEEF).unwrap();
        regs.set(PC, 0x4000).unwrap();
        regs.set(COND, 0b100).unwrap();

        assert_eq!(regs.get(3).unwrap(), 0xBEEF);
        assert_eq!(regs.get(PC).unwrap(), 0x4000);
        assert_eq!(regs.get(COND).unwrap(), 0b100);
        assert_eq!(regs.cond, Condition::Negative);
    }

    #[test]
    fn test_invalid_register() {
        let mut regs = Registers::new();
        assert_eq!(regs.get(10), Err(RegisterError::InvalidRegister(10)));
        assert_eq!(regs.set(42, 1), Err(RegisterError::InvalidRegister(42)));
        assert_eq!(regs.set(COND, 0b011), Err(RegisterError::InvalidCondition(0b011)));
        assert_eq!(regs.cond, Condition::Zero);
    }

    #[test]
    fn test_advance_pc_wraps() {
        let mut regs = Registers::new();
        regs.pc = 0xFFFF;

        let old = regs.advance_pc();
        assert_eq!(old, 0xFFFF);
        assert_eq!(regs.pc, 0x0000);
    }

    #[test]
    fn test_condition_mask() {
        assert!(Condition::Negative.matches(0b100));
        assert!(Condition::Zero.matches(0b111));
        assert!(!Condition::Positive.matches(0b110));
        assert!(!Condition::Zero.matches(0));
    }

    #[test]
    fn test_set_gpr_with_flags() {
        let mut regs = Registers::new();
        regs.set_gpr_with_flags(2, 0x8001);
        assert_eq!(regs.r[2], 0x8001);
        assert_eq!(regs.cond, Condition::Negative);

        regs.set_gpr(2, 0);
        assert_eq!(regs.cond, Condition::Negative);
    }

    proptest! {
        #[test]
        fn prop_flags_exhaustive_and_exclusive(v in any::<u16>()) {
            let cond = Condition::from_value(v);
            prop_assert_eq!(cond == Condition::Zero, v == 0);
            prop_assert_eq!(cond == Condition::Negative, v & 0x8000 != 0);
            prop_assert_eq!(cond == Condition::Positive, v != 0 && v & 0x8000 == 0);
            prop_assert_eq!(cond.bits().count_ones(), 1);
        }
    }
}
