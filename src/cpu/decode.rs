//! Instruction decoder for the LC-3.
//!
//! Every instruction is one 16-bit word. Bits [15:12] select the opcode and
//! the remaining 12 bits are opcode-specific fields:
//! - DR/SR: bits [11:9]
//! - SR1/BaseR: bits [8:6]
//! - SR2: bits [2:0], used when the immediate flag (bit 5) is clear
//! - imm5 [4:0], offset6 [5:0], PCoffset9 [8:0], PCoffset11 [10:0],
//!   all sign-extended to 16 bits
//!
//! Decoding is total: all 16 opcodes are defined, two of them reserved.

use crate::word::{field, sign_extend};
use serde::{Serialize, Deserialize};

/// The 4-bit opcode field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Opcode {
    Br = 0x0,
    Add = 0x1,
    Ld = 0x2,
    St = 0x3,
    Jsr = 0x4,
    And = 0x5,
    Ldr = 0x6,
    Str = 0x7,
    Rti = 0x8,
    Not = 0x9,
    Ldi = 0xA,
    Sti = 0xB,
    Jmp = 0xC,
    Res = 0xD,
    Lea = 0xE,
    Trap = 0xF,
}

impl Opcode {
    /// Opcode table indexed by the 4-bit field.
    const TABLE: [Opcode; 16] = [
        Opcode::Br,
        Opcode::Add,
        Opcode::Ld,
        Opcode::St,
        Opcode::Jsr,
        Opcode::And,
        Opcode::Ldr,
        Opcode::Str,
        Opcode::Rti,
        Opcode::Not,
        Opcode::Ldi,
        Opcode::Sti,
        Opcode::Jmp,
        Opcode::Res,
        Opcode::Lea,
        Opcode::Trap,
    ];

    /// Opcode of an instruction word (its top 4 bits).
    #[inline]
    pub fn of(word: u16) -> Self {
        Self::TABLE[(word >> 12) as usize]
    }

    /// The 4-bit encoding.
    #[inline]
    pub const fn bits(self) -> u16 {
        self as u16
    }
}

/// Second source operand of ADD and AND.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operand {
    /// SR2, bits [2:0].
    Register(u8),
    /// imm5, already sign-extended.
    Immediate(u16),
}

/// Decoded LC-3 instruction.
///
/// Offsets and immediates are stored sign-extended, ready to be added to a
/// 16-bit value with wrapping arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Instruction {
    // ==================== Operate ====================

    /// DR := SR1 + operand
    Add { dr: u8, sr1: u8, operand: Operand },

    /// DR := SR1 & operand
    And { dr: u8, sr1: u8, operand: Operand },

    /// DR := !SR
    Not { dr: u8, sr: u8 },

    // ==================== Control Flow ====================

    /// If `nzp & COND != 0`: PC := PC + offset
    Br { nzp: u16, offset: u16 },

    /// PC := BaseR (RET when BaseR is R7)
    Jmp { base: u8 },

    /// R7 := PC, PC := PC + offset
    Jsr { offset: u16 },

    /// R7 := PC, PC := BaseR
    Jsrr { base: u8 },

    /// System call through the trap vector table
    Trap { vector: u8 },

    // ==================== Data Movement ====================

    /// DR := mem[PC + offset]
    Ld { dr: u8, offset: u16 },

    /// DR := mem[mem[PC + offset]]
    Ldi { dr: u8, offset: u16 },

    /// DR := mem[BaseR + offset]
    Ldr { dr: u8, base: u8, offset: u16 },

    /// DR := PC + offset
    Lea { dr: u8, offset: u16 },

    /// mem[PC + offset] := SR
    St { sr: u8, offset: u16 },

    /// mem[mem[PC + offset]] := SR
    Sti { sr: u8, offset: u16 },

    /// mem[BaseR + offset] := SR
    Str { sr: u8, base: u8, offset: u16 },

    // ==================== Reserved ====================

    /// Return from interrupt. No privilege model, so unused.
    Rti,

    /// Reserved opcode 0xD.
    Reserved,
}

impl Instruction {
    /// The opcode this instruction encodes to.
    pub fn opcode(&self) -> Opcode {
        match self {
            Instruction::Add { .. } => Opcode::Add,
            Instruction::And { .. } => Opcode::And,
            Instruction::Not { .. } => Opcode::Not,
            Instruction::Br { .. } => Opcode::Br,
            Instruction::Jmp { .. } => Opcode::Jmp,
            Instruction::Jsr { .. } | Instruction::Jsrr { .. } => Opcode::Jsr,
            Instruction::Trap { .. } => Opcode::Trap,
            Instruction::Ld { .. } => Opcode::Ld,
            Instruction::Ldi { .. } => Opcode::Ldi,
            Instruction::Ldr { .. } => Opcode::Ldr,
            Instruction::Lea { .. } => Opcode::Lea,
            Instruction::St { .. } => Opcode::St,
            Instruction::Sti { .. } => Opcode::Sti,
            Instruction::Str { .. } => Opcode::Str,
            Instruction::Rti => Opcode::Rti,
            Instruction::Reserved => Opcode::Res,
        }
    }
}

#[inline]
fn dr(word: u16) -> u8 {
    field(word, 9, 3) as u8
}

#[inline]
fn sr1(word: u16) -> u8 {
    field(word, 6, 3) as u8
}

#[inline]
fn pc_offset9(word: u16) -> u16 {
    sign_extend(word, 9)
}

#[inline]
fn offset6(word: u16) -> u16 {
    sign_extend(word, 6)
}

fn operand(word: u16) -> Operand {
    if field(word, 5, 1) == 1 {
        Operand::Immediate(sign_extend(word, 5))
    } else {
        Operand::Register(field(word, 0, 3) as u8)
    }
}

/// Decode a 16-bit instruction word.
pub fn decode(word: u16) -> Instruction {
    match Opcode::of(word) {
        Opcode::Add => Instruction::Add { dr: dr(word), sr1: sr1(word), operand: operand(word) },
        Opcode::And => Instruction::And { dr: dr(word), sr1: sr1(word), operand: operand(word) },
        Opcode::Not => Instruction::Not { dr: dr(word), sr: sr1(word) },
        Opcode::Br => Instruction::Br { nzp: field(word, 9, 3), offset: pc_offset9(word) },
        Opcode::Jmp => Instruction::Jmp { base: sr1(word) },
        Opcode::Jsr => {
            if field(word, 11, 1) == 1 {
                Instruction::Jsr { offset: sign_extend(word, 11) }
            } else {
                Instruction::Jsrr { base: sr1(word) }
            }
        }
        Opcode::Trap => Instruction::Trap { vector: field(word, 0, 8) as u8 },
        Opcode::Ld => Instruction::Ld { dr: dr(word), offset: pc_offset9(word) },
        Opcode::Ldi => Instruction::Ldi { dr: dr(word), offset: pc_offset9(word) },
        Opcode::Ldr => Instruction::Ldr { dr: dr(word), base: sr1(word), offset: offset6(word) },
        Opcode::Lea => Instruction::Lea { dr: dr(word), offset: pc_offset9(word) },
        Opcode::St => Instruction::St { sr: dr(word), offset: pc_offset9(word) },
        Opcode::Sti => Instruction::Sti { sr: dr(word), offset: pc_offset9(word) },
        Opcode::Str => Instruction::Str { sr: dr(word), base: sr1(word), offset: offset6(word) },
        Opcode::Rti => Instruction::Rti,
        Opcode::Res => Instruction::Reserved,
    }
}

/// Encode an instruction back to a 16-bit word.
///
/// Register indices keep their low 3 bits and offsets are truncated to
/// their field width, so `decode(encode(i)) == i` for any instruction
/// produced by `decode`.
pub fn encode(instr: &Instruction) -> u16 {
    let op = instr.opcode().bits() << 12;
    let reg = |r: u8, lsb: u32| ((r & 0x7) as u16) << lsb;
    let operand = |o: &Operand| match *o {
        Operand::Register(r) => reg(r, 0),
        Operand::Immediate(imm) => 0x20 | (imm & 0x1F),
    };

    op | match instr {
        Instruction::Add { dr, sr1, operand: o }
        | Instruction::And { dr, sr1, operand: o } => reg(*dr, 9) | reg(*sr1, 6) | operand(o),
        Instruction::Not { dr, sr } => reg(*dr, 9) | reg(*sr, 6) | 0x3F,
        Instruction::Br { nzp, offset } => ((nzp & 0x7) << 9) | (offset & 0x1FF),
        Instruction::Jmp { base } | Instruction::Jsrr { base } => reg(*base, 6),
        Instruction::Jsr { offset } => 0x800 | (offset & 0x7FF),
        Instruction::Trap { vector } => *vector as u16,
        Instruction::Ld { dr, offset }
        | Instruction::Ldi { dr, offset }
        | Instruction::Lea { dr, offset } => reg(*dr, 9) | (offset & 0x1FF),
        Instruction::St { sr, offset } | Instruction::Sti { sr, offset } => reg(*sr, 9) | (offset & 0x1FF),
        Instruction::Ldr { dr: r, base, offset } | Instruction::Str { sr: r, base, offset } => {
            reg(*r, 9) | reg(*base, 6) | (offset & 0x3F)
        }
        Instruction::Rti | Instruction::Reserved => 0,
    }
}
