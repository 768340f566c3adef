//! CPU execution engine for the LC-3.
//!
//! Implements the fetch-decode-execute cycle and all instruction behaviors.

use crate::cpu::decode::{self, Instruction, Operand};
use crate::cpu::trap::{self, ExecutionSignal, TrapError};
use crate::cpu::{Memory, Registers};
use crate::image::{self, LoadError, ProgramImage};
use crate::io::{Console, Keyboard, NullConsole};
use serde::{Serialize, Deserialize};
use thiserror::Error;

/// CPU execution state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CpuState {
    /// CPU is running normally.
    Running,
    /// CPU has halted (executed TRAP HALT).
    Halted,
    /// The operator interrupted a keyboard read or poll.
    Interrupted,
}

/// The LC-3 CPU with its memory and console.
pub struct Cpu {
    /// CPU registers.
    pub regs: Registers,
    /// Main memory, including the keyboard device window.
    pub mem: Memory,
    /// Current execution state.
    pub state: CpuState,
    /// Instruction count.
    pub cycles: u64,
    console: Box<dyn Console>,
    last_instr: Option<Instruction>,
}

impl Cpu {
    /// Create a CPU with zeroed memory, no keyboard and console output discarded.
    pub fn new() -> Self {
        Self::with_devices(Memory::new(), Box::new(NullConsole))
    }

    /// Create a CPU attached to host devices.
    pub fn with_io(keyboard: Box<dyn Keyboard>, console: Box<dyn Console>) -> Self {
        Self::with_devices(Memory::with_keyboard(keyboard), console)
    }

    fn with_devices(mem: Memory, console: Box<dyn Console>) -> Self {
        Self {
            regs: Registers::new(),
            mem,
            state: CpuState::Running,
            cycles: 0,
            console,
            last_instr: None,
        }
    }

    /// Reset registers, memory and run state. Devices stay attached.
    pub fn reset(&mut self) {
        self.regs.reset();
        self.mem.clear();
        self.state = CpuState::Running;
        self.cycles = 0;
        self.last_instr = None;
    }

    /// Parse a program image and store it in memory at its origin.
    pub fn load_image(&mut self, bytes: &[u8]) -> Result<ProgramImage, LoadError> {
        image::load(&mut self.mem, bytes)
    }

    /// Store raw words at `origin`.
    pub fn load_program(&mut self, origin: u16, program: &[u16]) {
        self.mem.load_words(origin, program);
    }

    /// Execute a single instruction.
    ///
    /// Returns the instruction that was executed, or an error.
    pub fn step(&mut self) -> Result<Instruction, CpuError> {
        if self.state != CpuState::Running {
            return Err(CpuError::NotRunning(self.state));
        }

        // Fetch
        let pc = self.regs.pc;
        let raw = self.mem.read(pc);

        // PC is incremented before the instruction sees it
        self.regs.advance_pc();

        let instr = decode::decode(raw);
        log::debug!("{:#06x}: {:#06x} {:?}", pc, raw, instr);

        let signal = self.execute(instr)?;

        self.cycles += 1;
        self.last_instr = Some(instr);

        // An interrupt latched by a KBSR poll stops the machine too
        let interrupted = self.mem.take_interrupt();
        match signal {
            ExecutionSignal::Halt => self.state = CpuState::Halted,
            ExecutionSignal::Interrupt => self.state = CpuState::Interrupted,
            ExecutionSignal::Continue if interrupted => self.state = CpuState::Interrupted,
            ExecutionSignal::Continue => {}
        }

        Ok(instr)
    }

    /// Run until halt, interrupt or error.
    ///
    /// Returns the number of instructions executed.
    pub fn run(&mut self) -> Result<u64, CpuError> {
        let start_cycles = self.cycles;
        log::info!("starting at PC={:#06x}", self.regs.pc);

        while self.state == CpuState::Running {
            self.checked_step()?;
        }

        log::info!("stopped ({:?}) after {} cycles", self.state, self.cycles - start_cycles);
        Ok(self.cycles - start_cycles)
    }

    /// Run for at most `max_cycles` instructions.
    pub fn run_limited(&mut self, max_cycles: u64) -> Result<u64, CpuError> {
        let start_cycles = self.cycles;
        let limit = self.cycles.saturating_add(max_cycles);

        while self.state == CpuState::Running && self.cycles < limit {
            self.checked_step()?;
        }

        Ok(self.cycles - start_cycles)
    }

    fn checked_step(&mut self) -> Result<Instruction, CpuError> {
        self.step().map_err(|e| {
            log::error!("fault at PC={:#06x}: {}", self.regs.pc.wrapping_sub(1), e);
            e
        })
    }

    /// Execute a decoded instruction.
    fn execute(&mut self, instr: Instruction) -> Result<ExecutionSignal, CpuError> {
        match instr {
            // ==================== Operate ====================

            Instruction::Add { dr, sr1, operand } => {
                let value = self.regs.gpr(sr1).wrapping_add(self.operand(operand));
                self.regs.set_gpr_with_flags(dr, value);
            }

            Instruction::And { dr, sr1, operand } => {
                let value = self.regs.gpr(sr1) & self.operand(operand);
                self.regs.set_gpr_with_flags(dr, value);
            }

            Instruction::Not { dr, sr } => {
                let value = !self.regs.gpr(sr);
                self.regs.set_gpr_with_flags(dr, value);
            }

            // ==================== Control Flow ====================

            Instruction::Br { nzp, offset } => {
                if self.regs.cond.matches(nzp) {
                    let target = self.regs.pc_relative(offset);
                    self.regs.jump(target);
                }
            }

            Instruction::Jmp { base } => {
                let target = self.regs.gpr(base);
                self.regs.jump(target);
            }

            Instruction::Jsr { offset } => {
                let link = self.regs.pc;
                let target = self.regs.pc_relative(offset);
                self.regs.set_gpr(7, link);
                self.regs.jump(target);
            }

            Instruction::Jsrr { base } => {
                // Read BaseR before R7 is overwritten (JSRR R7)
                let link = self.regs.pc;
                let target = self.regs.gpr(base);
                self.regs.set_gpr(7, link);
                self.regs.jump(target);
            }

            Instruction::Trap { vector } => {
                return trap::dispatch(vector, &mut self.regs, &mut self.mem, self.console.as_mut())
                    .map_err(CpuError::from);
            }

            // ==================== Data Movement ====================

            Instruction::Ld { dr, offset } => {
                let addr = self.regs.pc_relative(offset);
                let value = self.mem.read(addr);
                self.regs.set_gpr_with_flags(dr, value);
            }

            Instruction::Ldi { dr, offset } => {
                let pointer = self.regs.pc_relative(offset);
                let addr = self.mem.read(pointer);
                let value = self.mem.read(addr);
                self.regs.set_gpr_with_flags(dr, value);
            }

            Instruction::Ldr { dr, base, offset } => {
                let addr = self.regs.gpr(base).wrapping_add(offset);
                let value = self.mem.read(addr);
                self.regs.set_gpr_with_flags(dr, value);
            }

            Instruction::Lea { dr, offset } => {
                let value = self.regs.pc_relative(offset);
                self.regs.set_gpr_with_flags(dr, value);
            }

            Instruction::St { sr, offset } => {
                let addr = self.regs.pc_relative(offset);
                self.mem.write(addr, self.regs.gpr(sr));
            }

            Instruction::Sti { sr, offset } => {
                let pointer = self.regs.pc_relative(offset);
                let value = self.regs.gpr(sr);
                let addr = self.mem.read(pointer);
                self.mem.write(addr, value);
            }

            Instruction::Str { sr, base, offset } => {
                let addr = self.regs.gpr(base).wrapping_add(offset);
                self.mem.write(addr, self.regs.gpr(sr));
            }

            // ==================== Reserved ====================

            Instruction::Rti | Instruction::Reserved => {
                log::warn!(
                    "reserved opcode {:?} at {:#06x}, ignored",
                    instr.opcode(),
                    self.regs.pc.wrapping_sub(1)
                );
            }
        }

        Ok(ExecutionSignal::Continue)
    }

    /// Resolve the second source operand of ADD/AND.
    #[inline]
    fn operand(&self, operand: Operand) -> u16 {
        match operand {
            Operand::Register(r) => self.regs.gpr(r),
            Operand::Immediate(imm) => imm,
        }
    }

    /// Get the last executed instruction.
    pub fn last_instruction(&self) -> Option<Instruction> {
        self.last_instr
    }

    /// Check if the CPU is halted.
    pub fn is_halted(&self) -> bool {
        self.state == CpuState::Halted
    }

    /// Check if the CPU is running.
    pub fn is_running(&self) -> bool {
        self.state == CpuState::Running
    }
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Cpu {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cpu")
            .field("state", &self.state)
            .field("cycles", &self.cycles)
            .field("regs", &self.regs)
            .finish()
    }
}

/// Errors that can occur during CPU execution.
#[derive(Debug, Error)]
pub enum CpuError {
    #[error("CPU not running: {0:?}")]
    NotRunning(CpuState),

    #[error("trap error: {0}")]
    Trap(#[from] TrapError),
}
