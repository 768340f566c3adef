//! Serializable machine state.
//!
//! A snapshot captures everything observable after a run: registers, run
//! state, cycle count and the non-zero part of memory.

use crate::cpu::{Cpu, CpuState, Registers};
use serde::{Serialize, Deserialize};
use std::io::Write;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub registers: Registers,
    pub state: CpuState,
    pub cycles: u64,
    /// `(address, value)` for every non-zero memory word.
    pub memory: Vec<(u16, u16)>,
}

impl Snapshot {
    /// Write the snapshot as pretty-printed JSON.
    pub fn write_json<W: Write>(&self, writer: W) -> serde_json::Result<()> {
        serde_json::to_writer_pretty(writer, self)
    }

    /// Restore registers and memory into a CPU. Devices are left as they are.
    pub fn restore(&self, cpu: &mut Cpu) {
        cpu.reset();
        cpu.regs = self.registers.clone();
        cpu.state = self.state;
        cpu.cycles = self.cycles;
        for &(addr, value) in &self.memory {
            cpu.mem.write(addr, value);
        }
    }
}

impl Cpu {
    /// Capture the current machine state.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            registers: self.regs.clone(),
            state: self.state,
            cycles: self.cycles,
            memory: self.mem.non_zero(),
        }
    }
}
