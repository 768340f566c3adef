//! Whole-program runs through the public API.

use lc3::cpu::memory::{KBDR, KBSR};
use lc3::cpu::Operand;
use lc3::io::{BufferConsole, ScriptedKeyboard};
use lc3::{encode, Condition, Cpu, CpuState, Instruction, KeyEvent, ProgramImage};

const HALT: Instruction = Instruction::Trap { vector: 0x25 };
const GETC: Instruction = Instruction::Trap { vector: 0x20 };
const OUT: Instruction = Instruction::Trap { vector: 0x21 };
const PUTS: Instruction = Instruction::Trap { vector: 0x22 };
const PUTSP: Instruction = Instruction::Trap { vector: 0x24 };

fn image(origin: u16, program: &[Instruction], data: &[u16]) -> Vec<u8> {
    let words = program.iter().map(encode).chain(data.iter().copied()).collect();
    ProgramImage { origin, words, trailing_byte: false }.to_bytes()
}

fn machine(keys: ScriptedKeyboard) -> (Cpu, BufferConsole) {
    let console = BufferConsole::new();
    let cpu = Cpu::with_io(Box::new(keys), Box::new(console.clone()));
    (cpu, console)
}

fn text(s: &str) -> Vec<u16> {
    s.bytes().map(u16::from).chain(std::iter::once(0)).collect()
}

#[test]
fn hello_world() {
    // LEA R0, msg; PUTS; HALT; msg: "Hello, World!\n"
    let bytes = image(
        0x3000,
        &[Instruction::Lea { dr: 0, offset: 2 }, PUTS, HALT],
        &text("Hello, World!\n"),
    );
    let (mut cpu, console) = machine(ScriptedKeyboard::new());

    cpu.load_image(&bytes).unwrap();
    let cycles = cpu.run().unwrap();

    assert_eq!(cycles, 3);
    assert_eq!(cpu.state, CpuState::Halted);
    assert_eq!(console.contents(), "Hello, World!\n");
}

#[test]
fn echo_until_newline() {
    // loop: GETC; OUT; ADD R1, R0, #-10; BRnp loop; HALT
    let program = [
        GETC,
        OUT,
        Instruction::Add { dr: 1, sr1: 0, operand: Operand::Immediate(0xFFF6) },
        Instruction::Br { nzp: 0b101, offset: 0xFFFC },
        HALT,
    ];
    let (mut cpu, console) = machine(ScriptedKeyboard::from_text("abc\nrest"));

    cpu.load_image(&image(0x3000, &program, &[])).unwrap();
    cpu.run().unwrap();

    assert!(cpu.is_halted());
    assert_eq!(console.contents(), "abc\n");
    assert_eq!(cpu.regs.r[0], b'\n' as u16);
    assert_eq!(cpu.regs.cond, Condition::Zero);
}

#[test]
fn poll_keyboard_status_register() {
    // poll: LDI R0, kbsr_ptr; BRzp poll; LDI R0, kbdr_ptr; OUT; HALT
    // kbsr_ptr: .FILL xFE00; kbdr_ptr: .FILL xFE02
    let program = [
        Instruction::Ldi { dr: 0, offset: 4 },
        Instruction::Br { nzp: 0b011, offset: 0xFFFE },
        Instruction::Ldi { dr: 0, offset: 3 },
        OUT,
        HALT,
    ];
    let mut keys = ScriptedKeyboard::new();
    keys.push(KeyEvent::Key(b'z' as u16));
    let (mut cpu, console) = machine(keys);

    cpu.load_image(&image(0x3000, &program, &[KBSR, KBDR])).unwrap();
    cpu.run().unwrap();

    assert!(cpu.is_halted());
    assert_eq!(console.contents(), "z");
    assert_eq!(cpu.mem.peek(KBSR), 0x8000);
}

#[test]
fn interrupt_while_polling() {
    // poll: LDI R0, kbsr_ptr; BRzp poll; HALT
    let program = [
        Instruction::Ldi { dr: 0, offset: 2 },
        Instruction::Br { nzp: 0b011, offset: 0xFFFE },
        HALT,
    ];
    let mut keys = ScriptedKeyboard::new();
    keys.push(KeyEvent::Interrupt);
    let (mut cpu, _console) = machine(keys);

    cpu.load_image(&image(0x3000, &program, &[KBSR])).unwrap();
    let cycles = cpu.run().unwrap();

    assert_eq!(cycles, 1);
    assert_eq!(cpu.state, CpuState::Interrupted);
}

#[test]
fn subroutine_call_and_return() {
    // main: ADD R1, R1, #3; JSR double; JSR double; HALT
    // double: ADD R1, R1, R1; RET
    let program = [
        Instruction::Add { dr: 1, sr1: 1, operand: Operand::Immediate(3) },
        Instruction::Jsr { offset: 2 },
        Instruction::Jsr { offset: 1 },
        HALT,
        Instruction::Add { dr: 1, sr1: 1, operand: Operand::Register(1) },
        Instruction::Jmp { base: 7 },
    ];
    let (mut cpu, _console) = machine(ScriptedKeyboard::new());

    cpu.load_image(&image(0x3000, &program, &[])).unwrap();
    let cycles = cpu.run().unwrap();

    assert_eq!(cpu.regs.r[1], 12);
    assert_eq!(cpu.regs.r[7], 0x3003);
    assert_eq!(cycles, 8);
}

#[test]
fn packed_string_output() {
    // LEA R0, msg; PUTSP; HALT; msg: "Hey!" packed two per word
    let bytes = image(
        0x3000,
        &[Instruction::Lea { dr: 0, offset: 2 }, PUTSP, HALT],
        &[0x6548, 0x2179, 0x0000],
    );
    let (mut cpu, console) = machine(ScriptedKeyboard::new());

    cpu.load_image(&bytes).unwrap();
    cpu.run().unwrap();

    assert_eq!(console.contents(), "Hey!");
}

#[test]
fn multiple_images_overlay() {
    // Loading the code image must leave the data image in place
    let data = ProgramImage { origin: 0x4000, words: vec![0x0042], trailing_byte: false };
    let code = image(
        0x3000,
        &[Instruction::Ld { dr: 2, offset: 0 }, HALT],
        &[],
    );
    let (mut cpu, _console) = machine(ScriptedKeyboard::new());

    cpu.load_image(&data.to_bytes()).unwrap();
    cpu.load_image(&code).unwrap();
    // LD R2, #0 reads 0x3001, the HALT word itself
    cpu.run().unwrap();

    assert_eq!(cpu.regs.r[2], 0xF025);
    assert_eq!(cpu.regs.cond, Condition::Negative);
    assert_eq!(cpu.mem.peek(0x4000), 0x0042);
}

#[test]
fn snapshot_after_run() {
    let (mut cpu, _console) = machine(ScriptedKeyboard::new());
    cpu.load_image(&image(0x3000, &[Instruction::Add { dr: 5, sr1: 5, operand: Operand::Immediate(0x10) }, HALT], &[]))
        .unwrap();
    cpu.run().unwrap();

    let snap = cpu.snapshot();
    assert_eq!(snap.state, CpuState::Halted);
    assert_eq!(snap.cycles, 2);
    assert_eq!(snap.registers.r[5], 0xFFF0);
    assert_eq!(snap.registers.cond, Condition::Negative);
}
