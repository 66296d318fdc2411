pub mod addressing;
pub mod execute;

use crate::breakpoints::BreakpointSet;
use crate::device::Device;
use crate::memory::{AddressError, Storage};
use crate::opcode::{self, OpcodeFormat};
use crate::register::RegisterFile;
use execute::Effect;
use std::error::Error as StdError;
use std::fmt;

/// A condition the interpreter cannot continue past. All of these map to
/// the `RuntimeError` kind at the REPL boundary.
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub enum Fault {
    AddressOutOfRange(u32),
    UnsupportedOpcode(u8),
    SicLegacyForm,
    DivideByZero,
}

impl From<AddressError> for Fault {
    fn from(err: AddressError) -> Fault {
        Fault::AddressOutOfRange(err.address)
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Fault::AddressOutOfRange(addr) => write!(f, "address {:#07X} is out of range", addr),
            Fault::UnsupportedOpcode(op) => write!(f, "unsupported opcode {:#04X}", op),
            Fault::SicLegacyForm => write!(f, "SIC-legacy addressing form (n=i=0) is not supported"),
            Fault::DivideByZero => write!(f, "division by zero"),
        }
    }
}

impl StdError for Fault {}

/// What happened over the course of one `step()`.
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub enum StepOutcome {
    Continued,
    HitBreakpoint(u32),
}

/// Registers, memory, the breakpoint set, and the attached device: the
/// full state one `run`/`step` command operates on.
pub struct Interpreter<S, D> {
    pub regs: RegisterFile,
    pub memory: S,
    pub breakpoints: BreakpointSet,
    pub device: D,
}

impl<S: Storage, D: Device> Interpreter<S, D> {
    pub fn new(memory: S, device: D) -> Interpreter<S, D> {
        Interpreter {
            regs: RegisterFile::new(),
            memory,
            breakpoints: BreakpointSet::new(),
            device,
        }
    }

    /// Fetches, decodes, and executes the instruction at `PC`, advancing
    /// `PC` unless the instruction itself set it (a jump or call).
    pub fn step(&mut self) -> Result<StepOutcome, Fault> {
        let pc = self.regs.pc;
        if self.breakpoints.contains(pc) {
            return Ok(StepOutcome::HitBreakpoint(pc));
        }

        let byte0 = self.memory.read_byte(pc)?;
        let opcode = byte0 & 0xFC;
        log::trace!("fetch pc={:#07X} opcode={:#04X}", pc, opcode);

        match opcode::classify(opcode) {
            OpcodeFormat::F1 => Err(Fault::UnsupportedOpcode(opcode)),
            OpcodeFormat::F2 => {
                let byte1 = self.memory.read_byte(pc + 1)?;
                self.regs.pc = pc.wrapping_add(2);
                execute::execute_f2(opcode, byte1, &mut self.regs)?;
                Ok(StepOutcome::Continued)
            }
            OpcodeFormat::F3OrF4 => {
                let byte1 = self.memory.read_byte(pc + 1)?;
                let byte2 = self.memory.read_byte(pc + 2)?;
                let e = byte1 & 0x10 != 0;
                let byte3 = if e { self.memory.read_byte(pc + 3)? } else { 0 };

                let operand = addressing::decode(&self.regs, byte0, byte1, byte2, byte3)
                    .ok_or(Fault::SicLegacyForm)?;
                let length = operand.instruction_length;
                self.regs.pc = pc.wrapping_add(length);

                match execute::execute_f3f4(
                    opcode,
                    &mut self.regs,
                    &mut self.memory,
                    &mut self.device,
                    &operand,
                )? {
                    Effect::Sequential | Effect::Jumped => Ok(StepOutcome::Continued),
                }
            }
        }
    }

    /// Runs until a breakpoint is hit or a fault occurs. There is no
    /// intrinsic halt instruction in this instruction set; a program that
    /// never reaches a breakpoint runs until it faults or the caller
    /// otherwise stops driving `step`.
    pub fn run(&mut self) -> Result<u32, Fault> {
        loop {
            match self.step()? {
                StepOutcome::Continued => {}
                StepOutcome::HitBreakpoint(addr) => return Ok(addr),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::SequenceDevice;
    use crate::memory::Memory;

    fn assemble_lda_immediate(mem: &mut Memory, at: u32, value: u8) {
        // LDA #value, format 3, n=0 i=1.
        mem.write_byte(at, 0x00 | 0x01).unwrap();
        mem.write_byte(at + 1, 0x10).unwrap();
        mem.write_byte(at + 2, value).unwrap();
    }

    #[test]
    fn step_advances_pc_by_instruction_length() {
        let mut mem = Memory::new(0x100);
        assemble_lda_immediate(&mut mem, 0x10, 5);
        let mut interp = Interpreter::new(mem, SequenceDevice::new());
        interp.regs.pc = 0x10;
        interp.step().unwrap();
        assert_eq!(interp.regs.pc, 0x13);
    }

    #[test]
    fn run_stops_at_the_lowest_reached_breakpoint() {
        let mut mem = Memory::new(0x100);
        assemble_lda_immediate(&mut mem, 0x10, 1);
        assemble_lda_immediate(&mut mem, 0x13, 2);
        let mut interp = Interpreter::new(mem, SequenceDevice::new());
        interp.regs.pc = 0x10;
        interp.breakpoints.add(0x13);
        let halted_at = interp.run().unwrap();
        assert_eq!(halted_at, 0x13);
    }

    #[test]
    fn unsupported_opcode_is_fatal() {
        let mut mem = Memory::new(0x10);
        mem.write_byte(0, 0xC0).unwrap(); // a format-1 byte: unimplemented
        let mut interp = Interpreter::new(mem, SequenceDevice::new());
        assert!(matches!(interp.step(), Err(Fault::UnsupportedOpcode(0xC0))));
    }

    #[test]
    fn sic_legacy_form_is_fatal() {
        let mut mem = Memory::new(0x10);
        mem.write_byte(0, 0x00).unwrap(); // n=i=0
        mem.write_byte(1, 0x00).unwrap();
        mem.write_byte(2, 0x00).unwrap();
        let mut interp = Interpreter::new(mem, SequenceDevice::new());
        assert!(matches!(interp.step(), Err(Fault::SicLegacyForm)));
    }
}
