use super::addressing::{self, AddressingMode, DecodedOperand};
use super::Fault;
use crate::constants::truncate_word;
use crate::device::Device;
use crate::memory::Storage;
use crate::register::{RegisterFile, RegisterId};

/// What a single opcode did to control flow. Everything besides a jump or
/// subroutine call simply falls through to the next instruction, which the
/// caller has already advanced `PC` past.
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub enum Effect {
    Sequential,
    Jumped,
}

fn sign(value: i32) -> i32 {
    match value {
        v if v < 0 => -1,
        0 => 0,
        _ => 1,
    }
}

/// Executes one Format-3/4 instruction given its opcode byte (masked to
/// the low six bits) and its already-decoded operand.
pub fn execute_f3f4(
    opcode: u8,
    regs: &mut RegisterFile,
    memory: &mut impl Storage,
    device: &mut impl Device,
    operand: &DecodedOperand,
) -> Result<Effect, Fault> {
    let addr = operand.effective_address;

    macro_rules! read_val {
        () => {
            addressing::read_operand(memory, operand).map_err(Fault::from)?
        };
    }

    match opcode & 0xFC {
        0x18 => {
            regs.a = truncate_word(regs.a + read_val!()) as i32;
            Ok(Effect::Sequential)
        }
        0x1C => {
            regs.a = truncate_word(regs.a - read_val!()) as i32;
            Ok(Effect::Sequential)
        }
        0x20 => {
            regs.a = truncate_word(regs.a.wrapping_mul(read_val!())) as i32;
            Ok(Effect::Sequential)
        }
        0x24 => {
            let divisor = read_val!();
            if divisor == 0 {
                return Err(Fault::DivideByZero);
            }
            regs.a = truncate_word(regs.get(RegisterId::A) / divisor) as i32;
            Ok(Effect::Sequential)
        }
        0x40 => {
            regs.a = truncate_word(regs.a & read_val!()) as i32;
            Ok(Effect::Sequential)
        }
        0x44 => {
            regs.a = truncate_word(regs.a | read_val!()) as i32;
            Ok(Effect::Sequential)
        }
        0x28 => {
            regs.sw = sign(regs.get(RegisterId::A) - read_val!());
            Ok(Effect::Sequential)
        }
        0x00 => {
            regs.set(RegisterId::A, read_val!());
            Ok(Effect::Sequential)
        }
        0x04 => {
            regs.set(RegisterId::X, read_val!());
            Ok(Effect::Sequential)
        }
        0x08 => {
            regs.set(RegisterId::L, read_val!());
            Ok(Effect::Sequential)
        }
        0x68 => {
            regs.set(RegisterId::B, read_val!());
            Ok(Effect::Sequential)
        }
        0x6C => {
            regs.set(RegisterId::S, read_val!());
            Ok(Effect::Sequential)
        }
        0x74 => {
            regs.set(RegisterId::T, read_val!());
            Ok(Effect::Sequential)
        }
        0x0C => {
            memory
                .write_word(addressing::write_address(operand), regs.a)
                .map_err(Fault::from)?;
            Ok(Effect::Sequential)
        }
        0x10 => {
            memory
                .write_word(addressing::write_address(operand), regs.x)
                .map_err(Fault::from)?;
            Ok(Effect::Sequential)
        }
        0x14 => {
            memory
                .write_word(addressing::write_address(operand), regs.l)
                .map_err(Fault::from)?;
            Ok(Effect::Sequential)
        }
        0x78 => {
            memory
                .write_word(addressing::write_address(operand), regs.b)
                .map_err(Fault::from)?;
            Ok(Effect::Sequential)
        }
        0x7C => {
            memory
                .write_word(addressing::write_address(operand), regs.s)
                .map_err(Fault::from)?;
            Ok(Effect::Sequential)
        }
        0x84 => {
            memory
                .write_word(addressing::write_address(operand), regs.t)
                .map_err(Fault::from)?;
            Ok(Effect::Sequential)
        }
        0x50 => {
            let byte = match operand.mode {
                AddressingMode::Immediate => operand.effective_address as u8,
                _ => memory.read_byte(addr).map_err(Fault::from)?,
            };
            regs.a = (regs.a & !0xFF) | i32::from(byte);
            Ok(Effect::Sequential)
        }
        0x54 => {
            memory
                .write_byte(addr, (regs.a & 0xFF) as u8)
                .map_err(Fault::from)?;
            Ok(Effect::Sequential)
        }
        0x3C => {
            regs.pc = addr;
            Ok(Effect::Jumped)
        }
        0x30 => {
            if regs.sw == 0 {
                regs.pc = addr;
                Ok(Effect::Jumped)
            } else {
                Ok(Effect::Sequential)
            }
        }
        0x34 => {
            if regs.sw > 0 {
                regs.pc = addr;
                Ok(Effect::Jumped)
            } else {
                Ok(Effect::Sequential)
            }
        }
        0x38 => {
            if regs.sw < 0 {
                regs.pc = addr;
                Ok(Effect::Jumped)
            } else {
                Ok(Effect::Sequential)
            }
        }
        0x48 => {
            regs.l = regs.pc as i32;
            regs.pc = addr;
            Ok(Effect::Jumped)
        }
        0x4C => {
            regs.pc = regs.l as u32;
            Ok(Effect::Jumped)
        }
        0x2C => {
            regs.x = truncate_word(regs.x + 1) as i32;
            regs.sw = sign(regs.get(RegisterId::X) - read_val!());
            Ok(Effect::Sequential)
        }
        0xE0 => {
            regs.sw = if device.test() { -1 } else { 0 };
            Ok(Effect::Sequential)
        }
        0xD8 => {
            let byte = device.read();
            regs.a = (regs.a & !0xFF) | i32::from(byte);
            Ok(Effect::Sequential)
        }
        0xDC => {
            device.write((regs.a & 0xFF) as u8);
            Ok(Effect::Sequential)
        }
        _ => Err(Fault::UnsupportedOpcode(opcode)),
    }
}

/// Executes one Format-2 instruction: `byte1` is `(r1<<4)|r2`.
pub fn execute_f2(opcode: u8, byte1: u8, regs: &mut RegisterFile) -> Result<Effect, Fault> {
    let r1 = RegisterId::from_nibble(byte1 >> 4).ok_or(Fault::UnsupportedOpcode(opcode))?;
    let r2 = RegisterId::from_nibble(byte1 & 0x0F).ok_or(Fault::UnsupportedOpcode(opcode))?;

    match opcode {
        0x90 => {
            regs.set(r2, regs.get(r2) + regs.get(r1));
            Ok(Effect::Sequential)
        }
        0x94 => {
            regs.set(r2, regs.get(r2) - regs.get(r1));
            Ok(Effect::Sequential)
        }
        0x98 => {
            regs.set(r2, regs.get(r2).wrapping_mul(regs.get(r1)));
            Ok(Effect::Sequential)
        }
        0x9C => {
            let divisor = regs.get(r1);
            if divisor == 0 {
                return Err(Fault::DivideByZero);
            }
            regs.set(r2, regs.get(r2) / divisor);
            Ok(Effect::Sequential)
        }
        0xA0 => {
            regs.sw = sign(regs.get(r1) - regs.get(r2));
            Ok(Effect::Sequential)
        }
        0xB4 => {
            regs.set(r1, 0);
            Ok(Effect::Sequential)
        }
        0xAC => {
            regs.set(r2, regs.get(r1));
            Ok(Effect::Sequential)
        }
        0xB8 => {
            regs.x = truncate_word(regs.x + 1) as i32;
            regs.sw = sign(regs.get(RegisterId::X) - regs.get(r1));
            Ok(Effect::Sequential)
        }
        _ => Err(Fault::UnsupportedOpcode(opcode)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::SequenceDevice;
    use crate::memory::Memory;

    fn immediate(value: i32) -> DecodedOperand {
        DecodedOperand {
            mode: AddressingMode::Immediate,
            effective_address: truncate_word(value),
            instruction_length: 3,
        }
    }

    #[test]
    fn lda_immediate_sign_extends() {
        let mut regs = RegisterFile::new();
        let mut mem = Memory::new(16);
        let mut dev = SequenceDevice::new();
        let op = immediate(5);
        execute_f3f4(0x00, &mut regs, &mut mem, &mut dev, &op).unwrap();
        assert_eq!(regs.get(RegisterId::A), 5);
    }

    #[test]
    fn comp_immediate_sets_condition_code() {
        let mut regs = RegisterFile::new();
        regs.a = 5;
        let mut mem = Memory::new(16);
        let mut dev = SequenceDevice::new();
        let op = immediate(5);
        execute_f3f4(0x28, &mut regs, &mut mem, &mut dev, &op).unwrap();
        assert_eq!(regs.sw, 0);
    }

    #[test]
    fn div_by_zero_is_fatal() {
        let mut regs = RegisterFile::new();
        regs.a = 10;
        let mut mem = Memory::new(16);
        let mut dev = SequenceDevice::new();
        let op = immediate(0);
        assert!(matches!(
            execute_f3f4(0x24, &mut regs, &mut mem, &mut dev, &op),
            Err(Fault::DivideByZero)
        ));
    }

    #[test]
    fn div_sign_extends_a_negative_dividend() {
        let mut regs = RegisterFile::new();
        regs.set(RegisterId::A, -4);
        let mut mem = Memory::new(16);
        let mut dev = SequenceDevice::new();
        let op = immediate(2);
        execute_f3f4(0x24, &mut regs, &mut mem, &mut dev, &op).unwrap();
        assert_eq!(regs.get(RegisterId::A), -2);
    }

    #[test]
    fn tixr_wraps_and_sets_condition_code() {
        let mut regs = RegisterFile::new();
        regs.x = 0x00FF_FFFF;
        execute_f2(0xB8, 0x10, &mut regs).unwrap();
        assert_eq!(regs.get(RegisterId::X), 0);
        assert_eq!(regs.sw, 0);
    }

    #[test]
    fn jsub_sets_l_and_rsub_returns() {
        let mut regs = RegisterFile::new();
        regs.pc = 0x2000;
        let op = immediate(0x3000);
        let mut mem = Memory::new(0x4000);
        let mut dev = SequenceDevice::new();
        execute_f3f4(0x48, &mut regs, &mut mem, &mut dev, &op).unwrap();
        assert_eq!(regs.l, 0x2000);
        assert_eq!(regs.pc, 0x3000);
        execute_f3f4(0x4C, &mut regs, &mut mem, &mut dev, &op).unwrap();
        assert_eq!(regs.pc, 0x2000);
    }

    #[test]
    fn rd_reads_from_the_device_stream() {
        let mut regs = RegisterFile::new();
        let mut mem = Memory::new(16);
        let mut dev = SequenceDevice::new();
        let op = immediate(0);
        execute_f3f4(0xD8, &mut regs, &mut mem, &mut dev, &op).unwrap();
        assert_eq!(regs.a & 0xFF, 0xFF);
    }
}
