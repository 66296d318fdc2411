use crate::error::{Error, SemanticError};
use crate::intermediate::{OperandPrefix, ParsedLine};
use crate::parser;
use sicvm::opcode::OpcodeEntry;
use sicvm::register::RegisterId;
use sicvm::symbol::SymbolTable;
use std::str::FromStr;

/// A modification the loader must apply: this assembler only ever emits
/// the `+01` form (the reference is the section's own address).
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub struct Modification {
    pub address: u32,
    pub half_bytes: u32,
}

/// The 1-4 object bytes for one instruction, plus an optional
/// modification record if the operand was a symbolic extended address.
pub struct Encoded {
    pub bytes: Vec<u8>,
    pub modification: Option<Modification>,
}

fn resolve_operand_address(
    line_no: usize,
    operand: &str,
    symbols: &SymbolTable,
) -> Result<u32, Error> {
    symbols.find(operand).ok_or_else(|| Error::Semantic {
        line: line_no,
        source: SemanticError::UndefinedSymbol(operand.to_string()),
    })
}

/// Encodes a Format-1 instruction: just the opcode byte.
fn encode_f1(entry: OpcodeEntry) -> Encoded {
    Encoded {
        bytes: vec![entry.opcode],
        modification: None,
    }
}

/// Encodes a Format-2 instruction: `reg1[,reg2]`.
fn encode_f2(line_no: usize, entry: OpcodeEntry, operand_text: &str) -> Result<Encoded, Error> {
    let names = if operand_text.is_empty() {
        Vec::new()
    } else {
        parser::parse_register_list(operand_text).map_err(|e| Error::Parse { line: line_no, source: e })?
    };

    let reg = |name: &str| -> Result<RegisterId, Error> {
        RegisterId::from_str(name).map_err(|_| Error::Semantic {
            line: line_no,
            source: SemanticError::UnknownMnemonic(name.to_string()),
        })
    };

    let r1 = if let Some(name) = names.get(0) { reg(name)?.nibble() } else { 0 };
    let r2 = if let Some(name) = names.get(1) { reg(name)?.nibble() } else { 0 };

    Ok(Encoded {
        bytes: vec![entry.opcode, (r1 << 4) | r2],
        modification: None,
    })
}

/// Encodes a Format-3/4 instruction per the addressing rules in §4.5: the
/// no-operand form (`RSUB`), immediate/indirect/simple prefixes, and the
/// PC-relative/base-relative/extended displacement selection.
fn encode_f3f4(
    line_no: usize,
    entry: OpcodeEntry,
    line: &ParsedLine,
    pc_after: u32,
    base: Option<u32>,
    symbols: &SymbolTable,
) -> Result<Encoded, Error> {
    if line.operand_text.is_empty() {
        // No-operand form: n=i=1, displacement zero, no b/p/e.
        let byte0 = entry.opcode | 0x03;
        return Ok(Encoded {
            bytes: vec![byte0, 0x00, 0x00],
            modification: None,
        });
    }

    let (n, i) = match line.operand_prefix {
        Some(OperandPrefix::Immediate) => (false, true),
        Some(OperandPrefix::Indirect) => (true, false),
        None => (true, true),
    };
    let ni_bits = ((n as u8) << 1) | (i as u8);
    let byte0 = entry.opcode | ni_bits;

    let is_immediate_numeric = line.operand_prefix == Some(OperandPrefix::Immediate)
        && symbols.find(&line.operand_text).is_none();

    if line.extended {
        let (addr, modification) = if is_immediate_numeric {
            let value = parser::parse_integer(&line.operand_text, false)
                .map_err(|e| Error::Parse { line: line_no, source: e })?;
            (value as u32 & 0x000F_FFFF, None)
        } else {
            let addr = resolve_operand_address(line_no, &line.operand_text, symbols)?;
            (
                addr,
                Some(Modification {
                    address: pc_after - 3,
                    half_bytes: 5,
                }),
            )
        };

        let x_bit = if line.indexed { 0x80 } else { 0x00 };
        let byte1 = x_bit | 0x10 | ((addr >> 16) & 0x0F) as u8;
        let byte2 = ((addr >> 8) & 0xFF) as u8;
        let byte3 = (addr & 0xFF) as u8;
        return Ok(Encoded {
            bytes: vec![byte0, byte1, byte2, byte3],
            modification,
        });
    }

    // A numeric (non-symbolic) immediate carries no relocation: the
    // operand text itself is the absolute value placed in the
    // displacement field, with neither the `p` nor `b` bit set.
    let (disp, flags_byte) = if is_immediate_numeric {
        let value = parser::parse_integer(&line.operand_text, false)
            .map_err(|e| Error::Parse { line: line_no, source: e })?;
        if !(-0x800..=0x7FF).contains(&value) {
            return Err(Error::Semantic {
                line: line_no,
                source: SemanticError::DisplacementOutOfRange(value as i32),
            });
        }
        (value as i32 as u32 & 0x0FFF, 0x00u8)
    } else {
        let target = i64::from(resolve_operand_address(line_no, &line.operand_text, symbols)?);
        let pc_relative = target - i64::from(pc_after);
        if (-0x800..=0x7FF).contains(&pc_relative) {
            (pc_relative as i32 as u32 & 0x0FFF, 0x20u8)
        } else if let Some(base) = base {
            let base_relative = target - i64::from(base);
            if (0..=0x0FFF).contains(&base_relative) {
                (base_relative as u32, 0x40u8)
            } else {
                return Err(Error::Semantic {
                    line: line_no,
                    source: SemanticError::DisplacementOutOfRange(pc_relative as i32),
                });
            }
        } else {
            return Err(Error::Semantic {
                line: line_no,
                source: SemanticError::NegativeBase,
            });
        }
    };

    let x_bit = if line.indexed { 0x80 } else { 0x00 };
    let byte1 = x_bit | flags_byte | ((disp >> 8) & 0x0F) as u8;
    let byte2 = (disp & 0xFF) as u8;

    Ok(Encoded {
        bytes: vec![byte0, byte1, byte2],
        modification: None,
    })
}

/// Encodes one instruction line. `pc_after` is this line's post-increment
/// LOCCTR, used as the PC for PC-relative displacement arithmetic.
pub fn encode_instruction(
    line_no: usize,
    entry: OpcodeEntry,
    line: &ParsedLine,
    pc_after: u32,
    base: Option<u32>,
    symbols: &SymbolTable,
) -> Result<Encoded, Error> {
    use sicvm::opcode::OpcodeFormat;
    match entry.format {
        OpcodeFormat::F1 => Ok(encode_f1(entry)),
        OpcodeFormat::F2 => encode_f2(line_no, entry, &line.operand_text),
        OpcodeFormat::F3OrF4 => encode_f3f4(line_no, entry, line, pc_after, base, symbols),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intermediate::OpRef;
    use sicvm::opcode::{OpcodeFormat, OpcodeTable};

    fn line(operand: &str, prefix: Option<OperandPrefix>, extended: bool, indexed: bool) -> ParsedLine {
        ParsedLine {
            label: None,
            extended,
            op_ref: None,
            operand_prefix: prefix,
            operand_text: operand.to_string(),
            indexed,
            raw: String::new(),
        }
    }

    #[test]
    fn pc_relative_displacement_is_used_when_it_fits() {
        let opcodes = OpcodeTable::default();
        let entry = opcodes.lookup("STL").unwrap();
        let mut symbols = SymbolTable::new();
        symbols.define("RETADR", 0x1003).unwrap();
        let parsed = line("RETADR", None, false, false);
        let encoded = encode_instruction(1, entry, &parsed, 0x1003, None, &symbols).unwrap();
        assert_eq!(encoded.bytes, vec![0x17, 0x20, 0x00]);
        assert!(encoded.modification.is_none());
    }

    #[test]
    fn extended_symbolic_operand_emits_a_modification_record() {
        let opcodes = OpcodeTable::default();
        let entry = opcodes.lookup("LDT").unwrap();
        let mut symbols = SymbolTable::new();
        symbols.define("LENGTH", 0x1000).unwrap();
        let parsed = line("LENGTH", None, true, false);
        let encoded = encode_instruction(1, entry, &parsed, 0x1004, None, &symbols).unwrap();
        assert_eq!(encoded.bytes.len(), 4);
        assert_eq!(
            encoded.modification,
            Some(Modification { address: 0x1001, half_bytes: 5 })
        );
    }

    #[test]
    fn no_operand_form_sets_ni_and_zero_displacement() {
        let opcodes = OpcodeTable::default();
        let entry = opcodes.lookup("RSUB").unwrap();
        let symbols = SymbolTable::new();
        let parsed = line("", None, false, false);
        let encoded = encode_instruction(1, entry, &parsed, 0x1000, None, &symbols).unwrap();
        assert_eq!(encoded.bytes, vec![0x4F, 0x00, 0x00]);
    }

    #[test]
    fn immediate_absolute_operand_does_not_require_a_symbol() {
        let opcodes = OpcodeTable::default();
        let entry = opcodes.lookup("LDA").unwrap();
        let symbols = SymbolTable::new();
        let parsed = line("5", Some(OperandPrefix::Immediate), false, false);
        let encoded = encode_instruction(1, entry, &parsed, 0x1003, None, &symbols).unwrap();
        assert_eq!(encoded.bytes, vec![0x01, 0x00, 0x05]);
    }

    #[test]
    fn format2_register_pair_encodes_into_one_byte() {
        let opcodes = OpcodeTable::default();
        let entry = opcodes.lookup("COMPR").unwrap();
        let parsed = line("A,S", None, false, false);
        let encoded = encode_instruction(1, entry, &parsed, 0, None, &SymbolTable::new()).unwrap();
        assert_eq!(encoded.bytes, vec![0xA0, 0x04]);
    }
}
