use crate::error::{Error, SemanticError};
use crate::intermediate::{Directive, IntermediateRecord, OpRef, OperandPrefix, ParsedLine};
use crate::parser::{self, Fields};
use sicvm::opcode::{OpcodeFormat, OpcodeTable};
use sicvm::symbol::SymbolTable;

/// What pass 1 hands to pass 2: every line in source order, the program's
/// starting address, its name, and its total length.
pub struct Pass1Output {
    pub records: Vec<IntermediateRecord>,
    pub program_name: String,
    pub start_addr: u32,
    pub length: u32,
    pub symbols: SymbolTable,
}

fn length_of(
    line_no: usize,
    fields: &Fields,
    op_ref: &OpRef,
) -> Result<u32, Error> {
    let err = |source: SemanticError| Error::Semantic { line: line_no, source };
    match op_ref {
        OpRef::Directive(Directive::Start) | OpRef::Directive(Directive::Base) | OpRef::Directive(Directive::End) => Ok(0),
        OpRef::Directive(Directive::Word) => {
            let value = parser::parse_integer(&fields.operand_text, false)
                .map_err(|e| Error::Parse { line: line_no, source: e })?;
            if !(-0x80_0000..=0x00FF_FFFF).contains(&value) {
                return Err(err(SemanticError::IntegerOutOfRange(value)));
            }
            Ok(3)
        }
        OpRef::Directive(Directive::Resw) => {
            let n = parser::parse_integer(&fields.operand_text, false)
                .map_err(|e| Error::Parse { line: line_no, source: e })?;
            Ok(3 * n as u32)
        }
        OpRef::Directive(Directive::Resb) => {
            let n = parser::parse_integer(&fields.operand_text, false)
                .map_err(|e| Error::Parse { line: line_no, source: e })?;
            Ok(n as u32)
        }
        OpRef::Directive(Directive::Byte) => {
            let bytes = parser::parse_byte_literal(&fields.operand_text)
                .map_err(|e| Error::Parse { line: line_no, source: e })?;
            Ok(bytes.len() as u32)
        }
        OpRef::Opcode(entry) => Ok(match entry.format {
            OpcodeFormat::F1 => 1,
            OpcodeFormat::F2 => 2,
            OpcodeFormat::F3OrF4 => {
                if fields.extended {
                    4
                } else {
                    3
                }
            }
        }),
    }
}

fn to_operand_prefix(prefix: Option<OperandPrefix>) -> Option<OperandPrefix> {
    prefix
}

/// Runs pass 1 over `source`: one line per string in `lines`. A line
/// beginning with `.` is a pass-through comment; every other line is
/// parsed and assigned an address.
pub fn run(lines: &[String], opcodes: &OpcodeTable) -> Result<Pass1Output, Error> {
    let mut records = Vec::with_capacity(lines.len());
    let mut symbols = SymbolTable::new();
    let mut program_name = String::new();
    let mut start_addr = 0u32;
    let mut locctr = 0u32;
    let mut started = false;

    for (idx, raw) in lines.iter().enumerate() {
        let line_no = idx + 1;

        if raw.trim_start().starts_with('.') {
            records.push(IntermediateRecord {
                line_no,
                address: locctr,
                pc_after: locctr,
                line: ParsedLine::comment(raw.clone()),
            });
            continue;
        }

        let fields = parser::parse_fields(raw)
            .map_err(|e| Error::Parse { line: line_no, source: e })?;

        let op_ref = if let Some(directive) = Directive::from_mnemonic(&fields.mnemonic) {
            OpRef::Directive(directive)
        } else if let Some(entry) = opcodes.lookup(&fields.mnemonic) {
            OpRef::Opcode(entry)
        } else {
            return Err(Error::Semantic {
                line: line_no,
                source: SemanticError::UnknownMnemonic(fields.mnemonic.clone()),
            });
        };

        if !started {
            match op_ref {
                OpRef::Directive(Directive::Start) => {
                    started = true;
                    start_addr = parser::parse_integer(&fields.operand_text, true)
                        .map_err(|e| Error::Parse { line: line_no, source: e })?
                        as u32;
                    locctr = start_addr;
                    program_name = fields.label.clone().unwrap_or_default();
                }
                _ => {
                    return Err(Error::Semantic {
                        line: line_no,
                        source: SemanticError::MissingStart,
                    });
                }
            }
        }

        if let Some(label) = &fields.label {
            if !matches!(op_ref, OpRef::Directive(Directive::Start)) {
                if symbols.contains(label) {
                    return Err(Error::Semantic {
                        line: line_no,
                        source: SemanticError::DuplicateSymbol(label.clone()),
                    });
                }
                symbols.define(label, locctr).expect("checked above");
            }
        }

        let is_loc_neutral = matches!(
            op_ref,
            OpRef::Directive(Directive::Start)
                | OpRef::Directive(Directive::Base)
                | OpRef::Directive(Directive::End)
        );
        let address = locctr;
        let pc_after = if is_loc_neutral {
            locctr
        } else {
            locctr + length_of(line_no, &fields, &op_ref)?
        };

        records.push(IntermediateRecord {
            line_no,
            address,
            pc_after,
            line: ParsedLine {
                label: fields.label.clone(),
                extended: fields.extended,
                op_ref: Some(op_ref),
                operand_prefix: to_operand_prefix(fields.operand_prefix),
                operand_text: fields.operand_text.clone(),
                indexed: fields.indexed,
                raw: raw.clone(),
            },
        });

        log::trace!("line {}: LOCCTR {:#07X} -> {:#07X}", line_no, address, pc_after);
        locctr = pc_after;
    }

    if !started {
        return Err(Error::Semantic {
            line: lines.len().max(1),
            source: SemanticError::MissingStart,
        });
    }

    Ok(Pass1Output {
        records,
        program_name,
        start_addr,
        length: locctr - start_addr,
        symbols,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(src: &str) -> Vec<String> {
        src.lines().map(|s| s.to_string()).collect()
    }

    #[test]
    fn assigns_addresses_and_computes_program_length() {
        let src = lines(
            "FIRST   START 1000\n\
             FIRST   STL   RETADR\n\
             RETADR  RESW  1\n\
                     END   FIRST",
        );
        let out = pass1_default(&src);
        assert_eq!(out.start_addr, 0x1000);
        assert_eq!(out.length, 6);
        assert_eq!(out.symbols.find("RETADR"), Some(0x1003));
    }

    #[test]
    fn missing_start_is_an_error() {
        let src = lines("        LDA   #5");
        assert!(matches!(
            run(&src, &OpcodeTable::default()),
            Err(Error::Semantic { source: SemanticError::MissingStart, .. })
        ));
    }

    #[test]
    fn duplicate_label_is_an_error() {
        let src = lines(
            "FIRST   START 0\n\
             A       RESB  1\n\
             A       RESB  1",
        );
        assert!(matches!(
            run(&src, &OpcodeTable::default()),
            Err(Error::Semantic { source: SemanticError::DuplicateSymbol(_), .. })
        ));
    }

    #[test]
    fn word_out_of_range_is_rejected() {
        let src = lines("FIRST   START 0\n        WORD  99999999");
        assert!(matches!(
            run(&src, &OpcodeTable::default()),
            Err(Error::Semantic { source: SemanticError::IntegerOutOfRange(_), .. })
        ));
    }

    fn pass1_default(src: &[String]) -> Pass1Output {
        run(src, &OpcodeTable::default()).unwrap()
    }
}
