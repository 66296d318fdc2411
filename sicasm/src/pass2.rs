use crate::encoding::{self, Modification};
use crate::error::{Error, SemanticError};
use crate::intermediate::{Directive, IntermediateRecord, OpRef};
use crate::listing::ListingLine;
use crate::pass1::Pass1Output;
use sicobj::records::{ModificationRecord, ModificationSign, TextRecord};
use sicobj::Section;

/// Accumulates bytes for the text record currently being built. Flushed
/// explicitly (on `RESW`/`RESB`/`END`, or when the next chunk wouldn't
/// fit) rather than by watching for address discontinuities, since every
/// byte pass 2 ever pushes is already known to be address-contiguous.
struct TextBuffer {
    flush_addr: u32,
    buf: Vec<u8>,
}

impl TextBuffer {
    fn new(addr: u32) -> TextBuffer {
        TextBuffer { flush_addr: addr, buf: Vec::new() }
    }

    fn flush(&mut self) -> Option<TextRecord> {
        if self.buf.is_empty() {
            return None;
        }
        let record = TextRecord::new(self.flush_addr, std::mem::take(&mut self.buf))
            .expect("buffer capacity is enforced on push");
        Some(record)
    }

    fn restart(&mut self, addr: u32) -> Option<TextRecord> {
        let flushed = self.flush();
        self.flush_addr = addr;
        flushed
    }

    /// Appends `bytes` (which must start at `addr`), flushing first if
    /// they would overflow the current record.
    fn push(&mut self, addr: u32, bytes: &[u8]) -> Option<TextRecord> {
        let would_overflow = self.buf.len() + bytes.len() > sicobj::TEXT_RECORD_MAX;
        let flushed = if would_overflow {
            let f = self.flush();
            self.flush_addr = addr;
            f
        } else {
            None
        };
        self.buf.extend_from_slice(bytes);
        flushed
    }
}

/// Runs pass 2 over `pass1`'s output, producing the object section and a
/// listing. `source_name` is used only for listing headers.
pub fn run(pass1: &Pass1Output) -> Result<(Section, Vec<ListingLine>), Error> {
    let mut section = Section::new(pass1.program_name.clone(), pass1.start_addr, pass1.length);
    let mut listing = Vec::with_capacity(pass1.records.len());
    let mut text = TextBuffer::new(pass1.start_addr);
    let mut modifications: Vec<Modification> = Vec::new();
    let mut base: Option<u32> = None;
    let mut first_executable: Option<u32> = None;

    for record in &pass1.records {
        let IntermediateRecord { line_no, address, pc_after, line } = record;
        let line_no = *line_no;
        let address = *address;
        let pc_after = *pc_after;

        if line.is_comment() {
            listing.push(ListingLine::comment(line_no, &line.raw));
            continue;
        }

        let op_ref = line.op_ref.expect("non-comment lines carry an op_ref");
        let mut emitted = Vec::new();

        match op_ref {
            OpRef::Directive(Directive::Start) => {}
            OpRef::Directive(Directive::Base) => {
                base = Some(
                    pass1
                        .symbols
                        .find(&line.operand_text)
                        .ok_or_else(|| Error::Semantic {
                            line: line_no,
                            source: SemanticError::UndefinedSymbol(line.operand_text.clone()),
                        })?,
                );
            }
            OpRef::Directive(Directive::End) => {
                if let Some(flushed) = text.flush() {
                    section.texts.push(flushed);
                }
                for modification in modifications.drain(..) {
                    section.modifications.push(ModificationRecord {
                        addr: modification.address,
                        half_bytes: modification.half_bytes,
                        sign: ModificationSign::Plus,
                        index: 1,
                    });
                }
                let entry = first_executable.ok_or_else(|| Error::Semantic {
                    line: line_no,
                    source: SemanticError::MissingFirstExecutable,
                })?;
                section.entry = Some(entry);
            }
            OpRef::Directive(Directive::Resw) | OpRef::Directive(Directive::Resb) => {
                if let Some(flushed) = text.restart(pc_after) {
                    section.texts.push(flushed);
                }
            }
            OpRef::Directive(Directive::Byte) => {
                let bytes = crate::parser::parse_byte_literal(&line.operand_text)
                    .map_err(|e| Error::Parse { line: line_no, source: e })?;
                if let Some(flushed) = text.push(address, &bytes) {
                    section.texts.push(flushed);
                }
                emitted = bytes;
            }
            OpRef::Directive(Directive::Word) => {
                let value = crate::parser::parse_integer(&line.operand_text, false)
                    .map_err(|e| Error::Parse { line: line_no, source: e })?;
                let bytes = vec![
                    ((value >> 16) & 0xFF) as u8,
                    ((value >> 8) & 0xFF) as u8,
                    (value & 0xFF) as u8,
                ];
                if let Some(flushed) = text.push(address, &bytes) {
                    section.texts.push(flushed);
                }
                emitted = bytes;
            }
            OpRef::Opcode(entry) => {
                if first_executable.is_none() {
                    first_executable = Some(address);
                }
                let encoded = encoding::encode_instruction(
                    line_no,
                    entry,
                    line,
                    pc_after,
                    base,
                    &pass1.symbols,
                )?;
                if let Some(modification) = encoded.modification {
                    modifications.push(modification);
                }
                if let Some(flushed) = text.push(address, &encoded.bytes) {
                    section.texts.push(flushed);
                }
                emitted = encoded.bytes;
            }
        }

        listing.push(ListingLine::line(line_no, address, line, &emitted));
    }

    Ok((section, listing))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pass1;
    use sicvm::opcode::OpcodeTable;

    fn assemble(src: &str) -> (Section, Vec<ListingLine>) {
        let lines: Vec<String> = src.lines().map(|s| s.to_string()).collect();
        let pass1 = pass1::run(&lines, &OpcodeTable::default()).unwrap();
        run(&pass1).unwrap()
    }

    #[test]
    fn classic_retadr_program_produces_one_text_and_one_modification() {
        let (section, _listing) = assemble(
            "FIRST   START 1000\n\
             FIRST   STL   RETADR\n\
             RETADR  RESW  1\n\
                     END   FIRST",
        );
        assert_eq!(section.texts.len(), 1);
        assert_eq!(section.texts[0].addr, 0x1000);
        assert_eq!(section.entry, Some(0x1000));
    }

    #[test]
    fn end_without_an_instruction_is_an_error() {
        let lines: Vec<String> = "FIRST   START 1000\n\
                                   X       RESW  1\n\
                                           END   FIRST"
            .lines()
            .map(|s| s.to_string())
            .collect();
        let out = pass1::run(&lines, &OpcodeTable::default()).unwrap();
        assert!(matches!(
            run(&out),
            Err(Error::Semantic { source: SemanticError::MissingFirstExecutable, .. })
        ));
    }

    #[test]
    fn resw_flushes_and_leaves_a_hole() {
        let (section, _) = assemble(
            "FIRST   START 0\n\
             A       WORD  1\n\
             B       RESW  1\n\
             C       WORD  2\n\
                     END   A",
        );
        assert_eq!(section.texts.len(), 2);
        assert_eq!(section.texts[0].addr, 0);
        assert_eq!(section.texts[1].addr, 6);
    }
}
