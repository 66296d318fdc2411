pub mod encoding;
pub mod error;
pub mod intermediate;
pub mod listing;
pub mod parser;
pub mod pass1;
pub mod pass2;

use error::Error;
use listing::ListingLine;
use sicobj::Section;
use sicvm::opcode::OpcodeTable;

/// Assembles `source` (one string per line) against `opcodes`, returning
/// the finished object section and its listing. This is the single entry
/// point both the CLI and the test suite drive pass 1 and pass 2 through.
pub fn assemble(lines: &[String], opcodes: &OpcodeTable) -> Result<(Section, Vec<ListingLine>), Error> {
    let pass1_out = pass1::run(lines, opcodes)?;
    pass2::run(&pass1_out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assembles_the_classic_retadr_program() {
        let lines: Vec<String> = "FIRST   START 1000\n\
                                   FIRST   STL   RETADR\n\
                                   RETADR  RESW  1\n\
                                           END   FIRST"
            .lines()
            .map(|s| s.to_string())
            .collect();
        let (section, listing) = assemble(&lines, &OpcodeTable::default()).unwrap();
        assert_eq!(section.name, "FIRST");
        assert_eq!(section.entry, Some(0x1000));
        assert_eq!(listing.len(), 4);
    }
}
