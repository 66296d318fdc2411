use std::collections::HashMap;
use std::fmt;

/// The instruction formats this machine recognizes. Formats 3 and 4 share
/// one opcode byte; which of the two a given instance is comes from the
/// `e` bit in the instruction itself, never from the mnemonic table, so
/// they are carried as a single variant here.
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub enum OpcodeFormat {
    F1,
    F2,
    F3OrF4,
}

#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub struct OpcodeEntry {
    /// The opcode byte with its low two bits (n, i) already cleared.
    pub opcode: u8,
    pub format: OpcodeFormat,
}

#[derive(Debug)]
pub struct UnknownMnemonic(pub String);

impl fmt::Display for UnknownMnemonic {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "unrecognized mnemonic \"{}\"", self.0)
    }
}

impl std::error::Error for UnknownMnemonic {}

/// Maps mnemonics to their opcode byte and format. Populated once, at
/// startup, from the fixed instruction set this machine implements.
pub struct OpcodeTable {
    entries: HashMap<String, OpcodeEntry>,
}

impl OpcodeTable {
    pub fn lookup(&self, mnemonic: &str) -> Option<OpcodeEntry> {
        self.entries.get(mnemonic).copied()
    }

    pub fn contains(&self, mnemonic: &str) -> bool {
        self.entries.contains_key(mnemonic)
    }

    /// Builds the table from `name,format,opcode` lines such as those the
    /// original `opcode.c` table embeds, one entry per line. Later lines
    /// naming a mnemonic already present are ignored: first definition
    /// wins, matching how a hand-built lookup table would be populated.
    pub fn load_from_str(source: &str) -> Result<OpcodeTable, UnknownMnemonic> {
        let mut entries = HashMap::new();
        for line in source.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut fields = line.split(',').map(str::trim);
            let name = fields.next().ok_or_else(|| UnknownMnemonic(line.to_string()))?;
            let format = fields.next().ok_or_else(|| UnknownMnemonic(line.to_string()))?;
            let opcode = fields.next().ok_or_else(|| UnknownMnemonic(line.to_string()))?;
            let opcode = u8::from_str_radix(opcode, 16).map_err(|_| UnknownMnemonic(line.to_string()))?;
            let format = match format {
                "1" => OpcodeFormat::F1,
                "2" => OpcodeFormat::F2,
                "3/4" | "34" | "3" | "4" => OpcodeFormat::F3OrF4,
                _ => return Err(UnknownMnemonic(line.to_string())),
            };
            entries
                .entry(name.to_string())
                .or_insert(OpcodeEntry { opcode, format });
        }
        Ok(OpcodeTable { entries })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, OpcodeEntry)> {
        self.entries.iter().map(|(name, entry)| (name.as_str(), *entry))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Classifies a fetched opcode byte (already masked with `0xFC`) into its
/// instruction format, per the machine's fixed byte sets. Used by the
/// interpreter's fetch step, independent of the mnemonic table: the table
/// maps names the assembler sees, this maps bytes the interpreter fetches.
pub fn classify(opcode: u8) -> OpcodeFormat {
    const F1: [u8; 6] = [0xC0, 0xC4, 0xC8, 0xF0, 0xF4, 0xF8];
    const F2: [u8; 11] = [
        0x90, 0x94, 0x98, 0x9C, 0xA0, 0xA4, 0xA8, 0xAC, 0xB0, 0xB4, 0xB8,
    ];
    if F1.contains(&opcode) {
        OpcodeFormat::F1
    } else if F2.contains(&opcode) {
        OpcodeFormat::F2
    } else {
        OpcodeFormat::F3OrF4
    }
}

impl Default for OpcodeTable {
    /// The full SIC/XE mnemonic set this machine interprets. Opcodes the
    /// interpreter cannot execute (floating-point, SVC, privileged
    /// instructions) are deliberately left out of this table; the
    /// assembler that encounters them fails at encoding time instead of
    /// producing object code the interpreter would only fault on later.
    fn default() -> OpcodeTable {
        OpcodeTable::load_from_str(DEFAULT_OPCODES).expect("built-in opcode table is well-formed")
    }
}

const DEFAULT_OPCODES: &str = "\
ADD,3/4,18
ADDF,3/4,58
ADDR,2,90
AND,3/4,40
CLEAR,2,B4
COMP,3/4,28
COMPF,3/4,88
COMPR,2,A0
DIV,3/4,24
DIVF,3/4,64
DIVR,2,9C
J,3/4,3C
JEQ,3/4,30
JGT,3/4,34
JLT,3/4,38
JSUB,3/4,48
LDA,3/4,00
LDB,3/4,68
LDCH,3/4,50
LDF,3/4,70
LDL,3/4,08
LDS,3/4,6C
LDT,3/4,74
LDX,3/4,04
LPS,3/4,D0
MUL,3/4,20
MULF,3/4,60
MULR,2,98
OR,3/4,44
RD,3/4,D8
RMO,2,AC
RSUB,3/4,4C
SHIFTL,2,A4
SHIFTR,2,A8
SSK,3/4,EC
STA,3/4,0C
STB,3/4,78
STCH,3/4,54
STF,3/4,80
STI,3/4,D4
STL,3/4,14
STS,3/4,7C
STSW,3/4,E8
STT,3/4,84
STX,3/4,10
SUB,3/4,1C
SUBF,3/4,5C
SUBR,2,94
SVC,2,B0
TD,3/4,E0
TIO,1,F8
TIX,3/4,2C
TIXR,2,B8
WD,3/4,DC
";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_definition_wins_on_duplicate() {
        let table = OpcodeTable::load_from_str("ADD,3/4,18\nADD,3/4,FF\n").unwrap();
        assert_eq!(table.lookup("ADD").unwrap().opcode, 0x18);
    }

    #[test]
    fn default_table_carries_arithmetic_and_register_ops() {
        let table = OpcodeTable::default();
        assert_eq!(table.lookup("ADD").unwrap().format, OpcodeFormat::F3OrF4);
        assert_eq!(table.lookup("CLEAR").unwrap().format, OpcodeFormat::F2);
        assert_eq!(table.lookup("RSUB").unwrap().opcode, 0x4C);
        assert!(table.lookup("NOSUCHOP").is_none());
    }

    #[test]
    fn malformed_line_is_rejected() {
        assert!(OpcodeTable::load_from_str("ADD,3/4\n").is_err());
    }

    #[test]
    fn classify_matches_the_fixed_byte_sets() {
        assert_eq!(classify(0xC0), OpcodeFormat::F1);
        assert_eq!(classify(0xF8), OpcodeFormat::F1);
        assert_eq!(classify(0x90), OpcodeFormat::F2);
        assert_eq!(classify(0xB8), OpcodeFormat::F2);
        assert_eq!(classify(0x00), OpcodeFormat::F3OrF4);
        assert_eq!(classify(0x4C), OpcodeFormat::F3OrF4);
    }
}
