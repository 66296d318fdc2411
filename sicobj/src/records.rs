use crate::error::RecordError;

const NAME_WIDTH: usize = 6;

/// Pads or truncates `name` to the fixed six-character field every record
/// that names a section or symbol uses.
pub fn pad_name(name: &str) -> String {
    let mut padded = name.to_string();
    if padded.len() > NAME_WIDTH {
        padded.truncate(NAME_WIDTH);
    } else {
        while padded.len() < NAME_WIDTH {
            padded.push(' ');
        }
    }
    padded
}

fn hex_field(line: &str, start: usize, len: usize) -> Result<&str, RecordError> {
    line.get(start..start + len)
        .ok_or_else(|| RecordError::new(line, "record is shorter than its fixed-width fields"))
}

fn parse_hex_u32(line: &str, field: &str) -> Result<u32, RecordError> {
    u32::from_str_radix(field.trim(), 16)
        .map_err(|_| RecordError::new(line, format!("\"{}\" is not valid hex", field)))
}

fn parse_hex_usize(line: &str, field: &str) -> Result<usize, RecordError> {
    parse_hex_u32(line, field).map(|v| v as usize)
}

/// One `Header` record: names the control section and its assigned
/// starting address and length.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct HeaderRecord {
    pub name: String,
    pub start: u32,
    pub length: u32,
}

impl HeaderRecord {
    pub fn parse(line: &str) -> Result<HeaderRecord, RecordError> {
        if !line.starts_with('H') {
            return Err(RecordError::new(line, "expected H record"));
        }
        let name = hex_field(line, 1, NAME_WIDTH)?.trim_end().to_string();
        let start = parse_hex_u32(line, hex_field(line, 7, 6)?)?;
        let length = parse_hex_u32(line, hex_field(line, 13, 6)?)?;
        Ok(HeaderRecord { name, start, length })
    }

    pub fn format(&self) -> String {
        format!(
            "H{}{:06X}{:06X}",
            pad_name(&self.name),
            self.start,
            self.length
        )
    }
}

/// One external definition: a symbol name exported at an offset from the
/// section's start.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct Define {
    pub name: String,
    pub offset: u32,
}

/// A `Define` record carries one or more [`Define`] entries.
#[derive(Clone, Eq, PartialEq, Debug, Default)]
pub struct DefineRecord {
    pub defines: Vec<Define>,
}

impl DefineRecord {
    pub fn parse(line: &str) -> Result<DefineRecord, RecordError> {
        if !line.starts_with('D') {
            return Err(RecordError::new(line, "expected D record"));
        }
        let body = &line[1..];
        let entry_width = NAME_WIDTH + 6;
        if body.len() % entry_width != 0 {
            return Err(RecordError::new(line, "D record body is not a whole number of entries"));
        }
        let mut defines = Vec::new();
        for chunk in body.as_bytes().chunks(entry_width) {
            let chunk = std::str::from_utf8(chunk).unwrap();
            let name = chunk[..NAME_WIDTH].trim_end().to_string();
            let offset = parse_hex_u32(line, &chunk[NAME_WIDTH..])?;
            defines.push(Define { name, offset });
        }
        Ok(DefineRecord { defines })
    }

    pub fn format(&self) -> String {
        let mut out = String::from("D");
        for define in &self.defines {
            out.push_str(&pad_name(&define.name));
            out.push_str(&format!("{:06X}", define.offset));
        }
        out
    }
}

/// One external reference: an index this section's modification records
/// use to mean a particular external name.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct Refer {
    pub index: u32,
    pub name: String,
}

/// A `Refer` record carries one or more [`Refer`] entries, index ≥ 2
/// (index 1 is reserved to mean "this section").
#[derive(Clone, Eq, PartialEq, Debug, Default)]
pub struct ReferRecord {
    pub refers: Vec<Refer>,
}

impl ReferRecord {
    pub fn parse(line: &str) -> Result<ReferRecord, RecordError> {
        if !line.starts_with('R') {
            return Err(RecordError::new(line, "expected R record"));
        }
        let body = &line[1..];
        let entry_width = 2 + NAME_WIDTH;
        if body.len() % entry_width != 0 {
            return Err(RecordError::new(line, "R record body is not a whole number of entries"));
        }
        let mut refers = Vec::new();
        for chunk in body.as_bytes().chunks(entry_width) {
            let chunk = std::str::from_utf8(chunk).unwrap();
            let index = parse_hex_u32(line, &chunk[..2])?;
            if index < 2 {
                return Err(RecordError::new(line, "reference index must be >= 2"));
            }
            let name = chunk[2..].trim_end().to_string();
            refers.push(Refer { index, name });
        }
        Ok(ReferRecord { refers })
    }

    pub fn format(&self) -> String {
        let mut out = String::from("R");
        for refer in &self.refers {
            out.push_str(&format!("{:02X}", refer.index));
            out.push_str(&pad_name(&refer.name));
        }
        out
    }
}

/// One `Text` record: a run of object bytes destined for
/// `section_addr + addr`. `bytes.len() <= 0x1E`, enforced at construction.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct TextRecord {
    pub addr: u32,
    pub bytes: Vec<u8>,
}

impl TextRecord {
    pub const MAX_BYTES: usize = crate::TEXT_RECORD_MAX;

    pub fn new(addr: u32, bytes: Vec<u8>) -> Result<TextRecord, RecordError> {
        if bytes.len() > Self::MAX_BYTES {
            return Err(RecordError::new(
                "",
                format!("text record of {} bytes exceeds the {} byte limit", bytes.len(), Self::MAX_BYTES),
            ));
        }
        Ok(TextRecord { addr, bytes })
    }

    pub fn parse(line: &str) -> Result<TextRecord, RecordError> {
        if !line.starts_with('T') {
            return Err(RecordError::new(line, "expected T record"));
        }
        let addr = parse_hex_u32(line, hex_field(line, 1, 6)?)?;
        let len = parse_hex_usize(line, hex_field(line, 7, 2)?)?;
        let hex_body = hex_field(line, 9, len * 2)?;
        let mut bytes = Vec::with_capacity(len);
        for i in 0..len {
            let byte = u8::from_str_radix(&hex_body[i * 2..i * 2 + 2], 16)
                .map_err(|_| RecordError::new(line, "invalid hex byte in T record"))?;
            bytes.push(byte);
        }
        TextRecord::new(addr, bytes)
    }

    pub fn format(&self) -> String {
        let mut hex = String::with_capacity(self.bytes.len() * 2);
        for byte in &self.bytes {
            hex.push_str(&format!("{:02X}", byte));
        }
        format!("T{:06X}{:02X}{}", self.addr, self.bytes.len(), hex)
    }
}

#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub enum ModificationSign {
    Plus,
    Minus,
}

impl ModificationSign {
    pub fn as_char(self) -> char {
        match self {
            ModificationSign::Plus => '+',
            ModificationSign::Minus => '-',
        }
    }
}

/// One `Modification` record: at load time, add or subtract the value
/// named by `index` (via the section's `R` table) to/from the 24-bit
/// field at `addr`.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct ModificationRecord {
    pub addr: u32,
    pub half_bytes: u32,
    pub sign: ModificationSign,
    pub index: u32,
}

impl ModificationRecord {
    pub fn parse(line: &str) -> Result<ModificationRecord, RecordError> {
        if !line.starts_with('M') {
            return Err(RecordError::new(line, "expected M record"));
        }
        let addr = parse_hex_u32(line, hex_field(line, 1, 6)?)?;
        let half_bytes = parse_hex_u32(line, hex_field(line, 7, 2)?)?;
        let sign_char = hex_field(line, 9, 1)?;
        let sign = match sign_char {
            "+" => ModificationSign::Plus,
            "-" => ModificationSign::Minus,
            _ => return Err(RecordError::new(line, "modification sign must be + or -")),
        };
        let index = parse_hex_u32(line, hex_field(line, 10, 2)?)?;
        Ok(ModificationRecord {
            addr,
            half_bytes,
            sign,
            index,
        })
    }

    pub fn format(&self) -> String {
        format!(
            "M{:06X}{:02X}{}{:02X}",
            self.addr,
            self.half_bytes,
            self.sign.as_char(),
            self.index
        )
    }
}

/// The optional `End` record naming the section's entry point, relative
/// to its own start.
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub struct EndRecord {
    pub entry: u32,
}

impl EndRecord {
    pub fn parse(line: &str) -> Result<EndRecord, RecordError> {
        if !line.starts_with('E') {
            return Err(RecordError::new(line, "expected E record"));
        }
        let entry = parse_hex_u32(line, hex_field(line, 1, 6)?)?;
        Ok(EndRecord { entry })
    }

    pub fn format(&self) -> String {
        format!("E{:06X}", self.entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_round_trips() {
        let rec = HeaderRecord {
            name: "FIRST".to_string(),
            start: 0x1000,
            length: 0x002A,
        };
        let line = rec.format();
        assert_eq!(line, "HFIRST 00100000002A");
        assert_eq!(HeaderRecord::parse(&line).unwrap(), rec);
    }

    #[test]
    fn define_and_refer_round_trip_multiple_entries() {
        let defines = DefineRecord {
            defines: vec![
                Define { name: "LISTA".to_string(), offset: 0x002D },
                Define { name: "ENDOFLIST".to_string(), offset: 0x0054 },
            ],
        };
        let line = defines.format();
        assert_eq!(DefineRecord::parse(&line).unwrap().defines[0].name, "LISTA");
        assert_eq!(DefineRecord::parse(&line).unwrap().defines[1].offset, 0x0054);

        let refers = ReferRecord {
            refers: vec![Refer { index: 2, name: "SUB".to_string() }],
        };
        let line = refers.format();
        assert_eq!(ReferRecord::parse(&line).unwrap(), refers);
    }

    #[test]
    fn refer_index_below_two_is_rejected() {
        assert!(ReferRecord::parse("R01SUB   ").is_err());
    }

    #[test]
    fn text_record_round_trips() {
        let rec = TextRecord::new(0x1000, vec![0x17, 0x20, 0x2D]).unwrap();
        let line = rec.format();
        assert_eq!(line, "T0010000317202D");
        assert_eq!(TextRecord::parse(&line).unwrap(), rec);
    }

    #[test]
    fn text_record_over_limit_is_rejected() {
        assert!(TextRecord::new(0, vec![0u8; 0x1F]).is_err());
    }

    #[test]
    fn modification_round_trips() {
        let rec = ModificationRecord {
            addr: 0x1001,
            half_bytes: 5,
            sign: ModificationSign::Plus,
            index: 1,
        };
        let line = rec.format();
        assert_eq!(line, "M00100105+01");
        assert_eq!(ModificationRecord::parse(&line).unwrap(), rec);
    }

    #[test]
    fn end_round_trips() {
        let rec = EndRecord { entry: 0x1000 };
        let line = rec.format();
        assert_eq!(line, "E001000");
        assert_eq!(EndRecord::parse(&line).unwrap(), rec);
    }

    #[test]
    fn pad_name_fills_to_six_characters() {
        assert_eq!(pad_name("A"), "A     ");
        assert_eq!(pad_name("SIXCHR"), "SIXCHR");
    }
}
