//! The textual object file format this workspace's assembler emits and
//! its loader consumes: `H`/`D`/`R`/`T`/`M`/`E` ASCII line records.

pub mod error;
pub mod records;

use error::{ObjectError, RecordError};
use records::{
    Define, DefineRecord, EndRecord, HeaderRecord, ModificationRecord, Refer, ReferRecord,
    TextRecord,
};
use std::io::{BufRead, Write};

/// Maximum payload of a single `T` record.
pub const TEXT_RECORD_MAX: usize = 0x1E;

/// One control section: the parsed form of everything between a program's
/// `H` record and its (optional) `E` record.
#[derive(Clone, Eq, PartialEq, Debug, Default)]
pub struct Section {
    pub name: String,
    pub start: u32,
    pub length: u32,
    pub defines: Vec<Define>,
    pub refers: Vec<Refer>,
    pub texts: Vec<TextRecord>,
    pub modifications: Vec<ModificationRecord>,
    pub entry: Option<u32>,
}

impl Section {
    pub fn new(name: impl Into<String>, start: u32, length: u32) -> Section {
        Section {
            name: name.into(),
            start,
            length,
            ..Section::default()
        }
    }

    /// Resolves reference index 1 (the section's own address) or looks up
    /// a higher index in the `R` table by name; the caller resolves that
    /// name against the loader's shared symbol table.
    pub fn reference_name(&self, index: u32) -> Option<&str> {
        if index == 1 {
            Some(self.name.as_str())
        } else {
            self.refers
                .iter()
                .find(|r| r.index == index)
                .map(|r| r.name.as_str())
        }
    }
}

/// Reads one section's worth of records from `reader`, stopping after an
/// `E` record or at end of input. Blank lines are skipped.
pub fn read_section<R: BufRead>(reader: &mut R) -> Result<Section, ObjectError> {
    let mut header: Option<HeaderRecord> = None;
    let mut section = Section::default();
    let mut line = String::new();

    loop {
        line.clear();
        let bytes_read = reader.read_line(&mut line)?;
        if bytes_read == 0 {
            break;
        }
        let trimmed = line.trim_end_matches(|c| c == '\r' || c == '\n');
        if trimmed.is_empty() {
            continue;
        }

        log::trace!("record: {}", trimmed);
        match trimmed.chars().next() {
            Some('H') => {
                let rec = HeaderRecord::parse(trimmed)?;
                section.name = rec.name.clone();
                section.start = rec.start;
                section.length = rec.length;
                header = Some(rec);
            }
            Some('D') => {
                section.defines.extend(DefineRecord::parse(trimmed)?.defines);
            }
            Some('R') => {
                section.refers.extend(ReferRecord::parse(trimmed)?.refers);
            }
            Some('T') => {
                section.texts.push(TextRecord::parse(trimmed)?);
            }
            Some('M') => {
                section.modifications.push(ModificationRecord::parse(trimmed)?);
            }
            Some('E') => {
                section.entry = Some(EndRecord::parse(trimmed)?.entry);
                break;
            }
            _ => return Err(RecordError::new(trimmed, "unrecognized record type").into()),
        }
    }

    if header.is_none() {
        return Err(RecordError::new("", "object stream has no H record").into());
    }
    Ok(section)
}

/// Writes a section's records in the canonical order: `H`, `D`, `R`,
/// every `T` in address order, every `M` in insertion order, then `E` if
/// present.
pub fn write_section<W: Write>(writer: &mut W, section: &Section) -> Result<(), ObjectError> {
    writeln!(
        writer,
        "{}",
        HeaderRecord {
            name: section.name.clone(),
            start: section.start,
            length: section.length,
        }
        .format()
    )?;

    if !section.defines.is_empty() {
        writeln!(
            writer,
            "{}",
            DefineRecord {
                defines: section.defines.clone()
            }
            .format()
        )?;
    }
    if !section.refers.is_empty() {
        writeln!(
            writer,
            "{}",
            ReferRecord {
                refers: section.refers.clone()
            }
            .format()
        )?;
    }
    for text in &section.texts {
        writeln!(writer, "{}", text.format())?;
    }
    for modification in &section.modifications {
        writeln!(writer, "{}", modification.format())?;
    }
    if let Some(entry) = section.entry {
        writeln!(writer, "{}", EndRecord { entry }.format())?;
    }
    Ok(())
}
