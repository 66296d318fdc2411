//! Two-pass linking loader: relocates 1-3 parsed object sections into a
//! shared memory image, resolves cross-section references, and seeds the
//! program counter from the last `E` record encountered.

pub mod error;
pub mod linkmap;

use error::Error;
use linkmap::{LinkMap, LinkMapEntry};
use sicobj::records::ModificationSign;
use sicobj::Section;
use sicvm::memory::Storage;
use sicvm::symbol::SymbolTable;

/// A section's placement in the target image, computed by pass 1 and
/// consumed by pass 2: `csaddr` is where the section actually lands;
/// `file_start` is the `start_addr` it carried in its own object file, so
/// pass 2 can rebase its (absolute, file-relative) addresses onto `csaddr`.
struct Placement {
    csaddr: u32,
    file_start: u32,
}

/// Lays out `sections` back to back starting at `prog_addr`, inserting
/// every control-section name and `EXTDEF` into `symbols`. Mirrors the
/// assembler's all-or-nothing duplicate handling: the first colliding name
/// aborts the whole load.
fn place_sections(
    sections: &[Section],
    prog_addr: u32,
    symbols: &mut SymbolTable,
    image_length: u32,
) -> Result<Vec<Placement>, Error> {
    let mut placements = Vec::with_capacity(sections.len());
    let mut csaddr = prog_addr;

    for section in sections {
        let end = csaddr
            .checked_add(section.length)
            .filter(|&end| end <= image_length)
            .ok_or_else(|| Error::ImageOverflow {
                section: section.name.clone(),
                end: csaddr.saturating_add(section.length),
            })?;

        symbols
            .define(&section.name, csaddr)
            .map_err(|e| Error::DuplicateSection(e.0))?;
        for define in &section.defines {
            symbols
                .define(&define.name, csaddr + define.offset)
                .map_err(|e| Error::DuplicateDefine(e.0))?;
        }

        log::debug!("section {} loads at {:#07X}, length {:#X}", section.name, csaddr, section.length);
        placements.push(Placement { csaddr, file_start: section.start });
        csaddr = end;
    }

    Ok(placements)
}

/// Resolves one modification record's addend: index 1 always means "this
/// section's own load address"; any other index is looked up by name in
/// the section's `R` table, then in the shared symbol table.
fn resolve_reference(
    section: &Section,
    placement: &Placement,
    index: u32,
    symbols: &SymbolTable,
) -> Result<u32, Error> {
    if index == 1 {
        return Ok(placement.csaddr);
    }
    let name = section
        .reference_name(index)
        .ok_or_else(|| Error::UndefinedReference(format!("reference index {:#04X}", index)))?;
    symbols
        .find(name)
        .ok_or_else(|| Error::UndefinedReference(name.to_string()))
}

/// Copies every section's text bytes into `memory` and applies its
/// modification records, returning the seeded entry address (from the
/// last `E` record encountered) and a link map for reporting.
fn apply_sections<S: Storage>(
    sections: &[Section],
    placements: &[Placement],
    memory: &mut S,
    symbols: &SymbolTable,
) -> Result<(Option<u32>, LinkMap), Error> {
    let mut entry_pc = None;
    let mut entries = Vec::with_capacity(sections.len());

    for (section, placement) in sections.iter().zip(placements) {
        for text in &section.texts {
            let dest = placement.csaddr + (text.addr - placement.file_start);
            memory
                .borrow_slice_mut(dest, text.bytes.len() as u32)?
                .copy_from_slice(&text.bytes);
        }

        for modification in &section.modifications {
            let dest = placement.csaddr + (modification.addr - placement.file_start);
            let existing = memory.read(dest, 3)?;
            let addend = resolve_reference(section, placement, modification.index, symbols)?;
            let updated = match modification.sign {
                ModificationSign::Plus => existing.wrapping_add(addend),
                ModificationSign::Minus => existing.wrapping_sub(addend),
            };
            memory.write(dest, 3, updated & 0x00FF_FFFF)?;
        }

        if let Some(entry) = section.entry {
            entry_pc = Some(placement.csaddr + (entry - placement.file_start));
        }

        entries.push(LinkMapEntry {
            name: section.name.clone(),
            address: placement.csaddr,
            length: section.length,
            defines: section
                .defines
                .iter()
                .map(|d| (d.name.clone(), placement.csaddr + d.offset))
                .collect(),
        });
    }

    Ok((entry_pc, LinkMap::new(entries)))
}

/// Runs both loader passes: lays `sections` out from `prog_addr`, applies
/// every modification, and returns the resulting entry address (if any
/// section carried an `E` record) plus a link map for display.
pub fn load<S: Storage>(
    sections: &[Section],
    prog_addr: u32,
    memory: &mut S,
    symbols: &mut SymbolTable,
) -> Result<(Option<u32>, LinkMap), Error> {
    let placements = place_sections(sections, prog_addr, symbols, memory.length())?;
    apply_sections(sections, &placements, memory, symbols)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sicobj::records::{Define, ModificationRecord, Refer, TextRecord};
    use sicvm::memory::Memory;

    #[test]
    fn single_section_loads_at_progaddr_and_seeds_pc() {
        let mut section = Section::new("FIRST", 0, 6);
        section.texts.push(TextRecord::new(0, vec![0; 6]).unwrap());
        section.entry = Some(0);

        let mut memory = Memory::new(0x4000);
        let mut symbols = SymbolTable::new();
        let (entry, _map) = load(&[section], 0x3000, &mut memory, &mut symbols).unwrap();

        assert_eq!(memory.data()[0x3000..0x3006], [0u8; 6]);
        assert_eq!(entry, Some(0x3000));
    }

    #[test]
    fn cross_section_modification_adds_the_defined_offset() {
        let mut a = Section::new("A", 0, 10);
        a.refers.push(Refer { index: 2, name: "SUB".to_string() });
        a.texts.push(TextRecord::new(0, vec![0, 0, 0]).unwrap());
        a.modifications.push(ModificationRecord {
            addr: 3,
            half_bytes: 5,
            sign: ModificationSign::Plus,
            index: 2,
        });
        a.entry = Some(0);

        let mut b = Section::new("B", 0, 6);
        b.defines.push(Define { name: "SUB".to_string(), offset: 4 });
        b.texts.push(TextRecord::new(0, vec![0; 6]).unwrap());

        let mut memory = Memory::new(0x10000);
        let mut symbols = SymbolTable::new();
        load(&[a, b], 0x4000, &mut memory, &mut symbols).unwrap();

        let value = memory.read(0x4003, 3).unwrap();
        assert_eq!(value, 0x4000 + 10 + 4);
    }

    #[test]
    fn duplicate_section_name_is_fatal() {
        let a = Section::new("DUP", 0, 2);
        let b = Section::new("DUP", 0, 2);
        let mut memory = Memory::new(0x100);
        let mut symbols = SymbolTable::new();
        assert!(matches!(
            load(&[a, b], 0, &mut memory, &mut symbols),
            Err(Error::DuplicateSection(_))
        ));
    }

    #[test]
    fn overflowing_the_image_is_fatal() {
        let section = Section::new("BIG", 0, 0x100);
        let mut memory = Memory::new(0x80);
        let mut symbols = SymbolTable::new();
        assert!(matches!(
            load(&[section], 0, &mut memory, &mut symbols),
            Err(Error::ImageOverflow { .. })
        ));
    }
}
