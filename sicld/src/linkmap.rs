use std::fmt;

/// One control section's placement, plus the addresses its `EXTDEF`s
/// resolved to, for the report printed after a successful load.
#[derive(Clone, Debug)]
pub struct LinkMapEntry {
    pub name: String,
    pub address: u32,
    pub length: u32,
    pub defines: Vec<(String, u32)>,
}

/// The report printed after `loader`: one header row per section, one row
/// per external definition beneath it, then a trailing total-length line.
#[derive(Clone, Debug)]
pub struct LinkMap {
    pub entries: Vec<LinkMapEntry>,
}

impl LinkMap {
    pub fn new(entries: Vec<LinkMapEntry>) -> LinkMap {
        LinkMap { entries }
    }

    pub fn total_length(&self) -> u32 {
        self.entries.iter().map(|e| e.length).sum()
    }
}

impl fmt::Display for LinkMap {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for entry in &self.entries {
            writeln!(f, "{:<6} {:06X} {:06X}", entry.name, entry.address, entry.length)?;
            for (name, address) in &entry.defines {
                writeln!(f, "  {:<6} {:06X}", name, address)?;
            }
        }
        write!(f, "total length {:06X}", self.total_length())
    }
}
