use std::{error::Error, fmt};

/// Byte order used for every multi-byte value this workspace reads or writes.
pub type Endian = byteorder::BigEndian;

/// Error produced by a generated [`EnumFromStr`] implementation when the input
/// string does not name any variant.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct ParseEnumError {
    pub value: String,
    pub enum_name: &'static str,
}

impl fmt::Display for ParseEnumError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "\"{}\" is not a valid {}",
            &self.value, &self.enum_name
        )
    }
}

impl Error for ParseEnumError {}

/// Implemented by `#[derive(EnumFromStr)]` for fieldless enums: maps the
/// variant's identifier (verbatim) to the variant itself.
pub trait EnumFromStr: Sized {
    fn from_str(s: &str) -> Result<Self, ParseEnumError>;
}
