use sicvm::memory::AddressError;
use std::fmt;
use std::io;

/// Everything one `loader` invocation can fail with.
#[derive(Debug)]
pub enum Error {
    Object(sicobj::error::ObjectError),
    DuplicateSection(String),
    DuplicateDefine(String),
    UndefinedReference(String),
    ImageOverflow { section: String, end: u32 },
    Address(AddressError),
    Io(io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Object(e) => write!(f, "Error: {}", e),
            Error::DuplicateSection(name) => {
                write!(f, "Error: control section \"{}\" is already defined", name)
            }
            Error::DuplicateDefine(name) => {
                write!(f, "Error: external symbol \"{}\" is already defined", name)
            }
            Error::UndefinedReference(name) => {
                write!(f, "Error: undefined external reference \"{}\"", name)
            }
            Error::ImageOverflow { section, end } => write!(
                f,
                "Error: control section \"{}\" would end at {:#07X}, past the end of memory",
                section, end
            ),
            Error::Address(e) => write!(f, "Error: {}", e),
            Error::Io(e) => write!(f, "Error: {}", e),
        }
    }
}

impl std::error::Error for Error {}

impl From<sicobj::error::ObjectError> for Error {
    fn from(e: sicobj::error::ObjectError) -> Error {
        Error::Object(e)
    }
}

impl From<AddressError> for Error {
    fn from(e: AddressError) -> Error {
        Error::Address(e)
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Error {
        Error::Io(e)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
