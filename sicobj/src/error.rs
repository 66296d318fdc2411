use std::fmt;
use std::io;

/// Something wrong with a single record's text, independent of which file
/// or line it came from.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct RecordError {
    pub line: String,
    pub reason: String,
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "malformed record \"{}\": {}", self.line, self.reason)
    }
}

impl std::error::Error for RecordError {}

impl RecordError {
    pub fn new(line: &str, reason: impl Into<String>) -> RecordError {
        RecordError {
            line: line.to_string(),
            reason: reason.into(),
        }
    }
}

/// Errors a section reader/writer can raise.
#[derive(Debug)]
pub enum ObjectError {
    Record(RecordError),
    Io(io::Error),
}

impl fmt::Display for ObjectError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ObjectError::Record(e) => write!(f, "{}", e),
            ObjectError::Io(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for ObjectError {}

impl From<RecordError> for ObjectError {
    fn from(e: RecordError) -> ObjectError {
        ObjectError::Record(e)
    }
}

impl From<io::Error> for ObjectError {
    fn from(e: io::Error) -> ObjectError {
        ObjectError::Io(e)
    }
}
