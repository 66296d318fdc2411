use pest::error::Error as PestError;
use std::fmt;
use std::io;

use crate::parser::Rule;

/// A syntactic problem with one source line: malformed field structure,
/// a number that doesn't parse, or an odd hex-digit count.
#[derive(Debug)]
pub enum ParseError {
    Pest(PestError<Rule>),
    Number(String),
    LineTooLong(usize),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ParseError::Pest(e) => write!(f, "{}", e),
            ParseError::Number(text) => write!(f, "\"{}\" is not a valid number", text),
            ParseError::LineTooLong(n) => write!(f, "line {} has no terminating newline", n),
        }
    }
}

impl From<PestError<Rule>> for ParseError {
    fn from(e: PestError<Rule>) -> ParseError {
        ParseError::Pest(e)
    }
}

/// A problem discovered after a line parses cleanly: an undefined or
/// duplicate symbol, an unknown mnemonic, an out-of-range integer, or an
/// addressing mode that can't be encoded.
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum SemanticError {
    DuplicateSymbol(String),
    UndefinedSymbol(String),
    UnknownMnemonic(String),
    IntegerOutOfRange(i64),
    MissingStart,
    MissingFirstExecutable,
    DisplacementOutOfRange(i32),
    NegativeBase,
}

impl fmt::Display for SemanticError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SemanticError::DuplicateSymbol(s) => write!(f, "symbol \"{}\" is already defined", s),
            SemanticError::UndefinedSymbol(s) => write!(f, "undefined symbol \"{}\"", s),
            SemanticError::UnknownMnemonic(s) => write!(f, "unknown mnemonic \"{}\"", s),
            SemanticError::IntegerOutOfRange(n) => write!(f, "integer {} is out of range", n),
            SemanticError::MissingStart => write!(f, "program does not begin with START"),
            SemanticError::MissingFirstExecutable => {
                write!(f, "END names no instruction: program has no first executable address")
            }
            SemanticError::DisplacementOutOfRange(d) => {
                write!(f, "displacement {} fits neither PC-relative nor base-relative range", d)
            }
            SemanticError::NegativeBase => write!(f, "BASE-relative addressing used with no base set"),
        }
    }
}

/// Everything one `assemble` invocation can fail with.
#[derive(Debug)]
pub enum Error {
    Parse { line: usize, source: ParseError },
    Semantic { line: usize, source: SemanticError },
    Io(io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Parse { line, source } => write!(f, "{}: Error: {}", line, source),
            Error::Semantic { line, source } => write!(f, "{}: Error: {}", line, source),
            Error::Io(e) => write!(f, "Error: {}", e),
        }
    }
}

impl std::error::Error for Error {}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Error {
        Error::Io(e)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
