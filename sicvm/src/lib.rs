//! Memory image, register file, opcode table, and instruction-level
//! interpreter for the SIC/XE machine this workspace assembles, links,
//! and runs programs for.

pub mod breakpoints;
pub mod constants;
pub mod device;
pub mod interpreter;
pub mod memory;
pub mod opcode;
pub mod register;
pub mod symbol;

pub use breakpoints::BreakpointSet;
pub use device::{Device, SequenceDevice};
pub use interpreter::{Fault, Interpreter, StepOutcome};
pub use memory::{AddressError, Memory, Storage};
pub use opcode::{OpcodeEntry, OpcodeFormat, OpcodeTable};
pub use register::{RegisterFile, RegisterId};
pub use symbol::SymbolTable;
