use std::{io, path::PathBuf};

use thiserror::Error;

use crate::opcode::Opcode;

#[derive(Error, Debug, PartialEq, Clone)]
pub enum ProcessError {
    #[error("Invalid opcode state '{0}'.")]
    Opcode(#[from] OpcodeError),
    #[error("Invalid stack state '{0}'.")]
    Stack(#[from] StackError),
    #[error("Invalid memory access '{0}'.")]
    Memory(#[from] MemoryError),
    #[error("The key {0:#04X} does not exist on the keypad.")]
    KeyOutOfBounds(u8),
    #[error("There is no valid machine initialized.")]
    InvalidMachine,
    #[error("Unable to allocate the memory needed for the machine.")]
    Allocation,
}

#[derive(Error, Debug, PartialEq, Clone, Copy)]
pub enum OpcodeError {
    #[error("An unsupported opcode was used {0:#06X?}.")]
    InvalidOpcode(Opcode),
    #[error("Pointer location invalid there can not be an opcode at {pointer}, if data len is {len}")]
    MemoryInvalid { pointer: usize, len: usize },
}

#[derive(Error, Debug, PartialEq, Clone, Copy)]
pub enum StackError {
    #[error("Stack is full!")]
    Full,
    #[error("Stack is empty!")]
    Empty,
}

#[derive(Error, Debug, PartialEq, Clone, Copy)]
pub enum MemoryError {
    #[error("Access to {len} byte(s) at {address:#06X} is out of bounds.")]
    OutOfBounds { address: usize, len: usize },
}

/// Errors raised while bringing a program image into the machine.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Unable to read the rom at '{path}'.")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("The rom does not fit into memory '{0}'.")]
    Memory(#[from] MemoryError),
}
