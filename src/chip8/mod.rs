//! The full implementation of the chip8 machine, from its state over the opcodes to an
//! option to pretty print it.
mod chipset;
mod opcodes;
mod print;

/// reexport chipset structs and data for simpler usage
pub use chipset::*;
