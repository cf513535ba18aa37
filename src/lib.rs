pub mod chip8;
pub mod definitions;
pub mod devices;
pub mod opcode;
pub mod resources;
mod error;

// reexporting for convinience
mod runner;
pub use error::*;
pub use runner::*;
