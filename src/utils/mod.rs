//! 工具模块

pub mod disasm;
mod rom;

pub use disasm::M68kDisassembler;
pub use rom::{load_rom, rom_words};
