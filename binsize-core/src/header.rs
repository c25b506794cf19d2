//! Raw container header structures and the per-format table readers.

pub mod elf;
pub mod pe;
