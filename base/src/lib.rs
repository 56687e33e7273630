//! The `base` crate defines the things which are useful both in the
//! assembler and in a simulator for the SUBNEG4X and SubRISC
//! machines.  The idea is that a simulator which loads a memory
//! image would depend on the base crate but would not need to depend
//! on the assembler itself.

pub mod image;
pub mod instruction;
pub mod prelude;
pub mod subword;
