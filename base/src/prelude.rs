//! The prelude exports the structs which are useful in representing
//! a loaded program.  Providing this prelude is the main purpose of
//! the base crate.
pub use super::image::{DebugInfo, ImageError, MemoryImage, MemorySlot, Usage, Word};
pub use super::instruction::subneg4::{Subneg4Instruction, Subneg4Opcode, WordWidth};
pub use super::instruction::subrisc::{
    JumpCondition, JumpHalfword, JumpTarget, ShiftAmount, SubRiscInstruction,
};
pub use super::instruction::DecodeFailure;
pub use super::subword::{
    join_halves, left_half, reinterpret_as_signed, reinterpret_as_unsigned, right_half,
    sign_extend, split_halves,
};
