//! Binary representations of the instructions of the target machines.
//!
//! There are two machine families.
//!
//! SUBNEG4X is word addressed.  An instruction occupies four
//! consecutive words:
//!
//! | Word 0 | Word 1 | Word 2 | Word 3                 |
//! |--------|--------|--------|------------------------|
//! | A      | B      | C      | opcode bit, jump target|
//!
//! The opcode bit is bit 31 (bit 15 on the sixteen-bit variant) of
//! word 3; it is clear for `SNG4` and set for `SNG4X`.
//!
//! SubRISC is byte addressed and fetches sixteen-bit halfwords.  The
//! even halfword of a 32-bit word occupies bits 31..16.  The top two
//! bits of the first halfword of an instruction select its kind:
//!
//! | Bits 15-14 | 13         | 12-9      | 8-4        | 3-0  |
//! |------------|------------|-----------|------------|------|
//! | 00 (sub)   | jump flag  | A         | B          | D    |
//! | 01 (xan)   | jump flag  | A         | B          | D    |
//! | 10 (mem)   | write flag | offset    | B (address)| D    |
//! | 11 (shift) | right flag | src       | amount     | dest |
//!
//! When the jump flag is set a jump halfword follows:
//!
//! | 15            | 14   | 13   | 12    | 11-0                    |
//! |---------------|------|------|-------|-------------------------|
//! | register flag | jneg | jlsb | jcarry| displacement (halfwords)|
//!
//! The displacement is relative to the halfword following the
//! instruction's first halfword.

use std::fmt::{self, Debug, Display, Formatter};

pub mod subneg4;
pub mod subrisc;

/// Signals that a sequence of words or halfwords could not be
/// decoded as an instruction.
#[derive(PartialEq, Eq)]
pub enum DecodeFailure {
    /// The instruction announces a jump halfword, but the input ends
    /// before it.
    Truncated,

    /// The condition bits (14..12) of a jump halfword do not select
    /// exactly one condition.
    InvalidJumpCondition(u8),
}

impl Debug for DecodeFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            DecodeFailure::Truncated => f.write_str("Truncated"),
            DecodeFailure::InvalidJumpCondition(bits) => {
                write!(f, "InvalidJumpCondition({bits:#05b})")
            }
        }
    }
}

impl Display for DecodeFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            DecodeFailure::Truncated => f.write_str("instruction is missing its jump halfword"),
            DecodeFailure::InvalidJumpCondition(bits) => {
                write!(
                    f,
                    "jump halfword condition bits {bits:#05b} do not select exactly one condition"
                )
            }
        }
    }
}

impl std::error::Error for DecodeFailure {}
