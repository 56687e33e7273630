//! SubRISC halfword instructions.
//!
//! See the parent module for the bit layouts.  The `imm` pseudo-op
//! (a 32-bit literal occupying an aligned word) is not represented
//! here, since it is data and cannot be told apart from code by
//! looking at the halfwords.

use super::DecodeFailure;
use crate::subword::sign_extend;

#[cfg(test)]
use proptest::strategy::Strategy;
#[cfg(test)]
use test_strategy::{proptest, Arbitrary};

/// The lowest displacement representable in a jump halfword.
pub const MIN_DISPLACEMENT: i32 = -2048;
/// The highest displacement representable in a jump halfword.
pub const MAX_DISPLACEMENT: i32 = 2047;

const JUMP_FLAG: u16 = 1 << 13;

#[cfg_attr(test, derive(Arbitrary))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JumpCondition {
    Negative,
    Lsb,
    Carry,
}

impl JumpCondition {
    /// Select a condition from the prefix of a jump mnemonic
    /// (`jneg`, `jlsb`, `jcarry`, optionally followed by more text).
    pub fn from_mnemonic(mnemonic: &str) -> Option<JumpCondition> {
        if mnemonic.starts_with("jneg") {
            Some(JumpCondition::Negative)
        } else if mnemonic.starts_with("jlsb") {
            Some(JumpCondition::Lsb)
        } else if mnemonic.starts_with("jcarry") {
            Some(JumpCondition::Carry)
        } else {
            None
        }
    }

    fn bits(&self) -> u16 {
        match self {
            JumpCondition::Negative => 0x4000,
            JumpCondition::Lsb => 0x2000,
            JumpCondition::Carry => 0x1000,
        }
    }
}

#[cfg_attr(test, derive(Arbitrary))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JumpTarget {
    /// Jump to the address held in `ra`.
    Register,
    /// Jump relative to the halfword following the instruction head.
    Relative(#[cfg_attr(test, strategy(-2048i16..=2047))] i16),
}

#[cfg_attr(test, derive(Arbitrary))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JumpHalfword {
    pub condition: JumpCondition,
    pub target: JumpTarget,
}

impl JumpHalfword {
    pub fn encode(&self) -> u16 {
        let target = match self.target {
            JumpTarget::Register => 0x8000,
            JumpTarget::Relative(displacement) => (displacement as u16) & 0x0FFF,
        };
        self.condition.bits() | target
    }

    pub fn decode(bits: u16) -> Result<JumpHalfword, DecodeFailure> {
        let condition = match (bits >> 12) & 0x7 {
            0b100 => JumpCondition::Negative,
            0b010 => JumpCondition::Lsb,
            0b001 => JumpCondition::Carry,
            other => {
                return Err(DecodeFailure::InvalidJumpCondition(other as u8));
            }
        };
        let target = if bits & 0x8000 != 0 {
            JumpTarget::Register
        } else {
            // Twelve bits always fit into an i16.
            JumpTarget::Relative(sign_extend(u32::from(bits), 12) as i16)
        };
        Ok(JumpHalfword { condition, target })
    }
}

/// Compute the jump displacement from an instruction at byte address
/// `from` to byte address `target`.  If it cannot be represented in
/// twelve bits, the unrepresentable displacement is the error.
pub fn relative_displacement(from: u32, target: u32) -> Result<i16, i32> {
    let relative = (target / 2) as i32 - (from / 2) as i32 - 1;
    if (MIN_DISPLACEMENT..=MAX_DISPLACEMENT).contains(&relative) {
        Ok(relative as i16)
    } else {
        Err(relative)
    }
}

#[cfg_attr(test, derive(Arbitrary))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShiftAmount {
    /// The amount is held in a register (0 to 15).
    Register(#[cfg_attr(test, strategy(0u8..16))] u8),
    /// A fixed even amount, 2 to 14.
    Immediate(#[cfg_attr(test, strategy((1u8..8).prop_map(|n| n * 2)))] u8),
}

impl ShiftAmount {
    fn field(&self) -> u16 {
        match self {
            ShiftAmount::Register(r) => u16::from(*r) & 0xF,
            ShiftAmount::Immediate(amount) => 0x10 | (u16::from(*amount / 2) & 0xF),
        }
    }

    fn from_field(field: u16) -> ShiftAmount {
        let low = (field & 0xF) as u8;
        if field & 0x10 == 0 {
            ShiftAmount::Register(low)
        } else {
            ShiftAmount::Immediate(low * 2)
        }
    }
}

#[cfg_attr(test, derive(Arbitrary))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubRiscInstruction {
    Subtract {
        /// Selects `xan` rather than `sub`.
        xan: bool,
        #[cfg_attr(test, strategy(0u8..16))]
        a: u8,
        #[cfg_attr(test, strategy(0u8..32))]
        b: u8,
        #[cfg_attr(test, strategy(0u8..16))]
        d: u8,
        jump: Option<JumpHalfword>,
    },
    Memory {
        write: bool,
        #[cfg_attr(test, strategy(-8i8..8))]
        offset: i8,
        #[cfg_attr(test, strategy(0u8..32))]
        b: u8,
        #[cfg_attr(test, strategy(0u8..16))]
        d: u8,
    },
    Shift {
        right: bool,
        #[cfg_attr(test, strategy(0u8..16))]
        src: u8,
        amount: ShiftAmount,
        #[cfg_attr(test, strategy(0u8..16))]
        dest: u8,
    },
}

fn fields(a: u8, b: u8, d: u8) -> u16 {
    ((u16::from(a) & 0xF) << 9) | ((u16::from(b) & 0x1F) << 4) | (u16::from(d) & 0xF)
}

impl SubRiscInstruction {
    pub fn halfwords(&self) -> Vec<u16> {
        match self {
            SubRiscInstruction::Subtract {
                xan,
                a,
                b,
                d,
                jump,
            } => {
                let op: u16 = if *xan { 1 } else { 0 };
                let head = (op << 14) | fields(*a, *b, *d);
                match jump {
                    Some(j) => vec![head | JUMP_FLAG, j.encode()],
                    None => vec![head],
                }
            }
            SubRiscInstruction::Memory {
                write,
                offset,
                b,
                d,
            } => {
                let flag = if *write { JUMP_FLAG } else { 0 };
                vec![(2 << 14) | flag | fields((*offset as u8) & 0xF, *b, *d)]
            }
            SubRiscInstruction::Shift {
                right,
                src,
                amount,
                dest,
            } => {
                let dir = if *right { JUMP_FLAG } else { 0 };
                vec![
                    (3 << 14)
                        | dir
                        | ((u16::from(*src) & 0xF) << 9)
                        | (amount.field() << 4)
                        | (u16::from(*dest) & 0xF),
                ]
            }
        }
    }

    /// Decode the instruction at the start of `halfwords`, returning
    /// it and the number of halfwords it occupies.
    pub fn decode(halfwords: &[u16]) -> Result<(SubRiscInstruction, usize), DecodeFailure> {
        let head = *halfwords.first().ok_or(DecodeFailure::Truncated)?;
        let flag = head & JUMP_FLAG != 0;
        let a = ((head >> 9) & 0xF) as u8;
        let b = ((head >> 4) & 0x1F) as u8;
        let d = (head & 0xF) as u8;
        match head >> 14 {
            op @ (0 | 1) => {
                let jump = if flag {
                    let tail = *halfwords.get(1).ok_or(DecodeFailure::Truncated)?;
                    Some(JumpHalfword::decode(tail)?)
                } else {
                    None
                };
                let inst = SubRiscInstruction::Subtract {
                    xan: op == 1,
                    a,
                    b,
                    d,
                    jump,
                };
                Ok((inst, if flag { 2 } else { 1 }))
            }
            2 => Ok((
                SubRiscInstruction::Memory {
                    write: flag,
                    // Four bits always fit into an i8.
                    offset: sign_extend(u32::from(a), 4) as i8,
                    b,
                    d,
                },
                1,
            )),
            _ => Ok((
                SubRiscInstruction::Shift {
                    right: flag,
                    src: a,
                    amount: ShiftAmount::from_field((head >> 4) & 0x1F),
                    dest: d,
                },
                1,
            )),
        }
    }
}

#[test]
fn test_sub_with_jump_layout() {
    let inst = SubRiscInstruction::Subtract {
        xan: false,
        a: 4,
        b: 17,
        d: 5,
        jump: Some(JumpHalfword {
            condition: JumpCondition::Negative,
            target: JumpTarget::Relative(-1),
        }),
    };
    assert_eq!(inst.halfwords(), vec![0x2915, 0x4FFF]);
}

#[test]
fn test_memory_read_layout() {
    let inst = SubRiscInstruction::Memory {
        write: false,
        offset: -1,
        b: 20,
        d: 3,
    };
    assert_eq!(inst.halfwords(), vec![0x9F43]);
}

#[test]
fn test_shift_immediate_layout() {
    let inst = SubRiscInstruction::Shift {
        right: true,
        src: 10,
        amount: ShiftAmount::Immediate(4),
        dest: 11,
    };
    assert_eq!(inst.halfwords(), vec![0xF52B]);
}

#[test]
fn test_relative_displacement_boundary() {
    // From byte 0, the displacement is counted from halfword 1.
    assert_eq!(relative_displacement(0, 2 * 2048), Ok(2047));
    assert_eq!(relative_displacement(0, 2 * 2049), Err(2048));
    assert_eq!(relative_displacement(2 * 2047, 0), Ok(-2048));
    assert_eq!(relative_displacement(2 * 2048, 0), Err(-2049));
}

#[test]
fn test_decode_rejects_truncated_jump() {
    assert_eq!(
        SubRiscInstruction::decode(&[0x2915]),
        Err(DecodeFailure::Truncated)
    );
    assert_eq!(
        SubRiscInstruction::decode(&[0x2915, 0x6000]),
        Err(DecodeFailure::InvalidJumpCondition(0b110))
    );
}

#[test]
fn test_jump_condition_prefixes() {
    assert_eq!(
        JumpCondition::from_mnemonic("jnegative"),
        Some(JumpCondition::Negative)
    );
    assert_eq!(JumpCondition::from_mnemonic("jlsb"), Some(JumpCondition::Lsb));
    assert_eq!(
        JumpCondition::from_mnemonic("jcarry"),
        Some(JumpCondition::Carry)
    );
    assert_eq!(JumpCondition::from_mnemonic("jmp"), None);
}

#[cfg(test)]
#[proptest]
fn reversible_decoding(input: SubRiscInstruction) {
    let halfwords = input.halfwords();
    match SubRiscInstruction::decode(&halfwords) {
        Ok((decoded, len)) => {
            assert_eq!(decoded, input);
            assert_eq!(len, halfwords.len());
        }
        Err(e) => {
            panic!("input {input:?} encoded to {halfwords:04X?} but that could not be decoded ({e})");
        }
    }
}
