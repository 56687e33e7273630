//! Encoding of the individual SubRISC instruction kinds.
use base::instruction::subrisc::relative_displacement;
use base::prelude::*;

use super::super::super::error::{AssembleError, ErrorKind};
use super::super::super::program::{Instruction, JumpAttribute, Operand, Program};
use super::super::super::value::ValueKind;
use super::super::evaluation_error;
use super::registers::{register_number, PC_AS_ADDRESS};

const BYTES_PER_WORD: u32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum InstructionKind {
    Subtract,
    Xan,
    MemoryRead,
    MemoryWrite,
    Shift,
    /// A 32-bit literal occupying an aligned word.
    Immediate,
}

impl InstructionKind {
    pub(crate) fn from_mnemonic(mnemonic: &str) -> Option<InstructionKind> {
        use InstructionKind::*;
        match mnemonic.to_ascii_lowercase().as_str() {
            "sub" | "sng4" => Some(Subtract),
            "xan" | "sng4x" => Some(Xan),
            "mr" | "ml" | "lw" => Some(MemoryRead),
            "mw" | "ms" | "sw" => Some(MemoryWrite),
            "shl" | "shr" => Some(Shift),
            "imm" => Some(Immediate),
            _ => None,
        }
    }

    /// Length in halfwords.
    pub(crate) fn length(self, instruction: &Instruction) -> u32 {
        match self {
            InstructionKind::Subtract | InstructionKind::Xan if instruction.jump.is_some() => 2,
            InstructionKind::Immediate => 2,
            _ => 1,
        }
    }

    pub(crate) fn needs_alignment(self) -> bool {
        self == InstructionKind::Immediate
    }

    fn name(self) -> &'static str {
        match self {
            InstructionKind::Subtract => "Sub",
            InstructionKind::Xan => "Xan",
            InstructionKind::MemoryRead => "Mr",
            InstructionKind::MemoryWrite => "Mw",
            InstructionKind::Shift => "Shr",
            InstructionKind::Immediate => "Immediate-Space",
        }
    }

    fn form(self) -> &'static str {
        match self {
            InstructionKind::Subtract => "sub $(in-a) $(in-b) $(out-d)",
            InstructionKind::Xan => "xan $(in-a) $(in-b) $(out-d)",
            InstructionKind::MemoryRead => "mr $(4bit-offset) $(address) $(out-d)",
            InstructionKind::MemoryWrite => "mw $(4bit-offset) $(address) $(in-d)",
            InstructionKind::Shift => "shr $(src) (amount) $(dest)",
            InstructionKind::Immediate => "imm $(32bit-imm)",
        }
    }

    fn form_error(self, kind: ErrorKind, instruction: &Instruction) -> AssembleError {
        AssembleError::new(
            kind,
            format!(
                "{} Instruction must be along the following style: {};",
                self.name(),
                self.form()
            ),
            instruction.position.clone(),
        )
    }
}

fn no_jump(
    instruction: &Instruction,
    what: &str,
    operand_count: usize,
    kind: InstructionKind,
) -> Result<(), AssembleError> {
    if let Some(jump) = &instruction.jump {
        return Err(AssembleError::new(
            ErrorKind::InvalidOperandForm,
            format!("Cannot attach jump attribute to {what} instruction"),
            jump.position.clone(),
        ));
    }
    if instruction.operands.len() != operand_count {
        return Err(kind.form_error(ErrorKind::InvalidOperandForm, instruction));
    }
    Ok(())
}

/// The number of the register in `operand`, which appears in operand
/// position `position` and must be at most `max`.
fn register_operand(
    program: &Program,
    instruction: &Instruction,
    kind: InstructionKind,
    operand: &Operand,
    position: usize,
    max: u8,
) -> Result<u8, AssembleError> {
    let Some(spec) = operand.value.register(program) else {
        return Err(kind.form_error(ErrorKind::InvalidOperandForm, instruction));
    };
    let number = register_number(spec, position).map_err(|e| {
        AssembleError::new(
            ErrorKind::InvalidOperandForm,
            e.to_string(),
            operand.position.clone(),
        )
    })?;
    match u8::try_from(number) {
        Ok(n) if n <= max => Ok(n),
        _ => Err(kind.form_error(ErrorKind::InvalidOperandForm, instruction)),
    }
}

/// The value of an immediate operand, which must lie in `range`.
fn immediate_operand(
    program: &Program,
    instruction: &Instruction,
    kind: InstructionKind,
    operand: &Operand,
    range: std::ops::RangeInclusive<i32>,
) -> Result<i32, AssembleError> {
    if operand.value.kind(program) != ValueKind::Immediate {
        return Err(kind.form_error(ErrorKind::ImmediateOutOfRange, instruction));
    }
    let value = operand
        .value
        .numeric(program, BYTES_PER_WORD, 1)
        .map_err(|e| evaluation_error(e, operand.position.clone()))? as i32;
    if range.contains(&value) {
        Ok(value)
    } else {
        Err(kind.form_error(ErrorKind::ImmediateOutOfRange, instruction))
    }
}

fn jump_halfword(
    program: &Program,
    jump: &JumpAttribute,
    from: u32,
) -> Result<JumpHalfword, AssembleError> {
    let Some(condition) = JumpCondition::from_mnemonic(&jump.mnemonic) else {
        return Err(AssembleError::new(
            ErrorKind::InvalidOperandForm,
            format!("Unknown jump condition specifier {}", jump.mnemonic),
            jump.position.clone(),
        ));
    };
    let target = if jump.target.kind(program) == ValueKind::Register {
        JumpTarget::Register
    } else {
        let address = jump
            .target
            .numeric(program, BYTES_PER_WORD, 1)
            .map_err(|e| evaluation_error(e, jump.position.clone()))?;
        let displacement = relative_displacement(from, address).map_err(|relative| {
            AssembleError::new(
                ErrorKind::DisplacementOverflow,
                format!("Cannot convert specified address {relative} to relative 12 bits address"),
                jump.position.clone(),
            )
        })?;
        JumpTarget::Relative(displacement)
    };
    Ok(JumpHalfword { condition, target })
}

/// The halfwords of `instruction`, which is placed at byte address
/// `from`.
pub(crate) fn encode(
    program: &Program,
    instruction: &Instruction,
    kind: InstructionKind,
    from: u32,
) -> Result<Vec<u16>, AssembleError> {
    let operands = &instruction.operands;
    let encoded = match kind {
        InstructionKind::Subtract | InstructionKind::Xan => {
            if operands.len() != 3 {
                return Err(kind.form_error(ErrorKind::InvalidOperandForm, instruction));
            }
            let a = register_operand(program, instruction, kind, &operands[0], 0, 15)?;
            let b = register_operand(program, instruction, kind, &operands[1], 1, 31)?;
            let d = register_operand(program, instruction, kind, &operands[2], 2, 15)?;
            let jump = match &instruction.jump {
                Some(jump) => Some(jump_halfword(program, jump, from)?),
                None => None,
            };
            SubRiscInstruction::Subtract {
                xan: kind == InstructionKind::Xan,
                a,
                b,
                d,
                jump,
            }
        }
        InstructionKind::MemoryRead | InstructionKind::MemoryWrite => {
            let write = kind == InstructionKind::MemoryWrite;
            no_jump(instruction, if write { "mw" } else { "mr" }, 3, kind)?;
            let mut offset = immediate_operand(program, instruction, kind, &operands[0], -8..=7)?;
            let b = register_operand(program, instruction, kind, &operands[1], 1, 31)?;
            let d = register_operand(program, instruction, kind, &operands[2], 2, 15)?;
            if !write && i32::from(b) == PC_AS_ADDRESS && offset < 0 {
                // The compute stage sees PC one halfword ahead, except
                // for instructions at even halfword addresses.
                offset += 1;
                if (from / 2) % 2 == 0 {
                    offset -= 1;
                }
            }
            SubRiscInstruction::Memory {
                write,
                offset: offset as i8,
                b,
                d,
            }
        }
        InstructionKind::Shift => {
            no_jump(instruction, "shr", 3, kind)?;
            let src = register_operand(program, instruction, kind, &operands[0], 2, 15)?;
            let amount = if operands[1].value.kind(program) == ValueKind::Register {
                ShiftAmount::Register(register_operand(
                    program,
                    instruction,
                    kind,
                    &operands[1],
                    2,
                    15,
                )?)
            } else {
                let amount =
                    immediate_operand(program, instruction, kind, &operands[1], i32::MIN..=i32::MAX)?;
                if amount % 2 != 0 || !(2..=14).contains(&amount) {
                    return Err(AssembleError::new(
                        ErrorKind::ImmediateOutOfRange,
                        "Shr Instruction allows even number in the range 2..14 for the operand (amount)"
                            .to_string(),
                        instruction.position.clone(),
                    ));
                }
                ShiftAmount::Immediate(amount as u8)
            };
            let dest = register_operand(program, instruction, kind, &operands[2], 2, 15)?;
            SubRiscInstruction::Shift {
                right: instruction.mnemonic.to_ascii_lowercase().ends_with('r'),
                src,
                amount,
                dest,
            }
        }
        InstructionKind::Immediate => {
            no_jump(instruction, "immediate space", 1, kind)?;
            if operands[0].value.kind(program) != ValueKind::Immediate {
                return Err(kind.form_error(ErrorKind::InvalidOperandForm, instruction));
            }
            let value = operands[0]
                .value
                .numeric(program, BYTES_PER_WORD, 1)
                .map_err(|e| evaluation_error(e, operands[0].position.clone()))?;
            let (high, low) = split_halves(value);
            return Ok(vec![high, low]);
        }
    };
    Ok(encoded.halfwords())
}
