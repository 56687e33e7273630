//! The SUBNEG4X encoder.
//!
//! The machine is word addressed and every instruction occupies four
//! words, `A`, `B`, `C` and `J`.  Operand `i` of an instruction is
//! placed at the instruction's address plus `i`, so a label on an
//! operand designates the word holding it.
use tracing::{event, Level};

use base::prelude::*;

use super::super::collections::{ErrorList, OneOrMore};
use super::super::error::{AssembleError, ErrorKind};
use super::super::layout::LayoutResult;
use super::super::program::{AddressInfo, Instruction, InstructionRef, Program};
use super::{evaluation_error, image_error, place_storage, reserve, write_storage};

const TITLE: &str = "SUBNEG4X Assemble";
const WORDS_PER_INSTRUCTION: u32 = 4;

pub(crate) fn assemble(
    program: &mut Program,
    layout: &LayoutResult,
    order: &[InstructionRef],
    width: WordWidth,
    min_memory_size: usize,
) -> Result<MemoryImage, OneOrMore<AssembleError>> {
    let mut next: u32 = 0;
    for r in order {
        assign_address(program, *r, next);
        next += WORDS_PER_INSTRUCTION;
    }
    event!(Level::DEBUG, "instructions occupy {next} words");
    let (placements, end) = place_storage(program, layout, next, 1);

    let mut memory = MemorySlot::new(0);
    reserve(&mut memory, end as usize, min_memory_size);

    let mut errors: ErrorList<AssembleError> = ErrorList::default();
    for r in order {
        if let Some(instruction) = program.instruction(*r) {
            errors.record(write_instruction(program, instruction, width, &mut memory));
        }
    }
    errors.into_result(())?;

    write_storage(program, layout, &placements, &mut memory, 1)?;

    let mut image = MemoryImage::from_slots(vec![memory]);
    image.startup_address = 0;
    image.is_sixteen_bit = width == WordWidth::Sixteen;
    Ok(image)
}

fn assign_address(program: &mut Program, r: InstructionRef, from: u32) {
    let Some(instruction) = program.instruction(r) else {
        return;
    };
    let address = instruction.address;
    let operands: Vec<_> = instruction.operands.iter().map(|op| op.address).collect();
    *program.address_mut(address) = AddressInfo {
        memory_slot: 0,
        from,
        to: from + WORDS_PER_INSTRUCTION - 1,
    };
    for (i, operand) in (0u32..).zip(operands) {
        *program.address_mut(operand) = AddressInfo {
            memory_slot: 0,
            from: from + i,
            to: from + i,
        };
    }
}

fn error(kind: ErrorKind, detail: String, instruction: &Instruction) -> AssembleError {
    AssembleError::new(kind, detail, instruction.position.clone()).with_title(TITLE)
}

/// The four words of `instruction`.
pub(crate) fn encode(
    program: &Program,
    instruction: &Instruction,
    width: WordWidth,
) -> Result<[u32; 4], AssembleError> {
    let Some(opcode) = Subneg4Opcode::from_mnemonic(&instruction.mnemonic) else {
        return Err(error(
            ErrorKind::UnknownMnemonic,
            format!("Invalid mnemonic '{}'", instruction.mnemonic),
            instruction,
        ));
    };
    if !matches!(instruction.operands.len(), 3 | 4) {
        return Err(error(
            ErrorKind::InvalidOperandForm,
            "Invalid operand format".to_string(),
            instruction,
        ));
    }
    let mut values: Vec<u32> = Vec::with_capacity(4);
    for operand in &instruction.operands {
        let value = operand
            .value
            .numeric(program, 1, 1)
            .map_err(|e| evaluation_error(e, operand.position.clone()).with_title(TITLE))?;
        values.push(value);
    }
    if values.len() == 3 {
        // The jump target defaults to the next instruction.
        values.push(program.address(instruction.address).to + 1);
    }
    let [a, b, c, jump] = [values[0], values[1], values[2], values[3]];
    Ok(Subneg4Instruction {
        opcode,
        a,
        b,
        c,
        jump,
    }
    .words(width))
}

fn write_instruction(
    program: &Program,
    instruction: &Instruction,
    width: WordWidth,
    memory: &mut MemorySlot,
) -> Result<(), AssembleError> {
    let words = encode(program, instruction, width)?;
    let from = program.address(instruction.address).from as usize;
    for (i, bits) in words.into_iter().enumerate() {
        let info = if i == 0 {
            DebugInfo::new(Usage::Instruction)
                .with_annotation(instruction.annotation())
                .with_debug_marker(instruction.debug_text.clone())
        } else {
            DebugInfo::new(Usage::FollowHead)
        };
        memory
            .set_word(from + i, Word::new(bits, info))
            .map_err(|e| image_error(e, instruction.position.clone()))?;
    }
    Ok(())
}
