//! The SubRISC encoder.
//!
//! SubRISC is byte addressed and executes sixteen-bit halfwords.
//! Encoding takes two passes.  The first selects the kind of each
//! instruction, which determines its length and alignment, so that
//! addresses can be assigned.  The second encodes the instructions,
//! now that jump displacements can be computed.
use tracing::{event, Level};

use base::prelude::*;

use super::super::collections::{ErrorList, OneOrMore};
use super::super::error::{AssembleError, ErrorKind};
use super::super::layout::LayoutResult;
use super::super::program::{AddressInfo, InstructionRef, Program};
use super::{image_error, place_storage, reserve, write_storage};

mod instructions;
mod registers;

use instructions::InstructionKind;

const BYTES_PER_WORD: u32 = 4;

fn align(address: u32) -> u32 {
    address.next_multiple_of(BYTES_PER_WORD)
}

pub(crate) fn assemble(
    program: &mut Program,
    layout: &LayoutResult,
    order: &[InstructionRef],
    min_memory_size: usize,
) -> Result<MemoryImage, OneOrMore<AssembleError>> {
    let kinds = select_kinds(program, order)?;

    let mut next: u32 = 0;
    for (r, kind) in order.iter().zip(&kinds) {
        next = assign_address(program, *r, *kind, next);
    }
    event!(Level::DEBUG, "instructions occupy {next} bytes");
    let (placements, end) = place_storage(program, layout, align(next), BYTES_PER_WORD);

    let mut memory = MemorySlot::new(0);
    reserve(
        &mut memory,
        (end / BYTES_PER_WORD) as usize,
        min_memory_size,
    );

    let mut errors: ErrorList<AssembleError> = ErrorList::default();
    for (r, kind) in order.iter().zip(&kinds) {
        errors.record(write_instruction(program, *r, *kind, &mut memory));
    }
    errors.into_result(())?;

    write_storage(program, layout, &placements, &mut memory, BYTES_PER_WORD)?;

    let mut image = MemoryImage::from_slots(vec![memory]);
    image.startup_address = 0;
    Ok(image)
}

fn select_kinds(
    program: &Program,
    order: &[InstructionRef],
) -> Result<Vec<InstructionKind>, OneOrMore<AssembleError>> {
    let mut errors: ErrorList<AssembleError> = ErrorList::default();
    let mut kinds = Vec::with_capacity(order.len());
    for r in order {
        let Some(instruction) = program.instruction(*r) else {
            continue;
        };
        match InstructionKind::from_mnemonic(&instruction.mnemonic) {
            Some(kind) => kinds.push(kind),
            None => errors.push(AssembleError::new(
                ErrorKind::UnknownMnemonic,
                format!("Unknown mnemonic {}", instruction.mnemonic),
                instruction.position.clone(),
            )),
        }
    }
    errors.into_result(kinds)
}

/// Place the instruction at byte address `next` (or the following
/// word boundary if it must be aligned).  Returns the address
/// following the instruction.
fn assign_address(program: &mut Program, r: InstructionRef, kind: InstructionKind, next: u32) -> u32 {
    let Some(instruction) = program.instruction(r) else {
        return next;
    };
    let from = if kind.needs_alignment() { align(next) } else { next };
    let bytes = kind.length(instruction) * 2;
    let placed = AddressInfo {
        memory_slot: 0,
        from,
        to: from + bytes - 1,
    };
    let address = instruction.address;
    let operands: Vec<_> = instruction.operands.iter().map(|op| op.address).collect();
    *program.address_mut(address) = placed;
    for operand in operands {
        *program.address_mut(operand) = placed;
    }
    from + bytes
}

fn write_instruction(
    program: &Program,
    r: InstructionRef,
    kind: InstructionKind,
    memory: &mut MemorySlot,
) -> Result<(), AssembleError> {
    let Some(instruction) = program.instruction(r) else {
        return Ok(());
    };
    let from = program.address(instruction.address).from;
    let halfwords = instructions::encode(program, instruction, kind, from)?;
    let head = (from / 2) as usize;
    for (k, bits) in halfwords.into_iter().enumerate() {
        let info = if k == 0 {
            DebugInfo::new(Usage::Instruction)
                .with_annotation(instruction.annotation())
                .with_debug_marker(instruction.debug_text.clone())
        } else {
            DebugInfo::new(Usage::FollowHead)
        };
        memory
            .or_halfword(head + k, bits, info)
            .map_err(|e| image_error(e, instruction.position.clone()))?;
    }
    Ok(())
}
