//! Target encoders.
//!
//! Each encoder places the instructions (startup section first),
//! then the read-only storage slots, then the read-write ones, and
//! produces a [`MemoryImage`] with one memory slot.  The storage
//! slots are written into the image by a worker thread while the
//! calling thread reports progress.
use std::fmt::{self, Display, Formatter};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use tracing::{event, span, Level};

use base::prelude::*;

use super::collections::OneOrMore;
use super::error::{AssembleError, ErrorKind};
use super::layout::{LayoutResult, SlotRef};
use super::program::{AddressInfo, Program, VariableId};
use super::source::AssemblePosition;
use super::value::EvalFailure;

pub(crate) mod subneg4x;
pub(crate) mod subrisc;

const PROGRESS_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Isa {
    Subneg4X(WordWidth),
    /// The delay-branch variant differs only in how the simulator
    /// executes jumps.
    SubRisc { delay_branch: bool },
}

impl Isa {
    pub(crate) const NAMES: [&'static str; 4] =
        ["sng4x", "sng4x16", "subrisc", "subrisc-delaybranch"];

    /// Select an instruction set by name.
    ///
    /// # Errors
    ///
    /// `UnknownISA` for names other than those in [`Isa::NAMES`].
    pub(crate) fn from_name(name: &str) -> Result<Isa, AssembleError> {
        match name {
            "sng4x" => Ok(Isa::Subneg4X(WordWidth::ThirtyTwo)),
            "sng4x16" => Ok(Isa::Subneg4X(WordWidth::Sixteen)),
            "subrisc" => Ok(Isa::SubRisc {
                delay_branch: false,
            }),
            "subrisc-delaybranch" => Ok(Isa::SubRisc { delay_branch: true }),
            _ => Err(AssembleError::new(
                ErrorKind::UnknownISA,
                format!(
                    "Unknown ISA '{name}'; available ISAs are {}",
                    Isa::NAMES.join(", ")
                ),
                AssemblePosition::Unknown,
            )),
        }
    }

    /// SubRISC images are written as two hex files, one per halfword.
    pub(crate) fn splits_hex_output(self) -> bool {
        matches!(self, Isa::SubRisc { .. })
    }
}

impl Display for Isa {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Isa::Subneg4X(WordWidth::ThirtyTwo) => "sng4x",
            Isa::Subneg4X(WordWidth::Sixteen) => "sng4x16",
            Isa::SubRisc {
                delay_branch: false,
            } => "subrisc",
            Isa::SubRisc { delay_branch: true } => "subrisc-delaybranch",
        })
    }
}

/// Encode the program for `isa`.  Memory is extended with stack
/// space up to `min_memory_size` words.
///
/// # Errors
///
/// Fails when more than one section is marked as the startup
/// section, or when instructions or storage cannot be encoded.
pub(crate) fn assemble(
    program: &mut Program,
    layout: &LayoutResult,
    isa: Isa,
    min_memory_size: usize,
) -> Result<MemoryImage, OneOrMore<AssembleError>> {
    let span = span!(Level::INFO, "encode", isa = %isa);
    let _enter = span.enter();
    let order = program
        .instructions_in_placement_order()
        .map_err(OneOrMore::new)?;
    event!(
        Level::DEBUG,
        "encoding {} instructions and {} storage slots",
        order.len(),
        layout.slot_count()
    );
    let image = match isa {
        Isa::Subneg4X(width) => {
            subneg4x::assemble(program, layout, &order, width, min_memory_size)?
        }
        Isa::SubRisc { .. } => subrisc::assemble(program, layout, &order, min_memory_size)?,
    };
    if let Some(memory) = image.slot(0) {
        event!(
            Level::INFO,
            "{} words of code and data, {} words of memory",
            memory.code_size(),
            memory.word_capacity()
        );
    }
    Ok(image)
}

/// Allocate `used` words of program memory, then stack space up to
/// `min_memory_size` words.
fn reserve(memory: &mut MemorySlot, used: usize, min_memory_size: usize) {
    memory.expand_capacity(used);
    if used < min_memory_size {
        memory.expand_capacity_for_stack(min_memory_size - used);
    }
}

/// Place each storage slot, `stride` address units apart, starting
/// at `first`.  Returns the word address of each slot.
fn place_storage(
    program: &mut Program,
    layout: &LayoutResult,
    first: u32,
    stride: u32,
) -> (Vec<(SlotRef, usize)>, u32) {
    let mut next = first;
    let mut placements = Vec::with_capacity(layout.slot_count());
    for slot in layout.all_slots() {
        layout.place_slot(
            program,
            slot,
            AddressInfo {
                memory_slot: 0,
                from: next,
                to: next,
            },
        );
        placements.push((slot, (next / stride) as usize));
        next += stride;
    }
    (placements, next)
}

pub(crate) fn evaluation_error(failure: EvalFailure, position: AssemblePosition) -> AssembleError {
    let kind = match failure {
        EvalFailure::NotAnImmediate(_) => ErrorKind::InvalidOperandForm,
        EvalFailure::Unresolved(_) | EvalFailure::SymbolChainTooLong(_) => {
            ErrorKind::IdentifierNotFound
        }
    };
    AssembleError::new(kind, failure.to_string(), position)
}

pub(crate) fn image_error(e: ImageError, position: AssemblePosition) -> AssembleError {
    AssembleError::new(ErrorKind::ImageOverflow, e.to_string(), position)
}

/// The debug annotation of a storage slot and the usage of its
/// word.
///
/// # Errors
///
/// Fails if a sharer of `slot` does not hold it.
fn storage_description(
    program: &Program,
    layout: &LayoutResult,
    slot: SlotRef,
) -> Result<(Usage, String), AssembleError> {
    let element_of = |v: VariableId| {
        let var = program.variable(v);
        var.slots.iter().position(|s| *s == slot).ok_or_else(|| {
            AssembleError::new(
                ErrorKind::SlotNotHeld,
                format!("'{}' shares {slot:?} but does not hold it", var.name),
                var.position.clone(),
            )
        })
    };
    match layout.sharers(slot) {
        [only] if program.variable(*only).is_array() => {
            let var = program.variable(*only);
            let index = element_of(*only)?;
            let usage = if index == 0 {
                Usage::VariableArray
            } else {
                Usage::FollowHead
            };
            Ok((
                usage,
                format!(
                    "{}{}[{index}]",
                    program.block_path_prefix(var.block),
                    var.name
                ),
            ))
        }
        sharers => {
            let mut annotation = String::new();
            for v in sharers {
                let var = program.variable(*v);
                annotation.push_str(&program.block_path_prefix(var.block));
                annotation.push_str(&var.name);
                if var.is_array() {
                    annotation.push_str(&format!("[{}]", element_of(*v)?));
                }
                annotation.push(' ');
            }
            Ok((Usage::Variable, annotation))
        }
    }
}

fn storage_word(
    program: &Program,
    layout: &LayoutResult,
    slot: SlotRef,
    bytes_per_word: u32,
) -> Result<Word, AssembleError> {
    let position = layout
        .sharers(slot)
        .first()
        .map(|v| program.variable(*v).position.clone())
        .unwrap_or_default();
    let value = layout
        .initial_value(slot)
        .numeric(program, bytes_per_word, 1)
        .map_err(|e| evaluation_error(e, position))?;
    let (usage, annotation) = storage_description(program, layout, slot)?;
    let mut info = DebugInfo::new(usage);
    if !annotation.is_empty() {
        info = info.with_annotation(annotation);
    }
    Ok(Word::new(value, info))
}

/// Write the initial contents of the storage slots into `memory`.
///
/// # Errors
///
/// Fails if the initial value of a slot cannot be evaluated.  The
/// write-out stops at the first failure.
fn write_storage(
    program: &Program,
    layout: &LayoutResult,
    placements: &[(SlotRef, usize)],
    memory: &mut MemorySlot,
    bytes_per_word: u32,
) -> Result<(), OneOrMore<AssembleError>> {
    let total = placements.len();
    let progress = AtomicUsize::new(0);
    let failed = AtomicBool::new(false);
    let outcome = thread::scope(|scope| {
        let worker = scope.spawn(|| -> Result<(), AssembleError> {
            for (done, (slot, address)) in placements.iter().enumerate() {
                let written = storage_word(program, layout, *slot, bytes_per_word).and_then(
                    |word| {
                        memory
                            .set_word(*address, word)
                            .map_err(|e| image_error(e, AssemblePosition::Unknown))
                    },
                );
                if let Err(e) = written {
                    failed.store(true, Ordering::Release);
                    return Err(e);
                }
                progress.store(done + 1, Ordering::Release);
            }
            Ok(())
        });
        while !worker.is_finished() && !failed.load(Ordering::Acquire) {
            thread::sleep(PROGRESS_INTERVAL);
            event!(
                Level::INFO,
                "Processing {} / {}...",
                progress.load(Ordering::Acquire),
                total
            );
        }
        worker.join()
    });
    match outcome {
        Ok(result) => result.map_err(OneOrMore::new),
        Err(panic) => std::panic::resume_unwind(panic),
    }
}
