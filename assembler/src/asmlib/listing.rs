//! A human-readable listing of a memory image.
//!
//! Each line of the listing describes one unit of a memory slot: an
//! instruction (with all the bytes following its head), a storage
//! word, or padding.  Addresses are byte addresses.
use std::fmt::{self, Display, Formatter};

use base::prelude::*;

const CONTENT_WIDTH: usize = 40;
const BYTES_PER_WORD: usize = 4;

pub(crate) struct ImageListing<'a> {
    image: &'a MemoryImage,
}

impl<'a> ImageListing<'a> {
    pub(crate) fn new(image: &'a MemoryImage) -> ImageListing<'a> {
        ImageListing { image }
    }
}

fn byte_info(memory: &MemorySlot, byte: usize) -> DebugInfo {
    memory
        .debug_info(byte / BYTES_PER_WORD, BYTES_PER_WORD, byte % BYTES_PER_WORD)
        .unwrap_or_default()
}

fn word_value(memory: &MemorySlot, byte: usize) -> u32 {
    memory
        .word(byte / BYTES_PER_WORD)
        .map_or(0, |w| w.initial_value)
}

/// Byte `byte` of memory, counting from the most significant byte
/// of each word.
fn byte_value(memory: &MemorySlot, byte: usize) -> u32 {
    let shift = 8 * (BYTES_PER_WORD - 1 - byte % BYTES_PER_WORD);
    (word_value(memory, byte) >> shift) & 0xFF
}

/// The bytes `head..=tail` of an instruction, with a space between
/// words (and between halfwords of words holding two instructions).
fn instruction_bytes(memory: &MemorySlot, head: usize, tail: usize) -> String {
    let mut text = String::new();
    for byte in head..=tail {
        let split_halfwords = memory
            .word(byte / BYTES_PER_WORD)
            .is_some_and(|w| w.debug_records().len() >= 2);
        if byte % BYTES_PER_WORD == 0 || (split_halfwords && byte % 2 == 0) {
            text.push(' ');
        }
        text.push_str(&format!("{:02X}", byte_value(memory, byte)));
    }
    text.trim_start().to_string()
}

fn write_slot(f: &mut Formatter<'_>, memory: &MemorySlot) -> fmt::Result {
    writeln!(f, "[Slot.{}]:", memory.slot())?;
    writeln!(f, "Capacity = {} words", memory.word_capacity())?;
    writeln!(f, "ByteAddress     {:<CONTENT_WIDTH$} Mean", "Initial-value")?;
    let end = memory.code_size() * BYTES_PER_WORD;
    let mut head = 0;
    while head < end {
        let info = byte_info(memory, head);
        let mut tail = head;
        while tail + 1 < end && byte_info(memory, tail + 1).usage == Usage::FollowHead {
            tail += 1;
        }
        let content = match info.usage {
            Usage::Variable | Usage::VariableArray | Usage::FollowHead => {
                // Storage is listed one word at a time.
                tail = head + BYTES_PER_WORD - 1;
                let value = word_value(memory, head);
                format!("0x{value:08X} ({})", reinterpret_as_signed(value))
            }
            Usage::Instruction => instruction_bytes(memory, head, tail),
            Usage::Unknown => "(Alignment)".to_string(),
        };
        if head == tail {
            write!(f, "{head:08X}:       ")?;
        } else {
            write!(f, "{head:08X}~[+{:<5}", format!("{}]:", tail - head))?;
        }
        writeln!(
            f,
            "{content:<CONTENT_WIDTH$} {}",
            info.annotation.as_deref().unwrap_or_default()
        )?;
        head = tail + 1;
    }
    writeln!(f, "{}", "-".repeat(71))?;
    writeln!(f)
}

impl Display for ImageListing<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let slots = self.image.slots();
        writeln!(f, "Entry point: 0x{:08X}", self.image.startup_address)?;
        writeln!(f, "Memory slots: Uses {} memory slots", slots.len())?;
        writeln!(f)?;
        writeln!(f, "Memory initial contents:")?;
        for memory in slots {
            write_slot(f, memory)?;
        }
        writeln!(f)
    }
}
