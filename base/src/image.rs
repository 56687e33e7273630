//! The memory image produced by the assembler and loaded by the
//! simulators.
//!
//! An image has one or more memory slots.  Each slot is a dense
//! sequence of 32-bit words.  Each word carries between one and four
//! debug records; a word holding two sixteen-bit instructions has two
//! records (one per halfword), a word holding four bytes could have
//! four.  The records are what a simulator uses to show the source of
//! an instruction or the name of a variable.
use std::error::Error;
use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

/// The maximum number of debug records a single word can carry.
pub const MAX_DEBUG_RECORDS: usize = 4;

/// Describes what a (part of a) word is used for.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Usage {
    /// Padding, stack space, or anything else not generated from the
    /// program.
    #[default]
    Unknown,
    /// A scalar variable or constant.
    Variable,
    /// The first element of an array.
    VariableArray,
    /// The first unit of an instruction.
    Instruction,
    /// A continuation of the preceding `Instruction` or
    /// `VariableArray`.
    FollowHead,
}

impl Display for Usage {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Usage::Unknown => "unknown",
            Usage::Variable => "variable",
            Usage::VariableArray => "array",
            Usage::Instruction => "instruction",
            Usage::FollowHead => "follows",
        })
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebugInfo {
    pub usage: Usage,
    /// Human-readable description (source text of an instruction,
    /// qualified name of a variable).
    pub annotation: Option<String>,
    /// When set, the simulator prints this text each time the word is
    /// executed.
    pub debug_marker: Option<String>,
}

impl DebugInfo {
    #[must_use]
    pub fn new(usage: Usage) -> DebugInfo {
        DebugInfo {
            usage,
            annotation: None,
            debug_marker: None,
        }
    }

    #[must_use]
    pub fn with_annotation(mut self, annotation: String) -> DebugInfo {
        self.annotation = Some(annotation);
        self
    }

    #[must_use]
    pub fn with_debug_marker(mut self, marker: Option<String>) -> DebugInfo {
        self.debug_marker = marker.filter(|text| !text.is_empty());
        self
    }

    pub fn is_debug_marked(&self) -> bool {
        self.debug_marker.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Word {
    pub initial_value: u32,
    debug: Vec<DebugInfo>,
}

impl Default for Word {
    fn default() -> Word {
        Word::empty()
    }
}

impl Word {
    /// An all-zero word with a single `Unknown` debug record.
    pub fn empty() -> Word {
        Word::new(0, DebugInfo::default())
    }

    pub fn new(initial_value: u32, info: DebugInfo) -> Word {
        Word {
            initial_value,
            debug: vec![info],
        }
    }

    pub fn debug_records(&self) -> &[DebugInfo] {
        &self.debug
    }

    /// Set the debug record at `index`, growing the record list (with
    /// `Unknown` records) as needed.
    fn set_debug_record(&mut self, index: usize, info: DebugInfo) {
        debug_assert!(index < MAX_DEBUG_RECORDS);
        if self.debug.len() <= index {
            self.debug.resize(index + 1, DebugInfo::default());
        }
        self.debug[index] = info;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageError {
    AddressOutOfRange {
        slot: usize,
        address: usize,
        capacity: usize,
    },
}

impl Display for ImageError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ImageError::AddressOutOfRange {
                slot,
                address,
                capacity,
            } => write!(
                f,
                "word address {address:#X} is outside memory slot {slot}, which has a capacity of {capacity} words"
            ),
        }
    }
}

impl Error for ImageError {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemorySlot {
    slot: usize,
    words: Vec<Word>,
    /// Number of words covered by the program (instructions and
    /// variables), excluding stack space.
    code_size: usize,
}

impl MemorySlot {
    pub fn new(slot: usize) -> MemorySlot {
        MemorySlot {
            slot,
            words: Vec::new(),
            code_size: 0,
        }
    }

    pub fn slot(&self) -> usize {
        self.slot
    }

    pub fn word_capacity(&self) -> usize {
        self.words.len()
    }

    pub fn code_size(&self) -> usize {
        self.code_size
    }

    pub fn words(&self) -> &[Word] {
        &self.words
    }

    pub fn word(&self, address: usize) -> Option<&Word> {
        self.words.get(address)
    }

    /// Append `amount` empty words which belong to the program.
    /// Returns the address of the first new word.
    pub fn expand_capacity(&mut self, amount: usize) -> usize {
        let start = self.expand_capacity_for_stack(amount);
        self.code_size = self.words.len();
        start
    }

    /// Append `amount` empty words which do not belong to the program
    /// (so they are not included in the code size).  Returns the
    /// address of the first new word.
    pub fn expand_capacity_for_stack(&mut self, amount: usize) -> usize {
        let start = self.words.len();
        self.words.resize(start + amount, Word::empty());
        start
    }

    fn out_of_range(&self, address: usize) -> ImageError {
        ImageError::AddressOutOfRange {
            slot: self.slot,
            address,
            capacity: self.words.len(),
        }
    }

    /// Replace the word at `address`.
    ///
    /// # Errors
    ///
    /// Fails if `address` is beyond the capacity of the slot.
    pub fn set_word(&mut self, address: usize, word: Word) -> Result<(), ImageError> {
        match self.words.get_mut(address) {
            Some(w) => {
                *w = word;
                Ok(())
            }
            None => Err(self.out_of_range(address)),
        }
    }

    /// Merge a halfword into the word containing halfword address
    /// `half_address`.  Even halfword addresses occupy bits 31..16
    /// and debug record 0; odd ones occupy bits 15..0 and debug
    /// record 1.
    ///
    /// # Errors
    ///
    /// Fails if the halfword lies beyond the capacity of the slot.
    pub fn or_halfword(
        &mut self,
        half_address: usize,
        bits: u16,
        info: DebugInfo,
    ) -> Result<(), ImageError> {
        let address = half_address / 2;
        let Some(word) = self.words.get_mut(address) else {
            return Err(self.out_of_range(address));
        };
        if word.debug.len() < 2 {
            word.debug.resize(2, DebugInfo::default());
        }
        if half_address % 2 == 0 {
            word.initial_value |= u32::from(bits) << 16;
            word.set_debug_record(0, info);
        } else {
            word.initial_value |= u32::from(bits);
            word.set_debug_record(1, info);
        }
        Ok(())
    }

    /// Fetch the debug record describing part `index` of the word at
    /// `address`, when the word is considered to be divided into
    /// `divisions` parts.  If the word carries fewer records than
    /// that, the record covering the requested part is returned; if
    /// the requested part is not the first part covered by that
    /// record, it is reported as `FollowHead`.
    pub fn debug_info(&self, address: usize, divisions: usize, index: usize) -> Option<DebugInfo> {
        let word = self.words.get(address)?;
        let mut divisions = divisions.max(1);
        let mut index = index;
        let mut continuation = false;
        while word.debug.len() < divisions {
            divisions /= 2;
            if index % 2 != 0 {
                continuation = true;
            }
            index /= 2;
        }
        let mut info = word.debug.get(index).cloned()?;
        if continuation {
            info.usage = Usage::FollowHead;
        }
        Some(info)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryImage {
    /// Word address of the first instruction to execute.
    pub startup_address: u32,
    /// Set for machines whose words are sixteen bits wide.
    pub is_sixteen_bit: bool,
    slots: Vec<MemorySlot>,
}

impl MemoryImage {
    pub fn new(slot_count: usize) -> MemoryImage {
        MemoryImage {
            startup_address: 0,
            is_sixteen_bit: false,
            slots: (0..slot_count).map(MemorySlot::new).collect(),
        }
    }

    /// An image holding `slots`, which are numbered in order.
    pub fn from_slots(slots: Vec<MemorySlot>) -> MemoryImage {
        MemoryImage {
            startup_address: 0,
            is_sixteen_bit: false,
            slots,
        }
    }

    pub fn slots(&self) -> &[MemorySlot] {
        &self.slots
    }

    pub fn slot(&self, n: usize) -> Option<&MemorySlot> {
        self.slots.get(n)
    }

    pub fn slot_mut(&mut self, n: usize) -> Option<&mut MemorySlot> {
        self.slots.get_mut(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_capacity_tracks_code_size() {
        let mut slot = MemorySlot::new(0);
        assert_eq!(slot.expand_capacity(6), 0);
        assert_eq!(slot.expand_capacity_for_stack(4), 6);
        assert_eq!(slot.word_capacity(), 10);
        assert_eq!(slot.code_size(), 6);
        assert!(slot
            .words()
            .iter()
            .all(|w| w.initial_value == 0 && w.debug_records()[0].usage == Usage::Unknown));
    }

    #[test]
    fn test_set_word_out_of_range() {
        let mut slot = MemorySlot::new(3);
        slot.expand_capacity(2);
        assert_eq!(
            slot.set_word(2, Word::empty()),
            Err(ImageError::AddressOutOfRange {
                slot: 3,
                address: 2,
                capacity: 2
            })
        );
    }

    #[test]
    fn test_or_halfword_fills_both_halves() {
        let mut slot = MemorySlot::new(0);
        slot.expand_capacity(2);
        slot.or_halfword(2, 0x1234, DebugInfo::new(Usage::Instruction))
            .expect("halfword 2 is within the slot");
        slot.or_halfword(3, 0xABCD, DebugInfo::new(Usage::FollowHead))
            .expect("halfword 3 is within the slot");
        let word = slot.word(1).expect("word 1 exists");
        assert_eq!(word.initial_value, 0x1234_ABCD);
        let usages: Vec<Usage> = word.debug_records().iter().map(|r| r.usage).collect();
        assert_eq!(usages, vec![Usage::Instruction, Usage::FollowHead]);
        assert!(slot.or_halfword(4, 0, DebugInfo::default()).is_err());
    }

    #[test]
    fn test_debug_info_of_undivided_word() {
        let mut slot = MemorySlot::new(0);
        slot.expand_capacity(1);
        slot.set_word(
            0,
            Word::new(
                7,
                DebugInfo::new(Usage::Variable).with_annotation("main.x ".to_string()),
            ),
        )
        .expect("word 0 exists");
        let head = slot.debug_info(0, 4, 0).expect("word 0 exists");
        assert_eq!(head.usage, Usage::Variable);
        assert_eq!(head.annotation.as_deref(), Some("main.x "));
        // Later bytes of a single-record word are continuations.
        assert_eq!(
            slot.debug_info(0, 4, 3).map(|info| info.usage),
            Some(Usage::FollowHead)
        );
        assert_eq!(slot.debug_info(1, 1, 0), None);
    }

    #[test]
    fn test_debug_info_of_halfword_word() {
        let mut slot = MemorySlot::new(0);
        slot.expand_capacity(1);
        slot.or_halfword(1, 0x4000, DebugInfo::new(Usage::Instruction))
            .expect("halfword 1 is within the slot");
        // Byte 2 is the first byte of the second halfword.
        assert_eq!(
            slot.debug_info(0, 4, 2).map(|info| info.usage),
            Some(Usage::Instruction)
        );
        assert_eq!(
            slot.debug_info(0, 4, 3).map(|info| info.usage),
            Some(Usage::FollowHead)
        );
        assert_eq!(
            slot.debug_info(0, 2, 0).map(|info| info.usage),
            Some(Usage::Unknown)
        );
    }

    #[test]
    fn test_debug_marker_ignores_empty_text() {
        assert!(!DebugInfo::new(Usage::Instruction)
            .with_debug_marker(Some(String::new()))
            .is_debug_marked());
        assert!(DebugInfo::new(Usage::Instruction)
            .with_debug_marker(Some("x=".to_string()))
            .is_debug_marked());
    }
}
