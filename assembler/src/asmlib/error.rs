//! Errors reported by the stages of the assembly pipeline.
use std::error::Error;
use std::fmt::{self, Display, Formatter};

use super::source::AssemblePosition;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ErrorKind {
    MacroNotFound,
    MacroArgumentMismatch,
    MacroRecursionLimit,
    /// A macrocall survived macro expansion.  This indicates a bug.
    UnexpandedMacrocall,
    IdentifierNotFound,
    UnknownMnemonic,
    /// Wrong operand count, operand type or register class.
    InvalidOperandForm,
    ImmediateOutOfRange,
    DisplacementOverflow,
    MultipleStartupSections,
    ArrayLengthMismatch,
    UnknownISA,
    /// A word was placed outside the memory image.  This indicates a
    /// bug.
    ImageOverflow,
    /// A storage slot lists a sharer which does not hold it.  This
    /// indicates a bug.
    SlotNotHeld,
}

impl ErrorKind {
    /// The title under which errors of this kind are reported,
    /// naming the stage which found them.
    pub fn stage_title(&self) -> &'static str {
        match self {
            ErrorKind::MacroNotFound
            | ErrorKind::MacroArgumentMismatch
            | ErrorKind::MacroRecursionLimit => "Macro expanding",
            ErrorKind::UnexpandedMacrocall | ErrorKind::IdentifierNotFound => "Refersolving",
            ErrorKind::UnknownMnemonic
            | ErrorKind::InvalidOperandForm
            | ErrorKind::ImmediateOutOfRange
            | ErrorKind::DisplacementOverflow
            | ErrorKind::ImageOverflow
            | ErrorKind::SlotNotHeld => "Assemble",
            ErrorKind::MultipleStartupSections => "Assembler",
            ErrorKind::ArrayLengthMismatch => "Program tree",
            ErrorKind::UnknownISA => "Target selection",
        }
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ErrorKind::MacroNotFound => "macro not found",
            ErrorKind::MacroArgumentMismatch => "macro argument mismatch",
            ErrorKind::MacroRecursionLimit => "macro recursion limit exceeded",
            ErrorKind::UnexpandedMacrocall => "unexpanded macrocall",
            ErrorKind::IdentifierNotFound => "identifier not found",
            ErrorKind::UnknownMnemonic => "unknown mnemonic",
            ErrorKind::InvalidOperandForm => "invalid operand form",
            ErrorKind::ImmediateOutOfRange => "immediate out of range",
            ErrorKind::DisplacementOverflow => "displacement overflow",
            ErrorKind::MultipleStartupSections => "multiple startup sections",
            ErrorKind::ArrayLengthMismatch => "array length mismatch",
            ErrorKind::UnknownISA => "unknown ISA",
            ErrorKind::ImageOverflow => "memory image overflow",
            ErrorKind::SlotNotHeld => "storage slot not held by its sharer",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembleError {
    pub kind: ErrorKind,
    pub title: String,
    pub detail: String,
    pub position: AssemblePosition,
}

impl AssembleError {
    pub fn new(kind: ErrorKind, detail: String, position: AssemblePosition) -> AssembleError {
        AssembleError {
            kind,
            title: kind.stage_title().to_string(),
            detail,
            position,
        }
    }

    #[must_use]
    pub fn with_title(mut self, title: &str) -> AssembleError {
        self.title = title.to_string();
        self
    }
}

impl Display for AssembleError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.position {
            AssemblePosition::Unknown => write!(f, "{}: {}", self.title, self.detail),
            position => match position.file() {
                Some(file) => write!(
                    f,
                    "{file}: {}: {}: {}",
                    position.location_text(),
                    self.title,
                    self.detail
                ),
                None => write!(
                    f,
                    "{}: {}: {}",
                    position.location_text(),
                    self.title,
                    self.detail
                ),
            },
        }
    }
}

impl Error for AssembleError {}

#[test]
fn test_display_of_error() {
    let e = AssembleError::new(
        ErrorKind::MacroNotFound,
        "Macro definition 'swap' not found.".to_string(),
        AssemblePosition::raw(4, 2),
    );
    assert_eq!(
        e.to_string(),
        "line: 4,col: 2: Macro expanding: Macro definition 'swap' not found."
    );
    let e = e.with_title("Expander");
    assert_eq!(e.title, "Expander");
    assert_eq!(e.kind, ErrorKind::MacroNotFound);
}
