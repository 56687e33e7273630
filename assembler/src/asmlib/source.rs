//! Positions in the source program.
//!
//! The parser hands us positions of two kinds.  Nodes of the parse
//! tree know the file they came from and the token which begins
//! them.  Positions which were synthesized after parsing (for
//! example for an operand the parser inserted) only have a line and
//! column.
use std::fmt::{self, Display, Formatter};

#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, PartialOrd, Ord, Default)]
pub struct LineAndColumn {
    pub line: u32,
    pub column: u32,
}

impl Display for LineAndColumn {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "line: {},col: {}", self.line, self.column)
    }
}

#[derive(Debug, PartialEq, Eq, Hash, Clone, Default)]
pub enum AssemblePosition {
    /// No position is known (for example, for an error about the
    /// whole program).
    #[default]
    Unknown,
    ParseNode {
        file: String,
        location: LineAndColumn,
        token: String,
    },
    Raw {
        file: Option<String>,
        location: LineAndColumn,
    },
}

impl AssemblePosition {
    pub fn raw(line: u32, column: u32) -> AssemblePosition {
        AssemblePosition::Raw {
            file: None,
            location: LineAndColumn { line, column },
        }
    }

    pub fn location(&self) -> Option<LineAndColumn> {
        match self {
            AssemblePosition::Unknown => None,
            AssemblePosition::ParseNode { location, .. }
            | AssemblePosition::Raw { location, .. } => Some(*location),
        }
    }

    pub fn file(&self) -> Option<&str> {
        match self {
            AssemblePosition::Unknown | AssemblePosition::Raw { file: None, .. } => None,
            AssemblePosition::ParseNode { file, .. }
            | AssemblePosition::Raw {
                file: Some(file), ..
            } => Some(file.as_str()),
        }
    }

    /// The location in the form used in debug annotations,
    /// `line: L,col: C`.
    pub fn location_text(&self) -> String {
        self.location().unwrap_or_default().to_string()
    }
}

impl Display for AssemblePosition {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            AssemblePosition::Unknown => f.write_str("unknown position"),
            AssemblePosition::ParseNode {
                file,
                location,
                token,
            } => write!(f, "{file}: {location} (at '{token}')"),
            AssemblePosition::Raw {
                file: Some(file),
                location,
            } => write!(f, "{file}: {location}"),
            AssemblePosition::Raw {
                file: None,
                location,
            } => location.fmt(f),
        }
    }
}

#[test]
fn test_location_text() {
    assert_eq!(AssemblePosition::raw(3, 14).location_text(), "line: 3,col: 14");
    let node = AssemblePosition::ParseNode {
        file: "prog.asm".to_string(),
        location: LineAndColumn { line: 7, column: 1 },
        token: "sng4".to_string(),
    };
    assert_eq!(node.location_text(), "line: 7,col: 1");
    assert_eq!(node.file(), Some("prog.asm"));
    assert_eq!(node.to_string(), "prog.asm: line: 7,col: 1 (at 'sng4')");
    assert_eq!(AssemblePosition::Unknown.location_text(), "line: 0,col: 0");
}
