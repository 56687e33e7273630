use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::io::Error as IoError;
use std::path::PathBuf;

use super::collections::OneOrMore;
use super::error::AssembleError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoAction {
    Read,
    Write,
    Create,
}

impl Display for IoAction {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            IoAction::Read => "read",
            IoAction::Write => "write",
            IoAction::Create => "create",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IoTarget {
    File(PathBuf),
    Stdout,
}

impl Display for IoTarget {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            IoTarget::File(path) => write!(f, "file {}", path.display()),
            IoTarget::Stdout => f.write_str("standard output"),
        }
    }
}

#[derive(Debug)]
pub struct IoFailed {
    pub action: IoAction,
    pub target: IoTarget,
    pub error: IoError,
}

impl Display for IoFailed {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let IoFailed {
            action,
            target,
            error,
        } = self;
        write!(f, "failed to {action} {target}: {error}")
    }
}

impl Error for IoFailed {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.error)
    }
}

#[derive(Debug)]
pub enum AssemblerFailure {
    Io(IoFailed),
    /// The program tree handed over by the parser could not be
    /// decoded.
    BadProgramTree {
        /// The file the tree was read from, if any.
        input: Option<PathBuf>,
        error: serde_json::Error,
    },
    /// A pipeline stage reported one or more errors.
    Assembly(OneOrMore<AssembleError>),
}

impl AssemblerFailure {
    /// The errors reported by the pipeline, if that is what failed.
    pub fn assembly_errors(&self) -> Option<&OneOrMore<AssembleError>> {
        match self {
            AssemblerFailure::Assembly(errors) => Some(errors),
            _ => None,
        }
    }
}

impl From<OneOrMore<AssembleError>> for AssemblerFailure {
    fn from(errors: OneOrMore<AssembleError>) -> AssemblerFailure {
        AssemblerFailure::Assembly(errors)
    }
}

impl Display for AssemblerFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            AssemblerFailure::Io(e) => e.fmt(f),
            AssemblerFailure::BadProgramTree {
                input: Some(input),
                error,
            } => {
                write!(
                    f,
                    "{} does not contain a valid program tree: {error}",
                    input.display()
                )
            }
            AssemblerFailure::BadProgramTree { input: None, error } => {
                write!(f, "input is not a valid program tree: {error}")
            }
            AssemblerFailure::Assembly(errors) => {
                let count = errors.len();
                if count == 1 {
                    write!(f, "assembly failed: {}", errors.first())
                } else {
                    write!(f, "assembly failed with {count} errors:")?;
                    for e in errors {
                        write!(f, "\n{e}")?;
                    }
                    Ok(())
                }
            }
        }
    }
}

impl Error for AssemblerFailure {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            AssemblerFailure::Io(e) => Some(e),
            AssemblerFailure::BadProgramTree { error, .. } => Some(error),
            AssemblerFailure::Assembly(_) => None,
        }
    }
}
