//! Entry points of the assembler.
//!
//! The pipeline is `build -> expand -> resolve -> allocate -> encode`.
//! Each stage mutates the same program arena.  The pipeline stops
//! after the first stage which reports errors; all the errors of that
//! stage are reported together.
use std::ffi::OsStr;
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};

use tracing::{event, span, Level};

use base::prelude::MemoryImage;

use super::ast::SourceFile;
use super::collections::OneOrMore;
use super::encoder::{self, Isa};
use super::error::AssembleError;
use super::layout::analyze_variables;
use super::listing::ImageListing;
use super::macros::expand_all;
use super::program::build::build_program;
use super::resolve::solve_all;
use super::types::{AssemblerFailure, IoAction, IoFailed, IoTarget};

mod output;

pub use output::split_hex_paths;

/// Choices which affect the content of the memory image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembleOptions {
    /// Name of the target instruction set (`sng4x`, `sng4x16`,
    /// `subrisc` or `subrisc-delaybranch`).
    pub isa: String,
    /// Memory beyond the program is reserved as stack space up to
    /// this many words.
    pub min_memory_size: usize,
}

impl Default for AssembleOptions {
    fn default() -> AssembleOptions {
        AssembleOptions {
            isa: "sng4x".to_string(),
            min_memory_size: 1,
        }
    }
}

/// Choices about what is written, beyond the hex dump.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputOptions {
    /// When set, print a listing of the memory image on standard
    /// output.
    pub list: bool,
    /// When set, also write the memory image (including debug
    /// records) to this file as JSON.
    pub image: Option<PathBuf>,
}

fn run_pipeline(
    source: &SourceFile,
    isa: Isa,
    min_memory_size: usize,
) -> Result<MemoryImage, OneOrMore<AssembleError>> {
    let mut program = build_program(source)?;
    event!(
        Level::DEBUG,
        "program tree has {} sections",
        program.sections().len()
    );
    expand_all(&mut program)?;
    solve_all(&mut program)?;
    let layout = analyze_variables(&mut program)?;
    encoder::assemble(&mut program, &layout, isa, min_memory_size)
}

/// Assemble an already-decoded program tree.
///
/// # Errors
///
/// Fails if the ISA is unknown or any pipeline stage reports an
/// error.
pub fn assemble_program(
    source: &SourceFile,
    options: &AssembleOptions,
) -> Result<MemoryImage, AssemblerFailure> {
    let isa = Isa::from_name(&options.isa).map_err(OneOrMore::new)?;
    let span = span!(Level::INFO, "assemble", isa = %isa);
    let _enter = span.enter();
    Ok(run_pipeline(source, isa, options.min_memory_size)?)
}

/// Assemble a program tree given as JSON text.
///
/// # Errors
///
/// Fails if `input` is not a valid program tree, or for the reasons
/// given for [`assemble_program`].
pub fn assemble_source(
    input: &str,
    options: &AssembleOptions,
) -> Result<MemoryImage, AssemblerFailure> {
    let source: SourceFile = serde_json::from_str(input)
        .map_err(|error| AssemblerFailure::BadProgramTree { input: None, error })?;
    assemble_program(&source, options)
}

fn read_program_tree(input: &Path) -> Result<SourceFile, AssemblerFailure> {
    let file = File::open(input).map_err(|error| {
        AssemblerFailure::Io(IoFailed {
            action: IoAction::Read,
            target: IoTarget::File(input.to_path_buf()),
            error,
        })
    })?;
    serde_json::from_reader(BufReader::new(file)).map_err(|error| {
        if error.is_io() {
            AssemblerFailure::Io(IoFailed {
                action: IoAction::Read,
                target: IoTarget::File(input.to_path_buf()),
                error: error.into(),
            })
        } else {
            AssemblerFailure::BadProgramTree {
                input: Some(input.to_path_buf()),
                error,
            }
        }
    })
}

fn print_listing(image: &MemoryImage) -> Result<(), AssemblerFailure> {
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    write!(handle, "{}", ImageListing::new(image))
        .and_then(|()| handle.flush())
        .map_err(|error| {
            AssemblerFailure::Io(IoFailed {
                action: IoAction::Write,
                target: IoTarget::Stdout,
                error,
            })
        })
}

/// Assemble the program tree in `input_file` and write its hex dump
/// to `output_file`.
///
/// For SubRISC targets the dump is split into two files, one for
/// each halfword; see [`split_hex_paths`].
///
/// # Errors
///
/// Fails if the input cannot be read or decoded, if assembly fails,
/// or if an output file cannot be written.
pub fn assemble_file(
    input_file: &OsStr,
    output_file: &Path,
    options: &AssembleOptions,
    output_options: &OutputOptions,
) -> Result<(), AssemblerFailure> {
    let isa = Isa::from_name(&options.isa).map_err(OneOrMore::new)?;
    let input_path = PathBuf::from(input_file);
    let source = read_program_tree(&input_path)?;

    let span = span!(Level::INFO, "assemble", isa = %isa, input = %input_path.display());
    let _enter = span.enter();
    let image = run_pipeline(&source, isa, options.min_memory_size)?;

    if output_options.list {
        print_listing(&image)?;
    }
    if let Some(image_file) = output_options.image.as_deref() {
        output::write_image_file(&image, image_file)?;
    }
    event!(
        Level::INFO,
        "Entry point is 0x{:08X} (by word address)",
        image.startup_address
    );
    if isa.splits_hex_output() {
        output::write_split_hex_files(&image, output_file)
    } else {
        output::write_hex_file(&image, output_file)
    }
}
