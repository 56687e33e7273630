use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{event, span, Level};

use base::prelude::{left_half, right_half, MemoryImage, MemorySlot};

use super::super::types::{AssemblerFailure, IoAction, IoFailed, IoTarget};

/// Which part of each word a hex file holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum HexPart {
    Word,
    /// The low sixteen bits, for sixteen-bit machines.
    SixteenBitWord,
    High,
    Low,
}

impl HexPart {
    fn format(self, value: u32) -> String {
        match self {
            HexPart::Word => format!("{value:08X}"),
            HexPart::SixteenBitWord => format!("{:04X}", value & 0xFFFF),
            HexPart::High => format!("{:04X}", left_half(value)),
            HexPart::Low => format!("{:04X}", right_half(value)),
        }
    }
}

fn failure(action: IoAction, path: &Path) -> impl FnOnce(std::io::Error) -> AssemblerFailure {
    let target = IoTarget::File(path.to_path_buf());
    move |error| AssemblerFailure::Io(IoFailed {
        action,
        target,
        error,
    })
}

fn create(path: &Path) -> Result<BufWriter<File>, AssemblerFailure> {
    File::create(path)
        .map(BufWriter::new)
        .map_err(failure(IoAction::Create, path))
}

/// Write one line per word of `memory`, up to its capacity.
pub(super) fn write_hex<W: Write>(
    memory: &MemorySlot,
    part: HexPart,
    writer: &mut W,
) -> Result<(), std::io::Error> {
    for word in memory.words() {
        writeln!(writer, "{}", part.format(word.initial_value))?;
    }
    writer.flush()
}

fn write_hex_to_path(
    image: &MemoryImage,
    part: HexPart,
    path: &Path,
) -> Result<(), AssemblerFailure> {
    let mut writer = create(path)?;
    match image.slot(0) {
        Some(memory) => {
            event!(
                Level::DEBUG,
                "writing {} words to {}",
                memory.word_capacity(),
                path.display()
            );
            write_hex(memory, part, &mut writer).map_err(failure(IoAction::Write, path))
        }
        None => {
            event!(Level::WARN, "the memory image has no slots");
            writer.flush().map_err(failure(IoAction::Write, path))
        }
    }
}

/// Write the words of memory slot 0 as hexadecimal, one per line.
///
/// # Errors
///
/// Fails if the file cannot be created or written.
pub(super) fn write_hex_file(image: &MemoryImage, path: &Path) -> Result<(), AssemblerFailure> {
    let span = span!(Level::INFO, "write hex dump", path = %path.display());
    let _enter = span.enter();
    let part = if image.is_sixteen_bit {
        HexPart::SixteenBitWord
    } else {
        HexPart::Word
    };
    write_hex_to_path(image, part, path)
}

/// The files to which a split hex dump for `output` is written:
/// `<stem>_h.hex` for bits 31..16 and `<stem>_l.hex` for bits 15..0,
/// in the same directory as `output`.
#[must_use]
pub fn split_hex_paths(output: &Path) -> (PathBuf, PathBuf) {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    (
        output.with_file_name(format!("{stem}_h.hex")),
        output.with_file_name(format!("{stem}_l.hex")),
    )
}

/// Write the high and low halfwords of memory slot 0 to separate
/// files named by [`split_hex_paths`].
///
/// # Errors
///
/// Fails if either file cannot be created or written.
pub(super) fn write_split_hex_files(
    image: &MemoryImage,
    output: &Path,
) -> Result<(), AssemblerFailure> {
    let span = span!(Level::INFO, "write split hex dump", output = %output.display());
    let _enter = span.enter();
    let (high, low) = split_hex_paths(output);
    write_hex_to_path(image, HexPart::High, &high)?;
    write_hex_to_path(image, HexPart::Low, &low)
}

/// Write the whole memory image, debug records included, as JSON.
///
/// # Errors
///
/// Fails if the file cannot be created or written.
pub(super) fn write_image_file(image: &MemoryImage, path: &Path) -> Result<(), AssemblerFailure> {
    let mut writer = create(path)?;
    serde_json::to_writer_pretty(&mut writer, image)
        .map_err(std::io::Error::from)
        .and_then(|()| writer.write_all(b"\n"))
        .and_then(|()| writer.flush())
        .map_err(failure(IoAction::Write, path))
}
