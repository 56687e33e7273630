use std::error::Error;
use std::ffi::OsString;
use std::fmt::{self, Display, Formatter};
use std::path::PathBuf;

use clap::ArgAction::{Set, SetTrue};
use clap::Parser;
use tracing::{event, span, Level};
use tracing_subscriber::prelude::*;

use oiscasm::*;

/// Assembler for the SUBNEG4X and SubRISC one-instruction computers
#[derive(Parser, Debug)]
#[clap(version, about, long_about = None)]
struct Cli {
    /// File from which the program tree (JSON, as produced by the
    /// parser) is read.
    #[clap(action = Set)]
    input: OsString,

    /// File to which the hex dump is written.  For SubRISC targets
    /// the dump is split into <stem>_h.hex and <stem>_l.hex.
    #[clap(action = Set, short = 'o', long)]
    output: OsString,

    /// Target instruction set: sng4x, sng4x16, subrisc or
    /// subrisc-delaybranch.
    #[clap(action = Set, long, default_value = "sng4x")]
    isa: String,

    /// Minimum memory size in words.  If the program uses fewer
    /// words, the difference is appended as stack words, which are
    /// not counted in the code size.
    #[clap(action = Set, long, default_value_t = 1)]
    min_memory_size: usize,

    /// Print the listing dump of the memory image on standard output.
    /// The variable mapping dump is logged at debug level.
    #[clap(action = SetTrue, long)]
    list: bool,

    /// Also write the memory image, with its debug information, to
    /// this file as JSON.
    #[clap(action = Set, long)]
    image: Option<PathBuf>,
}

#[derive(Debug)]
enum Fail {
    /// The assembler was initialised but then failed.
    AsmFail(AssemblerFailure),
    /// We were not able to correctly initialise the assembler.
    InitialisationFailure(String),
}

impl Display for Fail {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            Fail::AsmFail(assembler_failure) => assembler_failure.fmt(f),
            Fail::InitialisationFailure(msg) => f.write_str(msg.as_str()),
        }
    }
}

impl Error for Fail {}

fn run_assembler() -> Result<(), Fail> {
    let cli = Cli::parse();

    // RUST_LOG selects which trace messages get printed; see the
    // tracing_subscriber::EnvFilter documentation.
    let fmt_layer = tracing_subscriber::fmt::layer().with_target(true);
    let filter_layer = match tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new("info"))
    {
        Err(e) => {
            return Err(Fail::InitialisationFailure(format!(
                "failed to initialise tracing filter (perhaps there is a problem with environment variables): {e}"
            )));
        }
        Ok(layer) => layer,
    };

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();

    let span = span!(Level::ERROR, "oiscas", input=?cli.input, output=?cli.output);
    let _enter = span.enter();
    let output_path = PathBuf::from(cli.output);
    let options = AssembleOptions {
        isa: cli.isa,
        min_memory_size: cli.min_memory_size,
    };
    let output_options = OutputOptions {
        list: cli.list,
        image: cli.image,
    };
    let result =
        assemble_file(&cli.input, &output_path, &options, &output_options).map_err(Fail::AsmFail);
    match &result {
        Err(Fail::AsmFail(failure)) => match failure.assembly_errors() {
            Some(errors) => {
                for e in errors {
                    event!(Level::ERROR, kind = ?e.kind, "{e}");
                }
            }
            None => event!(Level::ERROR, "assembly failed: {failure}"),
        },
        Err(e) => event!(Level::ERROR, "assembly failed: {e}"),
        Ok(()) => event!(Level::INFO, "assembly succeeded"),
    }
    result
}

fn main() {
    match run_assembler() {
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
        Ok(()) => {
            std::process::exit(0);
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::{CommandFactory, Parser};

    use super::Cli;

    fn help_of(id: &str) -> String {
        Cli::command()
            .get_arguments()
            .find(|arg| arg.get_id() == id)
            .and_then(|arg| arg.get_help())
            .map(ToString::to_string)
            .unwrap_or_else(|| panic!("no help for {id}"))
    }

    #[test]
    fn test_command_line() {
        Cli::command().debug_assert();
        let cli = Cli::try_parse_from(["oiscas", "prog.json", "-o", "prog.hex", "--list"])
            .expect("valid command line");
        assert_eq!(cli.isa, "sng4x");
        assert_eq!(cli.min_memory_size, 1);
        assert!(cli.list);
        assert!(help_of("min_memory_size").starts_with("Minimum memory size in words"));
        assert!(help_of("list").contains("listing dump"));
        assert!(help_of("list").contains("mapping dump"));
    }
}
