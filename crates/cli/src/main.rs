use std::path::PathBuf;

use anyhow::Result;
use binprep::commands::{disassemble_command, report_stringargs_command, status_command};
use binprep::logging::init_tracing;
use binprep_core::pipeline::PrepareOptions;
use clap::{ArgAction, Parser, Subcommand};

/// Executable preparation and string-argument reporting CLI.
///
/// This CLI is a thin wrapper around `binprep-core` (exposed in code as `binprep_core`).
/// All substantive logic lives in the library so it can be tested thoroughly.
#[derive(Parser, Debug)]
#[command(
    name = "binprep",
    version,
    about = "Prepare executables for analysis and report string-argument call sites",
    long_about = None
)]
struct Cli {
    /// Tool config JSON. Defaults to $BINPREP_CONFIG, then built-in defaults.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug). RUST_LOG overrides this.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract (if needed) and disassemble an executable.
    ///
    /// This will:
    /// - Reuse saved extraction artifacts when present.
    /// - Run the external analyzer in disassembly-only mode.
    /// - Write the assembly and orphan-instruction logs into `<file>.ch/analysis`.
    Disassemble {
        /// Executable to prepare.
        file: String,

        /// Executable format (x86-pe or mips-elf).
        #[arg(long, default_value = "x86-pe")]
        format: String,

        /// Also write the XML disassembly status document.
        #[arg(long, default_value_t = false)]
        xml: bool,

        /// Remove existing analysis results before disassembling.
        #[arg(long, default_value_t = false)]
        reset: bool,

        /// The executable file is hex-encoded.
        #[arg(long, default_value_t = false)]
        extract_hex: bool,
    },

    /// Report call sites that pass string literals, optionally for one target.
    ReportStringargs {
        /// Prepared executable.
        file: String,

        /// Executable format (x86-pe or mips-elf).
        #[arg(long, default_value = "mips-elf")]
        format: String,

        /// Only show calls to this target.
        #[arg(long)]
        target: Option<String>,

        /// Emit JSON instead of human-readable text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Show the cache state of an executable.
    Status {
        /// Executable to inspect.
        file: String,

        /// Executable format (x86-pe or mips-elf).
        #[arg(long, default_value = "x86-pe")]
        format: String,

        /// Emit JSON instead of human-readable text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let config = cli.config.as_deref();

    match cli.command {
        Command::Disassemble { file, format, xml, reset, extract_hex } => {
            let options = PrepareOptions { emit_xml: xml, reset, hex_input: extract_hex };
            disassemble_command(config, &file, &format, options)?
        }
        Command::ReportStringargs { file, format, target, json } => {
            report_stringargs_command(config, &file, &format, target.as_deref(), json)?
        }
        Command::Status { file, format, json } => status_command(config, &file, &format, json)?,
    }

    Ok(())
}
