use crate::format::ExportParams;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "svs-convert",
    about = "Convert singing voice synthesis projects between formats!"
)]
pub struct Args {
    /// Path to the project to convert.
    pub input: PathBuf,

    /// Where to write the converted project. Required unless doing a dry run.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Input format: midi|json. Inferred from the input extension when omitted.
    #[arg(long)]
    pub from: Option<String>,

    /// Output format: midi|json. Inferred from the output extension when omitted.
    #[arg(long)]
    pub to: Option<String>,

    /// Drop everything at or after this tick (480 ticks per quarter note).
    #[arg(long = "max-length")]
    pub max_length: Option<i64>,

    /// Dry run (print a summary of the imported project and exit).
    #[arg(short, long, default_value_t = false)]
    pub dry_run: bool,

    /// Prints extra information to the terminal.
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    pub fn export_params(&self) -> ExportParams {
        ExportParams {
            length_limit: self.max_length,
        }
    }
}
