use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::job::{CatalogMode, ComparatorKind};

#[derive(Parser)]
#[command(name = "rotback")]
#[command(about = "Incremental mirroring backups with rotating history")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Mirror sources into destinations
    Run(RunArgs),

    /// List files recorded in the catalogue
    Records(RecordsArgs),
}

#[derive(Parser, Default)]
pub struct RunArgs {
    /// TOML job file. Replaces the job flags below when given
    pub config: Option<PathBuf>,

    /// Directories or files to back up
    #[arg(short = 'i', long = "input", value_delimiter = ',')]
    pub inputs: Vec<PathBuf>,

    /// Destinations: one per input, or a single shared one
    #[arg(short = 'o', long = "output", value_delimiter = ',')]
    pub outputs: Vec<PathBuf>,

    /// How changed files are detected
    #[arg(short = 'c', long, value_enum, default_value_t = ComparatorKind::Time)]
    pub compare: ComparatorKind,

    /// Historical versions to keep for each changed or deleted file
    #[arg(short = 'H', long, default_value_t = 0)]
    pub history: u32,

    /// Where the state of the previous run comes from
    #[arg(long, value_enum, default_value_t = CatalogMode::Persistent)]
    pub mode: CatalogMode,

    /// Catalogue database path (defaults to the user data directory)
    #[arg(long)]
    pub catalog: Option<PathBuf>,

    /// Archive each destination with 7z after a successful job
    #[arg(short = 'a', long, default_value_t = false)]
    pub archive: bool,

    /// Output results as JSON instead of a table
    #[arg(long, default_value_t = false)]
    pub json: bool,

    /// Log every file action
    #[arg(long, short = 'v', default_value_t = false)]
    pub verbose: bool,
}

#[derive(Parser)]
pub struct RecordsArgs {
    /// Catalogue database path (defaults to the user data directory)
    #[arg(long)]
    pub catalog: Option<PathBuf>,

    /// Only list records whose source lies under this path
    #[arg(long)]
    pub source: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,
}
