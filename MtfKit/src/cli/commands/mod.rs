use std::path::PathBuf;

use clap::Subcommand;

pub mod extract;
pub mod list;

#[derive(Subcommand)]
pub enum Commands {
    /// Extract an MTF archive, or every archive under a directory
    Extract {
        /// Source archive, or a directory to search for .mtf files
        #[arg(short, long)]
        source: PathBuf,

        /// Output directory (one subfolder per archive)
        #[arg(short, long)]
        destination: PathBuf,

        /// Extract a single entry by its archive path
        #[arg(long)]
        file: Option<String>,

        /// Suppress progress output
        #[arg(short, long)]
        quiet: bool,
    },

    /// List the contents of an MTF archive
    List {
        /// Source archive
        #[arg(short, long)]
        source: PathBuf,

        /// Show offsets, sizes and compression tags
        #[arg(short, long)]
        detailed: bool,
    },
}

impl Commands {
    pub fn execute(self) -> anyhow::Result<()> {
        match self {
            Commands::Extract {
                source,
                destination,
                file,
                quiet,
            } => extract::execute(&source, &destination, file.as_deref(), quiet),
            Commands::List { source, detailed } => list::execute(&source, detailed),
        }
    }
}
