use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Ask grounded questions about a folder of PDFs.
#[derive(Debug, Parser)]
#[command(name = "pdfrag", version, about)]
pub struct Cli {
    /// Directory holding the vector index.
    #[arg(long, env = "PDFRAG_DB", global = true, default_value = "./pdfrag-db")]
    pub db: PathBuf,

    /// JSON file with pipeline settings.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Collection to read and write instead of the configured one.
    #[arg(long, global = true)]
    pub collection: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Index every PDF directly inside a directory.
    Ingest {
        /// Directory to scan.
        dir: PathBuf,
    },
    /// Index a single PDF.
    Add {
        /// The PDF file.
        file: PathBuf,
    },
    /// Show the chunks nearest to a query.
    Search {
        query: String,
        /// How many chunks to show.
        #[arg(long)]
        top_k: Option<usize>,
    },
    /// Answer one question.
    Ask { query: String },
    /// Answer questions interactively.
    Chat,
}
