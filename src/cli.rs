use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "versionmerge")]
#[command(author, version, about = "Consolidate duplicate movie and episode versions in a media catalog")]
pub struct Cli {
    /// Path to config file (JSON)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Catalog database path, overriding `server.db_path`
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP API and scheduler
    Start {
        /// Host to bind to (defaults to `server.host`)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (defaults to `server.port`)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Link every group of repeated movies under one primary version
    MergeMovies,

    /// Undo movie linkage so every version stands alone
    SplitMovies,

    /// Link every group of repeated episodes under one primary version
    MergeEpisodes,

    /// Undo episode linkage so every version stands alone
    SplitEpisodes,

    /// Split the group a single item belongs to
    SplitItem {
        /// Item ID (primary or alternate)
        id: String,
    },

    /// Load a catalog snapshot (JSON) into the database
    Import {
        /// Snapshot file
        #[arg(required = true)]
        file: PathBuf,
    },

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },
}
