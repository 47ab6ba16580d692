//! folio CLI - numbered HTML books from AsciiDoc and Markdown sources.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

mod commands;

use commands::preset::PresetFile;

#[derive(Parser)]
#[command(name = "folio")]
#[command(about = "Build numbered, navigable HTML books from AsciiDoc and Markdown sources")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new book
    Init {
        /// Book directory
        #[arg(default_value = ".")]
        dir: PathBuf,

        /// Overwrite existing files
        #[arg(short, long)]
        yes: bool,
    },

    /// Build the book into its site directory
    Build {
        /// Book directory, or any directory below it
        #[arg(default_value = ".")]
        dir: PathBuf,

        /// Stop starting new conversions after the first failure
        #[arg(long)]
        fail_fast: bool,

        /// Number of conversion workers
        #[arg(short, long)]
        jobs: Option<usize>,

        /// Recompile every document instead of reusing the build cache
        #[arg(short, long)]
        force: bool,
    },

    /// Print one of the files `init` creates
    #[command(alias = "p")]
    Preset {
        /// File to print
        #[arg(value_enum)]
        file: PresetFile,
    },

    /// Remove the generated site, keeping dot-files, and the build cache
    Clean {
        /// Book directory, or any directory below it
        #[arg(default_value = ".")]
        dir: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    fmt().with_env_filter(filter).with_target(false).init();

    match cli.command {
        Commands::Init { dir, yes } => {
            commands::init::run(&dir, yes)?;
        }
        Commands::Build {
            dir,
            fail_fast,
            jobs,
            force,
        } => {
            commands::build::run(&dir, fail_fast, jobs, force)?;
        }
        Commands::Preset { file } => {
            commands::preset::run(file);
        }
        Commands::Clean { dir } => {
            commands::clean::run(&dir)?;
        }
    }

    Ok(())
}
