//! Root CLI parser and subcommands.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Read the main article of a web page aloud.
#[derive(Parser)]
#[command(name = "readaloud")]
#[command(about = "Extract the main article of a page and read it aloud")]
#[command(version)]
pub struct Cli {
    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Extract the article and print its title and sentences
    Extract {
        /// HTML or XHTML file
        file: PathBuf,
        /// Print the article as JSON
        #[arg(long)]
        json: bool,
    },

    /// Read the article aloud on the console
    Read(ReadArgs),
}

/// Arguments of `readaloud read`.
#[derive(Args, Debug, Clone)]
pub struct ReadArgs {
    /// HTML or XHTML file
    pub file: PathBuf,

    /// Start at this sentence of the article (0-based)
    #[arg(long, conflicts_with = "from")]
    pub sentence: Option<usize>,

    /// Start where this phrase appears on the page, as if clicked
    #[arg(long)]
    pub from: Option<String>,

    /// Speech rate multiplier (0.5 to 2.0)
    #[arg(long, default_value_t = 1.0)]
    pub speed: f32,

    /// Volume (0.0 to 1.0)
    #[arg(long, default_value_t = 1.0)]
    pub volume: f32,

    /// Console speaking pace in words per minute at speed 1.0
    #[arg(long, default_value_t = 180, env = "READALOUD_WPM")]
    pub wpm: u32,
}
