//! Command-line demo for the readaloud reader.
//!
//! Loads an HTML/XHTML file as a document tree, extracts the article and
//! reads it through [`ConsoleEngine`], which "speaks" by printing words.

#![deny(unsafe_code)]
#![deny(unused_crate_dependencies)]

// Used by main.rs only
use tracing_subscriber as _;

pub mod console_engine;
pub mod error;
pub mod handlers;
pub mod parser;

pub use console_engine::ConsoleEngine;
pub use error::CliError;
pub use parser::{Cli, Commands, ReadArgs};
