//! Command line arguments

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// xpad - sticky notes kept as plain files
///
/// Pads are stored as info/content file pairs in the config directory.
/// Pads are addressed by their number in `list` or by info file name.
#[derive(Parser, Debug)]
#[command(name = "xpad", version, about, long_about = None)]
pub struct Args {
    /// Directory holding pad files and settings.json
    #[arg(long, global = true)]
    pub config_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List all saved pads
    List,

    /// Create a new pad
    New {
        text: Option<String>,
        /// Treat TEXT as markup with <b>, <i>, <u> and <s> tags
        #[arg(long)]
        markup: bool,
    },

    /// Create a new pad holding the contents of a file
    Import { path: PathBuf },

    /// Show a hidden pad
    Show { pad: String },

    /// Hide a pad
    Close { pad: String },

    /// Show a hidden pad or hide a shown one
    Toggle { pad: String },

    /// Replace a pad's text
    SetText {
        pad: String,
        text: String,
        #[arg(long)]
        markup: bool,
    },

    /// Print a pad's text
    Print {
        pad: String,
        /// Print the stored markup instead of plain text
        #[arg(long)]
        markup: bool,
    },

    /// Delete a pad and its files
    Delete {
        pad: String,
        /// Delete even if the pad has text and confirmation is enabled
        #[arg(long)]
        force: bool,
    },

    /// Show preferences, or set one
    Prefs {
        key: Option<String>,
        value: Option<String>,
    },
}
