//! Command-line arguments.

use std::path::PathBuf;

use clap::Parser;

/// Watch an image tree and log what each slideshow group is showing.
#[derive(Debug, Parser)]
#[command(name = "slideshow", version, about)]
pub struct Args {
    /// TOML file with `[index]` and `[rotation]` tables.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Image directory to watch (overrides the config file).
    #[arg(short, long)]
    pub root: Option<PathBuf>,

    /// File patterns separated by `|`, e.g. "*.jpg|*.png".
    #[arg(long)]
    pub filters: Option<String>,

    /// Prefix for published URIs, e.g. "/Images/".
    #[arg(long)]
    pub uri_prefix: Option<String>,

    /// Group shown when a group has no files of its own.
    #[arg(long)]
    pub default_group: Option<String>,

    /// Groups to follow.
    #[arg(required = true)]
    pub groups: Vec<String>,
}
