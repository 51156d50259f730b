//! Command-line interface

pub mod output;
pub mod terminal_output;

use clap::Parser;
use std::ffi::OsString;
use std::path::PathBuf;

/// Release every package of the monorepo at one version
#[derive(Debug, Parser, Clone)]
#[command(name = "release")]
#[command(version)]
#[command(
    about = "Version, build, publish and tag every package of the monorepo",
    long_about = None
)]
pub struct Cli {
    /// Version to release, e.g. 4.0.500
    #[arg(id = "release_version", value_name = "VERSION")]
    pub version: String,

    /// Monorepo root
    #[arg(long, default_value = ".")]
    pub root: PathBuf,

    /// Release configuration file [default: <root>/release.yaml, else built-in]
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Write no files and run no commands
    #[arg(long)]
    pub dry_run: bool,

    /// Validate, print the publish order and exit
    #[arg(long)]
    pub plan: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Parse CLI arguments from environment
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Parse CLI arguments from a slice
    pub fn try_parse_from<I, T>(itr: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(itr)
    }
}
