use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use parlor::LayoutKind;

#[derive(Parser)]
#[command(
    name = "parlor",
    about = "Inspect and verify Parlor datastore directories",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Print the collections, documents and entry sizes of a datastore
    Inspect(InspectArgs),
    /// Check that a datastore directory opens cleanly
    Verify(VerifyArgs),
    /// Print the effective configuration
    Config(ConfigArgs),
}

#[derive(Args)]
pub struct InspectArgs {
    pub dir: PathBuf,
    /// Layout to read; detected from the layout marker when omitted
    #[arg(long)]
    pub layout: Option<LayoutKind>,
}

#[derive(Args)]
pub struct VerifyArgs {
    pub dir: PathBuf,
    #[arg(long)]
    pub layout: Option<LayoutKind>,
}

#[derive(Args)]
pub struct ConfigArgs {
    /// TOML file to load; defaults are shown when omitted
    #[arg(short, long)]
    pub file: Option<PathBuf>,
}
