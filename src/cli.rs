use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "sharebox")]
#[command(about = "Share intake relay and receiver", long_about = None)]
pub struct Cli {
    /// Configuration file (defaults to $SHAREBOX_CONFIG or config/sharebox.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Leave a URI in the app group for the host to pick up
    Share(ShareArgs),
    /// Leave raw content with a declared type in the app group
    ShareText(ShareTextArgs),
    /// Run as the host and print received events as JSON lines
    Receive(ReceiveArgs),
    /// Show the app group identifier and whether it is provisioned
    Group,
    /// Create the app group directory
    Provision,
}

#[derive(clap::Args, Debug)]
pub struct ShareArgs {
    /// URI or absolute file path
    pub uri: String,
}

#[derive(clap::Args, Debug)]
pub struct ShareTextArgs {
    pub content: String,

    /// Declared MIME type of the content
    #[arg(long = "type", default_value = "text/plain")]
    pub content_type: String,
}

#[derive(clap::Args, Debug)]
pub struct ReceiveArgs {
    /// Keep running and read further URIs from stdin
    #[arg(long)]
    pub follow: bool,
}
