use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Asynchronous job engine for SFTP file resources.
#[derive(Parser)]
#[command(name = "sftpjobs", version, about, long_about = None)]
pub struct Cli {
    /// Emit logs as JSON lines on stderr.
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Print JSON Schema for file resource properties.
    Schema,
    /// Answer lifecycle requests read line by line from stdin.
    Serve(ServeArgs),
}

#[derive(Args)]
pub struct ServeArgs {
    /// Interval at which update and delete poll their job.
    #[arg(long, default_value = "50ms")]
    pub poll_interval: humantime::Duration,

    /// Serve from this local directory instead of an SFTP server.
    #[arg(long)]
    pub local_root: Option<PathBuf>,

    /// Directory listed when a list request names none.
    #[arg(long, default_value = "/upload")]
    pub default_directory: String,
}
