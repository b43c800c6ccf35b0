//! `sftpjobs` - asynchronous job engine for SFTP file resources.
//!
//! Requests arrive on stdin as JSON lines and responses leave on stdout;
//! logs go to stderr.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use sftpjobs::cli::{Cli, Command};
use sftpjobs::exit_codes::exit;

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);
    let exit_code = match cli.command {
        Command::Schema => {
            println!("{}", sftpjobs::model::generate_schema());
            exit::SUCCESS
        }
        Command::Serve(args) => match sftpjobs::engine::serve(args) {
            Ok(code) => code,
            Err(e) => {
                tracing::error!("{e:#}");
                exit::OPERATIONAL_FAILURE
            }
        },
    };
    std::process::exit(exit_code);
}
