//! Binary crate for the `snowstrip` command-line tool.
//!
//! This crate focuses on:
//! - Parsing CLI arguments and setting up logging
//! - Writing the rendered strip to a file
//! - Serving the strip over HTTP

use clap::Parser;

mod cli;
mod serve;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cmd = cli::Cli::parse();
    cmd.init_tracing();
    cmd.run().await
}
