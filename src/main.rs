//! layered-conf
//!
//! Prints configuration resolved from layered sources.

use anyhow::Result;
use clap::Parser;
use layered_conf::cli::Cli;
use layered_conf::logging::{LogTarget, init_tracing};
use tracing::debug;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let target: LogTarget = cli.log.parse()?;
    init_tracing(&target, cli.verbose)?;

    let conf = cli.build();
    debug!(precedence = %conf.precedence(), "Configuration assembled");

    println!("{}", cli.resolve(&conf)?);
    Ok(())
}
