#![warn(clippy::all, rust_2018_idioms)]

use clap::Parser as _;

use tablescan::cli;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = cli::Cli::parse();
    cli::run(&cli)
}
