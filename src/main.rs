// src/main.rs

use clap::Parser;
use sitescore::cli::{self, Cli};
use sitescore::lifecycle;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    lifecycle::init_logging();

    cli::run(Cli::parse()).await
}
