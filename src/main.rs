use anyhow::Context;
use clap::Parser;
use dwd_poi_ingest::cli::{run, Cli};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    run(cli).await.context("dwd-poi-ingest failed")
}
