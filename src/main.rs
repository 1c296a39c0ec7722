use clap::Parser;
use meteo_importer::cli::{run, Cli};
use meteo_importer::error::Result;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    run(cli).await
}
