use anyhow::Result;
use reqwest::Client;
use sonorascraper::{config::Settings, inegi, logging};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();
    let settings = Settings::from_env()?;
    info!(root = %settings.project_root.display(), "INEGI download");

    inegi::run_inegi(&Client::new(), &settings).await
}
