use anyhow::Result;
use reqwest::Client;
use sonorascraper::{config::Settings, fetch, logging};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();
    let settings = Settings::from_env()?;
    info!(root = %settings.project_root.display(), "SEP download");

    fetch::run_sep(&Client::new(), &settings).await
}
