use anyhow::Result;
use reqwest::Client;
use sonorascraper::{config::Settings, fetch, inegi, logging};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    logging::init();
    info!("startup");

    // ─── 2) resolve project layout ───────────────────────────────────
    let settings = Settings::from_env()?;
    info!(root = %settings.project_root.display(), "project root");
    let client = Client::new();

    // ─── 3) SEP: Formato 911 + school catalog ────────────────────────
    fetch::run_sep(&client, &settings).await?;

    // ─── 4) INEGI: municipal + context indicators ────────────────────
    inegi::run_inegi(&client, &settings).await?;

    info!(
        formato_911 = %settings.formato_911_dir().display(),
        raw = %settings.raw_dir().display(),
        external = %settings.external_dir().display(),
        "all done"
    );
    Ok(())
}
