// src/fetch/mod.rs

//! SEP downloads: the Formato 911 school-census files and the Sonora school catalog.

pub mod catalog;
pub mod download;
pub mod sep;

use anyhow::Result;
use reqwest::Client;
use tracing::info;

use crate::config::Settings;

pub use catalog::{download_school_catalog, SCHOOL_CATALOG_URL};
pub use sep::{download_formato_911, formato_911_entries, CatalogEntry, DownloadOutcome};

/// Run both SEP downloads against the default URL tables.
pub async fn run_sep(client: &Client, settings: &Settings) -> Result<()> {
    info!("starting SEP downloads");
    let outcomes =
        download_formato_911(client, &formato_911_entries(), &settings.formato_911_dir()).await?;
    let failed = outcomes
        .iter()
        .filter(|o| **o == DownloadOutcome::Failed)
        .count();
    download_school_catalog(client, SCHOOL_CATALOG_URL, &settings.raw_dir()).await?;
    info!(files = outcomes.len(), failed, "SEP downloads finished");
    Ok(())
}
