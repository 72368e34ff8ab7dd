// src/inegi/mod.rs

//! INEGI indicator series: fetch per location, flatten, write one CSV per indicator.

pub mod series;
pub mod types;
pub mod write;

use anyhow::{Context, Result};
use reqwest::Client;
use std::path::{Path, PathBuf};
use tokio::{fs, time::sleep};
use tracing::{error, info, instrument, warn};

use crate::config::{self, GeoLevel, IndicatorConfig, Municipalities, Settings};
use series::{fetch_series, SeriesRequest, MUNICIPAL_SOURCE, NATIONAL_CODE, SONORA_CODE};
pub use types::{ContextRow, IndicatorOutcome, MunicipalRow, Observation};
use write::write_rows;

fn output_path(dir: &Path, indicator: &IndicatorConfig) -> PathBuf {
    dir.join(format!("{}.csv", indicator.name))
}

async fn already_written(path: &Path) -> bool {
    fs::try_exists(path).await.unwrap_or(false)
}

/// Full history of every municipal indicator, one request per municipality.
///
/// A failing municipality is logged and skipped; the indicator is written
/// with whatever rows the others produced. Null values are kept.
#[instrument(level = "info", skip_all, fields(indicators = indicators.len()))]
pub async fn download_municipal(
    client: &Client,
    settings: &Settings,
    token: &str,
    indicators: &[IndicatorConfig],
    municipalities: &Municipalities,
) -> Result<Vec<IndicatorOutcome>> {
    let out_dir = settings.external_dir();
    fs::create_dir_all(&out_dir)
        .await
        .with_context(|| format!("creating {}", out_dir.display()))?;

    let mut outcomes = Vec::with_capacity(indicators.len());
    for indicator in indicators {
        let path = output_path(&out_dir, indicator);
        if already_written(&path).await {
            info!(indicator = %indicator.name, "already present, skipping");
            outcomes.push(IndicatorOutcome::Skipped);
            continue;
        }

        info!(indicator = %indicator.name, id = %indicator.inegi_id, "processing municipal indicator");
        let mut rows: Vec<MunicipalRow> = Vec::new();
        for (name, code) in municipalities.iter() {
            let req = SeriesRequest {
                indicator_id: &indicator.inegi_id,
                location: format!("{}{}", SONORA_CODE, code),
                source: MUNICIPAL_SOURCE,
                token,
            };
            match fetch_series(client, &settings.inegi_base_url, &req).await {
                Ok(obs) if obs.is_empty() => {
                    warn!(indicator = %indicator.name, municipio = name, "no observations");
                }
                Ok(obs) => rows.extend(obs.into_iter().map(|o| MunicipalRow {
                    municipio: name.to_string(),
                    periodo: o.period,
                    valor: o.value,
                })),
                Err(e) => {
                    warn!(indicator = %indicator.name, municipio = name, error = %format!("{:#}", e), "request failed");
                }
            }
            sleep(settings.request_pause).await;
        }

        outcomes.push(finish(&path, &indicator.name, &rows));
    }
    Ok(outcomes)
}

/// State and national context indicators, one request each.
#[instrument(level = "info", skip_all, fields(indicators = indicators.len()))]
pub async fn download_context(
    client: &Client,
    settings: &Settings,
    token: &str,
    indicators: &[IndicatorConfig],
) -> Result<Vec<IndicatorOutcome>> {
    let out_dir = settings.external_dir();
    fs::create_dir_all(&out_dir)
        .await
        .with_context(|| format!("creating {}", out_dir.display()))?;

    let mut outcomes = Vec::with_capacity(indicators.len());
    for indicator in indicators {
        let path = output_path(&out_dir, indicator);
        if already_written(&path).await {
            info!(indicator = %indicator.name, "already present, skipping");
            outcomes.push(IndicatorOutcome::Skipped);
            continue;
        }

        let location = match indicator.geo_level {
            GeoLevel::Nacional => NATIONAL_CODE,
            GeoLevel::Estatal => SONORA_CODE,
        };
        info!(indicator = %indicator.name, source = indicator.source(), location, "processing context indicator");

        let req = SeriesRequest {
            indicator_id: &indicator.inegi_id,
            location: location.to_string(),
            source: indicator.source(),
            token,
        };
        let rows: Vec<ContextRow> =
            match fetch_series(client, &settings.inegi_base_url, &req).await {
                Ok(obs) => obs
                    .into_iter()
                    .map(|o| ContextRow {
                        periodo: o.period,
                        valor: o.value,
                    })
                    .collect(),
                Err(e) => {
                    error!(indicator = %indicator.name, error = %format!("{:#}", e), "request failed");
                    Vec::new()
                }
            };

        outcomes.push(finish(&path, &indicator.name, &rows));
    }
    Ok(outcomes)
}

/// Write the collected rows. A failed write is logged and does not stop the batch.
fn finish<T: serde::Serialize>(path: &Path, name: &str, rows: &[T]) -> IndicatorOutcome {
    if rows.is_empty() {
        warn!(indicator = name, "no rows collected, nothing written");
        return IndicatorOutcome::Empty;
    }
    match write_rows(path, rows) {
        Ok(()) => {
            info!(indicator = name, rows = rows.len(), path = %path.display(), "saved");
            IndicatorOutcome::Written { rows: rows.len() }
        }
        Err(e) => {
            error!(indicator = name, error = %format!("{:#}", e), "could not write CSV");
            IndicatorOutcome::Failed
        }
    }
}

/// Load token and references, then run municipal and context downloads.
pub async fn run_inegi(client: &Client, settings: &Settings) -> Result<()> {
    info!("starting INEGI downloads");
    let token = config::load_token(settings)?;
    let refs = config::load_references(&settings.references_dir())?;

    download_municipal(client, settings, &token, &refs.municipal, &refs.municipalities).await?;
    download_context(client, settings, &token, &refs.context).await?;
    info!(dir = %settings.external_dir().display(), "INEGI downloads finished");
    Ok(())
}
