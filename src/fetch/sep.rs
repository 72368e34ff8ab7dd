// src/fetch/sep.rs

use anyhow::{Context, Result};
use reqwest::Client;
use std::path::Path;
use tokio::fs;
use tracing::{error, info, instrument};

use super::download::stream_to_file;

/// Formato 911 basic-education files, one per school cycle.
static FORMATO_911_URLS: &[(&str, &str)] = &[
    (
        "2019-2020",
        "https://repodatos.atdt.gob.mx/s_educacion_publica/f911/BASICA_2019-2020.csv",
    ),
    (
        "2020-2021",
        "https://repodatos.atdt.gob.mx/s_educacion_publica/f911/BASICA_2020-2021.csv",
    ),
    (
        "2021-2022",
        "https://repodatos.atdt.gob.mx/s_educacion_publica/f911/BASICA_2021-2022.csv",
    ),
    (
        "2022-2023",
        "https://repodatos.atdt.gob.mx/s_educacion_publica/f911/BASICA_2022-2023.csv",
    ),
    (
        "2023-2024",
        "https://repodatos.atdt.gob.mx/s_educacion_publica/f911/ESTANDAR_BASICA_I2324.csv",
    ),
];

/// One row of a fixed download table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub label: String,
    pub url: String,
}

impl CatalogEntry {
    pub fn new(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            url: url.into(),
        }
    }

    /// `formato_911_basica_<cycle>.csv`
    pub fn file_name(&self) -> String {
        format!("formato_911_basica_{}.csv", self.label)
    }
}

/// What happened to a single entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadOutcome {
    Skipped,
    Downloaded { bytes: u64 },
    Failed,
}

/// The built-in cycle → URL table.
pub fn formato_911_entries() -> Vec<CatalogEntry> {
    FORMATO_911_URLS
        .iter()
        .map(|(label, url)| CatalogEntry::new(*label, *url))
        .collect()
}

/// Download every entry not already present in `dest_dir`.
///
/// Per-entry failures are logged and do not stop the batch.
#[instrument(level = "info", skip(client, entries, dest_dir), fields(dir = %dest_dir.display()))]
pub async fn download_formato_911(
    client: &Client,
    entries: &[CatalogEntry],
    dest_dir: &Path,
) -> Result<Vec<DownloadOutcome>> {
    fs::create_dir_all(dest_dir)
        .await
        .with_context(|| format!("creating {}", dest_dir.display()))?;

    let mut outcomes = Vec::with_capacity(entries.len());
    for entry in entries {
        let dest = dest_dir.join(entry.file_name());
        if fs::try_exists(&dest).await.unwrap_or(false) {
            info!(cycle = %entry.label, "already present, skipping");
            outcomes.push(DownloadOutcome::Skipped);
            continue;
        }

        info!(cycle = %entry.label, url = %entry.url, "downloading");
        match stream_to_file(client, &entry.url, &dest).await {
            Ok(bytes) => {
                info!(cycle = %entry.label, bytes, path = %dest.display(), "saved");
                outcomes.push(DownloadOutcome::Downloaded { bytes });
            }
            Err(e) => {
                error!(cycle = %entry.label, error = %format!("{:#}", e), "download failed");
                outcomes.push(DownloadOutcome::Failed);
            }
        }
    }

    info!("Formato 911 download finished");
    Ok(outcomes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn entries_for(server: &MockServer) -> Vec<CatalogEntry> {
        vec![
            CatalogEntry::new("2019-2020", format!("{}/BASICA_2019-2020.csv", server.uri())),
            CatalogEntry::new("2020-2021", format!("{}/BASICA_2020-2021.csv", server.uri())),
        ]
    }

    #[test]
    fn test_default_table() {
        let entries = formato_911_entries();
        assert_eq!(entries.len(), 5);
        assert_eq!(entries[4].file_name(), "formato_911_basica_2023-2024.csv");
        assert!(entries[4].url.ends_with("ESTANDAR_BASICA_I2324.csv"));
    }

    #[tokio::test]
    async fn test_second_run_makes_no_requests() {
        let tmp = tempdir().unwrap();
        let client = Client::new();

        {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .respond_with(ResponseTemplate::new(200).set_body_string("CV_CCT,ALUMNOS\n"))
                .expect(2)
                .mount(&server)
                .await;
            let out = download_formato_911(&client, &entries_for(&server), tmp.path())
                .await
                .unwrap();
            assert!(out
                .iter()
                .all(|o| matches!(o, DownloadOutcome::Downloaded { .. })));
        }

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;
        let out = download_formato_911(&client, &entries_for(&server), tmp.path())
            .await
            .unwrap();
        assert_eq!(out, vec![DownloadOutcome::Skipped, DownloadOutcome::Skipped]);
    }

    #[tokio::test]
    async fn test_failure_does_not_stop_batch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/BASICA_2019-2020.csv"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/BASICA_2020-2021.csv"))
            .respond_with(ResponseTemplate::new(200).set_body_string("x\n"))
            .mount(&server)
            .await;

        let tmp = tempdir().unwrap();
        let out = download_formato_911(&Client::new(), &entries_for(&server), tmp.path())
            .await
            .unwrap();

        assert_eq!(
            out,
            vec![
                DownloadOutcome::Failed,
                DownloadOutcome::Downloaded { bytes: 2 }
            ]
        );
        assert!(!tmp.path().join("formato_911_basica_2019-2020.csv").exists());
        assert!(tmp.path().join("formato_911_basica_2020-2021.csv").exists());
    }
}
