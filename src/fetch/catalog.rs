// src/fetch/catalog.rs

use anyhow::{bail, Context, Result};
use csv::{ReaderBuilder, WriterBuilder};
use reqwest::Client;
use std::path::Path;
use tokio::fs;
use tracing::{error, info, instrument};

use super::download::{discard, fetch_bytes, part_path, promote};
use super::sep::DownloadOutcome;

/// Work-centre catalog for the state of Sonora (Latin-1 encoded CSV).
pub const SCHOOL_CATALOG_URL: &str = "https://www.datos.gob.mx/dataset/2a1d047c-546b-4293-971a-c835689a37a5/resource/4f013342-5028-447f-b39d-1c08f09f47f3/download/catalogo_centro_trabajo_26_csv.csv";
pub const SCHOOL_CATALOG_FILE: &str = "catalogo_escuelas_sonora.csv";

/// Every Latin-1 byte maps to the code point of the same value.
pub fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

/// Parse a CSV and write it back out as UTF-8. Returns the number of data records.
pub fn reencode_csv(text: &str, dest: &Path) -> Result<u64> {
    let mut rdr = ReaderBuilder::new()
        .flexible(true)
        .from_reader(text.as_bytes());
    let mut wtr = WriterBuilder::new()
        .flexible(true)
        .from_path(dest)
        .with_context(|| format!("creating {}", dest.display()))?;

    let headers = rdr.headers().context("reading catalog header")?.clone();
    if headers.is_empty() {
        bail!("catalog body has no header row");
    }
    wtr.write_record(&headers)?;

    let mut count = 0u64;
    for record in rdr.records() {
        let record = record.with_context(|| format!("parsing catalog record {}", count + 1))?;
        wtr.write_record(&record)?;
        count += 1;
    }
    wtr.flush()?;
    Ok(count)
}

/// Download the school catalog into `raw_dir` unless it is already there.
#[instrument(level = "info", skip(client, raw_dir), fields(dir = %raw_dir.display()))]
pub async fn download_school_catalog(
    client: &Client,
    url: &str,
    raw_dir: &Path,
) -> Result<DownloadOutcome> {
    fs::create_dir_all(raw_dir)
        .await
        .with_context(|| format!("creating {}", raw_dir.display()))?;

    let dest = raw_dir.join(SCHOOL_CATALOG_FILE);
    if fs::try_exists(&dest).await.unwrap_or(false) {
        info!(file = SCHOOL_CATALOG_FILE, "already present, skipping");
        return Ok(DownloadOutcome::Skipped);
    }

    info!(url, "downloading school catalog");
    match fetch_and_reencode(client, url, &dest).await {
        Ok((bytes, records)) => {
            info!(path = %dest.display(), records, "school catalog saved");
            Ok(DownloadOutcome::Downloaded { bytes })
        }
        Err(e) => {
            error!(error = %format!("{:#}", e), "school catalog download failed");
            Ok(DownloadOutcome::Failed)
        }
    }
}

async fn fetch_and_reencode(client: &Client, url: &str, dest: &Path) -> Result<(u64, u64)> {
    let raw = fetch_bytes(client, url).await?;
    let text = decode_latin1(&raw);
    let tmp = part_path(dest);

    let tmp_c = tmp.clone();
    let written = tokio::task::spawn_blocking(move || reencode_csv(&text, &tmp_c)).await?;
    let records = match written {
        Ok(n) => n,
        Err(e) => {
            discard(&tmp).await;
            return Err(e);
        }
    };

    promote(&tmp, dest).await?;
    Ok((raw.len() as u64, records))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_decode_latin1() {
        // "Cajeme, Educación" with a Latin-1 'ó' (0xF3)
        let bytes = b"Cajeme, Educaci\xf3n";
        assert_eq!(decode_latin1(bytes), "Cajeme, Educación");
    }

    #[tokio::test]
    async fn test_catalog_rewritten_as_utf8() {
        let body: Vec<u8> =
            b"CLAVECCT,NOMBRECT,MUNICIPIO\n26DPR0001A,JOS\xc9 MAR\xcdA MORELOS,HERMOSILLO\n26DPR0002Z,\"NI\xd1OS H\xc9ROES, ANEXA\",CAJEME\n"
                .to_vec();
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(body))
            .expect(1)
            .mount(&server)
            .await;

        let tmp = tempdir().unwrap();
        let url = format!("{}/catalogo.csv", server.uri());
        let out = download_school_catalog(&Client::new(), &url, tmp.path())
            .await
            .unwrap();
        assert!(matches!(out, DownloadOutcome::Downloaded { .. }));

        let written = std::fs::read_to_string(tmp.path().join(SCHOOL_CATALOG_FILE)).unwrap();
        assert!(written.contains("JOSÉ MARÍA MORELOS"));
        assert!(written.contains("\"NIÑOS HÉROES, ANEXA\""));
        assert_eq!(written.lines().count(), 3);

        // present now, no further request
        let again = download_school_catalog(&Client::new(), &url, tmp.path())
            .await
            .unwrap();
        assert_eq!(again, DownloadOutcome::Skipped);
    }

    #[tokio::test]
    async fn test_empty_catalog_body_is_retried_next_run() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(Vec::new()))
            .expect(2)
            .mount(&server)
            .await;

        let tmp = tempdir().unwrap();
        let url = format!("{}/catalogo.csv", server.uri());
        let dest = tmp.path().join(SCHOOL_CATALOG_FILE);

        let out = download_school_catalog(&Client::new(), &url, tmp.path())
            .await
            .unwrap();
        assert_eq!(out, DownloadOutcome::Failed);
        assert!(!dest.exists());
        assert!(!part_path(&dest).exists());

        let again = download_school_catalog(&Client::new(), &url, tmp.path())
            .await
            .unwrap();
        assert_eq!(again, DownloadOutcome::Failed);
    }

    #[tokio::test]
    async fn test_catalog_failure_is_not_fatal() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let tmp = tempdir().unwrap();
        let url = format!("{}/catalogo.csv", server.uri());
        let out = download_school_catalog(&Client::new(), &url, tmp.path())
            .await
            .unwrap();
        assert_eq!(out, DownloadOutcome::Failed);
        assert!(!tmp.path().join(SCHOOL_CATALOG_FILE).exists());
    }
}
