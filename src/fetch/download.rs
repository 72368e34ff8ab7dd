use anyhow::{Context, Result};
use futures::StreamExt;
use reqwest::Client;
use std::path::{Path, PathBuf};
use tokio::{fs, io::AsyncWriteExt};
use tracing::{debug, warn};

/// Hidden sibling a body is written to before being renamed over `dest`.
pub fn part_path(dest: &Path) -> PathBuf {
    let name = dest
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "download".to_string());
    dest.with_file_name(format!(".{}.part", name))
}

/// Stream `url` to `dest` chunk by chunk. Returns the number of bytes written.
///
/// The body lands in a `.part` file first and is only renamed into place once
/// complete, so an interrupted download never satisfies a later existence check.
pub async fn stream_to_file(client: &Client, url: &str, dest: &Path) -> Result<u64> {
    let tmp = part_path(dest);
    let res = stream_to_part(client, url, &tmp).await;
    match res {
        Ok(bytes) => {
            promote(&tmp, dest).await?;
            Ok(bytes)
        }
        Err(e) => {
            discard(&tmp).await;
            Err(e)
        }
    }
}

/// Rename a finished `.part` file over `dest`, removing it if the rename fails.
pub async fn promote(tmp: &Path, dest: &Path) -> Result<()> {
    if let Err(e) = fs::rename(tmp, dest).await {
        discard(tmp).await;
        return Err(e)
            .with_context(|| format!("renaming {} -> {}", tmp.display(), dest.display()));
    }
    Ok(())
}

async fn stream_to_part(client: &Client, url: &str, tmp: &Path) -> Result<u64> {
    let resp = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("GET {} failed", url))?
        .error_for_status()
        .with_context(|| format!("Non-success status {}", url))?;

    let mut file = fs::File::create(tmp)
        .await
        .with_context(|| format!("creating {}", tmp.display()))?;
    let mut stream = resp.bytes_stream();
    let mut written = 0u64;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.with_context(|| format!("reading body from {}", url))?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;
    debug!(url, bytes = written, "body streamed");
    Ok(written)
}

/// Fetch the whole body of `url` into memory.
pub async fn fetch_bytes(client: &Client, url: &str) -> Result<Vec<u8>> {
    let bytes = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("GET {} failed", url))?
        .error_for_status()
        .with_context(|| format!("Non-success status {}", url))?
        .bytes()
        .await
        .with_context(|| format!("reading body from {}", url))?;
    Ok(bytes.to_vec())
}

/// Best-effort removal of a leftover partial file.
pub async fn discard(tmp: &Path) {
    if let Err(e) = fs::remove_file(tmp).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %tmp.display(), error = %e, "could not remove partial file");
        }
    }
}
