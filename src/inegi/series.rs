// src/inegi/series.rs

use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use tracing::debug;
use url::Url;

use super::types::{IndicatorResponse, Observation};

/// State of Sonora.
pub const SONORA_CODE: &str = "07000026";
/// Whole country.
pub const NATIONAL_CODE: &str = "0700";
/// Municipal series are always served from the BISE bank.
pub const MUNICIPAL_SOURCE: &str = "BISE";

/// A fully specified indicator request.
#[derive(Clone)]
pub struct SeriesRequest<'a> {
    pub indicator_id: &'a str,
    pub location: String,
    pub source: &'a str,
    pub token: &'a str,
}

impl SeriesRequest<'_> {
    /// `{base}INDICATOR/{id}/es/{location}/false/{source}/2.0/{token}?type=json`
    pub fn url(&self, base: &Url) -> Result<Url> {
        self.url_with_token(base, self.token)
    }

    /// Same URL with the token replaced, for logs and error messages.
    pub fn redacted(&self, base: &Url) -> String {
        self.url_with_token(base, "***")
            .map(|u| u.to_string())
            .unwrap_or_else(|_| format!("INDICATOR/{}", self.indicator_id))
    }

    fn url_with_token(&self, base: &Url, token: &str) -> Result<Url> {
        let mut url = base.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("base URL {} cannot take path segments", base))?
            .pop_if_empty()
            .extend([
                "INDICATOR",
                self.indicator_id,
                "es",
                self.location.as_str(),
                "false",
                self.source,
                "2.0",
                token,
            ]);
        url.set_query(Some("type=json"));
        Ok(url)
    }
}

/// GET one indicator series and return the observations of its first series.
///
/// An absent or empty `OBSERVATIONS` array yields an empty vec; an empty
/// `Series` array is an error.
pub async fn fetch_series(
    client: &Client,
    base: &Url,
    req: &SeriesRequest<'_>,
) -> Result<Vec<Observation>> {
    let url = req.url(base)?;
    let shown = req.redacted(base);
    debug!(url = %shown, "requesting series");

    let body: IndicatorResponse = client
        .get(url)
        .send()
        .await
        .map_err(|e| anyhow!("GET {} failed: {}", shown, e.without_url()))?
        .error_for_status()
        .map_err(|e| anyhow!("Non-success status {}: {}", shown, e.without_url()))?
        .json()
        .await
        .map_err(|e| anyhow!("{}", e.without_url()))
        .with_context(|| format!("decoding series from {}", shown))?;

    let series = body
        .series
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("response from {} has no Series", shown))?;
    Ok(series.observations.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://www.inegi.org.mx/app/api/indicadores/desarrolladores/jsonxml/")
            .unwrap()
    }

    #[test]
    fn test_url_layout() {
        let req = SeriesRequest {
            indicator_id: "1002000001",
            location: format!("{}{}", SONORA_CODE, "030"),
            source: "BISE",
            token: "abc-123",
        };
        assert_eq!(
            req.url(&base()).unwrap().as_str(),
            "https://www.inegi.org.mx/app/api/indicadores/desarrolladores/jsonxml/INDICATOR/1002000001/es/07000026030/false/BISE/2.0/abc-123?type=json"
        );
    }

    #[test]
    fn test_base_without_trailing_slash() {
        let base = Url::parse("http://127.0.0.1:8080/api").unwrap();
        let req = SeriesRequest {
            indicator_id: "1",
            location: NATIONAL_CODE.to_string(),
            source: "BIE",
            token: "t",
        };
        assert_eq!(
            req.url(&base).unwrap().as_str(),
            "http://127.0.0.1:8080/api/INDICATOR/1/es/0700/false/BIE/2.0/t?type=json"
        );
    }

    #[test]
    fn test_redacted_hides_token() {
        let req = SeriesRequest {
            indicator_id: "1",
            location: SONORA_CODE.to_string(),
            source: "BISE",
            token: "secret-token",
        };
        let shown = req.redacted(&base());
        assert!(!shown.contains("secret-token"));
        assert!(shown.contains("/2.0/***"));
    }
}
