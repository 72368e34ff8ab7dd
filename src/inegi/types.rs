use serde::{de, Deserialize, Deserializer, Serialize};

/// Body of an INEGI indicator request (`type=json`).
#[derive(Debug, Deserialize)]
pub struct IndicatorResponse {
    #[serde(rename = "Series", default)]
    pub series: Vec<Series>,
}

#[derive(Debug, Deserialize)]
pub struct Series {
    #[serde(rename = "OBSERVATIONS", default)]
    pub observations: Option<Vec<Observation>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Observation {
    #[serde(rename = "TIME_PERIOD")]
    pub period: String,
    #[serde(rename = "OBS_VALUE", deserialize_with = "obs_value", default)]
    pub value: Option<f64>,
}

/// `OBS_VALUE` arrives as a numeric string, a bare number, or null.
fn obs_value<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Num(f64),
        Str(String),
    }

    match Option::<Raw>::deserialize(d)? {
        None => Ok(None),
        Some(Raw::Num(v)) => Ok(Some(v)),
        Some(Raw::Str(s)) if s.trim().is_empty() => Ok(None),
        Some(Raw::Str(s)) => s
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| de::Error::custom(format!("invalid OBS_VALUE {:?}", s))),
    }
}

/// One row of a municipal indicator CSV.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MunicipalRow {
    pub municipio: String,
    pub periodo: String,
    pub valor: Option<f64>,
}

/// One row of a state/national context indicator CSV.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContextRow {
    pub periodo: String,
    pub valor: Option<f64>,
}

/// Result of processing a single indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndicatorOutcome {
    /// Output file already existed.
    Skipped,
    Written { rows: usize },
    /// Nothing came back; no file written.
    Empty,
    /// Rows were collected but the CSV could not be written.
    Failed,
}
