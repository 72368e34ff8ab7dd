// src/config.rs

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};
use tracing::{debug, info};
use url::Url;

pub const TOKEN_VAR: &str = "INEGI_TOKEN";
pub const ROOT_VAR: &str = "SONORA_PROJECT_ROOT";

pub const MUNICIPAL_INDICATORS_FILE: &str = "diccionario_inegi_municipio.json";
pub const CONTEXT_INDICATORS_FILE: &str = "diccionario_inegi_contexto.json";
pub const MUNICIPALITIES_FILE: &str = "diccionario_municipios_sonora.json";

const DEFAULT_INEGI_BASE: &str =
    "https://www.inegi.org.mx/app/api/indicadores/desarrolladores/jsonxml/";
const DEFAULT_REQUEST_PAUSE: Duration = Duration::from_millis(100);

/// Where things live on disk and how the INEGI API is reached.
#[derive(Debug, Clone)]
pub struct Settings {
    pub project_root: PathBuf,
    pub inegi_base_url: Url,
    /// Pause after every per-municipality request.
    pub request_pause: Duration,
}

impl Settings {
    pub fn new(project_root: impl Into<PathBuf>) -> Result<Self> {
        Ok(Self {
            project_root: project_root.into(),
            inegi_base_url: Url::parse(DEFAULT_INEGI_BASE)?,
            request_pause: DEFAULT_REQUEST_PAUSE,
        })
    }

    /// Project root from `SONORA_PROJECT_ROOT`, falling back to the working directory.
    pub fn from_env() -> Result<Self> {
        let root = match env::var_os(ROOT_VAR) {
            Some(p) => PathBuf::from(p),
            None => env::current_dir().context("resolving current directory")?,
        };
        Self::new(root)
    }

    pub fn formato_911_dir(&self) -> PathBuf {
        self.raw_dir().join("formato_911")
    }

    pub fn raw_dir(&self) -> PathBuf {
        self.project_root.join("data").join("raw")
    }

    pub fn external_dir(&self) -> PathBuf {
        self.project_root.join("data").join("external")
    }

    pub fn references_dir(&self) -> PathBuf {
        self.project_root.join("references")
    }

    pub fn dotenv_path(&self) -> PathBuf {
        self.project_root.join(".env")
    }
}

/// Load `<root>/.env` (if present) and read `INEGI_TOKEN`.
pub fn load_token(settings: &Settings) -> Result<String> {
    let dotenv = settings.dotenv_path();
    match dotenvy::from_path(&dotenv) {
        Ok(()) => debug!(path = %dotenv.display(), "loaded .env"),
        Err(e) if e.not_found() => debug!(path = %dotenv.display(), "no .env file"),
        Err(e) => return Err(e).with_context(|| format!("reading {}", dotenv.display())),
    }
    token_from(env::var(TOKEN_VAR).ok())
}

fn token_from(value: Option<String>) -> Result<String> {
    match value.map(|v| v.trim().to_string()) {
        Some(token) if !token.is_empty() => Ok(token),
        _ => bail!("INEGI token not found: set {} in the environment or .env", TOKEN_VAR),
    }
}

/// Geographic level of a context indicator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GeoLevel {
    #[default]
    Estatal,
    Nacional,
}

/// Only `"nacional"` selects the country; null and any other value mean Sonora.
impl<'de> Deserialize<'de> for GeoLevel {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        Ok(match Option::<String>::deserialize(d)?.as_deref() {
            Some("nacional") => GeoLevel::Nacional,
            _ => GeoLevel::Estatal,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct IndicatorConfig {
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "id_inegi")]
    pub inegi_id: String,
    #[serde(rename = "nivel_geografico", default)]
    pub geo_level: GeoLevel,
    #[serde(rename = "fuente_api", default)]
    pub api_source: Option<String>,
}

impl IndicatorConfig {
    pub fn source(&self) -> &str {
        self.api_source.as_deref().unwrap_or("BISE")
    }
}

#[derive(Debug, Deserialize)]
struct MunicipalIndicatorsFile {
    indicadores_municipales: Vec<IndicatorConfig>,
}

#[derive(Debug, Deserialize)]
struct ContextIndicatorsFile {
    indicadores_contexto: Vec<IndicatorConfig>,
}

/// Municipality name → three-digit code suffix, in file order.
#[derive(Debug, Clone, Default)]
pub struct Municipalities(Vec<(String, String)>);

impl Municipalities {
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(n, c)| (n.as_str(), c.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn from_map(map: Map<String, Value>) -> Result<Self> {
        let mut out = Vec::with_capacity(map.len());
        for (name, code) in map {
            let code = match code {
                Value::String(s) => s,
                Value::Number(n) => match n.as_u64() {
                    Some(v) => format!("{:03}", v),
                    None => bail!("municipality {} has a non-integer code {}", name, n),
                },
                other => bail!("municipality {} has an invalid code {}", name, other),
            };
            out.push((name, code));
        }
        Ok(Self(out))
    }
}

impl<N: Into<String>, C: Into<String>> FromIterator<(N, C)> for Municipalities {
    fn from_iter<I: IntoIterator<Item = (N, C)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(n, c)| (n.into(), c.into())).collect())
    }
}

/// The three reference dictionaries the INEGI pipeline runs from.
#[derive(Debug, Clone)]
pub struct References {
    pub municipal: Vec<IndicatorConfig>,
    pub context: Vec<IndicatorConfig>,
    pub municipalities: Municipalities,
}

/// Read every reference file from `dir`. All missing files are reported together.
pub fn load_references(dir: &Path) -> Result<References> {
    if !dir.is_dir() {
        bail!("references directory does not exist: {}", dir.display());
    }
    info!(dir = %dir.display(), "loading reference files");

    let missing: Vec<&str> = [
        MUNICIPAL_INDICATORS_FILE,
        CONTEXT_INDICATORS_FILE,
        MUNICIPALITIES_FILE,
    ]
    .into_iter()
    .filter(|name| !dir.join(name).is_file())
    .collect();
    if !missing.is_empty() {
        let list: Vec<String> = missing.iter().map(|m| format!("  - {}", m)).collect();
        bail!(
            "missing reference files in {}:\n{}",
            dir.display(),
            list.join("\n")
        );
    }

    let municipal: MunicipalIndicatorsFile = read_json(&dir.join(MUNICIPAL_INDICATORS_FILE))?;
    let context: ContextIndicatorsFile = read_json(&dir.join(CONTEXT_INDICATORS_FILE))?;
    let municipalities = read_json(&dir.join(MUNICIPALITIES_FILE))
        .and_then(Municipalities::from_map)
        .with_context(|| format!("reading {}", MUNICIPALITIES_FILE))?;

    info!(
        municipal = municipal.indicadores_municipales.len(),
        context = context.indicadores_contexto.len(),
        municipalities = municipalities.len(),
        "references loaded"
    );

    Ok(References {
        municipal: municipal.indicadores_municipales,
        context: context.indicadores_contexto,
        municipalities,
    })
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let f = fs::File::open(path).with_context(|| format!("opening {}", path.display()))?;
    serde_json::from_reader(std::io::BufReader::new(f))
        .with_context(|| format!("parsing {}", path.display()))
}
