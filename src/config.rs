//! Service configuration read from the environment (and `.env`).

use std::env;
use std::path::PathBuf;

use anyhow::Context;

pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub bind_address: String,
    pub port: u16,
    pub template_dir: PathBuf,
    pub asset_dir: PathBuf,
    /// System templates copied into empty slots at startup.
    pub seed_dir: Option<PathBuf>,
    /// JSON stamp table `[{"location": "...", "asset": "..."}]`.
    pub stamp_table: Option<PathBuf>,
    pub max_upload_bytes: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 8080,
            template_dir: PathBuf::from("./data/templates"),
            asset_dir: PathBuf::from("./assets"),
            seed_dir: None,
            stamp_table: None,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; unset or blank keys keep their default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let port = match get("PORT") {
            Some(value) => value
                .parse()
                .with_context(|| format!("PORT must be a port number, got {:?}", value))?,
            None => defaults.port,
        };
        let max_upload_bytes = match get("MAX_UPLOAD_BYTES") {
            Some(value) => value
                .parse()
                .with_context(|| format!("MAX_UPLOAD_BYTES must be a byte count, got {:?}", value))?,
            None => defaults.max_upload_bytes,
        };

        Ok(Self {
            bind_address: get("BIND_ADDRESS").unwrap_or(defaults.bind_address),
            port,
            template_dir: get("TEMPLATE_DIR").map(PathBuf::from).unwrap_or(defaults.template_dir),
            asset_dir: get("ASSET_DIR").map(PathBuf::from).unwrap_or(defaults.asset_dir),
            seed_dir: get("SEED_DIR").map(PathBuf::from),
            stamp_table: get("STAMP_TABLE").map(PathBuf::from),
            max_upload_bytes,
        })
    }
}
