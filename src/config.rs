//! Process configuration, read once from the environment at startup.

use std::env;
use std::path::PathBuf;

use crate::constants::{
    DEFAULT_BUCKET_NAME, DEFAULT_FRAME_PADDING, DEFAULT_FRAMES_DIR, DEFAULT_GEMINI_MODEL,
    DEFAULT_MAX_UPLOAD_SIZE, DEFAULT_PORT,
};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has an invalid value: {value:?}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub bucket_name: String,
    /// When set, photos are written here instead of GCS
    pub local_storage_path: Option<PathBuf>,
    pub public_base_url: String,
    pub frames_dir: PathBuf,
    pub frame_padding: u32,
    pub max_upload_size: usize,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build a config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let gemini_api_key = var("GEMINI_API_KEY").ok_or(ConfigError::Missing("GEMINI_API_KEY"))?;
        let bucket_name = var("GCS_BUCKET_NAME").unwrap_or_else(|| DEFAULT_BUCKET_NAME.to_string());
        let public_base_url = var("PUBLIC_BASE_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|| format!("https://storage.googleapis.com/{}", bucket_name));

        Ok(Self {
            gemini_api_key,
            gemini_model: var("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            bucket_name,
            local_storage_path: var("LOCAL_STORAGE_PATH").map(PathBuf::from),
            public_base_url,
            frames_dir: var("FRAMES_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_FRAMES_DIR)),
            frame_padding: parse_or("FRAME_PADDING", var("FRAME_PADDING"), DEFAULT_FRAME_PADDING)?,
            max_upload_size: parse_or(
                "MAX_UPLOAD_SIZE",
                var("MAX_UPLOAD_SIZE"),
                DEFAULT_MAX_UPLOAD_SIZE,
            )?,
            port: parse_or("PORT", var("PORT"), DEFAULT_PORT)?,
        })
    }
}

/// Parse `value` as `T`, or use `default` when it is absent.
pub fn parse_or<T: std::str::FromStr>(
    name: &'static str,
    value: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value: raw }),
    }
}
