//! Environment-backed configuration.
//!
//! Most settings have defaults. Override with `CRMFORGE_*` environment variables.

pub mod error;


pub use error::ConfigError;

use std::env;
use std::net::IpAddr;
use std::path::PathBuf;

use crate::constants::{DEFAULT_CORRECTOR_MODEL, DEFAULT_DRAFTER_MODEL, DEFAULT_TOP_K};

/// Process configuration loaded from environment variables.
///
/// Use [`Config::from_env`] to read `CRMFORGE_*` overrides on top of defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port. Default: `8000`.
    pub port: u16,

    /// IP address to bind to. Default: `127.0.0.1`.
    pub bind_addr: IpAddr,

    /// Directory holding the reference catalog JSON files. Default: `./data`.
    pub data_dir: PathBuf,

    /// Directory for pipeline result files. Default: `./outputs`.
    pub output_dir: PathBuf,

    /// Sentence-embedding model directory (`config.json`, `model.safetensors`, `tokenizer.json`).
    ///
    /// `None` runs the deterministic stub embedder.
    pub embedding_model_path: Option<PathBuf>,

    /// Model for the drafting stage.
    pub drafter_model: String,

    /// Model for the tone-correction stage.
    pub corrector_model: String,

    /// Highlights / CRM snippets per request. Default: `3`.
    pub top_k: usize,

    /// When `false`, every request builds fresh generators. Default: `true`.
    pub cache_enabled: bool,

    /// Seed for template and event sampling. `None` seeds from entropy.
    pub seed: Option<u64>,

    /// Use stub generators instead of real model backends.
    pub mock_generators: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8000,
            bind_addr: IpAddr::V4(std::net::Ipv4Addr::new(127, 0, 0, 1)),
            data_dir: PathBuf::from("./data"),
            output_dir: PathBuf::from("./outputs"),
            embedding_model_path: None,
            drafter_model: DEFAULT_DRAFTER_MODEL.to_string(),
            corrector_model: DEFAULT_CORRECTOR_MODEL.to_string(),
            top_k: DEFAULT_TOP_K,
            cache_enabled: true,
            seed: None,
            mock_generators: false,
        }
    }
}

impl Config {
    const ENV_PORT: &'static str = "CRMFORGE_PORT";
    const ENV_BIND_ADDR: &'static str = "CRMFORGE_BIND_ADDR";
    const ENV_DATA_DIR: &'static str = "CRMFORGE_DATA_DIR";
    const ENV_OUTPUT_DIR: &'static str = "CRMFORGE_OUTPUT_DIR";
    const ENV_EMBEDDING_MODEL_PATH: &'static str = "CRMFORGE_EMBEDDING_MODEL_PATH";
    const ENV_DRAFTER_MODEL: &'static str = "CRMFORGE_DRAFTER_MODEL";
    const ENV_CORRECTOR_MODEL: &'static str = "CRMFORGE_CORRECTOR_MODEL";
    const ENV_TOP_K: &'static str = "CRMFORGE_TOP_K";
    const ENV_CACHE_ENABLED: &'static str = "CRMFORGE_CACHE_ENABLED";
    const ENV_SEED: &'static str = "CRMFORGE_SEED";
    const ENV_MOCK_GENERATORS: &'static str = "CRMFORGE_MOCK_GENERATORS";

    /// Loads configuration from environment variables (falling back to defaults).
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let port = Self::parse_port_from_env(defaults.port)?;
        let bind_addr = Self::parse_bind_addr_from_env(defaults.bind_addr)?;
        let data_dir = Self::parse_path_from_env(Self::ENV_DATA_DIR, defaults.data_dir);
        let output_dir = Self::parse_path_from_env(Self::ENV_OUTPUT_DIR, defaults.output_dir);
        let embedding_model_path =
            Self::parse_optional_path_from_env(Self::ENV_EMBEDDING_MODEL_PATH);
        let drafter_model =
            Self::parse_string_from_env(Self::ENV_DRAFTER_MODEL, defaults.drafter_model);
        let corrector_model =
            Self::parse_string_from_env(Self::ENV_CORRECTOR_MODEL, defaults.corrector_model);
        let top_k = Self::parse_usize_from_env(Self::ENV_TOP_K, defaults.top_k)?;
        let cache_enabled =
            Self::parse_bool_from_env(Self::ENV_CACHE_ENABLED, defaults.cache_enabled);
        let seed = Self::parse_optional_u64_from_env(Self::ENV_SEED)?;
        let mock_generators =
            Self::parse_bool_from_env(Self::ENV_MOCK_GENERATORS, defaults.mock_generators);

        Ok(Self {
            port,
            bind_addr,
            data_dir,
            output_dir,
            embedding_model_path,
            drafter_model,
            corrector_model,
            top_k,
            cache_enabled,
            seed,
            mock_generators,
        })
    }

    /// Validates paths and basic invariants (does not create directories).
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.top_k == 0 {
            return Err(ConfigError::ZeroTopK);
        }

        if !self.data_dir.exists() {
            return Err(ConfigError::PathNotFound {
                path: self.data_dir.clone(),
            });
        }
        if !self.data_dir.is_dir() {
            return Err(ConfigError::NotADirectory {
                path: self.data_dir.clone(),
            });
        }

        if self.output_dir.exists() && !self.output_dir.is_dir() {
            return Err(ConfigError::NotADirectory {
                path: self.output_dir.clone(),
            });
        }

        if let Some(ref path) = self.embedding_model_path {
            if !path.exists() {
                return Err(ConfigError::PathNotFound { path: path.clone() });
            }
            if !path.is_dir() {
                return Err(ConfigError::NotADirectory { path: path.clone() });
            }
        }

        Ok(())
    }

    /// Returns `"{bind_addr}:{port}"` (useful for logging/binding).
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }

    fn parse_port_from_env(default: u16) -> Result<u16, ConfigError> {
        match env::var(Self::ENV_PORT) {
            Ok(value) => {
                let port: u16 = value.parse().map_err(|e| ConfigError::PortParseError {
                    value: value.clone(),
                    source: e,
                })?;

                if port == 0 {
                    return Err(ConfigError::InvalidPort { value });
                }

                Ok(port)
            }
            Err(_) => Ok(default),
        }
    }

    fn parse_bind_addr_from_env(default: IpAddr) -> Result<IpAddr, ConfigError> {
        match env::var(Self::ENV_BIND_ADDR) {
            Ok(value) => value
                .parse()
                .map_err(|e| ConfigError::InvalidBindAddr { value, source: e }),
            Err(_) => Ok(default),
        }
    }

    fn parse_path_from_env(var_name: &str, default: PathBuf) -> PathBuf {
        env::var(var_name).map(PathBuf::from).unwrap_or(default)
    }

    fn parse_optional_path_from_env(var_name: &str) -> Option<PathBuf> {
        env::var(var_name)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
    }

    fn parse_string_from_env(var_name: &str, default: String) -> String {
        env::var(var_name)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or(default)
    }

    fn parse_usize_from_env(var_name: &'static str, default: usize) -> Result<usize, ConfigError> {
        match env::var(var_name) {
            Ok(value) => value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidNumber {
                    name: var_name,
                    value,
                }),
            Err(_) => Ok(default),
        }
    }

    fn parse_optional_u64_from_env(var_name: &'static str) -> Result<Option<u64>, ConfigError> {
        match env::var(var_name) {
            Ok(value) if value.trim().is_empty() => Ok(None),
            Ok(value) => value
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| ConfigError::InvalidNumber {
                    name: var_name,
                    value,
                }),
            Err(_) => Ok(None),
        }
    }

    fn parse_bool_from_env(var_name: &str, default: bool) -> bool {
        env::var(var_name)
            .ok()
            .map(|v| crate::domain::parse_bool_like(&v))
            .unwrap_or(default)
    }
}
