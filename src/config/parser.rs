//! Manifest parser for loading the desired-state manifest.
//!
//! This module handles loading the manifest from YAML files and environment
//! variables, with proper precedence and error handling.

use crate::error::{ConfigError, RedirectError, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::spec::Manifest;

/// Environment variable holding the API token.
pub const TOKEN_ENV: &str = "REDIRECTPIZZA_API_TOKEN";

/// Environment variable overriding the API base URL.
pub const BASE_URL_ENV: &str = "REDIRECTPIZZA_API_BASE_URL";

/// Environment variable overriding the state file path.
pub const STATE_ENV: &str = "REDIRECTPIZZA_STATE";

/// Default manifest file names to search for.
pub const DEFAULT_CONFIG_FILES: &[&str] = &[
    "redirectpizza.yaml",
    "redirectpizza.yml",
    "redirects.yaml",
    "redirects.yml",
];

/// Parser for loading the manifest.
#[derive(Debug, Default)]
pub struct ConfigParser {
    /// Base path for resolving the `.env` file.
    base_path: Option<PathBuf>,
}

impl ConfigParser {
    /// Creates a new manifest parser.
    #[must_use]
    pub const fn new() -> Self {
        Self { base_path: None }
    }

    /// Sets the base path for resolving relative paths.
    #[must_use]
    pub fn with_base_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    /// Loads the manifest from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<Manifest> {
        let path = path.as_ref();
        info!("Loading manifest from: {}", path.display());

        if !path.exists() {
            return Err(RedirectError::Config(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            }));
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            RedirectError::Config(ConfigError::ParseError {
                message: format!("Failed to read file: {e}"),
                location: Some(path.display().to_string()),
            })
        })?;

        self.parse_yaml(&content, Some(path))
    }

    /// Parses the manifest from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is invalid.
    pub fn parse_yaml(&self, content: &str, source: Option<&Path>) -> Result<Manifest> {
        debug!("Parsing YAML manifest");

        let manifest: Manifest = serde_yaml::from_str(content).map_err(|e| {
            let location = source.map(|p| p.display().to_string());
            RedirectError::Config(ConfigError::ParseError {
                message: format!("YAML parse error: {e}"),
                location,
            })
        })?;

        debug!("Parsed manifest with {} redirects", manifest.redirects.len());
        Ok(manifest)
    }

    /// Loads the manifest with environment variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_with_env(&self, path: impl AsRef<Path>) -> Result<Manifest> {
        let mut manifest = self.load_file(path)?;
        Self::apply_env_overrides(&mut manifest);
        Ok(manifest)
    }

    /// Applies environment variable overrides to the manifest.
    ///
    /// Runs after `.env` is loaded, so values from that file count too.
    fn apply_env_overrides(manifest: &mut Manifest) {
        Self::apply_overrides(manifest, |name| std::env::var(name).ok());
    }

    fn apply_overrides(manifest: &mut Manifest, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(base_url) = lookup(BASE_URL_ENV).filter(|v| !v.is_empty()) {
            debug!("Overriding provider.api_base_url from environment");
            manifest.provider.api_base_url = Some(base_url);
        }

        if let Some(path) = lookup(STATE_ENV).filter(|v| !v.is_empty()) {
            debug!("Overriding state.path from environment");
            manifest.state.path = Some(path);
        }
    }

    /// Loads the .env file if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the .env file exists but cannot be loaded.
    pub fn load_dotenv(&self) -> Result<()> {
        let env_path = self
            .base_path
            .as_ref()
            .map_or_else(|| PathBuf::from(".env"), |p| p.join(".env"));

        if env_path.exists() {
            info!("Loading environment from: {}", env_path.display());
            dotenvy::from_path(&env_path).map_err(|e| {
                RedirectError::Config(ConfigError::ParseError {
                    message: format!("Failed to load .env file: {e}"),
                    location: Some(env_path.display().to_string()),
                })
            })?;
        } else {
            debug!(".env file not found at: {}", env_path.display());
        }

        Ok(())
    }

    /// Gets the API token from environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is not set or empty.
    pub fn get_api_token() -> Result<String> {
        std::env::var(TOKEN_ENV)
            .ok()
            .filter(|token| !token.is_empty())
            .ok_or_else(|| {
                RedirectError::Config(ConfigError::MissingEnvVar {
                    name: String::from(TOKEN_ENV),
                })
            })
    }
}

/// Finds the manifest in the given directory or its parents.
///
/// # Errors
///
/// Returns an error if no manifest is found.
pub fn find_config_file(start_dir: impl AsRef<Path>) -> Result<PathBuf> {
    let start = start_dir.as_ref();
    let mut current = start.to_path_buf();

    loop {
        for filename in DEFAULT_CONFIG_FILES {
            let config_path = current.join(filename);
            if config_path.exists() {
                info!("Found manifest: {}", config_path.display());
                return Ok(config_path);
            }
        }

        if !current.pop() {
            break;
        }
    }

    Err(RedirectError::Config(ConfigError::FileNotFound {
        path: start.join(DEFAULT_CONFIG_FILES[0]),
    }))
}
