use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::image_reference::DEFAULT_REGISTRY;

const DOCKER_HUB_AUTH_KEY: &str = "https://index.docker.io/v1/";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Failed to read auth config {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse auth config {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Supplies registry credentials to the push routine.
pub trait CredentialResolver: Send + Sync {
    /// Base64 encoded `user:password` for the given registry host, used as
    /// the `Authorization: Basic` value and for token requests.
    fn basic_auth(&self, registry: &str) -> Option<String>;
}

#[derive(Debug, Default, Deserialize)]
struct DockerConfigFile {
    #[serde(default)]
    auths: HashMap<String, DockerAuthEntry>,
}

#[derive(Debug, Default, Deserialize)]
struct DockerAuthEntry {
    auth: Option<String>,
    username: Option<String>,
    password: Option<String>,
}

impl DockerAuthEntry {
    fn encoded(&self) -> Option<String> {
        if let Some(auth) = self.auth.as_ref().filter(|a| !a.is_empty()) {
            return Some(auth.clone());
        }
        match (&self.username, &self.password) {
            (Some(username), Some(password)) => Some(encode_basic(username, password)),
            _ => None,
        }
    }
}

fn encode_basic(username: &str, password: &str) -> String {
    STANDARD.encode(format!("{}:{}", username, password))
}

/// Resolves credentials from explicit username/password or docker-style
/// `config.json` files.
#[derive(Debug, Default)]
pub struct DockerConfigResolver {
    explicit: Option<String>,
    configs: Vec<DockerConfigFile>,
}

impl DockerConfigResolver {
    /// Explicit credentials apply to every registry and no config file is
    /// read at all. Otherwise the given config paths must all load; with none
    /// given the default docker config is read when it exists, and skipped
    /// with a warning when it is broken.
    pub fn new(username: &str, password: &str, config_paths: &[PathBuf]) -> Result<Self, AuthError> {
        if !username.is_empty() || !password.is_empty() {
            return Ok(Self {
                explicit: Some(encode_basic(username, password)),
                configs: Vec::new(),
            });
        }

        let mut configs = Vec::new();
        if config_paths.is_empty() {
            if let Some(path) = default_config_path().filter(|p| p.is_file()) {
                match load_config(&path) {
                    Ok(config) => configs.push(config),
                    Err(err) => warn!("Ignoring default auth config: {}", err),
                }
            }
        } else {
            for path in config_paths {
                configs.push(load_config(path)?);
            }
        }

        Ok(Self {
            explicit: None,
            configs,
        })
    }
}

fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".docker").join("config.json"))
}

fn load_config(path: &Path) -> Result<DockerConfigFile, AuthError> {
    debug!("Loading auth config from {:?}", path);
    let content = fs::read_to_string(path).map_err(|source| AuthError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| AuthError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

impl CredentialResolver for DockerConfigResolver {
    fn basic_auth(&self, registry: &str) -> Option<String> {
        if let Some(explicit) = &self.explicit {
            return Some(explicit.clone());
        }

        let mut keys = vec![
            registry.to_string(),
            format!("https://{}", registry),
            format!("http://{}", registry),
        ];
        if registry == DEFAULT_REGISTRY {
            keys.push(DOCKER_HUB_AUTH_KEY.to_string());
        }

        self.configs.iter().find_map(|config| {
            keys.iter()
                .filter_map(|key| config.auths.get(key))
                .find_map(DockerAuthEntry::encoded)
        })
    }
}
