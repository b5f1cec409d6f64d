use std::path::PathBuf;

use config::{Config, Environment, File};
use ociclient::DockerConfigResolver;
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

use crate::error::Result;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Registries reached over http instead of https. Entries may omit the port.
    #[serde(default = "default_plain_http_hosts")]
    pub plain_http_hosts: Vec<String>,
    /// Credential files consulted when none are given on the command line
    #[serde(default)]
    pub auth_configs: Vec<PathBuf>,
    /// Filter directive used when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(skip)]
    debug: bool,
}

fn default_plain_http_hosts() -> Vec<String> {
    vec!["localhost".to_string(), "127.0.0.1".to_string()]
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Settings {
    pub fn load() -> Result<Self> {
        let mut builder = Config::builder()
            .add_source(File::with_name("/etc/ocictl/config").required(false));

        if let Some(dir) = dirs::config_dir() {
            let user_config = dir.join("ocictl").join("config");
            builder = builder.add_source(File::with_name(&user_config.to_string_lossy()).required(false));
        }

        // Environment variables with prefix OCICTL_, lists comma separated
        builder = builder.add_source(
            Environment::with_prefix("OCICTL")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("plain_http_hosts")
                .with_list_parse_key("auth_configs"),
        );

        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }

    /// `--debug` forces debug output regardless of RUST_LOG.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn env_filter(&self) -> EnvFilter {
        if self.debug {
            EnvFilter::new("debug")
        } else {
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.log_level))
        }
    }

    /// Command line credential files replace the configured ones.
    pub fn auth_configs(&self, cli_configs: Vec<PathBuf>) -> Vec<PathBuf> {
        if cli_configs.is_empty() {
            self.auth_configs.clone()
        } else {
            cli_configs
        }
    }

    /// Credential resolver for the given command line credentials and files.
    pub fn credential_resolver(
        &self,
        username: &str,
        password: &str,
        cli_configs: Vec<PathBuf>,
    ) -> Result<DockerConfigResolver> {
        let auth_configs = self.auth_configs(cli_configs);
        Ok(DockerConfigResolver::new(username, password, &auth_configs)?)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            plain_http_hosts: default_plain_http_hosts(),
            auth_configs: Vec::new(),
            log_level: default_log_level(),
            debug: false,
        }
    }
}
