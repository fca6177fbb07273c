use anyhow::{anyhow, Context, Error, Result};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use crate::{storage::ObjectStorageConfig, synthesis::SynthesisConfig, version};

#[derive(Parser, Debug)]
#[command(
    version = version::get_short_version(),
    about = "Text-to-speech HTTP service backed by S3 compatible object storage",
    long_about = version::get_version_info()
)]
pub struct Cli {
    /// Path to the configuration file
    #[clap(long, help = "Path to the configuration file (TOML format)")]
    pub conf: Option<String>,
    #[clap(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the resolved configuration and exit
    CheckConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: Option<String>,
    pub log_file: Option<String>,
    pub cors_origins: Vec<String>,
    pub output_dir: String,
    pub access_log_skip_paths: Vec<String>,
    pub storage: ObjectStorageConfig,
    pub synthesis: SynthesisConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            log_level: Some("info".to_string()),
            log_file: None,
            cors_origins: vec!["http://localhost:3000".to_string()],
            output_dir: "output".to_string(),
            access_log_skip_paths: vec!["/health".to_string()],
            storage: ObjectStorageConfig::default(),
            synthesis: SynthesisConfig::default(),
        }
    }
}

fn parse_port(name: &str, value: &str) -> Result<u16> {
    value
        .trim()
        .parse::<u16>()
        .with_context(|| format!("{} must be a port number, got {:?}", name, value))
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}

impl Config {
    pub fn load(path: &str) -> Result<Self, Error> {
        let config = toml::from_str(
            &std::fs::read_to_string(path).map_err(|e| anyhow!("{}: {}", e, path))?,
        )?;
        Ok(config)
    }

    /// Defaults, then the optional TOML file, then the process environment.
    pub fn resolve(path: Option<&str>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        config.apply_env(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Overrides fields from environment variables, looked up through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("HOST") {
            self.host = host;
        }
        if let Some(port) = lookup("PORT") {
            self.port = parse_port("PORT", &port)?;
        }
        if let Some(origins) = lookup("CORS_ORIGINS") {
            self.cors_origins = parse_list(&origins);
        }
        if let Some(dir) = lookup("OUTPUT_DIR") {
            self.output_dir = dir;
        }
        if let Some(level) = lookup("LOG_LEVEL") {
            self.log_level = Some(level);
        }
        if let Some(file) = lookup("LOG_FILE") {
            self.log_file = Some(file);
        }

        let storage = &mut self.storage;
        if let Some(endpoint) = lookup("MINIO_ENDPOINT") {
            storage.endpoint = endpoint;
        }
        if let Some(port) = lookup("MINIO_PORT") {
            storage.port = parse_port("MINIO_PORT", &port)?;
        }
        if let Some(use_ssl) = lookup("MINIO_USE_SSL") {
            storage.use_ssl = use_ssl.trim() == "true";
        }
        if let Some(access_key) = lookup("MINIO_ACCESS_KEY") {
            storage.access_key = access_key;
        }
        if let Some(secret_key) = lookup("MINIO_SECRET_KEY") {
            storage.secret_key = secret_key;
        }
        if let Some(region) = lookup("MINIO_REGION") {
            storage.region = region;
        }
        if let Some(bucket) = lookup("AUDIO_BUCKET") {
            storage.bucket = bucket;
        }
        if let Some(public_url) = lookup("STORAGE_PUBLIC_URL") {
            storage.public_url = Some(public_url);
        }

        let synthesis = &mut self.synthesis;
        if let Some(provider) = lookup("TTS_PROVIDER") {
            synthesis.provider = provider.parse()?;
        }
        if let Some(url) = lookup("TTS_URL") {
            synthesis.url = Some(url);
        }
        if let Some(tld) = lookup("TTS_TLD") {
            synthesis.tld = Some(tld);
        }
        if let Some(slow) = lookup("TTS_SLOW") {
            synthesis.slow = Some(slow.trim() == "true");
        }
        Ok(())
    }

    pub fn http_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Copy safe to print: credentials are masked.
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        if !config.storage.secret_key.is_empty() {
            config.storage.secret_key = "********".to_string();
        }
        config
    }
}
