use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::{str::FromStr, sync::Arc};

mod google;
mod http;
pub use google::{resolve_language, GoogleTtsClient, SUPPORTED_LANGUAGES};
pub use http::HttpTtsClient;

#[cfg(test)]
mod tests;

pub const DEFAULT_LANG: &str = "en";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SynthesisType {
    #[default]
    Google,
    Http,
}

impl FromStr for SynthesisType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "google" | "gtts" => Ok(SynthesisType::Google),
            "http" => Ok(SynthesisType::Http),
            other => Err(anyhow!("unknown synthesis provider: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct SynthesisConfig {
    pub provider: SynthesisType,
    /// Upstream endpoint, required by the `http` provider.
    pub url: Option<String>,
    /// Google top-level domain, e.g. `com` or `co.uk`.
    pub tld: Option<String>,
    pub slow: Option<bool>,
    pub timeout_secs: Option<u64>,
}

/// Converts text in a given language into MP3 audio.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SynthesisClient: Send + Sync {
    async fn synthesize(&self, text: &str, lang: &str) -> Result<Vec<u8>>;
}

pub fn create_synthesis_client(config: &SynthesisConfig) -> Result<Arc<dyn SynthesisClient>> {
    match config.provider {
        SynthesisType::Google => Ok(Arc::new(GoogleTtsClient::new(config)?)),
        SynthesisType::Http => {
            let url = config
                .url
                .as_deref()
                .filter(|url| !url.is_empty())
                .ok_or_else(|| anyhow!("synthesis url is required for the http provider"))?;
            Ok(Arc::new(HttpTtsClient::new(url, config)?))
        }
    }
}
