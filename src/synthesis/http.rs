use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

use super::{SynthesisClient, SynthesisConfig, DEFAULT_TIMEOUT_SECS};

#[derive(Debug, Serialize)]
struct HttpTtsRequest<'a> {
    text: &'a str,
    lang: &'a str,
}

/// Posts `{text, lang}` as JSON to an upstream and takes the response body as audio.
#[derive(Debug)]
pub struct HttpTtsClient {
    http_client: HttpClient,
    url: String,
}

impl HttpTtsClient {
    pub fn new(url: &str, config: &SynthesisConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS));
        let http_client = HttpClient::builder()
            .timeout(timeout)
            .user_agent(crate::version::get_useragent())
            .build()?;
        Ok(Self {
            http_client,
            url: url.to_string(),
        })
    }
}

#[async_trait]
impl SynthesisClient for HttpTtsClient {
    async fn synthesize(&self, text: &str, lang: &str) -> Result<Vec<u8>> {
        let request_start_time = std::time::Instant::now();
        let response = self
            .http_client
            .post(&self.url)
            .json(&HttpTtsRequest { text, lang })
            .send()
            .await
            .with_context(|| format!("request to {} failed", self.url))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("TTS upstream returned {}: {}", status, body));
        }

        let audio = response.bytes().await?;
        debug!(
            url = %self.url,
            lang,
            bytes = audio.len(),
            elapsed_ms = request_start_time.elapsed().as_millis() as u64,
            "http synthesis completed"
        );
        Ok(audio.to_vec())
    }
}
