//! Generation, retrieval and removal of synthesized audio.
//!
//! Audio is synthesized into the local output directory first, then moved
//! into the durable bucket. When the bucket can't be written the local copy
//! is kept and served by this service instead.

use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    storage::{object_url, LocalAudio, LocalAudioStore, ObjectStorage},
    synthesis::SynthesisClient,
};

pub const AUDIO_CONTENT_TYPE: &str = "audio/mpeg";
pub const AUDIO_KEY_PREFIX: &str = "audio";
pub const LOCAL_AUDIO_ROUTE: &str = "/audio";

#[derive(Debug, Error)]
pub enum SpeechError {
    #[error("{0:#}")]
    Synthesis(anyhow::Error),
    #[error("{0}")]
    LocalWrite(#[source] std::io::Error),
    #[error("Audio file not found")]
    NotFound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioLocation {
    Durable,
    Local,
}

#[derive(Debug, Clone)]
pub struct GeneratedAudio {
    pub file_id: String,
    pub filename: String,
    pub url: String,
    pub location: AudioLocation,
}

pub struct SpeechHandler {
    synthesizer: Arc<dyn SynthesisClient>,
    storage: Arc<dyn ObjectStorage>,
    local: LocalAudioStore,
    bucket: String,
    public_base_url: String,
}

impl SpeechHandler {
    pub fn new(
        synthesizer: Arc<dyn SynthesisClient>,
        storage: Arc<dyn ObjectStorage>,
        local: LocalAudioStore,
        bucket: impl Into<String>,
        public_base_url: impl Into<String>,
    ) -> Self {
        Self {
            synthesizer,
            storage,
            local,
            bucket: bucket.into(),
            public_base_url: public_base_url.into(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn public_base_url(&self) -> &str {
        &self.public_base_url
    }

    pub fn local_store(&self) -> &LocalAudioStore {
        &self.local
    }

    pub async fn generate(&self, text: &str, lang: &str) -> Result<GeneratedAudio, SpeechError> {
        let file_id = Uuid::new_v4().to_string();
        let filename = format!("{}.mp3", file_id);
        let key = format!("{}/{}", AUDIO_KEY_PREFIX, filename);

        let audio = self
            .synthesizer
            .synthesize(text, lang)
            .await
            .map_err(SpeechError::Synthesis)?;
        let local_path = self
            .local
            .write(&filename, &audio)
            .await
            .map_err(SpeechError::LocalWrite)?;
        debug!(file_id = %file_id, lang, bytes = audio.len(), "speech synthesized");

        match self
            .storage
            .put_object(&self.bucket, &key, &local_path, AUDIO_CONTENT_TYPE)
            .await
        {
            Ok(()) => {
                if let Err(e) = self.local.remove(&filename).await {
                    warn!(file_id = %file_id, "failed to remove uploaded local file: {}", e);
                }
                let url = object_url(&self.public_base_url, &self.bucket, &key);
                info!(file_id = %file_id, bucket = %self.bucket, key = %key, "audio stored in bucket");
                Ok(GeneratedAudio {
                    file_id,
                    filename,
                    url,
                    location: AudioLocation::Durable,
                })
            }
            Err(e) => {
                warn!(file_id = %file_id, "upload failed, serving local copy: {}", e);
                let url = format!("{}/{}", LOCAL_AUDIO_ROUTE, filename);
                Ok(GeneratedAudio {
                    file_id,
                    filename,
                    url,
                    location: AudioLocation::Local,
                })
            }
        }
    }

    /// Opens `filename` from the output directory only, never from the bucket.
    pub async fn fetch(&self, filename: &str) -> Result<LocalAudio, SpeechError> {
        match self.local.open(filename).await {
            Ok(Some(audio)) => Ok(audio),
            Ok(None) => Err(SpeechError::NotFound),
            Err(e) => {
                warn!(filename, "failed to open audio file: {}", e);
                Err(SpeechError::NotFound)
            }
        }
    }

    /// Removes the local copy if there is one. Never fails.
    pub async fn delete(&self, filename: &str) {
        match self.local.remove(filename).await {
            Ok(true) => info!(filename, "audio file deleted"),
            Ok(false) => debug!(filename, "no audio file to delete"),
            Err(e) => warn!(filename, "failed to delete audio file: {}", e),
        }
    }
}
