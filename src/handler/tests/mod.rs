
use crate::{
    app::{create_router, AppState, AppStateBuilder},
    config::Config,
    storage::{ObjectStorage, StorageError},
    synthesis::MockSynthesisClient,
};
use anyhow::anyhow;
use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Request, Response},
};
use std::{
    collections::{HashMap, HashSet},
    path::Path,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};
use tempfile::{tempdir, TempDir};
use tower::ServiceExt;

pub(super) const STORAGE_BASE: &str = "http://localhost:9000";
pub(super) const BUCKET: &str = "video-gen-audio";

#[derive(Debug, Clone)]
pub(super) struct StoredObject {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// In-memory bucket store that can be switched offline.
#[derive(Default)]
pub(super) struct MemoryObjectStorage {
    offline: bool,
    buckets: Mutex<HashSet<String>>,
    policies: Mutex<HashMap<String, String>>,
    objects: Mutex<HashMap<String, StoredObject>>,
    buckets_created: AtomicUsize,
}

impl MemoryObjectStorage {
    pub fn online() -> Self {
        Self::default()
    }

    pub fn offline() -> Self {
        Self {
            offline: true,
            ..Default::default()
        }
    }

    pub fn object(&self, bucket: &str, key: &str) -> Option<StoredObject> {
        self.objects
            .lock()
            .unwrap()
            .get(&format!("{}/{}", bucket, key))
            .cloned()
    }

    pub fn object_count(&self) -> usize {
        self.objects.lock().unwrap().len()
    }

    pub fn policy(&self, bucket: &str) -> Option<String> {
        self.policies.lock().unwrap().get(bucket).cloned()
    }

    pub fn buckets_created(&self) -> usize {
        self.buckets_created.load(Ordering::SeqCst)
    }

    fn check_online(&self, operation: &'static str, target: &str) -> Result<(), StorageError> {
        if self.offline {
            return Err(StorageError::Request {
                operation,
                target: target.to_string(),
                message: "connection refused".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStorage for MemoryObjectStorage {
    async fn bucket_exists(&self, bucket: &str) -> Result<bool, StorageError> {
        self.check_online("head_bucket", bucket)?;
        Ok(self.buckets.lock().unwrap().contains(bucket))
    }

    async fn make_bucket(&self, bucket: &str) -> Result<(), StorageError> {
        self.check_online("create_bucket", bucket)?;
        if self.buckets.lock().unwrap().insert(bucket.to_string()) {
            self.buckets_created.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }

    async fn set_bucket_policy(&self, bucket: &str, policy: &str) -> Result<(), StorageError> {
        self.check_online("put_bucket_policy", bucket)?;
        self.policies
            .lock()
            .unwrap()
            .insert(bucket.to_string(), policy.to_string());
        Ok(())
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        local_path: &Path,
        content_type: &str,
    ) -> Result<(), StorageError> {
        self.check_online("put_object", key)?;
        let bytes = tokio::fs::read(local_path)
            .await
            .map_err(|e| StorageError::Body {
                path: local_path.to_path_buf(),
                message: e.to_string(),
            })?;
        self.objects.lock().unwrap().insert(
            format!("{}/{}", bucket, key),
            StoredObject {
                bytes,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }
}

/// Synthesizer that accepts English only and echoes the text into fake MP3 bytes.
pub(super) fn english_synthesizer() -> MockSynthesisClient {
    let mut synthesizer = MockSynthesisClient::new();
    synthesizer.expect_synthesize().returning(|text, lang| {
        if lang == "en" {
            Ok(format!("ID3{}", text).into_bytes())
        } else {
            Err(anyhow!("Language not supported: {}", lang))
        }
    });
    synthesizer
}

pub(super) struct TestApp {
    pub state: AppState,
    pub storage: Arc<MemoryObjectStorage>,
    pub output: TempDir,
}

impl TestApp {
    pub async fn new(storage: MemoryObjectStorage) -> Self {
        Self::with_synthesizer(storage, english_synthesizer()).await
    }

    pub async fn with_synthesizer(
        storage: MemoryObjectStorage,
        synthesizer: MockSynthesisClient,
    ) -> Self {
        let output = tempdir().unwrap();
        let mut config = Config::default();
        config.output_dir = output.path().to_string_lossy().to_string();
        config.storage.bucket = BUCKET.to_string();
        config.storage.public_url = Some(STORAGE_BASE.to_string());

        let storage = Arc::new(storage);
        let state = AppStateBuilder::new()
            .with_config(config)
            .with_synthesizer(Arc::new(synthesizer))
            .with_storage(storage.clone())
            .build()
            .await
            .expect("Failed to build app state");
        Self {
            state,
            storage,
            output,
        }
    }

    pub async fn request(&self, request: Request<Body>) -> Response<Body> {
        create_router(self.state.clone())
            .oneshot(request)
            .await
            .unwrap()
    }

    pub fn local_files(&self) -> usize {
        std::fs::read_dir(self.output.path()).unwrap().count()
    }
}

pub(super) fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub(super) fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub(super) async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

pub(super) async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}
