use anyhow::{Context, Result};
use std::{
    io,
    path::{Component, Path, PathBuf},
};
use tokio::fs::File;

/// An audio file opened from the output directory.
#[derive(Debug)]
pub struct LocalAudio {
    pub file: File,
    pub len: u64,
}

/// Staging and fallback directory for generated audio.
#[derive(Debug, Clone)]
pub struct LocalAudioStore {
    root: PathBuf,
}

impl LocalAudioStore {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)
            .with_context(|| format!("create output directory {}", root.display()))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves `filename` inside the root. Anything but a single plain
    /// path component is rejected.
    pub fn path_for(&self, filename: &str) -> Option<PathBuf> {
        let mut components = Path::new(filename).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(name)), None) => Some(self.root.join(name)),
            _ => None,
        }
    }

    pub fn exists(&self, filename: &str) -> bool {
        self.path_for(filename)
            .map(|path| path.is_file())
            .unwrap_or(false)
    }

    /// Writes the whole file or nothing: a failed write removes what it left behind.
    pub async fn write(&self, filename: &str, bytes: &[u8]) -> io::Result<PathBuf> {
        let path = self.path_for(filename).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid audio filename: {}", filename),
            )
        })?;
        if let Err(e) = tokio::fs::write(&path, bytes).await {
            tokio::fs::remove_file(&path).await.ok();
            return Err(e);
        }
        Ok(path)
    }

    pub async fn open(&self, filename: &str) -> io::Result<Option<LocalAudio>> {
        let Some(path) = self.path_for(filename) else {
            return Ok(None);
        };
        let file = match File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };
        let metadata = file.metadata().await?;
        if !metadata.is_file() {
            return Ok(None);
        }
        Ok(Some(LocalAudio {
            file,
            len: metadata.len(),
        }))
    }

    /// Returns whether a file was actually removed.
    pub async fn remove(&self, filename: &str) -> io::Result<bool> {
        let Some(path) = self.path_for(filename) else {
            return Ok(false);
        };
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }
}
