//! Content-addressed document storage.
//!
//! Files are stored under `<sha256>.<ext>`, so identical uploads share one
//! artifact and the hash doubles as the document's durable identity.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{IngestError, Result};
use crate::models::DocumentHash;

/// Copy buffer size.
const BUFFER_SIZE: usize = 64 * 1024;

/// Outcome of [`ContentStore::save`].
#[derive(Debug, Clone, PartialEq)]
pub struct StoredFile {
    pub stored_name: String,
    /// Lowercase, without the dot; empty when the original had none.
    pub extension: String,
    pub size: u64,
    pub hash: DocumentHash,
}

/// Filesystem store rooted at one directory.
#[derive(Debug, Clone)]
pub struct ContentStore {
    root: PathBuf,
}

impl ContentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Copy `source` into the store, hashing it on the way.
    pub async fn save(&self, source: &Path, original_name: &str) -> Result<StoredFile> {
        let mut input = File::open(source).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => IngestError::NotFound(format!("source file {}", source.display())),
            _ => IngestError::Storage(format!("cannot open {}: {}", source.display(), e)),
        })?;

        fs::create_dir_all(&self.root).await?;

        let temp_path = self.root.join(format!(".{}.partial", Uuid::new_v4()));
        let (size, hash) = match copy_hashing(&mut input, &temp_path).await {
            Ok(result) => result,
            Err(e) => {
                remove_quietly(&temp_path).await;
                return Err(e);
            }
        };

        let extension = normalize_extension(original_name);
        let stored_name = if extension.is_empty() {
            hash.to_string()
        } else {
            format!("{}.{}", hash, extension)
        };
        let destination = self.root.join(&stored_name);

        if fs::try_exists(&destination).await.unwrap_or(false) {
            debug!("{} already stored, reusing", stored_name);
            remove_quietly(&temp_path).await;
        } else if let Err(e) = fs::rename(&temp_path, &destination).await {
            remove_quietly(&temp_path).await;
            return Err(IngestError::Storage(format!("cannot move file into place: {}", e)));
        }

        info!("Stored {} ({} bytes) as {}", original_name, size, stored_name);

        Ok(StoredFile {
            stored_name,
            extension,
            size,
            hash,
        })
    }

    /// Open a stored file for reading.
    pub async fn open_read(&self, stored_name: &str) -> Result<File> {
        let path = self.path_of(stored_name)?;
        File::open(&path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => IngestError::NotFound(format!("stored file {}", stored_name)),
            _ => IngestError::Storage(e.to_string()),
        })
    }

    /// Delete a stored file. A file that is already gone is not an error.
    pub async fn remove(&self, stored_name: &str) -> Result<()> {
        let path = self.path_of(stored_name)?;
        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!("Removed {}", stored_name);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(IngestError::Storage(format!("cannot remove {}: {}", stored_name, e))),
        }
    }

    /// Resolve a stored name to its path. Rejects anything that could
    /// escape the store root.
    pub fn path_of(&self, stored_name: &str) -> Result<PathBuf> {
        if stored_name.is_empty()
            || stored_name.contains(['/', '\\'])
            || stored_name.contains("..")
            || stored_name.starts_with('.')
        {
            return Err(IngestError::Validation(format!("invalid stored file name: {:?}", stored_name)));
        }
        Ok(self.root.join(stored_name))
    }
}

async fn copy_hashing(input: &mut File, temp_path: &Path) -> Result<(u64, DocumentHash)> {
    let mut output = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(temp_path)
        .await?;

    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; BUFFER_SIZE];
    let mut size = 0u64;

    loop {
        let read = input.read(&mut buffer).await?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
        output.write_all(&buffer[..read]).await?;
        size += read as u64;
    }

    output.flush().await?;
    output.sync_all().await?;

    let hash = DocumentHash::from_digest(&hasher.finalize())?;
    Ok((size, hash))
}

async fn remove_quietly(path: &Path) {
    if let Err(e) = fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!("could not remove temp file {}: {}", path.display(), e);
        }
    }
}

fn normalize_extension(original_name: &str) -> String {
    Path::new(original_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.trim().to_lowercase())
        .unwrap_or_default()
}
