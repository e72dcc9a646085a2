//! Blob storage collaborator: store a blob and get a URL back, delete a
//! blob by its URL. The platform only ever holds the returned URLs.

use anyhow::{bail, Context, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::store::RecordId;

pub const MEDIA_URL_PREFIX: &str = "/media/";

#[derive(Debug, Clone)]
pub struct StoredBlob {
    /// Opaque URL under which the blob is served (e.g. `/media/<name>`).
    pub url: String,
}

pub trait MediaStore: Send + Sync {
    /// Stores the blob and returns its URL.
    fn store_blob(&self, bytes: &[u8]) -> Result<StoredBlob>;

    /// Deletes a blob previously returned by [`MediaStore::store_blob`].
    /// Unknown URLs are an error; the caller decides whether that matters.
    fn delete_blob(&self, url: &str) -> Result<()>;

    /// Reads a stored blob back by its name (the URL without the prefix).
    /// Returns Ok(None) if no such blob exists.
    fn open_blob(&self, name: &str) -> Result<Option<Vec<u8>>>;
}

/// Upload-then-cleanup wrapper: a failed store yields None instead of
/// raising (any staged temp file is already gone by then), and the caller
/// maps None to its own client error. Empty uploads count as absent.
pub fn stage_and_store(media: &dyn MediaStore, bytes: &[u8]) -> Option<StoredBlob> {
    if bytes.is_empty() {
        return None;
    }
    match media.store_blob(bytes) {
        Ok(blob) => Some(blob),
        Err(err) => {
            warn!("Failed to store uploaded blob: {}", err);
            None
        }
    }
}

/// Local-disk blob store. Blob names are random record-id strings plus an
/// extension sniffed from the content.
pub struct DiskMediaStore {
    root: PathBuf,
}

impl DiskMediaStore {
    pub fn new<T: AsRef<Path>>(root: T) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)
            .with_context(|| format!("Failed to create media directory {:?}", root))?;
        Ok(DiskMediaStore { root })
    }

    fn blob_path(&self, name: &str) -> Option<PathBuf> {
        // Names are generated by us: record id plus an optional extension.
        // Anything else never touches the filesystem.
        if name.is_empty()
            || !name
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'.' || b == b'-')
            || name.contains("..")
        {
            return None;
        }
        Some(self.root.join(name))
    }
}

impl MediaStore for DiskMediaStore {
    fn store_blob(&self, bytes: &[u8]) -> Result<StoredBlob> {
        let name = match infer::get(bytes) {
            Some(kind) => format!("{}.{}", RecordId::generate(), kind.extension()),
            None => RecordId::generate().to_string(),
        };
        let path = self.root.join(&name);

        // Stage through a temp file in the same directory; a failed write
        // drops the staged file instead of leaving a half-written blob.
        let mut staged = tempfile::NamedTempFile::new_in(&self.root)
            .context("Failed to stage blob for writing")?;
        staged
            .write_all(bytes)
            .context("Failed to write staged blob")?;
        staged
            .persist(&path)
            .with_context(|| format!("Failed to persist blob {:?}", path))?;

        debug!("Stored blob {} ({} bytes)", name, bytes.len());
        Ok(StoredBlob {
            url: format!("{}{}", MEDIA_URL_PREFIX, name),
        })
    }

    fn delete_blob(&self, url: &str) -> Result<()> {
        let name = match url.strip_prefix(MEDIA_URL_PREFIX) {
            Some(name) => name,
            None => bail!("Not a media URL: {}", url),
        };
        let path = match self.blob_path(name) {
            Some(path) => path,
            None => bail!("Invalid blob name in URL: {}", url),
        };
        std::fs::remove_file(&path).with_context(|| format!("Failed to delete blob {:?}", path))
    }

    fn open_blob(&self, name: &str) -> Result<Option<Vec<u8>>> {
        let path = match self.blob_path(name) {
            Some(path) => path,
            None => return Ok(None),
        };
        match std::fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err).with_context(|| format!("Failed to read blob {:?}", path)),
        }
    }
}
