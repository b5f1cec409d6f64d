use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::digest::OciDigest;
use crate::models::{ANNOTATION_TITLE, Annotations, Descriptor, MEDIA_TYPE_IMAGE_LAYER};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{0:?} is a directory, only regular files can be pushed")]
    IsDirectory(PathBuf),

    #[error("Blob not found in store: {0}")]
    UnknownBlob(OciDigest),
}

/// Local content addressed by digest, readable back when blobs are uploaded.
pub trait ContentStore: Send + Sync {
    /// Content-address a local file.
    ///
    /// `name` identifies the entry; `filename` is the file to read and
    /// defaults to `name` when empty. An empty `media_type` selects the
    /// store's default.
    fn add(&mut self, name: &str, media_type: &str, filename: &str) -> Result<Descriptor, StoreError>;

    /// Read back the content of a blob previously added.
    fn fetch(&self, digest: &OciDigest) -> Result<Vec<u8>, StoreError>;
}

/// A content store backed by files on the local filesystem.
#[derive(Debug, Default)]
pub struct FileStore {
    root: PathBuf,
    blobs: HashMap<OciDigest, PathBuf>,
    disable_title: bool,
}

impl FileStore {
    /// Relative filenames are resolved against `root`; an empty root means
    /// the working directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Default::default()
        }
    }

    /// Stop attaching the title annotation to added files.
    pub fn without_title(mut self) -> Self {
        self.disable_title = true;
        self
    }

    fn resolve(&self, filename: &str) -> PathBuf {
        let path = Path::new(filename);
        if path.is_absolute() || self.root.as_os_str().is_empty() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

impl ContentStore for FileStore {
    fn add(&mut self, name: &str, media_type: &str, filename: &str) -> Result<Descriptor, StoreError> {
        let filename = if filename.is_empty() { name } else { filename };
        let path = self.resolve(filename);

        let metadata = fs::metadata(&path).map_err(|source| StoreError::Read {
            path: path.clone(),
            source,
        })?;
        if metadata.is_dir() {
            return Err(StoreError::IsDirectory(path));
        }

        let content = fs::read(&path).map_err(|source| StoreError::Read {
            path: path.clone(),
            source,
        })?;

        let media_type = if media_type.is_empty() {
            MEDIA_TYPE_IMAGE_LAYER
        } else {
            media_type
        };
        let mut descriptor = Descriptor::for_content(media_type, &content);
        if !self.disable_title {
            let mut annotations = Annotations::new();
            annotations.insert(ANNOTATION_TITLE.to_string(), name.to_string());
            descriptor.annotations = Some(annotations);
        }

        debug!(
            "Added {:?} as {} ({} bytes, {})",
            path, descriptor.digest, descriptor.size, descriptor.media_type
        );
        self.blobs.insert(descriptor.digest.clone(), path);

        Ok(descriptor)
    }

    fn fetch(&self, digest: &OciDigest) -> Result<Vec<u8>, StoreError> {
        let path = self
            .blobs
            .get(digest)
            .ok_or_else(|| StoreError::UnknownBlob(digest.clone()))?;
        fs::read(path).map_err(|source| StoreError::Read {
            path: path.clone(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_add_defaults_media_type_and_title() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("hi.txt"), b"hello").unwrap();

        let mut store = FileStore::new(dir.path());
        let descriptor = store.add("hi.txt", "", "").unwrap();

        assert_eq!(descriptor.media_type, MEDIA_TYPE_IMAGE_LAYER);
        assert_eq!(descriptor.size, 5);
        assert_eq!(descriptor.digest, OciDigest::from_content(b"hello"));
        assert_eq!(descriptor.title(), Some("hi.txt"));
        assert_eq!(store.fetch(&descriptor.digest).unwrap(), b"hello");
    }

    #[test]
    fn test_add_reads_filename_under_logical_name() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("config.json"), b"{}").unwrap();

        let mut store = FileStore::new(dir.path());
        let descriptor = store
            .add("$config", "application/vnd.me.config", "config.json")
            .unwrap();

        assert_eq!(descriptor.media_type, "application/vnd.me.config");
        assert_eq!(descriptor.title(), Some("$config"));
    }

    #[test]
    fn test_add_without_title() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.bin"), b"a").unwrap();

        let mut store = FileStore::new(dir.path()).without_title();
        let descriptor = store.add("a.bin", "", "").unwrap();
        assert_eq!(descriptor.annotations, None);
    }

    #[test]
    fn test_add_rejects_missing_files_and_directories() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();

        let mut store = FileStore::new(dir.path());
        assert!(matches!(store.add("missing", "", ""), Err(StoreError::Read { .. })));
        assert!(matches!(store.add("sub", "", ""), Err(StoreError::IsDirectory(_))));
    }

    #[test]
    fn test_fetch_unknown_blob() {
        let store = FileStore::new("");
        let digest = OciDigest::from_content(b"nothing");
        assert!(matches!(store.fetch(&digest), Err(StoreError::UnknownBlob(_))));
    }
}
