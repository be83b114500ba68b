//! Fallback downloads
//!
//! When a collection cannot be written to its external target, the same
//! JSON is dropped into the downloads directory as a dated file.
//! Existing files are never overwritten: like a browser, a ` (n)` suffix
//! is added instead.

use crate::database::Collection;
use crate::error::Result;
use chrono::Utc;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Directory receiving fallback and explicit downloads
#[derive(Clone, Debug)]
pub struct DownloadSink {
    dir: PathBuf,
}

impl DownloadSink {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Target directory, created on first delivery
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `contents` as `<stem>.json`, returning the path actually used.
    ///
    /// Numbering continues after the highest ` (n)` already present and is
    /// unbounded, so a busy day never runs out of names.
    pub async fn deliver(&self, stem: &str, contents: &[u8]) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir).await?;

        let mut attempt = self.next_index(stem).await?;
        loop {
            let name = if attempt == 0 {
                format!("{}.json", stem)
            } else {
                format!("{} ({}).json", stem, attempt)
            };
            let path = self.dir.join(name);

            let mut file = match fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => file,
                // Lost a race with another writer; take the next number
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    attempt += 1;
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            file.write_all(contents).await?;
            file.sync_all().await?;

            tracing::info!("Downloaded {} ({} bytes)", path.display(), contents.len());
            return Ok(path);
        }
    }

    /// First free suffix for `stem`: 0 when `<stem>.json` is unused
    async fn next_index(&self, stem: &str) -> Result<u64> {
        let plain = format!("{}.json", stem);
        let numbered = format!("{} (", stem);
        let mut next = None;

        let mut entries = fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            let index = if name == plain {
                Some(0)
            } else {
                name.strip_prefix(&numbered)
                    .and_then(|rest| rest.strip_suffix(").json"))
                    .and_then(|n| n.parse::<u64>().ok())
            };
            if let Some(index) = index {
                next = Some(next.map_or(index + 1, |n: u64| n.max(index + 1)));
            }
        }

        Ok(next.unwrap_or(0))
    }
}

/// `Enquiry_2025-06-01` style stem for a single collection
pub fn collection_stem(collection: Collection) -> String {
    format!("{}_{}", collection.label(), today())
}

/// `data-2025-06-01` stem for the combined export
pub fn bundle_stem() -> String {
    format!("data-{}", today())
}

fn today() -> String {
    Utc::now().format("%Y-%m-%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_deliver_creates_directory_and_file() {
        let temp = TempDir::new().unwrap();
        let sink = DownloadSink::new(temp.path().join("downloads"));

        let path = sink.deliver("Enquiry_2025-06-01", b"[]").await.unwrap();

        assert_eq!(path, temp.path().join("downloads").join("Enquiry_2025-06-01.json"));
        assert_eq!(std::fs::read(&path).unwrap(), b"[]");
    }

    #[tokio::test]
    async fn test_deliver_never_overwrites() {
        let temp = TempDir::new().unwrap();
        let sink = DownloadSink::new(temp.path().to_path_buf());

        let first = sink.deliver("Feedback_x", b"1").await.unwrap();
        let second = sink.deliver("Feedback_x", b"2").await.unwrap();
        let third = sink.deliver("Feedback_x", b"3").await.unwrap();

        assert_eq!(first.file_name().unwrap(), "Feedback_x.json");
        assert_eq!(second.file_name().unwrap(), "Feedback_x (1).json");
        assert_eq!(third.file_name().unwrap(), "Feedback_x (2).json");
        assert_eq!(std::fs::read(&first).unwrap(), b"1");
    }

    #[tokio::test]
    async fn test_deliver_has_no_name_limit() {
        let temp = TempDir::new().unwrap();
        let sink = DownloadSink::new(temp.path().to_path_buf());
        std::fs::write(temp.path().join("Enquiry_x.json"), b"0").unwrap();
        std::fs::write(temp.path().join("Enquiry_x (1000).json"), b"1000").unwrap();
        std::fs::write(temp.path().join("Enquiry_xy (5000).json"), b"other").unwrap();

        let next = sink.deliver("Enquiry_x", b"new").await.unwrap();
        let after = sink.deliver("Enquiry_x", b"newer").await.unwrap();

        assert_eq!(next.file_name().unwrap(), "Enquiry_x (1001).json");
        assert_eq!(after.file_name().unwrap(), "Enquiry_x (1002).json");
    }

    #[test]
    fn test_stems() {
        let stem = collection_stem(Collection::Rettings);
        assert!(stem.starts_with("Rettings_"));
        assert_eq!(stem.len(), "Rettings_".len() + 10);
        assert!(bundle_stem().starts_with("data-"));
    }
}
