//! Content store: the temp/output directory layout stage outputs live in.
//!
//! Files are addressed by paths relative to a working root
//! (`temp/scene_1.jpg`, `output/video_project.json`). These relative
//! paths are what stage outputs, artifact listings, and the boundary
//! layer exchange; only this module resolves them to real filesystem
//! paths.
//!
//! Known limitation: per-scene filenames are derived from scene index
//! and stage only, so two pipeline executions sharing one process would
//! collide. The design assumes one active run's artifacts occupy these
//! directories at a time.

use std::io;
use std::path::{Path, PathBuf};

use tokio::fs;

/// Directory for intermediate per-scene files.
pub const TEMP_DIR: &str = "temp";
/// Directory for final project outputs.
pub const OUTPUT_DIR: &str = "output";

/// Store for stage artifacts under a working root.
#[derive(Debug, Clone)]
pub struct ContentStore {
    root: PathBuf,
}

impl ContentStore {
    /// Create a store rooted at the given directory. Does not touch the
    /// filesystem; call [`ensure_directories`](Self::ensure_directories)
    /// before writing.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Working root this store resolves relative paths against.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the temp and output directories if missing.
    pub async fn ensure_directories(&self) -> io::Result<()> {
        fs::create_dir_all(self.root.join(TEMP_DIR)).await?;
        fs::create_dir_all(self.root.join(OUTPUT_DIR)).await?;
        Ok(())
    }

    /// Relative path for a temp file, e.g. `temp/scene_1.jpg`.
    pub fn temp_path(&self, filename: &str) -> String {
        format!("{}/{}", TEMP_DIR, filename)
    }

    /// Relative path for an output file, e.g. `output/video_project.json`.
    pub fn output_path(&self, filename: &str) -> String {
        format!("{}/{}", OUTPUT_DIR, filename)
    }

    /// Resolve a relative path against the working root.
    pub fn resolve(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }

    /// Persist binary data at a relative path.
    pub async fn save_bytes(&self, relative: &str, data: &[u8]) -> io::Result<()> {
        self.ensure_directories().await?;
        fs::write(self.resolve(relative), data).await?;
        tracing::debug!(path = relative, size = data.len(), "saved file");
        Ok(())
    }

    /// Persist text at a relative path.
    pub async fn save_text(&self, relative: &str, text: &str) -> io::Result<()> {
        self.save_bytes(relative, text.as_bytes()).await
    }

    /// Whether a file exists at the relative path.
    pub fn exists(&self, relative: &str) -> bool {
        self.resolve(relative).is_file()
    }

    /// List all files in the temp and output directories as sorted
    /// relative paths. Used by the one-time artifact collection pass.
    pub async fn list_artifacts(&self) -> io::Result<Vec<String>> {
        let mut artifacts = Vec::new();
        for dir in [TEMP_DIR, OUTPUT_DIR] {
            let path = self.root.join(dir);
            if !path.is_dir() {
                continue;
            }
            let mut entries = fs::read_dir(&path).await?;
            while let Some(entry) = entries.next_entry().await? {
                if entry.file_type().await?.is_file() {
                    artifacts.push(format!("{}/{}", dir, entry.file_name().to_string_lossy()));
                }
            }
        }
        artifacts.sort();
        Ok(artifacts)
    }

    /// Delete all files in the temp directory.
    pub async fn cleanup_temp(&self) -> io::Result<()> {
        let path = self.root.join(TEMP_DIR);
        if !path.is_dir() {
            return Ok(());
        }
        let mut entries = fs::read_dir(&path).await?;
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                fs::remove_file(entry.path()).await?;
                tracing::debug!(path = %entry.path().display(), "deleted temp file");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn save_and_list_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let store = ContentStore::new(dir.path());

        store.save_bytes("temp/scene_1.jpg", b"fakeimage").await.unwrap();
        store
            .save_text("output/video_project.json", "{}")
            .await
            .unwrap();

        assert!(store.exists("temp/scene_1.jpg"));
        let artifacts = store.list_artifacts().await.unwrap();
        assert_eq!(
            artifacts,
            vec![
                "output/video_project.json".to_string(),
                "temp/scene_1.jpg".to_string()
            ]
        );
    }

    #[tokio::test]
    async fn cleanup_temp_leaves_output_alone() {
        let dir = tempfile::tempdir().unwrap();
        let store = ContentStore::new(dir.path());

        store.save_bytes("temp/audio_scene_1.mp3", b"x").await.unwrap();
        store.save_text("output/video_preview.html", "<html>").await.unwrap();

        store.cleanup_temp().await.unwrap();

        assert!(!store.exists("temp/audio_scene_1.mp3"));
        assert!(store.exists("output/video_preview.html"));
    }

    #[tokio::test]
    async fn list_artifacts_empty_when_dirs_missing() {
        let dir = tempfile::tempdir().unwrap();
        let store = ContentStore::new(dir.path().join("nowhere"));
        assert!(store.list_artifacts().await.unwrap().is_empty());
    }
}
