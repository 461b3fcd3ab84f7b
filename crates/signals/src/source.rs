use crate::error::SignalError;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::task::JoinSet;

/// Identity of one analysed file; lives for one analysis pass.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileRecord {
    /// Posix-relative path
    pub path: String,
    pub extension: String,
}

impl FileRecord {
    pub fn new(path: impl Into<String>) -> Self {
        let path = path.into();
        let extension = Path::new(&path)
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default()
            .to_string();
        Self { path, extension }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub record: FileRecord,
    pub content: String,
}

/// In-memory substitute for on-disk content: path -> full replacement text.
///
/// Built fresh for each verification attempt and never written to disk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overlay {
    files: BTreeMap<String, String>,
}

impl Overlay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<String>, content: impl Into<String>) {
        self.files.insert(path.into(), content.into());
    }

    pub fn get(&self, path: &str) -> Option<&str> {
        self.files.get(path).map(String::as_str)
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// File contents for one analysis pass, sorted by path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceSet {
    files: Vec<SourceFile>,
}

impl SourceSet {
    pub fn new(mut files: Vec<SourceFile>) -> Self {
        files.sort_by(|a, b| a.record.path.cmp(&b.record.path));
        files.dedup_by(|a, b| a.record.path == b.record.path);
        Self { files }
    }

    /// Build a set from `(path, content)` pairs.
    pub fn from_pairs<P, C>(pairs: impl IntoIterator<Item = (P, C)>) -> Self
    where
        P: Into<String>,
        C: Into<String>,
    {
        Self::new(
            pairs
                .into_iter()
                .map(|(path, content)| SourceFile {
                    record: FileRecord::new(path),
                    content: content.into(),
                })
                .collect(),
        )
    }

    pub fn get(&self, path: &str) -> Option<&SourceFile> {
        self.files
            .binary_search_by(|file| file.record.path.as_str().cmp(path))
            .ok()
            .map(|idx| &self.files[idx])
    }

    pub fn files(&self) -> &[SourceFile] {
        &self.files
    }

    pub fn paths(&self) -> Vec<String> {
        self.files.iter().map(|f| f.record.path.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Copy of this set restricted to `paths`, with overlay content preferred.
    pub fn with_overlay(&self, paths: &[String], overlay: Option<&Overlay>) -> SourceSet {
        let mut files = Vec::with_capacity(paths.len());
        for path in paths {
            if let Some(content) = overlay.and_then(|o| o.get(path)) {
                files.push(SourceFile {
                    record: FileRecord::new(path.clone()),
                    content: content.to_string(),
                });
            } else if let Some(file) = self.get(path) {
                files.push(file.clone());
            }
        }
        push_overlay_only(&mut files, paths, overlay);
        SourceSet::new(files)
    }
}

fn push_overlay_only(files: &mut Vec<SourceFile>, paths: &[String], overlay: Option<&Overlay>) {
    let Some(overlay) = overlay else {
        return;
    };
    for path in overlay.paths() {
        if !paths.iter().any(|p| p == path) {
            files.push(SourceFile {
                record: FileRecord::new(path),
                content: overlay.get(path).unwrap_or_default().to_string(),
            });
        }
    }
}

/// Where analysis passes get file contents from.
///
/// Implementations must prefer overlay content when present and fall back to
/// their backing store otherwise.
#[async_trait]
pub trait SourceProvider: Send + Sync {
    async fn load(&self, paths: &[String], overlay: Option<&Overlay>) -> SourceSet;
}

#[async_trait]
impl SourceProvider for SourceSet {
    async fn load(&self, paths: &[String], overlay: Option<&Overlay>) -> SourceSet {
        self.with_overlay(paths, overlay)
    }
}

/// Reads sources from disk below `root`.
#[derive(Debug, Clone)]
pub struct SourceLoader {
    root: PathBuf,
}

impl SourceLoader {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl SourceProvider for SourceLoader {
    async fn load(&self, paths: &[String], overlay: Option<&Overlay>) -> SourceSet {
        let mut files = Vec::with_capacity(paths.len());
        let mut reads = JoinSet::new();

        for path in paths {
            if let Some(content) = overlay.and_then(|o| o.get(path)) {
                files.push(SourceFile {
                    record: FileRecord::new(path.clone()),
                    content: content.to_string(),
                });
                continue;
            }

            let abs = self.root.join(path);
            let path = path.clone();
            reads.spawn(async move {
                let result = tokio::fs::read_to_string(&abs).await;
                (path, result)
            });
        }

        while let Some(joined) = reads.join_next().await {
            match joined {
                Ok((path, Ok(content))) => files.push(SourceFile {
                    record: FileRecord::new(path),
                    content,
                }),
                Ok((path, Err(source))) => {
                    let err = SignalError::FileRead { path, source };
                    log::warn!("Skipping unreadable file: {err}");
                }
                Err(e) => log::warn!("File read task failed: {e}"),
            }
        }

        push_overlay_only(&mut files, paths, overlay);
        log::debug!("Loaded {} of {} source files", files.len(), paths.len());
        SourceSet::new(files)
    }
}
