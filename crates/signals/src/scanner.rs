use crate::language::Language;
use ignore::{DirEntry, WalkBuilder};
use std::path::{Component, Path, PathBuf};

const DEFAULT_MAX_FILE_BYTES: u64 = 1_048_576; // 1 MB

/// Directories that never hold first-party sources.
const IGNORED_DIRS: &[&str] = &[
    ".git",
    ".hg",
    ".svn",
    "node_modules",
    ".next",
    ".turbo",
    "build",
    "dist",
    "coverage",
    "target",
    ".venv",
    "vendor",
    "__pycache__",
];

/// Finds analysable source files under a project root.
///
/// `.gitignore` aware. Bundled or minified output is skipped: it would
/// otherwise dominate the long-function and duplicate signals.
pub struct FileScanner {
    root: PathBuf,
    max_file_bytes: u64,
}

impl FileScanner {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
        }
    }

    pub fn with_max_file_bytes(mut self, bytes: u64) -> Self {
        self.max_file_bytes = bytes;
        self
    }

    /// Sorted posix-relative paths of every supported source file.
    pub fn scan(&self) -> Vec<String> {
        let root = self.root.clone();
        let mut builder = WalkBuilder::new(&self.root);
        builder
            .hidden(true)
            .git_ignore(true)
            .git_global(true)
            .git_exclude(true)
            .filter_entry(move |entry| !in_ignored_dir(entry.path(), &root));

        let mut files: Vec<String> = builder
            .build()
            .filter_map(|result| match result {
                Ok(entry) => Some(entry),
                Err(e) => {
                    log::warn!("Failed to read entry: {e}");
                    None
                }
            })
            .filter(|entry| self.accepts(entry))
            .filter_map(|entry| self.relative_posix(entry.path()))
            .collect();

        files.sort();
        log::info!("Found {} source files under {}", files.len(), self.root.display());
        files
    }

    fn accepts(&self, entry: &DirEntry) -> bool {
        if !entry.file_type().is_some_and(|t| t.is_file()) {
            return false;
        }
        let path = entry.path();
        if !Language::from_path(path).supports_ast() || is_minified(path) {
            return false;
        }
        match entry.metadata() {
            Ok(meta) if meta.len() > self.max_file_bytes => {
                log::debug!(
                    "Skipping large file {} ({} bytes > {})",
                    path.display(),
                    meta.len(),
                    self.max_file_bytes
                );
                false
            }
            _ => true,
        }
    }

    fn relative_posix(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.root).ok()?;
        let parts: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        (!parts.is_empty()).then(|| parts.join("/"))
    }
}

fn in_ignored_dir(path: &Path, root: &Path) -> bool {
    let Ok(relative) = path.strip_prefix(root) else {
        return false;
    };
    relative.components().any(|component| match component {
        Component::Normal(name) => {
            let lowered = name.to_string_lossy().to_lowercase();
            IGNORED_DIRS.contains(&lowered.as_str())
        }
        _ => false,
    })
}

fn is_minified(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.contains(".min.") || name.contains(".bundle."))
}

#[cfg(test)]
mod tests {
    use super::FileScanner;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn returns_sorted_relative_source_paths() {
        let temp = tempdir().unwrap();
        fs::create_dir_all(temp.path().join("src/util")).unwrap();
        fs::write(temp.path().join("src/util/index.ts"), b"export {}").unwrap();
        fs::write(temp.path().join("src/main.ts"), b"export {}").unwrap();
        fs::write(temp.path().join("README.md"), b"# readme").unwrap();

        let files = FileScanner::new(temp.path()).scan();
        assert_eq!(files, vec!["src/main.ts", "src/util/index.ts"]);
    }

    #[test]
    fn skips_ignored_directories_and_bundles() {
        let temp = tempdir().unwrap();
        let modules = temp.path().join("node_modules").join("pkg");
        fs::create_dir_all(&modules).unwrap();
        fs::write(modules.join("index.js"), b"module.exports = {}").unwrap();
        fs::write(temp.path().join("app.js"), b"require('pkg')").unwrap();
        fs::write(temp.path().join("app.min.js"), b"var a=1").unwrap();

        let files = FileScanner::new(temp.path()).scan();
        assert_eq!(files, vec!["app.js"]);
    }

    #[test]
    fn respects_size_cap() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("small.py"), b"x = 1\n").unwrap();
        fs::write(temp.path().join("big.py"), vec![b'#'; 64]).unwrap();

        let files = FileScanner::new(temp.path()).with_max_file_bytes(32).scan();
        assert_eq!(files, vec!["small.py"]);
    }
}
