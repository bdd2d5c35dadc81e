//! Source providers and output sinks.
//!
//! The bundler never touches the filesystem directly. A [`SourceProvider`]
//! lists and reads the specification tree, an [`OutputSink`] persists the
//! result. [`FsSource`] walks a local directory, skipping entries whose names
//! start with `.` plus any user-supplied glob excludes; [`MemorySource`] serves
//! files already held in memory, e.g. after fetching them from a remote
//! repository.

use crate::error::SourceError;
use crate::naming::document_key;
use glob::Pattern;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Read access to a specification tree, addressed by root-relative paths.
pub trait SourceProvider {
    /// Lists every file beneath `dir` (relative to the root), recursively.
    ///
    /// Returned paths are relative to the root, not to `dir`.
    fn list(&self, dir: &Path) -> Result<Vec<PathBuf>, SourceError>;

    /// Returns the raw bytes of the file at `path` (relative to the root).
    fn read(&self, path: &Path) -> Result<Vec<u8>, SourceError>;
}

/// Persists serialized output, overwriting whatever is already at `path`.
pub trait OutputSink {
    fn write(&self, path: &Path, contents: &str) -> Result<(), SourceError>;
}

/// Filesystem-backed source rooted at a directory.
#[derive(Debug, Clone)]
pub struct FsSource {
    root: PathBuf,
    excludes: Vec<Pattern>,
    default_excludes: bool,
}

impl FsSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FsSource {
            root: root.into(),
            excludes: Vec::new(),
            default_excludes: true,
        }
    }

    /// Adds glob patterns matched against entry names and root-relative paths.
    pub fn with_excludes(mut self, patterns: &[String]) -> Result<Self, glob::PatternError> {
        for pattern in patterns {
            self.excludes.push(Pattern::new(pattern)?);
        }
        Ok(self)
    }

    /// Toggles skipping of `.`-prefixed entries (on by default).
    pub fn with_default_excludes(mut self, enabled: bool) -> Self {
        self.default_excludes = enabled;
        self
    }

    fn is_excluded(&self, entry: &walkdir::DirEntry) -> bool {
        // Never exclude the directory being listed itself.
        if entry.depth() == 0 {
            return false;
        }

        let name = entry.file_name().to_string_lossy();
        if self.default_excludes && name.starts_with('.') {
            return true;
        }

        let relative = entry
            .path()
            .strip_prefix(&self.root)
            .map(document_key)
            .unwrap_or_default();
        self.excludes
            .iter()
            .any(|p| p.matches(&name) || p.matches(&relative))
    }
}

impl SourceProvider for FsSource {
    fn list(&self, dir: &Path) -> Result<Vec<PathBuf>, SourceError> {
        let start = self.root.join(dir);
        if !start.is_dir() {
            return Err(SourceError::NotADirectory(start));
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(&start)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !self.is_excluded(e))
        {
            let entry = entry?;
            if entry.file_type().is_file()
                && let Ok(relative) = entry.path().strip_prefix(&self.root)
            {
                files.push(relative.to_path_buf());
            }
        }

        Ok(files)
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>, SourceError> {
        let full = self.root.join(path);
        std::fs::read(&full).map_err(|source| SourceError::Io { path: full, source })
    }
}

/// In-memory source keyed by root-relative path.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    files: BTreeMap<PathBuf, Vec<u8>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>, contents: impl Into<Vec<u8>>) -> &mut Self {
        self.files.insert(path.into(), contents.into());
        self
    }
}

impl<P: Into<PathBuf>, C: Into<Vec<u8>>> FromIterator<(P, C)> for MemorySource {
    fn from_iter<I: IntoIterator<Item = (P, C)>>(iter: I) -> Self {
        let mut source = MemorySource::new();
        for (path, contents) in iter {
            source.insert(path, contents);
        }
        source
    }
}

impl SourceProvider for MemorySource {
    fn list(&self, dir: &Path) -> Result<Vec<PathBuf>, SourceError> {
        if self.files.contains_key(dir) {
            return Err(SourceError::NotADirectory(dir.to_path_buf()));
        }
        Ok(self
            .files
            .keys()
            .filter(|path| path.starts_with(dir))
            .cloned()
            .collect())
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>, SourceError> {
        self.files.get(path).cloned().ok_or_else(|| SourceError::Io {
            path: path.to_path_buf(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        })
    }
}

/// Writes output files to disk, creating parent directories as needed.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsSink;

impl OutputSink for FsSink {
    fn write(&self, path: &Path, contents: &str) -> Result<(), SourceError> {
        let io_err = |source| SourceError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        std::fs::write(path, contents).map_err(io_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture(name: &str) -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("tests/fixtures")
            .join(name)
    }

    fn keys(paths: &[PathBuf]) -> Vec<String> {
        paths.iter().map(|p| document_key(p)).collect()
    }

    #[test]
    fn lists_fixture_files_relative_to_root() {
        let source = FsSource::new(fixture("petstore"));
        let files = source.list(Path::new("")).unwrap();
        assert_eq!(
            keys(&files),
            vec![
                "api.yml",
                "common.yml",
                "examples/pet.json",
                "models/pet.yml",
                "paths/pets.yml",
            ]
        );
    }

    #[test]
    fn lists_a_subdirectory() {
        let source = FsSource::new(fixture("petstore"));
        let files = source.list(Path::new("models")).unwrap();
        assert_eq!(keys(&files), vec!["models/pet.yml"]);
    }

    #[test]
    fn excludes_glob_patterns() {
        let source = FsSource::new(fixture("petstore"))
            .with_excludes(&["examples".to_string(), "*.json".to_string()])
            .unwrap();
        let files = source.list(Path::new("")).unwrap();
        assert!(keys(&files).iter().all(|k| !k.starts_with("examples")));
    }

    #[test]
    fn skips_dot_prefixed_entries_by_default() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("api.yml"), "openapi: 3.0.0\n").unwrap();
        std::fs::create_dir(dir.path().join(".git")).unwrap();
        std::fs::write(dir.path().join(".git").join("HEAD"), "ref").unwrap();

        let files = FsSource::new(dir.path()).list(Path::new("")).unwrap();
        assert_eq!(keys(&files), vec!["api.yml"]);

        let files = FsSource::new(dir.path())
            .with_default_excludes(false)
            .list(Path::new(""))
            .unwrap();
        assert_eq!(keys(&files), vec![".git/HEAD", "api.yml"]);
    }

    #[test]
    fn listing_a_file_is_a_collaborator_error() {
        let source = FsSource::new(fixture("petstore"));
        let err = source.list(Path::new("api.yml")).unwrap_err();
        assert!(matches!(err, SourceError::NotADirectory(_)));

        let memory: MemorySource = [("api.yml", "openapi: 3.0.0")].into_iter().collect();
        assert!(matches!(
            memory.list(Path::new("api.yml")),
            Err(SourceError::NotADirectory(_))
        ));
    }

    #[test]
    fn memory_source_reads_and_lists() {
        let mut memory = MemorySource::new();
        memory
            .insert("api.yml", "openapi: 3.0.0")
            .insert("models/pet.yml", "type: object");

        assert_eq!(keys(&memory.list(Path::new("")).unwrap()), vec!["api.yml", "models/pet.yml"]);
        assert_eq!(keys(&memory.list(Path::new("models")).unwrap()), vec!["models/pet.yml"]);
        assert_eq!(memory.read(Path::new("api.yml")).unwrap(), b"openapi: 3.0.0");
        assert!(memory.read(Path::new("missing.yml")).is_err());
    }

    #[test]
    fn fs_sink_overwrites_and_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out").join("openapi-schema.yml");

        FsSink.write(&target, "first").unwrap();
        FsSink.write(&target, "second").unwrap();

        assert_eq!(std::fs::read_to_string(&target).unwrap(), "second");
    }
}
