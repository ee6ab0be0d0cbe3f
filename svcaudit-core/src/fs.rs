//! Filesystem abstractions used for inspection.

use std::path::{Path, PathBuf};

use crate::error::Result;

/// Abstraction over filesystem access for testability.
///
/// Inspections only ever read through this trait; nothing here writes.
#[cfg_attr(test, mockall::automock)]
pub trait FileSystem {
    /// List all files reachable from the root path, skipping hidden entries.
    ///
    /// Only an unreadable root is an error; unreadable subdirectories are skipped.
    fn list_files(&self, root: &Path) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        let mut pending = vec![root.to_path_buf()];

        while let Some(dir) = pending.pop() {
            let entries = match std::fs::read_dir(&dir) {
                Ok(entries) => entries,
                Err(err) if dir == root => return Err(err.into()),
                Err(err) => {
                    log::debug!("skipping unreadable directory {}: {err}", dir.display());
                    continue;
                }
            };
            for entry in entries {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(err) => {
                        log::debug!("skipping entry in {}: {err}", dir.display());
                        continue;
                    }
                };
                let path = entry.path();
                if is_hidden(&path) {
                    continue;
                }
                match entry.file_type() {
                    Ok(file_type) if file_type.is_dir() => pending.push(path),
                    Ok(file_type) if file_type.is_file() => files.push(path),
                    Ok(_) => {}
                    Err(err) => log::debug!("skipping {}: {err}", path.display()),
                }
            }
        }

        files.sort();
        Ok(files)
    }

    /// List the immediate (non-hidden) entries of a directory, files and directories alike.
    fn list_dir(&self, dir: &Path) -> Result<Vec<PathBuf>>;
    /// Read a file into a string.
    fn read_to_string(&self, path: &Path) -> Result<String>;
    /// Whether anything exists at `path`.
    fn exists(&self, path: &Path) -> bool;
    /// Whether `path` is an existing directory.
    fn is_dir(&self, path: &Path) -> bool;
}

/// Default filesystem implementation backed by `std::fs`.
#[derive(Debug, Default, Clone)]
pub struct StdFileSystem;

impl StdFileSystem {
    /// Create a new standard filesystem adapter.
    pub fn new() -> Self {
        Self
    }
}

impl FileSystem for StdFileSystem {
    fn list_files(&self, root: &Path) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        let mut pending = vec![root.to_path_buf()];

        while let Some(dir) = pending.pop() {
            for entry in std::fs::read_dir(&dir)? {
                let entry = entry?;
                let path = entry.path();
                if is_hidden(&path) {
                    continue;
                }
                let file_type = entry.file_type()?;
                if file_type.is_dir() {
                    pending.push(path);
                } else if file_type.is_file() {
                    files.push(path);
                }
            }
        }

        files.sort();
        Ok(files)
    }

    fn list_dir(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let mut entries = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if !is_hidden(&path) {
                entries.push(path);
            }
        }
        entries.sort();
        Ok(entries)
    }

    fn read_to_string(&self, path: &Path) -> Result<String> {
        Ok(std::fs::read_to_string(path)?)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }
}

pub(crate) fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

pub(crate) fn file_name(path: &Path) -> &str {
    path.file_name()
        .and_then(|name| name.to_str())
        .unwrap_or_default()
}

pub(crate) fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| extensions.iter().any(|want| ext.eq_ignore_ascii_case(want)))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::{StdFileSystem, has_extension, is_hidden};
    use crate::fs::FileSystem;
    use std::path::Path;

    #[test]
    fn std_filesystem_lists_and_reads_files() {
        let root = tempfile::tempdir().expect("create temp dir");
        let file_path = root.path().join("hello.txt");
        std::fs::write(&file_path, "hello svcaudit").expect("write test file");
        std::fs::write(root.path().join(".env"), "SECRET=1").expect("write hidden file");

        let fs = StdFileSystem::new();
        let files = fs.list_files(root.path()).expect("list files");
        assert_eq!(files, vec![file_path.clone()]);

        let contents = fs.read_to_string(&file_path).expect("read file");
        assert_eq!(contents, "hello svcaudit");
    }

    #[test]
    fn list_dir_is_shallow_and_includes_directories() {
        let root = tempfile::tempdir().expect("create temp dir");
        std::fs::create_dir_all(root.path().join("tests/unit")).expect("create dirs");
        std::fs::write(root.path().join("tests/test_a.py"), "").expect("write file");
        std::fs::write(root.path().join("tests/unit/test_b.py"), "").expect("write file");

        let fs = StdFileSystem::new();
        let entries = fs.list_dir(&root.path().join("tests")).expect("list dir");

        assert_eq!(
            entries,
            vec![
                root.path().join("tests/test_a.py"),
                root.path().join("tests/unit"),
            ]
        );
        assert!(fs.is_dir(&root.path().join("tests/unit")));
        assert!(!fs.exists(&root.path().join("tests/missing.py")));
    }

    #[test]
    fn missing_root_is_an_error() {
        let root = tempfile::tempdir().expect("create temp dir");
        let fs = StdFileSystem::new();
        assert!(fs.list_files(&root.path().join("absent")).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn list_files_skips_unreadable_subdirectories() {
        use std::os::unix::fs::PermissionsExt;

        let root = tempfile::tempdir().expect("create temp dir");
        let locked = root.path().join("locked");
        std::fs::create_dir_all(&locked).expect("create dir");
        std::fs::write(root.path().join("app.py"), "").expect("write file");
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o000))
            .expect("lock dir");

        let result = StdFileSystem::new().list_files(root.path());

        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755))
            .expect("unlock dir");
        let files = result.expect("list files");
        assert!(files.contains(&root.path().join("app.py")));
    }

    #[test]
    fn path_helpers_classify_names() {
        assert!(is_hidden(Path::new("svc/.gitignore")));
        assert!(!is_hidden(Path::new("svc/Dockerfile")));
        assert!(has_extension(Path::new("compose.YAML"), &["yml", "yaml"]));
        assert!(!has_extension(Path::new("Dockerfile"), &["yml", "yaml"]));
    }
}
