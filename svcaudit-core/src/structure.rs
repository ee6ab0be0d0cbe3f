//! Presence checks for template entries.

use std::path::Path;

use glob::{MatchOptions, Pattern};

use crate::domain::StructureChecks;
use crate::fs::FileSystem;
use crate::template::{EntryKind, RequiredFile, StructureTemplate};

const GLOB_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: true,
};

/// Presence of one template entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryPresence {
    /// The entry exists with the expected kind.
    pub exists: bool,
    /// The entry satisfies its `must_contain` patterns.
    pub has_content: bool,
}

/// Evaluate every template entry against `dir`.
///
/// Missing entries are reported as `false`, never as errors; the caller is
/// responsible for rejecting a missing `dir` beforehand.
pub fn check_structure<F: FileSystem + ?Sized>(
    fs: &F,
    dir: &Path,
    template: &StructureTemplate,
) -> StructureChecks {
    let mut checks = StructureChecks::default();

    for entry in &template.required_files {
        let presence = check_entry(fs, dir, entry);
        if entry.is_tests_dir() {
            checks.tests_dir_exists = presence.exists;
            checks.tests_dir_has_files = presence.has_content;
            continue;
        }
        match (entry.kind, entry.trimmed_name()) {
            (EntryKind::File, "Dockerfile") => checks.dockerfile = presence.exists,
            (EntryKind::File, "docker-compose.yml") => checks.docker_compose = presence.exists,
            (EntryKind::File, ".gitignore") => checks.gitignore = presence.exists,
            _ => {
                checks.additional.insert(entry.name.clone(), presence.exists);
            }
        }
    }

    checks
}

/// Whether the entry named `entry` counts as present for scoring.
pub fn entry_present(checks: &StructureChecks, entry: &RequiredFile) -> bool {
    if entry.is_tests_dir() {
        return checks.tests_dir_exists;
    }
    match (entry.kind, entry.trimmed_name()) {
        (EntryKind::File, "Dockerfile") => checks.dockerfile,
        (EntryKind::File, "docker-compose.yml") => checks.docker_compose,
        (EntryKind::File, ".gitignore") => checks.gitignore,
        _ => checks.additional.get(&entry.name).copied().unwrap_or(false),
    }
}

/// Evaluate a single template entry.
pub fn check_entry<F: FileSystem + ?Sized>(fs: &F, dir: &Path, entry: &RequiredFile) -> EntryPresence {
    let path = dir.join(entry.trimmed_name());
    match entry.kind {
        EntryKind::File => {
            let exists = fs.exists(&path);
            EntryPresence {
                exists,
                has_content: exists,
            }
        }
        EntryKind::Directory => {
            let exists = fs.is_dir(&path);
            let has_content = exists
                && (entry.must_contain.is_empty()
                    || directory_matches_any(fs, &path, &entry.must_contain));
            EntryPresence {
                exists,
                has_content,
            }
        }
    }
}

/// Whether any file below `dir` matches one of the glob `patterns`.
///
/// Patterns are relative to `dir`; `*` does not cross directory separators,
/// so `*.py` only considers files directly inside `dir`.
pub fn directory_matches_any<F: FileSystem + ?Sized>(fs: &F, dir: &Path, patterns: &[String]) -> bool {
    let files = match fs.list_files(dir) {
        Ok(files) => files,
        Err(err) => {
            log::debug!("unable to list {}: {err}", dir.display());
            return false;
        }
    };
    let compiled: Vec<Pattern> = patterns
        .iter()
        .filter_map(|raw| match Pattern::new(raw) {
            Ok(pattern) => Some(pattern),
            Err(err) => {
                log::debug!("ignoring invalid glob {raw}: {err}");
                None
            }
        })
        .collect();

    files.iter().any(|file| {
        let relative = file.strip_prefix(dir).unwrap_or(file);
        compiled
            .iter()
            .any(|pattern| pattern.matches_path_with(relative, GLOB_OPTIONS))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::StdFileSystem;
    use crate::template::TemplateConfig;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create dir");
        }
        std::fs::write(path, "").expect("write file");
    }

    #[test]
    fn all_entries_present() {
        let dir = tempfile::tempdir().expect("tempdir");
        for rel in ["Dockerfile", "docker-compose.yml", ".gitignore", "tests/test_x.py"] {
            touch(dir.path(), rel);
        }
        let template = TemplateConfig::builtin().default;

        let checks = check_structure(&StdFileSystem::new(), dir.path(), &template);

        assert!(checks.dockerfile);
        assert!(checks.docker_compose);
        assert!(checks.gitignore);
        assert!(checks.tests_dir_exists);
        assert!(checks.tests_dir_has_files);
        assert!(checks.additional.is_empty());
    }

    #[test]
    fn missing_entries_are_false() {
        let dir = tempfile::tempdir().expect("tempdir");
        touch(dir.path(), "Dockerfile");
        touch(dir.path(), "docker-compose.yml");
        let template = TemplateConfig::builtin().default;

        let checks = check_structure(&StdFileSystem::new(), dir.path(), &template);

        assert!(checks.dockerfile);
        assert!(checks.docker_compose);
        assert!(!checks.gitignore);
        assert!(!checks.tests_dir_exists);
        assert!(!checks.tests_dir_has_files);
    }

    #[test]
    fn must_contain_only_matches_direct_children() {
        let dir = tempfile::tempdir().expect("tempdir");
        touch(dir.path(), "tests/unit/test_nested.py");
        touch(dir.path(), "tests/README.md");
        let template = TemplateConfig::builtin().default;

        let checks = check_structure(&StdFileSystem::new(), dir.path(), &template);

        assert!(checks.tests_dir_exists);
        assert!(!checks.tests_dir_has_files);
    }

    #[test]
    fn additional_entries_are_tracked() {
        let dir = tempfile::tempdir().expect("tempdir");
        touch(dir.path(), "README.md");
        std::fs::create_dir_all(dir.path().join("src")).expect("create src");
        let mut template = TemplateConfig::builtin().default;
        template.required_files.push(RequiredFile {
            name: "README.md".to_string(),
            description: "docs".to_string(),
            required: false,
            weight: 5,
            kind: EntryKind::File,
            must_contain: Vec::new(),
        });
        template.required_files.push(RequiredFile {
            name: "src/".to_string(),
            description: "sources".to_string(),
            required: true,
            weight: 5,
            kind: EntryKind::Directory,
            must_contain: Vec::new(),
        });

        let checks = check_structure(&StdFileSystem::new(), dir.path(), &template);

        assert_eq!(checks.additional.get("README.md"), Some(&true));
        assert_eq!(checks.additional.get("src/"), Some(&true));
        assert!(entry_present(&checks, &template.required_files[4]));
        assert!(!entry_present(&checks, &template.required_files[0]));
    }
}
