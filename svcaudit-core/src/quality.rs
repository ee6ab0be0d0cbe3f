//! Configuration quality audits for Dockerfile, compose, .gitignore and tests.

use std::path::{Path, PathBuf};

use regex::Regex;

use crate::domain::ConfigQuality;
use crate::fs::{FileSystem, file_name, has_extension};
use crate::template::{FileQuality, PatternPolarity, QualityPattern, StructureTemplate};

const TEST_NAME_CONVENTIONS: [&str; 2] = [r"test_.*\.py$", r".*_test\.py$"];

/// Built-in Dockerfile rules used when the template has none.
pub fn default_dockerfile_patterns() -> Vec<QualityPattern> {
    vec![
        QualityPattern::regex_rule(
            "expose_port",
            r"EXPOSE\s+\d+",
            PatternPolarity::WarnIfAbsent,
            "EXPOSE missing",
        ),
        QualityPattern::regex_rule(
            "copy_all",
            r"COPY\s+\.\s+\.",
            PatternPolarity::WarnIfPresent,
            "uses COPY . . without .dockerignore",
        ),
        QualityPattern::regex_rule(
            "unnecessary_tools",
            r"(apt-get|yum|apk)\s+install.*(vim|nano|curl|wget)",
            PatternPolarity::WarnIfPresent,
            "installs unnecessary tools",
        ),
    ]
}

/// Built-in docker-compose rules used when the template has none.
pub fn default_compose_patterns() -> Vec<QualityPattern> {
    [
        (
            "restart_policy",
            r"restart:\s*(unless-stopped|always|on-failure)",
            "no restart policy",
        ),
        ("volumes_defined", r"volumes:", "no volumes defined"),
        ("networks_defined", r"networks:", "no networks defined"),
        ("depends_on", r"depends_on:", "no depends_on defined"),
    ]
    .into_iter()
    .map(|(name, regex, warning)| {
        QualityPattern::regex_rule(name, regex, PatternPolarity::WarnIfAbsent, warning)
    })
    .collect()
}

/// Built-in .gitignore entries used when the template has none.
pub fn default_gitignore_patterns() -> Vec<QualityPattern> {
    [
        ".env",
        "__pycache__/",
        "*.pyc",
        "node_modules/",
        "build/",
        "dist/",
        ".pytest_cache/",
        "*.log",
    ]
    .into_iter()
    .map(|entry| QualityPattern::content_rule(entry, &format!("missing {entry}")))
    .collect()
}

/// Run all four audits against a service directory.
pub fn audit_config_quality<F: FileSystem + ?Sized>(
    fs: &F,
    dir: &Path,
    template: &StructureTemplate,
) -> ConfigQuality {
    ConfigQuality {
        dockerfile_warnings: audit_dockerfile(fs, dir, template),
        compose_warnings: audit_compose(fs, dir, template),
        gitignore_warnings: audit_gitignore(fs, dir, template),
        tests_warnings: audit_tests(fs, dir, template),
    }
}

/// Audit `Dockerfile`; a missing file yields no warnings.
pub fn audit_dockerfile<F: FileSystem + ?Sized>(
    fs: &F,
    dir: &Path,
    template: &StructureTemplate,
) -> Vec<String> {
    audit_file(
        fs,
        &dir.join("Dockerfile"),
        template.dockerfile_quality.as_ref(),
        default_dockerfile_patterns,
    )
}

/// Audit `docker-compose.yml`; a missing file yields no warnings.
pub fn audit_compose<F: FileSystem + ?Sized>(
    fs: &F,
    dir: &Path,
    template: &StructureTemplate,
) -> Vec<String> {
    audit_file(
        fs,
        &dir.join("docker-compose.yml"),
        template.compose_quality.as_ref(),
        default_compose_patterns,
    )
}

/// Audit `.gitignore`; a missing file yields no warnings.
pub fn audit_gitignore<F: FileSystem + ?Sized>(
    fs: &F,
    dir: &Path,
    template: &StructureTemplate,
) -> Vec<String> {
    audit_file(
        fs,
        &dir.join(".gitignore"),
        template.gitignore_quality.as_ref(),
        default_gitignore_patterns,
    )
}

/// Audit the `tests/` directory layout and naming.
pub fn audit_tests<F: FileSystem + ?Sized>(
    fs: &F,
    dir: &Path,
    template: &StructureTemplate,
) -> Vec<String> {
    let tests_dir = dir.join("tests");
    if !fs.is_dir(&tests_dir) {
        return vec!["tests directory missing".to_string()];
    }

    let test_files: Vec<PathBuf> = match fs.list_dir(&tests_dir) {
        Ok(entries) => entries
            .into_iter()
            .filter(|entry| has_extension(entry, &["py"]) && !fs.is_dir(entry))
            .collect(),
        Err(err) => {
            log::debug!("unable to list {}: {err}", tests_dir.display());
            return vec!["unable to read tests directory content".to_string()];
        }
    };
    if test_files.is_empty() {
        return vec!["no test files found".to_string()];
    }
    let names: Vec<&str> = test_files.iter().map(|path| file_name(path)).collect();

    match &template.tests_quality {
        Some(quality) => quality
            .patterns
            .iter()
            .filter_map(|pattern| {
                let regex = pattern.regex.as_deref()?;
                let regex = compile(&pattern.name, &format!("^(?:{regex})"))?;
                let found = names.iter().any(|name| regex.is_match(name));
                fired_warning(pattern, found)
            })
            .collect(),
        None => {
            let conventions: Vec<Regex> = TEST_NAME_CONVENTIONS
                .iter()
                .filter_map(|raw| compile("test_naming", &format!("^(?:{raw})")))
                .collect();
            names
                .iter()
                .filter(|name| !conventions.iter().any(|regex| regex.is_match(name)))
                .map(|name| format!("test file {name} doesn't follow naming convention"))
                .collect()
        }
    }
}

/// Evaluate patterns against content, returning fired warnings in pattern order.
pub fn evaluate_patterns(content: &str, patterns: &[QualityPattern]) -> Vec<String> {
    patterns
        .iter()
        .filter_map(|pattern| {
            let found = if let Some(raw) = &pattern.regex {
                compile(&pattern.name, raw)?.is_match(content)
            } else if let Some(needle) = &pattern.content {
                content.contains(needle.as_str())
            } else {
                return None;
            };
            fired_warning(pattern, found)
        })
        .collect()
}

fn fired_warning(pattern: &QualityPattern, found: bool) -> Option<String> {
    let fires = match pattern.polarity {
        PatternPolarity::WarnIfPresent => found,
        PatternPolarity::WarnIfAbsent => !found,
    };
    if fires { pattern.warning.clone() } else { None }
}

fn audit_file<F: FileSystem + ?Sized>(
    fs: &F,
    path: &Path,
    configured: Option<&FileQuality>,
    fallback: fn() -> Vec<QualityPattern>,
) -> Vec<String> {
    if !fs.exists(path) {
        return Vec::new();
    }
    let content = match fs.read_to_string(path) {
        Ok(content) => content,
        Err(err) => {
            log::debug!("unable to read {}: {err}", path.display());
            return vec![format!("unable to read {} content", file_name(path))];
        }
    };
    match configured {
        Some(quality) => evaluate_patterns(&content, &quality.patterns),
        None => evaluate_patterns(&content, &fallback()),
    }
}

fn compile(name: &str, raw: &str) -> Option<Regex> {
    match Regex::new(raw) {
        Ok(regex) => Some(regex),
        Err(err) => {
            log::warn!("skipping quality pattern {name}: {err}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AuditError;
    use crate::fs::{MockFileSystem, StdFileSystem};
    use crate::template::TemplateConfig;
    use indoc::indoc;

    fn write(root: &Path, rel: &str, contents: &str) {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create dir");
        }
        std::fs::write(path, contents).expect("write file");
    }

    fn builtin() -> StructureTemplate {
        TemplateConfig::builtin().default
    }

    #[test]
    fn dockerfile_fallback_mixes_polarities() {
        let dir = tempfile::tempdir().expect("tempdir");
        write(
            dir.path(),
            "Dockerfile",
            indoc! {"
                FROM python:3.11
                RUN apt-get install -y vim
                COPY . .
            "},
        );

        let warnings = audit_dockerfile(&StdFileSystem::new(), dir.path(), &builtin());

        assert_eq!(
            warnings,
            vec![
                "EXPOSE missing",
                "uses COPY . . without .dockerignore",
                "installs unnecessary tools",
            ]
        );
    }

    #[test]
    fn clean_dockerfile_has_no_warnings() {
        let dir = tempfile::tempdir().expect("tempdir");
        write(
            dir.path(),
            "Dockerfile",
            indoc! {"
                FROM python:3.11-slim
                COPY requirements.txt /app/
                EXPOSE 8000
            "},
        );

        assert!(audit_dockerfile(&StdFileSystem::new(), dir.path(), &builtin()).is_empty());
    }

    #[test]
    fn compose_fallback_requires_good_practices() {
        let dir = tempfile::tempdir().expect("tempdir");
        write(dir.path(), "docker-compose.yml", "services:\n  web:\n    image: app\n");
        let warnings = audit_compose(&StdFileSystem::new(), dir.path(), &builtin());
        assert_eq!(
            warnings,
            vec![
                "no restart policy",
                "no volumes defined",
                "no networks defined",
                "no depends_on defined",
            ]
        );

        write(
            dir.path(),
            "docker-compose.yml",
            indoc! {"
                services:
                  web:
                    restart: unless-stopped
                    depends_on:
                      - db
                    networks: [backend]
                volumes:
                  data: {}
            "},
        );
        assert!(audit_compose(&StdFileSystem::new(), dir.path(), &builtin()).is_empty());
    }

    #[test]
    fn gitignore_fallback_lists_missing_entries() {
        let dir = tempfile::tempdir().expect("tempdir");
        write(dir.path(), ".gitignore", "build/\ndist/\n.pytest_cache/\n*.log\n");

        let warnings = audit_gitignore(&StdFileSystem::new(), dir.path(), &builtin());

        assert_eq!(
            warnings,
            vec![
                "missing .env",
                "missing __pycache__/",
                "missing *.pyc",
                "missing node_modules/",
            ]
        );
    }

    #[test]
    fn missing_files_yield_no_warnings_but_missing_tests_does() {
        let dir = tempfile::tempdir().expect("tempdir");
        let quality = audit_config_quality(&StdFileSystem::new(), dir.path(), &builtin());

        assert!(quality.dockerfile_warnings.is_empty());
        assert!(quality.compose_warnings.is_empty());
        assert!(quality.gitignore_warnings.is_empty());
        assert_eq!(quality.tests_warnings, vec!["tests directory missing"]);
    }

    #[test]
    fn tests_audit_flags_naming_and_empty_dirs() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::create_dir_all(dir.path().join("tests")).expect("create tests");
        assert_eq!(
            audit_tests(&StdFileSystem::new(), dir.path(), &builtin()),
            vec!["no test files found"]
        );

        write(dir.path(), "tests/example.py", "");
        write(dir.path(), "tests/test_api.py", "");
        write(dir.path(), "tests/models_test.py", "");
        assert_eq!(
            audit_tests(&StdFileSystem::new(), dir.path(), &builtin()),
            vec!["test file example.py doesn't follow naming convention"]
        );
    }

    #[test]
    fn template_patterns_respect_polarity() {
        let patterns = vec![
            QualityPattern::regex_rule(
                "latest_tag",
                r"FROM\s+\S+:latest",
                PatternPolarity::WarnIfPresent,
                "uses latest tag",
            ),
            QualityPattern::regex_rule(
                "healthcheck",
                "HEALTHCHECK",
                PatternPolarity::WarnIfAbsent,
                "no HEALTHCHECK",
            ),
            QualityPattern {
                warning: None,
                ..QualityPattern::regex_rule("silent", "USER", PatternPolarity::WarnIfAbsent, "")
            },
        ];

        let warnings = evaluate_patterns("FROM python:latest\n", &patterns);
        assert_eq!(warnings, vec!["uses latest tag", "no HEALTHCHECK"]);

        let warnings = evaluate_patterns("FROM python:3.11\nHEALTHCHECK CMD true\n", &patterns);
        assert!(warnings.is_empty());
    }

    #[test]
    fn template_tests_patterns_match_any_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        write(dir.path(), "tests/test_api.py", "");
        let mut template = builtin();
        template.tests_quality = Some(FileQuality {
            patterns: vec![
                QualityPattern::regex_rule(
                    "unit",
                    r"test_.*\.py",
                    PatternPolarity::WarnIfAbsent,
                    "no unit tests",
                ),
                QualityPattern::regex_rule(
                    "integration",
                    r"test_integration_.*\.py",
                    PatternPolarity::WarnIfAbsent,
                    "no integration tests",
                ),
            ],
        });

        let warnings = audit_tests(&StdFileSystem::new(), dir.path(), &template);

        assert_eq!(warnings, vec!["no integration tests"]);
    }

    #[test]
    fn read_failures_become_single_warning() {
        let mut fs = MockFileSystem::new();
        fs.expect_exists().returning(|_| true);
        fs.expect_read_to_string()
            .returning(|_| Err(AuditError::Other("permission denied".to_string())));

        let warnings = audit_dockerfile(&fs, Path::new("/svc"), &builtin());

        assert_eq!(warnings, vec!["unable to read Dockerfile content"]);
    }
}
