//! Heuristic architecture analysis of Python service trees.
//!
//! Every principle is judged from regular expressions over file contents and
//! names; nothing is parsed. The duplication check in particular only reports
//! repeated definition and import names, which is a collision heuristic and
//! not a clone detector.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::{
    ArchitectureAnalysis, ArchitecturePrinciple, ArchitectureStatus, PrincipleViolation, Severity,
};
use crate::error::{AuditError, Result};
use crate::fs::{FileSystem, StdFileSystem, file_name, has_extension};

static DEF_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(?:async\s+)?def\s+(\w+)").expect("valid def regex"));
static CLASS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*class\s+(\w+)").expect("valid class regex"));
static IMPORT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(?:from\s+\S+\s+)?import\s+\S").expect("valid import regex"));
static TEST_FN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"def test_\w+").expect("valid test function regex"));
static INTEGRATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(integration|e2e|end[-_ ]to[-_ ]end)").expect("valid integration regex")
});
static COMPOSE_TEST_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(test|tests|testing|pytest)\b").expect("valid compose test regex")
});
static FAKER_IMPORT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\s*(from\s+faker\s+import|import\s+faker)").expect("valid faker regex")
});
static FAKER_USAGE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Faker\(|fake\.\w+\(").expect("valid faker usage regex"));
static ASYNC_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\basync\s+def\b|\bawait\b").expect("valid async regex"));
static CACHE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(cache|caches|redis|memcached|lru_cache)\b").expect("valid cache regex")
});
static POOL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(connection_pool|pool_size|connectionpool|max_connections|conn_max_age)")
        .expect("valid pool regex")
});
static ORCHESTRATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(replicas|autoscal\w*|horizontalpodautoscaler)\b")
        .expect("valid orchestration regex")
});

const PYTEST_CONFIGS: [&str; 3] = ["pytest.ini", "pyproject.toml", "setup.cfg"];
const TEST_FILES_SAMPLED: usize = 3;
const SCALABILITY_SIGNALS_REQUIRED: usize = 2;
const VIOLATION_PENALTY: f64 = 5.0;

/// Score contributed by a compliant principle; the five weights sum to 100.
pub fn principle_weight(principle: ArchitecturePrinciple) -> f64 {
    match principle {
        ArchitecturePrinciple::DuplicationAvoidance => 20.0,
        ArchitecturePrinciple::TestDrivenDevelopment => 25.0,
        ArchitecturePrinciple::IntegrationTests => 20.0,
        ArchitecturePrinciple::SyntheticTestData => 15.0,
        ArchitecturePrinciple::Scalability => 20.0,
    }
}

/// Fixed severity of a violation of `principle`.
pub fn principle_severity(principle: ArchitecturePrinciple) -> Severity {
    match principle {
        ArchitecturePrinciple::TestDrivenDevelopment => Severity::Critical,
        ArchitecturePrinciple::DuplicationAvoidance | ArchitecturePrinciple::IntegrationTests => {
            Severity::High
        }
        ArchitecturePrinciple::SyntheticTestData | ArchitecturePrinciple::Scalability => {
            Severity::Medium
        }
    }
}

/// Runs the five principle heuristics over a service directory.
pub struct ArchitectureAnalyzer<F: FileSystem> {
    fs: F,
}

impl<F: FileSystem> ArchitectureAnalyzer<F> {
    /// Create an analyzer reading through `fs`.
    pub fn new(fs: F) -> Self {
        Self { fs }
    }

    /// Evaluate every principle and score the result.
    pub fn analyze(&self, service_dir: &Path) -> Result<ArchitectureAnalysis> {
        if !self.fs.is_dir(service_dir) {
            return Err(AuditError::ServiceNotFound(service_dir.to_path_buf()));
        }

        let violations = [
            self.check_duplication(service_dir),
            self.check_tdd(service_dir),
            self.check_integration_tests(service_dir),
            self.check_synthetic_data(service_dir),
            self.check_scalability(service_dir),
        ]
        .into_iter()
        .flatten()
        .collect();

        Ok(analysis_from_violations(violations))
    }

    fn check_duplication(&self, dir: &Path) -> Option<PrincipleViolation> {
        let mut seen: HashSet<(&'static str, String)> = HashSet::new();
        let mut counts: HashMap<&'static str, usize> = HashMap::new();
        let mut first: Option<(PathBuf, usize, String)> = None;

        for file in self.source_files(dir) {
            let Some(content) = self.read(&file) else {
                continue;
            };
            for (index, line) in content.lines().enumerate() {
                let Some((kind, key)) = definition_key(line) else {
                    continue;
                };
                if !seen.insert((kind, key)) {
                    *counts.entry(kind).or_default() += 1;
                    if first.is_none() {
                        first = Some((file.clone(), index + 1, line.trim().to_string()));
                    }
                }
            }
        }

        let Some((path, line, snippet)) = first else {
            return None;
        };
        let count = |kind| counts.get(kind).copied().unwrap_or(0);
        Some(PrincipleViolation {
            principle: ArchitecturePrinciple::DuplicationAvoidance,
            severity: principle_severity(ArchitecturePrinciple::DuplicationAvoidance),
            description: format!(
                "Repeated names found: {} function(s), {} class(es), {} import(s)",
                count("function"),
                count("class"),
                count("import"),
            ),
            file_path: Some(path.display().to_string()),
            line_number: Some(line),
            code_snippet: Some(snippet),
            recommendation: "Extract shared logic into common modules and remove duplicated definitions"
                .to_string(),
        })
    }

    fn check_tdd(&self, dir: &Path) -> Option<PrincipleViolation> {
        let has_tests_dir = ["tests", "test"]
            .iter()
            .any(|name| self.fs.is_dir(&dir.join(name)));
        let has_config = PYTEST_CONFIGS
            .iter()
            .any(|name| self.fs.exists(&dir.join(name)));
        let has_test_functions = self
            .test_files(dir)
            .iter()
            .take(TEST_FILES_SAMPLED)
            .filter_map(|file| self.read(file))
            .any(|content| TEST_FN_RE.is_match(&content));

        if has_tests_dir && has_config && has_test_functions {
            return None;
        }

        let mut missing = Vec::new();
        if !has_tests_dir {
            missing.push("no tests/ directory");
        }
        if !has_config {
            missing.push("no pytest configuration (pytest.ini, pyproject.toml or setup.cfg)");
        }
        if !has_test_functions {
            missing.push("no test functions found");
        }
        Some(violation(
            ArchitecturePrinciple::TestDrivenDevelopment,
            format!("Test-driven development not detected: {}", missing.join("; ")),
            "Write failing tests first under tests/ and configure pytest for the service",
        ))
    }

    fn check_integration_tests(&self, dir: &Path) -> Option<PrincipleViolation> {
        let files = self.files(dir);

        let named = files
            .iter()
            .any(|file| file_name(file).to_lowercase().contains("integration"));
        let in_tests = || {
            files
                .iter()
                .filter(|file| is_test_file(dir, file))
                .filter_map(|file| self.read(file))
                .any(|content| INTEGRATION_RE.is_match(&content))
        };
        let in_compose = || {
            files
                .iter()
                .filter(|file| is_compose_file(file))
                .filter_map(|file| self.read(file))
                .any(|content| COMPOSE_TEST_RE.is_match(&content))
        };

        if named || in_tests() || in_compose() {
            return None;
        }
        Some(violation(
            ArchitecturePrinciple::IntegrationTests,
            "No integration or end-to-end tests detected".to_string(),
            "Add integration tests that exercise the service with its real dependencies, e.g. through a test compose file",
        ))
    }

    fn check_synthetic_data(&self, dir: &Path) -> Option<PrincipleViolation> {
        let mut imported = false;
        let mut used = false;
        for file in self.source_files(dir) {
            let Some(content) = self.read(&file) else {
                continue;
            };
            imported |= FAKER_IMPORT_RE.is_match(&content);
            used |= FAKER_USAGE_RE.is_match(&content);
            if imported && used {
                return None;
            }
        }

        let description = if imported {
            "Faker is imported but never used to generate data"
        } else {
            "No synthetic data library (Faker) is used in tests"
        };
        Some(violation(
            ArchitecturePrinciple::SyntheticTestData,
            description.to_string(),
            "Generate test data with Faker instead of hard-coded fixtures",
        ))
    }

    fn check_scalability(&self, dir: &Path) -> Option<PrincipleViolation> {
        let mut signals = [false; 4];
        for file in self.files(dir) {
            let source = has_extension(&file, &["py"]);
            let yaml = has_extension(&file, &["yml", "yaml"]);
            if !source && !yaml {
                continue;
            }
            let Some(content) = self.read(&file) else {
                continue;
            };
            if source {
                signals[0] |= ASYNC_RE.is_match(&content);
                signals[1] |= CACHE_RE.is_match(&content);
                signals[2] |= POOL_RE.is_match(&content);
            } else {
                signals[3] |= ORCHESTRATION_RE.is_match(&content);
            }
        }

        let found = signals.iter().filter(|signal| **signal).count();
        if found >= SCALABILITY_SIGNALS_REQUIRED {
            return None;
        }
        Some(violation(
            ArchitecturePrinciple::Scalability,
            format!("Only {found} of 4 scalability signals found"),
            "Introduce async I/O, caching, connection pooling or replica configuration",
        ))
    }

    fn files(&self, dir: &Path) -> Vec<PathBuf> {
        match self.fs.list_files(dir) {
            Ok(files) => files,
            Err(err) => {
                log::debug!("skipping unlistable {}: {err}", dir.display());
                Vec::new()
            }
        }
    }

    fn source_files(&self, dir: &Path) -> Vec<PathBuf> {
        self.files(dir)
            .into_iter()
            .filter(|file| has_extension(file, &["py"]))
            .collect()
    }

    fn test_files(&self, dir: &Path) -> Vec<PathBuf> {
        self.files(dir)
            .into_iter()
            .filter(|file| is_test_file(dir, file))
            .collect()
    }

    fn read(&self, path: &Path) -> Option<String> {
        match self.fs.read_to_string(path) {
            Ok(content) => Some(content),
            Err(err) => {
                log::debug!("skipping unreadable {}: {err}", path.display());
                None
            }
        }
    }
}

/// Analyze a service directory on the real filesystem.
pub fn analyze_architecture(service_dir: &Path) -> Result<ArchitectureAnalysis> {
    ArchitectureAnalyzer::new(StdFileSystem::new()).analyze(service_dir)
}

/// Derive compliance flags, counts, score and status from the violations.
pub fn analysis_from_violations(violations: Vec<PrincipleViolation>) -> ArchitectureAnalysis {
    let violated = |principle| violations.iter().any(|v| v.principle == principle);
    let severity_count = |severity| violations.iter().filter(|v| v.severity == severity).count();

    let compliant_weight: f64 = ArchitecturePrinciple::ALL
        .into_iter()
        .filter(|principle| !violated(*principle))
        .map(principle_weight)
        .sum();
    let architecture_score =
        (compliant_weight - VIOLATION_PENALTY * violations.len() as f64).max(0.0);

    ArchitectureAnalysis {
        dry_compliance: !violated(ArchitecturePrinciple::DuplicationAvoidance),
        tdd_implementation: !violated(ArchitecturePrinciple::TestDrivenDevelopment),
        integration_tests: !violated(ArchitecturePrinciple::IntegrationTests),
        synthetic_data_usage: !violated(ArchitecturePrinciple::SyntheticTestData),
        scalability_features: !violated(ArchitecturePrinciple::Scalability),
        critical_violations: severity_count(Severity::Critical),
        high_violations: severity_count(Severity::High),
        medium_violations: severity_count(Severity::Medium),
        low_violations: severity_count(Severity::Low),
        total_violations: violations.len(),
        architecture_score,
        architecture_status: ArchitectureStatus::from_score(architecture_score),
        violations,
    }
}

fn violation(
    principle: ArchitecturePrinciple,
    description: String,
    recommendation: &str,
) -> PrincipleViolation {
    PrincipleViolation {
        principle,
        severity: principle_severity(principle),
        description,
        file_path: None,
        line_number: None,
        code_snippet: None,
        recommendation: recommendation.to_string(),
    }
}

fn definition_key(line: &str) -> Option<(&'static str, String)> {
    if let Some(captures) = DEF_RE.captures(line) {
        return Some(("function", captures[1].to_string()));
    }
    if let Some(captures) = CLASS_RE.captures(line) {
        return Some(("class", captures[1].to_string()));
    }
    if IMPORT_RE.is_match(line) {
        return Some(("import", line.trim().to_string()));
    }
    None
}

fn is_test_file(dir: &Path, file: &Path) -> bool {
    if !has_extension(file, &["py"]) {
        return false;
    }
    let relative = file.strip_prefix(dir).unwrap_or(file);
    let in_tests_dir = relative
        .parent()
        .map(|parent| {
            parent
                .components()
                .any(|part| matches!(part.as_os_str().to_str(), Some("tests" | "test")))
        })
        .unwrap_or(false);
    let stem = file
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or_default();
    in_tests_dir && (stem.starts_with("test_") || stem.ends_with("_test"))
}

fn is_compose_file(file: &Path) -> bool {
    file_name(file).starts_with("docker-compose") && has_extension(file, &["yml", "yaml"])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MockFileSystem;
    use indoc::indoc;
    use std::io;

    fn write(root: &Path, rel: &str, contents: &str) {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create dir");
        }
        std::fs::write(path, contents).expect("write file");
    }

    fn analyze(root: &Path) -> ArchitectureAnalysis {
        analyze_architecture(root).expect("analysis")
    }

    fn write_exemplary_service(root: &Path) {
        write(
            root,
            "app/main.py",
            indoc! {"
                import asyncio
                from redis import Redis

                POOL_SIZE = 10
                cache = Redis()

                async def handler():
                    await asyncio.sleep(0)
            "},
        );
        write(
            root,
            "tests/test_api.py",
            indoc! {"
                from faker import Faker

                fake = Faker()

                def test_handler():
                    assert fake.name()
            "},
        );
        write(
            root,
            "tests/test_integration_flow.py",
            "def test_end_to_end():\n    assert True\n",
        );
        write(root, "pytest.ini", "[pytest]\n");
    }

    #[test]
    fn exemplary_service_is_fully_compliant() {
        let root = tempfile::tempdir().expect("tempdir");
        write_exemplary_service(root.path());

        let analysis = analyze(root.path());

        assert!(analysis.violations.is_empty(), "{:?}", analysis.violations);
        assert!(ArchitecturePrinciple::ALL
            .into_iter()
            .all(|principle| analysis.is_compliant(principle)));
        assert_eq!(analysis.architecture_score, 100.0);
        assert_eq!(analysis.architecture_status, ArchitectureStatus::Excellent);
    }

    #[test]
    fn zero_compliance_scores_zero_and_is_critical() {
        let mut fs = MockFileSystem::new();
        fs.expect_is_dir()
            .returning(|path| path == Path::new("/svc"));
        fs.expect_exists().returning(|_| false);
        fs.expect_list_files().returning(|_| {
            Ok(vec![
                PathBuf::from("/svc/a.py"),
                PathBuf::from("/svc/b.py"),
                PathBuf::from("/svc/broken.py"),
            ])
        });
        fs.expect_read_to_string().returning(|path| {
            if path.ends_with("broken.py") {
                Err(io::Error::other("permission denied").into())
            } else {
                Ok("def helper():\n    return 1\n".to_string())
            }
        });

        let analysis = ArchitectureAnalyzer::new(fs)
            .analyze(Path::new("/svc"))
            .expect("analysis");

        assert!(!analysis.dry_compliance);
        assert!(!analysis.tdd_implementation);
        assert!(!analysis.integration_tests);
        assert!(!analysis.synthetic_data_usage);
        assert!(!analysis.scalability_features);
        assert_eq!(analysis.total_violations, 5);
        assert_eq!(analysis.critical_violations, 1);
        assert_eq!(analysis.high_violations, 2);
        assert_eq!(analysis.medium_violations, 2);
        assert_eq!(analysis.low_violations, 0);
        assert_eq!(analysis.architecture_score, 0.0);
        assert_eq!(analysis.architecture_status, ArchitectureStatus::Critical);
    }

    #[test]
    fn duplicate_definition_points_at_second_occurrence() {
        let root = tempfile::tempdir().expect("tempdir");
        write(root.path(), "a.py", "def helper():\n    pass\n");
        write(root.path(), "b.py", "x = 1\n\ndef helper():\n    pass\n");

        let analysis = analyze(root.path());

        assert!(!analysis.dry_compliance);
        let violation = analysis
            .violations
            .iter()
            .find(|v| v.principle == ArchitecturePrinciple::DuplicationAvoidance)
            .expect("dry violation");
        assert_eq!(violation.severity, Severity::High);
        assert!(violation.file_path.as_deref().is_some_and(|p| p.ends_with("b.py")));
        assert_eq!(violation.line_number, Some(3));
        assert_eq!(violation.code_snippet.as_deref(), Some("def helper():"));
        assert!(violation.description.contains("1 function(s)"));
    }

    #[test]
    fn tdd_requires_directory_config_and_test_functions() {
        let root = tempfile::tempdir().expect("tempdir");
        write(root.path(), "tests/test_x.py", "def test_x():\n    pass\n");

        let analysis = analyze(root.path());
        assert!(!analysis.tdd_implementation);
        let violation = analysis
            .violations
            .iter()
            .find(|v| v.principle == ArchitecturePrinciple::TestDrivenDevelopment)
            .expect("tdd violation");
        assert_eq!(violation.severity, Severity::Critical);
        assert!(violation.description.contains("no pytest configuration"));

        write(root.path(), "pyproject.toml", "[tool.pytest.ini_options]\n");
        assert!(analyze(root.path()).tdd_implementation);
    }

    #[test]
    fn integration_tests_detected_from_compose_file() {
        let root = tempfile::tempdir().expect("tempdir");
        write(
            root.path(),
            "docker-compose.test.yml",
            "services:\n  runner:\n    command: pytest -q\n",
        );
        assert!(analyze(root.path()).integration_tests);
    }

    #[test]
    fn integration_tests_detected_from_test_content() {
        let root = tempfile::tempdir().expect("tempdir");
        write(
            root.path(),
            "tests/test_flow.py",
            "# e2e scenario\ndef test_flow():\n    pass\n",
        );
        assert!(analyze(root.path()).integration_tests);

        let other = tempfile::tempdir().expect("tempdir");
        write(other.path(), "app/flow.py", "# e2e scenario\n");
        assert!(!analyze(other.path()).integration_tests);
    }

    #[test]
    fn faker_must_be_imported_and_used() {
        let root = tempfile::tempdir().expect("tempdir");
        write(root.path(), "tests/conftest.py", "import faker\n");

        let analysis = analyze(root.path());
        assert!(!analysis.synthetic_data_usage);
        let violation = analysis
            .violations
            .iter()
            .find(|v| v.principle == ArchitecturePrinciple::SyntheticTestData)
            .expect("faker violation");
        assert_eq!(
            violation.description,
            "Faker is imported but never used to generate data"
        );

        write(root.path(), "tests/factories.py", "email = fake.email()\n");
        assert!(analyze(root.path()).synthetic_data_usage);
    }

    #[test]
    fn scalability_needs_two_signals() {
        let root = tempfile::tempdir().expect("tempdir");
        write(root.path(), "app/main.py", "async def run():\n    pass\n");
        assert!(!analyze(root.path()).scalability_features);

        write(root.path(), "deploy/k8s.yaml", "spec:\n  replicas: 3\n");
        assert!(analyze(root.path()).scalability_features);
    }

    #[test]
    fn score_subtracts_penalty_per_violation() {
        let analysis = analysis_from_violations(vec![violation(
            ArchitecturePrinciple::Scalability,
            "Only 1 of 4 scalability signals found".to_string(),
            "scale",
        )]);
        assert_eq!(analysis.architecture_score, 80.0 - 5.0);
        assert_eq!(analysis.architecture_status, ArchitectureStatus::Good);
        assert_eq!(analysis.medium_violations, 1);
    }

    #[test]
    fn unlistable_tree_counts_as_missing_evidence() {
        let mut fs = MockFileSystem::new();
        fs.expect_is_dir()
            .returning(|path| path == Path::new("/svc"));
        fs.expect_exists().returning(|_| false);
        fs.expect_list_files()
            .returning(|_| Err(io::Error::from(io::ErrorKind::PermissionDenied).into()));

        let analysis = ArchitectureAnalyzer::new(fs)
            .analyze(Path::new("/svc"))
            .expect("analysis");

        assert!(analysis.dry_compliance);
        assert_eq!(analysis.total_violations, 4);
        assert_eq!(analysis.architecture_score, 0.0);
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_subdirectory_is_skipped() {
        use std::os::unix::fs::PermissionsExt;

        let root = tempfile::tempdir().expect("tempdir");
        write(
            root.path(),
            "app.py",
            indoc! {"
                import redis

                async def handler():
                    await redis.get('key')
            "},
        );
        write(root.path(), "locked/secret.py", "POOL = 1\n");
        let locked = root.path().join("locked");
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o000))
            .expect("lock dir");

        let result = analyze_architecture(root.path());

        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755))
            .expect("unlock dir");
        let analysis = result.expect("analysis despite unreadable directory");
        assert!(analysis.dry_compliance);
        assert!(!analysis.tdd_implementation);
    }

    #[test]
    fn missing_service_is_an_error() {
        let root = tempfile::tempdir().expect("tempdir");
        let err = analyze_architecture(&root.path().join("missing")).expect_err("missing");
        assert!(matches!(err, AuditError::ServiceNotFound(_)));
    }

    #[test]
    fn test_files_live_under_tests_directories() {
        let dir = Path::new("/svc");
        assert!(is_test_file(dir, Path::new("/svc/tests/test_api.py")));
        assert!(is_test_file(dir, Path::new("/svc/test/unit/api_test.py")));
        assert!(!is_test_file(dir, Path::new("/svc/test_api.py")));
        assert!(!is_test_file(dir, Path::new("/svc/tests/helpers.py")));
    }
}
