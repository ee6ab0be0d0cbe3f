//! File-creation guard enforcing a [`FileCreationPolicy`].

use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;

use glob::Pattern;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{AuditError, Result};
use crate::fs::{FileSystem, StdFileSystem, file_name, is_hidden};
use crate::policy::{FileCreationPolicy, FilePreventionRule};
use crate::template::TemplateConfig;

static MAKEFILE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:[Mm]akefile(?:\..*)?|[Gg][Nn][Uu][Mm]akefile)$").expect("valid makefile regex")
});

const ENTRYPOINT: &str = "entrypoint.sh";
const SERVICE_MARKERS: [&str; 4] = ["Dockerfile", "docker-compose.yml", "manage.py", "package.json"];

/// Which policy rule produced a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum GuardRule {
    /// Makefile names.
    Makefile,
    /// Shell scripts.
    ShellScript,
    /// Relative paths in file contents.
    RelativePath,
    /// A configured additional rule.
    Restricted,
}

/// Outcome of a file-creation check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct GuardDecision {
    /// Whether the file may exist.
    pub allowed: bool,
    /// Rejection message, empty when allowed.
    pub message: String,
    /// Suggested replacements, empty when allowed.
    pub alternatives: Vec<String>,
    /// Rule that rejected the file.
    pub rule: Option<GuardRule>,
    /// Severity configured on the rejecting rule, empty when allowed.
    pub severity: String,
}

impl GuardDecision {
    fn allow() -> Self {
        Self {
            allowed: true,
            message: String::new(),
            alternatives: Vec::new(),
            rule: None,
            severity: String::new(),
        }
    }

    fn deny(rule: GuardRule, message: &str, alternatives: &[String], severity: &str) -> Self {
        Self {
            allowed: false,
            message: message.to_string(),
            alternatives: alternatives.to_vec(),
            rule: Some(rule),
            severity: severity.to_string(),
        }
    }
}

/// An existing file the policy would have rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PreventionViolation {
    /// Path relative to the service directory.
    pub file_path: String,
    /// Rule that rejects the file.
    pub rule: GuardRule,
    /// Rejection message.
    pub error_message: String,
    /// Suggested replacements.
    pub alternatives: Vec<String>,
    /// Severity label of the rule.
    pub severity: String,
}

/// Overview of the active policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PreventionSummary {
    /// Makefile rule enforced.
    pub makefiles_blocked: bool,
    /// Shell script rule enforced.
    pub shell_scripts_blocked: bool,
    /// Relative-path rule enforced.
    pub path_prevention_enabled: bool,
    /// Number of additional rules.
    pub other_rules_count: usize,
    /// Files marking a framework layout for the entrypoint exception.
    pub framework_markers: Vec<String>,
    /// Makefile alternatives.
    pub makefile_alternatives: Vec<String>,
    /// Shell script alternatives.
    pub shell_alternatives: Vec<String>,
    /// Relative-path alternatives.
    pub path_alternatives: Vec<String>,
}

/// Makefile findings for one service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ServiceMakefileAudit {
    /// Directory name.
    pub service_name: String,
    /// Directory path.
    pub service_path: String,
    /// Makefiles found in the service.
    pub makefile_violations: Vec<PreventionViolation>,
    /// Violations of any rule in the service.
    pub total_violations: usize,
    /// Whether any Makefile was found.
    pub has_makefiles: bool,
}

/// Makefile audit across the services under a base directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct MakefileAudit {
    /// Audited base directory.
    pub base_path: String,
    /// Number of detected services.
    pub total_services: usize,
    /// Makefiles found across all services.
    pub total_makefile_violations: usize,
    /// Per-service findings.
    pub services: Vec<ServiceMakefileAudit>,
    /// Makefile rule enforced.
    pub makefiles_blocked: bool,
    /// Shell script rule enforced.
    pub shell_scripts_blocked: bool,
}

/// File kinds with dedicated alternatives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RestrictedKind {
    /// Makefiles.
    Makefile,
    /// Shell scripts.
    ShellScript,
}

impl FromStr for RestrictedKind {
    type Err = AuditError;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "makefile" => Ok(Self::Makefile),
            "shell_script" => Ok(Self::ShellScript),
            other => Err(AuditError::Other(format!("unknown file type '{other}'"))),
        }
    }
}

impl fmt::Display for RestrictedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Makefile => f.write_str("makefile"),
            Self::ShellScript => f.write_str("shell_script"),
        }
    }
}

/// Alternatives for a restricted file kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AlternativeSuggestion {
    /// Requested kind.
    pub file_type: RestrictedKind,
    /// Rejection message of the rule.
    pub error_message: String,
    /// All alternatives of the rule.
    pub alternatives: Vec<String>,
    /// One-line recommendation built from the first alternatives.
    pub recommendation: String,
}

/// Decides whether files may exist in a service.
pub struct FilePreventor<F: FileSystem> {
    policy: FileCreationPolicy,
    fs: F,
}

impl FilePreventor<StdFileSystem> {
    /// Guard backed by the policy of `config`.
    ///
    /// Fails when the configuration carries no file-creation policy.
    pub fn from_config(config: &TemplateConfig) -> Result<Self> {
        let policy = config
            .file_prevention
            .clone()
            .ok_or_else(|| AuditError::Other("no file-creation policy configured".to_string()))?;
        Ok(Self::new(policy, StdFileSystem::new()))
    }
}

impl<F: FileSystem> FilePreventor<F> {
    /// Create a guard for `policy`, reading files through `fs`.
    pub fn new(policy: FileCreationPolicy, fs: F) -> Self {
        Self { policy, fs }
    }

    /// Active policy.
    pub fn policy(&self) -> &FileCreationPolicy {
        &self.policy
    }

    /// Check `file` against the rules, in order: Makefiles, shell scripts,
    /// relative paths in the existing content, then additional rules.
    pub fn can_create_file(&self, file: &Path, service_dir: &Path) -> GuardDecision {
        let name = file_name(file);

        let rule = &self.policy.makefiles;
        if blocks(rule, name, |name| MAKEFILE_RE.is_match(name)) {
            return decide(rule, GuardRule::Makefile, false);
        }

        let rule = &self.policy.shell_scripts;
        if blocks(rule, name, |name| name.ends_with(".sh")) {
            let excepted = self.is_framework_entrypoint(file, service_dir, rule);
            return decide(rule, GuardRule::ShellScript, excepted);
        }

        let paths = &self.policy.path_prevention;
        if paths.enabled && self.has_relative_paths(file) {
            return GuardDecision::deny(
                GuardRule::RelativePath,
                &paths.error_message,
                &paths.alternatives,
                &paths.severity,
            );
        }

        for rule in self.policy.other_restricted.iter().filter(|rule| rule.enabled) {
            if matches_any(name, &rule.blocked_patterns) {
                return GuardDecision::deny(
                    GuardRule::Restricted,
                    &rule.error_message,
                    &rule.alternatives,
                    &rule.severity,
                );
            }
        }

        GuardDecision::allow()
    }

    /// Every existing file in `service_dir` the policy rejects.
    ///
    /// A missing directory has no violations.
    pub fn validate_service_structure(&self, service_dir: &Path) -> Vec<PreventionViolation> {
        if !self.fs.is_dir(service_dir) {
            return Vec::new();
        }
        let files = match self.fs.list_files(service_dir) {
            Ok(files) => files,
            Err(err) => {
                log::debug!("unable to list {}: {err}", service_dir.display());
                return Vec::new();
            }
        };

        files
            .iter()
            .filter_map(|file| {
                let decision = self.can_create_file(file, service_dir);
                let rule = decision.rule?;
                let relative = file.strip_prefix(service_dir).unwrap_or(file);
                Some(PreventionViolation {
                    file_path: relative.display().to_string(),
                    rule,
                    error_message: decision.message,
                    alternatives: decision.alternatives,
                    severity: decision.severity,
                })
            })
            .collect()
    }

    /// Overview of the active policy.
    pub fn summary(&self) -> PreventionSummary {
        let policy = &self.policy;
        PreventionSummary {
            makefiles_blocked: policy.makefiles.enabled,
            shell_scripts_blocked: policy.shell_scripts.enabled,
            path_prevention_enabled: policy.path_prevention.enabled,
            other_rules_count: policy.other_restricted.len(),
            framework_markers: policy.shell_scripts.framework_markers.clone(),
            makefile_alternatives: policy.makefiles.alternatives.clone(),
            shell_alternatives: policy.shell_scripts.alternatives.clone(),
            path_alternatives: policy.path_prevention.alternatives.clone(),
        }
    }

    /// Audit every service directly under `base` for Makefiles.
    ///
    /// Services are non-hidden child directories holding a Dockerfile, a
    /// compose file, `manage.py` or `package.json`.
    pub fn audit_makefiles(&self, base: &Path) -> Result<MakefileAudit> {
        if !self.fs.is_dir(base) {
            return Err(AuditError::ServiceNotFound(base.to_path_buf()));
        }

        let services: Vec<PathBuf> = self
            .fs
            .list_dir(base)?
            .into_iter()
            .filter(|entry| !is_hidden(entry) && self.fs.is_dir(entry))
            .filter(|entry| SERVICE_MARKERS.iter().any(|marker| self.fs.exists(&entry.join(marker))))
            .collect();

        let audits: Vec<ServiceMakefileAudit> = services
            .iter()
            .map(|service| {
                let violations = self.validate_service_structure(service);
                let total_violations = violations.len();
                let makefile_violations: Vec<PreventionViolation> = violations
                    .into_iter()
                    .filter(|violation| violation.rule == GuardRule::Makefile)
                    .collect();
                ServiceMakefileAudit {
                    service_name: file_name(service).to_string(),
                    service_path: service.display().to_string(),
                    has_makefiles: !makefile_violations.is_empty(),
                    makefile_violations,
                    total_violations,
                }
            })
            .collect();

        Ok(MakefileAudit {
            base_path: base.display().to_string(),
            total_services: audits.len(),
            total_makefile_violations: audits.iter().map(|a| a.makefile_violations.len()).sum(),
            services: audits,
            makefiles_blocked: self.policy.makefiles.enabled,
            shell_scripts_blocked: self.policy.shell_scripts.enabled,
        })
    }

    /// Alternatives configured for `kind`.
    pub fn suggest_alternatives(&self, kind: RestrictedKind) -> AlternativeSuggestion {
        let rule = match kind {
            RestrictedKind::Makefile => &self.policy.makefiles,
            RestrictedKind::ShellScript => &self.policy.shell_scripts,
        };
        let leading: Vec<&str> = rule.alternatives.iter().take(2).map(String::as_str).collect();
        AlternativeSuggestion {
            file_type: kind,
            error_message: rule.error_message.clone(),
            alternatives: rule.alternatives.clone(),
            recommendation: format!("For {kind}, consider: {}", leading.join(", ")),
        }
    }

    fn is_framework_entrypoint(&self, file: &Path, service_dir: &Path, rule: &FilePreventionRule) -> bool {
        let in_root = file
            .parent()
            .is_some_and(|parent| same_directory(parent, service_dir));
        if !in_root || file_name(file) != ENTRYPOINT {
            return false;
        }
        if !rule.allowed_exceptions.iter().any(|name| name == ENTRYPOINT) {
            return false;
        }
        rule.framework_markers
            .iter()
            .any(|marker| self.fs.exists(&service_dir.join(marker)))
    }

    fn has_relative_paths(&self, file: &Path) -> bool {
        if !self.fs.exists(file) {
            return false;
        }
        let content = match self.fs.read_to_string(file) {
            Ok(content) => content,
            Err(err) => {
                log::debug!("unable to read {}: {err}", file.display());
                return false;
            }
        };
        let rule = &self.policy.path_prevention;
        let blocked = rule
            .blocked_patterns
            .iter()
            .any(|pattern| content.contains(pattern.as_str()));
        let excepted = rule
            .allowed_exceptions
            .iter()
            .any(|exception| content.contains(exception.as_str()));
        blocked && !excepted
    }

}

fn decide(rule: &FilePreventionRule, kind: GuardRule, excepted: bool) -> GuardDecision {
    if !rule.enabled || excepted {
        GuardDecision::allow()
    } else {
        GuardDecision::deny(kind, &rule.error_message, &rule.alternatives, &rule.severity)
    }
}

/// Configured name patterns when present, the built-in name check otherwise.
fn blocks(rule: &FilePreventionRule, name: &str, builtin: impl Fn(&str) -> bool) -> bool {
    if rule.blocked_patterns.is_empty() {
        builtin(name)
    } else {
        matches_any(name, &rule.blocked_patterns)
    }
}

/// `.`-insensitive comparison, falling back to canonical paths.
fn same_directory(a: &Path, b: &Path) -> bool {
    let lexical = |path: &Path| -> PathBuf {
        path.components()
            .filter(|component| !matches!(component, Component::CurDir))
            .collect()
    };
    if lexical(a) == lexical(b) {
        return true;
    }
    let canonical = |path: &Path| {
        let path = if path.as_os_str().is_empty() { Path::new(".") } else { path };
        std::fs::canonicalize(path).ok()
    };
    match (canonical(a), canonical(b)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

fn matches_any(name: &str, patterns: &[String]) -> bool {
    patterns.iter().any(|raw| match Pattern::new(raw) {
        Ok(pattern) => pattern.matches(name),
        Err(err) => {
            log::debug!("ignoring invalid glob {raw}: {err}");
            false
        }
    })
}
