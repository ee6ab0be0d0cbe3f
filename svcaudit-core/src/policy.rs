//! File-creation policy records consumed by the file guard.
//!
//! These types are declared ahead of the template model so that
//! [`crate::template::TemplateConfig`] can own an optional policy directly.

use serde::{Deserialize, Serialize};

/// Rule blocking files by name pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilePreventionRule {
    /// Whether the rule is enforced.
    pub enabled: bool,
    /// Glob patterns for file names the rule blocks.
    ///
    /// When empty, the Makefile and shell-script rules fall back to their
    /// built-in name checks.
    pub blocked_patterns: Vec<String>,
    /// File names that may be allowed despite matching.
    pub allowed_exceptions: Vec<String>,
    /// Files whose presence marks a service as using the supported web framework layout.
    #[serde(alias = "django_microservice_patterns")]
    pub framework_markers: Vec<String>,
    /// Message returned when the rule rejects a file.
    pub error_message: String,
    /// Suggested replacements for the blocked file.
    pub alternatives: Vec<String>,
    /// Severity label attached to violations.
    pub severity: String,
}

impl Default for FilePreventionRule {
    fn default() -> Self {
        Self {
            enabled: true,
            blocked_patterns: Vec::new(),
            allowed_exceptions: Vec::new(),
            framework_markers: Vec::new(),
            error_message: String::new(),
            alternatives: Vec::new(),
            severity: "high".to_string(),
        }
    }
}

/// Rule blocking relative-path constructs inside file contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathPreventionRule {
    /// Whether the rule is enforced.
    pub enabled: bool,
    /// Substrings that flag a problematic relative path.
    pub blocked_patterns: Vec<String>,
    /// Substrings whose presence anywhere in the file lifts the block.
    pub allowed_exceptions: Vec<String>,
    /// Message returned when the rule rejects a file.
    pub error_message: String,
    /// Suggested replacements for relative paths.
    pub alternatives: Vec<String>,
    /// Severity label attached to violations.
    pub severity: String,
}

impl Default for PathPreventionRule {
    fn default() -> Self {
        Self {
            enabled: true,
            blocked_patterns: Vec::new(),
            allowed_exceptions: Vec::new(),
            error_message: String::new(),
            alternatives: Vec::new(),
            severity: "high".to_string(),
        }
    }
}

/// Complete set of file-creation rules for a service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileCreationPolicy {
    /// Makefile rule.
    pub makefiles: FilePreventionRule,
    /// Shell script rule.
    pub shell_scripts: FilePreventionRule,
    /// Relative-path content rule.
    pub path_prevention: PathPreventionRule,
    /// Additional name-based rules.
    pub other_restricted: Vec<FilePreventionRule>,
}

impl Default for FileCreationPolicy {
    fn default() -> Self {
        Self {
            makefiles: FilePreventionRule {
                blocked_patterns: strings(&[
                    "Makefile",
                    "makefile",
                    "Makefile.*",
                    "makefile.*",
                    "GNUmakefile",
                    "gnumakefile",
                ]),
                error_message: "Makefiles are not allowed in microservices".to_string(),
                alternatives: strings(&[
                    "docker-compose.yml services for build and run tasks",
                    "pyproject.toml scripts",
                    "CI pipeline jobs",
                ]),
                ..FilePreventionRule::default()
            },
            shell_scripts: FilePreventionRule {
                blocked_patterns: strings(&["*.sh"]),
                allowed_exceptions: strings(&["entrypoint.sh"]),
                framework_markers: strings(&[
                    "manage.py",
                    "app/settings.py",
                    "app/wsgi.py",
                    "app/asgi.py",
                    "settings.py",
                    "wsgi.py",
                    "asgi.py",
                ]),
                error_message:
                    "Shell scripts are not allowed; only a Django entrypoint.sh in the service root is permitted"
                        .to_string(),
                alternatives: strings(&[
                    "Python management commands",
                    "docker-compose.yml command entries",
                    "Dockerfile RUN instructions",
                ]),
                ..FilePreventionRule::default()
            },
            path_prevention: PathPreventionRule {
                blocked_patterns: strings(&[
                    "sys.path.append(\"../\")",
                    "sys.path.append(\"./\")",
                    "sys.path.append('../')",
                    "sys.path.append('./')",
                    "sys.path.insert(0, \"../\")",
                    "\"../",
                    "'../",
                    "\"./",
                    "'./",
                ]),
                allowed_exceptions: strings(&["# svcaudit: allow-relative-paths"]),
                error_message: "Problematic relative paths detected".to_string(),
                alternatives: strings(&[
                    "Absolute imports from the package root",
                    "pathlib.Path(__file__).resolve() based paths",
                    "Paths supplied through environment variables or settings",
                ]),
                ..PathPreventionRule::default()
            },
            other_restricted: Vec::new(),
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|item| item.to_string()).collect()
}
