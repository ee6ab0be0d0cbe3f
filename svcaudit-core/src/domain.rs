//! Domain entities produced by svcaudit inspections.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Three-level structure status derived from the score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum StructureStatus {
    /// Score meets the `complete` threshold.
    Complete,
    /// Score meets the `incomplete` threshold.
    Incomplete,
    /// Score below every threshold.
    Poor,
}

impl fmt::Display for StructureStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Complete => "complete",
            Self::Incomplete => "incomplete",
            Self::Poor => "poor",
        };
        f.write_str(label)
    }
}

/// Presence checks for the template entries of a service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct StructureChecks {
    /// `Dockerfile` present.
    pub dockerfile: bool,
    /// `docker-compose.yml` present.
    pub docker_compose: bool,
    /// `.gitignore` present.
    pub gitignore: bool,
    /// `tests/` directory present.
    pub tests_dir_exists: bool,
    /// `tests/` directory holds matching files.
    pub tests_dir_has_files: bool,
    /// Presence of template entries beyond the five fixed checks.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub additional: BTreeMap<String, bool>,
}

/// Warnings emitted by the configuration quality audits.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ConfigQuality {
    /// Dockerfile warnings.
    pub dockerfile_warnings: Vec<String>,
    /// docker-compose.yml warnings.
    pub compose_warnings: Vec<String>,
    /// .gitignore warnings.
    pub gitignore_warnings: Vec<String>,
    /// Test layout warnings.
    pub tests_warnings: Vec<String>,
}

impl ConfigQuality {
    /// Number of warnings across all four audits.
    pub fn total_warnings(&self) -> usize {
        self.dockerfile_warnings.len()
            + self.compose_warnings.len()
            + self.gitignore_warnings.len()
            + self.tests_warnings.len()
    }
}

/// Structure inspection result for one service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MicroserviceStructureReport {
    /// Service identifier as requested by the caller.
    pub service: String,
    /// Resolved service path.
    pub path: String,
    /// Presence checks.
    pub structure_checks: StructureChecks,
    /// Quality warnings.
    pub config_quality: ConfigQuality,
    /// Status derived from the score.
    pub status: StructureStatus,
    /// Non-negative score, unbounded above.
    pub score: f64,
    /// Suggested fixes.
    pub recommendations: Vec<String>,
}

/// Aggregated structure audit across a repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RepositoryStructureAudit {
    /// Number of inspected services.
    pub total_services: usize,
    /// Services with complete status.
    pub complete_services: usize,
    /// Services with incomplete status.
    pub incomplete_services: usize,
    /// Services with poor status.
    pub poor_services: usize,
    /// Mean score, 0 when there are no services.
    pub average_score: f64,
    /// Per-service reports.
    pub services: Vec<MicroserviceStructureReport>,
    /// Time the audit finished.
    pub timestamp: DateTime<Utc>,
    /// Repository-wide status.
    pub overall_status: StructureStatus,
}

/// The five heuristic architecture principles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ArchitecturePrinciple {
    /// Avoid duplicated definitions.
    DuplicationAvoidance,
    /// Tests drive development.
    TestDrivenDevelopment,
    /// Integration tests exist.
    IntegrationTests,
    /// Tests use a synthetic data library.
    SyntheticTestData,
    /// Code shows scalability patterns.
    Scalability,
}

impl ArchitecturePrinciple {
    /// All principles in evaluation order.
    pub const ALL: [ArchitecturePrinciple; 5] = [
        Self::DuplicationAvoidance,
        Self::TestDrivenDevelopment,
        Self::IntegrationTests,
        Self::SyntheticTestData,
        Self::Scalability,
    ];

    /// Human-readable label.
    pub fn label(self) -> &'static str {
        match self {
            Self::DuplicationAvoidance => "DRY (Don't Repeat Yourself)",
            Self::TestDrivenDevelopment => "TDD (Test Driven Development)",
            Self::IntegrationTests => "Integration tests",
            Self::SyntheticTestData => "Synthetic test data (Faker)",
            Self::Scalability => "Scalability",
        }
    }
}

impl fmt::Display for ArchitecturePrinciple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Four-level severity scale shared by violations and actions.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    /// Must be fixed first.
    Critical,
    /// Important.
    High,
    /// Worth scheduling.
    Medium,
    /// Nice to have.
    Low,
}

/// Action priority, on the same scale as [`Severity`].
pub type Priority = Severity;

impl Severity {
    /// Sort rank, `Critical` first.
    pub fn rank(self) -> u8 {
        match self {
            Self::Critical => 0,
            Self::High => 1,
            Self::Medium => 2,
            Self::Low => 3,
        }
    }

    /// Upper-case label.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Critical => "CRITICAL",
            Self::High => "HIGH",
            Self::Medium => "MEDIUM",
            Self::Low => "LOW",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed architecture principle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PrincipleViolation {
    /// Violated principle.
    pub principle: ArchitecturePrinciple,
    /// Fixed per-principle severity.
    pub severity: Severity,
    /// What was found.
    pub description: String,
    /// File the evidence came from, if any.
    pub file_path: Option<String>,
    /// Line of the evidence, if any.
    pub line_number: Option<usize>,
    /// Offending snippet, if any.
    pub code_snippet: Option<String>,
    /// How to fix it.
    pub recommendation: String,
}

/// Five-level architecture status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum ArchitectureStatus {
    /// Score below 20.
    Critical,
    /// Score below 40.
    Poor,
    /// Score below 60.
    Fair,
    /// Score below 80.
    Good,
    /// Score of 80 or more.
    Excellent,
}

impl ArchitectureStatus {
    /// Band a 0-100 score at 20-point intervals.
    pub fn from_score(score: f64) -> Self {
        if score >= 80.0 {
            Self::Excellent
        } else if score >= 60.0 {
            Self::Good
        } else if score >= 40.0 {
            Self::Fair
        } else if score >= 20.0 {
            Self::Poor
        } else {
            Self::Critical
        }
    }

    /// Upper-case label.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Critical => "CRITICAL",
            Self::Poor => "POOR",
            Self::Fair => "FAIR",
            Self::Good => "GOOD",
            Self::Excellent => "EXCELLENT",
        }
    }
}

impl fmt::Display for ArchitectureStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of the heuristic architecture analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ArchitectureAnalysis {
    /// No duplicated definition names.
    pub dry_compliance: bool,
    /// Test-driven layout detected.
    pub tdd_implementation: bool,
    /// Integration tests detected.
    pub integration_tests: bool,
    /// Synthetic data library imported and used.
    pub synthetic_data_usage: bool,
    /// At least two scalability signals found.
    pub scalability_features: bool,
    /// One violation per failed principle.
    pub violations: Vec<PrincipleViolation>,
    /// Critical violation count.
    pub critical_violations: usize,
    /// High violation count.
    pub high_violations: usize,
    /// Medium violation count.
    pub medium_violations: usize,
    /// Low violation count.
    pub low_violations: usize,
    /// Total violation count.
    pub total_violations: usize,
    /// Score in 0..=100.
    pub architecture_score: f64,
    /// Status band of the score.
    pub architecture_status: ArchitectureStatus,
}

impl ArchitectureAnalysis {
    /// Whether the given principle passed.
    pub fn is_compliant(&self, principle: ArchitecturePrinciple) -> bool {
        match principle {
            ArchitecturePrinciple::DuplicationAvoidance => self.dry_compliance,
            ArchitecturePrinciple::TestDrivenDevelopment => self.tdd_implementation,
            ArchitecturePrinciple::IntegrationTests => self.integration_tests,
            ArchitecturePrinciple::SyntheticTestData => self.synthetic_data_usage,
            ArchitecturePrinciple::Scalability => self.scalability_features,
        }
    }
}

/// A prioritized remediation task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TodoAction {
    /// Priority from the fixed lookup.
    pub priority: Priority,
    /// Principle the action restores.
    pub principle: ArchitecturePrinciple,
    /// Short title.
    pub action: String,
    /// What to do.
    pub description: String,
    /// Effort estimate.
    pub estimated_effort: String,
    /// Libraries or tools the work depends on.
    pub dependencies: Vec<String>,
    /// Files likely to change.
    pub files_to_modify: Vec<String>,
}
