//! TODO report rendering and persistence for svcaudit outputs.

use std::fmt::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::architecture::analyze_architecture;
use crate::domain::{
    ArchitectureAnalysis, ArchitecturePrinciple, ArchitectureStatus, MicroserviceStructureReport,
    PrincipleViolation, Severity, StructureChecks, TodoAction,
};
use crate::error::Result;
use crate::fs::StdFileSystem;
use crate::inspector::StructureInspector;
use crate::planner::plan_remediation;

/// Directory, inside the service, that receives TODO reports.
pub const TODO_DIR: &str = "TODO";

/// Combined structure and architecture findings for one service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TodoReport {
    /// Structure inspection result.
    pub structure: MicroserviceStructureReport,
    /// Architecture analysis result.
    pub architecture: ArchitectureAnalysis,
    /// Remediation plan derived from the architecture violations.
    pub actions: Vec<TodoAction>,
}

impl TodoReport {
    /// Combine both results and plan the remediation actions.
    pub fn new(structure: MicroserviceStructureReport, architecture: ArchitectureAnalysis) -> Self {
        let actions = plan_remediation(&architecture);
        Self {
            structure,
            architecture,
            actions,
        }
    }

    /// Mean of the structure and architecture scores.
    pub fn overall_score(&self) -> f64 {
        (self.structure.score + self.architecture.architecture_score) / 2.0
    }

    /// Five-band status of the overall score.
    pub fn overall_status(&self) -> ArchitectureStatus {
        ArchitectureStatus::from_score(self.overall_score())
    }
}

/// Inspect and analyze a service on the real filesystem.
pub fn generate_todo_report(
    service: &str,
    base_path: &Path,
    template_path: Option<PathBuf>,
) -> Result<TodoReport> {
    let inspector = StructureInspector::new(StdFileSystem::new(), base_path, template_path);
    let structure = inspector.inspect_service(service)?;
    let architecture = analyze_architecture(&base_path.join(service))?;
    Ok(TodoReport::new(structure, architecture))
}

/// Name used for the report file of the service at `service_dir`.
pub fn service_name(service_dir: &Path) -> String {
    let resolved = service_dir
        .canonicalize()
        .unwrap_or_else(|_| service_dir.to_path_buf());
    resolved
        .file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .unwrap_or_else(|| "service".to_string())
}

/// Write the rendered report to `<service_dir>/TODO/todo_<service>.md`.
///
/// The directory is created when missing and an existing report is replaced.
pub fn write_todo_report(service_dir: &Path, report: &TodoReport) -> Result<PathBuf> {
    let todo_dir = service_dir.join(TODO_DIR);
    std::fs::create_dir_all(&todo_dir)?;
    let path = todo_dir.join(format!("todo_{}.md", service_name(service_dir)));
    std::fs::write(&path, render_todo_markdown(report, Utc::now()))?;
    log::info!("wrote TODO report to {}", path.display());
    Ok(path)
}

/// Render a TODO report as Markdown.
pub fn render_todo_markdown(report: &TodoReport, generated_at: DateTime<Utc>) -> String {
    let mut output = String::new();
    let structure = &report.structure;
    let _ = writeln!(output, "# TODO: {}\n", structure.service);
    let _ = writeln!(output, "- Path: `{}`", structure.path);
    let _ = writeln!(
        output,
        "- Generated: {}\n",
        generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    );

    append_summary(&mut output, report);
    append_structure(&mut output, structure);
    append_principles(&mut output, &report.architecture);
    append_violations(&mut output, &report.architecture.violations);
    append_action_plan(&mut output, &report.actions);
    append_user_stories(&mut output, &report.actions);
    output
}

/// Render any serializable report payload as JSON.
pub fn render_json<T: Serialize + ?Sized>(payload: &T) -> std::result::Result<String, serde_json::Error> {
    serde_json::to_string_pretty(payload)
}

fn append_summary(output: &mut String, report: &TodoReport) {
    let architecture = &report.architecture;
    let _ = writeln!(output, "## Executive Summary\n");
    let _ = writeln!(
        output,
        "- Overall score: {:.1}/100 ({})",
        report.overall_score(),
        report.overall_status()
    );
    let _ = writeln!(
        output,
        "- Structure score: {:.1} ({})",
        report.structure.score, report.structure.status
    );
    let _ = writeln!(
        output,
        "- Architecture score: {:.1}/100 ({})",
        architecture.architecture_score, architecture.architecture_status
    );
    let _ = writeln!(
        output,
        "- Violations: {} (critical {}, high {}, medium {}, low {})",
        architecture.total_violations,
        architecture.critical_violations,
        architecture.high_violations,
        architecture.medium_violations,
        architecture.low_violations
    );
    let _ = writeln!(output, "- Pending actions: {}\n", report.actions.len());
}

fn append_structure(output: &mut String, structure: &MicroserviceStructureReport) {
    let _ = writeln!(output, "## Structure Inspection\n");
    let _ = writeln!(output, "### Checks");
    for (label, present) in check_rows(&structure.structure_checks) {
        let mark = if present { "x" } else { " " };
        let _ = writeln!(output, "- [{mark}] {label}");
    }
    let _ = writeln!(output);

    let quality = &structure.config_quality;
    let warnings: Vec<String> = [
        ("Dockerfile", &quality.dockerfile_warnings),
        ("docker-compose.yml", &quality.compose_warnings),
        (".gitignore", &quality.gitignore_warnings),
        ("tests", &quality.tests_warnings),
    ]
    .into_iter()
    .flat_map(|(file, items)| items.iter().map(move |item| format!("{file}: {item}")))
    .collect();
    append_list(
        output,
        "Configuration warnings",
        &warnings,
        "No configuration warnings.",
    );
    append_list(
        output,
        "Recommendations",
        &structure.recommendations,
        "No structure recommendations.",
    );
}

fn check_rows(checks: &StructureChecks) -> Vec<(String, bool)> {
    let mut rows = vec![
        ("Dockerfile".to_string(), checks.dockerfile),
        ("docker-compose.yml".to_string(), checks.docker_compose),
        (".gitignore".to_string(), checks.gitignore),
        ("tests/ directory".to_string(), checks.tests_dir_exists),
        ("tests/ has test files".to_string(), checks.tests_dir_has_files),
    ];
    rows.extend(
        checks
            .additional
            .iter()
            .map(|(name, present)| (name.clone(), *present)),
    );
    rows
}

fn append_principles(output: &mut String, analysis: &ArchitectureAnalysis) {
    let _ = writeln!(output, "## Architecture Principles\n");
    let (compliant, missing): (Vec<ArchitecturePrinciple>, Vec<ArchitecturePrinciple>) =
        ArchitecturePrinciple::ALL
            .into_iter()
            .partition(|principle| analysis.is_compliant(*principle));
    let labels = |principles: Vec<ArchitecturePrinciple>| -> Vec<String> {
        principles.into_iter().map(|p| p.label().to_string()).collect()
    };
    append_list(output, "Compliant", &labels(compliant), "None.");
    append_list(output, "Non-compliant", &labels(missing), "None.");
}

fn append_violations(output: &mut String, violations: &[PrincipleViolation]) {
    let _ = writeln!(output, "## Violation Details\n");
    if violations.is_empty() {
        let _ = writeln!(output, "No violations found.\n");
        return;
    }
    for (index, violation) in violations.iter().enumerate() {
        let _ = writeln!(
            output,
            "### {}. [{}] {}",
            index + 1,
            violation.severity,
            violation.principle
        );
        let _ = writeln!(output, "- Description: {}", violation.description);
        if let Some(path) = &violation.file_path {
            match violation.line_number {
                Some(line) => {
                    let _ = writeln!(output, "- Location: `{path}:{line}`");
                }
                None => {
                    let _ = writeln!(output, "- Location: `{path}`");
                }
            }
        }
        if let Some(snippet) = &violation.code_snippet {
            let _ = writeln!(output, "- Snippet:\n\n```python\n{snippet}\n```");
        }
        let _ = writeln!(output, "- Recommendation: {}\n", violation.recommendation);
    }
}

fn append_action_plan(output: &mut String, actions: &[TodoAction]) {
    let _ = writeln!(output, "## TODO Action Plan\n");
    if actions.is_empty() {
        let _ = writeln!(output, "No actions required.\n");
        return;
    }
    for priority in [
        Severity::Critical,
        Severity::High,
        Severity::Medium,
        Severity::Low,
    ] {
        let group: Vec<&TodoAction> = actions
            .iter()
            .filter(|action| action.priority == priority)
            .collect();
        if group.is_empty() {
            continue;
        }
        let _ = writeln!(output, "### {priority} priority");
        for action in group {
            let _ = writeln!(
                output,
                "- [ ] **{}** (effort: {})",
                action.action, action.estimated_effort
            );
            let _ = writeln!(output, "  - {}", action.description);
            if !action.dependencies.is_empty() {
                let _ = writeln!(output, "  - Dependencies: {}", action.dependencies.join(", "));
            }
            if !action.files_to_modify.is_empty() {
                let files: Vec<String> = action
                    .files_to_modify
                    .iter()
                    .map(|file| format!("`{file}`"))
                    .collect();
                let _ = writeln!(output, "  - Files: {}", files.join(", "));
            }
        }
        let _ = writeln!(output);
    }
}

fn append_user_stories(output: &mut String, actions: &[TodoAction]) {
    let _ = writeln!(output, "## User Stories for Developers\n");
    if actions.is_empty() {
        let _ = writeln!(output, "The service satisfies every principle; no stories pending.");
        return;
    }
    for (index, action) in actions.iter().enumerate() {
        let _ = writeln!(output, "### Story {}: {}", index + 1, action.action);
        let _ = writeln!(
            output,
            "As a developer, I want to {} so that the service complies with {}.\n",
            lowercase_first(&action.action),
            action.principle
        );
        let _ = writeln!(output, "Acceptance criteria:");
        let _ = writeln!(output, "- {}", action.description);
        let _ = writeln!(output, "- A new svcaudit run reports the principle as compliant");
        let _ = writeln!(output);
    }
}

fn append_list(output: &mut String, title: &str, items: &[String], empty_message: &str) {
    if items.is_empty() {
        let _ = writeln!(output, "### {title}\n{empty_message}\n");
        return;
    }
    let _ = writeln!(output, "### {title}");
    for item in items {
        let _ = writeln!(output, "- {item}");
    }
    let _ = writeln!(output);
}

fn lowercase_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}
