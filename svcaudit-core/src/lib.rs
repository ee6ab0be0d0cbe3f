#![deny(missing_docs)]
//! svcaudit core library.
//!
//! This crate contains the template model and the inspection engine that
//! scores microservice layouts, judges architecture principles heuristically,
//! plans remediation and guards against disallowed files.

/// Heuristic architecture principle analysis.
pub mod architecture;
pub mod domain;
pub mod error;
pub mod fs;
pub mod guard;
pub mod inspector;
pub mod loader;
pub mod planner;
pub mod policy;
pub mod quality;
pub mod report;
pub mod scoring;
pub mod structure;
pub mod template;
pub mod watcher;

pub use architecture::{ArchitectureAnalyzer, analyze_architecture};
pub use domain::{
    ArchitectureAnalysis, ArchitecturePrinciple, ArchitectureStatus, ConfigQuality,
    MicroserviceStructureReport, PrincipleViolation, Priority, RepositoryStructureAudit,
    Severity, StructureChecks, StructureStatus, TodoAction,
};
pub use error::{AuditError, Result};
pub use fs::{FileSystem, StdFileSystem};
pub use guard::{
    AlternativeSuggestion, FilePreventor, GuardDecision, GuardRule, MakefileAudit,
    PreventionSummary, PreventionViolation, RestrictedKind,
};
pub use inspector::{StructureInspector, inspect_microservice_structure, inspect_repository_structure};
pub use loader::{
    DEFAULT_TEMPLATE_PATH, LoadError, TemplateInfo, TemplateLoader, load_template_config,
    parse_template_config,
};
pub use planner::plan_remediation;
pub use policy::FileCreationPolicy;
pub use report::{TodoReport, generate_todo_report, render_json, render_todo_markdown, write_todo_report};
pub use template::{PatternPolarity, StructureTemplate, TemplateConfig};
pub use watcher::{RulesSnapshot, RulesWatcher, WatcherStatus, find_rules_file};
