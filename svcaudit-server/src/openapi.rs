//! OpenAPI specification for svcaudit server.

use utoipa::OpenApi;

use svcaudit_core::guard::ServiceMakefileAudit;
use svcaudit_core::{
    AlternativeSuggestion, ArchitectureAnalysis, ArchitecturePrinciple, ArchitectureStatus,
    ConfigQuality, GuardDecision, GuardRule, MakefileAudit, MicroserviceStructureReport,
    PreventionSummary, PreventionViolation, PrincipleViolation, RepositoryStructureAudit,
    RestrictedKind, RulesSnapshot, Severity, StructureChecks, StructureStatus, TemplateInfo,
    TodoAction, TodoReport, WatcherStatus,
};

use crate::routes::{
    FileCheckRequest, MakefileAuditRequest, RepositoryRequest, RulesResponse, ServiceRequest,
    TemplateResponse, TodoResponse, ToolResponse, ValidateRequest,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::structure_inspect,
        crate::routes::structure_repository,
        crate::routes::architecture_analyze,
        crate::routes::architecture_plan,
        crate::routes::architecture_todo,
        crate::routes::prevention_check,
        crate::routes::prevention_validate,
        crate::routes::prevention_makefiles,
        crate::routes::prevention_status,
        crate::routes::prevention_alternatives,
        crate::routes::template_info,
        crate::routes::rules,
        crate::routes::openapi_json
    ),
    components(
        schemas(
            ToolResponse,
            ServiceRequest,
            RepositoryRequest,
            FileCheckRequest,
            ValidateRequest,
            MakefileAuditRequest,
            TodoResponse,
            TemplateResponse,
            RulesResponse,
            StructureChecks,
            ConfigQuality,
            StructureStatus,
            MicroserviceStructureReport,
            RepositoryStructureAudit,
            ArchitecturePrinciple,
            Severity,
            PrincipleViolation,
            ArchitectureStatus,
            ArchitectureAnalysis,
            TodoAction,
            TodoReport,
            GuardRule,
            GuardDecision,
            PreventionViolation,
            PreventionSummary,
            ServiceMakefileAudit,
            MakefileAudit,
            RestrictedKind,
            AlternativeSuggestion,
            TemplateInfo,
            RulesSnapshot,
            WatcherStatus
        )
    ),
    tags(
        (name = "structure", description = "Service structure inspection"),
        (name = "architecture", description = "Architecture principles and remediation"),
        (name = "prevention", description = "File-creation policy"),
        (name = "template", description = "Structure template"),
        (name = "rules", description = "Rules file"),
        (name = "system", description = "System endpoints")
    )
)]
/// OpenAPI specification for the svcaudit server.
pub struct ApiDoc;
