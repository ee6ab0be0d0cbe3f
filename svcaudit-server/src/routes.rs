//! HTTP handlers for svcaudit server.

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, Responder, get, post, web};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use utoipa::{OpenApi, ToSchema};

use svcaudit_core::{
    AuditError, FilePreventor, RestrictedKind, RulesSnapshot, RulesWatcher, StdFileSystem,
    StructureInspector, TemplateConfig, TemplateInfo, TemplateLoader, TodoReport, WatcherStatus,
    analyze_architecture, generate_todo_report, load_template_config, plan_remediation,
    write_todo_report,
};

use crate::openapi::ApiDoc;

/// Shared application state for handlers.
#[derive(Clone)]
pub struct AppState {
    /// Repository root used when a request names no base path.
    pub base_path: PathBuf,
    /// Structure template file; the default location when unset.
    pub template_path: Option<PathBuf>,
    /// Cached rules file.
    pub rules: Arc<Mutex<RulesWatcher>>,
}

impl AppState {
    /// Build state for a repository root.
    pub fn new(base_path: PathBuf, template_path: Option<PathBuf>, rules_watcher: RulesWatcher) -> Self {
        Self {
            base_path,
            template_path,
            rules: Arc::new(Mutex::new(rules_watcher)),
        }
    }

    fn base(&self, requested: Option<&str>) -> PathBuf {
        requested
            .map(PathBuf::from)
            .unwrap_or_else(|| self.base_path.clone())
    }

    fn config(&self) -> TemplateConfig {
        TemplateLoader::new(self.template_path.clone()).config().clone()
    }
}

/// Envelope shared by every endpoint.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ToolResponse {
    /// Whether the call succeeded.
    pub success: bool,
    /// Result payload on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub data: Option<serde_json::Value>,
    /// Error message on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolResponse {
    fn ok(data: serde_json::Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Request naming one service.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ServiceRequest {
    /// Service directory, relative to the base path or absolute.
    pub service: String,
    /// Repository root override.
    #[serde(default)]
    pub base_path: Option<String>,
}

/// Request for a repository-wide structure audit.
#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct RepositoryRequest {
    /// Services to audit; auto-detected when absent.
    #[serde(default)]
    pub services: Option<Vec<String>>,
    /// Repository root override.
    #[serde(default)]
    pub base_path: Option<String>,
}

/// Request to check a prospective file.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct FileCheckRequest {
    /// File that would be created.
    pub file_path: String,
    /// Service directory; the file's parent when absent.
    #[serde(default)]
    pub service_path: Option<String>,
}

/// Request to validate existing files of a service.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ValidateRequest {
    /// Service directory.
    pub service_path: String,
}

/// Request for a Makefile audit.
#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct MakefileAuditRequest {
    /// Repository root override.
    #[serde(default)]
    pub base_path: Option<String>,
}

/// Written TODO report.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TodoResponse {
    /// Location of the Markdown file.
    pub report_path: String,
    /// Combined structure and architecture score.
    pub overall_score: f64,
    /// Report contents.
    pub report: TodoReport,
}

/// Active template description.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TemplateResponse {
    /// Template file location.
    pub template_path: String,
    /// Whether the file loaded and validated; the built-in template is used otherwise.
    pub loaded_from_file: bool,
    /// Template summary.
    pub info: TemplateInfo,
}

/// Rules file contents and watcher state.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RulesResponse {
    /// Rules snapshot.
    pub rules: RulesSnapshot,
    /// Watcher state.
    pub watcher: WatcherStatus,
}

fn respond<T: Serialize>(data: &T) -> HttpResponse {
    match serde_json::to_value(data) {
        Ok(value) => HttpResponse::Ok().json(ToolResponse::ok(value)),
        Err(err) => failure(StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
    }
}

fn failure(status: StatusCode, message: impl Into<String>) -> HttpResponse {
    HttpResponse::build(status).json(ToolResponse::err(message))
}

fn status_for(err: &AuditError) -> StatusCode {
    match err {
        AuditError::ServiceNotFound(_) | AuditError::RulesNotFound(_) => StatusCode::NOT_FOUND,
        AuditError::Other(_) => StatusCode::BAD_REQUEST,
        AuditError::Io(_) | AuditError::Template(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

async fn run_blocking<T, F>(task: F) -> HttpResponse
where
    F: FnOnce() -> Result<T, AuditError> + Send + 'static,
    T: Serialize + Send + 'static,
{
    match web::block(task).await {
        Ok(Ok(data)) => respond(&data),
        Ok(Err(err)) => failure(status_for(&err), err.to_string()),
        Err(err) => failure(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("audit task failed: {err}"),
        ),
    }
}

#[utoipa::path(
    post,
    path = "/structure/inspect",
    request_body = ServiceRequest,
    responses(
        (status = 200, description = "Structure report", body = ToolResponse),
        (status = 404, description = "Service not found", body = ToolResponse)
    ),
    tag = "structure"
)]
#[post("/api/structure/inspect")]
/// Inspect the structure of one service.
pub async fn structure_inspect(
    state: web::Data<AppState>,
    payload: web::Json<ServiceRequest>,
) -> impl Responder {
    let request = payload.into_inner();
    let base = state.base(request.base_path.as_deref());
    let config = state.config();
    run_blocking(move || {
        StructureInspector::with_config(StdFileSystem::new(), base, config)
            .inspect_service(&request.service)
    })
    .await
}

#[utoipa::path(
    post,
    path = "/structure/repository",
    request_body = RepositoryRequest,
    responses(
        (status = 200, description = "Repository audit", body = ToolResponse)
    ),
    tag = "structure"
)]
#[post("/api/structure/repository")]
/// Audit the structure of several services.
pub async fn structure_repository(
    state: web::Data<AppState>,
    payload: web::Json<RepositoryRequest>,
) -> impl Responder {
    let request = payload.into_inner();
    let base = state.base(request.base_path.as_deref());
    let config = state.config();
    run_blocking(move || {
        let inspector = StructureInspector::with_config(StdFileSystem::new(), base, config);
        Ok(inspector.inspect_repository(request.services.as_deref()))
    })
    .await
}

#[utoipa::path(
    post,
    path = "/architecture/analyze",
    request_body = ServiceRequest,
    responses(
        (status = 200, description = "Architecture analysis", body = ToolResponse),
        (status = 404, description = "Service not found", body = ToolResponse)
    ),
    tag = "architecture"
)]
#[post("/api/architecture/analyze")]
/// Analyze the architecture principles of a service.
pub async fn architecture_analyze(
    state: web::Data<AppState>,
    payload: web::Json<ServiceRequest>,
) -> impl Responder {
    let request = payload.into_inner();
    let dir = state.base(request.base_path.as_deref()).join(&request.service);
    run_blocking(move || analyze_architecture(&dir)).await
}

#[utoipa::path(
    post,
    path = "/architecture/plan",
    request_body = ServiceRequest,
    responses(
        (status = 200, description = "Ordered remediation actions", body = ToolResponse),
        (status = 404, description = "Service not found", body = ToolResponse)
    ),
    tag = "architecture"
)]
#[post("/api/architecture/plan")]
/// Plan remediation actions for a service.
pub async fn architecture_plan(
    state: web::Data<AppState>,
    payload: web::Json<ServiceRequest>,
) -> impl Responder {
    let request = payload.into_inner();
    let dir = state.base(request.base_path.as_deref()).join(&request.service);
    run_blocking(move || analyze_architecture(&dir).map(|analysis| plan_remediation(&analysis)))
        .await
}

#[utoipa::path(
    post,
    path = "/architecture/todo",
    request_body = ServiceRequest,
    responses(
        (status = 200, description = "TODO report written", body = ToolResponse),
        (status = 404, description = "Service not found", body = ToolResponse)
    ),
    tag = "architecture"
)]
#[post("/api/architecture/todo")]
/// Write the TODO report into a service.
pub async fn architecture_todo(
    state: web::Data<AppState>,
    payload: web::Json<ServiceRequest>,
) -> impl Responder {
    let request = payload.into_inner();
    let base = state.base(request.base_path.as_deref());
    let template = state.template_path.clone();
    run_blocking(move || {
        let report = generate_todo_report(&request.service, &base, template)?;
        let path = write_todo_report(&base.join(&request.service), &report)?;
        Ok(TodoResponse {
            report_path: path.display().to_string(),
            overall_score: report.overall_score(),
            report,
        })
    })
    .await
}

fn preventor(state: &AppState) -> Result<FilePreventor<StdFileSystem>, AuditError> {
    FilePreventor::from_config(&state.config())
}

#[utoipa::path(
    post,
    path = "/prevention/check",
    request_body = FileCheckRequest,
    responses(
        (status = 200, description = "Guard decision", body = ToolResponse),
        (status = 400, description = "No policy configured", body = ToolResponse)
    ),
    tag = "prevention"
)]
#[post("/api/prevention/check")]
/// Decide whether a file may be created.
pub async fn prevention_check(
    state: web::Data<AppState>,
    payload: web::Json<FileCheckRequest>,
) -> impl Responder {
    let request = payload.into_inner();
    let guard = preventor(&state);
    run_blocking(move || {
        let file = PathBuf::from(&request.file_path);
        let service = match request.service_path {
            Some(service) => PathBuf::from(service),
            None => file.parent().map(Path::to_path_buf).unwrap_or_default(),
        };
        Ok(guard?.can_create_file(&file, &service))
    })
    .await
}

#[utoipa::path(
    post,
    path = "/prevention/validate",
    request_body = ValidateRequest,
    responses(
        (status = 200, description = "Existing violations", body = ToolResponse),
        (status = 400, description = "No policy configured", body = ToolResponse)
    ),
    tag = "prevention"
)]
#[post("/api/prevention/validate")]
/// List existing files of a service that the policy rejects.
pub async fn prevention_validate(
    state: web::Data<AppState>,
    payload: web::Json<ValidateRequest>,
) -> impl Responder {
    let request = payload.into_inner();
    let guard = preventor(&state);
    run_blocking(move || Ok(guard?.validate_service_structure(Path::new(&request.service_path))))
        .await
}

#[utoipa::path(
    post,
    path = "/prevention/makefiles",
    request_body = MakefileAuditRequest,
    responses(
        (status = 200, description = "Makefile audit", body = ToolResponse),
        (status = 400, description = "No policy configured", body = ToolResponse)
    ),
    tag = "prevention"
)]
#[post("/api/prevention/makefiles")]
/// Audit the services of a repository for Makefiles.
pub async fn prevention_makefiles(
    state: web::Data<AppState>,
    payload: web::Json<MakefileAuditRequest>,
) -> impl Responder {
    let base = state.base(payload.base_path.as_deref());
    let guard = preventor(&state);
    run_blocking(move || guard?.audit_makefiles(&base)).await
}

#[utoipa::path(
    get,
    path = "/prevention/status",
    responses(
        (status = 200, description = "Policy summary", body = ToolResponse),
        (status = 400, description = "No policy configured", body = ToolResponse)
    ),
    tag = "prevention"
)]
#[get("/api/prevention/status")]
/// Summarize the active file-creation policy.
pub async fn prevention_status(state: web::Data<AppState>) -> impl Responder {
    match preventor(&state) {
        Ok(guard) => respond(&guard.summary()),
        Err(err) => failure(status_for(&err), err.to_string()),
    }
}

#[utoipa::path(
    get,
    path = "/prevention/alternatives/{kind}",
    params(
        ("kind" = String, Path, description = "makefile or shell_script")
    ),
    responses(
        (status = 200, description = "Suggested alternatives", body = ToolResponse),
        (status = 400, description = "Unknown file kind", body = ToolResponse)
    ),
    tag = "prevention"
)]
#[get("/api/prevention/alternatives/{kind}")]
/// Suggest alternatives for a restricted file kind.
pub async fn prevention_alternatives(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> impl Responder {
    let suggestion = path
        .into_inner()
        .parse::<RestrictedKind>()
        .and_then(|kind| Ok(preventor(&state)?.suggest_alternatives(kind)));
    match suggestion {
        Ok(suggestion) => respond(&suggestion),
        Err(err) => failure(status_for(&err), err.to_string()),
    }
}

#[utoipa::path(
    get,
    path = "/template/info",
    responses(
        (status = 200, description = "Active template", body = ToolResponse)
    ),
    tag = "template"
)]
#[get("/api/template/info")]
/// Describe the active structure template.
pub async fn template_info(state: web::Data<AppState>) -> impl Responder {
    let mut loader = TemplateLoader::new(state.template_path.clone());
    let info = loader.info();
    respond(&TemplateResponse {
        template_path: loader.path().display().to_string(),
        loaded_from_file: load_template_config(loader.path()).is_ok(),
        info,
    })
}

#[utoipa::path(
    get,
    path = "/rules",
    responses(
        (status = 200, description = "Rules file contents", body = ToolResponse),
        (status = 404, description = "Rules file not found", body = ToolResponse)
    ),
    tag = "rules"
)]
#[get("/api/rules")]
/// Serve the cached rules file.
pub async fn rules(state: web::Data<AppState>) -> impl Responder {
    let rules = state.rules.clone();
    run_blocking(move || {
        let mut watcher = rules
            .lock()
            .map_err(|_| AuditError::Other("rules watcher lock poisoned".to_string()))?;
        let snapshot = watcher.cached()?;
        Ok(RulesResponse {
            rules: snapshot,
            watcher: watcher.status(),
        })
    })
    .await
}

#[utoipa::path(
    get,
    path = "/openapi.json",
    responses(
        (status = 200, description = "OpenAPI document", body = serde_json::Value)
    ),
    tag = "system"
)]
#[get("/api/openapi.json")]
/// Serve the OpenAPI document.
pub async fn openapi_json() -> impl Responder {
    HttpResponse::Ok().json(ApiDoc::openapi())
}

/// Register every handler on a service config.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(structure_inspect)
        .service(structure_repository)
        .service(architecture_analyze)
        .service(architecture_plan)
        .service(architecture_todo)
        .service(prevention_check)
        .service(prevention_validate)
        .service(prevention_makefiles)
        .service(prevention_status)
        .service(prevention_alternatives)
        .service(template_info)
        .service(rules)
        .service(openapi_json);
}
