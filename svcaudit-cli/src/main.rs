#![deny(missing_docs)]
//! svcaudit command-line interface.
//!
//! Inspects microservice layouts, analyzes architecture principles, writes
//! TODO reports and checks files against the file-creation policy.

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::fmt::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use svcaudit_core::guard::ServiceMakefileAudit;
use svcaudit_core::{
    AlternativeSuggestion, ArchitectureAnalysis, ArchitecturePrinciple, FilePreventor,
    GuardDecision, MakefileAudit, MicroserviceStructureReport, PreventionSummary,
    PreventionViolation, RepositoryStructureAudit, RestrictedKind, StdFileSystem,
    StructureInspector, TemplateConfig, TemplateInfo, TemplateLoader, TodoAction, TodoReport,
    analyze_architecture, find_rules_file, plan_remediation, render_json, render_todo_markdown,
    write_todo_report,
};
use svcaudit_core::watcher::{DEFAULT_RULES_FILE, load_rules};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

pub(crate) type CliResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

#[derive(Parser)]
#[command(name = "svcaudit", version, about = "Microservice structure and architecture auditor")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone)]
struct BaseArgs {
    /// Repository root services are resolved against.
    #[arg(long = "base-path", env = "SVCAUDIT_BASE_PATH", default_value = ".")]
    base_path: PathBuf,
}

#[derive(Args, Clone)]
struct TemplateArgs {
    /// Structure template YAML file.
    #[arg(long, env = "SVCAUDIT_TEMPLATE")]
    template: Option<PathBuf>,
}

#[derive(Args, Clone)]
struct OutputArgs {
    /// Output format for report data.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
    /// Write the report to a file instead of stdout.
    #[arg(long = "report-output")]
    report_output: Option<PathBuf>,
}

#[derive(ValueEnum, Copy, Clone, Debug, Eq, PartialEq)]
enum OutputFormat {
    Text,
    Json,
    Markdown,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect the structure of one service.
    Inspect {
        /// Service directory, relative to the base path or absolute.
        service: String,
        #[command(flatten)]
        base: BaseArgs,
        #[command(flatten)]
        template: TemplateArgs,
        #[command(flatten)]
        report: OutputArgs,
    },
    /// Audit the structure of several services, auto-detected when none are given.
    Repo {
        /// Services to audit (repeatable or comma-separated).
        #[arg(long = "service", value_delimiter = ',')]
        services: Vec<String>,
        #[command(flatten)]
        base: BaseArgs,
        #[command(flatten)]
        template: TemplateArgs,
        #[command(flatten)]
        report: OutputArgs,
    },
    /// Analyze architecture principles of a service.
    Architecture {
        /// Service directory, relative to the base path or absolute.
        service: String,
        #[command(flatten)]
        base: BaseArgs,
        #[command(flatten)]
        report: OutputArgs,
    },
    /// Plan remediation actions for a service.
    Plan {
        /// Service directory, relative to the base path or absolute.
        service: String,
        #[command(flatten)]
        base: BaseArgs,
        #[command(flatten)]
        report: OutputArgs,
    },
    /// Write TODO/todo_<service>.md into a service.
    Todo {
        /// Service directory, relative to the base path or absolute.
        service: String,
        #[command(flatten)]
        base: BaseArgs,
        #[command(flatten)]
        template: TemplateArgs,
        #[command(flatten)]
        report: OutputArgs,
    },
    /// Inspect and analyze many services concurrently.
    Batch {
        /// Services to evaluate; auto-detected when empty.
        services: Vec<String>,
        #[command(flatten)]
        base: BaseArgs,
        #[command(flatten)]
        template: TemplateArgs,
        /// Maximum number of services evaluated at once.
        #[arg(short = 'j', long, default_value_t = 4)]
        concurrency: usize,
        #[command(flatten)]
        report: OutputArgs,
    },
    /// Check files against the file-creation policy.
    Guard {
        #[command(subcommand)]
        command: GuardCommand,
        #[command(flatten)]
        template: TemplateArgs,
    },
    /// Describe the active structure template.
    Template {
        #[command(flatten)]
        template: TemplateArgs,
        #[command(flatten)]
        report: OutputArgs,
    },
    /// Print the rules file found in the current directory or its ancestors.
    Rules {
        /// Rules file name.
        #[arg(long, env = "SVCAUDIT_RULES_FILE", default_value = DEFAULT_RULES_FILE)]
        name: String,
        /// Directory the search starts from.
        #[arg(long, default_value = ".")]
        start: PathBuf,
    },
}

#[derive(Subcommand)]
enum GuardCommand {
    /// Decide whether a file may be created.
    Check {
        /// File to check.
        file: PathBuf,
        /// Service directory the file belongs to.
        #[arg(long, default_value = ".")]
        service: PathBuf,
        #[command(flatten)]
        report: OutputArgs,
    },
    /// List existing files the policy rejects.
    Validate {
        /// Service directory.
        service: PathBuf,
        #[command(flatten)]
        report: OutputArgs,
    },
    /// Audit the services under the base path for Makefiles.
    Makefiles {
        #[command(flatten)]
        base: BaseArgs,
        #[command(flatten)]
        report: OutputArgs,
    },
    /// Summarize the active policy.
    Status {
        #[command(flatten)]
        report: OutputArgs,
    },
    /// Suggest alternatives for a restricted file kind (makefile or shell_script).
    Alternatives {
        /// File kind.
        kind: String,
        #[command(flatten)]
        report: OutputArgs,
    },
}

#[cfg(not(test))]
#[tokio::main]
async fn main() -> CliResult<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Inspect {
            service,
            base,
            template,
            report,
        } => run_inspect(service, base.base_path, template.template, report).await?,
        Commands::Repo {
            services,
            base,
            template,
            report,
        } => run_repo(services, base.base_path, template.template, report).await?,
        Commands::Architecture {
            service,
            base,
            report,
        } => run_architecture(service, base.base_path, report).await?,
        Commands::Plan {
            service,
            base,
            report,
        } => run_plan(service, base.base_path, report).await?,
        Commands::Todo {
            service,
            base,
            template,
            report,
        } => run_todo(service, base.base_path, template.template, report).await?,
        Commands::Batch {
            services,
            base,
            template,
            concurrency,
            report,
        } => {
            run_batch(
                services,
                base.base_path,
                template.template,
                concurrency,
                report,
            )
            .await?
        }
        Commands::Guard { command, template } => run_guard(command, template.template).await?,
        Commands::Template { template, report } => run_template(template.template, report).await?,
        Commands::Rules { name, start } => run_rules(&start, &name).await?,
    }

    Ok(())
}

#[cfg(test)]
fn main() {}

fn load_config(template: Option<PathBuf>) -> TemplateConfig {
    TemplateLoader::new(template).config().clone()
}

async fn run_inspect(
    service: String,
    base: PathBuf,
    template: Option<PathBuf>,
    report: OutputArgs,
) -> CliResult<()> {
    let structure = tokio::task::spawn_blocking(move || {
        StructureInspector::new(StdFileSystem::new(), base, template).inspect_service(&service)
    })
    .await??;
    let text = render_structure_text(&structure);
    emit(&report, "structure inspection", &structure, text).await
}

async fn run_repo(
    services: Vec<String>,
    base: PathBuf,
    template: Option<PathBuf>,
    report: OutputArgs,
) -> CliResult<()> {
    let audit = tokio::task::spawn_blocking(move || {
        let inspector = StructureInspector::new(StdFileSystem::new(), base, template);
        let services = (!services.is_empty()).then_some(services);
        inspector.inspect_repository(services.as_deref())
    })
    .await?;
    let text = render_repo_text(&audit);
    emit(&report, "repository audit", &audit, text).await
}

async fn run_architecture(service: String, base: PathBuf, report: OutputArgs) -> CliResult<()> {
    let analysis =
        tokio::task::spawn_blocking(move || analyze_architecture(&base.join(service))).await??;
    let text = render_architecture_text(&analysis);
    emit(&report, "architecture analysis", &analysis, text).await
}

async fn run_plan(service: String, base: PathBuf, report: OutputArgs) -> CliResult<()> {
    let analysis =
        tokio::task::spawn_blocking(move || analyze_architecture(&base.join(service))).await??;
    let actions = plan_remediation(&analysis);
    let text = render_plan_text(&actions);
    emit(&report, "remediation plan", &actions, text).await
}

async fn run_todo(
    service: String,
    base: PathBuf,
    template: Option<PathBuf>,
    report: OutputArgs,
) -> CliResult<()> {
    let (todo, path) = tokio::task::spawn_blocking(move || -> CliResult<(TodoReport, PathBuf)> {
        let todo = svcaudit_core::generate_todo_report(&service, &base, template)?;
        let path = write_todo_report(&base.join(&service), &todo)?;
        Ok((todo, path))
    })
    .await??;

    let contents = match report.format {
        OutputFormat::Text => format!("TODO report written to {}\n", path.display()),
        OutputFormat::Markdown => render_todo_markdown(&todo, chrono::Utc::now()),
        OutputFormat::Json => render_json(&todo)?,
    };
    emit_output(&report, contents).await
}

/// Per-service outcome of a batch run.
#[derive(Debug, Serialize)]
struct BatchEntry {
    service: String,
    structure: Option<MicroserviceStructureReport>,
    architecture: Option<ArchitectureAnalysis>,
    errors: Vec<String>,
}

impl BatchEntry {
    fn failed(service: String, error: impl Into<String>) -> Self {
        Self {
            service,
            structure: None,
            architecture: None,
            errors: vec![error.into()],
        }
    }
}

async fn run_batch(
    services: Vec<String>,
    base: PathBuf,
    template: Option<PathBuf>,
    concurrency: usize,
    report: OutputArgs,
) -> CliResult<()> {
    let config = Arc::new(load_config(template));
    let services = if services.is_empty() {
        StructureInspector::with_config(StdFileSystem::new(), &base, (*config).clone())
            .detect_services()
    } else {
        services
    };
    if services.is_empty() {
        println!("No services found to evaluate.");
        return Ok(());
    }

    let entries = evaluate_services(services, Arc::new(base), config, concurrency).await?;
    let text = render_batch_text(&entries);
    emit(&report, "batch report", &entries, text).await
}

async fn evaluate_services(
    services: Vec<String>,
    base: Arc<PathBuf>,
    config: Arc<TemplateConfig>,
    concurrency: usize,
) -> CliResult<Vec<BatchEntry>> {
    let concurrency = if concurrency == 0 { 1 } else { concurrency };
    let semaphore = Arc::new(Semaphore::new(concurrency));
    let mut tasks = JoinSet::new();

    for service in services {
        let permit = semaphore.clone().acquire_owned().await?;
        let base = base.clone();
        let config = config.clone();
        tasks.spawn(async move {
            let _permit = permit;
            let name = service.clone();
            match tokio::task::spawn_blocking(move || evaluate_service(&base, &service, &config))
                .await
            {
                Ok(entry) => entry,
                Err(err) => {
                    log::warn!("evaluation of {name} failed: {err}");
                    BatchEntry::failed(name, err.to_string())
                }
            }
        });
    }

    let mut entries = Vec::new();
    while let Some(result) = tasks.join_next().await {
        match result {
            Ok(entry) => entries.push(entry),
            Err(err) => entries.push(BatchEntry::failed("unknown".to_string(), err.to_string())),
        }
    }
    entries.sort_by(|a, b| a.service.cmp(&b.service));
    Ok(entries)
}

fn evaluate_service(base: &Path, service: &str, config: &TemplateConfig) -> BatchEntry {
    let inspector = StructureInspector::with_config(StdFileSystem::new(), base, config.clone());
    let mut entry = BatchEntry {
        service: service.to_string(),
        structure: None,
        architecture: None,
        errors: Vec::new(),
    };
    match inspector.inspect_service(service) {
        Ok(report) => entry.structure = Some(report),
        Err(err) => entry.errors.push(err.to_string()),
    }
    match analyze_architecture(&base.join(service)) {
        Ok(analysis) => entry.architecture = Some(analysis),
        Err(err) => entry.errors.push(err.to_string()),
    }
    entry
}

async fn run_guard(command: GuardCommand, template: Option<PathBuf>) -> CliResult<()> {
    let guard = FilePreventor::from_config(&load_config(template))?;
    match command {
        GuardCommand::Check {
            file,
            service,
            report,
        } => {
            let decision = guard.can_create_file(&file, &service);
            let text = render_decision_text(&file, &decision);
            emit(&report, "file check", &decision, text).await
        }
        GuardCommand::Validate { service, report } => {
            let violations = guard.validate_service_structure(&service);
            let text = render_prevention_text(&violations);
            emit(&report, "policy validation", &violations, text).await
        }
        GuardCommand::Makefiles { base, report } => {
            let audit = guard.audit_makefiles(&base.base_path)?;
            let text = render_makefile_text(&audit);
            emit(&report, "makefile audit", &audit, text).await
        }
        GuardCommand::Status { report } => {
            let summary = guard.summary();
            let text = render_summary_text(&summary);
            emit(&report, "policy status", &summary, text).await
        }
        GuardCommand::Alternatives { kind, report } => {
            let kind: RestrictedKind = kind.parse()?;
            let suggestion = guard.suggest_alternatives(kind);
            let text = render_suggestion_text(&suggestion);
            emit(&report, "alternatives", &suggestion, text).await
        }
    }
}

async fn run_template(template: Option<PathBuf>, report: OutputArgs) -> CliResult<()> {
    let mut loader = TemplateLoader::new(template);
    let info = loader.info();
    let text = render_template_text(loader.path(), &info);
    emit(&report, "template", &info, text).await
}

async fn run_rules(start: &Path, name: &str) -> CliResult<()> {
    let path = find_rules_file(start, name);
    let snapshot = load_rules(&path)?;
    print!("{}", snapshot.content);
    Ok(())
}

async fn emit<T: Serialize + ?Sized>(
    output: &OutputArgs,
    title: &str,
    payload: &T,
    text: String,
) -> CliResult<()> {
    let contents = match output.format {
        OutputFormat::Text => text,
        OutputFormat::Markdown => format!("# svcaudit {title}\n\n{text}"),
        OutputFormat::Json => render_json(payload)?,
    };
    emit_output(output, contents).await
}

async fn emit_output(output: &OutputArgs, contents: String) -> CliResult<()> {
    if let Some(path) = &output.report_output {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, contents).await?;
    } else {
        print!("{contents}");
    }
    Ok(())
}

fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}

fn append_items(output: &mut String, title: &str, items: &[String]) {
    if items.is_empty() {
        let _ = writeln!(output, "{title}: none");
        return;
    }
    let _ = writeln!(output, "{title}:");
    for item in items {
        let _ = writeln!(output, "- {item}");
    }
}

fn render_structure_text(report: &MicroserviceStructureReport) -> String {
    let mut output = String::new();
    let checks = &report.structure_checks;
    let _ = writeln!(output, "Service: {}", report.service);
    let _ = writeln!(output, "Path: {}", report.path);
    let _ = writeln!(output, "Status: {}", report.status);
    let _ = writeln!(output, "Score: {:.1}", report.score);
    let _ = writeln!(output, "Checks:");
    let _ = writeln!(output, "- Dockerfile: {}", yes_no(checks.dockerfile));
    let _ = writeln!(output, "- docker-compose.yml: {}", yes_no(checks.docker_compose));
    let _ = writeln!(output, "- .gitignore: {}", yes_no(checks.gitignore));
    let _ = writeln!(output, "- tests/: {}", yes_no(checks.tests_dir_exists));
    let _ = writeln!(output, "- tests/ has files: {}", yes_no(checks.tests_dir_has_files));
    for (name, present) in &checks.additional {
        let _ = writeln!(output, "- {name}: {}", yes_no(*present));
    }

    let quality = &report.config_quality;
    let warnings: Vec<String> = [
        ("Dockerfile", &quality.dockerfile_warnings),
        ("docker-compose.yml", &quality.compose_warnings),
        (".gitignore", &quality.gitignore_warnings),
        ("tests", &quality.tests_warnings),
    ]
    .into_iter()
    .flat_map(|(file, items)| items.iter().map(move |item| format!("{file}: {item}")))
    .collect();
    append_items(&mut output, "Warnings", &warnings);
    append_items(&mut output, "Recommendations", &report.recommendations);
    output
}

fn render_repo_text(audit: &RepositoryStructureAudit) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "Services: {}", audit.total_services);
    let _ = writeln!(
        output,
        "Complete: {}, incomplete: {}, poor: {}",
        audit.complete_services, audit.incomplete_services, audit.poor_services
    );
    let _ = writeln!(output, "Average score: {:.1}", audit.average_score);
    let _ = writeln!(output, "Overall status: {}", audit.overall_status);
    let _ = writeln!(output);
    for report in &audit.services {
        output.push_str(&render_structure_text(report));
        let _ = writeln!(output);
    }
    output
}

fn render_architecture_text(analysis: &ArchitectureAnalysis) -> String {
    let mut output = String::new();
    let _ = writeln!(
        output,
        "Architecture score: {:.1}/100 ({})",
        analysis.architecture_score, analysis.architecture_status
    );
    let _ = writeln!(output, "Principles:");
    for principle in ArchitecturePrinciple::ALL {
        let state = if analysis.is_compliant(principle) {
            "compliant"
        } else {
            "non-compliant"
        };
        let _ = writeln!(output, "- {principle}: {state}");
    }
    let violations: Vec<String> = analysis
        .violations
        .iter()
        .map(|v| format!("[{}] {}: {}", v.severity, v.principle, v.description))
        .collect();
    append_items(&mut output, "Violations", &violations);
    output
}

fn render_plan_text(actions: &[TodoAction]) -> String {
    if actions.is_empty() {
        return "No actions required.\n".to_string();
    }
    let mut output = String::new();
    for action in actions {
        let _ = writeln!(
            output,
            "- [{}] {} ({})",
            action.priority, action.action, action.estimated_effort
        );
        let _ = writeln!(output, "  {}", action.description);
    }
    output
}

fn render_batch_text(entries: &[BatchEntry]) -> String {
    let mut output = String::new();
    for entry in entries {
        let _ = writeln!(output, "Service: {}", entry.service);
        if let Some(structure) = &entry.structure {
            let _ = writeln!(
                output,
                "Structure: {:.1} ({})",
                structure.score, structure.status
            );
        }
        if let Some(architecture) = &entry.architecture {
            let _ = writeln!(
                output,
                "Architecture: {:.1} ({})",
                architecture.architecture_score, architecture.architecture_status
            );
        }
        if !entry.errors.is_empty() {
            append_items(&mut output, "Errors", &entry.errors);
        }
        let _ = writeln!(output);
    }
    output
}

fn render_decision_text(file: &Path, decision: &GuardDecision) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "File: {}", file.display());
    let _ = writeln!(output, "Allowed: {}", yes_no(decision.allowed));
    if !decision.allowed {
        let _ = writeln!(output, "Reason: {}", decision.message);
        append_items(&mut output, "Alternatives", &decision.alternatives);
    }
    output
}

fn render_prevention_text(violations: &[PreventionViolation]) -> String {
    let items: Vec<String> = violations
        .iter()
        .map(|v| format!("{}: {}", v.file_path, v.error_message))
        .collect();
    let mut output = String::new();
    append_items(&mut output, "Violations", &items);
    output
}

fn render_makefile_text(audit: &MakefileAudit) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "Base path: {}", audit.base_path);
    let _ = writeln!(output, "Services: {}", audit.total_services);
    let _ = writeln!(output, "Makefiles found: {}", audit.total_makefile_violations);
    for service in &audit.services {
        append_service_makefiles(&mut output, service);
    }
    output
}

fn append_service_makefiles(output: &mut String, service: &ServiceMakefileAudit) {
    let files: Vec<String> = service
        .makefile_violations
        .iter()
        .map(|v| v.file_path.clone())
        .collect();
    append_items(output, &service.service_name, &files);
}

fn render_summary_text(summary: &PreventionSummary) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "Makefiles blocked: {}", yes_no(summary.makefiles_blocked));
    let _ = writeln!(
        output,
        "Shell scripts blocked: {}",
        yes_no(summary.shell_scripts_blocked)
    );
    let _ = writeln!(
        output,
        "Relative paths blocked: {}",
        yes_no(summary.path_prevention_enabled)
    );
    let _ = writeln!(output, "Additional rules: {}", summary.other_rules_count);
    append_items(&mut output, "Framework markers", &summary.framework_markers);
    output
}

fn render_suggestion_text(suggestion: &AlternativeSuggestion) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "{}", suggestion.error_message);
    append_items(&mut output, "Alternatives", &suggestion.alternatives);
    let _ = writeln!(output, "{}", suggestion.recommendation);
    output
}

fn render_template_text(path: &Path, info: &TemplateInfo) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "Template file: {}", path.display());
    let _ = writeln!(output, "Name: {}", info.name);
    let _ = writeln!(output, "Description: {}", info.description);
    let _ = writeln!(output, "Required entries: {}", info.total_required_files);
    let _ = writeln!(output, "Optional entries: {}", info.total_optional_files);
    let _ = writeln!(
        output,
        "Quality blocks: dockerfile {}, compose {}, gitignore {}, tests {}",
        yes_no(info.has_dockerfile_quality),
        yes_no(info.has_compose_quality),
        yes_no(info.has_gitignore_quality),
        yes_no(info.has_tests_quality)
    );
    output
}

#[cfg(test)]
mod tests {
    use super::{
        BatchEntry, Cli, Commands, GuardCommand, OutputArgs, OutputFormat, emit, emit_output,
        evaluate_services, render_architecture_text, render_batch_text, render_decision_text,
        render_plan_text, render_structure_text, run_guard, run_inspect, run_todo,
    };
    use clap::Parser;
    use std::path::{Path, PathBuf};
    use std::sync::Arc;
    use svcaudit_core::{
        StdFileSystem, StructureInspector, TemplateConfig, analyze_architecture, plan_remediation,
    };

    fn write(root: &Path, rel: &str, contents: &str) {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create dir");
        }
        std::fs::write(path, contents).expect("write file");
    }

    fn json_output(path: &Path) -> OutputArgs {
        OutputArgs {
            format: OutputFormat::Json,
            report_output: Some(path.to_path_buf()),
        }
    }

    #[test]
    fn parses_inspect_with_base_path() {
        let cli = Cli::try_parse_from([
            "svcaudit",
            "inspect",
            "billing",
            "--base-path",
            "/repo",
            "--format",
            "json",
        ])
        .expect("parse");
        match cli.command {
            Commands::Inspect {
                service,
                base,
                report,
                ..
            } => {
                assert_eq!(service, "billing");
                assert_eq!(base.base_path, PathBuf::from("/repo"));
                assert_eq!(report.format, OutputFormat::Json);
            }
            _ => panic!("expected inspect command"),
        }
    }

    #[test]
    fn parses_guard_and_repo_services() {
        let cli = Cli::try_parse_from(["svcaudit", "guard", "check", "Makefile", "--service", "svc"])
            .expect("parse guard");
        assert!(matches!(
            cli.command,
            Commands::Guard {
                command: GuardCommand::Check { .. },
                ..
            }
        ));

        let cli = Cli::try_parse_from(["svcaudit", "repo", "--service", "a,b", "--service", "c"])
            .expect("parse repo");
        match cli.command {
            Commands::Repo { services, .. } => assert_eq!(services, vec!["a", "b", "c"]),
            _ => panic!("expected repo command"),
        }
    }

    #[tokio::test]
    async fn inspect_writes_json_report() {
        let root = tempfile::tempdir().expect("tempdir");
        write(root.path(), "svc/Dockerfile", "FROM python\nEXPOSE 8000\n");
        let out = root.path().join("out/report.json");

        run_inspect(
            "svc".to_string(),
            root.path().to_path_buf(),
            None,
            json_output(&out),
        )
        .await
        .expect("inspect");

        let parsed: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&out).expect("read")).expect("json");
        assert_eq!(parsed["service"], "svc");
        assert_eq!(parsed["structure_checks"]["dockerfile"], true);
        assert_eq!(parsed["status"], "poor");
    }

    #[tokio::test]
    async fn inspect_missing_service_fails() {
        let root = tempfile::tempdir().expect("tempdir");
        let out = root.path().join("report.json");
        let result = run_inspect(
            "missing".to_string(),
            root.path().to_path_buf(),
            None,
            json_output(&out),
        )
        .await;
        assert!(result.is_err());
        assert!(!out.exists());
    }

    #[tokio::test]
    async fn todo_writes_report_into_service() {
        let root = tempfile::tempdir().expect("tempdir");
        write(root.path(), "billing/Dockerfile", "FROM python\n");
        let out = root.path().join("todo.json");

        run_todo(
            "billing".to_string(),
            root.path().to_path_buf(),
            None,
            json_output(&out),
        )
        .await
        .expect("todo");

        assert!(root.path().join("billing/TODO/todo_billing.md").exists());
        let parsed: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&out).expect("read")).expect("json");
        assert_eq!(parsed["actions"][0]["priority"], "CRITICAL");
    }

    #[tokio::test]
    async fn batch_isolates_failing_services() {
        let root = tempfile::tempdir().expect("tempdir");
        write(root.path(), "a/Dockerfile", "FROM python\n");
        write(root.path(), "b/docker-compose.yml", "services: {}\n");

        let entries = evaluate_services(
            vec!["b".to_string(), "ghost".to_string(), "a".to_string()],
            Arc::new(root.path().to_path_buf()),
            Arc::new(TemplateConfig::builtin()),
            2,
        )
        .await
        .expect("batch");

        let names: Vec<&str> = entries.iter().map(|e| e.service.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "ghost"]);
        assert!(entries[0].structure.is_some() && entries[0].architecture.is_some());
        assert!(entries[0].errors.is_empty());
        assert_eq!(entries[2].errors.len(), 2);

        let text = render_batch_text(&entries);
        assert!(text.contains("Service: ghost"));
        assert!(text.contains("Errors:"));
    }

    #[tokio::test]
    async fn guard_check_rejects_makefile() {
        let root = tempfile::tempdir().expect("tempdir");
        let out = root.path().join("decision.json");
        run_guard(
            GuardCommand::Check {
                file: root.path().join("Makefile"),
                service: root.path().to_path_buf(),
                report: json_output(&out),
            },
            None,
        )
        .await
        .expect("guard");

        let parsed: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&out).expect("read")).expect("json");
        assert_eq!(parsed["allowed"], false);
        assert_eq!(parsed["rule"], "makefile");
    }

    #[tokio::test]
    async fn guard_alternatives_rejects_unknown_kind() {
        let result = run_guard(
            GuardCommand::Alternatives {
                kind: "dockerfile".to_string(),
                report: OutputArgs {
                    format: OutputFormat::Text,
                    report_output: None,
                },
            },
            None,
        )
        .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn emit_supports_all_formats() {
        let root = tempfile::tempdir().expect("tempdir");
        let markdown = root.path().join("out/report.md");
        emit(
            &OutputArgs {
                format: OutputFormat::Markdown,
                report_output: Some(markdown.clone()),
            },
            "plan",
            &Vec::<String>::new(),
            "No actions required.\n".to_string(),
        )
        .await
        .expect("markdown");
        let contents = std::fs::read_to_string(&markdown).expect("read");
        assert!(contents.starts_with("# svcaudit plan"));

        emit_output(
            &OutputArgs {
                format: OutputFormat::Text,
                report_output: None,
            },
            String::new(),
        )
        .await
        .expect("stdout");
    }

    #[test]
    fn renders_structure_and_architecture_text() {
        let root = tempfile::tempdir().expect("tempdir");
        write(root.path(), "svc/Dockerfile", "FROM python\n");
        let inspector =
            StructureInspector::with_config(StdFileSystem::new(), root.path(), TemplateConfig::builtin());
        let report = inspector.inspect_service("svc").expect("inspect");

        let text = render_structure_text(&report);
        assert!(text.contains("- Dockerfile: yes"));
        assert!(text.contains("- Dockerfile: EXPOSE missing"));
        assert!(text.contains("Create docker-compose.yml for orchestration"));

        let analysis = analyze_architecture(&root.path().join("svc")).expect("analysis");
        let text = render_architecture_text(&analysis);
        assert!(text.contains("Architecture score: 0.0/100 (CRITICAL)"));
        assert!(text.contains("[CRITICAL] TDD (Test Driven Development)"));

        let plan = render_plan_text(&plan_remediation(&analysis));
        assert!(plan.starts_with("- [CRITICAL] Implement test-driven development"));
    }

    #[test]
    fn renders_rejected_decision() {
        let guard = svcaudit_core::FilePreventor::from_config(&TemplateConfig::builtin())
            .expect("policy");
        let decision = guard.can_create_file(Path::new("svc/run.sh"), Path::new("svc"));
        let text = render_decision_text(Path::new("svc/run.sh"), &decision);
        assert!(text.contains("Allowed: no"));
        assert!(text.contains("Alternatives:"));
    }

    #[test]
    fn failed_batch_entry_carries_error() {
        let entry = BatchEntry::failed("svc".to_string(), "boom");
        assert_eq!(entry.errors, vec!["boom"]);
        assert!(entry.structure.is_none());
    }
}
