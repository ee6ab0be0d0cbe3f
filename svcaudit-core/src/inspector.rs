//! Template-driven structure inspection for services and repositories.

use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::domain::{
    ConfigQuality, MicroserviceStructureReport, RepositoryStructureAudit, StructureChecks,
    StructureStatus,
};
use crate::error::{AuditError, Result};
use crate::fs::{FileSystem, StdFileSystem, is_hidden};
use crate::loader::{TemplateInfo, TemplateLoader};
use crate::quality::audit_config_quality;
use crate::scoring::{calculate_score, determine_status};
use crate::structure::check_structure;
use crate::template::{EntryKind, ScoringConfig, StructureTemplate, TemplateConfig};

/// Inspects service directories against a structure template.
pub struct StructureInspector<F: FileSystem> {
    fs: F,
    base_path: PathBuf,
    loader: TemplateLoader,
    config: TemplateConfig,
}

impl<F: FileSystem> StructureInspector<F> {
    /// Create an inspector loading its template from `template_path` (or the default location).
    pub fn new(fs: F, base_path: impl Into<PathBuf>, template_path: Option<PathBuf>) -> Self {
        let mut loader = TemplateLoader::new(template_path);
        let config = loader.config().clone();
        Self {
            fs,
            base_path: base_path.into(),
            loader,
            config,
        }
    }

    /// Create an inspector with an explicit configuration.
    pub fn with_config(fs: F, base_path: impl Into<PathBuf>, config: TemplateConfig) -> Self {
        Self {
            fs,
            base_path: base_path.into(),
            loader: TemplateLoader::with_config(config.clone()),
            config,
        }
    }

    /// Repository root services are resolved against.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Active structure template.
    pub fn template(&self) -> &StructureTemplate {
        &self.config.default
    }

    /// Active scoring configuration.
    pub fn scoring(&self) -> &ScoringConfig {
        &self.config.scoring
    }

    /// Active template configuration.
    pub fn config(&self) -> &TemplateConfig {
        &self.config
    }

    /// Re-read the template file, replacing the active configuration.
    pub fn reload_template(&mut self) {
        self.config = self.loader.reload().clone();
    }

    /// Describe the active template.
    pub fn template_info(&mut self) -> TemplateInfo {
        self.loader.info()
    }

    /// Inspect one service directory, relative to the base path or absolute.
    pub fn inspect_service(&self, service: &str) -> Result<MicroserviceStructureReport> {
        let full_path = self.base_path.join(service);
        if !self.fs.is_dir(&full_path) {
            return Err(AuditError::ServiceNotFound(full_path));
        }

        let template = self.template();
        let structure_checks = check_structure(&self.fs, &full_path, template);
        let config_quality = audit_config_quality(&self.fs, &full_path, template);
        let score = calculate_score(template, self.scoring(), &structure_checks, &config_quality);
        let status = determine_status(score, &self.scoring().thresholds);
        let recommendations = recommendations(template, &structure_checks, &config_quality);

        Ok(MicroserviceStructureReport {
            service: service.to_string(),
            path: full_path.display().to_string(),
            structure_checks,
            config_quality,
            status,
            score,
            recommendations,
        })
    }

    /// Inspect several services, auto-detecting them when `services` is `None`.
    ///
    /// A failing service becomes an error report instead of aborting the audit.
    pub fn inspect_repository(&self, services: Option<&[String]>) -> RepositoryStructureAudit {
        let services = match services {
            Some(services) => services.to_vec(),
            None => self.detect_services(),
        };

        let reports: Vec<MicroserviceStructureReport> = services
            .iter()
            .map(|service| {
                self.inspect_service(service).unwrap_or_else(|err| {
                    log::warn!("structure inspection of {service} failed: {err}");
                    error_report(service, &err.to_string())
                })
            })
            .collect();

        summarize(reports)
    }

    /// Services under the base path holding at least one mandatory template entry.
    pub fn detect_services(&self) -> Vec<String> {
        let mut services = Vec::new();
        if self.is_service_dir(&self.base_path) {
            services.push(".".to_string());
        }

        let entries = match self.fs.list_dir(&self.base_path) {
            Ok(entries) => entries,
            Err(err) => {
                log::debug!("unable to list {}: {err}", self.base_path.display());
                return services;
            }
        };
        for entry in entries {
            if is_hidden(&entry) || !self.fs.is_dir(&entry) || !self.is_service_dir(&entry) {
                continue;
            }
            if let Some(name) = entry.file_name().and_then(|name| name.to_str()) {
                services.push(name.to_string());
            }
        }
        services
    }

    fn is_service_dir(&self, dir: &Path) -> bool {
        self.template()
            .required_files
            .iter()
            .filter(|entry| entry.required)
            .any(|entry| self.fs.exists(&dir.join(entry.trimmed_name())))
    }
}

/// Inspect a single service on the real filesystem.
pub fn inspect_microservice_structure(
    service: &str,
    base_path: &Path,
    template_path: Option<PathBuf>,
) -> Result<MicroserviceStructureReport> {
    StructureInspector::new(StdFileSystem::new(), base_path, template_path).inspect_service(service)
}

/// Inspect a repository on the real filesystem.
pub fn inspect_repository_structure(
    base_path: &Path,
    services: Option<&[String]>,
    template_path: Option<PathBuf>,
) -> RepositoryStructureAudit {
    StructureInspector::new(StdFileSystem::new(), base_path, template_path)
        .inspect_repository(services)
}

/// Suggested fixes for missing entries and warning categories.
pub fn recommendations(
    template: &StructureTemplate,
    checks: &StructureChecks,
    quality: &ConfigQuality,
) -> Vec<String> {
    let mut recommendations = Vec::new();

    for entry in template.required_files.iter().filter(|entry| entry.required) {
        if entry.is_tests_dir() {
            if !checks.tests_dir_exists {
                recommendations.push(format!(
                    "Create directory {} for {}",
                    entry.name, entry.description
                ));
            } else if !checks.tests_dir_has_files {
                recommendations.push(format!("Add test files to the {} directory", entry.name));
            }
            continue;
        }
        if !crate::structure::entry_present(checks, entry) {
            let noun = match entry.kind {
                EntryKind::File => "",
                EntryKind::Directory => "directory ",
            };
            recommendations.push(format!(
                "Create {noun}{} for {}",
                entry.name, entry.description
            ));
        }
    }

    if !quality.dockerfile_warnings.is_empty() {
        recommendations.push("Improve Dockerfile following best practices".to_string());
    }
    if !quality.compose_warnings.is_empty() {
        recommendations
            .push("Improve docker-compose.yml with restart policies and volumes".to_string());
    }
    if !quality.gitignore_warnings.is_empty() {
        recommendations.push("Improve .gitignore with standard patterns".to_string());
    }
    if !quality.tests_warnings.is_empty() {
        recommendations.push("Improve test structure and naming conventions".to_string());
    }

    recommendations
}

/// Placeholder report for a service that could not be inspected.
pub fn error_report(service: &str, message: &str) -> MicroserviceStructureReport {
    MicroserviceStructureReport {
        service: service.to_string(),
        path: service.to_string(),
        structure_checks: StructureChecks::default(),
        config_quality: ConfigQuality {
            dockerfile_warnings: vec![format!("Error: {message}")],
            ..ConfigQuality::default()
        },
        status: StructureStatus::Poor,
        score: 0.0,
        recommendations: vec![format!("Resolve error: {message}")],
    }
}

fn summarize(services: Vec<MicroserviceStructureReport>) -> RepositoryStructureAudit {
    let count = |status: StructureStatus| services.iter().filter(|s| s.status == status).count();
    let total_services = services.len();
    let complete_services = count(StructureStatus::Complete);
    let incomplete_services = count(StructureStatus::Incomplete);
    let poor_services = count(StructureStatus::Poor);

    let average_score = if total_services == 0 {
        0.0
    } else {
        services.iter().map(|s| s.score).sum::<f64>() / total_services as f64
    };

    let overall_status = if complete_services == total_services {
        StructureStatus::Complete
    } else if poor_services == 0 {
        StructureStatus::Incomplete
    } else {
        StructureStatus::Poor
    };

    RepositoryStructureAudit {
        total_services,
        complete_services,
        incomplete_services,
        poor_services,
        average_score,
        services,
        timestamp: Utc::now(),
        overall_status,
    }
}
