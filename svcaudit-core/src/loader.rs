//! Template loading with an explicit built-in fallback.

use std::path::{Path, PathBuf};

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::policy::FileCreationPolicy;
use crate::template::{ScoringConfig, StructureTemplate, TemplateConfig};

/// Default location of the template file, relative to the working directory.
pub const DEFAULT_TEMPLATE_PATH: &str = "config/structure_templates.yaml";

/// Reasons a template file could not be used.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The template file does not exist.
    #[error("template file not found at {}", .0.display())]
    NotFound(PathBuf),
    /// The template file could not be read.
    #[error("unable to read template file: {0}")]
    Io(#[from] std::io::Error),
    /// The template file is not valid YAML for the template schema.
    #[error("invalid template YAML: {0}")]
    Parse(#[from] serde_yaml::Error),
    /// A quality pattern carries a regex that does not compile.
    #[error("quality pattern {name} has an invalid regex: {source}")]
    InvalidPattern {
        /// Pattern name.
        name: String,
        /// Compilation error.
        source: regex::Error,
    },
    /// Thresholds are not in descending order.
    #[error("scoring thresholds must satisfy complete > incomplete >= poor >= 0")]
    InvalidThresholds,
}

/// Parse and validate a template file without any fallback.
pub fn load_template_config(path: &Path) -> Result<TemplateConfig, LoadError> {
    if !path.exists() {
        return Err(LoadError::NotFound(path.to_path_buf()));
    }
    let raw = std::fs::read_to_string(path)?;
    parse_template_config(&raw)
}

/// Parse and validate template YAML.
pub fn parse_template_config(raw: &str) -> Result<TemplateConfig, LoadError> {
    let config: TemplateConfig = serde_yaml::from_str(raw)?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &TemplateConfig) -> Result<(), LoadError> {
    for pattern in config.default.patterns() {
        if let Some(regex) = &pattern.regex {
            Regex::new(regex).map_err(|source| LoadError::InvalidPattern {
                name: pattern.name.clone(),
                source,
            })?;
        }
    }
    if !config.scoring.thresholds.is_ordered() {
        return Err(LoadError::InvalidThresholds);
    }
    Ok(())
}

/// Summary of the active template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TemplateInfo {
    /// Template name.
    pub name: String,
    /// Template description.
    pub description: String,
    /// Number of mandatory entries.
    pub total_required_files: usize,
    /// Number of optional entries.
    pub total_optional_files: usize,
    /// Whether a Dockerfile quality block is configured.
    pub has_dockerfile_quality: bool,
    /// Whether a compose quality block is configured.
    pub has_compose_quality: bool,
    /// Whether a .gitignore quality block is configured.
    pub has_gitignore_quality: bool,
    /// Whether a tests quality block is configured.
    pub has_tests_quality: bool,
}

/// Caching template loader that always yields a usable configuration.
#[derive(Debug, Clone)]
pub struct TemplateLoader {
    path: PathBuf,
    config: Option<TemplateConfig>,
}

impl Default for TemplateLoader {
    fn default() -> Self {
        Self::new(None)
    }
}

impl TemplateLoader {
    /// Create a loader for `path`, or for [`DEFAULT_TEMPLATE_PATH`] when `None`.
    pub fn new(path: Option<PathBuf>) -> Self {
        Self {
            path: path.unwrap_or_else(|| PathBuf::from(DEFAULT_TEMPLATE_PATH)),
            config: None,
        }
    }

    /// Create a loader pre-populated with a configuration.
    pub fn with_config(config: TemplateConfig) -> Self {
        Self {
            path: PathBuf::from(DEFAULT_TEMPLATE_PATH),
            config: Some(config),
        }
    }

    /// Template file location.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Active configuration, loading it on first access.
    pub fn config(&mut self) -> &TemplateConfig {
        let path = &self.path;
        self.config.get_or_insert_with(|| load_or_builtin(path))
    }

    /// Active structure template.
    pub fn template(&mut self) -> &StructureTemplate {
        &self.config().default
    }

    /// Active scoring configuration.
    pub fn scoring(&mut self) -> &ScoringConfig {
        &self.config().scoring
    }

    /// Active file-creation policy, if any.
    pub fn file_prevention(&mut self) -> Option<&FileCreationPolicy> {
        self.config().file_prevention.as_ref()
    }

    /// Drop the cached configuration and read the file again.
    pub fn reload(&mut self) -> &TemplateConfig {
        self.config = None;
        self.config()
    }

    /// Describe the active template.
    pub fn info(&mut self) -> TemplateInfo {
        let template = self.template();
        TemplateInfo {
            name: template.name.clone(),
            description: template.description.clone(),
            total_required_files: template.required_files.iter().filter(|f| f.required).count(),
            total_optional_files: template.required_files.iter().filter(|f| !f.required).count(),
            has_dockerfile_quality: template.dockerfile_quality.is_some(),
            has_compose_quality: template.compose_quality.is_some(),
            has_gitignore_quality: template.gitignore_quality.is_some(),
            has_tests_quality: template.tests_quality.is_some(),
        }
    }
}

fn load_or_builtin(path: &Path) -> TemplateConfig {
    match load_template_config(path) {
        Ok(config) => {
            log::debug!("loaded structure template from {}", path.display());
            config
        }
        Err(err) => {
            log::warn!("{err}; using built-in structure template");
            TemplateConfig::builtin()
        }
    }
}
