//! Declarative structure templates and scoring configuration.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::policy::FileCreationPolicy;

/// Kind of filesystem entry a template requires.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    /// A regular file.
    #[default]
    File,
    /// A directory, optionally required to contain matching entries.
    Directory,
}

/// A file or directory the template expects in a service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequiredFile {
    /// Path relative to the service root (`tests/` for directories).
    pub name: String,
    /// Human description used in recommendations.
    pub description: String,
    /// Whether the entry is mandatory.
    pub required: bool,
    /// Score awarded when the entry is present.
    pub weight: i64,
    /// File or directory.
    #[serde(rename = "type", default)]
    pub kind: EntryKind,
    /// Glob patterns of which at least one must match inside a directory.
    #[serde(default)]
    pub must_contain: Vec<String>,
}

impl RequiredFile {
    /// Template name with any trailing separator removed.
    pub fn trimmed_name(&self) -> &str {
        self.name.trim_end_matches('/')
    }

    /// Whether this entry is the dedicated tests directory.
    pub fn is_tests_dir(&self) -> bool {
        self.kind == EntryKind::Directory && self.trimmed_name() == "tests"
    }
}

/// Which outcome of a pattern match produces its warning.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternPolarity {
    /// Warn when the pattern is found (flags a bad practice).
    WarnIfPresent,
    /// Warn when the pattern is missing (requires a good practice).
    #[default]
    WarnIfAbsent,
}

/// A single content rule with a signed weight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityPattern {
    /// Stable pattern name.
    pub name: String,
    /// Regular expression searched for in the content.
    #[serde(default)]
    pub regex: Option<String>,
    /// Literal substring searched for when no regex is given.
    #[serde(default)]
    pub content: Option<String>,
    /// Human description.
    #[serde(default)]
    pub description: String,
    /// Bonus (positive) or penalty (negative) weight.
    #[serde(default)]
    pub weight: i64,
    /// Whether the pattern is mandatory.
    #[serde(default)]
    pub required: bool,
    /// Warning text emitted when the pattern fires.
    #[serde(default)]
    pub warning: Option<String>,
    /// Match outcome that emits the warning.
    #[serde(default)]
    pub polarity: PatternPolarity,
}

impl QualityPattern {
    pub(crate) fn regex_rule(
        name: &str,
        regex: &str,
        polarity: PatternPolarity,
        warning: &str,
    ) -> Self {
        Self {
            name: name.to_string(),
            regex: Some(regex.to_string()),
            content: None,
            description: warning.to_string(),
            weight: 0,
            required: false,
            warning: Some(warning.to_string()),
            polarity,
        }
    }

    pub(crate) fn content_rule(content: &str, warning: &str) -> Self {
        Self {
            name: content.to_string(),
            regex: None,
            content: Some(content.to_string()),
            description: warning.to_string(),
            weight: 0,
            required: false,
            warning: Some(warning.to_string()),
            polarity: PatternPolarity::WarnIfAbsent,
        }
    }
}

/// Quality rules for one file kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileQuality {
    /// Ordered pattern list.
    #[serde(default)]
    pub patterns: Vec<QualityPattern>,
}

impl FileQuality {
    /// Sum of the positive pattern weights in this block.
    pub fn bonus(&self) -> i64 {
        self.patterns
            .iter()
            .map(|pattern| pattern.weight)
            .filter(|weight| *weight > 0)
            .sum()
    }
}

/// Structure template describing a compliant microservice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructureTemplate {
    /// Template name.
    pub name: String,
    /// Template description.
    #[serde(default)]
    pub description: String,
    /// Required files and directories, in evaluation order.
    pub required_files: Vec<RequiredFile>,
    /// Dockerfile quality rules.
    #[serde(default)]
    pub dockerfile_quality: Option<FileQuality>,
    /// docker-compose.yml quality rules.
    #[serde(default)]
    pub compose_quality: Option<FileQuality>,
    /// .gitignore quality rules.
    #[serde(default)]
    pub gitignore_quality: Option<FileQuality>,
    /// Test naming rules.
    #[serde(default)]
    pub tests_quality: Option<FileQuality>,
}

impl StructureTemplate {
    /// Iterate over every configured quality pattern.
    pub fn patterns(&self) -> impl Iterator<Item = &QualityPattern> {
        [
            &self.dockerfile_quality,
            &self.compose_quality,
            &self.gitignore_quality,
            &self.tests_quality,
        ]
        .into_iter()
        .flatten()
        .flat_map(|quality| quality.patterns.iter())
    }
}

/// Score cutoffs for structure statuses, in descending order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Minimum score for a complete service.
    pub complete: f64,
    /// Minimum score for an incomplete service.
    pub incomplete: f64,
    /// Floor of the poor band.
    #[serde(default)]
    pub poor: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            complete: 80.0,
            incomplete: 50.0,
            poor: 0.0,
        }
    }
}

impl Thresholds {
    /// Whether `complete > incomplete >= poor >= 0` holds.
    pub fn is_ordered(&self) -> bool {
        self.complete > self.incomplete && self.incomplete >= self.poor && self.poor >= 0.0
    }
}

/// Weights and cutoffs used by the scorer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Per-category base weights.
    pub base_weights: BTreeMap<String, i64>,
    /// Status thresholds.
    pub thresholds: Thresholds,
    /// Score removed per quality warning.
    pub warning_penalty: f64,
    /// Weights of optional advanced features.
    pub bonus_features: BTreeMap<String, i64>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            base_weights: BTreeMap::from([
                ("required_file".to_string(), 20),
                ("optional_file".to_string(), 10),
                ("required_directory".to_string(), 15),
                ("optional_directory".to_string(), 8),
            ]),
            thresholds: Thresholds::default(),
            warning_penalty: 2.0,
            bonus_features: BTreeMap::from([
                ("multi_stage_build".to_string(), 10),
                ("health_check".to_string(), 8),
                ("test_coverage".to_string(), 5),
            ]),
        }
    }
}

/// Complete template file contents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateConfig {
    /// The structure template applied to services.
    pub default: StructureTemplate,
    /// Scoring configuration.
    #[serde(default)]
    pub scoring: ScoringConfig,
    /// File-creation rules, when configured.
    #[serde(default)]
    pub file_prevention: Option<FileCreationPolicy>,
}

impl TemplateConfig {
    /// Built-in configuration used when no template file can be loaded.
    pub fn builtin() -> Self {
        Self {
            default: StructureTemplate {
                name: "Minimum microservice standard".to_string(),
                description: "Mandatory base structure for microservices".to_string(),
                required_files: vec![
                    required_file("Dockerfile", "containerization", 20),
                    required_file("docker-compose.yml", "orchestration", 20),
                    required_file(".gitignore", "Git exclusions", 15),
                    RequiredFile {
                        kind: EntryKind::Directory,
                        must_contain: vec!["*.py".to_string()],
                        ..required_file("tests/", "the test suite", 15)
                    },
                ],
                dockerfile_quality: None,
                compose_quality: None,
                gitignore_quality: None,
                tests_quality: None,
            },
            scoring: ScoringConfig::default(),
            file_prevention: Some(FileCreationPolicy::default()),
        }
    }
}

fn required_file(name: &str, description: &str, weight: i64) -> RequiredFile {
    RequiredFile {
        name: name.to_string(),
        description: description.to_string(),
        required: true,
        weight,
        kind: EntryKind::File,
        must_contain: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    #[test]
    fn builtin_template_requires_four_entries() {
        let config = TemplateConfig::builtin();
        let names: Vec<&str> = config
            .default
            .required_files
            .iter()
            .map(|entry| entry.name.as_str())
            .collect();
        assert_eq!(
            names,
            vec!["Dockerfile", "docker-compose.yml", ".gitignore", "tests/"]
        );
        let total: i64 = config.default.required_files.iter().map(|f| f.weight).sum();
        assert_eq!(total, 70);
        assert!(config.default.required_files[3].is_tests_dir());
        assert!(config.scoring.thresholds.is_ordered());
    }

    #[test]
    fn parses_polarity_and_entry_kind() {
        let yaml = indoc! {r#"
            name: custom
            required_files:
              - name: src/
                description: sources
                required: true
                weight: 10
                type: directory
            dockerfile_quality:
              patterns:
                - name: copy_all
                  regex: 'COPY\s+\.\s+\.'
                  weight: -10
                  warning: uses COPY . .
                  polarity: warn_if_present
                - name: healthcheck
                  regex: HEALTHCHECK
                  weight: 8
        "#};
        let template: StructureTemplate = serde_yaml::from_str(yaml).expect("parse template");

        assert_eq!(template.required_files[0].kind, EntryKind::Directory);
        assert!(!template.required_files[0].is_tests_dir());
        let quality = template.dockerfile_quality.expect("dockerfile block");
        assert_eq!(quality.patterns[0].polarity, PatternPolarity::WarnIfPresent);
        assert_eq!(quality.patterns[1].polarity, PatternPolarity::WarnIfAbsent);
        assert_eq!(quality.bonus(), 8);
    }

    #[test]
    fn thresholds_reject_inverted_order() {
        let thresholds = Thresholds {
            complete: 40.0,
            incomplete: 60.0,
            poor: 0.0,
        };
        assert!(!thresholds.is_ordered());
    }
}
