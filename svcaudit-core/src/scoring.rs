//! Structure scoring and status derivation.

use crate::domain::{ConfigQuality, StructureChecks, StructureStatus};
use crate::structure::entry_present;
use crate::template::{ScoringConfig, StructureTemplate, Thresholds};

/// Sum of the weights of every present template entry.
pub fn base_score(template: &StructureTemplate, checks: &StructureChecks) -> f64 {
    template
        .required_files
        .iter()
        .filter(|entry| entry_present(checks, entry))
        .map(|entry| entry.weight as f64)
        .sum()
}

/// Positive pattern weights declared in the Dockerfile and compose blocks.
///
/// Bonuses are template-declared and apply whenever the block exists; they
/// are not gated on the pattern matching the scanned file.
pub fn quality_bonus(template: &StructureTemplate) -> f64 {
    [&template.dockerfile_quality, &template.compose_quality]
        .into_iter()
        .flatten()
        .map(|quality| quality.bonus() as f64)
        .sum()
}

/// Combine presence, bonuses and warning penalties into a non-negative score.
pub fn calculate_score(
    template: &StructureTemplate,
    scoring: &ScoringConfig,
    checks: &StructureChecks,
    quality: &ConfigQuality,
) -> f64 {
    let penalty = quality.total_warnings() as f64 * scoring.warning_penalty;
    let score = base_score(template, checks) + quality_bonus(template) - penalty;
    score.max(0.0)
}

/// Map a score to a status using the descending thresholds.
pub fn determine_status(score: f64, thresholds: &Thresholds) -> StructureStatus {
    if score >= thresholds.complete {
        StructureStatus::Complete
    } else if score >= thresholds.incomplete {
        StructureStatus::Incomplete
    } else {
        StructureStatus::Poor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::{FileQuality, PatternPolarity, QualityPattern, TemplateConfig};

    fn all_present() -> StructureChecks {
        StructureChecks {
            dockerfile: true,
            docker_compose: true,
            gitignore: true,
            tests_dir_exists: true,
            tests_dir_has_files: true,
            ..StructureChecks::default()
        }
    }

    #[test]
    fn score_equals_weight_sum_without_warnings() {
        let config = TemplateConfig::builtin();
        let score = calculate_score(
            &config.default,
            &config.scoring,
            &all_present(),
            &ConfigQuality::default(),
        );
        assert_eq!(score, 70.0);
        assert_eq!(
            determine_status(score, &config.scoring.thresholds),
            StructureStatus::Incomplete
        );
    }

    #[test]
    fn each_warning_costs_exactly_the_penalty() {
        let config = TemplateConfig::builtin();
        let mut quality = ConfigQuality::default();
        let before = calculate_score(&config.default, &config.scoring, &all_present(), &quality);
        quality.compose_warnings.push("no restart policy".to_string());
        let after = calculate_score(&config.default, &config.scoring, &all_present(), &quality);

        assert_eq!(before - after, config.scoring.warning_penalty);
    }

    #[test]
    fn score_is_clamped_at_zero() {
        let config = TemplateConfig::builtin();
        let quality = ConfigQuality {
            tests_warnings: vec!["tests directory missing".to_string()],
            ..ConfigQuality::default()
        };
        let score = calculate_score(
            &config.default,
            &config.scoring,
            &StructureChecks::default(),
            &quality,
        );
        assert_eq!(score, 0.0);
    }

    #[test]
    fn bonuses_apply_unconditionally_from_quality_blocks() {
        let mut config = TemplateConfig::builtin();
        config.default.dockerfile_quality = Some(FileQuality {
            patterns: vec![
                QualityPattern {
                    weight: 5,
                    ..QualityPattern::regex_rule(
                        "expose",
                        r"EXPOSE\s+\d+",
                        PatternPolarity::WarnIfAbsent,
                        "EXPOSE missing",
                    )
                },
                QualityPattern {
                    weight: -10,
                    ..QualityPattern::regex_rule(
                        "copy_all",
                        r"COPY\s+\.\s+\.",
                        PatternPolarity::WarnIfPresent,
                        "uses COPY . .",
                    )
                },
            ],
        });
        config.default.compose_quality = Some(FileQuality {
            patterns: vec![QualityPattern {
                weight: 25,
                ..QualityPattern::regex_rule(
                    "restart",
                    "restart:",
                    PatternPolarity::WarnIfAbsent,
                    "no restart policy",
                )
            }],
        });

        let score = calculate_score(
            &config.default,
            &config.scoring,
            &all_present(),
            &ConfigQuality::default(),
        );

        assert_eq!(quality_bonus(&config.default), 30.0);
        assert_eq!(score, 100.0);
        assert_eq!(
            determine_status(score, &config.scoring.thresholds),
            StructureStatus::Complete
        );
    }

    #[test]
    fn status_thresholds_are_inclusive() {
        let thresholds = Thresholds::default();
        assert_eq!(determine_status(80.0, &thresholds), StructureStatus::Complete);
        assert_eq!(determine_status(79.0, &thresholds), StructureStatus::Incomplete);
        assert_eq!(determine_status(50.0, &thresholds), StructureStatus::Incomplete);
        assert_eq!(determine_status(49.9, &thresholds), StructureStatus::Poor);
    }
}
