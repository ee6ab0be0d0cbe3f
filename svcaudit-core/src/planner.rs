//! Remediation planning from architecture violations.

use crate::domain::{ArchitectureAnalysis, ArchitecturePrinciple, Priority, TodoAction};

/// Fixed priority of the action restoring `principle`.
pub fn action_priority(principle: ArchitecturePrinciple) -> Priority {
    match principle {
        ArchitecturePrinciple::TestDrivenDevelopment => Priority::Critical,
        ArchitecturePrinciple::DuplicationAvoidance | ArchitecturePrinciple::IntegrationTests => {
            Priority::High
        }
        ArchitecturePrinciple::SyntheticTestData | ArchitecturePrinciple::Scalability => {
            Priority::Medium
        }
    }
}

/// One action per violated principle, most urgent first.
///
/// Actions sharing a priority keep the order of the violations.
pub fn plan_remediation(analysis: &ArchitectureAnalysis) -> Vec<TodoAction> {
    let mut actions: Vec<TodoAction> = analysis
        .violations
        .iter()
        .map(|violation| action_for(violation.principle))
        .collect();
    actions.sort_by_key(|action| action.priority.rank());
    actions
}

/// The fixed remediation action for `principle`.
pub fn action_for(principle: ArchitecturePrinciple) -> TodoAction {
    let (action, description, effort, dependencies, files): (&str, &str, &str, &[&str], &[&str]) =
        match principle {
            ArchitecturePrinciple::TestDrivenDevelopment => (
                "Implement test-driven development",
                "Create tests/ with pytest configuration and write failing tests before each feature",
                "2-3 days",
                &["pytest", "pytest-cov"],
                &["tests/", "pytest.ini", "requirements-dev.txt"],
            ),
            ArchitecturePrinciple::DuplicationAvoidance => (
                "Remove duplicated definitions",
                "Consolidate repeated functions, classes and imports into shared modules",
                "1-2 days",
                &[],
                &["app/", "app/common/"],
            ),
            ArchitecturePrinciple::IntegrationTests => (
                "Add integration tests",
                "Cover service boundaries with integration tests run against real dependencies",
                "2-3 days",
                &["pytest", "docker-compose"],
                &["tests/integration/", "docker-compose.test.yml"],
            ),
            ArchitecturePrinciple::SyntheticTestData => (
                "Generate synthetic test data",
                "Replace hard-coded fixtures with Faker-based factories",
                "1 day",
                &["faker"],
                &["tests/conftest.py", "tests/factories.py"],
            ),
            ArchitecturePrinciple::Scalability => (
                "Introduce scalability patterns",
                "Adopt async I/O and caching, pool database connections and declare replicas",
                "3-5 days",
                &["redis"],
                &["app/", "docker-compose.yml"],
            ),
        };

    TodoAction {
        priority: action_priority(principle),
        principle,
        action: action.to_string(),
        description: description.to_string(),
        estimated_effort: effort.to_string(),
        dependencies: dependencies.iter().map(|d| d.to_string()).collect(),
        files_to_modify: files.iter().map(|f| f.to_string()).collect(),
    }
}
