#![allow(clippy::unwrap_used, clippy::expect_used)]

//! Unit tests for the schema linter

use crate::linter::{has_errors, lint_config, lint_module, LintIssue, LintSeverity};
use crate::schema::{ModuleConfig, SettingDescriptor, SettingSection};
use crate::settings::GeneratorSettings;
use std::fs;
use tempfile::TempDir;

fn module(section: SettingSection, settings: Vec<SettingDescriptor>) -> ModuleConfig {
    ModuleConfig::new("CMAES", "CMAES", "Optimizer").with_section(section, settings)
}

fn kinds<'a>(issues: &'a [LintIssue], kind: &str) -> Vec<&'a LintIssue> {
    issues.iter().filter(|i| i.kind == kind).collect()
}

#[test]
fn test_lint_clean_module() {
    let issues = lint_module(&module(
        SettingSection::Configuration,
        vec![SettingDescriptor::new(&["Population Size"], "int")
            .with_description("Samples per generation.")],
    ));
    assert!(issues.is_empty(), "unexpected issues: {issues:?}");
    assert!(!has_errors(&issues));
}

#[test]
fn test_lint_identifier_collision() {
    let issues = lint_module(&module(
        SettingSection::Configuration,
        vec![
            SettingDescriptor::new(&["Population Size"], "int").with_description("a"),
            SettingDescriptor::new(&["Population", "Size"], "int").with_description("b"),
        ],
    ));
    let collisions = kinds(&issues, "identifier_collision");
    assert_eq!(collisions.len(), 1);
    assert_eq!(collisions[0].severity, LintSeverity::Error);
    assert!(collisions[0].message.contains("_populationSize"));
    assert!(has_errors(&issues));
}

#[test]
fn test_lint_conditional_companion_collision() {
    let module = ModuleConfig::new("Normal", "Normal", "Univariate")
        .with_section(
            SettingSection::Conditional,
            vec![SettingDescriptor::new(&["Mean"], "double").with_description("Mean.")],
        )
        .with_section(
            SettingSection::Internal,
            vec![SettingDescriptor::new(&["Mean Conditional"], "std::string").with_description("x")],
        );
    let issues = lint_module(&module);
    assert_eq!(kinds(&issues, "identifier_collision").len(), 1);
}

#[test]
fn test_lint_variables_do_not_collide_with_class_fields() {
    let module = ModuleConfig::new("CMAES", "CMAES", "Optimizer")
        .with_section(
            SettingSection::Configuration,
            vec![SettingDescriptor::new(&["Lower Bound"], "double").with_description("x")],
        )
        .with_section(
            SettingSection::Variables,
            vec![SettingDescriptor::new(&["Lower Bound"], "double").with_description("x")],
        );
    assert!(kinds(&lint_module(&module), "identifier_collision").is_empty());
}

#[test]
fn test_lint_missing_type_and_description() {
    let issues = lint_module(&module(
        SettingSection::Configuration,
        vec![SettingDescriptor::new(&["Population Size"], "")],
    ));
    assert_eq!(kinds(&issues, "missing_type")[0].severity, LintSeverity::Error);
    assert_eq!(kinds(&issues, "missing_description")[0].severity, LintSeverity::Info);
    assert!(kinds(&issues, "missing_type")[0].suggestion.is_some());
}

#[test]
fn test_lint_empty_name() {
    let issues = lint_module(&module(
        SettingSection::Internal,
        vec![SettingDescriptor::new(&[" "], "int").with_description("x")],
    ));
    assert_eq!(kinds(&issues, "empty_name").len(), 1);
}

#[test]
fn test_lint_termination_without_criteria() {
    let issues = lint_module(&module(
        SettingSection::Termination,
        vec![SettingDescriptor::new(&["Max Generations"], "size_t").with_description("x")],
    ));
    assert_eq!(kinds(&issues, "missing_criteria").len(), 1);

    let issues = lint_module(&module(
        SettingSection::Termination,
        vec![SettingDescriptor::new(&["Max Generations"], "size_t")
            .with_description("x")
            .with_criteria("_k->_currentGeneration >= _maxGenerations")],
    ));
    assert!(kinds(&issues, "missing_criteria").is_empty());
}

#[test]
fn test_lint_criteria_outside_termination() {
    let issues = lint_module(&module(
        SettingSection::Configuration,
        vec![SettingDescriptor::new(&["Max Generations"], "size_t")
            .with_description("x")
            .with_criteria("true")],
    ));
    let found = kinds(&issues, "unexpected_criteria");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].severity, LintSeverity::Warning);
}

#[test]
fn test_lint_operation_without_function() {
    let issues = lint_module(&module(
        SettingSection::Operations,
        vec![
            SettingDescriptor::new(&["Evaluate"], "").with_description("x"),
            SettingDescriptor::new(&["Reset"], "")
                .with_description("x")
                .with_function("reset"),
        ],
    ));
    assert_eq!(kinds(&issues, "operation_missing_function").len(), 1);
    // Operations carry no type tag
    assert!(kinds(&issues, "missing_type").is_empty());
}

#[test]
fn test_lint_options() {
    let issues = lint_module(&module(
        SettingSection::Configuration,
        vec![
            SettingDescriptor::new(&["Mode"], "int")
                .with_description("x")
                .with_options(&["A", "B"]),
            SettingDescriptor::new(&["Strategy"], "std::string")
                .with_description("x")
                .with_options(&["Linear", "Quadratic", "Linear"]),
        ],
    ));
    let non_string = kinds(&issues, "options_on_non_string");
    assert_eq!(non_string.len(), 1);
    assert!(non_string[0].location.contains("Mode"));
    let duplicates = kinds(&issues, "duplicate_option");
    assert_eq!(duplicates.len(), 1);
    assert!(duplicates[0].message.contains("Linear"));
}

#[test]
fn test_lint_conditional_non_numeric() {
    let issues = lint_module(&module(
        SettingSection::Conditional,
        vec![
            SettingDescriptor::new(&["Mean"], "double").with_description("x"),
            SettingDescriptor::new(&["Label"], "std::string").with_description("x"),
        ],
    ));
    let found = kinds(&issues, "conditional_non_numeric");
    assert_eq!(found.len(), 1);
    assert!(found[0].location.contains("Label"));
}

#[test]
fn test_lint_config_reports_unknown_section() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("modules/solver/CMAES");
    fs::create_dir_all(&dir).unwrap();
    fs::write(
        dir.join("CMAES.hpp.base"),
        "class CMAES : public Optimizer\n{\n  public:\n};\n",
    )
    .unwrap();
    fs::write(
        dir.join("CMAES.config"),
        r#"{
            "Configuration Setings": [],
            "Configuration Settings": [
                {"Name": ["Population Size"], "Type": "int", "Description": "x"}
            ]
        }"#,
    )
    .unwrap();

    let issues = lint_config(&dir.join("CMAES.config"), &GeneratorSettings::default()).unwrap();
    let unknown = kinds(&issues, "unknown_section");
    assert_eq!(unknown.len(), 1);
    assert!(unknown[0].location.ends_with("Configuration Setings"));
    assert!(!has_errors(&issues));
}
