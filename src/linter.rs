//! # Schema Linter Module
//!
//! Non-fatal authoring checks over module descriptors. The generator only
//! aborts on mistakes it cannot compile around; the linter reports the rest
//! before they surface as confusing C++ or runtime errors.
//!
//! ## Checks Performed
//!
//! 1. **Identifier collisions** - two settings deriving the same field name
//! 2. **Missing type** - a setting without a `Type` tag
//! 3. **Empty name** - a setting whose `Name` path is empty or blank
//! 4. **Missing description** - undocumented settings produce bare Doxygen
//! 5. **Termination criteria** - criteria without `Criteria`, or `Criteria` elsewhere
//! 6. **Operations** - operations without a `Function` callback
//! 7. **Options** - options on a non-string setting, duplicate option values
//! 8. **Conditional variables** - non-numeric conditional types
//! 9. **Unknown sections** - descriptor keys that match no schema section
//!
//! ## Usage
//!
//! ```rust,no_run
//! use modgen::linter::{lint_config, print_lint_issues};
//! use modgen::settings::GeneratorSettings;
//! use std::path::Path;
//!
//! let issues = lint_config(
//!     Path::new("modules/solver/optimizer/CMAES/CMAES.config"),
//!     &GeneratorSettings::default(),
//! )?;
//! print_lint_issues(&issues);
//! # Ok::<(), modgen::error::GeneratorError>(())
//! ```

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::Path;

use tracing::warn;

use crate::error::GeneratorError;
use crate::schema::{
    conditional_identifier, display_path, field_identifier, load_module, ModuleConfig,
    SettingDescriptor, SettingSection,
};
use crate::settings::GeneratorSettings;

#[cfg(test)]
mod tests;

const ALL_SECTIONS: [SettingSection; 6] = [
    SettingSection::Configuration,
    SettingSection::Internal,
    SettingSection::Termination,
    SettingSection::Variables,
    SettingSection::Conditional,
    SettingSection::Operations,
];

const NUMERIC_TYPES: [&str; 8] = [
    "double", "float", "int", "size_t", "long", "unsigned int", "unsigned long", "long double",
];

/// Severity level for lint issues
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LintSeverity {
    /// Error - generation fails or the generated code cannot work
    Error,
    /// Warning - generation succeeds but the result is likely wrong
    Warning,
    /// Info - documentation and hygiene
    Info,
}

impl fmt::Display for LintSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LintSeverity::Error => write!(f, "error"),
            LintSeverity::Warning => write!(f, "warning"),
            LintSeverity::Info => write!(f, "info"),
        }
    }
}

/// A lint issue found in a module descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LintIssue {
    /// Where the issue occurred (e.g. `CMAES:Configuration Settings["Population Size"]`)
    pub location: String,
    pub severity: LintSeverity,
    /// Machine-readable kind (e.g. `missing_type`)
    pub kind: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl LintIssue {
    pub fn new(
        location: impl Into<String>,
        severity: LintSeverity,
        kind: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        LintIssue {
            location: location.into(),
            severity,
            kind: kind.into(),
            message: message.into(),
            suggestion: None,
        }
    }

    /// Add a suggestion for fixing the issue
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

/// Load a descriptor (with its sibling template) and lint it.
pub fn lint_config(
    config: &Path,
    settings: &GeneratorSettings,
) -> Result<Vec<LintIssue>, GeneratorError> {
    let module = load_module(config, None, settings)?;
    let issues = lint_module(&module);
    for issue in issues.iter().filter(|i| i.severity == LintSeverity::Warning) {
        warn!(
            config = %config.display(),
            kind = %issue.kind,
            location = %issue.location,
            "{}",
            issue.message
        );
    }
    Ok(issues)
}

/// Lint an already loaded module.
pub fn lint_module(module: &ModuleConfig) -> Vec<LintIssue> {
    let mut issues = Vec::new();

    lint_identifiers(module, &mut issues);
    for section in ALL_SECTIONS {
        for setting in module.settings(section) {
            lint_setting(module, section, setting, &mut issues);
        }
    }

    for key in &module.unknown_sections {
        issues.push(
            LintIssue::new(
                format!("{}:{key}", module.class_name),
                LintSeverity::Warning,
                "unknown_section",
                format!("Descriptor key '{key}' is not a schema section and is ignored"),
            )
            .with_suggestion("Check the spelling against the schema section names"),
        );
    }
    issues
}

fn location(module: &ModuleConfig, section: SettingSection, setting: &SettingDescriptor) -> String {
    format!(
        "{}:{}{}",
        module.class_name,
        section.json_key(),
        display_path(None, &setting.name_path)
    )
}

/// Report every collision, not only the first one the generator would abort on.
fn lint_identifiers(module: &ModuleConfig, issues: &mut Vec<LintIssue>) {
    let mut class_fields: HashMap<String, String> = HashMap::new();
    let mut variable_fields: HashMap<String, String> = HashMap::new();

    for section in ALL_SECTIONS {
        if section == SettingSection::Operations {
            continue;
        }
        let taken = if section == SettingSection::Variables {
            &mut variable_fields
        } else {
            &mut class_fields
        };
        for setting in module.settings(section) {
            let shown = display_path(None, &setting.name_path);
            let mut identifiers = vec![field_identifier(&setting.name_path)];
            if section == SettingSection::Conditional {
                identifiers.push(conditional_identifier(&setting.name_path));
            }
            for identifier in identifiers {
                match taken.get(&identifier) {
                    Some(first) => issues.push(
                        LintIssue::new(
                            location(module, section, setting),
                            LintSeverity::Error,
                            "identifier_collision",
                            format!("{first} and {shown} both map to field '{identifier}'"),
                        )
                        .with_suggestion("Rename one of the settings"),
                    ),
                    None => {
                        taken.insert(identifier, shown.clone());
                    }
                }
            }
        }
    }
}

fn lint_setting(
    module: &ModuleConfig,
    section: SettingSection,
    setting: &SettingDescriptor,
    issues: &mut Vec<LintIssue>,
) {
    let loc = location(module, section, setting);

    if setting.name_path.iter().all(|part| part.trim().is_empty()) {
        issues.push(LintIssue::new(
            &loc,
            LintSeverity::Error,
            "empty_name",
            "Setting has an empty 'Name' path",
        ));
    }

    if section == SettingSection::Operations {
        if setting.function.as_deref().map_or(true, |f| f.trim().is_empty()) {
            issues.push(
                LintIssue::new(
                    &loc,
                    LintSeverity::Error,
                    "operation_missing_function",
                    "Operation has no 'Function' to dispatch to",
                )
                .with_suggestion("Add \"Function\": \"<member function name>\""),
            );
        }
    } else if setting.ty.trim().is_empty() {
        issues.push(
            LintIssue::new(
                &loc,
                LintSeverity::Error,
                "missing_type",
                "Setting has no 'Type'",
            )
            .with_suggestion("Add a target type such as \"double\" or \"std::string\""),
        );
    }

    if setting.description.trim().is_empty() {
        issues.push(LintIssue::new(
            &loc,
            LintSeverity::Info,
            "missing_description",
            "Setting has no 'Description'; the generated field is documented by its key only",
        ));
    }

    match (section, &setting.criteria) {
        (SettingSection::Termination, None) => issues.push(
            LintIssue::new(
                &loc,
                LintSeverity::Error,
                "missing_criteria",
                "Termination criterion has no 'Criteria' expression",
            )
            .with_suggestion("Add \"Criteria\": \"<boolean expression>\""),
        ),
        (SettingSection::Termination, _) | (_, None) => {}
        (_, Some(_)) => issues.push(
            LintIssue::new(
                &loc,
                LintSeverity::Warning,
                "unexpected_criteria",
                format!(
                    "'Criteria' is only evaluated in '{}' and is ignored here",
                    SettingSection::Termination.json_key()
                ),
            )
            .with_suggestion("Move the setting to 'Termination Criteria' or drop 'Criteria'"),
        ),
    }

    if !setting.options.is_empty() {
        if setting.ty.trim() != "std::string" {
            issues.push(LintIssue::new(
                &loc,
                LintSeverity::Warning,
                "options_on_non_string",
                format!(
                    "'Options' are only checked for std::string settings, not '{}'",
                    setting.ty
                ),
            ));
        }
        let mut seen = HashSet::new();
        for value in setting.option_values() {
            if !seen.insert(value) {
                issues.push(LintIssue::new(
                    &loc,
                    LintSeverity::Warning,
                    "duplicate_option",
                    format!("Option '{value}' is listed more than once"),
                ));
            }
        }
    }

    if section == SettingSection::Conditional && !NUMERIC_TYPES.contains(&setting.ty.trim()) {
        issues.push(
            LintIssue::new(
                &loc,
                LintSeverity::Warning,
                "conditional_non_numeric",
                format!(
                    "Conditional variables are stored as double; declared type '{}' is ignored",
                    setting.ty
                ),
            )
            .with_suggestion("Declare the conditional variable as \"double\""),
        );
    }
}

/// Whether any issue is an error.
pub fn has_errors(issues: &[LintIssue]) -> bool {
    issues.iter().any(|i| i.severity == LintSeverity::Error)
}

/// Print lint issues grouped by severity
pub fn print_lint_issues(issues: &[LintIssue]) {
    if issues.is_empty() {
        println!("✅ No lint issues found!");
        return;
    }

    let count = |severity| issues.iter().filter(|i| i.severity == severity).count();
    println!("\n📋 Lint Results:");
    println!(
        "   {} error(s), {} warning(s), {} info(s)\n",
        count(LintSeverity::Error),
        count(LintSeverity::Warning),
        count(LintSeverity::Info)
    );

    let groups = [
        (LintSeverity::Error, "❌ Errors (must fix):"),
        (LintSeverity::Warning, "⚠️  Warnings (should fix):"),
        (LintSeverity::Info, "ℹ️  Info (best practices):"),
    ];
    for (severity, heading) in groups {
        let group: Vec<_> = issues.iter().filter(|i| i.severity == severity).collect();
        if group.is_empty() {
            continue;
        }
        println!("{heading}");
        for issue in group {
            println!("   [{}] {}", issue.kind, issue.location);
            println!("      {}", issue.message);
            if let Some(suggestion) = &issue.suggestion {
                println!("      💡 Suggestion: {suggestion}");
            }
        }
        println!();
    }
}
