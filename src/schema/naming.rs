//! Identifier derivation for generated fields, include guards and diagnostic key paths.

use std::collections::HashMap;

use super::types::{ModuleConfig, SettingSection};
use crate::error::GeneratorError;

/// Suffix of the string companion field generated for each conditional variable.
pub const CONDITIONAL_SUFFIX: &str = "Conditional";

/// Derive the generated field name for a setting's JSON key path.
///
/// Path components are concatenated, every non-alphanumeric character is
/// dropped, the first letter is lower-cased and the result is prefixed with `_`.
///
/// ```
/// use modgen::schema::field_identifier;
///
/// let path = vec!["Experience Replay".to_string(), "Start Size".to_string()];
/// assert_eq!(field_identifier(&path), "_experienceReplayStartSize");
/// ```
pub fn field_identifier(name_path: &[String]) -> String {
    let joined: String = name_path
        .iter()
        .flat_map(|part| part.chars())
        .filter(|c| c.is_ascii_alphanumeric())
        .collect();

    let mut chars = joined.chars();
    match chars.next() {
        Some(first) => format!("_{}{}", first.to_ascii_lowercase(), chars.as_str()),
        None => "_".to_string(),
    }
}

/// Name of the string field holding the formula for a conditional variable.
pub fn conditional_identifier(name_path: &[String]) -> String {
    format!("{}{CONDITIONAL_SUFFIX}", field_identifier(name_path))
}

/// Include guard macro derived from the namespace chain and class name.
pub fn include_guard(namespace: &[String], class_name: &str) -> String {
    let scopes = namespace
        .iter()
        .map(|ns| ns.to_uppercase())
        .collect::<Vec<_>>()
        .join("_");
    format!("_{}_{}_", scopes, class_name.to_uppercase())
}

/// Upper-case the first character of a path segment (`solver` → `Solver`).
pub fn title_case(segment: &str) -> String {
    let mut chars = segment.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Render a JSON key path the way diagnostics print it, e.g. `["Solver"]["Population Size"]`.
pub fn display_path(prefix: Option<&str>, name_path: &[String]) -> String {
    prefix
        .into_iter()
        .chain(name_path.iter().map(String::as_str))
        .map(|key| format!("[\"{key}\"]"))
        .collect()
}

/// Fail if two settings of one module would generate the same field.
///
/// Class fields (configuration, internal, termination and conditional
/// settings, including each conditional companion) share one identifier
/// space. Variable fields live on the shared variable record and are checked
/// separately.
pub fn check_identifiers(module: &ModuleConfig) -> Result<(), GeneratorError> {
    let mut class_fields: HashMap<String, String> = HashMap::new();
    for section in SettingSection::CLASS_FIELDS {
        for setting in module.settings(section) {
            let shown = display_path(None, &setting.name_path);
            claim(module, &mut class_fields, field_identifier(&setting.name_path), &shown)?;
            if section == SettingSection::Conditional {
                claim(
                    module,
                    &mut class_fields,
                    conditional_identifier(&setting.name_path),
                    &shown,
                )?;
            }
        }
    }

    let mut variable_fields: HashMap<String, String> = HashMap::new();
    for setting in module.settings(SettingSection::Variables) {
        let shown = display_path(None, &setting.name_path);
        claim(
            module,
            &mut variable_fields,
            field_identifier(&setting.name_path),
            &shown,
        )?;
    }
    Ok(())
}

fn claim(
    module: &ModuleConfig,
    taken: &mut HashMap<String, String>,
    identifier: String,
    shown: &str,
) -> Result<(), GeneratorError> {
    if let Some(first) = taken.get(&identifier) {
        return Err(GeneratorError::IdentifierCollision {
            module: module.class_name.clone(),
            identifier,
            first: first.clone(),
            second: shown.to_string(),
        });
    }
    taken.insert(identifier, shown.to_string());
    Ok(())
}
