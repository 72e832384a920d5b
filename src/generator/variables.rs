//! Shared variable record: the union of every module's `Variables Configuration`.

use std::collections::HashSet;

use super::header::inject_after_public;
use super::ir::{Declaration, FieldDecl};
use super::placeholder;
use super::printer::{CppPrinter, Printer};
use crate::error::GeneratorError;
use crate::schema::{field_identifier, include_guard, scan_template, ModuleConfig, SettingSection};

/// Identifiers already declared on the variable record, in first-seen order.
///
/// Threaded through [`aggregate`] so repeated runs over the same module list
/// produce the same declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariableSet {
    seen: HashSet<String>,
    order: Vec<String>,
}

impl VariableSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `identifier`; returns `false` if it was already present.
    pub fn insert(&mut self, identifier: &str) -> bool {
        if self.seen.contains(identifier) {
            return false;
        }
        self.seen.insert(identifier.to_string());
        self.order.push(identifier.to_string());
        true
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.seen.contains(identifier)
    }

    /// Identifiers in insertion order.
    pub fn identifiers(&self) -> &[String] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Field declarations for variable settings not yet in `set`.
///
/// Modules are walked in the given order; each new field is tagged with the
/// first module that requested it.
pub fn aggregate(modules: &[ModuleConfig], set: &mut VariableSet) -> Vec<FieldDecl> {
    let mut fields = Vec::new();
    for module in modules {
        for setting in module.settings(SettingSection::Variables) {
            let name = field_identifier(&setting.name_path);
            if !set.insert(&name) {
                continue;
            }
            let description = setting.description.trim();
            let brief = if description.is_empty() {
                format!("@brief [Module: {}]", module.class_name)
            } else {
                format!("@brief [Module: {}] {description}", module.class_name)
            };
            fields.push(FieldDecl {
                doc: vec![brief],
                ty: setting.ty.clone(),
                name,
            });
        }
    }
    fields
}

/// Identity of the variable record, scraped from its template.
fn variable_record(template: &str, template_name: &str) -> Result<ModuleConfig, GeneratorError> {
    let scan = scan_template(template);
    // The record usually has no base class, so accept a bare `class X` line too
    let bare_class = || {
        template
            .lines()
            .map(str::trim_start)
            .find(|line| line.starts_with("class "))
            .and_then(|line| line.split_whitespace().nth(1))
            .map(|name| {
                name.chars()
                    .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
                    .collect::<String>()
            })
            .filter(|name| !name.is_empty())
    };
    let class_name = scan
        .class_name
        .or_else(bare_class)
        .ok_or_else(|| GeneratorError::MissingClassName {
            module: "variable".to_string(),
            template: template_name.to_string(),
        })?;
    let mut record = ModuleConfig::new(
        &class_name,
        &class_name,
        scan.parent_class_name.as_deref().unwrap_or_default(),
    );
    record.include_guard = include_guard(&scan.namespace, &class_name);
    record.namespace = scan.namespace;
    Ok(record)
}

/// Render the shared variable header from `template` and the modules' variable settings.
pub fn render_variables_header(
    modules: &[ModuleConfig],
    template: &str,
    template_name: &str,
) -> Result<String, GeneratorError> {
    let record = variable_record(template, template_name)?;
    placeholder::validate(template, template_name, &record)?;

    let mut set = VariableSet::new();
    let printer = CppPrinter;
    let block: String = aggregate(modules, &mut set)
        .into_iter()
        .map(|field| printer.declaration(&Declaration::Field(field), 1))
        .collect();

    let substituted = placeholder::substitute(template, &record);
    inject_after_public(&substituted, template_name, &block)
}
