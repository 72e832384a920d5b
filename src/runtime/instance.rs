//! Configured module instances and the experiment state they read and write.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{json, Map, Value};

use super::convert::conforms;
use super::json::{is_empty, merge_json, set_path, take_path};
use super::registry::ModuleRegistry;
use crate::error::ConfigError;
use crate::schema::{display_path, field_identifier, ModuleConfig, SettingDescriptor, SettingSection, TypeFamily};

/// Experiment-wide state shared by every module being configured (`_k`).
#[derive(Debug)]
pub struct ExperimentContext<'r> {
    pub registry: &'r ModuleRegistry,
    /// The experiment's configuration; `Variables` and `Solver` are read from here.
    pub js: Value,
    /// Per-variable fields keyed by field identifier.
    pub variables: Vec<Map<String, Value>>,
    /// Set once the experiment has run; solver settings are then left untouched.
    pub initialized: bool,
}

impl<'r> ExperimentContext<'r> {
    pub fn new(registry: &'r ModuleRegistry, js: Value) -> Self {
        ExperimentContext {
            registry,
            js,
            variables: Vec::new(),
            initialized: false,
        }
    }
}

/// Stored value of one generated field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Scalars, strings, containers, samples and generator ranges.
    Json(Value),
    /// A nested polymorphic module.
    Module(Box<ModuleInstance>),
    /// A vector of nested polymorphic modules.
    Modules(Vec<ModuleInstance>),
    /// The root experiment handle: kept, never configured or serialized.
    Experiment(Value),
    /// A conditional variable: a literal value or a formula naming another property.
    Conditional { value: f64, formula: String },
}

/// One configured module: its descriptor chain (derived first) and field values.
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleInstance {
    chain: Vec<Arc<ModuleConfig>>,
    fields: HashMap<String, FieldValue>,
    has_conditional_variables: bool,
    termination_criteria: Vec<String>,
}

impl ModuleInstance {
    pub(crate) fn new(chain: Vec<Arc<ModuleConfig>>) -> Self {
        ModuleInstance {
            chain,
            fields: HashMap::new(),
            has_conditional_variables: false,
            termination_criteria: Vec::new(),
        }
    }

    fn leaf(&self) -> Option<&ModuleConfig> {
        self.chain.first().map(Arc::as_ref)
    }

    /// `"Type"` discriminator of the most derived class.
    pub fn module_type(&self) -> &str {
        self.leaf().map(|m| m.module_type.as_str()).unwrap_or_default()
    }

    pub fn class_name(&self) -> &str {
        self.leaf().map(|m| m.class_name.as_str()).unwrap_or_default()
    }

    /// Field value by generated identifier (`_populationSize`).
    pub fn field(&self, identifier: &str) -> Option<&FieldValue> {
        self.fields.get(identifier)
    }

    pub fn set_field(&mut self, identifier: &str, value: FieldValue) {
        self.fields.insert(identifier.to_string(), value);
    }

    pub fn has_conditional_variables(&self) -> bool {
        self.has_conditional_variables
    }

    /// Messages recorded by satisfied termination criteria.
    pub fn termination_criteria(&self) -> &[String] {
        &self.termination_criteria
    }

    /// Consume this module's settings from `js`.
    ///
    /// Each class in the chain consumes internal, configuration, termination
    /// and conditional settings, then its per-variable settings from the
    /// experiment, then checks solver compatibility. Consumed keys are erased;
    /// anything left besides `"Type"` is rejected.
    pub fn set_configuration(
        &mut self,
        js: &mut Value,
        ctx: &mut ExperimentContext<'_>,
    ) -> Result<(), ConfigError> {
        let chain = self.chain.clone();
        for level in &chain {
            for section in SettingSection::CONSUME_ORDER {
                for setting in level.settings(section) {
                    self.consume(level, section, setting, js, ctx)?;
                }
            }
            consume_variables(level, ctx)?;
            check_compatible_solver(level, ctx)?;
        }

        take_path(js, &["Type".to_string()]);
        if !is_empty(js) {
            return Err(ConfigError::UnrecognizedSettings {
                module: self.class_name().to_string(),
                leftover: serde_json::to_string_pretty(js).unwrap_or_default(),
            });
        }
        Ok(())
    }

    fn consume(
        &mut self,
        level: &ModuleConfig,
        section: SettingSection,
        setting: &SettingDescriptor,
        js: &mut Value,
        ctx: &mut ExperimentContext<'_>,
    ) -> Result<(), ConfigError> {
        let shown = display_path(level.category_key().as_deref(), &setting.name_path);
        let Some(value) = take_path(js, &setting.name_path) else {
            if section.is_mandatory() {
                return Err(ConfigError::MissingSetting {
                    module: level.class_name.clone(),
                    path: shown,
                });
            }
            return Ok(());
        };

        let identifier = field_identifier(&setting.name_path);
        let field = if section == SettingSection::Conditional {
            match value {
                Value::String(formula) => {
                    self.has_conditional_variables = true;
                    FieldValue::Conditional { value: 0.0, formula }
                }
                other => match other.as_f64() {
                    Some(value) => FieldValue::Conditional {
                        value,
                        formula: String::new(),
                    },
                    None => return Err(mismatch(level, &shown, "double")),
                },
            }
        } else {
            match TypeFamily::classify(&setting.ty, ctx.registry.root_namespace()) {
                TypeFamily::Sample => FieldValue::Json(value),
                TypeFamily::ModuleVector { element } => {
                    let Value::Array(items) = value else {
                        return Err(mismatch(level, &shown, &setting.ty));
                    };
                    if is_experiment_type(&element, ctx.registry.root_namespace()) {
                        FieldValue::Experiment(Value::Array(items))
                    } else {
                        let modules = items
                            .into_iter()
                            .map(|mut item| configure_nested(&mut item, ctx))
                            .collect::<Result<Vec<_>, _>>()?;
                        FieldValue::Modules(modules)
                    }
                }
                TypeFamily::Module { is_experiment: true, .. } => FieldValue::Experiment(value),
                TypeFamily::Module { is_solver, .. } => {
                    if is_solver && ctx.initialized {
                        return Ok(());
                    }
                    let mut value = value;
                    FieldValue::Module(Box::new(configure_nested(&mut value, ctx)?))
                }
                TypeFamily::RandomGenerator => {
                    if !value.is_string() {
                        return Err(mismatch(level, &shown, &setting.ty));
                    }
                    FieldValue::Json(value)
                }
                TypeFamily::Plain => FieldValue::Json(convert_plain(level, setting, value, &shown)?),
            }
        };
        self.fields.insert(identifier, field);
        Ok(())
    }

    /// Write every stored field back under its key path and stamp `"Type"`.
    pub fn get_configuration(&self, js: &mut Value, ctx: &mut ExperimentContext<'_>) {
        for level in &self.chain {
            for section in SettingSection::CLASS_FIELDS {
                for setting in level.settings(section) {
                    let identifier = field_identifier(&setting.name_path);
                    let value = match self.fields.get(&identifier) {
                        Some(FieldValue::Json(value)) => value.clone(),
                        Some(FieldValue::Module(module)) => {
                            let mut nested = Value::Object(Map::new());
                            module.get_configuration(&mut nested, ctx);
                            nested
                        }
                        Some(FieldValue::Modules(modules)) => Value::Array(
                            modules
                                .iter()
                                .map(|module| {
                                    let mut nested = Value::Object(Map::new());
                                    module.get_configuration(&mut nested, ctx);
                                    nested
                                })
                                .collect(),
                        ),
                        Some(FieldValue::Conditional { formula, .. }) if !formula.is_empty() => {
                            Value::String(formula.clone())
                        }
                        Some(FieldValue::Conditional { value, .. }) => json!(value),
                        Some(FieldValue::Experiment(_)) | None => continue,
                    };
                    set_path(js, &setting.name_path, value);
                }
            }
            write_variables(level, ctx);
        }
        set_path(js, &["Type".to_string()], Value::String(self.module_type().to_string()));
    }

    /// Fill absent keys of `js` from each class's `Module Defaults`, derived class first.
    pub fn apply_module_defaults(&self, js: &mut Value) {
        for level in &self.chain {
            if let Some(defaults) = &level.module_defaults {
                merge_json(js, &Value::Object(defaults.clone()));
            }
        }
    }

    /// Fill absent keys of every experiment variable from each class's `Variable Defaults`.
    pub fn apply_variable_defaults(&self, ctx: &mut ExperimentContext<'_>) {
        let Some(Value::Array(items)) = ctx.js.get_mut("Variables") else {
            return;
        };
        for level in &self.chain {
            if let Some(defaults) = &level.variable_defaults {
                let defaults = Value::Object(defaults.clone());
                for item in items.iter_mut() {
                    merge_json(item, &defaults);
                }
            }
        }
    }

    /// Evaluate every termination criterion in the chain.
    ///
    /// `evaluate` receives the criterion text and the field's current value.
    /// Every satisfied criterion records a message; the result is their OR.
    pub fn check_termination<F>(&mut self, mut evaluate: F) -> bool
    where
        F: FnMut(&str, &Value) -> bool,
    {
        let mut finished = false;
        for level in &self.chain {
            let category = level.category_key();
            for setting in level.settings(SettingSection::Termination) {
                let Some(criteria) = setting.criteria.as_deref().filter(|c| !c.trim().is_empty())
                else {
                    continue;
                };
                let value = match self.fields.get(&field_identifier(&setting.name_path)) {
                    Some(FieldValue::Json(value)) => value.clone(),
                    _ => Value::Null,
                };
                if evaluate(criteria.trim(), &value) {
                    self.termination_criteria.push(format!(
                        "{} = {value}.",
                        display_path(category.as_deref(), &setting.name_path)
                    ));
                    finished = true;
                }
            }
        }
        finished
    }

    /// Dispatch a named operation to the first class in the chain that declares it.
    pub fn run_operation(
        &mut self,
        registry: &ModuleRegistry,
        operation: &str,
        sample: &mut Value,
    ) -> Result<(), ConfigError> {
        let callback = self.chain.iter().find_map(|level| {
            level
                .settings(SettingSection::Operations)
                .iter()
                .filter(|op| op.leaf_name() == operation)
                .find_map(|op| registry.operation(&level.class_name, op.function.as_deref()?))
        });
        match callback {
            Some(callback) => {
                callback(self, sample);
                Ok(())
            }
            None => Err(ConfigError::UnknownOperation {
                operation: operation.to_string(),
                module: self.class_name().to_string(),
            }),
        }
    }

    /// Mutable access to the value of the conditional variable named `property`.
    ///
    /// Only the leaf module's own conditional variables are addressable, as
    /// with the generated `getPropertyPointer`.
    pub fn property_mut(&mut self, property: &str) -> Result<&mut f64, ConfigError> {
        let unknown = || ConfigError::UnknownProperty {
            property: property.to_string(),
            module: self.class_name().to_string(),
        };
        let identifier = self
            .chain
            .first()
            .into_iter()
            .flat_map(|level| level.settings(SettingSection::Conditional))
            .find(|setting| setting.leaf_name() == property)
            .map(|setting| field_identifier(&setting.name_path));
        let Some(identifier) = identifier else {
            return Err(unknown());
        };
        let error = unknown();

        let slot = self
            .fields
            .entry(identifier)
            .or_insert_with(|| FieldValue::Conditional {
                value: 0.0,
                formula: String::new(),
            });
        match slot {
            FieldValue::Conditional { value, .. } => Ok(value),
            _ => Err(error),
        }
    }
}

fn mismatch(level: &ModuleConfig, shown: &str, expected: &str) -> ConfigError {
    ConfigError::TypeMismatch {
        module: level.class_name.clone(),
        path: shown.to_string(),
        expected: expected.to_string(),
    }
}

fn is_experiment_type(element: &str, root: &str) -> bool {
    element.trim_end_matches('*').trim() == format!("{root}::Experiment")
}

/// Create, default and configure a nested module from its own JSON subtree.
fn configure_nested(
    js: &mut Value,
    ctx: &mut ExperimentContext<'_>,
) -> Result<ModuleInstance, ConfigError> {
    let mut module = ctx.registry.create(js)?;
    module.apply_variable_defaults(ctx);
    module.apply_module_defaults(js);
    module.set_configuration(js, ctx)?;
    Ok(module)
}

fn convert_plain(
    level: &ModuleConfig,
    setting: &SettingDescriptor,
    value: Value,
    shown: &str,
) -> Result<Value, ConfigError> {
    if !conforms(&setting.ty, &value) {
        return Err(mismatch(level, shown, &setting.ty));
    }
    let options = setting.option_values();
    if let (false, Some(chosen)) = (options.is_empty(), value.as_str()) {
        if !options.contains(&chosen) {
            return Err(ConfigError::InvalidOption {
                module: level.class_name.clone(),
                path: shown.to_string(),
                value: chosen.to_string(),
                options: options.iter().map(|o| o.to_string()).collect(),
            });
        }
    }
    Ok(value)
}

fn consume_variables(level: &ModuleConfig, ctx: &mut ExperimentContext<'_>) -> Result<(), ConfigError> {
    let settings = level.settings(SettingSection::Variables);
    let Some(Value::Array(items)) = ctx.js.get_mut("Variables") else {
        return Ok(());
    };
    if settings.is_empty() {
        return Ok(());
    }
    if ctx.variables.len() < items.len() {
        ctx.variables.resize_with(items.len(), Map::new);
    }

    for (i, (item, record)) in items.iter_mut().zip(ctx.variables.iter_mut()).enumerate() {
        for setting in settings {
            let shown = format!("[\"Variables\"][{i}]{}", display_path(None, &setting.name_path));
            let Some(value) = take_path(item, &setting.name_path) else {
                return Err(ConfigError::MissingSetting {
                    module: level.class_name.clone(),
                    path: shown,
                });
            };
            let value = convert_plain(level, setting, value, &shown)?;
            record.insert(field_identifier(&setting.name_path), value);
        }
    }
    Ok(())
}

fn write_variables(level: &ModuleConfig, ctx: &mut ExperimentContext<'_>) {
    let settings = level.settings(SettingSection::Variables);
    if settings.is_empty() || ctx.variables.is_empty() {
        return;
    }
    if !ctx.js.get("Variables").is_some_and(Value::is_array) {
        set_path(&mut ctx.js, &["Variables".to_string()], Value::Array(Vec::new()));
    }
    let Some(Value::Array(items)) = ctx.js.get_mut("Variables") else {
        return;
    };
    if items.len() < ctx.variables.len() {
        items.resize(ctx.variables.len(), Value::Object(Map::new()));
    }
    for (item, record) in items.iter_mut().zip(ctx.variables.iter()) {
        for setting in settings {
            if let Some(value) = record.get(&field_identifier(&setting.name_path)) {
                set_path(item, &setting.name_path, value.clone());
            }
        }
    }
}

fn normalize_solver(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

fn check_compatible_solver(level: &ModuleConfig, ctx: &ExperimentContext<'_>) -> Result<(), ConfigError> {
    let solvers = level.compatible_solvers();
    if solvers.is_empty() {
        return Ok(());
    }
    let declared = ctx
        .js
        .get("Solver")
        .and_then(|solver| solver.get("Type"))
        .and_then(Value::as_str)
        .unwrap_or_default();
    let normalized = normalize_solver(declared);
    if solvers
        .iter()
        .any(|candidate| normalized.starts_with(&normalize_solver(candidate)))
    {
        Ok(())
    } else {
        Err(ConfigError::IncompatibleSolver {
            solver: declared.to_string(),
            problem: level.module_type.clone(),
        })
    }
}
