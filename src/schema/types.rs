use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

use super::naming::{include_guard, title_case};

/// Schema section a setting is declared in.
///
/// The section decides where the generated field lives, whether the setting
/// is mandatory, and which generated method handles it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingSection {
    /// User-facing, mandatory settings.
    Configuration,
    /// Implementation-internal settings; optional but still serialized.
    Internal,
    /// Settings that end a run when their `Criteria` holds.
    Termination,
    /// Per-variable settings stored on the shared variable record.
    Variables,
    /// Numeric settings that may also be given as a formula string.
    Conditional,
    /// Named operations dispatched by `runOperation`.
    Operations,
}

impl SettingSection {
    /// Sections whose entries become fields of the module class itself.
    pub const CLASS_FIELDS: [SettingSection; 4] = [
        SettingSection::Configuration,
        SettingSection::Internal,
        SettingSection::Termination,
        SettingSection::Conditional,
    ];

    /// Order in which `setConfiguration` consumes class-level settings.
    pub const CONSUME_ORDER: [SettingSection; 4] = [
        SettingSection::Internal,
        SettingSection::Configuration,
        SettingSection::Termination,
        SettingSection::Conditional,
    ];

    /// Key of the section inside a `.config` descriptor.
    pub fn json_key(self) -> &'static str {
        match self {
            SettingSection::Configuration => "Configuration Settings",
            SettingSection::Internal => "Internal Settings",
            SettingSection::Termination => "Termination Criteria",
            SettingSection::Variables => "Variables Configuration",
            SettingSection::Conditional => "Conditional Variables",
            SettingSection::Operations => "Available Operations",
        }
    }

    /// Whether a missing value is a fatal configuration error.
    pub fn is_mandatory(self) -> bool {
        matches!(
            self,
            SettingSection::Configuration
                | SettingSection::Termination
                | SettingSection::Variables
                | SettingSection::Conditional
        )
    }
}

/// One legal value of an enumerated setting.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum SettingOption {
    /// Bare string form: `"Options": ["Linear", "Quadratic"]`.
    Plain(String),
    /// Documented form: `{"Value": "Linear", "Description": "..."}`.
    Described {
        #[serde(rename = "Value")]
        value: String,
        #[serde(rename = "Description", default)]
        description: String,
    },
}

impl SettingOption {
    /// The accepted string value.
    pub fn value(&self) -> &str {
        match self {
            SettingOption::Plain(value) => value,
            SettingOption::Described { value, .. } => value,
        }
    }
}

/// One entry of any settings section.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SettingDescriptor {
    /// Ordered JSON keys addressing the value, outermost first.
    #[serde(rename = "Name", deserialize_with = "deserialize_name_path")]
    pub name_path: Vec<String>,
    /// Target-language type tag, e.g. `int` or `std::vector<korali::Solver*>`.
    #[serde(rename = "Type", default)]
    pub ty: String,
    #[serde(rename = "Description", default)]
    pub description: String,
    /// Closed set of accepted string values.
    #[serde(rename = "Options", default)]
    pub options: Vec<SettingOption>,
    /// Boolean expression text (termination criteria only).
    #[serde(rename = "Criteria", default)]
    pub criteria: Option<String>,
    /// Callback name (available operations only).
    #[serde(rename = "Function", default)]
    pub function: Option<String>,
}

impl SettingDescriptor {
    /// Build a descriptor from a key path and a type tag.
    pub fn new(name_path: &[&str], ty: &str) -> Self {
        SettingDescriptor {
            name_path: name_path.iter().map(|s| s.to_string()).collect(),
            ty: ty.to_string(),
            description: String::new(),
            options: Vec::new(),
            criteria: None,
            function: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_options(mut self, options: &[&str]) -> Self {
        self.options = options
            .iter()
            .map(|o| SettingOption::Plain(o.to_string()))
            .collect();
        self
    }

    pub fn with_criteria(mut self, criteria: impl Into<String>) -> Self {
        self.criteria = Some(criteria.into());
        self
    }

    pub fn with_function(mut self, function: impl Into<String>) -> Self {
        self.function = Some(function.into());
        self
    }

    /// Accepted option values, in declaration order.
    pub fn option_values(&self) -> Vec<&str> {
        self.options.iter().map(SettingOption::value).collect()
    }

    /// First path component; names operations and conditional properties.
    pub fn leaf_name(&self) -> &str {
        self.name_path.first().map(String::as_str).unwrap_or_default()
    }
}

fn deserialize_name_path<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(name) => vec![name],
        OneOrMany::Many(path) => path,
    })
}

/// Explicit identity block of a descriptor, used when the template cannot be scanned.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ModuleData {
    #[serde(rename = "Class Name", default)]
    pub class_name: Option<String>,
    #[serde(rename = "Parent Class Name", default)]
    pub parent_class_name: Option<String>,
    #[serde(rename = "Namespace", default)]
    pub namespace: Option<Vec<String>>,
    /// Overrides the directory-derived discriminator. `Option Name` is the legacy spelling.
    #[serde(rename = "Module Type", alias = "Option Name", default)]
    pub module_type: Option<String>,
}

/// Raw contents of a `.config` module descriptor.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModuleDescriptor {
    #[serde(rename = "Module Data", default)]
    pub module_data: Option<ModuleData>,
    #[serde(rename = "Configuration Settings", default)]
    pub configuration_settings: Option<Vec<SettingDescriptor>>,
    #[serde(rename = "Internal Settings", default)]
    pub internal_settings: Option<Vec<SettingDescriptor>>,
    #[serde(rename = "Termination Criteria", default)]
    pub termination_criteria: Option<Vec<SettingDescriptor>>,
    #[serde(rename = "Variables Configuration", default)]
    pub variables_configuration: Option<Vec<SettingDescriptor>>,
    #[serde(rename = "Conditional Variables", default)]
    pub conditional_variables: Option<Vec<SettingDescriptor>>,
    #[serde(rename = "Compatible Solvers", default)]
    pub compatible_solvers: Option<Vec<String>>,
    #[serde(rename = "Available Operations", default)]
    pub available_operations: Option<Vec<SettingDescriptor>>,
    #[serde(rename = "Module Defaults", default)]
    pub module_defaults: Option<Map<String, Value>>,
    #[serde(rename = "Variable Defaults", default)]
    pub variable_defaults: Option<Map<String, Value>>,
    /// Top-level keys that are not schema sections.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Fully resolved description of one generated module.
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleConfig {
    /// Module directory name.
    pub name: String,
    pub class_name: String,
    /// Empty when the class has no generated parent to delegate to.
    pub parent_class_name: String,
    /// Enclosing scopes, outermost first.
    pub namespace: Vec<String>,
    /// Runtime `"Type"` discriminator, e.g. `solver/optimizer/CMAES`.
    pub module_type: String,
    /// Module directory relative to the parent of the module root.
    pub relative_path: String,
    pub include_guard: String,
    pub configuration_settings: Option<Vec<SettingDescriptor>>,
    pub internal_settings: Option<Vec<SettingDescriptor>>,
    pub termination_criteria: Option<Vec<SettingDescriptor>>,
    pub variables_configuration: Option<Vec<SettingDescriptor>>,
    pub conditional_variables: Option<Vec<SettingDescriptor>>,
    pub compatible_solvers: Option<Vec<String>>,
    pub available_operations: Option<Vec<SettingDescriptor>>,
    pub module_defaults: Option<Map<String, Value>>,
    pub variable_defaults: Option<Map<String, Value>>,
    /// Descriptor keys that matched no schema section.
    pub unknown_sections: Vec<String>,
}

impl ModuleConfig {
    /// Create a module with no namespace and no schema sections.
    ///
    /// The module type defaults to the module name.
    pub fn new(name: &str, class_name: &str, parent_class_name: &str) -> Self {
        ModuleConfig {
            name: name.to_string(),
            class_name: class_name.to_string(),
            parent_class_name: parent_class_name.to_string(),
            namespace: Vec::new(),
            module_type: name.to_string(),
            relative_path: name.to_string(),
            include_guard: include_guard(&[], class_name),
            configuration_settings: None,
            internal_settings: None,
            termination_criteria: None,
            variables_configuration: None,
            conditional_variables: None,
            compatible_solvers: None,
            available_operations: None,
            module_defaults: None,
            variable_defaults: None,
            unknown_sections: Vec::new(),
        }
    }

    /// Set the namespace chain and refresh the include guard.
    pub fn with_namespace(mut self, namespace: &[&str]) -> Self {
        self.namespace = namespace.iter().map(|s| s.to_string()).collect();
        self.include_guard = include_guard(&self.namespace, &self.class_name);
        self
    }

    pub fn with_module_type(mut self, module_type: &str) -> Self {
        self.module_type = module_type.to_string();
        self
    }

    /// Attach (or replace) one settings section.
    pub fn with_section(mut self, section: SettingSection, settings: Vec<SettingDescriptor>) -> Self {
        *self.section_slot(section) = Some(settings);
        self
    }

    pub fn with_compatible_solvers(mut self, solvers: &[&str]) -> Self {
        self.compatible_solvers = Some(solvers.iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn with_module_defaults(mut self, defaults: Value) -> Self {
        self.module_defaults = defaults.as_object().cloned();
        self
    }

    pub fn with_variable_defaults(mut self, defaults: Value) -> Self {
        self.variable_defaults = defaults.as_object().cloned();
        self
    }

    fn section_slot(&mut self, section: SettingSection) -> &mut Option<Vec<SettingDescriptor>> {
        match section {
            SettingSection::Configuration => &mut self.configuration_settings,
            SettingSection::Internal => &mut self.internal_settings,
            SettingSection::Termination => &mut self.termination_criteria,
            SettingSection::Variables => &mut self.variables_configuration,
            SettingSection::Conditional => &mut self.conditional_variables,
            SettingSection::Operations => &mut self.available_operations,
        }
    }

    fn section_ref(&self, section: SettingSection) -> &Option<Vec<SettingDescriptor>> {
        match section {
            SettingSection::Configuration => &self.configuration_settings,
            SettingSection::Internal => &self.internal_settings,
            SettingSection::Termination => &self.termination_criteria,
            SettingSection::Variables => &self.variables_configuration,
            SettingSection::Conditional => &self.conditional_variables,
            SettingSection::Operations => &self.available_operations,
        }
    }

    /// Entries of a section; empty when the section is absent.
    pub fn settings(&self, section: SettingSection) -> &[SettingDescriptor] {
        self.section_ref(section).as_deref().unwrap_or_default()
    }

    /// Whether the descriptor declares the section at all (even if empty).
    pub fn has_section(&self, section: SettingSection) -> bool {
        self.section_ref(section).is_some()
    }

    /// Solver prefixes this module accepts; empty means unrestricted.
    pub fn compatible_solvers(&self) -> &[String] {
        self.compatible_solvers.as_deref().unwrap_or_default()
    }

    /// Top-level experiment key the module is configured under (`solver/...` → `Solver`).
    pub fn category_key(&self) -> Option<String> {
        self.module_type
            .split('/')
            .next()
            .filter(|segment| !segment.is_empty() && self.module_type.contains('/'))
            .map(title_case)
    }

    /// Class name qualified with every enclosing namespace.
    pub fn qualified_class_name(&self) -> String {
        self.namespace
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(self.class_name.as_str()))
            .collect::<Vec<_>>()
            .join("::")
    }

    pub fn has_parent(&self) -> bool {
        !self.parent_class_name.is_empty()
    }
}

/// Conversion strategy selected from a setting's type tag.
///
/// Variants are listed in dispatch priority: the first matching family wins,
/// so a vector of module pointers never falls through to the scalar path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeFamily {
    /// Opaque sample handle; the JSON subtree is stored as-is.
    Sample,
    /// `std::vector<ns::X*>`: each element is a polymorphic module.
    ModuleVector {
        /// Element pointer type, e.g. `korali::Solver*`.
        element: String,
    },
    /// `ns::X*`: a single polymorphic module.
    Module {
        /// `true` for the root experiment type, which is never configured recursively.
        is_experiment: bool,
        /// `true` for solver pointers, which survive re-configuration of a running experiment.
        is_solver: bool,
    },
    /// Random-number generator handle built from a distribution range name.
    RandomGenerator,
    /// Scalars, strings and plain containers.
    Plain,
}

impl TypeFamily {
    /// Classify a type tag. `root` is the framework's root namespace (`korali`).
    pub fn classify(ty: &str, root: &str) -> Self {
        let ty = ty.trim();
        let module_prefix = format!("{root}::");
        if ty.contains(&format!("{root}::Sample")) {
            return TypeFamily::Sample;
        }
        if let Some(inner) = ty
            .strip_prefix("std::vector<")
            .and_then(|rest| rest.strip_suffix('>'))
            .map(str::trim)
        {
            if inner.starts_with(&module_prefix) && inner.ends_with('*') {
                return TypeFamily::ModuleVector {
                    element: inner.to_string(),
                };
            }
        }
        if ty.starts_with(&module_prefix) && ty.ends_with('*') {
            return TypeFamily::Module {
                is_experiment: ty.trim_end_matches('*').trim() == format!("{root}::Experiment"),
                is_solver: ty.contains("Solver"),
            };
        }
        if ty.contains("gsl_rng*") {
            return TypeFamily::RandomGenerator;
        }
        TypeFamily::Plain
    }
}
