//! Error types for the module-configuration compiler.
//!
//! Two families exist:
//!
//! - [`GeneratorError`] is raised while compiling a `(config, template)` pair.
//!   Every variant is an authoring mistake in a schema or template and aborts
//!   the build step.
//! - [`ConfigError`] is raised by the [`crate::runtime`] reference
//!   implementation of the generated bindings. It mirrors, one for one, the
//!   fatal branches the generated code embeds for later execution.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading schemas and generating code.
#[derive(Debug, Error)]
pub enum GeneratorError {
    /// The module descriptor does not carry the `.config` extension.
    #[error("Configuration file '{}' must have the '.config' extension", .path.display())]
    WrongExtension {
        /// Offending file.
        path: PathBuf,
    },

    /// Descriptor and template live in different directories.
    #[error(
        "Configuration file '{}' and template '{}' must be in the same directory",
        .config.display(),
        .template.display()
    )]
    NotAdjacent {
        /// Module descriptor path.
        config: PathBuf,
        /// Template path.
        template: PathBuf,
    },

    /// No `<stem>.hpp.base` / `<stem>.cpp.base` sits next to the descriptor.
    #[error("No template found next to configuration file '{}'", .config.display())]
    TemplateNotFound {
        /// Module descriptor path.
        config: PathBuf,
    },

    /// The output path resolves to one of the build's own inputs.
    #[error("Output '{}' would overwrite input '{}'", .output.display(), .input.display())]
    OutputOverwritesInput {
        /// Requested output path.
        output: PathBuf,
        /// Input file it resolves to.
        input: PathBuf,
    },

    /// The template suffix is neither `.hpp.base` nor `.cpp.base`.
    #[error("Unrecognized template '{}': expected a '.hpp.base' or '.cpp.base' suffix", .path.display())]
    UnknownTemplateKind {
        /// Offending template.
        path: PathBuf,
    },

    /// A start/end placeholder pair does not balance.
    #[error(
        "Template '{template}': found {start_count} '{start}' but {end_count} '{end}' placeholders"
    )]
    UnbalancedPlaceholder {
        /// Template name.
        template: String,
        /// Opening token.
        start: String,
        /// Number of opening tokens.
        start_count: usize,
        /// Closing token.
        end: String,
        /// Number of closing tokens.
        end_count: usize,
    },

    /// A token that may appear at most once appears several times.
    #[error("Template '{template}': placeholder '{token}' appears {count} times (at most once allowed)")]
    DuplicatePlaceholder {
        /// Template name.
        template: String,
        /// Offending token.
        token: String,
        /// Number of occurrences.
        count: usize,
    },

    /// An indexed namespace token refers to a scope the module does not have.
    #[error("Template '{template}': placeholder '{token}' exceeds namespace depth {depth}")]
    NamespaceDepth {
        /// Template name.
        template: String,
        /// Offending token.
        token: String,
        /// Depth of the module namespace.
        depth: usize,
    },

    /// The header template has no `public:` line to inject declarations after.
    #[error("Template '{template}' has no 'public:' section to inject declarations into")]
    MissingPublicAnchor {
        /// Template name.
        template: String,
    },

    /// Neither `Module Data` nor the template names the module class.
    #[error("Could not determine the class name for module '{module}' (template '{template}')")]
    MissingClassName {
        /// Module directory name.
        module: String,
        /// Template name.
        template: String,
    },

    /// Two settings of one module derive the same field identifier.
    #[error("Module '{module}': settings {first} and {second} both map to field '{identifier}'")]
    IdentifierCollision {
        /// Module class name.
        module: String,
        /// Colliding identifier.
        identifier: String,
        /// First setting path.
        first: String,
        /// Second setting path.
        second: String,
    },

    /// The descriptor parses as JSON but violates the schema layout.
    #[error("Invalid module descriptor '{}': {reason}", .path.display())]
    InvalidSchema {
        /// Descriptor path.
        path: PathBuf,
        /// What is wrong.
        reason: String,
    },

    /// The descriptor is not valid JSON.
    #[error("Failed to parse '{}': {source}", .path.display())]
    Json {
        /// Descriptor path.
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Settings file could not be parsed.
    #[error("Failed to parse settings '{}': {source}", .path.display())]
    Settings {
        /// Settings path.
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// A fixed scaffolding template failed to render.
    #[error("Failed to render {name}: {source}")]
    Render {
        /// Scaffolding template name.
        name: String,
        #[source]
        source: askama::Error,
    },

    /// Filesystem access failed.
    #[error("{context}: {source}")]
    Io {
        /// What was being attempted.
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl GeneratorError {
    /// Wrap an I/O error with a human-readable context line.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        GeneratorError::Io {
            context: context.into(),
            source,
        }
    }
}

/// Errors raised while applying a JSON configuration to module instances.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A mandatory setting is absent.
    #[error(" + No value provided for mandatory setting: {path} required by {module}.")]
    MissingSetting {
        /// Module class name.
        module: String,
        /// Full key path, e.g. `["Solver"]["Population Size"]`.
        path: String,
    },

    /// The JSON value cannot be converted into the declared type.
    #[error(" + Object: [ {module} ] \n + Key:    {path}\n expected {expected}")]
    TypeMismatch {
        /// Module class name.
        module: String,
        /// Full key path.
        path: String,
        /// Declared type tag.
        expected: String,
    },

    /// A string value is outside the declared `Options` set.
    #[error(" + Unrecognized value ({value}) provided for mandatory setting: {path} required by {module}. Valid options are: {}", .options.join(", "))]
    InvalidOption {
        /// Module class name.
        module: String,
        /// Full key path.
        path: String,
        /// Rejected value.
        value: String,
        /// Accepted values.
        options: Vec<String>,
    },

    /// The experiment's solver is not whitelisted by the problem.
    #[error(" + Specified solver ({solver}) is not compatible with problem of type: {problem}")]
    IncompatibleSolver {
        /// Declared solver type.
        solver: String,
        /// Problem module type.
        problem: String,
    },

    /// Keys remain after every declared setting consumed its value.
    #[error(" + Unrecognized settings for module: {module}: \n{leftover}")]
    UnrecognizedSettings {
        /// Module class name.
        module: String,
        /// Pretty-printed leftover JSON.
        leftover: String,
    },

    /// No module in the chain handles the named operation.
    #[error(" + Operation {operation} not recognized for module {module}.")]
    UnknownOperation {
        /// Requested operation.
        operation: String,
        /// Module class name.
        module: String,
    },

    /// No conditional variable carries the requested property name.
    #[error(" + Property {property} not recognized for module {module}.")]
    UnknownProperty {
        /// Requested property.
        property: String,
        /// Module class name.
        module: String,
    },

    /// The `"Type"` discriminator names no registered module.
    #[error(" + Unrecognized module type: {0}")]
    UnknownModuleType(String),
}
