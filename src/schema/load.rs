use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::naming::include_guard;
use super::types::{ModuleConfig, ModuleDescriptor};
use crate::error::GeneratorError;
use crate::settings::GeneratorSettings;

/// Extension every module descriptor must carry.
pub const CONFIG_EXTENSION: &str = "config";

/// Directory name that marks the module root when none is configured.
pub const DEFAULT_MODULE_ROOT_NAME: &str = "modules";

/// Kind of artifact a template produces, decided by its suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateKind {
    /// `.hpp.base` → declaration-side header.
    Header,
    /// `.cpp.base` → definition-side source.
    Source,
}

impl TemplateKind {
    pub fn suffix(self) -> &'static str {
        match self {
            TemplateKind::Header => ".hpp.base",
            TemplateKind::Source => ".cpp.base",
        }
    }

    /// Classify a template path; any other suffix is fatal.
    pub fn from_path(path: &Path) -> Result<Self, GeneratorError> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        [TemplateKind::Header, TemplateKind::Source]
            .into_iter()
            .find(|kind| name.ends_with(kind.suffix()))
            .ok_or_else(|| GeneratorError::UnknownTemplateKind {
                path: path.to_path_buf(),
            })
    }
}

/// Class and namespace declarations scraped from template text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateScan {
    pub class_name: Option<String>,
    pub parent_class_name: Option<String>,
    pub namespace: Vec<String>,
}

/// Scrape the leading class and namespace declarations of a template.
///
/// The first line containing both `class` and `public` names the class and,
/// through the token after its last `::`, the parent class. Every line
/// containing `namespace` but none of `//`, `using`, `}` or a line
/// continuation contributes one namespace scope, in file order. Placeholder
/// tokens (`@className`) are not names and are ignored.
pub fn scan_template(text: &str) -> TemplateScan {
    let mut scan = TemplateScan::default();

    for line in text.lines() {
        if scan.class_name.is_none() && line.contains("class") && line.contains("public") {
            let (class_name, parent) = parse_class_line(line);
            scan.class_name = class_name;
            scan.parent_class_name = parent;
        }

        let excluded = ["//", "using", "}", "\\"].iter().any(|t| line.contains(t));
        if line.contains("namespace") && !excluded {
            if let Some(scope) = token_after(line, "namespace") {
                scan.namespace.push(scope);
            }
        }
    }
    scan
}

fn parse_class_line(line: &str) -> (Option<String>, Option<String>) {
    let class_name = token_after(line, "class");
    let parent = match line.rfind("::") {
        Some(idx) => first_identifier(&line[idx + 2..]),
        None => token_after(line, "public"),
    };
    (class_name, parent)
}

fn token_after(line: &str, keyword: &str) -> Option<String> {
    let mut words = line.split_whitespace();
    words.find(|w| *w == keyword)?;
    words.next().and_then(first_identifier)
}

fn first_identifier(text: &str) -> Option<String> {
    let ident: String = text
        .trim_start()
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect();
    if ident.is_empty() {
        None
    } else {
        Some(ident)
    }
}

/// Read and parse a `.config` descriptor.
pub fn read_descriptor(config_path: &Path) -> Result<ModuleDescriptor, GeneratorError> {
    let content = fs::read_to_string(config_path).map_err(|e| {
        GeneratorError::io(
            format!("Failed to read configuration file {}", config_path.display()),
            e,
        )
    })?;
    let value: serde_json::Value =
        serde_json::from_str(&content).map_err(|source| GeneratorError::Json {
            path: config_path.to_path_buf(),
            source,
        })?;
    if !value.is_object() {
        return Err(GeneratorError::InvalidSchema {
            path: config_path.to_path_buf(),
            reason: "top level must be a JSON object".to_string(),
        });
    }
    serde_json::from_value(value).map_err(|e| GeneratorError::InvalidSchema {
        path: config_path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Reject descriptors without the `.config` extension.
pub fn ensure_config_extension(config_path: &Path) -> Result<(), GeneratorError> {
    if config_path.extension().and_then(|e| e.to_str()) == Some(CONFIG_EXTENSION) {
        Ok(())
    } else {
        Err(GeneratorError::WrongExtension {
            path: config_path.to_path_buf(),
        })
    }
}

/// Reject a descriptor and template that do not share a directory.
pub fn ensure_adjacent(config_path: &Path, template_path: &Path) -> Result<(), GeneratorError> {
    let config_dir = normalized_parent(config_path);
    let template_dir = normalized_parent(template_path);
    if config_dir == template_dir {
        Ok(())
    } else {
        Err(GeneratorError::NotAdjacent {
            config: config_path.to_path_buf(),
            template: template_path.to_path_buf(),
        })
    }
}

fn normalized_parent(path: &Path) -> PathBuf {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::canonicalize(&parent).unwrap_or(parent)
}

/// Locate the template that sits next to a descriptor (`.hpp.base` preferred).
pub fn find_template(config_path: &Path) -> Result<PathBuf, GeneratorError> {
    let stem = config_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let dir = config_path.parent().unwrap_or_else(|| Path::new(""));
    [TemplateKind::Header, TemplateKind::Source]
        .into_iter()
        .map(|kind| dir.join(format!("{stem}{}", kind.suffix())))
        .find(|candidate| candidate.is_file())
        .ok_or_else(|| GeneratorError::TemplateNotFound {
            config: config_path.to_path_buf(),
        })
}

/// Directory under which module types are derived.
///
/// The configured `module_root` wins; otherwise the nearest ancestor named
/// `modules`; otherwise the module directory's own parent.
pub fn resolve_module_root(module_dir: &Path, settings: &GeneratorSettings) -> PathBuf {
    if let Some(root) = &settings.module_root {
        return root.clone();
    }
    module_dir
        .ancestors()
        .skip(1)
        .find(|dir| dir.file_name().map(|n| n == DEFAULT_MODULE_ROOT_NAME).unwrap_or(false))
        .map(Path::to_path_buf)
        .unwrap_or_else(|| {
            module_dir
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_default()
        })
}

/// Slash-joined directory segments from the module root (exclusive) to the module directory.
pub fn derive_module_type(module_dir: &Path, module_root: &Path) -> String {
    let dir = fs::canonicalize(module_dir).unwrap_or_else(|_| module_dir.to_path_buf());
    let root = fs::canonicalize(module_root).unwrap_or_else(|_| module_root.to_path_buf());
    match dir.strip_prefix(&root) {
        Ok(rel) if !rel.as_os_str().is_empty() => segments(rel).join("/"),
        _ => dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
    }
}

fn segments(path: &Path) -> Vec<String> {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect()
}

/// Load a module descriptor and its template metadata into a [`ModuleConfig`].
///
/// When `template_path` is `None` the sibling template is located with
/// [`find_template`]. Explicit `Module Data` entries take precedence over
/// names scraped from the template.
pub fn load_module(
    config_path: &Path,
    template_path: Option<&Path>,
    settings: &GeneratorSettings,
) -> Result<ModuleConfig, GeneratorError> {
    ensure_config_extension(config_path)?;
    let template_path = match template_path {
        Some(path) => path.to_path_buf(),
        None => find_template(config_path)?,
    };
    ensure_adjacent(config_path, &template_path)?;

    let descriptor = read_descriptor(config_path)?;
    // Identity is declared in the header scaffold; the source scaffold only defines members
    let scan_path = find_template(config_path).unwrap_or_else(|_| template_path.clone());
    let template = fs::read_to_string(&scan_path).map_err(|e| {
        GeneratorError::io(
            format!("Failed to read template {}", scan_path.display()),
            e,
        )
    })?;
    let scan = scan_template(&template);

    let module_dir = match config_path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let module_dir = fs::canonicalize(&module_dir).unwrap_or(module_dir);
    let name = module_dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let module_root = resolve_module_root(&module_dir, settings);
    debug!(
        config = %config_path.display(),
        template = %template_path.display(),
        module_root = %module_root.display(),
        "loading module descriptor"
    );

    let template_name = template_path.display().to_string();
    assemble_module(descriptor, scan, &name, &module_dir, &module_root, &template_name)
}

/// Combine a parsed descriptor with template metadata and path-derived identity.
pub fn assemble_module(
    descriptor: ModuleDescriptor,
    scan: TemplateScan,
    name: &str,
    module_dir: &Path,
    module_root: &Path,
    template_name: &str,
) -> Result<ModuleConfig, GeneratorError> {
    let data = descriptor.module_data.unwrap_or_default();

    let class_name = data
        .class_name
        .or(scan.class_name)
        .ok_or_else(|| GeneratorError::MissingClassName {
            module: name.to_string(),
            template: template_name.to_string(),
        })?;
    let parent_class_name = data
        .parent_class_name
        .or(scan.parent_class_name)
        .unwrap_or_default();
    let namespace = data.namespace.unwrap_or(scan.namespace);
    let module_type = data
        .module_type
        .unwrap_or_else(|| derive_module_type(module_dir, module_root));

    let root_parent = module_root.parent().unwrap_or(module_root);
    let relative_path = fs::canonicalize(module_dir)
        .ok()
        .zip(fs::canonicalize(root_parent).ok())
        .and_then(|(dir, base)| {
            dir.strip_prefix(&base)
                .ok()
                .map(|rel| segments(rel).join("/"))
        })
        .unwrap_or_else(|| module_type.clone());

    let mut unknown_sections: Vec<String> = descriptor.extra.keys().cloned().collect();
    unknown_sections.sort();

    Ok(ModuleConfig {
        name: name.to_string(),
        include_guard: include_guard(&namespace, &class_name),
        class_name,
        parent_class_name,
        namespace,
        module_type,
        relative_path,
        configuration_settings: descriptor.configuration_settings,
        internal_settings: descriptor.internal_settings,
        termination_criteria: descriptor.termination_criteria,
        variables_configuration: descriptor.variables_configuration,
        conditional_variables: descriptor.conditional_variables,
        compatible_solvers: descriptor.compatible_solvers,
        available_operations: descriptor.available_operations,
        module_defaults: descriptor.module_defaults,
        variable_defaults: descriptor.variable_defaults,
        unknown_sections,
    })
}
