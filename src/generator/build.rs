//! Build entry points: render an artifact and write it only when its bytes change.
//!
//! Byte equality with the existing file is the only incremental-build
//! mechanism; an unchanged artifact is never rewritten, so its mtime is
//! preserved. Writes go through a sibling temp file and a rename.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::header::build_header;
use super::source::build_source;
use super::variables::render_variables_header;
use crate::error::GeneratorError;
use crate::schema::{ensure_adjacent, ensure_config_extension, load_module, TemplateKind};
use crate::settings::GeneratorSettings;

/// Suffix stripped from a template name to obtain its default output name.
pub const TEMPLATE_SUFFIX: &str = ".base";

/// Result of a build step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildOutcome {
    /// The output file was created or its contents changed.
    Written,
    /// The output already held identical bytes; nothing was touched.
    Unchanged,
}

/// Rendered text and the path it belongs at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedArtifact {
    pub path: PathBuf,
    pub contents: String,
}

impl GeneratedArtifact {
    /// Whether the file at `path` already holds exactly these bytes.
    pub fn is_up_to_date(&self) -> bool {
        fs::read(&self.path)
            .map(|existing| existing == self.contents.as_bytes())
            .unwrap_or(false)
    }
}

/// `CMAES.hpp.base` → `CMAES.hpp`, next to the template.
pub fn default_output_path(template: &Path) -> PathBuf {
    let name = template
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stripped = name.strip_suffix(TEMPLATE_SUFFIX).unwrap_or(&name);
    template.with_file_name(stripped)
}

fn template_display_name(template: &Path) -> String {
    template
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| template.display().to_string())
}

/// Resolve symlinks and `..` even when `path` does not exist yet.
fn resolved(path: &Path) -> Option<PathBuf> {
    if let Ok(path) = fs::canonicalize(path) {
        return Some(path);
    }
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    Some(fs::canonicalize(parent).ok()?.join(path.file_name()?))
}

/// Reject an output that resolves to any of `inputs`.
pub fn ensure_output_distinct<'a>(
    output: &Path,
    inputs: impl IntoIterator<Item = &'a Path>,
) -> Result<(), GeneratorError> {
    let Some(target) = resolved(output) else {
        return Ok(());
    };
    for input in inputs {
        if resolved(input).is_some_and(|source| source == target) {
            return Err(GeneratorError::OutputOverwritesInput {
                output: output.to_path_buf(),
                input: input.to_path_buf(),
            });
        }
    }
    Ok(())
}

fn read_template(template: &Path) -> Result<String, GeneratorError> {
    fs::read_to_string(template)
        .map_err(|e| GeneratorError::io(format!("Failed to read template {}", template.display()), e))
}

/// Render the header or source for one `(config, template)` pair without writing.
pub fn render_code_from_template(
    config: &Path,
    template: &Path,
    output: Option<&Path>,
    settings: &GeneratorSettings,
) -> Result<GeneratedArtifact, GeneratorError> {
    ensure_config_extension(config)?;
    ensure_adjacent(config, template)?;
    let kind = TemplateKind::from_path(template)?;
    let path = output.map_or_else(|| default_output_path(template), Path::to_path_buf);
    ensure_output_distinct(&path, [config, template])?;

    let module = load_module(config, Some(template), settings)?;
    let text = read_template(template)?;
    let name = template_display_name(template);
    debug!(
        module = %module.class_name,
        module_type = %module.module_type,
        kind = ?kind,
        "rendering module"
    );

    let contents = match kind {
        TemplateKind::Header => build_header(&module, &text, &name, &settings.dialect)?,
        TemplateKind::Source => build_source(&module, &text, &name, &settings.dialect)?,
    };
    Ok(GeneratedArtifact { path, contents })
}

/// Render and write the artifact for one `(config, template)` pair.
///
/// # Errors
///
/// Any loader, placeholder or builder error, or a failed write.
pub fn build_code_from_template(
    config: &Path,
    template: &Path,
    output: Option<&Path>,
    settings: &GeneratorSettings,
) -> Result<BuildOutcome, GeneratorError> {
    let artifact = render_code_from_template(config, template, output, settings)?;
    write_if_changed(&artifact)
}

/// Render the shared variable header from every module descriptor without writing.
///
/// Each descriptor is loaded with its sibling template; the field order
/// follows the order of `configs`.
pub fn render_variables_artifact(
    configs: &[PathBuf],
    template: &Path,
    output: Option<&Path>,
    settings: &GeneratorSettings,
) -> Result<GeneratedArtifact, GeneratorError> {
    let path = output.map_or_else(|| default_output_path(template), Path::to_path_buf);
    ensure_output_distinct(
        &path,
        configs.iter().map(PathBuf::as_path).chain([template]),
    )?;

    let modules = configs
        .iter()
        .map(|config| load_module(config, None, settings))
        .collect::<Result<Vec<_>, _>>()?;
    let text = read_template(template)?;
    let contents = render_variables_header(&modules, &text, &template_display_name(template))?;
    Ok(GeneratedArtifact { path, contents })
}

/// Render and write the shared variable header.
pub fn build_variables_header(
    configs: &[PathBuf],
    template: &Path,
    output: Option<&Path>,
    settings: &GeneratorSettings,
) -> Result<BuildOutcome, GeneratorError> {
    let artifact = render_variables_artifact(configs, template, output, settings)?;
    write_if_changed(&artifact)
}

/// Write `artifact` unless the file already holds identical bytes.
pub fn write_if_changed(artifact: &GeneratedArtifact) -> Result<BuildOutcome, GeneratorError> {
    if artifact.is_up_to_date() {
        info!(path = %artifact.path.display(), "unchanged, skipping write");
        return Ok(BuildOutcome::Unchanged);
    }
    write_atomic(&artifact.path, &artifact.contents)?;
    info!(path = %artifact.path.display(), bytes = artifact.contents.len(), "wrote artifact");
    Ok(BuildOutcome::Written)
}

/// Write `content` to `path` through a temp file and rename, creating parent directories.
pub fn write_atomic(path: &Path, content: &str) -> Result<(), GeneratorError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| {
            GeneratorError::io(format!("Failed to create directory {}", parent.display()), e)
        })?;
    }

    let mut temp_name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    temp_name.push(".tmp");
    let temp_path = path.with_file_name(temp_name);

    fs::write(&temp_path, content)
        .map_err(|e| GeneratorError::io(format!("Failed to write {}", temp_path.display()), e))?;
    fs::rename(&temp_path, path).map_err(|e| {
        fs::remove_file(&temp_path).ok();
        GeneratorError::io(format!("Failed to move {} into place", path.display()), e)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_output_path() {
        assert_eq!(
            default_output_path(Path::new("modules/solver/CMAES/CMAES.hpp.base")),
            PathBuf::from("modules/solver/CMAES/CMAES.hpp")
        );
        assert_eq!(
            default_output_path(Path::new("CMAES.cpp.base")),
            PathBuf::from("CMAES.cpp")
        );
    }

    #[test]
    fn test_write_atomic_creates_parent_directories() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested/deep/CMAES.hpp");
        write_atomic(&path, "content").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "content");
        assert!(!tmp.path().join("nested/deep/CMAES.hpp.tmp").exists());
    }

    #[test]
    fn test_write_if_changed_skips_identical_bytes() {
        let tmp = TempDir::new().unwrap();
        let artifact = GeneratedArtifact {
            path: tmp.path().join("CMAES.hpp"),
            contents: "int _populationSize;\n".to_string(),
        };
        assert_eq!(write_if_changed(&artifact).unwrap(), BuildOutcome::Written);
        assert!(artifact.is_up_to_date());
        assert_eq!(write_if_changed(&artifact).unwrap(), BuildOutcome::Unchanged);

        let changed = GeneratedArtifact {
            contents: "int _populationSize;\nint _muValue;\n".to_string(),
            ..artifact
        };
        assert_eq!(write_if_changed(&changed).unwrap(), BuildOutcome::Written);
    }

    #[test]
    fn test_render_rejects_unknown_template_kind() {
        let tmp = TempDir::new().unwrap();
        let config = tmp.path().join("CMAES.config");
        let template = tmp.path().join("CMAES.h.in");
        fs::write(&config, "{}").unwrap();
        fs::write(&template, "class CMAES : public Optimizer {\n public:\n};\n").unwrap();
        let err = render_code_from_template(&config, &template, None, &GeneratorSettings::default())
            .unwrap_err();
        assert!(matches!(err, GeneratorError::UnknownTemplateKind { .. }));
    }
}
