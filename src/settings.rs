//! # Generator Settings
//!
//! Optional build settings for `modgen`, loaded from a `modgen.toml` file.
//!
//! ## Resolution
//!
//! 1. A path passed explicitly (`modgen --settings path/to/modgen.toml ...`)
//! 2. The first `modgen.toml` found walking up from the module descriptor
//! 3. Built-in defaults
//!
//! ## Example
//!
//! ```toml
//! # Directory the module types are derived from (relative to this file)
//! module_root = "source/modules"
//!
//! [dialect]
//! json_type = "knlohmann::json"
//! error_macro = "KORALI_LOG_ERROR"
//! experiment_handle = "_k"
//! root_namespace = "korali"
//! ```
//!
//! Settings only tune where modules are found and which framework names the
//! generated code calls; the same inputs always produce the same output.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::GeneratorError;

/// File name looked up in ancestor directories.
pub const SETTINGS_FILE_NAME: &str = "modgen.toml";

/// Framework names the generated code refers to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Dialect {
    /// JSON value type used in generated signatures.
    pub json_type: String,
    /// Macro invoked for every fatal runtime error.
    pub error_macro: String,
    /// Member through which modules reach their owning experiment.
    pub experiment_handle: String,
    /// Root namespace of the framework (`korali::Sample`, `korali::Module`).
    pub root_namespace: String,
}

impl Default for Dialect {
    fn default() -> Self {
        Dialect {
            json_type: "knlohmann::json".to_string(),
            error_macro: "KORALI_LOG_ERROR".to_string(),
            experiment_handle: "_k".to_string(),
            root_namespace: "korali".to_string(),
        }
    }
}

impl Dialect {
    /// Fully qualified sample handle type.
    pub fn sample_type(&self) -> String {
        format!("{}::Sample", self.root_namespace)
    }

    /// Registry lookup that instantiates a module from its `"Type"` discriminator.
    pub fn module_factory(&self) -> String {
        format!("{}::Module::getModule", self.root_namespace)
    }
}

/// Settings for one generator invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorSettings {
    /// Directory module types are derived from. Relative paths are resolved
    /// against the settings file's directory.
    pub module_root: Option<PathBuf>,
    pub dialect: Dialect,
}

/// Load settings from a TOML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn load_settings(path: &Path) -> Result<GeneratorSettings, GeneratorError> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        GeneratorError::io(format!("Failed to read settings {}", path.display()), e)
    })?;
    let mut settings: GeneratorSettings =
        toml::from_str(&contents).map_err(|source| GeneratorError::Settings {
            path: path.to_path_buf(),
            source,
        })?;

    if let Some(root) = settings.module_root.take() {
        let resolved = if root.is_relative() {
            path.parent().map(|dir| dir.join(&root)).unwrap_or(root)
        } else {
            root
        };
        settings.module_root = Some(resolved);
    }
    Ok(settings)
}

/// Find the nearest `modgen.toml` at or above `start`.
pub fn auto_detect_settings_path(start: &Path) -> Option<PathBuf> {
    let start = if start.is_dir() {
        start
    } else {
        start.parent()?
    };
    start
        .ancestors()
        .map(|dir| dir.join(SETTINGS_FILE_NAME))
        .find(|candidate| candidate.is_file())
}

/// Resolve settings for a build anchored at `anchor` (usually the descriptor).
///
/// Priority:
/// 1. Explicitly provided path
/// 2. Auto-detected `modgen.toml`
/// 3. Defaults
pub fn resolve_settings(
    explicit_path: Option<&Path>,
    anchor: &Path,
) -> Result<GeneratorSettings, GeneratorError> {
    match explicit_path
        .map(Path::to_path_buf)
        .or_else(|| auto_detect_settings_path(anchor))
    {
        Some(path) => {
            tracing::debug!(settings = %path.display(), "using generator settings");
            load_settings(&path)
        }
        None => Ok(GeneratorSettings::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let settings = GeneratorSettings::default();
        assert!(settings.module_root.is_none());
        assert_eq!(settings.dialect.error_macro, "KORALI_LOG_ERROR");
        assert_eq!(settings.dialect.sample_type(), "korali::Sample");
        assert_eq!(settings.dialect.module_factory(), "korali::Module::getModule");
    }

    #[test]
    fn test_load_settings_resolves_relative_root() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(SETTINGS_FILE_NAME);
        fs::write(
            &path,
            "module_root = \"source/modules\"\n\n[dialect]\nerror_macro = \"LOG_FATAL\"\n",
        )
        .unwrap();

        let settings = load_settings(&path).unwrap();
        assert_eq!(
            settings.module_root,
            Some(tmp.path().join("source/modules"))
        );
        assert_eq!(settings.dialect.error_macro, "LOG_FATAL");
        // Unset dialect keys keep their defaults
        assert_eq!(settings.dialect.json_type, "knlohmann::json");
    }

    #[test]
    fn test_load_settings_invalid_toml() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(SETTINGS_FILE_NAME);
        fs::write(&path, "module_root = [").unwrap();
        assert!(matches!(
            load_settings(&path),
            Err(GeneratorError::Settings { .. })
        ));
    }

    #[test]
    fn test_auto_detect_walks_ancestors() {
        let tmp = TempDir::new().unwrap();
        let nested = tmp.path().join("modules/solver/CMAES");
        fs::create_dir_all(&nested).unwrap();
        fs::write(tmp.path().join(SETTINGS_FILE_NAME), "").unwrap();
        let config = nested.join("CMAES.config");
        fs::write(&config, "{}").unwrap();

        assert_eq!(
            auto_detect_settings_path(&config),
            Some(tmp.path().join(SETTINGS_FILE_NAME))
        );
    }

    #[test]
    fn test_resolve_settings_defaults_without_file() {
        let tmp = TempDir::new().unwrap();
        let settings = resolve_settings(None, tmp.path()).unwrap();
        assert_eq!(settings, GeneratorSettings::default());
    }
}
