//! Discriminator → module descriptor lookup and operation callbacks.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use super::instance::ModuleInstance;
use crate::error::ConfigError;
use crate::schema::ModuleConfig;
use crate::settings::Dialect;

/// Callback bound to an `Available Operations` entry.
pub type OperationFn = Arc<dyn Fn(&mut ModuleInstance, &mut Value) + Send + Sync>;

/// Registered module descriptors and the operation callbacks they name.
///
/// Modules are looked up by their `"Type"` discriminator. Parent classes are
/// resolved by class name, so a descriptor chain is only as deep as the
/// registered ancestors.
#[derive(Clone)]
pub struct ModuleRegistry {
    root_namespace: String,
    by_type: HashMap<String, Arc<ModuleConfig>>,
    by_class: HashMap<String, Arc<ModuleConfig>>,
    operations: HashMap<(String, String), OperationFn>,
}

impl fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleRegistry")
            .field("modules", &self.by_type.keys().collect::<Vec<_>>())
            .field("operations", &self.operations.len())
            .finish()
    }
}

impl Default for ModuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ModuleRegistry {
    /// Empty registry for the framework's default root namespace.
    #[must_use]
    pub fn new() -> Self {
        ModuleRegistry {
            root_namespace: Dialect::default().root_namespace,
            by_type: HashMap::new(),
            by_class: HashMap::new(),
            operations: HashMap::new(),
        }
    }

    /// Namespace whose pointer types (`korali::Solver*`) denote nested modules.
    #[must_use]
    pub fn with_root_namespace(mut self, root_namespace: &str) -> Self {
        self.root_namespace = root_namespace.to_string();
        self
    }

    pub fn root_namespace(&self) -> &str {
        &self.root_namespace
    }

    /// Register a module descriptor under its module type and class name.
    ///
    /// A descriptor with the same module type replaces the previous one.
    pub fn register(&mut self, module: ModuleConfig) {
        let module = Arc::new(module);
        if self
            .by_type
            .insert(module.module_type.clone(), Arc::clone(&module))
            .is_some()
        {
            warn!(module_type = %module.module_type, "replaced existing module descriptor");
        }
        self.by_class
            .insert(module.class_name.clone(), Arc::clone(&module));
        debug!(
            module_type = %module.module_type,
            class = %module.class_name,
            total_modules = self.by_type.len(),
            "module registered"
        );
    }

    /// Bind `function` of class `class_name` to a callback.
    pub fn register_operation<F>(&mut self, class_name: &str, function: &str, callback: F)
    where
        F: Fn(&mut ModuleInstance, &mut Value) + Send + Sync + 'static,
    {
        self.operations.insert(
            (class_name.to_string(), function.to_string()),
            Arc::new(callback),
        );
    }

    pub fn get(&self, module_type: &str) -> Option<&Arc<ModuleConfig>> {
        self.by_type.get(module_type)
    }

    pub fn len(&self) -> usize {
        self.by_type.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_type.is_empty()
    }

    pub(crate) fn operation(&self, class_name: &str, function: &str) -> Option<OperationFn> {
        self.operations
            .get(&(class_name.to_string(), function.to_string()))
            .map(Arc::clone)
    }

    /// Descriptor chain for `module_type`, derived class first.
    ///
    /// The walk stops at the first parent that is not registered.
    pub fn chain(&self, module_type: &str) -> Result<Vec<Arc<ModuleConfig>>, ConfigError> {
        let leaf = self
            .by_type
            .get(module_type)
            .ok_or_else(|| ConfigError::UnknownModuleType(module_type.to_string()))?;
        let mut chain = vec![Arc::clone(leaf)];
        let mut parent = leaf.parent_class_name.clone();
        while let Some(next) = self.by_class.get(&parent) {
            // A self-referencing or cyclic hierarchy ends the walk
            if chain.iter().any(|m| Arc::ptr_eq(m, next)) {
                break;
            }
            parent = next.parent_class_name.clone();
            chain.push(Arc::clone(next));
        }
        Ok(chain)
    }

    /// Create an unconfigured instance from the `"Type"` discriminator of `js`.
    pub fn create(&self, js: &Value) -> Result<ModuleInstance, ConfigError> {
        match js.get("Type") {
            Some(Value::String(module_type)) => self.instantiate(module_type),
            other => Err(ConfigError::UnknownModuleType(
                other.map(Value::to_string).unwrap_or_default(),
            )),
        }
    }

    /// Create an unconfigured instance of `module_type`.
    pub fn instantiate(&self, module_type: &str) -> Result<ModuleInstance, ConfigError> {
        Ok(ModuleInstance::new(self.chain(module_type)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn registry() -> ModuleRegistry {
        let mut registry = ModuleRegistry::new();
        registry.register(ModuleConfig::new("Solver", "Solver", "Module").with_module_type("solver"));
        registry.register(
            ModuleConfig::new("Optimizer", "Optimizer", "Solver").with_module_type("solver/optimizer"),
        );
        registry.register(
            ModuleConfig::new("CMAES", "CMAES", "Optimizer")
                .with_module_type("solver/optimizer/CMAES"),
        );
        registry
    }

    #[test]
    fn test_chain_is_derived_first() {
        let chain = registry().chain("solver/optimizer/CMAES").unwrap();
        let names: Vec<_> = chain.iter().map(|m| m.class_name.as_str()).collect();
        assert_eq!(names, vec!["CMAES", "Optimizer", "Solver"]);
    }

    #[test]
    fn test_chain_unknown_type() {
        assert_eq!(
            registry().chain("solver/sampler/MCMC").unwrap_err(),
            ConfigError::UnknownModuleType("solver/sampler/MCMC".to_string())
        );
    }

    #[test]
    fn test_chain_stops_on_cycle() {
        let mut registry = ModuleRegistry::new();
        registry.register(ModuleConfig::new("A", "A", "B").with_module_type("a"));
        registry.register(ModuleConfig::new("B", "B", "A").with_module_type("b"));
        assert_eq!(registry.chain("a").unwrap().len(), 2);
    }

    #[test]
    fn test_create_from_discriminator() {
        let registry = registry();
        let instance = registry.create(&json!({"Type": "solver/optimizer/CMAES"})).unwrap();
        assert_eq!(instance.module_type(), "solver/optimizer/CMAES");
        assert!(matches!(
            registry.create(&json!({"Population Size": 8})),
            Err(ConfigError::UnknownModuleType(_))
        ));
    }

    #[test]
    fn test_register_replaces_same_type() {
        let mut registry = registry();
        registry.register(
            ModuleConfig::new("CMAES2", "CMAES2", "Optimizer")
                .with_module_type("solver/optimizer/CMAES"),
        );
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.get("solver/optimizer/CMAES").unwrap().class_name, "CMAES2");
    }
}
