//! # Runtime Module
//!
//! A reference implementation of the bindings the generator emits, executed
//! directly over `serde_json::Value`. It lets the contract of the generated
//! `setConfiguration`/`getConfiguration` pair be exercised without a C++
//! toolchain.
//!
//! ## Model
//!
//! - [`ModuleRegistry`] maps a `"Type"` discriminator to a registered
//!   [`ModuleConfig`](crate::schema::ModuleConfig) and resolves its parent
//!   chain by class name
//! - [`ModuleInstance`] holds the field values of one configured module
//! - [`ExperimentContext`] carries the experiment-wide JSON (`Variables`,
//!   `Solver`) and per-variable fields
//!
//! Every generated fatal branch surfaces as a
//! [`ConfigError`](crate::error::ConfigError) variant.
//!
//! ## Example
//!
//! ```rust
//! use modgen::runtime::{ExperimentContext, ModuleRegistry};
//! use modgen::schema::{ModuleConfig, SettingDescriptor, SettingSection};
//! use serde_json::json;
//!
//! let mut registry = ModuleRegistry::new();
//! registry.register(
//!     ModuleConfig::new("CMAES", "CMAES", "Optimizer")
//!         .with_module_type("solver/optimizer/CMAES")
//!         .with_section(
//!             SettingSection::Configuration,
//!             vec![SettingDescriptor::new(&["Population Size"], "int")],
//!         ),
//! );
//!
//! let mut js = json!({"Type": "solver/optimizer/CMAES", "Population Size": 8});
//! let mut ctx = ExperimentContext::new(&registry, json!({}));
//! let mut solver = registry.create(&js).unwrap();
//! solver.set_configuration(&mut js, &mut ctx).unwrap();
//!
//! let mut out = json!({});
//! solver.get_configuration(&mut out, &mut ctx);
//! assert_eq!(out["Population Size"], 8);
//! ```

mod convert;
mod instance;
pub mod json;
mod registry;

pub use convert::conforms;
pub use instance::{ExperimentContext, FieldValue, ModuleInstance};
pub use registry::{ModuleRegistry, OperationFn};
