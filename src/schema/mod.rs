//! # Schema Module
//!
//! Loading of module descriptors (`<Name>.config`) and the metadata scraped
//! from their templates into an enriched [`ModuleConfig`].
//!
//! ## Descriptor layout
//!
//! A descriptor is a JSON object whose keys are schema sections:
//!
//! ```json
//! {
//!   "Configuration Settings": [
//!     { "Name": ["Population Size"], "Type": "int", "Description": "Samples per generation." }
//!   ],
//!   "Termination Criteria": [
//!     { "Name": ["Max Generations"], "Type": "size_t", "Criteria": "_k->_currentGeneration >= _maxGenerations" }
//!   ],
//!   "Module Defaults": { "Population Size": 8 }
//! }
//! ```
//!
//! Identity (class, parent class, namespace) comes from an optional
//! `"Module Data"` block or from scanning the template; the module type and
//! include guard are derived from the directory layout and namespace.

mod load;
mod naming;
mod types;

pub use load::*;
pub use naming::*;
pub use types::*;
