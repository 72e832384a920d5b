//! # modgen
//!
//! **modgen** is a build-time compiler from declarative module descriptors to
//! C++ binding code. Every polymorphic module of a configuration framework
//! ships a JSON schema (`<Name>.config`) and a hand-written template
//! (`<Name>.hpp.base` / `<Name>.cpp.base`); modgen emits the code that plugs the
//! module into the framework: JSON ⇄ field serialization, mandatory-setting
//! checks, type conversion, default merging, termination checks, named
//! operations and conditional-variable lookup, delegating to the parent class
//! at every step.
//!
//! ## Architecture
//!
//! - **[`schema`]** - Descriptor loading, template scanning and identifier derivation
//! - **[`generator`]** - Placeholder engine, IR, C++ printer, header/source/variable builders
//!   and the diff-and-write build entry points
//! - **[`linter`]** - Non-fatal authoring checks over descriptors
//! - **[`runtime`]** - Reference implementation of the generated bindings over `serde_json::Value`
//! - **[`settings`]** - `modgen.toml` settings and the target dialect
//! - **[`logging`]** - `tracing-subscriber` initialization for the binary
//! - **[`error`]** - Generator and configuration error types
//! - **[`cli`]** - The `modgen` command line
//!
//! ### Build Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant User
//!     participant CLI as CLI<br/>(modgen build)
//!     participant Loader as schema::load_module
//!     participant Builder as generator::{header, source}
//!     participant Printer as generator::printer
//!     participant Placeholder as generator::placeholder
//!     participant FS as File System
//!
//!     User->>CLI: modgen build CMAES.config CMAES.hpp.base
//!     CLI->>Loader: load_module(config, template)
//!     Loader->>Loader: Parse JSON, scan template,<br/>derive module type and include guard
//!     Loader-->>CLI: ModuleConfig
//!     CLI->>Builder: build_header(module, template)
//!     Builder->>Placeholder: validate(template)
//!     Builder->>Printer: render field and method IR
//!     Printer-->>Builder: C++ text
//!     Builder->>Placeholder: substitute(spliced text)
//!     Builder-->>CLI: candidate text
//!     CLI->>FS: compare with CMAES.hpp
//!     FS-->>CLI: identical? skip : write via temp file
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use modgen::generator::build_code_from_template;
//! use modgen::settings::resolve_settings;
//! use std::path::Path;
//!
//! # fn main() -> Result<(), modgen::error::GeneratorError> {
//! let config = Path::new("modules/solver/optimizer/CMAES/CMAES.config");
//! let settings = resolve_settings(None, config)?;
//! for template in ["CMAES.hpp.base", "CMAES.cpp.base"] {
//!     let template = config.with_file_name(template);
//!     build_code_from_template(config, &template, None, &settings)?;
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Descriptor Example
//!
//! ```json
//! {
//!   "Configuration Settings": [
//!     {
//!       "Name": ["Population Size"],
//!       "Type": "int",
//!       "Description": "Specifies the number of samples to evaluate per generation."
//!     }
//!   ],
//!   "Termination Criteria": [
//!     {
//!       "Name": ["Max Generations"],
//!       "Type": "size_t",
//!       "Criteria": "_k->_currentGeneration > _maxGenerations"
//!     }
//!   ],
//!   "Module Defaults": { "Population Size": 8 }
//! }
//! ```
//!
//! ## Logging
//!
//! The binary logs through `tracing` to stderr. `MODGEN_LOG_LEVEL`
//! (default `warn`) and `MODGEN_LOG_FORMAT` (`pretty` or `json`) control the
//! output; generated artifacts never depend on them.

pub mod cli;
pub mod error;
pub mod generator;
pub mod linter;
pub mod logging;
pub mod runtime;
pub mod schema;
pub mod settings;
