//! # Generator Module
//!
//! Turns a loaded [`ModuleConfig`](crate::schema::ModuleConfig) and its
//! hand-written template into the binding code that plugs the module into
//! the configuration framework.
//!
//! ## Architecture
//!
//! ```text
//! CMAES.config + CMAES.hpp.base → SchemaLoader → ModuleConfig → Builder → IR → Printer
//!                                                                  ↓
//!                                  CMAES.hpp  ← diff-and-write ← Placeholder substitution
//! ```
//!
//! 1. **Builders** ([`header`], [`source`], [`variables`]) describe the generated
//!    members and method bodies as [`ir`] nodes
//! 2. **Printer** ([`printer::CppPrinter`]) renders the IR as C++
//! 3. **Placeholders** ([`placeholder`]) are validated and expanded over the
//!    spliced template
//! 4. **Build** ([`build`]) writes the artifact only when its bytes change
//!
//! ## Templates
//!
//! | Suffix | Builder | Generated |
//! |---|---|---|
//! | `.hpp.base` | [`build_header`] | field and override declarations after `public:` |
//! | `.cpp.base` | [`build_source`] | `setConfiguration`, `getConfiguration`, defaults, termination, operations, property lookup |
//!
//! The shared variable record (`variable.hpp.base`) is rendered by
//! [`build_variables_header`] from every module's `Variables Configuration`.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::path::Path;
//! use modgen::generator::{build_code_from_template, BuildOutcome};
//! use modgen::settings::GeneratorSettings;
//!
//! # fn main() -> Result<(), modgen::error::GeneratorError> {
//! let outcome = build_code_from_template(
//!     Path::new("modules/solver/optimizer/CMAES/CMAES.config"),
//!     Path::new("modules/solver/optimizer/CMAES/CMAES.hpp.base"),
//!     None, // write CMAES.hpp next to the template
//!     &GeneratorSettings::default(),
//! )?;
//! assert!(matches!(outcome, BuildOutcome::Written | BuildOutcome::Unchanged));
//! # Ok(())
//! # }
//! ```

mod build;
mod header;
pub mod ir;
pub mod placeholder;
pub mod printer;
mod source;
mod variables;

pub use build::*;
pub use header::{
    build_header, field_declarations, inject_after_public, method_declarations, preamble_blocks,
    DocTag, PUBLIC_ANCHOR,
};
pub use source::{build_source, source_definitions};
pub use variables::{aggregate, render_variables_header, VariableSet};
