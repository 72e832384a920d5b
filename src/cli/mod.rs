//! # CLI Module
//!
//! Command-line interface for the `modgen` binary.
//!
//! ## Commands
//!
//! ### `build`
//!
//! Generate a module's header or source from its descriptor and template:
//!
//! ```bash
//! modgen build modules/solver/optimizer/CMAES/CMAES.config \
//!     modules/solver/optimizer/CMAES/CMAES.hpp.base
//! ```
//!
//! Options:
//! - `[OUTPUT]` - Output file (default: the template path without `.base`)
//! - `--dry-run` - Report what would change without writing
//!
//! ### `variables`
//!
//! Generate the shared variable record from every module descriptor:
//!
//! ```bash
//! modgen variables modules/variable/variable.hpp.base modules/**/*.config
//! ```
//!
//! ### `lint`
//!
//! Check descriptors for authoring mistakes:
//!
//! ```bash
//! modgen lint modules/solver/optimizer/CMAES/CMAES.config --fail-on-error
//! ```
//!
//! All commands accept `--settings <FILE>`; without it the nearest
//! `modgen.toml` above the descriptor is used.
//!
//! ## Usage from Code
//!
//! ```rust,no_run
//! use clap::Parser;
//! use modgen::cli::{run_cli, Cli};
//!
//! let cli = Cli::parse();
//! run_cli(cli)?;
//! # Ok::<(), anyhow::Error>(())
//! ```

mod commands;


pub use commands::{run, run_cli, Cli, Commands};
