use crate::generator::{
    render_code_from_template, render_variables_artifact, write_if_changed, BuildOutcome,
    GeneratedArtifact,
};
use crate::linter::{has_errors, lint_config, print_lint_issues, LintIssue, LintSeverity};
use crate::settings::{resolve_settings, GeneratorSettings};
use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

/// Command-line interface for modgen
///
/// Compiles module configuration descriptors and their templates into
/// binding code.
#[derive(Debug, Parser)]
#[command(name = "modgen")]
#[command(about = "Module configuration compiler", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Generator settings file (default: nearest modgen.toml above the descriptor)
    #[arg(long, global = true, env = "MODGEN_SETTINGS")]
    pub settings: Option<PathBuf>,

    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available modgen commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Generate a header or source file from a descriptor and its template
    ///
    /// The template suffix selects the artifact: `.hpp.base` produces the
    /// header, `.cpp.base` the source. The output is only rewritten when its
    /// contents change.
    Build {
        /// Module descriptor (`<Name>.config`)
        config: PathBuf,

        /// Template next to the descriptor (`<Name>.hpp.base` or `<Name>.cpp.base`)
        template: PathBuf,

        /// Output file (default: the template path without `.base`)
        output: Option<PathBuf>,

        /// Render and report without writing
        #[arg(long, default_value_t = false)]
        dry_run: bool,
    },
    /// Generate the shared variable header from every module's variable settings
    Variables {
        /// Variable record template (`variable.hpp.base`)
        template: PathBuf,

        /// Module descriptors, in aggregation order
        #[arg(required = true, num_args = 1..)]
        configs: Vec<PathBuf>,

        /// Output file (default: the template path without `.base`)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Render and report without writing
        #[arg(long, default_value_t = false)]
        dry_run: bool,
    },
    /// Lint module descriptors
    ///
    /// Checks for identifier collisions, missing types and criteria,
    /// operations without callbacks, misplaced options and unknown sections.
    Lint {
        /// Module descriptors to check
        #[arg(required = true, num_args = 1..)]
        configs: Vec<PathBuf>,

        /// Exit with error code if any errors are found
        #[arg(long, default_value_t = false)]
        fail_on_error: bool,

        /// Show only errors (hide warnings and info)
        #[arg(long, default_value_t = false)]
        errors_only: bool,
    },
}

/// Parse the process arguments and execute the command
///
/// # Errors
///
/// Returns an error if the command fails; see [`run_cli`].
pub fn run() -> anyhow::Result<()> {
    run_cli(Cli::parse())
}

/// Execute a parsed command
///
/// # Errors
///
/// Returns an error if:
/// - A descriptor, template or settings file cannot be read or parsed
/// - A template is malformed (unbalanced placeholders, no `public:` section)
/// - An output file cannot be written, or resolves to one of the inputs
/// - `lint --fail-on-error` found error-level issues
pub fn run_cli(cli: Cli) -> anyhow::Result<()> {
    match &cli.command {
        Commands::Build {
            config,
            template,
            output,
            dry_run,
        } => {
            let settings = settings_for(cli.settings.as_deref(), config)?;
            let artifact =
                render_code_from_template(config, template, output.as_deref(), &settings)
                    .with_context(|| format!("Failed to build {}", template.display()))?;
            finish(&artifact, *dry_run)
        }
        Commands::Variables {
            template,
            configs,
            output,
            dry_run,
        } => {
            let anchor = configs.first().unwrap_or(template);
            let settings = settings_for(cli.settings.as_deref(), anchor)?;
            let artifact =
                render_variables_artifact(configs, template, output.as_deref(), &settings)
                    .with_context(|| format!("Failed to build {}", template.display()))?;
            finish(&artifact, *dry_run)
        }
        Commands::Lint {
            configs,
            fail_on_error,
            errors_only,
        } => {
            let mut issues: Vec<LintIssue> = Vec::new();
            for config in configs {
                let settings = settings_for(cli.settings.as_deref(), config)?;
                issues.extend(
                    lint_config(config, &settings)
                        .with_context(|| format!("Failed to lint {}", config.display()))?,
                );
            }

            if *errors_only {
                issues.retain(|i| i.severity == LintSeverity::Error);
            }
            print_lint_issues(&issues);
            if *fail_on_error && has_errors(&issues) {
                anyhow::bail!("lint found error-level issues");
            }
            Ok(())
        }
    }
}

fn settings_for(explicit: Option<&Path>, anchor: &Path) -> anyhow::Result<GeneratorSettings> {
    resolve_settings(explicit, anchor).context("Failed to load generator settings")
}

fn finish(artifact: &GeneratedArtifact, dry_run: bool) -> anyhow::Result<()> {
    let path = artifact.path.display();
    if dry_run {
        if artifact.is_up_to_date() {
            println!("✅ {path} is up to date (dry run)");
        } else {
            println!("📝 {path} would be written ({} bytes, dry run)", artifact.contents.len());
        }
        return Ok(());
    }

    match write_if_changed(artifact)? {
        BuildOutcome::Written => println!("✅ Generated {path}"),
        BuildOutcome::Unchanged => println!("✅ {path} is up to date"),
    }
    Ok(())
}
