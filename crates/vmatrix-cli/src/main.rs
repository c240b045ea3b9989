//! vmatrix CLI - view permission matrix administration
//!
//! # Configuration
//!
//! Configuration is loaded from multiple sources with priority:
//!
//! 1. CLI arguments (highest priority)
//! 2. Environment variables (`VMATRIX_*`)
//! 3. Project config (`.vmatrix/config.toml` in the project root)
//! 4. Global config (`~/.vmatrix/config.toml`)
//! 5. Default values (lowest priority)
//!
//! # Environment Variables
//!
//! - `VMATRIX_DEBUG`: Enable debug logging (`true`/`false`)
//! - `VMATRIX_STATE_FILE`: State file location
//! - `VMATRIX_BUILTIN_PERMISSIONS`: Include the built-in permission set
//!
//! # Output
//!
//! Results go to stdout, logs to stderr. `check` exits with status 1
//! when the permission is denied.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};
use vmatrix_auth::PermissionCatalog;
use vmatrix_runtime::config::PROJECT_CONFIG_DIR;
use vmatrix_runtime::{ConfigLoader, MatrixStrategy, StateStore, VmatrixConfig};

/// vmatrix - per-view permission matrix administration
#[derive(Parser, Debug)]
#[command(name = "vmatrix")]
#[command(version, about, long_about = None)]
struct Args {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Project root directory (defaults to current directory)
    #[arg(short = 'C', long, global = true)]
    project: Option<PathBuf>,

    /// State file (overrides config and VMATRIX_STATE_FILE)
    #[arg(long, global = true, value_name = "FILE")]
    state: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check whether a principal holds a permission
    Check {
        sid: String,
        permission: String,
        /// Evaluate against this view instead of the global table
        #[arg(long)]
        view: Option<String>,
    },

    /// List every principal with a grant, sorted
    Principals,

    /// List known permissions
    Permissions {
        /// Only permissions offered on the view configuration screen
        #[arg(long)]
        view_only: bool,
    },

    /// Show a view's grant matrix
    Show { view: String },

    /// Register a view
    AddView { view: String },

    /// Unregister a view and drop its table
    RemoveView { view: String },

    /// Grant a permission on a view
    Grant {
        view: String,
        sid: String,
        permission: String,
    },

    /// Grant a permission in the global table
    GlobalGrant { sid: String, permission: String },

    /// Set whether a view ignores the global table
    BlockInheritance {
        view: String,
        #[arg(action = clap::ArgAction::Set)]
        blocks: bool,
    },

    /// Replace a view's table from a submitted configuration form (JSON)
    ImportForm { view: String, file: PathBuf },

    /// Print the view a configure-page URL refers to
    Referer { url: String },

    /// Validate a principal name
    CheckName { name: String },
}

/// CLI-based configuration resolver.
///
/// Merges file/env config via [`ConfigLoader`] and applies CLI argument
/// overrides as the highest-priority layer.
struct CliConfigResolver {
    project_root: PathBuf,
    debug: bool,
    state: Option<PathBuf>,
}

impl CliConfigResolver {
    fn from_args(args: &Args) -> Self {
        let project_root = args.project.clone().unwrap_or_else(|| {
            std::env::current_dir().unwrap_or_else(|e| {
                eprintln!("Warning: failed to get current directory ({e}), using '.'");
                PathBuf::from(".")
            })
        });

        Self {
            project_root,
            debug: args.debug,
            state: args.state.clone(),
        }
    }

    fn resolve(&self) -> Result<VmatrixConfig> {
        let mut config = ConfigLoader::new()
            .with_project_root(&self.project_root)
            .load()
            .map_err(|e| anyhow::anyhow!("Config error: {e}"))?;

        if self.debug {
            config.debug = true;
        }
        if let Some(ref p) = self.state {
            config.paths.state_file = Some(p.clone());
        }

        Ok(config)
    }

    fn state_file(&self, config: &VmatrixConfig) -> PathBuf {
        config
            .paths
            .state_file_or(&self.project_root.join(PROJECT_CONFIG_DIR))
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(args) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(2)
        }
    }
}

fn run(args: Args) -> Result<ExitCode> {
    let resolver = CliConfigResolver::from_args(&args);
    let config = resolver.resolve()?;

    // Terminal filter: --debug (or config debug) > --verbose > RUST_LOG env > default "warn"
    let filter = if config.debug {
        EnvFilter::new("debug")
    } else if args.verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr)
                .with_filter(filter),
        )
        .init();

    info!(path = %resolver.project_root.display(), "Project root");

    let catalog: Arc<dyn PermissionCatalog> = Arc::new(
        config
            .build_catalog()
            .map_err(|e| anyhow::anyhow!("Config error: {e}"))?,
    );
    let store = StateStore::new(resolver.state_file(&config));
    let strategy = MatrixStrategy::new(catalog);
    let report = store.load_into(&strategy)?;
    info!(
        path = %store.path().display(),
        skipped = report.warnings().len(),
        "State loaded"
    );

    let ctx = commands::Context {
        strategy: &strategy,
        store: &store,
    };
    ctx.run(args.command)
}
