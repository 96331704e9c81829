//! xpi-build CLI
//!
//! Entry point for the `xpi-build` command-line tool.

use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::EnvFilter;
use xpi_build::clean::clean;
use xpi_build::watch::watch;
use xpi_build::{ActionTypePolicy, BuildConfig, Document, Pipeline};

#[derive(Parser)]
#[command(name = "xpi-build")]
#[command(about = "Assemble and package a mail extension from templates and deployment overrides", version)]
struct Cli {
    /// Log debug output
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    /// Project root (default: current directory)
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Path to build config file (default: <root>/xpi-build.toml if present)
    #[arg(long, short = 'c', global = true)]
    config_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the extension for a deployment configuration
    #[command(alias = "b")]
    Build {
        /// Deployment configuration to use during build
        config: String,

        /// Also create a distribution-ready archive in the dist directory
        #[arg(long, short = 'd')]
        dist: bool,

        /// Build output directory
        #[arg(long, short = 'o')]
        out: Option<PathBuf>,

        /// Action type policy (unchanged, spam-report-menu)
        #[arg(long)]
        action_type: Option<ActionTypePolicy>,
    },

    /// Remove all build artifacts, including the dist directory
    #[command(alias = "c")]
    Clean,

    /// Build, then rebuild whenever inputs change
    #[command(alias = "w")]
    Watch {
        /// Deployment configuration to use during build
        config: String,

        /// Action type policy (unchanged, spam-report-menu)
        #[arg(long)]
        action_type: Option<ActionTypePolicy>,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let root = match resolve_root(cli.root) {
        Ok(root) => root,
        Err(e) => fail(e),
    };

    match cli.command {
        Commands::Build {
            config,
            dist,
            out,
            action_type,
        } => {
            let overrides = cli_overrides(out.as_deref(), action_type);
            let build_config = load_config(&root, cli.config_file.as_deref(), overrides);
            run_build(build_config, &config, dist);
        }
        Commands::Clean => {
            let build_config = load_config(&root, cli.config_file.as_deref(), None);
            run_clean(&build_config);
        }
        Commands::Watch {
            config,
            action_type,
        } => {
            let overrides = cli_overrides(None, action_type);
            let build_config = load_config(&root, cli.config_file.as_deref(), overrides);
            run_watch(build_config, &config);
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();
}

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("Error: {}", message);
    process::exit(1);
}

fn resolve_root(root: Option<PathBuf>) -> Result<PathBuf, String> {
    let root = match root {
        Some(root) => root,
        None => std::env::current_dir().map_err(|e| e.to_string())?,
    };
    root.canonicalize()
        .map_err(|e| format!("Project root {}: {}", root.display(), e))
}

fn cli_overrides(out: Option<&Path>, action_type: Option<ActionTypePolicy>) -> Option<Document> {
    let mut doc = Document::new();
    if let Some(out) = out {
        doc.insert(
            "build_dir".to_string(),
            Value::String(out.to_string_lossy().to_string()),
        );
    }
    if let Some(policy) = action_type {
        doc.insert("manifest".to_string(), json!({ "action_type": policy }));
    }
    if doc.is_empty() {
        None
    } else {
        Some(doc)
    }
}

fn load_config(root: &Path, config_file: Option<&Path>, overrides: Option<Document>) -> BuildConfig {
    match BuildConfig::load(root, config_file, overrides) {
        Ok(config) => config,
        Err(e) => fail(e),
    }
}

fn run_build(config: BuildConfig, deployment: &str, dist: bool) {
    let pipeline = Pipeline::new(config);

    let outcome = match pipeline.run(deployment) {
        Ok(outcome) => outcome,
        Err(e) => fail(e),
    };
    println!(
        "Built {} in {} ({} documents, {} assets)",
        outcome.plugin_id,
        outcome.build_dir.display(),
        outcome.documents_written.len(),
        outcome.assets_copied
    );

    if dist {
        match pipeline.package(&outcome) {
            Ok(package) => {
                println!("Plugin archive written to {}", package.path.display());
                println!("  Files: {}", package.entries.len());
                println!("  SHA-256: {}", package.sha256);
            }
            Err(e) => fail(e),
        }
    }
}

fn run_clean(config: &BuildConfig) {
    match clean(config) {
        Ok(report) if report.is_empty() => println!("Nothing to clean"),
        Ok(report) => {
            for dir in &report.removed {
                println!("Removed {}", dir.display());
            }
        }
        Err(e) => fail(e),
    }
}

fn run_watch(config: BuildConfig, deployment: &str) {
    let pipeline = Pipeline::new(config);
    if let Err(e) = watch(&pipeline, deployment) {
        fail(e);
    }
}
