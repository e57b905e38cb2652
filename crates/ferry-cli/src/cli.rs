//! Ferry command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Plan an import of a JSON record batch against a schema snapshot
//! ferry plan --schema schema.json --records contacts.json
//!
//! # Same, with rendered forward and rollback SQL
//! ferry plan --schema schema.json --records contacts.json --dry-run
//!
//! # Write TypeScript bindings for a snapshot
//! ferry bindings --schema schema.json --out src/db
//!
//! # Compare two snapshots
//! ferry diff --old before.json --new after.json
//! ```
//!
//! Reports are written to stdout as JSON; logs go to stderr.

mod logging;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;

use ferry_bindings::{BindingGenerator, NamingConflict, TableChange, TableError, diff_analyses};
use ferry_core::{ImportConfig, Record, SchemaSource, StaticSchemaSource, records_from_json};
use ferry_schema::{SchemaAnalysis, SchemaAnalyzer};
use ferry_services::{ExecutionReport, ImportPreferences, ImportResult, ImportService};

use logging::LoggingConfig;

#[derive(Parser)]
#[command(name = "ferry")]
#[command(about = "Schema-aware import planning", long_about = None)]
#[command(version)]
struct Cli {
    /// Import configuration file; defaults to <config dir>/ferry/ferry.toml
    #[arg(long, global = true, env = "FERRY_CONFIG")]
    config: Option<PathBuf>,

    /// Debug logging with span timings
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Also write JSON logs to the log directory
    #[arg(long, global = true)]
    log_file: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a schema snapshot
    Analyze {
        /// JSON array of table descriptors
        #[arg(short, long)]
        schema: PathBuf,
    },

    /// Match a record batch to the schema and plan the migration
    Plan {
        /// JSON array of table descriptors
        #[arg(short, long)]
        schema: PathBuf,

        /// JSON array of record objects
        #[arg(short, long)]
        records: PathBuf,

        /// Name for a new table; derived from the records file name when unset
        #[arg(short, long)]
        table: Option<String>,

        /// Always stop for manual review
        #[arg(long)]
        require_approval: bool,

        /// Allow applying plans within the configured risk ceiling
        #[arg(long)]
        auto_apply: bool,

        #[arg(long)]
        skip_safety_checks: bool,

        #[arg(long)]
        no_bindings: bool,

        /// Render forward and rollback SQL for the plan
        #[arg(long)]
        dry_run: bool,
    },

    /// Generate TypeScript bindings for a schema snapshot
    Bindings {
        /// JSON array of table descriptors
        #[arg(short, long)]
        schema: PathBuf,

        /// Directory to write modules into
        #[arg(short, long)]
        out: PathBuf,
    },

    /// Compare two schema snapshots
    Diff {
        #[arg(long)]
        old: PathBuf,

        #[arg(long)]
        new: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let logging = if cli.verbose {
        LoggingConfig::verbose()
    } else {
        LoggingConfig::default()
    };
    let _guard = logging::init(logging.with_json_logs(cli.log_file))?;

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Analyze { schema } => {
            let analysis = analyze_snapshot(&schema).await?;
            print_json(&analysis)?;
        }
        Commands::Plan {
            schema,
            records,
            table,
            require_approval,
            auto_apply,
            skip_safety_checks,
            no_bindings,
            dry_run,
        } => {
            let source = StaticSchemaSource::from_path(&schema)?;
            let batch = read_records(&records)?;

            let mut preferences = ImportPreferences::new();
            preferences.require_approval = require_approval;
            preferences.auto_apply = auto_apply;
            preferences.skip_safety_checks = skip_safety_checks;
            if no_bindings {
                preferences = preferences.with_bindings(false);
            }
            if let Some(table) = table {
                preferences = preferences.with_target_table(table);
            }

            let service = ImportService::new(Arc::new(source), config)?;
            let label = records.display().to_string();
            let result = service.run(&batch, &label, &preferences).await;

            let execution = match (&result.plan, dry_run) {
                (Some(plan), true) => Some(service.execute(plan, true)?),
                _ => None,
            };
            print_json(&PlanReport {
                result: &result,
                execution,
            })?;
        }
        Commands::Bindings { schema, out } => {
            let analysis = analyze_snapshot(&schema).await?;
            let set = BindingGenerator::new().generate(&analysis, None);

            std::fs::create_dir_all(&out)
                .with_context(|| format!("cannot create {}", out.display()))?;
            for file in &set.files {
                let path = out.join(&file.path);
                std::fs::write(&path, &file.contents)
                    .with_context(|| format!("cannot write {}", path.display()))?;
            }
            tracing::info!(
                files = set.files.len(),
                out = %out.display(),
                "Bindings written"
            );

            print_json(&BindingsReport {
                files: set.files.iter().map(|f| f.path.as_str()).collect(),
                conflicts: &set.conflicts,
                errors: &set.errors,
            })?;
        }
        Commands::Diff { old, new } => {
            let old = analyze_snapshot(&old).await?;
            let new = analyze_snapshot(&new).await?;
            let changes = diff_analyses(&old, &new);
            let incremental = BindingGenerator::new().generate_incremental(&old, &new);

            print_json(&DiffReport {
                changes: &changes,
                regenerated_files: incremental.files.iter().map(|f| f.path.as_str()).collect(),
                removed_files: &incremental.removed_files,
            })?;
        }
    }

    Ok(())
}

#[derive(Serialize)]
struct PlanReport<'a> {
    result: &'a ImportResult,
    /// Present for dry runs of a produced plan
    execution: Option<ExecutionReport>,
}

#[derive(Serialize)]
struct BindingsReport<'a> {
    files: Vec<&'a str>,
    conflicts: &'a [NamingConflict],
    errors: &'a [TableError],
}

#[derive(Serialize)]
struct DiffReport<'a> {
    changes: &'a [TableChange],
    regenerated_files: Vec<&'a str>,
    removed_files: &'a [String],
}

fn load_config(path: Option<&Path>) -> anyhow::Result<ImportConfig> {
    let config = match path {
        Some(path) => ImportConfig::load(path)
            .with_context(|| format!("cannot load config from {}", path.display()))?,
        None => ImportConfig::load_or_default()?,
    };
    Ok(config)
}

async fn analyze_snapshot(path: &Path) -> anyhow::Result<SchemaAnalysis> {
    let source = StaticSchemaSource::from_path(path)?;
    tracing::debug!(source = source.name(), "Analyzing snapshot");
    let analysis = SchemaAnalyzer::new().analyze(&source).await?;
    Ok(analysis)
}

fn read_records(path: &Path) -> anyhow::Result<Vec<Record>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read {}", path.display()))?;
    let document: serde_json::Value = serde_json::from_str(&content)
        .with_context(|| format!("{} is not valid JSON", path.display()))?;
    Ok(records_from_json(document)?)
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
