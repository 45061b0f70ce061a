//! Seedbed CLI entrypoint.
//!
//! This is the main entrypoint for the seedbed command-line tool.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use seedbed::api::{ApiClient, OfflineExecutor, RequestExecutor};
use seedbed::cli::{Cli, Commands, OutputFormatter};
use seedbed::config::{default_documents_dir, load_dotenv, DocumentLoader, Settings};
use seedbed::engine::{Engine, RunAborted, RunOptions, RunReport};
use seedbed::error::{ConfigError, Result, SeedbedError};

use clap::Parser;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

/// Main entrypoint.
fn main() -> ExitCode {
    // Load .env (best effort)
    if let Err(e) = load_dotenv(None) {
        eprintln!("Warning: {e}");
    }

    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.verbose, cli.log_json);

    // Run async runtime
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Initializes the logging system. `RUST_LOG` wins over `--verbose`.
fn init_logging(verbose: bool, json: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Everything a command needs besides its own arguments.
struct Context {
    loader: DocumentLoader,
    settings: Settings,
    formatter: OutputFormatter,
}

/// Main async entry point.
async fn run(cli: Cli) -> Result<ExitCode> {
    let root = cli.documents_dir.unwrap_or_else(default_documents_dir);
    debug!("Documents directory: {}", root.display());

    let ctx = Context {
        loader: DocumentLoader::new(root),
        settings: Settings {
            api_url: cli.api_url,
            api_key: cli.api_key,
            workspace: cli.workspace,
            tool_name: cli.tool_name,
        },
        formatter: OutputFormatter::new(cli.output),
    };

    match cli.command {
        Commands::List => Ok(cmd_list(&ctx)),
        Commands::Info { name } => cmd_info(&ctx, &name),
        Commands::Validate { name, file } => cmd_validate(&ctx, name, file),
        Commands::Provision {
            name,
            dry_run,
            strict_references,
            lookup_failure,
            report,
        } => {
            let options = run_options(&ctx.settings, dry_run)
                .with_strict_references(strict_references)
                .with_lookup_failure(lookup_failure.into());
            cmd_provision(&ctx, &name, options, report.as_deref()).await
        }
        Commands::Delete {
            name,
            dry_run,
            tags,
            yes,
            report,
        } => {
            let options = run_options(&ctx.settings, dry_run);
            cmd_delete(&ctx, &name, options, &tags, yes, report.as_deref()).await
        }
    }
}

/// List available documents.
fn cmd_list(ctx: &Context) -> ExitCode {
    let documents = ctx.loader.list();
    info!(
        "Found {} document(s) in {}",
        documents.len(),
        ctx.loader.root().display()
    );
    println!("{}", ctx.formatter.format_list(&documents));
    ExitCode::SUCCESS
}

/// Show one document.
fn cmd_info(ctx: &Context, name: &str) -> Result<ExitCode> {
    let document = ctx.loader.load(name)?;
    println!(
        "{}",
        ctx.formatter
            .format_document(&document, &ctx.settings.tool_name)
    );
    Ok(ExitCode::SUCCESS)
}

/// Validate a named document or a file.
fn cmd_validate(ctx: &Context, name: Option<String>, file: Option<PathBuf>) -> Result<ExitCode> {
    let (source, loaded) = match (file, name) {
        (Some(path), _) => (path.display().to_string(), ctx.loader.load_path(&path)),
        (None, Some(name)) => {
            let loaded = ctx.loader.load_with_report(&name);
            (name, loaded)
        }
        (None, None) => {
            return Err(SeedbedError::internal(
                "validate needs a document name or --file",
            ));
        }
    };

    match loaded {
        Ok((_, report)) => {
            println!("{}", ctx.formatter.format_validation(&source, &report));
            Ok(ExitCode::SUCCESS)
        }
        Err(SeedbedError::Config(ConfigError::Invalid { errors, .. })) => {
            println!("{}", ctx.formatter.format_invalid(&source, &errors));
            Ok(ExitCode::FAILURE)
        }
        Err(e) => Err(e),
    }
}

/// Provision a document.
async fn cmd_provision(
    ctx: &Context,
    name: &str,
    options: RunOptions,
    report_path: Option<&Path>,
) -> Result<ExitCode> {
    let document = ctx.loader.load(name)?;
    let executor = create_executor(&ctx.settings, options.dry_run)?;
    let engine = Engine::new(executor.as_ref(), options);

    let outcome = engine.provision(&document).await;
    finish_run(ctx, outcome, report_path)
}

/// Tear down a document.
async fn cmd_delete(
    ctx: &Context,
    name: &str,
    options: RunOptions,
    tags: &[String],
    auto_approve: bool,
    report_path: Option<&Path>,
) -> Result<ExitCode> {
    let document = ctx.loader.load(name)?;

    if !auto_approve && !options.dry_run {
        let scope = if tags.is_empty() {
            String::from("every resource")
        } else {
            format!("resources tagged {}", tags.join(", "))
        };
        eprintln!(
            "This will delete {scope} of '{}' carrying {}.",
            document.name,
            document.cleanup_tag(&options.tool_name)
        );
        eprint!("Type 'delete' to confirm: ");
        std::io::stderr().flush()?;

        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;

        if input.trim() != "delete" {
            eprintln!("Delete cancelled.");
            return Ok(ExitCode::SUCCESS);
        }
    }

    let executor = create_executor(&ctx.settings, options.dry_run)?;
    let engine = Engine::new(executor.as_ref(), options);

    let outcome = engine.teardown(&document, tags).await;
    finish_run(ctx, outcome, report_path)
}

/// Builds run options shared by provisioning and teardown.
fn run_options(settings: &Settings, dry_run: bool) -> RunOptions {
    RunOptions::default()
        .with_dry_run(dry_run)
        .with_workspace(settings.workspace.clone())
        .with_tool_name(settings.tool_name.clone())
}

/// Creates the executor for a run. Dry runs never need credentials.
fn create_executor(settings: &Settings, dry_run: bool) -> Result<Box<dyn RequestExecutor>> {
    if dry_run {
        return Ok(Box::new(OfflineExecutor));
    }

    let client = ApiClient::new(settings.require_api_url()?, settings.require_api_key()?)?;
    info!("Using resource service at {}", client.base_url());
    Ok(Box::new(client))
}

/// Prints the report, saves it if asked, and picks the exit code.
fn finish_run(
    ctx: &Context,
    outcome: std::result::Result<RunReport, RunAborted>,
    report_path: Option<&Path>,
) -> Result<ExitCode> {
    match outcome {
        Ok(report) => {
            if let Some(path) = report_path {
                write_report(&report, path)?;
            }
            println!("{}", ctx.formatter.format_report(&report));

            if report.has_failures() {
                Ok(ExitCode::FAILURE)
            } else {
                Ok(ExitCode::SUCCESS)
            }
        }
        Err(aborted) => {
            if let Some(path) = report_path {
                write_report(&aborted.report, path)?;
            }
            println!("{}", ctx.formatter.format_report(&aborted.report));
            error!("{aborted}");
            eprintln!("Error: {aborted}");
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Writes a run report as pretty JSON.
fn write_report(report: &RunReport, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report)
        .map_err(|e| SeedbedError::internal(format!("Failed to serialize run report: {e}")))?;
    std::fs::write(path, json)?;
    info!("Run report written to {}", path.display());
    Ok(())
}
