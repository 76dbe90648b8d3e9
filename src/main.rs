//! redirectpizza CLI entrypoint.
//!
//! This is the main entrypoint for the redirectpizza command-line tool.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use redirectpizza::api::{ClientConfig, RedirectClient, RedirectId};
use redirectpizza::cli::{Cli, Commands, OutputFormatter};
use redirectpizza::config::{find_config_file, ConfigParser, ConfigValidator, Manifest, SpecHasher};
use redirectpizza::error::{ConfigError, ReconcileError, Result};
use redirectpizza::planner::{ActionResult, ApplyPlan, DiffEngine, PlanExecutor};
use redirectpizza::reconciler::Reconciler;
use redirectpizza::state::{LocalStateStore, StateStore, TrackedRedirect, DEFAULT_STATE_PATH};

use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Main entrypoint.
fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Initializes the logging system.
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Main async entry point.
async fn run(cli: Cli) -> Result<()> {
    let formatter = OutputFormatter::new(cli.output);

    match &cli.command {
        Commands::Validate { warnings } => cmd_validate(&cli, *warnings, &formatter),
        Commands::Plan => cmd_plan(&cli, &formatter).await,
        Commands::Apply {
            yes,
            continue_on_error,
        } => cmd_apply(&cli, *yes, *continue_on_error, &formatter).await,
        Commands::Refresh => cmd_refresh(&cli, &formatter).await,
        Commands::Import { name, id } => cmd_import(&cli, name, id, &formatter).await,
        Commands::Show { name } => cmd_show(&cli, name.as_deref(), &formatter).await,
        Commands::Destroy { yes, name } => {
            cmd_destroy(&cli, *yes, name.as_deref(), &formatter).await
        }
    }
}

/// Validate the manifest.
fn cmd_validate(cli: &Cli, show_warnings: bool, formatter: &OutputFormatter) -> Result<()> {
    let config_file = resolve_config_path(cli)?;
    info!("Validating manifest: {}", config_file.display());

    let manifest = ConfigParser::new().load_file(&config_file)?;
    let result = ConfigValidator::new().validate(&manifest)?;

    emit(&formatter.format_validation(&manifest, &result, show_warnings)?)
}

/// Show the apply plan.
async fn cmd_plan(cli: &Cli, formatter: &OutputFormatter) -> Result<()> {
    let (manifest, store) = load_manifest_and_state(cli)?;
    let state = store.load().await?;

    let diff = DiffEngine::new().compute_diff(&manifest, state.as_ref());
    let plan = ApplyPlan::from_diff(&diff, &manifest);

    emit(&formatter.format_plan(&plan)?)
}

/// Apply the plan.
async fn cmd_apply(
    cli: &Cli,
    auto_approve: bool,
    continue_on_error: bool,
    formatter: &OutputFormatter,
) -> Result<()> {
    let (manifest, store) = load_manifest_and_state(cli)?;
    let mut state = store.load().await?.unwrap_or_default();

    let diff = DiffEngine::new().compute_diff(&manifest, Some(&state));
    let plan = ApplyPlan::from_diff(&diff, &manifest);

    if plan.is_empty() {
        return emit(&formatter.format_plan(&plan)?);
    }

    eprintln!("{plan}");

    if !auto_approve && !confirm("Do you want to apply this plan? [y/N]: ", "y")? {
        eprintln!("Apply cancelled.");
        return Ok(());
    }

    let reconciler = create_reconciler(cli, &manifest)?;
    let result = PlanExecutor::new(&reconciler)
        .with_continue_on_error(continue_on_error)
        .execute(&plan, &mut state)
        .await;

    store.save(&state).await?;
    emit(&formatter.format_execution(&result)?)?;

    if result.success {
        Ok(())
    } else {
        Err(ReconcileError::ResourceReconcileFailed {
            name: failed_names(&result.results),
            reason: format!("{} of {} actions failed", result.failed, plan.action_count()),
        }
        .into())
    }
}

/// Re-read tracked redirects and report drift.
async fn cmd_refresh(cli: &Cli, formatter: &OutputFormatter) -> Result<()> {
    let (manifest, store) = load_manifest_and_state(cli)?;

    let Some(mut state) = store.load().await? else {
        eprintln!("No state found.");
        return Ok(());
    };

    let reconciler = create_reconciler(cli, &manifest)?;
    let report = reconciler.refresh(&manifest, &mut state).await;

    store.save(&state).await?;
    emit(&formatter.format_drift(&report)?)
}

/// Start tracking an existing remote redirect.
async fn cmd_import(cli: &Cli, name: &str, id: &str, formatter: &OutputFormatter) -> Result<()> {
    let (manifest, store) = load_manifest_and_state(cli)?;

    let declaration = manifest.redirect(name).ok_or_else(|| ConfigError::UnknownRedirect {
        name: name.to_string(),
    })?;

    let mut state = store.load().await?.unwrap_or_default();
    let id: RedirectId = id.parse()?;

    if let Some(existing) = state.name_for_id(&id) {
        return Err(ReconcileError::ResourceReconcileFailed {
            name: name.to_string(),
            reason: format!("redirect {id} is already tracked as '{existing}'"),
        }
        .into());
    }
    if state.get(name).is_some_and(|t| t.resource.is_created()) {
        return Err(ReconcileError::ResourceReconcileFailed {
            name: name.to_string(),
            reason: String::from("a redirect is already tracked under this name"),
        }
        .into());
    }

    let reconciler = create_reconciler(cli, &manifest)?;
    let resource = reconciler.import(id).await?;

    let spec_hash = SpecHasher::new().hash_spec(&declaration.spec);
    state.set(TrackedRedirect::new(name, &spec_hash, resource));
    store.save(&state).await?;

    info!("Imported redirect '{name}'");
    emit(&formatter.format_state(&state, Some(name))?)
}

/// Show tracked redirects.
async fn cmd_show(cli: &Cli, name: Option<&str>, formatter: &OutputFormatter) -> Result<()> {
    let store = match &cli.state {
        Some(path) => open_state_store(path.clone()),
        None => load_manifest_and_state(cli)?.1,
    };

    let Some(state) = store.load().await? else {
        eprintln!("No state found.");
        return Ok(());
    };

    if let Some(name) = name {
        if state.get(name).is_none() {
            eprintln!("Redirect '{name}' is not tracked.");
            return Ok(());
        }
    }

    emit(&formatter.format_state(&state, name)?)
}

/// Delete tracked redirects.
async fn cmd_destroy(
    cli: &Cli,
    auto_approve: bool,
    name: Option<&str>,
    formatter: &OutputFormatter,
) -> Result<()> {
    let (manifest, store) = load_manifest_and_state(cli)?;
    let Some(mut state) = store.load().await? else {
        eprintln!("No redirects to destroy.");
        return Ok(());
    };

    let plan = ApplyPlan::destroy(&state, name);
    if plan.is_empty() {
        eprintln!("No redirects to destroy.");
        return Ok(());
    }

    eprintln!("The following redirects will be destroyed:");
    for action in &plan.actions {
        let id = action
            .redirect_id
            .as_ref()
            .map_or_else(|| String::from("untracked"), ToString::to_string);
        eprintln!("  - {} ({id})", action.resource_name);
    }

    if !auto_approve
        && !confirm("\nThis action is IRREVERSIBLE. Type 'destroy' to confirm: ", "destroy")?
    {
        eprintln!("Destruction cancelled.");
        return Ok(());
    }

    let reconciler = create_reconciler(cli, &manifest)?;
    let result = PlanExecutor::new(&reconciler)
        .with_continue_on_error(true)
        .execute(&plan, &mut state)
        .await;

    if state.is_empty() && store.exists().await? {
        store.delete().await?;
    } else {
        store.save(&state).await?;
    }

    emit(&formatter.format_execution(&result)?)
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Resolves the manifest path.
fn resolve_config_path(cli: &Cli) -> Result<PathBuf> {
    cli.config
        .as_ref()
        .map_or_else(|| find_config_file("."), |path| Ok(path.clone()))
}

/// Loads and validates the manifest, then opens the state store.
fn load_manifest_and_state(cli: &Cli) -> Result<(Manifest, Box<dyn StateStore>)> {
    let config_file = resolve_config_path(cli)?;
    debug!("Loading manifest from: {}", config_file.display());

    let base_dir = config_file.parent().unwrap_or_else(|| Path::new("."));
    let parser = ConfigParser::new().with_base_path(base_dir);
    parser.load_dotenv()?;

    let manifest = parser.load_with_env(&config_file)?;
    ConfigValidator::new().validate(&manifest)?;

    let state_path = cli.state.clone().unwrap_or_else(|| {
        manifest.state.path.as_ref().map_or_else(
            || base_dir.join(DEFAULT_STATE_PATH),
            |path| base_dir.join(path),
        )
    });

    Ok((manifest, open_state_store(state_path)))
}

/// Opens the state store at the given path.
fn open_state_store(path: PathBuf) -> Box<dyn StateStore> {
    let store = LocalStateStore::with_state_path(&path);
    debug!("Using {} state store at {}", store.backend_type(), path.display());
    Box::new(store)
}

/// Creates the reconciliation engine from flags, environment and manifest.
fn create_reconciler(cli: &Cli, manifest: &Manifest) -> Result<Reconciler<RedirectClient>> {
    let token = match &cli.token {
        Some(token) => token.clone(),
        None => ConfigParser::get_api_token()?,
    };

    let mut config = ClientConfig::new(token);
    if let Some(base_url) = cli
        .api_base_url
        .as_ref()
        .or(manifest.provider.api_base_url.as_ref())
    {
        config = config.with_base_url(base_url);
    }
    if let Some(secs) = manifest.provider.timeout_secs {
        config = config.with_timeout(Duration::from_secs(secs));
    }

    Ok(Reconciler::new(RedirectClient::new(config)?))
}

/// Asks for confirmation on stderr, reading the answer from stdin.
fn confirm(prompt: &str, expected: &str) -> Result<bool> {
    eprint!("{prompt}");
    std::io::stderr().flush()?;

    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;

    Ok(input.trim().eq_ignore_ascii_case(expected))
}

/// Writes command output to stdout.
fn emit(output: &str) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(output.as_bytes())?;
    if !output.ends_with('\n') {
        stdout.write_all(b"\n")?;
    }
    Ok(())
}

/// Joins the names of failed actions.
fn failed_names(results: &[ActionResult]) -> String {
    results
        .iter()
        .filter(|r| !r.success)
        .map(|r| r.action.resource_name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
