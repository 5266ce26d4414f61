// ABOUTME: Command-line entry point for the CNPJ ETL console
// ABOUTME: Wires session, lookups, and the ETL validate/start/watch workflow

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use dialoguer::{Confirm, Input, Password};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::EnvFilter;

use cnpj_etl_console::config::{self, ConsoleConfig};
use cnpj_etl_console::control::gate::{self, StartDecision};
use cnpj_etl_console::control::poller::{PollSnapshot, StatusPoller};
use cnpj_etl_console::remote::client::ApiClient;
use cnpj_etl_console::remote::models::{EtlStartRequest, EtlStatus, EtlValidation, JobState};
use cnpj_etl_console::session::{Session, SessionStore};

#[derive(Parser)]
#[command(
    name = "cnpj-etl-console",
    version,
    about = "Operator console for the CNPJ registry API"
)]
struct Cli {
    /// Override the API base URL from the config file
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Authenticate against the API and store the session token
    Login {
        #[arg(long)]
        email: Option<String>,
    },
    /// Remove the stored session token
    Logout,
    /// Show the authenticated user
    Whoami,
    /// Look up a company by CNPJ
    Lookup { cnpj: String },
    /// Control and monitor the registry data import
    Etl {
        #[command(subcommand)]
        command: EtlCommands,
    },
}

#[derive(Subcommand)]
enum EtlCommands {
    /// Run the pre-start checks and show their outcome
    Validate,
    /// Validate, then start an import (prompts when there are warnings)
    Start {
        /// Reuse ZIPs already downloaded on the server
        #[arg(long)]
        skip_download: bool,
        /// Tables to import, comma-separated (default: all)
        #[arg(long, value_delimiter = ',')]
        tables: Vec<String>,
        /// Answer yes to the warning prompt
        #[arg(long, short = 'y')]
        yes: bool,
        /// Do not follow the job after starting it
        #[arg(long)]
        detach: bool,
    },
    /// Show the current job snapshot once
    Status,
    /// Follow the running job until it reaches a terminal state
    Watch,
    /// Show the tail of the server-side import log
    Logs {
        #[arg(long, default_value_t = 100)]
        lines: u32,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();
    let config = ConsoleConfig::load(&config::default_config_path())?;
    let base_url = cli.api_url.unwrap_or_else(|| config.api_base_url.clone());
    let store = SessionStore::new(SessionStore::default_path());

    match cli.command {
        Commands::Login { email } => login(&base_url, &store, email).await,
        Commands::Logout => logout(&store),
        Commands::Whoami => whoami(open_client(&base_url, &store)?).await,
        Commands::Lookup { cnpj } => lookup(open_client(&base_url, &store)?, &cnpj).await,
        Commands::Etl { command } => {
            let client = open_client(&base_url, &store)?;
            let interval = config.poll_interval();
            match command {
                EtlCommands::Validate => etl_validate(client).await,
                EtlCommands::Start {
                    skip_download,
                    tables,
                    yes,
                    detach,
                } => etl_start(client, interval, skip_download, tables, yes, detach).await,
                EtlCommands::Status => etl_status(client).await,
                EtlCommands::Watch => watch_job(client, interval).await,
                EtlCommands::Logs { lines } => etl_logs(client, lines).await,
            }
        }
    }
}

/// Builds a client bound to the stored session token, if any. Without a
/// token requests go out unauthenticated and the server's 401 is surfaced.
fn open_client(base_url: &str, store: &SessionStore) -> Result<Arc<ApiClient>> {
    let token = store.token()?;
    Ok(Arc::new(ApiClient::new(base_url, token)?))
}

async fn login(base_url: &str, store: &SessionStore, email: Option<String>) -> Result<()> {
    let email = match email {
        Some(email) => email,
        None => Input::new().with_prompt("Email").interact_text()?,
    };
    let password = Password::new().with_prompt("Password").interact()?;

    let anonymous = ApiClient::new(base_url, None)?;
    let token = anonymous
        .login(&email, &password)
        .await
        .context("Login failed")?;

    let client = ApiClient::new(base_url, Some(token.access_token.clone()))?;
    let user = client
        .current_user()
        .await
        .context("Login succeeded but fetching the user profile failed")?;

    store.save(&Session {
        access_token: token.access_token,
        email: Some(user.email.clone()),
    })?;
    info!(email = %user.email, "session stored");

    println!("Logged in as {} ({})", user.full_name, user.email);
    if !user.is_superuser {
        println!("Note: the ETL commands require an admin account.");
    }
    Ok(())
}

fn logout(store: &SessionStore) -> Result<()> {
    store.clear()?;
    println!("Session removed.");
    Ok(())
}

async fn whoami(client: Arc<ApiClient>) -> Result<()> {
    let user = client.current_user().await.context("Not logged in")?;
    println!("{} ({})", user.full_name, user.email);
    println!(
        "active: {}  admin: {}  verified: {}",
        user.is_active, user.is_superuser, user.is_verified
    );
    Ok(())
}

async fn lookup(client: Arc<ApiClient>, cnpj: &str) -> Result<()> {
    let company = client
        .lookup_cnpj(cnpj)
        .await
        .with_context(|| format!("Lookup failed for CNPJ {}", cnpj))?;
    println!("{}", serde_json::to_string_pretty(&company)?);
    Ok(())
}

async fn etl_validate(client: Arc<ApiClient>) -> Result<()> {
    let validation = client.validate().await.context("Validation request failed")?;
    print_validation(&validation);
    if !validation.errors.is_empty() {
        bail!("Pre-start checks found blocking problems");
    }
    Ok(())
}

async fn etl_start(
    client: Arc<ApiClient>,
    interval: Duration,
    skip_download: bool,
    tables: Vec<String>,
    yes: bool,
    detach: bool,
) -> Result<()> {
    let validation = client
        .validate()
        .await
        .context("Pre-start validation failed")?;

    let decision = gate::decide(&validation);
    let force = gate::authorize(&decision, |warnings| confirm_despite_warnings(warnings, yes));

    let force = match force {
        Some(force) => force,
        None => match decision {
            StartDecision::Blocked(errors) => {
                eprintln!("The import cannot start:");
                for error in &errors {
                    eprintln!("  - {}", error);
                }
                bail!("Import refused by pre-start checks");
            }
            _ => {
                println!("Cancelled.");
                return Ok(());
            }
        },
    };

    let request = EtlStartRequest {
        force,
        skip_download,
        tables: if tables.is_empty() {
            vec!["all".to_string()]
        } else {
            tables
        },
    };
    let ack = client
        .start(&request)
        .await
        .context("Failed to start the import")?;
    info!(job_id = %ack.job_id, forced = force, "import started");
    println!("{} (job {})", ack.message, ack.job_id);

    if detach {
        return Ok(());
    }
    watch_job(client, interval).await
}

fn confirm_despite_warnings(warnings: &[String], yes: bool) -> bool {
    println!("The pre-start checks raised warnings:");
    for warning in warnings {
        println!("  - {}", warning);
    }
    if yes {
        return true;
    }
    Confirm::new()
        .with_prompt("Start the import anyway?")
        .default(false)
        .interact()
        .unwrap_or(false)
}

async fn etl_status(client: Arc<ApiClient>) -> Result<()> {
    let status = client
        .fetch_status()
        .await
        .context("Status request failed")?;
    print_status(&status);
    Ok(())
}

async fn watch_job(client: Arc<ApiClient>, interval: Duration) -> Result<()> {
    let poller = StatusPoller::spawn(client, interval);
    let mut snapshots = poller.subscribe();

    let bar = ProgressBar::new(100);
    bar.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {bar:40.cyan/dim} {percent:>3}% {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("##-"),
    );
    bar.enable_steady_tick(Duration::from_millis(120));

    tokio::select! {
        _ = follow(&mut snapshots, &bar) => {
            let last = poller.join().await;
            bar.finish_and_clear();
            report_outcome(last)
        }
        _ = tokio::signal::ctrl_c() => {
            poller.shutdown().await;
            bar.finish_and_clear();
            println!("Stopped watching; the import keeps running server-side.");
            Ok(())
        }
    }
}

async fn follow(snapshots: &mut watch::Receiver<PollSnapshot>, bar: &ProgressBar) {
    while snapshots.changed().await.is_ok() {
        let snapshot = snapshots.borrow_and_update().clone();
        if let Some(error) = &snapshot.last_error {
            bar.println(format!("status fetch failed: {} (still watching)", error));
        }
        if let Some(status) = &snapshot.status {
            bar.set_position(status.progress_percent.clamp(0.0, 100.0).round() as u64);
            bar.set_message(progress_message(status));
        }
    }
}

fn report_outcome(last: PollSnapshot) -> Result<()> {
    match last.status {
        Some(status) => match &status.state {
            JobState::Completed => {
                println!(
                    "Import completed: {} records from {} files in {}s",
                    status.records_imported, status.files_processed, status.elapsed_seconds
                );
                Ok(())
            }
            JobState::Failed => bail!(
                "Import failed: {}",
                status
                    .error_message
                    .clone()
                    .unwrap_or_else(|| "no error message from server".to_string())
            ),
            JobState::Idle => {
                println!("No import is running.");
                Ok(())
            }
            state => {
                println!("Import is in state \"{}\"; not following it.", state);
                Ok(())
            }
        },
        None => match last.last_error {
            Some(error) => bail!("Could not fetch import status: {}", error),
            None => {
                println!("No status available.");
                Ok(())
            }
        },
    }
}

fn progress_message(status: &EtlStatus) -> String {
    let mut parts = Vec::new();
    if let Some(step) = &status.current_step {
        parts.push(step.clone());
    }
    if let Some(table) = &status.current_table {
        parts.push(table.clone());
    }
    if status.files_total > 0 {
        parts.push(format!(
            "{}/{} files",
            status.files_processed, status.files_total
        ));
    }
    parts.join(" | ")
}

async fn etl_logs(client: Arc<ApiClient>, lines: u32) -> Result<()> {
    let logs = client
        .fetch_logs(lines)
        .await
        .context("Log request failed")?;
    for line in &logs.logs {
        println!("{}", line);
    }
    eprintln!("({} lines on server)", logs.total_lines);
    Ok(())
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

fn print_validation(validation: &EtlValidation) {
    println!(
        "Disk: {:.1} GB free / {:.1} GB used",
        validation.disk_free_gb, validation.disk_used_gb
    );
    println!("PostgreSQL running: {}", yes_no(validation.postgres_running));
    println!("Tables present: {}", yes_no(validation.tables_exist));
    for error in &validation.errors {
        println!("Error: {}", error);
    }
    for warning in &validation.warnings {
        println!("Warning: {}", warning);
    }
    println!("Safe to start: {}", yes_no(validation.can_proceed));
}

fn print_status(status: &EtlStatus) {
    if status.has_job() {
        println!("Job:       {}", status.job_id);
    } else {
        println!("Job:       (none yet)");
    }
    println!("State:     {}", status.state);
    println!("Progress:  {:.1}%", status.progress_percent);
    println!("Files:     {}/{}", status.files_processed, status.files_total);
    println!("Records:   {}", status.records_imported);
    if let Some(step) = &status.current_step {
        println!("Step:      {}", step);
    }
    if let Some(file) = &status.current_file {
        println!("File:      {}", file);
    }
    if let Some(table) = &status.current_table {
        println!("Table:     {}", table);
    }
    if let Some(started) = &status.started_at {
        println!("Started:   {}", started);
    }
    if let Some(completed) = &status.completed_at {
        println!("Finished:  {}", completed);
    }
    if status.elapsed_seconds > 0 {
        println!("Elapsed:   {}s", status.elapsed_seconds);
    }
    if let Some(remaining) = status.estimated_remaining_seconds {
        println!("Remaining: ~{}s", remaining);
    }
    if let Some(message) = &status.error_message {
        println!("Error:     {}", message);
    }
    for warning in &status.warnings {
        println!("Warning:   {}", warning);
    }
}
