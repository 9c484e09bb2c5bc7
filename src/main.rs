use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use osinventory::config::Config;
use osinventory::openstack::client::OpenStackClient;
use osinventory::openstack::http::format_api_error;
use osinventory::report::Report;
use osinventory::resource::Coordinator;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Inventory report of an OpenStack project
#[derive(Parser, Debug)]
#[command(name = "osinventory", version, about, long_about = None)]
struct Args {
    /// Identity user name
    #[arg(short, long, env = "OS_USERNAME")]
    username: Option<String>,

    /// Identity password
    #[arg(long, visible_alias = "pwd", env = "OS_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Project (tenant) id
    #[arg(short, long, env = "OS_TENANT_ID")]
    project: Option<String>,

    /// Identity endpoint, e.g. https://identity.example.com/v2.0
    #[arg(long, alias = "auth_url", visible_alias = "url", env = "OS_AUTH_URL")]
    auth_url: Option<String>,

    /// Region to read endpoints for
    #[arg(short, long, alias = "region_name", env = "OS_REGION_NAME")]
    region_name: Option<String>,

    /// Also write the report to this file
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Log level for stderr (RUST_LOG takes precedence)
    #[arg(long, value_enum, default_value = "warn")]
    log_level: LogLevel,

    /// Also log to a file; without PATH the log goes to the user data directory
    #[arg(long, value_name = "PATH")]
    log_file: Option<Option<PathBuf>>,
}

impl Args {
    fn config(&self) -> Config {
        Config {
            username: self.username.clone(),
            password: self.password.clone(),
            project: self.project.clone(),
            auth_url: self.auth_url.clone(),
            region_name: self.region_name.clone(),
            file: self.file.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn as_directive(self) -> &'static str {
        match self {
            LogLevel::Off => "off",
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

fn setup_logging(level: LogLevel, log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_directive()));

    let stderr_layer = fmt::layer().with_writer(std::io::stderr).with_target(false);

    let (file_layer, guard) = match log_file {
        Some(log_path) => {
            if let Some(parent) = log_path.parent() {
                let _ = std::fs::create_dir_all(parent);
            }

            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(log_path)
                .with_context(|| format!("Failed to open log file {}", log_path.display()))?;

            let (non_blocking, guard) = tracing_appender::non_blocking(file);
            let layer = fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(true)
                .with_line_number(true);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();

    tracing::info!("osinventory started with log level: {:?}", level);
    if let Some(log_path) = log_file {
        tracing::info!("Log file: {:?}", log_path);
    }

    Ok(guard)
}

fn default_log_path() -> PathBuf {
    if let Some(data_dir) = dirs::data_local_dir() {
        return data_dir.join("osinventory").join("osinventory.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".osinventory").join("osinventory.log");
    }
    PathBuf::from("osinventory.log")
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    let log_path = args
        .log_file
        .clone()
        .map(|path| path.unwrap_or_else(default_log_path));
    let _log_guard = setup_logging(args.log_level, log_path.as_deref())?;

    let config = args.config();
    let creds = match config.credentials() {
        Ok(creds) => creds,
        Err(err) => {
            println!("{}", err);
            return Ok(ExitCode::from(2));
        }
    };

    eprintln!(
        "Collecting inventory of project {} in region {}",
        creds.project, creds.region_name
    );
    let started = Instant::now();

    let client = match OpenStackClient::new(&creds).await {
        Ok(client) => client,
        Err(err) => {
            tracing::error!("Authentication failed: {:#}", err);
            eprintln!("Authentication failed: {}", format_api_error(&err));
            return Ok(ExitCode::FAILURE);
        }
    };

    let store = Coordinator::new(Arc::new(client)).run().await;
    let report = Report::build(&store, &creds.project);

    print!("{}", report);

    if let Some(path) = &config.file {
        if let Err(err) = report.write_to(path) {
            eprintln!("Error: {:#}", err);
            return Ok(ExitCode::FAILURE);
        }
    }

    eprintln!("--- {:.2} seconds ---", started.elapsed().as_secs_f64());

    Ok(ExitCode::SUCCESS)
}
