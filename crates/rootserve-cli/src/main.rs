#![deny(unsafe_code)]

// Use mimalloc for reduced allocation latency (enabled by default).
#[cfg(feature = "mimalloc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

mod config;
mod exit_code;

use std::io;
use std::net::IpAddr;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;
#[cfg(feature = "tokio-console")]
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rootserve_core::{ErrorCategory, ReadOnlyRoot, RootError, RootSandbox};
use rootserve_server::{Listeners, ServerError};

use crate::config::{ConfigError, FileConfig, Overrides, Settings};

/// Serve one directory read-only over HTTP (browser listing) and WebDAV.
#[derive(Parser, Debug)]
#[command(name = "rootserve")]
#[command(author, version)]
#[command(after_help = "EXAMPLES:
    # Serve the current directory on ports 8080 (HTTP) and 8081 (WebDAV)
    rootserve

    # Serve a specific directory on localhost only
    rootserve --path /srv/share --bind 127.0.0.1

    # Mount the share read-only from another machine
    mount -t davfs http://server:8081/ /mnt/share")]
struct Cli {
    /// Directory to serve
    #[arg(long, value_name = "DIR", env = "ROOTSERVE_PATH")]
    path: Option<PathBuf>,

    /// Port for the HTTP browse listener [default: 8080]
    #[arg(long, value_name = "PORT", env = "ROOTSERVE_PORT")]
    port: Option<u16>,

    /// Port for the WebDAV sync listener [default: 8081]
    #[arg(long, value_name = "PORT", env = "ROOTSERVE_DAV_PORT")]
    dav_port: Option<u16>,

    /// Address both listeners bind to [default: 0.0.0.0]
    #[arg(long, value_name = "ADDR", env = "ROOTSERVE_BIND")]
    bind: Option<IpAddr>,

    /// Serve the browse listener as a plain file server instead of the
    /// fixed-width listing
    #[arg(long, env = "ROOTSERVE_FILE_SERVER")]
    file_server: bool,

    /// Hide symbolic links, even those pointing inside the served directory
    #[arg(long, env = "ROOTSERVE_NO_SYMLINKS")]
    no_symlinks: bool,

    /// TOML file with defaults for any of the options above
    #[arg(long, value_name = "FILE", env = "ROOTSERVE_CONFIG")]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, conflicts_with = "quiet")]
    verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long)]
    quiet: bool,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            path: self.path.clone(),
            port: self.port,
            dav_port: self.dav_port,
            bind: self.bind,
            file_server: self.file_server,
            no_symlinks: self.no_symlinks,
        }
    }
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::from(exit_code::CONFIG_ERROR)
            } else {
                ExitCode::from(exit_code::SUCCESS)
            };
        }
    };

    match run(&cli) {
        Ok(()) => ExitCode::from(exit_code::SUCCESS),
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(categorize_error(&e))
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    setup_tracing(cli.verbose, cli.quiet);

    let file = match &cli.config {
        Some(path) => FileConfig::load(path)?,
        None => FileConfig::default(),
    };
    let settings = Settings::resolve(cli.overrides(), file)?;

    let sandbox = RootSandbox::bind(&settings.path, settings.symlink_policy())
        .with_context(|| format!("Cannot serve {}", settings.path.display()))?;
    let fs = ReadOnlyRoot::new(sandbox);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to create tokio runtime")?;

    runtime.block_on(serve(fs, &settings))
}

async fn serve(fs: ReadOnlyRoot, settings: &Settings) -> Result<()> {
    info!(path = %fs.base().display(), "Serving directory");

    let listeners = Listeners::start(fs, &settings.listen_config()).await?;
    info!(url = %listeners.browse_url(), "HTTP listener ready");
    info!(url = %listeners.sync_url(), "WEBDAV listener ready");

    Err(listeners.wait_first_failure().await.into())
}

fn setup_tracing(verbose: u8, quiet: bool) {
    let filter = match (quiet, verbose) {
        (true, _) => "warn",
        (false, 0) => "info",
        (false, 1) => "debug",
        (false, _) => "trace",
    };

    #[cfg(feature = "tokio-console")]
    {
        use std::net::SocketAddr;
        use tracing_subscriber::Layer;

        let console_port: u16 = std::env::var("TOKIO_CONSOLE_PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(6669);

        let console_addr: SocketAddr = ([127, 0, 0, 1], console_port).into();
        let port_available = std::net::TcpListener::bind(console_addr).is_ok();

        let fmt_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into());

        if port_available {
            let console_layer = console_subscriber::ConsoleLayer::builder()
                .server_addr(console_addr)
                .spawn();
            tracing_subscriber::registry()
                .with(console_layer)
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_writer(io::stderr)
                        .with_filter(fmt_filter),
                )
                .init();
            tracing::info!(
                "tokio-console enabled, connect with: tokio-console http://127.0.0.1:{}",
                console_port
            );
        } else {
            tracing_subscriber::registry()
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_writer(io::stderr)
                        .with_filter(fmt_filter),
                )
                .init();
            tracing::warn!(
                "tokio-console port {} already in use, running without console instrumentation.",
                console_port
            );
        }
    }

    #[cfg(not(feature = "tokio-console"))]
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with_writer(io::stderr)
        .init();
}

/// Categorize an error into an exit code using typed error downcasting.
fn categorize_error(e: &anyhow::Error) -> u8 {
    for cause in e.chain() {
        if cause.downcast_ref::<ConfigError>().is_some() {
            return exit_code::CONFIG_ERROR;
        }

        if let Some(root_err) = cause.downcast_ref::<RootError>() {
            return match root_err.category() {
                ErrorCategory::NotFound | ErrorCategory::PermissionDenied => {
                    exit_code::PATH_NOT_FOUND
                }
                ErrorCategory::ReadOnly | ErrorCategory::Internal => exit_code::GENERAL_ERROR,
            };
        }

        if cause.downcast_ref::<ServerError>().is_some() {
            return exit_code::LISTENER_FAILED;
        }
    }
    exit_code::GENERAL_ERROR
}
