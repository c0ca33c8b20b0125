#![forbid(unsafe_code)]

//! `pyrevit-loader`: headless session loader binary.
//!
//! Loads the configured extension roots against an in-memory host, prints
//! the resulting ribbon, and can invoke commands or keep reloading as
//! extension trees change.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use pyrevit_loader::extensions::watcher::ExtensionWatcher;
use pyrevit_loader::host::memory::MemoryHost;
use pyrevit_loader::host::HostContext;
use pyrevit_loader::loader::SessionManager;
use pyrevit_loader::logging::{flush_pending_to_stderr, init_tracing, LogFormat};
use pyrevit_loader::models::extension::CommandId;
use pyrevit_loader::{AppError, LoaderConfig, Result};

/// Quiet period after the last change before a reload starts.
const RELOAD_DEBOUNCE: Duration = Duration::from_millis(300);

#[derive(Debug, Parser)]
#[command(name = "pyrevit-loader", about = "Extension session loader", version, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file; built-in defaults when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log output format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Load the session once and print the ribbon.
    Load {
        /// Print the session report as JSON instead of the ribbon tree.
        #[arg(long)]
        json: bool,
    },
    /// Load the session and invoke one command.
    Run {
        /// Command identity, e.g. `pyrevittools-pyrevit-analysis-listdwgs`.
        command_id: String,

        /// Host context handed to the script, as JSON.
        #[arg(long)]
        context: Option<String>,

        /// Additional reloads before the command is invoked.
        #[arg(long, default_value_t = 0)]
        reload: u32,
    },
    /// Load the session and reload whenever an extension root changes.
    Watch,
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.log_format)?;
    info!("pyrevit-loader bootstrap");

    let result = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::Config(format!("failed to build tokio runtime: {err}")))?
        .block_on(run(args));

    // A fatal bootstrap never attaches a window; surface what was logged.
    flush_pending_to_stderr();
    result
}

async fn run(args: Cli) -> Result<()> {
    // ── Load configuration ──────────────────────────────
    let config = match &args.config {
        Some(path) => LoaderConfig::load_from_path(path)?,
        None => LoaderConfig::default(),
    };
    info!(
        config_file = ?config.config_file,
        roots = config.extension_roots.len(),
        "configuration loaded"
    );

    let mut manager = SessionManager::new(MemoryHost::console(), config)?;

    match args.command {
        Commands::Load { json } => {
            let report = manager.load_session()?;
            if json {
                let rendered = serde_json::to_string_pretty(&report)
                    .map_err(|err| AppError::Output(format!("failed to render report: {err}")))?;
                println!("{rendered}");
            } else {
                print!("{}", manager.host().ribbon().render_tree());
            }
        }
        Commands::Run {
            command_id,
            context,
            reload,
        } => {
            for _ in 0..=reload {
                manager.load_session()?;
            }
            let context = parse_context(context.as_deref())?;
            let cancel = CancellationToken::new();
            let command = CommandId::from(command_id.as_str());

            let invocation = manager.invoke(&command, &context, &cancel);
            tokio::pin!(invocation);
            let outcome = tokio::select! {
                outcome = &mut invocation => outcome?,
                _ = tokio::signal::ctrl_c() => {
                    cancel.cancel();
                    invocation.await?
                }
            };

            if !outcome.is_success() {
                return Err(AppError::Script(format!("{command}: {outcome}")));
            }
        }
        Commands::Watch => watch(&mut manager).await?,
    }

    info!("pyrevit-loader shut down");
    Ok(())
}

fn parse_context(raw: Option<&str>) -> Result<HostContext> {
    match raw {
        None => Ok(HostContext::default()),
        Some(raw) => serde_json::from_str(raw)
            .map(HostContext)
            .map_err(|err| AppError::Config(format!("invalid --context JSON: {err}"))),
    }
}

async fn watch(manager: &mut SessionManager<MemoryHost>) -> Result<()> {
    manager.load_session()?;

    let roots = manager.config().ext_root_dirs();
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let _watcher = ExtensionWatcher::new(&roots, tx)?;
    info!(roots = roots.len(), "watching for extension changes, press Ctrl-C to stop");

    loop {
        tokio::select! {
            changed = rx.recv() => {
                let Some(path) = changed else {
                    warn!("extension watcher stopped");
                    break;
                };
                info!(path = %path.display(), "extension change detected");

                // Collapse a burst of events into one reload.
                while let Ok(Some(_)) = tokio::time::timeout(RELOAD_DEBOUNCE, rx.recv()).await {}

                if let Err(err) = manager.load_session() {
                    error!(%err, "session reload failed");
                }
            }
            signal = tokio::signal::ctrl_c() => {
                if let Err(err) = signal {
                    error!(%err, "ctrl-c signal handler failed");
                }
                info!("shutdown signal received");
                break;
            }
        }
    }
    Ok(())
}
