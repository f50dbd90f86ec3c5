use clap::{Args, Parser, Subcommand};
use ra_listener::capture::interface::{
    interface_mac, link_local_address, list_interfaces, validate_interface,
};
use ra_listener::capture::{AfPacketSocket, CAPTURE_FILTER, router_advertisement_filter};
use ra_listener::config::{self, Config};
use ra_listener::dataplane::{
    ListenerSettings, RaListener, ScriptMutator, Soliciter, build_solicitation,
};
use ra_listener::telemetry::{ListenerStats, init_logging};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "ra-listener", version)]
#[command(about = "Apply ULA routes learned from IPv6 Router Advertisements")]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    run: RunArgs,
}

#[derive(Subcommand)]
enum Commands {
    /// Listen for Router Advertisements (default)
    Run(RunArgs),
    /// List network interfaces available on this host
    Interfaces,
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Validate a config file
    Validate {
        /// Path to config.toml
        #[arg(short, long, default_value = "config.toml")]
        config: PathBuf,
    },
}

#[derive(Args, Default)]
struct RunArgs {
    /// Path to config.toml (defaults apply when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Interface to listen on
    #[arg(short, long)]
    interface: Option<String>,

    /// Executable that applies a route
    #[arg(long)]
    script: Option<PathBuf>,

    /// Log non-ULA prefixes at info level
    #[arg(long)]
    log_ignored: bool,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,

    /// Do not send Router Solicitations
    #[arg(long)]
    no_solicit: bool,
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Some(Commands::Run(args)) => cmd_run(args),
        Some(Commands::Interfaces) => cmd_interfaces(),
        Some(Commands::Config {
            action: ConfigAction::Validate { config },
        }) => cmd_config_validate(&config),
        None => cmd_run(cli.run),
    };

    if let Err(e) = result {
        eprintln!("[ERROR] {}", e);
        std::process::exit(1);
    }
}

/// Load the config file (if any) and layer command-line flags over it
fn effective_config(args: &RunArgs) -> Result<Config, String> {
    let mut cfg = match &args.config {
        Some(path) => config::load(path)
            .map_err(|e| format!("Failed to load {}: {}", path.display(), e))?,
        None => Config::default(),
    };

    if let Some(ref interface) = args.interface {
        cfg.listener.interface = interface.clone();
    }
    if let Some(ref script) = args.script {
        cfg.routes.script = script.clone();
    }
    if args.log_ignored {
        cfg.listener.log_ignored = true;
    }
    if args.debug {
        cfg.logging.level = "debug".to_string();
    }
    if args.no_solicit {
        cfg.solicitation.enabled = false;
    }

    Ok(cfg)
}

fn cmd_run(args: RunArgs) -> Result<(), String> {
    let cfg = effective_config(&args)?;
    init_logging(Some(&cfg.logging));

    let validation = config::validate(&cfg);
    for warning in &validation.warnings {
        warn!("{}", warning);
    }
    if validation.has_errors() {
        return Err(format!(
            "Invalid configuration: {}",
            validation.errors.join("; ")
        ));
    }

    validate_interface(&cfg.listener.interface).map_err(|e| {
        let available = list_interfaces().join(", ");
        format!("{} (available: {})", e, available)
    })?;

    print_banner(&cfg);

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("Failed to create runtime: {}", e))?;

    rt.block_on(listen(cfg))
}

async fn listen(cfg: Config) -> Result<(), String> {
    let interface = cfg.listener.interface.clone();
    let stats = Arc::new(ListenerStats::new());
    let cancel = CancellationToken::new();

    let mut rx = AfPacketSocket::bind_ipv6(
        &interface,
        &router_advertisement_filter(),
        cfg.listener.promiscuous,
    )
    .map_err(|e| {
        format!(
            "Failed to open capture socket on {}: {}. Run with root privileges.",
            interface, e
        )
    })?;

    tokio::spawn(shutdown_signal(cancel.clone()));

    let soliciter = if cfg.solicitation.enabled {
        let tx = AfPacketSocket::bind_tx(&interface)
            .map_err(|e| format!("Failed to open transmit socket on {}: {}", interface, e))?;
        let frame = build_solicitation(interface_mac(&interface), link_local_address(&interface));
        let task = Soliciter::new(
            tx,
            interface.as_str(),
            frame,
            cfg.solicitation.interval(),
            stats.clone(),
        );
        Some(tokio::spawn(task.run(cancel.clone())))
    } else {
        info!("router solicitation disabled");
        None
    };

    let settings = ListenerSettings {
        interface: interface.clone(),
        dedup_window: cfg.listener.dedup_window(),
        log_ignored: cfg.listener.log_ignored,
        retry_failed: cfg.routes.retry_failed,
    };
    let mut listener = RaListener::new(
        settings,
        ScriptMutator::new(cfg.routes.script.clone()),
        stats.clone(),
    );

    let result = listener.run(&mut rx, cancel.clone()).await;

    cancel.cancel();
    if let Some(handle) = soliciter {
        if let Err(e) = handle.await {
            warn!("solicitation task ended abnormally: {}", e);
        }
    }

    info!(routes = listener.tracker().len(), "ra-listener stopped");
    for (name, value) in stats.export() {
        info!(counter = name, value, "summary");
    }

    result.map_err(|e| e.to_string())
}

fn print_banner(cfg: &Config) {
    info!("ra-listener {} starting", env!("CARGO_PKG_VERSION"));
    info!(
        interface = %cfg.listener.interface,
        script = %cfg.routes.script.display(),
        dedup_window_ms = cfg.listener.dedup_window_ms,
        retry_failed = cfg.routes.retry_failed,
        "listener settings"
    );
    if cfg.solicitation.enabled {
        info!(
            interval_secs = cfg.solicitation.interval_secs,
            "router solicitation enabled"
        );
    }
    info!(filter = CAPTURE_FILTER, "capture filter");
    info!("available interfaces: {}", list_interfaces().join(", "));
}

/// Cancel `cancel` on Ctrl-C or SIGTERM
async fn shutdown_signal(cancel: CancellationToken) {
    use tokio::signal::unix::{SignalKind, signal};

    let mut term = match signal(SignalKind::terminate()) {
        Ok(s) => Some(s),
        Err(e) => {
            warn!("cannot listen for SIGTERM: {}", e);
            None
        }
    };
    let sigterm = async {
        match term.as_mut() {
            Some(s) => {
                s.recv().await;
            }
            None => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        _ = cancel.cancelled() => return,
        _ = tokio::signal::ctrl_c() => info!("interrupted, shutting down"),
        _ = sigterm => info!("terminated, shutting down"),
    }

    cancel.cancel();
}

fn cmd_interfaces() -> Result<(), String> {
    for name in list_interfaces() {
        match interface_mac(&name) {
            Some(mac) => println!("{:<16} {}", name, mac),
            None => println!("{}", name),
        }
    }
    Ok(())
}

fn cmd_config_validate(config_path: &PathBuf) -> Result<(), String> {
    println!("[INFO] Validating {}...", config_path.display());

    let cfg = config::load(config_path).map_err(|e| format!("Failed to parse config: {}", e))?;

    let validation = config::validate(&cfg);
    validation.print_diagnostics();

    if validation.has_errors() {
        Err("Validation failed".to_string())
    } else {
        println!("[INFO] Configuration is valid");
        Ok(())
    }
}
