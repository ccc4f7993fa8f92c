//! beam command-line entry point.
//!
//! Parses arguments, loads the configuration, installs logging, and wires the
//! infrastructure adapters into the use cases.
//!
//! # Architecture
//!
//! ```text
//! beam emit <file>
//!  └─ load_config()            -- file, then --flags / BEAM_* env on top
//!  └─ EmitterListener::bind()
//!  └─ EmitFileUseCase::execute(listener.accept(), Spinner)
//!
//! beam absorb <code>
//!  └─ load_config()
//!  └─ dialer::connect()
//!  └─ AbsorbFileUseCase::execute(PromptApproval | AutoApprove, DiskSink)
//! ```

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use beam::application::absorb::{
    AbsorbError, AbsorbFileUseCase, AbsorbOutcome, AutoApprove, DeclineReason, TransferApproval,
};
use beam::application::emit::EmitFileUseCase;
use beam::infrastructure::network::{dialer, listener::EmitterListener};
use beam::infrastructure::storage::config::{
    config_file_path, load_config, save_config, AppConfig,
};
use beam::infrastructure::storage::sink::{DiskSink, FALLBACK_FILE_NAME};
use beam::infrastructure::ui::{prompt::PromptApproval, size::human_size, spinner::Spinner};
use beam_core::{Absorber, BeamCode, Endpoint, FileInfo};

#[derive(Parser)]
#[command(name = "beam", version, about = "Beam one file to another machine over TCP")]
struct Cli {
    /// Config file to use instead of the platform default.
    #[arg(long, global = true, env = "BEAM_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Offer a file and print the beam code the absorber needs.
    Emit(EmitArgs),

    /// Receive a file from an emitter.
    Absorb(AbsorbArgs),

    /// Inspect or create the configuration file.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Args)]
struct EmitArgs {
    /// File to send.
    file: PathBuf,

    /// Address to listen on.
    #[arg(long, env = "BEAM_BIND")]
    bind: Option<String>,

    /// Port to listen on.
    #[arg(short, long, env = "BEAM_PORT")]
    port: Option<u16>,

    /// File bytes per chunk (1-65535).
    #[arg(long, env = "BEAM_CHUNK_SIZE")]
    chunk_size: Option<u32>,

    /// Give up if no absorber connects within this many seconds (0 = never).
    #[arg(long, env = "BEAM_ACCEPT_TIMEOUT")]
    accept_timeout: Option<u64>,
}

#[derive(Args)]
struct AbsorbArgs {
    /// Beam code printed by the emitter.
    code: String,

    /// Emitter host name or address.
    #[arg(long, env = "BEAM_HOST")]
    host: Option<String>,

    /// Emitter port.
    #[arg(short, long, env = "BEAM_PORT")]
    port: Option<u16>,

    /// Directory to write the received file into.
    #[arg(short, long, env = "BEAM_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// Accept the announced file without asking.
    #[arg(short, long)]
    yes: bool,

    /// Replace an existing file with the same name.
    #[arg(long)]
    overwrite: bool,

    /// Seconds to wait for the connection (0 = OS default).
    #[arg(long, env = "BEAM_CONNECT_TIMEOUT")]
    connect_timeout: Option<u64>,
}

/// Subcommands for `beam config`.
#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration as TOML.
    Show,
    /// Print the config file location.
    Path,
    /// Write a config file with every default spelled out.
    Init {
        /// Replace an existing file.
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = Cli::parse().dispatch().await {
        eprintln!("beam: {e:#}");
        std::process::exit(1);
    }
}

impl Cli {
    async fn dispatch(self) -> Result<()> {
        match self.command {
            Command::Emit(args) => {
                let config = load(self.config)?;
                init_logging(&config.log_level);
                emit(args, config).await
            }
            Command::Absorb(args) => {
                let config = load(self.config)?;
                init_logging(&config.log_level);
                absorb(args, config).await
            }
            Command::Config { action } => config_command(action, self.config),
        }
    }
}

fn load(path: Option<PathBuf>) -> Result<AppConfig> {
    load_config(path.as_deref()).context("loading configuration")
}

/// Installs the global subscriber.  `RUST_LOG` wins over the configured level.
fn init_logging(default_level: &str) {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();
}

// ── emit ──────────────────────────────────────────────────────────────────────

async fn emit(args: EmitArgs, mut config: AppConfig) -> Result<()> {
    if let Some(bind) = args.bind {
        config.network.bind_address = bind;
    }
    if let Some(port) = args.port {
        config.network.port = port;
    }
    if let Some(chunk_size) = args.chunk_size {
        config.transfer.chunk_size_bytes = chunk_size;
    }
    if let Some(secs) = args.accept_timeout {
        config.network.accept_timeout_secs = secs;
    }
    let chunk_size = config.transfer.chunk_size()?;

    let mut file = tokio::fs::File::open(&args.file)
        .await
        .with_context(|| format!("cannot open {}", args.file.display()))?;
    let metadata = file
        .metadata()
        .await
        .with_context(|| format!("cannot stat {}", args.file.display()))?;
    if !metadata.is_file() {
        bail!("{} is not a regular file", args.file.display());
    }
    let info = FileInfo {
        name: args
            .file
            .file_name()
            .and_then(|n| n.to_str())
            .map_or_else(|| FALLBACK_FILE_NAME.to_string(), str::to_string),
        size: metadata.len(),
    };

    let listener = EmitterListener::bind(&config.network.listen_address()).await?;
    let mut use_case = EmitFileUseCase::new(BeamCode::generate(), chunk_size, Spinner::new());
    let code = use_case.code();
    println!("Emitting '{}' ({})", info.name, human_size(info.size));
    println!("beam code is: {code}");
    println!(
        "On the other machine run: beam absorb {code} --host <this-host> --port {}",
        listener.local_addr().port()
    );
    println!();

    let accept = listener.accept(config.network.accept_timeout());
    let report = use_case.execute(accept, &info, &mut file).await?;

    println!(
        "Emitted '{}' ({}, {} chunks)",
        info.name,
        human_size(report.bytes_sent),
        report.chunks_sent
    );
    Ok(())
}

// ── absorb ────────────────────────────────────────────────────────────────────

async fn absorb(args: AbsorbArgs, mut config: AppConfig) -> Result<()> {
    let code = BeamCode::parse(&args.code)?;
    if let Some(host) = args.host {
        config.network.peer_host = host;
    }
    if let Some(port) = args.port {
        config.network.port = port;
    }
    if let Some(dir) = args.output_dir {
        config.transfer.output_dir = dir;
    }
    if let Some(secs) = args.connect_timeout {
        config.network.connect_timeout_secs = secs;
    }
    config.transfer.overwrite |= args.overwrite;

    let mut endpoint = dialer::connect(
        &config.network.peer_host,
        config.network.port,
        config.network.connect_timeout(),
    )
    .await?;

    let sink = DiskSink::new(&config.transfer.output_dir, config.transfer.overwrite);
    let limit = config.transfer.max_file_size;
    let (result, sink) = if args.yes {
        run_absorb(&mut endpoint, code, AutoApprove, sink, limit).await
    } else {
        run_absorb(&mut endpoint, code, PromptApproval::terminal(), sink, limit).await
    };
    if let Err(e) = endpoint.close().await {
        debug!(error = ?e, "closing absorber connection failed");
    }

    match result? {
        AbsorbOutcome::Completed { info, bytes, .. } => {
            let dest = sink
                .path()
                .map_or_else(|| PathBuf::from(&info.name), |p| p.to_path_buf());
            println!(
                "Absorbed '{}' ({}) into {}",
                info.name,
                human_size(bytes),
                dest.display()
            );
        }
        AbsorbOutcome::Declined {
            info,
            reason: DeclineReason::Refused,
        } => println!("Declined '{}'", info.name),
        AbsorbOutcome::Declined {
            info,
            reason: DeclineReason::TooLarge { size, limit },
        } => println!(
            "Declined '{}': {} is over the {} limit",
            info.name,
            human_size(size),
            human_size(limit)
        ),
    }
    Ok(())
}

async fn run_absorb<A>(
    endpoint: &mut Endpoint<Absorber, tokio::net::TcpStream>,
    code: BeamCode,
    approval: A,
    sink: DiskSink,
    limit: Option<u64>,
) -> (Result<AbsorbOutcome, AbsorbError>, DiskSink)
where
    A: TransferApproval,
{
    let mut use_case = AbsorbFileUseCase::new(code, approval, sink).with_max_file_size(limit);
    let result = use_case.execute(endpoint).await;
    (result, use_case.into_sink())
}

// ── config ────────────────────────────────────────────────────────────────────

fn config_command(action: ConfigAction, explicit: Option<PathBuf>) -> Result<()> {
    let path = match explicit {
        Some(p) => p,
        None => config_file_path()?,
    };
    match action {
        ConfigAction::Show => {
            let config = load_config(Some(&path)).context("loading configuration")?;
            print!("{}", toml::to_string_pretty(&config)?);
        }
        ConfigAction::Path => println!("{}", path.display()),
        ConfigAction::Init { force } => {
            if path.exists() && !force {
                bail!("{} already exists (use --force to replace it)", path.display());
            }
            save_config(&AppConfig::default(), &path)?;
            println!("Wrote {}", path.display());
        }
    }
    Ok(())
}
