#![forbid(unsafe_code)]

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use clap::Parser;
use showmirror_runtime::{Composition, MirrorConfig};
use tracing_subscriber::EnvFilter;

use crate::error::{ReplayError, Result};
use crate::replay::{ReplaySummary, parse_trace, replay};

const DEFAULT_LOG_FILTER: &str = "warn";

#[derive(Debug, Clone, Parser)]
#[command(
    name = "showmirror-replay",
    about = "Replay recorded parameter traffic and print what a consumer would receive",
    version
)]
pub struct Cli {
    /// Composition snapshot (JSON) loaded at t=0.
    #[arg(long, value_name = "PATH")]
    pub composition: PathBuf,

    /// JSON-lines trace of updates; omit to only print the initial state.
    #[arg(long, value_name = "PATH")]
    pub trace: Option<PathBuf>,

    /// Override the flush window in milliseconds.
    #[arg(long, value_name = "MS")]
    pub interval_ms: Option<u64>,

    /// Mirror configuration file (`.json`, otherwise TOML).
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log filter for stderr, e.g. `showmirror=debug`. Falls back to `RUST_LOG`.
    #[arg(long, value_name = "FILTER")]
    pub log: Option<String>,
}

pub fn run_from_env() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log.as_deref())?;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    run(&cli, &mut out).map(|_| ())
}

/// Install the stderr `fmt` subscriber. A subscriber that is already set
/// is left in place.
pub fn init_logging(filter: Option<&str>) -> Result<()> {
    let filter = match filter {
        Some(directives) => EnvFilter::try_new(directives)
            .map_err(|error| ReplayError::invalid(format!("--log {directives:?}: {error}")))?,
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
    };
    // Err only means a global subscriber is already installed.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(true)
        .try_init();
    Ok(())
}

pub fn run(cli: &Cli, out: &mut impl Write) -> Result<ReplaySummary> {
    let config = load_config(cli)?;
    let composition = load_composition(&cli.composition)?;
    let steps = match &cli.trace {
        Some(path) => parse_trace(path, &read(path)?)?,
        None => Vec::new(),
    };
    tracing::debug!(
        target: "showmirror.replay",
        steps = steps.len(),
        flush_interval_ms = config.flush_interval_ms,
        "replay starting"
    );
    replay(config, composition, steps, out)
}

fn load_config(cli: &Cli) -> Result<MirrorConfig> {
    let mut config = match &cli.config {
        Some(path) if has_extension(path, "json") => MirrorConfig::from_json_file(path)?,
        Some(path) => MirrorConfig::from_toml_file(path)?,
        None => MirrorConfig::default(),
    };
    if let Some(ms) = cli.interval_ms {
        if ms == 0 {
            return Err(ReplayError::invalid("--interval-ms must be > 0"));
        }
        config.flush_interval_ms = ms;
    }
    Ok(config.validated()?)
}

fn load_composition(path: &Path) -> Result<Composition> {
    let text = read(path)?;
    serde_json::from_str(&text).map_err(|source| ReplayError::Composition {
        path: path.to_path_buf(),
        source,
    })
}

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|source| ReplayError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(ext))
}
