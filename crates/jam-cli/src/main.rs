//! jam CLI - The `jam` command.
//!
//! Drives a scripting bridge the way a host sequencer would: a clock sends
//! ticks, stdin lines become host messages, and the script is reloaded when
//! it changes on disk. Script output is printed to stdout, console lines to
//! stderr.
//!
//! ```text
//! $ jam run demos/pulse.rhai --tpb 4 --bpm 120 --watch
//! note 60 100
//! bpm 140
//! quit
//! ```

mod config;
mod error;
mod session;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use config::Config;
use jam_core::{Bridge, BridgeConfig};
use session::{ConsoleOutlets, Input};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// jam - Rhai pattern scripts for a tick-driven sequencer
#[derive(Parser, Debug)]
#[command(name = "jam")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Run Rhai pattern scripts against a tick clock", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a script
    Run {
        /// Path to the script
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Ticks per beat
        #[arg(long)]
        tpb: Option<f64>,

        /// Beats per minute
        #[arg(long)]
        bpm: Option<f64>,

        /// Render this many ticks offline instead of running in real time
        #[arg(long, value_name = "N")]
        ticks: Option<u64>,

        /// Reload the script when it changes
        #[arg(short, long)]
        watch: bool,

        /// Additional import directories
        #[arg(short = 'I', long = "import-path", value_name = "PATH")]
        import_paths: Vec<PathBuf>,
    },

    /// Load a script and run its init handler, then exit
    Check {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Additional import directories
        #[arg(short = 'I', long = "import-path", value_name = "PATH")]
        import_paths: Vec<PathBuf>,
    },

    /// Write a default config file
    Init,

    /// Print the config file location
    ConfigPath,

    /// Show version information
    Version,
}

fn main() -> Result<()> {
    init_logger();
    let args = Args::parse();

    match args.command {
        Commands::Run {
            file,
            tpb,
            bpm,
            ticks,
            watch,
            import_paths,
        } => run(file, tpb, bpm, ticks, watch, import_paths),
        Commands::Check { file, import_paths } => check(file, import_paths),
        Commands::Init => {
            let path = Config::config_path()?;
            if path.exists() {
                anyhow::bail!("Config file already exists at {}", path.display());
            }
            let path = Config::create_default_config_file()?;
            println!("Wrote {}", path.display());
            Ok(())
        }
        Commands::ConfigPath => {
            println!("{}", Config::config_path()?.display());
            Ok(())
        }
        Commands::Version => {
            println!("jam {}", env!("CARGO_PKG_VERSION"));
            println!();
            println!("Helper modules: {}", jam_std::MODULES.join(", "));
            println!("Stdlib: {}", jam_std::stdlib_path().display());
            Ok(())
        }
    }
}

/// Log to stderr at `info` unless `RUST_LOG` says otherwise.
fn init_logger() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();
}

/// Build the bridge settings from the config file and command-line flags.
fn bridge_config(
    tpb: Option<f64>,
    bpm: Option<f64>,
    import_paths: Vec<PathBuf>,
) -> BridgeConfig {
    let config = Config::load_or_default();
    let mut bridge = config.bridge;
    if let Some(tpb) = tpb {
        bridge.ticks_per_beat = tpb;
    }
    if let Some(bpm) = bpm {
        bridge.beats_per_minute = bpm;
    }
    for path in import_paths {
        bridge = bridge.with_search_dir(path);
    }
    if config.modules.stdlib {
        bridge = bridge.with_search_dir(jam_std::module_dir());
    }
    bridge
}

fn validate_script(file: &Path) -> Result<()> {
    if !file.exists() {
        anyhow::bail!("File not found: {}", file.display());
    }
    if file.extension().and_then(|s| s.to_str()) != Some(jam_core::engine::SCRIPT_EXTENSION) {
        log::warn!("File doesn't have .rhai extension");
    }
    Ok(())
}

fn run(
    file: PathBuf,
    tpb: Option<f64>,
    bpm: Option<f64>,
    ticks: Option<u64>,
    watch: bool,
    import_paths: Vec<PathBuf>,
) -> Result<()> {
    validate_script(&file)?;

    let mut bridge = Bridge::new(bridge_config(tpb, bpm, import_paths), Arc::new(ConsoleOutlets));
    // A script that fails to load can be fixed and picked up by --watch.
    if let Err(e) = bridge.load(&file) {
        if !watch {
            return Err(e).with_context(|| format!("Failed to load {}", file.display()));
        }
        log::error!("{}", e);
    }

    if let Some(ticks) = ticks {
        session::run_offline(&mut bridge, ticks);
        return Ok(());
    }

    let (tx, inputs) = crossbeam_channel::unbounded::<Input>();
    session::spawn_stdin_reader(tx.clone());
    if watch {
        log::info!("Watch mode enabled - monitoring {} for changes", file.display());
        session::spawn_watcher(file.clone(), tx.clone());
    }

    log::info!(
        "Running at {} bpm, {} ticks per beat (type 'quit' to exit)",
        bridge.beats_per_minute(),
        bridge.ticks_per_beat()
    );
    session::run_realtime(&mut bridge, &file, &inputs);
    // Keeps the channel connected after stdin closes.
    drop(tx);
    Ok(())
}

fn check(file: PathBuf, import_paths: Vec<PathBuf>) -> Result<()> {
    validate_script(&file)?;
    let mut bridge = Bridge::new(bridge_config(None, None, import_paths), Arc::new(ConsoleOutlets));
    bridge
        .load(&file)
        .with_context(|| format!("Failed to load {}", file.display()))?;
    println!("{}: ok", file.display());
    Ok(())
}
