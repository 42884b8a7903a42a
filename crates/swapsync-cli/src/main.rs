//! swapsync - keep a llama-swap config in step with the GGUF files on disk.
//!
//! Logs go to stderr. `RUST_LOG`, when set, overrides the level chosen by
//! `-v`/`-q`. With `--json` the run report (or the listing) is printed to
//! stdout.
//!
//! Exit status: 0 on success or nothing to do, 1 on a write or internal
//! failure, 2 on a corrupt config or key collision, 3 when another run holds
//! the lock.

use anyhow::Result;
use clap::builder::BoolishValueParser;
use clap::{ArgAction, Parser};
use std::path::PathBuf;
use std::process::ExitCode;
use swapsync_core::{discover, DockerCliNotifier, ModelSync, SyncConfig, SyncDefaults, SyncError};
use tracing::{error, info, Level};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "swapsync", version)]
#[command(about = "Sync a llama-swap config with the GGUF model files on disk")]
struct Args {
    /// Path to the llama-swap config file
    #[arg(long, env = "LLAMA_SWAP_CONFIG", default_value = SyncDefaults::CONFIG_PATH)]
    config: PathBuf,

    /// Directory scanned recursively for .gguf files
    #[arg(long, env = "LLAMA_SWAP_MODELS_DIR", default_value = SyncDefaults::MODELS_DIR)]
    models_dir: PathBuf,

    /// Container restarted after the config changes (empty to skip)
    #[arg(long, env = "LLAMA_SWAP_CONTAINER", default_value = SyncDefaults::RESTART_TARGET)]
    container: String,

    /// Remove entries whose model file no longer exists
    #[arg(long, env = "LLAMA_SWAP_PRUNE", action = ArgAction::SetTrue, value_parser = BoolishValueParser::new())]
    prune: bool,

    /// Log what would change without writing anything
    #[arg(long, env = "LLAMA_SWAP_DRY_RUN", action = ArgAction::SetTrue, value_parser = BoolishValueParser::new())]
    dry_run: bool,

    /// Do not restart the container after saving
    #[arg(long, env = "LLAMA_SWAP_NO_RESTART", action = ArgAction::SetTrue, value_parser = BoolishValueParser::new())]
    no_restart: bool,

    /// Backups kept next to the config (0 disables backups)
    #[arg(long, env = "LLAMA_SWAP_MAX_BACKUPS", default_value_t = SyncDefaults::MAX_BACKUPS)]
    max_backups: usize,

    /// Longest model key generated, in characters
    #[arg(long, default_value_t = SyncDefaults::MAX_KEY_LENGTH)]
    max_key_length: usize,

    /// Register every shard of a split model, not just the first
    #[arg(long)]
    keep_shards: bool,

    /// Print discovered model files and their keys, then exit
    #[arg(long)]
    list: bool,

    /// Print the result as JSON on stdout
    #[arg(long)]
    json: bool,

    /// Enable debug logging
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long)]
    quiet: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,
}

impl Args {
    fn sync_config(&self) -> SyncConfig {
        SyncConfig::new(&self.config, &self.models_dir)
            .with_restart_target(Some(self.container.as_str()))
            .with_prune(self.prune)
            .with_dry_run(self.dry_run)
            .with_restart(!self.no_restart)
            .with_max_backups(self.max_backups)
            .with_max_key_length(self.max_key_length)
            .with_collapse_shards(!self.keep_shards)
    }

    fn log_level(&self) -> Level {
        if self.verbose {
            Level::DEBUG
        } else if self.quiet {
            Level::WARN
        } else {
            Level::INFO
        }
    }
}

fn init_logging(args: &Args) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::default().add_directive(LevelFilter::from_level(args.log_level()).into())
    });

    let builder = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false);

    if args.log_json {
        builder.json().init();
    } else {
        builder.compact().init();
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(&args);

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{:#}", err);
            let code = err
                .downcast_ref::<SyncError>()
                .map(SyncError::exit_code)
                .unwrap_or(1);
            ExitCode::from(u8::try_from(code).unwrap_or(1))
        }
    }
}

fn run(args: &Args) -> Result<()> {
    let config = args.sync_config();
    config.validate()?;

    if args.list {
        return list(args, &config);
    }

    info!("Config: {}", config.config_path.display());
    info!("Models directory: {}", config.models_dir.display());

    let notifier = DockerCliNotifier::default();
    let report = ModelSync::new(&config, &notifier).run()?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    Ok(())
}

fn list(args: &Args, config: &SyncConfig) -> Result<()> {
    let inventory = discover(config)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&inventory)?);
        return Ok(());
    }

    for (key, path) in &inventory.models {
        println!("{}\t{}", key, path);
    }
    info!("{} model files found", inventory.models.len());
    Ok(())
}
