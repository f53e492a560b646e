use clap::{Parser, Subcommand};
use nailclipper::cache::CacheStats;
use nailclipper::config::{self, ManagerConfig};
use nailclipper::manager::ThumbnailManager;
use nailclipper::metadata::read_provenance;
use nailclipper::output;
use nailclipper::types::SizeClass;
use nailclipper::uri::expand_inputs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Shared size flag.
#[derive(clap::Args, Clone)]
struct SizeArgs {
    /// normal, large, x-large, xx-large or WIDTHxHEIGHT
    #[arg(long, short, default_value = "normal")]
    size: SizeClass,
}

#[derive(Parser)]
#[command(name = "nailclipper")]
#[command(about = "Freedesktop-style thumbnail cache for files and URLs")]
#[command(long_about = "\
Freedesktop-style thumbnail cache for files and URLs

Thumbnails are content-addressed by the MD5 of the resource URI and carry
their provenance (source URI, mtime, size) as PNG text chunks, so the cache
needs no index:

  <cache>/normal/<md5>.png               128x128
  <cache>/large/<md5>.png                256x256
  <cache>/x-large/<md5>.png              512x512
  <cache>/xx-large/<md5>.png             1024x1024
  <cache>/custom/(WxH)<md5>.png          any other size
  <cache>/fail/<app>-<version>/<md5>.png resources that could not be rendered

Inputs are local paths (relative or absolute), file:// URIs or remote URLs.

Log verbosity follows RUST_LOG; -v and -vv override it.

Run 'nailclipper gen-config' to generate a documented config.toml.")]
#[command(version)]
struct Cli {
    /// Config file [default: <user config dir>/nailclipper/config.toml]
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log more (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Return (and create if needed) thumbnails
    Get {
        /// Files, directories (with --recursive) or URLs
        #[arg(required = true)]
        inputs: Vec<String>,
        #[command(flatten)]
        size: SizeArgs,
        /// Walk directories and thumbnail every file inside
        #[arg(long, short)]
        recursive: bool,
    },
    /// Print where a thumbnail would be stored, without creating it
    Path {
        input: String,
        #[command(flatten)]
        size: SizeArgs,
    },
    /// Print a thumbnail's embedded provenance as JSON
    Info { thumbnail: PathBuf },
    /// Forget earlier render failures so the next lookup retries
    ClearFailure {
        #[arg(required = true)]
        inputs: Vec<String>,
    },
    /// Validate the configuration (including its compliance profile)
    CheckConfig,
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Get {
            inputs,
            size,
            recursive,
        } => {
            let manager = ThumbnailManager::new(load_config(cli.config.as_deref())?)?;
            let mut stats = CacheStats::default();
            for input in expand_inputs(&inputs, recursive) {
                let uri = input.to_uri()?;
                let outcome = manager.thumbnail_for(&uri, size.size)?;
                output::print_thumbnail(&input.label(), size.size, &outcome);
                outcome.tally(&mut stats);
            }
            println!();
            println!("Cache: {}", stats);
        }
        Command::Path { input, size } => {
            let manager = ThumbnailManager::new(load_config(cli.config.as_deref())?)?;
            println!("{}", manager.thumbnail_path(&input, size.size)?.display());
        }
        Command::Info { thumbnail } => {
            let provenance = read_provenance(&thumbnail)?;
            println!("{}", output::format_info(&thumbnail, &provenance)?);
        }
        Command::ClearFailure { inputs } => {
            let manager = ThumbnailManager::new(load_config(cli.config.as_deref())?)?;
            for input in &inputs {
                let removed = manager.clear_failure(input)?;
                println!("{}", output::format_clear_failure(input, removed));
            }
        }
        Command::CheckConfig => {
            let manager = ThumbnailManager::new(load_config(cli.config.as_deref())?)?;
            output::print_config_check(manager.config(), manager.cache_root());
            println!("==> Configuration is valid");
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Install a stderr fmt subscriber. `-v` flags win over `RUST_LOG`.
fn init_logging(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        _ => EnvFilter::new("debug"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// An explicit `--config` must exist; the default location may be absent.
fn load_config(explicit: Option<&Path>) -> Result<ManagerConfig, Box<dyn std::error::Error>> {
    match explicit {
        Some(path) if !path.exists() => {
            Err(format!("config file not found: {}", path.display()).into())
        }
        Some(path) => Ok(config::load_config(path)?),
        None => match config::default_config_path() {
            Some(path) => Ok(config::load_config(&path)?),
            None => Ok(ManagerConfig::default()),
        },
    }
}

