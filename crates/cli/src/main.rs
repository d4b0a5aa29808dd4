mod cmd;
mod output;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use kiln_lib::config::Settings;
use kiln_lib::consts::EXIT_PRE_STEP_FAILURE;
use kiln_lib::execute::ExecuteError;

use crate::output::{OutputFormat, print_error};

/// kiln - install packages from source recipes
#[derive(Parser)]
#[command(name = "kiln")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  /// Root directory for install prefixes and opt links (overrides KILN_ROOT)
  #[arg(long, global = true)]
  root: Option<PathBuf>,

  /// Cache directory for downloads and working directories (overrides KILN_CACHE)
  #[arg(long, global = true)]
  cache: Option<PathBuf>,

  /// Path to a config file
  #[arg(long, global = true)]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Validate a recipe without resolving or fetching anything
  Check {
    /// Path to the recipe file
    recipe: PathBuf,

    #[arg(short, long, value_enum, default_value_t)]
    output: OutputFormat,
  },

  /// Resolve dependencies and print the steps an install would run
  Plan {
    /// Path to the recipe file
    recipe: PathBuf,

    /// Install prefix (default: <root>/cellar/<id>[/<version>])
    #[arg(long)]
    prefix: Option<PathBuf>,

    #[arg(short, long, value_enum, default_value_t)]
    output: OutputFormat,
  },

  /// Fetch, verify, build and install a recipe
  Install {
    /// Path to the recipe file
    recipe: PathBuf,

    /// Install prefix (default: <root>/cellar/<id>[/<version>])
    #[arg(long)]
    prefix: Option<PathBuf>,

    /// Keep the working directory after a successful install
    #[arg(long)]
    keep_work_dir: bool,

    /// Extra fetch attempts after a network failure
    #[arg(long)]
    retries: Option<u32>,
  },
}

fn main() {
  let cli = Cli::parse();

  let filter = if cli.verbose {
    EnvFilter::new("debug")
  } else {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
  };
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  if let Err(err) = run(cli) {
    print_error(&format!("{:#}", err));
    std::process::exit(exit_code(&err));
  }
}

fn run(cli: Cli) -> Result<()> {
  let mut settings = Settings::load(cli.config.as_deref()).context("Failed to load configuration")?;
  if let Some(root) = cli.root {
    settings.root = root;
  }
  if let Some(cache) = cli.cache {
    settings.cache = cache;
  }
  settings.make_absolute().context("Failed to resolve directories")?;

  match cli.command {
    Commands::Check { recipe, output } => cmd::cmd_check(&recipe, output),
    Commands::Plan { recipe, prefix, output } => cmd::cmd_plan(&recipe, prefix.as_deref(), &settings, output),
    Commands::Install {
      recipe,
      prefix,
      keep_work_dir,
      retries,
    } => {
      if keep_work_dir {
        settings.keep_work_dir = true;
      }
      if let Some(retries) = retries {
        settings.fetch_retries = retries;
      }

      let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to create async runtime")?;
      rt.block_on(async {
        let cancel = CancellationToken::new();
        let on_signal = cancel.clone();
        tokio::spawn(async move {
          if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, stopping");
            on_signal.cancel();
          }
        });
        cmd::cmd_install(&recipe, prefix.as_deref(), &settings, cancel).await
      })
    }
  }
}

/// The failing step's own exit code when there is one, else a fixed code.
fn exit_code(err: &anyhow::Error) -> i32 {
  err
    .chain()
    .find_map(|cause| cause.downcast_ref::<ExecuteError>())
    .map(ExecuteError::exit_code)
    .unwrap_or(EXIT_PRE_STEP_FAILURE)
}
