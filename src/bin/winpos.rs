use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, bail};
use clap::Parser;
use tracing::{error, info};
use winpos::arranger::Arranger;
use winpos::common::config::{self, Config, EXAMPLE_CONFIG};
use winpos::common::log;
use winpos::sys::command::Shell;
use winpos::sys::screen::collect_active_screens;
use winpos::sys::window::Xdotool;

/// Arrange application windows across screens and virtual desktops.
#[derive(Parser)]
#[command(name = "winpos")]
struct Cli {
    /// Configuration file (.json or .toml). Defaults to
    /// $XDG_CONFIG_HOME/winpos/config.json.
    #[arg(long, env = "WINPOS_CONFIG")]
    config: Option<PathBuf>,

    /// Seconds to wait for each external command before giving up on it.
    #[arg(long, default_value_t = 10)]
    timeout: u64,

    /// Check the configuration without querying or touching any windows.
    #[arg(long)]
    validate: bool,

    /// Print a sample configuration and exit.
    #[arg(long)]
    example: bool,

    /// More logging (-v for debug, -vv for trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn run(opt: Cli) -> anyhow::Result<()> {
    if opt.example {
        print!("{EXAMPLE_CONFIG}");
        return Ok(());
    }

    let path = match opt.config {
        Some(path) => path,
        None => config::config_file()
            .context("could not determine the configuration directory, use --config")?,
    };
    let config = Config::read(&path)
        .with_context(|| format!("failed to load configuration from {}", path.display()))?;

    if opt.validate {
        let issues = config.validate();
        for issue in &issues {
            error!("{issue}");
        }
        if !issues.is_empty() {
            bail!("{} of {} windows are invalid", issues.len(), config.windows.len());
        }
        info!(windows = config.windows.len(), "configuration is valid");
        return Ok(());
    }

    let shell = Shell::new(Duration::from_secs(opt.timeout));
    let screens = collect_active_screens(&shell).unwrap_or_else(|e| {
        error!("failed to query active screens: {e}");
        Vec::new()
    });
    let system = Xdotool::new(shell);
    Arranger::new(&system, &screens).run(&config.windows);
    Ok(())
}

fn main() -> ExitCode {
    let opt: Cli = Parser::parse();
    log::init_logging(opt.verbose);

    match run(opt) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
