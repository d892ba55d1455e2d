use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use narrator::app::{run_play_command, run_script_command};
use narrator::cli::{Cli, Commands, ConfigAction};
use narrator::config::Config;
use std::path::{Path, PathBuf};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.quiet, cli.verbose);

    match cli.command {
        Commands::Script { ref file, json } => {
            run_script_command(file, json)?;
        }
        Commands::Play { ref file } => {
            let mut config = load_config(cli.config.as_deref())?;
            if let Some(engine) = cli.engine {
                config.engine.kind = engine;
            }
            if let Some(grace) = cli.grace {
                config.scheduler.grace_period_ms =
                    u64::try_from(grace.as_millis()).unwrap_or(u64::MAX);
            }
            run_play_command(config, file, cli.quiet, cli.verbose).await?;
        }
        Commands::Config { action } => {
            handle_config_command(action, cli.config.as_deref())?;
        }
        Commands::Completions { shell } => {
            clap_complete::generate(
                shell,
                &mut Cli::command(),
                "narrator",
                &mut std::io::stdout(),
            );
        }
    }

    Ok(())
}

/// Route `log` output to stderr.
///
/// `-v` shows lifecycle messages, `-vv` scheduler diagnostics. `RUST_LOG`
/// takes precedence when set.
fn init_logging(quiet: bool, verbose: u8) {
    let level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, _) => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

/// Load configuration from file or use defaults.
///
/// Priority order:
/// 1. Custom config path from CLI (--config)
/// 2. Default config path (~/.config/narrator/config.toml)
/// 3. Built-in defaults with environment variable overrides
fn load_config(custom_path: Option<&Path>) -> Result<Config> {
    let config = if let Some(path) = custom_path {
        Config::load(path).with_context(|| format!("Failed to load config from {}", path.display()))?
    } else {
        Config::load_or_default(&Config::default_path()?)?
    };

    Ok(config.with_env_overrides())
}

fn config_path(custom_path: Option<&Path>) -> Result<PathBuf> {
    match custom_path {
        Some(path) => Ok(path.to_path_buf()),
        None => Ok(Config::default_path()?),
    }
}

fn handle_config_command(action: ConfigAction, custom_path: Option<&Path>) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = load_config(custom_path)?;
            print!("{}", config.to_toml()?);
        }
        ConfigAction::Path => {
            println!("{}", config_path(custom_path)?.display());
        }
        ConfigAction::Init { force } => {
            let path = config_path(custom_path)?;
            if path.exists() && !force {
                anyhow::bail!(
                    "{} already exists (use --force to overwrite)",
                    path.display()
                );
            }
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            std::fs::write(&path, Config::default().to_toml()?)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Wrote {}", path.display());
        }
    }
    Ok(())
}
