//! Composition root for the `script` and `play` commands.

use crate::config::{Config, EngineKind};
use crate::error::{NarratorError, Result};
use crate::narration::{CommandNarrationEngine, NarrationEngine, PrintNarrationEngine};
use crate::output;
use crate::playback::{ControllerConfig, PlaybackController, PlaybackEvent, PlaybackState};
use crate::script::{self, Script, SourceData};
use log::{debug, info};
use std::io::IsTerminal;
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;

/// Transport commands read from stdin during `narrator play`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportCommand {
    /// Pause when playing, otherwise play from the start.
    Toggle,
    Next,
    Reset,
    Quit,
}

impl TransportCommand {
    pub fn parse(line: &str) -> Option<Self> {
        match line.trim().to_ascii_lowercase().as_str() {
            "p" | "play" | "pause" | "" => Some(TransportCommand::Toggle),
            "n" | "next" | "skip" => Some(TransportCommand::Next),
            "r" | "reset" => Some(TransportCommand::Reset),
            "q" | "quit" | "exit" => Some(TransportCommand::Quit),
            _ => None,
        }
    }
}

/// Load a script from a JSON file.
///
/// Accepts either a backend analysis payload, which is turned into a script,
/// or an already built script as printed by `narrator script --json`.
pub fn load_script(path: &Path) -> Result<Script> {
    let contents = std::fs::read_to_string(path)?;

    let script = match SourceData::from_json(&contents) {
        Ok(source) => script::build(&source),
        Err(payload_err) => match serde_json::from_str::<Script>(&contents) {
            Ok(script) => {
                debug!("{} is a prebuilt script", path.display());
                Script::new(script.sections().to_vec())?
            }
            Err(_) => return Err(payload_err),
        },
    };

    if script.is_empty() {
        return Err(NarratorError::EmptyScript);
    }
    Ok(script)
}

/// Build the narration engine selected by the configuration.
pub fn build_engine(config: &Config) -> Result<Arc<dyn NarrationEngine>> {
    match config.engine.kind {
        EngineKind::Print => Ok(Arc::new(
            PrintNarrationEngine::new().with_voice(config.voice),
        )),
        EngineKind::Command => {
            let command = config.engine.command.trim();
            if !command_in_path(command) {
                return Err(NarratorError::EngineNotFound {
                    engine: command.to_string(),
                });
            }
            Ok(Arc::new(
                CommandNarrationEngine::new(command)
                    .with_args(config.engine.args.clone())
                    .with_voice(config.voice),
            ))
        }
    }
}

fn command_in_path(command: &str) -> bool {
    let path = Path::new(command);
    if path.components().count() > 1 {
        return path.is_file();
    }
    std::env::var_os("PATH")
        .map(|paths| std::env::split_paths(&paths).any(|dir| dir.join(command).is_file()))
        .unwrap_or(false)
}

/// `narrator script`: print the script built from a payload.
pub fn run_script_command(path: &Path, json: bool) -> Result<()> {
    let script = load_script(path)?;
    if json {
        let rendered = serde_json::to_string_pretty(&script)?;
        println!("{rendered}");
    } else {
        let color = std::io::stdout().is_terminal();
        print!("{}", output::script_listing(&script, None, color));
    }
    Ok(())
}

/// `narrator play`: narrate a payload with stdin transport controls.
///
/// Returns when narration completes, on `q`, or on Ctrl+C.
pub async fn run_play_command(config: Config, path: &Path, quiet: bool, verbose: u8) -> Result<()> {
    config.validate()?;
    let script = load_script(path)?;
    let engine = build_engine(&config)?;
    info!(
        "narrator {}: narrating {} with the {} engine",
        crate::version_string(),
        path.display(),
        engine.name()
    );

    if !quiet {
        let color = std::io::stderr().is_terminal();
        eprint!("{}", output::script_listing(&script, None, color));
        eprintln!("Commands: p = pause/play, n = next, r = reset, q = quit");
    }

    let controller = PlaybackController::new(engine, script, ControllerConfig::from_config(&config));
    let mut events = controller.subscribe();
    let mut snapshots = controller.watch();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    controller.play();

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => {
                    if !quiet {
                        output::render_event(&event, verbose);
                    }
                    if event == PlaybackEvent::Completed {
                        break;
                    }
                }
                Err(RecvError::Lagged(missed)) => debug!("event stream lagged by {missed}"),
                Err(RecvError::Closed) => break,
            },
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                if !quiet {
                    let snapshot = snapshots.borrow_and_update().clone();
                    if snapshot.state != PlaybackState::Completed {
                        output::render_status(&snapshot);
                    }
                }
            },
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) => match TransportCommand::parse(&line) {
                    Some(TransportCommand::Quit) => break,
                    Some(command) => apply(&controller, command),
                    None => {
                        output::clear_line();
                        eprintln!("Unknown command '{}' (p, n, r, q)", line.trim());
                    }
                },
                Ok(None) | Err(_) => {
                    debug!("stdin closed, transport controls disabled");
                    stdin_open = false;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                debug!("interrupted");
                break;
            }
        }
    }

    controller.reset();
    if !quiet {
        output::clear_line();
    }
    Ok(())
}

fn apply<E: NarrationEngine + 'static>(controller: &PlaybackController<E>, command: TransportCommand) {
    match command {
        TransportCommand::Toggle if controller.is_active() => controller.pause(),
        TransportCommand::Toggle => controller.play(),
        TransportCommand::Next => {
            if !controller.skip_to_next() {
                output::clear_line();
                eprintln!("Already on the last section");
            }
        }
        TransportCommand::Reset => controller.reset(),
        TransportCommand::Quit => {}
    }
}
