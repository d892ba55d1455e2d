//! Narration through an external speech command (espeak-ng, spd-say, say).
//!
//! Each utterance spawns one process. `cancel_all` kills whatever process is
//! currently speaking; the kill is not awaited by the caller.

use super::engine::{NarrationEngine, VoiceSettings};
use crate::defaults;
use crate::error::{NarratorError, Result};
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tokio::sync::Notify;

/// Placeholder in the argument list replaced by the utterance text.
pub const TEXT_PLACEHOLDER: &str = "{text}";

/// Narration engine that runs an external command per utterance.
#[derive(Debug)]
pub struct CommandNarrationEngine {
    command: String,
    args: Vec<String>,
    voice: VoiceSettings,
    cancel: Notify,
}

impl CommandNarrationEngine {
    /// Create an engine for `command` with default voice settings.
    pub fn new(command: &str) -> Self {
        Self {
            command: command.to_string(),
            args: Vec::new(),
            voice: VoiceSettings::default(),
            cancel: Notify::new(),
        }
    }

    /// Extra arguments. If one contains `{text}` it is substituted,
    /// otherwise the text is appended as the last argument.
    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    pub fn with_voice(mut self, voice: VoiceSettings) -> Self {
        self.voice = voice;
        self
    }

    /// Full argument list for one utterance.
    pub fn build_args(&self, text: &str) -> Vec<String> {
        let mut args = Vec::new();

        if self.is_espeak() {
            let wpm = (defaults::ESPEAK_BASE_WPM * self.voice.rate).round().max(80.0) as u32;
            let pitch = (self.voice.pitch * 50.0).round().clamp(0.0, 99.0) as u32;
            let amplitude = (self.voice.volume * 100.0).round().clamp(0.0, 200.0) as u32;
            args.extend([
                "-s".to_string(),
                wpm.to_string(),
                "-p".to_string(),
                pitch.to_string(),
                "-a".to_string(),
                amplitude.to_string(),
            ]);
        }

        let mut substituted = false;
        for arg in &self.args {
            if arg.contains(TEXT_PLACEHOLDER) {
                substituted = true;
                args.push(arg.replace(TEXT_PLACEHOLDER, text));
            } else {
                args.push(arg.clone());
            }
        }
        if !substituted {
            // Chunks may start with '-' and must not be read as options.
            args.push("--".to_string());
            args.push(text.to_string());
        }

        args
    }

    fn is_espeak(&self) -> bool {
        Path::new(&self.command)
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n == "espeak-ng" || n == "espeak")
    }

    fn spawn_error(&self, e: std::io::Error) -> NarratorError {
        if e.kind() == std::io::ErrorKind::NotFound {
            NarratorError::EngineNotFound {
                engine: self.command.clone(),
            }
        } else {
            NarratorError::NarrationFailed {
                message: format!("Failed to execute {}: {}", self.command, e),
            }
        }
    }
}

#[async_trait]
impl NarrationEngine for CommandNarrationEngine {
    async fn speak(&self, text: &str) -> Result<()> {
        // Registered before spawning so a cancel during startup is not lost.
        let cancelled = self.cancel.notified();
        tokio::pin!(cancelled);

        let mut child = Command::new(&self.command)
            .args(self.build_args(text))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        tokio::select! {
            status = child.wait() => {
                let status = status?;
                if status.success() {
                    Ok(())
                } else {
                    Err(NarratorError::NarrationFailed {
                        message: format!("{} exited with {}", self.command, status),
                    })
                }
            }
            _ = &mut cancelled => {
                child.start_kill().ok();
                Err(NarratorError::NarrationCancelled)
            }
        }
    }

    fn cancel_all(&self) {
        self.cancel.notify_waiters();
    }

    fn name(&self) -> &str {
        &self.command
    }
}
