//! Dry-run narration: writes each utterance as text and waits as long as a
//! speaker would need to say it.

use super::engine::{NarrationEngine, VoiceSettings};
use crate::defaults;
use crate::error::{NarratorError, Result};
use async_trait::async_trait;
use std::io::Write;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::Notify;

pub struct PrintNarrationEngine {
    output: Mutex<Box<dyn Write + Send>>,
    words_per_minute: u32,
    voice: VoiceSettings,
    cancel: Notify,
}

impl PrintNarrationEngine {
    /// Print to stdout.
    pub fn new() -> Self {
        Self::with_writer(Box::new(std::io::stdout()))
    }

    pub fn with_writer(output: Box<dyn Write + Send>) -> Self {
        Self {
            output: Mutex::new(output),
            words_per_minute: defaults::PRINT_WORDS_PER_MINUTE,
            voice: VoiceSettings::default(),
            cancel: Notify::new(),
        }
    }

    pub fn with_words_per_minute(mut self, wpm: u32) -> Self {
        self.words_per_minute = wpm.max(1);
        self
    }

    pub fn with_voice(mut self, voice: VoiceSettings) -> Self {
        self.voice = voice;
        self
    }

    /// Time a speaker at the configured pace needs for `text`.
    pub fn speaking_time(&self, text: &str) -> Duration {
        let words = text.split_whitespace().count() as f64;
        let rate = f64::from(self.voice.rate).max(0.1);
        Duration::from_secs_f64(words * 60.0 / f64::from(self.words_per_minute) / rate)
    }
}

impl Default for PrintNarrationEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NarrationEngine for PrintNarrationEngine {
    async fn speak(&self, text: &str) -> Result<()> {
        let cancelled = self.cancel.notified();
        tokio::pin!(cancelled);

        {
            let mut out = self.output.lock().unwrap_or_else(|e| e.into_inner());
            writeln!(out, "{text}")?;
            out.flush()?;
        }

        tokio::select! {
            _ = tokio::time::sleep(self.speaking_time(text)) => Ok(()),
            _ = &mut cancelled => Err(NarratorError::NarrationCancelled),
        }
    }

    fn cancel_all(&self) {
        self.cancel.notify_waiters();
    }

    fn name(&self) -> &str {
        "print"
    }
}
