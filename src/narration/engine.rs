use crate::defaults;
use crate::error::{NarratorError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Trait for a text-to-speech narration engine.
///
/// The contract is deliberately weak: `speak` resolves when the utterance
/// finishes or fails, but an engine is allowed to never resolve at all.
/// Callers must not rely on a callback arriving.
#[async_trait]
pub trait NarrationEngine: Send + Sync {
    /// Speak one utterance. Resolves on completion or error.
    async fn speak(&self, text: &str) -> Result<()>;

    /// Ask the engine to drop whatever it is currently speaking.
    ///
    /// Best effort; completion of the cancellation is not awaited.
    fn cancel_all(&self);

    /// Human-readable engine name for logs.
    fn name(&self) -> &str;
}

/// Implement NarrationEngine for Arc<T> so one engine can be shared.
#[async_trait]
impl<T: NarrationEngine + ?Sized> NarrationEngine for Arc<T> {
    async fn speak(&self, text: &str) -> Result<()> {
        (**self).speak(text).await
    }

    fn cancel_all(&self) {
        (**self).cancel_all()
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Voice parameters handed to engines that support them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceSettings {
    pub rate: f32,
    pub pitch: f32,
    pub volume: f32,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            rate: defaults::VOICE_RATE,
            pitch: defaults::VOICE_PITCH,
            volume: defaults::VOICE_VOLUME,
        }
    }
}

/// Scripted behaviour of one mock utterance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockUtterance {
    /// Resolve successfully after the given time.
    Complete(Duration),
    /// Resolve with an error after the given time.
    Fail(Duration),
    /// Never resolve.
    Stall,
}

/// Mock narration engine for testing.
///
/// Behaviour is picked per utterance: queued behaviours first, then the
/// first rule whose pattern occurs in the text, then the default.
#[derive(Debug)]
pub struct MockNarrationEngine {
    default: MockUtterance,
    rules: Vec<(String, MockUtterance)>,
    queue: Mutex<VecDeque<MockUtterance>>,
    spoken: Mutex<Vec<String>>,
    cancels: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockNarrationEngine {
    /// Create a mock whose utterances complete after 100ms.
    pub fn new() -> Self {
        Self {
            default: MockUtterance::Complete(Duration::from_millis(100)),
            rules: Vec::new(),
            queue: Mutex::new(VecDeque::new()),
            spoken: Mutex::new(Vec::new()),
            cancels: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Behaviour for utterances not matched by a queued entry or rule.
    pub fn with_default(mut self, behaviour: MockUtterance) -> Self {
        self.default = behaviour;
        self
    }

    /// Behaviour for utterances containing `pattern`.
    pub fn with_rule(mut self, pattern: &str, behaviour: MockUtterance) -> Self {
        self.rules.push((pattern.to_string(), behaviour));
        self
    }

    /// Behaviours consumed in order by the next utterances.
    pub fn with_sequence(self, behaviours: impl IntoIterator<Item = MockUtterance>) -> Self {
        self.queue
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .extend(behaviours);
        self
    }

    /// Every text passed to `speak`, in call order.
    pub fn spoken(&self) -> Vec<String> {
        self.spoken
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn cancel_count(&self) -> usize {
        self.cancels.load(Ordering::SeqCst)
    }

    /// Highest number of utterances that were ever in flight at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn behaviour_for(&self, text: &str) -> MockUtterance {
        if let Some(queued) = self
            .queue
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
        {
            return queued;
        }
        self.rules
            .iter()
            .find(|(pattern, _)| text.contains(pattern.as_str()))
            .map(|(_, behaviour)| *behaviour)
            .unwrap_or(self.default)
    }
}

impl Default for MockNarrationEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Decrements the in-flight counter even when the utterance future is dropped.
struct InFlightGuard<'a>(&'a AtomicUsize);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl NarrationEngine for MockNarrationEngine {
    async fn speak(&self, text: &str) -> Result<()> {
        self.spoken
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(text.to_string());
        let behaviour = self.behaviour_for(text);

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlightGuard(&self.in_flight);

        match behaviour {
            MockUtterance::Complete(after) => {
                tokio::time::sleep(after).await;
                Ok(())
            }
            MockUtterance::Fail(after) => {
                tokio::time::sleep(after).await;
                Err(NarratorError::NarrationFailed {
                    message: "mock narration failure".to_string(),
                })
            }
            MockUtterance::Stall => std::future::pending::<Result<()>>().await,
        }
    }

    fn cancel_all(&self) {
        self.cancels.fetch_add(1, Ordering::SeqCst);
    }

    fn name(&self) -> &str {
        "mock"
    }
}
