//! Playback controller: walks a script section by section.
//!
//! The controller owns three kinds of per-section work, all spawned as tokio
//! tasks: the chunked narration, a watchdog that forces the section to end
//! after its nominal duration plus a grace period, and the progress poll.
//!
//! Narration engines are unreliable. A stalled utterance never resolves, and
//! an aborted one may still report late. Every continuation therefore checks
//! two things before acting:
//! - `active`, the authoritative "keep playing" flag
//! - the generation it was spawned with, bumped on every section start,
//!   pause, skip, reset and completion
//!
//! Whichever of "narration finished" and "watchdog fired" settles a section
//! first wins; the other is ignored.

use super::progress::{self, ProgressReporter};
use super::state::{PlaybackEvent, PlaybackSnapshot, PlaybackState};
use crate::config::Config;
use crate::defaults;
use crate::narration::chunker::{self, ChunkOutcome, SequenceOutcome};
use crate::narration::engine::NarrationEngine;
use crate::script::{Script, Section};
use log::{debug, info, warn};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

/// Timing knobs for the controller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControllerConfig {
    /// Upper bound on characters per utterance.
    pub max_chunk_chars: usize,
    /// Added to a section's nominal duration to get its watchdog deadline.
    pub grace_period: Duration,
    /// Silence between a naturally finished section and the next one.
    pub inter_section_pause: Duration,
    /// Tick of the progress poll.
    pub progress_interval: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            max_chunk_chars: defaults::MAX_CHUNK_CHARS,
            grace_period: Duration::from_millis(defaults::GRACE_PERIOD_MS),
            inter_section_pause: Duration::from_millis(defaults::INTER_SECTION_PAUSE_MS),
            progress_interval: Duration::from_millis(defaults::PROGRESS_INTERVAL_MS),
        }
    }
}

impl ControllerConfig {
    pub fn from_config(config: &Config) -> Self {
        let scheduler = &config.scheduler;
        Self {
            max_chunk_chars: scheduler.max_chunk_chars,
            grace_period: Duration::from_millis(scheduler.grace_period_ms),
            inter_section_pause: Duration::from_millis(scheduler.inter_section_pause_ms),
            progress_interval: Duration::from_millis(scheduler.progress_interval_ms),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SectionEnd {
    Natural,
    Watchdog,
}

#[derive(Default)]
struct SectionTasks {
    narration: Option<JoinHandle<()>>,
    watchdog: Option<JoinHandle<()>>,
    progress: Option<JoinHandle<()>>,
    advance: Option<JoinHandle<()>>,
}

impl SectionTasks {
    fn abort_all(&mut self) {
        for handle in [
            self.narration.take(),
            self.watchdog.take(),
            self.progress.take(),
            self.advance.take(),
        ]
        .into_iter()
        .flatten()
        {
            handle.abort();
        }
    }
}

struct Session {
    script: Arc<Script>,
    state: PlaybackState,
    current_section: usize,
    elapsed_secs: f64,
    /// The current section already ended (naturally or forced).
    section_settled: bool,
    tasks: SectionTasks,
}

impl Session {
    fn snapshot(&self) -> PlaybackSnapshot {
        PlaybackSnapshot {
            state: self.state,
            current_section: self.current_section,
            section_count: self.script.len(),
            current_title: self
                .script
                .section(self.current_section)
                .map(|s| s.title.clone()),
            elapsed_secs: self.elapsed_secs,
            total_duration_secs: self.script.total_duration_secs(),
            is_playing: self.state == PlaybackState::Playing,
        }
    }

    fn rewind(&mut self) {
        self.current_section = 0;
        self.elapsed_secs = 0.0;
    }
}

struct Shared<E> {
    engine: E,
    config: ControllerConfig,
    active: AtomicBool,
    generation: AtomicU64,
    /// Never held across an await.
    session: Mutex<Session>,
    snapshot_tx: watch::Sender<PlaybackSnapshot>,
    events: broadcast::Sender<PlaybackEvent>,
}

/// Drives narration of a [`Script`] through a [`NarrationEngine`].
///
/// Must be used from within a tokio runtime. Dropping the controller halts
/// playback.
pub struct PlaybackController<E: NarrationEngine + 'static> {
    shared: Arc<Shared<E>>,
}

impl<E: NarrationEngine + 'static> PlaybackController<E> {
    pub fn new(engine: E, script: Script, config: ControllerConfig) -> Self {
        let session = Session {
            script: Arc::new(script),
            state: PlaybackState::Idle,
            current_section: 0,
            elapsed_secs: 0.0,
            section_settled: false,
            tasks: SectionTasks::default(),
        };
        let (snapshot_tx, _) = watch::channel(session.snapshot());
        let (events, _) = broadcast::channel(defaults::EVENT_CHANNEL_CAPACITY);

        Self {
            shared: Arc::new(Shared {
                engine,
                config,
                active: AtomicBool::new(false),
                generation: AtomicU64::new(0),
                session: Mutex::new(session),
                snapshot_tx,
                events,
            }),
        }
    }

    /// Start narration from the first section.
    ///
    /// Always restarts from the beginning, including after a pause. A no-op
    /// while already playing or when the script has no sections.
    pub fn play(&self) {
        let shared = &self.shared;
        let mut session = shared.lock();

        if session.script.is_empty() {
            debug!("play ignored: script has no sections");
            return;
        }
        if session.state == PlaybackState::Playing {
            debug!("play ignored: already playing");
            return;
        }

        shared.active.store(true, Ordering::SeqCst);
        session.state = PlaybackState::Playing;
        session.rewind();

        let section_count = session.script.len();
        info!(
            "narration started: {} sections, {}",
            section_count,
            progress::format_time(session.script.total_duration_secs())
        );
        shared.emit(PlaybackEvent::Started { section_count });
        shared.play_section(&mut session, 0);
    }

    /// Stop narration, keeping the section index. Resuming restarts from 0.
    pub fn pause(&self) {
        let shared = &self.shared;
        let mut session = shared.lock();

        let was_active = shared.halt(&mut session);
        if session.state == PlaybackState::Playing {
            session.state = PlaybackState::Paused;
            let section = session.current_section;
            info!("narration paused at section {}", section + 1);
            shared.emit(PlaybackEvent::Paused { section });
        } else if !was_active {
            debug!("pause ignored: not playing");
        }
        shared.publish(&session);
    }

    /// Stop narration and return to the idle state at section 0.
    pub fn reset(&self) {
        let shared = &self.shared;
        let mut session = shared.lock();

        shared.halt(&mut session);
        session.state = PlaybackState::Idle;
        session.rewind();
        info!("narration reset");
        shared.emit(PlaybackEvent::Reset);
        shared.publish(&session);
    }

    /// Jump to the next section. Returns false on the last section.
    ///
    /// While active, narration continues with the next section. Otherwise
    /// only the index moves.
    pub fn skip_to_next(&self) -> bool {
        let shared = &self.shared;
        let mut session = shared.lock();

        let from = session.current_section;
        let to = from + 1;
        if to >= session.script.len() {
            debug!("skip ignored: already on the last section");
            return false;
        }

        shared.cancel_section(&mut session);
        let floor = session.script.start_offset_secs(to);
        session.elapsed_secs = session
            .elapsed_secs
            .max(floor)
            .min(session.script.total_duration_secs());

        info!("skipping section {} -> {}", from + 1, to + 1);
        shared.emit(PlaybackEvent::Skipped { from, to });

        if shared.active.load(Ordering::SeqCst) {
            shared.play_section(&mut session, to);
        } else {
            session.current_section = to;
            shared.publish(&session);
        }
        true
    }

    /// Swap in a new script. Any running playback is stopped first.
    pub fn load_script(&self, script: Script) {
        let shared = &self.shared;
        let mut session = shared.lock();

        if shared.halt(&mut session) {
            info!("script replaced during playback, stopping");
        }
        session.script = Arc::new(script);
        session.state = PlaybackState::Idle;
        session.rewind();

        let section_count = session.script.len();
        shared.emit(PlaybackEvent::ScriptReplaced { section_count });
        shared.publish(&session);
    }

    pub fn current_section_index(&self) -> usize {
        self.shared.lock().current_section
    }

    pub fn current_section_title(&self) -> Option<String> {
        let session = self.shared.lock();
        session
            .script
            .section(session.current_section)
            .map(|s| s.title.clone())
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.shared.lock().elapsed_secs
    }

    pub fn total_duration_secs(&self) -> f64 {
        self.shared.lock().script.total_duration_secs()
    }

    pub fn state(&self) -> PlaybackState {
        self.shared.lock().state
    }

    /// The flag shown on the play/pause button. Mirrors the state, for display only.
    pub fn is_playing_for_ui(&self) -> bool {
        self.shared.snapshot_tx.borrow().is_playing
    }

    /// Authoritative "narration should continue" flag.
    pub fn is_active(&self) -> bool {
        self.shared.active.load(Ordering::SeqCst)
    }

    pub fn script(&self) -> Arc<Script> {
        Arc::clone(&self.shared.lock().script)
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        self.shared.snapshot_tx.borrow().clone()
    }

    /// Receiver that sees every snapshot change.
    pub fn watch(&self) -> watch::Receiver<PlaybackSnapshot> {
        self.shared.snapshot_tx.subscribe()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PlaybackEvent> {
        self.shared.events.subscribe()
    }
}

impl<E: NarrationEngine + 'static> Drop for PlaybackController<E> {
    fn drop(&mut self) {
        let mut session = self.shared.lock();
        self.shared.halt(&mut session);
    }
}

impl<E: NarrationEngine + 'static> Shared<E> {
    fn lock(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn is_live(&self, generation: u64) -> bool {
        self.active.load(Ordering::SeqCst) && self.generation.load(Ordering::SeqCst) == generation
    }

    fn emit(&self, event: PlaybackEvent) {
        // No subscribers is fine.
        self.events.send(event).ok();
    }

    fn publish(&self, session: &Session) {
        self.snapshot_tx.send_replace(session.snapshot());
    }

    /// Invalidate pending continuations of the current section and stop its
    /// tasks. Returns the new generation.
    fn cancel_section(&self, session: &mut Session) -> u64 {
        session.tasks.abort_all();
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Clear `active`, stop the section and silence the engine.
    /// Returns whether playback was active.
    fn halt(&self, session: &mut Session) -> bool {
        let was_active = self.active.swap(false, Ordering::SeqCst);
        self.cancel_section(session);
        if was_active {
            self.engine.cancel_all();
        }
        was_active
    }

    fn play_section(self: &Arc<Self>, session: &mut Session, index: usize) {
        let generation = self.cancel_section(session);
        session.section_settled = false;

        let Some(section) = session.script.section(index).cloned() else {
            self.complete(session);
            return;
        };
        session.current_section = index;

        // Whatever is still queued belongs to an earlier section.
        self.engine.cancel_all();

        let chunks = chunker::split(&section.content, self.config.max_chunk_chars);
        let deadline = section.nominal_duration() + self.config.grace_period;
        debug!(
            "section {} '{}': {} chunks, watchdog in {:?}",
            index + 1,
            section.title,
            chunks.len(),
            deadline
        );
        self.emit(PlaybackEvent::SectionStarted {
            index,
            title: section.title.clone(),
            chunk_count: chunks.len(),
        });
        self.publish(session);

        session.tasks.progress = Some(self.spawn_progress(generation, &section));
        session.tasks.narration = Some(self.spawn_narration(generation, index, chunks));
        session.tasks.watchdog = Some(self.spawn_watchdog(generation, index, deadline));
    }

    fn spawn_narration(
        self: &Arc<Self>,
        generation: u64,
        index: usize,
        chunks: Vec<String>,
    ) -> JoinHandle<()> {
        let shared = Arc::clone(self);
        tokio::spawn(async move {
            let outcome = chunker::speak_sequence(
                &shared.engine,
                &chunks,
                || shared.is_live(generation),
                |chunk, outcome| shared.report_chunk(index, chunk, outcome),
            )
            .await;

            if outcome == SequenceOutcome::Completed {
                shared.finish_section(generation, index, SectionEnd::Natural);
            }
        })
    }

    fn spawn_watchdog(self: &Arc<Self>, generation: u64, index: usize, deadline: Duration) -> JoinHandle<()> {
        let shared = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(deadline).await;
            shared.finish_section(generation, index, SectionEnd::Watchdog);
        })
    }

    fn spawn_progress(self: &Arc<Self>, generation: u64, section: &Section) -> JoinHandle<()> {
        let shared = Arc::clone(self);
        let reporter = ProgressReporter::new(self.config.progress_interval, section.nominal_duration());
        tokio::spawn(async move {
            reporter
                .run(|increment| shared.add_elapsed(generation, increment))
                .await;
        })
    }

    fn spawn_advance(self: &Arc<Self>, generation: u64, next: usize) -> JoinHandle<()> {
        let shared = Arc::clone(self);
        let pause = self.config.inter_section_pause;
        tokio::spawn(async move {
            tokio::time::sleep(pause).await;
            let mut session = shared.lock();
            if !shared.is_live(generation) {
                return;
            }
            shared.play_section(&mut session, next);
        })
    }

    fn report_chunk(&self, section: usize, chunk: usize, outcome: &ChunkOutcome) {
        let event = match outcome {
            ChunkOutcome::Spoken => PlaybackEvent::ChunkSpoken { section, chunk },
            ChunkOutcome::Failed { message } => PlaybackEvent::ChunkFailed {
                section,
                chunk,
                message: message.clone(),
            },
        };
        self.emit(event);
    }

    /// Count progress for the section started at `generation`.
    /// Returns false once that section is superseded.
    fn add_elapsed(&self, generation: u64, increment: f64) -> bool {
        let mut session = self.lock();
        if self.generation.load(Ordering::SeqCst) != generation {
            return false;
        }
        let total = session.script.total_duration_secs();
        session.elapsed_secs = progress::advance_elapsed(session.elapsed_secs, increment, total);
        self.publish(&session);
        true
    }

    fn finish_section(self: &Arc<Self>, generation: u64, index: usize, end: SectionEnd) {
        let mut session = self.lock();
        if self.generation.load(Ordering::SeqCst) != generation || session.section_settled {
            debug!("ignoring stale {:?} end of section {}", end, index + 1);
            return;
        }
        session.section_settled = true;

        match end {
            SectionEnd::Natural => {
                if let Some(watchdog) = session.tasks.watchdog.take() {
                    watchdog.abort();
                }
            }
            SectionEnd::Watchdog => {
                warn!(
                    "section {} did not finish narrating in time, forcing advance",
                    index + 1
                );
                self.emit(PlaybackEvent::WatchdogFired { section: index });
                if let Some(narration) = session.tasks.narration.take() {
                    narration.abort();
                }
                self.engine.cancel_all();
            }
        }
        self.emit(PlaybackEvent::SectionFinished {
            index,
            forced: end == SectionEnd::Watchdog,
        });

        let next = index + 1;
        if !self.active.load(Ordering::SeqCst) || next >= session.script.len() {
            self.complete(&mut session);
            return;
        }
        match end {
            SectionEnd::Natural => {
                session.tasks.advance = Some(self.spawn_advance(generation, next));
            }
            // Already overdue; no extra pause.
            SectionEnd::Watchdog => self.play_section(&mut session, next),
        }
    }

    fn complete(&self, session: &mut Session) {
        self.cancel_section(session);
        self.active.store(false, Ordering::SeqCst);
        session.state = PlaybackState::Completed;
        session.rewind();
        info!("narration completed");
        self.emit(PlaybackEvent::Completed);
        self.publish(session);
    }
}
