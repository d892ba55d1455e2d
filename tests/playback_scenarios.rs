//! End-to-end playback scenarios against the mock narration engine.
//!
//! All tests run on tokio's paused clock, so sleeps resolve instantly in
//! virtual time and the timings below are exact.

use narrator::playback::{ControllerConfig, PlaybackController, PlaybackEvent, PlaybackState};
use narrator::script::{Script, Section};
use narrator::{MockNarrationEngine, MockUtterance};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::{Instant, sleep, sleep_until};

type Controller = PlaybackController<Arc<MockNarrationEngine>>;

/// Three sections of 4s, 5s and 4s.
fn podcast() -> Script {
    Script::new(vec![
        Section::new("Introduction", "Welcome to your document analysis.", 4),
        Section::new("Overview", "This document contains three main sections.", 5),
        Section::new("Conclusion", "This concludes your analysis.", 4),
    ])
    .unwrap()
}

fn start(engine: MockNarrationEngine, script: Script) -> (Controller, Arc<MockNarrationEngine>) {
    let engine = Arc::new(engine);
    let controller = PlaybackController::new(Arc::clone(&engine), script, ControllerConfig::default());
    (controller, engine)
}

fn drain(events: &mut broadcast::Receiver<PlaybackEvent>) -> Vec<PlaybackEvent> {
    let mut out = Vec::new();
    while let Ok(event) = events.try_recv() {
        out.push(event);
    }
    out
}

fn watchdog_sections(events: &[PlaybackEvent]) -> Vec<usize> {
    events
        .iter()
        .filter_map(|e| match e {
            PlaybackEvent::WatchdogFired { section } => Some(*section),
            _ => None,
        })
        .collect()
}

fn started_sections(events: &[PlaybackEvent]) -> Vec<usize> {
    events
        .iter()
        .filter_map(|e| match e {
            PlaybackEvent::SectionStarted { index, .. } => Some(*index),
            _ => None,
        })
        .collect()
}

fn at(start: Instant, millis: u64) -> Instant {
    start + Duration::from_millis(millis)
}

#[tokio::test(start_paused = true)]
async fn stalled_section_is_skipped_after_grace_period() {
    let (controller, engine) = start(
        MockNarrationEngine::new()
            .with_default(MockUtterance::Complete(Duration::from_secs(4)))
            .with_rule("three main sections", MockUtterance::Stall),
        podcast(),
    );
    let mut events = controller.subscribe();
    let t0 = Instant::now();

    controller.play();

    // Introduction finishes at 4.0s, Overview starts after the 300ms pause.
    sleep_until(at(t0, 4250)).await;
    assert_eq!(controller.current_section_index(), 0);
    sleep_until(at(t0, 4350)).await;
    assert_eq!(controller.current_section_index(), 1);

    // Overview never reports back; its deadline is 4.3 + 5 + 2 = 11.3s.
    sleep_until(at(t0, 11250)).await;
    assert_eq!(controller.current_section_index(), 1);
    assert!(controller.is_active());
    sleep_until(at(t0, 11350)).await;
    assert_eq!(controller.current_section_index(), 2);

    // Conclusion completes normally at 15.3s.
    sleep_until(at(t0, 15250)).await;
    assert_eq!(controller.state(), PlaybackState::Playing);
    sleep_until(at(t0, 15350)).await;
    assert_eq!(controller.state(), PlaybackState::Completed);
    assert_eq!(controller.current_section_index(), 0);
    assert!(!controller.is_active());
    assert!(!controller.is_playing_for_ui());

    let events = drain(&mut events);
    assert_eq!(watchdog_sections(&events), vec![1]);
    assert_eq!(events.last(), Some(&PlaybackEvent::Completed));
    assert_eq!(engine.spoken().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn engine_that_never_reports_still_completes() {
    let (controller, _engine) = start(
        MockNarrationEngine::new().with_default(MockUtterance::Stall),
        podcast(),
    );
    let mut events = controller.subscribe();
    let t0 = Instant::now();

    controller.play();

    // Forced advances start the next section immediately: 6s, 13s, 19s.
    sleep_until(at(t0, 5950)).await;
    assert_eq!(controller.current_section_index(), 0);
    sleep_until(at(t0, 6050)).await;
    assert_eq!(controller.current_section_index(), 1);
    sleep_until(at(t0, 13050)).await;
    assert_eq!(controller.current_section_index(), 2);
    sleep_until(at(t0, 19050)).await;
    assert_eq!(controller.state(), PlaybackState::Completed);

    assert_eq!(watchdog_sections(&drain(&mut events)), vec![0, 1, 2]);
}

#[tokio::test(start_paused = true)]
async fn pause_then_play_restarts_from_the_beginning() {
    let (controller, engine) = start(
        MockNarrationEngine::new().with_default(MockUtterance::Complete(Duration::from_secs(4))),
        podcast(),
    );

    controller.play();
    sleep(Duration::from_secs(5)).await;
    assert_eq!(controller.current_section_index(), 1);

    controller.pause();
    assert_eq!(controller.state(), PlaybackState::Paused);
    assert_eq!(controller.current_section_index(), 1);
    assert!(!controller.is_playing_for_ui());

    controller.play();
    assert_eq!(controller.current_section_index(), 0);
    assert_eq!(controller.elapsed_secs(), 0.0);
    assert!(controller.is_playing_for_ui());

    sleep(Duration::from_millis(10)).await;
    assert_eq!(
        engine.spoken().last().map(String::as_str),
        Some("Welcome to your document analysis.")
    );
}

#[tokio::test(start_paused = true)]
async fn skip_while_paused_moves_index_without_narrating() {
    let (controller, engine) = start(
        MockNarrationEngine::new().with_default(MockUtterance::Complete(Duration::from_secs(4))),
        podcast(),
    );

    controller.play();
    sleep(Duration::from_secs(1)).await;
    controller.pause();
    let spoken = engine.spoken().len();

    assert!(controller.skip_to_next());
    assert_eq!(controller.current_section_index(), 1);
    assert!(!controller.is_playing_for_ui());
    assert!(!controller.is_active());

    sleep(Duration::from_secs(30)).await;
    assert_eq!(engine.spoken().len(), spoken);
    assert_eq!(controller.current_section_index(), 1);
    assert_eq!(controller.state(), PlaybackState::Paused);
}

#[tokio::test(start_paused = true)]
async fn pause_between_sections_cancels_the_pending_advance() {
    let (controller, engine) = start(
        MockNarrationEngine::new().with_default(MockUtterance::Complete(Duration::from_secs(4))),
        podcast(),
    );
    let mut events = controller.subscribe();
    let t0 = Instant::now();

    controller.play();

    // Introduction finished at 4.0s; the Overview is due at 4.3s.
    sleep_until(at(t0, 4100)).await;
    assert_eq!(controller.current_section_index(), 0);
    assert!(controller.is_active());
    controller.pause();

    sleep(Duration::from_secs(30)).await;
    assert_eq!(controller.state(), PlaybackState::Paused);
    assert_eq!(controller.current_section_index(), 0);
    assert!(!controller.is_active());
    assert_eq!(engine.spoken(), vec!["Welcome to your document analysis."]);

    let events = drain(&mut events);
    assert_eq!(started_sections(&events), vec![0]);
    assert!(watchdog_sections(&events).is_empty());
}

#[tokio::test(start_paused = true)]
async fn double_skip_between_sections_starts_each_section_once() {
    let (controller, engine) = start(
        MockNarrationEngine::new().with_default(MockUtterance::Complete(Duration::from_secs(4))),
        podcast(),
    );
    let mut events = controller.subscribe();
    let t0 = Instant::now();

    controller.play();

    sleep_until(at(t0, 4100)).await;
    assert_eq!(controller.current_section_index(), 0);
    assert!(controller.skip_to_next());
    assert!(controller.skip_to_next());
    assert_eq!(controller.current_section_index(), 2);
    assert_eq!(controller.elapsed_secs(), 9.0);

    // Past the point where the cancelled advance would have fired.
    sleep_until(at(t0, 4400)).await;
    assert_eq!(controller.current_section_index(), 2);

    // Conclusion started at 4.1s and completes at 8.1s.
    sleep(Duration::from_secs(30)).await;
    assert_eq!(controller.state(), PlaybackState::Completed);

    let events = drain(&mut events);
    assert_eq!(started_sections(&events), vec![0, 1, 2]);
    assert!(watchdog_sections(&events).is_empty());
    assert_eq!(
        events
            .iter()
            .filter(|e| matches!(e, PlaybackEvent::Completed))
            .count(),
        1
    );
    assert_eq!(
        engine.spoken().last().map(String::as_str),
        Some("This concludes your analysis.")
    );
    assert_eq!(
        engine
            .spoken()
            .iter()
            .filter(|t| t.as_str() == "This concludes your analysis.")
            .count(),
        1
    );
}

#[tokio::test(start_paused = true)]
async fn rapid_skips_leave_one_watchdog_per_section() {
    let (controller, engine) = start(
        MockNarrationEngine::new().with_default(MockUtterance::Stall),
        podcast(),
    );
    let mut events = controller.subscribe();

    controller.play();
    sleep(Duration::from_millis(100)).await;
    assert!(controller.skip_to_next());
    assert!(controller.skip_to_next());
    assert_eq!(controller.current_section_index(), 2);

    sleep(Duration::from_secs(30)).await;

    // Sections 0 and 1 were abandoned before their deadlines.
    let events = drain(&mut events);
    assert_eq!(watchdog_sections(&events), vec![2]);
    assert_eq!(
        events
            .iter()
            .filter(|e| matches!(e, PlaybackEvent::Completed))
            .count(),
        1
    );
    assert_eq!(controller.state(), PlaybackState::Completed);
    // The Overview was skipped before its narration task ever ran.
    assert_eq!(
        engine.spoken(),
        vec![
            "Welcome to your document analysis.",
            "This concludes your analysis."
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn elapsed_never_exceeds_total() {
    let (controller, _engine) = start(
        MockNarrationEngine::new().with_default(MockUtterance::Complete(Duration::from_secs(6))),
        podcast(),
    );
    let mut snapshots = controller.watch();
    let total = controller.total_duration_secs();

    controller.play();

    let mut max_elapsed: f64 = 0.0;
    loop {
        if snapshots.changed().await.is_err() {
            break;
        }
        let snapshot = snapshots.borrow_and_update().clone();
        assert!(snapshot.elapsed_secs <= total, "{} > {}", snapshot.elapsed_secs, total);
        assert!(snapshot.progress_percent() <= 100.0);
        max_elapsed = max_elapsed.max(snapshot.elapsed_secs);
        if snapshot.state == PlaybackState::Completed {
            break;
        }
    }

    assert!(max_elapsed > 0.0);
    assert!((max_elapsed - total).abs() < 1e-6);
}

#[tokio::test(start_paused = true)]
async fn skipping_never_moves_elapsed_backwards() {
    let (controller, _engine) = start(
        MockNarrationEngine::new().with_default(MockUtterance::Stall),
        podcast(),
    );

    controller.play();
    sleep(Duration::from_millis(500)).await;
    let before = controller.elapsed_secs();
    controller.skip_to_next();
    let after_first = controller.elapsed_secs();
    controller.skip_to_next();
    let after_second = controller.elapsed_secs();

    assert!(before <= after_first && after_first <= after_second);
    assert_eq!(after_second, 9.0);
}

#[tokio::test(start_paused = true)]
async fn play_on_empty_script_does_nothing() {
    let (controller, engine) = start(MockNarrationEngine::new(), Script::empty());
    let mut events = controller.subscribe();

    controller.play();
    sleep(Duration::from_secs(5)).await;

    assert_eq!(controller.state(), PlaybackState::Idle);
    assert!(!controller.is_active());
    assert!(engine.spoken().is_empty());
    assert!(drain(&mut events).is_empty());
    assert!(!controller.skip_to_next());
}

#[tokio::test(start_paused = true)]
async fn failed_chunks_do_not_stop_the_podcast() {
    let (controller, _engine) = start(
        MockNarrationEngine::new()
            .with_default(MockUtterance::Complete(Duration::from_millis(500)))
            .with_rule("three main sections", MockUtterance::Fail(Duration::from_millis(50))),
        podcast(),
    );
    let mut events = controller.subscribe();

    controller.play();
    sleep(Duration::from_secs(3)).await;

    assert_eq!(controller.state(), PlaybackState::Completed);
    let events = drain(&mut events);
    assert!(events.iter().any(|e| matches!(e, PlaybackEvent::ChunkFailed { section: 1, .. })));
    assert!(watchdog_sections(&events).is_empty());
}

#[tokio::test(start_paused = true)]
async fn replacing_the_script_mid_playback_stops_narration() {
    let (controller, engine) = start(
        MockNarrationEngine::new().with_default(MockUtterance::Complete(Duration::from_secs(1))),
        podcast(),
    );

    controller.play();
    sleep(Duration::from_millis(1500)).await;
    controller.load_script(
        Script::new(vec![Section::new("Introduction", "A different document.", 3)]).unwrap(),
    );
    let spoken = engine.spoken().len();

    sleep(Duration::from_secs(20)).await;
    assert_eq!(engine.spoken().len(), spoken);
    assert_eq!(controller.state(), PlaybackState::Idle);
    assert_eq!(controller.total_duration_secs(), 3.0);

    controller.play();
    sleep(Duration::from_secs(2)).await;
    assert_eq!(controller.state(), PlaybackState::Completed);
    assert_eq!(
        engine.spoken().last().map(String::as_str),
        Some("A different document.")
    );
}
