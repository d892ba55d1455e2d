//! Terminal rendering for `narrator script` and `narrator play`.

use crate::playback::{PlaybackEvent, PlaybackSnapshot, PlaybackState, SectionStatus, format_time};
use crate::script::Script;
use owo_colors::OwoColorize;

const DIM: &str = "\x1b[2m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const RESET: &str = "\x1b[0m";

const BAR_WIDTH: usize = 24;

/// Clear the current terminal line (replaces the progress line)
pub fn clear_line() {
    eprint!("\r\x1b[2K");
}

/// `[#####-------]` bar for a percentage.
pub fn progress_bar(percent: f64, width: usize) -> String {
    let filled = ((percent.clamp(0.0, 100.0) / 100.0) * width as f64).round() as usize;
    format!("[{}{}]", "#".repeat(filled), "-".repeat(width - filled.min(width)))
}

/// One-line transport status: bar, times, current section.
pub fn status_line(snapshot: &PlaybackSnapshot) -> String {
    let marker = match snapshot.state {
        PlaybackState::Playing => "▶",
        PlaybackState::Paused => "⏸",
        PlaybackState::Idle | PlaybackState::Completed => "■",
    };
    let title = snapshot.current_title.as_deref().unwrap_or("");
    let position = if snapshot.section_count == 0 {
        0
    } else {
        snapshot.current_section + 1
    };
    format!(
        "{marker} {} {} / {}  {} ({}/{})",
        progress_bar(snapshot.progress_percent(), BAR_WIDTH),
        format_time(snapshot.elapsed_secs),
        format_time(snapshot.total_duration_secs),
        title,
        position,
        snapshot.section_count
    )
}

/// Redraw the transport status in place.
pub fn render_status(snapshot: &PlaybackSnapshot) {
    clear_line();
    eprint!("{}", status_line(snapshot));
}

/// Text for a playback event, or `None` for events that only matter at -vv.
pub fn describe_event(event: &PlaybackEvent, verbose: u8) -> Option<String> {
    match event {
        PlaybackEvent::Started { section_count } => {
            Some(format!("{GREEN}Playing {section_count} sections{RESET}"))
        }
        PlaybackEvent::SectionStarted { index, title, .. } => {
            Some(format!("{GREEN}▶ {}. {}{RESET}", index + 1, title))
        }
        PlaybackEvent::ChunkSpoken { section, chunk } => {
            (verbose >= 2).then(|| format!("{DIM}  chunk {} of section {} done{RESET}", chunk + 1, section + 1))
        }
        PlaybackEvent::ChunkFailed { chunk, message, .. } => {
            Some(format!("{YELLOW}  chunk {} failed: {message}{RESET}", chunk + 1))
        }
        PlaybackEvent::WatchdogFired { section } => Some(format!(
            "{YELLOW}  section {} ran over, moving on{RESET}",
            section + 1
        )),
        PlaybackEvent::SectionFinished { index, forced } => (verbose >= 1).then(|| {
            let how = if *forced { "forced" } else { "done" };
            format!("{DIM}  section {} {how}{RESET}", index + 1)
        }),
        PlaybackEvent::Skipped { to, .. } => Some(format!("{DIM}Skipped to section {}{RESET}", to + 1)),
        PlaybackEvent::Paused { section } => Some(format!(
            "{DIM}Paused in section {} (play restarts from the beginning){RESET}",
            section + 1
        )),
        PlaybackEvent::Reset => Some(format!("{DIM}Reset{RESET}")),
        PlaybackEvent::Completed => Some(format!("{GREEN}Finished{RESET}")),
        PlaybackEvent::ScriptReplaced { section_count } => {
            Some(format!("{DIM}Loaded script with {section_count} sections{RESET}"))
        }
    }
}

/// Print an event above the status line.
pub fn render_event(event: &PlaybackEvent, verbose: u8) {
    if let Some(line) = describe_event(event, verbose) {
        clear_line();
        eprintln!("{line}");
    }
}

/// Numbered listing of a script, marking each section relative to `current`.
pub fn script_listing(script: &Script, current: Option<usize>, color: bool) -> String {
    let mut out = String::new();
    let header = format!(
        "{} sections, about {} min",
        script.len(),
        script.total_minutes()
    );
    if color {
        out.push_str(&format!("{}\n", header.bold()));
    } else {
        out.push_str(&format!("{header}\n"));
    }

    for (index, section) in script.sections().iter().enumerate() {
        let marker = match current.map(|c| SectionStatus::for_index(index, c)) {
            Some(SectionStatus::Done) => "✓",
            Some(SectionStatus::Current) => "▶",
            Some(SectionStatus::Upcoming) | None => " ",
        };
        let timing = format!("{}s", section.nominal_duration_secs);
        if color {
            out.push_str(&format!(
                "{marker} {:>2}. {} {}\n",
                index + 1,
                section.title.cyan().bold(),
                timing.dimmed()
            ));
            out.push_str(&format!("      {}\n", section.content.dimmed()));
        } else {
            out.push_str(&format!("{marker} {:>2}. {} {timing}\n", index + 1, section.title));
            out.push_str(&format!("      {}\n", section.content));
        }
    }
    out
}
