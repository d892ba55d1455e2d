//! Chunker: splits section text into speakable pieces and narrates them in order.
//!
//! Speech engines choke on long utterances, so every section is broken into
//! chunks of at most `max_chars` characters, cut at whitespace. The chunks are
//! then spoken strictly one after another:
//! - chunk n+1 starts only after chunk n completed or failed
//! - a failed chunk is logged and counts as done
//! - the `keep_going` check runs before and after every chunk; once it says
//!   stop, nothing else is reported

use super::engine::NarrationEngine;
use log::{debug, warn};

/// Result of one chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkOutcome {
    Spoken,
    Failed { message: String },
}

/// How a sequence ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceOutcome {
    /// Every chunk reached a terminal state.
    Completed,
    /// `keep_going` returned false; the remaining chunks were skipped.
    Aborted,
}

/// Split `text` into chunks of at most `max_chars` characters.
///
/// Chunks break at whitespace and runs of whitespace collapse to one space.
/// A word longer than the bound is cut at the bound. Returns no chunks only
/// when `text` has no non-whitespace characters.
pub fn split(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for word in text.split_whitespace() {
        let word_len = word.chars().count();

        if word_len > max_chars {
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let chars: Vec<char> = word.chars().collect();
            let mut pieces = chars.chunks(max_chars).peekable();
            while let Some(piece) = pieces.next() {
                let piece: String = piece.iter().collect();
                if pieces.peek().is_some() {
                    chunks.push(piece);
                } else {
                    // The tail may still share a chunk with following words.
                    current_len = piece.chars().count();
                    current = piece;
                }
            }
            continue;
        }

        let needed = if current.is_empty() {
            word_len
        } else {
            current_len + 1 + word_len
        };
        if needed > max_chars {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }

        if !current.is_empty() {
            current.push(' ');
            current_len += 1;
        }
        current.push_str(word);
        current_len += word_len;
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Narrate `chunks` one at a time through `engine`.
///
/// `keep_going` is the authoritative "should we still be playing" check and
/// is read fresh before each chunk and after each chunk finishes.
/// `on_chunk_done` is called with the chunk index and outcome for every chunk
/// that finished while `keep_going` still held.
pub async fn speak_sequence<E, K, F>(
    engine: &E,
    chunks: &[String],
    keep_going: K,
    mut on_chunk_done: F,
) -> SequenceOutcome
where
    E: NarrationEngine + ?Sized,
    K: Fn() -> bool,
    F: FnMut(usize, &ChunkOutcome),
{
    for (index, chunk) in chunks.iter().enumerate() {
        if !keep_going() {
            debug!("sequence stopped before chunk {}/{}", index + 1, chunks.len());
            return SequenceOutcome::Aborted;
        }

        let outcome = match engine.speak(chunk).await {
            Ok(()) => ChunkOutcome::Spoken,
            Err(e) => {
                warn!(
                    "{}: chunk {}/{} failed, continuing: {}",
                    engine.name(),
                    index + 1,
                    chunks.len(),
                    e
                );
                ChunkOutcome::Failed {
                    message: e.to_string(),
                }
            }
        };

        if !keep_going() {
            debug!("sequence stopped after chunk {}/{}", index + 1, chunks.len());
            return SequenceOutcome::Aborted;
        }
        on_chunk_done(index, &outcome);
    }

    SequenceOutcome::Completed
}
