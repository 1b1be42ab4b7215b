//! Artifact extraction — locating the deliverable inside free-text turns.
//!
//! Participant messages are prose with an HTML document embedded somewhere.
//! The extractor runs a cheap trigger pre-filter, then an ordered cascade of
//! [`Matcher`]s:
//!
//! 1. Matchers are tried in order; a matcher's hits are trimmed and the
//!    longest one (by character count, first on ties) is its candidate.
//! 2. A candidate shorter than the minimum length is discarded and the
//!    cascade moves on to the next matcher.
//! 3. The first matcher producing a candidate at or above the minimum wins.
//!
//! The same input always selects the same candidate.

pub mod matchers;

pub use matchers::{Matcher, html_cascade};

use roundtable_core::message::{ConversationState, Message};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// Token sets that mark a message as worth running the cascade on.
/// A message triggers when every token of at least one set is present.
const TRIGGER_SETS: &[&[&str]] = &[
    &["```"],
    &["<!doctype"],
    &["<html", "</html>"],
    &["<head", "<body"],
];

/// One matcher's best hit inside one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionCandidate {
    /// Sequence index of the message the text came from
    pub source_sequence: usize,
    pub text: String,
    /// Name of the matcher that produced it
    pub pattern: &'static str,
    /// Position of that matcher in the cascade (0 = most specific)
    pub pattern_rank: usize,
    /// Length in characters
    pub length: usize,
}

/// The selected deliverable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub text: String,
    pub source_sequence: usize,
    pub pattern: String,
    /// Whether the text met the minimum length
    pub valid: bool,
}

impl Artifact {
    fn from_candidate(candidate: ExtractionCandidate, min_chars: usize) -> Self {
        Self {
            valid: candidate.length >= min_chars,
            text: candidate.text,
            source_sequence: candidate.source_sequence,
            pattern: candidate.pattern.to_string(),
        }
    }

    /// Length in characters.
    pub fn chars(&self) -> usize {
        self.text.chars().count()
    }
}

/// Runs the matcher cascade over messages.
#[derive(Debug, Clone)]
pub struct ArtifactExtractor {
    matchers: Vec<Matcher>,
    min_chars: usize,
}

impl ArtifactExtractor {
    /// The default HTML cascade with the given minimum length.
    pub fn new(min_chars: usize) -> Self {
        Self::with_matchers(html_cascade(), min_chars)
    }

    pub fn with_matchers(matchers: Vec<Matcher>, min_chars: usize) -> Self {
        Self {
            matchers,
            min_chars,
        }
    }

    pub fn min_chars(&self) -> usize {
        self.min_chars
    }

    /// Cheap pre-filter over the lowercased content.
    pub fn triggers(content: &str) -> bool {
        let lower = content.to_lowercase();
        TRIGGER_SETS
            .iter()
            .any(|set| set.iter().all(|token| lower.contains(token)))
    }

    /// Best valid candidate in `text`, or `None`.
    pub fn best_candidate(&self, source_sequence: usize, text: &str) -> Option<ExtractionCandidate> {
        if !Self::triggers(text) {
            return None;
        }

        for (rank, matcher) in self.matchers.iter().enumerate() {
            let Some(longest) = longest_match(matcher.find_all(text)) else {
                continue;
            };
            let length = longest.chars().count();

            if length < self.min_chars {
                trace!(
                    pattern = matcher.name,
                    length,
                    min = self.min_chars,
                    "Candidate below threshold, trying next pattern"
                );
                continue;
            }

            return Some(ExtractionCandidate {
                source_sequence,
                text: longest,
                pattern: matcher.name,
                pattern_rank: rank,
                length,
            });
        }

        None
    }

    /// Extract from raw text attributed to `source_sequence`.
    pub fn extract_text(&self, source_sequence: usize, text: &str) -> Option<Artifact> {
        self.best_candidate(source_sequence, text)
            .map(|c| Artifact::from_candidate(c, self.min_chars))
    }

    /// Extract from a single recorded message.
    pub fn extract_message(&self, message: &Message) -> Option<Artifact> {
        self.extract_text(message.sequence, &message.content)
    }

    /// Scan every participant message in order; the first one carrying a
    /// valid candidate wins.
    pub fn scan_conversation(&self, state: &ConversationState) -> Option<Artifact> {
        let found = state
            .participant_messages()
            .find_map(|message| self.extract_message(message));

        match &found {
            Some(artifact) => debug!(
                sequence = artifact.source_sequence,
                pattern = %artifact.pattern,
                "Full-log scan found an artifact"
            ),
            None => debug!(messages = state.len(), "Full-log scan found nothing"),
        }
        found
    }
}

/// Longest text by character count; the earliest wins ties.
fn longest_match(matches: Vec<String>) -> Option<String> {
    let mut best: Option<(usize, String)> = None;
    for text in matches {
        let len = text.chars().count();
        if best.as_ref().is_none_or(|(best_len, _)| len > *best_len) {
            best = Some((len, text));
        }
    }
    best.map(|(_, text)| text)
}
