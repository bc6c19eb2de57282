//! Running document state for one in-flight assistant turn.
//!
//! Exactly one [`StreamState`] exists per turn. Classified payloads are applied
//! in arrival order; once the stream terminates the state is frozen and a new
//! one is created for the next turn.

use crate::api::SearchResult;
use crate::core::classify::Payload;
use crate::core::sanitize::strip_sentinels;

/// Which region of the document an applied payload changed. Lets the render
/// driver re-derive only the affected region; re-rendering the full document on
/// every delta is the dominant cost under high-frequency streaming.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderHint {
    MainText,
    Reasoning,
    Metadata,
    None,
}

#[derive(Debug, Default)]
pub struct StreamState {
    main_text: String,
    reasoning_text: Option<String>,
    search_results: Option<Vec<SearchResult>>,
    question_type: Option<String>,
    terminated: bool,
}

impl StreamState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn main_text(&self) -> &str {
        &self.main_text
    }

    pub fn reasoning_text(&self) -> Option<&str> {
        self.reasoning_text.as_deref()
    }

    pub fn search_results(&self) -> Option<&[SearchResult]> {
        self.search_results.as_deref()
    }

    pub fn question_type(&self) -> Option<&str> {
        self.question_type.as_deref()
    }

    pub fn terminated(&self) -> bool {
        self.terminated
    }

    /// Retire the turn without an end-of-stream payload, freezing the state
    /// so that stragglers from an abandoned stream change nothing.
    pub fn cancel(&mut self) {
        self.terminated = true;
    }

    /// Apply one classified payload. Pure state transition; returns the region
    /// that changed so the caller can re-render selectively.
    pub fn apply(&mut self, payload: Payload) -> RenderHint {
        if self.terminated {
            return RenderHint::None;
        }

        match payload {
            Payload::ContentDelta(text)
            | Payload::ChoiceDelta(text)
            | Payload::GenericDelta(text) => {
                // Main-channel text is appended verbatim; sanitization happens
                // in the final whole-document pass.
                self.main_text.push_str(&text);
                RenderHint::MainText
            }
            Payload::ReasoningDelta(text) => {
                let reasoning = self.reasoning_text.get_or_insert_with(String::new);
                let clean = strip_sentinels(&text);
                if clean.is_empty() {
                    RenderHint::None
                } else {
                    reasoning.push_str(&clean);
                    RenderHint::Reasoning
                }
            }
            Payload::SearchResults {
                items,
                question_type,
            } => {
                // First occurrence wins; later duplicates would only cause
                // flicker downstream.
                let mut changed = false;
                if self.search_results.is_none() {
                    self.search_results = Some(items);
                    changed = true;
                }
                if self.question_type.is_none() {
                    if let Some(kind) = question_type {
                        self.question_type = Some(kind);
                        changed = true;
                    }
                }
                if changed {
                    RenderHint::Metadata
                } else {
                    RenderHint::None
                }
            }
            Payload::EndOfStream => {
                self.terminated = true;
                if let Some(reasoning) = self.reasoning_text.take() {
                    self.reasoning_text = Some(strip_sentinels(&reasoning));
                }
                RenderHint::None
            }
            Payload::Unrecognized => RenderHint::None,
        }
    }
}
