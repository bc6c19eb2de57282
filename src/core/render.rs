//! Deriving the visible document from stream state.
//!
//! The driver sits between the accumulator and the rendering surface: after
//! each applied payload it rebuilds the region named by the [`RenderHint`] and
//! hands the result to the surface as a plain [`RenderedMessage`] value. The
//! surface owns all presentation concerns.

use crate::api::{ChatResponseBody, SearchResult};
use crate::core::classify::Payload;
use crate::core::sanitize::strip_sentinels;
use crate::core::stream::{RenderHint, StreamState};
use crate::ui::markdown::{self, Document};

/// Fallback reply when a non-streaming response carries no answer text.
pub const EMPTY_RESPONSE_FALLBACK: &str = "Sorry, I can't answer that question.";

/// One visible document update. Produced fresh on every change; the rendering
/// surface decides how (and whether) to display each part.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderedMessage {
    pub main: Document,
    pub reasoning: Option<String>,
    pub question_type: Option<String>,
    /// Search-result attribution. Deliberately left empty by the driver even
    /// when results were received: product policy is to keep the reply
    /// uncluttered and let the answer's own references section carry sourcing.
    pub search_results: Option<Vec<SearchResult>>,
}

/// The external rendering surface. Implementations display updates; the core
/// never touches presentation.
pub trait RenderSurface {
    /// An incremental update during streaming.
    fn update(&mut self, message: &RenderedMessage, hint: RenderHint);
    /// The final document for a terminated turn.
    fn finalize(&mut self, message: &RenderedMessage);
    /// A user-visible error that replaces the reply.
    fn show_error(&mut self, message: &str);
    /// The turn was abandoned mid-stream.
    fn cancelled(&mut self) {}
    /// Keep the latest content in view.
    fn scroll_to_bottom(&mut self) {}
}

pub struct RenderDriver<'a, S: RenderSurface + ?Sized> {
    state: StreamState,
    // Markdown for the main text as of the last main-channel change. Reused
    // for reasoning and metadata updates, which leave the main text untouched;
    // rebuilding it per delta is the dominant cost under rapid streaming.
    main_document: Document,
    surface: &'a mut S,
}

impl<'a, S: RenderSurface + ?Sized> RenderDriver<'a, S> {
    pub fn new(surface: &'a mut S) -> Self {
        Self {
            state: StreamState::new(),
            main_document: Document::default(),
            surface,
        }
    }

    pub fn state(&self) -> &StreamState {
        &self.state
    }

    fn message(&self) -> RenderedMessage {
        RenderedMessage {
            main: self.main_document.clone(),
            reasoning: self.state.reasoning_text().map(str::to_string),
            question_type: self.state.question_type().map(str::to_string),
            search_results: None,
        }
    }

    /// Apply one classified payload and propagate the resulting update to the
    /// surface.
    pub fn apply(&mut self, payload: Payload) {
        // A retired turn accepts nothing more, not even a second finalize.
        if self.state.terminated() {
            return;
        }
        let hint = self.state.apply(payload);
        if self.state.terminated() {
            self.main_document = markdown::render(&strip_sentinels(self.state.main_text()));
            let message = self.message();
            self.surface.finalize(&message);
            self.surface.scroll_to_bottom();
            return;
        }
        if hint == RenderHint::None {
            return;
        }
        if hint == RenderHint::MainText {
            self.main_document = markdown::render(self.state.main_text());
        }
        let message = self.message();
        self.surface.update(&message, hint);
        self.surface.scroll_to_bottom();
    }

    /// Abandon the turn: freeze the state so stragglers change nothing and
    /// let the surface close out its output.
    pub fn cancel(&mut self) {
        self.state.cancel();
        self.surface.cancelled();
    }

    /// Apply a complete non-streaming response. Skips the frame pipeline and
    /// feeds the accumulator directly, once.
    pub fn apply_response(&mut self, body: ChatResponseBody) {
        if let Some(error) = body.error {
            self.surface.show_error(&error);
            return;
        }
        if let Some(results) = body.search_results {
            self.state.apply(Payload::SearchResults {
                items: results,
                question_type: body.question_type,
            });
        } else if let Some(kind) = body.question_type {
            self.state.apply(Payload::SearchResults {
                items: Vec::new(),
                question_type: Some(kind),
            });
        }
        if let Some(reasoning) = body.reasoning_content {
            self.state.apply(Payload::ReasoningDelta(reasoning));
        }
        let response = body
            .response
            .unwrap_or_else(|| EMPTY_RESPONSE_FALLBACK.to_string());
        self.state.apply(Payload::ContentDelta(response));
        self.apply(Payload::EndOfStream);
    }

    /// Surface a transport-level failure for this turn.
    pub fn fail(&mut self, message: &str) {
        self.surface.show_error(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::classify::classify;
    use crate::core::frames::{frame_payload, FrameSplitter};
    use crate::ui::markdown::{plain_text, Block, Inline};

    #[derive(Default)]
    struct RecordingSurface {
        updates: Vec<(RenderedMessage, RenderHint)>,
        finalized: Option<RenderedMessage>,
        errors: Vec<String>,
        cancellations: usize,
        scrolls: usize,
    }

    impl RenderSurface for RecordingSurface {
        fn update(&mut self, message: &RenderedMessage, hint: RenderHint) {
            self.updates.push((message.clone(), hint));
        }
        fn finalize(&mut self, message: &RenderedMessage) {
            self.finalized = Some(message.clone());
        }
        fn show_error(&mut self, message: &str) {
            self.errors.push(message.to_string());
        }
        fn cancelled(&mut self) {
            self.cancellations += 1;
        }
        fn scroll_to_bottom(&mut self) {
            self.scrolls += 1;
        }
    }

    fn run_stream(chunks: &[&str]) -> RecordingSurface {
        let mut surface = RecordingSurface::default();
        {
            let mut driver = RenderDriver::new(&mut surface);
            let mut splitter = FrameSplitter::new();
            for chunk in chunks {
                for line in splitter.push(chunk.as_bytes()) {
                    if let Some(payload) = frame_payload(&line) {
                        driver.apply(classify(payload));
                    }
                }
            }
            splitter.finish();
        }
        surface
    }

    #[test]
    fn streamed_content_accumulates_across_frames() {
        let surface = run_stream(&[
            "data: {\"content\":\"Hel\"}\n",
            "data: {\"content\":\"lo\"}\n",
            "[DONE]\n",
        ]);
        let final_message = surface.finalized.expect("stream should finalize");
        assert_eq!(plain_text(&final_message.main), "Hello");
        assert_eq!(surface.updates.len(), 2);
        assert!(surface.scrolls >= 3);
    }

    #[test]
    fn reasoning_frames_feed_the_side_channel() {
        let surface = run_stream(&[
            "data: {\"is_reasoning\": true, \"content\": \"null step 1\"}\n",
            "[DONE]\n",
        ]);
        let final_message = surface.finalized.expect("stream should finalize");
        assert_eq!(final_message.reasoning.as_deref(), Some("step 1"));
        assert_eq!(surface.updates.last().unwrap().1, RenderHint::Reasoning);
    }

    #[test]
    fn malformed_frames_do_not_interrupt_accumulation() {
        let surface = run_stream(&[
            "data: {\"content\":\"A\"}\n",
            "data: {not json\n",
            "data: {\"content\":\"B\"}\n",
            "[DONE]\n",
        ]);
        let final_message = surface.finalized.expect("stream should finalize");
        assert_eq!(plain_text(&final_message.main), "AB");
    }

    #[test]
    fn search_results_are_recorded_but_not_displayed() {
        let surface = run_stream(&[
            "data: {\"search_results\":[{\"title\":\"T\",\"url\":\"u\",\"snippet\":\"s\"}],\"question_type\":\"开放性问题\"}\n",
            "data: {\"content\":\"answer\"}\n",
            "[DONE]\n",
        ]);
        let final_message = surface.finalized.expect("stream should finalize");
        assert_eq!(final_message.question_type.as_deref(), Some("开放性问题"));
        // Attribution suppression is policy, not an accident.
        assert!(final_message.search_results.is_none());
    }

    #[test]
    fn non_streaming_response_renders_markdown() {
        let mut surface = RecordingSurface::default();
        {
            let mut driver = RenderDriver::new(&mut surface);
            driver.apply_response(ChatResponseBody {
                response: Some("Hi **there**".to_string()),
                ..Default::default()
            });
        }
        let final_message = surface.finalized.expect("response should finalize");
        let Block::Paragraph(inlines) = &final_message.main.blocks[0] else {
            panic!("expected paragraph");
        };
        assert!(inlines.contains(&Inline::Bold(vec![Inline::Text("there".to_string())])));
    }

    #[test]
    fn non_streaming_response_uses_fallback_when_empty() {
        let mut surface = RecordingSurface::default();
        {
            let mut driver = RenderDriver::new(&mut surface);
            driver.apply_response(ChatResponseBody::default());
        }
        let final_message = surface.finalized.expect("response should finalize");
        assert_eq!(plain_text(&final_message.main), EMPTY_RESPONSE_FALLBACK);
    }

    #[test]
    fn non_streaming_error_is_surfaced_inline() {
        let mut surface = RecordingSurface::default();
        {
            let mut driver = RenderDriver::new(&mut surface);
            driver.apply_response(ChatResponseBody {
                error: Some("backend unavailable".to_string()),
                ..Default::default()
            });
        }
        assert_eq!(surface.errors, vec!["backend unavailable"]);
        assert!(surface.finalized.is_none());
    }

    #[test]
    fn side_channel_updates_reuse_the_main_document() {
        let surface = run_stream(&[
            "data: {\"content\":\"Hel\"}\n",
            "data: {\"is_reasoning\": true, \"content\": \"thinking\"}\n",
            "data: {\"content\":\"lo\"}\n",
            "[DONE]\n",
        ]);
        // The reasoning update carries the document unchanged from the last
        // main-channel delta, and the next main-channel delta rebuilds it.
        assert_eq!(surface.updates[1].1, RenderHint::Reasoning);
        assert_eq!(surface.updates[1].0.main, surface.updates[0].0.main);
        assert_eq!(plain_text(&surface.updates[2].0.main), "Hello");
    }

    #[test]
    fn cancellation_stops_updates_and_notifies_the_surface() {
        let mut surface = RecordingSurface::default();
        {
            let mut driver = RenderDriver::new(&mut surface);
            driver.apply(Payload::ContentDelta("partial".to_string()));
            driver.cancel();
            driver.apply(Payload::ContentDelta("late".to_string()));
            driver.apply(Payload::EndOfStream);
        }
        assert_eq!(surface.cancellations, 1);
        assert_eq!(surface.updates.len(), 1);
        assert!(surface.finalized.is_none());
        assert!(surface.errors.is_empty());
    }

    #[test]
    fn final_pass_sanitizes_the_main_document() {
        let surface = run_stream(&[
            "data: {\"content\":\"clean null answer\"}\n",
            "[DONE]\n",
        ]);
        // Intermediate updates carry the text verbatim.
        assert_eq!(
            plain_text(&surface.updates[0].0.main),
            "clean null answer"
        );
        // The terminal flush runs the whole-document sanitizer.
        let final_message = surface.finalized.expect("stream should finalize");
        assert_eq!(plain_text(&final_message.main), "clean  answer");
    }
}
