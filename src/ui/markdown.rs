//! Minimal markdown-to-document conversion.
//!
//! Converts assistant text (complete or partially streamed) into a plain data
//! [`Document`] the rendering surface can display however it likes. Only the
//! common subset matters here: headings 1-3, emphasis, inline and fenced code,
//! links, lists (including the `•` bullet some models emit), blockquotes, and
//! a trailing references section split off for separate presentation.
//!
//! The converter is deterministic and safe to re-run over the growing text on
//! every streamed delta: rendering the plain text of an already-rendered
//! document never double-wraps block structure.

use pulldown_cmark::{CodeBlockKind, Event, Parser, Tag, TagEnd};

pub const REFERENCES_HEADING_ZH: &str = "参考来源";
pub const REFERENCES_HEADING_EN: &str = "References";

#[derive(Debug, Clone, PartialEq)]
pub enum Inline {
    Text(String),
    Code(String),
    Bold(Vec<Inline>),
    Italic(Vec<Inline>),
    Link { text: Vec<Inline>, url: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Heading { level: u8, content: Vec<Inline> },
    Paragraph(Vec<Inline>),
    CodeBlock { language: Option<String>, code: String },
    List { ordered: bool, items: Vec<Vec<Inline>> },
    Blockquote(Vec<Inline>),
}

/// A converted document: main body blocks plus an optional trailing
/// references section.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    pub blocks: Vec<Block>,
    pub references: Option<Vec<Block>>,
}

struct ListCtx {
    ordered: bool,
    items: Vec<Vec<Inline>>,
}

#[derive(Default)]
struct Builder {
    blocks: Vec<Block>,
    // Open inline containers, innermost last. Paragraphs, headings, list
    // items, emphasis spans and links each push a frame.
    frames: Vec<Vec<Inline>>,
    link_urls: Vec<String>,
    lists: Vec<ListCtx>,
    quote_depth: usize,
    quote_inlines: Vec<Inline>,
    code: Option<(Option<String>, String)>,
}

impl Builder {
    fn push_inline(&mut self, inline: Inline) {
        if let Some(frame) = self.frames.last_mut() {
            frame.push(inline);
        } else {
            // Stray inline content outside any block; wrap it.
            self.blocks.push(Block::Paragraph(vec![inline]));
        }
    }

    fn close_paragraph(&mut self, content: Vec<Inline>) {
        if let Some(parent) = self.frames.last_mut() {
            // Paragraph inside a loose list item; merge with a line break.
            if !parent.is_empty() {
                parent.push(Inline::Text("\n".to_string()));
            }
            parent.extend(content);
        } else if self.quote_depth > 0 {
            // Consecutive quote lines merge into one block.
            if !self.quote_inlines.is_empty() {
                self.quote_inlines.push(Inline::Text("\n".to_string()));
            }
            self.quote_inlines.extend(content);
        } else if !content.is_empty() {
            self.blocks.push(Block::Paragraph(content));
        }
    }

    fn handle(&mut self, event: Event<'_>) {
        match event {
            Event::Start(Tag::Paragraph)
            | Event::Start(Tag::Heading { .. })
            | Event::Start(Tag::Item)
            | Event::Start(Tag::Emphasis)
            | Event::Start(Tag::Strong) => {
                self.frames.push(Vec::new());
            }
            Event::Start(Tag::Link { dest_url, .. }) => {
                self.link_urls.push(dest_url.to_string());
                self.frames.push(Vec::new());
            }
            Event::End(TagEnd::Paragraph) => {
                let content = self.frames.pop().unwrap_or_default();
                self.close_paragraph(content);
            }
            Event::End(TagEnd::Heading(level)) => {
                let content = self.frames.pop().unwrap_or_default();
                let level = (level as u8).min(3);
                self.blocks.push(Block::Heading { level, content });
            }
            Event::End(TagEnd::Item) => {
                let content = self.frames.pop().unwrap_or_default();
                if let Some(list) = self.lists.last_mut() {
                    list.items.push(content);
                } else {
                    self.close_paragraph(content);
                }
            }
            Event::End(TagEnd::Emphasis) => {
                let content = self.frames.pop().unwrap_or_default();
                self.push_inline(Inline::Italic(content));
            }
            Event::End(TagEnd::Strong) => {
                let content = self.frames.pop().unwrap_or_default();
                self.push_inline(Inline::Bold(content));
            }
            Event::End(TagEnd::Link) => {
                let content = self.frames.pop().unwrap_or_default();
                let url = self.link_urls.pop().unwrap_or_default();
                self.push_inline(Inline::Link { text: content, url });
            }
            Event::Start(Tag::List(start)) => {
                self.lists.push(ListCtx {
                    ordered: start.is_some(),
                    items: Vec::new(),
                });
            }
            Event::End(TagEnd::List(_)) => {
                if let Some(list) = self.lists.pop() {
                    if !list.items.is_empty() {
                        self.blocks.push(Block::List {
                            ordered: list.ordered,
                            items: list.items,
                        });
                    }
                }
            }
            Event::Start(Tag::BlockQuote(_)) => {
                self.quote_depth += 1;
            }
            Event::End(TagEnd::BlockQuote(_)) => {
                self.quote_depth = self.quote_depth.saturating_sub(1);
                if self.quote_depth == 0 && !self.quote_inlines.is_empty() {
                    let content = std::mem::take(&mut self.quote_inlines);
                    self.blocks.push(Block::Blockquote(content));
                }
            }
            Event::Start(Tag::CodeBlock(kind)) => {
                let language = match kind {
                    CodeBlockKind::Fenced(info) => info
                        .split_ascii_whitespace()
                        .next()
                        .map(str::to_string),
                    CodeBlockKind::Indented => None,
                };
                self.code = Some((language, String::new()));
            }
            Event::End(TagEnd::CodeBlock) => {
                if let Some((language, mut code)) = self.code.take() {
                    if code.ends_with('\n') {
                        code.pop();
                    }
                    self.blocks.push(Block::CodeBlock { language, code });
                }
            }
            Event::Text(text) => {
                if let Some((_, code)) = self.code.as_mut() {
                    code.push_str(&text);
                } else {
                    self.push_inline(Inline::Text(text.to_string()));
                }
            }
            Event::Code(code) => {
                self.push_inline(Inline::Code(code.to_string()));
            }
            Event::SoftBreak | Event::HardBreak => {
                self.push_inline(Inline::Text("\n".to_string()));
            }
            // Tables, footnotes, raw HTML and rules are outside the supported
            // subset.
            _ => {}
        }
    }
}

/// Normalize `•` bullet markers to `-` so the parser treats them as list
/// items; a few backends emit them instead of markdown markers.
fn normalize_bullets(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            out.push('\n');
        }
        let trimmed = line.trim_start();
        if let Some(rest) = trimmed.strip_prefix('•') {
            let indent = &line[..line.len() - trimmed.len()];
            out.push_str(indent);
            out.push('-');
            out.push_str(rest);
        } else {
            out.push_str(line);
        }
    }
    out
}

fn is_references_heading(content: &[Inline]) -> bool {
    let text = inlines_plain_text(content);
    let text = text.trim();
    text == REFERENCES_HEADING_ZH || text.eq_ignore_ascii_case(REFERENCES_HEADING_EN)
}

/// Split a trailing references section (a heading literally named 参考来源 or
/// References, plus everything after it) out of the block list.
fn split_references(blocks: Vec<Block>) -> (Vec<Block>, Option<Vec<Block>>) {
    let marker = blocks.iter().rposition(|block| {
        matches!(block, Block::Heading { content, .. } if is_references_heading(content))
    });
    match marker {
        Some(index) => {
            let mut main = blocks;
            let tail: Vec<Block> = main.drain(index..).skip(1).collect();
            (main, Some(tail))
        }
        None => (blocks, None),
    }
}

/// Convert text to a [`Document`]. Pure and deterministic.
pub fn render(text: &str) -> Document {
    let normalized = normalize_bullets(text);
    let mut builder = Builder::default();
    for event in Parser::new(&normalized) {
        builder.handle(event);
    }
    let (blocks, references) = split_references(builder.blocks);
    Document { blocks, references }
}

pub fn inlines_plain_text(inlines: &[Inline]) -> String {
    let mut out = String::new();
    for inline in inlines {
        match inline {
            Inline::Text(text) | Inline::Code(text) => out.push_str(text),
            Inline::Bold(children) | Inline::Italic(children) => {
                out.push_str(&inlines_plain_text(children));
            }
            Inline::Link { text, .. } => out.push_str(&inlines_plain_text(text)),
        }
    }
    out
}

fn block_plain_text(block: &Block) -> String {
    match block {
        Block::Heading { content, .. }
        | Block::Paragraph(content)
        | Block::Blockquote(content) => inlines_plain_text(content),
        Block::CodeBlock { code, .. } => code.clone(),
        Block::List { items, .. } => items
            .iter()
            .map(|item| inlines_plain_text(item))
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

/// The document's text with all markup stripped.
pub fn plain_text(document: &Document) -> String {
    let mut sections: Vec<String> = document.blocks.iter().map(block_plain_text).collect();
    if let Some(references) = &document.references {
        sections.extend(references.iter().map(block_plain_text));
    }
    sections.retain(|section| !section.is_empty());
    sections.join("\n\n")
}
