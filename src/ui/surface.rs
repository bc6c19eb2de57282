//! Terminal presentation of rendered messages.
//!
//! This is deliberately thin: the core hands over [`RenderedMessage`] values
//! and this module decides how they look on a terminal. Nothing here feeds
//! back into the pipeline.

use std::io::Write;

use crate::core::render::{RenderSurface, RenderedMessage};
use crate::core::stream::RenderHint;
use crate::ui::markdown::{inlines_plain_text, plain_text, Block, Document, Inline};

const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const ITALIC: &str = "\x1b[3m";
const UNDERLINE: &str = "\x1b[4m";
const RED: &str = "\x1b[31m";
const CYAN: &str = "\x1b[36m";
const RESET: &str = "\x1b[0m";

fn style_inlines(inlines: &[Inline]) -> String {
    let mut out = String::new();
    for inline in inlines {
        match inline {
            Inline::Text(text) => out.push_str(text),
            Inline::Code(code) => {
                out.push_str(CYAN);
                out.push_str(code);
                out.push_str(RESET);
            }
            Inline::Bold(children) => {
                out.push_str(BOLD);
                out.push_str(&style_inlines(children));
                out.push_str(RESET);
            }
            Inline::Italic(children) => {
                out.push_str(ITALIC);
                out.push_str(&style_inlines(children));
                out.push_str(RESET);
            }
            Inline::Link { text, url } => {
                out.push_str(UNDERLINE);
                out.push_str(&style_inlines(text));
                out.push_str(RESET);
                if !url.is_empty() {
                    out.push_str(&format!(" {DIM}({url}){RESET}"));
                }
            }
        }
    }
    out
}

fn style_block(block: &Block) -> String {
    match block {
        Block::Heading { content, .. } => {
            format!("{BOLD}{}{RESET}", inlines_plain_text(content))
        }
        Block::Paragraph(content) => style_inlines(content),
        Block::CodeBlock { code, .. } => {
            format!("{DIM}{}{RESET}", code)
        }
        Block::List { ordered, items } => items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                if *ordered {
                    format!("{}. {}", i + 1, style_inlines(item))
                } else {
                    format!("- {}", style_inlines(item))
                }
            })
            .collect::<Vec<_>>()
            .join("\n"),
        Block::Blockquote(content) => style_inlines(content)
            .lines()
            .map(|line| format!("> {line}"))
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

/// Render a whole document with terminal styling.
pub fn format_document(document: &Document) -> String {
    let mut sections: Vec<String> = document.blocks.iter().map(style_block).collect();
    if let Some(references) = &document.references {
        sections.push(format!("{BOLD}References{RESET}"));
        sections.extend(references.iter().map(style_block));
    }
    sections.retain(|section| !section.is_empty());
    sections.join("\n\n")
}

/// Writes incremental updates to stdout as the stream progresses and the
/// fully styled document when a turn finalizes.
#[derive(Default)]
pub struct TerminalSurface {
    printed_main: String,
    printed_reasoning: String,
    streamed: bool,
}

impl TerminalSurface {
    pub fn new() -> Self {
        Self::default()
    }

    fn print_suffix(previous: &mut String, current: &str, style: &str) {
        // The growing document usually extends what we already printed; when
        // a re-render reshapes earlier text instead, skip this update and let
        // the final flush settle the difference.
        if let Some(suffix) = current.strip_prefix(previous.as_str()) {
            if !suffix.is_empty() {
                print!("{style}{suffix}{RESET}");
                let _ = std::io::stdout().flush();
                previous.push_str(suffix);
            }
        }
    }
}

impl RenderSurface for TerminalSurface {
    fn update(&mut self, message: &RenderedMessage, hint: RenderHint) {
        self.streamed = true;
        match hint {
            RenderHint::MainText => {
                let current = plain_text(&message.main);
                Self::print_suffix(&mut self.printed_main, &current, "");
            }
            RenderHint::Reasoning => {
                let current = message.reasoning.clone().unwrap_or_default();
                Self::print_suffix(&mut self.printed_reasoning, &current, DIM);
            }
            RenderHint::Metadata => {
                if let Some(kind) = &message.question_type {
                    println!("{DIM}[{kind}]{RESET}");
                }
            }
            RenderHint::None => {}
        }
    }

    fn finalize(&mut self, message: &RenderedMessage) {
        if self.streamed {
            // Body already on screen; close the line and append anything that
            // only exists in the final pass.
            println!();
            if let Some(references) = &message.main.references {
                println!();
                println!("{BOLD}References{RESET}");
                for block in references {
                    println!("{}", style_block(block));
                }
            }
        } else {
            if let Some(kind) = &message.question_type {
                println!("{DIM}[{kind}]{RESET}");
            }
            if let Some(reasoning) = &message.reasoning {
                if !reasoning.is_empty() {
                    println!("{DIM}{reasoning}{RESET}");
                    println!();
                }
            }
            println!("{}", format_document(&message.main));
        }
        let _ = std::io::stdout().flush();
    }

    fn show_error(&mut self, message: &str) {
        println!("{RED}{message}{RESET}");
        let _ = std::io::stdout().flush();
    }

    fn cancelled(&mut self) {
        // Close the half-printed line before the prompt comes back.
        if self.streamed {
            println!();
        }
        println!("{DIM}[cancelled]{RESET}");
        let _ = std::io::stdout().flush();
    }

    fn scroll_to_bottom(&mut self) {
        let _ = std::io::stdout().flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::markdown::render;

    #[test]
    fn format_document_styles_the_common_subset() {
        let document = render("# Title\n\nsome **bold**\n\n- a\n- b\n\n> quoted");
        let formatted = format_document(&document);
        assert!(formatted.contains(&format!("{BOLD}Title{RESET}")));
        assert!(formatted.contains(&format!("{BOLD}bold{RESET}")));
        assert!(formatted.contains("- a"));
        assert!(formatted.contains("> quoted"));
    }

    #[test]
    fn format_document_appends_references_last() {
        let document = render("Body.\n\n## References\n\n1. [a](https://a)");
        let formatted = format_document(&document);
        let body_pos = formatted.find("Body.").unwrap();
        let refs_pos = formatted.find("References").unwrap();
        assert!(refs_pos > body_pos);
    }
}
