//! Sentinel-noise cleanup for model output.
//!
//! Some upstream backends leak serialization artifacts into human-visible text:
//! literal `null`/`NULL` tokens and the string `undefined`. This module strips
//! them and tidies the whitespace damage left behind. The cleanup is applied to
//! every reasoning-channel fragment before accumulation and once more to the
//! finished text, so it must be idempotent.

// ASCII word characters, matching the usual \b boundary. CJK text counts as a
// boundary, so a leaked token right after a han character is still removed.
fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn find_ascii_ci(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if haystack.len() < needle.len() {
        return None;
    }
    (from..=haystack.len() - needle.len())
        .find(|&i| haystack[i..i + needle.len()].eq_ignore_ascii_case(needle))
}

/// Remove every whole-word, case-insensitive occurrence of the ASCII `word`
/// from `text`.
fn remove_word(text: &str, word: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let bytes = text.as_bytes();
    let mut pos = 0;

    while let Some(start) = find_ascii_ci(bytes, word.as_bytes(), pos) {
        let end = start + word.len();

        let boundary_before = text[..start]
            .chars()
            .next_back()
            .map(|c| !is_word_char(c))
            .unwrap_or(true);
        let boundary_after = text[end..]
            .chars()
            .next()
            .map(|c| !is_word_char(c))
            .unwrap_or(true);

        if boundary_before && boundary_after {
            out.push_str(&text[pos..start]);
        } else {
            out.push_str(&text[pos..end]);
        }
        pos = end;
    }
    out.push_str(&text[pos..]);
    out
}

/// Remove every occurrence of `undefined`, repeating until none remain so that
/// removal cannot stitch two halves into a fresh occurrence.
fn remove_undefined(text: &str) -> String {
    let mut current = text.to_string();
    while current.contains("undefined") {
        current = current.replace("undefined", "");
    }
    current
}

/// Collapse any run of three or more consecutive blank lines to a single blank
/// line. Runs of one or two blank lines are left alone.
fn collapse_blank_runs(text: &str) -> String {
    let mut out: Vec<&str> = Vec::new();
    let mut blanks = 0usize;

    for line in text.lines() {
        if line.trim().is_empty() {
            blanks += 1;
            continue;
        }
        if blanks > 0 {
            let keep = if blanks >= 3 { 1 } else { blanks };
            for _ in 0..keep {
                out.push("");
            }
            blanks = 0;
        }
        out.push(line);
    }
    if blanks > 0 {
        let keep = if blanks >= 3 { 1 } else { blanks };
        for _ in 0..keep {
            out.push("");
        }
    }
    out.join("\n")
}

/// Strip sentinel tokens (`null`, `NULL`, `undefined`) from `text`, collapse
/// excessive blank lines, and trim surrounding whitespace.
///
/// Idempotent: re-applying to already-clean text returns it unchanged. The
/// token removal loops to a fixed point because removing one sentinel can
/// expose the other (`undefined` inside `null`, or the reverse).
pub fn strip_sentinels(text: &str) -> String {
    let mut current = text.to_string();
    loop {
        let next = remove_undefined(&remove_word(&current, "null"));
        if next == current {
            break;
        }
        current = next;
    }
    collapse_blank_runs(&current).trim().to_string()
}
