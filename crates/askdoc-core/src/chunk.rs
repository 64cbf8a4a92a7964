//! Paragraph-boundary text chunker.
//!
//! Splits raw document text into [`TextChunk`]s that aim for a `max_len`
//! character target. Splitting only happens between paragraphs, never
//! inside one, so the target is soft: a single paragraph longer than
//! `max_len` becomes its own oversized chunk.
//!
//! # Algorithm
//!
//! 1. Remove every `\r`.
//! 2. Split on paragraph breaks: a newline, optional whitespace, and at
//!    least one more newline.
//! 3. Accumulate paragraphs into a buffer joined by `"\n\n"`.
//! 4. When appending the next paragraph would push a non-empty buffer past
//!    `max_len`, flush the buffer and start a new one with that paragraph.
//! 5. Flush whatever remains. Every chunk is trimmed; empty ones are dropped.
//!
//! Ids are 1-based and follow emission order.
//!
//! # Example
//!
//! ```rust
//! use askdoc_core::chunk::chunk_text;
//!
//! let chunks = chunk_text("Article 1.\n\nArticle 2.", 1200);
//! assert_eq!(chunks.len(), 1);
//! assert_eq!(chunks[0].id, 1);
//! assert_eq!(chunks[0].text, "Article 1.\n\nArticle 2.");
//! ```

use crate::models::TextChunk;

/// Default chunk length target, in characters.
pub const DEFAULT_MAX_CHUNK_CHARS: usize = 1200;

const PARAGRAPH_JOIN: &str = "\n\n";

/// Split `raw` into paragraph-aligned chunks of roughly `max_len` characters.
///
/// Lengths are counted in `char`s, not bytes. Whitespace-only paragraphs
/// are dropped before any length accounting, so they neither count toward
/// a chunk's length nor force a flush.
pub fn chunk_text(raw: &str, max_len: usize) -> Vec<TextChunk> {
    let text = raw.replace('\r', "");
    let join_chars = PARAGRAPH_JOIN.chars().count();

    let mut chunks = Vec::new();
    let mut buf = String::new();
    let mut buf_chars = 0usize;

    for para in Paragraphs::new(&text) {
        if para.trim().is_empty() {
            continue;
        }
        let para_chars = para.chars().count();
        let candidate_chars = if buf.is_empty() {
            para_chars
        } else {
            buf_chars + join_chars + para_chars
        };

        if candidate_chars > max_len && !buf.is_empty() {
            flush(&mut chunks, &buf);
            buf.clear();
            buf.push_str(para);
            buf_chars = para_chars;
        } else {
            if !buf.is_empty() {
                buf.push_str(PARAGRAPH_JOIN);
            }
            buf.push_str(para);
            buf_chars = candidate_chars;
        }
    }

    flush(&mut chunks, &buf);
    chunks
}

fn flush(chunks: &mut Vec<TextChunk>, buf: &str) {
    let text = buf.trim();
    if text.is_empty() {
        return;
    }
    let id = chunks.len() as u32 + 1;
    chunks.push(TextChunk {
        id,
        text: text.to_string(),
    });
}

/// Iterator over the paragraphs of `\r`-free text.
struct Paragraphs<'a> {
    rest: Option<&'a str>,
}

impl<'a> Paragraphs<'a> {
    fn new(s: &'a str) -> Self {
        Self { rest: Some(s) }
    }
}

impl<'a> Iterator for Paragraphs<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        let s = self.rest?;
        match find_break(s) {
            Some((start, end)) => {
                self.rest = Some(&s[end..]);
                Some(&s[..start])
            }
            None => {
                self.rest = None;
                Some(s)
            }
        }
    }
}

/// Byte range of the first paragraph break in `s`.
///
/// A break starts at a newline and extends over the following whitespace
/// run up to and including its last newline. A lone newline is not a break.
fn find_break(s: &str) -> Option<(usize, usize)> {
    for (i, c) in s.char_indices() {
        if c != '\n' {
            continue;
        }
        let after = i + 1;
        let mut last_newline = None;
        for (j, w) in s[after..].char_indices() {
            if !w.is_whitespace() {
                break;
            }
            if w == '\n' {
                last_newline = Some(after + j);
            }
        }
        if let Some(end) = last_newline {
            return Some((i, end + 1));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strip_ws(s: &str) -> String {
        s.chars().filter(|c| !c.is_whitespace()).collect()
    }

    #[test]
    fn test_empty_text() {
        assert!(chunk_text("", 1200).is_empty());
    }

    #[test]
    fn test_whitespace_only() {
        assert!(chunk_text("\n\n  \r\n\n\t\n", 1200).is_empty());
    }

    #[test]
    fn test_single_paragraph() {
        let chunks = chunk_text("  Only one paragraph here.  ", 1200);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].id, 1);
        assert_eq!(chunks[0].text, "Only one paragraph here.");
    }

    #[test]
    fn test_paragraphs_merge_under_limit() {
        let chunks = chunk_text("First.\n\nSecond.\n\nThird.", 1200);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "First.\n\nSecond.\n\nThird.");
    }

    #[test]
    fn test_flush_when_limit_exceeded() {
        // "aaaa\n\nbbbb" is 10 chars; limit 9 forces a split.
        let chunks = chunk_text("aaaa\n\nbbbb\n\ncc", 9);
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["aaaa", "bbbb\n\ncc"]);
    }

    #[test]
    fn test_exact_limit_is_not_exceeded() {
        let chunks = chunk_text("aaaa\n\nbbbb", 10);
        assert_eq!(chunks.len(), 1);
    }

    #[test]
    fn test_oversized_paragraph_kept_whole() {
        let long = "x".repeat(50);
        let text = format!("short\n\n{long}\n\ntail");
        let chunks = chunk_text(&text, 10);
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["short", long.as_str(), "tail"]);
    }

    #[test]
    fn test_oversized_first_paragraph_with_empty_buffer() {
        let long = "y".repeat(30);
        let chunks = chunk_text(&long, 10);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, long);
    }

    #[test]
    fn test_carriage_returns_removed() {
        let chunks = chunk_text("Line one\r\n\r\nLine two", 5);
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["Line one", "Line two"]);
    }

    #[test]
    fn test_blank_line_with_spaces_is_a_break() {
        let chunks = chunk_text("alpha\n   \nbeta", 5);
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["alpha", "beta"]);
    }

    #[test]
    fn test_blank_paragraphs_do_not_count_toward_length() {
        let chunks = chunk_text("\t\t\t\n\nbéb\n\n \nb", 11);
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["béb\n\nb"]);
    }

    #[test]
    fn test_single_newline_is_not_a_break() {
        let chunks = chunk_text("line one\nline two", 5);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "line one\nline two");
    }

    #[test]
    fn test_ids_contiguous_from_one() {
        let text = (0..40)
            .map(|i| format!("Paragraph number {i} of the regulation."))
            .collect::<Vec<_>>()
            .join("\n\n");
        let chunks = chunk_text(&text, 100);
        assert!(chunks.len() > 1);
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.id, i as u32 + 1);
        }
    }

    #[test]
    fn test_reconstructs_input_modulo_whitespace() {
        let text = "Title\r\n\r\nArt. 1 Participants must be 18.\n\n\n\nArt. 2 Teams have five members.\n  \nArt. 3 Fees are due on entry.\n";
        let chunks = chunk_text(text, 40);
        let joined: String = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(strip_ws(&joined), strip_ws(text));
    }

    #[test]
    fn test_no_chunk_is_empty_or_untrimmed() {
        let text = "\n\n a \n\n\n b \n\n c \n\n";
        for c in chunk_text(text, 3) {
            assert!(!c.text.is_empty());
            assert_eq!(c.text, c.text.trim());
        }
    }

    #[test]
    fn test_merged_chunks_respect_limit() {
        let text = (0..200)
            .map(|i| "w".repeat(1 + (i * 37) % 400))
            .collect::<Vec<_>>()
            .join("\n\n");
        for c in chunk_text(&text, 1200) {
            let is_single_paragraph = !c.text.contains("\n\n");
            assert!(
                c.text.chars().count() <= 1200 || is_single_paragraph,
                "merged chunk {} exceeds limit",
                c.id
            );
        }
    }

    #[test]
    fn test_length_counts_chars_not_bytes() {
        // Each paragraph is 4 chars but 8 bytes.
        let chunks = chunk_text("éééé\n\nàààà", 10);
        assert_eq!(chunks.len(), 1);
    }

    #[test]
    fn test_deterministic() {
        let text = "Alpha\n\nBeta\n\nGamma\n\nDelta";
        assert_eq!(chunk_text(text, 8), chunk_text(text, 8));
    }

    #[test]
    fn test_paragraphs_iterator() {
        let paras: Vec<&str> = Paragraphs::new("one\n\ntwo\n \n\nthree").collect();
        assert_eq!(paras, vec!["one", "two", "three"]);
    }
}
