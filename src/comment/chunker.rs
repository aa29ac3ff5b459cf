//! `CommentChunker`: splits a rendered report into pieces no larger than a
//! platform's maximum comment size while keeping fenced code blocks and
//! `<details>` blocks well-formed.

/// Emitted when a finalized non-terminal chunk is produced.
pub const SPLIT_WARNING: &str =
    "\n\n---\n_Output length greater than maximum allowed comment size. Continued in next comment._\n";

/// Incrementally accumulates a markdown document, finalizing a chunk
/// whenever appending more would exceed the budget. The caller is expected
/// to call [`Chunker::try_push`] before every logical unit (app header,
/// nested summary, closing tag) so a chunk boundary never lands mid-tag.
///
/// Every chunk past the first is posted by the VCS adapter with a
/// continuation header prepended (referencing the previous comment via
/// `prLinkTemplate`); the chunker never renders that header itself, but it
/// must reserve room for it so the adapter's prepended chunk still fits
/// under `max_len` once posted. `continuation_header_len` carries that
/// reservation; it is zero for a chunker with no continuation header.
pub struct Chunker {
    max_len: usize,
    continuation_header_len: usize,
    chunks: Vec<String>,
    current: String,
}

impl Chunker {
    #[must_use]
    pub fn new(max_len: usize) -> Self {
        Self {
            max_len,
            continuation_header_len: 0,
            chunks: Vec::new(),
            current: String::new(),
        }
    }

    /// Reserve `len` characters out of `max_len` for every chunk but the
    /// first, matching the continuation header the VCS adapter prepends
    /// when it posts or edits a non-first chunk.
    #[must_use]
    pub fn with_continuation_header_len(mut self, len: usize) -> Self {
        self.continuation_header_len = len;
        self
    }

    /// The effective budget for the chunk currently being built: full
    /// `max_len` for the first chunk, `max_len` minus the continuation
    /// header reservation for every chunk after it.
    #[must_use]
    fn effective_max_len(&self) -> usize {
        if self.chunks.is_empty() {
            self.max_len
        } else {
            self.max_len.saturating_sub(self.continuation_header_len)
        }
    }

    #[must_use]
    pub fn current_len(&self) -> usize {
        self.current.chars().count()
    }

    #[must_use]
    pub fn remaining(&self) -> usize {
        self.effective_max_len().saturating_sub(self.current_len())
    }

    /// `true` if appending `s` to the current chunk would exceed its
    /// effective budget.
    #[must_use]
    pub fn would_overflow(&self, s: &str) -> bool {
        self.current_len() + s.chars().count() > self.effective_max_len()
    }

    /// Append `s` unconditionally (caller has already checked budget, or the
    /// content is itself chunk-splittable and being fed piece by piece).
    pub fn push_raw(&mut self, s: &str) {
        self.current.push_str(s);
    }

    /// Append `s` if it fits; otherwise finalize the current chunk first
    /// (with the split-warning footer) and start a fresh one with `s`.
    pub fn try_push(&mut self, s: &str) {
        if self.current.is_empty() || !self.would_overflow(s) {
            self.current.push_str(s);
            return;
        }
        self.finalize_with_warning();
        self.current.push_str(s);
    }

    fn finalize_with_warning(&mut self) {
        let warning = if self.current_len() + SPLIT_WARNING.chars().count() <= self.effective_max_len() {
            SPLIT_WARNING
        } else {
            // Even the warning doesn't fit: truncate it to what's left,
            // acceptable degradation.
            let remaining = self.remaining();
            let truncated: String = SPLIT_WARNING.chars().take(remaining).collect();
            self.current.push_str(&truncated);
            self.chunks.push(std::mem::take(&mut self.current));
            return;
        };
        self.current.push_str(warning);
        self.chunks.push(std::mem::take(&mut self.current));
    }

    /// Finalize the in-progress chunk (no split warning — this is the last
    /// one) and return every chunk produced so far.
    #[must_use]
    pub fn finish(mut self) -> Vec<String> {
        if !self.current.is_empty() || self.chunks.is_empty() {
            self.chunks.push(self.current);
        }
        self.chunks
    }
}

/// Split `content` (the body of one nested `<details>` block) so that no
/// piece added to the chunker would overflow it, while keeping any fenced
/// ```` ``` ```` code block balanced across the split.
///
/// Returns a list of `(piece, reopened_language)` where `reopened_language`
/// is `Some(lang)` when the piece ends mid-fence and the *next* piece must
/// re-open with `` ```<lang> `` to keep the block well-formed.
pub fn split_content_preserving_code_blocks(content: &str, max_piece_len: usize) -> Vec<String> {
    if content.chars().count() <= max_piece_len {
        return vec![content.to_string()];
    }

    let mut pieces = Vec::new();
    let mut chars: Vec<char> = content.chars().collect();
    let mut pending_lang: Option<String> = None;

    while !chars.is_empty() {
        let mut take = max_piece_len.min(chars.len());
        // Reserve room for a closing ``` if we're about to split inside a
        // fence and the opener needs to be carried into the next piece.
        let prefix: String = if let Some(lang) = &pending_lang {
            format!("```{lang}\n")
        } else {
            String::new()
        };
        let budget = max_piece_len.saturating_sub(prefix.chars().count());
        take = take.min(budget.max(1));

        let piece_chars: String = chars[..take].iter().collect();
        let mut piece = format!("{prefix}{piece_chars}");

        let fence_count = piece.matches("```").count();
        let remaining: Vec<char> = chars[take..].to_vec();

        if fence_count % 2 == 1 {
            // Odd number of fences: this piece opens a block it doesn't
            // close. Close it here and carry the language into the next
            // piece's reopened fence.
            let lang = last_fence_language(&piece).unwrap_or_default();
            piece.push_str("\n```");
            pending_lang = if remaining.is_empty() { None } else { Some(lang) };
        } else {
            pending_lang = None;
        }

        pieces.push(piece);
        chars = remaining;
    }

    pieces
}

/// Language tag on the last unmatched ` ``` ` opener in `s`, if any.
fn last_fence_language(s: &str) -> Option<String> {
    let idx = s.rfind("```")?;
    let rest = &s[idx + 3..];
    let lang: String = rest.chars().take_while(|c| !c.is_whitespace()).collect();
    if lang.is_empty() {
        None
    } else {
        Some(lang)
    }
}

/// Count of fenced-code-block markers (` ``` `) in `s`. Used by tests/
/// invariant checks to assert balance across a reassembled document.
#[must_use]
pub fn fence_count(s: &str) -> usize {
    s.matches("```").count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn try_push_finalizes_on_overflow() {
        let mut c = Chunker::new(20);
        c.try_push("0123456789");
        c.try_push("abcdefghij"); // fits exactly to 20
        assert_eq!(c.current_len(), 20);
        c.try_push("overflow-this-chunk");
        let chunks = c.finish();
        assert!(chunks.len() >= 2);
        for chunk in &chunks[..chunks.len() - 1] {
            assert!(chunk.contains("Continued in next comment"));
        }
    }

    #[test]
    fn non_first_chunks_leave_room_for_continuation_header() {
        const HEADER_LEN: usize = 15;
        let mut c = Chunker::new(50).with_continuation_header_len(HEADER_LEN);
        for i in 0..40 {
            c.try_push(&format!("line-{i}-"));
        }
        let chunks = c.finish();
        assert!(chunks.len() > 1, "test needs at least one continuation chunk");
        for (i, chunk) in chunks.iter().enumerate() {
            let budget = if i == 0 { 50 } else { 50 - HEADER_LEN };
            assert!(
                chunk.chars().count() + if i == 0 { 0 } else { HEADER_LEN } <= 50,
                "chunk {i} plus continuation header would exceed 50: {chunk:?}"
            );
            assert!(chunk.chars().count() <= budget, "chunk {i} exceeds its own budget: {chunk:?}");
        }
    }

    #[test]
    fn no_chunk_exceeds_max_len() {
        let mut c = Chunker::new(50);
        for i in 0..40 {
            c.try_push(&format!("line-{i}-"));
        }
        for chunk in c.finish() {
            assert!(chunk.chars().count() <= 50, "chunk too long: {chunk:?}");
        }
    }

    #[test]
    fn split_preserves_short_content_as_is() {
        let pieces = split_content_preserving_code_blocks("short", 100);
        assert_eq!(pieces, vec!["short".to_string()]);
    }

    #[test]
    fn split_closes_and_reopens_fenced_block() {
        let mut body = "```diff\n".to_string();
        for i in 0..200 {
            body.push_str(&format!("+line {i}\n"));
        }
        body.push_str("```\n");

        let pieces = split_content_preserving_code_blocks(&body, 500);
        assert!(pieces.len() > 1);
        for piece in &pieces {
            assert_eq!(
                fence_count(piece) % 2,
                0,
                "piece has unbalanced fences: {piece:?}"
            );
        }
        // Every interior piece after the first should have reopened with the
        // diff language tag.
        assert!(pieces[1].starts_with("```diff\n"));
    }
}
