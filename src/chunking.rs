/// Default chunk budget in bytes, tuned for embedding-model context windows.
pub const DEFAULT_MAX_CHUNK_CHARS: usize = 500;

/// Split text into chunks of at most `max_chars` bytes without breaking
/// sentences.
///
/// Sentences are accumulated greedily: when appending the next sentence
/// (plus a joining space) would push the running chunk past `max_chars`,
/// the chunk is flushed and the sentence starts a new one. A single
/// sentence longer than `max_chars` becomes its own oversized chunk —
/// sentences are never split internally. Empty input yields no chunks.
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut buffer = String::new();

    for sentence in split_sentences(text) {
        if !buffer.is_empty() && buffer.len() + 1 + sentence.len() > max_chars {
            chunks.push(std::mem::take(&mut buffer));
        }
        if !buffer.is_empty() {
            buffer.push(' ');
        }
        buffer.push_str(sentence);
    }

    if !buffer.is_empty() {
        chunks.push(buffer);
    }

    chunks
}

/// Split text into sentences.
///
/// A sentence ends at `.`, `!` or `?` immediately followed by whitespace;
/// the trailing whitespace is consumed. Text without terminal punctuation
/// counts as one sentence. Whitespace-only segments are dropped.
fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;

    let mut chars = text.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if matches!(c, '.' | '!' | '?') {
            if let Some(&(_, next)) = chars.peek() {
                if next.is_whitespace() {
                    let sentence = text[start..=i].trim();
                    if !sentence.is_empty() {
                        sentences.push(sentence);
                    }
                    start = i + 1;
                }
            }
        }
    }

    let tail = text[start..].trim();
    if !tail.is_empty() {
        sentences.push(tail);
    }

    sentences
}
