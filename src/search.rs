use std::cmp::Ordering;
use std::collections::HashMap;

use serde::Serialize;

use crate::embeddings::Embedding;
use crate::store::Chunk;

/// One ranked hit. `score` is the cosine similarity between the query and
/// chunk embeddings, near `[0, 1]` for normalized natural-language vectors.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub file: String,
    pub text: String,
    pub score: f32,
}

impl SearchResult {
    /// The chunk text truncated to at most `max_chars` on a character
    /// boundary, with an ellipsis when cut.
    pub fn snippet(&self, max_chars: usize) -> String {
        if self.text.chars().count() <= max_chars {
            return self.text.clone();
        }
        let cut: String = self.text.chars().take(max_chars).collect();
        format!("{}…", cut.trim_end())
    }
}

struct ScoredChunk<'a> {
    chunk: &'a Chunk,
    score: f32,
    // Insertion position in the index, the tie-break for equal scores.
    ord: usize,
}

/// Rank stored chunks against a query embedding.
///
/// Every chunk is scored by the dot product of the two vectors (equal to
/// cosine similarity, both being unit-normalized), grouped by source file,
/// capped at `top_k_per_doc` best chunks per file, and the survivors merged
/// into one list sorted descending by score. Ties keep index insertion
/// order, so repeated runs over the same index rank identically.
///
/// Callers must guarantee `chunks` and `embeddings` are positionally
/// aligned and `top_k_per_doc > 0`; the engine's `search` validates both.
pub fn rank_chunks(
    chunks: &[Chunk],
    embeddings: &[Embedding],
    query: &Embedding,
    top_k_per_doc: usize,
) -> Vec<SearchResult> {
    let mut by_file: HashMap<&str, Vec<ScoredChunk>> = HashMap::new();
    for (ord, (chunk, embedding)) in chunks.iter().zip(embeddings.iter()).enumerate() {
        by_file.entry(chunk.file.as_str()).or_default().push(ScoredChunk {
            chunk,
            score: query.dot(embedding),
            ord,
        });
    }

    let mut merged: Vec<ScoredChunk> = Vec::new();
    for (_, mut group) in by_file {
        group.sort_by(compare_scored);
        group.truncate(top_k_per_doc);
        merged.extend(group);
    }
    merged.sort_by(compare_scored);

    merged
        .into_iter()
        .map(|s| SearchResult {
            file: s.chunk.file.clone(),
            text: s.chunk.text.clone(),
            score: s.score,
        })
        .collect()
}

/// Descending by score, ascending by insertion order on ties. The explicit
/// `ord` key makes the result deterministic despite the HashMap grouping.
fn compare_scored(a: &ScoredChunk, b: &ScoredChunk) -> Ordering {
    b.score
        .partial_cmp(&a.score)
        .unwrap_or(Ordering::Equal)
        .then(a.ord.cmp(&b.ord))
}
