use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::embeddings::Embedding;
use crate::error::{RagError, Result};

/// File name of the persisted index snapshot inside the data directory.
pub const INDEX_FILE: &str = "index.json";

/// One indexed span of a document's text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Name of the originating document.
    pub file: String,
    /// The chunk's content.
    pub text: String,
}

/// Persisted form: chunk and vector paired in one record, so the
/// chunk/embedding length-equality invariant holds by construction.
#[derive(Serialize, Deserialize)]
struct IndexEntry {
    file: String,
    text: String,
    embedding: Embedding,
}

/// Summary of the persisted index, all zero when no index exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexStats {
    pub documents: usize,
    pub chunks: usize,
    pub dimensions: usize,
}

/// On-disk vector index: a single JSON snapshot of `(chunk, embedding)`
/// entries, replaced atomically on every save.
pub struct VectorStore {
    path: PathBuf,
}

impl VectorStore {
    /// Create a store rooted at `data_dir`. Nothing is touched on disk
    /// until the first `save`.
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Self {
        VectorStore {
            path: data_dir.as_ref().join(INDEX_FILE),
        }
    }

    /// Location of the snapshot file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether a persisted index exists.
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Replace the persisted index with the given batch.
    ///
    /// The snapshot is written to a temporary sibling file and renamed over
    /// the live one, so concurrent readers observe either the old index or
    /// the new index, never a partial write. On any failure the prior
    /// snapshot is left intact.
    pub fn save(&self, chunks: &[Chunk], embeddings: &[Embedding]) -> Result<()> {
        if chunks.len() != embeddings.len() {
            return Err(RagError::LengthMismatch {
                chunks: chunks.len(),
                embeddings: embeddings.len(),
            });
        }
        if let Some(first) = embeddings.first() {
            for embedding in embeddings {
                if embedding.dim() != first.dim() {
                    return Err(RagError::DimensionMismatch {
                        expected: first.dim(),
                        actual: embedding.dim(),
                    });
                }
            }
        }

        let entries: Vec<IndexEntry> = chunks
            .iter()
            .zip(embeddings.iter())
            .map(|(chunk, embedding)| IndexEntry {
                file: chunk.file.clone(),
                text: chunk.text.clone(),
                embedding: embedding.clone(),
            })
            .collect();
        let payload = serde_json::to_vec(&entries)?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, payload)?;
        fs::rename(&tmp, &self.path)?;

        info!(
            "Persisted {} chunks to {}",
            entries.len(),
            self.path.display()
        );
        Ok(())
    }

    /// Load the persisted index in insertion order.
    pub fn load(&self) -> Result<(Vec<Chunk>, Vec<Embedding>)> {
        let raw = fs::read_to_string(&self.path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                RagError::IndexNotFound
            } else {
                RagError::Io(e)
            }
        })?;

        let entries: Vec<IndexEntry> = serde_json::from_str(&raw)
            .map_err(|e| RagError::CorruptIndex(format!("unreadable snapshot: {}", e)))?;

        if let Some(first) = entries.first() {
            let expected = first.embedding.dim();
            if let Some(bad) = entries.iter().find(|e| e.embedding.dim() != expected) {
                return Err(RagError::CorruptIndex(format!(
                    "non-uniform embedding dimensions: {} and {}",
                    expected,
                    bad.embedding.dim()
                )));
            }
        }

        debug!("Loaded {} chunks from {}", entries.len(), self.path.display());

        Ok(entries
            .into_iter()
            .map(|e| {
                (
                    Chunk {
                        file: e.file,
                        text: e.text,
                    },
                    e.embedding,
                )
            })
            .unzip())
    }

    /// Delete the persisted index. Succeeds if it never existed.
    pub fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                info!("Removed index at {}", self.path.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(RagError::Io(e)),
        }
    }

    /// Counts over the persisted index: distinct documents, chunks, and
    /// embedding width.
    pub fn stats(&self) -> Result<IndexStats> {
        if !self.exists() {
            return Ok(IndexStats {
                documents: 0,
                chunks: 0,
                dimensions: 0,
            });
        }
        let (chunks, embeddings) = self.load()?;
        let documents = chunks
            .iter()
            .map(|c| c.file.as_str())
            .collect::<HashSet<_>>()
            .len();
        Ok(IndexStats {
            documents,
            chunks: chunks.len(),
            dimensions: embeddings.first().map(Embedding::dim).unwrap_or(0),
        })
    }
}
