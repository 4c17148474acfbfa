use std::io::{self, Write};

use log::{info, warn};

use crate::chunking::{chunk_text, DEFAULT_MAX_CHUNK_CHARS};
use crate::document::Document;
use crate::embeddings::{Embedder, Embedding};
use crate::error::{RagError, Result};
use crate::ollama::Generator;
use crate::search::{rank_chunks, SearchResult};
use crate::store::{Chunk, VectorStore};

/// A document the pipeline could not index, with the reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedDocument {
    pub file: String,
    pub reason: String,
}

/// Outcome of one indexing run. Per-document problems land here instead of
/// aborting the batch.
#[derive(Debug, Default)]
pub struct IndexingReport {
    pub documents_total: usize,
    pub skipped: Vec<SkippedDocument>,
    pub chunks_indexed: usize,
}

impl IndexingReport {
    pub fn documents_indexed(&self) -> usize {
        self.documents_total - self.skipped.len()
    }

    fn skip(&mut self, file: &str, reason: impl Into<String>) {
        let reason = reason.into();
        warn!("Skipping {}: {}", file, reason);
        self.skipped.push(SkippedDocument {
            file: file.to_string(),
            reason,
        });
    }
}

/// RAG (Retrieval-Augmented Generation) engine.
///
/// Owns the vector store and a model collaborator providing both embedding
/// and generation, and ties the chunker, store and search together into the
/// indexing and question-answering flows.
pub struct RagEngine<M> {
    store: VectorStore,
    model: M,
    max_chunk_chars: usize,
}

impl<M: Embedder + Generator> RagEngine<M> {
    pub fn new(store: VectorStore, model: M) -> Self {
        RagEngine {
            store,
            model,
            max_chunk_chars: DEFAULT_MAX_CHUNK_CHARS,
        }
    }

    pub fn with_chunk_size(mut self, max_chunk_chars: usize) -> Self {
        self.max_chunk_chars = max_chunk_chars;
        self
    }

    pub fn store(&self) -> &VectorStore {
        &self.store
    }

    /// Index a batch of documents, replacing any prior index.
    ///
    /// Documents with no extractable text, and documents whose chunks fail
    /// to embed, are recorded as skipped while the rest of the batch
    /// proceeds. The whole batch is persisted with a single atomic save at
    /// the end, so a failure partway through embedding never leaves a
    /// half-written index. A batch that produced no chunks at all is not
    /// persisted; an existing index survives it.
    pub async fn index_documents(&self, documents: &[Document]) -> Result<IndexingReport> {
        let mut report = IndexingReport {
            documents_total: documents.len(),
            ..Default::default()
        };
        let mut chunks: Vec<Chunk> = Vec::new();
        let mut embeddings: Vec<Embedding> = Vec::new();

        for document in documents {
            if document.text.trim().is_empty() {
                report.skip(&document.name, "no text could be extracted");
                continue;
            }

            let texts = chunk_text(&document.text, self.max_chunk_chars);
            info!("Split {} into {} chunks", document.name, texts.len());

            // Embed into a side buffer first so a mid-document failure
            // cannot contaminate the pending batch.
            let mut document_embeddings = Vec::with_capacity(texts.len());
            let mut failure = None;
            for text in &texts {
                match self.model.embed(text).await {
                    Ok(embedding) => document_embeddings.push(embedding),
                    Err(e) => {
                        failure = Some(e);
                        break;
                    }
                }
            }
            if let Some(e) = failure {
                report.skip(&document.name, format!("embedding failed: {}", e));
                continue;
            }

            chunks.extend(texts.into_iter().map(|text| Chunk {
                file: document.name.clone(),
                text,
            }));
            embeddings.append(&mut document_embeddings);
        }

        if chunks.is_empty() {
            warn!("Batch produced no chunks; index left unchanged");
            return Ok(report);
        }

        self.store.save(&chunks, &embeddings)?;
        report.chunks_indexed = chunks.len();
        info!(
            "Indexed {} documents ({} chunks), {} skipped",
            report.documents_indexed(),
            report.chunks_indexed,
            report.skipped.len()
        );
        Ok(report)
    }

    /// Search the index for the chunks most relevant to `query`, keeping at
    /// most `top_k_per_doc` chunks from any single document.
    ///
    /// A missing or empty index is a normal pre-ingestion state and yields
    /// an empty result; a corrupt index still fails, since recovering from
    /// that requires re-indexing and silence would mask it.
    pub async fn search(&self, query: &str, top_k_per_doc: usize) -> Result<Vec<SearchResult>> {
        if top_k_per_doc == 0 {
            return Err(RagError::InvalidArgument(
                "top_k_per_doc must be positive".to_string(),
            ));
        }

        let (chunks, embeddings) = match self.store.load() {
            Ok(index) => index,
            Err(RagError::IndexNotFound) => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };
        if chunks.is_empty() {
            return Ok(Vec::new());
        }

        let query_embedding = self.model.embed(query).await?;
        let stored_dim = embeddings[0].dim();
        if query_embedding.dim() != stored_dim {
            // Typically the embedding model changed between indexing and
            // querying; re-indexing is the remedy.
            return Err(RagError::DimensionMismatch {
                expected: stored_dim,
                actual: query_embedding.dim(),
            });
        }

        Ok(rank_chunks(&chunks, &embeddings, &query_embedding, top_k_per_doc))
    }

    /// Build the answer prompt from the retrieved chunks and generate the
    /// answer. The generated text is returned verbatim.
    pub async fn answer(&self, question: &str, results: &[SearchResult]) -> Result<String> {
        let context = results
            .iter()
            .map(|r| r.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        self.model.generate(&build_prompt(question, &context)).await
    }

    /// Summarize the whole indexed corpus.
    ///
    /// Fails with `IndexNotFound` when nothing has been indexed yet; the
    /// caller turns that into guidance to index first.
    pub async fn summarize(&self) -> Result<String> {
        let (chunks, _) = self.store.load()?;
        let combined = chunks
            .iter()
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        self.model
            .generate(&build_prompt("Summarize all documents", &combined))
            .await
    }

    /// Interactive question loop on stdin. Type `exit` to quit.
    pub async fn run_query_loop(&self, top_k_per_doc: usize) -> Result<()> {
        println!("Ready to answer questions about the indexed documents. Type 'exit' to quit.");

        let stdin = io::stdin();
        let mut stdout = io::stdout();
        let mut buffer = String::new();

        loop {
            print!("\nYour question: ");
            stdout.flush()?;

            buffer.clear();
            if stdin.read_line(&mut buffer)? == 0 {
                break;
            }

            let question = buffer.trim();
            if question.is_empty() {
                continue;
            }
            if question.eq_ignore_ascii_case("exit") {
                println!("Goodbye!");
                break;
            }

            let results = self.search(question, top_k_per_doc).await?;
            if results.is_empty() {
                println!("No relevant information found.");
                continue;
            }

            let answer = self.answer(question, &results).await?;
            println!("\n{}\n", answer);
            println!("Sources:");
            for result in &results {
                println!(
                    "  {} ({:.1}%): {}",
                    result.file,
                    result.score * 100.0,
                    result.snippet(80)
                );
            }
        }

        Ok(())
    }
}

/// The analyst prompt the original tool used for both answering and
/// summarizing.
fn build_prompt(question: &str, context: &str) -> String {
    format!(
        "You are an AI assistant analyzing multiple research papers or documents.\n\
         Context from the documents:\n{}\n\n\
         Question: {}\n\
         Answer concisely and intelligently, extracting relevant info from each document. \
         Provide a structured, readable format.",
        context, question
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Deterministic model: embeds by keyword lookup, records every prompt
    /// it is asked to complete.
    struct MockModel {
        fail_embedding: bool,
        prompts: Mutex<Vec<String>>,
    }

    impl MockModel {
        fn new() -> Self {
            MockModel {
                fail_embedding: false,
                prompts: Mutex::new(Vec::new()),
            }
        }

        fn failing() -> Self {
            MockModel {
                fail_embedding: true,
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Embedder for MockModel {
        async fn embed(&self, text: &str) -> Result<Embedding> {
            if self.fail_embedding {
                return Err(RagError::Model("mock embedder offline".to_string()));
            }
            let values = if text.contains("cat") {
                vec![1.0, 0.0]
            } else if text.contains("dog") {
                vec![0.0, 1.0]
            } else {
                vec![0.6, 0.8]
            };
            Ok(Embedding::new(values))
        }
    }

    #[async_trait]
    impl Generator for MockModel {
        async fn generate(&self, prompt: &str) -> Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok("generated answer".to_string())
        }
    }

    fn engine(dir: &TempDir, model: MockModel) -> RagEngine<MockModel> {
        RagEngine::new(VectorStore::new(dir.path()), model)
    }

    #[tokio::test]
    async fn empty_document_is_skipped_and_the_rest_indexed() {
        let dir = TempDir::new().unwrap();
        let engine = engine(&dir, MockModel::new());

        let documents = vec![
            Document::new("empty.pdf", "   "),
            Document::new("good.pdf", "Cats purr. Dogs bark."),
        ];
        let report = engine.index_documents(&documents).await.unwrap();

        assert_eq!(report.documents_total, 2);
        assert_eq!(report.documents_indexed(), 1);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].file, "empty.pdf");
        assert_eq!(report.chunks_indexed, 1);

        let (chunks, _) = engine.store().load().unwrap();
        assert!(chunks.iter().all(|c| c.file == "good.pdf"));
    }

    #[tokio::test]
    async fn embedding_failure_skips_the_document_without_writing() {
        let dir = TempDir::new().unwrap();
        let engine = engine(&dir, MockModel::failing());

        let documents = vec![Document::new("doc.pdf", "Some sentence.")];
        let report = engine.index_documents(&documents).await.unwrap();

        assert_eq!(report.documents_indexed(), 0);
        assert!(report.skipped[0].reason.contains("embedding failed"));
        assert!(!engine.store().exists());
    }

    #[tokio::test]
    async fn empty_batch_leaves_existing_index_alone() {
        let dir = TempDir::new().unwrap();
        let engine = engine(&dir, MockModel::new());

        let good = vec![Document::new("good.pdf", "Cats purr.")];
        engine.index_documents(&good).await.unwrap();

        let bad = vec![Document::new("blank.pdf", "")];
        let report = engine.index_documents(&bad).await.unwrap();
        assert_eq!(report.chunks_indexed, 0);

        let (chunks, _) = engine.store().load().unwrap();
        assert_eq!(chunks.len(), 1);
    }

    #[tokio::test]
    async fn search_on_missing_index_returns_no_results() {
        let dir = TempDir::new().unwrap();
        let engine = engine(&dir, MockModel::new());
        let results = engine.search("anything", 2).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn search_rejects_zero_top_k() {
        let dir = TempDir::new().unwrap();
        let engine = engine(&dir, MockModel::new());
        assert!(matches!(
            engine.search("anything", 0).await,
            Err(RagError::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn search_caps_results_per_document() {
        let dir = TempDir::new().unwrap();
        // Small budget so each sentence becomes its own chunk.
        let engine = engine(&dir, MockModel::new()).with_chunk_size(15);

        let documents = vec![
            Document::new("a.txt", "The cat sat. Another cat ran. A dog slept."),
            Document::new("b.txt", "Cats are great."),
        ];
        engine.index_documents(&documents).await.unwrap();

        let results = engine.search("cat", 1).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].file, "a.txt");
        assert_eq!(results[0].text, "The cat sat.");
        assert_eq!(results[1].file, "b.txt");
        assert!(results[0].score >= results[1].score);
    }

    #[tokio::test]
    async fn query_dimension_mismatch_is_reported() {
        let dir = TempDir::new().unwrap();
        let store = VectorStore::new(dir.path());
        store
            .save(
                &[Chunk {
                    file: "a.txt".into(),
                    text: "three dims".into(),
                }],
                &[Embedding::new(vec![1.0, 0.0, 0.0])],
            )
            .unwrap();

        let engine = RagEngine::new(store, MockModel::new());
        assert!(matches!(
            engine.search("cat", 1).await,
            Err(RagError::DimensionMismatch {
                expected: 3,
                actual: 2
            })
        ));
    }

    #[tokio::test]
    async fn answer_prompt_contains_question_and_every_chunk() {
        let dir = TempDir::new().unwrap();
        let engine = engine(&dir, MockModel::new());

        let results = vec![
            SearchResult {
                file: "a.txt".into(),
                text: "cats purr".into(),
                score: 0.9,
            },
            SearchResult {
                file: "b.txt".into(),
                text: "dogs bark".into(),
                score: 0.5,
            },
        ];
        let answer = engine.answer("What do pets do?", &results).await.unwrap();
        assert_eq!(answer, "generated answer");

        let prompts = engine.model.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("What do pets do?"));
        assert!(prompts[0].contains("cats purr"));
        assert!(prompts[0].contains("dogs bark"));
    }

    #[tokio::test]
    async fn summarize_without_index_fails_with_not_found() {
        let dir = TempDir::new().unwrap();
        let engine = engine(&dir, MockModel::new());
        assert!(matches!(
            engine.summarize().await,
            Err(RagError::IndexNotFound)
        ));
    }

    #[tokio::test]
    async fn summarize_feeds_the_whole_corpus_to_the_model() {
        let dir = TempDir::new().unwrap();
        let engine = engine(&dir, MockModel::new());

        let documents = vec![Document::new("a.txt", "Cats purr. Dogs bark.")];
        engine.index_documents(&documents).await.unwrap();

        engine.summarize().await.unwrap();
        let prompts = engine.model.prompts.lock().unwrap();
        assert!(prompts[0].contains("Summarize all documents"));
        assert!(prompts[0].contains("Cats purr."));
    }
}
