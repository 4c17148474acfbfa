pub mod chunking;
pub mod document;
pub mod embeddings;
pub mod error;
pub mod ollama;
pub mod rag;
pub mod search;
pub mod store;
