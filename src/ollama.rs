use std::env;

use async_trait::async_trait;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::embeddings::{Embedder, Embedding};
use crate::error::{RagError, Result};

const DEFAULT_URL: &str = "http://localhost:11434";
const DEFAULT_EMBEDDING_MODEL: &str = "nomic-embed-text";
const DEFAULT_GENERATION_MODEL: &str = "mistral";

/// Collaborator that turns an assembled prompt into generated text.
///
/// The core's responsibility ends at prompt assembly; the generated answer
/// is passed through verbatim, never parsed.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Configuration for a locally hosted Ollama server.
#[derive(Debug, Clone)]
pub struct OllamaConfig {
    pub url: String,
    pub embedding_model: String,
    pub generation_model: String,
}

impl OllamaConfig {
    /// Create a configuration from environment variables, with defaults for
    /// every value so a stock local install needs no setup.
    pub fn from_env() -> Self {
        OllamaConfig {
            url: env::var("OLLAMA_URL").unwrap_or_else(|_| DEFAULT_URL.to_string()),
            embedding_model: env::var("OLLAMA_EMBEDDING_MODEL")
                .unwrap_or_else(|_| DEFAULT_EMBEDDING_MODEL.to_string()),
            generation_model: env::var("OLLAMA_MODEL")
                .unwrap_or_else(|_| DEFAULT_GENERATION_MODEL.to_string()),
        }
    }
}

/// Client for the Ollama HTTP API.
#[derive(Clone)]
pub struct OllamaClient {
    config: OllamaConfig,
    client: reqwest::Client,
}

impl OllamaClient {
    pub fn new(config: OllamaConfig) -> Self {
        let client = reqwest::Client::new();
        OllamaClient { config, client }
    }

    pub fn config(&self) -> &OllamaConfig {
        &self.config
    }

    /// Probe whether the server answers at all, via the model listing
    /// endpoint. Used to fail fast with a clear message when Ollama is not
    /// running, instead of erroring halfway through a batch.
    pub async fn is_available(&self) -> bool {
        let url = format!("{}/api/tags", self.config.url);
        match self.client.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!("Ollama availability probe failed: {}", e);
                false
            }
        }
    }
}

#[async_trait]
impl Embedder for OllamaClient {
    /// Embed a text via `/api/embeddings`.
    ///
    /// Ollama does not guarantee unit-length vectors, so the result is
    /// L2-normalized here; everything stored in or queried against the
    /// index is therefore a unit vector, which is what lets the search
    /// score with a plain dot product.
    async fn embed(&self, text: &str) -> Result<Embedding> {
        #[derive(Serialize)]
        struct EmbeddingRequest<'a> {
            model: &'a str,
            prompt: &'a str,
        }

        #[derive(Deserialize)]
        struct EmbeddingResponse {
            embedding: Vec<f32>,
        }

        let request = EmbeddingRequest {
            model: &self.config.embedding_model,
            prompt: text,
        };

        let url = format!("{}/api/embeddings", self.config.url);
        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| RagError::Model(format!("embedding request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(RagError::Model(format!(
                "embedding request returned {}: {}",
                status, error_text
            )));
        }

        let data: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| RagError::Model(format!("invalid embedding response: {}", e)))?;

        Ok(Embedding::new(data.embedding).normalized())
    }
}

#[async_trait]
impl Generator for OllamaClient {
    /// Generate text via `/api/generate`, non-streaming, low temperature.
    async fn generate(&self, prompt: &str) -> Result<String> {
        #[derive(Serialize)]
        struct GenerateOptions {
            temperature: f32,
        }

        #[derive(Serialize)]
        struct GenerateRequest<'a> {
            model: &'a str,
            prompt: &'a str,
            stream: bool,
            options: GenerateOptions,
        }

        #[derive(Deserialize)]
        struct GenerateResponse {
            response: String,
        }

        let request = GenerateRequest {
            model: &self.config.generation_model,
            prompt,
            stream: false,
            options: GenerateOptions { temperature: 0.2 },
        };

        let url = format!("{}/api/generate", self.config.url);
        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| RagError::Model(format!("generation request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(RagError::Model(format!(
                "generation request returned {}: {}",
                status, error_text
            )));
        }

        let data: GenerateResponse = response
            .json()
            .await
            .map_err(|e| RagError::Model(format!("invalid generation response: {}", e)))?;

        Ok(data.response.trim().to_string())
    }
}
