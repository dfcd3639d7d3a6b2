//! Client configuration.
//!
//! Base URLs for the two remote collaborators: the conversation/profile API
//! and the retrieval-augmented-generation backend that answers questions and
//! ingests documents. Both can be overridden through environment variables
//! for development and self-hosted deployments.

/// Default conversation/profile API base URL.
const DEFAULT_API_URL: &str = "http://localhost:5000/api";

/// Default RAG backend base URL (ask + upload endpoints).
const DEFAULT_RAG_URL: &str = "http://localhost:8000";

/// Remote endpoint configuration.
#[derive(Debug, Clone)]
pub struct Config {
    api_url: String,
    rag_url: String,
}

impl Default for Config {
    fn default() -> Self {
        let api_url =
            std::env::var("POLICYCHAT_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        let rag_url =
            std::env::var("POLICYCHAT_RAG_URL").unwrap_or_else(|_| DEFAULT_RAG_URL.to_string());
        Self { api_url, rag_url }
    }
}

impl Config {
    /// Create a configuration from the environment (or defaults).
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a configuration with explicit base URLs.
    pub fn with_urls(api_url: impl Into<String>, rag_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            rag_url: rag_url.into(),
        }
    }

    /// Full URL for a conversation/profile API endpoint.
    pub fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.api_url, path)
    }

    /// Full URL for a RAG backend endpoint.
    pub fn rag_url(&self, path: &str) -> String {
        format!("{}{}", self.rag_url, path)
    }
}
