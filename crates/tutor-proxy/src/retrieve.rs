//! Retrieval request and document types for the upstream proxy.

use serde::{Deserialize, Serialize};

/// A course-material retrieval request (`request_type: retrieve`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[must_use = "requests do nothing unless sent"]
pub struct RetrieveRequest {
    /// The query to retrieve context for.
    pub query: String,

    /// Proxy-side session that holds the indexed course material.
    pub session_id: String,

    /// Minimum similarity for a chunk to be returned.
    pub rag_threshold: f64,

    /// Maximum number of documents to return.
    pub rag_k: u32,
}

impl RetrieveRequest {
    /// Proxy session holding the shared course-material index.
    pub const COURSE_SESSION: &str = "GenericSession";
    /// Default retrieval similarity threshold.
    pub const DEFAULT_THRESHOLD: f64 = 0.4;
    /// Default retrieval result count.
    pub const DEFAULT_K: u32 = 5;

    /// Creates a retrieval request against the shared course-material index.
    pub fn course_material(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            session_id: Self::COURSE_SESSION.to_owned(),
            rag_threshold: Self::DEFAULT_THRESHOLD,
            rag_k: Self::DEFAULT_K,
        }
    }
}

/// A retrieved document: a summary plus the matching chunks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RagDocument {
    /// One-line summary of the source document.
    pub doc_summary: String,

    /// Matching text chunks from the document.
    pub chunks: Vec<String>,
}

impl RagDocument {
    /// Creates a new document with the given summary and chunks.
    pub fn new(doc_summary: impl Into<String>, chunks: Vec<String>) -> Self {
        Self {
            doc_summary: doc_summary.into(),
            chunks,
        }
    }
}

/// Preamble placed before rendered retrieval context.
const CONTEXT_PREAMBLE: &str = "The following is additional context that may be \
helpful in answering the query. Use it only if it is relevant to the user's query.";

/// Renders retrieved documents into the numbered context block appended to
/// the system instruction: `#i` for each document summary, `#i.j` for each
/// of its chunks.
#[must_use]
pub fn render_rag_context(documents: &[RagDocument]) -> String {
    if documents.is_empty() {
        return String::new();
    }

    let mut rendered = String::from(CONTEXT_PREAMBLE);
    for (i, document) in documents.iter().enumerate() {
        rendered.push_str(&format!("\n#{} {}", i + 1, document.doc_summary));
        for (j, chunk) in document.chunks.iter().enumerate() {
            rendered.push_str(&format!("\n#{}.{} {}", i + 1, j + 1, chunk));
        }
    }

    rendered
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn course_material_request_defaults() {
        let request = RetrieveRequest::course_material("how does metrosim work?");

        assert_eq!(request.session_id, RetrieveRequest::COURSE_SESSION);
        assert_eq!(request.rag_threshold, RetrieveRequest::DEFAULT_THRESHOLD);
        assert_eq!(request.rag_k, RetrieveRequest::DEFAULT_K);
    }

    #[test]
    fn empty_context_renders_empty() {
        assert_eq!(render_rag_context(&[]), "");
    }

    #[test]
    fn context_is_numbered_per_document_and_chunk() {
        let documents = vec![
            RagDocument::new("Lab 3 handout", vec!["chunk a".into(), "chunk b".into()]),
            RagDocument::new("Lecture 12 notes", vec!["chunk c".into()]),
        ];

        let rendered = render_rag_context(&documents);
        assert!(rendered.contains("#1 Lab 3 handout"));
        assert!(rendered.contains("#1.2 chunk b"));
        assert!(rendered.contains("#2 Lecture 12 notes"));
        assert!(rendered.contains("#2.1 chunk c"));
    }
}
