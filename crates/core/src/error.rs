use thiserror::Error;

/// Failure taxonomy for the retrieval core.
///
/// Retrieval failures (`Embedding`) and generation failures (`Backend`) are
/// separate variants so a caller can tell "couldn't find relevant material"
/// apart from "found material but couldn't generate an answer".
/// Classification failure is deliberately absent: the classifier always
/// degrades to its deterministic fallback instead of erroring.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Source document unreadable or not decodable text. Fatal, no retry.
    #[error("document parse failed: {0}")]
    Parse(String),
    /// Persisted index present but corrupt, wrong format version, or built
    /// with a different embedding model. Fatal unless a rebuild was
    /// explicitly requested.
    #[error("index load failed: {0}")]
    IndexLoad(String),
    /// Writing the index artifact to disk failed.
    #[error("index persist failed: {0}")]
    IndexPersist(String),
    /// Embedding computation failed. Aborts an index build outright;
    /// surfaced as a retrieval failure at query time.
    #[error("embedding failed: {0}")]
    Embedding(String),
    /// Generative backend call failed or timed out after retries.
    /// Recoverable by retry at the caller's discretion.
    #[error("backend call failed: {0}")]
    Backend(String),
}
