use crate::extractor::Article;
use crate::index::ArticleIndex;
use serde::Serialize;

/// An article paired with its similarity to one specific query. Valid only
/// for the query that produced it; never cached.
#[derive(Debug, Clone, Serialize)]
pub struct RetrievalResult {
    #[serde(flatten)]
    pub article: Article,
    pub similarity: f32,
}

/// Cosine similarity, defined as 0.0 when either vector has zero norm or
/// the dimensions disagree.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Rank every indexed article against the query vector and return the top
/// `k` with scores.
///
/// Exact linear scan over all embeddings: at tens to low hundreds of
/// sections this guarantees exact top-k and is not worth replacing with an
/// ANN structure. The sort is stable and descending, so ties keep their
/// original document order and retrieval stays deterministic.
pub fn rank(index: &ArticleIndex, query: &[f32], k: usize) -> Vec<RetrievalResult> {
    if k == 0 || index.is_empty() {
        return Vec::new();
    }

    let mut scored: Vec<(usize, f32)> = index
        .embeddings
        .iter()
        .enumerate()
        .map(|(i, e)| (i, cosine_similarity(query, e)))
        .collect();
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(k);

    scored
        .into_iter()
        .map(|(i, similarity)| RetrievalResult {
            article: index.articles[i].clone(),
            similarity,
        })
        .collect()
}
