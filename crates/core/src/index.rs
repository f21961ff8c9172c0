use crate::error::CoreError;
use crate::extractor::Article;
use providers::EmbeddingProvider;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

/// Bumped whenever the persisted layout changes; a stale artifact then
/// fails to load instead of silently serving mismatched vectors.
pub const INDEX_FORMAT_VERSION: u32 = 1;

/// The in-memory retrieval index: articles and their embeddings, paired
/// positionally. Immutable once built; shared read-only across queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleIndex {
    pub articles: Vec<Article>,
    pub embeddings: Vec<Vec<f32>>,
}

impl ArticleIndex {
    pub fn len(&self) -> usize {
        self.articles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.articles.is_empty()
    }
}

/// On-disk envelope. Carries the format version and the embedding model
/// identifier so a model upgrade invalidates stale caches on load.
#[derive(Serialize, Deserialize)]
struct PersistedIndex {
    version: u32,
    embedding_model: String,
    dimension: usize,
    articles: Vec<Article>,
    embeddings: Vec<Vec<f32>>,
}

/// Embed every article's full text and assemble the index.
///
/// Any embedding failure aborts the whole build; a partially embedded
/// index would silently drop sections from retrieval.
pub async fn build_index(
    articles: Vec<Article>,
    provider: &dyn EmbeddingProvider,
    batch_size: usize,
) -> Result<ArticleIndex, CoreError> {
    let batch_size = batch_size.max(1);
    let mut embeddings: Vec<Vec<f32>> = Vec::with_capacity(articles.len());

    for batch in articles.chunks(batch_size) {
        let texts: Vec<String> = batch.iter().map(|a| a.full_text()).collect();
        let resp = provider
            .embed(&texts)
            .await
            .map_err(|e| CoreError::Embedding(e.to_string()))?;
        if resp.vectors.len() != batch.len() {
            return Err(CoreError::Embedding(format!(
                "provider returned {} vectors for {} texts",
                resp.vectors.len(),
                batch.len()
            )));
        }
        embeddings.extend(resp.vectors);
    }

    info!(articles = articles.len(), "index built");
    Ok(ArticleIndex {
        articles,
        embeddings,
    })
}

pub fn save(index: &ArticleIndex, path: &Path, embedding_model: &str) -> Result<(), CoreError> {
    let persisted = PersistedIndex {
        version: INDEX_FORMAT_VERSION,
        embedding_model: embedding_model.to_string(),
        dimension: index.embeddings.first().map(|v| v.len()).unwrap_or(0),
        articles: index.articles.clone(),
        embeddings: index.embeddings.clone(),
    };
    let json = serde_json::to_string(&persisted)
        .map_err(|e| CoreError::IndexPersist(e.to_string()))?;
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    fs::write(path, json)
        .map_err(|e| CoreError::IndexPersist(format!("{}: {e}", path.display())))?;
    info!(path = %path.display(), "index persisted");
    Ok(())
}

/// Load a persisted index, validating format version, embedding model and
/// the positional pairing. Every failure mode is an `IndexLoad` error;
/// corruption is never silently papered over by rebuilding.
pub fn load(path: &Path, expected_model: &str) -> Result<ArticleIndex, CoreError> {
    let content = fs::read_to_string(path)
        .map_err(|e| CoreError::IndexLoad(format!("{}: {e}", path.display())))?;
    let persisted: PersistedIndex = serde_json::from_str(&content)
        .map_err(|e| CoreError::IndexLoad(format!("corrupt artifact: {e}")))?;

    if persisted.version != INDEX_FORMAT_VERSION {
        return Err(CoreError::IndexLoad(format!(
            "format version {} (expected {})",
            persisted.version, INDEX_FORMAT_VERSION
        )));
    }
    if persisted.embedding_model != expected_model {
        return Err(CoreError::IndexLoad(format!(
            "built with embedding model '{}' but '{}' is configured",
            persisted.embedding_model, expected_model
        )));
    }
    if persisted.articles.len() != persisted.embeddings.len() {
        return Err(CoreError::IndexLoad(format!(
            "{} articles but {} embeddings",
            persisted.articles.len(),
            persisted.embeddings.len()
        )));
    }
    if persisted
        .embeddings
        .iter()
        .any(|v| v.len() != persisted.dimension)
    {
        return Err(CoreError::IndexLoad(
            "embedding dimensions are inconsistent".to_string(),
        ));
    }

    info!(articles = persisted.articles.len(), "index loaded from disk");
    Ok(ArticleIndex {
        articles: persisted.articles,
        embeddings: persisted.embeddings,
    })
}

/// Load the artifact at `path` when present, otherwise build from
/// `articles` and persist. A present-but-unloadable artifact is surfaced
/// as `IndexLoad` unless `rebuild` was explicitly requested.
///
/// Returns the index and whether it was freshly built.
pub async fn load_or_build(
    path: &Path,
    articles: Vec<Article>,
    provider: &dyn EmbeddingProvider,
    embedding_model: &str,
    batch_size: usize,
    rebuild: bool,
) -> Result<(ArticleIndex, bool), CoreError> {
    if !rebuild && path.exists() {
        return Ok((load(path, embedding_model)?, false));
    }
    let index = build_index(articles, provider, batch_size).await?;
    save(&index, path, embedding_model)?;
    Ok((index, true))
}
