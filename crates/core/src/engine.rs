use crate::classifier::{self, Classification};
use crate::config::AppConfig;
use crate::error::CoreError;
use crate::retriever::{self, RetrievalResult};
use crate::router::{self, ArticleRef, RoutedAnswer};
use crate::{document, extractor, index, taxonomy::Taxonomy};
use providers::noop::NoopProvider;
use providers::openai::{OpenAiConfig, OpenAiProvider};
use providers::{GenerativeProvider, ModelTier, ProviderRegistry};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

const RETRY_BASE_DELAY: Duration = Duration::from_millis(500);

/// The retrieval-and-routing engine. Owns the immutable article index for
/// the process lifetime: the index is built (or loaded) to completion in
/// [`RulesQa::init`] before any query runs, and every query method takes
/// `&self`, so concurrent queries share it without locking.
pub struct RulesQa {
    cfg: AppConfig,
    registry: ProviderRegistry,
    index: index::ArticleIndex,
}

impl RulesQa {
    pub async fn init(cfg: AppConfig, registry: ProviderRegistry) -> Result<Self, CoreError> {
        Self::init_with_rebuild(cfg, registry, false).await
    }

    /// Like [`RulesQa::init`], but `rebuild = true` discards any persisted
    /// index and recomputes it from the source document.
    pub async fn init_with_rebuild(
        cfg: AppConfig,
        registry: ProviderRegistry,
        rebuild: bool,
    ) -> Result<Self, CoreError> {
        let text = document::load_document(Path::new(&cfg.document.path))?;
        let mut articles = extractor::extract_articles(&text, cfg.document.duplicates);
        info!(articles = articles.len(), "document parsed");

        let taxonomy = match &cfg.taxonomy.path {
            Some(p) => Taxonomy::load(&PathBuf::from(p))
                .map_err(|e| CoreError::Parse(format!("taxonomy {p}: {e}")))?,
            None => Taxonomy::default(),
        };
        taxonomy.tag(&mut articles);

        let provider = registry
            .embedding(Some(&cfg.embeddings.provider))
            .map_err(|e| CoreError::Embedding(e.to_string()))?;
        let (index, built) = index::load_or_build(
            Path::new(&cfg.index.path),
            articles,
            provider.as_ref(),
            &cfg.embeddings.model,
            cfg.embeddings.batch_size,
            rebuild,
        )
        .await?;
        info!(articles = index.len(), built, "index ready");

        Ok(Self {
            cfg,
            registry,
            index,
        })
    }

    pub fn article_count(&self) -> usize {
        self.index.len()
    }

    pub fn index_path(&self) -> &str {
        &self.cfg.index.path
    }

    /// Top-`k` articles by cosine similarity to the query.
    pub async fn retrieve(
        &self,
        query: &str,
        k: usize,
    ) -> Result<Vec<RetrievalResult>, CoreError> {
        if k == 0 || self.index.is_empty() {
            return Ok(Vec::new());
        }
        let vector = self.embed_query(query).await?;
        Ok(retriever::rank(&self.index, &vector, k))
    }

    /// Advisory classification of the query. Degrades to the deterministic
    /// fallback when no generator is configured or the call fails.
    pub async fn classify(&self, query: &str) -> Classification {
        match self.registry.generator(None) {
            Ok(provider) => {
                classifier::classify(query, provider.as_ref(), &self.cfg.routing.fast_model).await
            }
            Err(_) => classifier::fallback(query),
        }
    }

    /// Retrieve, route, and answer. `force_deep` always selects the deep
    /// tier; otherwise the classifier (when enabled) may upgrade a complex
    /// query, and everything else takes the fast tier.
    pub async fn answer(&self, query: &str, force_deep: bool) -> Result<RoutedAnswer, CoreError> {
        let results = self.retrieve(query, self.cfg.index.top_k).await?;

        let classification = if self.cfg.routing.classify {
            Some(self.classify(query).await)
        } else {
            None
        };

        let tier = router::select_tier(force_deep, classification.as_ref());
        let model = match tier {
            ModelTier::Fast => self.cfg.routing.fast_model.clone(),
            ModelTier::Deep => self.cfg.routing.deep_model.clone(),
        };
        info!(tier = tier.label(), model = %model, "routing query");

        let prompt = router::build_prompt(tier, query, &results);
        let generator = self
            .registry
            .generator(None)
            .map_err(|e| CoreError::Backend(e.to_string()))?;
        let answer = generate_with_retry(
            generator.as_ref(),
            &prompt,
            &model,
            Duration::from_secs(self.cfg.routing.timeout_secs),
            self.cfg.routing.retries,
        )
        .await?;

        Ok(RoutedAnswer {
            answer,
            model_used: model,
            tier,
            articles_used: results
                .iter()
                .map(|r| ArticleRef {
                    number: r.article.number,
                    title: r.article.title.clone(),
                    similarity: r.similarity,
                })
                .collect(),
            classification,
        })
    }

    async fn embed_query(&self, query: &str) -> Result<Vec<f32>, CoreError> {
        let provider = self
            .registry
            .embedding(Some(&self.cfg.embeddings.provider))
            .map_err(|e| CoreError::Embedding(e.to_string()))?;
        let texts = vec![query.to_string()];
        let resp = tokio::time::timeout(
            Duration::from_secs(self.cfg.routing.timeout_secs),
            provider.embed(&texts),
        )
        .await
        .map_err(|_| CoreError::Embedding("query embedding timed out".to_string()))?
        .map_err(|e| CoreError::Embedding(e.to_string()))?;
        resp.vectors
            .into_iter()
            .next()
            .ok_or_else(|| CoreError::Embedding("provider returned no vector".to_string()))
    }
}

/// Bounded retry with doubling backoff around a generation call. Timeouts
/// and transient failures are retried; exhaustion surfaces as `Backend`.
async fn generate_with_retry(
    provider: &dyn GenerativeProvider,
    prompt: &str,
    model: &str,
    timeout: Duration,
    retries: u32,
) -> Result<String, CoreError> {
    let mut delay = RETRY_BASE_DELAY;
    let mut last_error = String::new();
    for attempt in 0..=retries {
        match tokio::time::timeout(timeout, provider.generate(prompt, model)).await {
            Ok(Ok(text)) => return Ok(text),
            Ok(Err(e)) => last_error = e.to_string(),
            Err(_) => last_error = format!("timed out after {}s", timeout.as_secs()),
        }
        if attempt < retries {
            warn!(attempt = attempt + 1, error = %last_error, "backend call failed, retrying");
            tokio::time::sleep(delay).await;
            delay *= 2;
        }
    }
    Err(CoreError::Backend(last_error))
}

/// Assemble the provider registry from config and environment. The noop
/// provider is always present; an OpenAI-compatible provider is added when
/// `OPENAI_API_KEY` and `OPENAI_BASE_URL` are both set.
pub fn build_registry(config: &AppConfig) -> ProviderRegistry {
    let mut reg = ProviderRegistry::new()
        .with_embedding("noop", Arc::new(NoopProvider))
        .with_generator("noop", Arc::new(NoopProvider));
    let mut generator = "noop";

    if let (Some(key), Some(base)) = (
        std::env::var_os("OPENAI_API_KEY"),
        std::env::var_os("OPENAI_BASE_URL"),
    ) {
        let provider = OpenAiProvider::new(OpenAiConfig {
            api_key: key.to_string_lossy().into_owned(),
            base_url: base.to_string_lossy().into_owned(),
            embedding_model: config.embeddings.model.clone(),
        });
        reg = reg
            .with_embedding("openai", Arc::new(provider.clone()))
            .with_generator("openai", Arc::new(provider));
        generator = "openai";
    }

    reg.set_preferred_embedding(&config.embeddings.provider)
        .set_preferred_generator(generator)
}
