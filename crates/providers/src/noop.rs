use crate::{EmbedResponse, EmbeddingProvider, GenerativeProvider, ProviderError};

#[derive(Debug, Default)]
pub struct NoopProvider;

#[async_trait::async_trait]
impl EmbeddingProvider for NoopProvider {
    async fn embed(&self, texts: &[String]) -> Result<EmbedResponse, ProviderError> {
        Ok(EmbedResponse {
            vectors: vec![vec![]; texts.len()],
        })
    }
}

#[async_trait::async_trait]
impl GenerativeProvider for NoopProvider {
    async fn generate(&self, _prompt: &str, _model: &str) -> Result<String, ProviderError> {
        Err(ProviderError::NotImplemented)
    }
}
