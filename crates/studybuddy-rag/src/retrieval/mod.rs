//! Query-side retrieval: embed the query, find the owner's nearest document

use std::sync::Arc;
use uuid::Uuid;

use crate::error::Result;
use crate::providers::EmbeddingGateway;
use crate::storage::VectorStore;
use crate::types::NearestMatch;

/// Prompt content used when the owner has nothing stored
pub const NO_RELEVANT_INFORMATION: &str = "No relevant information found.";

/// Values scoped to one request
///
/// Created per call and never shared, so concurrent requests cannot see
/// each other's query embedding.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: Uuid,
    pub owner_id: String,
    /// Set once the query has been embedded
    pub query_embedding: Option<Vec<f32>>,
}

impl RequestContext {
    pub fn new(owner_id: impl Into<String>) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            owner_id: owner_id.into(),
            query_embedding: None,
        }
    }

    /// Tracing span for an operation on behalf of this request
    pub fn span(&self, operation: &'static str) -> tracing::Span {
        tracing::info_span!(
            "request",
            op = operation,
            request_id = %self.request_id,
            owner_id = %self.owner_id
        )
    }
}

/// What retrieval found for a query
#[derive(Debug, Clone)]
pub struct Retrieved {
    /// Text for the prompt: the match's content, or the fallback marker
    pub content: String,
    pub matched: Option<NearestMatch>,
}

impl Retrieved {
    /// Whether the fallback marker stands in for document content
    pub fn is_fallback(&self) -> bool {
        self.matched.is_none()
    }
}

/// Embeds queries and looks up the owner's nearest stored document
pub struct Retriever {
    gateway: EmbeddingGateway,
    store: Arc<dyn VectorStore>,
    context_max_chars: usize,
}

impl Retriever {
    pub fn new(gateway: EmbeddingGateway, store: Arc<dyn VectorStore>, context_max_chars: usize) -> Self {
        Self {
            gateway,
            store,
            context_max_chars,
        }
    }

    /// Top-1 retrieval scoped to the context's owner
    ///
    /// No stored rows is not an error: the fallback marker is returned.
    pub async fn retrieve(&self, ctx: &mut RequestContext, query: &str) -> Result<Retrieved> {
        let embedding = self.gateway.embed(query).await?;
        let matched = self.store.nearest(&ctx.owner_id, &embedding).await?;
        ctx.query_embedding = Some(embedding);

        let Some(found) = matched else {
            tracing::warn!("No stored documents for owner, using fallback context");
            return Ok(Retrieved {
                content: NO_RELEVANT_INFORMATION.to_string(),
                matched: None,
            });
        };

        tracing::debug!(
            "Nearest document {} at distance {:.4}",
            found.vector.document_id,
            found.distance
        );

        let content = found
            .vector
            .text_content
            .chars()
            .take(self.context_max_chars)
            .collect();

        Ok(Retrieved {
            content,
            matched: Some(found),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::EmbeddingProvider;
    use crate::storage::{Database, SqliteStore};
    use crate::types::StoredVector;
    use async_trait::async_trait;

    /// Embeds by counting two keywords
    struct KeywordEmbedder;

    #[async_trait]
    impl EmbeddingProvider for KeywordEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            let text = text.to_lowercase();
            Ok(vec![
                text.matches("cell").count() as f32 + 0.01,
                text.matches("planet").count() as f32 + 0.01,
            ])
        }
        fn model(&self) -> &str {
            "keywords"
        }
        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }
        fn name(&self) -> &str {
            "keywords"
        }
    }

    fn retriever(max_chars: usize) -> (Arc<SqliteStore>, Retriever) {
        let store = Arc::new(SqliteStore::new(Database::in_memory().unwrap()));
        let gateway = EmbeddingGateway::new(Arc::new(KeywordEmbedder), 2);
        (store.clone(), Retriever::new(gateway, store, max_chars))
    }

    #[tokio::test]
    async fn test_empty_owner_gets_fallback_marker() {
        let (_, retriever) = retriever(100);
        let mut ctx = RequestContext::new("u1");

        let retrieved = retriever.retrieve(&mut ctx, "what is a cell").await.unwrap();
        assert!(retrieved.is_fallback());
        assert_eq!(retrieved.content, NO_RELEVANT_INFORMATION);
        assert!(ctx.query_embedding.is_some());
    }

    #[tokio::test]
    async fn test_picks_nearest_of_own_documents() {
        let (store, retriever) = retriever(1000);
        store
            .put(StoredVector::new("bio", "cell cell membrane", vec![2.01, 0.01], "u1"))
            .await
            .unwrap();
        store
            .put(StoredVector::new("astro", "planet orbits", vec![0.01, 1.01], "u1"))
            .await
            .unwrap();

        let mut ctx = RequestContext::new("u1");
        let retrieved = retriever.retrieve(&mut ctx, "planet").await.unwrap();
        assert_eq!(retrieved.content, "planet orbits");
        assert_eq!(retrieved.matched.unwrap().vector.document_id, "astro");
    }

    #[tokio::test]
    async fn test_content_is_bounded() {
        let (store, retriever) = retriever(4);
        store
            .put(StoredVector::new("bio", "cells everywhere", vec![1.0, 0.0], "u1"))
            .await
            .unwrap();

        let mut ctx = RequestContext::new("u1");
        let retrieved = retriever.retrieve(&mut ctx, "cell").await.unwrap();
        assert_eq!(retrieved.content, "cell");
    }

    #[test]
    fn test_contexts_are_independent() {
        let a = RequestContext::new("u1");
        let b = RequestContext::new("u1");
        assert_ne!(a.request_id, b.request_id);
    }
}
