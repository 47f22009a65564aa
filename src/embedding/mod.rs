//! Embedding generation for semantic search and retrieval.
//!
//! Backends expose embeddings in different call shapes: a dedicated batch
//! method, a dedicated query method, or a single generic callable. Each shape
//! is a capability trait here, and [`EmbeddingAdapter`] resolves them into
//! the canonical [`Embedder`] operations once, when the adapter is built.

mod local;
mod openai;

pub use local::HashingEmbedder;
pub(crate) use local::tokens;
pub use openai::OpenAIEmbedder;

use crate::config::{EmbeddingSettings, ProviderKind};
use crate::error::{Result, VidsageError};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Canonical embedding capability set used by the engine.
pub trait Embedder: Send + Sync {
    /// Embed texts for storage, preserving input order.
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single search query.
    fn embed_one(&self, text: &str) -> Result<Vec<f32>>;

    /// Name of the backing provider.
    fn provider(&self) -> &str;
}

/// Backend with a dedicated batch (document) embedding entry point.
pub trait BatchEmbedding: Send + Sync {
    fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Backend with a dedicated query embedding entry point.
///
/// Asymmetric models embed queries differently from documents, so this is
/// kept apart from [`BatchEmbedding`].
pub trait QueryEmbedding: Send + Sync {
    fn embed_query(&self, text: &str) -> Result<Vec<f32>>;
}

/// Backend that embeds one text per call.
pub trait SingleEmbedding: Send + Sync {
    fn embed_text(&self, text: &str) -> Result<Vec<f32>>;
}

impl<F> SingleEmbedding for F
where
    F: Fn(&str) -> Result<Vec<f32>> + Send + Sync,
{
    fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        self(text)
    }
}

/// Adapter presenting a backend's native capabilities as an [`Embedder`].
///
/// `embed_batch` prefers the batch entry point and otherwise calls the
/// single-item entry point once per text. `embed_one` prefers the query
/// entry point, then the single-item entry point, then a one-element batch.
#[derive(Clone)]
pub struct EmbeddingAdapter {
    provider: String,
    batch: Option<Arc<dyn BatchEmbedding>>,
    query: Option<Arc<dyn QueryEmbedding>>,
    single: Option<Arc<dyn SingleEmbedding>>,
}

impl EmbeddingAdapter {
    /// Start building an adapter for the named provider.
    pub fn builder(provider: impl Into<String>) -> EmbeddingAdapterBuilder {
        EmbeddingAdapterBuilder {
            provider: provider.into(),
            batch: None,
            query: None,
            single: None,
        }
    }

    /// Adapter over a backend exposing both batch and query entry points.
    pub fn with_batch_and_query<B>(provider: impl Into<String>, backend: B) -> Result<Self>
    where
        B: BatchEmbedding + QueryEmbedding + 'static,
    {
        let backend = Arc::new(backend);
        Self::builder(provider)
            .batch(backend.clone())
            .query(backend)
            .build()
    }

    /// Adapter over a single generic callable.
    pub fn from_fn<F>(provider: impl Into<String>, f: F) -> Result<Self>
    where
        F: Fn(&str) -> Result<Vec<f32>> + Send + Sync + 'static,
    {
        Self::builder(provider).single(Arc::new(f)).build()
    }
}

impl std::fmt::Debug for EmbeddingAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingAdapter")
            .field("provider", &self.provider)
            .field("batch", &self.batch.is_some())
            .field("query", &self.query.is_some())
            .field("single", &self.single.is_some())
            .finish()
    }
}

impl Embedder for EmbeddingAdapter {
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let vectors = match (&self.batch, &self.single) {
            (Some(batch), _) => batch.embed_documents(texts)?,
            (None, Some(single)) => {
                debug!("{}: no batch entry point, embedding {} texts one by one", self.provider, texts.len());
                texts
                    .iter()
                    .map(|text| single.embed_text(text))
                    .collect::<Result<Vec<_>>>()?
            }
            (None, None) => return Err(self.unsupported()),
        };

        if vectors.len() != texts.len() {
            return Err(VidsageError::Backend(format!(
                "{} returned {} embeddings for {} texts",
                self.provider,
                vectors.len(),
                texts.len()
            )));
        }

        Ok(vectors)
    }

    fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        if let Some(query) = &self.query {
            return query.embed_query(text);
        }
        if let Some(single) = &self.single {
            return single.embed_text(text);
        }
        if let Some(batch) = &self.batch {
            return batch
                .embed_documents(&[text.to_string()])?
                .into_iter()
                .next()
                .ok_or_else(|| VidsageError::Backend(format!("{} returned no embedding", self.provider)));
        }
        Err(self.unsupported())
    }

    fn provider(&self) -> &str {
        &self.provider
    }
}

impl EmbeddingAdapter {
    fn unsupported(&self) -> VidsageError {
        VidsageError::UnsupportedProvider(format!(
            "{} exposes neither a batch nor a single-text embedding entry point",
            self.provider
        ))
    }
}

/// Builder for [`EmbeddingAdapter`].
pub struct EmbeddingAdapterBuilder {
    provider: String,
    batch: Option<Arc<dyn BatchEmbedding>>,
    query: Option<Arc<dyn QueryEmbedding>>,
    single: Option<Arc<dyn SingleEmbedding>>,
}

impl EmbeddingAdapterBuilder {
    pub fn batch(mut self, batch: Arc<dyn BatchEmbedding>) -> Self {
        self.batch = Some(batch);
        self
    }

    pub fn query(mut self, query: Arc<dyn QueryEmbedding>) -> Self {
        self.query = Some(query);
        self
    }

    pub fn single(mut self, single: Arc<dyn SingleEmbedding>) -> Self {
        self.single = Some(single);
        self
    }

    /// Finish the adapter.
    ///
    /// Fails with [`VidsageError::UnsupportedProvider`] when neither a batch
    /// nor a single-text capability was supplied.
    pub fn build(self) -> Result<EmbeddingAdapter> {
        if self.batch.is_none() && self.single.is_none() {
            return Err(VidsageError::UnsupportedProvider(format!(
                "{} exposes neither a batch nor a single-text embedding entry point",
                self.provider
            )));
        }
        Ok(EmbeddingAdapter {
            provider: self.provider,
            batch: self.batch,
            query: self.query,
            single: self.single,
        })
    }
}

/// Create the configured embedding adapter.
///
/// The OpenAI backend needs a running Tokio runtime.
pub fn create_embedder(settings: &EmbeddingSettings) -> Result<EmbeddingAdapter> {
    info!("Using {} embeddings ({})", settings.provider, settings.model);
    match settings.provider {
        ProviderKind::OpenAI => {
            let backend = OpenAIEmbedder::with_config(
                &settings.model,
                settings.dimensions as usize,
                Duration::from_secs(settings.timeout_secs),
            )?;
            EmbeddingAdapter::builder("openai")
                .batch(Arc::new(backend))
                .build()
        }
        ProviderKind::Local => {
            EmbeddingAdapter::with_batch_and_query("local", HashingEmbedder::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn length_vector(text: &str) -> Vec<f32> {
        vec![text.len() as f32, 1.0, (text.len() % 3) as f32]
    }

    struct Documents;

    impl BatchEmbedding for Documents {
        fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|t| length_vector(t)).collect())
        }
    }

    struct Queries;

    impl QueryEmbedding for Queries {
        fn embed_query(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(vec![-1.0, -1.0, -1.0])
        }
    }

    #[test]
    fn test_build_requires_batch_or_single() {
        let err = EmbeddingAdapter::builder("query-only")
            .query(Arc::new(Queries))
            .build()
            .unwrap_err();
        assert!(matches!(err, VidsageError::UnsupportedProvider(_)));
    }

    #[test]
    fn test_batch_falls_back_to_single_in_order() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let adapter = EmbeddingAdapter::from_fn("callable", move |text: &str| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(length_vector(text))
        })
        .unwrap();

        let texts = vec!["a".to_string(), "bbb".to_string(), "cc".to_string()];
        let vectors = adapter.embed_batch(&texts).unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(vectors, vec![length_vector("a"), length_vector("bbb"), length_vector("cc")]);
    }

    #[test]
    fn test_query_entry_point_is_preferred() {
        let adapter = EmbeddingAdapter::builder("asymmetric")
            .batch(Arc::new(Documents))
            .query(Arc::new(Queries))
            .build()
            .unwrap();

        assert_eq!(adapter.embed_one("hello").unwrap(), vec![-1.0, -1.0, -1.0]);
        assert_eq!(
            adapter.embed_batch(&["hello".to_string()]).unwrap(),
            vec![length_vector("hello")]
        );
    }

    #[test]
    fn test_embed_one_uses_batch_without_query_entry_point() {
        let adapter = EmbeddingAdapter::builder("documents")
            .batch(Arc::new(Documents))
            .build()
            .unwrap();
        assert_eq!(adapter.embed_one("abcd").unwrap(), length_vector("abcd"));
    }

    #[test]
    fn test_batch_and_single_calls_agree() {
        let adapter = EmbeddingAdapter::with_batch_and_query("local", HashingEmbedder::default()).unwrap();
        let texts = vec![
            "nuclear fusion reactors".to_string(),
            "the plasma is confined by magnets".to_string(),
            "".to_string(),
        ];

        let batch = adapter.embed_batch(&texts).unwrap();
        for (text, vector) in texts.iter().zip(&batch) {
            assert_eq!(&adapter.embed_one(text).unwrap(), vector);
        }
    }

    #[test]
    fn test_wrong_embedding_count_is_backend_error() {
        struct Short;
        impl BatchEmbedding for Short {
            fn embed_documents(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
                Ok(vec![vec![1.0]])
            }
        }

        let adapter = EmbeddingAdapter::builder("short").batch(Arc::new(Short)).build().unwrap();
        let err = adapter
            .embed_batch(&["a".to_string(), "b".to_string()])
            .unwrap_err();
        assert!(matches!(err, VidsageError::Backend(_)));
    }
}
