pub mod ask;
pub mod index;

mod error;

pub use ask::{ChatRequest, ChatResponse, ChatSource, NO_CANDIDATES_ANSWER};
pub use error::{Error, Result};
pub use index::{CandidateFile, IndexReport, load_candidate_records};

use std::{future::Future, pin::Pin, sync::Arc};

use serde_json::Value;

use talent_config::{Config, EmbeddingProviderConfig, LlmProviderConfig};
use talent_domain::{
	candidate::CandidateAggregator, filter::MetadataFilterBuilder, indexing::IndexDocumentBuilder,
	query::QueryParser, ranking::CandidateRanker,
};
use talent_providers::{chat, embedding};
use talent_storage::VectorStore;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait EmbeddingProvider
where
	Self: Send + Sync,
{
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, talent_providers::Result<Vec<Vec<f32>>>>;
}

pub trait ChatProvider
where
	Self: Send + Sync,
{
	/// Returns the raw assistant content of one completion.
	fn complete<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		messages: &'a [Value],
	) -> BoxFuture<'a, talent_providers::Result<String>>;
}

#[derive(Clone)]
pub struct Providers {
	pub embedding: Arc<dyn EmbeddingProvider>,
	pub chat: Arc<dyn ChatProvider>,
}
impl Providers {
	pub fn new(embedding: Arc<dyn EmbeddingProvider>, chat: Arc<dyn ChatProvider>) -> Self {
		Self { embedding, chat }
	}
}
impl Default for Providers {
	fn default() -> Self {
		let provider = Arc::new(DefaultProviders);

		Self { embedding: provider.clone(), chat: provider }
	}
}

struct DefaultProviders;

impl EmbeddingProvider for DefaultProviders {
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, talent_providers::Result<Vec<Vec<f32>>>> {
		Box::pin(embedding::embed(cfg, texts))
	}
}

impl ChatProvider for DefaultProviders {
	fn complete<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		messages: &'a [Value],
	) -> BoxFuture<'a, talent_providers::Result<String>> {
		Box::pin(chat::complete(cfg, messages))
	}
}

/// Compiled rule tables plus the capabilities the pipelines call out to.
pub struct TalentService {
	pub cfg: Config,
	pub store: Arc<dyn VectorStore>,
	pub providers: Providers,
	parser: QueryParser,
	filters: MetadataFilterBuilder,
	aggregator: CandidateAggregator,
	ranker: CandidateRanker,
	documents: IndexDocumentBuilder,
}
impl TalentService {
	pub fn new(cfg: Config, store: Arc<dyn VectorStore>) -> Result<Self> {
		Self::with_providers(cfg, store, Providers::default())
	}

	/// Fails when a configured rule table does not compile.
	pub fn with_providers(
		cfg: Config,
		store: Arc<dyn VectorStore>,
		providers: Providers,
	) -> Result<Self> {
		let parser = QueryParser::new(&cfg.query_parsing)?;
		let filters = MetadataFilterBuilder::new(&cfg.metadata);
		let aggregator = CandidateAggregator::new(cfg.metadata.candidate_id.as_str());
		let ranker = CandidateRanker::new(&cfg.ranking, &cfg.metadata);
		let documents =
			IndexDocumentBuilder::new(&cfg.indexing, &cfg.metadata, &cfg.skill_normalization)?;

		Ok(Self { cfg, store, providers, parser, filters, aggregator, ranker, documents })
	}

	/// Embeds `texts` and checks the batch against the collection dimension.
	pub(crate) async fn embed_checked(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
		let vectors = self.providers.embedding.embed(&self.cfg.providers.embedding, texts).await?;

		if vectors.len() != texts.len() {
			return Err(Error::Provider {
				message: format!(
					"Embedding provider returned {} vectors for {} inputs.",
					vectors.len(),
					texts.len()
				),
			});
		}

		let dim = self.cfg.storage.qdrant.vector_dim as usize;

		if vectors.iter().any(|vector| vector.len() != dim) {
			return Err(Error::Provider { message: "Embedding vector dimension mismatch.".to_string() });
		}

		Ok(vectors)
	}
}
