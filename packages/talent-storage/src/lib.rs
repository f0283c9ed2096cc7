//! Vector store backends behind one capability trait.

pub mod memory;
pub mod qdrant;

mod error;

pub use error::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

use std::{future::Future, pin::Pin, sync::Arc};

use serde_json::{Map, Value};

use talent_domain::{candidate::SearchHit, filter::FilterCondition};

use crate::{memory::MemoryStore, qdrant::QdrantStore};

/// Payload key holding the document text next to its metadata.
pub const DOCUMENT_FIELD: &str = "document";

#[derive(Clone, Debug, PartialEq)]
pub struct VectorPoint {
	/// UUID string; re-upserting the same id replaces the point.
	pub id: String,
	pub vector: Vec<f32>,
	pub document: String,
	pub metadata: Map<String, Value>,
}

pub trait VectorStore
where
	Self: Send + Sync,
{
	fn ensure_collection<'a>(&'a self) -> BoxFuture<'a, Result<()>>;

	fn upsert<'a>(&'a self, points: Vec<VectorPoint>) -> BoxFuture<'a, Result<usize>>;

	/// Nearest neighbours by cosine similarity, best first, restricted by `filter` when given.
	fn search<'a>(
		&'a self,
		vector: &'a [f32],
		limit: u32,
		filter: Option<&'a FilterCondition>,
	) -> BoxFuture<'a, Result<Vec<SearchHit>>>;

	fn count<'a>(&'a self) -> BoxFuture<'a, Result<u64>>;
}

impl VectorStore for QdrantStore {
	fn ensure_collection<'a>(&'a self) -> BoxFuture<'a, Result<()>> {
		Box::pin(QdrantStore::ensure_collection(self))
	}

	fn upsert<'a>(&'a self, points: Vec<VectorPoint>) -> BoxFuture<'a, Result<usize>> {
		Box::pin(QdrantStore::upsert(self, points))
	}

	fn search<'a>(
		&'a self,
		vector: &'a [f32],
		limit: u32,
		filter: Option<&'a FilterCondition>,
	) -> BoxFuture<'a, Result<Vec<SearchHit>>> {
		Box::pin(QdrantStore::search(self, vector, limit, filter))
	}

	fn count<'a>(&'a self) -> BoxFuture<'a, Result<u64>> {
		Box::pin(QdrantStore::count(self))
	}
}

impl VectorStore for MemoryStore {
	fn ensure_collection<'a>(&'a self) -> BoxFuture<'a, Result<()>> {
		Box::pin(async { Ok(()) })
	}

	fn upsert<'a>(&'a self, points: Vec<VectorPoint>) -> BoxFuture<'a, Result<usize>> {
		Box::pin(async move { MemoryStore::upsert(self, points) })
	}

	fn search<'a>(
		&'a self,
		vector: &'a [f32],
		limit: u32,
		filter: Option<&'a FilterCondition>,
	) -> BoxFuture<'a, Result<Vec<SearchHit>>> {
		Box::pin(async move { Ok(MemoryStore::search(self, vector, limit, filter)) })
	}

	fn count<'a>(&'a self) -> BoxFuture<'a, Result<u64>> {
		Box::pin(async move { Ok(MemoryStore::count(self)) })
	}
}

/// Opens the backend selected by `storage.backend`.
pub fn open(cfg: &talent_config::Storage) -> Result<Arc<dyn VectorStore>> {
	match cfg.backend.as_str() {
		"qdrant" => Ok(Arc::new(QdrantStore::new(&cfg.qdrant)?)),
		"memory" => Ok(Arc::new(MemoryStore::new(cfg.qdrant.vector_dim))),
		other => Err(Error::InvalidArgument(format!("Unknown storage backend {other:?}."))),
	}
}
