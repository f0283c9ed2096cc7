//! Process-local store for tests and small demo corpora.

use std::{
	cmp::Ordering,
	sync::{PoisonError, RwLock},
};

use talent_domain::{candidate::SearchHit, filter::FilterCondition};

use crate::{Error, Result, VectorPoint};

#[derive(Debug)]
pub struct MemoryStore {
	vector_dim: u32,
	points: RwLock<Vec<VectorPoint>>,
}
impl MemoryStore {
	pub fn new(vector_dim: u32) -> Self {
		Self { vector_dim, points: RwLock::new(Vec::new()) }
	}

	/// Inserts new points and replaces those whose id is already stored.
	pub fn upsert(&self, points: Vec<VectorPoint>) -> Result<usize> {
		if let Some(point) = points.iter().find(|point| point.vector.len() != self.vector_dim as usize) {
			return Err(Error::InvalidArgument(format!(
				"Vector for point {} has {} dimensions; expected {}.",
				point.id,
				point.vector.len(),
				self.vector_dim
			)));
		}

		let count = points.len();
		let mut stored = self.points.write().unwrap_or_else(PoisonError::into_inner);

		for point in points {
			match stored.iter_mut().find(|existing| existing.id == point.id) {
				Some(existing) => *existing = point,
				None => stored.push(point),
			}
		}

		Ok(count)
	}

	pub fn search(&self, vector: &[f32], limit: u32, filter: Option<&FilterCondition>) -> Vec<SearchHit> {
		let stored = self.points.read().unwrap_or_else(PoisonError::into_inner);
		let mut hits: Vec<SearchHit> = stored
			.iter()
			.filter(|point| filter.map(|filter| filter.evaluate(&point.metadata).0).unwrap_or(true))
			.map(|point| SearchHit {
				document: point.document.clone(),
				metadata: point.metadata.clone(),
				score: cosine(vector, &point.vector),
			})
			.collect();

		hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
		hits.truncate(limit as usize);

		hits
	}

	pub fn count(&self) -> u64 {
		self.points.read().unwrap_or_else(PoisonError::into_inner).len() as u64
	}
}

fn cosine(a: &[f32], b: &[f32]) -> f64 {
	let (mut dot, mut norm_a, mut norm_b) = (0.0_f64, 0.0_f64, 0.0_f64);

	for (x, y) in a.iter().zip(b) {
		let (x, y) = (f64::from(*x), f64::from(*y));

		dot += x * y;
		norm_a += x * x;
		norm_b += y * y;
	}

	if norm_a == 0.0 || norm_b == 0.0 {
		return 0.0;
	}

	dot / (norm_a.sqrt() * norm_b.sqrt())
}
