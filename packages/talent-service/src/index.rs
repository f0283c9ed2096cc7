use std::{fs, path::Path};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use talent_domain::indexing::{CandidateRecord, IndexDocument};
use talent_storage::VectorPoint;

use crate::{Error, Result, TalentService};

/// A parsed record and the id to use when the record carries none.
#[derive(Clone, Debug)]
pub struct CandidateFile {
	pub fallback_id: String,
	pub record: CandidateRecord,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexReport {
	pub candidates: usize,
	pub documents: usize,
	pub points: usize,
}

/// Reads every `*.json` file in `dir`, ordered by file name. The file stem is the fallback id.
pub fn load_candidate_records(dir: &Path) -> Result<Vec<CandidateFile>> {
	let entries = fs::read_dir(dir).map_err(|err| Error::Records {
		message: format!("Failed to list {}: {err}", dir.display()),
	})?;
	let mut paths = Vec::new();

	for entry in entries {
		let path = entry
			.map_err(|err| Error::Records {
				message: format!("Failed to list {}: {err}", dir.display()),
			})?
			.path();

		if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
			paths.push(path);
		}
	}

	paths.sort();

	paths
		.into_iter()
		.map(|path| {
			let raw = fs::read_to_string(&path).map_err(|err| Error::Records {
				message: format!("Failed to read {}: {err}", path.display()),
			})?;
			let record = serde_json::from_str(&raw).map_err(|err| Error::Records {
				message: format!("Failed to parse {}: {err}", path.display()),
			})?;
			let fallback_id = path
				.file_stem()
				.map(|stem| stem.to_string_lossy().into_owned())
				.unwrap_or_default();

			Ok(CandidateFile { fallback_id, record })
		})
		.collect()
}

/// Stable point id, so re-indexing a candidate overwrites its previous points.
pub fn point_id(document_key: &str) -> Uuid {
	Uuid::new_v5(&Uuid::NAMESPACE_OID, document_key.as_bytes())
}

impl TalentService {
	pub async fn build_index(&self, files: &[CandidateFile]) -> Result<IndexReport> {
		self.store.ensure_collection().await?;

		let documents: Vec<IndexDocument> = files
			.iter()
			.flat_map(|file| self.documents.build(&file.record, &file.fallback_id))
			.collect();

		if documents.is_empty() {
			tracing::info!(candidates = files.len(), "No documents to index.");

			return Ok(IndexReport { candidates: files.len(), documents: 0, points: 0 });
		}

		let texts: Vec<String> = documents.iter().map(|doc| doc.text.clone()).collect();
		let vectors = self.embed_checked(&texts).await?;
		let points: Vec<VectorPoint> = documents
			.into_iter()
			.zip(vectors)
			.map(|(doc, vector)| VectorPoint {
				id: point_id(&doc.key).to_string(),
				vector,
				document: doc.text,
				metadata: doc.metadata,
			})
			.collect();
		let document_count = points.len();
		let upserted = self.store.upsert(points).await?;

		tracing::info!(
			candidates = files.len(),
			documents = document_count,
			points = upserted,
			"Indexed candidate records."
		);

		Ok(IndexReport { candidates: files.len(), documents: document_count, points: upserted })
	}

	/// Indexes the configured candidates directory.
	pub async fn index_directory(&self) -> Result<IndexReport> {
		let files = load_candidate_records(&self.cfg.indexing.candidates_dir)?;

		self.build_index(&files).await
	}
}

#[cfg(test)]
mod tests {
	use super::point_id;

	#[test]
	fn point_ids_are_deterministic() {
		assert_eq!(point_id("cand-1:0"), point_id("cand-1:0"));
		assert_ne!(point_id("cand-1:0"), point_id("cand-1:1"));
		assert_eq!(point_id("cand-1:0").get_version_num(), 5);
	}
}
