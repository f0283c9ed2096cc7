//! Turns structured resume records into embeddable documents with filterable metadata.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use talent_config::{Indexing, MetadataFields, SkillNormalization};

use crate::{Result, skills::SkillNormalizer};

/// Parsed resume as produced by the upstream extraction step. Unknown fields are ignored.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct CandidateRecord {
	pub summary: Option<String>,
	pub general_info: GeneralInfo,
	pub skill_matrix: Vec<SkillEntry>,
	/// Either a single paragraph or a list of short statements.
	pub strengths: Value,
	pub prepared: Option<bool>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct GeneralInfo {
	pub candidate_id: Option<String>,
	pub fullname: Option<String>,
	pub title_detected: Option<String>,
	pub title_predicted: Option<String>,
	pub seniority_level: Option<String>,
	pub years_experience: Option<Value>,
	pub relevant_years: Option<Value>,
	pub main_industry: Option<String>,
	pub english_level: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct SkillEntry {
	pub skill_name: Option<String>,
	pub skill_level: Option<String>,
	pub years: Option<Value>,
	pub evidence: Option<String>,
}

/// One embeddable unit. `key` is unique per record and stable across rebuilds.
#[derive(Clone, Debug, PartialEq)]
pub struct IndexDocument {
	pub key: String,
	pub text: String,
	pub metadata: Map<String, Value>,
}

/// Maps a CEFR code or descriptive English level to a 0-6 scale; unknown levels map to 0.
pub fn english_level_num(level: &str) -> i64 {
	let upper = level.trim().to_uppercase();

	match upper.as_str() {
		"BASIC" => return 2,
		"CONVERSATIONAL" => return 3,
		"FLUENT" | "ADVANCED" => return 5,
		"NATIVE" => return 6,
		_ => {},
	}

	match upper.get(..2) {
		Some("A1") => 1,
		Some("A2") => 2,
		Some("B1") => 3,
		Some("B2") => 4,
		Some("C1") => 5,
		Some("C2") => 6,
		_ => 0,
	}
}

#[derive(Debug)]
pub struct IndexDocumentBuilder {
	fields: MetadataFields,
	strong_levels: Vec<String>,
	primary_skills_max_count: usize,
	normalizer: SkillNormalizer,
}
impl IndexDocumentBuilder {
	pub fn new(
		indexing: &Indexing,
		fields: &MetadataFields,
		skills: &SkillNormalization,
	) -> Result<Self> {
		Ok(Self {
			fields: fields.clone(),
			strong_levels: indexing
				.strong_skill_levels
				.iter()
				.map(|level| level.trim().to_lowercase())
				.collect(),
			primary_skills_max_count: indexing.primary_skills_max_count,
			normalizer: SkillNormalizer::new(skills)?,
		})
	}

	pub fn normalizer(&self) -> &SkillNormalizer {
		&self.normalizer
	}

	/// Normalized names of strong skills in matrix order, deduplicated and capped.
	pub fn primary_skills(&self, record: &CandidateRecord) -> Vec<String> {
		let mut skills: Vec<String> = Vec::new();

		for (_, name, _) in self.strong_skills(record) {
			let normalized = self.normalizer.normalize(name);

			if !skills.contains(&normalized) {
				skills.push(normalized);
			}
			if skills.len() == self.primary_skills_max_count {
				break;
			}
		}

		skills
	}

	/// Candidate profile blocks followed by one document per strong skill.
	pub fn build(&self, record: &CandidateRecord, fallback_id: &str) -> Vec<IndexDocument> {
		let info = &record.general_info;
		let candidate_id = non_empty(info.candidate_id.as_deref()).unwrap_or(fallback_id).to_string();
		let primary_skills = self.primary_skills(record);
		let candidate_metadata = self.candidate_metadata(record, &candidate_id, &primary_skills);
		let mut texts = Vec::new();
		let title = non_empty(info.title_detected.as_deref())
			.or_else(|| non_empty(info.title_predicted.as_deref()));
		let header = match title {
			Some(title) => format!("[Candidate] {candidate_id} {title}"),
			None => format!("[Candidate] {candidate_id}"),
		};

		texts.push(format!(
			"{header}\nSummary:\n{}",
			record.summary.as_deref().map(str::trim).unwrap_or_default()
		));

		if !primary_skills.is_empty() {
			texts.push(format!("Skills: {}", primary_skills.join(", ")));
		}
		if let Some(strengths) = strengths_text(&record.strengths) {
			texts.push(format!("Strengths: {strengths}"));
		}

		texts
			.into_iter()
			.map(|text| (text, candidate_metadata.clone()))
			.chain(
				self.strong_skills(record)
					.map(|skill| self.skill_document(record, &candidate_id, &primary_skills, skill)),
			)
			.enumerate()
			.map(|(ordinal, (text, metadata))| IndexDocument {
				key: format!("{candidate_id}:{ordinal}"),
				text,
				metadata,
			})
			.collect()
	}

	fn strong_skills<'a>(
		&'a self,
		record: &'a CandidateRecord,
	) -> impl Iterator<Item = (&'a SkillEntry, &'a str, &'a str)> + 'a {
		record.skill_matrix.iter().filter_map(move |entry| {
			let name = non_empty(entry.skill_name.as_deref())?;
			let level = non_empty(entry.skill_level.as_deref())?;

			self.strong_levels.contains(&level.to_lowercase()).then_some((entry, name, level))
		})
	}

	fn candidate_metadata(
		&self,
		record: &CandidateRecord,
		candidate_id: &str,
		primary_skills: &[String],
	) -> Map<String, Value> {
		let info = &record.general_info;
		let fields = &self.fields;
		let mut metadata = Map::new();

		metadata.insert(fields.doc_type.clone(), Value::from(fields.candidate_type.as_str()));
		metadata.insert(fields.candidate_id.clone(), Value::from(candidate_id));
		metadata.insert(fields.primary_skills.clone(), Value::from(primary_skills.join(", ")));

		for (key, value) in [
			(&fields.fullname, &info.fullname),
			(&fields.english_level, &info.english_level),
			(&fields.main_industry, &info.main_industry),
		] {
			if let Some(value) = non_empty(value.as_deref()) {
				metadata.insert(key.clone(), Value::from(value));
			}
		}

		self.insert_shared(&mut metadata, record);

		if let Some(years) = info.relevant_years.as_ref().and_then(crate::coerce_years) {
			metadata.insert(fields.relevant_years.clone(), Value::from(years));
		}

		metadata
	}

	fn skill_document(
		&self,
		record: &CandidateRecord,
		candidate_id: &str,
		primary_skills: &[String],
		(entry, name, level): (&SkillEntry, &str, &str),
	) -> (String, Map<String, Value>) {
		let fields = &self.fields;
		let text = match non_empty(entry.evidence.as_deref()) {
			Some(evidence) => format!("{name} ({level}): {evidence}"),
			None => format!("{name} ({level})"),
		};
		let mut metadata = Map::new();

		metadata.insert(fields.doc_type.clone(), Value::from(fields.skill_type.as_str()));
		metadata.insert(fields.candidate_id.clone(), Value::from(candidate_id));
		metadata.insert(fields.skill_name.clone(), Value::from(self.normalizer.normalize(name)));
		metadata.insert(fields.skill_level.clone(), Value::from(level));
		// Skill hits may be the only hits for a candidate, so they carry what ranking reads.
		metadata.insert(fields.primary_skills.clone(), Value::from(primary_skills.join(", ")));

		self.insert_shared(&mut metadata, record);

		if let Some(fullname) = non_empty(record.general_info.fullname.as_deref())
			&& fullname != candidate_id
		{
			metadata.insert(fields.fullname.clone(), Value::from(fullname));
		}

		(text, metadata)
	}

	/// Fields every document of a record carries, so request and query filters can combine with the
	/// skill-document filter.
	fn insert_shared(&self, metadata: &mut Map<String, Value>, record: &CandidateRecord) {
		let info = &record.general_info;

		metadata.insert(
			self.fields.english_level_num.clone(),
			Value::from(info.english_level.as_deref().map(english_level_num).unwrap_or(0)),
		);

		if let Some(prepared) = record.prepared {
			metadata.insert(self.fields.prepared.clone(), Value::Bool(prepared));
		}
		if let Some(level) = non_empty(info.seniority_level.as_deref()) {
			metadata.insert(self.fields.seniority_level.clone(), Value::from(level));
		}
		if let Some(years) = info.years_experience.as_ref().and_then(crate::coerce_years) {
			metadata.insert(self.fields.years_experience.clone(), Value::from(years));
		}
	}
}

fn non_empty(value: Option<&str>) -> Option<&str> {
	value.map(str::trim).filter(|value| !value.is_empty())
}

fn strengths_text(strengths: &Value) -> Option<String> {
	let text = match strengths {
		Value::String(text) => text.trim().to_string(),
		Value::Array(items) => items
			.iter()
			.filter_map(Value::as_str)
			.map(str::trim)
			.filter(|item| !item.is_empty())
			.collect::<Vec<_>>()
			.join("; "),
		_ => String::new(),
	};

	(!text.is_empty()).then_some(text)
}

#[cfg(test)]
mod tests {
	use super::english_level_num;

	#[test]
	fn maps_cefr_and_descriptive_levels() {
		assert_eq!(english_level_num("B2"), 4);
		assert_eq!(english_level_num("c1 (Advanced)"), 5);
		assert_eq!(english_level_num("Fluent"), 5);
		assert_eq!(english_level_num(" native "), 6);
		assert_eq!(english_level_num("Conversational"), 3);
		assert_eq!(english_level_num("unknown"), 0);
		assert_eq!(english_level_num(""), 0);
	}
}
