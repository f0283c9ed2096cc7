use std::collections::HashMap;

use qdrant_client::{
	Payload, Qdrant,
	qdrant::{
		Condition, CountPointsBuilder, CreateCollectionBuilder, Distance, Filter, ListValue,
		PointStruct, Query, QueryPointsBuilder, Range, ScoredPoint, Struct, UpsertPointsBuilder,
		Value as QdrantValue, VectorParamsBuilder, value::Kind,
	},
};
use serde_json::{Map, Value};

use talent_domain::{candidate::SearchHit, filter::FilterCondition};

use crate::{DOCUMENT_FIELD, Error, Result, VectorPoint};

pub struct QdrantStore {
	pub client: Qdrant,
	pub collection: String,
	pub vector_dim: u32,
}
impl QdrantStore {
	pub fn new(cfg: &talent_config::Qdrant) -> Result<Self> {
		let client = Qdrant::from_url(&cfg.url).build()?;

		Ok(Self { client, collection: cfg.collection.clone(), vector_dim: cfg.vector_dim })
	}

	/// Creates the cosine collection on first use; an existing collection is left untouched.
	pub async fn ensure_collection(&self) -> Result<()> {
		if self.client.collection_exists(self.collection.clone()).await? {
			return Ok(());
		}

		self.client
			.create_collection(CreateCollectionBuilder::new(self.collection.clone()).vectors_config(
				VectorParamsBuilder::new(u64::from(self.vector_dim), Distance::Cosine),
			))
			.await?;

		tracing::info!(collection = %self.collection, dim = self.vector_dim, "Created Qdrant collection.");

		Ok(())
	}

	pub async fn upsert(&self, points: Vec<VectorPoint>) -> Result<usize> {
		if points.is_empty() {
			return Ok(0);
		}

		let count = points.len();
		let mut structs = Vec::with_capacity(count);

		for point in points {
			if point.vector.len() != self.vector_dim as usize {
				return Err(Error::InvalidArgument(format!(
					"Vector for point {} has {} dimensions; expected {}.",
					point.id,
					point.vector.len(),
					self.vector_dim
				)));
			}

			let mut payload: HashMap<String, QdrantValue> = point
				.metadata
				.into_iter()
				.map(|(key, value)| (key, QdrantValue::from(value)))
				.collect();

			payload.insert(DOCUMENT_FIELD.to_string(), QdrantValue::from(point.document));
			structs.push(PointStruct::new(point.id, point.vector, Payload::from(payload)));
		}

		self.client
			.upsert_points(UpsertPointsBuilder::new(self.collection.clone(), structs).wait(true))
			.await?;

		Ok(count)
	}

	pub async fn search(
		&self,
		vector: &[f32],
		limit: u32,
		filter: Option<&FilterCondition>,
	) -> Result<Vec<SearchHit>> {
		let mut search = QueryPointsBuilder::new(self.collection.clone())
			.query(Query::new_nearest(vector.to_vec()))
			.with_payload(true)
			.limit(u64::from(limit));

		if let Some(filter) = filter {
			search = search.filter(to_qdrant_filter(filter)?);
		}

		let response = self.client.query(search).await?;

		Ok(response.result.into_iter().map(hit_from_point).collect())
	}

	pub async fn count(&self) -> Result<u64> {
		let response =
			self.client.count(CountPointsBuilder::new(self.collection.clone()).exact(true)).await?;

		Ok(response.result.map(|result| result.count).unwrap_or(0))
	}
}

/// Translates a metadata predicate into a Qdrant payload filter.
pub fn to_qdrant_filter(filter: &FilterCondition) -> Result<Filter> {
	match filter {
		FilterCondition::And(conditions) => {
			Ok(Filter::must(conditions.iter().map(to_condition).collect::<Result<Vec<_>>>()?))
		},
		other => Ok(Filter::must([to_condition(other)?])),
	}
}

fn to_condition(filter: &FilterCondition) -> Result<Condition> {
	match filter {
		FilterCondition::Eq { field, value } => match value {
			Value::String(text) => Ok(Condition::matches(field.as_str(), text.clone())),
			Value::Bool(flag) => Ok(Condition::matches(field.as_str(), *flag)),
			Value::Number(number) => match number.as_i64() {
				Some(number) => Ok(Condition::matches(field.as_str(), number)),
				None => Err(Error::UnsupportedFilter(format!("non-integer match on {field}"))),
			},
			_ => Err(Error::UnsupportedFilter(format!("match on {field} with {value}"))),
		},
		FilterCondition::In { field, values } => {
			let keywords: Option<Vec<String>> =
				values.iter().map(|value| value.as_str().map(str::to_string)).collect();

			if let Some(keywords) = keywords {
				return Ok(Condition::matches(field.as_str(), keywords));
			}

			let integers: Option<Vec<i64>> = values.iter().map(Value::as_i64).collect();

			if let Some(integers) = integers {
				return Ok(Condition::matches(field.as_str(), integers));
			}

			Err(Error::UnsupportedFilter(format!("mixed value types in $in on {field}")))
		},
		FilterCondition::Gte { field, value } => Ok(Condition::range(
			field.as_str(),
			Range { gte: Some(*value as f64), ..Default::default() },
		)),
		FilterCondition::And(_) => Ok(Condition::from(to_qdrant_filter(filter)?)),
	}
}

fn hit_from_point(point: ScoredPoint) -> SearchHit {
	let mut metadata: Map<String, Value> =
		point.payload.into_iter().map(|(key, value)| (key, json_from_qdrant(value))).collect();
	let document = match metadata.remove(DOCUMENT_FIELD) {
		Some(Value::String(text)) => text,
		_ => String::new(),
	};

	SearchHit { document, metadata, score: f64::from(point.score) }
}

fn json_from_qdrant(value: QdrantValue) -> Value {
	match value.kind {
		Some(Kind::BoolValue(flag)) => Value::Bool(flag),
		Some(Kind::IntegerValue(number)) => Value::from(number),
		Some(Kind::DoubleValue(number)) =>
			serde_json::Number::from_f64(number).map(Value::Number).unwrap_or(Value::Null),
		Some(Kind::StringValue(text)) => Value::String(text),
		Some(Kind::ListValue(ListValue { values })) =>
			Value::Array(values.into_iter().map(json_from_qdrant).collect()),
		Some(Kind::StructValue(Struct { fields })) => Value::Object(
			fields.into_iter().map(|(key, value)| (key, json_from_qdrant(value))).collect(),
		),
		Some(Kind::NullValue(_)) | None => Value::Null,
	}
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	fn string_value(text: &str) -> QdrantValue {
		QdrantValue { kind: Some(Kind::StringValue(text.to_string())) }
	}

	#[test]
	fn single_condition_becomes_one_must_clause() {
		let filter = to_qdrant_filter(&FilterCondition::Gte {
			field: "years_experience".to_string(),
			value: 5,
		})
		.expect("Range filters are supported.");

		assert_eq!(filter.must.len(), 1);
		assert!(filter.should.is_empty());
	}

	#[test]
	fn conjunction_maps_each_condition() {
		let filter = to_qdrant_filter(&FilterCondition::And(vec![
			FilterCondition::Eq { field: "type".to_string(), value: json!("skill") },
			FilterCondition::In { field: "skill_name".to_string(), values: vec![json!("Java")] },
			FilterCondition::Eq { field: "prepared".to_string(), value: json!(true) },
			FilterCondition::In { field: "english_level_num".to_string(), values: vec![json!(4), json!(5)] },
		]))
		.expect("Conjunction must translate.");

		assert_eq!(filter.must.len(), 4);
	}

	#[test]
	fn rejects_mixed_in_values() {
		let err = to_qdrant_filter(&FilterCondition::In {
			field: "candidate_id".to_string(),
			values: vec![json!("a"), json!(1)],
		})
		.expect_err("Mixed value types must be rejected.");

		assert!(matches!(err, Error::UnsupportedFilter(_)));
	}

	#[test]
	fn converts_payload_back_to_json() {
		let nested = QdrantValue {
			kind: Some(Kind::StructValue(Struct {
				fields: HashMap::from([("level".to_string(), string_value("High"))]),
			})),
		};
		let list = QdrantValue {
			kind: Some(Kind::ListValue(ListValue {
				values: vec![string_value("Java"), QdrantValue { kind: Some(Kind::IntegerValue(3)) }],
			})),
		};

		assert_eq!(json_from_qdrant(nested), json!({ "level": "High" }));
		assert_eq!(json_from_qdrant(list), json!(["Java", 3]));
		assert_eq!(json_from_qdrant(QdrantValue { kind: Some(Kind::DoubleValue(f64::NAN)) }), Value::Null);
		assert_eq!(json_from_qdrant(QdrantValue { kind: None }), Value::Null);
	}

	#[test]
	fn hit_splits_document_from_metadata() {
		let point = ScoredPoint {
			payload: HashMap::from([
				(DOCUMENT_FIELD.to_string(), string_value("Java (High)")),
				("candidate_id".to_string(), string_value("c-1")),
			]),
			score: 0.5,
			..Default::default()
		};
		let hit = hit_from_point(point);

		assert_eq!(hit.document, "Java (High)");
		assert_eq!(hit.metadata.get("candidate_id"), Some(&json!("c-1")));
		assert!(!hit.metadata.contains_key(DOCUMENT_FIELD));
		assert_eq!(hit.score, 0.5);
	}
}
