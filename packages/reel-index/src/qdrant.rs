use std::collections::HashMap;

use qdrant_client::qdrant::{
	PointId, Query, QueryPointsBuilder, ScoredPoint, Value, point_id::PointIdOptions, value::Kind,
};

use crate::{
	Result,
	models::{MovieHit, MovieMetadata},
};

pub const DENSE_VECTOR_NAME: &str = "dense";

pub struct QdrantStore {
	pub client: qdrant_client::Qdrant,
	pub collection: String,
	pub vector_dim: u32,
}
impl QdrantStore {
	pub fn new(cfg: &reel_config::Qdrant) -> Result<Self> {
		let client = qdrant_client::Qdrant::from_url(&cfg.url).build()?;

		Ok(Self { client, collection: cfg.collection.clone(), vector_dim: cfg.vector_dim })
	}

	pub async fn search_nearest(&self, vector: Vec<f32>, top_k: u32) -> Result<Vec<ScoredPoint>> {
		let query = QueryPointsBuilder::new(self.collection.clone())
			.query(Query::new_nearest(vector))
			.using(DENSE_VECTOR_NAME)
			.with_payload(true)
			.limit(top_k as u64);
		let response = self.client.query(query).await?;

		Ok(response.result)
	}
}

/// Maps a scored point to a [`MovieHit`]. Points with unusable ids or a
/// missing title are skipped by the caller.
pub fn point_to_hit(point: &ScoredPoint) -> Option<MovieHit> {
	let item_id = point
		.id
		.as_ref()
		.and_then(point_id_to_i64)
		.or_else(|| payload_i64(&point.payload, "movie_id"))?;
	let title = payload_string(&point.payload, "title")?;
	let genres = payload_genres(&point.payload, "genres");
	let year = payload_i64(&point.payload, "year").and_then(|year| i32::try_from(year).ok());
	let popularity = payload_f32(&point.payload, "popularity").unwrap_or(0.0);

	Some(MovieHit {
		item_id,
		similarity: point.score,
		metadata: MovieMetadata { title, genres, year, popularity },
	})
}

pub fn point_id_to_i64(point_id: &PointId) -> Option<i64> {
	match &point_id.point_id_options {
		Some(PointIdOptions::Num(id)) => i64::try_from(*id).ok(),
		_ => None,
	}
}

pub fn payload_string(payload: &HashMap<String, Value>, key: &str) -> Option<String> {
	let value = payload.get(key)?;

	match &value.kind {
		Some(Kind::StringValue(text)) => Some(text.to_string()),
		_ => None,
	}
}

pub fn payload_i64(payload: &HashMap<String, Value>, key: &str) -> Option<i64> {
	let value = payload.get(key)?;

	match &value.kind {
		Some(Kind::IntegerValue(value)) => Some(*value),
		Some(Kind::DoubleValue(value)) =>
			if value.fract() == 0.0 {
				Some(*value as i64)
			} else {
				None
			},
		_ => None,
	}
}

pub fn payload_f32(payload: &HashMap<String, Value>, key: &str) -> Option<f32> {
	let value = payload.get(key)?;

	match &value.kind {
		Some(Kind::DoubleValue(value)) => Some(*value as f32),
		Some(Kind::IntegerValue(value)) => Some(*value as f32),
		_ => None,
	}
}

/// Genres are stored either as a pipe-separated string ("Animation|Children")
/// or as a list of strings, depending on the ingestion path.
pub fn payload_genres(payload: &HashMap<String, Value>, key: &str) -> Vec<String> {
	let Some(value) = payload.get(key) else { return Vec::new() };

	match &value.kind {
		Some(Kind::StringValue(text)) => text
			.split('|')
			.map(str::trim)
			.filter(|genre| !genre.is_empty())
			.map(str::to_string)
			.collect(),
		Some(Kind::ListValue(list)) => list
			.values
			.iter()
			.filter_map(|entry| match &entry.kind {
				Some(Kind::StringValue(text)) => Some(text.to_string()),
				_ => None,
			})
			.collect(),
		_ => Vec::new(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn string_value(text: &str) -> Value {
		Value { kind: Some(Kind::StringValue(text.to_string())) }
	}

	#[test]
	fn splits_pipe_separated_genres() {
		let mut payload = HashMap::new();

		payload.insert("genres".to_string(), string_value("Animation|Children|"));

		assert_eq!(payload_genres(&payload, "genres"), vec!["Animation", "Children"]);
	}

	#[test]
	fn integer_payload_values_parse() {
		let mut payload = HashMap::new();

		payload.insert("year".to_string(), Value { kind: Some(Kind::IntegerValue(1995)) });

		assert_eq!(payload_i64(&payload, "year"), Some(1995));
	}
}
