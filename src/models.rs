use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::entities::{collection, movie};

/// Keeps an explicit `null` as `Some(Value::Null)`; an absent field stays `None`
/// through `#[serde(default)]`.
fn supplied<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(deserializer).map(Some)
}

/// Movie item as sent by clients. Fields are kept as raw JSON so type
/// problems surface as per-item validation errors instead of a body rejection.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct MovieInput {
    #[serde(default, deserialize_with = "supplied")]
    pub title: Option<Value>,
    #[serde(default, deserialize_with = "supplied")]
    pub description: Option<Value>,
    #[serde(default, deserialize_with = "supplied")]
    pub genres: Option<Value>,
    #[serde(default, deserialize_with = "supplied")]
    pub uuid: Option<Value>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct CollectionInput {
    #[serde(default, deserialize_with = "supplied")]
    pub title: Option<Value>,
    #[serde(default, deserialize_with = "supplied")]
    pub description: Option<Value>,
    /// Expected to be a list of movie objects; checked item by item.
    #[serde(default, deserialize_with = "supplied")]
    pub movies: Option<Value>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct CollectionPatch {
    #[serde(default, deserialize_with = "supplied")]
    pub title: Option<Value>,
    #[serde(default, deserialize_with = "supplied")]
    pub description: Option<Value>,
    #[serde(default, deserialize_with = "supplied")]
    pub movies: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CollectionSummary {
    pub title: String,
    pub uuid: String,
    pub description: String,
}

impl From<collection::Model> for CollectionSummary {
    fn from(c: collection::Model) -> Self {
        Self { title: c.title, uuid: c.uuid, description: c.description }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MovieView {
    pub title: String,
    pub description: String,
    pub genres: Option<String>,
    pub uuid: String,
}

impl From<movie::Model> for MovieView {
    fn from(m: movie::Model) -> Self {
        Self { title: m.title, description: m.description, genres: m.genres, uuid: m.uuid }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CollectionDetail {
    pub title: String,
    pub description: String,
    pub movies: Vec<MovieView>,
}

#[derive(Debug, Serialize)]
pub struct CollectionCreated {
    pub collection_uuid: String,
}

#[derive(Debug, Serialize)]
pub struct CollectionsOverview {
    pub collections: Vec<CollectionSummary>,
    pub favourite_genres: String,
}

#[derive(Debug, Serialize)]
pub struct CollectionsResponse {
    pub is_success: bool,
    pub data: CollectionsOverview,
}

#[derive(Debug, Serialize)]
pub struct RequestCount {
    pub requests: i64,
}

#[derive(Debug, Serialize)]
pub struct Message {
    pub message: String,
}
