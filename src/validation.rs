//! Request validation for collection and movie payloads.
//!
//! Validation never stops at the first bad movie: every item is checked and
//! the problems are reported together, keyed `"Movie <n>"` (1-based) so a
//! client can fix the whole list in one round trip.
//!
//! Text fields accept JSON strings and numbers (numbers are stored in their
//! JSON spelling) and are trimmed. Other JSON types are field errors.

use std::collections::{BTreeMap, HashSet};

use serde_json::{Value, json};
use uuid::Uuid;

use crate::models::{CollectionInput, CollectionPatch, MovieInput};

pub const TITLE_MAX_CHARS: usize = 100;
pub const GENRES_MAX_CHARS: usize = 255;
pub const USERNAME_MAX_CHARS: usize = 150;

const REQUIRED: &str = "This field is required.";
const BLANK: &str = "This field may not be blank.";
const NULL: &str = "This field may not be null.";
const NOT_TEXT: &str = "Not a valid string.";
const NOT_A_LIST: &str = "Expected a list of items.";
const NOT_AN_OBJECT: &str = "Invalid data. Expected an object.";

/// Error map returned as the body of a 400 response.
pub type FieldErrors = BTreeMap<String, Value>;

#[derive(Clone, Debug, PartialEq)]
pub struct NewMovie {
    pub uuid: Uuid,
    pub title: String,
    pub description: String,
    pub genres: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NewCollection {
    pub title: String,
    pub description: String,
    pub movies: Vec<NewMovie>,
}

/// A movie upsert item. Fields left as `None` are not touched on an existing row.
#[derive(Clone, Debug, PartialEq)]
pub struct MovieChange {
    pub uuid: Uuid,
    pub title: Option<String>,
    pub description: Option<String>,
    /// `Some(None)` clears the stored genres.
    pub genres: Option<Option<String>>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct CollectionChange {
    pub title: Option<String>,
    pub description: Option<String>,
    pub movies: Option<Vec<MovieChange>>,
}

#[derive(Debug, Default)]
struct Messages(BTreeMap<&'static str, Vec<String>>);

impl Messages {
    fn push(&mut self, field: &'static str, msg: impl Into<String>) {
        self.0.entry(field).or_default().push(msg.into());
    }

    fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn into_value(self) -> Value {
        json!(self.0)
    }

    fn merge_into(self, out: &mut FieldErrors) {
        for (field, msgs) in self.0 {
            out.insert(field.to_string(), json!(msgs));
        }
    }

    fn required_text(
        &mut self,
        field: &'static str,
        value: Option<Value>,
        max_chars: Option<usize>,
    ) -> Option<String> {
        match value {
            None => {
                self.push(field, REQUIRED);
                None
            }
            Some(v) => self.supplied_text(field, v, max_chars),
        }
    }

    /// A field present in the payload that must hold non-blank text.
    fn supplied_text(
        &mut self,
        field: &'static str,
        value: Value,
        max_chars: Option<usize>,
    ) -> Option<String> {
        let raw = self.scalar_text(field, value)?;
        self.present_text(field, &raw, max_chars)
    }

    /// Like [`Messages::supplied_text`] but `null` is allowed and blank is kept.
    fn nullable_text(
        &mut self,
        field: &'static str,
        value: Value,
        max_chars: Option<usize>,
    ) -> Option<Option<String>> {
        if value.is_null() {
            return Some(None);
        }
        let raw = self.scalar_text(field, value)?;
        self.within_limit(field, raw, max_chars).map(Some)
    }

    fn scalar_text(&mut self, field: &'static str, value: Value) -> Option<String> {
        match value {
            Value::String(s) => Some(s),
            Value::Number(n) => Some(n.to_string()),
            Value::Null => {
                self.push(field, NULL);
                None
            }
            _ => {
                self.push(field, NOT_TEXT);
                None
            }
        }
    }

    fn present_text(
        &mut self,
        field: &'static str,
        value: &str,
        max_chars: Option<usize>,
    ) -> Option<String> {
        let value = value.trim();
        if value.is_empty() {
            self.push(field, BLANK);
            return None;
        }
        self.within_limit(field, value.to_string(), max_chars)
    }

    fn within_limit(
        &mut self,
        field: &'static str,
        value: String,
        max_chars: Option<usize>,
    ) -> Option<String> {
        if let Some(max) = max_chars {
            if value.chars().count() > max {
                self.push(field, format!("Ensure this field has no more than {max} characters."));
                return None;
            }
        }
        Some(value)
    }

    /// Items of a `movies` value; anything but a list is a field error.
    fn movie_items(&mut self, value: Value) -> Option<Vec<Value>> {
        match value {
            Value::Array(items) => Some(items),
            Value::Null => {
                self.push("movies", NULL);
                None
            }
            _ => {
                self.push("movies", NOT_A_LIST);
                None
            }
        }
    }
}

fn movie_error(index: usize, title: Value, errors: Messages) -> (String, Value) {
    (movie_key(index), json!({ "errors": errors.into_value(), "title": title }))
}

/// Title as the client sent it, echoed back next to an item's errors.
fn raw_title(item: &Value) -> Value {
    item.get("title").cloned().unwrap_or(Value::Null)
}

fn movie_input(item: Value) -> Result<MovieInput, Messages> {
    let parsed = if item.is_object() { serde_json::from_value(item).ok() } else { None };
    parsed.ok_or_else(|| {
        let mut errors = Messages::default();
        errors.push("non_field_errors", NOT_AN_OBJECT);
        errors
    })
}

/// Uuid text, or `None` when missing, null or blank.
fn uuid_text(value: Option<Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        other => Some(other.to_string()),
    }
}

fn validate_new_movie(input: MovieInput, seen: &mut HashSet<Uuid>) -> Result<NewMovie, Messages> {
    let mut errors = Messages::default();

    let title = errors.required_text("title", input.title, Some(TITLE_MAX_CHARS));
    let description = errors.required_text("description", input.description, None);
    let genres = input
        .genres
        .and_then(|g| errors.nullable_text("genres", g, Some(GENRES_MAX_CHARS)))
        .flatten();

    let uuid = match uuid_text(input.uuid) {
        None => {
            errors.push("uuid", REQUIRED);
            None
        }
        Some(raw) => match Uuid::parse_str(&raw) {
            Ok(uuid) if !seen.insert(uuid) => {
                errors.push("uuid", "Duplicate movie uuid in request.");
                None
            }
            Ok(uuid) => Some(uuid),
            Err(_) => {
                errors.push("uuid", "Must be a valid UUID.");
                None
            }
        },
    };

    match (title, description, uuid) {
        (Some(title), Some(description), Some(uuid)) if errors.is_empty() => {
            Ok(NewMovie { uuid, title, description, genres })
        }
        _ => Err(errors),
    }
}

/// Validates a collection-create payload, staging every movie before anything is written.
pub fn validate_new_collection(input: CollectionInput) -> Result<NewCollection, FieldErrors> {
    let mut top = Messages::default();
    let title = top.required_text("title", input.title, Some(TITLE_MAX_CHARS));
    let description = top.required_text("description", input.description, None);

    let mut out = FieldErrors::new();
    let mut movies = Vec::new();
    let items = match input.movies {
        None => {
            top.push("movies", REQUIRED);
            None
        }
        Some(value) => top.movie_items(value),
    };
    let mut seen = HashSet::new();
    for (index, item) in items.into_iter().flatten().enumerate() {
        let title = raw_title(&item);
        match movie_input(item).and_then(|m| validate_new_movie(m, &mut seen)) {
            Ok(movie) => movies.push(movie),
            Err(errors) => {
                let (key, value) = movie_error(index, title, errors);
                out.insert(key, value);
            }
        }
    }
    top.merge_into(&mut out);

    match (title, description) {
        (Some(title), Some(description)) if out.is_empty() => {
            Ok(NewCollection { title, description, movies })
        }
        _ => Err(out),
    }
}

fn validate_movie_change(input: MovieInput, seen: &mut HashSet<Uuid>) -> Result<MovieChange, Messages> {
    let mut errors = Messages::default();

    let uuid = match uuid_text(input.uuid) {
        None => {
            errors.push("uuid", "UUID is required for each movie.");
            None
        }
        Some(raw) => match Uuid::parse_str(&raw) {
            Ok(uuid) if !seen.insert(uuid) => {
                errors.push("uuid", "Duplicate movie uuid in request.");
                None
            }
            Ok(uuid) => Some(uuid),
            Err(_) => {
                errors.push("uuid", format!("Invalid UUID format: {raw}"));
                None
            }
        },
    };

    let title = input.title.and_then(|t| errors.supplied_text("title", t, Some(TITLE_MAX_CHARS)));
    let description = input.description.and_then(|d| errors.supplied_text("description", d, None));
    let genres = input.genres.and_then(|g| errors.nullable_text("genres", g, Some(GENRES_MAX_CHARS)));

    match uuid {
        Some(uuid) if errors.is_empty() => Ok(MovieChange { uuid, title, description, genres }),
        _ => Err(errors),
    }
}

/// Validates a partial update. Only supplied fields are checked.
pub fn validate_collection_patch(patch: CollectionPatch) -> Result<CollectionChange, FieldErrors> {
    let mut top = Messages::default();
    let title = patch.title.and_then(|t| top.supplied_text("title", t, Some(TITLE_MAX_CHARS)));
    let description = patch.description.and_then(|d| top.supplied_text("description", d, None));

    let mut out = FieldErrors::new();
    let movies = patch.movies.and_then(|value| top.movie_items(value)).map(|items| {
        let mut seen = HashSet::new();
        let mut changes = Vec::with_capacity(items.len());
        for (index, item) in items.into_iter().enumerate() {
            let title = raw_title(&item);
            match movie_input(item).and_then(|m| validate_movie_change(m, &mut seen)) {
                Ok(change) => changes.push(change),
                Err(errors) => {
                    let (key, value) = movie_error(index, title, errors);
                    out.insert(key, value);
                }
            }
        }
        changes
    });
    top.merge_into(&mut out);

    if out.is_empty() {
        Ok(CollectionChange { title, description, movies })
    } else {
        Err(out)
    }
}

/// Records that an upserted movie with no existing row lacks fields a new row needs.
pub fn missing_for_insert(change: &MovieChange) -> Option<Value> {
    let mut errors = Messages::default();
    if change.title.is_none() {
        errors.push("title", REQUIRED);
    }
    if change.description.is_none() {
        errors.push("description", REQUIRED);
    }
    (!errors.is_empty()).then(|| errors.into_value())
}

/// Key under which a movie item's problems are reported.
pub fn movie_key(index: usize) -> String {
    format!("Movie {}", index + 1)
}

pub fn validate_credentials(username: &str, password: &str) -> Result<(), FieldErrors> {
    let mut errors = Messages::default();
    errors.present_text("username", username, Some(USERNAME_MAX_CHARS));
    if password.is_empty() {
        errors.push("password", BLANK);
    }
    let mut out = FieldErrors::new();
    errors.merge_into(&mut out);
    if out.is_empty() { Ok(()) } else { Err(out) }
}
