//! Request body values.
//!
//! # Design
//! `BodyValue` is a tagged tree covering everything a call site may send:
//! JSON-like scalars, dates, arrays, ordered objects, and the two binary
//! shapes that only multipart can carry. Object properties keep insertion
//! order so flattened form output follows the order the caller wrote.
//!
//! `Body` is what the verb methods accept. Besides a `BodyValue` it can hold
//! an already-encoded form or multipart payload, which the serializer passes
//! through untouched.

use chrono::{DateTime, Utc};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

/// A file with its own name, attached as a multipart file part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

impl FilePart {
    pub fn new(file_name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: Some(file_name.into()),
            content_type: None,
            data: data.into(),
        }
    }

    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

/// Raw bytes without a file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

impl Blob {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self {
            content_type: None,
            data: data.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BodyValue {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    Date(DateTime<Utc>),
    Array(Vec<BodyValue>),
    Object(Vec<(String, BodyValue)>),
    File(FilePart),
    Blob(Blob),
}

impl BodyValue {
    /// Build an object from `(key, value)` pairs, keeping their order.
    pub fn object<K, V, I>(entries: I) -> Self
    where
        K: Into<String>,
        V: Into<BodyValue>,
        I: IntoIterator<Item = (K, V)>,
    {
        BodyValue::Object(
            entries
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }

    pub fn array<V, I>(items: I) -> Self
    where
        V: Into<BodyValue>,
        I: IntoIterator<Item = V>,
    {
        BodyValue::Array(items.into_iter().map(Into::into).collect())
    }

    /// Text used when the value is a leaf of a flattened form.
    pub(crate) fn leaf_text(&self) -> Option<String> {
        match self {
            BodyValue::Null => Some(String::new()),
            BodyValue::Bool(b) => Some(b.to_string()),
            BodyValue::Number(n) => Some(match n.as_f64() {
                Some(float) if n.is_f64() => float.to_string(),
                _ => n.to_string(),
            }),
            BodyValue::String(s) => Some(s.clone()),
            BodyValue::Date(d) => Some(iso_string(d)),
            _ => None,
        }
    }
}

/// ISO-8601 in UTC with millisecond precision, e.g. `2024-05-01T12:00:00.000Z`.
pub(crate) fn iso_string(date: &DateTime<Utc>) -> String {
    date.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

impl Serialize for BodyValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            BodyValue::Null => serializer.serialize_unit(),
            BodyValue::Bool(b) => serializer.serialize_bool(*b),
            BodyValue::Number(n) => n.serialize(serializer),
            BodyValue::String(s) => serializer.serialize_str(s),
            BodyValue::Date(d) => serializer.serialize_str(&iso_string(d)),
            BodyValue::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            BodyValue::Object(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
            // Binary has no structured form; it goes out as an empty object.
            BodyValue::File(_) | BodyValue::Blob(_) => serializer.serialize_map(Some(0))?.end(),
        }
    }
}

impl From<serde_json::Value> for BodyValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => BodyValue::Null,
            serde_json::Value::Bool(b) => BodyValue::Bool(b),
            serde_json::Value::Number(n) => BodyValue::Number(n),
            serde_json::Value::String(s) => BodyValue::String(s),
            serde_json::Value::Array(items) => BodyValue::array(items),
            serde_json::Value::Object(map) => BodyValue::object(map),
        }
    }
}

impl From<&str> for BodyValue {
    fn from(value: &str) -> Self {
        BodyValue::String(value.to_string())
    }
}

impl From<String> for BodyValue {
    fn from(value: String) -> Self {
        BodyValue::String(value)
    }
}

impl From<bool> for BodyValue {
    fn from(value: bool) -> Self {
        BodyValue::Bool(value)
    }
}

macro_rules! from_integer {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for BodyValue {
                fn from(value: $ty) -> Self {
                    BodyValue::Number(serde_json::Number::from(value))
                }
            }
        )*
    };
}

from_integer!(i32, i64, u32, u64, usize);

impl From<f64> for BodyValue {
    /// Non-finite floats become `Null`, as JSON has no representation for them.
    fn from(value: f64) -> Self {
        serde_json::Number::from_f64(value).map_or(BodyValue::Null, BodyValue::Number)
    }
}

impl From<DateTime<Utc>> for BodyValue {
    fn from(value: DateTime<Utc>) -> Self {
        BodyValue::Date(value)
    }
}

impl From<FilePart> for BodyValue {
    fn from(value: FilePart) -> Self {
        BodyValue::File(value)
    }
}

impl From<Blob> for BodyValue {
    fn from(value: Blob) -> Self {
        BodyValue::Blob(value)
    }
}

impl<T: Into<BodyValue>> From<Option<T>> for BodyValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(BodyValue::Null, Into::into)
    }
}

impl<T: Into<BodyValue>> From<Vec<T>> for BodyValue {
    fn from(value: Vec<T>) -> Self {
        BodyValue::array(value)
    }
}

/// One part of a multipart payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MultipartPart {
    Field { name: String, value: String },
    File { name: String, file: FilePart },
    Blob { name: String, blob: Blob },
}

impl MultipartPart {
    pub fn name(&self) -> &str {
        match self {
            MultipartPart::Field { name, .. }
            | MultipartPart::File { name, .. }
            | MultipartPart::Blob { name, .. } => name,
        }
    }
}

/// Ordered multipart fields and files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultipartForm {
    parts: Vec<MultipartPart>,
}

impl MultipartForm {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(MultipartPart::Field {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    #[must_use]
    pub fn file(mut self, name: impl Into<String>, file: FilePart) -> Self {
        self.push(MultipartPart::File {
            name: name.into(),
            file,
        });
        self
    }

    pub fn push(&mut self, part: MultipartPart) {
        self.parts.push(part);
    }

    pub fn parts(&self) -> &[MultipartPart] {
        &self.parts
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}

/// A request body as passed to the client's verb methods.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    /// A value the client serializes according to its mode.
    Value(BodyValue),
    /// Already-encoded form pairs, sent as-is.
    Form(Vec<(String, String)>),
    /// Already-built multipart payload, sent as-is.
    Multipart(MultipartForm),
}

impl Body {
    /// Convert any `Serialize` type into a body value.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self, serde_json::Error> {
        Ok(Body::Value(serde_json::to_value(value)?.into()))
    }
}

impl From<BodyValue> for Body {
    fn from(value: BodyValue) -> Self {
        Body::Value(value)
    }
}

impl From<serde_json::Value> for Body {
    fn from(value: serde_json::Value) -> Self {
        Body::Value(value.into())
    }
}

impl From<MultipartForm> for Body {
    fn from(value: MultipartForm) -> Self {
        Body::Multipart(value)
    }
}
