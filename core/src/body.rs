//! Body serialization for the three client modes.
//!
//! # Design
//! Url-encoded and multipart share one flattening pass that turns nested
//! values into bracket paths (`user[name]`, `tags[]`). The pass emits
//! `FlatEntry` values and each mode decides how to write them, so switching
//! a client between the two never changes the key paths a backend sees.
//! Nulls are kept as empty values (`key=`), unlike query encoding which
//! drops them.
//!
//! Pre-built bodies keep their shape only where it matches the mode: form
//! pairs pass through in url-encoded mode and become a JSON object or
//! multipart text fields otherwise. A multipart form always passes through,
//! since the transport labels it with its own boundary.

use tracing::warn;
use url::form_urlencoded;

use crate::config::SerializationMode;
use crate::http::RequestBody;
use crate::value::{Blob, Body, BodyValue, FilePart, MultipartForm, MultipartPart};

/// File name used for file values that carry none.
pub const DEFAULT_FILE_NAME: &str = "file";

/// A flattened leaf.
#[derive(Debug, Clone, PartialEq)]
pub enum FlatEntry {
    Field(String, String),
    File(String, FilePart),
    Blob(String, Blob),
}

impl FlatEntry {
    pub fn key(&self) -> &str {
        match self {
            FlatEntry::Field(key, _) | FlatEntry::File(key, _) | FlatEntry::Blob(key, _) => key,
        }
    }
}

/// Serialize `body` for the wire according to `mode`.
pub fn serialize_body(mode: SerializationMode, body: Body) -> Result<RequestBody, serde_json::Error> {
    let value = match body {
        Body::Form(pairs) => return Ok(form_pairs(mode, pairs)),
        Body::Multipart(form) => return Ok(RequestBody::Multipart(form)),
        Body::Value(value) => value,
    };

    match mode {
        SerializationMode::Structured => serde_json::to_string(&value).map(RequestBody::Text),
        SerializationMode::UrlEncoded => Ok(RequestBody::Form(to_urlencoded(&value))),
        SerializationMode::Multipart => Ok(RequestBody::Multipart(to_multipart(&value))),
    }
}

/// Flatten a top-level value into bracket-path entries.
///
/// Objects contribute one entry tree per property and arrays one per index;
/// a bare scalar has no key to live under and contributes nothing.
pub fn flatten(value: &BodyValue) -> Vec<FlatEntry> {
    let mut out = Vec::new();
    match value {
        BodyValue::Object(entries) => {
            for (key, child) in entries {
                flatten_into(key, child, &mut out);
            }
        }
        BodyValue::Array(items) => {
            for (index, child) in items.iter().enumerate() {
                flatten_into(&index.to_string(), child, &mut out);
            }
        }
        _ => {}
    }
    out
}

fn flatten_into(key: &str, value: &BodyValue, out: &mut Vec<FlatEntry>) {
    match value {
        BodyValue::Array(items) => {
            let child_key = format!("{key}[]");
            for item in items {
                flatten_into(&child_key, item, out);
            }
        }
        BodyValue::Object(entries) => {
            for (sub, child) in entries {
                flatten_into(&format!("{key}[{sub}]"), child, out);
            }
        }
        BodyValue::File(file) => out.push(FlatEntry::File(key.to_string(), file.clone())),
        BodyValue::Blob(blob) => out.push(FlatEntry::Blob(key.to_string(), blob.clone())),
        leaf => {
            if let Some(text) = leaf.leaf_text() {
                out.push(FlatEntry::Field(key.to_string(), text));
            }
        }
    }
}

pub fn to_urlencoded(value: &BodyValue) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for entry in flatten(value) {
        match entry {
            FlatEntry::Field(key, text) => {
                serializer.append_pair(&key, &text);
            }
            FlatEntry::File(key, _) | FlatEntry::Blob(key, _) => {
                warn!(%key, "binary value skipped in url-encoded body");
            }
        }
    }
    serializer.finish()
}

pub fn to_multipart(value: &BodyValue) -> MultipartForm {
    let mut form = MultipartForm::new();
    for entry in flatten(value) {
        let part = match entry {
            FlatEntry::Field(name, value) => MultipartPart::Field { name, value },
            FlatEntry::File(name, mut file) => {
                file.file_name.get_or_insert_with(|| DEFAULT_FILE_NAME.to_string());
                MultipartPart::File { name, file }
            }
            FlatEntry::Blob(name, blob) => MultipartPart::Blob { name, blob },
        };
        form.push(part);
    }
    form
}

fn form_pairs(mode: SerializationMode, pairs: Vec<(String, String)>) -> RequestBody {
    match mode {
        SerializationMode::UrlEncoded => RequestBody::Form(
            form_urlencoded::Serializer::new(String::new())
                .extend_pairs(&pairs)
                .finish(),
        ),
        // Repeated keys keep the last value.
        SerializationMode::Structured => {
            let object: serde_json::Map<String, serde_json::Value> = pairs
                .into_iter()
                .map(|(key, value)| (key, serde_json::Value::String(value)))
                .collect();
            RequestBody::Text(serde_json::Value::Object(object).to_string())
        }
        SerializationMode::Multipart => RequestBody::Multipart(
            pairs
                .into_iter()
                .fold(MultipartForm::new(), |form, (name, value)| form.text(name, value)),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn sorted(text: &str) -> Vec<String> {
        let mut pairs: Vec<String> = text.split('&').map(str::to_string).collect();
        pairs.sort();
        pairs
    }

    fn field_keys(form: &MultipartForm) -> Vec<&str> {
        form.parts()
            .iter()
            .filter(|part| matches!(part, MultipartPart::Field { .. }))
            .map(MultipartPart::name)
            .collect()
    }

    #[test]
    fn nested_objects_and_arrays_use_bracket_paths() {
        let value = BodyValue::from(json!({ "a": { "b": 1 }, "c": [1, 2] }));
        let encoded = to_urlencoded(&value);
        assert_eq!(sorted(&encoded), sorted("a%5Bb%5D=1&c%5B%5D=1&c%5B%5D=2"));
    }

    #[test]
    fn flatten_produces_raw_bracket_keys() {
        let value = BodyValue::from(json!({ "user": { "tags": ["x", "y"] } }));
        let keys: Vec<String> = flatten(&value).iter().map(|e| e.key().to_string()).collect();
        assert_eq!(keys, vec!["user[tags][]", "user[tags][]"]);
    }

    #[test]
    fn null_fields_are_kept_empty() {
        let value = BodyValue::object([("nickname", BodyValue::Null), ("name", BodyValue::from("bo"))]);
        assert_eq!(to_urlencoded(&value), "nickname=&name=bo");
    }

    #[test]
    fn dates_flatten_to_iso_strings() {
        let date = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let value = BodyValue::object([("since", date)]);
        assert_eq!(
            flatten(&value),
            vec![FlatEntry::Field("since".into(), "2024-01-02T03:04:05.000Z".into())]
        );
    }

    #[test]
    fn structured_mode_emits_json_text() {
        let body = Body::from(json!({ "email": "a@b.c" }));
        let RequestBody::Text(text) = serialize_body(SerializationMode::Structured, body).unwrap() else {
            panic!("expected text body");
        };
        assert_eq!(text, r#"{"email":"a@b.c"}"#);
    }

    #[test]
    fn preencoded_form_passes_through() {
        let body = Body::Form(vec![("grant_type".into(), "password".into())]);
        let out = serialize_body(SerializationMode::UrlEncoded, body).unwrap();
        assert_eq!(out, RequestBody::Form("grant_type=password".into()));
    }

    #[test]
    fn preencoded_form_follows_structured_mode() {
        let body = Body::Form(vec![("a".into(), "1".into()), ("b".into(), "x y".into())]);
        let out = serialize_body(SerializationMode::Structured, body).unwrap();
        assert_eq!(out, RequestBody::Text(r#"{"a":"1","b":"x y"}"#.into()));
    }

    #[test]
    fn preencoded_form_follows_multipart_mode() {
        let body = Body::Form(vec![("a".into(), "1".into())]);
        let out = serialize_body(SerializationMode::Multipart, body).unwrap();
        assert_eq!(out, RequestBody::Multipart(MultipartForm::new().text("a", "1")));
    }

    #[test]
    fn prebuilt_multipart_passes_through() {
        let form = MultipartForm::new().text("kept", "as-is");
        let out = serialize_body(SerializationMode::Multipart, Body::Multipart(form.clone())).unwrap();
        assert_eq!(out, RequestBody::Multipart(form));
    }

    #[test]
    fn multipart_files_default_their_name() {
        let value = BodyValue::object([
            ("doc", BodyValue::File(FilePart { file_name: None, content_type: None, data: vec![1] })),
            ("raw", BodyValue::Blob(Blob::new(vec![2]))),
        ]);
        let form = to_multipart(&value);
        match &form.parts()[0] {
            MultipartPart::File { name, file } => {
                assert_eq!(name, "doc");
                assert_eq!(file.file_name.as_deref(), Some(DEFAULT_FILE_NAME));
            }
            other => panic!("expected file part, got {other:?}"),
        }
        assert!(matches!(&form.parts()[1], MultipartPart::Blob { name, .. } if name == "raw"));
    }

    #[test]
    fn multipart_and_urlencoded_share_key_paths() {
        let value = BodyValue::object([
            ("profile", BodyValue::from(json!({ "name": "ana", "langs": ["en", "fr"], "bio": null }))),
            ("avatar", BodyValue::File(FilePart::new("a.png", vec![0]))),
        ]);

        let form = to_multipart(&value);
        let encoded = to_urlencoded(&value);
        let url_keys: Vec<String> = form_urlencoded::parse(encoded.as_bytes())
            .map(|(key, _)| key.into_owned())
            .collect();

        assert_eq!(field_keys(&form), url_keys);
        assert_eq!(
            url_keys,
            vec!["profile[bio]", "profile[langs][]", "profile[langs][]", "profile[name]"]
        );
    }

    #[test]
    fn urlencoded_skips_binary() {
        let value = BodyValue::object([("blob", BodyValue::Blob(Blob::new(vec![1])))]);
        assert_eq!(to_urlencoded(&value), "");
    }
}
