//! Request header assembly.
//!
//! Precedence is fixed: mode defaults, then caller headers, then the
//! no-cache directives, which always win. Names are stored lower-cased and
//! merged case-insensitively.

use crate::config::SerializationMode;

pub const JSON_CONTENT_TYPE: &str = "application/json";
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

const FORCED_NO_CACHE: [(&str, &str); 2] = [("cache-control", "no-store"), ("pragma", "no-cache")];

pub fn build_headers(
    mode: SerializationMode,
    token: Option<&str>,
    overrides: &[(String, String)],
) -> Vec<(String, String)> {
    let mut headers = vec![("accept".to_string(), JSON_CONTENT_TYPE.to_string())];

    // Multipart leaves content-type to the transport, which owns the boundary.
    match mode {
        SerializationMode::Structured => set(&mut headers, "content-type", JSON_CONTENT_TYPE),
        SerializationMode::UrlEncoded => set(&mut headers, "content-type", FORM_CONTENT_TYPE),
        SerializationMode::Multipart => {}
    }

    if let Some(token) = token {
        set(&mut headers, "authorization", &format!("Bearer {token}"));
    }

    for (name, value) in overrides {
        set(&mut headers, name, value);
    }

    for (name, value) in FORCED_NO_CACHE {
        set(&mut headers, name, value);
    }

    headers
}

fn set(headers: &mut Vec<(String, String)>, name: &str, value: &str) {
    let name = name.to_ascii_lowercase();
    match headers.iter_mut().find(|(key, _)| *key == name) {
        Some(entry) => entry.1 = value.to_string(),
        None => headers.push((name, value.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
        headers.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
    }

    #[test]
    fn structured_mode_declares_json() {
        let headers = build_headers(SerializationMode::Structured, None, &[]);
        assert_eq!(get(&headers, "accept"), Some(JSON_CONTENT_TYPE));
        assert_eq!(get(&headers, "content-type"), Some(JSON_CONTENT_TYPE));
        assert_eq!(get(&headers, "authorization"), None);
    }

    #[test]
    fn urlencoded_mode_declares_form() {
        let headers = build_headers(SerializationMode::UrlEncoded, None, &[]);
        assert_eq!(get(&headers, "content-type"), Some(FORM_CONTENT_TYPE));
    }

    #[test]
    fn multipart_leaves_content_type_unset() {
        let headers = build_headers(SerializationMode::Multipart, None, &[]);
        assert_eq!(get(&headers, "content-type"), None);
        assert_eq!(get(&headers, "accept"), Some(JSON_CONTENT_TYPE));
    }

    #[test]
    fn token_adds_bearer_authorization() {
        let headers = build_headers(SerializationMode::Structured, Some("abc"), &[]);
        assert_eq!(get(&headers, "authorization"), Some("Bearer abc"));
    }

    #[test]
    fn caller_headers_override_mode_defaults() {
        let overrides = vec![("Content-Type".to_string(), "text/plain".to_string())];
        let headers = build_headers(SerializationMode::Structured, None, &overrides);
        assert_eq!(get(&headers, "content-type"), Some("text/plain"));
        assert_eq!(headers.iter().filter(|(k, _)| k == "content-type").count(), 1);
    }

    #[test]
    fn no_cache_directives_always_win() {
        let overrides = vec![
            ("Cache-Control".to_string(), "max-age=3600".to_string()),
            ("PRAGMA".to_string(), "cache".to_string()),
        ];
        let headers = build_headers(SerializationMode::UrlEncoded, None, &overrides);
        assert_eq!(get(&headers, "cache-control"), Some("no-store"));
        assert_eq!(get(&headers, "pragma"), Some("no-cache"));
    }
}
