//! Query-string encoding for `get` calls.
//!
//! Null values are dropped entirely and list values repeat their key
//! (`tag=a&tag=b`), matching what form-style backends expect from a
//! search-params encoder.

use std::fmt;

use url::form_urlencoded;

/// A single query value.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Str(s) => f.write_str(s),
            Scalar::Int(n) => write!(f, "{n}"),
            Scalar::Float(n) => write!(f, "{n}"),
            Scalar::Bool(b) => write!(f, "{b}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum QueryValue {
    Null,
    Scalar(Scalar),
    List(Vec<Option<Scalar>>),
}

/// Ordered query parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryParams {
    entries: Vec<(String, QueryValue)>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<QueryValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<QueryValue>) {
        self.entries.push((key.into(), value.into()));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &QueryValue)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<QueryValue>> FromIterator<(K, V)> for QueryParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = QueryParams::new();
        for (key, value) in iter {
            params.insert(key, value);
        }
        params
    }
}

/// Encode `params` as `?k=v&...`, or `""` when nothing survives.
pub fn encode_query(params: &QueryParams) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    let mut appended = false;
    for (key, value) in params.iter() {
        match value {
            QueryValue::Null => {}
            QueryValue::Scalar(scalar) => {
                serializer.append_pair(key, &scalar.to_string());
                appended = true;
            }
            QueryValue::List(items) => {
                for scalar in items.iter().flatten() {
                    serializer.append_pair(key, &scalar.to_string());
                    appended = true;
                }
            }
        }
    }
    if appended {
        format!("?{}", serializer.finish())
    } else {
        String::new()
    }
}

macro_rules! scalar_from {
    ($($ty:ty => $variant:ident($conv:expr)),* $(,)?) => {
        $(
            impl From<$ty> for Scalar {
                fn from(value: $ty) -> Self {
                    Scalar::$variant($conv(value))
                }
            }

            impl From<$ty> for QueryValue {
                fn from(value: $ty) -> Self {
                    QueryValue::Scalar(value.into())
                }
            }

            impl From<Option<$ty>> for QueryValue {
                fn from(value: Option<$ty>) -> Self {
                    value.map_or(QueryValue::Null, |v| QueryValue::Scalar(v.into()))
                }
            }

            impl From<Vec<$ty>> for QueryValue {
                fn from(value: Vec<$ty>) -> Self {
                    QueryValue::List(value.into_iter().map(|v| Some(v.into())).collect())
                }
            }

            impl From<Vec<Option<$ty>>> for QueryValue {
                fn from(value: Vec<Option<$ty>>) -> Self {
                    QueryValue::List(value.into_iter().map(|v| v.map(Into::into)).collect())
                }
            }
        )*
    };
}

scalar_from! {
    &str => Str(str::to_string),
    String => Str(std::convert::identity),
    i32 => Int(i64::from),
    i64 => Int(std::convert::identity),
    u32 => Int(i64::from),
    f64 => Float(std::convert::identity),
    bool => Bool(std::convert::identity),
}
