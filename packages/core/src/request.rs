//! Outgoing request descriptors and query-parameter encoding.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReqMethod {
    Get,
    Post,
}

impl ReqMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReqMethod::Get => "GET",
            ReqMethod::Post => "POST",
        }
    }
}

impl fmt::Display for ReqMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Query values
// ---------------------------------------------------------------------------

/// A query-parameter value.
///
/// The set of encodable shapes is closed: plain strings, anything with a
/// canonical text form, and flat lists of those. Lists are sent as a single
/// comma-joined value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryValue {
    Str(String),
    Text(String),
    List(Vec<QueryValue>),
}

impl QueryValue {
    /// Use the canonical text form of `value`.
    pub fn text<T: fmt::Display + ?Sized>(value: &T) -> Self {
        QueryValue::Text(value.to_string())
    }

    pub fn list<I>(items: I) -> Self
    where
        I: IntoIterator,
        I::Item: fmt::Display,
    {
        QueryValue::List(items.into_iter().map(|v| QueryValue::text(&v)).collect())
    }

    /// Derive a value from a serde-serializable one.
    ///
    /// Scalars become [`QueryValue::Text`] (strings stay [`QueryValue::Str`]),
    /// sequences become [`QueryValue::List`]. Maps and null are rejected.
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> Result<Self, ApiError> {
        let json = serde_json::to_value(value)
            .map_err(|e| ApiError::ClientUsage(format!("failed to encode query value: {e}")))?;
        Self::from_json(json)
    }

    fn from_json(value: serde_json::Value) -> Result<Self, ApiError> {
        use serde_json::Value;
        match value {
            Value::String(s) => Ok(QueryValue::Str(s)),
            Value::Number(n) => Ok(QueryValue::Text(n.to_string())),
            Value::Bool(b) => Ok(QueryValue::Text(b.to_string())),
            Value::Array(items) => items
                .into_iter()
                .map(Self::from_json)
                .collect::<Result<Vec<_>, _>>()
                .map(QueryValue::List),
            Value::Null | Value::Object(_) => Err(ApiError::ClientUsage(
                "failed to encode query value: unknown type".into(),
            )),
        }
    }

    fn encode(&self, key: &str) -> Result<String, ApiError> {
        match self {
            QueryValue::Str(s) | QueryValue::Text(s) => Ok(s.clone()),
            QueryValue::List(items) => {
                let parts = items
                    .iter()
                    .map(|item| match item {
                        QueryValue::Str(s) | QueryValue::Text(s) => Ok(s.as_str()),
                        QueryValue::List(_) => Err(ApiError::ClientUsage(format!(
                            "failed to encode query key '{key}': unknown type"
                        ))),
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(parts.join(","))
            }
        }
    }
}

impl From<String> for QueryValue {
    fn from(s: String) -> Self {
        QueryValue::Str(s)
    }
}

impl From<&str> for QueryValue {
    fn from(s: &str) -> Self {
        QueryValue::Str(s.to_string())
    }
}

/// Query parameters keyed by name. Keys are unique and iterate in sorted
/// order, so encoding is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query(BTreeMap<String, QueryValue>);

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<QueryValue>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Like [`Query::with`], skipping `None`.
    pub fn with_opt(self, key: impl Into<String>, value: Option<impl Into<QueryValue>>) -> Self {
        match value {
            Some(v) => self.with(key, v),
            None => self,
        }
    }

    pub fn get(&self, key: &str) -> Option<&QueryValue> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Render as `k=v&k2=v2`, percent-encoding keys and values.
    pub fn encode(&self) -> Result<String, ApiError> {
        let pairs = self
            .0
            .iter()
            .map(|(key, value)| {
                let raw = value.encode(key)?;
                Ok(format!(
                    "{}={}",
                    urlencoding::encode(key),
                    urlencoding::encode(&raw)
                ))
            })
            .collect::<Result<Vec<_>, ApiError>>()?;
        Ok(pairs.join("&"))
    }
}

impl<K: Into<String>, V: Into<QueryValue>> FromIterator<(K, V)> for Query {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

// ---------------------------------------------------------------------------
// Request descriptor
// ---------------------------------------------------------------------------

/// Everything a transport needs to issue one request.
///
/// Only POST descriptors carry a body. Descriptors are consumed by value
/// when dispatched.
#[derive(Debug, Clone)]
pub struct RequestDescriptor<B = ()> {
    method: ReqMethod,
    path: String,
    body: Option<B>,
    query: Query,
}

impl RequestDescriptor<()> {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: ReqMethod::Get,
            path: path.into(),
            body: None,
            query: Query::default(),
        }
    }
}

impl<B> RequestDescriptor<B> {
    pub fn post(path: impl Into<String>, body: B) -> Self {
        Self {
            method: ReqMethod::Post,
            path: path.into(),
            body: Some(body),
            query: Query::default(),
        }
    }

    pub fn with_query(mut self, query: Query) -> Self {
        self.query = query;
        self
    }

    pub fn method(&self) -> ReqMethod {
        self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn body(&self) -> Option<&B> {
        self.body.as_ref()
    }

    /// Join `base` and the path with exactly one `/`, then append the
    /// encoded query if there is one.
    pub fn url(&self, base: &str) -> Result<String, ApiError> {
        let mut url = format!(
            "{}/{}",
            base.trim_end_matches('/'),
            self.path.trim_start_matches('/')
        );
        if !self.query.is_empty() {
            url.push('?');
            url.push_str(&self.query.encode()?);
        }
        Ok(url)
    }
}
