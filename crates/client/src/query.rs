//! Query-string construction for GET requests.

use serde_json::{Map, Value};

/// Ordered query parameters. Keys keep insertion order and repeat freely.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a pair; the value is coerced with `to_string`.
    pub fn with(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.push(key, value);
        self
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl ToString) {
        self.pairs.push((key.into(), value.to_string()));
    }

    /// Build from a JSON object, keeping its key order. Strings are
    /// taken as-is, everything else is rendered as JSON text.
    pub fn from_json(object: &Map<String, Value>) -> Self {
        let pairs = object
            .iter()
            .map(|(k, v)| {
                let value = match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (k.clone(), value)
            })
            .collect();
        Self { pairs }
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    /// `k1=v1&k2=v2`, percent-encoded.
    pub fn encode(&self) -> String {
        self.pairs
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&")
    }

    /// Append the encoded query to `url`. Nothing is appended when empty.
    pub fn append_to(&self, url: &str) -> String {
        if self.is_empty() {
            return url.to_string();
        }
        let separator = if url.contains('?') { '&' } else { '?' };
        format!("{url}{separator}{}", self.encode())
    }

    /// Inverse of [`encode`](Self::encode).
    pub fn parse(query: &str) -> Self {
        let pairs = query
            .trim_start_matches('?')
            .split('&')
            .filter(|segment| !segment.is_empty())
            .map(|segment| {
                let (k, v) = segment.split_once('=').unwrap_or((segment, ""));
                (decode(k), decode(v))
            })
            .collect();
        Self { pairs }
    }
}

fn decode(component: &str) -> String {
    let component = component.replace('+', " ");
    let decoded = urlencoding::decode(&component).map(|s| s.into_owned());
    decoded.unwrap_or(component)
}

impl<K, V> FromIterator<(K, V)> for QueryParams
where
    K: Into<String>,
    V: ToString,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = QueryParams::new();
        for (k, v) in iter {
            params.push(k, v);
        }
        params
    }
}

impl<K, V, const N: usize> From<[(K, V); N]> for QueryParams
where
    K: Into<String>,
    V: ToString,
{
    fn from(value: [(K, V); N]) -> Self {
        value.into_iter().collect()
    }
}
