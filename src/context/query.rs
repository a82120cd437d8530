use std::collections::HashMap;

use serde::Serialize;

/// A query value: a single string, or every value of a repeated key in arrival order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum QueryValue {
    Single(String),
    Multi(Vec<String>),
}

impl QueryValue {
    /// First value for the key.
    #[must_use]
    pub fn first(&self) -> Option<&str> {
        match self {
            QueryValue::Single(v) => Some(v),
            QueryValue::Multi(vs) => vs.first().map(String::as_str),
        }
    }

    /// Every value for the key, in order.
    #[must_use]
    pub fn all(&self) -> Vec<&str> {
        match self {
            QueryValue::Single(v) => vec![v.as_str()],
            QueryValue::Multi(vs) => vs.iter().map(String::as_str).collect(),
        }
    }

    fn push(&mut self, value: String) {
        match self {
            QueryValue::Single(existing) => {
                let first = std::mem::take(existing);
                *self = QueryValue::Multi(vec![first, value]);
            }
            QueryValue::Multi(vs) => vs.push(value),
        }
    }
}

/// Parsed query string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Query {
    values: HashMap<String, QueryValue>,
}

impl Query {
    /// Parse `a=1&b=2&a=3` (no leading `?`). Repeated keys accumulate instead of overwriting.
    #[must_use]
    pub fn parse(query: &str) -> Self {
        let mut values: HashMap<String, QueryValue> = HashMap::new();
        for (k, v) in url::form_urlencoded::parse(query.as_bytes()) {
            match values.get_mut(k.as_ref()) {
                Some(existing) => existing.push(v.into_owned()),
                None => {
                    values.insert(k.into_owned(), QueryValue::Single(v.into_owned()));
                }
            }
        }
        Self { values }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&QueryValue> {
        self.values.get(key)
    }

    /// First value for `key`.
    #[must_use]
    pub fn first(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(QueryValue::first)
    }

    /// All values for `key`; empty when absent.
    #[must_use]
    pub fn all(&self, key: &str) -> Vec<&str> {
        self.values.get(key).map(QueryValue::all).unwrap_or_default()
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &QueryValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}
