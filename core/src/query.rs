//! Query-string parameters.
//!
//! Absent values (`None`) are dropped when the query is written to a URL;
//! they never appear as empty or placeholder text. Non-finite floats are
//! treated as absent. Arrays are written as repeated `key[]=value` pairs.

use url::Url;

#[derive(Debug, Clone, PartialEq)]
pub enum QueryValue {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    List(Vec<String>),
}

impl QueryValue {
    fn scalar(&self) -> Option<String> {
        match self {
            QueryValue::Text(s) => Some(s.clone()),
            QueryValue::Int(n) => Some(n.to_string()),
            QueryValue::Float(n) => n.is_finite().then(|| n.to_string()),
            QueryValue::Bool(b) => Some(b.to_string()),
            QueryValue::List(_) => None,
        }
    }
}

/// Conversion into an optional query value. `Option<T>` maps `None` to an
/// absent parameter.
pub trait ToQueryValue {
    fn to_query_value(self) -> Option<QueryValue>;
}

impl ToQueryValue for QueryValue {
    fn to_query_value(self) -> Option<QueryValue> {
        Some(self)
    }
}

impl ToQueryValue for &str {
    fn to_query_value(self) -> Option<QueryValue> {
        Some(QueryValue::Text(self.to_string()))
    }
}

impl ToQueryValue for String {
    fn to_query_value(self) -> Option<QueryValue> {
        Some(QueryValue::Text(self))
    }
}

impl ToQueryValue for &String {
    fn to_query_value(self) -> Option<QueryValue> {
        Some(QueryValue::Text(self.clone()))
    }
}

impl ToQueryValue for bool {
    fn to_query_value(self) -> Option<QueryValue> {
        Some(QueryValue::Bool(self))
    }
}

impl ToQueryValue for i64 {
    fn to_query_value(self) -> Option<QueryValue> {
        Some(QueryValue::Int(self))
    }
}

impl ToQueryValue for u32 {
    fn to_query_value(self) -> Option<QueryValue> {
        Some(QueryValue::Int(i64::from(self)))
    }
}

impl ToQueryValue for f64 {
    fn to_query_value(self) -> Option<QueryValue> {
        self.is_finite().then_some(QueryValue::Float(self))
    }
}

impl ToQueryValue for Vec<String> {
    fn to_query_value(self) -> Option<QueryValue> {
        Some(QueryValue::List(self))
    }
}

impl<T: ToQueryValue> ToQueryValue for Option<T> {
    fn to_query_value(self) -> Option<QueryValue> {
        self.and_then(ToQueryValue::to_query_value)
    }
}

/// Ordered query parameters for one call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    params: Vec<(String, Option<QueryValue>)>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn param(mut self, key: impl Into<String>, value: impl ToQueryValue) -> Self {
        self.params.push((key.into(), value.to_query_value()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.params.iter().all(|(_, v)| match v {
            None => true,
            Some(QueryValue::List(items)) => items.is_empty(),
            Some(QueryValue::Float(n)) => !n.is_finite(),
            Some(_) => false,
        })
    }

    /// Append every present parameter to `url`.
    pub fn append_to(&self, url: &mut Url) {
        if self.is_empty() {
            return;
        }
        let mut pairs = url.query_pairs_mut();
        for (key, value) in &self.params {
            match value {
                None => {}
                Some(QueryValue::List(items)) => {
                    let key = format!("{key}[]");
                    for item in items {
                        pairs.append_pair(&key, item);
                    }
                }
                Some(scalar) => {
                    if let Some(text) = scalar.scalar() {
                        pairs.append_pair(key, &text);
                    }
                }
            }
        }
    }
}
