//! Query/body placement of request payloads and query-string rendering.

use serde_json::{Map, Value};

use crate::http::{HttpMethod, RequestBody};

/// Renders a parameter map as a query string (without the leading `?`).
pub trait QuerySerializer: Send + Sync {
    /// Serialize `params`.
    fn serialize(&self, params: &Map<String, Value>) -> String;
}

impl<F> QuerySerializer for F
where
    F: Fn(&Map<String, Value>) -> String + Send + Sync,
{
    fn serialize(&self, params: &Map<String, Value>) -> String {
        self(params)
    }
}

/// `application/x-www-form-urlencoded` query serializer.
///
/// Arrays repeat their key (`tag=a&tag=b`), nested objects use bracket
/// notation (`filter[name]=x`) and `null` renders as an empty value.
#[derive(Clone, Copy, Debug, Default)]
pub struct UrlEncodedSerializer;

impl QuerySerializer for UrlEncodedSerializer {
    fn serialize(&self, params: &Map<String, Value>) -> String {
        let mut out = url::form_urlencoded::Serializer::new(String::new());
        for (key, value) in flatten(params) {
            out.append_pair(&key, &value);
        }
        out.finish()
    }
}

/// Flatten a parameter map into ordered key/value pairs.
pub fn flatten(params: &Map<String, Value>) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    for (key, value) in params {
        push_pairs(&mut pairs, key.clone(), value);
    }
    pairs
}

fn push_pairs(pairs: &mut Vec<(String, String)>, key: String, value: &Value) {
    match value {
        Value::Array(items) => {
            for item in items {
                push_pairs(pairs, key.clone(), item);
            }
        }
        Value::Object(fields) => {
            for (sub, item) in fields {
                push_pairs(pairs, format!("{key}[{sub}]"), item);
            }
        }
        other => pairs.push((key, scalar_to_string(other))),
    }
}

/// Render a scalar JSON value the way a form field carries it.
pub(crate) fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Drop top-level entries whose value is `null` or the empty string.
pub fn filter_empty_params(params: &Map<String, Value>) -> Map<String, Value> {
    params
        .iter()
        .filter(|(_, v)| !matches!(v, Value::Null) && v.as_str() != Some(""))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/// Where a request's payload ended up.
#[derive(Clone, Debug, Default)]
pub struct Placement {
    /// Query parameters.
    pub query: Option<Value>,
    /// Body payload.
    pub body: Option<Value>,
}

/// Decide whether `params` and `data` travel as query or body.
///
/// With auto-differentiation, query-style methods send their payload
/// (`params`, or `data` when no params were given) as query parameters and
/// no body. Body methods send `data` as the body and `params` as the query;
/// with no `data` the params become the body. Without auto-differentiation
/// both are used exactly as given.
pub fn place(
    method: HttpMethod,
    params: Option<Value>,
    data: Option<Value>,
    auto_differentiate: bool,
) -> Placement {
    if !auto_differentiate {
        return Placement {
            query: params,
            body: data,
        };
    }
    if method.is_query_style() {
        Placement {
            query: params.or(data),
            body: None,
        }
    } else if data.is_some() {
        Placement { query: params, body: data }
    } else {
        Placement {
            query: None,
            body: params,
        }
    }
}

/// Render query parameters onto `url` or into explicit pairs.
///
/// Returns the (possibly extended) URL and the pairs left for the transport.
/// Filtering applies only to object-shaped params. When a serializer is
/// given it renders the query string onto the URL; otherwise the flattened
/// pairs are returned for the transport to encode.
pub(crate) fn apply_query(
    url: &str,
    query: Option<Value>,
    filter_empty: bool,
    serializer: Option<&dyn QuerySerializer>,
) -> (String, Vec<(String, String)>) {
    let map = match query {
        Some(Value::Object(map)) if filter_empty => filter_empty_params(&map),
        Some(Value::Object(map)) => map,
        Some(Value::Null) | None => return (url.to_string(), Vec::new()),
        Some(other) => {
            tracing::debug!(target: crate::logging::targets::KIT, "ignoring non-object query params: {other}");
            return (url.to_string(), Vec::new());
        }
    };

    match serializer {
        Some(serializer) => {
            let rendered = serializer.serialize(&map);
            if rendered.is_empty() {
                return (url.to_string(), Vec::new());
            }
            let separator = if url.contains('?') { '&' } else { '?' };
            (format!("{url}{separator}{rendered}"), Vec::new())
        }
        None => (url.to_string(), flatten(&map)),
    }
}

/// Turn a JSON payload into a request body.
pub(crate) fn body_from_value(value: Option<Value>) -> RequestBody {
    match value {
        None | Some(Value::Null) => RequestBody::None,
        Some(Value::String(text)) => RequestBody::Text(text),
        Some(other) => RequestBody::Json(other),
    }
}
