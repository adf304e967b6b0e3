//! Turns a call descriptor plus positional arguments into an `HttpRequest`.
//!
//! # Design
//! Arguments carry no declared names, so they are interpreted by shape. The
//! interpretation happens in two passes:
//!
//! 1. `intents` walks a fixed, ordered decision table and emits the
//!    `CallIntent`s it selects.
//! 2. `Resolver::resolve` applies those intents in order to the descriptor.
//!
//! Decision table, first matching row per rule:
//!
//! | # | Condition | Intent |
//! |---|-----------|--------|
//! | 1 | no args, GET | `ListAll` (alternate path) |
//! | 2 | args, GET/DELETE/PUT, `args[1]` is a lookup tag | `ByAlternateKey` |
//! |   | else `args[0]` is an identifier | `ById` |
//! |   | else | `AlternatePath` |
//! |   | PUT | `WithBody(args[1])` |
//! | 3 | PUT/DELETE on a `customFields` path | `WithBody(args[0])` |
//! | 4 | POST, `args[0]` is an identifier | `ById`, `WithBody(args[1])` if present |
//! |   | POST otherwise | `WithBody(args[0])` |
//! | 5 | `query_params` descriptor | `WithQuery` for every flat object |
//! | 6 | `delivery_manifest` descriptor | `Manifest` for every manifest shape |
//!
//! Bodies and paths are last-writer-wins when applied; query parameters and
//! headers accumulate.
//!
//! The final URL is parsed and re-serialized by `url::Url`, so it is
//! normalized: a default port such as `:443` is dropped and unsafe characters
//! are percent-encoded. For an already-normalized base it equals
//! `base_url + path`.

use std::time::Duration;

use serde_json::{json, Map, Value};
use url::Url;

use crate::descriptor::{is_identifier, replace_with_id, replace_with_lookup, CallDescriptor, LookupKey};
use crate::error::{ApiError, Result};
use crate::http::{merge_headers, HttpMethod, HttpRequest};

const CUSTOM_FIELDS_SEGMENT: &str = "customFields";
const PROVIDER_KEY_HEADER: &str = "X-API-KEY";
const MANIFEST_GENERATE_PATH: &str = "providers/manifest/generate";

/// What a call's arguments were recognized as.
#[derive(Debug, Clone, PartialEq)]
pub enum CallIntent {
    /// No arguments on a read: the alternate ("list all") path.
    ListAll,
    ById(String),
    ByAlternateKey { key: LookupKey, value: String },
    /// Arguments present but not identifying: the alternate path.
    AlternatePath,
    /// `Value::Null` stands for an absent positional argument.
    WithBody(Value),
    WithQuery(Vec<(String, String)>),
    Manifest(ManifestRequest),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ManifestRequest {
    /// Replaces the body with a manifest generation request.
    Generate { hub_id: String, worker_id: String },
    /// Adds a provider authorization header.
    ProviderKey(String),
    DateRange { start: Option<String>, end: Option<String> },
}

/// Evaluate the decision table for one call.
pub fn intents(descriptor: &CallDescriptor, args: &[Value]) -> Vec<CallIntent> {
    let mut out = Vec::new();
    let method = descriptor.method;
    let first = args.first();
    let second = args.get(1);

    if args.is_empty() && method == HttpMethod::Get && descriptor.alt_path.is_some() {
        out.push(CallIntent::ListAll);
    }

    if !args.is_empty() && matches!(method, HttpMethod::Get | HttpMethod::Delete | HttpMethod::Put) {
        let tag = second.and_then(Value::as_str).and_then(LookupKey::from_tag);
        match (tag, first.and_then(Value::as_str)) {
            (Some(key), _) => out.push(CallIntent::ByAlternateKey {
                key,
                value: lookup_value(first),
            }),
            (None, Some(id)) if is_identifier(id) => out.push(CallIntent::ById(id.to_string())),
            _ => out.push(CallIntent::AlternatePath),
        }
        if method == HttpMethod::Put {
            out.push(CallIntent::WithBody(second.cloned().unwrap_or(Value::Null)));
        }
    }

    if matches!(method, HttpMethod::Put | HttpMethod::Delete)
        && target_path(descriptor, &out).contains(CUSTOM_FIELDS_SEGMENT)
    {
        out.push(CallIntent::WithBody(first.cloned().unwrap_or(Value::Null)));
    }

    if method == HttpMethod::Post {
        match first.and_then(Value::as_str) {
            Some(id) if is_identifier(id) => {
                out.push(CallIntent::ById(id.to_string()));
                if let Some(body) = second.filter(|v| !v.is_null()) {
                    out.push(CallIntent::WithBody(body.clone()));
                }
            }
            _ => out.push(CallIntent::WithBody(first.cloned().unwrap_or(Value::Null))),
        }
    }

    if descriptor.query_params {
        out.extend(args.iter().filter_map(flat_query).map(CallIntent::WithQuery));
    }

    if descriptor.delivery_manifest {
        for arg in args.iter().filter_map(Value::as_object) {
            if let (Some(hub_id), Some(worker_id)) = (truthy(arg, "hubId"), truthy(arg, "workerId")) {
                out.push(CallIntent::Manifest(ManifestRequest::Generate { hub_id, worker_id }));
            }
            if let Some(key) = truthy(arg, "googleApiKey") {
                out.push(CallIntent::Manifest(ManifestRequest::ProviderKey(key)));
            }
            let (start, end) = (truthy(arg, "startDate"), truthy(arg, "endDate"));
            if start.is_some() || end.is_some() {
                out.push(CallIntent::Manifest(ManifestRequest::DateRange { start, end }));
            }
        }
    }

    out
}

/// Path template selected by the path intents emitted so far, with
/// substitutions applied. Used for the `customFields` check.
fn target_path(descriptor: &CallDescriptor, intents: &[CallIntent]) -> String {
    intents.iter().fold(descriptor.path.to_string(), |path, intent| match intent {
        CallIntent::ListAll | CallIntent::AlternatePath => alternate(descriptor).to_string(),
        CallIntent::ById(id) => replace_with_id(&path, id),
        CallIntent::ByAlternateKey { key, value } => replace_with_lookup(&path, *key, value),
        _ => path,
    })
}

/// The alternate path, or the primary one when the descriptor has none.
fn alternate(descriptor: &CallDescriptor) -> &'static str {
    descriptor.alt_path.unwrap_or(descriptor.path)
}

fn lookup_value(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// A non-empty object whose values are all scalars.
fn flat_query(value: &Value) -> Option<Vec<(String, String)>> {
    let map = value.as_object().filter(|m| !m.is_empty())?;
    map.iter()
        .map(|(k, v)| scalar_to_string(v).map(|v| (k.clone(), v)))
        .collect()
}

/// Field value if present and not falsy (`null`, `false`, `0`, `""`).
fn truthy(map: &Map<String, Value>, key: &str) -> Option<String> {
    match map.get(key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) if n.as_f64() != Some(0.0) => Some(n.to_string()),
        Value::Bool(true) => Some("true".to_string()),
        _ => None,
    }
}

/// Resolution context taken from the owning client.
#[derive(Debug, Clone)]
pub struct Resolver<'a> {
    pub base_url: &'a str,
    pub headers: &'a [(String, String)],
    pub default_timeout: Duration,
}

impl Resolver<'_> {
    pub fn resolve(&self, descriptor: &CallDescriptor, args: &[Value]) -> Result<HttpRequest> {
        let mut url = format!("{}{}", self.base_url, descriptor.path);
        let mut body = Value::Null;
        let mut query: Vec<(String, String)> = Vec::new();
        let mut extra_headers: Vec<(String, String)> = Vec::new();

        for intent in intents(descriptor, args) {
            match intent {
                CallIntent::ListAll | CallIntent::AlternatePath => {
                    url = format!("{}{}", self.base_url, alternate(descriptor));
                }
                CallIntent::ById(id) => url = replace_with_id(&url, &id),
                CallIntent::ByAlternateKey { key, value } => url = replace_with_lookup(&url, key, &value),
                CallIntent::WithBody(value) => body = value,
                CallIntent::WithQuery(pairs) => query.extend(pairs),
                CallIntent::Manifest(ManifestRequest::Generate { hub_id, worker_id }) => {
                    body = json!({
                        "path": format!("{MANIFEST_GENERATE_PATH}?hubId={hub_id}&workerId={worker_id}"),
                        "method": "GET",
                    });
                }
                CallIntent::Manifest(ManifestRequest::ProviderKey(key)) => {
                    extra_headers.push((PROVIDER_KEY_HEADER.to_string(), format!("Google {key}")));
                }
                CallIntent::Manifest(ManifestRequest::DateRange { start, end }) => {
                    query.extend(start.map(|s| ("startDate".to_string(), s)));
                    query.extend(end.map(|e| ("endDate".to_string(), e)));
                }
            }
        }

        let mut parsed = Url::parse(&url).map_err(|e| ApiError::Validation(format!("invalid url {url}: {e}")))?;
        if !query.is_empty() {
            parsed.query_pairs_mut().extend_pairs(query);
        }

        Ok(HttpRequest {
            method: descriptor.method,
            url: parsed.into(),
            headers: merge_headers(self.headers.to_vec(), &extra_headers),
            body: (!body.is_null()).then(|| body.to_string()),
            timeout: descriptor.timeout.unwrap_or(self.default_timeout),
        })
    }
}
