//! HTTP request/response values exchanged between the resolver, the
//! dispatcher and the transport.
//!
//! # Design
//! Requests and responses are plain data. The resolver produces an
//! `HttpRequest` without touching the network; the dispatcher hands it to a
//! `Transport`, which returns an `HttpResponse`. Keeping both sides as data
//! lets the resolution rules and the response interpretation be tested
//! without a server.

use std::fmt;
use std::time::Duration;

/// HTTP verb of a call descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully resolved request, ready for a single dispatch.
///
/// Built by `resolve::resolve`. `body` is already serialized JSON.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
    pub timeout: Duration,
}

impl HttpRequest {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

/// Merge `overrides` into `defaults`. A header whose name matches an existing
/// one (ignoring ASCII case) replaces it in place; new names are appended.
pub fn merge_headers(
    mut defaults: Vec<(String, String)>,
    overrides: &[(String, String)],
) -> Vec<(String, String)> {
    for (name, value) in overrides {
        match defaults.iter_mut().find(|(key, _)| key.eq_ignore_ascii_case(name)) {
            Some(slot) => slot.1 = value.clone(),
            None => defaults.push((name.clone(), value.clone())),
        }
    }
    defaults
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(k: &str, v: &str) -> (String, String) {
        (k.to_string(), v.to_string())
    }

    #[test]
    fn merge_replaces_matching_names_case_insensitively() {
        let merged = merge_headers(
            vec![pair("Content-Type", "application/json"), pair("User-Agent", "a")],
            &[pair("user-agent", "b")],
        );
        assert_eq!(
            merged,
            vec![pair("Content-Type", "application/json"), pair("User-Agent", "b")]
        );
    }

    #[test]
    fn merge_appends_new_names() {
        let merged = merge_headers(vec![pair("Content-Type", "application/json")], &[pair("X-Trace", "1")]);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[1], pair("X-Trace", "1"));
    }

    #[test]
    fn header_lookup_ignores_case() {
        let req = HttpRequest {
            method: HttpMethod::Get,
            url: "https://onfleet.com/api/v2/tasks".to_string(),
            headers: vec![pair("Authorization", "Basic abc")],
            body: None,
            timeout: Duration::from_secs(1),
        };
        assert_eq!(req.header("authorization"), Some("Basic abc"));
        assert_eq!(req.header("x-api-key"), None);
    }

    #[test]
    fn response_header_lookup_ignores_case() {
        let response = HttpResponse {
            status: 429,
            headers: vec![pair("retry-after", "1")],
            body: String::new(),
        };
        assert_eq!(response.header("Retry-After"), Some("1"));
        assert_eq!(response.header("Content-Type"), None);
    }

    #[test]
    fn success_range_is_2xx() {
        let response = |status| HttpResponse {
            status,
            headers: Vec::new(),
            body: String::new(),
        };
        assert!(response(200).is_success());
        assert!(response(204).is_success());
        assert!(!response(301).is_success());
        assert!(!response(429).is_success());
    }
}
