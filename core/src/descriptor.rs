//! Call descriptors and the path-template helpers the resolver uses.
//!
//! # Design
//! A descriptor is `const` data: resource tables are `&'static` slices of
//! them, built once and never mutated. Path templates carry at most one
//! parameter token of the form `:xxxId` (e.g. `/tasks/:taskId`).

use std::time::Duration;

use crate::http::HttpMethod;

/// Static metadata describing one API operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallDescriptor {
    pub path: &'static str,
    /// Used when no identifying argument is supplied.
    pub alt_path: Option<&'static str>,
    pub method: HttpMethod,
    /// Flat key/value arguments are appended to the url.
    pub query_params: bool,
    /// Delivery-manifest argument handling.
    pub delivery_manifest: bool,
    /// Overrides the client timeout for this call.
    pub timeout: Option<Duration>,
}

impl CallDescriptor {
    pub const fn new(method: HttpMethod, path: &'static str) -> Self {
        Self {
            path,
            alt_path: None,
            method,
            query_params: false,
            delivery_manifest: false,
            timeout: None,
        }
    }

    pub const fn get(path: &'static str) -> Self {
        Self::new(HttpMethod::Get, path)
    }

    pub const fn post(path: &'static str) -> Self {
        Self::new(HttpMethod::Post, path)
    }

    pub const fn put(path: &'static str) -> Self {
        Self::new(HttpMethod::Put, path)
    }

    pub const fn delete(path: &'static str) -> Self {
        Self::new(HttpMethod::Delete, path)
    }

    pub const fn with_alt_path(mut self, alt_path: &'static str) -> Self {
        self.alt_path = Some(alt_path);
        self
    }

    pub const fn with_query_params(mut self) -> Self {
        self.query_params = true;
        self
    }

    pub const fn with_delivery_manifest(mut self) -> Self {
        self.delivery_manifest = true;
        self
    }

    pub const fn with_timeout_ms(mut self, millis: u64) -> Self {
        self.timeout = Some(Duration::from_millis(millis));
        self
    }
}

/// Lookup-type tags accepted as the second positional argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupKey {
    Name,
    ShortId,
    Phone,
    Workers,
    Organizations,
    Teams,
}

impl LookupKey {
    pub const ALL: [LookupKey; 6] = [
        LookupKey::Name,
        LookupKey::ShortId,
        LookupKey::Phone,
        LookupKey::Workers,
        LookupKey::Organizations,
        LookupKey::Teams,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LookupKey::Name => "name",
            LookupKey::ShortId => "shortId",
            LookupKey::Phone => "phone",
            LookupKey::Workers => "workers",
            LookupKey::Organizations => "organizations",
            LookupKey::Teams => "teams",
        }
    }

    /// Exact, case-sensitive match against the tag set.
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|key| key.as_str() == tag)
    }
}

const IDENTIFIER_LEN: usize = 24;

/// Whether `value` has the shape of an opaque Onfleet identifier:
/// exactly 24 characters of `[A-Za-z0-9~*_-]`.
pub fn is_identifier(value: &str) -> bool {
    value.len() == IDENTIFIER_LEN
        && value
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'~' | b'*' | b'_' | b'-'))
}

/// Byte range of the first `:xxxId` parameter token in `url`.
fn param_token(url: &str) -> Option<std::ops::Range<usize>> {
    let bytes = url.as_bytes();
    let mut search_from = 0;
    while let Some(offset) = url[search_from..].find(':') {
        let start = search_from + offset;
        let end = start
            + 1
            + bytes[start + 1..]
                .iter()
                .take_while(|b| b.is_ascii_alphabetic())
                .count();
        if url[start + 1..end].ends_with("Id") {
            return Some(start..end);
        }
        search_from = start + 1;
    }
    None
}

/// Substitute `id` for the parameter token. Templates without a token are
/// returned unchanged.
pub fn replace_with_id(url: &str, id: &str) -> String {
    match param_token(url) {
        Some(range) => format!("{}{}{}", &url[..range.start], id, &url[range.end..]),
        None => url.to_string(),
    }
}

/// Replace `/:xxxId` with `/{key}/{value}`.
pub fn replace_with_lookup(url: &str, key: LookupKey, value: &str) -> String {
    match param_token(url) {
        Some(range) => format!(
            "{}{}/{}{}",
            &url[..range.start],
            key.as_str(),
            value,
            &url[range.end..]
        ),
        None => url.to_string(),
    }
}
