//! Request parameter extraction.
//!
//! Parameters come from three places:
//!
//! - **Query**: the URL query string (`?id=1&a=b`)
//! - **Body**: `application/x-www-form-urlencoded` bodies of `POST`, `PUT` and `PATCH` requests
//! - **Path**: variables captured by the router (`/users/{id}`)
//!
//! Each source is exposed as a [`ParamSet`], and [`params`] merges all three.
//!
//! # Best effort
//!
//! None of these functions fail. Malformed percent escapes are passed through
//! literally, invalid UTF-8 is replaced, unreadable bodies and missing route
//! matches yield an empty set. Validate the returned values in the handler.
//!
//! # Merge Order
//!
//! ```text
//! query ──┐
//! body  ──┼──► ParamSet (values for a repeated key are appended, never dropped)
//! path  ──┘
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! async fn show(Params(params): Params) -> String {
//!     params.get("id").unwrap_or_default().to_string()
//! }
//! ```

use std::collections::BTreeMap;
use std::collections::btree_map;
use std::convert::Infallible;

use axum::RequestExt;
use axum::body::{Body, to_bytes};
use axum::extract::{FromRequest, RawPathParams};
use axum::http::{Method, Request, header};
use serde::Serialize;
use tracing::debug;

/// Largest form body that [`body_params`] buffers (10MB).
pub const MAX_FORM_BODY_SIZE: usize = 10 * 1024 * 1024;

/// Media type of URL-encoded form bodies.
const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Multi-valued parameter collection.
///
/// Keys are kept sorted; values for a key keep the order they were added in.
/// Serializes as a JSON object of string arrays.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ParamSet(BTreeMap<String, Vec<String>>);

impl ParamSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value to the values of `key`.
    pub fn add(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.entry(key.into()).or_default().push(value.into());
    }

    /// Replace all values of `key` with a single value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), vec![value.into()]);
    }

    /// First value of `key`, if any.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.first()).map(String::as_str)
    }

    /// All values of `key`, empty when the key is absent.
    pub fn get_all(&self, key: &str) -> &[String] {
        self.0.get(key).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over keys and their values in key order.
    pub fn iter(&self) -> btree_map::Iter<'_, String, Vec<String>> {
        self.0.iter()
    }

    /// Merge `other` into this set, appending its values after existing ones.
    pub fn extend(&mut self, other: ParamSet) {
        for (key, values) in other.0 {
            self.0.entry(key).or_default().extend(values);
        }
    }
}

impl<K, V> FromIterator<(K, V)> for ParamSet
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut set = Self::new();
        for (key, value) in iter {
            set.add(key, value);
        }
        set
    }
}

impl<'a> IntoIterator for &'a ParamSet {
    type Item = (&'a String, &'a Vec<String>);
    type IntoIter = btree_map::Iter<'a, String, Vec<String>>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Parameters from the URL query string.
pub fn query_params<B>(req: &Request<B>) -> ParamSet {
    req.uri()
        .query()
        .map(|query| parse_urlencoded(query.as_bytes()))
        .unwrap_or_default()
}

/// Parameters from a URL-encoded form body.
///
/// Only `POST`, `PUT` and `PATCH` requests with a form content type are read.
/// The body is buffered and put back, so the handler can still consume it.
/// If the body cannot be read (too large, transport error) the request is
/// left with an empty body and an empty set is returned.
pub async fn body_params(req: &mut Request<Body>) -> ParamSet {
    if !carries_form_body(req) {
        return ParamSet::new();
    }

    let body = std::mem::take(req.body_mut());
    match to_bytes(body, MAX_FORM_BODY_SIZE).await {
        Ok(bytes) => {
            let params = parse_urlencoded(&bytes);
            *req.body_mut() = Body::from(bytes);
            params
        }
        Err(e) => {
            debug!(error = %e, "Failed to read form body, ignoring body parameters");
            ParamSet::new()
        }
    }
}

/// Path variables captured by the router for the matched route.
///
/// Empty when called outside a matched route (e.g. from middleware wrapped
/// around the whole router) or when a captured value is not valid UTF-8.
pub async fn path_params(req: &mut Request<Body>) -> ParamSet {
    match req.extract_parts::<RawPathParams>().await {
        Ok(raw) => {
            let mut params = ParamSet::new();
            for (key, value) in &raw {
                params.set(key, value);
            }
            params
        }
        Err(rejection) => {
            debug!(reason = %rejection, "No path parameters available");
            ParamSet::new()
        }
    }
}

/// Query, body and path parameters merged, in that order.
pub async fn params(req: &mut Request<Body>) -> ParamSet {
    let mut merged = query_params(req);
    merged.extend(body_params(req).await);
    merged.extend(path_params(req).await);
    merged
}

/// Extractor for the merged parameters of a request.
///
/// Never rejects; see [`params`].
#[derive(Debug, Clone, Default)]
pub struct Params(pub ParamSet);

impl<S> FromRequest<S> for Params
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request(mut req: Request<Body>, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(params(&mut req).await))
    }
}

fn parse_urlencoded(input: &[u8]) -> ParamSet {
    url::form_urlencoded::parse(input).collect()
}

fn carries_form_body<B>(req: &Request<B>) -> bool {
    if !matches!(*req.method(), Method::POST | Method::PUT | Method::PATCH) {
        return false;
    }

    // Media type parameters such as `charset` are allowed
    req.headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .is_some_and(|media_type| media_type.trim().eq_ignore_ascii_case(FORM_CONTENT_TYPE))
}
