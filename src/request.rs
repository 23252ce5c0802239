//! Request accumulators.
//!
//! [`PendingRequest`] is the mutable state the binder pipeline fills in;
//! freezing it yields a [`FrozenRequest`] with canonical parameter ordering,
//! which filters may then decorate (headers and host only) before it is
//! handed to the transport.

use reqwest::Method;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};

use crate::endpoint::split_endpoint;
use crate::error::CloudError;
use crate::transport::TransportRequest;

/// Media type used for form-encoded bodies.
pub const FORM_MEDIA_TYPE: &str = "application/x-www-form-urlencoded";

/// An explicit request body with its media type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawBody {
    pub media_type: String,
    pub bytes: Vec<u8>,
}

/// Request under construction. Owned by exactly one invocation.
#[derive(Debug, Clone)]
pub struct PendingRequest {
    method: Method,
    path: String,
    headers: Vec<(String, String)>,
    query: Vec<(String, String)>,
    form: Vec<(String, String)>,
    body: Option<RawBody>,
}

impl PendingRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: Vec::new(),
            query: Vec::new(),
            form: Vec::new(),
            body: None,
        }
    }

    pub fn add_header(&mut self, name: &str, value: &str) {
        self.headers.push((name.to_string(), value.to_string()));
    }

    pub fn add_query(&mut self, name: &str, value: &str) {
        self.query.push((name.to_string(), value.to_string()));
    }

    /// Add a form pair. Fails if a raw body was already set: a request may
    /// carry exactly one body representation.
    pub fn add_form(&mut self, name: &str, value: &str) -> Result<(), CloudError> {
        if self.body.is_some() {
            return Err(CloudError::construction(format!(
                "form parameter '{name}' conflicts with an already-set raw body"
            )));
        }
        self.form.push((name.to_string(), value.to_string()));
        Ok(())
    }

    /// Set the raw body. Fails if form pairs were already bound or a body
    /// was already set.
    pub fn set_raw_body(
        &mut self,
        media_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Result<(), CloudError> {
        if !self.form.is_empty() {
            return Err(CloudError::construction(
                "raw body conflicts with already-bound form parameters".to_string(),
            ));
        }
        if self.body.is_some() {
            return Err(CloudError::construction(
                "request body set twice".to_string(),
            ));
        }
        self.body = Some(RawBody {
            media_type: media_type.into(),
            bytes,
        });
        Ok(())
    }

    /// Replace the named `{placeholder}` in the path with a percent-encoded
    /// value.
    pub fn substitute_path(&mut self, name: &str, value: &str) -> Result<(), CloudError> {
        let marker = format!("{{{name}}}");
        if !self.path.contains(&marker) {
            return Err(CloudError::construction(format!(
                "path '{}' has no placeholder '{{{name}}}'",
                self.path
            )));
        }
        self.path = self
            .path
            .replace(&marker, urlencoding::encode(value).as_ref());
        Ok(())
    }

    /// Number of `prefix.N` form pairs already bound, used by the indexed
    /// binder to continue a contiguous index sequence.
    pub fn count_form_prefix(&self, prefix: &str) -> usize {
        let dotted = format!("{prefix}.");
        self.form.iter().filter(|(k, _)| k.starts_with(&dotted)).count()
    }

    /// Freeze the request against a resolved base URI.
    ///
    /// Form and query pairs are put into canonical order here: lexicographic
    /// by key, ties kept in insertion order. This makes serialized bodies
    /// and signatures byte-stable across identical invocations.
    pub fn freeze(self, base: String) -> Result<FrozenRequest, CloudError> {
        split_endpoint(&base)?;
        let mut query = self.query;
        let mut form = self.form;
        query.sort_by(|a, b| a.0.cmp(&b.0));
        form.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(FrozenRequest {
            method: self.method,
            base,
            path: self.path,
            headers: self.headers,
            query,
            form,
            body: self.body,
            applied_filters: Vec::new(),
        })
    }
}

/// Fully bound request. Filters may decorate headers and rewrite the host;
/// the path, parameters, and body are final.
#[derive(Debug, Clone)]
pub struct FrozenRequest {
    method: Method,
    base: String,
    path: String,
    headers: Vec<(String, String)>,
    query: Vec<(String, String)>,
    form: Vec<(String, String)>,
    body: Option<RawBody>,
    applied_filters: Vec<String>,
}

impl FrozenRequest {
    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Host (authority) part of the base URI.
    pub fn host(&self) -> &str {
        self.base
            .split_once("://")
            .map(|(_, authority)| authority)
            .unwrap_or(&self.base)
    }

    /// Rewrite the host, keeping the scheme.
    pub fn set_host(&mut self, host: &str) {
        let scheme = self
            .base
            .split_once("://")
            .map(|(scheme, _)| scheme)
            .unwrap_or("https");
        self.base = format!("{scheme}://{host}");
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn query_pairs(&self) -> &[(String, String)] {
        &self.query
    }

    pub fn form_pairs(&self) -> &[(String, String)] {
        &self.form
    }

    /// Append a header, preserving duplicates.
    pub fn append_header(&mut self, name: &str, value: &str) {
        self.headers.push((name.to_string(), value.to_string()));
    }

    /// Set a header, replacing any existing values under the same name
    /// (ASCII case-insensitive).
    pub fn set_header(&mut self, name: &str, value: &str) {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers.push((name.to_string(), value.to_string()));
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Record a filter id for introspection and tests.
    pub fn note_filter(&mut self, id: &str) {
        self.applied_filters.push(id.to_string());
    }

    pub fn applied_filters(&self) -> &[String] {
        &self.applied_filters
    }

    /// Full request URL including the query string.
    pub fn url(&self) -> String {
        let mut url = format!("{}{}", self.base.trim_end_matches('/'), self.path);
        if !self.query.is_empty() {
            url.push('?');
            url.push_str(&encode_pairs(&self.query));
        }
        url
    }

    /// The canonical `k=v&k2=v2` string over query then form pairs, as seen
    /// by signing filters.
    pub fn canonical_param_string(&self) -> String {
        let mut pairs: Vec<&(String, String)> = Vec::with_capacity(self.query.len() + self.form.len());
        pairs.extend(self.query.iter());
        pairs.extend(self.form.iter());
        pairs
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&")
    }

    /// The body that will be sent, if any: the raw body, or the
    /// canonically-ordered form encoding.
    pub fn encoded_body(&self) -> Option<RawBody> {
        if let Some(body) = &self.body {
            return Some(body.clone());
        }
        if self.form.is_empty() {
            return None;
        }
        Some(RawBody {
            media_type: FORM_MEDIA_TYPE.to_string(),
            bytes: encode_pairs(&self.form).into_bytes(),
        })
    }

    /// Convert to the transport-facing request, materializing the header
    /// multimap and the body.
    pub fn into_transport_request(self) -> Result<TransportRequest, CloudError> {
        let url = self.url();
        let body = self.encoded_body();

        let mut headers = HeaderMap::new();
        for (name, value) in &self.headers {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                CloudError::Configuration(format!("invalid header name '{name}': {e}"))
            })?;
            let value = HeaderValue::from_str(value).map_err(|e| {
                CloudError::Configuration(format!("invalid header value for '{name:?}': {e}"))
            })?;
            headers.append(name, value);
        }
        if let Some(body) = &body
            && !headers.contains_key(CONTENT_TYPE)
        {
            headers.insert(
                CONTENT_TYPE,
                HeaderValue::from_str(&body.media_type).map_err(|e| {
                    CloudError::Configuration(format!(
                        "invalid media type '{}': {e}",
                        body.media_type
                    ))
                })?,
            );
        }

        Ok(TransportRequest {
            method: self.method,
            url,
            headers,
            body: body.map(|b| b.bytes),
        })
    }
}

fn encode_pairs(pairs: &[(String, String)]) -> String {
    pairs
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}
