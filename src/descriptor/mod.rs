//! Operation Descriptors
//!
//! This module defines the declarative description of one remote operation:
//! how its call arguments map onto an HTTP request, which filters run before
//! sending, how its response is decoded, and how failure statuses are
//! translated. Descriptors are plain data built once at startup; invocation
//! is a lookup by operation name plus an explicit argument list.
//!
//! ## Example
//!
//! ```rust,ignore
//! use stratus::descriptor::{ArgumentRole, OperationDescriptor};
//! use stratus::{EndpointStrategy, ErrorStrategy, ResponseStrategy};
//!
//! let op = OperationDescriptor::builder("MonitorInstances", reqwest::Method::POST, "/")
//!     .form_constant("Action", "MonitorInstances")
//!     .arg(ArgumentRole::EndpointTarget)
//!     .arg(ArgumentRole::FormParam("InstanceId.0".into()))
//!     .arg(ArgumentRole::IndexedFormParams("InstanceId".into()))
//!     .endpoint(EndpointStrategy::Lookup)
//!     .response(ResponseStrategy::Handler("monitoring-state".into()))
//!     .filter("form-signer")
//!     .build();
//! ```

pub mod registry;

pub use registry::OperationRegistry;

use reqwest::Method;

/// How one call-argument position contributes to the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgumentRole {
    /// Logical endpoint identifier (e.g. a region code) consumed by the
    /// endpoint resolver; `Absent` selects the provider default.
    EndpointTarget,
    /// Substitutes the named `{placeholder}` in the path template.
    PathParam(String),
    /// Adds a header under the given name.
    Header(String),
    /// Adds a form key-value pair under the given name.
    FormParam(String),
    /// Adds a query key-value pair under the given name.
    QueryParam(String),
    /// Expands a list argument into `Prefix.0`, `Prefix.1`, … form pairs,
    /// continuing after any pairs of the same prefix already bound.
    IndexedFormParams(String),
    /// The argument is the request body, sent with the given media type.
    RawBody(String),
    /// The argument is fed to the named body builder, which produces the
    /// request body.
    BodyBuilder(String),
}

/// How the base URI for the request is chosen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndpointStrategy {
    /// Always the provider's configured default endpoint.
    Constant,
    /// Map the endpoint-target argument through the provider's region table.
    Lookup,
    /// Prefix the provider host with the endpoint-target identifier.
    VirtualHost,
}

/// How a success-status response body is decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseStrategy {
    /// Discard the body.
    Void,
    /// Decode the full body as a structured document.
    Document,
    /// Decode the full body, then navigate to the named key (dotted path).
    Subtree(String),
    /// Feed the body incrementally to the named streaming handler.
    Handler(String),
}

/// How a failure-status response is translated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorStrategy {
    /// Wrap status and parsed error payload into a typed error.
    Propagate,
    /// 404 means "absent": succeed with a null value. Anything else
    /// propagates.
    NullOnNotFound,
    /// 404 means "nothing to list": succeed with an empty collection.
    /// Anything else propagates.
    EmptyOnNotFound,
}

/// Immutable description of one remote operation.
///
/// Constructed via [`OperationDescriptor::builder`], validated when
/// registered in an [`OperationRegistry`], and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct OperationDescriptor {
    /// Operation identity used for registry lookups.
    pub name: String,
    /// HTTP verb.
    pub method: Method,
    /// Path template, possibly containing `{placeholder}` segments.
    pub path: String,
    /// Headers attached to every request for this operation.
    pub fixed_headers: Vec<(String, String)>,
    /// Form pairs attached to every request for this operation.
    pub fixed_form: Vec<(String, String)>,
    /// One role per call-argument position, in call order.
    pub roles: Vec<ArgumentRole>,
    /// Base-URI selection strategy.
    pub endpoint: EndpointStrategy,
    /// Success-body decoding strategy.
    pub response: ResponseStrategy,
    /// Failure-status translation strategy.
    pub on_error: ErrorStrategy,
    /// Filter ids applied in order after binding.
    pub filters: Vec<String>,
}

impl OperationDescriptor {
    /// Start building a descriptor for the given operation name, verb, and
    /// path template.
    pub fn builder(
        name: impl Into<String>,
        method: Method,
        path: impl Into<String>,
    ) -> OperationDescriptorBuilder {
        OperationDescriptorBuilder {
            descriptor: OperationDescriptor {
                name: name.into(),
                method,
                path: path.into(),
                fixed_headers: Vec::new(),
                fixed_form: Vec::new(),
                roles: Vec::new(),
                endpoint: EndpointStrategy::Constant,
                response: ResponseStrategy::Void,
                on_error: ErrorStrategy::Propagate,
                filters: Vec::new(),
            },
        }
    }

    /// Placeholder names appearing in the path template.
    pub(crate) fn path_placeholders(&self) -> Vec<String> {
        let mut names = Vec::new();
        let mut rest = self.path.as_str();
        while let Some(open) = rest.find('{') {
            let Some(close) = rest[open..].find('}') else {
                break;
            };
            names.push(rest[open + 1..open + close].to_string());
            rest = &rest[open + close + 1..];
        }
        names
    }
}

/// Fluent builder for [`OperationDescriptor`].
#[derive(Debug)]
pub struct OperationDescriptorBuilder {
    descriptor: OperationDescriptor,
}

impl OperationDescriptorBuilder {
    /// Attach a header to every request for this operation.
    pub fn header_constant(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.descriptor
            .fixed_headers
            .push((name.into(), value.into()));
        self
    }

    /// Attach a form pair to every request for this operation.
    pub fn form_constant(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.descriptor.fixed_form.push((name.into(), value.into()));
        self
    }

    /// Declare the role of the next call-argument position.
    pub fn arg(mut self, role: ArgumentRole) -> Self {
        self.descriptor.roles.push(role);
        self
    }

    pub fn endpoint(mut self, strategy: EndpointStrategy) -> Self {
        self.descriptor.endpoint = strategy;
        self
    }

    pub fn response(mut self, strategy: ResponseStrategy) -> Self {
        self.descriptor.response = strategy;
        self
    }

    pub fn on_error(mut self, strategy: ErrorStrategy) -> Self {
        self.descriptor.on_error = strategy;
        self
    }

    /// Append a filter id to the chain applied after binding.
    pub fn filter(mut self, id: impl Into<String>) -> Self {
        self.descriptor.filters.push(id.into());
        self
    }

    pub fn build(self) -> OperationDescriptor {
        self.descriptor
    }
}
