//! stratus
//!
//! A declarative invocation engine for multi-provider cloud API clients.
//! Providers describe each remote operation as data — verb, path template,
//! argument roles, filters, response and error strategies — and a shared
//! runtime turns calls against those descriptors into signed HTTP requests,
//! executes them, and converts responses back into typed values or typed
//! errors.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use stratus::{
//!     ArgValue, ArgumentRole, EndpointStrategy, Invoker, OperationDescriptor,
//!     ProviderConfig, ReqwestTransport, ResponseStrategy,
//! };
//!
//! let config = ProviderConfig::new("monitoring", "https://monitoring.example.com")
//!     .with_form_constant("Version", "2010-08-01");
//! let invoker = Invoker::builder(config, Arc::new(ReqwestTransport::default()))
//!     .operation(
//!         OperationDescriptor::builder("ListMetrics", reqwest::Method::POST, "/")
//!             .form_constant("Action", "ListMetrics")
//!             .response(ResponseStrategy::Document)
//!             .build(),
//!     )?
//!     .build()?;
//!
//! let metrics = invoker.invoke("ListMetrics", &[]).await?;
//! ```
#![deny(unsafe_code)]

pub mod args;
pub mod auth;
pub mod binding;
pub mod decode;
pub mod descriptor;
pub mod endpoint;
pub mod error;
pub mod filters;
pub mod invoker;
pub mod request;
pub mod retry;
pub mod transport;

mod translate;

pub use args::ArgValue;
pub use auth::{CredentialSource, Credentials, StaticCredentials};
pub use binding::BodyBuilder;
pub use decode::{BodyDecoder, DecodedValue, HandlerSession, JsonDecoder, ResponseHandler};
pub use descriptor::{
    ArgumentRole, EndpointStrategy, ErrorStrategy, OperationDescriptor, OperationRegistry,
    ResponseStrategy,
};
pub use endpoint::EndpointResolver;
pub use error::{CloudError, ErrorCategory};
pub use filters::{
    BasicAuthFilter, Clock, FormSignerFilter, RequestFilter, SystemClock, VirtualHostFilter,
};
pub use invoker::{InvocationHandle, Invoker, InvokerBuilder, ProviderConfig};
pub use request::{FrozenRequest, PendingRequest, RawBody};
pub use retry::Poller;
pub use transport::{ReqwestTransport, Transport, TransportRequest, TransportResponse};
