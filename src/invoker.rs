//! The invocation pipeline.
//!
//! [`Invoker`] owns one provider's immutable wiring (operation registry,
//! endpoint tables, filters, decoders, transport) and turns a call —
//! operation name plus argument list — into a single HTTP exchange:
//! resolve endpoint → bind arguments → apply filters → execute → dispatch
//! or translate. Invocations are fully independent; the invoker is cheap to
//! clone and safe to share across tasks.

use std::collections::HashMap;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::args::ArgValue;
use crate::auth::CredentialSource;
use crate::binding::{BodyBuilder, BuilderSet, bind};
use crate::decode::{BodyDecoder, DecodedValue, HandlerSet, JsonDecoder, ResponseHandler, dispatch};
use crate::descriptor::{ArgumentRole, OperationDescriptor, OperationRegistry, ResponseStrategy};
use crate::endpoint::{EndpointResolver, split_endpoint};
use crate::error::CloudError;
use crate::filters::{
    BasicAuthFilter, FilterSet, FormSignerFilter, RequestFilter, VirtualHostFilter, apply_filters,
};
use crate::request::FrozenRequest;
use crate::translate::translate_failure;
use crate::transport::Transport;

/// Static, per-provider configuration supplied at initialization.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub id: String,
    pub default_endpoint: String,
    pub region_endpoints: HashMap<String, String>,
    /// Headers attached to every request from this provider.
    pub header_constants: Vec<(String, String)>,
    /// Form pairs attached to every request from this provider (e.g. an API
    /// version).
    pub form_constants: Vec<(String, String)>,
}

impl ProviderConfig {
    pub fn new(id: impl Into<String>, default_endpoint: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            default_endpoint: default_endpoint.into(),
            region_endpoints: HashMap::new(),
            header_constants: Vec::new(),
            form_constants: Vec::new(),
        }
    }

    pub fn with_region(mut self, id: impl Into<String>, uri: impl Into<String>) -> Self {
        self.region_endpoints.insert(id.into(), uri.into());
        self
    }

    pub fn with_form_constant(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.form_constants.push((name.into(), value.into()));
        self
    }

    pub fn with_header_constant(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.header_constants.push((name.into(), value.into()));
        self
    }
}

/// Assembles an [`Invoker`], validating all cross-references so wiring
/// mistakes fail here rather than at call time.
pub struct InvokerBuilder {
    config: ProviderConfig,
    transport: Arc<dyn Transport>,
    registry: OperationRegistry,
    filters: FilterSet,
    handlers: HandlerSet,
    builders: BuilderSet,
    decoder: Arc<dyn BodyDecoder>,
}

impl InvokerBuilder {
    pub fn new(config: ProviderConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            config,
            transport,
            registry: OperationRegistry::new(),
            filters: FilterSet::new(),
            handlers: HandlerSet::new(),
            builders: BuilderSet::new(),
            decoder: Arc::new(JsonDecoder),
        }
    }

    /// Register an operation descriptor. Descriptor-local wiring is
    /// validated immediately.
    pub fn operation(mut self, descriptor: OperationDescriptor) -> Result<Self, CloudError> {
        self.registry.register(descriptor)?;
        Ok(self)
    }

    /// Register a request filter under its own id.
    pub fn filter(mut self, filter: Arc<dyn RequestFilter>) -> Self {
        self.filters.insert(filter.id().to_string(), filter);
        self
    }

    /// Register the stock basic-auth, form-signer, and virtual-host filters
    /// against one credential source.
    pub fn standard_filters(self, credentials: Arc<dyn CredentialSource>) -> Self {
        self.filter(Arc::new(BasicAuthFilter::new(credentials.clone())))
            .filter(Arc::new(FormSignerFilter::new(credentials)))
            .filter(Arc::new(VirtualHostFilter))
    }

    pub fn handler(mut self, id: impl Into<String>, handler: Arc<dyn ResponseHandler>) -> Self {
        self.handlers.insert(id.into(), handler);
        self
    }

    pub fn body_builder(mut self, id: impl Into<String>, builder: Arc<dyn BodyBuilder>) -> Self {
        self.builders.insert(id.into(), builder);
        self
    }

    /// Replace the default JSON decoder (e.g. with an XML decoder).
    pub fn decoder(mut self, decoder: Arc<dyn BodyDecoder>) -> Self {
        self.decoder = decoder;
        self
    }

    /// Validate cross-references and produce the immutable invoker.
    pub fn build(self) -> Result<Invoker, CloudError> {
        split_endpoint(&self.config.default_endpoint)?;
        for endpoint in self.config.region_endpoints.values() {
            split_endpoint(endpoint)?;
        }

        for descriptor in self.registry.iter() {
            for id in &descriptor.filters {
                if !self.filters.contains_key(id) {
                    return Err(CloudError::construction(format!(
                        "operation '{}' references unknown filter '{id}'",
                        descriptor.name
                    )));
                }
            }
            if let ResponseStrategy::Handler(id) = &descriptor.response
                && !self.handlers.contains_key(id)
            {
                return Err(CloudError::construction(format!(
                    "operation '{}' references unknown response handler '{id}'",
                    descriptor.name
                )));
            }
            for role in &descriptor.roles {
                if let ArgumentRole::BodyBuilder(id) = role
                    && !self.builders.contains_key(id)
                {
                    return Err(CloudError::construction(format!(
                        "operation '{}' references unknown body builder '{id}'",
                        descriptor.name
                    )));
                }
            }
        }

        let resolver = EndpointResolver::new(&self.config.id, &self.config.default_endpoint)
            .with_regions(self.config.region_endpoints.clone());

        Ok(Invoker {
            provider: self.config.id,
            header_constants: self.config.header_constants,
            form_constants: self.config.form_constants,
            registry: Arc::new(self.registry),
            resolver: Arc::new(resolver),
            filters: self.filters,
            handlers: self.handlers,
            builders: self.builders,
            decoder: self.decoder,
            transport: self.transport,
        })
    }
}

/// One provider's invocation engine. All state is read-only after
/// construction.
#[derive(Clone)]
pub struct Invoker {
    provider: String,
    header_constants: Vec<(String, String)>,
    form_constants: Vec<(String, String)>,
    registry: Arc<OperationRegistry>,
    resolver: Arc<EndpointResolver>,
    filters: FilterSet,
    handlers: HandlerSet,
    builders: BuilderSet,
    decoder: Arc<dyn BodyDecoder>,
    transport: Arc<dyn Transport>,
}

impl std::fmt::Debug for Invoker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Invoker")
            .field("provider", &self.provider)
            .field("operations", &self.registry.len())
            .field("filters", &self.filters.len())
            .finish()
    }
}

impl Invoker {
    pub fn builder(config: ProviderConfig, transport: Arc<dyn Transport>) -> InvokerBuilder {
        InvokerBuilder::new(config, transport)
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    /// Bind and filter a request without executing it. Useful for
    /// introspection and for asserting byte-level request properties.
    pub fn prepare(
        &self,
        operation: &str,
        args: &[ArgValue],
    ) -> Result<FrozenRequest, CloudError> {
        let descriptor = self.descriptor(operation)?;
        self.prepare_descriptor(&descriptor, args)
    }

    /// Execute one invocation to completion.
    pub async fn invoke(
        &self,
        operation: &str,
        args: &[ArgValue],
    ) -> Result<DecodedValue, CloudError> {
        let descriptor = self.descriptor(operation)?;
        self.run(&descriptor, args, None).await
    }

    /// Start an invocation as an independently awaitable, cancellable unit
    /// of work.
    pub fn spawn(&self, operation: &str, args: Vec<ArgValue>) -> InvocationHandle {
        let token = CancellationToken::new();
        let task_token = token.clone();
        let invoker = self.clone();
        let operation = operation.to_string();
        let join = tokio::spawn(async move {
            let descriptor = invoker.descriptor(&operation)?;
            invoker.run(&descriptor, &args, Some(&task_token)).await
        });
        InvocationHandle { join, token }
    }

    fn descriptor(&self, operation: &str) -> Result<Arc<OperationDescriptor>, CloudError> {
        self.registry
            .get(operation)
            .ok_or_else(|| CloudError::UnknownOperation {
                provider: self.provider.clone(),
                operation: operation.to_string(),
            })
    }

    fn prepare_descriptor(
        &self,
        descriptor: &OperationDescriptor,
        args: &[ArgValue],
    ) -> Result<FrozenRequest, CloudError> {
        let target = endpoint_target(descriptor, args)?;
        let base = self
            .resolver
            .resolve(target.as_deref(), &descriptor.endpoint)?;
        let pending = bind(
            descriptor,
            args,
            &self.builders,
            &self.header_constants,
            &self.form_constants,
        )?;
        let mut frozen = pending.freeze(base)?;
        apply_filters(&descriptor.filters, &self.filters, &mut frozen)?;
        Ok(frozen)
    }

    async fn run(
        &self,
        descriptor: &OperationDescriptor,
        args: &[ArgValue],
        cancel: Option<&CancellationToken>,
    ) -> Result<DecodedValue, CloudError> {
        let frozen = self.prepare_descriptor(descriptor, args)?;
        tracing::debug!(
            provider = %self.provider,
            operation = %descriptor.name,
            method = %frozen.method(),
            url = %frozen.url(),
            "dispatching request"
        );

        let request = frozen.into_transport_request()?;

        // Cancellation observed here prevents the request from ever being
        // sent; during execute it is best-effort via select.
        let response = match cancel {
            Some(token) => {
                if token.is_cancelled() {
                    return Err(CloudError::Cancelled);
                }
                tokio::select! {
                    _ = token.cancelled() => return Err(CloudError::Cancelled),
                    result = self.transport.execute(request) => result?,
                }
            }
            None => self.transport.execute(request).await?,
        };

        if response.is_success() {
            dispatch(
                &descriptor.response,
                &response.body,
                self.decoder.as_ref(),
                &self.handlers,
            )
        } else {
            tracing::debug!(
                provider = %self.provider,
                operation = %descriptor.name,
                status = response.status,
                "translating failure status"
            );
            translate_failure(&descriptor.on_error, response.status, &response.body)
        }
    }
}

fn endpoint_target(
    descriptor: &OperationDescriptor,
    args: &[ArgValue],
) -> Result<Option<String>, CloudError> {
    for (role, arg) in descriptor.roles.iter().zip(args) {
        if matches!(role, ArgumentRole::EndpointTarget) {
            return match arg {
                ArgValue::Absent => Ok(None),
                other => other.as_text().map(Some).ok_or_else(|| {
                    CloudError::construction(format!(
                        "endpoint target of '{}' requires a text value",
                        descriptor.name
                    ))
                }),
            };
        }
    }
    Ok(None)
}

/// A started invocation: awaitable and cancellable independently of the
/// caller's thread of control.
pub struct InvocationHandle {
    join: tokio::task::JoinHandle<Result<DecodedValue, CloudError>>,
    token: CancellationToken,
}

impl InvocationHandle {
    /// Request cancellation. Before transport execute begins this prevents
    /// the request from being sent; afterwards it aborts the wait for the
    /// response.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Wait for the terminal outcome: decoded result, typed error, or
    /// `Cancelled`.
    pub async fn join(self) -> Result<DecodedValue, CloudError> {
        match self.join.await {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => Err(CloudError::Cancelled),
            Err(e) => Err(CloudError::Internal(format!("invocation task failed: {e}"))),
        }
    }
}
