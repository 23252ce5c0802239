//! Argument binder pipeline.
//!
//! Walks the descriptor's argument roles in call order and folds each
//! argument into the [`PendingRequest`]. Each binder runs exactly once per
//! invocation and communicates with the others only through the shared
//! accumulator.

use std::collections::HashMap;
use std::sync::Arc;

use crate::args::ArgValue;
use crate::descriptor::{ArgumentRole, OperationDescriptor};
use crate::error::CloudError;
use crate::request::{PendingRequest, RawBody};

/// Builds a request body from one structured call argument.
///
/// Providers register builders by id and reference them from descriptors
/// through [`ArgumentRole::BodyBuilder`]; the engine never interprets the
/// produced bytes.
pub trait BodyBuilder: Send + Sync {
    fn build(&self, arg: &ArgValue) -> Result<RawBody, CloudError>;
}

pub(crate) type BuilderSet = HashMap<String, Arc<dyn BodyBuilder>>;

/// Bind call arguments into a request according to the descriptor's roles.
///
/// `provider_headers` and `provider_form` are provider-wide constants
/// applied before the descriptor's own constants, matching how providers
/// stack interface-level parameters (e.g. an API version) under per-operation
/// ones (e.g. an action name).
pub(crate) fn bind(
    descriptor: &OperationDescriptor,
    args: &[ArgValue],
    builders: &BuilderSet,
    provider_headers: &[(String, String)],
    provider_form: &[(String, String)],
) -> Result<PendingRequest, CloudError> {
    if args.len() != descriptor.roles.len() {
        return Err(CloudError::construction(format!(
            "operation '{}' takes {} arguments, got {}",
            descriptor.name,
            descriptor.roles.len(),
            args.len()
        )));
    }

    let mut request = PendingRequest::new(descriptor.method.clone(), descriptor.path.clone());

    for (name, value) in provider_headers.iter().chain(&descriptor.fixed_headers) {
        request.add_header(name, value);
    }
    for (name, value) in provider_form.iter().chain(&descriptor.fixed_form) {
        request.add_form(name, value)?;
    }

    for (role, arg) in descriptor.roles.iter().zip(args) {
        match role {
            // Consumed by the endpoint resolver before binding starts.
            ArgumentRole::EndpointTarget => {}
            ArgumentRole::PathParam(name) => {
                let value = arg.as_text().ok_or_else(|| {
                    CloudError::construction(format!(
                        "path parameter '{name}' of '{}' requires a present text value",
                        descriptor.name
                    ))
                })?;
                request.substitute_path(name, &value)?;
            }
            ArgumentRole::Header(name) => {
                if let Some(value) = arg.as_text() {
                    request.add_header(name, &value);
                }
            }
            ArgumentRole::FormParam(name) => {
                if let Some(value) = arg.as_text() {
                    request.add_form(name, &value)?;
                }
            }
            ArgumentRole::QueryParam(name) => {
                if let Some(value) = arg.as_text() {
                    request.add_query(name, &value);
                }
            }
            ArgumentRole::IndexedFormParams(prefix) => {
                let items: Vec<String> = match arg {
                    ArgValue::List(items) => items.clone(),
                    ArgValue::Str(item) => vec![item.clone()],
                    ArgValue::Absent => Vec::new(),
                    other => {
                        return Err(CloudError::construction(format!(
                            "indexed parameter '{prefix}' of '{}' requires a list, got {other:?}",
                            descriptor.name
                        )));
                    }
                };
                // Continue numbering after any explicit `prefix.N` pair a
                // preceding single-valued argument already bound.
                let mut index = request.count_form_prefix(prefix);
                for item in items {
                    request.add_form(&format!("{prefix}.{index}"), &item)?;
                    index += 1;
                }
            }
            ArgumentRole::RawBody(media_type) => {
                let bytes = match arg {
                    ArgValue::Bytes(bytes) => bytes.clone(),
                    ArgValue::Str(text) => text.clone().into_bytes(),
                    ArgValue::Json(value) => serde_json::to_vec(value)?,
                    other => {
                        return Err(CloudError::construction(format!(
                            "raw body argument of '{}' requires bytes, text, or a \
                             structured value, got {other:?}",
                            descriptor.name
                        )));
                    }
                };
                request.set_raw_body(media_type.clone(), bytes)?;
            }
            ArgumentRole::BodyBuilder(id) => {
                let builder = builders.get(id).ok_or_else(|| {
                    CloudError::construction(format!(
                        "operation '{}' references unknown body builder '{id}'",
                        descriptor.name
                    ))
                })?;
                let body = builder.build(arg)?;
                request.set_raw_body(body.media_type, body.bytes)?;
            }
        }
    }

    Ok(request)
}
