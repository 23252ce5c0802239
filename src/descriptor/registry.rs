//! Operation registry with registration-time validation.
//!
//! Descriptor wiring mistakes (unbound placeholders, conflicting body
//! sources, duplicate names) are rejected here, when the registry is
//! populated at startup, so they can never surface during an invocation.

use std::collections::HashMap;
use std::sync::Arc;

use crate::descriptor::{ArgumentRole, OperationDescriptor};
use crate::error::CloudError;

/// Read-only set of operation descriptors for one provider.
///
/// Populated once during initialization and shared across invocations;
/// concurrent reads need no locking because the map is never mutated after
/// the owning invoker is built.
#[derive(Debug, Default)]
pub struct OperationRegistry {
    operations: HashMap<String, Arc<OperationDescriptor>>,
}

impl OperationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and add a descriptor. Fails fast on wiring mistakes.
    pub fn register(&mut self, descriptor: OperationDescriptor) -> Result<(), CloudError> {
        validate(&descriptor)?;
        if self.operations.contains_key(&descriptor.name) {
            return Err(CloudError::construction(format!(
                "operation '{}' registered twice",
                descriptor.name
            )));
        }
        self.operations
            .insert(descriptor.name.clone(), Arc::new(descriptor));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<OperationDescriptor>> {
        self.operations.get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Iterate all registered descriptors (for cross-validation at invoker
    /// assembly).
    pub(crate) fn iter(&self) -> impl Iterator<Item = &Arc<OperationDescriptor>> {
        self.operations.values()
    }
}

fn validate(descriptor: &OperationDescriptor) -> Result<(), CloudError> {
    let placeholders = descriptor.path_placeholders();

    let mut endpoint_targets = 0usize;
    let mut body_sources = 0usize;
    let mut form_roles = 0usize;
    let mut bound_placeholders: Vec<&str> = Vec::new();

    for role in &descriptor.roles {
        match role {
            ArgumentRole::EndpointTarget => endpoint_targets += 1,
            ArgumentRole::PathParam(name) => {
                if !placeholders.iter().any(|p| p == name) {
                    return Err(CloudError::construction(format!(
                        "operation '{}' binds path parameter '{}' but the path \
                         template '{}' has no such placeholder",
                        descriptor.name, name, descriptor.path
                    )));
                }
                bound_placeholders.push(name);
            }
            ArgumentRole::FormParam(_) | ArgumentRole::IndexedFormParams(_) => form_roles += 1,
            ArgumentRole::RawBody(_) | ArgumentRole::BodyBuilder(_) => body_sources += 1,
            ArgumentRole::Header(_) | ArgumentRole::QueryParam(_) => {}
        }
    }

    for placeholder in &placeholders {
        if !bound_placeholders.iter().any(|p| p == placeholder) {
            return Err(CloudError::construction(format!(
                "operation '{}' has unbound path placeholder '{{{}}}'",
                descriptor.name, placeholder
            )));
        }
    }

    if endpoint_targets > 1 {
        return Err(CloudError::construction(format!(
            "operation '{}' declares more than one endpoint-target argument",
            descriptor.name
        )));
    }

    if body_sources > 1 {
        return Err(CloudError::construction(format!(
            "operation '{}' declares more than one body source",
            descriptor.name
        )));
    }

    // A raw/built body and a form body are two representations of the same
    // payload slot; a request may carry only one.
    if body_sources > 0 && (form_roles > 0 || !descriptor.fixed_form.is_empty()) {
        return Err(CloudError::construction(format!(
            "operation '{}' mixes a raw body with form parameters",
            descriptor.name
        )));
    }

    Ok(())
}
