//! Request filter chain.
//!
//! Filters are pre-send mutators applied in the order the descriptor
//! declares them, after binding has frozen the request. A filter may add or
//! replace headers, rewrite the host, or reject the request outright; it
//! never touches the finalized body or parameters. Given the same frozen
//! request and ambient credentials a filter is deterministic, which keeps
//! retried requests byte-identical.

mod basic_auth;
mod form_signer;
mod virtual_host;

pub use basic_auth::BasicAuthFilter;
pub use form_signer::{Clock, FormSignerFilter, SystemClock};
pub use virtual_host::VirtualHostFilter;

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::CloudError;
use crate::request::FrozenRequest;

/// A pre-send request mutator, typically for authentication or signing.
pub trait RequestFilter: Send + Sync {
    /// Stable identifier descriptors use to reference this filter.
    fn id(&self) -> &'static str;

    fn apply(&self, request: &mut FrozenRequest) -> Result<(), CloudError>;
}

pub(crate) type FilterSet = HashMap<String, Arc<dyn RequestFilter>>;

/// Run the named filters in declared order, recording each applied id on
/// the request.
pub(crate) fn apply_filters(
    ids: &[String],
    filters: &FilterSet,
    request: &mut FrozenRequest,
) -> Result<(), CloudError> {
    for id in ids {
        let filter = filters.get(id).ok_or_else(|| {
            CloudError::construction(format!("unknown request filter '{id}'"))
        })?;
        filter.apply(request)?;
        request.note_filter(id);
    }
    Ok(())
}
