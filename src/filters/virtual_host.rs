//! Virtual-host addressing filter.
//!
//! Providers that address resources through the host name expect a `Host`
//! header matching the resolved virtual host. The filter pins the header to
//! the frozen request's current host (which endpoint resolution may already
//! have prefixed with a target identifier).

use crate::error::CloudError;
use crate::filters::RequestFilter;
use crate::request::FrozenRequest;

pub struct VirtualHostFilter;

impl VirtualHostFilter {
    pub const ID: &'static str = "virtual-host";
}

impl RequestFilter for VirtualHostFilter {
    fn id(&self) -> &'static str {
        Self::ID
    }

    fn apply(&self, request: &mut FrozenRequest) -> Result<(), CloudError> {
        let host = request.host().to_string();
        request.set_header("host", &host);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::PendingRequest;
    use reqwest::Method;

    #[test]
    fn host_header_tracks_the_resolved_host() {
        let mut request = PendingRequest::new(Method::POST, "/")
            .freeze("https://monitoring.us-east-1.amazonaws.com".to_string())
            .unwrap();
        VirtualHostFilter.apply(&mut request).unwrap();
        assert_eq!(
            request.header("host"),
            Some("monitoring.us-east-1.amazonaws.com")
        );
    }

    #[test]
    fn host_header_follows_later_host_rewrites() {
        let mut request = PendingRequest::new(Method::GET, "/")
            .freeze("https://storage.example.com".to_string())
            .unwrap();
        request.set_host("bucket.storage.example.com");
        VirtualHostFilter.apply(&mut request).unwrap();
        assert_eq!(request.header("host"), Some("bucket.storage.example.com"));
    }
}
