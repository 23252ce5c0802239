//! HTTP basic authentication filter.

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::auth::CredentialSource;
use crate::error::CloudError;
use crate::filters::RequestFilter;
use crate::request::FrozenRequest;

/// Injects an `Authorization: Basic …` header from the credential source.
pub struct BasicAuthFilter {
    credentials: Arc<dyn CredentialSource>,
}

impl BasicAuthFilter {
    pub const ID: &'static str = "basic-auth";

    pub fn new(credentials: Arc<dyn CredentialSource>) -> Self {
        Self { credentials }
    }
}

impl RequestFilter for BasicAuthFilter {
    fn id(&self) -> &'static str {
        Self::ID
    }

    fn apply(&self, request: &mut FrozenRequest) -> Result<(), CloudError> {
        let creds = self
            .credentials
            .credentials()
            .map_err(|e| CloudError::FilterRejected {
                filter: Self::ID.to_string(),
                reason: e.to_string(),
            })?;
        let token = STANDARD.encode(format!(
            "{}:{}",
            creds.identity(),
            creds.expose_secret()
        ));
        request.set_header("authorization", &format!("Basic {token}"));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StaticCredentials;
    use crate::request::PendingRequest;
    use reqwest::Method;

    #[test]
    fn sets_the_expected_authorization_header() {
        let filter = BasicAuthFilter::new(Arc::new(StaticCredentials::new("user", "pass")));
        let mut request = PendingRequest::new(Method::GET, "/archive/list")
            .freeze("https://api.example.com".to_string())
            .unwrap();
        filter.apply(&mut request).unwrap();
        // base64("user:pass")
        assert_eq!(request.header("authorization"), Some("Basic dXNlcjpwYXNz"));
    }

    #[test]
    fn missing_credentials_reject_the_request() {
        struct NoCreds;
        impl CredentialSource for NoCreds {
            fn credentials(&self) -> Result<crate::auth::Credentials, CloudError> {
                Err(CloudError::Configuration("no credentials loaded".to_string()))
            }
        }

        let filter = BasicAuthFilter::new(Arc::new(NoCreds));
        let mut request = PendingRequest::new(Method::GET, "/")
            .freeze("https://api.example.com".to_string())
            .unwrap();
        let err = filter.apply(&mut request).unwrap_err();
        assert!(matches!(err, CloudError::FilterRejected { .. }));
    }
}
