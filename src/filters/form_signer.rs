//! Form-parameter signing filter.
//!
//! Computes an HMAC-SHA256 signature over the frozen request's canonical
//! parameter string and delivers it, together with the signing metadata,
//! through headers. The canonical ordering (lexicographic by key, insertion
//! order for ties) is fixed when the request is frozen, so two identical
//! invocations sign and send byte-identical payloads.

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, SecondsFormat, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::auth::CredentialSource;
use crate::error::CloudError;
use crate::filters::RequestFilter;
use crate::request::FrozenRequest;

type HmacSha256 = Hmac<Sha256>;

/// Time source for the signing timestamp. Injectable so tests can pin it.
pub trait Clock: Send + Sync {
    fn now_utc(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Signs the canonical form/query parameters of a request.
pub struct FormSignerFilter {
    credentials: Arc<dyn CredentialSource>,
    clock: Arc<dyn Clock>,
}

impl FormSignerFilter {
    pub const ID: &'static str = "form-signer";

    const SIGNATURE_METHOD: &'static str = "HmacSHA256";
    const SIGNATURE_VERSION: &'static str = "2";

    pub fn new(credentials: Arc<dyn CredentialSource>) -> Self {
        Self {
            credentials,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the time source (used to pin timestamps in tests).
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    fn string_to_sign(request: &FrozenRequest, date: &str) -> String {
        format!(
            "{}\n{}\n{}\n{}\n{}",
            request.method().as_str(),
            request.host(),
            request.path(),
            date,
            request.canonical_param_string()
        )
    }
}

impl RequestFilter for FormSignerFilter {
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

        let date = self
            .clock
            .now_utc()
            .to_rfc3339_opts(SecondsFormat::Secs, true);
        let string_to_sign = Self::string_to_sign(request, &date);

        let mut mac = HmacSha256::new_from_slice(creds.expose_secret().as_bytes())
            .map_err(|e| CloudError::Internal(format!("HMAC key setup failed: {e}")))?;
        mac.update(string_to_sign.as_bytes());
        let signature = STANDARD.encode(mac.finalize().into_bytes());

        request.set_header("x-signature-version", Self::SIGNATURE_VERSION);
        request.set_header("x-signature-method", Self::SIGNATURE_METHOD);
        request.set_header("x-signature-date", &date);
        request.set_header(
            "authorization",
            &format!(
                "Signer identity={}, signature={signature}",
                creds.identity()
            ),
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StaticCredentials;
    use crate::request::PendingRequest;
    use chrono::TimeZone;
    use reqwest::Method;

    struct FixedClock(DateTime<Utc>);

    impl Clock for FixedClock {
        fn now_utc(&self) -> DateTime<Utc> {
            self.0
        }
    }

    fn signer() -> FormSignerFilter {
        FormSignerFilter::new(Arc::new(StaticCredentials::new("AKID", "secret")))
            .with_clock(Arc::new(FixedClock(
                Utc.with_ymd_and_hms(2009, 11, 8, 15, 54, 8).unwrap(),
            )))
    }

    fn signed_request() -> FrozenRequest {
        let mut pending = PendingRequest::new(Method::POST, "/");
        pending.add_form("Version", "2010-08-01").unwrap();
        pending.add_form("Action", "GetMetricStatistics").unwrap();
        let mut frozen = pending
            .freeze("https://monitoring.us-east-1.amazonaws.com".to_string())
            .unwrap();
        signer().apply(&mut frozen).unwrap();
        frozen
    }

    #[test]
    fn identical_requests_sign_identically() {
        let a = signed_request();
        let b = signed_request();
        assert_eq!(a.headers(), b.headers());
        assert_eq!(
            a.encoded_body().unwrap().bytes,
            b.encoded_body().unwrap().bytes
        );
    }

    #[test]
    fn signature_covers_the_canonical_parameter_order() {
        let request = signed_request();
        assert_eq!(
            request.canonical_param_string(),
            "Action=GetMetricStatistics&Version=2010-08-01"
        );
        assert_eq!(request.header("x-signature-method"), Some("HmacSHA256"));
        assert_eq!(
            request.header("x-signature-date"),
            Some("2009-11-08T15:54:08Z")
        );
        let auth = request.header("authorization").unwrap();
        assert!(auth.starts_with("Signer identity=AKID, signature="));
    }

    #[test]
    fn different_parameters_produce_different_signatures() {
        let a = signed_request();

        let mut pending = PendingRequest::new(Method::POST, "/");
        pending.add_form("Version", "2010-08-01").unwrap();
        pending.add_form("Action", "ListMetrics").unwrap();
        let mut b = pending
            .freeze("https://monitoring.us-east-1.amazonaws.com".to_string())
            .unwrap();
        signer().apply(&mut b).unwrap();

        assert_ne!(a.header("authorization"), b.header("authorization"));
    }
}
