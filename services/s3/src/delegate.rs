//! The remote signing endpoint.

use crate::constants::DEFAULT_DELEGATE_TIMEOUT;
use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{Method, StatusCode};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use upsign_core::{Context, Error, Result};

/// A handle on the remote signing endpoint for one upload.
///
/// The delegate POSTs a canonical description of the pending request and
/// parses back a signature. It performs no retries; retry policy, if any,
/// belongs to the caller.
#[derive(Debug, Clone)]
pub struct SignatureDelegate {
    url: String,
    timeout: Duration,
}

/// Legacy wire body: the canonical string, nothing else.
#[derive(Debug, Serialize)]
struct CanonicalEnvelope<'a> {
    headers: &'a str,
}

/// Structured wire body: a description of the pending request, including
/// the subset of headers the client intends to sign.
#[derive(Debug, Clone, Serialize)]
pub struct StructuredDescription {
    /// HTTP method of the pending request.
    pub method: String,
    /// The action endpoint the request targets.
    pub action: String,
    /// Request path.
    pub path: String,
    /// Region the action endpoint resolves to.
    pub region: String,
    /// Raw query string, verbatim.
    pub raw_query: String,
    /// To-be-signed headers, lowercase names, sorted.
    pub headers: BTreeMap<String, String>,
}

/// What the signing endpoint granted.
#[derive(Debug, Deserialize)]
pub struct GrantedSignature {
    /// The signature value; opaque, valid only for the request described.
    pub signature: String,
    /// A reissued date the client must stamp on the request, if any.
    #[serde(default)]
    pub date: Option<String>,
}

impl SignatureDelegate {
    /// Create a delegate for the given signing endpoint URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout: DEFAULT_DELEGATE_TIMEOUT,
        }
    }

    /// Override how long one signing call may block.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The signing endpoint this delegate talks to.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Ship a canonical string, get back a bare signature (legacy scheme).
    pub async fn fetch_signature(&self, ctx: &Context, canonical: &str) -> Result<String> {
        let body = serde_json::to_vec(&CanonicalEnvelope { headers: canonical })
            .map_err(|e| Error::unexpected("failed to serialize signing request").with_source(e))?;
        let granted = self.post(ctx, body).await?;
        Ok(granted.signature)
    }

    /// Ship a structured request description, get back the full
    /// authorization and an optional reissued date (v4 scheme).
    pub async fn fetch_authorization(
        &self,
        ctx: &Context,
        description: &StructuredDescription,
    ) -> Result<GrantedSignature> {
        let body = serde_json::to_vec(description)
            .map_err(|e| Error::unexpected("failed to serialize signing request").with_source(e))?;
        self.post(ctx, body).await
    }

    async fn post(&self, ctx: &Context, body: Vec<u8>) -> Result<GrantedSignature> {
        let req = http::Request::builder()
            .method(Method::POST)
            .uri(&self.url)
            .header(CONTENT_TYPE, "application/json")
            .body(Bytes::from(body))?;

        debug!("requesting signature from {}", self.url);
        let resp = tokio::time::timeout(self.timeout, ctx.http_send_as_string(req))
            .await
            .map_err(|_| {
                Error::delegate_failed(format!(
                    "signing endpoint {} did not respond within {:?}",
                    self.url, self.timeout
                ))
            })?
            .map_err(|e| {
                Error::delegate_failed(format!("transport to signing endpoint {} failed", self.url))
                    .with_source(e)
            })?;

        if resp.status() != StatusCode::OK {
            return Err(Error::delegate_failed(format!(
                "signing endpoint {} returned {}: {}",
                self.url,
                resp.status(),
                resp.body()
            )));
        }

        serde_json::from_str(resp.body()).map_err(|e| {
            Error::delegate_failed(format!(
                "signing endpoint {} returned an unparsable body",
                self.url
            ))
            .with_source(e)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use upsign_core::{ErrorKind, HttpSend};

    #[derive(Debug)]
    struct StaticSigner {
        status: StatusCode,
        body: &'static str,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl HttpSend for StaticSigner {
        async fn http_send(&self, req: http::Request<Bytes>) -> Result<http::Response<Bytes>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            assert_eq!(req.method(), Method::POST);
            Ok(http::Response::builder()
                .status(self.status)
                .body(Bytes::from_static(self.body.as_bytes()))
                .expect("response must build"))
        }
    }

    fn ctx_with(status: StatusCode, body: &'static str) -> (Context, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let ctx = Context::new().with_http_send(StaticSigner {
            status,
            body,
            calls: calls.clone(),
        });
        (ctx, calls)
    }

    #[tokio::test]
    async fn test_fetch_signature() {
        let (ctx, calls) = ctx_with(StatusCode::OK, r#"{"signature":"SIG"}"#);
        let delegate = SignatureDelegate::new("https://sign.example.com/v1");
        let sig = delegate
            .fetch_signature(&ctx, "POST\n\n...")
            .await
            .expect("must sign");
        assert_eq!(sig, "SIG");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fetch_authorization_with_date() {
        let (ctx, _) = ctx_with(
            StatusCode::OK,
            r#"{"signature":"AWS4-HMAC-SHA256 ...","date":"20060102T150405Z"}"#,
        );
        let delegate = SignatureDelegate::new("https://sign.example.com/v4");
        let granted = delegate
            .fetch_authorization(
                &ctx,
                &StructuredDescription {
                    method: "PUT".into(),
                    action: "https://media.s3.amazonaws.com".into(),
                    path: "/key".into(),
                    region: "us-east-1".into(),
                    raw_query: "partNumber=1&uploadId=abc".into(),
                    headers: BTreeMap::new(),
                },
            )
            .await
            .expect("must sign");
        assert_eq!(granted.date.as_deref(), Some("20060102T150405Z"));
    }

    #[tokio::test]
    async fn test_non_200_is_delegate_failure() {
        let (ctx, _) = ctx_with(StatusCode::FORBIDDEN, "denied");
        let delegate = SignatureDelegate::new("https://sign.example.com/v1");
        let err = delegate.fetch_signature(&ctx, "creq").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DelegateFailed);
    }

    #[tokio::test]
    async fn test_unparsable_body_is_delegate_failure() {
        let (ctx, _) = ctx_with(StatusCode::OK, "not json");
        let delegate = SignatureDelegate::new("https://sign.example.com/v1");
        let err = delegate.fetch_signature(&ctx, "creq").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DelegateFailed);
    }
}
