use crate::canonical::{classify, CanonicalRequest, UploadPhase};
use crate::constants::{X_AMZ_CONTENT_SHA_256, X_AMZ_DATE, XML_CONTENT_TYPE};
use crate::delegate::{SignatureDelegate, StructuredDescription};
use async_trait::async_trait;
use http::header::{HeaderName, AUTHORIZATION, CONTENT_TYPE};
use http::request::Parts;
use http::HeaderValue;
use log::debug;
use upsign_core::time::{format_http_date, parse_compact_datetime};
use upsign_core::{Context, Error, Result, SignRequest, SigningRequest};

/// The delegation scheme a signer speaks.
///
/// Two generations of the signing endpoint exist. They share the delegate
/// and all header-rewrite plumbing; only the shape of what is shipped to the
/// endpoint differs, so they are variants of one capability rather than two
/// signers.
#[derive(Debug, Clone)]
pub enum SigningScheme {
    /// Token-keyed delegation: the canonical string is built locally and
    /// shipped alone; the response is a bare signature.
    Legacy(LegacyScheme),
    /// Per-asset delegation: a structured description of the pending request
    /// is shipped; the response carries the full authorization value and may
    /// reissue the request date.
    V4(V4Scheme),
}

/// Fixed fields the legacy canonical string closes over.
#[derive(Debug, Clone)]
pub struct LegacyScheme {
    /// Access-key identifier spliced into the authorization header.
    pub access_key_id: String,
    /// Canned ACL of the upload.
    pub acl: String,
    /// Content type of the object being uploaded.
    pub content_type: String,
    /// Bucket resolved from the action URL.
    pub bucket: String,
}

/// Fixed fields the structured description closes over.
#[derive(Debug, Clone)]
pub struct V4Scheme {
    /// Region resolved from the action URL or carried in the upload
    /// parameters.
    pub region: String,
}

/// Signs one outgoing request by delegating to a remote signing endpoint.
///
/// Captured state is read-only for the lifetime of one upload; concurrent
/// invocations are safe because each one only touches the request it was
/// handed.
#[derive(Debug)]
pub struct RequestSigner {
    scheme: SigningScheme,
    delegate: SignatureDelegate,
}

impl RequestSigner {
    /// Create a signer for one upload.
    pub fn new(scheme: SigningScheme, delegate: SignatureDelegate) -> Self {
        Self { scheme, delegate }
    }

    async fn sign_legacy(
        &self,
        ctx: &Context,
        scheme: &LegacyScheme,
        req: &mut SigningRequest,
    ) -> Result<()> {
        // Normalize the date header first: the compact stamp the uploader
        // wrote becomes the textual form the signer and the provider expect.
        let raw_date = req
            .header_require(&HeaderName::from_static(X_AMZ_DATE))?
            .to_string();
        let date = format_http_date(parse_compact_datetime(&raw_date)?);
        req.header_replace(
            HeaderName::from_static(X_AMZ_DATE),
            HeaderValue::from_str(&date)?,
        );

        let phase = classify(&req.method, &req.query)?;
        if phase == UploadPhase::Complete {
            req.header_replace(CONTENT_TYPE, HeaderValue::from_static(XML_CONTENT_TYPE));
        }
        let content_type = match phase {
            UploadPhase::Initiate => scheme.content_type.as_str(),
            UploadPhase::Complete => XML_CONTENT_TYPE,
            UploadPhase::UploadPart => "",
        };

        let string_to_sign = CanonicalRequest {
            method: &req.method,
            content_type,
            acl: &scheme.acl,
            date: &date,
            bucket: &scheme.bucket,
            path: &req.path,
            query: &req.query,
        }
        .string_to_sign(phase);
        debug!("calculated string to sign: {string_to_sign}");

        let signature = self.delegate.fetch_signature(ctx, &string_to_sign).await?;

        // Whatever the sending library put there is stale now.
        req.headers.remove(AUTHORIZATION);
        req.headers.remove(X_AMZ_CONTENT_SHA_256);

        let mut authorization =
            HeaderValue::from_str(&format!("AWS {}:{}", scheme.access_key_id, signature))?;
        authorization.set_sensitive(true);
        req.headers.insert(AUTHORIZATION, authorization);

        Ok(())
    }

    async fn sign_v4(
        &self,
        ctx: &Context,
        scheme: &V4Scheme,
        req: &mut SigningRequest,
    ) -> Result<()> {
        // The to-be-signed subset: provider extension headers plus the
        // content type the client already set.
        let mut headers = req.header_to_vec_with_prefix("x-amz-")?;
        if let Some(ct) = req.headers.get(CONTENT_TYPE) {
            headers.push(("content-type".to_string(), ct.to_str()?.to_string()));
        }

        let description = StructuredDescription {
            method: req.method.as_str().to_string(),
            action: req.origin(),
            path: req.path.clone(),
            region: scheme.region.clone(),
            raw_query: req.query.clone(),
            headers: headers.into_iter().collect(),
        };

        let granted = self.delegate.fetch_authorization(ctx, &description).await?;

        if let Some(date) = &granted.date {
            req.header_replace(
                HeaderName::from_static(X_AMZ_DATE),
                HeaderValue::from_str(date)?,
            );
        }

        let mut authorization = HeaderValue::from_str(&granted.signature)?;
        authorization.set_sensitive(true);
        req.header_replace(AUTHORIZATION, authorization);

        Ok(())
    }
}

#[async_trait]
impl SignRequest for RequestSigner {
    async fn sign_request(&self, ctx: &Context, req: &mut Parts) -> Result<()> {
        let mut signing_req = SigningRequest::build(req)?;

        match &self.scheme {
            SigningScheme::Legacy(scheme) => {
                self.sign_legacy(ctx, scheme, &mut signing_req).await?
            }
            SigningScheme::V4(scheme) => self.sign_v4(ctx, scheme, &mut signing_req).await?,
        }

        signing_req.apply(req)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http::{Method, Request, StatusCode};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use upsign_core::{ErrorKind, HttpSend};

    #[derive(Debug)]
    struct StubDelegateServer {
        body: &'static str,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl HttpSend for StubDelegateServer {
        async fn http_send(&self, _req: Request<Bytes>) -> Result<http::Response<Bytes>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(http::Response::builder()
                .status(StatusCode::OK)
                .body(Bytes::from_static(self.body.as_bytes()))
                .expect("response must build"))
        }
    }

    fn stub_ctx(body: &'static str) -> (Context, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let ctx = Context::new().with_http_send(StubDelegateServer {
            body,
            calls: calls.clone(),
        });
        (ctx, calls)
    }

    fn legacy_signer() -> RequestSigner {
        RequestSigner::new(
            SigningScheme::Legacy(LegacyScheme {
                access_key_id: "AKID".to_string(),
                acl: "public-read".to_string(),
                content_type: "video/mp4".to_string(),
                bucket: "media".to_string(),
            }),
            SignatureDelegate::new("https://sign.example.com/videos/1/signatures?token=t"),
        )
    }

    fn parts_for(method: Method, uri: &str) -> Parts {
        let mut req = Request::builder()
            .method(method)
            .uri(uri)
            .body(())
            .expect("request must build");
        req.headers_mut().insert(
            X_AMZ_DATE,
            HeaderValue::from_static("20060102T150405Z"),
        );
        req.headers_mut().insert(
            X_AMZ_CONTENT_SHA_256,
            HeaderValue::from_static("UNSIGNED-PAYLOAD"),
        );
        req.into_parts().0
    }

    #[tokio::test]
    async fn test_legacy_initiate_signing() {
        let _ = env_logger::builder().is_test(true).try_init();
        let (ctx, calls) = stub_ctx(r#"{"signature":"SIG"}"#);
        let mut parts = parts_for(Method::POST, "https://media.s3.amazonaws.com/bar?uploads=");

        legacy_signer()
            .sign_request(&ctx, &mut parts)
            .await
            .expect("must sign");

        assert_eq!(parts.headers[AUTHORIZATION], "AWS AKID:SIG");
        assert!(!parts.headers.contains_key(X_AMZ_CONTENT_SHA_256));
        assert_eq!(
            parts.headers[X_AMZ_DATE],
            "Mon, 02 Jan 2006 15:04:05 UTC"
        );
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_legacy_complete_forces_content_type() {
        let (ctx, _) = stub_ctx(r#"{"signature":"SIG"}"#);
        let mut parts = parts_for(
            Method::POST,
            "https://media.s3.amazonaws.com/bar?uploadId=abc",
        );
        parts
            .headers
            .insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));

        legacy_signer()
            .sign_request(&ctx, &mut parts)
            .await
            .expect("must sign");

        assert_eq!(parts.headers[CONTENT_TYPE], XML_CONTENT_TYPE);
    }

    #[tokio::test]
    async fn test_unknown_request_type_never_reaches_delegate() {
        let (ctx, calls) = stub_ctx(r#"{"signature":"SIG"}"#);
        let mut parts = parts_for(Method::GET, "https://media.s3.amazonaws.com/bar");

        let err = legacy_signer()
            .sign_request(&ctx, &mut parts)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::RequestInvalid);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_missing_date_header() {
        let (ctx, calls) = stub_ctx(r#"{"signature":"SIG"}"#);
        let mut parts = parts_for(Method::PUT, "https://media.s3.amazonaws.com/bar?partNumber=1");
        parts.headers.remove(X_AMZ_DATE);

        let err = legacy_signer()
            .sign_request(&ctx, &mut parts)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ParameterMissing);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_malformed_date_header() {
        let (ctx, calls) = stub_ctx(r#"{"signature":"SIG"}"#);
        let mut parts = parts_for(Method::PUT, "https://media.s3.amazonaws.com/bar?partNumber=1");
        parts.headers.insert(
            X_AMZ_DATE,
            HeaderValue::from_static("20060102T150405"),
        );

        let err = legacy_signer()
            .sign_request(&ctx, &mut parts)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::FormatInvalid);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_v4_signing_applies_reissued_date_and_verbatim_authorization() {
        let (ctx, calls) = stub_ctx(
            r#"{"signature":"AWS4-HMAC-SHA256 Credential=AKID/20060102, Signature=abcd","date":"20060102T160000Z"}"#,
        );
        let signer = RequestSigner::new(
            SigningScheme::V4(V4Scheme {
                region: "us-east-1".to_string(),
            }),
            SignatureDelegate::new("https://sign.example.com/assets/9/signature"),
        );
        let mut parts = parts_for(
            Method::PUT,
            "https://media.s3.amazonaws.com/bar?partNumber=1&uploadId=abc",
        );

        signer
            .sign_request(&ctx, &mut parts)
            .await
            .expect("must sign");

        assert_eq!(
            parts.headers[AUTHORIZATION],
            "AWS4-HMAC-SHA256 Credential=AKID/20060102, Signature=abcd"
        );
        assert_eq!(parts.headers[X_AMZ_DATE], "20060102T160000Z");
        // The structured scheme leaves the payload hash header alone.
        assert!(parts.headers.contains_key(X_AMZ_CONTENT_SHA_256));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
