use crate::{Error, Result};
use bytes::Bytes;
use std::fmt::Debug;

/// HttpSend is used to send http requests during the signing and upload
/// process.
///
/// Both the signature delegate and the storage provider are reached through
/// this trait. It is the only I/O seam in the stack, which is what makes the
/// whole upload flow testable without a network.
#[async_trait::async_trait]
pub trait HttpSend: Debug + Send + Sync + 'static {
    /// Send http request and return the response.
    async fn http_send(&self, req: http::Request<Bytes>) -> Result<http::Response<Bytes>>;
}

/// NoopHttpSend is a no-op implementation that always returns an error.
///
/// This is used when no HTTP client is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHttpSend;

#[async_trait::async_trait]
impl HttpSend for NoopHttpSend {
    async fn http_send(&self, _req: http::Request<Bytes>) -> Result<http::Response<Bytes>> {
        Err(Error::unexpected(
            "HTTP sending not supported: no HTTP client configured",
        ))
    }
}
