//! Reqwest backed [`HttpSend`] implementation.

use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::BodyExt;
use reqwest::{Client, Request};
use std::time::Duration;
use upsign_core::{Error, HttpSend, Result};

/// HttpSend implementation backed by a [`reqwest::Client`].
///
/// The client carries the per-call timeout. Delegate calls block an upload
/// worker until the remote signer responds, so callers that care should pass
/// a client built with an explicit timeout rather than relying on whatever
/// the transport defaults to.
#[derive(Debug, Default)]
pub struct ReqwestHttpSend {
    client: Client,
}

impl ReqwestHttpSend {
    /// Create a new ReqwestHttpSend with a prepared reqwest::Client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Create a ReqwestHttpSend whose client enforces the given timeout on
    /// every request it sends.
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::unexpected("failed to build http client").with_source(e))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpSend for ReqwestHttpSend {
    async fn http_send(&self, req: http::Request<Bytes>) -> Result<http::Response<Bytes>> {
        let req = Request::try_from(req)
            .map_err(|e| Error::request_invalid("failed to convert request").with_source(e))?;
        let resp: http::Response<_> = self
            .client
            .execute(req)
            .await
            .map_err(|e| Error::unexpected("http transport failed").with_source(e))?
            .into();

        let (parts, body) = resp.into_parts();
        let bs = BodyExt::collect(body)
            .await
            .map(|buf| buf.to_bytes())
            .map_err(|e| Error::unexpected("failed to read response body").with_source(e))?;
        Ok(http::Response::from_parts(parts, bs))
    }
}
