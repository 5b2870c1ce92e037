// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

use crate::http::{HttpSend, NoopHttpSend};
use crate::Result;
use bytes::Bytes;
use std::fmt::Debug;
use std::sync::Arc;

/// Context provides the environment for request signing and uploading.
///
/// ## Important
///
/// upsign provides NO default transport. Any unconfigured component uses a
/// no-op implementation that returns errors when called, so a missing
/// transport fails loudly rather than reaching for ambient globals.
///
/// ## Example
///
/// ```ignore
/// use upsign_core::Context;
/// use upsign_http_send_reqwest::ReqwestHttpSend;
///
/// let ctx = Context::new().with_http_send(ReqwestHttpSend::default());
/// ```
#[derive(Clone)]
pub struct Context {
    http: Arc<dyn HttpSend>,
}

impl Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context").field("http", &self.http).finish()
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl Context {
    /// Create a new Context with a no-op transport.
    pub fn new() -> Self {
        Self {
            http: Arc::new(NoopHttpSend),
        }
    }

    /// Replace the HTTP client implementation.
    pub fn with_http_send(mut self, http: impl HttpSend) -> Self {
        self.http = Arc::new(http);
        self
    }

    /// Send http request and return the response.
    #[inline]
    pub async fn http_send(&self, req: http::Request<Bytes>) -> Result<http::Response<Bytes>> {
        self.http.http_send(req).await
    }

    /// Send http request and return the response as string.
    pub async fn http_send_as_string(
        &self,
        req: http::Request<Bytes>,
    ) -> Result<http::Response<String>> {
        let (parts, body) = self.http.http_send(req).await?.into_parts();
        let body = String::from_utf8_lossy(&body).to_string();
        Ok(http::Response::from_parts(parts, body))
    }
}
