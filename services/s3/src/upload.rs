//! The upload coordinator.
//!
//! Drives the provider's multipart sequence — initiate, N concurrent part
//! uploads, complete — and signs every request synchronously before it is
//! sent. The signer is held as an explicit capability: a signing failure is
//! a `Result` on the request path, aborts that request, and aborts the whole
//! upload.

use crate::constants::{
    DEFAULT_DELEGATE_TIMEOUT, DEFAULT_PART_CONCURRENCY, DEFAULT_PART_SIZE, KEY_ENCODE_SET,
    LEGACY_SIGNING_PATH, MIN_PART_SIZE, XML_CONTENT_TYPE, X_AMZ_ACL, X_AMZ_DATE,
};
use crate::delegate::SignatureDelegate;
use crate::endpoint;
use crate::parameters::UploadParameters;
use crate::sign_request::{LegacyScheme, RequestSigner, SigningScheme, V4Scheme};
use bytes::Bytes;
use http::header::{CONTENT_LENGTH, CONTENT_TYPE, ETAG};
use http::{Method, Request, StatusCode};
use log::{debug, warn};
use percent_encoding::utf8_percent_encode;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use upsign_core::time::{format_compact_datetime, now};
use upsign_core::{Context, Error, Result, Signer};

/// Which delegation scheme the coordinator builds its signer for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SchemeKind {
    /// Token-keyed delegation (older upstream APIs).
    Legacy,
    /// Per-asset delegation.
    #[default]
    V4,
}

/// Tunables for one upload.
#[derive(Debug, Clone)]
pub struct UploadOptions {
    /// Delegation scheme to sign with.
    pub scheme: SchemeKind,
    /// Size of each uploaded part. The provider rejects non-final parts
    /// below its floor, so production callers should stay at or above
    /// [`MIN_PART_SIZE`].
    pub part_size: usize,
    /// How many part uploads may be in flight at once.
    pub concurrency: usize,
    /// How long one delegate call may block an upload worker.
    pub delegate_timeout: Duration,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            scheme: SchemeKind::default(),
            part_size: DEFAULT_PART_SIZE,
            concurrency: DEFAULT_PART_CONCURRENCY,
            delegate_timeout: DEFAULT_DELEGATE_TIMEOUT,
        }
    }
}

/// Where a completed upload ended up.
#[derive(Debug, Clone)]
pub struct ObjectLocation {
    /// Full URL of the stored object, as reported by the provider.
    pub location: String,
    /// Bucket the object landed in.
    pub bucket: String,
    /// Key the object landed at.
    pub key: String,
    /// Entity tag of the assembled object, if the provider reported one.
    pub etag: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InitiateMultipartUploadResult {
    upload_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CompleteMultipartUploadResult {
    location: String,
    bucket: String,
    key: String,
    #[serde(default)]
    e_tag: Option<String>,
}

#[derive(Debug, Serialize)]
struct CompleteMultipartUpload {
    #[serde(rename = "Part")]
    parts: Vec<CompletedPart>,
}

#[derive(Debug, Serialize)]
struct CompletedPart {
    #[serde(rename = "PartNumber")]
    part_number: u32,
    #[serde(rename = "ETag")]
    etag: String,
}

/// Uploads one object through the provider's multipart sequence, signing
/// every request via a remote delegate.
#[derive(Debug, Clone)]
pub struct Uploader {
    ctx: Context,
    opts: UploadOptions,
}

impl Uploader {
    /// Create an uploader with default options.
    pub fn new(ctx: Context) -> Self {
        Self {
            ctx,
            opts: UploadOptions::default(),
        }
    }

    /// Override the upload options.
    pub fn with_options(mut self, opts: UploadOptions) -> Self {
        self.opts = opts;
        self
    }

    /// Upload the object described by `params`, returning its final
    /// location or the first fatal error.
    pub async fn upload(&self, params: &UploadParameters, body: Bytes) -> Result<ObjectLocation> {
        self.upload_with_cancel(params, body, CancellationToken::new())
            .await
    }

    /// Upload with external cancellation.
    ///
    /// Once `cancel` fires, no further signer invocations are started, the
    /// pending storage sends are abandoned, and the upload returns a
    /// cancellation error. A signing round already in flight runs to
    /// completion; its result is discarded.
    pub async fn upload_with_cancel(
        &self,
        params: &UploadParameters,
        body: Bytes,
        cancel: CancellationToken,
    ) -> Result<ObjectLocation> {
        // Resolve everything that can fail locally before any request is
        // sent.
        let bucket = endpoint::bucket_of(&params.action)?;
        let region = match &params.region {
            Some(region) => region.clone(),
            None => endpoint::region_of(&params.action)?,
        };
        let delegation_url = self.delegation_url(params)?;
        let expected_status = StatusCode::from_u16(params.success_action_status)
            .map_err(|e| Error::format_invalid("success status is not a status code").with_source(e))?;

        if self.opts.part_size < MIN_PART_SIZE {
            warn!(
                "part size {} is below the provider floor of {MIN_PART_SIZE} bytes",
                self.opts.part_size
            );
        }

        let scheme = match self.opts.scheme {
            SchemeKind::Legacy => SigningScheme::Legacy(LegacyScheme {
                access_key_id: params.access_key_id.clone(),
                acl: params.acl.clone(),
                content_type: params.content_type.clone(),
                bucket: bucket.clone(),
            }),
            SchemeKind::V4 => SigningScheme::V4(V4Scheme {
                region: region.clone(),
            }),
        };
        let delegate =
            SignatureDelegate::new(delegation_url).with_timeout(self.opts.delegate_timeout);
        let signer = Signer::new(self.ctx.clone(), RequestSigner::new(scheme, delegate));

        let object_url = object_url(&params.action, &params.key);

        if cancel.is_cancelled() {
            return Err(Error::cancelled("upload cancelled before it started"));
        }

        let upload_id = self.initiate(&signer, params, &object_url).await?;
        debug!("initiated multipart upload {upload_id} for key {}", params.key);

        let parts = self
            .upload_parts(&signer, &object_url, &upload_id, body, &cancel)
            .await?;

        if cancel.is_cancelled() {
            return Err(Error::cancelled("upload cancelled before completion"));
        }

        self.complete(&signer, &object_url, &upload_id, parts, expected_status)
            .await
    }

    /// Resolve the signing endpoint for this upload.
    ///
    /// The legacy endpoint is the issued delegation URL's origin with the
    /// fixed signing path keyed by video id and token; the per-asset URL is
    /// used as issued.
    fn delegation_url(&self, params: &UploadParameters) -> Result<String> {
        let issued = params.signature_url.as_deref().ok_or_else(|| {
            Error::parameter_missing("upload parameters carry no delegation url")
        })?;
        match self.opts.scheme {
            SchemeKind::V4 => Ok(issued.to_string()),
            SchemeKind::Legacy => {
                let token = endpoint::token_of(issued)?;
                let origin = endpoint::origin_of(issued)?;
                let path = LEGACY_SIGNING_PATH.replace("{video}", &params.video_id);
                Ok(format!("{origin}{path}?token={token}"))
            }
        }
    }

    async fn initiate(
        &self,
        signer: &Signer,
        params: &UploadParameters,
        object_url: &str,
    ) -> Result<String> {
        let req = Request::builder()
            .method(Method::POST)
            .uri(format!("{object_url}?uploads="))
            .header(CONTENT_TYPE, params.content_type.as_str())
            .header(X_AMZ_ACL, params.acl.as_str())
            .header(X_AMZ_DATE, format_compact_datetime(now()))
            .body(Bytes::new())?;
        let (mut parts, body) = req.into_parts();

        signer.sign(&mut parts).await?;

        let resp = self
            .ctx
            .http_send_as_string(Request::from_parts(parts, body))
            .await?;
        if resp.status() != StatusCode::OK {
            return Err(Error::unexpected(format!(
                "initiate failed with {}: {}",
                resp.status(),
                resp.body()
            )));
        }

        let parsed: InitiateMultipartUploadResult =
            quick_xml::de::from_str(resp.body()).map_err(|e| {
                Error::unexpected("initiate response is not an initiation document").with_source(e)
            })?;
        Ok(parsed.upload_id)
    }

    async fn upload_parts(
        &self,
        signer: &Signer,
        object_url: &str,
        upload_id: &str,
        body: Bytes,
        cancel: &CancellationToken,
    ) -> Result<Vec<CompletedPart>> {
        let chunks = split_parts(body, self.opts.part_size);
        let total = chunks.len();
        debug!("uploading {total} parts of at most {} bytes", self.opts.part_size);

        let semaphore = Arc::new(Semaphore::new(self.opts.concurrency.max(1)));
        let mut tasks: JoinSet<Result<CompletedPart>> = JoinSet::new();

        for (idx, chunk) in chunks.into_iter().enumerate() {
            let part_number = (idx + 1) as u32;
            let uri = format!("{object_url}?partNumber={part_number}&uploadId={upload_id}");
            let ctx = self.ctx.clone();
            let signer = signer.clone();
            let semaphore = semaphore.clone();
            let cancel = cancel.clone();

            tasks.spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|e| Error::unexpected("upload worker pool closed").with_source(e))?;
                upload_one_part(&ctx, &signer, &cancel, uri, part_number, chunk).await
            });
        }

        let mut completed = Vec::with_capacity(total);
        let mut first_err: Option<Error> = None;
        while let Some(joined) = tasks.join_next().await {
            let result = joined
                .map_err(|e| Error::unexpected("upload worker panicked").with_source(e))
                .and_then(|r| r);
            match result {
                Ok(part) => completed.push(part),
                Err(err) => {
                    // First failure wins; stop handing out new work and let
                    // the remaining tasks drain.
                    cancel.cancel();
                    if first_err.is_none() {
                        first_err = Some(err);
                    }
                }
            }
        }
        if let Some(err) = first_err {
            return Err(err);
        }

        // The provider requires parts in ascending order.
        completed.sort_by_key(|p| p.part_number);
        Ok(completed)
    }

    async fn complete(
        &self,
        signer: &Signer,
        object_url: &str,
        upload_id: &str,
        parts_manifest: Vec<CompletedPart>,
        expected_status: StatusCode,
    ) -> Result<ObjectLocation> {
        let manifest = CompleteMultipartUpload {
            parts: parts_manifest,
        };
        let xml = quick_xml::se::to_string(&manifest).map_err(|e| {
            Error::unexpected("failed to serialize completion manifest").with_source(e)
        })?;

        let req = Request::builder()
            .method(Method::POST)
            .uri(format!("{object_url}?uploadId={upload_id}"))
            .header(CONTENT_TYPE, XML_CONTENT_TYPE)
            .header(X_AMZ_DATE, format_compact_datetime(now()))
            .body(Bytes::from(xml))?;
        let (mut parts, body) = req.into_parts();

        signer.sign(&mut parts).await?;

        let resp = self
            .ctx
            .http_send_as_string(Request::from_parts(parts, body))
            .await?;
        if resp.status() != expected_status {
            return Err(Error::unexpected(format!(
                "complete failed with {} (expected {expected_status}): {}",
                resp.status(),
                resp.body()
            )));
        }

        let parsed: CompleteMultipartUploadResult =
            quick_xml::de::from_str(resp.body()).map_err(|e| {
                Error::unexpected("complete response is not a completion document").with_source(e)
            })?;
        Ok(ObjectLocation {
            location: parsed.location,
            bucket: parsed.bucket,
            key: parsed.key,
            etag: parsed.e_tag,
        })
    }
}

async fn upload_one_part(
    ctx: &Context,
    signer: &Signer,
    cancel: &CancellationToken,
    uri: String,
    part_number: u32,
    chunk: Bytes,
) -> Result<CompletedPart> {
    // No new signer invocations once cancellation has been observed.
    if cancel.is_cancelled() {
        return Err(Error::cancelled(format!(
            "part {part_number} skipped: upload cancelled"
        )));
    }

    let req = Request::builder()
        .method(Method::PUT)
        .uri(uri)
        .header(CONTENT_LENGTH, chunk.len())
        .header(X_AMZ_DATE, format_compact_datetime(now()))
        .body(chunk)?;
    let (mut parts, chunk) = req.into_parts();

    // A signing round already in flight runs to completion; its result is
    // discarded if cancellation arrived meanwhile.
    signer.sign(&mut parts).await?;
    if cancel.is_cancelled() {
        return Err(Error::cancelled(format!(
            "part {part_number} discarded: upload cancelled"
        )));
    }

    let send = ctx.http_send(Request::from_parts(parts, chunk));
    tokio::pin!(send);
    let resp = tokio::select! {
        _ = cancel.cancelled() => {
            return Err(Error::cancelled(format!(
                "part {part_number} abandoned: upload cancelled"
            )))
        }
        resp = &mut send => resp?,
    };

    if resp.status() != StatusCode::OK {
        return Err(Error::unexpected(format!(
            "part {part_number} upload failed with {}",
            resp.status()
        )));
    }

    let etag = resp
        .headers()
        .get(ETAG)
        .ok_or_else(|| {
            Error::unexpected(format!("part {part_number} response carries no etag"))
        })?
        .to_str()?
        .to_string();

    Ok(CompletedPart { part_number, etag })
}

/// The object URL the three phases target: the action endpoint joined with
/// the percent-encoded key.
fn object_url(action: &str, key: &str) -> String {
    let action = action.trim_end_matches('/');
    let key = utf8_percent_encode(key, &KEY_ENCODE_SET);
    format!("{action}/{key}")
}

/// Slice the body into at-most-`part_size` chunks, cheaply.
///
/// An empty body still yields one empty part so the protocol shape holds.
fn split_parts(body: Bytes, part_size: usize) -> Vec<Bytes> {
    let part_size = part_size.max(1);
    if body.is_empty() {
        return vec![body];
    }

    let mut parts = Vec::with_capacity(body.len() / part_size + 1);
    let mut rest = body;
    while rest.len() > part_size {
        parts.push(rest.split_to(part_size));
    }
    parts.push(rest);
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_parts() {
        let body = Bytes::from(vec![7u8; 10]);
        let parts = split_parts(body, 4);
        assert_eq!(
            parts.iter().map(|p| p.len()).collect::<Vec<_>>(),
            vec![4, 4, 2]
        );

        // Exact multiple: no trailing empty part.
        let body = Bytes::from(vec![7u8; 8]);
        assert_eq!(split_parts(body, 4).len(), 2);

        // Empty body keeps the protocol shape with one empty part.
        assert_eq!(split_parts(Bytes::new(), 4).len(), 1);
    }

    #[test]
    fn test_object_url_encodes_key() {
        assert_eq!(
            object_url("https://media.s3.amazonaws.com", "uploads/raw file.mp4"),
            "https://media.s3.amazonaws.com/uploads/raw%20file.mp4"
        );
        // A trailing slash on the action does not double up.
        assert_eq!(
            object_url("https://media.s3.amazonaws.com/", "k"),
            "https://media.s3.amazonaws.com/k"
        );
    }

    #[test]
    fn test_completion_manifest_xml() {
        let manifest = CompleteMultipartUpload {
            parts: vec![
                CompletedPart {
                    part_number: 1,
                    etag: "\"etag-1\"".to_string(),
                },
                CompletedPart {
                    part_number: 2,
                    etag: "\"etag-2\"".to_string(),
                },
            ],
        };
        let xml = quick_xml::se::to_string(&manifest).expect("must serialize");
        assert_eq!(
            xml,
            "<CompleteMultipartUpload>\
             <Part><PartNumber>1</PartNumber><ETag>\"etag-1\"</ETag></Part>\
             <Part><PartNumber>2</PartNumber><ETag>\"etag-2\"</ETag></Part>\
             </CompleteMultipartUpload>"
        );
    }

    #[test]
    fn test_initiation_document_parses() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
            <InitiateMultipartUploadResult>
              <Bucket>media</Bucket>
              <Key>uploads/raw.mp4</Key>
              <UploadId>upload-1</UploadId>
            </InitiateMultipartUploadResult>"#;
        let parsed: InitiateMultipartUploadResult =
            quick_xml::de::from_str(xml).expect("must parse");
        assert_eq!(parsed.upload_id, "upload-1");
    }
}
