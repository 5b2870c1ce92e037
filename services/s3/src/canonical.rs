//! Canonical request construction.
//!
//! The three templates below are the contract both the remote signer and the
//! storage provider validate against; they must be reproduced byte for byte.

use http::Method;
use upsign_core::{Error, Result};

/// The multipart-upload request phases a canonical template exists for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadPhase {
    /// `POST {key}?uploads=` — open a new multipart upload.
    Initiate,
    /// `PUT {key}?partNumber=N&uploadId=...` — ship one part.
    UploadPart,
    /// `POST {key}?uploadId=...` — complete (or abort) the upload.
    Complete,
}

/// Select the canonical template for a method and raw query combination.
///
/// Anything not covered by a template is an unknown request type; the
/// builder never guesses, and the error surfaces before any network call.
pub(crate) fn classify(method: &Method, raw_query: &str) -> Result<UploadPhase> {
    if raw_query == "uploads=" {
        Ok(UploadPhase::Initiate)
    } else if *method == Method::PUT {
        Ok(UploadPhase::UploadPart)
    } else if *method == Method::POST {
        Ok(UploadPhase::Complete)
    } else {
        Err(Error::request_invalid(format!(
            "unknown request type: no canonical template covers {method} with query {raw_query:?}"
        )))
    }
}

/// The fixed inputs one canonical string is derived from.
///
/// Ephemeral and purely derived; recomputed for every outgoing request
/// because the date changes each time.
pub(crate) struct CanonicalRequest<'a> {
    pub method: &'a Method,
    pub content_type: &'a str,
    pub acl: &'a str,
    pub date: &'a str,
    pub bucket: &'a str,
    pub path: &'a str,
    pub query: &'a str,
}

impl CanonicalRequest<'_> {
    pub fn string_to_sign(&self, phase: UploadPhase) -> String {
        match phase {
            UploadPhase::Initiate => format!(
                "{}\n\n{}\n\nx-amz-acl:{}\nx-amz-date:{}\n/{}{}?uploads",
                self.method, self.content_type, self.acl, self.date, self.bucket, self.path
            ),
            UploadPhase::UploadPart => format!(
                "{}\n\n\n\nx-amz-date:{}\n/{}{}?{}",
                self.method, self.date, self.bucket, self.path, self.query
            ),
            UploadPhase::Complete => format!(
                "{}\n\n{}\n\nx-amz-date:{}\n/{}{}?{}",
                self.method, self.content_type, self.date, self.bucket, self.path, self.query
            ),
        }
    }
}
