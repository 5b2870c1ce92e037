use std::mem;

use http::header::HeaderName;
use http::uri::{Authority, PathAndQuery, Scheme};
use http::{HeaderMap, HeaderValue, Method, Uri};
use std::str::FromStr;

use crate::{Error, Result};

/// A decomposed, mutable view over one outgoing request.
///
/// The raw query string is kept verbatim rather than parsed into pairs:
/// both phase classification and the canonical templates are defined over
/// the exact query text, so any re-encoding here would corrupt the contract
/// the remote signer validates against.
#[derive(Debug)]
pub struct SigningRequest {
    /// HTTP method.
    pub method: Method,
    /// HTTP scheme.
    pub scheme: Scheme,
    /// HTTP authority.
    pub authority: Authority,
    /// HTTP path.
    pub path: String,
    /// Raw HTTP query string, without the leading `?`. Empty when absent.
    pub query: String,
    /// HTTP headers.
    pub headers: HeaderMap,
}

impl SigningRequest {
    /// Build a signing view from http::request::Parts.
    pub fn build(parts: &mut http::request::Parts) -> Result<Self> {
        let uri = mem::take(&mut parts.uri).into_parts();
        let paq = uri
            .path_and_query
            .unwrap_or_else(|| PathAndQuery::from_static("/"));

        Ok(SigningRequest {
            method: parts.method.clone(),
            scheme: uri.scheme.unwrap_or(Scheme::HTTP),
            authority: uri.authority.ok_or_else(|| {
                Error::request_invalid("request without authority is invalid for signing")
            })?,
            path: paq.path().to_string(),
            query: paq.query().unwrap_or_default().to_string(),

            // Take the headers out of the request to avoid copy.
            // We will return them when the view is applied back.
            headers: mem::take(&mut parts.headers),
        })
    }

    /// Apply the signing view back to http::request::Parts.
    pub fn apply(mut self, parts: &mut http::request::Parts) -> Result<()> {
        mem::swap(&mut parts.headers, &mut self.headers);
        parts.method = self.method;
        parts.uri = {
            let mut uri_parts = mem::take(&mut parts.uri).into_parts();
            uri_parts.scheme = Some(self.scheme);
            uri_parts.authority = Some(self.authority);
            uri_parts.path_and_query = {
                let paq = if self.query.is_empty() {
                    self.path
                } else {
                    let mut s = self.path;
                    s.reserve(self.query.len() + 1);
                    s.push('?');
                    s.push_str(&self.query);
                    s
                };

                Some(PathAndQuery::from_str(&paq)?)
            };
            Uri::from_parts(uri_parts)?
        };

        Ok(())
    }

    /// The request origin, `scheme://authority`.
    pub fn origin(&self) -> String {
        format!("{}://{}", self.scheme, self.authority)
    }

    /// Get a header value that must be present.
    ///
    /// Absence is a missing-parameter error carrying the header name.
    pub fn header_require(&self, key: &HeaderName) -> Result<&str> {
        match self.headers.get(key) {
            Some(v) => Ok(v.to_str()?),
            None => Err(Error::parameter_missing(format!(
                "header {key} is required but absent"
            ))),
        }
    }

    /// Replace a header outright.
    ///
    /// Remove-then-insert, so the sending library can never end up with
    /// duplicate entries for the same name.
    pub fn header_replace(&mut self, key: HeaderName, value: HeaderValue) {
        self.headers.remove(&key);
        self.headers.insert(key, value);
    }

    /// Collect headers whose name starts with the given prefix, with
    /// lowercase names.
    pub fn header_to_vec_with_prefix(&self, prefix: &str) -> Result<Vec<(String, String)>> {
        self.headers
            .iter()
            .filter(|(k, _)| k.as_str().starts_with(prefix))
            .map(|(k, v)| Ok((k.as_str().to_lowercase(), v.to_str()?.to_string())))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parts_for(uri: &str, method: Method) -> http::request::Parts {
        let mut req = http::Request::builder()
            .method(method)
            .uri(uri)
            .body(())
            .expect("request must build");
        req.headers_mut()
            .insert("x-amz-date", HeaderValue::from_static("20060102T150405Z"));
        req.into_parts().0
    }

    #[test]
    fn test_build_keeps_raw_query() {
        let mut parts = parts_for(
            "https://bucket.s3.amazonaws.com/key?uploads=",
            Method::POST,
        );
        let req = SigningRequest::build(&mut parts).expect("must build");
        assert_eq!(req.path, "/key");
        assert_eq!(req.query, "uploads=");
        assert_eq!(req.origin(), "https://bucket.s3.amazonaws.com");
    }

    #[test]
    fn test_apply_round_trips_uri() {
        let mut parts = parts_for(
            "https://bucket.s3.amazonaws.com/key?partNumber=1&uploadId=abc",
            Method::PUT,
        );
        let req = SigningRequest::build(&mut parts).expect("must build");
        req.apply(&mut parts).expect("must apply");
        assert_eq!(
            parts.uri.to_string(),
            "https://bucket.s3.amazonaws.com/key?partNumber=1&uploadId=abc"
        );
        assert!(parts.headers.contains_key("x-amz-date"));
    }

    #[test]
    fn test_build_rejects_missing_authority() {
        let mut parts = http::Request::builder()
            .method(Method::GET)
            .uri("/relative/only")
            .body(())
            .expect("request must build")
            .into_parts()
            .0;
        let err = SigningRequest::build(&mut parts).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::RequestInvalid);
    }

    #[test]
    fn test_header_replace_is_single_valued() {
        let mut parts = parts_for("https://bucket.s3.amazonaws.com/key", Method::PUT);
        parts
            .headers
            .append("x-amz-date", HeaderValue::from_static("20060103T000000Z"));
        let mut req = SigningRequest::build(&mut parts).expect("must build");

        req.header_replace(
            HeaderName::from_static("x-amz-date"),
            HeaderValue::from_static("Mon, 02 Jan 2006 15:04:05 UTC"),
        );
        let values: Vec<_> = req.headers.get_all("x-amz-date").iter().collect();
        assert_eq!(values.len(), 1);
        assert_eq!(values[0], "Mon, 02 Jan 2006 15:04:05 UTC");
    }

    #[test]
    fn test_header_require_missing() {
        let mut parts = parts_for("https://bucket.s3.amazonaws.com/key", Method::PUT);
        let req = SigningRequest::build(&mut parts).expect("must build");
        let err = req
            .header_require(&HeaderName::from_static("x-amz-acl"))
            .unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::ParameterMissing);
    }
}
