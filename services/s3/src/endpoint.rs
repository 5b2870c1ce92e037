//! Hostname-shape conventions for the storage provider's endpoints.
//!
//! The only recognized action URL style is virtual-host addressing with
//! exactly four dot separated host labels: `{bucket}.{s3 |
//! s3-{region}}.amazonaws.com`. Anything else is rejected with a
//! descriptive error rather than guessed at.

use crate::constants::{
    DEFAULT_REGION, ENDPOINT_DOMAIN_LABEL, ENDPOINT_HOST_LABELS, ENDPOINT_SERVICE_LABEL,
    ENDPOINT_TLD_LABEL, LOCAL_BUCKET, LOCAL_HOSTS,
};
use http::Uri;
use upsign_core::{Error, Result};

enum Host {
    /// A recognized local-test host; shape validation is bypassed.
    Local,
    /// The four validated labels of a production host.
    Labels(Vec<String>),
}

fn parse_host(url: &str) -> Result<Host> {
    let uri: Uri = url.parse()?;
    let host = uri
        .host()
        .ok_or_else(|| Error::endpoint_invalid(format!("url {url} carries no host")))?;

    if LOCAL_HOSTS.contains(&host) {
        return Ok(Host::Local);
    }

    let labels: Vec<String> = host.split('.').map(|l| l.to_string()).collect();
    if labels.len() != ENDPOINT_HOST_LABELS {
        return Err(Error::endpoint_invalid(format!(
            "host {host} must have exactly {ENDPOINT_HOST_LABELS} dot separated labels"
        )));
    }
    if !labels[1].starts_with(ENDPOINT_SERVICE_LABEL) {
        return Err(Error::endpoint_invalid(format!(
            "host {host} is not a {ENDPOINT_SERVICE_LABEL} endpoint"
        )));
    }
    if labels[2] != ENDPOINT_DOMAIN_LABEL || labels[3] != ENDPOINT_TLD_LABEL {
        return Err(Error::endpoint_invalid(format!(
            "host {host} must end in {ENDPOINT_DOMAIN_LABEL}.{ENDPOINT_TLD_LABEL}"
        )));
    }

    Ok(Host::Labels(labels))
}

/// Extract the bucket name from an action URL.
///
/// The bucket is the first host label of a virtual-host style endpoint.
pub fn bucket_of(action_url: &str) -> Result<String> {
    match parse_host(action_url)? {
        Host::Local => Ok(LOCAL_BUCKET.to_string()),
        Host::Labels(labels) => Ok(labels[0].clone()),
    }
}

/// Extract the region from an action URL.
///
/// The bare `s3` service label means the provider's default region; an
/// `s3-{region}` label carries the region explicitly.
pub fn region_of(action_url: &str) -> Result<String> {
    match parse_host(action_url)? {
        Host::Local => Ok(DEFAULT_REGION.to_string()),
        Host::Labels(labels) => {
            let service = labels[1].as_str();
            if service == ENDPOINT_SERVICE_LABEL {
                return Ok(DEFAULT_REGION.to_string());
            }
            match service.strip_prefix("s3-") {
                Some(region) if !region.is_empty() => Ok(region.to_string()),
                _ => Err(Error::endpoint_invalid(format!(
                    "service label {service} carries no region"
                ))),
            }
        }
    }
}

/// Extract the delegation token from a delegation URL's query string.
pub fn token_of(delegation_url: &str) -> Result<String> {
    let uri: Uri = delegation_url.parse()?;
    let query = uri.query().unwrap_or_default();
    form_urlencoded::parse(query.as_bytes())
        .find(|(k, _)| k == "token")
        .map(|(_, v)| v.into_owned())
        .ok_or_else(|| {
            Error::parameter_missing(format!(
                "delegation url {delegation_url} carries no token parameter"
            ))
        })
}

/// The origin (`scheme://authority`) of a delegation URL.
pub(crate) fn origin_of(delegation_url: &str) -> Result<String> {
    let uri: Uri = delegation_url.parse()?;
    let scheme = uri
        .scheme_str()
        .ok_or_else(|| Error::endpoint_invalid(format!("url {delegation_url} carries no scheme")))?;
    let authority = uri.authority().ok_or_else(|| {
        Error::endpoint_invalid(format!("url {delegation_url} carries no authority"))
    })?;
    Ok(format!("{scheme}://{authority}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;
    use upsign_core::ErrorKind;

    #[test_case("media"; "plain name")]
    #[test_case("media-uploads"; "dashed name")]
    #[test_case("m0_1-archive"; "digits and underscore")]
    fn test_bucket_of(bucket: &str) {
        let url = format!("https://{bucket}.s3.amazonaws.com");
        assert_eq!(bucket_of(&url).expect("must resolve"), bucket);
    }

    #[test_case("us-west-2")]
    #[test_case("eu-central-1")]
    #[test_case("ap-southeast-3")]
    fn test_region_of(region: &str) {
        let url = format!("https://bucket.s3-{region}.amazonaws.com");
        assert_eq!(region_of(&url).expect("must resolve"), region);
    }

    #[test]
    fn test_region_of_default() {
        assert_eq!(
            region_of("https://bucket.s3.amazonaws.com").expect("must resolve"),
            DEFAULT_REGION
        );
    }

    #[test]
    fn test_local_host_short_circuit() {
        assert_eq!(
            bucket_of("http://localhost:9000/anything").expect("must resolve"),
            LOCAL_BUCKET
        );
        assert_eq!(
            region_of("http://127.0.0.1:9000").expect("must resolve"),
            DEFAULT_REGION
        );
    }

    #[test_case("https://bucket.s3.amazonaws.com.cn"; "five labels")]
    #[test_case("https://s3.amazonaws.com"; "three labels")]
    #[test_case("https://bucket.storage.amazonaws.com"; "wrong service label")]
    #[test_case("https://bucket.s3.example.com"; "wrong domain")]
    #[test_case("https://bucket.s3.amazonaws.org"; "wrong tld")]
    fn test_bucket_of_rejects_shape(url: &str) {
        let err = bucket_of(url).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EndpointInvalid);
    }

    #[test]
    fn test_bucket_of_rejects_malformed_url() {
        let err = bucket_of("https://exa mple.com").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EndpointInvalid);
    }

    #[test]
    fn test_region_of_rejects_bare_suffix() {
        // Passes the shape check (label starts with "s3") but carries no
        // region after the dash.
        let err = region_of("https://bucket.s3-.amazonaws.com").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EndpointInvalid);

        // "s3x" is a valid bucket host label but never a region label.
        let err = region_of("https://bucket.s3x.amazonaws.com").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EndpointInvalid);
    }

    #[test_case("one-time-token")]
    #[test_case("t0k3n=with=equals"; "url encoded payload")]
    fn test_token_round_trip(token: &str) {
        let url = format!(
            "https://sign.example.com/signatures?token={}",
            form_urlencoded::byte_serialize(token.as_bytes()).collect::<String>()
        );
        assert_eq!(token_of(&url).expect("must resolve"), token);
    }

    #[test]
    fn test_token_of_missing() {
        let err = token_of("https://sign.example.com/signatures?other=1").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ParameterMissing);
    }

    #[test]
    fn test_origin_of() {
        assert_eq!(
            origin_of("https://sign.example.com:8443/v1/x?token=t").expect("must resolve"),
            "https://sign.example.com:8443"
        );
    }
}
