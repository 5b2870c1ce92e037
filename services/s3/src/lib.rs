//! Delegated signing and multipart uploading for S3-style object storage.
//!
//! The uploader in this crate never holds a storage secret. For every
//! outgoing request it either builds the provider's canonical string and
//! ships it to a remote signing endpoint (the token-keyed legacy scheme), or
//! ships a structured description of the pending request (the per-asset v4
//! scheme), then splices the returned signature into the request headers
//! before sending.

mod constants;
pub use constants::{DEFAULT_REGION, MIN_PART_SIZE};

mod endpoint;
pub use endpoint::{bucket_of, region_of, token_of};

mod canonical;
pub use canonical::UploadPhase;

mod delegate;
pub use delegate::{GrantedSignature, SignatureDelegate, StructuredDescription};

mod sign_request;
pub use sign_request::{LegacyScheme, RequestSigner, SigningScheme, V4Scheme};

mod parameters;
pub use parameters::UploadParameters;

mod upload;
pub use upload::{ObjectLocation, SchemeKind, UploadOptions, Uploader};
