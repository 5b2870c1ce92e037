use crate::{Context, Result};
use std::fmt::Debug;

/// SignRequest is the trait a service-specific signer implements.
///
/// An implementation rewrites the headers of the one request it is given so
/// the storage provider will accept it. It may call out to a remote signing
/// endpoint through the context's transport; it never holds a secret key.
///
/// Implementations must be safe to invoke concurrently: captured state is
/// read for the lifetime of one upload, and each invocation only inspects
/// and mutates the request it was handed.
#[async_trait::async_trait]
pub trait SignRequest: Debug + Send + Sync + 'static {
    /// Sign the request in place.
    ///
    /// Every failure mode has a return path here. Errors raised while
    /// normalizing, canonicalizing, or delegating abort the request before
    /// it is sent and must be propagated by the caller, never swallowed.
    async fn sign_request(&self, ctx: &Context, req: &mut http::request::Parts) -> Result<()>;
}
