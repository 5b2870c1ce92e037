use crate::{Context, Result, SignRequest};
use std::sync::Arc;

/// Signer is the capability callers hold to sign outgoing requests.
///
/// It pairs a [`Context`] with one [`SignRequest`] implementation and is
/// called directly and synchronously for each request, immediately before it
/// is sent. Holding the signer as an explicit value keeps the failure path
/// honest: a signing error is a `Result` the caller must handle, not a
/// swallowed callback.
#[derive(Clone, Debug)]
pub struct Signer {
    ctx: Context,
    builder: Arc<dyn SignRequest>,
}

impl Signer {
    /// Create a new signer.
    pub fn new(ctx: Context, builder: impl SignRequest) -> Self {
        Self {
            ctx,
            builder: Arc::new(builder),
        }
    }

    /// Sign the request in place.
    pub async fn sign(&self, req: &mut http::request::Parts) -> Result<()> {
        self.builder.sign_request(&self.ctx, req).await
    }
}
