//! Delegated request signing for direct-to-storage media uploads.
//!
//! An upsign client uploads large objects straight to cloud object storage
//! without ever holding a storage secret: every request is described to a
//! trusted remote signing endpoint, and the returned signature is spliced
//! into the outgoing headers.
//!
//! ## Example
//!
//! ```no_run
//! use bytes::Bytes;
//! use upsign::s3::{UploadParameters, Uploader};
//!
//! # async fn example(params: UploadParameters, media: Bytes) -> upsign::Result<()> {
//! let uploader = Uploader::new(upsign::default_context());
//! let location = uploader.upload(&params, media).await?;
//! println!("stored at {}", location.location);
//! # Ok(())
//! # }
//! ```

pub use upsign_core::*;

#[cfg(feature = "default-context")]
mod context;
#[cfg(feature = "default-context")]
pub use context::default_context;

#[cfg(feature = "s3")]
pub mod s3 {
    //! S3-style delegated signing and multipart uploading.
    pub use upsign_s3::*;
}
