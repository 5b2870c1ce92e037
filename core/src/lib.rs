//! Core components for delegated request signing.
//!
//! This crate provides the foundational types for the upsign ecosystem. The
//! signing work itself lives in service crates; what belongs here is the
//! shared frame they all agree on:
//!
//! - **Context**: a container holding the HTTP transport used for both
//!   delegate calls and storage requests
//! - **SignRequest**: the trait a service-specific signer implements
//! - **Signer**: the capability callers hold and invoke synchronously for
//!   each outgoing request
//! - **SigningRequest**: a decomposed, mutable view over
//!   `http::request::Parts`
//!
//! ## Example
//!
//! ```no_run
//! use upsign_core::{Context, Result, Signer, SignRequest};
//! use async_trait::async_trait;
//! use http::request::Parts;
//!
//! #[derive(Debug)]
//! struct MySigner;
//!
//! #[async_trait]
//! impl SignRequest for MySigner {
//!     async fn sign_request(&self, _ctx: &Context, _req: &mut Parts) -> Result<()> {
//!         // Rewrite the request headers here.
//!         Ok(())
//!     }
//! }
//!
//! # async fn example() -> Result<()> {
//! let ctx = Context::default();
//! let signer = Signer::new(ctx, MySigner);
//!
//! let mut parts = http::Request::builder()
//!     .method("PUT")
//!     .uri("https://bucket.s3.amazonaws.com/key?partNumber=1&uploadId=abc")
//!     .body(())
//!     .unwrap()
//!     .into_parts()
//!     .0;
//!
//! signer.sign(&mut parts).await?;
//! # Ok(())
//! # }
//! ```
//!
//! Unlike signers that hold a secret key, an upsign signer never computes a
//! signature locally. Errors raised while preparing or delegating a
//! signature always surface to the caller of [`Signer::sign`]; there is no
//! fire-and-forget hook registration anywhere in this stack.

// Make sure all our public APIs have docs.
#![warn(missing_docs)]

pub mod time;
pub mod utils;

mod error;
pub use error::{Error, ErrorKind, Result};
mod context;
pub use context::Context;
mod http;
pub use http::{HttpSend, NoopHttpSend};

mod api;
pub use api::SignRequest;
mod request;
pub use request::SigningRequest;
mod signer;
pub use signer::Signer;
