use upsign_core::Context;
use upsign_http_send_reqwest::ReqwestHttpSend;

/// Create a context wired with the default reqwest transport.
///
/// The default client carries no explicit timeout; callers that care should
/// build a [`ReqwestHttpSend`] themselves and attach it with
/// [`Context::with_http_send`].
pub fn default_context() -> Context {
    Context::new().with_http_send(ReqwestHttpSend::default())
}
