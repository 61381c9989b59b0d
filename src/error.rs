use crate::backend::BackendError;

/// Errors produced while normalizing a provider webhook payload.
#[derive(Debug, thiserror::Error)]
pub enum NormalizationError {
    #[error("Malformed payload: missing or invalid field '{0}'")]
    MalformedPayload(String),
}

/// Errors produced by the chat connection lifecycle.
///
/// Both variants are fatal at startup: a relay that cannot authenticate
/// must not pretend to serve ingress.
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("No chat credential configured")]
    MissingCredential,

    #[error("Chat backend rejected the credential: {0}")]
    AuthenticationFailed(String),
}

/// Errors produced by a notification dispatch attempt.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Chat connection is not ready")]
    NotReady,

    #[error("Notification channel not found")]
    ChannelNotFound,

    #[error("Delivery failed: {0}")]
    DeliveryFailed(#[source] BackendError),
}
