//! Client error types

/// Errors surfaced by the spectator client.
///
/// Deliberate cancellation is not represented here: the watcher returns
/// cleanly when its token fires, and only genuine failures become errors.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Transport-level failure (connection refused, timeout, bad URL)
    #[error("Request failed: {0}")]
    Http(String),

    /// Structured error response from the server
    #[error("Server rejected the request ({code}): {message}")]
    Api { code: String, message: String },

    /// The byte stream carried something that is not a valid event
    #[error("Malformed event: {0}")]
    Decode(String),

    /// The event stream broke off before a terminal event
    #[error("Stream interrupted: {0}")]
    Stream(String),

    /// The server reported a failure mid-turn via an `error` event
    #[error("Turn failed: {0}")]
    Turn(String),
}
