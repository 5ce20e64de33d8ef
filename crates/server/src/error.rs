//! Structured errors for the gemfeed server.
//!
//! These cover the transport around the router. The router itself never
//! fails; it always produces a `Response`.

/// Structured errors for the gemfeed server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Certificate or key could not be loaded, or rustls rejected them.
    #[error("TLS_ERROR: {0}")]
    Tls(String),

    /// Socket or stream failure.
    #[error("IO_ERROR: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed request line; answered with status 59.
    #[error("BAD_REQUEST: {0}")]
    BadRequest(String),

    /// Client did not send a full request line in time.
    #[error("REQUEST_TIMEOUT")]
    Timeout,
}
