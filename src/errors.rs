use std::io;
use thiserror::Error;

/// Errors surfaced by the throwing resolver API.
///
/// A read timeout is deliberately absent: callers receive an empty record
/// list for it, in both the throwing and non-throwing shapes. Low-level
/// decode anomalies are likewise absorbed into "no usable records" by the
/// session, so they never show up here either.
#[derive(Debug, Error)]
pub enum Error {
    /// The domain name cannot be represented in wire format. The query is
    /// never sent.
    #[error("domain name not wire-encodable: {0}")]
    Encode(String),

    /// Socket create/connect/send/receive failure other than a read
    /// timeout.
    #[error("failed to retrieve records for '{domain}': {source}")]
    Transport {
        domain: String,
        #[source]
        source: io::Error,
    },

    /// An asynchronous operation was aborted by its cancellation token.
    /// Always propagated, never folded into an empty result.
    #[error("resolution cancelled")]
    Cancelled,
}

/// Returns an `io::Error` of the given kind with a formatted message.
///
/// Used throughout the wire codec, where all parsing is expressed over
/// `io::Read`/`io::Seek` and malformed input is an `InvalidData` error.
#[macro_export]
macro_rules! bail {
    ($kind:ident, $($arg:tt)*) => {
        return Err(std::io::Error::new(
            std::io::ErrorKind::$kind,
            format!($($arg)*),
        ))
    };
}
