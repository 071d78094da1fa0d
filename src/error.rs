//! Error types for the IRC client engine.
//!
//! Tokenizer failures are reported as [`MessageParseError`]; everything that
//! can go wrong while establishing or driving a connection is a
//! [`ClientError`]. Protocol-level problems reported by the server never
//! become errors here, they are delivered as `error` events instead.

use thiserror::Error;

/// Convenience type alias for Results using [`ClientError`].
pub type Result<T, E = ClientError> = std::result::Result<T, E>;

/// Errors raised by the connection lifecycle.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ClientError {
    /// I/O error during connect, read or write.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// TLS handshake or configuration failure.
    #[cfg(feature = "tokio")]
    #[error("tls error: {0}")]
    Tls(#[from] tokio_rustls::rustls::Error),

    /// The certificate verifier could not be built (e.g. empty root store).
    #[error("tls configuration error: {0}")]
    TlsConfig(String),

    /// The configured server host is not a valid TLS server name.
    #[error("invalid server name: {0}")]
    InvalidServerName(String),

    /// Host name resolution produced no usable address.
    #[error("could not resolve {host}:{port}")]
    Resolve {
        /// The host that failed to resolve.
        host: String,
        /// The port that was requested.
        port: u16,
    },

    /// The processing task is gone; requests can no longer be delivered.
    #[error("client is no longer running")]
    Closed,
}

/// Errors encountered when tokenizing inbound lines.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum MessageParseError {
    /// Line was empty.
    #[error("empty message")]
    EmptyMessage,

    /// Command was invalid or missing.
    #[error("invalid command")]
    InvalidCommand,

    /// Parsing failed with positional context.
    #[error("parsing failed at position {position}: {context}")]
    ParseContext {
        /// Character position where parsing failed.
        position: usize,
        /// Description of what was being parsed.
        context: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ClientError::Resolve {
            host: "irc.example.net".to_string(),
            port: 6697,
        };
        assert_eq!(format!("{}", err), "could not resolve irc.example.net:6697");

        let err = MessageParseError::ParseContext {
            position: 3,
            context: "parsing IRC command".to_string(),
        };
        assert_eq!(
            format!("{}", err),
            "parsing failed at position 3: parsing IRC command"
        );
    }

    #[test]
    fn test_error_conversion() {
        let io_err =
            std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "connection refused");
        let client_err: ClientError = io_err.into();

        match client_err {
            ClientError::Io(_) => {}
            _ => panic!("Expected Io variant"),
        }
    }
}
