//! Error taxonomy for transports and the session protocol.

use thiserror::Error;

/// Failure reported by a [`Channel`](crate::channel::Channel).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelError {
    /// The peer closed the connection or it dropped underneath us.
    #[error("channel closed: {0}")]
    Closed(String),
    /// Anything else the transport complained about.
    #[error("transport error: {0}")]
    Transport(String),
}

/// Hard failures of the session protocol.
///
/// Simulated vehicle crashes are not errors; they come back as
/// [`Exchange::Crash`](crate::session::Exchange::Crash).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("handshake failed: {reason}")]
    Handshake { reason: String },
    #[error("channel closed during round trip: {reason}")]
    ChannelClosed { reason: String },
}
