//! Drone SDK - session protocol for the flight server
//!
//! Provides the channel abstraction, the JSON wire frames and the
//! command/response session built on top of them.

pub mod channel;
pub mod error;
pub mod messages;
pub mod session;

pub use channel::{Channel, MemoryChannel, WsChannel};
pub use error::{ChannelError, SessionError};
pub use session::{CrashReport, Exchange, Reply, Session};
