//! hdrcomp Core Types
//!
//! The replayed-session data model shared by every other crate:
//! messages, exchanges and sessions, plus the error taxonomy and the
//! HAR capture loader that produces a session.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod har;
pub mod http1;
pub mod message;
pub mod session;

// Re-exports
pub use error::{BenchError, BenchResult};
pub use har::{load_session, parse_session};
pub use message::{HeaderField, Message, MessageKind};
pub use session::{Exchange, Session};
