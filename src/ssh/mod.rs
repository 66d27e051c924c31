// ABOUTME: SSH client module for remote command execution.
// ABOUTME: Password or key-file authentication, one channel per command.

mod channel;
mod client;
mod error;
mod lines;
mod transport;

pub use channel::CommandChannel;
pub use client::{ConnectionConfig, Credential, Session, SessionChannel};
pub use error::{AuthKind, Error, ErrorKind, Result};
pub use lines::{LineMode, LineSplitter, MAX_LINE_LEN};
pub use transport::{RawChannel, Transport};
