// ABOUTME: Transport and raw channel traits at the SSH library boundary.
// ABOUTME: The russh session implements them; tests drive scripted fakes.

use super::error::Result;
use async_trait::async_trait;
use bytes::Bytes;

/// An authenticated connection that can open command channels.
#[async_trait]
pub trait Transport: Send + Sync {
    type Channel: RawChannel;

    /// Open a fresh session channel.
    async fn open_channel(&self) -> Result<Self::Channel>;

    /// Terminate the connection.
    async fn disconnect(&self) -> Result<()>;
}

/// One remote channel, driven step by step.
///
/// Calls are expected in lifecycle order: `exec`, repeated `read` until it
/// yields `None`, `send_eof`, `wait_closed`, then `exit_status`.
#[async_trait]
pub trait RawChannel: Send {
    /// Request execution of `command` on this channel.
    async fn exec(&mut self, command: &str) -> Result<()>;

    /// Read the next chunk of output. `None` means end of data.
    ///
    /// Blocks until data or end-of-data arrives.
    async fn read(&mut self) -> Result<Option<Bytes>>;

    /// Signal end of input to the remote side.
    async fn send_eof(&mut self) -> Result<()>;

    /// Wait until the remote side closes the channel. No timeout.
    async fn wait_closed(&mut self) -> Result<()>;

    /// Exit status reported by the remote command, if any was received.
    fn exit_status(&self) -> Option<u32>;
}
