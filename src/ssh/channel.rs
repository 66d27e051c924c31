// ABOUTME: Single-use command channel: exec, stream lines, close, read exit status.
// ABOUTME: Produces output lazily, one line at a time, in arrival order.

use super::error::{Error, Result};
use super::lines::{LineMode, LineSplitter};
use super::transport::{RawChannel, Transport};
use std::collections::VecDeque;

/// One remote command execution.
///
/// The channel is consumed by [`CommandChannel::close`], so it cannot be
/// reused for a second command. The exit status only exists after the
/// output has been drained and the remote side has acknowledged closure.
pub struct CommandChannel<C> {
    command: String,
    raw: C,
    splitter: LineSplitter,
    pending: VecDeque<String>,
    drained: bool,
}

impl<C: RawChannel> CommandChannel<C> {
    /// Open a new channel on `transport` and start `command` on it.
    pub async fn open<T>(transport: &T, command: &str, mode: LineMode) -> Result<Self>
    where
        T: Transport<Channel = C>,
    {
        let mut raw = transport.open_channel().await?;
        tracing::debug!(%command, "executing remote command");
        raw.exec(command).await?;

        Ok(Self {
            command: command.to_string(),
            raw,
            splitter: LineSplitter::new(mode),
            pending: VecDeque::new(),
            drained: false,
        })
    }

    /// Whether the remote side has signalled end of data.
    pub fn is_drained(&self) -> bool {
        self.drained && self.pending.is_empty()
    }

    /// Next output line, or `None` once the stream is exhausted.
    ///
    /// Blocks until the remote produces data or closes its output.
    pub async fn next_line(&mut self) -> Result<Option<String>> {
        loop {
            if let Some(line) = self.pending.pop_front() {
                return Ok(Some(line));
            }
            if self.drained {
                return Ok(None);
            }
            match self.raw.read().await? {
                Some(chunk) => self.splitter.push(&chunk, &mut self.pending),
                None => {
                    self.drained = true;
                    self.pending.extend(self.splitter.finish());
                }
            }
        }
    }

    /// Send EOF, wait for the remote to close, and return the exit status.
    ///
    /// Output not yet consumed is read and discarded first.
    pub async fn close(mut self) -> Result<u32> {
        let mut discarded = 0usize;
        while self.next_line().await?.is_some() {
            discarded += 1;
        }
        if discarded > 0 {
            tracing::debug!(discarded, "discarded unread output before close");
        }

        self.raw.send_eof().await?;
        self.raw.wait_closed().await?;

        let status = self.raw.exit_status().ok_or(Error::ChannelClosed)?;
        tracing::debug!(command = %self.command, status, "remote command finished");
        Ok(status)
    }

    /// Best-effort teardown after a failed read. Never waits for closure.
    pub async fn abort(mut self) {
        if let Err(e) = self.raw.send_eof().await {
            tracing::debug!("EOF after failed read not delivered: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Script {
        chunks: VecDeque<Result<Option<Bytes>>>,
        calls: Vec<String>,
        status: Option<u32>,
    }

    struct FakeChannel(Arc<Mutex<Script>>);

    #[async_trait]
    impl RawChannel for FakeChannel {
        async fn exec(&mut self, command: &str) -> Result<()> {
            self.0.lock().unwrap().calls.push(format!("exec {command}"));
            Ok(())
        }

        async fn read(&mut self) -> Result<Option<Bytes>> {
            let mut script = self.0.lock().unwrap();
            script.calls.push("read".to_string());
            script.chunks.pop_front().unwrap_or(Ok(None))
        }

        async fn send_eof(&mut self) -> Result<()> {
            self.0.lock().unwrap().calls.push("eof".to_string());
            Ok(())
        }

        async fn wait_closed(&mut self) -> Result<()> {
            self.0.lock().unwrap().calls.push("wait_closed".to_string());
            Ok(())
        }

        fn exit_status(&self) -> Option<u32> {
            let script = self.0.lock().unwrap();
            // Only meaningful once closure was observed.
            if script.calls.last().map(String::as_str) == Some("wait_closed") {
                script.status
            } else {
                None
            }
        }
    }

    struct FakeTransport(Arc<Mutex<Script>>);

    #[async_trait]
    impl Transport for FakeTransport {
        type Channel = FakeChannel;

        async fn open_channel(&self) -> Result<FakeChannel> {
            Ok(FakeChannel(Arc::clone(&self.0)))
        }

        async fn disconnect(&self) -> Result<()> {
            Ok(())
        }
    }

    fn transport(chunks: Vec<Result<Option<Bytes>>>, status: Option<u32>) -> FakeTransport {
        FakeTransport(Arc::new(Mutex::new(Script {
            chunks: chunks.into(),
            calls: Vec::new(),
            status,
        })))
    }

    #[tokio::test]
    async fn streams_lines_then_reports_status() {
        let t = transport(
            vec![Ok(Some(Bytes::from_static(b"a\nb\n"))), Ok(None)],
            Some(3),
        );
        let mut channel = CommandChannel::open(&t, "ls", LineMode::Buffered)
            .await
            .unwrap();

        assert_eq!(channel.next_line().await.unwrap().as_deref(), Some("a"));
        assert_eq!(channel.next_line().await.unwrap().as_deref(), Some("b"));
        assert_eq!(channel.next_line().await.unwrap(), None);
        assert!(channel.is_drained());

        assert_eq!(channel.close().await.unwrap(), 3);
        let calls = t.0.lock().unwrap().calls.clone();
        assert_eq!(
            calls,
            vec!["exec ls", "read", "read", "eof", "wait_closed"]
        );
    }

    #[tokio::test]
    async fn reads_lazily() {
        let t = transport(
            vec![
                Ok(Some(Bytes::from_static(b"first\n"))),
                Ok(Some(Bytes::from_static(b"second\n"))),
                Ok(None),
            ],
            Some(0),
        );
        let mut channel = CommandChannel::open(&t, "cmd", LineMode::Buffered)
            .await
            .unwrap();

        channel.next_line().await.unwrap();
        let reads = t.0.lock().unwrap().calls.iter().filter(|c| *c == "read").count();
        assert_eq!(reads, 1, "second chunk must not be read before it is needed");
    }

    #[tokio::test]
    async fn close_drains_unread_output() {
        let t = transport(
            vec![Ok(Some(Bytes::from_static(b"x\ny\n"))), Ok(None)],
            Some(0),
        );
        let channel = CommandChannel::open(&t, "cmd", LineMode::Buffered)
            .await
            .unwrap();

        assert_eq!(channel.close().await.unwrap(), 0);
        let calls = t.0.lock().unwrap().calls.clone();
        assert_eq!(calls.last().map(String::as_str), Some("wait_closed"));
    }

    #[tokio::test]
    async fn missing_exit_status_is_channel_closed() {
        let t = transport(vec![Ok(None)], None);
        let channel = CommandChannel::open(&t, "cmd", LineMode::Buffered)
            .await
            .unwrap();

        let err = channel.close().await.unwrap_err();
        assert!(matches!(err, Error::ChannelClosed));
    }

    #[tokio::test]
    async fn read_error_surfaces() {
        let t = transport(
            vec![
                Ok(Some(Bytes::from_static(b"ok\n"))),
                Err(Error::ChannelRead("reset".to_string())),
            ],
            Some(0),
        );
        let mut channel = CommandChannel::open(&t, "cmd", LineMode::Buffered)
            .await
            .unwrap();

        assert_eq!(channel.next_line().await.unwrap().as_deref(), Some("ok"));
        let err = channel.next_line().await.unwrap_err();
        assert!(matches!(err, Error::ChannelRead(_)));

        channel.abort().await;
        let calls = t.0.lock().unwrap().calls.clone();
        assert_eq!(calls.last().map(String::as_str), Some("eof"));
    }
}
