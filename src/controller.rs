// ABOUTME: Session controller tying transport, command channels, and the classifier together.
// ABOUTME: Holds the client-side working path that prefixes every command.

use crate::classify::classify;
use crate::ssh::{
    CommandChannel, ConnectionConfig, Error, LineMode, Result, Session, Transport,
};

/// Receives streamed command output.
pub trait OutputSink {
    /// One output line, as received and as decorated by the classifier.
    fn line(&mut self, raw: &str, decorated: &str);

    /// Final exit status of a command, after its channel closed.
    fn exit_status(&mut self, code: u32);
}

/// Drives one remote session, one command at a time.
///
/// Commands run strictly sequentially; `run_command` must not be invoked
/// concurrently on the same controller.
pub struct SessionController<T: Transport = Session> {
    session: Option<T>,
    working_path: Option<String>,
    line_mode: LineMode,
}

impl<T: Transport> Default for SessionController<T> {
    fn default() -> Self {
        Self {
            session: None,
            working_path: None,
            line_mode: LineMode::default(),
        }
    }
}

impl SessionController<Session> {
    /// Connect and authenticate, replacing any previous session.
    /// Failures leave the controller disconnected.
    pub async fn connect(&mut self, config: ConnectionConfig) -> Result<()> {
        self.close().await;
        let session = Session::connect(config).await?;
        self.attach(session);
        Ok(())
    }
}

impl<T: Transport> SessionController<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn line_mode(mut self, mode: LineMode) -> Self {
        self.line_mode = mode;
        self
    }

    /// Adopt an already authenticated transport.
    pub fn attach(&mut self, transport: T) {
        self.session = Some(transport);
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    pub fn working_path(&self) -> Option<&str> {
        self.working_path.as_deref()
    }

    /// Replace the working path. The path is not checked remotely.
    pub fn change_working_path(&mut self, new_path: impl Into<String>) {
        let new_path = new_path.into();
        tracing::debug!(path = %new_path, "working path changed");
        self.working_path = Some(new_path);
    }

    /// The command actually sent to the remote host.
    pub fn effective_command(&self, raw: &str) -> String {
        match self.working_path.as_deref() {
            Some(path) if !path.is_empty() => format!("cd {} && {}", path, raw),
            _ => raw.to_string(),
        }
    }

    /// Run `raw` remotely, streaming classified lines to `sink` as they arrive.
    ///
    /// The exit status is emitted last and returned. A channel failure aborts
    /// only this command; the session stays in place.
    pub async fn run_command<S>(&self, raw: &str, sink: &mut S) -> Result<u32>
    where
        S: OutputSink + ?Sized,
    {
        let session = self.session.as_ref().ok_or(Error::NotConnected)?;
        let command = self.effective_command(raw);

        let mut channel = CommandChannel::open(session, &command, self.line_mode).await?;
        loop {
            match channel.next_line().await {
                Ok(Some(line)) => sink.line(&line, &classify(&line)),
                Ok(None) => break,
                Err(e) => {
                    tracing::debug!("output stream of `{}` failed: {}", command, e);
                    channel.abort().await;
                    return Err(e);
                }
            }
        }

        let status = channel.close().await?;
        sink.exit_status(status);
        Ok(status)
    }

    /// Disconnect. Safe to call repeatedly or when never connected.
    ///
    /// The session is released even when the disconnect itself fails, which
    /// is common once the remote has already dropped the connection.
    pub async fn close(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };
        if let Err(e) = session.disconnect().await {
            tracing::warn!("disconnect failed, session released anyway: {}", e);
        }
    }
}
