// ABOUTME: SSH session management using russh.
// ABOUTME: Handles connection, credential selection, authentication, and channels.

use super::error::{AuthKind, Error, Result};
use super::transport::{RawChannel, Transport};
use async_trait::async_trait;
use bytes::Bytes;
use russh::client::{self, Config, Handle, Msg};
use russh::keys::{PrivateKeyWithHashAlg, load_secret_key, ssh_key};
use russh::{Channel, ChannelMsg, Disconnect};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Configuration for establishing an SSH session.
#[derive(Clone)]
pub struct ConnectionConfig {
    /// Remote host to connect to.
    pub host: String,
    /// SSH port (default: 22).
    pub port: u16,
    /// Username for authentication.
    pub user: String,
    /// Path to a private key file. Takes precedence over `password`.
    pub key_path: Option<PathBuf>,
    /// Password, used only when no key path is set.
    pub password: Option<String>,
    /// Upper bound for socket connect plus handshake. Reads are never bounded.
    pub connect_timeout: Option<Duration>,
}

impl std::fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("key_path", &self.key_path)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

impl ConnectionConfig {
    pub fn new(host: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: 22,
            user: user.into(),
            key_path: None,
            password: None,
            connect_timeout: None,
        }
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn key_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.key_path = Some(path.into());
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Pick the credential to authenticate with.
    ///
    /// Empty values count as absent. A key path wins over a password.
    pub fn credential(&self) -> Result<Credential> {
        if let Some(path) = self.key_path.as_ref().filter(|p| !p.as_os_str().is_empty()) {
            return Ok(Credential::PrivateKeyPath(path.clone()));
        }
        if let Some(password) = self.password.as_ref().filter(|p| !p.is_empty()) {
            return Ok(Credential::Password(password.clone()));
        }
        Err(Error::Configuration(
            "must provide either password or private key".to_string(),
        ))
    }
}

/// The single credential used for authentication.
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    PrivateKeyPath(PathBuf),
    Password(String),
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credential::PrivateKeyPath(path) => {
                f.debug_tuple("PrivateKeyPath").field(path).finish()
            }
            Credential::Password(_) => f.debug_tuple("Password").field(&"<redacted>").finish(),
        }
    }
}

/// SSH client handler for russh.
pub(crate) struct SshHandler {
    host: String,
    port: u16,
}

impl client::Handler for SshHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &ssh_key::PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        tracing::debug!(
            "accepting host key {} for {}:{}",
            server_public_key.fingerprint(ssh_key::HashAlg::Sha256),
            self.host,
            self.port
        );
        Ok(true)
    }
}

/// An established, authenticated SSH session.
pub struct Session {
    config: ConnectionConfig,
    handle: Handle<SshHandler>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .field("handle", &"<russh::Handle>")
            .finish()
    }
}

impl Session {
    /// Connect to the remote host and authenticate.
    ///
    /// The credential is resolved before any socket is opened.
    pub async fn connect(config: ConnectionConfig) -> Result<Self> {
        let credential = config.credential()?;

        let mut handle = Self::handshake(&config).await?;
        Self::authenticate(&mut handle, &config.user, &credential).await?;

        tracing::info!("connected to {}@{}:{}", config.user, config.host, config.port);
        Ok(Self { config, handle })
    }

    /// Open the socket and run the protocol handshake.
    async fn handshake(config: &ConnectionConfig) -> Result<Handle<SshHandler>> {
        // No inactivity timeout: a silent remote command must block, not fail.
        let russh_config = Arc::new(Config::default());
        let handler = SshHandler {
            host: config.host.clone(),
            port: config.port,
        };

        tracing::debug!("connecting to {}:{}", config.host, config.port);
        let connecting = client::connect(
            russh_config,
            (config.host.as_str(), config.port),
            handler,
        );

        let result = match config.connect_timeout {
            Some(timeout) => tokio::time::timeout(timeout, connecting)
                .await
                .map_err(|_| Error::ConnectTimeout {
                    host: config.host.clone(),
                    port: config.port,
                    timeout,
                })?,
            None => connecting.await,
        };

        result.map_err(|e| {
            if e.to_string().contains("Connection refused") {
                Error::Connection(format!(
                    "connection refused to {}:{}",
                    config.host, config.port
                ))
            } else {
                Error::Connection(e.to_string())
            }
        })
    }

    /// Authenticate with exactly one credential.
    async fn authenticate(
        handle: &mut Handle<SshHandler>,
        user: &str,
        credential: &Credential,
    ) -> Result<()> {
        match credential {
            Credential::PrivateKeyPath(path) => {
                tracing::debug!("using public key authentication with {}", path.display());
                check_key_readable(path).await?;

                let key = load_secret_key(path, None).map_err(|e| Error::KeyLoadFailed {
                    path: path.clone(),
                    reason: e.to_string(),
                })?;

                let hash_alg = handle
                    .best_supported_rsa_hash()
                    .await
                    .map_err(|e| Error::Authentication(e.to_string()))?
                    .flatten();

                let result = handle
                    .authenticate_publickey(user, PrivateKeyWithHashAlg::new(Arc::new(key), hash_alg))
                    .await
                    .map_err(|e| Error::Authentication(e.to_string()))?;

                if !result.success() {
                    return Err(Error::AuthenticationRejected {
                        method: AuthKind::PublicKey,
                        user: user.to_string(),
                    });
                }
            }
            Credential::Password(password) => {
                tracing::debug!("using password authentication");
                let result = handle
                    .authenticate_password(user, password)
                    .await
                    .map_err(|e| Error::Authentication(e.to_string()))?;

                if !result.success() {
                    return Err(Error::AuthenticationRejected {
                        method: AuthKind::Password,
                        user: user.to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Pre-flight check that the key file can be opened and read as text.
///
/// Authentication loads the key again from `path`; this only turns an
/// unreadable file into a clear error before any key parsing happens.
pub(crate) async fn check_key_readable(path: &Path) -> Result<()> {
    tokio::fs::read_to_string(path)
        .await
        .map(drop)
        .map_err(|source| Error::KeyUnreadable {
            path: path.to_path_buf(),
            source,
        })
}

#[async_trait]
impl Transport for Session {
    type Channel = SessionChannel;

    async fn open_channel(&self) -> Result<SessionChannel> {
        let channel = self
            .handle
            .channel_open_session()
            .await
            .map_err(|e| Error::ChannelOpen(e.to_string()))?;
        Ok(SessionChannel::new(channel))
    }

    async fn disconnect(&self) -> Result<()> {
        tracing::debug!("disconnecting from {}:{}", self.config.host, self.config.port);
        self.handle
            .disconnect(Disconnect::ByApplication, "", "en")
            .await
            .map_err(Error::Protocol)
    }
}

/// A russh session channel driven through [`RawChannel`].
pub struct SessionChannel {
    inner: Channel<Msg>,
    state: ChannelState,
}

impl SessionChannel {
    fn new(inner: Channel<Msg>) -> Self {
        Self {
            inner,
            state: ChannelState::default(),
        }
    }
}

#[async_trait]
impl RawChannel for SessionChannel {
    async fn exec(&mut self, command: &str) -> Result<()> {
        self.inner
            .exec(true, command)
            .await
            .map_err(|e| Error::CommandFailed(format!("failed to exec command: {}", e)))
    }

    async fn read(&mut self) -> Result<Option<Bytes>> {
        while !self.state.output_ended() {
            let msg = self.inner.wait().await;
            if let Some(chunk) = self.state.apply(msg)? {
                return Ok(Some(chunk));
            }
        }
        Ok(None)
    }

    async fn send_eof(&mut self) -> Result<()> {
        if self.state.closed {
            return Ok(());
        }
        self.inner
            .eof()
            .await
            .map_err(|e| Error::ChannelRead(format!("failed to send EOF: {}", e)))
    }

    async fn wait_closed(&mut self) -> Result<()> {
        while !self.state.closed {
            let msg = self.inner.wait().await;
            if let Some(late) = self.state.apply(msg)? {
                tracing::debug!(bytes = late.len(), "dropping output received after EOF");
            }
        }
        Ok(())
    }

    fn exit_status(&self) -> Option<u32> {
        self.state.exit_status
    }
}

/// What the messages seen so far say about one exec channel.
///
/// `None` from the channel means it was dropped and counts as closed.
#[derive(Debug, Default)]
struct ChannelState {
    exit_status: Option<u32>,
    eof: bool,
    closed: bool,
}

impl ChannelState {
    fn output_ended(&self) -> bool {
        self.eof || self.closed
    }

    /// Fold one message into the state, returning any output it carries.
    fn apply(&mut self, msg: Option<ChannelMsg>) -> Result<Option<Bytes>> {
        match msg {
            Some(ChannelMsg::Data { data }) => return Ok(Some(Bytes::copy_from_slice(&data))),
            // stderr is merged into the same stream
            Some(ChannelMsg::ExtendedData { data, .. }) => {
                return Ok(Some(Bytes::copy_from_slice(&data)));
            }
            Some(ChannelMsg::Failure) => {
                return Err(Error::CommandFailed(
                    "remote refused to execute command".to_string(),
                ));
            }
            Some(ChannelMsg::ExitStatus { exit_status }) => {
                self.exit_status = Some(exit_status);
            }
            Some(ChannelMsg::ExitSignal { signal_name, .. }) => {
                tracing::debug!("remote command terminated by signal {:?}", signal_name);
            }
            Some(ChannelMsg::Eof) => self.eof = true,
            Some(ChannelMsg::Close) | None => self.closed = true,
            Some(_) => {}
        }
        Ok(None)
    }
}
