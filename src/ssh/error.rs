// ABOUTME: SSH-specific error types.
// ABOUTME: Covers configuration, connection, authentication, and channel failures.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid connection settings: {0}")]
    Configuration(String),

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("connection to {host}:{port} timed out after {timeout:?}")]
    ConnectTimeout {
        host: String,
        port: u16,
        timeout: std::time::Duration,
    },

    #[error("error reading private key file {path}: {source}")]
    KeyUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to load key from {path}: {reason}")]
    KeyLoadFailed { path: PathBuf, reason: String },

    #[error("{method} authentication rejected for user {user}")]
    AuthenticationRejected { method: AuthKind, user: String },

    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("not connected")]
    NotConnected,

    #[error("failed to open channel: {0}")]
    ChannelOpen(String),

    #[error("command execution failed: {0}")]
    CommandFailed(String),

    #[error("channel read failed: {0}")]
    ChannelRead(String),

    #[error("channel closed unexpectedly without exit status")]
    ChannelClosed,

    #[error("SSH protocol error: {0}")]
    Protocol(#[from] russh::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Authentication method named in rejection errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthKind {
    Password,
    PublicKey,
}

impl std::fmt::Display for AuthKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthKind::Password => f.write_str("password"),
            AuthKind::PublicKey => f.write_str("public key"),
        }
    }
}

/// Error category for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Neither a password nor a private key was supplied.
    Configuration,
    /// Socket or handshake failure.
    Connection,
    /// Key file unreadable or credentials rejected.
    Authentication,
    /// Channel open, exec, or read failure during a command.
    Channel,
}

impl Error {
    /// Returns the error category for programmatic handling.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Configuration(_) => ErrorKind::Configuration,
            Error::Connection(_) | Error::ConnectTimeout { .. } => ErrorKind::Connection,
            Error::KeyUnreadable { .. }
            | Error::KeyLoadFailed { .. }
            | Error::AuthenticationRejected { .. }
            | Error::Authentication(_) => ErrorKind::Authentication,
            Error::NotConnected
            | Error::ChannelOpen(_)
            | Error::CommandFailed(_)
            | Error::ChannelRead(_)
            | Error::ChannelClosed => ErrorKind::Channel,
            // Raw transport failures surface mid-command once a session exists.
            Error::Protocol(_) | Error::Io(_) => ErrorKind::Channel,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
