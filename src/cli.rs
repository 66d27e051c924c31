// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines subcommands, connection arguments, and settings resolution.

use clap::{Args, Parser, Subcommand};
use remexec::config::{Overrides, Profile, Settings, Target};
use remexec::error::Result;
use remexec::output::OutputMode;
use remexec::ssh::LineMode;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "remexec")]
#[command(about = "Run commands on a remote host over SSH with highlighted output")]
#[command(version)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// How command output is printed
    #[arg(long, value_enum, default_value_t = OutputMode::Normal, global = true)]
    pub output: OutputMode,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Connect and read commands interactively
    Shell {
        #[command(flatten)]
        connect: ConnectArgs,
    },

    /// Run one command and exit with its status
    Run {
        #[command(flatten)]
        connect: ConnectArgs,

        /// Command to run remotely
        #[arg(last = true, required = true)]
        command: Vec<String>,
    },

    /// Create a remexec.yml profile in the current directory
    Init {
        /// Target written into the profile, as [user@]host[:port]
        target: Option<String>,

        /// Overwrite an existing profile
        #[arg(long)]
        force: bool,
    },
}

#[derive(Args)]
pub struct ConnectArgs {
    /// Remote host as [user@]host[:port]
    pub target: Option<Target>,

    /// SSH port
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Remote username
    #[arg(short = 'l', long)]
    pub user: Option<String>,

    /// Private key file
    #[arg(short, long, value_name = "PATH")]
    pub identity: Option<PathBuf>,

    /// Environment variable holding the password
    #[arg(long, value_name = "VAR")]
    pub password_env: Option<String>,

    /// Profile to load instead of discovering remexec.yml
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// How output is cut into lines
    #[arg(long, value_enum)]
    pub line_mode: Option<LineMode>,

    /// Give up connecting after this many seconds
    #[arg(long, value_name = "SECS")]
    pub connect_timeout: Option<u64>,
}

impl ConnectArgs {
    /// Merge the profile (explicit or discovered) with these arguments.
    pub fn settings(self) -> Result<Settings> {
        let profile = match &self.config {
            Some(path) => Some(Profile::load(path)?),
            None => Profile::discover(&std::env::current_dir()?)?,
        };

        let base = match &profile {
            Some(profile) => Settings::from_profile(profile)?,
            None => Settings::default(),
        };

        base.apply(Overrides {
            target: self.target,
            port: self.port,
            user: self.user,
            identity: self.identity,
            password_env: self.password_env,
            line_mode: self.line_mode,
            connect_timeout: self.connect_timeout.map(Duration::from_secs),
        })
    }
}
