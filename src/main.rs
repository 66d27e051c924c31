// ABOUTME: Entry point for the remexec CLI application.
// ABOUTME: Parses arguments, sets up logging, and dispatches to the shell or one-shot runner.

mod cli;
mod shell;

use clap::Parser;
use cli::{Cli, Commands};
use remexec::config;
use remexec::error::Result;
use remexec::output::Output;
use std::env;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Logs go to stderr so stdout carries only command output
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let output = Output::new(cli.output);

    match run(cli.command, output).await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            output.error(&e.to_string());
            std::process::exit(1);
        }
    }
}

async fn run(command: Commands, output: Output) -> Result<i32> {
    match command {
        Commands::Shell { connect } => shell::interactive(connect.settings()?, output).await,
        Commands::Run { connect, command } => {
            shell::one_shot(connect.settings()?, &command.join(" "), output).await
        }
        Commands::Init { target, force } => {
            let cwd = env::current_dir()?;
            let path = config::init_profile(&cwd, target.as_deref(), force)?;
            output.notice(&format!("Created {}", path.display()));
            Ok(0)
        }
    }
}
