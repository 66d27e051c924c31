// ABOUTME: Interactive shell and one-shot runner on top of the session controller.
// ABOUTME: Prompts for missing connection details and dispatches input lines.

use remexec::config::Settings;
use remexec::controller::SessionController;
use remexec::error::{Error, Result};
use remexec::output::Output;
use remexec::ssh::Session;
use std::io::{IsTerminal, Write};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};

/// One line of shell input.
#[derive(Debug, PartialEq, Eq)]
enum Input<'a> {
    Exit,
    Empty,
    ChangeDir(&'a str),
    Command(&'a str),
}

fn parse_input(line: &str) -> Input<'_> {
    if line.eq_ignore_ascii_case("exit") {
        Input::Exit
    } else if line.trim().is_empty() {
        Input::Empty
    } else if let Some(path) = line.strip_prefix("cd ") {
        Input::ChangeDir(path)
    } else {
        Input::Command(line)
    }
}

/// Connect, then run commands read from stdin until `exit` or end of input.
pub async fn interactive(settings: Settings, output: Output) -> Result<i32> {
    let interactive = std::io::stdin().is_terminal();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    let mut controller = connect(settings, &mut lines, interactive).await?;
    let result = repl(&mut controller, &mut lines, output, interactive).await;
    controller.close().await;

    result?;
    Ok(0)
}

/// Connect, run a single command, and return its exit status.
pub async fn one_shot(settings: Settings, command: &str, mut output: Output) -> Result<i32> {
    let interactive = std::io::stdin().is_terminal();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    let mut controller = connect(settings, &mut lines, interactive).await?;
    let result = controller.run_command(command, &mut output).await;
    controller.close().await;

    let status = result?;
    Ok(i32::try_from(status).unwrap_or(i32::MAX))
}

async fn connect<R>(
    mut settings: Settings,
    lines: &mut Lines<R>,
    interactive: bool,
) -> Result<SessionController<Session>>
where
    R: AsyncBufRead + Unpin,
{
    if interactive {
        prompt_missing(&mut settings, lines).await?;
    }

    let mut controller = SessionController::<Session>::new().line_mode(settings.line_mode);
    if let Some(path) = &settings.working_path {
        controller.change_working_path(path.clone());
    }
    controller.connect(settings.connection_config()?).await?;
    Ok(controller)
}

async fn repl<R>(
    controller: &mut SessionController<Session>,
    lines: &mut Lines<R>,
    mut output: Output,
    interactive: bool,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    loop {
        if interactive {
            prompt("Enter command (type 'exit' to quit): ")?;
        }
        let Some(line) = lines.next_line().await? else {
            break;
        };

        match parse_input(&line) {
            Input::Exit => break,
            Input::Empty => {}
            Input::ChangeDir(path) => {
                controller.change_working_path(path);
                output.notice(&format!("Changed working directory to: {path}"));
            }
            Input::Command(command) => {
                if let Err(e) = controller.run_command(command, &mut output).await {
                    output.error(&format!("command failed: {e}"));
                }
            }
        }
    }
    Ok(())
}

/// Ask for whatever the profile and arguments left out.
async fn prompt_missing<R>(settings: &mut Settings, lines: &mut Lines<R>) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    if settings.host.is_none() {
        settings.host = Some(ask(lines, "host> ").await?);
        if settings.port.is_none() {
            let port = ask(lines, "port> ").await?;
            if !port.is_empty() {
                let port = port
                    .parse::<u16>()
                    .map_err(|_| Error::InvalidConfig(format!("invalid port: {port}")))?;
                settings.port = Some(port);
            }
        }
    }

    if settings.user.is_none() {
        settings.user = Some(ask(lines, "server username> ").await?);
    }

    if settings.identity.is_none() && settings.password.is_none() {
        let key = ask(lines, "path to private key (press Enter if with password)> ").await?;
        if key.is_empty() {
            settings.password = Some(ask(lines, "password> ").await?);
        } else {
            settings.identity = Some(key.into());
        }
    }
    Ok(())
}

async fn ask<R>(lines: &mut Lines<R>, question: &str) -> Result<String>
where
    R: AsyncBufRead + Unpin,
{
    prompt(question)?;
    Ok(lines.next_line().await?.unwrap_or_default())
}

fn prompt(text: &str) -> Result<()> {
    let mut stdout = std::io::stdout();
    stdout.write_all(text.as_bytes())?;
    stdout.flush()?;
    Ok(())
}
