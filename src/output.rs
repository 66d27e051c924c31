// ABOUTME: Output formatting for streamed command output and shell feedback.
// ABOUTME: Supports highlighted, plain, and JSON output modes.

use crate::controller::OutputSink;
use serde::Serialize;

/// Output mode for CLI feedback.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputMode {
    /// Highlighted lines for a terminal
    #[default]
    Normal,
    /// Lines exactly as received, without escape sequences
    Plain,
    /// JSON lines for scripting
    Json,
}

/// Handles CLI output based on the configured mode.
#[derive(Debug, Clone, Copy)]
pub struct Output {
    mode: OutputMode,
}

impl Output {
    pub fn new(mode: OutputMode) -> Self {
        Self { mode }
    }

    /// Render one output line for this mode.
    pub fn render_line(&self, raw: &str, decorated: &str) -> String {
        match self.mode {
            OutputMode::Normal => decorated.to_string(),
            OutputMode::Plain => raw.to_string(),
            OutputMode::Json => to_json(&JsonEvent {
                event: "line",
                text: Some(raw),
                exit_status: None,
            }),
        }
    }

    /// Render the exit status message for this mode.
    pub fn render_exit_status(&self, code: u32) -> String {
        match self.mode {
            OutputMode::Normal | OutputMode::Plain => format!("Exit status: {code}"),
            OutputMode::Json => to_json(&JsonEvent {
                event: "exit_status",
                text: None,
                exit_status: Some(code),
            }),
        }
    }

    /// Print an informational message (suppressed in JSON mode).
    pub fn notice(&self, message: &str) {
        if self.mode != OutputMode::Json {
            println!("{message}");
        }
    }

    /// Print an error message.
    pub fn error(&self, message: &str) {
        match self.mode {
            OutputMode::Normal | OutputMode::Plain => {
                eprintln!("Error: {message}");
            }
            OutputMode::Json => {
                eprintln!(
                    "{}",
                    to_json(&JsonEvent {
                        event: "error",
                        text: Some(message),
                        exit_status: None,
                    })
                );
            }
        }
    }
}

impl OutputSink for Output {
    fn line(&mut self, raw: &str, decorated: &str) {
        println!("{}", self.render_line(raw, decorated));
    }

    fn exit_status(&mut self, code: u32) {
        println!("{}", self.render_exit_status(code));
    }
}

#[derive(Serialize)]
struct JsonEvent<'a> {
    event: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    exit_status: Option<u32>,
}

fn to_json(event: &JsonEvent<'_>) -> String {
    // Serializing plain strings and integers cannot fail.
    serde_json::to_string(event).unwrap_or_default()
}
