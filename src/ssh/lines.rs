// ABOUTME: Splits raw channel output into text lines.
// ABOUTME: Supports buffered splitting and the legacy per-read splitting.

use serde::Deserialize;
use std::collections::VecDeque;

/// Most bytes buffered mode holds back waiting for `\n`. A longer
/// unterminated run is emitted in pieces of at most this size.
pub const MAX_LINE_LEN: usize = 64 * 1024;

/// How raw reads are cut into lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum LineMode {
    /// Carry partial lines across reads; emit only complete lines plus a
    /// non-empty remainder at end of stream. A partial line reaching
    /// [`MAX_LINE_LEN`] bytes is emitted without waiting for its end.
    #[default]
    Buffered,
    /// Split each read independently on `\n`. A line spanning two reads comes
    /// out as two pieces, and a read ending in `\n` yields a trailing empty line.
    PerRead,
}

/// Incremental line splitter fed with raw reads.
#[derive(Debug)]
pub struct LineSplitter {
    mode: LineMode,
    carry: Vec<u8>,
}

impl LineSplitter {
    pub fn new(mode: LineMode) -> Self {
        Self {
            mode,
            carry: Vec::new(),
        }
    }

    /// Feed one raw read, appending every line it completes to `out`.
    pub fn push(&mut self, chunk: &[u8], out: &mut VecDeque<String>) {
        if chunk.is_empty() {
            return;
        }
        match self.mode {
            LineMode::PerRead => {
                out.extend(String::from_utf8_lossy(chunk).split('\n').map(str::to_owned));
            }
            LineMode::Buffered => {
                let scan_from = self.carry.len();
                self.carry.extend_from_slice(chunk);

                // Only the new bytes can hold a terminator not seen before.
                if let Some(last) = self.carry[scan_from..].iter().rposition(|&b| b == b'\n') {
                    let end = scan_from + last;
                    let rest = self.carry.split_off(end + 1);
                    let complete = std::mem::replace(&mut self.carry, rest);
                    out.extend(complete[..end].split(|&b| b == b'\n').map(decode));
                }
                self.flush_overlong(out);
            }
        }
    }

    /// Emit the carry in pieces of at most [`MAX_LINE_LEN`] bytes so output
    /// without newlines still streams and memory stays bounded.
    fn flush_overlong(&mut self, out: &mut VecDeque<String>) {
        let mut start = 0;
        while self.carry.len() - start >= MAX_LINE_LEN {
            let end = char_boundary(&self.carry, start + MAX_LINE_LEN);
            out.push_back(decode(&self.carry[start..end]));
            start = end;
        }
        if start > 0 {
            self.carry.drain(..start);
        }
    }

    /// Flush what is left at end of stream.
    pub fn finish(&mut self) -> Option<String> {
        if self.carry.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.carry);
        Some(decode(&rest))
    }
}

/// Cut point at or just before `at` that does not split a UTF-8 sequence.
fn char_boundary(buf: &[u8], mut at: usize) -> usize {
    let floor = at.saturating_sub(3);
    while at > floor && buf.get(at).is_some_and(|&b| b & 0xC0 == 0x80) {
        at -= 1;
    }
    at
}

fn decode(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}
