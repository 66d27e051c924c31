// ABOUTME: Output line classifier that highlights directories, files, and errors.
// ABOUTME: An ordered rule table over regex patterns; the error wrap always runs last.

use regex::{Captures, Regex};
use std::sync::LazyLock;

/// Decoration applied to part or all of a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    /// Bold blue.
    Directory,
    /// Bold green.
    File,
    /// Bold red.
    Error,
}

impl Style {
    fn sgr(self) -> &'static str {
        match self {
            Style::Directory => "1;34",
            Style::File => "1;32",
            Style::Error => "1;31",
        }
    }

    /// Wrap `text` in this style's escape sequence, followed by a reset.
    pub fn wrap(self, text: &str) -> String {
        format!("\x1b[{}m{}\x1b[0m", self.sgr(), text)
    }
}

struct Patterns {
    trailing_dir: Regex,
    trailing_file: Regex,
    error: Regex,
}

static PATTERNS: LazyLock<Patterns> = LazyLock::new(|| Patterns {
    trailing_dir: Regex::new(r"(\S+/)$").expect("valid directory pattern"),
    trailing_file: Regex::new(r"(\S+\.\S+)$").expect("valid file pattern"),
    error: Regex::new(r"(?i)Error|Exception").expect("valid error pattern"),
});

/// One step of the classifier.
struct Rule {
    name: &'static str,
    /// Exclusive rules form a first-match-wins chain; the rest always run.
    exclusive: bool,
    matches: fn(&Patterns, &str) -> bool,
    apply: fn(&Patterns, &str) -> String,
}

static RULES: [Rule; 4] = [
    Rule {
        name: "directory",
        exclusive: true,
        matches: |p, line| p.trailing_dir.is_match(line),
        apply: |p, line| wrap_capture(&p.trailing_dir, line, Style::Directory),
    },
    Rule {
        name: "file",
        exclusive: true,
        matches: |_, line| line.contains('.'),
        apply: |p, line| wrap_capture(&p.trailing_file, line, Style::File),
    },
    Rule {
        name: "plain",
        exclusive: true,
        matches: |_, line| !line.contains('.'),
        apply: |_, line| Style::Directory.wrap(line),
    },
    Rule {
        name: "error",
        exclusive: false,
        matches: |p, line| p.error.is_match(line),
        apply: |_, line| Style::Error.wrap(line),
    },
];

fn wrap_capture(pattern: &Regex, line: &str, style: Style) -> String {
    pattern
        .replace(line, |caps: &Captures| style.wrap(&caps[1]))
        .into_owned()
}

/// Decorate one line of command output.
///
/// A trailing `dir/` token is styled as a directory. Otherwise a line with a
/// `.` gets its trailing `name.ext` token styled as a file, and a line
/// without one is styled as a directory as a whole. Any line mentioning
/// "error" or "exception" (any case) is then wrapped entirely in the error
/// style, around whatever decoration it already carries.
pub fn classify(line: &str) -> String {
    let patterns = &*PATTERNS;
    let mut out = line.to_string();
    let mut decorated = false;

    for rule in &RULES {
        if rule.exclusive && decorated {
            continue;
        }
        if (rule.matches)(patterns, &out) {
            out = (rule.apply)(patterns, &out);
            decorated |= rule.exclusive;
            tracing::trace!(rule = rule.name, "classified line");
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLUE: &str = "\x1b[1;34m";
    const GREEN: &str = "\x1b[1;32m";
    const RED: &str = "\x1b[1;31m";
    const RESET: &str = "\x1b[0m";

    #[test]
    fn empty_line_gets_plain_style() {
        assert_eq!(classify(""), format!("{BLUE}{RESET}"));
    }

    #[test]
    fn trailing_directory_token() {
        assert_eq!(classify("logs/"), format!("{BLUE}logs/{RESET}"));
    }

    #[test]
    fn directory_keeps_prefix_untouched() {
        assert_eq!(
            classify("drwxr-xr-x 2 root root 4096 var/"),
            format!("drwxr-xr-x 2 root root 4096 {BLUE}var/{RESET}")
        );
    }

    #[test]
    fn bare_slash_is_a_directory() {
        assert_eq!(classify("/"), format!("{BLUE}/{RESET}"));
    }

    #[test]
    fn dotted_directory_is_still_a_directory() {
        assert_eq!(classify("conf.d/"), format!("{BLUE}conf.d/{RESET}"));
    }

    #[test]
    fn trailing_file_token() {
        assert_eq!(classify("readme.md"), format!("{GREEN}readme.md{RESET}"));
        assert_eq!(
            classify("-rw-r--r-- 1 root root 12 notes.txt"),
            format!("-rw-r--r-- 1 root root 12 {GREEN}notes.txt{RESET}")
        );
    }

    #[test]
    fn dot_elsewhere_leaves_line_undecorated() {
        assert_eq!(classify("version 1.2 installed"), "version 1.2 installed");
    }

    #[test]
    fn dot_free_line_is_styled_whole() {
        assert_eq!(classify("total 48"), format!("{BLUE}total 48{RESET}"));
    }

    #[test]
    fn exception_wraps_plain_decoration() {
        assert_eq!(
            classify("Exception in thread"),
            format!("{RED}{BLUE}Exception in thread{RESET}{RESET}")
        );
    }

    #[test]
    fn error_match_is_case_insensitive() {
        assert_eq!(
            classify("ERROR: failed to open app.log"),
            format!("{RED}ERROR: failed to open {GREEN}app.log{RESET}{RESET}")
        );
    }

    #[test]
    fn error_wraps_directory_decoration() {
        assert_eq!(
            classify("errors/"),
            format!("{RED}{BLUE}errors/{RESET}{RESET}")
        );
    }

    #[test]
    fn wrap_encloses_text() {
        assert_eq!(Style::File.wrap("a"), format!("{GREEN}a{RESET}"));
    }
}
