use regex::Regex;
use std::borrow::Cow;
use std::sync::LazyLock;

// CSI sequences (colors, cursor moves) and OSC sequences terminated by BEL or ST.
static ANSI_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\x1b\[[0-?]*[ -/]*[@-~]|\x1b\][^\x07\x1b]*(?:\x07|\x1b\\)|\x1b[@-Z\\-_]").unwrap()
});

/// Remove terminal escape sequences from a line of console output.
pub fn strip_ansi(line: &str) -> Cow<'_, str> {
    if !line.contains('\x1b') {
        return Cow::Borrowed(line);
    }
    ANSI_REGEX.replace_all(line, "")
}
