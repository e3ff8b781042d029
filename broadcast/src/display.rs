//! The operator's terminal.

use colored::Colorize;
use std::io::Write;

pub(crate) const PROMPT: &str = "> ";

/// Where the banner, the prompt and incoming messages are written.
///
/// Writes from reader loops and the broadcaster are serialized so that lines
/// from different peers never interleave mid-line.
pub struct Display {
    out: std::sync::Mutex<Box<dyn Write + Send>>,
}

impl Display {
    pub fn new(out: impl Write + Send + 'static) -> Self {
        Self {
            out: std::sync::Mutex::new(Box::new(out)),
        }
    }

    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }

    /// Render a message received from a peer, then re-display the prompt.
    ///
    /// Blank lines are swallowed. Returns whether anything was written.
    pub fn incoming(&self, message: &str) -> bool {
        let message = message.trim_end_matches(['\n', '\r']);
        if message.trim().is_empty() {
            return false;
        }
        self.write(&format!("{}\n{PROMPT}", message.green()));
        true
    }

    pub fn prompt(&self) {
        self.write(PROMPT);
    }

    pub fn println(&self, text: &str) {
        self.write(&format!("{text}\n"));
    }

    fn write(&self, text: &str) {
        let mut out = self
            .out
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let written = out.write_all(text.as_bytes());
        if let Err(e) = written.and_then(|()| out.flush()) {
            tracing::warn!("Failed to write to display: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Transcript;

    #[test]
    fn blank_lines_are_not_rendered() {
        let transcript = Transcript::new();
        let display = Display::new(transcript.clone());

        assert!(!display.incoming("\n"));
        assert!(!display.incoming("  \r\n"));
        assert!(transcript.contents().is_empty());
    }

    #[test]
    fn messages_render_once_followed_by_prompt() {
        let transcript = Transcript::new();
        let display = Display::new(transcript.clone());

        assert!(display.incoming("hello\n"));
        assert_eq!(transcript.count_lines("hello"), 1);
        assert!(transcript.contents().ends_with(PROMPT));
    }
}
