//! Helpers shared by unit tests.

use crate::registry::{Direction, PeerStream};

/// Poll `condition` until it holds, panicking after five seconds.
pub(crate) async fn eventually<F, Fut>(mut condition: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..500 {
        if condition().await {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    panic!("condition not reached within 5s");
}

/// A stream whose peer end is an in-memory pipe.
///
/// Returns the stream (not yet registered) and the peer's read side.
pub(crate) fn piped_stream() -> (PeerStream, tokio::io::BufReader<tokio::io::DuplexStream>) {
    let (local, remote) = tokio::io::duplex(64 * 1024);
    let stream = PeerStream::new(None, Direction::Outbound, Box::new(local));
    (stream, tokio::io::BufReader::new(remote))
}

/// In-memory display sink; every clone sees the same buffer.
#[derive(Clone, Default)]
pub(crate) struct Transcript(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

impl Transcript {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn contents(&self) -> String {
        let buffer = self.0.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        String::from_utf8_lossy(&buffer).into_owned()
    }

    /// How many times `message` was rendered as a line of its own.
    pub(crate) fn count_lines(&self, message: &str) -> usize {
        self.contents()
            .lines()
            .map(strip_ansi)
            .filter(|line| line.trim_start_matches(crate::display::PROMPT) == message)
            .count()
    }
}

impl std::io::Write for Transcript {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

fn strip_ansi(line: &str) -> String {
    let mut plain = String::with_capacity(line.len());
    let mut chars = line.chars();
    while let Some(c) = chars.next() {
        if c == '\x1b' {
            // skip until the final byte of the escape sequence
            for c in chars.by_ref() {
                if c.is_ascii_alphabetic() {
                    break;
                }
            }
        } else {
            plain.push(c);
        }
    }
    plain
}

#[test]
fn strip_ansi_removes_color() {
    assert_eq!(strip_ansi("\x1b[32mhi\x1b[0m"), "hi");
    assert_eq!(strip_ansi("plain"), "plain");
}
