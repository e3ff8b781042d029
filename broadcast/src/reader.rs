//! One reader loop per stream.

use tokio::io::{AsyncBufReadExt, AsyncReadExt};

/// Longest message rendered, newline included. Longer lines are dropped.
pub const MAX_LINE_BYTES: u64 = 64 * 1024;

/// Render every line the peer sends until the stream ends.
///
/// End of stream and read errors only end this loop; other peers are not
/// affected. Either way the stream is taken out of the registry so the
/// broadcaster stops writing to it.
pub async fn read_loop(
    id: crate::StreamId,
    mut reader: crate::registry::BoxedReader,
    ctx: crate::NodeContext,
) {
    let mut buffer = Vec::new();
    // inside a line that went over MAX_LINE_BYTES, until its newline shows up
    let mut discarding = false;

    loop {
        buffer.clear();
        let mut limited = (&mut reader).take(MAX_LINE_BYTES);
        let read = tokio::select! {
            _ = ctx.graceful.cancelled() => {
                tracing::debug!(stream = %id, "Reader loop cancelled");
                break;
            }
            read = limited.read_until(b'\n', &mut buffer) => read,
        };

        match read {
            Ok(0) => {
                tracing::debug!(stream = %id, "Stream closed by peer");
                break;
            }
            Ok(n) => {
                let complete = buffer.last() == Some(&b'\n');
                if discarding || (!complete && n as u64 == MAX_LINE_BYTES) {
                    if !discarding {
                        tracing::warn!(stream = %id, "Dropping line longer than {MAX_LINE_BYTES} bytes");
                    }
                    discarding = !complete;
                    continue;
                }

                let message = String::from_utf8_lossy(&buffer);
                ctx.display.incoming(&message);
            }
            Err(e) => {
                tracing::warn!(stream = %id, "Failed to read from stream: {e}");
                break;
            }
        }
    }

    ctx.registry.remove(id).await;
}
