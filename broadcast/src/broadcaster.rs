//! Local input fan-out.

use tokio::io::AsyncBufReadExt;

/// A write that takes longer than this counts as a failed delivery.
const WRITE_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);

/// Outcome of one broadcast.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Delivery {
    pub delivered: usize,
    pub failed: usize,
}

/// Write `message` to every stream currently registered.
///
/// Writes run concurrently, so one slow peer does not hold up the rest. A
/// stream that fails (or times out) is logged and dropped from the registry;
/// the others still get the message.
pub async fn broadcast(registry: &crate::StreamRegistry, message: &str) -> Delivery {
    let streams = registry.snapshot().await;

    let writes = streams.iter().map(|stream| async move {
        let result = match tokio::time::timeout(WRITE_TIMEOUT, stream.send_line(message)).await {
            Ok(result) => result,
            Err(_) => Err(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                format!("write did not complete within {WRITE_TIMEOUT:?}"),
            )),
        };
        (stream, result)
    });

    let mut delivery = Delivery::default();
    for (stream, result) in futures_util::future::join_all(writes).await {
        match result {
            Ok(()) => delivery.delivered += 1,
            Err(e) => {
                tracing::warn!(
                    stream = %stream.id(),
                    peer = ?stream.peer(),
                    "Dropping stream after failed write: {e}"
                );
                registry.remove(stream.id()).await;
                delivery.failed += 1;
            }
        }
    }
    delivery
}

/// Read operator lines and broadcast each one until input ends or shutdown.
///
/// End of input returns `Ok(())`: with nothing left to send the node has no
/// more work. A read error is fatal.
pub async fn run<R>(mut input: R, ctx: crate::NodeContext) -> Result<(), crate::BroadcastError>
where
    R: tokio::io::AsyncBufRead + Unpin,
{
    let mut line = String::new();

    loop {
        ctx.display.prompt();
        line.clear();

        let read = tokio::select! {
            _ = ctx.graceful.cancelled() => return Ok(()),
            read = input.read_line(&mut line) => read,
        };

        match read {
            Ok(0) => {
                tracing::info!("Local input closed");
                return Ok(());
            }
            Ok(_) => {}
            Err(source) => return Err(crate::BroadcastError::Input { source }),
        }

        let message = line.trim_end_matches(['\n', '\r']);
        let delivery = broadcast(&ctx.registry, message).await;
        tracing::debug!(
            delivered = delivery.delivered,
            failed = delivery.failed,
            "Broadcast {} bytes",
            message.len()
        );
    }
}
