use tokio::io::AsyncWriteExt;

/// Everything a node printed, shared with the test.
#[derive(Clone, Default)]
struct Transcript(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

impl Transcript {
    fn new() -> Self {
        Self::default()
    }

    /// Lines equal to `message` once the prompt and color codes are removed.
    fn count_lines(&self, message: &str) -> usize {
        let buffer = self.0.lock().unwrap();
        let text = String::from_utf8_lossy(&buffer).into_owned();
        text.lines()
            .map(|line| line.replace("\x1b[32m", "").replace("\x1b[0m", ""))
            .filter(|line| line.trim_start_matches("> ") == message)
            .count()
    }
}

impl std::io::Write for Transcript {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

async fn eventually<F, Fut>(mut condition: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..1000 {
        if condition().await {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    panic!("condition not reached within 10s");
}

async fn start(
    dest: Option<String>,
    key: broadcast::KeySource,
) -> (broadcast::Node, Transcript) {
    let transcript = Transcript::new();
    let config = broadcast::NodeConfig {
        port: 0,
        dest,
        key,
        relay: false,
    };
    let node = broadcast::Node::start(
        config,
        std::sync::Arc::new(broadcast::Display::new(transcript.clone())),
    )
    .await
    .unwrap();
    (node, transcript)
}

#[tokio::test(flavor = "multi_thread")]
async fn two_nodes_exchange_lines() {
    let keys = tempfile::tempdir().unwrap();
    let (a, a_out) = start(None, broadcast::KeySource::File(keys.path().join("a.key"))).await;

    // dial A exactly as an operator would, from its banner
    let locator = a
        .banner()
        .lines()
        .find_map(|line| line.strip_prefix("To connect, run: broadcast -d "))
        .unwrap()
        .to_string();
    let (b, b_out) = start(Some(locator), broadcast::KeySource::Random).await;

    assert_eq!(b.destinations(), vec![a.locator()]);
    assert_eq!(b.context().registry.len().await, 1);

    let a_registry = a.context().registry.clone();
    eventually(|| {
        let registry = a_registry.clone();
        async move { registry.len().await == 1 }
    })
    .await;
    let inbound = a_registry.snapshot().await;
    assert_eq!(inbound[0].peer(), Some(b.peer_id()));
    assert_eq!(inbound[0].direction(), broadcast::Direction::Inbound);

    let (mut a_keys, a_stdin) = tokio::io::duplex(1024);
    let (mut b_keys, b_stdin) = tokio::io::duplex(1024);
    let (a_stop, a_stopped) = tokio::sync::oneshot::channel::<()>();
    let (b_stop, b_stopped) = tokio::sync::oneshot::channel::<()>();

    let operator = async {
        b_keys.write_all(b"hello\n").await.unwrap();
        eventually(|| {
            let out = a_out.clone();
            async move { out.count_lines("hello") == 1 }
        })
        .await;

        a_keys.write_all(b"hi\n").await.unwrap();
        eventually(|| {
            let out = b_out.clone();
            async move { out.count_lines("hi") == 1 }
        })
        .await;

        a_stop.send(()).unwrap();
        b_stop.send(()).unwrap();
    };

    let (a_result, b_result, ()) = tokio::join!(
        a.run(tokio::io::BufReader::new(a_stdin), async {
            let _ = a_stopped.await;
        }),
        b.run(tokio::io::BufReader::new(b_stdin), async {
            let _ = b_stopped.await;
        }),
        operator,
    );
    a_result.unwrap();
    b_result.unwrap();

    // nobody sees their own lines, and nothing arrived twice
    assert_eq!(a_out.count_lines("hello"), 1);
    assert_eq!(a_out.count_lines("hi"), 0);
    assert_eq!(b_out.count_lines("hi"), 1);
    assert_eq!(b_out.count_lines("hello"), 0);
}

#[tokio::test]
async fn key_file_gives_a_stable_identity() {
    let keys = tempfile::tempdir().unwrap();
    let path = keys.path().join("nested").join("node.key");

    let (first, _) = start(None, broadcast::KeySource::File(path.clone())).await;
    let id = first.peer_id();
    first.shutdown().await.unwrap();

    let (second, _) = start(None, broadcast::KeySource::File(path)).await;
    assert_eq!(second.peer_id(), id);
    second.shutdown().await.unwrap();
}
