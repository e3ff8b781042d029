use clap::Parser;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    init_tracing();

    let config = broadcast::NodeConfig::from(broadcast::Cli::parse());
    let display = std::sync::Arc::new(broadcast::Display::stdout());

    let node = broadcast::Node::start(config, display.clone()).await?;
    display.println(node.banner().trim_end());

    let input = tokio::io::BufReader::new(tokio::io::stdin());
    let result = node.run(input, ctrl_c()).await;

    // tokio's stdin reader sits on a blocking thread that would keep the
    // runtime from shutting down
    match result {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            eprintln!("Error: {e:?}");
            std::process::exit(1)
        }
    }
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("broadcast=info,broadcast_net=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
}
