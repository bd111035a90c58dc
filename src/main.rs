use chatterbox::{Config, Relay, app, relay::heartbeat};
use tracing::{info, warn};

fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("chatterbox=info"));
    let _ = fmt().with_env_filter(filter).try_init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = Config::load();
    let relay = Relay::new(&config);
    let monitor = heartbeat::spawn(relay.clone(), config.heartbeat_interval());

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    info!(
        addr = %listener.local_addr()?,
        heartbeat = ?config.heartbeat_interval(),
        "chatterbox listening"
    );

    let shutdown = {
        let relay = relay.clone();
        async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!(error = ?err, "failed to install ctrl-c handler");
                std::future::pending::<()>().await;
            }
            info!("shutting down");
            relay.close_all().await;
        }
    };

    axum::serve(listener, app(relay))
        .with_graceful_shutdown(shutdown)
        .await?;

    monitor.abort();
    Ok(())
}
