use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use taskwheel::config::Config;
use taskwheel::store::Store;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("taskwheel=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env();

    let store = match Store::open(&config.db_path) {
        Ok(store) => Arc::new(store),
        Err(err) => {
            tracing::error!(path = %config.db_path.display(), %err, "failed to load database");
            std::process::exit(1);
        }
    };

    let app = taskwheel::app(store);

    tracing::info!("server running at http://{}", config.addr);
    tracing::info!("API base: http://{}/api", config.addr);

    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .expect("bind failed");

    axum::serve(listener, app).await.expect("server error");
}
