use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub db_path: PathBuf,
}

impl Config {
    /// TASKWHEEL_ADDR and TASKWHEEL_DB, with defaults suitable for local
    /// use. An unparseable address falls back to the default with a
    /// warning rather than refusing to start.
    pub fn from_env() -> Self {
        let default_addr = SocketAddr::from((Ipv4Addr::LOCALHOST, 3000));
        let addr = match std::env::var("TASKWHEEL_ADDR") {
            Ok(raw) => raw.parse().unwrap_or_else(|_| {
                tracing::warn!(%raw, "invalid TASKWHEEL_ADDR, using default");
                default_addr
            }),
            Err(_) => default_addr,
        };

        let db_path = std::env::var("TASKWHEEL_DB")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("data/db.json"));

        Self { addr, db_path }
    }
}
