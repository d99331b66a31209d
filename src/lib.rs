pub mod chat;
pub mod config;
pub mod models;
pub mod records;
pub mod routes;
pub mod transport;

#[cfg(test)]
mod test_support;

use tracing_subscriber::EnvFilter;

pub use chat::{ChatSession, SessionEvent, SessionUpdate, SubmitOutcome};
pub use config::{ChatConfig, ChatMode};

/// Install the global tracing subscriber. `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);
}
