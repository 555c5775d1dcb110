pub mod analytics; // Director analytics aggregation
pub mod authorization; // Role-gated panels + record amendment checks
pub mod config;
pub mod dashboard; // Operational dashboard stats + composition
pub mod db;
pub mod models;
pub mod overdue; // Busca Ativa overdue derivation
pub mod records; // Encounter creation and amendment
pub mod session; // Session & identity resolver
pub mod state;

pub use state::AppState;

use tracing_subscriber::EnvFilter;

/// Initialize tracing with the RUST_LOG override or the default filter.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);
}
