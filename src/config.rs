use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "Retorno";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default effectiveness window in days (visits vs appointments created).
pub const DEFAULT_WINDOW_DAYS: i64 = 30;

/// Get the application data directory
/// ~/Retorno/ on all platforms (user-visible, single clinic workspace)
pub fn app_data_dir() -> PathBuf {
    let home = dirs::home_dir().expect("Cannot determine home directory");
    home.join("Retorno")
}

/// Path of the clinic database file
pub fn database_path() -> PathBuf {
    app_data_dir().join("clinic.db")
}

/// Default tracing filter when RUST_LOG is unset
pub fn default_log_filter() -> String {
    "info,retorno=debug".to_string()
}
