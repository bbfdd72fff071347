use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "Medrec";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default tracing filter when RUST_LOG is unset
pub fn default_log_filter() -> &'static str {
    "medrec=info"
}

/// Get the application data directory
pub fn app_data_dir() -> PathBuf {
    let home = dirs::home_dir().expect("Cannot determine home directory");
    home.join("Medrec")
}

/// Get the record store path
pub fn database_path() -> PathBuf {
    app_data_dir().join("medrec.db")
}
