pub mod config;
pub mod files;
pub mod store;

pub use config::{load_config, save_config, AppConfig};
pub use files::{atomic_write, config_file, ensure_data_dir, ensure_dir, init_local_dir, log_file};
pub use store::TaskStore;
