use crate::persistence::{ensure_dir, log_file};
use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter directive
pub const LOG_ENV: &str = "FOCUSLINE_LOG";

const DEFAULT_FILTER: &str = "focusline=info";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Send tracing output to `<data dir>/focusline.log`
///
/// The terminal belongs to the focus screen, so nothing is written to stdout.
/// Calling this twice is harmless; the first subscriber wins.
pub fn init_logging(data_dir: &Path) -> Result<()> {
    ensure_dir(data_dir)?;
    let path = log_file(data_dir);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Failed to open log file: {}", path.display()))?;

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .finish();

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_init_logging_creates_log_file() {
        let temp_dir = tempdir().unwrap();
        let data_dir = temp_dir.path().join("data");
        init_logging(&data_dir).unwrap();
        assert!(log_file(&data_dir).exists());
    }
}
