use crate::session::DEFAULT_BREAK_MINUTES;
use crate::ticker::DEFAULT_AUTO_START_MS;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// User settings stored in config.json
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Owner recorded on new tasks and used to filter the task list
    pub user_id: String,
    /// Break length offered by the focus timer
    pub break_minutes: i64,
    /// Delay before an opened focus session starts counting
    pub auto_start_delay_ms: u64,
    /// Desktop notifications when a session finishes a task or a break ends
    pub notifications: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            user_id: "local".to_string(),
            break_minutes: DEFAULT_BREAK_MINUTES,
            auto_start_delay_ms: DEFAULT_AUTO_START_MS,
            notifications: true,
        }
    }
}

/// Load config from config.json, defaults when the file doesn't exist
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Ok(AppConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config: {}", path.display()))?;
    let config: AppConfig = serde_json::from_str(&content)
        .with_context(|| format!("Invalid config file: {}", path.display()))?;
    Ok(config)
}

/// Save config to config.json
pub fn save_config<P: AsRef<Path>>(path: P, config: &AppConfig) -> Result<()> {
    let json = serde_json::to_string_pretty(config)?;
    crate::persistence::atomic_write(path, &json)?;
    Ok(())
}
