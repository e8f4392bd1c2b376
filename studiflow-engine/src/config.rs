//! Engine configuration.

use serde::Deserialize;
use std::path::PathBuf;
use studiflow_core::types::PostingScheduleConfig;

/// Engine configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to configuration file
    pub config_path: PathBuf,
    /// Log file path
    pub log_file: PathBuf,
    /// Settings read from the configuration file
    pub file: FileConfig,
}

/// Contents of `config.toml`. Every section is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub schedule: PostingScheduleConfig,
    pub automation: AutomationConfig,
    pub content: ContentConfig,
}

/// `[automation]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AutomationConfig {
    /// Strategy selected when the engine starts a session on boot.
    pub strategy: String,
    /// Hashtags handed to the targeting service.
    pub hashtags: Vec<String>,
    /// Whether to start an automation session on engine startup.
    pub auto_start: bool,
}

impl Default for AutomationConfig {
    fn default() -> Self {
        Self {
            strategy: "StudiFlow Conservative".to_string(),
            hashtags: vec!["#studium".to_string(), "#unileben".to_string()],
            auto_start: false,
        }
    }
}

/// `[content]` section: the simulated content backlog.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ContentConfig {
    /// Content ids available for auto-scheduling.
    pub pending_ids: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        let studiflow_dir = home.join(".studiflow");
        Self {
            config_path: studiflow_dir.join("config.toml"),
            log_file: studiflow_dir.join("engine.log"),
            file: FileConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file or defaults
    ///
    /// Standard directory structure:
    /// ```text
    /// ~/.studiflow/
    /// ├── config.toml           # Schedule, automation and content settings
    /// └── engine.log            # Logs
    /// ```
    ///
    /// `STUDIFLOW_DIR` overrides the base directory. A missing config file is
    /// not an error; a malformed one is.
    pub fn load() -> anyhow::Result<Self> {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        let studiflow_dir = std::env::var("STUDIFLOW_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| home.join(".studiflow"));

        std::fs::create_dir_all(&studiflow_dir)?;

        let config_path = studiflow_dir.join("config.toml");
        let file = if config_path.exists() {
            let raw = std::fs::read_to_string(&config_path)?;
            toml::from_str(&raw)?
        } else {
            FileConfig::default()
        };

        Ok(Self {
            config_path,
            log_file: studiflow_dir.join("engine.log"),
            file,
        })
    }
}
