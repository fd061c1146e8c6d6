use clap::Parser;
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "focusboard", about = "A focus timer with streaks, a leaderboard and a forum")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Host to bind to
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Path to data directory
    #[arg(long)]
    pub data_dir: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub timer: TimerConfig,
    pub forum: ForumConfig,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct AuthConfig {
    pub cookie_name: String,
    pub session_hours: u64,
    pub min_password_len: usize,
    pub bcrypt_cost: u32,
}

/// Preset lengths in seconds.
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct TimerConfig {
    pub focus_secs: u32,
    pub short_break_secs: u32,
    pub long_break_secs: u32,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ForumConfig {
    pub page_size: usize,
    pub search_window: usize,
    pub leaderboard_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            cookie_name: "focusboard_session".to_string(),
            session_hours: 720,
            min_password_len: 8,
            bcrypt_cost: bcrypt::DEFAULT_COST,
        }
    }
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            focus_secs: 1500,
            short_break_secs: 300,
            long_break_secs: 900,
        }
    }
}

impl Default for ForumConfig {
    fn default() -> Self {
        Self {
            page_size: 10,
            search_window: 20,
            leaderboard_size: 10,
        }
    }
}

impl Config {
    pub fn load(cli: &Cli) -> anyhow::Result<Self> {
        let data_dir = Self::data_dir(cli)?;
        let config_path = cli
            .config
            .clone()
            .unwrap_or_else(|| data_dir.join("config.toml"));

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            Config::default()
        };

        // CLI overrides
        if let Some(ref host) = cli.host {
            config.server.host = host.clone();
        }
        if let Some(port) = cli.port {
            config.server.port = port;
        }

        if config.database.path.is_none() {
            config.database.path = Some(data_dir.join("focusboard.db"));
        }

        config.validate()?;
        Ok(config)
    }

    pub fn data_dir(cli: &Cli) -> anyhow::Result<PathBuf> {
        match cli.data_dir.clone() {
            Some(dir) => Ok(dir),
            None => dirs::home_dir()
                .map(|home| home.join(".focusboard"))
                .ok_or_else(|| anyhow::anyhow!("Could not determine home directory")),
        }
    }

    /// Database file location. Always set after `load`; falls back to a
    /// relative file for hand-built configs.
    pub fn db_path(&self) -> PathBuf {
        self.database
            .path
            .clone()
            .unwrap_or_else(|| PathBuf::from("focusboard.db"))
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.timer.focus_secs == 0
            || self.timer.short_break_secs == 0
            || self.timer.long_break_secs == 0
        {
            anyhow::bail!("timer presets must be longer than zero seconds");
        }
        if !(4..=31).contains(&self.auth.bcrypt_cost) {
            anyhow::bail!("auth.bcrypt_cost must be between 4 and 31");
        }
        if self.forum.page_size == 0 {
            anyhow::bail!("forum.page_size must be at least 1");
        }
        if self.forum.search_window == 0 {
            anyhow::bail!("forum.search_window must be at least 1");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli_for(dir: &std::path::Path) -> Cli {
        Cli {
            config: None,
            host: None,
            port: None,
            data_dir: Some(dir.to_path_buf()),
        }
    }

    #[test]
    fn default_config_has_expected_values() {
        let config = Config::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.auth.cookie_name, "focusboard_session");
        assert_eq!(config.auth.session_hours, 720);
        assert_eq!(config.timer.focus_secs, 1500);
        assert_eq!(config.timer.short_break_secs, 300);
        assert_eq!(config.timer.long_break_secs, 900);
        assert_eq!(config.forum.page_size, 10);
        assert_eq!(config.forum.search_window, 20);
        assert!(config.database.path.is_none());
    }

    #[test]
    fn data_dir_uses_cli_override() {
        let cli = cli_for(std::path::Path::new("/tmp/test-focusboard"));
        assert_eq!(
            Config::data_dir(&cli).unwrap(),
            PathBuf::from("/tmp/test-focusboard")
        );
    }

    #[test]
    fn load_with_no_config_file_uses_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config::load(&cli_for(tmp.path())).unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.db_path(), tmp.path().join("focusboard.db"));
    }

    #[test]
    fn load_reads_toml_file_and_cli_wins() {
        let tmp = tempfile::tempdir().unwrap();
        let config_path = tmp.path().join("config.toml");
        std::fs::write(
            &config_path,
            r#"
[server]
host = "192.168.1.1"
port = 9000

[timer]
focus_secs = 3000

[forum]
page_size = 25
"#,
        )
        .unwrap();

        let cli = Cli {
            config: Some(config_path),
            host: None,
            port: Some(4000),
            data_dir: Some(tmp.path().to_path_buf()),
        };
        let config = Config::load(&cli).unwrap();
        assert_eq!(config.server.host, "192.168.1.1");
        assert_eq!(config.server.port, 4000);
        assert_eq!(config.timer.focus_secs, 3000);
        assert_eq!(config.timer.short_break_secs, 300);
        assert_eq!(config.forum.page_size, 25);
    }

    #[test]
    fn zero_length_preset_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let config_path = tmp.path().join("config.toml");
        std::fs::write(&config_path, "[timer]\nshort_break_secs = 0\n").unwrap();

        let cli = Cli {
            config: Some(config_path),
            ..cli_for(tmp.path())
        };
        assert!(Config::load(&cli).is_err());
    }

    #[test]
    fn zero_search_window_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let config_path = tmp.path().join("config.toml");
        std::fs::write(&config_path, "[forum]\nsearch_window = 0\n").unwrap();

        let cli = Cli {
            config: Some(config_path),
            ..cli_for(tmp.path())
        };
        let err = Config::load(&cli).unwrap_err();
        assert!(err.to_string().contains("search_window"));
    }
}
