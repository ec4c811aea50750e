use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const SETTINGS_FILE: &str = "carryon.yaml";
pub const DEFAULT_SCRIPTS_DIR: &str = "scripts";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("usage: carryon <root> [scripts_dir]")]
    Usage,
    #[error("read {path} failed: {message}")]
    Read { path: String, message: String },
    #[error("parse {path} failed: {message}")]
    Parse { path: String, message: String },
    #[error("invalid {name} '{value}'")]
    Invalid { name: String, value: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CarrySettings {
    pub cooldown_ms: u64,
    pub reach: f64,
    pub match_cache: usize,
}

impl Default for CarrySettings {
    fn default() -> Self {
        Self {
            cooldown_ms: 500,
            reach: 5.0,
            match_cache: 256,
        }
    }
}

impl CarrySettings {
    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }

    /// Reads `<root>/carryon.yaml`; a missing file yields the defaults.
    pub fn load(root: &Path) -> Result<Self, ConfigError> {
        let path = root.join(SETTINGS_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(&path).map_err(|err| ConfigError::Read {
            path: path.display().to_string(),
            message: err.to_string(),
        })?;
        Self::parse(&text).map_err(|err| match err {
            ConfigError::Parse { message, .. } => ConfigError::Parse {
                path: path.display().to_string(),
                message,
            },
            other => other,
        })
    }

    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        let settings: Self = serde_yaml::from_str(text).map_err(|err| ConfigError::Parse {
            path: SETTINGS_FILE.to_string(),
            message: err.to_string(),
        })?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !self.reach.is_finite() || self.reach <= 0.0 {
            return Err(ConfigError::Invalid {
                name: "reach".to_string(),
                value: self.reach.to_string(),
            });
        }
        Ok(())
    }

    pub fn apply_env<F>(&mut self, env: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = non_empty(env("CARRYON_COOLDOWN_MS")) {
            self.cooldown_ms = parse_env("CARRYON_COOLDOWN_MS", &value)?;
        }
        if let Some(value) = non_empty(env("CARRYON_REACH")) {
            self.reach = parse_env("CARRYON_REACH", &value)?;
        }
        if let Some(value) = non_empty(env("CARRYON_MATCH_CACHE")) {
            self.match_cache = parse_env("CARRYON_MATCH_CACHE", &value)?;
        }
        self.validate()
    }
}

#[derive(Debug)]
pub struct AppConfig {
    pub root: PathBuf,
    pub scripts_dir: PathBuf,
    pub settings: CarrySettings,
}

impl AppConfig {
    pub fn from_args(args: &[String]) -> Result<Self, ConfigError> {
        Self::from_args_with_env(args, |name| std::env::var(name).ok())
    }

    pub fn from_args_with_env<F>(args: &[String], env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if args.len() < 2 {
            return Err(ConfigError::Usage);
        }

        let root = Path::new(&args[1]).to_path_buf();
        let scripts_dir = if args.len() > 2 {
            PathBuf::from(&args[2])
        } else {
            non_empty(env("CARRYON_SCRIPTS_DIR"))
                .map(PathBuf::from)
                .unwrap_or_else(|| root.join(DEFAULT_SCRIPTS_DIR))
        };
        let mut settings = CarrySettings::load(&root)?;
        settings.apply_env(env)?;
        Ok(Self {
            root,
            scripts_dir,
            settings,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, ConfigError> {
    value.parse::<T>().map_err(|_| ConfigError::Invalid {
        name: name.to_string(),
        value: value.to_string(),
    })
}
