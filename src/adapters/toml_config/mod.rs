// TOML config adapter - Application configuration loaded from a TOML file

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::app::encode_interactor::Workspace;
use crate::domain::errors::*;
use crate::engine::command::EncoderSettings;

const APP_DIR: &str = "chopper";
const CONFIG_FILE_NAME: &str = "config.toml";
const LOG_FILE_NAME: &str = "chopper.log";

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// Directory that receives finished outputs
    pub output_root: PathBuf,
    /// Working directory name, created inside `output_root`
    pub working_dir_name: String,
    pub ffmpeg_path: String,
    pub ffprobe_path: String,
    /// Upper bound on normalized intro/outro length; unset keeps full clips
    pub intro_outro_max_duration_seconds: Option<f64>,
    /// Length of the clip generated from a still intro/outro
    pub still_image_duration_seconds: f64,
    /// Audio rate when neither clip reports one
    pub default_sample_rate: u32,
    /// Diagnostic log; defaults to `chopper.log` in the output root
    pub log_file: Option<PathBuf>,
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        let settings = EncoderSettings::default();
        Self {
            output_root: default_output_root(),
            working_dir_name: ".encoding".to_string(),
            ffmpeg_path: settings.ffmpeg_path,
            ffprobe_path: "ffprobe".to_string(),
            intro_outro_max_duration_seconds: settings.intro_outro_max_duration_seconds,
            still_image_duration_seconds: settings.still_image_duration_seconds,
            default_sample_rate: settings.default_sample_rate,
            log_file: None,
            log_level: "info".to_string(),
        }
    }
}

fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
}

fn default_output_root() -> PathBuf {
    home_dir()
        .map(|home| home.join("Desktop").join("Chopper"))
        .unwrap_or_else(|| PathBuf::from("Chopper"))
}

impl AppConfig {
    /// `$HOME/.config/chopper/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        home_dir().map(|home| home.join(".config").join(APP_DIR).join(CONFIG_FILE_NAME))
    }

    /// Parse a TOML document; missing keys take their defaults
    pub fn from_toml_str(content: &str) -> Result<Self, DomainError> {
        toml::from_str(content)
            .map_err(|e| DomainError::Config(format!("Failed to parse TOML config: {}", e)))
    }

    /// Load from a specific file
    pub fn load_from(path: &Path) -> Result<Self, DomainError> {
        let content = fs::read_to_string(path).map_err(|e| {
            DomainError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        debug!("Loaded configuration from {}", path.display());
        Self::from_toml_str(&content)
    }

    /// Explicit file if given, else the default location when it exists, else defaults
    pub fn load(explicit: Option<&Path>) -> Result<Self, DomainError> {
        let config = match explicit {
            Some(path) => Self::load_from(path)?,
            None => match Self::default_path().filter(|p| p.exists()) {
                Some(path) => Self::load_from(&path)?,
                None => Self::default(),
            },
        };
        config.validate()?;
        Ok(config)
    }

    /// Apply command-line overrides on top of the file values
    pub fn with_overrides(mut self, output_root: Option<PathBuf>, log_level: Option<String>) -> Self {
        if let Some(root) = output_root {
            self.output_root = root;
        }
        if let Some(level) = log_level {
            self.log_level = level;
        }
        self
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.ffmpeg_path.trim().is_empty() {
            return Err(DomainError::Config("ffmpeg_path must not be empty".to_string()));
        }
        if self.ffprobe_path.trim().is_empty() {
            return Err(DomainError::Config("ffprobe_path must not be empty".to_string()));
        }
        if self.working_dir_name.trim().is_empty() {
            return Err(DomainError::Config(
                "working_dir_name must not be empty".to_string(),
            ));
        }
        if !self.still_image_duration_seconds.is_finite() || self.still_image_duration_seconds <= 0.0 {
            return Err(DomainError::Config(format!(
                "still_image_duration_seconds must be positive, got {}",
                self.still_image_duration_seconds
            )));
        }
        if let Some(max) = self.intro_outro_max_duration_seconds {
            if !max.is_finite() || max <= 0.0 {
                return Err(DomainError::Config(format!(
                    "intro_outro_max_duration_seconds must be positive, got {}",
                    max
                )));
            }
        }
        if self.default_sample_rate == 0 {
            return Err(DomainError::Config(
                "default_sample_rate must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn encoder_settings(&self) -> EncoderSettings {
        EncoderSettings {
            ffmpeg_path: self.ffmpeg_path.clone(),
            intro_outro_max_duration_seconds: self.intro_outro_max_duration_seconds,
            still_image_duration_seconds: self.still_image_duration_seconds,
            default_sample_rate: self.default_sample_rate,
        }
    }

    pub fn workspace(&self) -> Workspace {
        Workspace::new(&self.output_root, &self.working_dir_name)
    }

    pub fn log_file_path(&self) -> PathBuf {
        self.log_file
            .clone()
            .unwrap_or_else(|| self.output_root.join(LOG_FILE_NAME))
    }
}
