//! Daemon configuration.
//!
//! A JSON file supplies defaults; command line flags override individual
//! fields.

use std::fs;
use std::path::Path;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// Target frame rate of the periodic driver.
    pub frame_rate_hz: f64,
    /// Animation speed multiplier; 1.0 is real time.
    pub speed: f64,
    /// Program selected on startup.
    pub program: Option<String>,
    /// Start under day/night scheduling instead of immediately.
    pub scheduled: bool,
    /// Number of output channels the strings are split across.
    pub channels: usize,
    /// Local (hour, minute) at which the show stops in the morning.
    pub sunrise: (u32, u32),
    /// Local (hour, minute) at which the show starts in the evening.
    pub sunset: (u32, u32),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            frame_rate_hz: 60.0,
            speed: 1.0,
            program: None,
            scheduled: false,
            channels: 2,
            sunrise: (6, 0),
            sunset: (19, 50),
        }
    }
}

pub fn load(path: &Path) -> Result<AppConfig, Box<dyn std::error::Error>> {
    let raw = fs::read_to_string(path)?;
    let config = serde_json::from_str(&raw)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_files_fall_back_to_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{ "speed": 0.5, "program": "cascade" }"#).unwrap();
        assert_eq!(config.speed, 0.5);
        assert_eq!(config.program.as_deref(), Some("cascade"));
        assert_eq!(config.frame_rate_hz, 60.0);
        assert_eq!(config.channels, 2);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(serde_json::from_str::<AppConfig>(r#"{ "framerate": 30 }"#).is_err());
    }
}
