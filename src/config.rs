use color_eyre::{eyre::eyre, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::input::debounce::DebouncedBroadcaster;
use crate::layout::ControlConfig;
use crate::session::SessionSettings;

const CONFIG_DIR: &str = ".config/webcontroller";
const CONFIG_FILE: &str = "config.toml";

pub const MAX_DEVICE_ID: u8 = 16;
pub const MAX_DEBOUNCE_RATE_HZ: u32 = 1000;
pub const MAX_BUTTON_ID: u8 = 127;

// Written on first start so there is something to edit
const DEFAULT_CONFIG: &str = r#"[connection]
url = "ws://127.0.0.1:3000/websocket"
device_id = 1
heartbeat_interval_ms = 1000

[input]
debounce_rate_hz = 60

[[controls]]
kind = "joystick"
axis_x = "Axis.X"
axis_y = "Axis.Y"
rect = { x = 0.02, y = 0.05, width = 0.4, height = 0.9 }

[[controls]]
kind = "slider"
axis = "Axis.THROTTLE"
orientation = "vertical"
value = -100
rect = { x = 0.45, y = 0.05, width = 0.1, height = 0.75 }
spring_toggle = { rect = { x = 0.45, y = 0.82, width = 0.1, height = 0.13 }, state = false }

[[controls]]
kind = "slider"
axis = "Axis.RZ"
spring = 0
rect = { x = 0.6, y = 0.05, width = 0.38, height = 0.2 }
spring_toggle = { rect = { x = 0.6, y = 0.27, width = 0.12, height = 0.12 }, state = true }

[[controls]]
kind = "button"
id = 1
label = "A"
rect = { x = 0.6, y = 0.5, width = 0.18, height = 0.2 }

[[controls]]
kind = "button"
id = 2
label = "B"
rect = { x = 0.8, y = 0.5, width = 0.18, height = 0.2 }

[[controls]]
kind = "toggle"
id = 3
label = "Lights"
rect = { x = 0.6, y = 0.75, width = 0.38, height = 0.2 }
"#;

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct ConnectionConfig {
    pub url: String,
    pub device_id: u8,
    pub heartbeat_interval_ms: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            url: "ws://127.0.0.1:3000/websocket".to_string(),
            device_id: 1,
            heartbeat_interval_ms: 1000,
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct InputConfig {
    pub debounce_rate_hz: u32,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            debounce_rate_hz: DebouncedBroadcaster::DEFAULT_RATE_HZ,
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub connection: ConnectionConfig,
    pub input: InputConfig,
    pub controls: Vec<ControlConfig>,
}

impl AppConfig {
    pub fn parse(content: &str) -> Result<Self> {
        let config: AppConfig =
            toml::from_str(content).map_err(|e| eyre!("Failed to parse config: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn sample() -> Result<Self> {
        Self::parse(DEFAULT_CONFIG)
    }

    pub fn validate(&self) -> Result<()> {
        let connection = &self.connection;
        if !(1..=MAX_DEVICE_ID).contains(&connection.device_id) {
            return Err(eyre!(
                "device_id must be between 1 and {}, got {}",
                MAX_DEVICE_ID,
                connection.device_id
            ));
        }
        if connection.heartbeat_interval_ms == 0 {
            return Err(eyre!("heartbeat_interval_ms must be greater than 0"));
        }
        // No TLS connector is compiled in
        if !connection.url.starts_with("ws://") {
            return Err(eyre!(
                "url must use the ws:// scheme, got {}",
                connection.url
            ));
        }

        let rate = self.input.debounce_rate_hz;
        if !(1..=MAX_DEBOUNCE_RATE_HZ).contains(&rate) {
            return Err(eyre!(
                "debounce_rate_hz must be between 1 and {}, got {}",
                MAX_DEBOUNCE_RATE_HZ,
                rate
            ));
        }

        for (index, control) in self.controls.iter().enumerate() {
            if let ControlConfig::Button { id, .. } | ControlConfig::Toggle { id, .. } = control {
                if *id > MAX_BUTTON_ID {
                    return Err(eyre!(
                        "Control {} has button id {}, must be at most {}",
                        index,
                        id,
                        MAX_BUTTON_ID
                    ));
                }
            }
            for rect in control.rects() {
                if !rect.is_normalized() {
                    return Err(eyre!(
                        "Control {} has a rect outside the unit square: {:?}",
                        index,
                        rect
                    ));
                }
            }
        }

        if self.controls.is_empty() {
            warn!("Config defines no controls");
        }
        Ok(())
    }

    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            url: self.connection.url.clone(),
            device_id: self.connection.device_id,
            heartbeat_interval: Duration::from_millis(self.connection.heartbeat_interval_ms),
        }
    }
}

pub fn default_config_path() -> PathBuf {
    let mut path = get_home_dir();
    path.push(CONFIG_DIR);
    path.push(CONFIG_FILE);
    path
}

/// Loads the config from `path`, or from the default location.
///
/// A missing file at the default location is created from the sample config; a missing
/// explicitly requested file is an error.
pub async fn load(path: Option<PathBuf>) -> Result<AppConfig> {
    let explicit = path.is_some();
    let path = path.unwrap_or_else(default_config_path);

    let exists = tokio::fs::try_exists(&path)
        .await
        .map_err(|e| eyre!("Failed to check if config file exists: {}", e))?;

    if !exists {
        if explicit {
            return Err(eyre!("Config file does not exist: {}", path.display()));
        }
        warn!(
            "Config file {} does not exist, writing default",
            path.display()
        );
        write_default(&path).await?;
    }

    debug!("Reading config from {}", path.display());
    let content = tokio::fs::read_to_string(&path)
        .await
        .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    let config = AppConfig::parse(&content)?;
    info!(
        "Loaded config from {} with {} controls",
        path.display(),
        config.controls.len()
    );
    Ok(config)
}

async fn write_default(path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| eyre!("Failed to create config directory: {}", e))?;
    }
    tokio::fs::write(path, DEFAULT_CONFIG)
        .await
        .map_err(|e| eyre!("Failed to write default config file: {}", e))?;
    Ok(())
}

fn get_home_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| {
        warn!("Could not determine home directory, using current directory");
        PathBuf::from(".")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::Rect;
    use crate::widget::Orientation;

    #[test]
    fn sample_config_is_valid() {
        let config = AppConfig::sample().ok().unwrap_or_default();
        assert_eq!(config.connection, ConnectionConfig::default());
        assert_eq!(config.input.debounce_rate_hz, 60);
        assert_eq!(config.controls.len(), 6);

        match &config.controls[1] {
            ControlConfig::Slider {
                axis,
                orientation,
                value,
                spring_toggle,
                ..
            } => {
                assert_eq!(axis, "Axis.THROTTLE");
                assert_eq!(*orientation, Orientation::Vertical);
                assert_eq!(*value, Some(-100));
                assert!(spring_toggle.is_some());
            }
            other => panic!("unexpected control {:?}", other),
        }
    }

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let config = AppConfig::parse("[connection]\ndevice_id = 4\n").ok();
        let config = config.unwrap_or_default();
        assert_eq!(config.connection.device_id, 4);
        assert_eq!(config.connection.heartbeat_interval_ms, 1000);
        assert_eq!(config.input, InputConfig::default());
        assert!(config.controls.is_empty());
    }

    #[test]
    fn rejects_out_of_range_values() {
        assert!(AppConfig::parse("[connection]\ndevice_id = 17\n").is_err());
        assert!(AppConfig::parse("[connection]\ndevice_id = 0\n").is_err());
        assert!(AppConfig::parse("[connection]\nheartbeat_interval_ms = 0\n").is_err());
        assert!(AppConfig::parse("[connection]\nurl = \"http://host\"\n").is_err());
        assert!(AppConfig::parse("[connection]\nurl = \"wss://127.0.0.1:3000/websocket\"\n").is_err());
        assert!(AppConfig::parse("[connection]\nurl = \"ws://10.0.0.2:3000/websocket\"\n").is_ok());
        assert!(AppConfig::parse("[input]\ndebounce_rate_hz = 0\n").is_err());
        assert!(AppConfig::parse(
            "[[controls]]\nkind = \"button\"\nid = 1\nrect = { x = 0.5, y = 0.5, width = 0.6, height = 0.1 }\n"
        )
        .is_err());
        assert!(AppConfig::parse(
            "[[controls]]\nkind = \"toggle\"\nid = 200\nrect = { x = 0.0, y = 0.0, width = 0.1, height = 0.1 }\n"
        )
        .is_err());
    }

    #[test]
    fn session_settings_follow_connection_section() {
        let mut config = AppConfig::default();
        config.connection.device_id = 7;
        config.connection.heartbeat_interval_ms = 250;

        let settings = config.session_settings();
        assert_eq!(settings.device_id, 7);
        assert_eq!(settings.heartbeat_interval, Duration::from_millis(250));
        assert_eq!(settings.url, "ws://127.0.0.1:3000/websocket");
    }

    #[tokio::test]
    async fn explicit_missing_file_is_an_error() {
        let path = std::env::temp_dir().join("webcontroller-missing-config-test.toml");
        assert!(load(Some(path)).await.is_err());
    }

    #[tokio::test]
    async fn loads_explicit_file() {
        let path = std::env::temp_dir().join(format!(
            "webcontroller-config-test-{}.toml",
            std::process::id()
        ));
        tokio::fs::write(&path, "[connection]\ndevice_id = 2\n")
            .await
            .ok();

        let config = load(Some(path.clone())).await.ok();
        tokio::fs::remove_file(&path).await.ok();
        assert_eq!(config.map(|c| c.connection.device_id), Some(2));
    }

    #[test]
    fn rect_bounds_check() {
        assert!(Rect::new(0.0, 0.0, 1.0, 1.0).is_normalized());
        assert!(!Rect::new(0.5, 0.0, 0.6, 1.0).is_normalized());
        assert!(!Rect::new(0.1, 0.1, -0.1, 0.5).is_normalized());
    }
}
