use crate::catalog::{ActionId, Catalog};
use crate::events::AppEvent;
use crate::interaction::engine::EngineConfig;
use crate::interaction::{GestureConfig, PlacementMap, SlotIndex};
use crate::interaction::drag::DEFAULT_PROXY_SIZE;
use crate::interaction::gesture::{
    DEFAULT_DRAG_START, DEFAULT_LONG_PRESS, DEFAULT_MOVE_THRESHOLD, DEFAULT_PRESS_FEEDBACK,
};
use crate::scene::WheelLayout;
use async_channel::Sender;
use config::builder::DefaultState;
use config::{ConfigBuilder, Environment};
use directories::ProjectDirs;
use esplink::DeviceAddress;
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct GestureSettings {
    pub drag_start_ms: u64,
    pub long_press_ms: u64,
    pub press_feedback_ms: u64,
    pub move_threshold: f64,
    pub proxy_size: f64,
}

impl Default for GestureSettings {
    fn default() -> Self {
        Self {
            drag_start_ms: DEFAULT_DRAG_START.as_millis() as u64,
            long_press_ms: DEFAULT_LONG_PRESS.as_millis() as u64,
            press_feedback_ms: DEFAULT_PRESS_FEEDBACK.as_millis() as u64,
            move_threshold: DEFAULT_MOVE_THRESHOLD,
            proxy_size: DEFAULT_PROXY_SIZE,
        }
    }
}

impl GestureSettings {
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            gesture: GestureConfig {
                drag_start: Duration::from_millis(self.drag_start_ms),
                long_press: Duration::from_millis(self.long_press_ms),
                press_feedback: Duration::from_millis(self.press_feedback_ms),
                move_threshold: self.move_threshold,
            },
            proxy_size: self.proxy_size,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct DeviceSettings {
    /// Host or IP of the device, with or without an `http://` prefix.
    pub address: Option<String>,
    pub timeout_ms: u64,
    pub auto_connect: bool,
    pub websocket: bool,
    pub ws_port: u16,
    pub reconnect_ms: u64,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            address: None,
            timeout_ms: esplink::http::DEFAULT_TIMEOUT.as_millis() as u64,
            auto_connect: false,
            websocket: true,
            ws_port: esplink::socket::DEFAULT_PORT,
            reconnect_ms: esplink::socket::DEFAULT_RECONNECT_DELAY.as_millis() as u64,
        }
    }
}

impl DeviceSettings {
    pub fn address(&self) -> Option<DeviceAddress> {
        self.address.as_deref().and_then(DeviceAddress::parse)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerSettings {
    pub socket_path: PathBuf,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            socket_path: PathBuf::from("/tmp/helm.sock"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SlotConfig {
    pub slot: Option<SlotIndex>,
    pub action: Option<ActionId>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub gesture: GestureSettings,
    #[serde(default)]
    pub layout: WheelLayout,
    #[serde(default)]
    pub device: DeviceSettings,
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub slots: Vec<SlotConfig>,
}

impl Config {
    /// Startup placements from `[[slots]]`. Incomplete entries and ids missing from the
    /// catalog are skipped; a repeated action ends up in the last slot naming it.
    pub fn placements(&self, catalog: &Catalog) -> PlacementMap {
        let assignments = self.slots.iter().filter_map(|cfg| match (cfg.slot, cfg.action) {
            (Some(slot), Some(action)) if catalog.contains(action) => Some((slot, action)),
            (Some(slot), Some(action)) => {
                log::warn!("Slot {slot}: unknown action {action} ignored");
                None
            }
            _ => None,
        });
        PlacementMap::from_assignments(assignments)
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to determine config directory")]
    ConfigDirNotFound,
    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("Notify error: {0}")]
    Notify(#[from] notify::Error),
}

pub fn get_config_path() -> Result<PathBuf, ConfigError> {
    let proj_dirs =
        ProjectDirs::from("org", "helm", "helm").ok_or(ConfigError::ConfigDirNotFound)?;
    Ok(proj_dirs.config_dir().join("config.toml"))
}

fn finish(builder: ConfigBuilder<DefaultState>) -> Result<Config, ConfigError> {
    let s = builder
        .add_source(
            Environment::with_prefix("HELM")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;
    Ok(s.try_deserialize()?)
}

pub fn load_config() -> Result<Config, ConfigError> {
    let config_path = get_config_path()?;
    finish(config::Config::builder().add_source(config::File::from(config_path).required(false)))
}

/// Defaults when the file is missing or broken; a broken file is logged, not fatal.
pub fn load_or_setup() -> Config {
    if let Ok(path) = get_config_path()
        && !path.exists()
    {
        match write_default_config() {
            Ok(path) => log::info!("Wrote default config to {}", path.display()),
            Err(e) => log::warn!("No config at {} and none written: {}", path.display(), e),
        }
        return Config::default();
    }

    load_config().unwrap_or_else(|e| {
        log::error!("{e}; falling back to defaults");
        Config::default()
    })
}

pub fn write_default_config() -> std::io::Result<PathBuf> {
    let path =
        get_config_path().map_err(|e| std::io::Error::new(std::io::ErrorKind::NotFound, e))?;
    if let Some(parent) = path.parent() {
        fs_err::create_dir_all(parent)?;
    }
    if !path.exists() {
        fs_err::write(&path, DEFAULT_CONFIG)?;
    }
    Ok(path)
}

const DEFAULT_CONFIG: &str = include_str!("default_config.toml");

pub async fn run_async_watcher(tx: Sender<AppEvent>) {
    let config_path = match get_config_path() {
        Ok(p) => p,
        Err(e) => {
            log::error!("Config watcher error: {}", e);
            return;
        }
    };
    let config_dir = match config_path.parent() {
        Some(p) => p.to_path_buf(),
        None => return,
    };

    if let Err(e) = fs_err::create_dir_all(&config_dir) {
        log::error!("Failed to create config directory for watching: {}", e);
        return;
    }

    let (bridge_tx, bridge_rx) = async_channel::unbounded();

    let mut watcher = match RecommendedWatcher::new(
        move |res| {
            let _ = bridge_tx.send_blocking(res);
        },
        notify::Config::default(),
    ) {
        Ok(w) => w,
        Err(e) => {
            log::error!("Failed to create watcher: {}", ConfigError::from(e));
            return;
        }
    };

    if let Err(e) = watcher.watch(&config_dir, RecursiveMode::NonRecursive) {
        log::error!("Failed to watch config directory: {}", ConfigError::from(e));
        return;
    }

    while let Ok(res) = bridge_rx.recv().await {
        match res {
            Ok(event) => {
                let meaningful_event = matches!(
                    event.kind,
                    EventKind::Modify(_) | EventKind::Create(_) | EventKind::Remove(_)
                );

                if meaningful_event
                    && event.paths.iter().any(|p| p == &config_path)
                    && tx.send(AppEvent::ConfigReload).await.is_err()
                {
                    break;
                }
            }
            Err(e) => log::error!("Watch error: {}", e),
        }
    }
}
