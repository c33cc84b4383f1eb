// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Application configuration management.
//!
//! Configuration is persisted as TOML via `confy`. It holds the layer catalog,
//! the cycle timings for each mode and the initial map view. Command-line flags
//! override individual values for a single run.

use std::time::Duration;

use clap::ValueEnum;
use log::info;
use overlay_cycle::{default_layers, CatalogError, CycleConfig, LayerCatalog, LayerDescriptor};
use serde::{Deserialize, Serialize};

const APP_NAME: &str = "wms-carousel";
const CONFIG_NAME: &str = "config";

/// How the overlay changes over time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Hard swap to the next layer on a fixed interval
    Auto,
    /// Pick the layer from a dropdown
    Select,
    /// Crossfade between successive layers
    #[default]
    Crossfade,
}

impl Mode {
    /// Heading shown above the map
    pub fn title(self) -> &'static str {
        match self {
            Mode::Auto => "Auto-Switching WMS Layers",
            Mode::Select => "Select a WMS Layer",
            Mode::Crossfade => "Crossfading WMS Layers",
        }
    }
}

/// Application configuration stored in TOML format
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    /// Configuration schema version for migrations
    #[serde(default = "default_config_version")]
    pub config_version: u32,

    /// Startup mode
    #[serde(default)]
    pub mode: Mode,

    /// Crossfade ramp length in milliseconds
    #[serde(default = "default_transition_ms")]
    pub transition_ms: u64,

    /// Hold time between crossfades in milliseconds
    #[serde(default = "default_pause_ms")]
    pub pause_ms: u64,

    /// Auto mode swap interval in milliseconds
    #[serde(default = "default_auto_interval_ms")]
    pub auto_interval_ms: u64,

    /// Fade length when picking a layer from the dropdown (0 = instant)
    #[serde(default)]
    pub select_transition_ms: u64,

    /// Initial map center latitude
    #[serde(default = "default_center_lat")]
    pub center_lat: f64,

    /// Initial map center longitude
    #[serde(default = "default_center_lon")]
    pub center_lon: f64,

    /// Initial map zoom level
    #[serde(default = "default_zoom")]
    pub default_zoom: f64,

    /// WMS protocol version used for GetMap and GetCapabilities
    #[serde(default = "default_wms_version")]
    pub wms_version: String,

    /// Overlays to cycle through, in order
    #[serde(default = "default_layers")]
    pub layers: Vec<LayerDescriptor>,
}

// Default value functions for serde
fn default_config_version() -> u32 {
    1
}

fn default_transition_ms() -> u64 {
    1000
}

fn default_pause_ms() -> u64 {
    2000
}

fn default_auto_interval_ms() -> u64 {
    300
}

fn default_center_lat() -> f64 {
    20.5937
}

fn default_center_lon() -> f64 {
    78.9629
}

fn default_zoom() -> f64 {
    5.0
}

fn default_wms_version() -> String {
    "1.3.0".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            config_version: default_config_version(),
            mode: Mode::default(),
            transition_ms: default_transition_ms(),
            pause_ms: default_pause_ms(),
            auto_interval_ms: default_auto_interval_ms(),
            select_transition_ms: 0,
            center_lat: default_center_lat(),
            center_lon: default_center_lon(),
            default_zoom: default_zoom(),
            wms_version: default_wms_version(),
            layers: default_layers(),
        }
    }
}

impl AppConfig {
    /// Load configuration from disk, writing defaults on first run
    pub fn load() -> Result<Self, confy::ConfyError> {
        let config: AppConfig = confy::load(APP_NAME, CONFIG_NAME)?;
        info!(
            "Loaded configuration v{} with {} layer(s)",
            config.config_version,
            config.layers.len()
        );
        Ok(config)
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<(), confy::ConfyError> {
        confy::store(APP_NAME, CONFIG_NAME, self)
    }

    /// Get the config file path for display to user
    pub fn get_config_path() -> Result<std::path::PathBuf, confy::ConfyError> {
        confy::get_configuration_file_path(APP_NAME, CONFIG_NAME)
    }

    /// Validated layer catalog
    pub fn catalog(&self) -> Result<LayerCatalog, CatalogError> {
        LayerCatalog::new(self.layers.clone())
    }

    /// Scheduler timings for `mode`
    pub fn cycle_config(&self, mode: Mode) -> CycleConfig {
        match mode {
            Mode::Auto => CycleConfig::auto(Duration::from_millis(self.auto_interval_ms)),
            Mode::Select => CycleConfig::manual(Duration::from_millis(self.select_transition_ms)),
            Mode::Crossfade => CycleConfig::crossfade(
                Duration::from_millis(self.transition_ms),
                Duration::from_millis(self.pause_ms),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_catalog_is_valid() {
        let config = AppConfig::default();
        assert_eq!(config.catalog().unwrap().len(), 3);
    }

    #[test]
    fn test_cycle_config_per_mode() {
        let config = AppConfig::default();

        let auto = config.cycle_config(Mode::Auto);
        assert!(auto.transition.is_zero());
        assert_eq!(auto.pause, Duration::from_millis(300));

        let select = config.cycle_config(Mode::Select);
        assert!(!select.auto_advance);

        let fade = config.cycle_config(Mode::Crossfade);
        assert_eq!(fade.transition, Duration::from_millis(1000));
        assert_eq!(fade.pause, Duration::from_millis(2000));
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let config: AppConfig = serde_json::from_str(r#"{"mode":"auto"}"#).unwrap();
        assert_eq!(config.mode, Mode::Auto);
        assert_eq!(config.layers.len(), 3);
        assert!((config.center_lon - 78.9629).abs() < 1e-9);
    }

    #[test]
    fn test_empty_layer_list_rejected() {
        let config = AppConfig {
            layers: Vec::new(),
            ..Default::default()
        };
        assert!(matches!(config.catalog(), Err(CatalogError::EmptyCatalog)));
    }
}
