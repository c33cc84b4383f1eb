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

//! Command-line interface.

use clap::Parser;

use crate::config::{AppConfig, Mode};

#[derive(Debug, Parser)]
#[command(name = "wms-carousel")]
#[command(author, version, about = "Cycle WMS overlays over an OpenStreetMap base map", long_about = None)]
pub struct Cli {
    /// Overlay mode (defaults to the configured mode)
    #[arg(short, long, value_enum)]
    pub mode: Option<Mode>,

    /// Crossfade length in milliseconds
    #[arg(long)]
    pub transition_ms: Option<u64>,

    /// Pause between crossfades in milliseconds
    #[arg(long)]
    pub pause_ms: Option<u64>,

    /// Swap interval for auto mode in milliseconds
    #[arg(long)]
    pub interval_ms: Option<u64>,

    /// Run without a window, logging each layer change
    #[arg(long)]
    pub headless: bool,

    /// Stop a headless run after this many layer changes
    #[arg(long, requires = "headless")]
    pub transitions: Option<u64>,

    /// Query GetCapabilities for every endpoint and exit
    #[arg(long)]
    pub check_endpoints: bool,

    /// List configured layers and exit
    #[arg(long)]
    pub list_layers: bool,

    /// Print the layer list as JSON (with --list-layers)
    #[arg(long, requires = "list_layers")]
    pub json: bool,

    /// Print the configuration file path and exit
    #[arg(long)]
    pub print_config_path: bool,

    /// Write the effective configuration back to disk
    #[arg(long)]
    pub save_config: bool,
}

impl Cli {
    /// Apply command-line overrides on top of the loaded configuration
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(mode) = self.mode {
            config.mode = mode;
        }
        if let Some(ms) = self.transition_ms {
            config.transition_ms = ms;
        }
        if let Some(ms) = self.pause_ms {
            config.pause_ms = ms;
        }
        if let Some(ms) = self.interval_ms {
            config.auto_interval_ms = ms;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_applied() {
        let cli = Cli::parse_from(["wms-carousel", "--mode", "auto", "--interval-ms", "2000"]);
        let mut config = AppConfig::default();
        cli.apply(&mut config);

        assert_eq!(config.mode, Mode::Auto);
        assert_eq!(config.auto_interval_ms, 2000);
        assert_eq!(config.transition_ms, 1000);
    }

    #[test]
    fn test_json_requires_list() {
        assert!(Cli::try_parse_from(["wms-carousel", "--json"]).is_err());
        assert!(Cli::try_parse_from(["wms-carousel", "--list-layers", "--json"]).is_ok());
    }
}
