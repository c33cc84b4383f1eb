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

mod app;
mod cli;
mod config;
mod endpoints;
mod headless;
mod map;

use anyhow::Context;
use clap::Parser;
use eframe::egui;
use log::{error, info};
use mimalloc::MiMalloc;
use tokio_util::sync::CancellationToken;

use crate::app::CarouselApp;
use crate::cli::Cli;
use crate::config::AppConfig;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    if cli.print_config_path {
        println!("{}", AppConfig::get_config_path()?.display());
        return Ok(());
    }

    let mut config = AppConfig::load().unwrap_or_else(|e| {
        error!("Failed to load configuration, using defaults: {e}");
        AppConfig::default()
    });
    cli.apply(&mut config);

    if cli.save_config {
        config.save().context("saving configuration")?;
        info!("Configuration saved to {}", AppConfig::get_config_path()?.display());
    }

    let catalog = config.catalog().context("invalid layer catalog")?;

    if cli.list_layers {
        if cli.json {
            println!("{}", serde_json::to_string_pretty(catalog.as_slice())?);
        } else {
            for (index, layer) in catalog.iter().enumerate() {
                println!("{index}: {} [{}] {}", layer.name, layer.layer_id, layer.endpoint);
            }
        }
        return Ok(());
    }

    if cli.check_endpoints {
        let runtime = tokio::runtime::Runtime::new()?;
        let reports = runtime.block_on(endpoints::check_endpoints(&catalog, &config.wms_version))?;
        let problems = endpoints::print_reports(&reports);
        if problems > 0 {
            anyhow::bail!("{problems} layer(s) failed the endpoint check");
        }
        return Ok(());
    }

    let mode = config.mode;
    info!("Starting WMS Carousel in {:?} mode with {} layer(s)", mode, catalog.len());

    if cli.headless {
        let runtime = tokio::runtime::Runtime::new()?;
        let cycle = config.cycle_config(mode);
        let summary = runtime.block_on(async {
            let cancel = CancellationToken::new();
            let ctrl_c = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    ctrl_c.cancel();
                }
            });
            headless::run(catalog, cycle, cancel, cli.transitions).await
        })?;
        info!(
            "Finished after {} layer change(s) on '{}'",
            summary.transitions, summary.final_layer
        );
        return Ok(());
    }

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 860.0])
            .with_title("WMS Carousel"),
        ..Default::default()
    };

    eframe::run_native(
        "WMS Carousel",
        options,
        Box::new(move |cc| Ok(Box::new(CarouselApp::new(&cc.egui_ctx, &config, mode, catalog)))),
    )
    .map_err(|e| anyhow::anyhow!("window error: {e}"))
}
