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

//! Desktop map window.
//!
//! An OpenStreetMap base layer with the crossfade scheduler's overlays drawn
//! on top. The scheduler is ticked once per egui frame and asks for repaints
//! only as often as the fade or pause needs.

use std::time::Instant;

use eframe::egui;
use log::{debug, error};
use overlay_cycle::wms::GetMapOptions;
use overlay_cycle::{Crossfade, LayerCatalog, Phase, TimerQueue};
use walkers::sources::{Attribution, OpenStreetMap};
use walkers::{lon_lat, HttpTiles, Map, MapMemory, Position, Tiles};

use crate::config::{AppConfig, Mode};
use crate::map::TileOverlayHost;

type Carousel = Crossfade<TileOverlayHost, TimerQueue>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ZoomStep {
    In,
    Out,
}

/// Apply one zoom button press; returns false at the zoom limits
fn step_zoom(memory: &mut MapMemory, step: ZoomStep) -> bool {
    let result = match step {
        ZoomStep::In => memory.zoom_in(),
        ZoomStep::Out => memory.zoom_out(),
    };
    match result {
        Ok(()) => true,
        Err(e) => {
            debug!("Zoom {step:?} ignored: {e}");
            false
        }
    }
}

/// Attributions in draw order, each provider listed once
fn unique_attributions(all: impl IntoIterator<Item = Attribution>) -> Vec<Attribution> {
    let mut unique: Vec<Attribution> = Vec::new();
    for attribution in all {
        if !unique.iter().any(|a| a.text == attribution.text) {
            unique.push(attribution);
        }
    }
    unique
}

pub struct CarouselApp {
    mode: Mode,
    base_tiles: HttpTiles,
    map_memory: MapMemory,
    center: Position,
    carousel: Carousel,
    halted: Option<String>,
}

impl CarouselApp {
    pub fn new(ctx: &egui::Context, config: &AppConfig, mode: Mode, catalog: LayerCatalog) -> Self {
        let mut map_memory = MapMemory::default();
        if let Err(e) = map_memory.set_zoom(config.default_zoom) {
            error!("Invalid default zoom {}: {:?}", config.default_zoom, e);
        }

        let options = GetMapOptions {
            version: config.wms_version.clone(),
            ..Default::default()
        };
        let host = TileOverlayHost::new(ctx.clone(), options);
        let now = Instant::now();
        let mut carousel = Crossfade::new(catalog, config.cycle_config(mode), host, TimerQueue::new(now));

        let halted = carousel.start(now).err().map(|e| {
            error!("Failed to start layer cycle: {e}");
            e.to_string()
        });

        Self {
            mode,
            base_tiles: HttpTiles::new(OpenStreetMap, ctx.clone()),
            map_memory,
            center: lon_lat(config.center_lon, config.center_lat),
            carousel,
            halted,
        }
    }

    /// Deliver due callbacks and schedule the next repaint
    fn drive(&mut self, ctx: &egui::Context) {
        let now = Instant::now();
        if let Err(e) = self.carousel.tick(now) {
            error!("Layer cycle halted: {e}");
            self.halted = Some(e.to_string());
        }

        match self.carousel.next_wakeup() {
            Some(at) if at <= now => ctx.request_repaint(),
            Some(at) => ctx.request_repaint_after(at - now),
            None => {}
        }
    }

    fn draw_header(&mut self, ui: &mut egui::Ui) {
        ui.vertical_centered(|ui| {
            ui.heading(self.mode.title());
        });

        if self.mode == Mode::Select {
            self.draw_layer_picker(ui);
        }
    }

    fn draw_layer_picker(&mut self, ui: &mut egui::Ui) {
        let current = self.carousel.fade_target();
        let mut picked = None;

        ui.horizontal(|ui| {
            ui.label("Layer:");
            egui::ComboBox::from_id_salt("wms_layer")
                .selected_text(self.carousel.catalog()[current].name.as_str())
                .show_ui(ui, |ui| {
                    for (index, layer) in self.carousel.catalog().iter().enumerate() {
                        if ui.selectable_label(index == current, layer.name.as_str()).clicked() {
                            picked = Some(index);
                        }
                    }
                });
        });

        if let Some(index) = picked {
            if let Err(e) = self.carousel.jump_to(index, Instant::now()) {
                error!("Failed to switch layer: {e}");
                self.halted = Some(e.to_string());
            }
        }
    }

    fn draw_status(&self, ui: &mut egui::Ui) {
        ui.vertical_centered(|ui| {
            ui.label(format!("Currently displaying: {}", self.carousel.displayed_name()));

            if let Some(progress) = self.carousel.progress(Instant::now()) {
                let target = &self.carousel.catalog()[self.carousel.fade_target()];
                ui.add(
                    egui::ProgressBar::new(progress)
                        .desired_width(240.0)
                        .text(format!("→ {}", target.name)),
                );
            }

            if let Some(message) = &self.halted {
                ui.label(
                    egui::RichText::new(format!("⚠ {message}"))
                        .color(egui::Color32::from_rgb(255, 150, 100))
                        .size(11.0),
                );
            } else if self.carousel.phase() == Phase::Stopped {
                ui.label("Layer cycle stopped");
            }
        });
    }

    fn draw_map(&mut self, ui: &mut egui::Ui) {
        let attributions = unique_attributions(
            std::iter::once(self.base_tiles.attribution())
                .chain(self.carousel.host_mut().overlays_mut().map(|o| o.tiles.attribution())),
        );

        let mut map = Map::new(Some(&mut self.base_tiles), &mut self.map_memory, self.center);

        for overlay in self.carousel.host_mut().overlays_mut() {
            map = map.with_layer(&mut overlay.tiles, overlay.opacity);
        }

        let rect = ui.add(map).rect;

        self.draw_zoom_controls(ui.ctx(), rect);
        Self::draw_attribution(ui.ctx(), rect, &attributions);
    }

    fn draw_zoom_controls(&mut self, ctx: &egui::Context, map_rect: egui::Rect) {
        egui::Area::new(egui::Id::new("zoom_controls"))
            .fixed_pos(map_rect.left_top() + egui::vec2(10.0, 10.0))
            .show(ctx, |ui| {
                egui::Frame::popup(ui.style()).show(ui, |ui| {
                    if ui.button(egui::RichText::new("➕").heading()).clicked() {
                        step_zoom(&mut self.map_memory, ZoomStep::In);
                    }
                    if ui.button(egui::RichText::new("➖").heading()).clicked() {
                        step_zoom(&mut self.map_memory, ZoomStep::Out);
                    }
                });
            });
    }

    // Tile providers require visible credit
    fn draw_attribution(ctx: &egui::Context, map_rect: egui::Rect, attributions: &[Attribution]) {
        egui::Area::new(egui::Id::new("map_attribution"))
            .pivot(egui::Align2::RIGHT_BOTTOM)
            .fixed_pos(map_rect.right_bottom() + egui::vec2(-10.0, -10.0))
            .show(ctx, |ui| {
                egui::Frame::popup(ui.style()).show(ui, |ui| {
                    ui.horizontal(|ui| {
                        for attribution in attributions {
                            ui.hyperlink_to(
                                egui::RichText::new(format!("© {}", attribution.text)).size(10.0),
                                attribution.url,
                            );
                        }
                    });
                });
            });
    }
}

impl eframe::App for CarouselApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drive(ctx);

        egui::TopBottomPanel::top("header").show(ctx, |ui| {
            self.draw_header(ui);
        });

        egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
            self.draw_status(ui);
        });

        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| {
                self.draw_map(ui);
            });
    }
}

impl Drop for CarouselApp {
    fn drop(&mut self) {
        // No callbacks may reach the overlays once the window is gone
        self.carousel.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::wms_source::WmsTileSource;
    use overlay_cycle::default_layers;
    use walkers::sources::TileSource;

    #[test]
    fn test_zoom_buttons_step_one_level() {
        let mut memory = MapMemory::default();
        memory.set_zoom(5.0).unwrap();

        assert!(step_zoom(&mut memory, ZoomStep::In));
        assert!((memory.zoom() - 6.0).abs() < f64::EPSILON);

        assert!(step_zoom(&mut memory, ZoomStep::Out));
        assert!(step_zoom(&mut memory, ZoomStep::Out));
        assert!((memory.zoom() - 4.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_zoom_out_stops_at_minimum() {
        let mut memory = MapMemory::default();
        memory.set_zoom(0.0).unwrap();

        assert!(!step_zoom(&mut memory, ZoomStep::Out));
        assert!(memory.zoom().abs() < f64::EPSILON);
    }

    #[test]
    fn test_attribution_lists_base_and_overlay_once() {
        let layers = default_layers();
        let overlay = |i: usize| WmsTileSource::new(layers[i].clone(), GetMapOptions::default()).attribution();

        // Mid-fade both Bhuvan overlays are attached
        let credits = unique_attributions([OpenStreetMap.attribution(), overlay(0), overlay(2)]);

        let texts: Vec<&str> = credits.iter().map(|a| a.text).collect();
        assert_eq!(texts, ["OpenStreetMap contributors", "NRSC/ISRO Bhuvan"]);
    }
}
