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

//! Walkers-backed map host.
//!
//! Every attached overlay is its own `HttpTiles` layer with an on-disk cache,
//! rendered over the base map with its current opacity.

use std::path::PathBuf;

use eframe::egui;
use log::{debug, info};
use overlay_cycle::wms::GetMapOptions;
use overlay_cycle::{HostError, LayerDescriptor, MapHost, OverlayId};
use walkers::{HttpOptions, HttpTiles};

use super::wms_source::WmsTileSource;

/// A WMS overlay currently on the map
pub struct TileOverlay {
    pub id: OverlayId,
    pub name: String,
    pub tiles: HttpTiles,
    pub opacity: f32,
}

impl std::fmt::Debug for TileOverlay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TileOverlay")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("opacity", &self.opacity)
            .finish_non_exhaustive()
    }
}

/// Map host holding the overlay tile layers drawn above the base map
pub struct TileOverlayHost {
    ctx: egui::Context,
    options: GetMapOptions,
    overlays: Vec<TileOverlay>,
    next_id: u64,
}

impl std::fmt::Debug for TileOverlayHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TileOverlayHost")
            .field("overlays", &self.overlays)
            .finish_non_exhaustive()
    }
}

impl TileOverlayHost {
    pub fn new(ctx: egui::Context, options: GetMapOptions) -> Self {
        Self {
            ctx,
            options,
            overlays: Vec::new(),
            next_id: 0,
        }
    }

    /// Overlays in draw order (oldest first)
    pub fn overlays_mut(&mut self) -> impl Iterator<Item = &mut TileOverlay> {
        self.overlays.iter_mut()
    }

    /// Cache directory for one layer's tiles
    fn cache_dir(layer: &LayerDescriptor) -> PathBuf {
        let host = layer.endpoint.host_str().unwrap_or("local");
        let layer_dir: String = layer
            .layer_id
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();

        dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from(".cache"))
            .join("wms-carousel")
            .join(host)
            .join(layer_dir)
    }

    fn find_mut(&mut self, id: OverlayId) -> Result<&mut TileOverlay, HostError> {
        self.overlays
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or(HostError::UnknownOverlay(id))
    }
}

impl MapHost for TileOverlayHost {
    fn attach_overlay(&mut self, layer: &LayerDescriptor) -> Result<OverlayId, HostError> {
        self.next_id += 1;
        let id = OverlayId(self.next_id);

        let http_options = HttpOptions {
            cache: Some(Self::cache_dir(layer)),
            ..Default::default()
        };
        let source = WmsTileSource::new(layer.clone(), self.options.clone());
        let tiles = HttpTiles::with_options(source, http_options, self.ctx.clone());

        self.overlays.push(TileOverlay {
            id,
            name: layer.name.clone(),
            tiles,
            opacity: 0.0,
        });
        info!("Added WMS layer '{}' ({})", layer.name, layer.layer_id);
        self.ctx.request_repaint();
        Ok(id)
    }

    fn detach_overlay(&mut self, id: OverlayId) -> Result<(), HostError> {
        let pos = self
            .overlays
            .iter()
            .position(|o| o.id == id)
            .ok_or(HostError::UnknownOverlay(id))?;
        let overlay = self.overlays.remove(pos);
        debug!("Removed WMS layer '{}'", overlay.name);
        self.ctx.request_repaint();
        Ok(())
    }

    fn set_opacity(&mut self, id: OverlayId, opacity: f32) -> Result<(), HostError> {
        self.find_mut(id)?.opacity = opacity.clamp(0.0, 1.0);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use overlay_cycle::default_layers;

    #[test]
    fn test_cache_dir_per_layer() {
        let layers = default_layers();
        let lulc = TileOverlayHost::cache_dir(&layers[0]);
        let nuis = TileOverlayHost::cache_dir(&layers[2]);

        assert!(lulc.ends_with("wms-carousel/bhuvan-vec2.nrsc.gov.in/lulc_BR_LULC50K_1112"));
        assert!(nuis.ends_with("wms-carousel/bhuvan-vec1.nrsc.gov.in/urban_nuis"));
    }

    #[test]
    fn test_unknown_overlay_rejected() {
        let mut host = TileOverlayHost::new(egui::Context::default(), GetMapOptions::default());
        assert_eq!(
            host.set_opacity(OverlayId(7), 0.5),
            Err(HostError::UnknownOverlay(OverlayId(7)))
        );
        assert_eq!(
            host.detach_overlay(OverlayId(7)),
            Err(HostError::UnknownOverlay(OverlayId(7)))
        );
    }
}
