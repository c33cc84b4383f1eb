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

//! WMS tile source implementation.

use overlay_cycle::wms::{get_map_url, BoundingBox, GetMapOptions};
use overlay_cycle::LayerDescriptor;
use walkers::sources::{Attribution, TileSource};
use walkers::TileId;

/// Tile source that turns every slippy tile into a WMS `GetMap` request
pub struct WmsTileSource {
    layer: LayerDescriptor,
    options: GetMapOptions,
}

impl WmsTileSource {
    /// Create a new WMS tile source for the given layer
    pub fn new(layer: LayerDescriptor, options: GetMapOptions) -> Self {
        Self { layer, options }
    }
}

impl TileSource for WmsTileSource {
    fn tile_url(&self, tile_id: TileId) -> String {
        let bbox = BoundingBox::for_tile(tile_id.x, tile_id.y, tile_id.zoom);
        get_map_url(&self.layer, &bbox, &self.options).into()
    }

    fn attribution(&self) -> Attribution {
        let is_bhuvan = self
            .layer
            .endpoint
            .host_str()
            .is_some_and(|host| host.ends_with("nrsc.gov.in"));

        if is_bhuvan {
            Attribution {
                text: "NRSC/ISRO Bhuvan",
                url: "https://bhuvan.nrsc.gov.in/",
                logo_light: None,
                logo_dark: None,
            }
        } else {
            Attribution {
                text: "WMS overlay",
                url: "https://www.ogc.org/standard/wms/",
                logo_light: None,
                logo_dark: None,
            }
        }
    }

    fn tile_size(&self) -> u32 {
        self.options.tile_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use overlay_cycle::default_layers;

    #[test]
    fn test_tile_url_targets_layer() {
        let layers = default_layers();
        let source = WmsTileSource::new(layers[0].clone(), GetMapOptions::default());

        let url = source.tile_url(TileId { x: 22, y: 14, zoom: 5 });
        assert!(url.starts_with("https://bhuvan-vec2.nrsc.gov.in/bhuvan/wms?"));
        assert!(url.contains("REQUEST=GetMap"));
        assert!(url.contains("LAYERS=lulc%3ABR_LULC50K_1112"));
    }

    #[test]
    fn test_bhuvan_attribution() {
        let layers = default_layers();
        let source = WmsTileSource::new(layers[2].clone(), GetMapOptions::default());
        assert_eq!(source.attribution().url, "https://bhuvan.nrsc.gov.in/");
    }

    #[test]
    fn test_generic_attribution_for_other_servers() {
        let layer = LayerDescriptor::new("Demo", "https://ows.example.org/wms", "demo:layer").unwrap();
        let source = WmsTileSource::new(layer, GetMapOptions::default());
        assert_eq!(source.attribution().text, "WMS overlay");
    }
}
