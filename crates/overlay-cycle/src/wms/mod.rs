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

//! WMS request construction.
//!
//! Slippy maps fetch square tiles, so each tile becomes a `GetMap` request for
//! exactly that tile's Web Mercator extent.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::catalog::LayerDescriptor;

/// Half the width of the EPSG:3857 world, in meters.
pub const WEB_MERCATOR_EXTENT: f64 = 20_037_508.342_789_244;

/// Default tile edge in pixels.
pub const TILE_SIZE: u32 = 256;

/// Axis-aligned extent in projected coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    /// EPSG:3857 extent of slippy tile `x`/`y` at `zoom`.
    #[must_use]
    pub fn for_tile(x: u32, y: u32, zoom: u8) -> Self {
        let tiles = f64::from(1_u32 << zoom.min(31));
        let span = 2.0 * WEB_MERCATOR_EXTENT / tiles;

        let min_x = -WEB_MERCATOR_EXTENT + f64::from(x) * span;
        let max_y = WEB_MERCATOR_EXTENT - f64::from(y) * span;

        Self {
            min_x,
            min_y: max_y - span,
            max_x: min_x + span,
            max_y,
        }
    }

    /// `minx,miny,maxx,maxy` as WMS 1.3.0 expects for EPSG:3857.
    #[must_use]
    pub fn to_param(&self) -> String {
        format!("{},{},{},{}", self.min_x, self.min_y, self.max_x, self.max_y)
    }
}

/// Fixed `GetMap` parameters shared by every tile request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetMapOptions {
    pub version: String,
    pub format: String,
    pub transparent: bool,
    pub crs: String,
    pub styles: String,
    pub tile_size: u32,
}

impl Default for GetMapOptions {
    fn default() -> Self {
        Self {
            version: "1.3.0".to_string(),
            format: "image/png".to_string(),
            transparent: true,
            crs: "EPSG:3857".to_string(),
            styles: String::new(),
            tile_size: TILE_SIZE,
        }
    }
}

/// Build the `GetMap` URL for one tile of `layer`.
#[must_use]
pub fn get_map_url(layer: &LayerDescriptor, bbox: &BoundingBox, options: &GetMapOptions) -> Url {
    let mut url = layer.endpoint.clone();
    let size = options.tile_size.to_string();
    // WMS 1.1.x names the projection parameter SRS
    let crs_key = if options.version.starts_with("1.1") { "SRS" } else { "CRS" };

    url.query_pairs_mut()
        .append_pair("SERVICE", "WMS")
        .append_pair("VERSION", &options.version)
        .append_pair("REQUEST", "GetMap")
        .append_pair("LAYERS", &layer.layer_id)
        .append_pair("STYLES", &options.styles)
        .append_pair(crs_key, &options.crs)
        .append_pair("BBOX", &bbox.to_param())
        .append_pair("WIDTH", &size)
        .append_pair("HEIGHT", &size)
        .append_pair("FORMAT", &options.format)
        .append_pair("TRANSPARENT", if options.transparent { "TRUE" } else { "FALSE" });
    url
}

/// Build the `GetCapabilities` URL for a service endpoint.
#[must_use]
pub fn get_capabilities_url(endpoint: &Url, version: &str) -> Url {
    let mut url = endpoint.clone();
    url.query_pairs_mut()
        .append_pair("SERVICE", "WMS")
        .append_pair("VERSION", version)
        .append_pair("REQUEST", "GetCapabilities");
    url
}

/// Whether a capabilities document advertises `layer_id`.
///
/// A plain text scan for `<Name>layer_id</Name>`; good enough to catch typos
/// in configured layer names without pulling in an XML parser.
#[must_use]
pub fn capabilities_lists_layer(document: &str, layer_id: &str) -> bool {
    let needle = format!("<Name>{layer_id}</Name>");
    document.contains(&needle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::default_layers;

    fn param(url: &Url, key: &str) -> Option<String> {
        url.query_pairs()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    }

    #[test]
    fn test_world_tile_covers_extent() {
        let bbox = BoundingBox::for_tile(0, 0, 0);
        assert!((bbox.min_x + WEB_MERCATOR_EXTENT).abs() < 1e-6);
        assert!((bbox.max_y - WEB_MERCATOR_EXTENT).abs() < 1e-6);
        assert!((bbox.max_x - WEB_MERCATOR_EXTENT).abs() < 1e-6);
        assert!((bbox.min_y + WEB_MERCATOR_EXTENT).abs() < 1e-6);
    }

    #[test]
    fn test_zoom_one_quadrant() {
        // Top-right quadrant at zoom 1
        let bbox = BoundingBox::for_tile(1, 0, 1);
        assert!(bbox.min_x.abs() < 1e-6);
        assert!(bbox.min_y.abs() < 1e-6);
        assert!((bbox.max_x - WEB_MERCATOR_EXTENT).abs() < 1e-6);
    }

    #[test]
    fn test_get_map_url_parameters() {
        let layers = default_layers();
        let bbox = BoundingBox::for_tile(22, 14, 5);
        let url = get_map_url(&layers[2], &bbox, &GetMapOptions::default());

        assert_eq!(url.host_str(), Some("bhuvan-vec1.nrsc.gov.in"));
        assert_eq!(url.path(), "/bhuvan/nuis/wms");
        assert_eq!(param(&url, "REQUEST").as_deref(), Some("GetMap"));
        assert_eq!(param(&url, "LAYERS").as_deref(), Some("urban:nuis"));
        assert_eq!(param(&url, "CRS").as_deref(), Some("EPSG:3857"));
        assert_eq!(param(&url, "WIDTH").as_deref(), Some("256"));
        assert_eq!(param(&url, "BBOX"), Some(bbox.to_param()));
    }

    #[test]
    fn test_legacy_version_uses_srs() {
        let layers = default_layers();
        let options = GetMapOptions {
            version: "1.1.1".to_string(),
            ..Default::default()
        };
        let url = get_map_url(&layers[0], &BoundingBox::for_tile(0, 0, 0), &options);
        assert_eq!(param(&url, "SRS").as_deref(), Some("EPSG:3857"));
        assert_eq!(param(&url, "CRS"), None);
    }

    #[test]
    fn test_capabilities_scan() {
        let doc = "<Layer><Name>urban:nuis</Name><Title>NUIS</Title></Layer>";
        assert!(capabilities_lists_layer(doc, "urban:nuis"));
        assert!(!capabilities_lists_layer(doc, "lulc:BR_LULC50K_1112"));
    }

    #[test]
    fn test_capabilities_url() {
        let layers = default_layers();
        let url = get_capabilities_url(&layers[0].endpoint, "1.3.0");
        assert_eq!(param(&url, "REQUEST").as_deref(), Some("GetCapabilities"));
    }
}
