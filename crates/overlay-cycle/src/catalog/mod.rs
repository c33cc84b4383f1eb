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

//! Layer catalog.
//!
//! A catalog is the fixed, ordered list of WMS overlays a map cycles through.
//! A layer's identity is its position in the catalog, so two entries may point
//! at the same endpoint and layer id under different display names.

use std::ops::Index;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Bhuvan vector services host for the LULC 50K layers.
pub const BHUVAN_LULC_ENDPOINT: &str = "https://bhuvan-vec2.nrsc.gov.in/bhuvan/wms";

/// Bhuvan NUIS (urban land use) service.
pub const BHUVAN_NUIS_ENDPOINT: &str = "https://bhuvan-vec1.nrsc.gov.in/bhuvan/nuis/wms";

/// Errors raised while building a catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("layer catalog is empty")]
    EmptyCatalog,

    #[error("invalid endpoint for layer '{name}': {reason}")]
    InvalidEndpoint { name: String, reason: String },
}

/// A single WMS overlay: display name, service endpoint and layer identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerDescriptor {
    /// Human-readable name shown in the status line and dropdown.
    pub name: String,
    /// WMS service endpoint (without query string).
    pub endpoint: Url,
    /// Value sent as the `LAYERS` parameter.
    pub layer_id: String,
}

impl LayerDescriptor {
    /// Create a descriptor, parsing and validating the endpoint URL.
    pub fn new(
        name: impl Into<String>,
        endpoint: &str,
        layer_id: impl Into<String>,
    ) -> Result<Self, CatalogError> {
        let name = name.into();
        let endpoint = Url::parse(endpoint).map_err(|e| CatalogError::InvalidEndpoint {
            name: name.clone(),
            reason: e.to_string(),
        })?;
        let descriptor = Self {
            name,
            endpoint,
            layer_id: layer_id.into(),
        };
        descriptor.validate()?;
        Ok(descriptor)
    }

    /// Check that the endpoint is something a tile fetcher can request.
    pub fn validate(&self) -> Result<(), CatalogError> {
        match self.endpoint.scheme() {
            "http" | "https" => {}
            other => {
                return Err(CatalogError::InvalidEndpoint {
                    name: self.name.clone(),
                    reason: format!("unsupported scheme '{other}'"),
                })
            }
        }
        if self.endpoint.query().is_some() {
            return Err(CatalogError::InvalidEndpoint {
                name: self.name.clone(),
                reason: "endpoint must not carry a query string".to_string(),
            });
        }
        Ok(())
    }
}

/// Ordered, non-empty list of overlays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerCatalog {
    layers: Vec<LayerDescriptor>,
}

impl LayerCatalog {
    /// Build a catalog, rejecting empty lists and unusable endpoints.
    pub fn new(layers: Vec<LayerDescriptor>) -> Result<Self, CatalogError> {
        if layers.is_empty() {
            return Err(CatalogError::EmptyCatalog);
        }
        for layer in &layers {
            layer.validate()?;
        }
        Ok(Self { layers })
    }

    /// Number of layers. Never zero.
    #[must_use]
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Always `false`; provided for API symmetry with `len`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&LayerDescriptor> {
        self.layers.get(index)
    }

    /// Index following `index`, wrapping at the end.
    #[must_use]
    pub fn next_index(&self, index: usize) -> usize {
        (index + 1) % self.layers.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, LayerDescriptor> {
        self.layers.iter()
    }

    /// Position of the first layer with the given display name.
    #[must_use]
    pub fn position_by_name(&self, name: &str) -> Option<usize> {
        self.layers.iter().position(|l| l.name == name)
    }

    #[must_use]
    pub fn as_slice(&self) -> &[LayerDescriptor] {
        &self.layers
    }
}

impl Index<usize> for LayerCatalog {
    type Output = LayerDescriptor;

    fn index(&self, index: usize) -> &Self::Output {
        &self.layers[index]
    }
}

impl<'a> IntoIterator for &'a LayerCatalog {
    type Item = &'a LayerDescriptor;
    type IntoIter = std::slice::Iter<'a, LayerDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.layers.iter()
    }
}

const DEFAULT_ENTRIES: [(&str, &str, &str); 3] = [
    ("Land Use Land Cover 2005-06", BHUVAN_LULC_ENDPOINT, "lulc:BR_LULC50K_1112"),
    ("Land Use Land Cover 2011-12", BHUVAN_LULC_ENDPOINT, "lulc:BR_LULC50K_1112"),
    ("Urban Land Use: NUIS 2006-07", BHUVAN_NUIS_ENDPOINT, "urban:nuis"),
];

fn descriptors(entries: &[(&str, &str, &str)]) -> Result<Vec<LayerDescriptor>, CatalogError> {
    entries
        .iter()
        .map(|&(name, endpoint, layer)| LayerDescriptor::new(name, endpoint, layer))
        .collect()
}

/// The Bhuvan land use layers, failing on the first entry that does not parse.
pub fn try_default_layers() -> Result<Vec<LayerDescriptor>, CatalogError> {
    descriptors(&DEFAULT_ENTRIES)
}

/// The Bhuvan land use layers the carousel ships with.
///
/// # Panics
///
/// Panics if a built-in entry is malformed; `test_default_layers` keeps them valid.
#[must_use]
pub fn default_layers() -> Vec<LayerDescriptor> {
    try_default_layers().expect("built-in layer catalog must be valid")
}
