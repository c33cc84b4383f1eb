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

//! WMS endpoint checks.
//!
//! Fetches `GetCapabilities` once per distinct service endpoint and verifies
//! that every configured layer is advertised.

use std::collections::BTreeMap;
use std::time::Duration;

use log::{info, warn};
use overlay_cycle::wms::{capabilities_lists_layer, get_capabilities_url};
use overlay_cycle::LayerCatalog;
use reqwest::Url;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Outcome for one catalog entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayerStatus {
    Available,
    NotAdvertised,
    Unreachable(String),
}

#[derive(Debug, Clone)]
pub struct LayerReport {
    pub name: String,
    pub layer_id: String,
    pub status: LayerStatus,
}

/// Check every layer in `catalog` against its service's capabilities
pub async fn check_endpoints(catalog: &LayerCatalog, version: &str) -> anyhow::Result<Vec<LayerReport>> {
    let client = reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .user_agent(concat!("wms-carousel/", env!("CARGO_PKG_VERSION")))
        .build()?;

    let mut documents: BTreeMap<Url, Result<String, String>> = BTreeMap::new();
    for layer in catalog {
        if documents.contains_key(&layer.endpoint) {
            continue;
        }
        let url = get_capabilities_url(&layer.endpoint, version);
        info!("Fetching capabilities: {}", url);
        let document = fetch(&client, url).await;
        if let Err(e) = &document {
            warn!("Capabilities request to {} failed: {}", layer.endpoint, e);
        }
        documents.insert(layer.endpoint.clone(), document);
    }

    Ok(catalog
        .iter()
        .map(|layer| {
            let status = match documents.get(&layer.endpoint) {
                Some(Ok(doc)) => classify(doc, &layer.layer_id),
                Some(Err(e)) => LayerStatus::Unreachable(e.clone()),
                None => LayerStatus::Unreachable("not requested".to_string()),
            };
            LayerReport {
                name: layer.name.clone(),
                layer_id: layer.layer_id.clone(),
                status,
            }
        })
        .collect())
}

async fn fetch(client: &reqwest::Client, url: Url) -> Result<String, String> {
    let response = client.get(url).send().await.map_err(|e| e.to_string())?;
    let status = response.status();
    if !status.is_success() {
        return Err(format!("HTTP {status}"));
    }
    response.text().await.map_err(|e| e.to_string())
}

fn classify(document: &str, layer_id: &str) -> LayerStatus {
    if capabilities_lists_layer(document, layer_id) {
        LayerStatus::Available
    } else {
        LayerStatus::NotAdvertised
    }
}

/// Print reports as an aligned table; returns the number of problem layers
pub fn print_reports(reports: &[LayerReport]) -> usize {
    let width = reports.iter().map(|r| r.name.len()).max().unwrap_or(0);
    let mut problems = 0;

    for report in reports {
        let status = match &report.status {
            LayerStatus::Available => "ok".to_string(),
            LayerStatus::NotAdvertised => {
                problems += 1;
                "layer not advertised".to_string()
            }
            LayerStatus::Unreachable(e) => {
                problems += 1;
                format!("unreachable ({e})")
            }
        };
        println!("{:<width$}  {:<24}  {}", report.name, report.layer_id, status);
    }

    problems
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        let doc = "<Capability><Layer><Name>lulc:BR_LULC50K_1112</Name></Layer></Capability>";
        assert_eq!(classify(doc, "lulc:BR_LULC50K_1112"), LayerStatus::Available);
        assert_eq!(classify(doc, "urban:nuis"), LayerStatus::NotAdvertised);
    }

    #[test]
    fn test_print_reports_counts_problems() {
        let reports = vec![
            LayerReport {
                name: "A".to_string(),
                layer_id: "a".to_string(),
                status: LayerStatus::Available,
            },
            LayerReport {
                name: "B".to_string(),
                layer_id: "b".to_string(),
                status: LayerStatus::Unreachable("HTTP 503".to_string()),
            },
        ];
        assert_eq!(print_reports(&reports), 1);
    }
}
