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

//! Headless driver.
//!
//! Runs the layer cycle against an in-memory host on the tokio runtime and
//! logs every change of displayed layer. Useful for checking timings and
//! catalogs without opening a window.

use std::time::{Duration, Instant};

use log::{info, trace};
use overlay_cycle::{Crossfade, CycleConfig, LayerCatalog, MemoryHost, TimerQueue};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

/// Frame cadence while a fade is in progress (~60 Hz).
const FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// Summary of a headless run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub transitions: u64,
    pub final_layer: String,
}

/// Run the cycle until `cancel` fires or `max_transitions` layers have settled.
pub async fn run(
    catalog: LayerCatalog,
    config: CycleConfig,
    cancel: CancellationToken,
    max_transitions: Option<u64>,
) -> anyhow::Result<RunSummary> {
    let t0 = Instant::now();
    let mut carousel = Crossfade::new(catalog, config, MemoryHost::new(), TimerQueue::new(t0));
    let mut names = carousel.subscribe();
    let mut transitions = 0_u64;

    carousel.start(t0)?;
    let name = names.borrow_and_update().clone();
    info!("Currently displaying: {name}");

    loop {
        if max_transitions.is_some_and(|max| transitions >= max) {
            break;
        }

        let delay = match carousel.next_wakeup() {
            None => None,
            Some(_) if carousel.scheduler().has_pending_frame() => Some(FRAME_INTERVAL),
            Some(at) => Some(at.saturating_duration_since(Instant::now())),
        };

        tokio::select! {
            () = cancel.cancelled() => {
                info!("Shutdown requested");
                break;
            }
            () = sleep(delay.unwrap_or_default()), if delay.is_some() => {
                carousel.tick(Instant::now())?;
                if let Some(progress) = carousel.progress(Instant::now()) {
                    trace!("Fade progress {:.2}", progress);
                }
            }
        }

        if names.has_changed().unwrap_or(false) {
            // Mark the change seen even when info is filtered out
            let name = names.borrow_and_update().clone();
            transitions += 1;
            info!("Currently displaying: {name}");
        }
    }

    carousel.stop();
    Ok(RunSummary {
        transitions,
        final_layer: carousel.displayed_name(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use overlay_cycle::default_layers;

    #[tokio::test]
    async fn test_runs_requested_transitions() {
        let catalog = LayerCatalog::new(default_layers()).unwrap();
        let config = CycleConfig::crossfade(Duration::from_millis(40), Duration::from_millis(10));

        let summary = run(catalog, config, CancellationToken::new(), Some(3))
            .await
            .unwrap();

        assert_eq!(summary.transitions, 3);
        assert_eq!(summary.final_layer, "Land Use Land Cover 2005-06");
    }

    #[tokio::test]
    async fn test_first_transition_waits_for_fade() {
        let catalog = LayerCatalog::new(default_layers()).unwrap();
        let config = CycleConfig::crossfade(Duration::from_millis(60), Duration::from_millis(10));

        let started = Instant::now();
        let summary = run(catalog, config, CancellationToken::new(), Some(1))
            .await
            .unwrap();

        assert_eq!(summary.transitions, 1);
        assert_eq!(summary.final_layer, "Land Use Land Cover 2011-12");
        assert!(started.elapsed() >= Duration::from_millis(60));
    }

    #[tokio::test]
    async fn test_cancel_stops_idle_run() {
        let catalog = LayerCatalog::new(default_layers()).unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let summary = run(catalog, CycleConfig::manual(Duration::ZERO), cancel, None)
            .await
            .unwrap();

        assert_eq!(summary.transitions, 0);
        assert_eq!(summary.final_layer, "Land Use Land Cover 2005-06");
    }
}
