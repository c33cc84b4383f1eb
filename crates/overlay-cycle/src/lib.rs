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

//! Overlay cycling for slippy maps.
//!
//! This library schedules which WMS overlay a map shows and how it gets there.
//! It knows nothing about rendering; the map is reached through small ports
//! that any frontend can implement:
//!
//! - **Catalog**: the ordered, non-empty list of [`LayerDescriptor`]s
//! - **Host port**: [`MapHost`] attaches, restyles and detaches overlays
//! - **Scheduling port**: [`Scheduler`] hands out frame and timeout tokens;
//!   [`TimerQueue`] is a deterministic implementation for any driver
//! - **Crossfade**: [`Crossfade`] walks the catalog, ramping opacity between
//!   the outgoing and incoming overlay, pausing between transitions
//! - **WMS**: `GetMap` / `GetCapabilities` URL construction
//!
//! # Quick Start
//!
//! ```
//! use std::time::{Duration, Instant};
//! use overlay_cycle::{default_layers, Crossfade, CycleConfig, LayerCatalog, MemoryHost, TimerQueue};
//!
//! let t0 = Instant::now();
//! let catalog = LayerCatalog::new(default_layers()).unwrap();
//! let mut fade = Crossfade::new(
//!     catalog,
//!     CycleConfig::auto(Duration::from_millis(300)),
//!     MemoryHost::new(),
//!     TimerQueue::new(t0),
//! );
//!
//! fade.start(t0).unwrap();
//! fade.tick(t0 + Duration::from_millis(300)).unwrap();
//! assert_eq!(fade.displayed_name(), "Land Use Land Cover 2011-12");
//!
//! // Always stop before the host goes away.
//! fade.stop();
//! ```

pub mod catalog;
pub mod crossfade;
pub mod host;
pub mod schedule;
pub mod wms;

pub use catalog::{default_layers, try_default_layers, CatalogError, LayerCatalog, LayerDescriptor};
pub use crossfade::{Crossfade, CycleConfig, CycleError, Phase};
pub use host::{HostCall, HostError, MapHost, MemoryHost, MemoryOverlay, OverlayId};
pub use schedule::{Scheduler, TimerQueue, Token};
pub use wms::{BoundingBox, GetMapOptions};
