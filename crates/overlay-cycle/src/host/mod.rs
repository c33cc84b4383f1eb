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

//! Map host port.
//!
//! The scheduler never touches a map directly. It asks a [`MapHost`] to attach
//! overlays, restyle them and take them away again. The desktop app implements
//! this on top of `walkers` tile layers; [`MemoryHost`] keeps everything in
//! memory and is used by the headless driver and the tests.

use std::collections::BTreeMap;
use std::fmt;

use log::{debug, trace};
use thiserror::Error;

use crate::catalog::LayerDescriptor;

/// Opaque handle for an overlay attached to a host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OverlayId(pub u64);

impl fmt::Display for OverlayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "overlay#{}", self.0)
    }
}

/// Errors a host may report back to the scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    #[error("map host has been disposed")]
    Disposed,

    #[error("unknown overlay {0}")]
    UnknownOverlay(OverlayId),

    #[error("failed to attach layer '{name}': {reason}")]
    AttachFailed { name: String, reason: String },
}

/// Capability surface the scheduler needs from a map.
pub trait MapHost {
    /// Attach a new overlay for `layer`. New overlays start fully transparent.
    fn attach_overlay(&mut self, layer: &LayerDescriptor) -> Result<OverlayId, HostError>;

    /// Remove an overlay from the map.
    fn detach_overlay(&mut self, id: OverlayId) -> Result<(), HostError>;

    /// Set overlay opacity. `opacity` is in `0.0..=1.0`.
    fn set_opacity(&mut self, id: OverlayId, opacity: f32) -> Result<(), HostError>;
}

/// Record of a single call made against a [`MemoryHost`].
#[derive(Debug, Clone, PartialEq)]
pub enum HostCall {
    Attach { id: OverlayId, layer: String },
    Detach(OverlayId),
    SetOpacity(OverlayId, f32),
}

/// Overlay state tracked by [`MemoryHost`].
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryOverlay {
    pub layer: LayerDescriptor,
    pub opacity: f32,
}

/// In-memory host that tracks attached overlays and records every call.
#[derive(Debug, Default)]
pub struct MemoryHost {
    overlays: BTreeMap<OverlayId, MemoryOverlay>,
    calls: Vec<HostCall>,
    next_id: u64,
    disposed: bool,
    fail_attach: bool,
}

impl MemoryHost {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Currently attached overlays, in attach order.
    pub fn overlays(&self) -> impl Iterator<Item = (OverlayId, &MemoryOverlay)> {
        self.overlays.iter().map(|(id, o)| (*id, o))
    }

    #[must_use]
    pub fn overlay(&self, id: OverlayId) -> Option<&MemoryOverlay> {
        self.overlays.get(&id)
    }

    #[must_use]
    pub fn attached_count(&self) -> usize {
        self.overlays.len()
    }

    /// Opacity of the overlay showing the layer named `name`, if attached.
    #[must_use]
    pub fn opacity_of(&self, name: &str) -> Option<f32> {
        self.overlays
            .values()
            .find(|o| o.layer.name == name)
            .map(|o| o.opacity)
    }

    /// Every call made against this host so far.
    #[must_use]
    pub fn calls(&self) -> &[HostCall] {
        &self.calls
    }

    /// Mark the host as torn down; all further calls fail.
    pub fn dispose(&mut self) {
        self.disposed = true;
        self.overlays.clear();
    }

    /// Make subsequent attach calls fail (used to exercise degraded paths).
    pub fn set_fail_attach(&mut self, fail: bool) {
        self.fail_attach = fail;
    }

    fn check_alive(&self) -> Result<(), HostError> {
        if self.disposed {
            Err(HostError::Disposed)
        } else {
            Ok(())
        }
    }
}

impl MapHost for MemoryHost {
    fn attach_overlay(&mut self, layer: &LayerDescriptor) -> Result<OverlayId, HostError> {
        self.check_alive()?;
        if self.fail_attach {
            return Err(HostError::AttachFailed {
                name: layer.name.clone(),
                reason: "attach disabled".to_string(),
            });
        }

        self.next_id += 1;
        let id = OverlayId(self.next_id);
        self.overlays.insert(
            id,
            MemoryOverlay {
                layer: layer.clone(),
                opacity: 0.0,
            },
        );
        self.calls.push(HostCall::Attach {
            id,
            layer: layer.name.clone(),
        });
        debug!("Attached {} ({})", id, layer.name);
        Ok(id)
    }

    fn detach_overlay(&mut self, id: OverlayId) -> Result<(), HostError> {
        self.check_alive()?;
        let overlay = self
            .overlays
            .remove(&id)
            .ok_or(HostError::UnknownOverlay(id))?;
        self.calls.push(HostCall::Detach(id));
        debug!("Detached {} ({})", id, overlay.layer.name);
        Ok(())
    }

    fn set_opacity(&mut self, id: OverlayId, opacity: f32) -> Result<(), HostError> {
        self.check_alive()?;
        let overlay = self
            .overlays
            .get_mut(&id)
            .ok_or(HostError::UnknownOverlay(id))?;
        overlay.opacity = opacity;
        self.calls.push(HostCall::SetOpacity(id, opacity));
        trace!("{} opacity {:.3}", id, opacity);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::default_layers;

    #[test]
    fn test_attach_starts_transparent() {
        let layers = default_layers();
        let mut host = MemoryHost::new();

        let id = host.attach_overlay(&layers[0]).unwrap();
        assert_eq!(host.attached_count(), 1);
        assert_eq!(host.overlay(id).unwrap().opacity, 0.0);
    }

    #[test]
    fn test_detach_unknown_overlay() {
        let mut host = MemoryHost::new();
        let result = host.detach_overlay(OverlayId(42));
        assert_eq!(result, Err(HostError::UnknownOverlay(OverlayId(42))));
    }

    #[test]
    fn test_disposed_host_rejects_calls() {
        let layers = default_layers();
        let mut host = MemoryHost::new();
        let id = host.attach_overlay(&layers[0]).unwrap();

        host.dispose();
        assert_eq!(host.set_opacity(id, 1.0), Err(HostError::Disposed));
        assert_eq!(host.attach_overlay(&layers[1]), Err(HostError::Disposed));
        assert_eq!(host.calls().len(), 1);
    }
}
