//! Map rendering and overlay management.
//!
//! This module provides the WMS tile source and the walkers-backed map host
//! the crossfade scheduler drives.

pub mod overlay_host;
pub mod wms_source;

pub use overlay_host::TileOverlayHost;
