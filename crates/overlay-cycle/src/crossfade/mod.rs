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

//! Crossfade transition scheduler.
//!
//! Cycles a map through a [`LayerCatalog`], ramping the opacity of the
//! outgoing overlay down while the incoming overlay ramps up, then pausing
//! before the next transition.
//!
//! The scheduler owns its [`MapHost`] and [`Scheduler`] and is driven purely
//! by tokens delivered to [`Crossfade::fire`]. Each pending callback is tagged
//! with the transition generation it was issued for, so a callback that
//! arrives after `stop`, `jump_to` or a newer transition does nothing.
//!
//! ```
//! use std::time::{Duration, Instant};
//! use overlay_cycle::{default_layers, Crossfade, CycleConfig, LayerCatalog, MemoryHost, TimerQueue};
//!
//! let t0 = Instant::now();
//! let catalog = LayerCatalog::new(default_layers()).unwrap();
//! let config = CycleConfig::crossfade(Duration::from_millis(1000), Duration::from_millis(100));
//! let mut fade = Crossfade::new(catalog, config, MemoryHost::new(), TimerQueue::new(t0));
//!
//! fade.start(t0).unwrap();
//! fade.tick(t0 + Duration::from_millis(500)).unwrap();
//! assert_eq!(fade.host().attached_count(), 2);
//! ```

use std::time::{Duration, Instant};

use log::{debug, info, trace, warn};
use thiserror::Error;
use tokio::sync::watch;

use crate::catalog::{CatalogError, LayerCatalog, LayerDescriptor};
use crate::host::{HostError, MapHost, OverlayId};
use crate::schedule::{Scheduler, TimerQueue, Token};

/// Errors surfaced by the scheduler.
#[derive(Debug, Error)]
pub enum CycleError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("map host rejected request: {0}")]
    Host(#[from] HostError),

    #[error("layer index {index} out of range for catalog of {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("scheduler already started")]
    AlreadyStarted,

    #[error("scheduler not started")]
    NotStarted,

    #[error("scheduler stopped")]
    Stopped,
}

/// Timing and advance behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleConfig {
    /// Length of one opacity ramp. Zero means a hard swap.
    pub transition: Duration,
    /// Hold time on a fully faded-in layer before the next transition.
    pub pause: Duration,
    /// Advance automatically after each pause. Off for dropdown selection.
    pub auto_advance: bool,
}

impl CycleConfig {
    /// Continuous crossfade with a pause between transitions.
    #[must_use]
    pub const fn crossfade(transition: Duration, pause: Duration) -> Self {
        Self {
            transition,
            pause,
            auto_advance: true,
        }
    }

    /// Hard swap to the next layer every `interval`.
    #[must_use]
    pub const fn auto(interval: Duration) -> Self {
        Self {
            transition: Duration::ZERO,
            pause: interval,
            auto_advance: true,
        }
    }

    /// No automatic advance; layers change only through `jump_to`.
    #[must_use]
    pub const fn manual(transition: Duration) -> Self {
        Self {
            transition,
            pause: Duration::ZERO,
            auto_advance: false,
        }
    }
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self::crossfade(Duration::from_millis(1000), Duration::from_millis(2000))
    }
}

/// Where the scheduler is in its cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Nothing pending: not yet started, single-layer catalog, or manual mode.
    Idle,
    /// A frame callback is pending and opacity is being interpolated.
    Fading,
    /// A pause timer is pending.
    Paused,
    /// Stopped for good. No callback has any effect.
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PendingKind {
    Frame,
    Pause,
}

#[derive(Debug, Clone, Copy)]
struct Pending {
    token: Token,
    generation: u64,
    kind: PendingKind,
}

/// Mutable transition bookkeeping.
#[derive(Debug, Clone, Default)]
struct TransitionState {
    /// Layer that is fully faded in (or was, before the current fade began).
    current_index: usize,
    /// Layer being faded in; equal to `current_index` once settled.
    next_index: usize,
    outgoing: Option<OverlayId>,
    incoming: Option<OverlayId>,
    transition_start: Option<Instant>,
    generation: u64,
}

/// Crossfade scheduler over a map host and a scheduling port.
#[derive(Debug)]
pub struct Crossfade<H, S> {
    catalog: LayerCatalog,
    config: CycleConfig,
    host: H,
    scheduler: S,
    state: TransitionState,
    phase: Phase,
    pending: Option<Pending>,
    started: bool,
    displayed: watch::Sender<String>,
}

impl<H: MapHost, S: Scheduler> Crossfade<H, S> {
    /// Create a scheduler. Nothing touches the host until [`start`](Self::start).
    pub fn new(catalog: LayerCatalog, config: CycleConfig, host: H, scheduler: S) -> Self {
        let (displayed, _) = watch::channel(catalog[0].name.clone());
        Self {
            catalog,
            config,
            host,
            scheduler,
            state: TransitionState::default(),
            phase: Phase::Idle,
            pending: None,
            started: false,
            displayed,
        }
    }

    /// Attach the first layer at full opacity and begin the first transition.
    ///
    /// With a single-layer catalog, or in manual mode, the first layer simply
    /// stays put.
    pub fn start(&mut self, now: Instant) -> Result<(), CycleError> {
        if self.phase == Phase::Stopped {
            return Err(CycleError::Stopped);
        }
        if self.started {
            return Err(CycleError::AlreadyStarted);
        }
        self.started = true;

        let result = self.begin(now);
        self.guard(result)
    }

    /// Deliver a frame or timeout callback.
    ///
    /// Tokens that are unknown, cancelled or issued for an earlier transition
    /// are ignored.
    pub fn fire(&mut self, token: Token, now: Instant) -> Result<(), CycleError> {
        if self.phase == Phase::Stopped {
            trace!("Ignoring callback {token} after stop");
            return Ok(());
        }

        let pending = match self.pending {
            Some(p) if p.token == token && p.generation == self.state.generation => p,
            _ => {
                trace!("Ignoring stale callback {token}");
                return Ok(());
            }
        };
        self.pending = None;

        let result = match pending.kind {
            PendingKind::Frame => self.on_frame(now),
            PendingKind::Pause => {
                let target = self.catalog.next_index(self.state.next_index);
                self.advance(target, now)
            }
        };
        self.guard(result)
    }

    /// Move to `index`, cutting short any transition or pause in progress.
    ///
    /// Uses the configured transition duration, so a zero duration swaps
    /// immediately. In auto mode the normal cycle resumes from `index`.
    pub fn jump_to(&mut self, index: usize, now: Instant) -> Result<(), CycleError> {
        if self.phase == Phase::Stopped {
            return Err(CycleError::Stopped);
        }
        if !self.started {
            return Err(CycleError::NotStarted);
        }
        if index >= self.catalog.len() {
            return Err(CycleError::IndexOutOfRange {
                index,
                len: self.catalog.len(),
            });
        }
        if self.phase != Phase::Fading && self.state.current_index == index {
            return Ok(());
        }

        info!("Switching to layer '{}'", self.catalog[index].name);
        self.cancel_pending();

        let result = self.jump(index, now);
        self.guard(result)
    }

    /// Cancel pending callbacks and freeze. Overlays stay attached as they are.
    pub fn stop(&mut self) {
        if self.phase == Phase::Stopped {
            return;
        }
        self.cancel_pending();
        self.state.generation += 1;
        self.phase = Phase::Stopped;
        debug!("Crossfade stopped on '{}'", self.displayed_name());
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Index of the layer last fully faded in.
    #[must_use]
    pub fn current_index(&self) -> usize {
        self.state.current_index
    }

    /// Index of the layer currently fading in, or the settled layer.
    #[must_use]
    pub fn fade_target(&self) -> usize {
        self.state.next_index
    }

    /// Name of the layer last fully faded in.
    #[must_use]
    pub fn displayed_name(&self) -> String {
        self.displayed.borrow().clone()
    }

    /// Observe the displayed layer name.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<String> {
        self.displayed.subscribe()
    }

    /// Progress of the running transition in `0.0..1.0`.
    #[must_use]
    pub fn progress(&self, now: Instant) -> Option<f32> {
        if self.phase != Phase::Fading {
            return None;
        }
        self.state
            .transition_start
            .map(|start| ramp_progress(now.saturating_duration_since(start), self.config.transition).min(1.0))
    }

    /// Bumped on every transition and on stop; callbacks carry the value they were issued under.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.state.generation
    }

    #[must_use]
    pub fn catalog(&self) -> &LayerCatalog {
        &self.catalog
    }

    #[must_use]
    pub fn config(&self) -> CycleConfig {
        self.config
    }

    #[must_use]
    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    #[must_use]
    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut S {
        &mut self.scheduler
    }

    fn begin(&mut self, now: Instant) -> Result<(), CycleError> {
        let first = &self.catalog[0];
        let id = self.host.attach_overlay(first)?;
        self.host.set_opacity(id, 1.0)?;

        self.state.incoming = Some(id);
        self.state.current_index = 0;
        self.state.next_index = 0;
        self.publish_current();
        info!("Showing layer '{}'", first.name);

        if self.catalog.len() == 1 || !self.config.auto_advance {
            self.phase = Phase::Idle;
            return Ok(());
        }

        // A hard swap right away would skip the first layer entirely.
        if self.config.transition.is_zero() {
            self.schedule_pause();
            return Ok(());
        }

        let target = self.catalog.next_index(0);
        self.advance(target, now)
    }

    /// Swap overlay roles and start ramping towards `target`.
    fn advance(&mut self, target: usize, now: Instant) -> Result<(), CycleError> {
        if let Some(previous) = self.state.outgoing.take() {
            self.host.detach_overlay(previous)?;
        }
        self.state.outgoing = self.state.incoming.take();

        let layer: &LayerDescriptor = &self.catalog[target];
        let id = self.host.attach_overlay(layer)?;
        self.host.set_opacity(id, 0.0)?;
        self.state.incoming = Some(id);
        self.state.next_index = target;

        self.state.generation += 1;
        self.state.transition_start = Some(now);
        debug!(
            "Transition {} towards '{}' ({} ms)",
            self.state.generation,
            layer.name,
            self.config.transition.as_millis()
        );

        if self.config.transition.is_zero() {
            return self.finish();
        }

        self.request_frame();
        Ok(())
    }

    fn on_frame(&mut self, now: Instant) -> Result<(), CycleError> {
        let Some(start) = self.state.transition_start else {
            return Ok(());
        };
        let progress = ramp_progress(now.saturating_duration_since(start), self.config.transition);
        if progress >= 1.0 {
            return self.finish();
        }

        if let Some(out) = self.state.outgoing {
            self.host.set_opacity(out, 1.0 - progress)?;
        }
        if let Some(inc) = self.state.incoming {
            self.host.set_opacity(inc, progress)?;
        }
        self.request_frame();
        Ok(())
    }

    /// Settle the running transition and schedule the pause.
    fn finish(&mut self) -> Result<(), CycleError> {
        self.settle()?;

        if self.config.auto_advance && self.catalog.len() > 1 {
            self.schedule_pause();
        } else {
            self.phase = Phase::Idle;
        }
        Ok(())
    }

    /// Outgoing to 0 and detached, incoming to 1.
    fn settle(&mut self) -> Result<(), CycleError> {
        if let Some(out) = self.state.outgoing.take() {
            self.host.set_opacity(out, 0.0)?;
            self.host.detach_overlay(out)?;
        }
        if let Some(inc) = self.state.incoming {
            self.host.set_opacity(inc, 1.0)?;
        }
        self.state.transition_start = None;

        if self.state.current_index != self.state.next_index {
            self.state.current_index = self.state.next_index;
            self.publish_current();
            info!("Showing layer '{}'", self.catalog[self.state.current_index].name);
        }
        Ok(())
    }

    fn jump(&mut self, index: usize, now: Instant) -> Result<(), CycleError> {
        if self.phase == Phase::Fading {
            self.settle()?;
            self.phase = Phase::Idle;
        }
        if self.state.current_index == index {
            return self.finish();
        }
        self.advance(index, now)
    }

    fn request_frame(&mut self) {
        let token = self.scheduler.request_frame();
        self.pending = Some(Pending {
            token,
            generation: self.state.generation,
            kind: PendingKind::Frame,
        });
        self.phase = Phase::Fading;
    }

    fn schedule_pause(&mut self) {
        let token = self.scheduler.set_timeout(self.config.pause);
        self.pending = Some(Pending {
            token,
            generation: self.state.generation,
            kind: PendingKind::Pause,
        });
        self.phase = Phase::Paused;
    }

    fn cancel_pending(&mut self) {
        if let Some(pending) = self.pending.take() {
            self.scheduler.cancel(pending.token);
        }
    }

    fn publish_current(&self) {
        let name = self.catalog[self.state.current_index].name.clone();
        self.displayed.send_replace(name);
    }

    /// Host failures halt the cycle and leave overlays where they are.
    fn guard(&mut self, result: Result<(), CycleError>) -> Result<(), CycleError> {
        if let Err(e) = &result {
            warn!("Crossfade halted: {e}");
            self.stop();
        }
        result
    }
}

impl<H: MapHost> Crossfade<H, TimerQueue> {
    /// Advance the queue to `now` and deliver every due callback.
    pub fn tick(&mut self, now: Instant) -> Result<(), CycleError> {
        for token in self.scheduler.poll(now) {
            self.fire(token, now)?;
        }
        Ok(())
    }

    /// When the driver should call [`tick`](Self::tick) next.
    #[must_use]
    pub fn next_wakeup(&self) -> Option<Instant> {
        if self.phase == Phase::Stopped {
            return None;
        }
        self.scheduler.next_wakeup()
    }
}

/// Fraction of `total` covered by `elapsed`. A zero-length ramp is complete.
fn ramp_progress(elapsed: Duration, total: Duration) -> f32 {
    if total.is_zero() {
        return 1.0;
    }
    (elapsed.as_secs_f64() / total.as_secs_f64()) as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::default_layers;
    use crate::host::MemoryHost;

    const EPSILON: f32 = 1e-4;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn crossfade(config: CycleConfig, t0: Instant) -> Crossfade<MemoryHost, TimerQueue> {
        let catalog = LayerCatalog::new(default_layers()).unwrap();
        Crossfade::new(catalog, config, MemoryHost::new(), TimerQueue::new(t0))
    }

    #[test]
    fn test_ramp_progress() {
        assert!((ramp_progress(ms(250), ms(1000)) - 0.25).abs() < EPSILON);
        assert_eq!(ramp_progress(ms(5), Duration::ZERO), 1.0);
    }

    #[test]
    fn test_start_twice_rejected() {
        let t0 = Instant::now();
        let mut fade = crossfade(CycleConfig::default(), t0);
        fade.start(t0).unwrap();
        assert!(matches!(fade.start(t0), Err(CycleError::AlreadyStarted)));
    }

    #[test]
    fn test_start_begins_fading() {
        let t0 = Instant::now();
        let mut fade = crossfade(CycleConfig::default(), t0);
        fade.start(t0).unwrap();

        assert_eq!(fade.phase(), Phase::Fading);
        assert_eq!(fade.current_index(), 0);
        assert_eq!(fade.fade_target(), 1);
        assert_eq!(fade.host().opacity_of("Land Use Land Cover 2005-06"), Some(1.0));
        assert_eq!(fade.host().opacity_of("Land Use Land Cover 2011-12"), Some(0.0));
    }

    #[test]
    fn test_progress_reported_while_fading() {
        let t0 = Instant::now();
        let mut fade = crossfade(CycleConfig::crossfade(ms(1000), ms(100)), t0);
        assert_eq!(fade.progress(t0), None);

        fade.start(t0).unwrap();
        let p = fade.progress(t0 + ms(400)).unwrap();
        assert!((p - 0.4).abs() < EPSILON);
    }

    #[test]
    fn test_auto_mode_swaps_without_fading() {
        let t0 = Instant::now();
        let mut fade = crossfade(CycleConfig::auto(ms(300)), t0);
        fade.start(t0).unwrap();

        assert_eq!(fade.phase(), Phase::Paused);
        assert_eq!(fade.current_index(), 0);
        assert_eq!(fade.host().attached_count(), 1);

        fade.tick(t0 + ms(300)).unwrap();
        assert_eq!(fade.current_index(), 1);
        assert_eq!(fade.host().attached_count(), 1);
        fade.tick(t0 + ms(600)).unwrap();
        assert_eq!(fade.current_index(), 2);
        fade.tick(t0 + ms(900)).unwrap();
        assert_eq!(fade.current_index(), 0);
    }

    #[test]
    fn test_manual_mode_stays_idle() {
        let t0 = Instant::now();
        let mut fade = crossfade(CycleConfig::manual(Duration::ZERO), t0);
        fade.start(t0).unwrap();

        assert_eq!(fade.phase(), Phase::Idle);
        assert!(fade.scheduler().is_idle());

        fade.jump_to(2, t0).unwrap();
        assert_eq!(fade.current_index(), 2);
        assert_eq!(fade.phase(), Phase::Idle);
        assert_eq!(fade.host().attached_count(), 1);
        assert_eq!(fade.displayed_name(), "Urban Land Use: NUIS 2006-07");
    }

    #[test]
    fn test_jump_out_of_range() {
        let t0 = Instant::now();
        let mut fade = crossfade(CycleConfig::manual(Duration::ZERO), t0);
        fade.start(t0).unwrap();
        assert!(matches!(
            fade.jump_to(3, t0),
            Err(CycleError::IndexOutOfRange { index: 3, len: 3 })
        ));
    }

    #[test]
    fn test_jump_before_start() {
        let t0 = Instant::now();
        let mut fade = crossfade(CycleConfig::manual(Duration::ZERO), t0);
        assert!(matches!(fade.jump_to(1, t0), Err(CycleError::NotStarted)));
    }

    #[test]
    fn test_attach_failure_halts_and_keeps_previous() {
        let t0 = Instant::now();
        let mut fade = crossfade(CycleConfig::auto(ms(300)), t0);
        fade.start(t0).unwrap();
        fade.tick(t0 + ms(300)).unwrap();
        fade.host_mut().set_fail_attach(true);

        let result = fade.tick(t0 + ms(600));
        assert!(matches!(result, Err(CycleError::Host(HostError::AttachFailed { .. }))));
        assert_eq!(fade.phase(), Phase::Stopped);
        assert_eq!(fade.host().attached_count(), 1);
        assert_eq!(fade.host().opacity_of("Land Use Land Cover 2011-12"), Some(1.0));
        assert_eq!(fade.next_wakeup(), None);
    }
}
