//! Recurring interaction timers: edge auto-scroll and press-and-hold zoom.
//!
//! Both are plain state machines. The host owns the actual interval
//! (`setInterval`, a tokio ticker, ...) and starts or stops it on the
//! returned `TimerCommand`; each tick calls back in here.

use iiif_core::config::AutoScrollConfig;
use iiif_core::viewport::CoordEngine;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerCommand {
    Start { interval_ms: u32 },
    Stop,
    Keep,
}

// ─── Auto-scroll ─────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct AutoScroller {
    config: AutoScrollConfig,
    direction: (i8, i8),
    running: bool,
}

impl AutoScroller {
    pub fn new(config: AutoScrollConfig) -> Self {
        Self {
            config,
            direction: (0, 0),
            running: false,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn direction(&self) -> (i8, i8) {
        self.direction
    }

    /// Pointer moved during an interaction (client coordinates).
    pub fn pointer_moved(&mut self, engine: &CoordEngine, client_x: f64, client_y: f64) -> TimerCommand {
        self.direction = engine.edge_direction(client_x, client_y, self.config.margin);
        match (self.direction != (0, 0), self.running) {
            (true, false) => {
                self.running = true;
                TimerCommand::Start {
                    interval_ms: self.config.interval_ms,
                }
            }
            (false, true) => self.stop(),
            _ => TimerCommand::Keep,
        }
    }

    /// One interval elapsed. Returns `Stop` once scrolling hit the bounds.
    pub fn tick(&mut self, engine: &mut CoordEngine) -> TimerCommand {
        if !self.running {
            return TimerCommand::Stop;
        }
        let dx = f64::from(self.direction.0) * self.config.speed;
        let dy = f64::from(self.direction.1) * self.config.speed;
        if engine.scroll_by(dx, dy) {
            TimerCommand::Keep
        } else {
            self.stop()
        }
    }

    /// Pointer left, interaction ended, or teardown.
    pub fn stop(&mut self) -> TimerCommand {
        self.running = false;
        self.direction = (0, 0);
        TimerCommand::Stop
    }
}

// ─── Zoom repeat ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoomDirection {
    In,
    Out,
}

#[derive(Debug, Clone)]
pub struct ZoomRepeat {
    interval_ms: u32,
    held: Option<ZoomDirection>,
}

impl ZoomRepeat {
    pub fn new(interval_ms: u32) -> Self {
        Self {
            interval_ms,
            held: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.held.is_some()
    }

    /// Button pressed: zoom one step now, then repeat while held.
    pub fn press(&mut self, direction: ZoomDirection, engine: &mut CoordEngine) -> TimerCommand {
        if !step(direction, engine) {
            return TimerCommand::Keep;
        }
        self.held = Some(direction);
        TimerCommand::Start {
            interval_ms: self.interval_ms,
        }
    }

    pub fn tick(&mut self, engine: &mut CoordEngine) -> TimerCommand {
        match self.held {
            Some(direction) if step(direction, engine) => TimerCommand::Keep,
            _ => self.release(),
        }
    }

    /// Button released or pointer left the button.
    pub fn release(&mut self) -> TimerCommand {
        self.held = None;
        TimerCommand::Stop
    }
}

/// Apply one zoom step. `false` when already at the bound.
fn step(direction: ZoomDirection, engine: &mut CoordEngine) -> bool {
    match direction {
        ZoomDirection::In if engine.can_zoom_in() => {
            engine.zoom_in();
            true
        }
        ZoomDirection::Out if engine.can_zoom_out() => {
            engine.zoom_out();
            true
        }
        _ => false,
    }
}
