//! Toolbar visibility for a single pad
//!
//! The toolbar sits at the bottom of the pad. When it is shown and the
//! text already reaches the bottom edge, the pad grows by the toolbar
//! height (`Expanded`) so no text is covered; otherwise it is drawn over
//! the empty area (`Overlay`). Hiding undoes the growth.
//!
//! With autohide on, leaving the pad arms a one-shot timer; re-entering
//! before it fires cancels it. Timers are plain deadlines polled by the
//! event loop, so firing and cancelling never race.

use std::time::{Duration, Instant};

use tracing::debug;

use crate::constants::toolbar::AUTOHIDE_DELAY;

/// Toolbar-related preferences, snapshotted from settings per event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolbarPolicy {
    pub has_toolbar: bool,
    pub autohide: bool,
}

impl ToolbarPolicy {
    fn autohides(&self) -> bool {
        self.has_toolbar && self.autohide
    }
}

/// What the controller needs from the pad's widgets
pub trait ToolbarSurface {
    fn set_toolbar_visible(&mut self, visible: bool);

    /// Height the toolbar asks for when shown
    fn toolbar_natural_height(&self) -> i32;

    /// Bottom edge of the last line of text, in window coordinates,
    /// including the text view border
    fn text_bottom(&self) -> i32;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ToolbarMode {
    #[default]
    Hidden,
    /// Shown on top of the text area, window size unchanged
    Overlay,
    /// Shown below the text, window grown by the toolbar height
    Expanded,
}

/// One-shot, cancelable hide timer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HideTimer {
    delay: Duration,
    deadline: Option<Instant>,
}

impl Default for HideTimer {
    fn default() -> Self {
        Self::new(AUTOHIDE_DELAY)
    }
}

impl HideTimer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    pub fn arm(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Disarm and report true if the deadline has passed
    fn take_due(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolbarController {
    mode: ToolbarMode,
    /// Toolbar height, 0 until first measured
    measured_height: i32,
    /// Window resized by someone else since the toolbar was last shown
    pad_resized: bool,
    pointer_inside: bool,
    hide_timer: HideTimer,
}

impl Default for ToolbarController {
    fn default() -> Self {
        Self::new(AUTOHIDE_DELAY)
    }
}

impl ToolbarController {
    pub fn new(delay: Duration) -> Self {
        Self {
            mode: ToolbarMode::Hidden,
            measured_height: 0,
            pad_resized: true,
            pointer_inside: false,
            hide_timer: HideTimer::new(delay),
        }
    }

    pub fn mode(&self) -> ToolbarMode {
        self.mode
    }

    pub fn is_visible(&self) -> bool {
        self.mode != ToolbarMode::Hidden
    }

    pub fn is_expanded(&self) -> bool {
        self.mode == ToolbarMode::Expanded
    }

    pub fn measured_height(&self) -> i32 {
        self.measured_height
    }

    pub fn pad_resized(&self) -> bool {
        self.pad_resized
    }

    pub fn timer_armed(&self) -> bool {
        self.hide_timer.is_armed()
    }

    /// When the event loop next needs to call `poll_timer`
    pub fn next_deadline(&self) -> Option<Instant> {
        self.hide_timer.deadline()
    }

    /// Window height with the toolbar's growth taken back out
    pub fn baseline_height(&self, height: i32) -> i32 {
        if self.is_expanded() {
            height - self.measured_height
        } else {
            height
        }
    }

    /// Toolbar got a new allocation from the layout
    pub fn set_measured_height(&mut self, height: i32) {
        self.measured_height = height;
    }

    fn text_and_toolbar_height(&self, surface: &dyn ToolbarSurface) -> i32 {
        surface.text_bottom() + self.measured_height
    }

    /// Show the toolbar, growing `height` if it would cover text
    /// Returns true when `height` changed
    pub fn show(&mut self, surface: &mut dyn ToolbarSurface, height: &mut i32) -> bool {
        if self.is_visible() {
            return false;
        }
        surface.set_toolbar_visible(true);
        if self.measured_height == 0 {
            self.measured_height = surface.toolbar_natural_height();
        }

        let grew = if self.text_and_toolbar_height(surface) > *height {
            self.mode = ToolbarMode::Expanded;
            *height += self.measured_height;
            true
        } else {
            self.mode = ToolbarMode::Overlay;
            false
        };
        self.pad_resized = false;
        debug!(mode = ?self.mode, height = *height, toolbar = self.measured_height, "toolbar shown");
        grew
    }

    /// Hide the toolbar, shrinking `height` if it had grown for it or a
    /// resize since showing left the toolbar covering text
    /// Returns true when `height` changed
    pub fn hide(&mut self, surface: &mut dyn ToolbarSurface, height: &mut i32) -> bool {
        if !self.is_visible() {
            return false;
        }
        surface.set_toolbar_visible(false);

        let shrink = self.is_expanded()
            || (self.pad_resized && self.text_and_toolbar_height(surface) >= *height);
        self.mode = ToolbarMode::Hidden;
        if shrink {
            *height -= self.measured_height;
        }
        debug!(shrink, height = *height, "toolbar hidden");
        shrink
    }

    /// Re-measure and re-place the toolbar at the current window height
    pub fn relayout(&mut self, surface: &mut dyn ToolbarSurface, height: &mut i32) -> bool {
        let before = *height;
        self.hide(surface, height);
        self.measured_height = 0;
        self.show(surface, height);
        *height != before
    }

    pub fn on_settings_changed(
        &mut self,
        policy: ToolbarPolicy,
        surface: &mut dyn ToolbarSurface,
        height: &mut i32,
        now: Instant,
    ) -> bool {
        if !policy.has_toolbar {
            self.hide_timer.cancel();
            return self.hide(surface, height);
        }
        if !policy.autohide {
            self.hide_timer.cancel();
            return self.show(surface, height);
        }
        if !self.pointer_inside && !self.hide_timer.is_armed() {
            self.hide_timer.arm(now);
        }
        false
    }

    pub fn on_pointer_enter(
        &mut self,
        policy: ToolbarPolicy,
        surface: &mut dyn ToolbarSurface,
        height: &mut i32,
    ) -> bool {
        self.pointer_inside = true;
        if !policy.autohides() {
            return false;
        }
        self.hide_timer.cancel();
        self.show(surface, height)
    }

    pub fn on_pointer_leave(&mut self, policy: ToolbarPolicy, now: Instant) {
        self.pointer_inside = false;
        if policy.autohides() && !self.hide_timer.is_armed() {
            self.hide_timer.arm(now);
        }
    }

    /// Window size changed by the user or window manager
    pub fn on_window_resized(&mut self, now: Instant) {
        self.pad_resized = true;
        self.on_window_moved(now);
    }

    /// Hiding mid-move confuses window managers, so push a pending hide back
    pub fn on_window_moved(&mut self, now: Instant) {
        if self.hide_timer.is_armed() {
            self.hide_timer.arm(now);
        }
    }

    /// Fire the hide timer if due; settings are re-checked at fire time
    pub fn poll_timer(
        &mut self,
        policy: ToolbarPolicy,
        surface: &mut dyn ToolbarSurface,
        height: &mut i32,
        now: Instant,
    ) -> bool {
        if !self.hide_timer.take_due(now) || !policy.autohides() {
            return false;
        }
        self.hide(surface, height)
    }
}
