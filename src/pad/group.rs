//! All pads of one session
//!
//! The group owns the pads, builds their widgets through a factory and
//! decides when closing a pad ends the session.

use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::pad::store::PadStore;
use crate::pad::{Pad, PadEvent, PadReaction, PadWidgets};
use crate::settings::SharedSettings;

pub type WidgetFactory = Box<dyn Fn() -> PadWidgets>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseOutcome {
    Closed,
    /// Last visible pad closed with nothing else on screen
    Quit,
}

/// Result of routing an event through the group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Handled(PadReaction),
    Quit,
}

pub struct PadGroup {
    store: PadStore,
    settings: SharedSettings,
    factory: WidgetFactory,
    pads: Vec<Pad>,
    /// No tray integration exists, so this stays false
    tray_open: bool,
}

impl PadGroup {
    pub fn new(store: PadStore, settings: SharedSettings, factory: WidgetFactory) -> Self {
        Self {
            store,
            settings,
            factory,
            pads: Vec::new(),
            tray_open: false,
        }
    }

    /// Restore every saved pad, showing the ones that were visible
    pub fn load_all(
        store: PadStore,
        settings: SharedSettings,
        factory: WidgetFactory,
        now: Instant,
    ) -> Result<Self> {
        let mut group = Self::new(store, settings, factory);
        let names = group
            .store
            .list_info_files()
            .context("Failed to list saved pads")?;

        for name in names {
            let widgets = (group.factory)();
            match Pad::from_info(
                group.store.clone(),
                group.settings.clone(),
                widgets,
                &name,
                now,
            ) {
                Ok((mut pad, visible)) => {
                    if visible {
                        pad.show();
                    }
                    group.pads.push(pad);
                }
                Err(e) => warn!(pad = %name, error = %e, "skipping pad that failed to load"),
            }
        }
        info!(
            total = group.pads.len(),
            visible = group.num_visible(),
            "loaded pads"
        );
        Ok(group)
    }

    pub fn len(&self) -> usize {
        self.pads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pads.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Pad> {
        self.pads.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Pad> {
        self.pads.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Pad> {
        self.pads.get_mut(index)
    }

    pub fn find_by_info(&self, info_name: &str) -> Option<usize> {
        self.pads
            .iter()
            .position(|pad| pad.info_name() == Some(info_name))
    }

    pub fn num_visible(&self) -> usize {
        self.pads.iter().filter(|pad| pad.is_visible()).count()
    }

    /// Create a new shown pad and return its index
    pub fn spawn(&mut self, now: Instant) -> usize {
        let widgets = (self.factory)();
        let mut pad = Pad::new(self.store.clone(), self.settings.clone(), widgets, now);
        pad.show();
        self.add(pad)
    }

    /// Create a new shown pad from a text file and return its index
    pub fn import(&mut self, path: &Path, now: Instant) -> Result<usize> {
        let widgets = (self.factory)();
        let mut pad = Pad::from_file(self.store.clone(), self.settings.clone(), widgets, path, now)?;
        pad.show();
        pad.save_info()?;
        info!(pad = ?pad.info_name(), file = %path.display(), "imported pad");
        Ok(self.add(pad))
    }

    pub fn add(&mut self, pad: Pad) -> usize {
        self.pads.push(pad);
        self.pads.len() - 1
    }

    pub fn remove(&mut self, index: usize) -> Option<Pad> {
        (index < self.pads.len()).then(|| self.pads.remove(index))
    }

    fn pad_mut(&mut self, index: usize) -> Result<&mut Pad> {
        let len = self.pads.len();
        self.pads
            .get_mut(index)
            .with_context(|| format!("No pad at index {index} (have {len})"))
    }

    /// Nothing left on screen and nowhere to bring pads back from
    fn session_over(&self) -> bool {
        !self.tray_open && self.num_visible() == 0
    }

    /// Hide a pad; closing the last visible one ends the session and
    /// leaves it recorded as shown so it comes back next time
    pub fn close(&mut self, index: usize) -> Result<CloseOutcome> {
        let pad = self.pad_mut(index)?;
        if !pad.is_visible() {
            return Ok(CloseOutcome::Closed);
        }
        pad.hide_window();
        if self.session_over() {
            info!(pad = ?self.pads[index].info_name(), "last visible pad closed");
            return Ok(CloseOutcome::Quit);
        }
        self.pads[index].save_info()?;
        Ok(CloseOutcome::Closed)
    }

    /// Route an event to one pad, applying group policy for closes and deletes
    pub fn dispatch(&mut self, index: usize, event: PadEvent, now: Instant) -> Result<Dispatch> {
        let pad = self.pad_mut(index)?;
        let closing = match event {
            PadEvent::Close => true,
            PadEvent::Toggle => pad.is_visible(),
            _ => false,
        };
        if closing {
            return Ok(match self.close(index)? {
                CloseOutcome::Closed => Dispatch::Handled(PadReaction::Closed),
                CloseOutcome::Quit => Dispatch::Quit,
            });
        }

        let reaction = pad.handle_event(event, now)?;
        if reaction == PadReaction::Deleted {
            self.pads.remove(index);
            if self.session_over() {
                return Ok(Dispatch::Quit);
            }
        }
        Ok(Dispatch::Handled(reaction))
    }

    /// Remove a pad whose deletion the user confirmed
    pub fn delete_confirmed(&mut self, index: usize) -> Result<Dispatch> {
        self.pad_mut(index)?.delete_confirmed()?;
        self.pads.remove(index);
        if self.session_over() {
            return Ok(Dispatch::Quit);
        }
        Ok(Dispatch::Handled(PadReaction::Deleted))
    }

    /// Fire due timers and pending settings changes on every pad
    pub fn tick(&mut self, now: Instant) {
        for pad in &mut self.pads {
            if let Err(e) = pad.handle_event(PadEvent::Tick, now) {
                warn!(pad = ?pad.info_name(), error = %e, "pad tick failed");
            }
        }
    }

    /// Earliest deadline across all pads
    pub fn next_deadline(&self) -> Option<Instant> {
        let next = self.pads.iter().filter_map(Pad::next_deadline).min();
        debug!(next = ?next, "next group deadline");
        next
    }
}
