//! A single sticky note
//!
//! A `Pad` ties a `PadRecord` to the widgets that display it. The widgets
//! are reached only through the capability traits below, so the same pad
//! logic drives a real window or the headless surfaces used by the CLI.
//!
//! Input arrives as `PadEvent`s and `SettingChange`s; every change to
//! geometry or style is written back through the `PadStore`.

pub mod group;
pub mod record;
pub mod store;
pub mod toolbar;

use std::path::Path;
use std::sync::mpsc::Receiver;
use std::time::Instant;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::color::Rgb16;
use crate::markup::MarkedText;
use crate::settings::{SettingChange, SharedSettings};
use crate::types::Geometry;

use record::PadRecord;
use store::PadStore;
use toolbar::ToolbarSurface;

/// Top-level window of a pad
pub trait PadWindow {
    fn set_visible(&mut self, visible: bool);
    fn is_visible(&self) -> bool;
    fn resize(&mut self, width: i32, height: i32);
    fn size(&self) -> (i32, i32);
    fn move_to(&mut self, x: i32, y: i32);
    fn set_sticky(&mut self, sticky: bool);
    fn set_decorated(&mut self, decorated: bool);
    fn set_title(&mut self, title: &str);
    fn set_role(&mut self, role: &str);
}

/// Text area of a pad
pub trait TextSurface {
    fn text(&self) -> MarkedText;
    fn set_text(&mut self, text: MarkedText);
    /// Selected range in character offsets, None when nothing is selected
    fn selection(&self) -> Option<(usize, usize)>;
    fn apply_style(&mut self, font: Option<&str>, text_color: Rgb16, back_color: Rgb16);
    fn set_editable(&mut self, editable: bool);
    fn set_scrollbar(&mut self, scrollbar: bool);
    /// Bottom edge of the last line, in window coordinates, border included
    fn text_bottom(&self) -> i32;
}

/// Toolbar strip of a pad
pub trait ToolbarWidget {
    fn set_visible(&mut self, visible: bool);
    fn natural_height(&self) -> i32;
}

pub struct PadWidgets {
    pub window: Box<dyn PadWindow>,
    pub text: Box<dyn TextSurface>,
    pub toolbar: Box<dyn ToolbarWidget>,
}

/// Toolbar plus text area, as seen by the toolbar controller
struct ToolbarView<'a> {
    toolbar: &'a mut dyn ToolbarWidget,
    text: &'a dyn TextSurface,
}

impl ToolbarSurface for ToolbarView<'_> {
    fn set_toolbar_visible(&mut self, visible: bool) {
        self.toolbar.set_visible(visible);
    }

    fn toolbar_natural_height(&self) -> i32 {
        self.toolbar.natural_height()
    }

    fn text_bottom(&self) -> i32 {
        self.text.text_bottom()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PadEvent {
    PointerEnter,
    PointerLeave,
    /// Window manager reports the window's current position and size
    Configure {
        x: i32,
        y: i32,
        width: i32,
        height: i32,
    },
    /// Toolbar got laid out at this height
    ToolbarAllocated(i32),
    TextChanged,
    /// Time passed; fires due timers
    Tick,
    Show,
    Close,
    Toggle,
    Delete,
    SetSticky(bool),
    SetFollowFont(bool),
    SetFollowColor(bool),
    SetFont(Option<String>),
    SetTextColor(Rgb16),
    SetBackColor(Rgb16),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PadReaction {
    None,
    /// The pad has text; the caller must ask before `delete_confirmed`
    ConfirmDelete,
    Deleted,
    Closed,
}

pub struct Pad {
    record: PadRecord,
    store: PadStore,
    settings: SharedSettings,
    changes: Receiver<SettingChange>,
    widgets: PadWidgets,
    title: String,
}

impl Pad {
    fn assemble(
        record: PadRecord,
        store: PadStore,
        settings: SharedSettings,
        widgets: PadWidgets,
    ) -> Self {
        let changes = settings.borrow_mut().subscribe();
        Self {
            record,
            store,
            settings,
            changes,
            widgets,
            title: String::new(),
        }
    }

    /// Brand-new, empty pad; nothing is written until it changes
    pub fn new(
        store: PadStore,
        settings: SharedSettings,
        widgets: PadWidgets,
        now: Instant,
    ) -> Self {
        let mut record = PadRecord::new();
        record.sticky = settings.borrow().prefs().sticky;
        let mut pad = Self::assemble(record, store, settings, widgets);
        pad.apply_window_state();
        pad.apply_style();
        pad.apply_text_prefs();
        if let Err(e) = pad.sync_toolbar_policy(now) {
            warn!(error = %e, "failed to apply toolbar settings to new pad");
        }
        pad
    }

    /// Pad restored from an info file; returns whether it starts visible
    /// A missing or corrupt info file gives a blank pad that reuses the name
    pub fn from_info(
        store: PadStore,
        settings: SharedSettings,
        widgets: PadWidgets,
        info_name: &str,
        now: Instant,
    ) -> Result<(Self, bool)> {
        let mut record = PadRecord::with_info(info_name);
        let visible = match store.load(&mut record) {
            Ok(outcome) => outcome.initially_visible,
            Err(e) if e.is_fresh_start() => {
                warn!(pad = %info_name, error = %e, "no usable saved state, starting blank");
                true
            }
            Err(e) => {
                return Err(e).context(format!("Failed to load pad info '{info_name}'"));
            }
        };

        let mut pad = Self::assemble(record, store, settings, widgets);
        let markup = match pad.store.load_content(&pad.record) {
            Ok(markup) => markup.unwrap_or_default(),
            Err(e) => {
                warn!(pad = %info_name, error = %e, "failed to read pad content");
                String::new()
            }
        };
        pad.widgets.text.set_text(MarkedText::from_markup(&markup));
        pad.sync_title();

        pad.apply_window_state();
        pad.apply_style();
        pad.apply_text_prefs();

        let policy = pad.settings.borrow().toolbar_policy();
        if policy.has_toolbar && !policy.autohide {
            // The loaded height is the toolbar-less one; place the toolbar on top
            pad.update_toolbar(|toolbar, view, height| toolbar.relayout(view, height))?;
        } else {
            pad.sync_toolbar_policy(now)?;
        }
        if let Some(role) = &pad.record.role {
            pad.widgets.window.set_role(role);
        }
        info!(pad = %info_name, visible, title = %pad.title, "restored pad");
        Ok((pad, visible))
    }

    /// New pad holding the text of an arbitrary file
    pub fn from_file(
        store: PadStore,
        settings: SharedSettings,
        widgets: PadWidgets,
        path: &Path,
        now: Instant,
    ) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Could not read file {}", path.display()))?;
        let mut pad = Self::new(store, settings, widgets, now);
        pad.widgets.text.set_text(MarkedText::plain(contents));
        pad.text_changed()?;
        Ok(pad)
    }

    pub fn record(&self) -> &PadRecord {
        &self.record
    }

    pub fn info_name(&self) -> Option<&str> {
        self.record.info_name.as_deref()
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn text(&self) -> MarkedText {
        self.widgets.text.text()
    }

    /// Currently selected text, for copying out of the pad
    pub fn selected_text(&self) -> Option<String> {
        let (start, end) = self.widgets.text.selection()?;
        let text = self.widgets.text.text().text;
        let selected: String = text
            .chars()
            .skip(start)
            .take(end.saturating_sub(start))
            .collect();
        (!selected.is_empty()).then_some(selected)
    }

    pub fn window(&self) -> &dyn PadWindow {
        self.widgets.window.as_ref()
    }

    pub fn is_visible(&self) -> bool {
        self.widgets.window.is_visible()
    }

    /// Earliest time `Tick` has work to do
    pub fn next_deadline(&self) -> Option<Instant> {
        self.record.toolbar.next_deadline()
    }

    /// Replace the pad's text, as if typed
    pub fn set_text(&mut self, text: MarkedText) -> Result<()> {
        self.widgets.text.set_text(text);
        self.text_changed()
    }

    pub fn show(&mut self) {
        self.widgets.window.set_visible(true);
    }

    pub fn hide_window(&mut self) {
        self.widgets.window.set_visible(false);
    }

    /// Hide and record the pad as closed
    pub fn close(&mut self) -> Result<()> {
        self.hide_window();
        self.save_info()
    }

    /// Write the info file, refreshing `hidden` from the live window first
    pub fn save_info(&mut self) -> Result<()> {
        self.record.hidden = !self.widgets.window.is_visible();
        let had_role = self.record.role.is_some();
        let settings = self.settings.borrow();
        self.store
            .save(&mut self.record, settings.prefs())
            .context("Failed to save pad info")?;
        drop(settings);
        if !had_role && let Some(role) = &self.record.role {
            self.widgets.window.set_role(role);
        }
        Ok(())
    }

    pub fn should_confirm_delete(&self) -> bool {
        self.settings.borrow().prefs().confirm_destroy && !self.widgets.text.text().is_blank()
    }

    /// Remove the pad's files and hide it for good
    pub fn delete_confirmed(&mut self) -> Result<()> {
        self.store
            .delete(&self.record)
            .context("Failed to remove pad files")?;
        self.hide_window();
        info!(pad = ?self.record.info_name, "deleted pad");
        Ok(())
    }

    pub fn handle_event(&mut self, event: PadEvent, now: Instant) -> Result<PadReaction> {
        debug!(pad = ?self.record.info_name, event = ?event, "pad event");
        let policy = self.settings.borrow().toolbar_policy();
        match event {
            PadEvent::PointerEnter => {
                self.update_toolbar(|toolbar, view, height| {
                    toolbar.on_pointer_enter(policy, view, height)
                })?;
            }
            PadEvent::PointerLeave => {
                self.record.toolbar.on_pointer_leave(policy, now);
            }
            PadEvent::Configure {
                x,
                y,
                width,
                height,
            } => self.configure(x, y, width, height, now)?,
            PadEvent::ToolbarAllocated(height) => {
                self.record.toolbar.set_measured_height(height);
            }
            PadEvent::TextChanged => self.text_changed()?,
            PadEvent::Tick => self.tick(now)?,
            PadEvent::Show => self.show(),
            PadEvent::Close => {
                self.close()?;
                return Ok(PadReaction::Closed);
            }
            PadEvent::Toggle => {
                if self.is_visible() {
                    self.close()?;
                    return Ok(PadReaction::Closed);
                }
                self.show();
            }
            PadEvent::Delete => {
                if self.should_confirm_delete() {
                    return Ok(PadReaction::ConfirmDelete);
                }
                self.delete_confirmed()?;
                return Ok(PadReaction::Deleted);
            }
            PadEvent::SetSticky(sticky) => {
                self.record.sticky = sticky;
                self.widgets.window.set_sticky(sticky);
                self.save_info()?;
            }
            PadEvent::SetFollowFont(follow) => {
                self.record.follow_font = follow;
                self.style_changed()?;
            }
            PadEvent::SetFollowColor(follow) => {
                self.record.follow_color = follow;
                self.style_changed()?;
            }
            PadEvent::SetFont(font) => {
                self.record.font = font;
                self.record.follow_font = false;
                self.style_changed()?;
            }
            PadEvent::SetTextColor(color) => {
                self.record.text_color = Some(color);
                self.record.follow_color = false;
                self.style_changed()?;
            }
            PadEvent::SetBackColor(color) => {
                self.record.back_color = Some(color);
                self.record.follow_color = false;
                self.style_changed()?;
            }
        }
        Ok(PadReaction::None)
    }

    /// Apply every pending settings notification
    pub fn drain_settings(&mut self, now: Instant) -> Result<()> {
        while let Ok(change) = self.changes.try_recv() {
            self.apply_setting(change, now)?;
        }
        Ok(())
    }

    pub fn apply_setting(&mut self, change: SettingChange, now: Instant) -> Result<()> {
        match change {
            SettingChange::HasToolbar(_) | SettingChange::AutohideToolbar(_) => {
                self.sync_toolbar_policy(now)?;
            }
            SettingChange::Sticky(sticky) => {
                self.record.sticky = sticky;
                self.widgets.window.set_sticky(sticky);
                if self.record.info_name.is_some() {
                    self.save_info()?;
                }
            }
            SettingChange::HasDecorations(decorated) => {
                self.widgets.window.set_decorated(decorated);
            }
            SettingChange::HasScrollbar(_) | SettingChange::EditLock(_) => {
                self.apply_text_prefs();
            }
            SettingChange::Fontname(_)
            | SettingChange::TextColor(_)
            | SettingChange::BackColor(_) => self.apply_style(),
            SettingChange::ConfirmDestroy(_) => {}
        }
        Ok(())
    }

    fn configure(&mut self, x: i32, y: i32, width: i32, height: i32, now: Instant) -> Result<()> {
        if !self.widgets.window.is_visible() {
            return Ok(());
        }
        if self.record.geometry.size() != (width, height) {
            self.record.toolbar.on_window_resized(now);
        } else {
            self.record.toolbar.on_window_moved(now);
        }
        self.record.geometry = Geometry::new(x, y, width, height);
        self.record.location_valid = true;
        self.save_info()
    }

    fn text_changed(&mut self) -> Result<()> {
        self.sync_title();
        let markup = self.widgets.text.text().to_markup();
        let had_content = self.record.content_name.is_some();
        self.store
            .save_content(&mut self.record, &markup)
            .context("Failed to save pad content")?;
        // The info file must point at a freshly allocated content file
        if !had_content {
            self.save_info()?;
        }
        Ok(())
    }

    fn tick(&mut self, now: Instant) -> Result<()> {
        self.drain_settings(now)?;
        let policy = self.settings.borrow().toolbar_policy();
        self.update_toolbar(|toolbar, view, height| toolbar.poll_timer(policy, view, height, now))
    }

    fn style_changed(&mut self) -> Result<()> {
        self.apply_style();
        self.save_info()
    }

    fn sync_toolbar_policy(&mut self, now: Instant) -> Result<()> {
        let policy = self.settings.borrow().toolbar_policy();
        self.update_toolbar(|toolbar, view, height| {
            toolbar.on_settings_changed(policy, view, height, now)
        })
    }

    /// Run a toolbar transition; if it changed the window height, resize
    /// the window and persist the new geometry
    fn update_toolbar<F>(&mut self, transition: F) -> Result<()>
    where
        F: FnOnce(&mut toolbar::ToolbarController, &mut dyn ToolbarSurface, &mut i32) -> bool,
    {
        let mut height = self.record.geometry.height;
        let mut view = ToolbarView {
            toolbar: self.widgets.toolbar.as_mut(),
            text: self.widgets.text.as_ref(),
        };
        if !transition(&mut self.record.toolbar, &mut view, &mut height) {
            return Ok(());
        }
        self.record.geometry.height = height;
        self.widgets
            .window
            .resize(self.record.geometry.width, height);
        // Hidden pads keep their baseline height on disk already
        if self.widgets.window.is_visible() {
            self.save_info()?;
        }
        Ok(())
    }

    fn sync_title(&mut self) {
        let text = self.widgets.text.text();
        if text.title() != self.title {
            self.title = text.title().to_string();
            self.widgets.window.set_title(&self.title);
        }
    }

    fn apply_window_state(&mut self) {
        let geometry = self.record.geometry;
        self.widgets.window.resize(geometry.width, geometry.height);
        if self.record.location_valid {
            self.widgets.window.move_to(geometry.x, geometry.y);
        }
        self.widgets.window.set_sticky(self.record.sticky);
        let decorated = self.settings.borrow().prefs().has_decorations;
        self.widgets.window.set_decorated(decorated);
    }

    fn apply_style(&mut self) {
        let settings = self.settings.borrow();
        let prefs = settings.prefs();
        let (text_color, back_color) = self.record.effective_colors(prefs);
        self.widgets
            .text
            .apply_style(self.record.effective_font(prefs), text_color, back_color);
    }

    fn apply_text_prefs(&mut self) {
        let settings = self.settings.borrow();
        let prefs = settings.prefs();
        self.widgets.text.set_editable(!prefs.edit_lock);
        self.widgets.text.set_scrollbar(prefs.has_scrollbar);
    }
}
