//! Widgets without a display
//!
//! The CLI drives pads through these. They keep whatever state a real
//! toolkit would and lay text out as fixed-height lines.

use crate::color::Rgb16;
use crate::constants::surface::{LINE_HEIGHT, TEXT_BORDER, TOOLBAR_HEIGHT};
use crate::markup::MarkedText;
use crate::pad::{PadWidgets, PadWindow, TextSurface, ToolbarWidget};

#[derive(Debug, Default)]
pub struct HeadlessWindow {
    pub visible: bool,
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    pub sticky: bool,
    pub decorated: bool,
    pub title: String,
    pub role: Option<String>,
}

impl PadWindow for HeadlessWindow {
    fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    fn is_visible(&self) -> bool {
        self.visible
    }

    fn resize(&mut self, width: i32, height: i32) {
        self.width = width;
        self.height = height;
    }

    fn size(&self) -> (i32, i32) {
        (self.width, self.height)
    }

    fn move_to(&mut self, x: i32, y: i32) {
        self.x = x;
        self.y = y;
    }

    fn set_sticky(&mut self, sticky: bool) {
        self.sticky = sticky;
    }

    fn set_decorated(&mut self, decorated: bool) {
        self.decorated = decorated;
    }

    fn set_title(&mut self, title: &str) {
        self.title = title.to_string();
    }

    fn set_role(&mut self, role: &str) {
        self.role = Some(role.to_string());
    }
}

#[derive(Debug)]
pub struct HeadlessText {
    pub text: MarkedText,
    pub selection: Option<(usize, usize)>,
    pub font: Option<String>,
    pub text_color: Rgb16,
    pub back_color: Rgb16,
    pub editable: bool,
    pub scrollbar: bool,
}

impl Default for HeadlessText {
    fn default() -> Self {
        Self {
            text: MarkedText::default(),
            selection: None,
            font: None,
            text_color: Rgb16::default(),
            back_color: Rgb16::default(),
            editable: true,
            scrollbar: false,
        }
    }
}

impl TextSurface for HeadlessText {
    fn text(&self) -> MarkedText {
        self.text.clone()
    }

    fn set_text(&mut self, text: MarkedText) {
        self.text = text;
        self.selection = None;
    }

    fn selection(&self) -> Option<(usize, usize)> {
        self.selection
    }

    fn apply_style(&mut self, font: Option<&str>, text_color: Rgb16, back_color: Rgb16) {
        self.font = font.map(str::to_string);
        self.text_color = text_color;
        self.back_color = back_color;
    }

    fn set_editable(&mut self, editable: bool) {
        self.editable = editable;
    }

    fn set_scrollbar(&mut self, scrollbar: bool) {
        self.scrollbar = scrollbar;
    }

    fn text_bottom(&self) -> i32 {
        // An empty buffer still shows one line
        let lines = self.text.text.split('\n').count().max(1);
        TEXT_BORDER + LINE_HEIGHT * i32::try_from(lines).unwrap_or(i32::MAX / LINE_HEIGHT)
    }
}

#[derive(Debug, Default)]
pub struct HeadlessToolbar {
    pub visible: bool,
}

impl ToolbarWidget for HeadlessToolbar {
    fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    fn natural_height(&self) -> i32 {
        TOOLBAR_HEIGHT
    }
}

impl PadWidgets {
    pub fn headless() -> Self {
        Self {
            window: Box::new(HeadlessWindow::default()),
            text: Box::new(HeadlessText::default()),
            toolbar: Box::new(HeadlessToolbar::default()),
        }
    }
}
