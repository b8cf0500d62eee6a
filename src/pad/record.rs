use crate::color::Rgb16;
use crate::pad::toolbar::ToolbarController;
use crate::settings::Preferences;
use crate::types::Geometry;

/// In-memory state of one pad, mirrored to its info and content files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PadRecord {
    /// Info file name inside the config dir, None until first save
    pub info_name: Option<String>,
    /// Content file name inside the config dir, None until first save
    pub content_name: Option<String>,
    /// Window role, equal to the info file name once assigned
    pub role: Option<String>,

    pub geometry: Geometry,
    /// False until the window manager has placed the pad
    pub location_valid: bool,

    pub sticky: bool,
    pub hidden: bool,

    pub follow_font: bool,
    pub follow_color: bool,
    /// Overrides, kept even while following so they come back when
    /// following is turned off again
    pub font: Option<String>,
    pub text_color: Option<Rgb16>,
    pub back_color: Option<Rgb16>,

    pub toolbar: ToolbarController,
}

impl Default for PadRecord {
    fn default() -> Self {
        Self {
            info_name: None,
            content_name: None,
            role: None,
            geometry: Geometry::default(),
            location_valid: false,
            sticky: false,
            hidden: false,
            follow_font: true,
            follow_color: true,
            font: None,
            text_color: None,
            back_color: None,
            toolbar: ToolbarController::default(),
        }
    }
}

impl PadRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record for an existing info file, not loaded yet
    pub fn with_info(info_name: impl Into<String>) -> Self {
        Self {
            info_name: Some(info_name.into()),
            ..Self::default()
        }
    }

    pub fn effective_font<'a>(&'a self, prefs: &'a Preferences) -> Option<&'a str> {
        if self.follow_font {
            prefs.fontname.as_deref()
        } else {
            self.font.as_deref().or(prefs.fontname.as_deref())
        }
    }

    /// (text, background)
    pub fn effective_colors(&self, prefs: &Preferences) -> (Rgb16, Rgb16) {
        if self.follow_color {
            (prefs.text_color, prefs.back_color)
        } else {
            (
                self.text_color.unwrap_or(prefs.text_color),
                self.back_color.unwrap_or(prefs.back_color),
            )
        }
    }

    /// Window height to persist: the height the pad has with its toolbar hidden
    pub fn persisted_height(&self) -> i32 {
        self.toolbar.baseline_height(self.geometry.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_following_pad_uses_global_style() {
        let prefs = Preferences {
            fontname: Some("Sans 10".to_string()),
            ..Preferences::default()
        };
        let record = PadRecord {
            font: Some("Mono 8".to_string()),
            text_color: Some(Rgb16::new(1, 2, 3)),
            ..PadRecord::default()
        };
        assert_eq!(record.effective_font(&prefs), Some("Sans 10"));
        assert_eq!(record.effective_colors(&prefs), (prefs.text_color, prefs.back_color));
    }

    #[test]
    fn test_override_used_when_not_following() {
        let prefs = Preferences::default();
        let record = PadRecord {
            follow_font: false,
            follow_color: false,
            font: Some("Mono 8".to_string()),
            text_color: Some(Rgb16::new(1, 2, 3)),
            ..PadRecord::default()
        };
        assert_eq!(record.effective_font(&prefs), Some("Mono 8"));
        // No background override stored, global one fills in
        assert_eq!(
            record.effective_colors(&prefs),
            (Rgb16::new(1, 2, 3), prefs.back_color)
        );
    }

    #[test]
    fn test_with_info_starts_unplaced() {
        let record = PadRecord::with_info("info-ABC");
        assert_eq!(record.info_name.as_deref(), Some("info-ABC"));
        assert!(!record.location_valid);
        assert!(record.follow_font && record.follow_color);
    }
}
