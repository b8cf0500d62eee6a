//! Application-wide constants
//!
//! Magic numbers and string literals used throughout the application,
//! grouped by the concern they belong to.

/// Configuration directory layout
pub mod config {
    /// Directory under the XDG config dir holding pad files and settings
    pub const APP_DIR: &str = "xpad";

    /// Settings file name inside `APP_DIR`
    pub const SETTINGS_FILENAME: &str = "settings.json";

    /// Pre-XDG directory under $HOME that older releases wrote to
    pub const LEGACY_DIR: &str = ".xpad";
}

/// Pad file naming
pub mod files {
    /// Prefix of per-pad metadata files
    pub const INFO_PREFIX: &str = "info-";

    /// Prefix of per-pad text content files
    pub const CONTENT_PREFIX: &str = "content-";

    /// How many suffixes `fio::unique_name` tries before giving up
    pub const UNIQUE_NAME_ATTEMPTS: u32 = 64;
}

/// Toolbar behavior
pub mod toolbar {
    use std::time::Duration;

    /// Delay between the pointer leaving a pad and its toolbar hiding
    pub const AUTOHIDE_DELAY: Duration = Duration::from_millis(1000);
}

/// Pad defaults for a pad that has never been placed
pub mod pad {
    pub const DEFAULT_WIDTH: i32 = 200;
    pub const DEFAULT_HEIGHT: i32 = 200;
}

/// Metrics of the headless widgets used outside a display
pub mod surface {
    pub const LINE_HEIGHT: i32 = 16;

    /// Text view border, counted once above the first line
    pub const TEXT_BORDER: i32 = 4;

    pub const TOOLBAR_HEIGHT: i32 = 28;
}
