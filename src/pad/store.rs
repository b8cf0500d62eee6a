//! Pad persistence: info and content files of each pad
//!
//! An info file holds the pad's geometry, flags and style; a content
//! file holds its marked-up text. Both are created lazily on first save
//! and named `info-XXXXXX` / `content-XXXXXX` inside the config directory.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::color::Rgb16;
use crate::constants::config::{APP_DIR, LEGACY_DIR};
use crate::constants::files::{CONTENT_PREFIX, INFO_PREFIX};
use crate::fio::{Field, Fio, FioError, Value, Values, is_plain_name};
use crate::pad::record::PadRecord;
use crate::settings::Preferences;
use crate::types::Geometry;

#[derive(Debug, Error)]
pub enum StoreError {
    /// No saved state, normal for a brand-new pad
    #[error("no saved state in '{name}'")]
    NotFound { name: String },

    #[error("corrupt pad file '{name}' at line {line}: {reason}")]
    Parse {
        name: String,
        line: usize,
        reason: String,
    },

    #[error(transparent)]
    Io(FioError),
}

impl StoreError {
    /// Errors after which a pad should simply start out blank
    pub fn is_fresh_start(&self) -> bool {
        matches!(self, StoreError::NotFound { .. } | StoreError::Parse { .. })
    }
}

impl From<FioError> for StoreError {
    fn from(err: FioError) -> Self {
        match err {
            FioError::NotFound { name } => StoreError::NotFound { name },
            FioError::Parse { name, line, reason } => StoreError::Parse { name, line, reason },
            other @ (FioError::InvalidName { .. } | FioError::Io { .. }) => StoreError::Io(other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOutcome {
    pub initially_visible: bool,
}

const INFO_FIELDS: &[Field] = &[
    Field::int("width"),
    Field::int("height"),
    Field::int("x"),
    Field::int("y"),
    // Obsolete, no longer written
    Field::bool("locked"),
    Field::bool("follow_font"),
    Field::bool("follow_color"),
    Field::bool("sticky"),
    Field::bool("hidden"),
    Field::channel("back_red"),
    Field::channel("back_green"),
    Field::channel("back_blue"),
    Field::channel("text_red"),
    Field::channel("text_green"),
    Field::channel("text_blue"),
    Field::str("fontname"),
    Field::str("content"),
];

/// Fully parsed info file, applied to a record only once complete
#[derive(Debug)]
struct InfoRecord {
    geometry: Geometry,
    follow_font: bool,
    follow_color: bool,
    sticky: bool,
    hidden: bool,
    back_color: Option<Rgb16>,
    text_color: Option<Rgb16>,
    font: Option<String>,
    content: Option<String>,
}

fn color_from(values: &Values, prefix: &str) -> Option<Rgb16> {
    Some(Rgb16::new(
        values.channel(&format!("{prefix}_red"))?,
        values.channel(&format!("{prefix}_green"))?,
        values.channel(&format!("{prefix}_blue"))?,
    ))
}

impl InfoRecord {
    fn from_values(values: &Values, defaults: &PadRecord) -> Self {
        let geometry = Geometry::new(
            values.int("x").unwrap_or(defaults.geometry.x),
            values.int("y").unwrap_or(defaults.geometry.y),
            values.int("width").unwrap_or(defaults.geometry.width),
            values.int("height").unwrap_or(defaults.geometry.height),
        );
        let mut follow_font = values.bool("follow_font").unwrap_or(true);
        let mut follow_color = values.bool("follow_color").unwrap_or(true);
        // Pre-2.0 files only had a combined flag; it wins over the split ones
        if values.bool("locked").unwrap_or(false) {
            follow_font = false;
            follow_color = false;
        }

        Self {
            geometry,
            follow_font,
            follow_color,
            sticky: values.bool("sticky").unwrap_or(false),
            hidden: values.bool("hidden").unwrap_or(false),
            back_color: color_from(values, "back"),
            text_color: color_from(values, "text"),
            font: values
                .str("fontname")
                .filter(|f| !f.is_empty())
                .map(str::to_string),
            content: values
                .str("content")
                .filter(|c| !c.is_empty())
                .map(str::to_string),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PadStore {
    fio: Fio,
    /// `<home>/.xpad/content-`, the prefix of absolute content paths
    /// written by old releases
    legacy_content_prefix: Option<String>,
}

impl PadStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self::with_legacy_home(dir, dirs::home_dir().as_deref())
    }

    pub fn with_legacy_home(dir: impl Into<PathBuf>, home: Option<&Path>) -> Self {
        let legacy_content_prefix = home.map(|home| {
            home.join(LEGACY_DIR)
                .join(CONTENT_PREFIX)
                .to_string_lossy()
                .into_owned()
        });
        Self {
            fio: Fio::new(dir),
            legacy_content_prefix,
        }
    }

    pub fn default_dir() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(APP_DIR);
        path
    }

    pub fn dir(&self) -> &Path {
        self.fio.dir()
    }

    /// Rewrite `<home>/.xpad/content-N` to `content-N`
    fn migrate_content_name(&self, content: String) -> String {
        match &self.legacy_content_prefix {
            Some(prefix) if content.starts_with(prefix.as_str()) => {
                let migrated = Path::new(&content)
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_else(|| content.clone());
                info!(old = %content, new = %migrated, "migrating legacy content path");
                migrated
            }
            _ => content,
        }
    }

    /// Read the record's info file into it
    /// On any error the record is left untouched
    pub fn load(&self, record: &mut PadRecord) -> Result<LoadOutcome, StoreError> {
        let name = record.info_name.clone().ok_or_else(|| StoreError::NotFound {
            name: "<unsaved pad>".to_string(),
        })?;
        let values = self.fio.get_values(&name, INFO_FIELDS)?;
        let info = InfoRecord::from_values(&values, record);
        let content_name = info.content.map(|c| self.migrate_content_name(c));
        if let Some(content) = &content_name
            && !is_plain_name(content)
        {
            return Err(StoreError::Parse {
                name,
                line: values.line("content").unwrap_or(0),
                reason: format!("content file '{content}' is outside the pad directory"),
            });
        }

        record.geometry = info.geometry;
        record.location_valid = true;
        record.follow_font = info.follow_font;
        record.follow_color = info.follow_color;
        record.sticky = info.sticky;
        record.hidden = info.hidden;
        record.back_color = info.back_color;
        record.text_color = info.text_color;
        record.font = info.font;
        record.content_name = content_name;
        record.role = Some(name.clone());

        debug!(pad = %name, geometry = ?record.geometry, hidden = record.hidden, "loaded pad info");
        Ok(LoadOutcome {
            initially_visible: !record.hidden,
        })
    }

    /// Write the record's info file, allocating file names on first save
    /// Names are only assigned to the record once the write succeeded
    pub fn save(&self, record: &mut PadRecord, prefs: &Preferences) -> Result<(), StoreError> {
        let mut fresh = Vec::new();
        let result = self.save_inner(record, prefs, &mut fresh);
        if result.is_err() {
            for name in &fresh {
                if let Err(e) = self.fio.remove_file(name) {
                    warn!(file = %name, error = %e, "failed to clean up unused pad file");
                }
            }
        }
        result
    }

    fn save_inner(
        &self,
        record: &mut PadRecord,
        prefs: &Preferences,
        fresh: &mut Vec<String>,
    ) -> Result<(), StoreError> {
        let info_name = match &record.info_name {
            Some(name) => name.clone(),
            None => {
                let name = self.fio.unique_name(INFO_PREFIX)?;
                fresh.push(name.clone());
                name
            }
        };
        let content_name = match &record.content_name {
            Some(name) => name.clone(),
            None => {
                let name = self.fio.unique_name(CONTENT_PREFIX)?;
                fresh.push(name.clone());
                name
            }
        };

        let back = record.back_color.unwrap_or(prefs.back_color);
        let text = record.text_color.unwrap_or(prefs.text_color);
        let font = record
            .font
            .as_deref()
            .or(prefs.fontname.as_deref())
            .unwrap_or("");
        let geometry = record.geometry;

        self.fio.set_values(
            &info_name,
            &[
                ("width", Value::Int(geometry.width)),
                ("height", Value::Int(record.persisted_height())),
                ("x", Value::Int(geometry.x)),
                ("y", Value::Int(geometry.y)),
                ("follow_font", Value::Bool(record.follow_font)),
                ("follow_color", Value::Bool(record.follow_color)),
                ("sticky", Value::Bool(record.sticky)),
                ("hidden", Value::Bool(record.hidden)),
                ("back_red", Value::Channel(back.red)),
                ("back_green", Value::Channel(back.green)),
                ("back_blue", Value::Channel(back.blue)),
                ("text_red", Value::Channel(text.red)),
                ("text_green", Value::Channel(text.green)),
                ("text_blue", Value::Channel(text.blue)),
                ("fontname", Value::Str(font.to_string())),
                ("content", Value::Str(content_name.clone())),
            ],
        )?;

        if record.info_name.is_none() {
            info!(pad = %info_name, "created pad info file");
            record.role = Some(info_name.clone());
        }
        record.info_name = Some(info_name);
        record.content_name = Some(content_name);
        Ok(())
    }

    /// Write the pad's marked-up text, allocating the content file if needed
    pub fn save_content(&self, record: &mut PadRecord, markup: &str) -> Result<(), StoreError> {
        let (name, fresh) = match &record.content_name {
            Some(name) => (name.clone(), false),
            None => (self.fio.unique_name(CONTENT_PREFIX)?, true),
        };
        if let Err(e) = self.fio.set_file(&name, markup) {
            if fresh {
                if let Err(e) = self.fio.remove_file(&name) {
                    warn!(file = %name, error = %e, "failed to clean up unused content file");
                }
            }
            return Err(e.into());
        }
        record.content_name = Some(name);
        Ok(())
    }

    /// Marked-up text of the pad, None if it has no content file yet
    pub fn load_content(&self, record: &PadRecord) -> Result<Option<String>, StoreError> {
        match &record.content_name {
            Some(name) => Ok(self.fio.get_file(name)?),
            None => Ok(None),
        }
    }

    /// Remove both backing files; already-missing files are fine
    pub fn delete(&self, record: &PadRecord) -> Result<(), StoreError> {
        for name in [&record.info_name, &record.content_name].into_iter().flatten() {
            self.fio.remove_file(name)?;
            debug!(file = %name, "removed pad file");
        }
        Ok(())
    }

    /// Info files of all saved pads
    pub fn list_info_files(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.fio.list(INFO_PREFIX)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::fs;
    use tempfile::{tempdir, TempDir};

    use crate::pad::toolbar::ToolbarSurface;

    fn store() -> (TempDir, PadStore) {
        let dir = tempdir().unwrap();
        let store = PadStore::with_legacy_home(dir.path().join("xpad"), Some(Path::new("/home/tester")));
        (dir, store)
    }

    fn styled_record() -> PadRecord {
        PadRecord {
            geometry: Geometry::new(40, 60, 220, 180),
            location_valid: true,
            sticky: true,
            follow_font: false,
            follow_color: false,
            font: Some("Serif Italic 11".to_string()),
            text_color: Some(Rgb16::new(100, 200, 300)),
            back_color: Some(Rgb16::new(65535, 60000, 0)),
            ..PadRecord::default()
        }
    }

    #[test]
    fn test_save_then_load_round_trip() {
        let (_dir, store) = store();
        let prefs = Preferences::default();
        let mut original = styled_record();
        store.save(&mut original, &prefs).unwrap();

        let mut loaded = PadRecord::with_info(original.info_name.clone().unwrap());
        let outcome = store.load(&mut loaded).unwrap();

        assert!(outcome.initially_visible);
        assert_eq!(loaded.geometry, original.geometry);
        assert_eq!(loaded.sticky, original.sticky);
        assert_eq!(loaded.follow_font, original.follow_font);
        assert_eq!(loaded.follow_color, original.follow_color);
        assert_eq!(loaded.font, original.font);
        assert_eq!(loaded.text_color, original.text_color);
        assert_eq!(loaded.back_color, original.back_color);
        assert_eq!(loaded.content_name, original.content_name);
        assert!(loaded.location_valid);
    }

    #[test]
    fn test_hidden_flag_round_trips() {
        let (_dir, store) = store();
        let mut record = PadRecord {
            hidden: true,
            ..PadRecord::default()
        };
        store.save(&mut record, &Preferences::default()).unwrap();

        let mut loaded = PadRecord::with_info(record.info_name.clone().unwrap());
        assert!(!store.load(&mut loaded).unwrap().initially_visible);
    }

    #[test]
    fn test_save_twice_is_byte_identical() {
        let (_dir, store) = store();
        let prefs = Preferences::default();
        let mut record = styled_record();
        store.save(&mut record, &prefs).unwrap();
        let path = store.dir().join(record.info_name.as_deref().unwrap());
        let first = fs::read(&path).unwrap();

        store.save(&mut record, &prefs).unwrap();
        assert_eq!(fs::read(&path).unwrap(), first);
    }

    #[test]
    fn test_first_save_allocates_names_and_role() {
        let (_dir, store) = store();
        let mut record = PadRecord::new();
        store.save(&mut record, &Preferences::default()).unwrap();

        let info = record.info_name.clone().unwrap();
        let content = record.content_name.clone().unwrap();
        assert!(info.starts_with("info-"));
        assert!(content.starts_with("content-"));
        assert_eq!(record.role.as_deref(), Some(info.as_str()));
        assert_eq!(store.list_info_files().unwrap(), vec![info.clone()]);

        // Names stay fixed afterwards
        store.save(&mut record, &Preferences::default()).unwrap();
        assert_eq!(record.info_name.as_deref(), Some(info.as_str()));
        assert_eq!(record.content_name.as_deref(), Some(content.as_str()));
    }

    #[test]
    fn test_names_unique_across_pads() {
        let (_dir, store) = store();
        let mut names = HashSet::new();
        for _ in 0..20 {
            let mut record = PadRecord::new();
            store.save(&mut record, &Preferences::default()).unwrap();
            assert!(names.insert(record.info_name.unwrap()));
            assert!(names.insert(record.content_name.unwrap()));
        }
    }

    #[test]
    fn test_failed_allocation_leaves_record_unchanged() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("file-not-dir");
        fs::write(&blocker, "").unwrap();
        let store = PadStore::with_legacy_home(&blocker, None);

        let mut record = PadRecord::new();
        let before = record.clone();
        let err = store.save(&mut record, &Preferences::default()).unwrap_err();
        assert!(matches!(err, StoreError::Io(_)));
        assert!(!err.is_fresh_start());
        assert_eq!(record, before);
    }

    #[test]
    fn test_failed_content_write_keeps_previous_name() {
        let (_dir, store) = store();
        let mut record = PadRecord {
            content_name: Some("content-fixed".to_string()),
            ..PadRecord::default()
        };
        fs::create_dir_all(store.dir()).unwrap();
        // A directory on the temp file's path makes the write fail
        fs::create_dir(store.dir().join(".content-fixed.tmp")).unwrap();

        let err = store.save_content(&mut record, "text").unwrap_err();
        assert!(matches!(err, StoreError::Io(_)));
        assert_eq!(record.content_name.as_deref(), Some("content-fixed"));
    }

    #[test]
    fn test_expanded_toolbar_height_not_persisted() {
        struct Tall;
        impl ToolbarSurface for Tall {
            fn set_toolbar_visible(&mut self, _: bool) {}
            fn toolbar_natural_height(&self) -> i32 {
                25
            }
            fn text_bottom(&self) -> i32 {
                190
            }
        }

        let (_dir, store) = store();
        let mut record = PadRecord::new();
        record.geometry.height = 200;
        let mut height = record.geometry.height;
        record.toolbar.show(&mut Tall, &mut height);
        record.geometry.height = height;
        assert_eq!(record.geometry.height, 225);

        store.save(&mut record, &Preferences::default()).unwrap();
        let mut loaded = PadRecord::with_info(record.info_name.clone().unwrap());
        store.load(&mut loaded).unwrap();
        assert_eq!(loaded.geometry.height, 200);
    }

    #[test]
    fn test_missing_info_is_not_found() {
        let (_dir, store) = store();
        let mut record = PadRecord::with_info("info-gone");
        let before = record.clone();
        let err = store.load(&mut record).unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
        assert!(err.is_fresh_start());
        assert_eq!(record, before);

        let mut unsaved = PadRecord::new();
        assert!(matches!(store.load(&mut unsaved), Err(StoreError::NotFound { .. })));
    }

    #[test]
    fn test_malformed_info_leaves_record_untouched() {
        let (_dir, store) = store();
        fs::create_dir_all(store.dir()).unwrap();
        fs::write(store.dir().join("info-bad"), "width 300\nheight tall\n").unwrap();

        let mut record = PadRecord::with_info("info-bad");
        let before = record.clone();
        let err = store.load(&mut record).unwrap_err();
        assert!(matches!(err, StoreError::Parse { line: 2, .. }));
        assert!(err.is_fresh_start());
        assert_eq!(record, before);
    }

    #[test]
    fn test_locked_forces_both_follow_flags_off() {
        let (_dir, store) = store();
        fs::create_dir_all(store.dir()).unwrap();
        fs::write(
            store.dir().join("info-old"),
            "follow_font 1\nlocked 1\nfollow_color 1\nfontname Sans 9\n",
        )
        .unwrap();

        let mut record = PadRecord::with_info("info-old");
        store.load(&mut record).unwrap();
        assert!(!record.follow_font);
        assert!(!record.follow_color);
        assert_eq!(record.font.as_deref(), Some("Sans 9"));
    }

    #[test]
    fn test_legacy_content_path_is_made_relative() {
        let (_dir, store) = store();
        fs::create_dir_all(store.dir()).unwrap();
        fs::write(
            store.dir().join("info-legacy"),
            "content /home/tester/.xpad/content-42\n",
        )
        .unwrap();
        fs::write(store.dir().join("info-new"), "content content-42\n").unwrap();
        fs::write(
            store.dir().join("info-elsewhere"),
            "content /srv/notes/content-42\n",
        )
        .unwrap();

        let mut legacy = PadRecord::with_info("info-legacy");
        store.load(&mut legacy).unwrap();
        assert_eq!(legacy.content_name.as_deref(), Some("content-42"));
        // Not written back until the next save
        let on_disk = fs::read_to_string(store.dir().join("info-legacy")).unwrap();
        assert!(on_disk.contains("/home/tester/.xpad/content-42"));

        let mut relative = PadRecord::with_info("info-new");
        store.load(&mut relative).unwrap();
        assert_eq!(relative.content_name.as_deref(), Some("content-42"));

        let mut other = PadRecord::with_info("info-elsewhere");
        match store.load(&mut other).unwrap_err() {
            StoreError::Parse { line, .. } => assert_eq!(line, 1),
            e => panic!("expected parse error, got {e:?}"),
        }
        assert_eq!(other.content_name, None);
    }

    #[test]
    fn test_content_outside_directory_is_rejected() {
        let (dir, store) = store();
        fs::create_dir_all(store.dir()).unwrap();
        let victim = dir.path().join("victim.txt");
        fs::write(&victim, "keep me").unwrap();
        fs::write(
            store.dir().join("info-escape"),
            "width 300\nsticky 1\ncontent ../victim.txt\n",
        )
        .unwrap();

        let mut record = PadRecord::with_info("info-escape");
        let err = store.load(&mut record).unwrap_err();
        assert!(err.is_fresh_start());
        match err {
            StoreError::Parse { line, .. } => assert_eq!(line, 3),
            e => panic!("expected parse error, got {e:?}"),
        }
        // Left untouched
        assert_eq!(record.content_name, None);
        assert!(!record.sticky);

        // A blank pad reusing the name never reaches the outside file
        store.save_content(&mut record, "new text").unwrap();
        store.save(&mut record, &Preferences::default()).unwrap();
        store.delete(&record).unwrap();
        assert_eq!(fs::read_to_string(&victim).unwrap(), "keep me");
    }

    #[test]
    fn test_invalid_utf8_info_is_fresh_start() {
        let (_dir, store) = store();
        fs::create_dir_all(store.dir()).unwrap();
        fs::write(store.dir().join("info-binary"), b"width 10\n\xc3\x28\n").unwrap();

        let mut record = PadRecord::with_info("info-binary");
        let err = store.load(&mut record).unwrap_err();
        assert!(err.is_fresh_start());
        assert!(matches!(err, StoreError::Parse { line: 2, .. }));
        assert_eq!(record.geometry, PadRecord::with_info("info-binary").geometry);
    }

    #[test]
    fn test_overrides_persist_while_following() {
        let (_dir, store) = store();
        let mut record = styled_record();
        record.follow_font = true;
        record.follow_color = true;
        store.save(&mut record, &Preferences::default()).unwrap();

        let mut loaded = PadRecord::with_info(record.info_name.clone().unwrap());
        store.load(&mut loaded).unwrap();
        assert!(loaded.follow_font);
        assert_eq!(loaded.font, record.font);
        assert_eq!(loaded.back_color, record.back_color);
    }

    #[test]
    fn test_content_save_load_and_delete() {
        let (_dir, store) = store();
        let mut record = PadRecord::new();
        assert_eq!(store.load_content(&record).unwrap(), None);

        store.save_content(&mut record, "<b>hi</b>").unwrap();
        assert!(record.content_name.as_deref().unwrap().starts_with("content-"));
        assert!(record.info_name.is_none());
        assert_eq!(store.load_content(&record).unwrap().as_deref(), Some("<b>hi</b>"));

        store.save(&mut record, &Preferences::default()).unwrap();
        store.delete(&record).unwrap();
        assert!(store.list_info_files().unwrap().is_empty());
        assert_eq!(store.load_content(&record).unwrap(), None);
        // Second delete is a no-op
        store.delete(&record).unwrap();
    }
}
