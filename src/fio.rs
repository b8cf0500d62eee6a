//! Flat key/value file I/O for pad info and content files
//!
//! Every file lives directly in one directory (normally `~/.config/xpad`)
//! and is addressed by its bare file name. Info files hold one field per
//! line as `<key> <value>`; content files are opaque strings.
//!
//! All writes go through a temp file in the same directory followed by a
//! rename, so a failed write never clobbers the previous version.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use thiserror::Error;
use tracing::{debug, warn};

use crate::constants::files::UNIQUE_NAME_ATTEMPTS;

#[derive(Debug, Error)]
pub enum FioError {
    #[error("file '{name}' does not exist")]
    NotFound { name: String },

    #[error("malformed line {line} in '{name}': {reason}")]
    Parse {
        name: String,
        line: usize,
        reason: String,
    },

    /// Not a bare file name inside the directory
    #[error("'{name}' is not a file name inside the pad directory")]
    InvalidName { name: String },

    #[error("I/O error on '{name}': {source}")]
    Io {
        name: String,
        #[source]
        source: io::Error,
    },
}

impl FioError {
    fn io(name: &str, source: io::Error) -> Self {
        FioError::Io {
            name: name.to_string(),
            source,
        }
    }
}

/// Type tag of an info file field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// `i|` signed integer
    Int,
    /// `b|` boolean
    Bool,
    /// `h|` 16-bit color channel
    Channel,
    /// `s|` string
    Str,
}

/// A typed field of an info file, e.g. `Field::int("width")`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub kind: FieldKind,
    pub key: &'static str,
}

impl Field {
    pub const fn int(key: &'static str) -> Self {
        Self { kind: FieldKind::Int, key }
    }

    pub const fn bool(key: &'static str) -> Self {
        Self { kind: FieldKind::Bool, key }
    }

    pub const fn channel(key: &'static str) -> Self {
        Self { kind: FieldKind::Channel, key }
    }

    pub const fn str(key: &'static str) -> Self {
        Self { kind: FieldKind::Str, key }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Int(i32),
    Bool(bool),
    Channel(u16),
    Str(String),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{v}"),
            Value::Bool(v) => write!(f, "{}", if *v { 1 } else { 0 }),
            Value::Channel(v) => write!(f, "{v}"),
            Value::Str(v) => f.write_str(&escape(v)),
        }
    }
}

/// Parsed fields of one info file, keyed by field name, with the line
/// each came from. Fields absent from the file are absent here
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Values(HashMap<&'static str, (Value, usize)>);

impl Values {
    fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key).map(|(value, _)| value)
    }

    /// 1-based line the field was read from
    pub fn line(&self, key: &str) -> Option<usize> {
        self.0.get(key).map(|(_, line)| *line)
    }

    pub fn int(&self, key: &str) -> Option<i32> {
        match self.get(key) {
            Some(Value::Int(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn bool(&self, key: &str) -> Option<bool> {
        match self.get(key) {
            Some(Value::Bool(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn channel(&self, key: &str) -> Option<u16> {
        match self.get(key) {
            Some(Value::Channel(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn str(&self, key: &str) -> Option<&str> {
        match self.get(key) {
            Some(Value::Str(v)) => Some(v.as_str()),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            c => out.push(c),
        }
    }
    out
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

fn parse_value(kind: FieldKind, raw: &str) -> Result<Value, String> {
    let trimmed = raw.trim();
    match kind {
        FieldKind::Int => trimmed
            .parse()
            .map(Value::Int)
            .map_err(|e| format!("expected integer, got '{trimmed}' ({e})")),
        FieldKind::Bool => match trimmed {
            "1" | "true" => Ok(Value::Bool(true)),
            "0" | "false" => Ok(Value::Bool(false)),
            _ => Err(format!("expected boolean, got '{trimmed}'")),
        },
        FieldKind::Channel => trimmed
            .parse()
            .map(Value::Channel)
            .map_err(|e| format!("expected color channel 0-65535, got '{trimmed}' ({e})")),
        FieldKind::Str => Ok(Value::Str(unescape(raw))),
    }
}

/// Parse info file text against the requested fields
/// Unknown keys are skipped, a known key with a bad value fails the whole parse
pub fn parse_values(name: &str, contents: &str, fields: &[Field]) -> Result<Values, FioError> {
    let mut values = Values::default();
    for (idx, line) in contents.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let (key, raw) = line.split_once(' ').unwrap_or((line, ""));
        if key.is_empty() {
            return Err(FioError::Parse {
                name: name.to_string(),
                line: idx + 1,
                reason: "line has no key".to_string(),
            });
        }
        let Some(field) = fields.iter().find(|f| f.key == key) else {
            debug!(file = %name, key = %key, "ignoring unknown key");
            continue;
        };
        let value = parse_value(field.kind, raw).map_err(|reason| FioError::Parse {
            name: name.to_string(),
            line: idx + 1,
            reason: format!("{key}: {reason}"),
        })?;
        values.0.insert(field.key, (value, idx + 1));
    }
    Ok(values)
}

/// Render fields in the given order, one `<key> <value>` line each
pub fn format_values(values: &[(&str, Value)]) -> String {
    let mut out = String::new();
    for (key, value) in values {
        out.push_str(key);
        out.push(' ');
        out.push_str(&value.to_string());
        out.push('\n');
    }
    out
}

/// True for a single plain path component: no separators, not `.` or `..`
pub fn is_plain_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(first)), None) if first == name
    ) && !name.contains(['/', '\\', '\0'])
}

static NEXT_SUFFIX: AtomicU32 = AtomicU32::new(0);

fn candidate_suffix() -> String {
    let seed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos() ^ d.as_secs() as u32)
        .unwrap_or(0);
    let n = NEXT_SUFFIX.fetch_add(1, Ordering::Relaxed);
    format!("{:06X}", (seed ^ n.wrapping_mul(0x9E37_79B9)) & 0xFF_FFFF)
}

/// Pad file directory
#[derive(Debug, Clone)]
pub struct Fio {
    dir: PathBuf,
}

impl Fio {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    /// Path of `name`, refusing anything that would leave the directory
    fn checked_path(&self, name: &str) -> Result<PathBuf, FioError> {
        if is_plain_name(name) {
            Ok(self.path(name))
        } else {
            Err(FioError::InvalidName {
                name: name.to_string(),
            })
        }
    }

    fn ensure_dir(&self) -> Result<(), FioError> {
        fs::create_dir_all(&self.dir).map_err(|e| FioError::io(&self.dir.display().to_string(), e))
    }

    /// Allocate `prefix` plus a fresh suffix, creating the empty file so
    /// the name cannot be handed out twice
    pub fn unique_name(&self, prefix: &str) -> Result<String, FioError> {
        self.ensure_dir()?;
        for _ in 0..UNIQUE_NAME_ATTEMPTS {
            let name = format!("{prefix}{}", candidate_suffix());
            match fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(self.path(&name))
            {
                Ok(_) => {
                    debug!(file = %name, "allocated unique name");
                    return Ok(name);
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(FioError::io(&name, e)),
            }
        }
        Err(FioError::io(
            prefix,
            io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("no free name after {UNIQUE_NAME_ATTEMPTS} attempts"),
            ),
        ))
    }

    /// Whole file contents, None when the file does not exist
    pub fn get_file(&self, name: &str) -> Result<Option<String>, FioError> {
        let bytes = match fs::read(self.checked_path(name)?) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(FioError::io(name, e)),
        };
        String::from_utf8(bytes).map(Some).map_err(|e| {
            let valid = &e.as_bytes()[..e.utf8_error().valid_up_to()];
            FioError::Parse {
                name: name.to_string(),
                line: valid.iter().filter(|&&b| b == b'\n').count() + 1,
                reason: "not valid UTF-8".to_string(),
            }
        })
    }

    /// Atomically replace a file's contents
    pub fn set_file(&self, name: &str, contents: &str) -> Result<(), FioError> {
        let target = self.checked_path(name)?;
        self.ensure_dir()?;
        let tmp = self.path(&format!(".{name}.tmp"));
        let write_tmp = || -> io::Result<()> {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(contents.as_bytes())?;
            file.sync_all()
        };
        write_tmp()
            .and_then(|_| fs::rename(&tmp, &target))
            .inspect_err(|e| {
                warn!(file = %name, error = %e, "write failed, keeping previous version");
                let _ = fs::remove_file(&tmp);
            })
            .map_err(|e| FioError::io(name, e))
    }

    /// Read the requested typed fields of an info file
    pub fn get_values(&self, name: &str, fields: &[Field]) -> Result<Values, FioError> {
        let contents = self.get_file(name)?.ok_or_else(|| FioError::NotFound {
            name: name.to_string(),
        })?;
        parse_values(name, &contents, fields)
    }

    /// Atomically write typed fields to an info file
    pub fn set_values(&self, name: &str, values: &[(&str, Value)]) -> Result<(), FioError> {
        self.set_file(name, &format_values(values))
    }

    /// Remove a file, succeeding if it is already gone
    pub fn remove_file(&self, name: &str) -> Result<(), FioError> {
        match fs::remove_file(self.checked_path(name)?) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(FioError::io(name, e)),
        }
    }

    /// Sorted names of files starting with `prefix`
    /// A missing directory lists as empty
    pub fn list(&self, prefix: &str) -> Result<Vec<String>, FioError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(FioError::io(&self.dir.display().to_string(), e)),
        };
        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter(|name| name.starts_with(prefix))
            .collect();
        names.sort();
        Ok(names)
    }
}
