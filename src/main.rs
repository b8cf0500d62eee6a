#![forbid(unsafe_code)]

use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result, anyhow, bail};
use clap::Parser;
use tracing::{Level as TraceLevel, debug, info};
use tracing_subscriber::FmtSubscriber;

use xpad::cli::{Args, Command};
use xpad::color::Rgb16;
use xpad::constants::config::SETTINGS_FILENAME;
use xpad::markup::MarkedText;
use xpad::pad::group::{CloseOutcome, Dispatch, PadGroup};
use xpad::pad::store::PadStore;
use xpad::pad::{PadEvent, PadReaction, PadWidgets};
use xpad::settings::{Settings, SharedSettings};

/// Resolve a pad by 1-based number or info file name
fn resolve(group: &PadGroup, pad: &str) -> Result<usize> {
    if let Ok(number) = pad.parse::<usize>() {
        if number == 0 || number > group.len() {
            bail!("No pad number {number}; there are {} pads", group.len());
        }
        return Ok(number - 1);
    }
    group
        .find_by_info(pad)
        .ok_or_else(|| anyhow!("No pad with info file '{pad}'"))
}

fn parse_text(text: &str, markup: bool) -> MarkedText {
    if markup {
        MarkedText::from_markup(text)
    } else {
        MarkedText::plain(text)
    }
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => bail!("Expected a boolean, got '{value}'"),
    }
}

fn parse_color(value: &str) -> Result<Rgb16> {
    Rgb16::parse(value).ok_or_else(|| anyhow!("Expected a color like #ffeeaa, got '{value}'"))
}

/// Set one preference by its settings.json key
fn set_pref(settings: &mut Settings, key: &str, value: &str) -> Result<()> {
    match key {
        "has_toolbar" => settings.set_has_toolbar(parse_bool(value)?),
        "autohide_toolbar" => settings.set_autohide_toolbar(parse_bool(value)?),
        "has_scrollbar" => settings.set_has_scrollbar(parse_bool(value)?),
        "has_decorations" => settings.set_has_decorations(parse_bool(value)?),
        "sticky" => settings.set_sticky(parse_bool(value)?),
        "edit_lock" => settings.set_edit_lock(parse_bool(value)?),
        "confirm_destroy" => settings.set_confirm_destroy(parse_bool(value)?),
        "fontname" => {
            let font = (!value.is_empty() && value != "default").then(|| value.to_string());
            settings.set_fontname(font);
        }
        "text_color" => settings.set_text_color(parse_color(value)?),
        "back_color" => settings.set_back_color(parse_color(value)?),
        _ => bail!("Unknown preference '{key}'"),
    }
    Ok(())
}

fn list(group: &PadGroup) {
    if group.is_empty() {
        println!("No pads");
        return;
    }
    for (index, pad) in group.iter().enumerate() {
        let geometry = pad.record().geometry;
        let (x, y) = geometry.position();
        let (width, height) = geometry.size();
        println!(
            "{:>3}  {:<13}  {:<6}  {:>4}x{:<4} +{x}+{y}  {}",
            index + 1,
            pad.info_name().unwrap_or("-"),
            if pad.is_visible() { "shown" } else { "hidden" },
            width,
            height,
            pad.title()
        );
    }
}

fn run(
    command: Command,
    group: &mut PadGroup,
    settings: &SharedSettings,
    settings_path: &Path,
) -> Result<()> {
    let now = Instant::now();
    match command {
        Command::List => list(group),
        Command::New { text, markup } => {
            let index = group.spawn(now);
            let pad = group.get_mut(index).context("New pad vanished")?;
            match text {
                Some(text) => pad.set_text(parse_text(&text, markup))?,
                None => pad.save_info()?,
            }
            println!("{}", pad.info_name().unwrap_or("-"));
        }
        Command::Import { path } => {
            let index = group.import(&path, now)?;
            let pad = group.get(index).context("Imported pad vanished")?;
            println!("{}", pad.info_name().unwrap_or("-"));
        }
        Command::Show { pad } => {
            let index = resolve(group, &pad)?;
            group.dispatch(index, PadEvent::Show, now)?;
            group.get_mut(index).context("Pad vanished")?.save_info()?;
        }
        Command::Close { pad } => {
            let index = resolve(group, &pad)?;
            if group.close(index)? == CloseOutcome::Quit {
                println!("Last shown pad closed; it will be shown again on next start");
            }
        }
        Command::Toggle { pad } => {
            let index = resolve(group, &pad)?;
            match group.dispatch(index, PadEvent::Toggle, now)? {
                Dispatch::Quit => {
                    println!("Last shown pad closed; it will be shown again on next start");
                }
                Dispatch::Handled(PadReaction::Closed) => {}
                Dispatch::Handled(_) => {
                    group.get_mut(index).context("Pad vanished")?.save_info()?;
                }
            }
        }
        Command::SetText { pad, text, markup } => {
            let index = resolve(group, &pad)?;
            let pad = group.get_mut(index).context("Pad vanished")?;
            pad.set_text(parse_text(&text, markup))?;
        }
        Command::Print { pad, markup } => {
            let index = resolve(group, &pad)?;
            let text = group.get(index).context("Pad vanished")?.text();
            if markup {
                println!("{}", text.to_markup());
            } else {
                println!("{}", text.text);
            }
        }
        Command::Delete { pad, force } => {
            let index = resolve(group, &pad)?;
            if group.dispatch(index, PadEvent::Delete, now)?
                == Dispatch::Handled(PadReaction::ConfirmDelete)
            {
                if !force {
                    bail!("Pad '{pad}' has text; pass --force to delete it");
                }
                group.delete_confirmed(index)?;
            }
        }
        Command::Prefs { key: None, .. } => {
            let json = serde_json::to_string_pretty(settings.borrow().prefs())?;
            println!("{json}");
        }
        Command::Prefs {
            key: Some(key),
            value,
        } => {
            let value = value.with_context(|| format!("Missing value for '{key}'"))?;
            set_pref(&mut settings.borrow_mut(), &key, &value)?;
            settings.borrow().save(settings_path)?;
            // Let loaded pads react, e.g. persist the new stickiness
            group.tick(now);
            info!(key = %key, value = %value, "preference updated");
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    // Parse log level from environment variable
    let log_level = match std::env::var("LOG_LEVEL")
        .unwrap_or_else(|_| "info".to_string())
        .to_lowercase()
        .as_str()
    {
        "trace" => TraceLevel::TRACE,
        "debug" => TraceLevel::DEBUG,
        "warn" => TraceLevel::WARN,
        "error" => TraceLevel::ERROR,
        _ => TraceLevel::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();
    let (pad_dir, settings_path) = match &args.config_dir {
        Some(dir) => (dir.clone(), dir.join(SETTINGS_FILENAME)),
        None => (PadStore::default_dir(), Settings::default_path()),
    };
    debug!(dir = %pad_dir.display(), settings = %settings_path.display(), "using config paths");

    let settings = Settings::load(&settings_path)
        .context("Failed to load settings")?
        .shared();
    let mut group = PadGroup::load_all(
        PadStore::new(&pad_dir),
        settings.clone(),
        Box::new(PadWidgets::headless),
        Instant::now(),
    )?;

    run(args.command, &mut group, &settings, &settings_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_pref_parses_values() {
        let mut settings = Settings::default();
        set_pref(&mut settings, "autohide_toolbar", "off").unwrap();
        set_pref(&mut settings, "back_color", "#102030").unwrap();
        set_pref(&mut settings, "fontname", "Sans 12").unwrap();
        assert!(!settings.prefs().autohide_toolbar);
        assert_eq!(settings.prefs().back_color, Rgb16::from_rgb8(0x10, 0x20, 0x30));
        assert_eq!(settings.prefs().fontname.as_deref(), Some("Sans 12"));

        set_pref(&mut settings, "fontname", "default").unwrap();
        assert_eq!(settings.prefs().fontname, None);

        assert!(set_pref(&mut settings, "sticky", "maybe").is_err());
        assert!(set_pref(&mut settings, "text_color", "red").is_err());
        assert!(set_pref(&mut settings, "no_such_key", "1").is_err());
    }

    #[test]
    fn test_resolve_by_number_and_name() {
        let dir = tempfile::tempdir().unwrap();
        let store = PadStore::with_legacy_home(dir.path(), None);
        let settings = Settings::default().shared();
        let mut group = PadGroup::new(store, settings, Box::new(PadWidgets::headless));
        let now = Instant::now();
        let index = group.spawn(now);
        group.get_mut(index).unwrap().save_info().unwrap();
        let name = group.get(index).unwrap().info_name().unwrap().to_string();

        assert_eq!(resolve(&group, "1").unwrap(), 0);
        assert_eq!(resolve(&group, &name).unwrap(), 0);
        assert!(resolve(&group, "0").is_err());
        assert!(resolve(&group, "2").is_err());
        assert!(resolve(&group, "info-nope").is_err());
    }
}
