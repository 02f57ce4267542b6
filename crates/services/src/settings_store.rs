use anyhow::{Context, Result};
use shared::settings::AppSettings;
use std::fs;
use std::path::{Path, PathBuf};

pub fn config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("com.local", "GemNet", "GemNet")
        .map(|proj| proj.config_dir().join("settings.json"))
}

/// Loads settings, falling back to defaults when the file is missing or bad.
pub fn load_settings_or_default() -> AppSettings {
    match config_path() {
        Some(path) => load_from(&path).unwrap_or_else(|e| {
            if path.exists() {
                tracing::warn!("ignoring unreadable settings {}: {:#}", path.display(), e);
            }
            AppSettings::default()
        }),
        None => AppSettings::default(),
    }
}

pub fn save_settings(settings: &AppSettings) -> Result<()> {
    let path = config_path().context("no config directory on this platform")?;
    save_to(&path, settings)
}

pub fn load_from(path: &Path) -> Result<AppSettings> {
    let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let settings = serde_json::from_slice(&bytes)
        .with_context(|| format!("parsing {}", path.display()))?;
    Ok(settings)
}

pub fn save_to(path: &Path, settings: &AppSettings) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(settings)?;
    fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::settings::Theme;
    use tempfile::tempdir;

    #[test]
    fn settings_survive_a_round_trip_through_disk() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("nested").join("settings.json");
        let settings = AppSettings {
            selected_model: "gemini-1.5-pro".into(),
            theme: Theme::SolarizedDark,
        };
        save_to(&path, &settings).unwrap();
        assert_eq!(load_from(&path).unwrap(), settings);
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(load_from(&path).is_err());
    }
}
