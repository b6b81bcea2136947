//! Persisted session document.
//!
//! Loads settings from config.json at startup. Holds anchors, Mode One watch
//! items, the Mode Two monitor and engine timing/hotkey settings.

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{info, warn};

use super::anchors::AnchorSet;
use super::types::{Color, Coordinate, Region};
use crate::input::KeyName;

/// A Mode One item: watch a price near `coordinate` and buy at or below `threshold`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WatchItem {
    pub name: String,
    pub coordinate: Coordinate,
    pub threshold: f64,
    #[serde(default = "default_item_poll_ms", deserialize_with = "clamp_poll_interval")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_true")]
    pub active: bool,
}

impl WatchItem {
    pub fn new(name: impl Into<String>, coordinate: Coordinate, threshold: f64) -> Self {
        Self {
            name: name.into(),
            coordinate,
            threshold,
            poll_interval_ms: default_item_poll_ms(),
            active: true,
        }
    }

    /// The region sampled for this item's primary price.
    pub fn price_region(&self) -> Region {
        Region::around(self.coordinate)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModeOneConfig {
    /// Poll interval offered for newly added items.
    #[serde(default = "default_item_poll_ms", deserialize_with = "clamp_poll_interval")]
    pub poll_interval_ms: u64,
    #[serde(default)]
    pub items: Vec<WatchItem>,
}

impl Default for ModeOneConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_item_poll_ms(),
            items: Vec::new(),
        }
    }
}

impl ModeOneConfig {
    pub fn item(&self, name: &str) -> Option<&WatchItem> {
        self.items.iter().find(|item| item.name == name)
    }

    /// Inserts or replaces by name. A replaced item keeps its list position.
    pub fn upsert(&mut self, item: WatchItem) {
        match self.items.iter_mut().find(|existing| existing.name == item.name) {
            Some(existing) => *existing = item,
            None => self.items.push(item),
        }
    }

    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item.name != name);
        self.items.len() != before
    }

    /// Collapses duplicate names so the last occurrence wins.
    fn dedupe(&mut self) {
        let mut seen = HashSet::new();
        let mut kept: Vec<WatchItem> = Vec::with_capacity(self.items.len());
        for item in self.items.drain(..).rev() {
            if seen.insert(item.name.clone()) {
                kept.push(item);
            } else {
                warn!("Duplicate watch item '{}' in config, keeping the last one", item.name);
            }
        }
        kept.reverse();
        self.items = kept;
    }
}

/// Pixel checked after the below-threshold macro to detect a finished transaction.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TerminationProbe {
    #[serde(default)]
    pub coordinate: Option<Coordinate>,
    #[serde(default)]
    pub color: Color,
}

/// Mode Two: one watched region, two branch macros, one termination probe.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MonitorConfig {
    #[serde(default = "default_monitor_poll_ms", deserialize_with = "clamp_poll_interval")]
    pub poll_interval_ms: u64,
    #[serde(default)]
    pub price_region: Option<Region>,
    #[serde(default)]
    pub threshold: f64,
    /// Macro run when the price is above the threshold.
    #[serde(default)]
    pub above_macro: Option<PathBuf>,
    /// Macro run when the price is at or below the threshold.
    #[serde(default)]
    pub below_macro: Option<PathBuf>,
    #[serde(default)]
    pub termination: TerminationProbe,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_monitor_poll_ms(),
            price_region: None,
            threshold: 0.0,
            above_macro: None,
            below_macro: None,
            termination: TerminationProbe::default(),
        }
    }
}

/// Timing and hotkey settings for the engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Delay between the max-quantity click and the confirmation read (milliseconds)
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
    /// Delay before the capture overlay starts accepting input (milliseconds)
    #[serde(default = "default_capture_arm_delay_ms")]
    pub capture_arm_delay_ms: u64,
    /// Countdown before macro recording starts (milliseconds)
    #[serde(default = "default_record_countdown_ms")]
    pub record_countdown_ms: u64,
    #[serde(default = "default_confirm_key")]
    pub capture_confirm_key: KeyName,
    #[serde(default = "default_cancel_key")]
    pub capture_cancel_key: KeyName,
    #[serde(default = "default_record_stop_key")]
    pub record_stop_key: KeyName,
    /// Directory for recorded macro scripts, relative to the executable if not absolute.
    #[serde(default = "default_macros_dir")]
    pub macros_dir: PathBuf,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            settle_delay_ms: default_settle_delay_ms(),
            capture_arm_delay_ms: default_capture_arm_delay_ms(),
            record_countdown_ms: default_record_countdown_ms(),
            capture_confirm_key: default_confirm_key(),
            capture_cancel_key: default_cancel_key(),
            record_stop_key: default_record_stop_key(),
            macros_dir: default_macros_dir(),
        }
    }
}

/// Complete session document.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default)]
    pub anchors: AnchorSet,
    #[serde(default)]
    pub mode_one: ModeOneConfig,
    #[serde(default)]
    pub mode_two: MonitorConfig,
    #[serde(default)]
    pub engine: EngineSettings,
}

/// Shortest poll interval accepted from the document, in milliseconds.
pub const MIN_POLL_INTERVAL_MS: u64 = 50;

fn clamp_poll_interval<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let ms = u64::deserialize(deserializer)?;
    if ms < MIN_POLL_INTERVAL_MS {
        warn!("Poll interval {}ms raised to {}ms", ms, MIN_POLL_INTERVAL_MS);
    }
    Ok(ms.max(MIN_POLL_INTERVAL_MS))
}

fn default_true() -> bool {
    true
}

fn default_item_poll_ms() -> u64 {
    500
}

fn default_monitor_poll_ms() -> u64 {
    800
}

fn default_settle_delay_ms() -> u64 {
    50
}

fn default_capture_arm_delay_ms() -> u64 {
    500
}

fn default_record_countdown_ms() -> u64 {
    3000
}

fn default_confirm_key() -> KeyName {
    KeyName::new("f8")
}

fn default_cancel_key() -> KeyName {
    KeyName::new("esc")
}

fn default_record_stop_key() -> KeyName {
    KeyName::new("f9")
}

fn default_macros_dir() -> PathBuf {
    PathBuf::from("macros")
}

impl SessionConfig {
    /// Parses a session document.
    pub fn from_json(contents: &str) -> Result<Self> {
        let mut config: SessionConfig = serde_json::from_str(contents)?;
        config.mode_one.dedupe();
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reads and parses `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_json(&contents).with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Writes the document as pretty JSON, creating parent directories.
    ///
    /// The JSON goes to a temp file in the same directory which then replaces
    /// `path`, so a failed write leaves the previous document intact.
    pub fn save(&self, path: &Path) -> Result<()> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;

        let mut temp = NamedTempFile::new_in(dir)
            .with_context(|| format!("Failed to create temp file in {}", dir.display()))?;
        temp.write_all(self.to_json()?.as_bytes())
            .with_context(|| format!("Failed to write {}", path.display()))?;
        temp.persist(path)
            .map_err(|e| e.error)
            .with_context(|| format!("Failed to replace {}", path.display()))?;
        Ok(())
    }

    /// Loads `path`, or falls back to defaults.
    ///
    /// A missing file is created with defaults. An unreadable or invalid file is
    /// left untouched and defaults are used for this run.
    pub fn load_or_default(path: &Path) -> Self {
        info!("Looking for config at: {}", path.display());

        if !path.exists() {
            info!("{} not found. Using default config.", path.display());
            let config = SessionConfig::default();
            if let Err(e) = config.save(path) {
                warn!("Failed to write default config: {:#}", e);
            }
            return config;
        }

        match Self::load(path) {
            Ok(config) => {
                info!("Config loaded from {}", path.display());
                config
            }
            Err(e) => {
                warn!("{:#}. Using defaults.", e);
                SessionConfig::default()
            }
        }
    }

    /// Resolves the macros directory against `base` when it is relative.
    pub fn macros_dir(&self, base: &Path) -> PathBuf {
        if self.engine.macros_dir.is_absolute() {
            self.engine.macros_dir.clone()
        } else {
            base.join(&self.engine.macros_dir)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::AnchorRole;
    use tempfile::tempdir;

    fn sample_config() -> SessionConfig {
        let mut config = SessionConfig::default();
        config
            .anchors
            .set(AnchorRole::PurchaseButton, Coordinate::new(900, 700));
        config
            .anchors
            .set(AnchorRole::MaxQuantityButton, Coordinate::new(850, 640));
        config.mode_one.upsert(WatchItem::new("ammo", Coordinate::new(400, 300), 120.5));
        let mut armor = WatchItem::new("armor", Coordinate::new(400, 360), 9000.0);
        armor.active = false;
        armor.poll_interval_ms = 250;
        config.mode_one.upsert(armor);
        config.mode_two.price_region =
            Some(Region::new(Coordinate::new(10, 20), 100, 30).unwrap());
        config.mode_two.threshold = 50.0;
        config.mode_two.above_macro = Some(PathBuf::from("macros/above.json"));
        config.mode_two.termination = TerminationProbe {
            coordinate: Some(Coordinate::new(5, 6)),
            color: Color::new(12, 34, 56),
        };
        config
    }

    #[test]
    fn test_round_trip_is_lossless() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");

        let config = sample_config();
        config.save(&path).unwrap();
        let loaded = SessionConfig::load(&path).unwrap();
        assert_eq!(loaded, config);

        // Saving again reproduces the same document
        let first = fs::read_to_string(&path).unwrap();
        loaded.save(&path).unwrap();
        let second = fs::read_to_string(&path).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let config = SessionConfig::from_json("{}").unwrap();
        assert_eq!(config, SessionConfig::default());
        assert_eq!(config.mode_two.poll_interval_ms, 800);
        assert_eq!(config.engine.record_stop_key, KeyName::new("f9"));
    }

    #[test]
    fn test_upsert_is_last_write_wins() {
        let mut mode_one = ModeOneConfig::default();
        mode_one.upsert(WatchItem::new("ammo", Coordinate::new(1, 1), 10.0));
        mode_one.upsert(WatchItem::new("food", Coordinate::new(2, 2), 20.0));
        mode_one.upsert(WatchItem::new("ammo", Coordinate::new(3, 3), 30.0));

        assert_eq!(mode_one.items.len(), 2);
        assert_eq!(mode_one.items[0].name, "ammo");
        assert_eq!(mode_one.items[0].threshold, 30.0);
        assert_eq!(mode_one.items[0].coordinate, Coordinate::new(3, 3));
    }

    #[test]
    fn test_duplicate_names_in_file_keep_last() {
        let json = r#"{
            "mode_one": {
                "items": [
                    {"name": "ammo", "coordinate": [1, 1], "threshold": 10},
                    {"name": "food", "coordinate": [2, 2], "threshold": 20},
                    {"name": "ammo", "coordinate": [3, 3], "threshold": 30}
                ]
            }
        }"#;
        let config = SessionConfig::from_json(json).unwrap();
        let names: Vec<&str> = config.mode_one.items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["food", "ammo"]);
        assert_eq!(config.mode_one.item("ammo").unwrap().threshold, 30.0);
    }

    #[test]
    fn test_zero_poll_interval_is_clamped() {
        let json = r#"{
            "mode_one": { "poll_interval_ms": 0, "items": [
                { "name": "ammo", "coordinate": [1, 2], "threshold": 5.0, "poll_interval_ms": 0 }
            ] },
            "mode_two": { "poll_interval_ms": 10 }
        }"#;
        let config = SessionConfig::from_json(json).unwrap();
        assert_eq!(config.mode_one.poll_interval_ms, MIN_POLL_INTERVAL_MS);
        assert_eq!(config.mode_one.items[0].poll_interval_ms, MIN_POLL_INTERVAL_MS);
        assert_eq!(config.mode_two.poll_interval_ms, MIN_POLL_INTERVAL_MS);
    }

    #[test]
    fn test_save_replaces_without_leftovers() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        SessionConfig::default().save(&path).unwrap();
        sample_config().save(&path).unwrap();

        assert_eq!(SessionConfig::load(&path).unwrap(), sample_config());
        let entries = fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[test]
    fn test_remove_item() {
        let mut config = sample_config();
        assert!(config.mode_one.remove("ammo"));
        assert!(!config.mode_one.remove("ammo"));
        assert!(config.mode_one.item("ammo").is_none());
    }

    #[test]
    fn test_load_or_default_writes_missing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = SessionConfig::load_or_default(&path);
        assert_eq!(config, SessionConfig::default());
        assert!(path.exists());
    }

    #[test]
    fn test_load_or_default_keeps_invalid_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();
        let config = SessionConfig::load_or_default(&path);
        assert_eq!(config, SessionConfig::default());
        assert_eq!(fs::read_to_string(&path).unwrap(), "{ not json");
    }

    #[test]
    fn test_macros_dir_resolution() {
        let mut config = SessionConfig::default();
        assert_eq!(
            config.macros_dir(Path::new("/app")),
            Path::new("/app").join("macros")
        );
        let abs = std::env::temp_dir().join("scripts");
        config.engine.macros_dir = abs.clone();
        assert_eq!(config.macros_dir(Path::new("/app")), abs);
    }
}
