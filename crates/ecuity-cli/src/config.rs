//! Configuration vault – reads/writes `~/.ecuity/config.toml`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use ecuity_perception::Reducer;
use ecuity_runtime::FrameLoopConfig;

/// Persisted user configuration stored in `~/.ecuity/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Actuator rows on the wearable array.
    #[serde(default = "default_haptic_rows")]
    pub haptic_rows: usize,

    /// Actuator columns on the wearable array.
    #[serde(default = "default_haptic_columns")]
    pub haptic_columns: usize,

    /// Distance (mm) from which obstacles are ignored.
    #[serde(default = "default_threshold_mm")]
    pub threshold_mm: u32,

    /// Number of distance bands below the threshold.
    #[serde(default = "default_num_categories")]
    pub num_categories: usize,

    /// Leading actuator rows sent over the link each frame.
    #[serde(default = "default_transmit_rows")]
    pub transmit_rows: usize,

    /// Leading actuator columns sent over the link each frame.
    #[serde(default = "default_transmit_columns")]
    pub transmit_columns: usize,

    /// Depth tile reducer: "median", "mean" or "min".
    #[serde(default = "default_reducer")]
    pub reducer: String,

    /// Width of the simulated depth frames.
    #[serde(default = "default_frame_width")]
    pub frame_width: usize,

    /// Height of the simulated depth frames.
    #[serde(default = "default_frame_height")]
    pub frame_height: usize,
}

fn default_haptic_rows() -> usize {
    3
}
fn default_haptic_columns() -> usize {
    6
}
fn default_threshold_mm() -> u32 {
    3000
}
fn default_num_categories() -> usize {
    2
}
fn default_transmit_rows() -> usize {
    1
}
fn default_transmit_columns() -> usize {
    2
}
fn default_reducer() -> String {
    "median".to_string()
}
fn default_frame_width() -> usize {
    160
}
fn default_frame_height() -> usize {
    120
}

impl Default for Config {
    fn default() -> Self {
        Self {
            haptic_rows: default_haptic_rows(),
            haptic_columns: default_haptic_columns(),
            threshold_mm: default_threshold_mm(),
            num_categories: default_num_categories(),
            transmit_rows: default_transmit_rows(),
            transmit_columns: default_transmit_columns(),
            reducer: default_reducer(),
            frame_width: default_frame_width(),
            frame_height: default_frame_height(),
        }
    }
}

impl Config {
    /// Build the runtime frame-loop configuration.
    ///
    /// Fails when `reducer` names an unsupported statistic.
    pub fn frame_loop_config(&self) -> Result<FrameLoopConfig, String> {
        let reducer: Reducer = self.reducer.parse().map_err(|e| format!("{e}"))?;
        Ok(FrameLoopConfig {
            haptic_rows: self.haptic_rows,
            haptic_columns: self.haptic_columns,
            threshold_mm: self.threshold_mm,
            num_categories: self.num_categories,
            transmit_rows: self.transmit_rows,
            transmit_columns: self.transmit_columns,
            reducer,
        })
    }
}

/// Return the path to `~/.ecuity/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

/// Build the config path relative to the given home directory.
pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".ecuity").join("config.toml")
}

/// Load the config from disk.  Returns `None` if the file does not exist.
pub fn load() -> Result<Option<Config>, String> {
    load_from(&config_path())
}

/// Load the config from a specific path.
pub(crate) fn load_from(path: &Path) -> Result<Option<Config>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config at {}: {}", path.display(), e))?;
    let mut cfg: Config =
        toml::from_str(&raw).map_err(|e| format!("Failed to parse config: {}", e))?;
    apply_env_overrides(&mut cfg);
    Ok(Some(cfg))
}

/// Apply `ECUITY_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `ECUITY_THRESHOLD_MM` | `threshold_mm` |
/// | `ECUITY_NUM_CATEGORIES` | `num_categories` |
/// | `ECUITY_REDUCER` | `reducer` |
///
/// Values that fail to parse are ignored.
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Ok(v) = std::env::var("ECUITY_THRESHOLD_MM")
        && let Ok(mm) = v.parse::<u32>()
    {
        cfg.threshold_mm = mm;
    }
    if let Ok(v) = std::env::var("ECUITY_NUM_CATEGORIES")
        && let Ok(n) = v.parse::<usize>()
    {
        cfg.num_categories = n;
    }
    if let Ok(v) = std::env::var("ECUITY_REDUCER") {
        cfg.reducer = v;
    }
}

/// Save the config to disk, creating `~/.ecuity/` if necessary.
pub fn save(cfg: &Config) -> Result<(), String> {
    save_to(cfg, &config_path())
}

/// Save the config to a specific path.
pub(crate) fn save_to(cfg: &Config, path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(parent, fs::Permissions::from_mode(0o700))
                .map_err(|e| format!("Failed to set config directory permissions: {}", e))?;
        }
    }
    let raw =
        toml::to_string_pretty(cfg).map_err(|e| format!("Failed to serialize config: {}", e))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .and_then(|mut f| {
                use std::io::Write;
                f.write_all(raw.as_bytes())
            })
            .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))?;
    }
    #[cfg(not(unix))]
    fs::write(path, raw)
        .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_default_config() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());

        let cfg = Config::default();
        save_to(&cfg, &path).expect("save");

        let loaded = load_from(&path).expect("load ok").expect("some");
        assert_eq!(loaded.haptic_rows, 3);
        assert_eq!(loaded.haptic_columns, 6);
        assert_eq!(loaded.frame_height, 120);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "haptic_rows = 2\nframe_width = 40\n").expect("write");

        let loaded = load_from(&path).expect("load ok").expect("some");
        assert_eq!(loaded.haptic_rows, 2);
        assert_eq!(loaded.frame_width, 40);
        assert_eq!(loaded.haptic_columns, 6);
        assert_eq!(loaded.frame_height, 120);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "haptic_rows = \"three\"").expect("write");
        assert!(load_from(&path).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn config_file_has_restrictive_permissions() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());

        save_to(&Config::default(), &path).expect("save");

        let file_mode = fs::metadata(&path).expect("file metadata").permissions().mode() & 0o777;
        assert_eq!(file_mode, 0o600);
        let dir_mode = fs::metadata(path.parent().unwrap())
            .expect("dir metadata")
            .permissions()
            .mode()
            & 0o777;
        assert_eq!(dir_mode, 0o700);
    }

    #[test]
    fn config_path_points_to_ecuity_dir() {
        let p = config_path_for_home("/home/testuser");
        assert!(p.to_string_lossy().contains(".ecuity"));
        assert!(p.to_string_lossy().ends_with("config.toml"));
    }

    #[test]
    fn load_from_returns_none_when_missing() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());
        assert!(load_from(&path).expect("no error").is_none());
    }

    #[test]
    fn frame_loop_config_parses_reducer() {
        let mut cfg = Config::default();
        cfg.reducer = "Min".to_string();
        assert_eq!(cfg.frame_loop_config().unwrap().reducer, Reducer::Min);

        cfg.reducer = "mode".to_string();
        let err = cfg.frame_loop_config().unwrap_err();
        assert!(err.contains("Unsupported operation"));
    }

    #[test]
    fn apply_env_overrides_changes_threshold() {
        // SAFETY: single-threaded test; no data races on env vars.
        unsafe { std::env::set_var("ECUITY_THRESHOLD_MM", "1500") };
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.threshold_mm, 1500);
        unsafe { std::env::remove_var("ECUITY_THRESHOLD_MM") };
    }

    #[test]
    fn apply_env_overrides_ignores_invalid_category_count() {
        // SAFETY: single-threaded test; no data races on env vars.
        unsafe { std::env::set_var("ECUITY_NUM_CATEGORIES", "many") };
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.num_categories, 2);
        unsafe { std::env::remove_var("ECUITY_NUM_CATEGORIES") };
    }

    #[test]
    fn apply_env_overrides_changes_reducer() {
        // SAFETY: single-threaded test; no data races on env vars.
        unsafe { std::env::set_var("ECUITY_REDUCER", "mean") };
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.reducer, "mean");
        unsafe { std::env::remove_var("ECUITY_REDUCER") };
    }
}
