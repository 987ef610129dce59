use ktile_common::ktile_config_file;
use log::LevelFilter;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::layout::{clamp_gaps, Rectangle, TilingMode, TilingParams};
use crate::server::Server;

fn default_gaps() -> i32 {
    0
}
fn default_master_count() -> i64 {
    1
}
fn default_master_factor() -> f64 {
    0.55
}

fn default_keyboard_layout() -> String {
    "us".to_string()
}
fn default_keyboard_model() -> String {
    "pc105".to_string()
}
fn default_keyboard_options() -> String {
    String::new()
}
fn default_repeat_rate() -> i32 {
    25
}
fn default_repeat_delay() -> i32 {
    600
}

fn default_output_name() -> String {
    "HEADLESS-1".to_string()
}
fn default_output_width() -> i32 {
    1920
}
fn default_output_height() -> i32 {
    1080
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_outputs() -> Vec<OutputConfig> {
    vec![OutputConfig::default()]
}

fn bind(chord: &str, action: &[&str]) -> KeybindEntry {
    KeybindEntry {
        chord: chord.to_string(),
        action: action.iter().map(|s| s.to_string()).collect(),
    }
}

fn default_bindings() -> Vec<KeybindEntry> {
    let mut binds = vec![
        bind("S-Return", &["spawn", "foot"]),
        bind("S-d", &["spawn", "fuzzel"]),
        bind("S-Sh-Q", &["close"]),
        bind("S-x S-q", &["quit"]),
        bind("S-j", &["focus_next"]),
        bind("S-k", &["focus_prev"]),
        bind("S-Tab", &["cycle_views"]),
        bind("S-grave", &["cycle_app"]),
        bind("S-space", &["zoom"]),
        bind("S-Sh-space", &["toggle_floating"]),
        bind("S-i", &["inc_master"]),
        bind("S-Sh-I", &["dec_master"]),
        bind("S-h", &["inc_mfact", "-5"]),
        bind("S-l", &["inc_mfact", "5"]),
        bind("S-r", &["toggle_rmaster"]),
        bind("S-t", &["set_tiling", "traditional"]),
        bind("S-f", &["set_tiling", "none"]),
        bind("S-equal", &["inc_gaps", "2"]),
        bind("S-minus", &["inc_gaps", "-2"]),
        bind("S-period", &["focus_monitor_next"]),
        bind("S-Sh-greater", &["send_to_monitor_next"]),
        bind("S-m", &["move_grab"]),
        bind("S-Sh-M", &["resize_grab"]),
        bind("S-w n", &["workspace_next"]),
        bind("S-w p", &["workspace_prev"]),
        bind("S-s n", &["send_next"]),
        bind("S-s p", &["send_prev"]),
    ];
    for n in 1..=9 {
        let n = n.to_string();
        binds.push(bind(&format!("S-w {}", n), &["workspace", &n]));
        binds.push(bind(&format!("S-s {}", n), &["send_to_workspace", &n]));
    }
    binds
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct KeybindEntry {
    pub chord: String,
    pub action: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Config {
    pub tiling: TilingConfig,
    pub keyboard: KeyboardConfig,
    #[serde(default = "default_outputs")]
    pub outputs: Vec<OutputConfig>,
    pub keybinds: KeybindsConfig,
    pub debug: DebugConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tiling: TilingConfig::default(),
            keyboard: KeyboardConfig::default(),
            outputs: default_outputs(),
            keybinds: KeybindsConfig::default(),
            debug: DebugConfig::default(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TilingConfig {
    pub mode: TilingMode,
    #[serde(default = "default_gaps")]
    pub gaps: i32,
    #[serde(default = "default_master_count")]
    pub master_count: i64,
    #[serde(default = "default_master_factor")]
    pub master_factor: f64,
    pub right_master: bool,
    /// Insert new views at the head of the tiling order.
    pub new_on_top: bool,
}

impl Default for TilingConfig {
    fn default() -> Self {
        Self {
            mode: TilingMode::default(),
            gaps: default_gaps(),
            master_count: default_master_count(),
            master_factor: default_master_factor(),
            right_master: false,
            new_on_top: false,
        }
    }
}

impl TilingConfig {
    pub fn params(&self) -> TilingParams {
        TilingParams::new(self.master_count, self.master_factor, self.right_master)
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct KeyboardConfig {
    #[serde(default = "default_keyboard_layout")]
    pub layout: String,
    #[serde(default = "default_keyboard_model")]
    pub model: String,
    #[serde(default = "default_keyboard_options")]
    pub options: String,
    #[serde(default = "default_repeat_rate")]
    pub repeat_rate: i32,
    #[serde(default = "default_repeat_delay")]
    pub repeat_delay: i32,
}

impl Default for KeyboardConfig {
    fn default() -> Self {
        Self {
            layout: default_keyboard_layout(),
            model: default_keyboard_model(),
            options: default_keyboard_options(),
            repeat_rate: default_repeat_rate(),
            repeat_delay: default_repeat_delay(),
        }
    }
}

/// A headless output attached at startup.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct OutputConfig {
    #[serde(default = "default_output_name")]
    pub name: String,
    #[serde(default = "default_output_width")]
    pub width: i32,
    #[serde(default = "default_output_height")]
    pub height: i32,
    pub x: i32,
    pub y: i32,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            name: default_output_name(),
            width: default_output_width(),
            height: default_output_height(),
            x: 0,
            y: 0,
        }
    }
}

impl OutputConfig {
    pub fn geometry(&self) -> Rectangle {
        Rectangle::new(self.x, self.y, self.width.max(1), self.height.max(1))
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct KeybindsConfig {
    #[serde(default = "default_bindings")]
    pub bind: Vec<KeybindEntry>,
}

impl Default for KeybindsConfig {
    fn default() -> Self {
        Self {
            bind: default_bindings(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DebugConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl DebugConfig {
    pub fn level_filter(&self) -> LevelFilter {
        LevelFilter::from_str(&self.log_level).unwrap_or(LevelFilter::Info)
    }
}

impl Config {
    /// Tries `explicit` first, then the user and system config files, then
    /// falls back to built-in defaults.
    pub fn load(explicit: Option<&Path>) -> Self {
        let mut candidates: Vec<PathBuf> = Vec::new();
        if let Some(path) = explicit {
            candidates.push(path.to_path_buf());
        }
        candidates.push(ktile_config_file());
        candidates.push(PathBuf::from("/etc/ktile/config.toml"));

        for path in candidates {
            if !path.exists() {
                continue;
            }
            match Self::load_from_path(&path) {
                Ok(config) => {
                    log::info!("Loaded config from {}", path.display());
                    return config;
                }
                Err(e) => {
                    log::warn!("Failed to load {}: {}", path.display(), e);
                }
            }
        }

        log::info!("Using default configuration");
        Self::default()
    }

    pub fn load_from_path(path: &Path) -> Result<Self, String> {
        let content =
            std::fs::read_to_string(path).map_err(|e| format!("Failed to read file: {}", e))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| format!("Failed to parse TOML: {}", e))
    }

    /// Pushes tiling defaults and key bindings into `server`. A bad binding
    /// is logged and skipped. Returns how many bindings registered.
    pub fn apply(&self, server: &mut Server) -> usize {
        server.tiling_mode = self.tiling.mode;
        server.gaps = clamp_gaps(self.tiling.gaps as i64);
        server.set_default_params(self.tiling.params());
        server.set_new_on_top(self.tiling.new_on_top);

        let mut registered = 0;
        for entry in &self.keybinds.bind {
            match server.bind(&entry.chord, entry.action.as_slice()) {
                Ok(()) => registered += 1,
                Err(e) => log::warn!("[config] Skipping binding '{}': {}", entry.chord, e),
            }
        }
        registered
    }
}
