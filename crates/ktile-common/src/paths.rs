use std::path::PathBuf;

/// `$var` if set and non-empty, else `$HOME/<home_rel>`, else `/tmp`.
fn xdg_dir(var: &str, home_rel: &str) -> PathBuf {
    resolve_xdg(
        std::env::var(var).ok().as_deref(),
        std::env::var("HOME").ok().as_deref(),
        home_rel,
    )
}

fn resolve_xdg(value: Option<&str>, home: Option<&str>, home_rel: &str) -> PathBuf {
    match (value, home) {
        (Some(dir), _) if !dir.is_empty() => PathBuf::from(dir),
        (_, Some(home)) if !home.is_empty() => PathBuf::from(home).join(home_rel),
        _ => PathBuf::from("/tmp"),
    }
}

pub fn config_dir() -> PathBuf {
    xdg_dir("XDG_CONFIG_HOME", ".config")
}

pub fn data_dir() -> PathBuf {
    xdg_dir("XDG_DATA_HOME", ".local/share")
}

pub fn ktile_config_dir() -> PathBuf {
    config_dir().join("ktile")
}

pub fn ktile_config_file() -> PathBuf {
    ktile_config_dir().join("config.toml")
}

pub fn ktile_data_dir() -> PathBuf {
    data_dir().join("ktile")
}

/// Parent of the per-run `session-N` log directories.
pub fn ktile_log_dir() -> PathBuf {
    ktile_data_dir().join("logs")
}
