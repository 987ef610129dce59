use chrono::Local;
use log::{Level, LevelFilter, Metadata, Record};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::paths::ktile_log_dir;

static SESSION_DIR: Mutex<Option<PathBuf>> = Mutex::new(None);

/// Compositor logger. Each run gets its own `session-N` directory holding
/// `ktile.log` (info and above) and `ktile.dbg.log` (debug and trace).
/// Everything is mirrored to stderr.
pub struct FileLogger {
    level: LevelFilter,
    main_file: Mutex<File>,
    debug_file: Mutex<File>,
}

impl FileLogger {
    pub fn init(level: LevelFilter) -> Result<(), Box<dyn std::error::Error>> {
        let log_dir = ktile_log_dir();
        fs::create_dir_all(&log_dir)?;

        let session_num = next_session_number(&log_dir);
        let session_dir = log_dir.join(format!("session-{}", session_num));
        fs::create_dir_all(&session_dir)?;

        if let Ok(mut guard) = SESSION_DIR.lock() {
            *guard = Some(session_dir.clone());
        }

        let main_file = open_log_file(&session_dir, "ktile.log")?;
        let debug_file = open_log_file(&session_dir, "ktile.dbg.log")?;

        let logger = FileLogger {
            level,
            main_file: Mutex::new(main_file),
            debug_file: Mutex::new(debug_file),
        };

        log::set_max_level(level);
        log::set_logger(Box::leak(Box::new(logger)))
            .map_err(|e| format!("Failed to set logger: {}", e))?;

        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
        log::info!("=== ktile session {} ===", session_num);
        log::info!("Log directory: {}", session_dir.display());
        log::info!("Started at: {}", timestamp);

        Ok(())
    }
}

fn open_log_file(dir: &Path, name: &str) -> Result<File, Box<dyn std::error::Error>> {
    let path = dir.join(name);
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&path)?;
    Ok(file)
}

fn session_numbers(log_dir: &Path) -> impl Iterator<Item = (u32, PathBuf)> {
    fs::read_dir(log_dir)
        .into_iter()
        .flat_map(|entries| entries.flatten())
        .filter_map(|entry| {
            let name = entry.file_name();
            let num = name.to_string_lossy().strip_prefix("session-")?.parse::<u32>().ok()?;
            Some((num, entry.path()))
        })
}

fn next_session_number(log_dir: &Path) -> u32 {
    session_numbers(log_dir).map(|(num, _)| num).max().unwrap_or(0) + 1
}

fn level_char(level: Level) -> char {
    match level {
        Level::Error => 'E',
        Level::Warn => 'W',
        Level::Info => 'I',
        Level::Debug => 'D',
        Level::Trace => 'T',
    }
}

impl log::Log for FileLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let timestamp = Local::now().format("%H:%M:%S%.3f");
        let log_line = format!("{} {} {}\n", timestamp, record.target(), record.args());

        let file_mutex = if record.level() >= Level::Debug {
            &self.debug_file
        } else {
            &self.main_file
        };

        if let Ok(mut file) = file_mutex.lock() {
            let _ = file.write_all(log_line.as_bytes());
            let _ = file.flush();
        }

        eprint!("{} {} {}", timestamp, level_char(record.level()), log_line);
    }

    fn flush(&self) {
        let _ = self.main_file.lock().map(|mut f| f.flush());
        let _ = self.debug_file.lock().map(|mut f| f.flush());
    }
}

pub fn current_session_dir() -> Option<PathBuf> {
    SESSION_DIR.lock().ok()?.clone()
}

/// Logger for helper programs. Appends `<app>.log` to the newest compositor
/// session directory so a session's logs stay together.
pub struct AppLogger {
    file: Mutex<File>,
    app_name: String,
}

impl AppLogger {
    pub fn init(app_name: &str, level: LevelFilter) -> Result<(), Box<dyn std::error::Error>> {
        let session_dir = session_numbers(&ktile_log_dir())
            .max_by_key(|(num, _)| *num)
            .map(|(_, path)| path)
            .ok_or("No ktile session found")?;
        let log_path = session_dir.join(format!("{}.log", app_name));

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)?;

        let logger = AppLogger {
            file: Mutex::new(file),
            app_name: app_name.to_string(),
        };

        log::set_max_level(level);
        log::set_logger(Box::leak(Box::new(logger)))
            .map_err(|e| format!("Failed to set logger: {}", e))?;

        Ok(())
    }
}

impl log::Log for AppLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let timestamp = Local::now().format("%H:%M:%S%.3f");
        let log_line = format!(
            "{} {} {} {}\n",
            timestamp,
            level_char(record.level()),
            record.target(),
            record.args()
        );

        if let Ok(mut file) = self.file.lock() {
            let _ = file.write_all(log_line.as_bytes());
            let _ = file.flush();
        }

        if record.level() <= Level::Warn {
            eprint!("[{}] {}", self.app_name, log_line);
        }
    }

    fn flush(&self) {
        let _ = self.file.lock().map(|mut f| f.flush());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_numbers_skip_foreign_entries() {
        let dir = std::env::temp_dir().join(format!("ktile-log-test-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(dir.join("session-3")).unwrap();
        fs::create_dir_all(dir.join("session-11")).unwrap();
        fs::create_dir_all(dir.join("session-x")).unwrap();
        fs::create_dir_all(dir.join("other")).unwrap();

        assert_eq!(next_session_number(&dir), 12);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn empty_log_dir_starts_at_one() {
        let dir = std::env::temp_dir().join(format!("ktile-log-missing-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        assert_eq!(next_session_number(&dir), 1);
    }
}
