use std::{fmt, fs, io, path::Path};

use serde::Deserialize;

use crate::due::DEFAULT_SOON_WINDOW_DAYS;

pub const SETTINGS_FILENAME: &str = "settings.json";
/// Environment variable that points at a different settings file.
pub const SETTINGS_PATH_VAR: &str = "EISEN_SETTINGS";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub tcp_socket_binding: String,
    pub tcp_socket_port: u16,
    pub database_path: String,
    pub static_dir: String,
    /// Used when RUST_LOG is not set.
    pub log_filter: String,
    /// How many days ahead still count as "soon".
    pub soon_window_days: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            tcp_socket_binding: "0.0.0.0".to_string(),
            tcp_socket_port: 3000,
            database_path: "tasks.redb".to_string(),
            static_dir: "static".to_string(),
            log_filter: "info,tower_http=info".to_string(),
            soon_window_days: DEFAULT_SOON_WINDOW_DAYS,
        }
    }
}

impl Settings {
    /// Load from `$EISEN_SETTINGS`, or `settings.json` in the working
    /// directory. A missing file means defaults.
    pub fn load() -> Result<Settings, SettingsError> {
        let path = std::env::var(SETTINGS_PATH_VAR).unwrap_or_else(|_| SETTINGS_FILENAME.to_string());
        Settings::load_from(&path)
    }

    pub fn load_from(path: impl AsRef<Path>) -> Result<Settings, SettingsError> {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content)
                .map_err(|e| SettingsError::Parse(path.display().to_string(), e.to_string())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Settings::default()),
            Err(e) => Err(SettingsError::Read(path.display().to_string(), e.to_string())),
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.tcp_socket_binding, self.tcp_socket_port)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingsError {
    Read(String, String),
    Parse(String, String),
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingsError::Read(path, e) => write!(f, "cannot read settings file {path}: {e}"),
            SettingsError::Parse(path, e) => write!(f, "cannot parse settings file {path}: {e}"),
        }
    }
}

impl std::error::Error for SettingsError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_file(name: &str, content: &str) -> String {
        let path = format!("/tmp/eisen_settings_{name}_{}.json", std::process::id());
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn missing_file_gives_defaults() {
        let settings = Settings::load_from("/tmp/definitely-not-here/settings.json").unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.bind_address(), "0.0.0.0:3000");
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let path = temp_file("partial", r#"{ "tcp_socket_port": 8080, "database_path": "/var/lib/eisen.redb" }"#);
        let settings = Settings::load_from(&path).unwrap();
        assert_eq!(settings.tcp_socket_port, 8080);
        assert_eq!(settings.database_path, "/var/lib/eisen.redb");
        assert_eq!(settings.soon_window_days, 7);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let path = temp_file("broken", "{ not json");
        assert!(matches!(Settings::load_from(&path), Err(SettingsError::Parse(_, _))));
        let _ = fs::remove_file(&path);
    }
}
