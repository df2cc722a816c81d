use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;

/// `[log]` section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Log {
    pub to: To,
    pub level: Level,
    pub dir: String,
    pub file: String,
}

impl Default for Log {
    fn default() -> Self {
        Self {
            to: To::Console,
            level: Level { inner: slog::Level::Warning },
            dir: "/var/log/mqprops".into(),
            file: "mqprops.log".into(),
        }
    }
}

impl Log {
    /// Full path of the log file, empty if no file is configured.
    pub fn filename(&self) -> String {
        if self.file.is_empty() {
            return String::new();
        }
        Path::new(&self.dir).join(&self.file).to_string_lossy().into_owned()
    }
}

/// Where log records are written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum To {
    Off,
    File,
    Console,
    Both,
}

impl To {
    #[inline]
    pub fn off(&self) -> bool {
        matches!(self, To::Off)
    }
}

/// Log level, in the names slog accepts ("trace", "debug", "info", "warn", "error", "critical").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub struct Level {
    inner: slog::Level,
}

impl Level {
    #[inline]
    pub fn inner(&self) -> slog::Level {
        self.inner
    }
}

impl FromStr for Level {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // "off" is a level name to slog but not a level; use `log.to = "off"`
        if s.eq_ignore_ascii_case("off") {
            return Err(format!("invalid log level: {s}"));
        }
        slog::Level::from_str(s).map(|inner| Level { inner }).map_err(|_| format!("invalid log level: {s}"))
    }
}

impl TryFrom<String> for Level {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.inner.as_str())
    }
}
