//! Widget configuration loading.
//!
//! Parses `etch.toml`, extracting the `[display]` toggles and an optional
//! `[scheme]` color-scheme override. Unknown fields are ignored so embedders
//! can extend the file without breaking older cores; a file that fails to
//! parse degrades to defaults (logged at WARN) rather than failing the
//! widget, while [`parse_str`] exposes the typed error for callers that
//! want to surface it.

use etch_state::EditorOptions;
use etch_style::ColorScheme;
use serde::Deserialize;
use std::{fs, path::PathBuf};
use thiserror::Error;
use tracing::{info, warn};

pub const CONFIG_FILE: &str = "etch.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("malformed config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DisplaySection {
    pub show_space: bool,
    pub show_eol: bool,
    pub highlight_tabs: bool,
    pub show_current_line: bool,
    pub h_scroll_offset: u16,
    pub block_cursor: bool,
}

impl Default for DisplaySection {
    fn default() -> Self {
        let d = EditorOptions::default();
        Self {
            show_space: d.show_space,
            show_eol: d.show_eol,
            highlight_tabs: d.highlight_tabs,
            show_current_line: d.show_current_line,
            h_scroll_offset: d.h_scroll_offset,
            block_cursor: d.block_cursor,
        }
    }
}

impl DisplaySection {
    pub fn to_options(&self) -> EditorOptions {
        EditorOptions {
            show_space: self.show_space,
            show_eol: self.show_eol,
            highlight_tabs: self.highlight_tabs,
            show_current_line: self.show_current_line,
            h_scroll_offset: self.h_scroll_offset,
            block_cursor: self.block_cursor,
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct ConfigFile {
    pub display: DisplaySection,
    pub scheme: Option<ColorScheme>,
}

#[derive(Debug, Default, Clone)]
pub struct Config {
    pub file: ConfigFile,
}

impl Config {
    pub fn options(&self) -> EditorOptions {
        self.file.display.to_options()
    }

    pub fn scheme(&self) -> ColorScheme {
        self.file.scheme.clone().unwrap_or_default()
    }
}

/// Strict parse with the typed error surfaced.
pub fn parse_str(content: &str) -> Result<ConfigFile, ConfigError> {
    Ok(toml::from_str::<ConfigFile>(content)?)
}

/// Best-effort config path: working directory first, then the platform
/// config dir.
pub fn discover() -> PathBuf {
    let local = PathBuf::from(CONFIG_FILE);
    if local.exists() {
        return local;
    }
    if let Some(dir) = dirs::config_dir() {
        return dir.join("etch").join(CONFIG_FILE);
    }
    PathBuf::from(CONFIG_FILE)
}

/// Load a config, falling back to defaults when the file is absent or
/// malformed. A malformed file is reported, never fatal.
pub fn load_from(path: Option<PathBuf>) -> Config {
    let path = path.unwrap_or_else(discover);
    let Ok(content) = fs::read_to_string(&path) else {
        return Config::default();
    };
    match parse_str(&content) {
        Ok(file) => {
            info!(target: "config", path = %path.display(), "loaded");
            Config { file }
        }
        Err(err) => {
            warn!(target: "config", path = %path.display(), %err, "config_parse_failed_using_defaults");
            Config::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::{Arc, Mutex, MutexGuard};
    use tracing::Level;
    use tracing::subscriber::with_default;
    use tracing_subscriber::fmt::MakeWriter;

    #[derive(Clone)]
    struct BufferWriter {
        inner: Arc<Mutex<Vec<u8>>>,
    }

    impl BufferWriter {
        fn new() -> (Self, Arc<Mutex<Vec<u8>>>) {
            let buf = Arc::new(Mutex::new(Vec::new()));
            (Self { inner: buf.clone() }, buf)
        }
    }

    struct LockedWriter<'a> {
        guard: MutexGuard<'a, Vec<u8>>,
    }

    impl Write for LockedWriter<'_> {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.guard.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for BufferWriter {
        type Writer = LockedWriter<'a>;

        fn make_writer(&'a self) -> Self::Writer {
            LockedWriter {
                guard: self.inner.lock().expect("log buffer poisoned"),
            }
        }
    }

    #[test]
    fn defaults_when_file_missing() {
        let cfg = load_from(Some(PathBuf::from("__no_such_etch_config__.toml")));
        let opts = cfg.options();
        assert!(!opts.show_space);
        assert_eq!(opts.h_scroll_offset, 2);
    }

    #[test]
    fn parses_display_section() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(
            tmp.path(),
            "[display]\nshow_space = true\nshow_eol = true\nh_scroll_offset = 5\n",
        )
        .unwrap();
        let cfg = load_from(Some(tmp.path().to_path_buf()));
        let opts = cfg.options();
        assert!(opts.show_space);
        assert!(opts.show_eol);
        assert!(!opts.highlight_tabs);
        assert_eq!(opts.h_scroll_offset, 5);
    }

    #[test]
    fn parses_scheme_colors() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(
            tmp.path(),
            "[scheme.selection]\nfg = [255, 255, 255]\nbg = [0, 0, 128]\n",
        )
        .unwrap();
        let cfg = load_from(Some(tmp.path().to_path_buf()));
        let scheme = cfg.scheme();
        assert_eq!(scheme.selection.bg, etch_style::Color::new(0, 0, 128));
        // Unspecified roles keep their defaults.
        assert_eq!(scheme.normal, ColorScheme::default().normal);
    }

    #[test]
    fn unknown_fields_are_tolerated() {
        let parsed = parse_str("[display]\nshow_eol = true\n[future_section]\nx = 1\n").unwrap();
        assert!(parsed.display.show_eol);
    }

    #[test]
    fn malformed_file_degrades_to_defaults_and_warns() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(tmp.path(), "[display\nshow_space = yes").unwrap();
        let (writer, buffer) = BufferWriter::new();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(Level::WARN)
            .with_target(true)
            .with_ansi(false)
            .without_time()
            .with_writer(writer)
            .finish();
        let cfg = with_default(subscriber, || load_from(Some(tmp.path().to_path_buf())));
        assert!(!cfg.options().show_space);
        let log = String::from_utf8(buffer.lock().unwrap().clone()).unwrap();
        assert!(log.contains("config_parse_failed_using_defaults"));
    }

    #[test]
    fn parse_str_exposes_the_typed_error() {
        let err = parse_str("display = \"not a table\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
