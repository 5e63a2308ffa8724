//! Reads, validates and writes the settings file.
//!
//! The file is kept as a `toml_edit` document alongside the typed
//! [`Settings`], so writing a section back only touches that section's keys
//! and leaves the user's comments in place. Nothing reaches the disk, and no
//! loaded state is replaced, until the settings convert into
//! [`TrackOptions`].

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use toml_edit::{DocumentMut, Item, Table};

use super::settings::{ConfigSection, Settings};
use crate::subtitles::{SubtitleError, TrackOptions};

/// Errors from reading or writing the settings file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("No config file at {}", .0.display())]
    Missing(PathBuf),

    #[error("Config I/O failed for {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{} is not valid TOML: {source}", .path.display())]
    Syntax {
        path: PathBuf,
        #[source]
        source: toml_edit::TomlError,
    },

    #[error("{} has a malformed setting: {source}", .path.display())]
    Schema {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Section [{section}] could not be rendered: {source}")]
    Render {
        section: &'static str,
        #[source]
        source: toml::ser::Error,
    },

    #[error("Settings in {} rejected: {source}", .path.display())]
    Rejected {
        path: PathBuf,
        #[source]
        source: SubtitleError,
    },
}

/// Result type for config operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// A parsed and validated settings file.
struct Snapshot {
    document: DocumentMut,
    settings: Settings,
    options: TrackOptions,
    dropped: Vec<String>,
}

/// Owns the settings file for one application instance.
pub struct ConfigManager {
    path: PathBuf,
    document: DocumentMut,
    settings: Settings,
    options: TrackOptions,
}

impl ConfigManager {
    /// Manager for `path` holding default settings. Nothing is read yet.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            document: DocumentMut::new(),
            settings: Settings::default(),
            options: TrackOptions::default(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Edit settings in memory. `save` or `update_section` validates and
    /// persists them.
    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    /// Options derived from the last settings that were loaded or written.
    pub fn track_options(&self) -> &TrackOptions {
        &self.options
    }

    /// Read the file. Fails with `Missing` if it does not exist.
    ///
    /// Unknown sections are ignored here and only removed from disk by
    /// `load_or_create`.
    pub fn load(&mut self) -> ConfigResult<()> {
        let snapshot = self.read()?;
        self.install(snapshot);
        Ok(())
    }

    /// Read the file, or write a commented default one if it is absent.
    pub fn load_or_create(&mut self) -> ConfigResult<()> {
        match self.read() {
            Ok(snapshot) => {
                let stale = !snapshot.dropped.is_empty();
                self.install(snapshot);
                if stale {
                    self.write()?;
                }
            }
            Err(ConfigError::Missing(_)) => {
                let settings = Settings::default();
                self.options = self.validate(&settings)?;
                self.settings = settings;
                self.document = self.fresh_document()?;
                self.write()?;
                tracing::info!("Created default config at {}", self.path.display());
            }
            Err(e) => return Err(e),
        }
        Ok(())
    }

    /// Validate and write every section.
    pub fn save(&mut self) -> ConfigResult<()> {
        self.options = self.validate(&self.settings)?;
        for section in ConfigSection::ALL {
            let fresh = self.section_table(section)?;
            merge_section(&mut self.document, section.table_name(), fresh);
        }
        self.write()
    }

    /// Validate the settings and write one section.
    ///
    /// Other sections keep whatever is on disk. Comments attached to the
    /// section header or its keys survive.
    pub fn update_section(&mut self, section: ConfigSection) -> ConfigResult<()> {
        self.options = self.validate(&self.settings)?;
        if self.path.exists() {
            self.document = self.read_document()?.0;
        }
        let fresh = self.section_table(section)?;
        merge_section(&mut self.document, section.table_name(), fresh);
        self.write()
    }

    fn read(&self) -> ConfigResult<Snapshot> {
        let (mut document, text) = self.read_document()?;
        let settings: Settings = toml::from_str(&text).map_err(|source| ConfigError::Schema {
            path: self.path.clone(),
            source,
        })?;
        let options = self.validate(&settings)?;

        let dropped: Vec<String> = document
            .iter()
            .map(|(key, _)| key.to_string())
            .filter(|key| !ConfigSection::ALL.iter().any(|s| s.table_name() == key.as_str()))
            .collect();
        for key in &dropped {
            document.remove(key);
        }
        if !dropped.is_empty() {
            tracing::debug!(
                "Ignoring unknown config sections in {}: {}",
                self.path.display(),
                dropped.join(", ")
            );
        }

        Ok(Snapshot {
            document,
            settings,
            options,
            dropped,
        })
    }

    fn read_document(&self) -> ConfigResult<(DocumentMut, String)> {
        let text = fs::read_to_string(&self.path).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                ConfigError::Missing(self.path.clone())
            } else {
                ConfigError::Io {
                    path: self.path.clone(),
                    source,
                }
            }
        })?;
        let document = text.parse::<DocumentMut>().map_err(|source| ConfigError::Syntax {
            path: self.path.clone(),
            source,
        })?;
        Ok((document, text))
    }

    fn install(&mut self, snapshot: Snapshot) {
        self.document = snapshot.document;
        self.settings = snapshot.settings;
        self.options = snapshot.options;
    }

    fn validate(&self, settings: &Settings) -> ConfigResult<TrackOptions> {
        settings
            .to_track_options()
            .map_err(|source| ConfigError::Rejected {
                path: self.path.clone(),
                source,
            })
    }

    /// One section's keys as a bare table.
    fn section_table(&self, section: ConfigSection) -> ConfigResult<Table> {
        let rendered = match section {
            ConfigSection::Discovery => toml::to_string(&self.settings.discovery),
            ConfigSection::Encoding => toml::to_string(&self.settings.encoding),
            ConfigSection::Timeline => toml::to_string(&self.settings.timeline),
            ConfigSection::Logging => toml::to_string(&self.settings.logging),
        }
        .map_err(|source| ConfigError::Render {
            section: section.table_name(),
            source,
        })?;
        let document = rendered.parse::<DocumentMut>().map_err(|source| ConfigError::Syntax {
            path: self.path.clone(),
            source,
        })?;
        Ok(document.as_table().clone())
    }

    /// Default file body with a comment over each section.
    fn fresh_document(&self) -> ConfigResult<DocumentMut> {
        let mut document = DocumentMut::new();
        for (i, section) in ConfigSection::ALL.into_iter().enumerate() {
            let mut table = self.section_table(section)?;
            let banner = if i == 0 {
                format!("# subtrack settings\n\n# {}\n", section.description())
            } else {
                format!("\n# {}\n", section.description())
            };
            table.decor_mut().set_prefix(banner);
            document.insert(section.table_name(), Item::Table(table));
        }
        Ok(document)
    }

    /// Replace the file through a sibling scratch file and a rename.
    fn write(&self) -> ConfigResult<()> {
        let io_err = |source: io::Error| ConfigError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(io_err)?;
        }
        let scratch = scratch_path(&self.path);
        let mut file = File::create(&scratch).map_err(io_err)?;
        file.write_all(self.document.to_string().as_bytes())
            .and_then(|()| file.sync_all())
            .map_err(io_err)?;
        drop(file);
        fs::rename(&scratch, &self.path).map_err(io_err)
    }
}

fn scratch_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.partial"))
}

/// Overwrite `name`'s keys with `fresh`, keeping the existing table and key
/// decor. Keys no longer serialized are removed.
fn merge_section(document: &mut DocumentMut, name: &str, fresh: Table) {
    let slot = document.entry(name).or_insert(Item::Table(Table::new()));
    let Some(table) = slot.as_table_mut() else {
        *slot = Item::Table(fresh);
        return;
    };
    table.retain(|key, _| fresh.contains_key(key));
    for (key, item) in fresh.iter() {
        match table.get_mut(key) {
            Some(existing) => *existing = item.clone(),
            None => {
                table.insert(key, item.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::LogLevel;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn load_or_create_writes_commented_defaults() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join(".config").join("subtrack.toml");

        let mut manager = ConfigManager::new(&config_path);
        manager.load_or_create().unwrap();

        let content = fs::read_to_string(&config_path).unwrap();
        assert!(content.starts_with("# subtrack settings"));
        assert!(content.contains("# Text encoding fallback\n[encoding]"));
        assert!(content.contains("[discovery]"));
        assert!(content.contains("[timeline]"));

        let mut reloaded = ConfigManager::new(&config_path);
        reloaded.load().unwrap();
        assert_eq!(reloaded.settings(), manager.settings());
        assert!(!scratch_path(&config_path).exists());
    }

    #[test]
    fn load_derives_track_options() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("subtrack.toml");
        fs::write(
            &config_path,
            "[encoding]\ndefault = \"shift_jis\"\npinned = true\n\n[timeline]\nstrict = true\nframe_rate = 25.0\n",
        )
        .unwrap();

        let mut manager = ConfigManager::new(&config_path);
        manager.load().unwrap();

        let options = manager.track_options();
        assert_eq!(options.encoding.default.name(), "Shift_JIS");
        assert!(options.encoding.pinned);
        assert_eq!(options.timeline.frame_rate, Some(25.0));
        assert_eq!(
            options.timeline.policy,
            crate::subtitles::IntervalPolicy::Reject
        );
    }

    #[test]
    fn unknown_encoding_is_rejected_and_state_kept() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("subtrack.toml");
        fs::write(&config_path, "[encoding]\ndefault = \"klingon-8\"\n").unwrap();

        let mut manager = ConfigManager::new(&config_path);
        let err = manager.load().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Rejected {
                source: SubtitleError::UnsupportedEncoding(_),
                ..
            }
        ));
        assert_eq!(manager.settings(), &Settings::default());
    }

    #[test]
    fn rejected_settings_are_not_written() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("subtrack.toml");
        let mut manager = ConfigManager::new(&config_path);
        manager.load_or_create().unwrap();
        let before = fs::read_to_string(&config_path).unwrap();

        manager.settings_mut().encoding.default_label = "klingon-8".into();
        assert!(matches!(
            manager.update_section(ConfigSection::Encoding),
            Err(ConfigError::Rejected { .. })
        ));
        assert!(matches!(manager.save(), Err(ConfigError::Rejected { .. })));
        assert_eq!(fs::read_to_string(&config_path).unwrap(), before);
    }

    #[test]
    fn malformed_files_are_distinguished() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("subtrack.toml");

        fs::write(&config_path, "[encoding\n").unwrap();
        let mut manager = ConfigManager::new(&config_path);
        assert!(matches!(manager.load(), Err(ConfigError::Syntax { .. })));

        fs::write(&config_path, "[timeline]\nstrict = \"yes\"\n").unwrap();
        assert!(matches!(manager.load(), Err(ConfigError::Schema { .. })));
    }

    #[test]
    fn load_missing_file_is_missing() {
        let dir = tempdir().unwrap();
        let mut manager = ConfigManager::new(dir.path().join("absent.toml"));
        assert!(matches!(manager.load(), Err(ConfigError::Missing(_))));
    }

    #[test]
    fn unknown_sections_dropped_on_load_or_create() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("subtrack.toml");
        fs::write(
            &config_path,
            "# mine\n[encoding]\ndefault = \"gbk\"\n\n[paths]\nstale = 1\n",
        )
        .unwrap();

        let mut manager = ConfigManager::new(&config_path);
        manager.load().unwrap();
        assert!(fs::read_to_string(&config_path).unwrap().contains("[paths]"));

        manager.load_or_create().unwrap();
        let content = fs::read_to_string(&config_path).unwrap();
        assert!(!content.contains("[paths]"));
        assert!(content.contains("# mine"));
        assert_eq!(manager.settings().encoding.default_label, "gbk");
    }

    #[test]
    fn update_section_keeps_comments_and_other_sections() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("subtrack.toml");
        fs::write(
            &config_path,
            "# the night shift uses this\n[logging]\n# noisy on purpose\nlevel = \"info\"\n\n[timeline]\nstrict = false\n",
        )
        .unwrap();

        let mut manager = ConfigManager::new(&config_path);
        manager.load().unwrap();
        manager.settings_mut().logging.level = LogLevel::Debug;
        manager.settings_mut().timeline.strict = true;
        manager.update_section(ConfigSection::Logging).unwrap();

        let content = fs::read_to_string(&config_path).unwrap();
        assert!(content.contains("# the night shift uses this\n[logging]"));
        assert!(content.contains("# noisy on purpose\nlevel = \"debug\""));
        assert!(content.contains("strict = false"));
        assert!(!content.contains("[discovery]"));
    }

    #[test]
    fn save_drops_keys_no_longer_serialized() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("subtrack.toml");
        fs::write(&config_path, "[timeline]\nframe_rate = 23.976\n").unwrap();

        let mut manager = ConfigManager::new(&config_path);
        manager.load().unwrap();
        manager.settings_mut().timeline.frame_rate = None;
        manager.settings_mut().discovery.lyrics_enabled = true;
        manager.save().unwrap();

        let content = fs::read_to_string(&config_path).unwrap();
        assert!(!content.contains("frame_rate"));
        assert!(content.contains("lyrics_enabled = true"));
        assert!(manager.track_options().discovery.accepts("lrc"));
    }
}
