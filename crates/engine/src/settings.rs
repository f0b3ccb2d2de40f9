//! Configuration bundle for adapters, and the settings file that feeds it.
//!
//! [`AdapterSettings`] is an immutable `Copy` value. Equality over all fields
//! decides cache-key equality; only [`AdapterSettings::DEFAULT`] instances are
//! shared by the registry.
//!
//! Settings files are YAML (`.yaml`/`.yml`) or JSON. The default location is
//! `~/.config/modelwrap/settings.yaml`, overridable through
//! `MODELWRAP_SETTINGS_PATH`.

use std::{
    env, fs,
    path::{Path, PathBuf},
};

use dirs_next::{config_dir, home_dir};
use modelwrap_types::DateKind;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AdapterError, SettingsError};

/// Environment variable allowing callers to override the settings file path.
pub const SETTINGS_PATH_ENV: &str = "MODELWRAP_SETTINGS_PATH";

/// Default filename inside the `modelwrap` config directory.
pub const SETTINGS_FILE_NAME: &str = "settings.yaml";

/// How much of a structured object the fallback exposes to templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExposureLevel {
    All,
    #[default]
    Safe,
    PropertiesOnly,
    Nothing,
}

/// Immutable adapter configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AdapterSettings {
    exposure_level: ExposureLevel,
    expose_fields: bool,
    default_date_kind: DateKind,
}

impl AdapterSettings {
    pub const DEFAULT: AdapterSettings = AdapterSettings {
        exposure_level: ExposureLevel::Safe,
        expose_fields: false,
        default_date_kind: DateKind::Unknown,
    };

    pub fn exposure_level(&self) -> ExposureLevel {
        self.exposure_level
    }

    pub fn expose_fields(&self) -> bool {
        self.expose_fields
    }

    /// Subkind given to temporals that carry no subkind information.
    pub fn default_date_kind(&self) -> DateKind {
        self.default_date_kind
    }

    pub fn with_exposure_level(self, exposure_level: ExposureLevel) -> Self {
        Self { exposure_level, ..self }
    }

    pub fn with_expose_fields(self, expose_fields: bool) -> Self {
        Self { expose_fields, ..self }
    }

    pub fn with_default_date_kind(self, default_date_kind: DateKind) -> Self {
        Self {
            default_date_kind,
            ..self
        }
    }

    pub fn is_default(&self) -> bool {
        *self == Self::DEFAULT
    }

    /// Parses settings from YAML text. Empty documents yield the defaults.
    pub fn from_yaml_str(content: &str) -> Result<Self, SettingsError> {
        if content.trim().is_empty() {
            return Ok(Self::DEFAULT);
        }
        let file: SettingsFile = serde_yaml::from_str(content)?;
        Ok(file.into_settings()?)
    }

    pub fn from_json_str(content: &str) -> Result<Self, SettingsError> {
        if content.trim().is_empty() {
            return Ok(Self::DEFAULT);
        }
        let file: SettingsFile = serde_json::from_str(content)?;
        Ok(file.into_settings()?)
    }

    /// Loads a settings file, choosing the parser from the extension.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let content = fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .and_then(|extension| extension.to_str())
            .is_some_and(|extension| extension.eq_ignore_ascii_case("json"));
        let settings = if is_json {
            Self::from_json_str(&content)?
        } else {
            Self::from_yaml_str(&content)?
        };
        debug!(path = %path.display(), settings = ?settings, "loaded adapter settings");
        Ok(settings)
    }

    /// Loads the settings file at [`default_settings_path`], falling back to
    /// [`AdapterSettings::DEFAULT`] when it does not exist.
    pub fn load_default() -> Result<Self, SettingsError> {
        let path = default_settings_path();
        match Self::load(&path) {
            Ok(settings) => Ok(settings),
            Err(SettingsError::Io(error)) if error.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no settings file; using defaults");
                Ok(Self::DEFAULT)
            }
            Err(error) => Err(error),
        }
    }
}

impl Default for AdapterSettings {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// On-disk shape. Every key is optional; unknown keys are errors.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct SettingsFile {
    exposure_level: Option<ExposureLevel>,
    expose_fields: Option<bool>,
    default_date_kind: Option<DateKind>,
    simple_map_wrapper: Option<bool>,
}

impl SettingsFile {
    fn into_settings(self) -> Result<AdapterSettings, AdapterError> {
        if self.simple_map_wrapper.is_some() {
            return Err(AdapterError::rejected(
                "the default adapter is not affected by the simple_map_wrapper setting; remove it from the settings file",
            ));
        }
        let defaults = AdapterSettings::DEFAULT;
        Ok(AdapterSettings {
            exposure_level: self.exposure_level.unwrap_or(defaults.exposure_level),
            expose_fields: self.expose_fields.unwrap_or(defaults.expose_fields),
            default_date_kind: self.default_date_kind.unwrap_or(defaults.default_date_kind),
        })
    }
}

/// Path of the settings file: `MODELWRAP_SETTINGS_PATH` when set, otherwise
/// `<config dir>/modelwrap/settings.yaml`.
pub fn default_settings_path() -> PathBuf {
    if let Ok(path) = env::var(SETTINGS_PATH_ENV)
        && !path.trim().is_empty()
    {
        return expand_tilde(&path);
    }

    config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("modelwrap")
        .join(SETTINGS_FILE_NAME)
}

fn expand_tilde(path: &str) -> PathBuf {
    let trimmed = path.trim();
    if trimmed == "~" {
        return home_dir().unwrap_or_else(|| PathBuf::from("~"));
    }
    if let Some(rest) = trimmed.strip_prefix("~/").or_else(|| trimmed.strip_prefix("~\\")) {
        return home_dir().unwrap_or_else(|| PathBuf::from("~")).join(rest);
    }
    PathBuf::from(trimmed)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn default_bundle_is_designated() {
        assert!(AdapterSettings::default().is_default());
        assert_eq!(AdapterSettings::DEFAULT.default_date_kind(), DateKind::Unknown);
        assert_eq!(AdapterSettings::DEFAULT.exposure_level(), ExposureLevel::Safe);
    }

    #[test]
    fn equality_covers_every_field() {
        let base = AdapterSettings::DEFAULT;
        assert_ne!(base.with_expose_fields(true), base);
        assert_ne!(base.with_exposure_level(ExposureLevel::All), base);
        assert_ne!(base.with_default_date_kind(DateKind::DateTime), base);
        assert_eq!(base.with_expose_fields(true).with_expose_fields(false), base);
    }

    #[test]
    fn yaml_overrides_only_the_listed_keys() {
        let settings = AdapterSettings::from_yaml_str("exposure_level: properties_only\ndefault_date_kind: date\n")
            .expect("valid settings");
        assert_eq!(settings.exposure_level(), ExposureLevel::PropertiesOnly);
        assert_eq!(settings.default_date_kind(), DateKind::Date);
        assert!(!settings.expose_fields());
    }

    #[test]
    fn empty_documents_are_default() {
        assert!(AdapterSettings::from_yaml_str("").unwrap().is_default());
        assert!(AdapterSettings::from_json_str("  ").unwrap().is_default());
    }

    #[test]
    fn legacy_simple_map_wrapper_key_is_rejected() {
        let error = AdapterSettings::from_yaml_str("simple_map_wrapper: true\n").unwrap_err();
        assert!(
            matches!(error, SettingsError::Adapter(AdapterError::ConfigurationRejected { .. })),
            "unexpected error: {error}"
        );
        let error = AdapterSettings::from_json_str(r#"{"simple_map_wrapper": false}"#).unwrap_err();
        assert!(matches!(error, SettingsError::Adapter(AdapterError::ConfigurationRejected { .. })));
    }

    #[test]
    fn unknown_keys_are_errors() {
        assert!(matches!(AdapterSettings::from_yaml_str("colour: blue\n"), Err(SettingsError::Yaml(_))));
        assert!(matches!(AdapterSettings::from_json_str(r#"{"colour": "blue"}"#), Err(SettingsError::Json(_))));
    }

    #[test]
    fn load_picks_parser_from_extension() {
        let directory = tempfile::tempdir().expect("temp dir");
        let json_path = directory.path().join("settings.json");
        let mut file = fs::File::create(&json_path).expect("create file");
        write!(file, r#"{{"expose_fields": true}}"#).expect("write file");

        let settings = AdapterSettings::load(&json_path).expect("load json");
        assert!(settings.expose_fields());
    }

    #[test]
    fn env_override_controls_the_default_path() {
        let directory = tempfile::tempdir().expect("temp dir");
        let path = directory.path().join("custom.yaml");
        fs::write(&path, "default_date_kind: time\n").expect("write file");

        temp_env::with_var(SETTINGS_PATH_ENV, Some(path.to_string_lossy().to_string()), || {
            assert_eq!(default_settings_path(), path);
            let settings = AdapterSettings::load_default().expect("load settings");
            assert_eq!(settings.default_date_kind(), DateKind::Time);
        });
    }

    #[test]
    fn missing_default_file_yields_defaults() {
        let directory = tempfile::tempdir().expect("temp dir");
        let path = directory.path().join("absent.yaml");
        temp_env::with_var(SETTINGS_PATH_ENV, Some(path.to_string_lossy().to_string()), || {
            assert!(AdapterSettings::load_default().expect("defaults").is_default());
        });
    }
}
