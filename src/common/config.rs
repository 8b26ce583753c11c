use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer};
use thiserror::Error;
use tracing::{error, info_span, warn};

use crate::layout_engine::{Align, AlignError, SizeValue};

pub const DEFAULT_NAME: &str = "Unknown";
pub const DEFAULT_SCREEN: usize = 0;
pub const DEFAULT_DESKTOP: u32 = 2;
pub const DEFAULT_ALIGN: &str = "top left";

/// Sample configuration shipped with the binary (`winpos --example`).
pub const EXAMPLE_CONFIG: &str = include_str!("../../winpos.default.json");

pub fn config_dir() -> Option<PathBuf> { dirs::config_dir().map(|d| d.join("winpos")) }
pub fn config_file() -> Option<PathBuf> { config_dir().map(|d| d.join("config.json")) }

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration file {} does not exist", .0.display())]
    NotFound(PathBuf),
    #[error("unable to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid JSON configuration: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid TOML configuration: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("expected the configuration to contain a list of windows")]
    NotAList,
    #[error("expected at least one window to be defined")]
    Empty,
    #[error("unsupported configuration format for {}, expected .json or .toml", .0.display())]
    UnsupportedFormat(PathBuf),
}

/// A loosely typed configuration value, so that a wrongly typed field only
/// invalidates its own rule.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Setting {
    Null,
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
    Other(serde_json::Value),
}

impl fmt::Display for Setting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Setting::Null => write!(f, "null"),
            Setting::Int(i) => write!(f, "{i}"),
            Setting::Float(x) => write!(f, "{x}"),
            Setting::Bool(b) => write!(f, "{b}"),
            Setting::Text(s) => write!(f, "{s:?}"),
            Setting::Other(v) => write!(f, "{v}"),
        }
    }
}

/// Keeps an explicit `null` apart from a missing key.
fn present<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Setting>, D::Error> {
    Setting::deserialize(d).map(Some)
}

/// One window entry exactly as written in the configuration file.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawRule {
    #[serde(default, deserialize_with = "present")]
    pub name: Option<Setting>,
    /// Regex matched against window titles.
    #[serde(default, deserialize_with = "present")]
    pub search_name: Option<Setting>,
    /// Pattern matched against full process command lines.
    #[serde(default, deserialize_with = "present")]
    pub search_process: Option<Setting>,
    /// Index into the screens ordered left to right.
    #[serde(default, deserialize_with = "present")]
    pub screen: Option<Setting>,
    #[serde(default, deserialize_with = "present")]
    pub desktop: Option<Setting>,
    /// Pixels, `"<n>%"` of the screen, or 0 to leave unset.
    #[serde(default, deserialize_with = "present")]
    pub width: Option<Setting>,
    #[serde(default, deserialize_with = "present")]
    pub height: Option<Setting>,
    /// `"<top|center|bottom|n%> <left|center|right|n%>"`
    #[serde(default, deserialize_with = "present")]
    pub align: Option<Setting>,
    #[serde(flatten)]
    pub unknown: BTreeMap<String, serde_json::Value>,
}

/// A rule merged with the defaults and validated.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowRule {
    pub name: String,
    pub search_name: Option<String>,
    pub search_process: Option<String>,
    pub screen: usize,
    pub desktop: u32,
    pub width: SizeValue,
    pub height: SizeValue,
    pub align: Align,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvalidRule {
    #[error("no 'search_name' or 'search_process' configured")]
    MissingSearch,
    #[error("'{field}' must be a string, got {value}")]
    NotText { field: &'static str, value: Setting },
    #[error("'screen' must be a non-negative integer, got {0}")]
    Screen(Setting),
    #[error("'desktop' must be a non-negative integer, got {0}")]
    Desktop(Setting),
    #[error(transparent)]
    Align(#[from] AlignError),
}

fn text<'a>(
    value: &'a Option<Setting>,
    field: &'static str,
) -> Result<Option<&'a str>, InvalidRule> {
    match value {
        None => Ok(None),
        Some(Setting::Text(s)) => Ok(Some(s.as_str()).filter(|s| !s.is_empty())),
        Some(other) => Err(InvalidRule::NotText {
            field,
            value: other.clone(),
        }),
    }
}

fn index<T: TryFrom<i64>>(value: &Option<Setting>, default: T) -> Result<T, Setting> {
    match value {
        None => Ok(default),
        Some(Setting::Int(i)) => T::try_from(*i).map_err(|_| Setting::Int(*i)),
        Some(other) => Err(other.clone()),
    }
}

fn size(value: &Option<Setting>, field: &str) -> SizeValue {
    match value {
        None => SizeValue::Auto,
        Some(Setting::Int(i)) => SizeValue::from_int(*i),
        Some(Setting::Text(s)) => s.parse().unwrap_or_else(|e| {
            error!(field, "{e}; using 0");
            SizeValue::Auto
        }),
        Some(other) => {
            error!(field, "invalid size {other}; using 0");
            SizeValue::Auto
        }
    }
}

impl RawRule {
    /// The configured name, or the default when it is missing or not a string.
    pub fn name(&self) -> &str {
        match &self.name {
            Some(Setting::Text(s)) if !s.is_empty() => s.as_str(),
            _ => DEFAULT_NAME,
        }
    }

    /// Merges the rule over the defaults and checks it. Unparsable sizes are
    /// logged and fall back to [`SizeValue::Auto`] instead of failing the
    /// rule.
    pub fn validate(&self) -> Result<WindowRule, InvalidRule> {
        for key in self.unknown.keys() {
            warn!(key, "ignoring unknown window setting");
        }

        text(&self.name, "name")?;
        let search_name = text(&self.search_name, "search_name")?.map(str::to_string);
        let search_process = text(&self.search_process, "search_process")?.map(str::to_string);
        if search_name.is_none() && search_process.is_none() {
            return Err(InvalidRule::MissingSearch);
        }

        let screen = index(&self.screen, DEFAULT_SCREEN).map_err(InvalidRule::Screen)?;
        let desktop = index(&self.desktop, DEFAULT_DESKTOP).map_err(InvalidRule::Desktop)?;
        let align = text(&self.align, "align")?.unwrap_or(DEFAULT_ALIGN).parse()?;

        Ok(WindowRule {
            name: self.name().to_string(),
            search_name,
            search_process,
            screen,
            desktop,
            width: size(&self.width, "width"),
            height: size(&self.height, "height"),
            align,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub windows: Vec<RawRule>,
}

#[derive(Deserialize)]
struct TomlFile {
    windows: Option<toml::Value>,
}

impl Config {
    /// Reads a `.json` (top-level array) or `.toml` (`[[windows]]` tables)
    /// configuration file.
    pub fn read(path: &Path) -> Result<Config, ConfigError> {
        let buf = std::fs::read_to_string(path).map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => ConfigError::NotFound(path.to_path_buf()),
            _ => ConfigError::Io {
                path: path.to_path_buf(),
                source,
            },
        })?;
        match path.extension().and_then(OsStr::to_str) {
            Some("json") => Self::parse_json(&buf),
            Some("toml") => Self::parse_toml(&buf),
            _ => Err(ConfigError::UnsupportedFormat(path.to_path_buf())),
        }
    }

    pub fn parse_json(buf: &str) -> Result<Config, ConfigError> {
        let serde_json::Value::Array(items) = serde_json::from_str(buf)? else {
            return Err(ConfigError::NotAList);
        };
        let windows = items
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<RawRule>, _>>()?;
        Self::from_rules(windows)
    }

    pub fn parse_toml(buf: &str) -> Result<Config, ConfigError> {
        let file: TomlFile = toml::from_str(buf)?;
        let Some(toml::Value::Array(items)) = file.windows else {
            return Err(ConfigError::NotAList);
        };
        let windows = items
            .into_iter()
            .map(|item| item.try_into())
            .collect::<Result<Vec<RawRule>, toml::de::Error>>()?;
        Self::from_rules(windows)
    }

    fn from_rules(windows: Vec<RawRule>) -> Result<Config, ConfigError> {
        if windows.is_empty() {
            return Err(ConfigError::Empty);
        }
        Ok(Config { windows })
    }

    /// Validates every rule and returns a list of issues found.
    pub fn validate(&self) -> Vec<String> {
        self.windows
            .iter()
            .enumerate()
            .filter_map(|(i, rule)| {
                let _span = info_span!("rule", name = rule.name()).entered();
                rule.validate().err().map(|e| format!("window {i} ({}): {e}", rule.name()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use test_log::test;

    use super::*;
    use crate::layout_engine::{Anchor, Axis};

    fn rule(json: &str) -> RawRule { serde_json::from_str(json).unwrap() }

    #[test]
    fn example_config_parses() {
        let config = Config::parse_json(EXAMPLE_CONFIG).unwrap();
        assert!(!config.windows.is_empty());
        assert_eq!(config.validate(), Vec::<String>::new());
    }

    #[test]
    fn defaults_fill_missing_fields() {
        let merged = rule(r#"{"search_name": "Firefox"}"#).validate().unwrap();
        assert_eq!(
            merged,
            WindowRule {
                name: "Unknown".into(),
                search_name: Some("Firefox".into()),
                search_process: None,
                screen: 0,
                desktop: 2,
                width: SizeValue::Auto,
                height: SizeValue::Auto,
                align: Align::default(),
            }
        );
    }

    #[test]
    fn explicit_fields_are_kept() {
        let merged = rule(
            r#"{"name": "Mail", "search_process": "thunderbird", "screen": 1,
                "desktop": 0, "width": "50%", "height": 800, "align": "center right"}"#,
        )
        .validate()
        .unwrap();
        assert_eq!(merged.name, "Mail");
        assert_eq!(merged.search_process.as_deref(), Some("thunderbird"));
        assert_eq!((merged.screen, merged.desktop), (1, 0));
        assert_eq!(merged.width, SizeValue::Percent(50));
        assert_eq!(merged.height, SizeValue::Pixels(800));
        assert_eq!(merged.align.horizontal, Anchor::End);
        assert_eq!(merged.align.vertical, Anchor::Center);
    }

    #[test]
    fn rules_need_a_search_criterion() {
        assert_eq!(rule(r#"{"name": "x"}"#).validate(), Err(InvalidRule::MissingSearch));
        assert_eq!(
            rule(r#"{"search_name": "", "search_process": ""}"#).validate(),
            Err(InvalidRule::MissingSearch)
        );
    }

    #[test]
    fn screen_must_be_a_non_negative_integer() {
        assert_eq!(
            rule(r#"{"search_name": "a", "screen": "one"}"#).validate(),
            Err(InvalidRule::Screen(Setting::Text("one".into())))
        );
        assert_eq!(
            rule(r#"{"search_name": "a", "screen": 1.5}"#).validate(),
            Err(InvalidRule::Screen(Setting::Float(1.5)))
        );
        assert_eq!(
            rule(r#"{"search_name": "a", "screen": -1}"#).validate(),
            Err(InvalidRule::Screen(Setting::Int(-1)))
        );
        assert_eq!(
            rule(r#"{"search_name": "a", "desktop": true}"#).validate(),
            Err(InvalidRule::Desktop(Setting::Bool(true)))
        );
    }

    #[test]
    fn bad_sizes_degrade_to_auto() {
        let merged = rule(r#"{"search_name": "a", "width": "wide", "height": 2.5}"#)
            .validate()
            .unwrap();
        assert_eq!(merged.width, SizeValue::Auto);
        assert_eq!(merged.height, SizeValue::Auto);
    }

    #[test]
    fn bad_alignment_invalidates_the_rule() {
        assert_eq!(
            rule(r#"{"search_name": "a", "align": "middle left"}"#).validate(),
            Err(InvalidRule::Align(AlignError::Keyword {
                axis: Axis::Vertical,
                token: "middle".into()
            }))
        );
    }

    #[test]
    fn unknown_keys_are_collected() {
        let raw = rule(r#"{"search_name": "a", "scren": 1}"#);
        assert_eq!(raw.unknown.keys().collect::<Vec<_>>(), vec!["scren"]);
        assert!(raw.validate().is_ok());
    }

    #[test]
    fn json_root_must_be_a_non_empty_list() {
        assert!(matches!(
            Config::parse_json(r#"{"search_name": "a"}"#),
            Err(ConfigError::NotAList)
        ));
        assert!(matches!(Config::parse_json("[]"), Err(ConfigError::Empty)));
        assert!(matches!(Config::parse_json("[{"), Err(ConfigError::Json(_))));
    }

    #[test]
    fn wrongly_typed_rule_is_not_fatal() {
        let config = Config::parse_json(
            r#"[{"search_name": "a", "screen": "left"}, {"search_name": "b"}]"#,
        )
        .unwrap();
        assert_eq!(config.windows.len(), 2);
        let issues = config.validate();
        assert_eq!(issues.len(), 1);
        assert!(issues[0].starts_with("window 0 (Unknown)"), "{}", issues[0]);
    }

    #[test]
    fn mistyped_fields_only_invalidate_their_rule() {
        let config = Config::parse_json(
            r#"[{"search_name": 5}, {"search_name": "a", "align": 3},
                {"search_name": "a", "screen": [1]}, {"search_name": "a", "screen": null},
                {"search_name": "a", "width": {"px": 3}}, {"search_name": "b"}]"#,
        )
        .unwrap();
        assert_eq!(config.windows.len(), 6);

        let results = config.windows.iter().map(RawRule::validate).collect::<Vec<_>>();
        assert_eq!(
            results[0],
            Err(InvalidRule::NotText {
                field: "search_name",
                value: Setting::Int(5)
            })
        );
        assert_eq!(
            results[1],
            Err(InvalidRule::NotText {
                field: "align",
                value: Setting::Int(3)
            })
        );
        assert_eq!(
            results[2],
            Err(InvalidRule::Screen(Setting::Other(serde_json::json!([1]))))
        );
        assert_eq!(results[3], Err(InvalidRule::Screen(Setting::Null)));
        assert_eq!(results[4].as_ref().map(|r| r.width), Ok(SizeValue::Auto));
        assert!(results[5].is_ok());

        let issues = config.validate();
        assert_eq!(issues.len(), 4);
        assert!(issues[3].starts_with("window 3 (Unknown): 'screen'"), "{}", issues[3]);
    }

    #[test]
    fn missing_file_error_names_the_path() {
        let err = Config::read(Path::new("/nonexistent/winpos.json")).unwrap_err();
        assert_eq!(
            err.to_string(),
            "configuration file /nonexistent/winpos.json does not exist"
        );
    }

    #[test]
    fn toml_uses_a_windows_array() {
        let config = Config::parse_toml(
            r#"
            [[windows]]
            name = "Terminal"
            search_name = "Alacritty"
            width = "100%"
            height = 600
            align = "bottom left"

            [[windows]]
            search_process = "slack"
            desktop = 3
            "#,
        )
        .unwrap();
        assert_eq!(config.windows.len(), 2);
        let terminal = config.windows[0].validate().unwrap();
        assert_eq!(terminal.width, SizeValue::Percent(100));
        assert_eq!(terminal.height, SizeValue::Pixels(600));
        assert_eq!(config.windows[1].validate().unwrap().desktop, 3);

        assert!(matches!(Config::parse_toml("windows = 3"), Err(ConfigError::NotAList)));
        assert!(matches!(Config::parse_toml(""), Err(ConfigError::NotAList)));
        assert!(matches!(Config::parse_toml("windows = []"), Err(ConfigError::Empty)));
    }

    #[test]
    fn reads_files_by_extension() {
        let dir = tempfile::tempdir().unwrap();

        let json = dir.path().join("config.json");
        std::fs::write(&json, r#"[{"search_name": "a"}]"#).unwrap();
        assert_eq!(Config::read(&json).unwrap().windows.len(), 1);

        let yaml = dir.path().join("config.yaml");
        std::fs::write(&yaml, "- search_name: a").unwrap();
        assert!(matches!(Config::read(&yaml), Err(ConfigError::UnsupportedFormat(_))));

        let missing = dir.path().join("missing.json");
        assert!(matches!(Config::read(&missing), Err(ConfigError::NotFound(_))));
    }
}
