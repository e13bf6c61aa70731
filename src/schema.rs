//! Preference schema: the typed, defaulted projection of a raw document.
//!
//! A *raw document* is an untyped nested JSON mapping as stored by an
//! adapter. [`Preferences::from_raw`] validates it into a fully-populated
//! tree where every recognized field carries either its supplied value or
//! its default. Unknown top-level keys are preserved verbatim in `extra`
//! rather than rejected; unknown keys nested inside `ui`/`notifications`
//! are ignored by the typed projection (they still round-trip through the
//! raw document, which the service persists as-is).
//!
//! Applications extend the generic tree by implementing [`PreferenceTree`]
//! for a larger struct that keeps every generic field's name, type, and
//! default intact. One service implementation then serves every
//! application.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ValidationError;

/// UI display language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    #[serde(rename = "zh-CN")]
    ZhCn,
    #[serde(rename = "en")]
    En,
    #[serde(rename = "ja")]
    Ja,
}

impl Language {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ZhCn => "zh-CN",
            Self::En => "en",
            Self::Ja => "ja",
        }
    }

    /// Parse a stored value. Unknown values are `None`; the validator turns
    /// that into a [`ValidationError`], never a silent default.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "zh-CN" => Some(Self::ZhCn),
            "en" => Some(Self::En),
            "ja" => Some(Self::Ja),
            _ => None,
        }
    }
}

/// UI theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    System,
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "system" => Some(Self::System),
            "light" => Some(Self::Light),
            "dark" => Some(Self::Dark),
            _ => None,
        }
    }
}

/// Hour display format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HourCycle {
    Auto,
    H12,
    H23,
}

impl HourCycle {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::H12 => "h12",
            Self::H23 => "h23",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "auto" => Some(Self::Auto),
            "h12" => Some(Self::H12),
            "h23" => Some(Self::H23),
            _ => None,
        }
    }
}

/// Universal UI preferences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiPreferences {
    pub language: Language,
    pub theme: Theme,
    /// User timezone, IANA format.
    pub timezone: String,
    pub hour_cycle: HourCycle,
}

impl Default for UiPreferences {
    fn default() -> Self {
        Self {
            language: Language::ZhCn,
            theme: Theme::System,
            timezone: "Asia/Shanghai".to_string(),
            hour_cycle: HourCycle::Auto,
        }
    }
}

impl UiPreferences {
    /// Locale string derived from the language setting.
    pub fn locale(&self) -> &'static str {
        self.language.as_str()
    }

    fn from_raw(raw: &Map<String, Value>, path: &str) -> Result<Self, ValidationError> {
        let defaults = Self::default();
        Ok(Self {
            language: enum_field(raw, "language", path, defaults.language, Language::parse)?,
            theme: enum_field(raw, "theme", path, defaults.theme, Theme::parse)?,
            timezone: string_field(raw, "timezone", path, defaults.timezone)?,
            hour_cycle: enum_field(raw, "hour_cycle", path, defaults.hour_cycle, HourCycle::parse)?,
        })
    }

    fn to_raw(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("language".into(), Value::from(self.language.as_str()));
        map.insert("theme".into(), Value::from(self.theme.as_str()));
        map.insert("timezone".into(), Value::from(self.timezone.as_str()));
        map.insert("hour_cycle".into(), Value::from(self.hour_cycle.as_str()));
        map
    }
}

/// Universal notification preferences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationPreferences {
    /// Master switch for notifications.
    pub enabled: bool,
    pub task_completed: bool,
    pub task_failed: bool,
    pub sound: bool,
}

impl Default for NotificationPreferences {
    fn default() -> Self {
        Self {
            enabled: true,
            task_completed: true,
            task_failed: true,
            sound: false,
        }
    }
}

impl NotificationPreferences {
    fn from_raw(raw: &Map<String, Value>, path: &str) -> Result<Self, ValidationError> {
        let defaults = Self::default();
        Ok(Self {
            enabled: bool_field(raw, "enabled", path, defaults.enabled)?,
            task_completed: bool_field(raw, "task_completed", path, defaults.task_completed)?,
            task_failed: bool_field(raw, "task_failed", path, defaults.task_failed)?,
            sound: bool_field(raw, "sound", path, defaults.sound)?,
        })
    }

    fn to_raw(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("enabled".into(), Value::from(self.enabled));
        map.insert("task_completed".into(), Value::from(self.task_completed));
        map.insert("task_failed".into(), Value::from(self.task_failed));
        map.insert("sound".into(), Value::from(self.sound));
        map
    }
}

/// The generic preference tree every application shares.
///
/// `extra` is the escape hatch: an open string-to-JSON mapping for fields
/// not yet promoted to typed schema members. Unknown top-level keys found
/// in a raw document land here during validation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Preferences {
    pub ui: UiPreferences,
    pub notifications: NotificationPreferences,
    #[serde(default)]
    pub extra: Map<String, Value>,
}

/// The structural-extension seam between applications and the service.
///
/// An application-specific preference type must remain a structural
/// superset of [`Preferences`]: every generic field keeps its name, type,
/// and default. Implementing this trait for the larger struct lets the one
/// generic [`PreferencesService`](crate::service::PreferencesService) and
/// the one merge algorithm serve every application.
pub trait PreferenceTree: Default + Serialize + Send + Sync + Sized {
    /// Validate and default a raw document into the typed tree.
    ///
    /// Missing or `null` recognized fields take their defaults; a wrong
    /// type or an out-of-set enum value fails with the field path.
    fn from_raw(raw: &Map<String, Value>) -> Result<Self, ValidationError>;

    /// Serialize the typed tree back to a raw mapping.
    fn to_raw(&self) -> Map<String, Value>;

    fn ui(&self) -> &UiPreferences;

    fn notifications(&self) -> &NotificationPreferences;
}

impl PreferenceTree for Preferences {
    fn from_raw(raw: &Map<String, Value>) -> Result<Self, ValidationError> {
        let ui = match raw.get("ui") {
            None | Some(Value::Null) => UiPreferences::default(),
            Some(value) => UiPreferences::from_raw(expect_object(value, "ui")?, "ui")?,
        };
        let notifications = match raw.get("notifications") {
            None | Some(Value::Null) => NotificationPreferences::default(),
            Some(value) => NotificationPreferences::from_raw(
                expect_object(value, "notifications")?,
                "notifications",
            )?,
        };

        let mut extra = match raw.get("extra") {
            None | Some(Value::Null) => Map::new(),
            Some(value) => expect_object(value, "extra")?.clone(),
        };
        // Forward compatibility: unrecognized top-level keys are kept, not
        // rejected.
        for (key, value) in raw {
            if !matches!(key.as_str(), "ui" | "notifications" | "extra") {
                extra.insert(key.clone(), value.clone());
            }
        }

        Ok(Self {
            ui,
            notifications,
            extra,
        })
    }

    fn to_raw(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("ui".into(), Value::Object(self.ui.to_raw()));
        map.insert(
            "notifications".into(),
            Value::Object(self.notifications.to_raw()),
        );
        map.insert("extra".into(), Value::Object(self.extra.clone()));
        map
    }

    fn ui(&self) -> &UiPreferences {
        &self.ui
    }

    fn notifications(&self) -> &NotificationPreferences {
        &self.notifications
    }
}

fn expect_object<'a>(value: &'a Value, path: &str) -> Result<&'a Map<String, Value>, ValidationError> {
    value
        .as_object()
        .ok_or_else(|| ValidationError::new(path, format!("expected object, got {}", type_name(value))))
}

fn enum_field<T>(
    raw: &Map<String, Value>,
    key: &str,
    prefix: &str,
    default: T,
    parse: fn(&str) -> Option<T>,
) -> Result<T, ValidationError> {
    match raw.get(key) {
        None | Some(Value::Null) => Ok(default),
        Some(Value::String(s)) => parse(s)
            .ok_or_else(|| ValidationError::new(field_path(prefix, key), format!("unknown value '{s}'"))),
        Some(other) => Err(ValidationError::new(
            field_path(prefix, key),
            format!("expected string, got {}", type_name(other)),
        )),
    }
}

fn string_field(
    raw: &Map<String, Value>,
    key: &str,
    prefix: &str,
    default: String,
) -> Result<String, ValidationError> {
    match raw.get(key) {
        None | Some(Value::Null) => Ok(default),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(ValidationError::new(
            field_path(prefix, key),
            format!("expected string, got {}", type_name(other)),
        )),
    }
}

fn bool_field(
    raw: &Map<String, Value>,
    key: &str,
    prefix: &str,
    default: bool,
) -> Result<bool, ValidationError> {
    match raw.get(key) {
        None | Some(Value::Null) => Ok(default),
        Some(Value::Bool(b)) => Ok(*b),
        Some(other) => Err(ValidationError::new(
            field_path(prefix, key),
            format!("expected boolean, got {}", type_name(other)),
        )),
    }
}

fn field_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
