//! Server settings table.
//!
//! Settings are a flat name to value mapping. Each setting carries its
//! default and the domain its value must stay within.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A setting value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SettingValue {
    Bool(bool),
    Int(i64),
    Str(String),
}

impl SettingValue {
    /// Name of the value's type, for error messages.
    pub const fn type_name(&self) -> &'static str {
        match self {
            SettingValue::Bool(_) => "bool",
            SettingValue::Int(_) => "int",
            SettingValue::Str(_) => "string",
        }
    }

    fn same_type(&self, other: &SettingValue) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

impl std::fmt::Display for SettingValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SettingValue::Bool(b) => write!(f, "{}", if *b { "enabled" } else { "disabled" }),
            SettingValue::Int(n) => write!(f, "{}", n),
            SettingValue::Str(s) => write!(f, "{}", s),
        }
    }
}

/// Allowed range of a setting.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SettingDomain {
    Any,
    /// Inclusive integer range.
    Range { min: i64, max: i64 },
    /// One of a fixed set of names.
    OneOf(Vec<String>),
}

/// A single server setting.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Setting {
    pub value: SettingValue,
    pub default: SettingValue,
    pub domain: SettingDomain,
}

/// Setting names that no longer exist. Savefiles may still carry them.
pub const RETIRED_SETTINGS: &[&str] = &["diplcost", "savepalace", "autoattack"];

/// Errors from changing a setting.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SettingsError {
    Unknown(String),
    WrongType {
        name: String,
        expected: &'static str,
        found: &'static str,
    },
    OutOfRange {
        name: String,
        value: String,
    },
}

impl std::fmt::Display for SettingsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SettingsError::Unknown(name) => write!(f, "Unknown setting '{}'", name),
            SettingsError::WrongType {
                name,
                expected,
                found,
            } => write!(
                f,
                "Setting '{}' expects a {} value, got a {}",
                name, expected, found
            ),
            SettingsError::OutOfRange { name, value } => {
                write!(f, "Value '{}' is out of range for setting '{}'", value, name)
            }
        }
    }
}

impl std::error::Error for SettingsError {}

/// All server settings, by name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsTable {
    settings: BTreeMap<String, Setting>,
}

impl Default for SettingsTable {
    fn default() -> Self {
        Self::server_defaults()
    }
}

impl SettingsTable {
    /// An empty table.
    pub fn empty() -> Self {
        Self {
            settings: BTreeMap::new(),
        }
    }

    /// The server's settings at their defaults.
    pub fn server_defaults() -> Self {
        let mut table = Self::empty();
        table.register_bool("killcitizen", true);
        table.register_bool("fogofwar", true);
        table.register_bool("team_pooled_research", true);
        table.register_bool("citizen_nationality", true);
        table.register_int("diplbulbcost", 0, 0, 100);
        table.register_int("aifill", 5, 0, 128);
        table.register_int("endturn", 5000, 1, 32767);
        table.register_int("gold", 50, 0, 50000);
        table.register_int("citymindist", 2, 1, 11);
        table.register_int("techlossforgiveness", -1, -1, 200);
        table.register_int("timeout", 0, -1, 8639999);
        table.register_int("occupychance", 0, 0, 100);
        table.register_enum(
            "barbarians",
            "normal",
            &["disabled", "hutsonly", "normal", "hordes"],
        );
        table.register_enum("revolen", "randomly", &["fixed", "randomly", "quickening"]);
        table.register_str("savename", "civgame");
        table
    }

    /// Register a boolean setting.
    pub fn register_bool(&mut self, name: &str, default: bool) {
        self.register(name, SettingValue::Bool(default), SettingDomain::Any);
    }

    /// Register an integer setting.
    pub fn register_int(&mut self, name: &str, default: i64, min: i64, max: i64) {
        self.register(name, SettingValue::Int(default), SettingDomain::Range { min, max });
    }

    /// Register a free-form string setting.
    pub fn register_str(&mut self, name: &str, default: &str) {
        self.register(name, SettingValue::Str(default.to_string()), SettingDomain::Any);
    }

    /// Register a string setting limited to a set of names.
    pub fn register_enum(&mut self, name: &str, default: &str, values: &[&str]) {
        self.register(
            name,
            SettingValue::Str(default.to_string()),
            SettingDomain::OneOf(values.iter().map(|v| v.to_string()).collect()),
        );
    }

    fn register(&mut self, name: &str, default: SettingValue, domain: SettingDomain) {
        self.settings.insert(
            name.to_string(),
            Setting {
                value: default.clone(),
                default,
                domain,
            },
        );
    }

    pub fn get(&self, name: &str) -> Option<&SettingValue> {
        self.settings.get(name).map(|s| &s.value)
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        match self.get(name) {
            Some(SettingValue::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    pub fn get_int(&self, name: &str) -> Option<i64> {
        match self.get(name) {
            Some(SettingValue::Int(n)) => Some(*n),
            _ => None,
        }
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        match self.get(name) {
            Some(SettingValue::Str(s)) => Some(s),
            _ => None,
        }
    }

    /// Change a setting, checking its type and domain.
    pub fn set(&mut self, name: &str, value: SettingValue) -> Result<(), SettingsError> {
        let setting = self
            .settings
            .get_mut(name)
            .ok_or_else(|| SettingsError::Unknown(name.to_string()))?;

        if !setting.default.same_type(&value) {
            return Err(SettingsError::WrongType {
                name: name.to_string(),
                expected: setting.default.type_name(),
                found: value.type_name(),
            });
        }

        let in_range = match (&setting.domain, &value) {
            (SettingDomain::Range { min, max }, SettingValue::Int(n)) => (*min..=*max).contains(n),
            (SettingDomain::OneOf(values), SettingValue::Str(s)) => values.contains(s),
            _ => true,
        };
        if !in_range {
            return Err(SettingsError::OutOfRange {
                name: name.to_string(),
                value: value.to_string(),
            });
        }

        setting.value = value;
        Ok(())
    }

    /// Whether a name belongs to a setting that has been removed.
    pub fn is_retired(name: &str) -> bool {
        RETIRED_SETTINGS.contains(&name)
    }

    /// Settings in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Setting)> {
        self.settings.iter().map(|(name, s)| (name.as_str(), s))
    }

    /// Settings whose value differs from the default.
    pub fn changed(&self) -> impl Iterator<Item = (&str, &SettingValue)> {
        self.iter()
            .filter(|(_, s)| s.value != s.default)
            .map(|(name, s)| (name, &s.value))
    }

    pub fn len(&self) -> usize {
        self.settings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.settings.is_empty()
    }
}
