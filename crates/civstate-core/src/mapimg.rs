//! Map image definitions.
//!
//! A definition is a colon separated list of `key=value` pairs, for example
//! `zoom=2:turns=1:format=png:map=bcku:show=all`.

use serde::{Deserialize, Serialize};

const KNOWN_KEYS: &[&str] = &[
    "format", "map", "show", "stepzoom", "turns", "zoom", "plrbv", "plrid", "plrname",
];

/// Characters allowed in the `map` layer list: borders, cities, fog, known,
/// terrain, units.
const MAP_LAYERS: &str = "bcfktu";

const SHOW_VALUES: &[&str] = &["none", "each", "human", "all", "plrname", "plrid", "plrbv"];

/// Errors from parsing a map image definition.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MapImageError {
    #[error("empty map image definition")]
    Empty,
    #[error("malformed option '{0}'")]
    Malformed(String),
    #[error("unknown option '{0}'")]
    UnknownKey(String),
    #[error("invalid value '{value}' for option '{key}'")]
    InvalidValue { key: String, value: String },
}

/// A validated map image definition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapImageDef {
    options: Vec<(String, String)>,
}

impl MapImageDef {
    /// Parse and validate a definition string.
    pub fn parse(def: &str) -> Result<Self, MapImageError> {
        let def = def.trim();
        if def.is_empty() {
            return Err(MapImageError::Empty);
        }
        let mut options = Vec::new();
        for part in def.split(':') {
            let (key, value) = part
                .split_once('=')
                .ok_or_else(|| MapImageError::Malformed(part.to_string()))?;
            if !KNOWN_KEYS.contains(&key) {
                return Err(MapImageError::UnknownKey(key.to_string()));
            }
            if !Self::value_ok(key, value) {
                return Err(MapImageError::InvalidValue {
                    key: key.to_string(),
                    value: value.to_string(),
                });
            }
            options.push((key.to_string(), value.to_string()));
        }
        Ok(Self { options })
    }

    fn value_ok(key: &str, value: &str) -> bool {
        match key {
            "zoom" | "stepzoom" | "turns" | "plrid" => {
                value.parse::<u32>().is_ok_and(|n| n <= 10_000)
            }
            "map" => !value.is_empty() && value.chars().all(|c| MAP_LAYERS.contains(c)),
            "show" => SHOW_VALUES.contains(&value),
            "plrbv" => !value.is_empty() && value.chars().all(|c| c == '0' || c == '1'),
            _ => !value.is_empty(),
        }
    }

    /// Value of an option.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.options
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

impl std::fmt::Display for MapImageDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, (key, value)) in self.options.iter().enumerate() {
            if i > 0 {
                f.write_str(":")?;
            }
            write!(f, "{}={}", key, value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_definition() {
        let def = MapImageDef::parse("zoom=2:turns=1:format=png:map=bcku:show=all").unwrap();
        assert_eq!(def.get("zoom"), Some("2"));
        assert_eq!(def.get("show"), Some("all"));
        assert_eq!(def.to_string(), "zoom=2:turns=1:format=png:map=bcku:show=all");
    }

    #[test]
    fn test_rejects_bad_definitions() {
        assert_eq!(MapImageDef::parse(""), Err(MapImageError::Empty));
        assert!(matches!(
            MapImageDef::parse("zoom"),
            Err(MapImageError::Malformed(_))
        ));
        assert!(matches!(
            MapImageDef::parse("colour=red"),
            Err(MapImageError::UnknownKey(_))
        ));
        assert!(matches!(
            MapImageDef::parse("map=xyz"),
            Err(MapImageError::InvalidValue { .. })
        ));
    }
}
