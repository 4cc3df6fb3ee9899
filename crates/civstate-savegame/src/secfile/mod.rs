//! Section files: the text container savegames are stored in.
//!
//! A section file is a list of named sections, each holding ordered
//! `key = value` entries. Values are integers, booleans (`TRUE`/`FALSE`) or
//! quoted strings. Entries are addressed by a dotted path whose last
//! component is the entry name and whose prefix is the section name, so
//! `player0.c3.size` is entry `size` of section `player0.c3`.
//!
//! Vectors are stored as numbered entries: `names0`, `names1`, ... and read
//! back until the first missing index.

mod parse;
mod write;

use std::collections::HashMap;
use std::path::Path;

/// A single entry value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Value {
    Int(i64),
    Bool(bool),
    Str(String),
}

impl Value {
    pub const fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "an integer",
            Value::Bool(_) => "a boolean",
            Value::Str(_) => "a string",
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

/// Errors from reading or querying a section file.
#[derive(Debug, thiserror::Error)]
pub enum SectionFileError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },
    #[error("entry '{0}' not found")]
    Missing(String),
    #[error("entry '{path}' is not {expected}")]
    WrongType { path: String, expected: &'static str },
    #[error("'{0}' is not a valid entry path")]
    InvalidPath(String),
}

/// A named section with ordered entries.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Section {
    name: String,
    entries: Vec<(String, Value)>,
    index: HashMap<String, usize>,
}

impl Section {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.index.get(key).map(|i| &self.entries[*i].1)
    }

    /// Entries in file order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn set(&mut self, key: &str, value: Value) {
        match self.index.get(key) {
            Some(i) => self.entries[*i].1 = value,
            None => {
                self.index.insert(key.to_string(), self.entries.len());
                self.entries.push((key.to_string(), value));
            }
        }
    }
}

/// Split a path at its last dot into section and entry name.
pub fn split_path(path: &str) -> Option<(&str, &str)> {
    let (section, entry) = path.rsplit_once('.')?;
    if section.is_empty() || entry.is_empty() {
        return None;
    }
    Some((section, entry))
}

/// An in-memory section file.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SectionFile {
    sections: Vec<Section>,
    index: HashMap<String, usize>,
}

impl SectionFile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse section file text.
    pub fn parse(text: &str) -> Result<Self, SectionFileError> {
        parse::parse(text)
    }

    /// Read and parse a file.
    pub fn load(path: &Path) -> Result<Self, SectionFileError> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    pub fn has_section(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn section(&self, name: &str) -> Option<&Section> {
        self.index.get(name).map(|i| &self.sections[*i])
    }

    /// Sections in file order.
    pub fn sections(&self) -> impl Iterator<Item = &Section> {
        self.sections.iter()
    }

    pub fn section_names(&self) -> impl Iterator<Item = &str> {
        self.sections.iter().map(|s| s.name.as_str())
    }

    /// Get a section, creating it at the end if absent.
    pub fn section_mut(&mut self, name: &str) -> &mut Section {
        let i = match self.index.get(name) {
            Some(i) => *i,
            None => {
                self.index.insert(name.to_string(), self.sections.len());
                self.sections.push(Section::new(name));
                self.sections.len() - 1
            }
        };
        &mut self.sections[i]
    }

    // ------------------------------------------------------------------------
    // Lookup
    // ------------------------------------------------------------------------

    pub fn lookup(&self, path: &str) -> Option<&Value> {
        let (section, entry) = split_path(path)?;
        self.section(section)?.get(entry)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.lookup(path).is_some()
    }

    fn require(&self, path: &str) -> Result<&Value, SectionFileError> {
        if split_path(path).is_none() {
            return Err(SectionFileError::InvalidPath(path.to_string()));
        }
        self.lookup(path)
            .ok_or_else(|| SectionFileError::Missing(path.to_string()))
    }

    pub fn lookup_int(&self, path: &str) -> Result<i64, SectionFileError> {
        match self.require(path)? {
            Value::Int(n) => Ok(*n),
            _ => Err(SectionFileError::WrongType {
                path: path.to_string(),
                expected: "an integer",
            }),
        }
    }

    pub fn lookup_bool(&self, path: &str) -> Result<bool, SectionFileError> {
        match self.require(path)? {
            Value::Bool(b) => Ok(*b),
            _ => Err(SectionFileError::WrongType {
                path: path.to_string(),
                expected: "a boolean",
            }),
        }
    }

    pub fn lookup_str(&self, path: &str) -> Result<&str, SectionFileError> {
        match self.require(path)? {
            Value::Str(s) => Ok(s),
            _ => Err(SectionFileError::WrongType {
                path: path.to_string(),
                expected: "a string",
            }),
        }
    }

    /// Integer entry, or `default` if missing or mistyped.
    pub fn lookup_int_default(&self, default: i64, path: &str) -> i64 {
        self.lookup_int(path).unwrap_or(default)
    }

    /// Boolean entry, or `default` if missing or mistyped.
    pub fn lookup_bool_default(&self, default: bool, path: &str) -> bool {
        self.lookup_bool(path).unwrap_or(default)
    }

    /// String entry, or `default` if missing or mistyped.
    pub fn lookup_str_default<'a>(&'a self, default: &'a str, path: &str) -> &'a str {
        self.lookup_str(path).unwrap_or(default)
    }

    /// String vector `path0`, `path1`, ... up to the first gap.
    pub fn lookup_str_vec(&self, path: &str) -> Result<Vec<String>, SectionFileError> {
        let mut result = Vec::new();
        loop {
            let key = format!("{}{}", path, result.len());
            match self.lookup(&key) {
                None => return Ok(result),
                Some(Value::Str(s)) => result.push(s.clone()),
                Some(_) => {
                    return Err(SectionFileError::WrongType {
                        path: key,
                        expected: "a string",
                    })
                }
            }
        }
    }

    /// Integer vector `path0`, `path1`, ... up to the first gap.
    pub fn lookup_int_vec(&self, path: &str) -> Result<Vec<i64>, SectionFileError> {
        let mut result = Vec::new();
        loop {
            let key = format!("{}{}", path, result.len());
            match self.lookup(&key) {
                None => return Ok(result),
                Some(Value::Int(n)) => result.push(*n),
                Some(_) => {
                    return Err(SectionFileError::WrongType {
                        path: key,
                        expected: "an integer",
                    })
                }
            }
        }
    }

    // ------------------------------------------------------------------------
    // Insertion
    // ------------------------------------------------------------------------

    /// Set an entry, replacing any previous value.
    pub fn insert(&mut self, path: &str, value: impl Into<Value>) -> Result<(), SectionFileError> {
        let (section, entry) =
            split_path(path).ok_or_else(|| SectionFileError::InvalidPath(path.to_string()))?;
        self.section_mut(section).set(entry, value.into());
        Ok(())
    }

    /// Set an entry only if it does not exist yet. Returns whether it was set.
    pub fn insert_if_absent(
        &mut self,
        path: &str,
        value: impl Into<Value>,
    ) -> Result<bool, SectionFileError> {
        if self.contains(path) {
            return Ok(false);
        }
        self.insert(path, value)?;
        Ok(true)
    }

    pub fn insert_int(&mut self, path: &str, value: i64) -> Result<(), SectionFileError> {
        self.insert(path, Value::Int(value))
    }

    pub fn insert_bool(&mut self, path: &str, value: bool) -> Result<(), SectionFileError> {
        self.insert(path, Value::Bool(value))
    }

    pub fn insert_str(&mut self, path: &str, value: &str) -> Result<(), SectionFileError> {
        self.insert(path, Value::Str(value.to_string()))
    }

    /// Write a string vector as `path0`, `path1`, ...
    pub fn insert_str_vec<S: AsRef<str>>(
        &mut self,
        path: &str,
        values: &[S],
    ) -> Result<(), SectionFileError> {
        for (i, value) in values.iter().enumerate() {
            self.insert_str(&format!("{}{}", path, i), value.as_ref())?;
        }
        Ok(())
    }

    /// Write an integer vector as `path0`, `path1`, ...
    pub fn insert_int_vec(&mut self, path: &str, values: &[i64]) -> Result<(), SectionFileError> {
        for (i, value) in values.iter().enumerate() {
            self.insert_int(&format!("{}{}", path, i), *value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_path_uses_last_dot() {
        assert_eq!(split_path("player0.c3.size"), Some(("player0.c3", "size")));
        assert_eq!(split_path("savefile.version"), Some(("savefile", "version")));
        assert_eq!(split_path("version"), None);
        assert_eq!(split_path(".version"), None);
        assert_eq!(split_path("savefile."), None);
    }

    #[test]
    fn test_insert_and_lookup() {
        let mut file = SectionFile::new();
        file.insert_int("game.turn", 12).unwrap();
        file.insert_bool("game.fog", true).unwrap();
        file.insert_str("player0.c1.name", "Roma").unwrap();

        assert_eq!(file.lookup_int("game.turn").unwrap(), 12);
        assert!(file.lookup_bool("game.fog").unwrap());
        assert_eq!(file.lookup_str("player0.c1.name").unwrap(), "Roma");
        assert!(file.has_section("player0.c1"));
        assert!(!file.has_section("player0"));
    }

    #[test]
    fn test_missing_and_wrong_type_are_distinct() {
        let mut file = SectionFile::new();
        file.insert_str("game.turn", "twelve").unwrap();
        assert!(matches!(
            file.lookup_int("game.year"),
            Err(SectionFileError::Missing(_))
        ));
        assert!(matches!(
            file.lookup_int("game.turn"),
            Err(SectionFileError::WrongType { .. })
        ));
        assert_eq!(file.lookup_int_default(5, "game.turn"), 5);
        assert_eq!(file.lookup_int_default(5, "game.year"), 5);
    }

    #[test]
    fn test_vectors_stop_at_first_gap() {
        let mut file = SectionFile::new();
        file.insert_str_vec("savefile.names", &["a", "b", "c"]).unwrap();
        file.insert_str("savefile.names5", "orphan").unwrap();
        assert_eq!(
            file.lookup_str_vec("savefile.names").unwrap(),
            vec!["a", "b", "c"]
        );
        assert!(file.lookup_str_vec("savefile.none").unwrap().is_empty());
    }

    #[test]
    fn test_insert_if_absent() {
        let mut file = SectionFile::new();
        assert!(file.insert_if_absent("a.b", 1i64).unwrap());
        assert!(!file.insert_if_absent("a.b", 2i64).unwrap());
        assert_eq!(file.lookup_int("a.b").unwrap(), 1);
    }

    #[test]
    fn test_replace_keeps_order() {
        let mut file = SectionFile::new();
        file.insert_int("s.first", 1).unwrap();
        file.insert_int("s.second", 2).unwrap();
        file.insert_int("s.first", 3).unwrap();
        let keys: Vec<_> = file.section("s").unwrap().entries().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["first", "second"]);
        assert_eq!(file.lookup_int("s.first").unwrap(), 3);
    }
}
