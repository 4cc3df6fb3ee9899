use super::{SectionFile, Value};
use std::fmt;

fn write_quoted(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    f.write_str("\"")?;
    for c in s.chars() {
        match c {
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            _ => write!(f, "{}", c)?,
        }
    }
    f.write_str("\"")
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{}", n),
            Value::Bool(true) => f.write_str("TRUE"),
            Value::Bool(false) => f.write_str("FALSE"),
            Value::Str(s) => write_quoted(f, s),
        }
    }
}

impl fmt::Display for SectionFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, section) in self.sections().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            writeln!(f, "[{}]", section.name())?;
            for (key, value) in section.entries() {
                writeln!(f, "{} = {}", key, value)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_written_file_parses_back() {
        let mut file = SectionFile::new();
        file.insert_int("savefile.version", 36).unwrap();
        file.insert_str("game.name", "quote \" slash \\ line\nend").unwrap();
        file.insert_bool("game.fog", false).unwrap();
        file.insert_str("map.t0000", " :gg").unwrap();

        let text = file.to_string();
        assert!(text.contains("[savefile]\nversion = 36\n"));
        assert!(text.contains("fog = FALSE"));

        let parsed = SectionFile::parse(&text).unwrap();
        assert_eq!(parsed, file);
    }
}
