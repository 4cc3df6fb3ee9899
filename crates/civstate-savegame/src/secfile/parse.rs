use super::{SectionFile, SectionFileError, Value};

fn parse_error(line: usize, message: impl Into<String>) -> SectionFileError {
    SectionFileError::Parse {
        line,
        message: message.into(),
    }
}

/// Parse a double-quoted string starting at the opening quote. Returns the
/// unescaped contents and the remaining text after the closing quote.
fn parse_quoted(text: &str, line: usize) -> Result<(String, &str), SectionFileError> {
    let mut out = String::new();
    let mut chars = text.char_indices().skip(1);
    while let Some((i, c)) = chars.next() {
        match c {
            '"' => return Ok((out, &text[i + 1..])),
            '\\' => match chars.next() {
                Some((_, '"')) => out.push('"'),
                Some((_, '\\')) => out.push('\\'),
                Some((_, 'n')) => out.push('\n'),
                Some((_, other)) => {
                    return Err(parse_error(line, format!("unknown escape '\\{}'", other)))
                }
                None => break,
            },
            _ => out.push(c),
        }
    }
    Err(parse_error(line, "unterminated string"))
}

fn parse_value(text: &str, line: usize) -> Result<Value, SectionFileError> {
    let text = text.trim();
    if text.starts_with('"') {
        let (s, rest) = parse_quoted(text, line)?;
        let rest = rest.trim();
        if !rest.is_empty() && !rest.starts_with('#') {
            return Err(parse_error(line, "trailing text after string"));
        }
        return Ok(Value::Str(s));
    }

    // Strip a trailing comment from unquoted values.
    let text = text.split('#').next().unwrap_or_default().trim();
    match text {
        "" => Err(parse_error(line, "missing value")),
        "TRUE" => Ok(Value::Bool(true)),
        "FALSE" => Ok(Value::Bool(false)),
        _ => text
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| parse_error(line, format!("invalid value '{}'", text))),
    }
}

pub(super) fn parse(text: &str) -> Result<SectionFile, SectionFileError> {
    let mut file = SectionFile::new();
    let mut current: Option<String> = None;

    for (i, raw) in text.lines().enumerate() {
        let line = i + 1;
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        if let Some(rest) = trimmed.strip_prefix('[') {
            let name = rest
                .strip_suffix(']')
                .ok_or_else(|| parse_error(line, "malformed section header"))?
                .trim();
            if name.is_empty() {
                return Err(parse_error(line, "empty section name"));
            }
            file.section_mut(name);
            current = Some(name.to_string());
            continue;
        }

        let section = current
            .as_deref()
            .ok_or_else(|| parse_error(line, "entry outside of any section"))?;
        let (key, value) = trimmed
            .split_once('=')
            .ok_or_else(|| parse_error(line, "expected 'key = value'"))?;
        let key = key.trim();
        if key.is_empty() {
            return Err(parse_error(line, "empty entry name"));
        }
        let value = parse_value(value, line)?;

        let target = file.section_mut(section);
        if target.get(key).is_some() {
            return Err(parse_error(line, format!("duplicate entry '{}'", key)));
        }
        target.set(key, value);
    }

    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic_file() {
        let text = r#"
# A savegame
[savefile]
version = 36
options = "+version3 nationality"

[game]
turn = -5
fog = TRUE
name = "Say \"hi\"\nthen go" # comment
"#;
        let file = parse(text).unwrap();
        assert_eq!(file.lookup_int("savefile.version").unwrap(), 36);
        assert_eq!(
            file.lookup_str("savefile.options").unwrap(),
            "+version3 nationality"
        );
        assert_eq!(file.lookup_int("game.turn").unwrap(), -5);
        assert!(file.lookup_bool("game.fog").unwrap());
        assert_eq!(file.lookup_str("game.name").unwrap(), "Say \"hi\"\nthen go");
    }

    #[test]
    fn test_errors_report_line() {
        let err = parse("[a]\nx = 1\ny = what\n").unwrap_err();
        assert!(matches!(err, SectionFileError::Parse { line: 3, .. }));

        let err = parse("x = 1\n").unwrap_err();
        assert!(matches!(err, SectionFileError::Parse { line: 1, .. }));

        let err = parse("[a]\ns = \"open\n").unwrap_err();
        assert!(matches!(err, SectionFileError::Parse { line: 2, .. }));

        let err = parse("[a]\nx = 1\nx = 2\n").unwrap_err();
        assert!(matches!(err, SectionFileError::Parse { line: 3, .. }));
    }

    #[test]
    fn test_strings_may_contain_hash_and_equals() {
        let file = parse("[a]\ns = \"a=b # not a comment\"\n").unwrap();
        assert_eq!(file.lookup_str("a.s").unwrap(), "a=b # not a comment");
    }

    #[test]
    fn test_dotted_section_names() {
        let file = parse("[player0.c3]\nsize = 3\n").unwrap();
        assert_eq!(file.lookup_int("player0.c3.size").unwrap(), 3);
    }
}
