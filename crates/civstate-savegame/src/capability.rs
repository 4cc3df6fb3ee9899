//! Capability strings.
//!
//! A capability string is a space separated list of tokens. Tokens starting
//! with `+` are mandatory: both sides must have them. Others are optional
//! features that gate parts of the file.

/// Capabilities written into every savefile.
pub const SAVEFILE_OPTIONS: &str = "+version3 nationality";

/// Capabilities a savefile must carry to be loadable.
pub const REQUIRED_OPTIONS: &str = "+version3";

fn tokens(caps: &str) -> impl Iterator<Item = &str> {
    caps.split_whitespace().map(|t| t.trim_start_matches('+'))
}

/// Whether `caps` contains a single capability (a leading `+` is ignored on
/// both sides).
pub fn has_capability(cap: &str, caps: &str) -> bool {
    let cap = cap.trim_start_matches('+');
    tokens(caps).any(|t| t == cap)
}

/// Whether every token of `required` is present in `present`.
pub fn has_capabilities(required: &str, present: &str) -> bool {
    tokens(required).all(|cap| has_capability(cap, present))
}

/// Mandatory (`+`) tokens of `ours` missing from `theirs`.
pub fn missing_mandatory<'a>(ours: &'a str, theirs: &str) -> Vec<&'a str> {
    ours.split_whitespace()
        .filter(|t| t.starts_with('+'))
        .filter(|t| !has_capability(t, theirs))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_capability() {
        assert!(has_capability("nationality", SAVEFILE_OPTIONS));
        assert!(has_capability("+version3", SAVEFILE_OPTIONS));
        assert!(has_capability("version3", SAVEFILE_OPTIONS));
        assert!(!has_capability("version2", SAVEFILE_OPTIONS));
    }

    #[test]
    fn test_subset_check() {
        assert!(has_capabilities("+version3", "nationality +version3 extra"));
        assert!(!has_capabilities("+version3 nationality", "+version3"));
        assert!(has_capabilities("", "anything"));
    }

    #[test]
    fn test_missing_mandatory() {
        assert_eq!(missing_mandatory(SAVEFILE_OPTIONS, "nationality"), vec!["+version3"]);
        assert!(missing_mandatory(SAVEFILE_OPTIONS, "+version3").is_empty());
    }
}
