//! Identifier sanitization and string-literal escaping (spec §4.6).

/// Maps a DSL name (possibly carrying spaces, punctuation, backtick quotes,
/// or a leading digit) to a valid host identifier: runs of non-identifier
/// characters become word boundaries, each boundary after the first
/// capitalizes the next word; a leading digit is prefixed with `_`; an
/// empty result falls back to a placeholder (spec §4.6 "Identifiers";
/// §9 "Backtick-quoted identifiers").
pub fn sanitize_identifier(name: &str) -> String {
    let tokens: Vec<&str> = name
        .split(|c: char| !c.is_alphanumeric() && c != '_')
        .filter(|s| !s.is_empty())
        .collect();
    if tokens.is_empty() {
        return "_".to_string();
    }
    let mut out = String::new();
    for (i, token) in tokens.iter().enumerate() {
        if i == 0 {
            out.push_str(token);
        } else {
            out.push_str(&rulekit_ir::capitalize(token));
        }
    }
    if out.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}

/// Escapes `\`, `"`, `\n`, `\r`, `\t` for a host string literal
/// (spec §4.6 "Literals").
pub fn escape_string_literal(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn punctuation_becomes_camel_case_boundary() {
        assert_eq!(sanitize_identifier("item-type"), "itemType");
        assert_eq!(sanitize_identifier("item type"), "itemType");
    }

    #[test]
    fn leading_digit_gets_prefixed() {
        assert_eq!(sanitize_identifier("1stPlace"), "_1stPlace");
    }

    #[test]
    fn empty_name_falls_back_to_placeholder() {
        assert_eq!(sanitize_identifier("---"), "_");
    }

    #[test]
    fn escapes_control_and_quote_characters() {
        assert_eq!(escape_string_literal("a\"b\nc"), "a\\\"b\\nc");
    }
}
