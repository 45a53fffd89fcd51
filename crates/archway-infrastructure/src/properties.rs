//! `key=value` properties codec used for `workspace.properties`.
//!
//! Reads the common properties dialect: `#`/`!` comments, `=`, `:` or
//! whitespace separators, backslash escapes, `\uXXXX`, and trailing-backslash
//! line continuations. Writes one sorted `key=value` pair per line.

use std::collections::BTreeMap;

/// Parses properties text into a sorted map. Later keys win.
pub fn parse_properties(text: &str) -> BTreeMap<String, String> {
    let mut props = BTreeMap::new();

    for logical in logical_lines(text) {
        let (key, value) = split_key_value(&logical);
        let key = unescape(key);
        if key.is_empty() {
            continue;
        }
        props.insert(key, unescape(value));
    }

    props
}

/// Renders a map as properties text, keys in sorted order.
pub fn write_properties(props: &BTreeMap<String, String>) -> String {
    let mut out = String::new();
    for (key, value) in props {
        out.push_str(&escape(key, true));
        out.push('=');
        out.push_str(&escape(value, false));
        out.push('\n');
    }
    out
}

fn logical_lines(text: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut continuing = false;

    for raw in text.lines() {
        let line = if continuing { raw.trim_start() } else { raw };

        if !continuing {
            let trimmed = line.trim_start();
            if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('!') {
                continue;
            }
            current.push_str(trimmed);
        } else {
            current.push_str(line);
        }

        if ends_with_continuation(&current) {
            current.pop();
            continuing = true;
        } else {
            lines.push(std::mem::take(&mut current));
            continuing = false;
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }

    lines
}

fn ends_with_continuation(line: &str) -> bool {
    let trailing = line.chars().rev().take_while(|c| *c == '\\').count();
    trailing % 2 == 1
}

fn split_key_value(line: &str) -> (&str, &str) {
    let mut escaped = false;
    for (i, c) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '=' | ':' => return (&line[..i], line[i + 1..].trim_start()),
            c if c.is_whitespace() => {
                let rest = line[i..].trim_start();
                let rest = rest
                    .strip_prefix('=')
                    .or_else(|| rest.strip_prefix(':'))
                    .unwrap_or(rest);
                return (&line[..i], rest.trim_start());
            }
            _ => {}
        }
    }
    (line, "")
}

fn unescape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }

        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('f') => out.push('\u{000C}'),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(decoded) => out.push(decoded),
                    None => {
                        out.push_str("\\u");
                        out.push_str(&hex);
                    }
                }
            }
            Some(other) => out.push(other),
            None => {}
        }
    }

    out
}

fn escape(value: &str, is_key: bool) -> String {
    let mut out = String::with_capacity(value.len());

    for (i, c) in value.chars().enumerate() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{000C}' => out.push_str("\\f"),
            '=' | ':' | '#' | '!' if is_key => {
                out.push('\\');
                out.push(c);
            }
            ' ' if is_key || i == 0 => out.push_str("\\ "),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04X}", c as u32)),
            c => out.push(c),
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic() {
        let props = parse_properties(
            "#Sat Jan 30 10:00:00 UTC 2021\n\
             name=Big Bank\n\
             description = Internet banking\n\
             ! another comment\n\
             public:true\n\
             owner alice\n\
             \n",
        );
        assert_eq!(props["name"], "Big Bank");
        assert_eq!(props["description"], "Internet banking");
        assert_eq!(props["public"], "true");
        assert_eq!(props["owner"], "alice");
        assert_eq!(props.len(), 4);
    }

    #[test]
    fn test_parse_escapes_and_continuations() {
        let props = parse_properties(
            "lastModifiedDate=2021-01-31T14\\:30\\:59Z\n\
             key\\=with\\=equals=value\n\
             multi=first \\\n    second\n\
             unicode=caf\\u00e9\n",
        );
        assert_eq!(props["lastModifiedDate"], "2021-01-31T14:30:59Z");
        assert_eq!(props["key=with=equals"], "value");
        assert_eq!(props["multi"], "first second");
        assert_eq!(props["unicode"], "café");
    }

    #[test]
    fn test_write_then_parse_preserves_special_values() {
        let mut props = BTreeMap::new();
        props.insert("description".to_string(), "line one\nline two".to_string());
        props.insert("name".to_string(), " leading space".to_string());
        props.insert("path".to_string(), "C:\\temp".to_string());
        props.insert("odd key".to_string(), "a=b".to_string());

        let text = write_properties(&props);
        assert!(text.contains("description=line one\\nline two\n"));
        assert_eq!(parse_properties(&text), props);
    }

    #[test]
    fn test_values_keep_surrounding_spaces() {
        // only whitespace before the value is a separator
        let props = parse_properties("name= x \n");
        assert_eq!(props["name"], "x ");

        let mut props = BTreeMap::new();
        props.insert("name".to_string(), " x ".to_string());
        let text = write_properties(&props);
        assert_eq!(text, "name=\\ x \n");
        assert_eq!(parse_properties(&text), props);
    }

    #[test]
    fn test_empty_value() {
        let props = parse_properties("sharingToken=\n");
        assert_eq!(props["sharingToken"], "");
    }
}
