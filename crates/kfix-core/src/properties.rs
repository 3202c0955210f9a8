//! Reading and writing `.properties` files (`gradle.properties` and friends).
//!
//! The build tool reads these files as ISO-8859-1, so [`Properties::to_file_string`]
//! escapes everything outside printable ASCII as `\uXXXX`.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;

use kfix_util::errors::{FixtureError, KfixResult};

/// An ordered set of key/value pairs loaded from, or destined for, a `.properties` file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Properties {
    entries: BTreeMap<String, String>,
}

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `.properties` text.
    ///
    /// Supports `key=value`, `key:value` and `key value` separators, `#` and `!`
    /// comment lines, backslash line continuations and the usual escapes.
    pub fn parse(content: &str) -> Self {
        let mut entries = BTreeMap::new();
        for line in logical_lines(content) {
            let (key, value) = split_entry(&line);
            entries.insert(unescape(key), unescape(value));
        }
        Self { entries }
    }

    /// Load a properties file, or return an empty set if `path` is not a file.
    pub fn load(path: &Path) -> KfixResult<Self> {
        if !path.is_file() {
            return Ok(Self::new());
        }
        let content = std::fs::read_to_string(path).map_err(FixtureError::Io)?;
        Ok(Self::parse(&content))
    }

    /// Write all entries to `path`, replacing whatever was there.
    pub fn store(&self, path: &Path) -> KfixResult<()> {
        kfix_util::fs::ensure_parent(path).map_err(FixtureError::Io)?;
        std::fs::write(path, self.to_file_string()).map_err(FixtureError::Io)?;
        Ok(())
    }

    /// Render as `.properties` text, one sorted `key=value` line per entry.
    pub fn to_file_string(&self) -> String {
        let mut out = String::new();
        for (key, value) in &self.entries {
            let _ = writeln!(out, "{}={}", escape(key, true), escape(value, false));
        }
        out
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Insert or replace a single entry, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.entries.insert(key.into(), value.into())
    }

    /// Remove an entry, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.entries.remove(key)
    }

    /// Union with `pairs`; on a key collision the value from `pairs` wins.
    pub fn merge<K, V>(&mut self, pairs: impl IntoIterator<Item = (K, V)>)
    where
        K: Into<String>,
        V: Into<String>,
    {
        for (k, v) in pairs {
            self.entries.insert(k.into(), v.into());
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Properties {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut props = Self::new();
        props.merge(iter);
        props
    }
}

/// Load `path`, merge `pairs` into it and store the result.
///
/// Existing keys not mentioned in `pairs` survive; keys present in both take
/// the new value. Returns the merged set.
pub fn merge_properties_into<K, V>(
    path: &Path,
    pairs: impl IntoIterator<Item = (K, V)>,
) -> KfixResult<Properties>
where
    K: Into<String>,
    V: Into<String>,
{
    let mut props = Properties::load(path)?;
    props.merge(pairs);
    props.store(path)?;
    Ok(props)
}

/// Join physical lines into logical ones, dropping blanks and comments.
fn logical_lines(content: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let mut pending: Option<String> = None;

    for raw in content.lines() {
        let trimmed = raw.trim_start();
        let mut current = match pending.take() {
            Some(mut acc) => {
                acc.push_str(trimmed);
                acc
            }
            None => {
                if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('!') {
                    continue;
                }
                trimmed.to_string()
            }
        };

        let trailing = current.chars().rev().take_while(|c| *c == '\\').count();
        if trailing % 2 == 1 {
            current.pop();
            pending = Some(current);
        } else {
            lines.push(current);
        }
    }

    if let Some(rest) = pending {
        lines.push(rest);
    }
    lines
}

/// Split a logical line into its raw (still escaped) key and value.
fn split_entry(line: &str) -> (&str, &str) {
    let mut escaped = false;
    let mut key_end = line.len();
    for (i, c) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '=' | ':' | ' ' | '\t' | '\x0c' => {
                key_end = i;
                break;
            }
            _ => {}
        }
    }

    let key = &line[..key_end];
    let mut rest = line[key_end..].trim_start_matches([' ', '\t', '\x0c']);
    if let Some(stripped) = rest.strip_prefix(['=', ':']) {
        rest = stripped.trim_start_matches([' ', '\t', '\x0c']);
    }
    (key, rest)
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('f') => out.push('\x0c'),
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

fn escape(text: &str, is_key: bool) -> String {
    let mut out = String::with_capacity(text.len());
    for (i, c) in text.chars().enumerate() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\x0c' => out.push_str("\\f"),
            ' ' if is_key || i == 0 => out.push_str("\\ "),
            '=' | ':' | '#' | '!' if is_key => {
                out.push('\\');
                out.push(c);
            }
            c if (' '..='~').contains(&c) => out.push(c),
            c => {
                let mut units = [0u16; 2];
                for unit in c.encode_utf16(&mut units) {
                    let _ = write!(out, "\\u{unit:04X}");
                }
            }
        }
    }
    out
}
