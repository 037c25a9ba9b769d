//! Keyword-argument mini-language
//!
//! Commands that take named options receive their argument tail as a flat
//! string such as `title="Server rules" color=green pin`. This module turns
//! that string into an ordered [`Kwargs`] map.
//!
//! Grammar: `key=value` pairs separated by single spaces. A value may be
//! wrapped in double quotes, in which case it may contain spaces and `=`, and
//! `\` makes the next character literal. Quotes are never allowed in keys.
//!
//! ```rust
//! use dismob_core::kwargs;
//!
//! let args = kwargs::parse(r#"title="Hello world" color=green"#).unwrap();
//! assert_eq!(args.get("title"), Some("Hello world"));
//! assert_eq!(args.get("color"), Some("green"));
//! ```

use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use tracing::debug;

/// The grammar violation a [`ParseError`] reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnexpectedToken {
    /// A space while the key was still being written
    SpaceExpectedEquals,
    /// A space right after `=`
    SpaceOnEmptyValue,
    /// A second unquoted `=` inside a value
    EqualsInValue,
    /// `=` with nothing before it
    EqualsOnEmptyKey,
    /// `"` inside a key
    QuoteInKey,
    /// `"` after the first character of an unquoted value
    QuoteMidValue,
    /// Input ended inside a quoted value
    MissingClosingQuote,
}

impl UnexpectedToken {
    /// Human-readable explanation shown above the caret diagram
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::SpaceExpectedEquals => "Found a space token when token `=` was expected.",
            Self::SpaceOnEmptyValue => "Found a space token while value is empty.",
            Self::EqualsInValue => {
                "Found token `=` while already writing value. If it's part of the value consider using quotes."
            }
            Self::EqualsOnEmptyKey => "Found token `=` but key is empty.",
            Self::QuoteInKey => "Found token `\"` in key. This is not supported.",
            Self::QuoteMidValue => {
                "Found token `\"` in middle of the value. This is not supported. Consider escaping it `\\\"` if it's part of the value."
            }
            Self::MissingClosingQuote => "Missing token `\"` at the end of value",
        }
    }
}

impl fmt::Display for UnexpectedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Malformed keyword arguments
///
/// `position` is a character index into the input. The display form is the
/// explanation followed by a code block pointing a caret at that index, ready
/// to be sent back to the user as-is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ParseError {
    kind: UnexpectedToken,
    position: usize,
    message: String,
}

impl ParseError {
    fn new(kind: UnexpectedToken, input: &str, position: usize) -> Self {
        Self {
            kind,
            position,
            message: format!("{}\n{}", kind.description(), show_index(input, position)),
        }
    }

    /// Which rule was broken
    #[must_use]
    pub const fn kind(&self) -> UnexpectedToken {
        self.kind
    }

    /// Character index of the offending token
    #[must_use]
    pub const fn position(&self) -> usize {
        self.position
    }

    /// Full user-facing message including the caret diagram
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Render `input` in a code block with a caret under character `index`
///
/// An index past the end (used for a missing closing quote) puts the caret
/// just after the last character.
#[must_use]
pub fn show_index(input: &str, index: usize) -> String {
    let len = input.chars().count();
    let trailing = len.saturating_sub(1).saturating_sub(index);
    format!(
        "```\n{input}\n{}^{}\n```",
        "-".repeat(index),
        "-".repeat(trailing)
    )
}

/// Ordered `key -> value` map produced by [`parse`]
///
/// Keys keep the position of their first occurrence; a repeated key
/// overwrites the earlier value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Kwargs {
    entries: Vec<(String, String)>,
}

impl Kwargs {
    /// Create an empty map
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Insert a pair, returning the previous value of `key` if there was one
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    /// Look up a value
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Check whether `key` is present
    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Remove `key`, returning its value
    pub fn remove(&mut self, key: &str) -> Option<String> {
        let index = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(index).1)
    }

    /// Number of pairs
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no pair was parsed
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over pairs in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Iterate over keys in insertion order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Serialize back into `key="value"` form
    ///
    /// Quotes and backslashes inside values are escaped so that [`parse`]
    /// yields the same map again. The grammar rejects an empty value followed
    /// by a space, so an empty value only round-trips in the last position.
    #[must_use]
    pub fn to_quoted_string(&self) -> String {
        self.entries
            .iter()
            .map(|(key, value)| {
                let mut escaped = String::with_capacity(value.len());
                for c in value.chars() {
                    if matches!(c, '"' | '\\') {
                        escaped.push('\\');
                    }
                    escaped.push(c);
                }
                format!("{key}=\"{escaped}\"")
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Kwargs {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut kwargs = Self::new();
        for (key, value) in iter {
            kwargs.insert(key, value);
        }
        kwargs
    }
}

impl IntoIterator for Kwargs {
    type Item = (String, String);
    type IntoIter = std::vec::IntoIter<(String, String)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl FromStr for Kwargs {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Quoting {
    Normal,
    InQuote,
    InQuoteEscaped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Key,
    Value,
}

/// Parse a keyword-argument string
///
/// # Errors
///
/// Returns a [`ParseError`] describing the first grammar violation. Parsing
/// is all-or-nothing: no partial map is returned.
pub fn parse(input: &str) -> Result<Kwargs, ParseError> {
    use UnexpectedToken as T;

    let mut result = Kwargs::new();
    let mut key = String::new();
    let mut value = String::new();
    let mut quoting = Quoting::Normal;
    let mut target = Target::Key;

    let fail = |kind, index| Err(ParseError::new(kind, input, index));

    for (index, c) in input.chars().enumerate() {
        match quoting {
            Quoting::Normal => match (c, target) {
                (' ', Target::Key) => return fail(T::SpaceExpectedEquals, index),
                (' ', Target::Value) if value.is_empty() => {
                    return fail(T::SpaceOnEmptyValue, index)
                }
                (' ', Target::Value) => {
                    result.insert(std::mem::take(&mut key), std::mem::take(&mut value));
                    target = Target::Key;
                }
                ('=', Target::Value) => return fail(T::EqualsInValue, index),
                ('=', Target::Key) if key.is_empty() => return fail(T::EqualsOnEmptyKey, index),
                ('=', Target::Key) => target = Target::Value,
                ('"', Target::Key) => return fail(T::QuoteInKey, index),
                ('"', Target::Value) if !value.is_empty() => return fail(T::QuoteMidValue, index),
                ('"', Target::Value) => quoting = Quoting::InQuote,
                (_, Target::Key) => key.push(c),
                (_, Target::Value) => value.push(c),
            },
            Quoting::InQuote => match c {
                '\\' => quoting = Quoting::InQuoteEscaped,
                '"' => quoting = Quoting::Normal,
                _ => value.push(c),
            },
            Quoting::InQuoteEscaped => {
                quoting = Quoting::InQuote;
                value.push(c);
            }
        }
    }

    if quoting != Quoting::Normal {
        return fail(T::MissingClosingQuote, input.chars().count());
    }

    debug!(key = %key, value = %value, "kwargs trailing pair");
    // No space follows the last pair, so commit it here.
    if !key.is_empty() {
        result.insert(key, value);
    }

    Ok(result)
}
