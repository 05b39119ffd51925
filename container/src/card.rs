use std::fmt::{self, Display};

use serde::Serialize;

use crate::{CARD_SIZE, ContainerErr, Result};

const KEY_SIZE: usize = 8;
const VALUE_INDICATOR: &str = "= ";

/// Width of the value field for fixed format logicals and numbers, they end at column 30.
const FIXED_WIDTH: usize = 20;

/// Minimum amount of characters between the quotes of a string value.
const MIN_STRING_WIDTH: usize = 8;

/// The value held by a header card.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Str(String),
    Bool(bool),
    Int(i64),
    Float(f64),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the value as a float, integers are widened.
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Value::Float(v) => Some(v),
            Value::Int(v) => Some(v as f64),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::Int(v) => Some(v),
            _ => None,
        }
    }

    fn encode(&self, key: &str) -> Result<String> {
        let invalid = |reason| ContainerErr::InvalidValue {
            key: key.to_string(),
            reason,
        };

        let field = match self {
            Value::Str(s) => {
                if !is_printable(s) {
                    return Err(invalid("strings must be printable ASCII"));
                }

                let escaped = s.replace('\'', "''");
                format!("'{escaped:<MIN_STRING_WIDTH$}'")
            }
            Value::Bool(b) => format!("{:>FIXED_WIDTH$}", if *b { "T" } else { "F" }),
            Value::Int(i) => format!("{i:>FIXED_WIDTH$}"),
            Value::Float(v) => {
                if !v.is_finite() {
                    return Err(invalid("floats must be finite"));
                }

                format!("{:>FIXED_WIDTH$}", format_float(*v))
            }
        };

        Ok(field)
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => write!(f, "'{s}'"),
            Value::Bool(b) => f.write_str(if *b { "T" } else { "F" }),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(v) => f.write_str(&format_float(*v)),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<usize> for Value {
    fn from(value: usize) -> Self {
        Self::Int(value as i64)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

/// A single `KEYWORD = value / comment` entry of a record header.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Card {
    pub key: String,
    pub value: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl Card {
    /// Creates a new `Card` without a comment.
    pub fn new(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            comment: None,
        }
    }

    /// Sets the comment of this card.
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Encodes the card into its fixed width representation. Comments that do not fit are
    /// truncated, values that do not fit are an error.
    pub(crate) fn encode(&self) -> Result<[u8; CARD_SIZE]> {
        validate_key(&self.key)?;

        let value = self.value.encode(&self.key)?;
        let mut line = format!("{:<KEY_SIZE$}{VALUE_INDICATOR}{value}", self.key);

        if line.len() > CARD_SIZE {
            return Err(ContainerErr::ValueTooLong {
                key: self.key.clone(),
            });
        }

        if let Some(comment) = &self.comment {
            if !is_printable(comment) {
                return Err(ContainerErr::InvalidValue {
                    key: self.key.clone(),
                    reason: "comments must be printable ASCII",
                });
            }

            line.push_str(" / ");
            line.push_str(comment);
            line.truncate(CARD_SIZE);
        }

        let mut card = [b' '; CARD_SIZE];
        card[..line.len()].copy_from_slice(line.as_bytes());
        Ok(card)
    }

    /// Decodes a raw card.
    ///
    /// # Returns
    /// `None` for commentary and blank cards, which carry no value.
    pub(crate) fn decode(raw: &[u8], record: usize) -> Result<Option<Self>> {
        let invalid = |card: &str, reason| ContainerErr::InvalidCard {
            record,
            card: card.to_string(),
            reason,
        };

        let text = std::str::from_utf8(raw)
            .ok()
            .filter(|text| text.len() == CARD_SIZE && is_printable(text))
            .ok_or_else(|| invalid(&String::from_utf8_lossy(raw), "not printable ASCII"))?;

        let key = text[..KEY_SIZE].trim_end();
        if &text[KEY_SIZE..KEY_SIZE + VALUE_INDICATOR.len()] != VALUE_INDICATOR {
            return Ok(None);
        }

        let field = text[KEY_SIZE + VALUE_INDICATOR.len()..].trim_start();
        let (value, rest) = match field.strip_prefix('\'') {
            Some(quoted) => {
                let (s, rest) = parse_string(quoted).ok_or_else(|| invalid(key, "unterminated string"))?;
                (Value::Str(s), rest)
            }
            None => {
                let (raw_value, rest) = field.split_at(field.find('/').unwrap_or(field.len()));
                let value = parse_fixed(raw_value.trim()).ok_or_else(|| invalid(key, "unparseable value"))?;
                (value, rest)
            }
        };

        let comment = rest
            .trim_start()
            .strip_prefix('/')
            .map(str::trim)
            .filter(|comment| !comment.is_empty())
            .map(String::from);

        Ok(Some(Self {
            key: key.to_string(),
            value,
            comment,
        }))
    }
}

/// Checks that `key` can be stored as a keyword: 1 to 8 characters out of `A-Z`, `0-9`, `_` and `-`.
pub(crate) fn validate_key(key: &str) -> Result<()> {
    let valid_char = |c: char| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_' || c == '-';

    if key.is_empty() || key.len() > KEY_SIZE || !key.chars().all(valid_char) {
        return Err(ContainerErr::InvalidKey(key.to_string()));
    }

    Ok(())
}

/// The shortest representation that parses back to the same float, with an uppercase exponent.
fn format_float(v: f64) -> String {
    format!("{v:?}").replace('e', "E")
}

fn is_printable(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7e).contains(&b))
}

/// Parses the body of a quoted string (the opening quote already stripped), returning the string
/// and whatever follows the closing quote.
fn parse_string(s: &str) -> Option<(String, &str)> {
    let mut out = String::new();
    let mut chars = s.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if c != '\'' {
            out.push(c);
            continue;
        }

        if let Some(&(_, '\'')) = chars.peek() {
            chars.next();
            out.push('\'');
        } else {
            return Some((out.trim_end().to_string(), &s[i + 1..]));
        }
    }

    None
}

fn parse_fixed(s: &str) -> Option<Value> {
    match s {
        "T" => Some(Value::Bool(true)),
        "F" => Some(Value::Bool(false)),
        _ if s.contains(['.', 'E', 'e', 'D', 'd']) => {
            s.replace(['D', 'd'], "E").parse().ok().map(Value::Float)
        }
        _ => s.parse().ok().map(Value::Int),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_str(card: &Card) -> String {
        String::from_utf8(card.encode().unwrap().to_vec()).unwrap()
    }

    #[test]
    fn fixed_values_end_at_column_30() {
        let line = encode_str(&Card::new("I_LAYER", 4usize).with_comment("Index of the target layer"));

        assert_eq!(line.len(), CARD_SIZE);
        assert_eq!(&line[..10], "I_LAYER = ");
        assert_eq!(&line[29..30], "4");
        assert_eq!(line[30..].trim_end(), " / Index of the target layer");
    }

    #[test]
    fn strings_are_quoted_and_padded() {
        let line = encode_str(&Card::new("CTYPE1", "AWAV"));
        assert_eq!(line.trim_end(), "CTYPE1  = 'AWAV    '");
    }

    #[test]
    fn quotes_and_slashes_survive_decoding() {
        let card = Card::new("I_P_NM3", "it's Fe/H").with_comment("name");
        let decoded = Card::decode(&card.encode().unwrap(), 0).unwrap().unwrap();
        assert_eq!(decoded, card);
    }

    #[test]
    fn floats_decode_to_the_same_bits() {
        for v in [5514.09, -1.2888, 1e-7, 0.1 + 0.2, 1.25e300, -0.0] {
            let decoded = Card::decode(&Card::new("CRVAL1", v).encode().unwrap(), 0)
                .unwrap()
                .unwrap();

            assert_eq!(decoded.value.as_f64().unwrap().to_bits(), v.to_bits());
        }
    }

    #[test]
    fn blank_strings_decode_empty() {
        let decoded = Card::decode(&Card::new("I_POSTPR", "            ").encode().unwrap(), 0)
            .unwrap()
            .unwrap();

        assert_eq!(decoded.value, Value::Str(String::new()));
    }

    #[test]
    fn commentary_cards_are_skipped() {
        let mut raw = [b' '; CARD_SIZE];
        raw[..13].copy_from_slice(b"COMMENT hello");
        assert!(Card::decode(&raw, 0).unwrap().is_none());
    }

    #[test]
    fn long_comments_are_truncated() {
        let line = encode_str(&Card::new("I_HLAYER", 3usize).with_comment("x".repeat(100)));
        assert_eq!(line.len(), CARD_SIZE);
    }

    #[test]
    fn invalid_keys_and_values_are_rejected() {
        assert!(matches!(
            Card::new("lowercase", 1usize).encode(),
            Err(ContainerErr::InvalidKey(_))
        ));
        assert!(matches!(
            Card::new("TOOLONGKEY", 1usize).encode(),
            Err(ContainerErr::InvalidKey(_))
        ));
        assert!(matches!(
            Card::new("NAN", f64::NAN).encode(),
            Err(ContainerErr::InvalidValue { .. })
        ));
        assert!(matches!(
            Card::new("LONG", "a".repeat(80)).encode(),
            Err(ContainerErr::ValueTooLong { .. })
        ));
    }
}
