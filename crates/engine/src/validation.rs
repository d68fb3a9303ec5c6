//! Cell value validators.
//!
//! A column carries an ordered list of validators; the first failure wins
//! and its message is what an edit commit reports. Every validator except
//! `Required` accepts blank input so optional fields stay optional.

use std::fmt;
use std::sync::{Arc, OnceLock};

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::value::{as_number, is_blank, value_text};

/// User-supplied check: `Some(message)` on failure.
pub type CustomFn = dyn Fn(&Value) -> Option<String> + Send + Sync;

#[derive(Clone)]
pub struct CustomValidator(Arc<CustomFn>);

impl fmt::Debug for CustomValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CustomValidator(..)")
    }
}

/// A compiled regular expression that serializes as its source.
#[derive(Debug, Clone)]
pub struct Pattern(Regex);

impl Pattern {
    pub fn new(source: &str) -> Result<Self, regex::Error> {
        Regex::new(source).map(Pattern)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Serialize for Pattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.0.as_str())
    }
}

impl<'de> Deserialize<'de> for Pattern {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let source = String::deserialize(deserializer)?;
        Pattern::new(&source).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Validator {
    /// Rejects null, whitespace-only strings and empty arrays.
    Required {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    Number {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    /// Optional minus sign followed by digits.
    Integer {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    /// Numeric lower bound; non-numeric input passes (pair with `Number`).
    Min {
        value: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    Max {
        value: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    Range {
        min: f64,
        max: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    Email {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    /// Latin letters and whitespace only.
    English {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    /// Whole-text match against a regular expression.
    Pattern {
        pattern: Pattern,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    #[serde(skip)]
    Custom(CustomValidator),
}

impl Validator {
    pub fn required() -> Self {
        Validator::Required { message: None }
    }

    pub fn number() -> Self {
        Validator::Number { message: None }
    }

    pub fn integer() -> Self {
        Validator::Integer { message: None }
    }

    pub fn min(value: f64) -> Self {
        Validator::Min { value, message: None }
    }

    pub fn max(value: f64) -> Self {
        Validator::Max { value, message: None }
    }

    pub fn range(min: f64, max: f64) -> Self {
        Validator::Range { min, max, message: None }
    }

    pub fn email() -> Self {
        Validator::Email { message: None }
    }

    pub fn english() -> Self {
        Validator::English { message: None }
    }

    pub fn pattern(source: &str) -> Result<Self, regex::Error> {
        Ok(Validator::Pattern {
            pattern: Pattern::new(source)?,
            message: None,
        })
    }

    pub fn custom(f: impl Fn(&Value) -> Option<String> + Send + Sync + 'static) -> Self {
        Validator::Custom(CustomValidator(Arc::new(f)))
    }

    /// Replace the failure message.
    pub fn with_message(mut self, text: impl Into<String>) -> Self {
        let text = Some(text.into());
        match &mut self {
            Validator::Required { message }
            | Validator::Number { message }
            | Validator::Integer { message }
            | Validator::Min { message, .. }
            | Validator::Max { message, .. }
            | Validator::Range { message, .. }
            | Validator::Email { message }
            | Validator::English { message }
            | Validator::Pattern { message, .. } => *message = text,
            Validator::Custom(_) => {}
        }
        self
    }

    /// `Some(message)` when `value` fails this validator.
    pub fn check(&self, value: &Value) -> Option<String> {
        if let Validator::Custom(CustomValidator(f)) = self {
            return f(value);
        }
        if let Validator::Required { message } = self {
            let missing = match value {
                Value::Null => true,
                Value::String(s) => s.trim().is_empty(),
                Value::Array(a) => a.is_empty(),
                _ => false,
            };
            return missing.then(|| or_default(message, "This field is required."));
        }
        if is_blank(value) {
            return None;
        }

        match self {
            Validator::Number { message } => as_number(value)
                .is_none()
                .then(|| or_default(message, "Only numbers are allowed.")),
            Validator::Integer { message } => (!is_integer(value))
                .then(|| or_default(message, "Only integers are allowed.")),
            Validator::Min { value: min, message } => as_number(value)
                .filter(|n| n < min)
                .map(|_| message.clone().unwrap_or_else(|| format!("Must be at least {min}."))),
            Validator::Max { value: max, message } => as_number(value)
                .filter(|n| n > max)
                .map(|_| message.clone().unwrap_or_else(|| format!("Must be at most {max}."))),
            Validator::Range { min, max, message } => as_number(value)
                .filter(|n| n < min || n > max)
                .map(|_| {
                    message
                        .clone()
                        .unwrap_or_else(|| format!("Must be between {min} and {max}."))
                }),
            Validator::Email { message } => {
                let text = value_text(value);
                let ok = email_regex().is_some_and(|re| re.is_match(text.trim()));
                (!ok).then(|| or_default(message, "Not a valid email address."))
            }
            Validator::English { message } => {
                let text = value_text(value);
                let ok = !text.is_empty()
                    && text.chars().all(|c| c.is_ascii_alphabetic() || c.is_whitespace());
                (!ok).then(|| or_default(message, "Only English letters are allowed."))
            }
            Validator::Pattern { pattern, message } => {
                let text = value_text(value);
                let ok = pattern
                    .0
                    .find(&text)
                    .is_some_and(|m| m.start() == 0 && m.end() == text.len());
                (!ok).then(|| {
                    message
                        .clone()
                        .unwrap_or_else(|| format!("Does not match {}.", pattern.as_str()))
                })
            }
            Validator::Required { .. } | Validator::Custom(_) => None,
        }
    }
}

fn or_default(message: &Option<String>, default: &str) -> String {
    message.clone().unwrap_or_else(|| default.to_string())
}

fn is_integer(value: &Value) -> bool {
    match value {
        Value::Number(n) => n.is_i64() || n.is_u64() || n.as_f64().is_some_and(|f| f.fract() == 0.0),
        other => {
            let text = value_text(other);
            let digits = text.strip_prefix('-').unwrap_or(&text);
            !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
        }
    }
}

fn email_regex() -> Option<&'static Regex> {
    static EMAIL: OnceLock<Option<Regex>> = OnceLock::new();
    EMAIL
        .get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").ok())
        .as_ref()
}

/// Run validators in order; the first failure message wins.
pub fn run_validators(validators: &[Validator], value: &Value) -> Option<String> {
    validators.iter().find_map(|v| v.check(value))
}
