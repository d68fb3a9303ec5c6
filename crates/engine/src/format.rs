//! Value formatters: raw cell value -> display text.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::value::{as_number, value_text};

/// Fraction digits shown when a number formatter does not pin them.
const DEFAULT_MAX_FRACTION_DIGITS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DatePattern {
    #[default]
    #[serde(rename = "yyyy-MM-dd")]
    Dashed,
    #[serde(rename = "yyyy.MM.dd")]
    Dotted,
    #[serde(rename = "yyyy/MM/dd")]
    Slashed,
}

impl DatePattern {
    fn chrono_format(&self) -> &'static str {
        match self {
            DatePattern::Dashed => "%Y-%m-%d",
            DatePattern::Dotted => "%Y.%m.%d",
            DatePattern::Slashed => "%Y/%m/%d",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Formatter {
    #[serde(rename_all = "camelCase")]
    Number {
        /// Fixed fraction digits; `None` keeps up to three.
        #[serde(default)]
        decimal_places: Option<usize>,
        #[serde(default = "default_true")]
        use_grouping: bool,
        /// Suffix such as a currency or count unit
        #[serde(default)]
        unit: Option<String>,
    },
    Date {
        #[serde(default)]
        pattern: DatePattern,
    },
}

fn default_true() -> bool {
    true
}

impl Formatter {
    pub fn number() -> Self {
        Formatter::Number {
            decimal_places: None,
            use_grouping: true,
            unit: None,
        }
    }

    pub fn date(pattern: DatePattern) -> Self {
        Formatter::Date { pattern }
    }

    /// Format `value`. Null and empty input give empty text; input that does
    /// not parse is shown unchanged.
    pub fn format(&self, value: &Value) -> String {
        if value.is_null() || value.as_str() == Some("") {
            return String::new();
        }
        match self {
            Formatter::Number {
                decimal_places,
                use_grouping,
                unit,
            } => {
                let Some(n) = as_number(value) else {
                    return value_text(value);
                };
                let mut text = format_number(n, *decimal_places, *use_grouping);
                if let Some(unit) = unit {
                    text.push_str(unit);
                }
                text
            }
            Formatter::Date { pattern } => match parse_date(value) {
                Some(date) => date.format(pattern.chrono_format()).to_string(),
                None => value_text(value),
            },
        }
    }
}

fn format_number(n: f64, decimal_places: Option<usize>, use_grouping: bool) -> String {
    let fixed = match decimal_places {
        Some(places) => format!("{:.*}", places, n),
        None => {
            let s = format!("{:.*}", DEFAULT_MAX_FRACTION_DIGITS, n);
            if s.contains('.') {
                s.trim_end_matches('0').trim_end_matches('.').to_string()
            } else {
                s
            }
        }
    };
    if !use_grouping {
        return fixed;
    }

    let (sign, unsigned) = match fixed.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", fixed.as_str()),
    };
    let (int_part, frac_part) = match unsigned.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (unsigned, None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let mut out = format!("{sign}{grouped}");
    if let Some(frac) = frac_part {
        out.push('.');
        out.push_str(frac);
    }
    out
}

fn parse_date(value: &Value) -> Option<NaiveDate> {
    match value {
        // Epoch milliseconds
        Value::Number(n) => {
            let millis = n.as_i64()?;
            DateTime::from_timestamp_millis(millis).map(|dt| dt.date_naive())
        }
        Value::String(s) => {
            let s = s.trim();
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Some(dt.date_naive());
            }
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
                return Some(dt.date());
            }
            ["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d", "%Y%m%d"]
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        }
        _ => None,
    }
}
